//! Transport defaults shared by every request a builder produces.

use std::time::Duration;

use tracing::warn;

/// Defaults applied before per-request options and raw transport options.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportConfig {
    /// Seconds, used when a request does not set its own timeout.
    pub timeout: f64,
    pub connect_timeout: Option<Duration>,
    pub follow_location: bool,
    pub max_redirects: usize,
    /// Certificate verification is off unless enabled here or per request.
    pub verify_peer: bool,
    pub user_agent: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: 10.0,
            connect_timeout: None,
            follow_location: true,
            max_redirects: 5,
            verify_peer: false,
            user_agent: None,
        }
    }
}

impl TransportConfig {
    /// Defaults overridden by `FANOUT_TIMEOUT`, `FANOUT_CONNECT_TIMEOUT_MS`,
    /// `FANOUT_MAX_REDIRECTS`, `FANOUT_VERIFY_PEER` and `FANOUT_USER_AGENT`.
    /// Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(timeout) = parsed(&lookup, "FANOUT_TIMEOUT") {
            config.timeout = timeout;
        }
        if let Some(ms) = parsed::<u64>(&lookup, "FANOUT_CONNECT_TIMEOUT_MS") {
            config.connect_timeout = Some(Duration::from_millis(ms));
        }
        if let Some(max) = parsed(&lookup, "FANOUT_MAX_REDIRECTS") {
            config.max_redirects = max;
        }
        if let Some(verify) = parsed(&lookup, "FANOUT_VERIFY_PEER") {
            config.verify_peer = verify;
        }
        if let Some(agent) = lookup("FANOUT_USER_AGENT").filter(|a| !a.is_empty()) {
            config.user_agent = Some(agent);
        }
        config
    }
}

fn parsed<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparseable environment override");
            None
        }
    }
}
