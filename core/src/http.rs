//! Request and response data for the transport layer.
//!
//! # Design
//! These types describe a fully resolved request as plain data. The builder
//! produces a `RequestSpec`, the executor consumes it by value, so a spec can
//! never be touched again once it has been handed over for execution.
//!
//! All fields use owned types so specs can be moved into the futures that
//! drive them without lifetime concerns.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::Error;

/// HTTP method for a request. Rendered uppercase on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Other(String),
}

impl HttpMethod {
    /// Parse a verb case-insensitively; unknown verbs are kept uppercased.
    pub fn parse(method: &str) -> Self {
        let upper = method.trim().to_ascii_uppercase();
        match upper.as_str() {
            "GET" => HttpMethod::Get,
            "POST" => HttpMethod::Post,
            "PUT" => HttpMethod::Put,
            "PATCH" => HttpMethod::Patch,
            "DELETE" => HttpMethod::Delete,
            "HEAD" => HttpMethod::Head,
            "OPTIONS" => HttpMethod::Options,
            _ => HttpMethod::Other(upper),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Other(verb) => verb,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for HttpMethod {
    fn from(method: &str) -> Self {
        HttpMethod::parse(method)
    }
}

/// Case-insensitive header collection.
///
/// Lookups and overwrites compare names lower-cased. When a name is written
/// twice, the value of the last write wins but the casing of the first write
/// is what goes out on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(i) => self.entries[i].1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Insert a raw `Name: value` line.
    pub fn insert_line(&mut self, line: &str) -> Result<(), Error> {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| Error::InvalidHeader(line.to_string()))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidHeader(line.to_string()));
        }
        self.insert(name, value.trim());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|i| self.entries[i].1.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.position(name).map(|i| self.entries.remove(i).1)
    }

    /// Copy every entry of `other` into `self`, overwriting case-insensitively.
    pub fn merge(&mut self, other: &Headers) {
        for (name, value) in other.iter() {
            self.insert(name, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(name))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.insert(k, v);
        }
        headers
    }
}

/// Request payload.
///
/// `Text` goes out verbatim. `Fields` is a mapping that the builder encodes
/// according to the effective content type.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Text(String),
    Fields(Map<String, Value>),
}

impl Body {
    /// Build a `Fields` body from key/value pairs, keeping their order.
    pub fn fields<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Body::Fields(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Body::Text(text) => Some(text),
            Body::Fields(_) => None,
        }
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Body::Text(text.to_string())
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Text(text)
    }
}

impl From<Map<String, Value>> for Body {
    fn from(fields: Map<String, Value>) -> Self {
        Body::Fields(fields)
    }
}

/// Per-request timeout in one of the two transport granularities.
///
/// Whole-second timeouts come from inputs of at least one second; shorter
/// inputs are carried in milliseconds. A zero value disables the timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    Seconds(u64),
    Millis(u64),
}

impl Timeout {
    /// Convert a timeout given in (possibly fractional) seconds.
    ///
    /// `t >= 1` keeps whole seconds (fraction truncated); `t < 1` becomes
    /// `round(t * 1000)` milliseconds. Negative and NaN inputs map to zero.
    pub fn from_secs_f64(t: f64) -> Self {
        if t >= 1.0 {
            Timeout::Seconds(t.trunc() as u64)
        } else {
            Timeout::Millis((t * 1000.0).round().max(0.0) as u64)
        }
    }

    pub fn as_millis(&self) -> u64 {
        match *self {
            Timeout::Seconds(s) => s.saturating_mul(1000),
            Timeout::Millis(ms) => ms,
        }
    }

    /// The timeout as a `Duration`, or `None` when disabled.
    pub fn as_duration(&self) -> Option<Duration> {
        match self.as_millis() {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}

impl Default for Timeout {
    fn default() -> Self {
        Timeout::Seconds(10)
    }
}

/// A fully resolved request, ready for the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub url: String,
    pub method: HttpMethod,
    pub headers: Headers,
    pub body: Option<Body>,
    pub timeout: Timeout,
    pub connect_timeout: Option<Duration>,
    pub follow_location: bool,
    pub max_redirects: usize,
    pub verify_peer: bool,
    pub user_agent: Option<String>,
}

impl RequestSpec {
    pub fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis()
    }
}

/// Metadata captured for a single executed request.
///
/// Captured whether or not the request succeeded; `http_code` is 0 when no
/// response was received.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransferInfo {
    /// URL of the final response, after redirects.
    pub url: String,
    pub http_code: u16,
    pub content_type: Option<String>,
    pub total_time: Duration,
    pub size_download: u64,
    pub redirected: bool,
    /// Transport error message, if the request failed.
    pub error: Option<String>,
}

/// A response received from the transport.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Headers,
    /// Response bytes decoded as UTF-8; invalid sequences become U+FFFD.
    pub body: String,
}
