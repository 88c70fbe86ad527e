//! Public request helpers.
//!
//! # Design
//! The free functions cover the common cases: one blocking request
//! (`get`, `post`) or one blocking batch (`get_multi`, `post_multi`,
//! `http_multi`). Transport failures never escape them; a failed single
//! request yields `None` and a failed batch entry is missing from the map.
//!
//! `Transfer` is the step-by-step form of a single request. It keeps the
//! metadata of its execution so status and timing can be read afterwards.

use std::collections::BTreeMap;

use tracing::warn;

use crate::batch::{expand, OneOrMany};
use crate::builder::RequestBuilder;
use crate::config::TransportConfig;
use crate::error::Error;
use crate::executor::BatchExecutor;
use crate::http::{Body, HttpMethod, HttpResponse, TransferInfo};
use crate::options::RequestOptions;

/// `GET url`. Returns the response body, or `None` on transport failure.
pub fn get(url: &str, options: RequestOptions) -> Option<String> {
    send(url, HttpMethod::Get, None, options)
}

/// `POST url` with `body`. Returns the response body, or `None` on transport
/// failure.
pub fn post(url: &str, body: impl Into<Body>, options: RequestOptions) -> Option<String> {
    send(url, HttpMethod::Post, Some(body.into()), options)
}

/// Concurrent `GET`s. See [`http_multi`] for how inputs combine.
pub fn get_multi(
    urls: impl Into<OneOrMany<String>>,
    options: impl Into<OneOrMany<RequestOptions>>,
    batch: usize,
) -> BTreeMap<usize, String> {
    http_multi(urls, HttpMethod::Get, None, options, batch)
}

/// Concurrent `POST`s. See [`http_multi`] for how inputs combine.
pub fn post_multi(
    urls: impl Into<OneOrMany<String>>,
    body: impl Into<OneOrMany<Body>>,
    options: impl Into<OneOrMany<RequestOptions>>,
    batch: usize,
) -> BTreeMap<usize, String> {
    http_multi(urls, HttpMethod::Post, Some(body.into()), options, batch)
}

/// Run a batch of requests concurrently and return the bodies of those that
/// completed, keyed by entry index.
///
/// A list of URLs, bodies or options yields one request per item (URLs take
/// priority, then a non-empty body list, then a non-empty options list);
/// when everything is a single value, `batch` identical requests are sent.
/// Entries whose URL is the empty string are skipped, and entries that fail
/// in transport are left out of the result.
pub fn http_multi(
    urls: impl Into<OneOrMany<String>>,
    method: HttpMethod,
    body: Option<OneOrMany<Body>>,
    options: impl Into<OneOrMany<RequestOptions>>,
    batch: usize,
) -> BTreeMap<usize, String> {
    let builder = RequestBuilder::new(TransportConfig::from_env());
    let entries = expand(&urls.into(), &method, body.as_ref(), &options.into(), batch);

    let mut specs = BTreeMap::new();
    for (index, options) in entries {
        match builder.build(options) {
            Ok(spec) => {
                specs.insert(index, spec);
            }
            Err(error) => warn!(index, %error, "omitting request that could not be built"),
        }
    }
    BatchExecutor::new().execute(specs)
}

fn send(
    url: &str,
    method: HttpMethod,
    body: Option<Body>,
    options: RequestOptions,
) -> Option<String> {
    let mut transfer = Transfer::create(options).set_url(url).set_method(method);
    if let Some(body) = body {
        transfer = transfer.set_body(body);
    }
    transfer.exec().ok().flatten()
}

/// A single request, configured step by step and executed once.
///
/// ```no_run
/// use fanout_core::{RequestOptions, Transfer};
///
/// let mut transfer = Transfer::create(RequestOptions::new().with_timeout(1.0))
///     .set_url("http://localhost:3000/demo/request")
///     .set_method("GET")
///     .set_header("X-Trace", "123");
/// let body = transfer.exec().unwrap();
/// let code = transfer.http_code().unwrap();
/// # let _ = (body, code);
/// ```
#[derive(Debug)]
pub struct Transfer {
    builder: RequestBuilder,
    options: RequestOptions,
    executed: Option<Executed>,
}

#[derive(Debug)]
struct Executed {
    info: TransferInfo,
    response: Option<HttpResponse>,
}

impl Transfer {
    /// A transfer using the environment-derived [`TransportConfig`].
    pub fn create(options: RequestOptions) -> Self {
        Self::with_builder(RequestBuilder::new(TransportConfig::from_env()), options)
    }

    pub fn with_builder(builder: RequestBuilder, options: RequestOptions) -> Self {
        Self {
            builder,
            options,
            executed: None,
        }
    }

    pub fn set_url(mut self, url: impl Into<String>) -> Self {
        self.options.url = Some(url.into());
        self
    }

    pub fn set_method(mut self, method: impl Into<HttpMethod>) -> Self {
        self.options.method = Some(method.into());
        self
    }

    pub fn set_body(mut self, body: impl Into<Body>) -> Self {
        self.options.body = Some(body.into());
        self
    }

    pub fn set_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.header.insert(name, value);
        self
    }

    /// Send the request and block until it completes.
    ///
    /// Returns `Ok(None)` when the request failed in transport; the failure
    /// is recorded in [`Transfer::info`]. Returns `Err` only when the
    /// transfer was already executed. The body is decoded lossily as UTF-8,
    /// like [`HttpResponse::body`].
    pub fn exec(&mut self) -> Result<Option<String>, Error> {
        if self.executed.is_some() {
            return Err(Error::AlreadyExecuted);
        }
        let options = std::mem::take(&mut self.options);
        let url = options.url.clone().unwrap_or_default();

        let executed = match self.builder.build(options) {
            Ok(spec) => {
                let outcome = BatchExecutor::new().run_one(spec);
                Executed {
                    info: outcome.info,
                    response: outcome.result.ok(),
                }
            }
            Err(error) => {
                warn!(%url, %error, "request could not be built");
                Executed {
                    info: TransferInfo {
                        url,
                        error: Some(error.to_string()),
                        ..TransferInfo::default()
                    },
                    response: None,
                }
            }
        };

        let body = executed.response.as_ref().map(|r| r.body.clone());
        self.executed = Some(executed);
        Ok(body)
    }

    /// Metadata of the executed request.
    pub fn info(&self) -> Result<&TransferInfo, Error> {
        self.executed
            .as_ref()
            .map(|e| &e.info)
            .ok_or(Error::NotExecuted)
    }

    /// Status code of the executed request; 0 if no response was received.
    pub fn http_code(&self) -> Result<u16, Error> {
        self.info().map(|info| info.http_code)
    }

    /// Full response of the executed request, `None` after a transport
    /// failure.
    pub fn response(&self) -> Result<Option<&HttpResponse>, Error> {
        self.executed
            .as_ref()
            .map(|e| e.response.as_ref())
            .ok_or(Error::NotExecuted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_before_exec_is_a_usage_error() {
        let transfer = Transfer::create(RequestOptions::new()).set_url("http://127.0.0.1:1/");
        assert!(matches!(transfer.info(), Err(Error::NotExecuted)));
        assert!(matches!(transfer.http_code(), Err(Error::NotExecuted)));
        assert!(matches!(transfer.response(), Err(Error::NotExecuted)));
    }

    #[test]
    fn failed_exec_still_records_info() {
        let mut transfer = Transfer::create(RequestOptions::new().with_timeout(0.5))
            .set_url("http://127.0.0.1:1/")
            .set_method("get");
        assert_eq!(transfer.exec().unwrap(), None);
        let info = transfer.info().unwrap();
        assert_eq!(info.http_code, 0);
        assert_eq!(info.url, "http://127.0.0.1:1/");
        assert!(info.error.is_some());
        assert!(transfer.response().unwrap().is_none());
    }

    #[test]
    fn second_exec_is_rejected() {
        let mut transfer = Transfer::create(RequestOptions::new()).set_url("");
        assert_eq!(transfer.exec().unwrap(), None);
        assert!(matches!(transfer.exec(), Err(Error::AlreadyExecuted)));
    }

    #[test]
    fn unbuildable_request_records_error() {
        let options = RequestOptions::new().with_raw(crate::options::TransportOption::HttpHeaders(
            vec!["no colon".to_string()],
        ));
        let mut transfer = Transfer::create(options).set_url("http://127.0.0.1:1/");
        assert_eq!(transfer.exec().unwrap(), None);
        let error = transfer.info().unwrap().error.clone().unwrap();
        assert!(error.contains("invalid header"));
    }

    #[test]
    fn set_header_overwrites_case_insensitively() {
        let transfer = Transfer::create(RequestOptions::new())
            .set_header("user-auth", "abc123")
            .set_header("User-Auth", "zxc321");
        assert_eq!(transfer.options.header.len(), 1);
        assert_eq!(transfer.options.header.get("user-auth"), Some("zxc321"));
    }

    #[test]
    fn multi_with_only_empty_urls_is_empty() {
        let results = get_multi(vec!["", ""], RequestOptions::new(), 3);
        assert!(results.is_empty());
    }
}
