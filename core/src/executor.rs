//! Concurrent execution of request specs.
//!
//! # Design
//! A `Context` owns a current-thread runtime that acts as the multiplexing
//! loop for one call. Every spec becomes a `Handle`: its own client, built
//! with the spec's redirect, TLS and timeout settings, plus the prepared
//! request. All handles are driven to completion together inside a single
//! blocking `block_on`, so their I/O is in flight concurrently while the
//! caller sees one blocking call.
//!
//! A handle that fails never affects its siblings: its outcome carries the
//! error and the batch result simply leaves that index out. Handles are
//! consumed by their futures and are gone by the time `block_on` returns;
//! the runtime is shut down after that, on every exit path.
//!
//! Calling into the executor from inside an async runtime is not supported:
//! the context would have to nest inside the caller's runtime.

use std::collections::BTreeMap;
use std::time::Instant;

use futures::future::join_all;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::multipart::Form;
use reqwest::redirect::Policy;
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, debug_span, warn};
use uuid::Uuid;

use crate::error::Error;
use crate::form;
use crate::http::{Body, Headers, HttpResponse, RequestSpec, TransferInfo};

/// Result of driving one handle.
#[derive(Debug)]
pub(crate) struct Outcome {
    pub index: usize,
    pub info: TransferInfo,
    pub result: Result<HttpResponse, Error>,
}

impl Outcome {
    fn failed(index: usize, url: String, error: Error) -> Self {
        Self {
            index,
            info: TransferInfo {
                url,
                error: Some(error.to_string()),
                ..TransferInfo::default()
            },
            result: Err(error),
        }
    }
}

/// Runs batches of requests concurrently and collects their bodies.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchExecutor;

impl BatchExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Execute every spec and return the body of each request that completed
    /// without a transport error, keyed by its index. Failed requests are
    /// omitted. Non-2xx responses are not failures.
    ///
    /// Bodies are decoded as UTF-8 with invalid bytes replaced by U+FFFD, so
    /// binary payloads are not returned byte for byte.
    pub fn execute(&self, specs: BTreeMap<usize, RequestSpec>) -> BTreeMap<usize, String> {
        self.run(specs)
            .into_iter()
            .filter_map(|outcome| match outcome.result {
                Ok(response) => Some((outcome.index, response.body)),
                Err(error) => {
                    warn!(index = outcome.index, %error, "omitting failed request from batch");
                    None
                }
            })
            .collect()
    }

    /// Execute every spec and return one outcome per index, in index order.
    pub(crate) fn run(&self, specs: BTreeMap<usize, RequestSpec>) -> Vec<Outcome> {
        let span = debug_span!("batch", id = %Uuid::new_v4(), size = specs.len());
        let _entered = span.enter();

        let context = match Context::open() {
            Ok(context) => context,
            Err(error) => {
                warn!(%error, "failing every request of the batch");
                let message = error.to_string();
                return specs
                    .into_iter()
                    .map(|(index, spec)| {
                        let error = Error::transport(&spec.url, message.clone());
                        Outcome::failed(index, spec.url, error)
                    })
                    .collect();
            }
        };

        let mut outcomes = Vec::with_capacity(specs.len());
        let mut handles = Vec::with_capacity(specs.len());
        for (index, spec) in specs {
            let url = spec.url.clone();
            match context.register(index, spec) {
                Ok(handle) => handles.push(handle),
                Err(error) => outcomes.push(Outcome::failed(index, url, error)),
            }
        }

        outcomes.extend(context.drive(handles));
        outcomes.sort_by_key(|outcome| outcome.index);
        outcomes
    }

    /// Execute a single spec, keeping its metadata whatever the result.
    pub(crate) fn run_one(&self, spec: RequestSpec) -> Outcome {
        let url = spec.url.clone();
        self.run(BTreeMap::from([(0, spec)]))
            .pop()
            .unwrap_or_else(|| {
                Outcome::failed(0, url.clone(), Error::transport(&url, "no outcome"))
            })
    }
}

/// Multiplexing loop shared by the handles of one call.
struct Context {
    runtime: Runtime,
}

impl Context {
    fn open() -> Result<Self, Error> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self { runtime })
    }

    fn register(&self, index: usize, spec: RequestSpec) -> Result<Handle, Error> {
        let _guard = self.runtime.enter();
        Handle::open(index, spec)
    }

    fn drive(self, handles: Vec<Handle>) -> Vec<Outcome> {
        let Context { runtime } = self;
        let outcomes = runtime.block_on(join_all(handles.into_iter().map(Handle::perform)));
        // Pending resolver lookups must not outlive the call.
        runtime.shutdown_background();
        outcomes
    }
}

/// One request registered with a context.
struct Handle {
    index: usize,
    url: String,
    client: reqwest::Client,
    request: reqwest::Request,
}

impl Handle {
    fn open(index: usize, spec: RequestSpec) -> Result<Self, Error> {
        let url = spec.url.clone();
        let transport = |e: reqwest::Error| Error::transport(&url, describe(&e));

        let redirect = if spec.follow_location {
            Policy::limited(spec.max_redirects)
        } else {
            Policy::none()
        };
        let mut builder = reqwest::Client::builder()
            .redirect(redirect)
            .danger_accept_invalid_certs(!spec.verify_peer)
            .http1_title_case_headers()
            .pool_max_idle_per_host(0);
        if let Some(connect_timeout) = spec.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }
        if let Some(agent) = &spec.user_agent {
            builder = builder.user_agent(agent.as_str());
        }
        let client = builder.build().map_err(transport)?;

        let method = reqwest::Method::from_bytes(spec.method.as_str().as_bytes())
            .map_err(|_| Error::transport(&url, format!("invalid method {}", spec.method)))?;
        let mut request = client
            .request(method, spec.url.as_str())
            .headers(header_map(&spec.headers)?);
        if let Some(timeout) = spec.timeout.as_duration() {
            request = request.timeout(timeout);
        }
        request = match spec.body {
            Some(Body::Text(text)) => request.body(text),
            Some(Body::Fields(fields)) => {
                let form = form::pairs(&fields)
                    .into_iter()
                    .fold(Form::new(), |form, (key, value)| form.text(key, value));
                request.multipart(form)
            }
            None => request,
        };
        let request = request.build().map_err(transport)?;

        debug!(index, method = %spec.method, url = %url, "registered request");
        Ok(Self {
            index,
            url,
            client,
            request,
        })
    }

    async fn perform(self) -> Outcome {
        let Handle {
            index,
            url,
            client,
            request,
        } = self;
        let started = Instant::now();
        let mut info = TransferInfo {
            url: url.clone(),
            ..TransferInfo::default()
        };

        let result = match client.execute(request).await {
            Ok(response) => {
                let status = response.status().as_u16();
                info.http_code = status;
                info.redirected = reqwest::Url::parse(&url)
                    .map(|requested| &requested != response.url())
                    .unwrap_or(false);
                info.url = response.url().to_string();
                info.content_type = response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                let headers: Headers = response
                    .headers()
                    .iter()
                    .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str(), v)))
                    .collect();
                match response.bytes().await {
                    Ok(bytes) => {
                        info.size_download = bytes.len() as u64;
                        Ok(HttpResponse {
                            status,
                            headers,
                            body: String::from_utf8_lossy(&bytes).into_owned(),
                        })
                    }
                    Err(e) => Err(Error::transport(&url, describe(&e))),
                }
            }
            Err(e) => Err(Error::transport(&url, describe(&e))),
        };

        info.total_time = started.elapsed();
        match &result {
            Ok(response) => debug!(index, status = response.status, "request completed"),
            Err(error) => {
                debug!(index, %error, "request failed");
                info.error = Some(error.to_string());
            }
        }
        Outcome {
            index,
            info,
            result,
        }
    }
}

fn header_map(headers: &Headers) -> Result<HeaderMap, Error> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers.iter() {
        let invalid = || Error::InvalidHeader(format!("{name}: {value}"));
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
        let value = HeaderValue::from_str(value).map_err(|_| invalid())?;
        map.insert(name, value);
    }
    Ok(map)
}

/// Render an error with its source chain, skipping causes whose text the
/// message already ends with.
fn describe(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.ends_with(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::RequestBuilder;
    use crate::options::RequestOptions;

    fn spec(url: &str) -> RequestSpec {
        RequestBuilder::default()
            .build(RequestOptions {
                url: Some(url.to_string()),
                ..RequestOptions::new()
            })
            .unwrap()
    }

    #[test]
    fn empty_batch_yields_empty_result() {
        assert!(BatchExecutor::new().execute(BTreeMap::new()).is_empty());
    }

    #[test]
    fn unparseable_url_is_omitted() {
        let specs = BTreeMap::from([(0, spec("not a url")), (4, spec(""))]);
        assert!(BatchExecutor::new().execute(specs).is_empty());
    }

    #[test]
    fn failed_outcome_keeps_metadata() {
        let outcome = BatchExecutor::new().run_one(spec("http://127.0.0.1:1/"));
        assert_eq!(outcome.index, 0);
        assert_eq!(outcome.info.http_code, 0);
        assert!(outcome.info.error.is_some());
        assert!(matches!(outcome.result, Err(Error::Transport { .. })));
    }

    #[test]
    fn invalid_header_value_fails_registration() {
        let mut spec = spec("http://127.0.0.1:1/");
        spec.headers.insert("X-Bad", "line\nbreak");
        let outcome = BatchExecutor::new().run_one(spec);
        assert!(matches!(outcome.result, Err(Error::InvalidHeader(_))));
    }

    #[test]
    fn drive_does_not_wait_for_pending_blocking_work() {
        let context = Context::open().unwrap();
        context
            .runtime
            .spawn_blocking(|| std::thread::sleep(std::time::Duration::from_secs(3)));
        let started = Instant::now();
        assert!(context.drive(Vec::new()).is_empty());
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
    }

    #[test]
    fn describe_does_not_repeat_causes_already_displayed() {
        let inner = std::io::Error::new(std::io::ErrorKind::Other, "refused");
        let outer = Error::Runtime(inner);
        assert_eq!(describe(&outer), "failed to start the request runtime: refused");
    }

    #[derive(Debug)]
    struct Layer(&'static str, Option<Box<Layer>>);

    impl std::fmt::Display for Layer {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(self.0)
        }
    }

    impl std::error::Error for Layer {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            self.1.as_deref().map(|l| l as &(dyn std::error::Error + 'static))
        }
    }

    #[test]
    fn describe_appends_causes_missing_from_the_message() {
        let error = Layer(
            "error sending request",
            Some(Box::new(Layer(
                "tcp connect error: connection refused",
                Some(Box::new(Layer("connection refused", None))),
            ))),
        );
        assert_eq!(
            describe(&error),
            "error sending request: tcp connect error: connection refused"
        );
    }

    #[test]
    fn failed_request_error_has_no_repeated_segments() {
        let outcome = BatchExecutor::new().run_one(spec("http://127.0.0.1:1/"));
        let error = outcome.info.error.unwrap();
        let segments: Vec<_> = error.split(": ").collect();
        for pair in segments.windows(2) {
            assert_ne!(pair[0], pair[1], "{error}");
        }
        assert_eq!(error.matches("tcp connect error").count(), 1, "{error}");
    }
}
