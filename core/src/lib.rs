//! Blocking single and batched HTTP requests.
//!
//! # Overview
//! Turns convenience options into resolved requests and runs them, one at a
//! time or many at once. A batch is driven concurrently inside one blocking
//! call and returns the bodies of the requests that completed, keyed by
//! their index; a request that fails in transport is left out without
//! affecting the others.
//!
//! # Design
//! - `expand` turns scalar-or-list inputs into per-request `RequestOptions`.
//! - `RequestBuilder` resolves each `RequestOptions` into a `RequestSpec`
//!   (headers, timeout granularity, body encoding, raw transport options).
//! - `BatchExecutor` runs specs over one multiplexing runtime and always
//!   releases every handle and the runtime before returning.
//! - `Transfer` is the step-by-step single request with post-execution
//!   metadata; reading that metadata early is a usage error.

pub mod batch;
pub mod builder;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod form;
pub mod http;
pub mod options;

pub use batch::{expand, OneOrMany};
pub use builder::RequestBuilder;
pub use client::{get, get_multi, http_multi, post, post_multi, Transfer};
pub use config::TransportConfig;
pub use error::Error;
pub use executor::BatchExecutor;
pub use http::{Body, Headers, HttpMethod, HttpResponse, RequestSpec, Timeout, TransferInfo};
pub use options::{MimeType, RequestOptions, TransportOption};
