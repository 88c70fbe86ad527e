//! Caller-facing request configuration.
//!
//! # Design
//! `RequestOptions` carries one explicit optional field per convenience
//! option. Anything the convenience layer does not cover goes into `raw` as a
//! typed `TransportOption`; raw options are applied after the convenience
//! fields, so they win when both target the same setting.

use crate::http::{Body, Headers, HttpMethod};

/// Media type for the `Content-Type` and `Accept` headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MimeType {
    Json,
    Xml,
    Html,
    Text,
    FormUrlEncoded,
    /// Used verbatim.
    Other(String),
}

pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

impl MimeType {
    /// Resolve a short name (`json`, `xml`, `html`, `text`,
    /// `form-urlencoded`); anything else is kept as a literal media type.
    pub fn parse(name: &str) -> Self {
        match name {
            "json" => MimeType::Json,
            "xml" => MimeType::Xml,
            "html" => MimeType::Html,
            "text" => MimeType::Text,
            "form-urlencoded" => MimeType::FormUrlEncoded,
            other => MimeType::Other(other.to_string()),
        }
    }

    pub fn mime(&self) -> &str {
        match self {
            MimeType::Json => "application/json",
            MimeType::Xml => "application/xml",
            MimeType::Html => "text/html",
            MimeType::Text => "text/plain",
            MimeType::FormUrlEncoded => FORM_URLENCODED,
            MimeType::Other(literal) => literal,
        }
    }

    /// Value for the `Content-Type` header.
    ///
    /// Known textual types carry a UTF-8 charset. Form submissions and
    /// literal types do not.
    pub fn content_type(&self) -> String {
        match self {
            MimeType::FormUrlEncoded | MimeType::Other(_) => self.mime().to_string(),
            known => format!("{}; charset=UTF-8", known.mime()),
        }
    }
}

impl From<&str> for MimeType {
    fn from(name: &str) -> Self {
        MimeType::parse(name)
    }
}

/// Transport setting outside the convenience options.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportOption {
    Url(String),
    Method(HttpMethod),
    Body(Body),
    /// Replaces the whole header set with these `Name: value` lines.
    HttpHeaders(Vec<String>),
    TimeoutSecs(u64),
    TimeoutMillis(u64),
    ConnectTimeoutMillis(u64),
    FollowLocation(bool),
    MaxRedirects(usize),
    VerifyPeer(bool),
    UserAgent(String),
    Referer(String),
}

/// Options for one request.
///
/// `url`, `method` and `body` are normally filled in by the helper functions;
/// the remaining fields are the convenience options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    pub url: Option<String>,
    pub method: Option<HttpMethod>,
    /// `Content-Type` of the payload. No header is sent when unset.
    pub content_type: Option<MimeType>,
    /// Defaults to JSON.
    pub accept: Option<MimeType>,
    /// Seconds; fractional values below one switch to millisecond precision.
    pub timeout: Option<f64>,
    pub header: Headers,
    /// `None` sends no body at all, which differs from an empty one.
    pub body: Option<Body>,
    pub raw: Vec<TransportOption>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, content_type: impl Into<MimeType>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_accept(mut self, accept: impl Into<MimeType>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout = Some(seconds);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.header.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_raw(mut self, option: TransportOption) -> Self {
        self.raw.push(option);
        self
    }
}
