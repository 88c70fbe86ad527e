//! Resolves `RequestOptions` into a `RequestSpec`.
//!
//! # Design
//! Resolution happens in a fixed order: derived `Accept` and `Content-Type`,
//! then the caller's headers, then raw transport options, and finally the
//! body encoding, which depends on the effective `Content-Type`. Because raw
//! options are applied late they can override anything the convenience
//! options derived.

use std::time::Duration;

use crate::config::TransportConfig;
use crate::error::Error;
use crate::form;
use crate::http::{Body, Headers, HttpMethod, RequestSpec, Timeout};
use crate::options::{MimeType, RequestOptions, TransportOption, FORM_URLENCODED};

/// Builds request specs on top of a set of transport defaults.
#[derive(Debug, Clone, Default)]
pub struct RequestBuilder {
    config: TransportConfig,
}

impl RequestBuilder {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn build(&self, options: RequestOptions) -> Result<RequestSpec, Error> {
        let RequestOptions {
            url,
            method,
            content_type,
            accept,
            timeout,
            header,
            body,
            raw,
        } = options;

        let mut headers = Headers::new();
        headers.insert("Accept", accept.unwrap_or(MimeType::Json).mime());
        if let Some(content_type) = content_type {
            headers.insert("Content-Type", content_type.content_type());
        }
        headers.merge(&header);

        let mut spec = RequestSpec {
            url: url.unwrap_or_default(),
            method: method.unwrap_or(HttpMethod::Get),
            headers,
            body,
            timeout: Timeout::from_secs_f64(timeout.unwrap_or(self.config.timeout)),
            connect_timeout: self.config.connect_timeout,
            follow_location: self.config.follow_location,
            max_redirects: self.config.max_redirects,
            verify_peer: self.config.verify_peer,
            user_agent: self.config.user_agent.clone(),
        };

        for option in raw {
            apply_raw(&mut spec, option)?;
        }

        spec.body = resolve_body(spec.body.take(), &mut spec.headers)?;
        Ok(spec)
    }
}

fn apply_raw(spec: &mut RequestSpec, option: TransportOption) -> Result<(), Error> {
    match option {
        TransportOption::Url(url) => spec.url = url,
        TransportOption::Method(method) => spec.method = method,
        TransportOption::Body(body) => spec.body = Some(body),
        TransportOption::HttpHeaders(lines) => {
            let mut headers = Headers::new();
            for line in &lines {
                headers.insert_line(line)?;
            }
            spec.headers = headers;
        }
        TransportOption::TimeoutSecs(secs) => spec.timeout = Timeout::Seconds(secs),
        TransportOption::TimeoutMillis(ms) => spec.timeout = Timeout::Millis(ms),
        TransportOption::ConnectTimeoutMillis(ms) => {
            spec.connect_timeout = Some(Duration::from_millis(ms))
        }
        TransportOption::FollowLocation(follow) => spec.follow_location = follow,
        TransportOption::MaxRedirects(max) => spec.max_redirects = max,
        TransportOption::VerifyPeer(verify) => spec.verify_peer = verify,
        TransportOption::UserAgent(agent) => spec.user_agent = Some(agent),
        TransportOption::Referer(referer) => spec.headers.insert("Referer", referer),
    }
    Ok(())
}

/// Encode a field body for the effective content type.
///
/// Content types are compared by essence. Fields with a JSON type become
/// serialized JSON. Fields with a multipart type, or with no content type,
/// are left for the transport to send as `multipart/form-data`. Fields with
/// any other type become a URL-encoded string. A text body without a content
/// type is declared as a form submission.
fn resolve_body(body: Option<Body>, headers: &mut Headers) -> Result<Option<Body>, Error> {
    let media = headers.get("Content-Type").map(essence);
    let body = match (body, media) {
        (Some(Body::Fields(fields)), Some(ct)) if is_json(&ct) => {
            Some(Body::Text(serde_json::to_string(&fields)?))
        }
        // The transport writes its own multipart type with the boundary.
        (Some(Body::Fields(fields)), Some(ct)) if ct.starts_with("multipart/") => {
            headers.remove("Content-Type");
            Some(Body::Fields(fields))
        }
        (Some(Body::Fields(fields)), Some(_)) => Some(Body::Text(form::encode(&fields))),
        (Some(Body::Text(text)), None) => {
            headers.insert("Content-Type", FORM_URLENCODED);
            Some(Body::Text(text))
        }
        (body, _) => body,
    };
    Ok(body)
}

/// Lower-cased media type without parameters.
fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn is_json(essence: &str) -> bool {
    essence == "application/json" || essence.ends_with("+json")
}
