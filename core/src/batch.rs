//! Expansion of batch inputs into per-request options.
//!
//! # Design
//! Each of `urls`, `body` and `options` is either one value shared by every
//! request or an indexed list with one value per request. The first list in
//! priority order (`urls`, then a non-empty `body`, then non-empty `options`)
//! drives the iteration. Lists that do not drive are still indexed by
//! position, with misses resolving to "no body" or default options. When no
//! list is given, `batch` identical requests are produced.
//!
//! An entry whose URL resolves to the empty string is skipped, and only that
//! entry: the remaining entries keep their original indices.

use std::collections::BTreeMap;

use tracing::debug;

use crate::http::{Body, HttpMethod};
use crate::options::RequestOptions;

/// A single shared value or one value per request.
#[derive(Debug, Clone, PartialEq)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T: Clone> OneOrMany<T> {
    /// Value for entry `index`: the shared value, or the list item at that
    /// position.
    fn at(&self, index: usize) -> Option<T> {
        match self {
            OneOrMany::One(value) => Some(value.clone()),
            OneOrMany::Many(values) => values.get(index).cloned(),
        }
    }

    fn list_len(&self) -> Option<usize> {
        match self {
            OneOrMany::One(_) => None,
            OneOrMany::Many(values) => Some(values.len()),
        }
    }
}

impl<T> From<Vec<T>> for OneOrMany<T> {
    fn from(values: Vec<T>) -> Self {
        OneOrMany::Many(values)
    }
}

impl From<&str> for OneOrMany<String> {
    fn from(url: &str) -> Self {
        OneOrMany::One(url.to_string())
    }
}

impl From<String> for OneOrMany<String> {
    fn from(url: String) -> Self {
        OneOrMany::One(url)
    }
}

impl From<Vec<&str>> for OneOrMany<String> {
    fn from(urls: Vec<&str>) -> Self {
        OneOrMany::Many(urls.into_iter().map(str::to_string).collect())
    }
}

impl From<&str> for OneOrMany<Body> {
    fn from(text: &str) -> Self {
        OneOrMany::One(Body::from(text))
    }
}

impl From<Body> for OneOrMany<Body> {
    fn from(body: Body) -> Self {
        OneOrMany::One(body)
    }
}

impl From<RequestOptions> for OneOrMany<RequestOptions> {
    fn from(options: RequestOptions) -> Self {
        OneOrMany::One(options)
    }
}

/// Expand batch inputs into one `RequestOptions` per request, keyed by index.
///
/// `url`, `method` and (when given) `body` are written into each entry's
/// options. An absent `body` leaves whatever body the entry's options carry.
pub fn expand(
    urls: &OneOrMany<String>,
    method: &HttpMethod,
    body: Option<&OneOrMany<Body>>,
    options: &OneOrMany<RequestOptions>,
    batch: usize,
) -> BTreeMap<usize, RequestOptions> {
    let driving_len = urls
        .list_len()
        .or_else(|| body.and_then(OneOrMany::list_len).filter(|&len| len > 0))
        .or_else(|| options.list_len().filter(|&len| len > 0));

    let Some(len) = driving_len else {
        return (0..batch)
            .filter_map(|i| entry(urls, method, body, options, i).map(|opts| (i, opts)))
            .collect();
    };

    let mut result = BTreeMap::new();
    for index in 0..len {
        match entry(urls, method, body, options, index) {
            Some(opts) => {
                result.insert(index, opts);
            }
            None => debug!(index, "skipping batch entry with empty url"),
        }
    }
    result
}

fn entry(
    urls: &OneOrMany<String>,
    method: &HttpMethod,
    body: Option<&OneOrMany<Body>>,
    options: &OneOrMany<RequestOptions>,
    index: usize,
) -> Option<RequestOptions> {
    let url = urls.at(index).filter(|url| !url.is_empty())?;
    let mut opts = options.at(index).unwrap_or_default();
    opts.url = Some(url);
    opts.method = Some(method.clone());
    if let Some(body) = body.and_then(|b| b.at(index)) {
        opts.body = Some(body);
    }
    Some(opts)
}
