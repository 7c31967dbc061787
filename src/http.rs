//! Request/response model for intercepted traffic.
//!
//! A [`Request`] is the transient thing the host hands us per interception:
//! a method and a URL. Its [`RequestKey`] (method + URL) is the identity
//! responses are cached under.
//!
//! A [`Response`] carries a single-read body: reading consumes the
//! response, and there is deliberately no `Clone`. Code that must both
//! return a response and persist it calls [`Response::split`] to get two
//! independent copies first. [`StoredResponse`] is the serializable
//! snapshot that lives in a cache bucket.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Patch,
    Options,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Options => "OPTIONS",
        }
    }

    pub fn is_get(&self) -> bool {
        matches!(self, Method::Get)
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An outgoing request as seen by the fetch interceptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: Method,
    url: String,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
        }
    }

    /// Shorthand for a GET request, the only interceptable kind.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// The URL path, without scheme, host, query, or fragment.
    /// Relative URLs (`/detail/42`) pass through as-is; an absolute URL
    /// with no path component yields `/`.
    pub fn path(&self) -> &str {
        let rest = match self.url.find("://") {
            Some(idx) => {
                let after_scheme = &self.url[idx + 3..];
                match after_scheme.find('/') {
                    Some(slash) => &after_scheme[slash..],
                    None => "/",
                }
            }
            None => self.url.as_str(),
        };
        let end = rest.find(|c| c == '?' || c == '#').unwrap_or(rest.len());
        &rest[..end]
    }

    /// The identity this request's response is cached under.
    pub fn key(&self) -> RequestKey {
        RequestKey {
            method: self.method,
            url: self.url.clone(),
        }
    }
}

/// Cache identity: method + URL, matched exactly (no normalization).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestKey {
    pub method: Method,
    pub url: String,
}

impl RequestKey {
    /// Key for a GET of `url`, e.g. the fallback hub lookup.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
        }
    }
}

impl std::fmt::Display for RequestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// A live response with a single-read body.
///
/// No `Clone`: ownership makes the body unreadable twice. [`split`] is the
/// one way to get two copies.
///
/// [`split`]: Response::split
#[derive(Debug)]
pub struct Response {
    status: u16,
    headers: Vec<(String, String)>,
    body: Bytes,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Consume the response and yield its body. There is no non-consuming
    /// accessor; a body is read at most once.
    pub fn into_body(self) -> Bytes {
        self.body
    }

    /// Duplicate into two independently readable responses. Cheap: the
    /// body bytes are reference-counted, not copied.
    pub fn split(self) -> (Response, Response) {
        let twin = Response {
            status: self.status,
            headers: self.headers.clone(),
            body: self.body.clone(),
        };
        (self, twin)
    }
}

/// Snapshot of a network response as persisted in a cache bucket.
/// Immutable once stored; a newer snapshot of the same key overwrites it
/// wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    /// When the snapshot was taken. Metadata only; strategies never
    /// consult it.
    pub stored_at: DateTime<Utc>,
}

impl StoredResponse {
    /// Snapshot a live response, consuming it.
    pub fn from_response(response: Response) -> Self {
        Self {
            status: response.status,
            headers: response.headers,
            body: response.body,
            stored_at: Utc::now(),
        }
    }

    /// Rehydrate into a servable response.
    pub fn into_response(self) -> Response {
        Response {
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.stored_at).num_minutes()
    }
}
