//! HTTP exchange abstraction.
//!
//! The client never talks to the network directly: a [`Session`](crate::Session)
//! hands each [`HttpRequest`] to a [`Transport`] and gets back an
//! [`HttpResponse`]. [`ReqwestTransport`] performs real blocking requests;
//! [`FakeTransport`] replays scripted responses for tests.

mod fake;
mod reqwest_transport;

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

pub use fake::{FakeTransport, FakeTransportBuilder, FakeTransportController};
pub use reqwest_transport::ReqwestTransport;

use crate::error::Result;

/// Cookie name to value. Ordered so that `Cookie` headers are deterministic.
pub type Cookies = BTreeMap<String, String>;

/// HTTP methods used by the forum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Post => "POST",
        })
    }
}

/// One outgoing request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    /// Full URL including the already-encoded query string.
    pub url: String,
    /// URL-encoded form body for POST requests.
    pub form: Option<Vec<(String, String)>>,
    /// Cookies to send in addition to the session's jar.
    pub cookies: Cookies,
    pub follow_redirects: bool,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            form: None,
            cookies: Cookies::new(),
            follow_redirects: true,
            timeout: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    pub fn with_form<K, V>(mut self, form: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.form = Some(form.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    pub fn with_cookies(mut self, cookies: Cookies) -> Self {
        self.cookies.extend(cookies);
        self
    }

    /// Stops at the first response instead of following `Location`.
    pub fn no_redirects(mut self) -> Self {
        self.follow_redirects = false;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Value of a form field, if the request carries a form.
    pub fn form_value(&self, name: &str) -> Option<&str> {
        self.form
            .as_ref()?
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// A completed exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    /// URL of the final response, after redirects.
    pub url: String,
    /// Header names are lowercase.
    pub headers: Vec<(String, String)>,
    pub body: String,
    /// Cookies the server set. An empty value means the server cleared it.
    pub cookies: Cookies,
}

impl HttpResponse {
    /// A `200 OK` response with `body`, mostly useful in tests.
    pub fn ok(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status: 200,
            url: url.into(),
            headers: Vec::new(),
            body: body.into(),
            cookies: Cookies::new(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.into()));
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    /// First value of the header `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Redirect target, if any.
    pub fn location(&self) -> Option<&str> {
        self.header("location")
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }

    /// Client or server error status.
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }
}

/// Performs one HTTP exchange.
///
/// Implementations return every response, including error statuses; deciding
/// what counts as a failure is left to the caller.
pub trait Transport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// Splits one `Set-Cookie` header into its name and value.
///
/// Cookies the server expires (`Max-Age=0` or a `deleted` value) come back
/// with an empty value.
pub(crate) fn parse_set_cookie(header: &str) -> Option<(String, String)> {
    let mut parts = header.split(';');
    let (name, value) = parts.next()?.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    let mut value = value.trim().trim_matches('"').to_string();
    let expired = parts.any(|attr| {
        let attr = attr.trim().to_ascii_lowercase();
        attr == "max-age=0" || attr.starts_with("max-age=-")
    });
    if expired || value == "deleted" {
        value.clear();
    }
    Some((name.to_string(), value))
}

/// Formats cookies as a `Cookie` header value.
pub(crate) fn cookie_header(cookies: &Cookies) -> Option<String> {
    if cookies.is_empty() {
        return None;
    }
    Some(
        cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; "),
    )
}
