//! Error types for the forum client.

use crate::transport::HttpResponse;

/// Result type alias for forum client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the forum.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The server answered with an error status or rendered an error page.
    ///
    /// The causing response is kept for inspection and is never retried.
    #[error("{message}")]
    Request {
        message: String,
        response: Box<HttpResponse>,
    },

    /// Identifying fields were unset before an operation that needs them.
    ///
    /// Raised before any network call is made.
    #[error("missing required fields: {}", .missing.join(", "))]
    Incomplete { missing: Vec<&'static str> },

    /// The entity has no handler registered under the requested method name.
    #[error("method {method:?} is not implemented for {entity}")]
    UnsupportedMethod { entity: &'static str, method: String },

    /// Keyword arguments that are neither a field nor a handler argument.
    #[error("{entity}.{method} got unexpected arguments: {}", .names.join(", "))]
    UnexpectedArguments {
        entity: &'static str,
        method: &'static str,
        names: Vec<String>,
    },

    /// A session was popped from an empty stack.
    #[error("session stack underflow")]
    StackUnderflow,

    /// No scoped session is active and no default session was set.
    #[error("no session is active in this context and no default session is defined")]
    NoSessionConfigured,

    /// A page index beyond the known number of pages.
    #[error("page index {index} is out of range for {size} pages")]
    IndexOutOfRange { index: isize, size: u32 },

    /// A negative page index on a sequence whose size is not known yet.
    #[error("page index {index} cannot wrap around before the page count is known")]
    UnknownSize { index: isize },

    /// A response did not have the structure the scraper expects.
    #[error("failed to parse {what}: {detail}")]
    Parse { what: &'static str, detail: String },

    /// The transport could not complete the exchange.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid client configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Creates a [`Error::Request`] carrying `response`.
    pub fn request(message: impl Into<String>, response: HttpResponse) -> Self {
        Self::Request {
            message: message.into(),
            response: Box::new(response),
        }
    }

    /// Creates a [`Error::Incomplete`] from `(is_missing, field_name)` pairs.
    pub fn incomplete(fields: impl IntoIterator<Item = (bool, &'static str)>) -> Self {
        Self::Incomplete {
            missing: fields
                .into_iter()
                .filter_map(|(missing, name)| missing.then_some(name))
                .collect(),
        }
    }

    pub(crate) fn parse(what: &'static str, detail: impl Into<String>) -> Self {
        Self::Parse {
            what,
            detail: detail.into(),
        }
    }

    /// Returns `true` if the transport gave up waiting for the server.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Http(err) if err.is_timeout())
    }

    /// Returns `true` for errors reported by the forum itself.
    pub fn is_request(&self) -> bool {
        matches!(self, Self::Request { .. })
    }

    /// The server response that caused this error, if any.
    pub fn response(&self) -> Option<&HttpResponse> {
        match self {
            Self::Request { response, .. } => Some(response),
            _ => None,
        }
    }
}

/// Returns `Ok` with the values of every listed `Option` field of an entity,
/// or [`Error::Incomplete`] naming each field that is `None`.
///
/// ```ignore
/// let (mid, tid) = require!(message; mid, tid)?;
/// ```
macro_rules! require {
    ($entity:expr; $($field:ident),+ $(,)?) => {
        match ($( $entity.$field.clone(), )+) {
            ($( Some($field), )+) => Ok(($( $field, )+)),
            _ => Err($crate::error::Error::incomplete([
                $( ($entity.$field.is_none(), stringify!($field)) ),+
            ])),
        }
    };
}

pub(crate) use require;
