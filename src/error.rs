//! Error types for cmapapi.

/// Result type alias for cmapapi operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for cmapapi operations.
#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional source error.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Create a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, source: None }
    }

    /// Create a new error with the given kind and source.
    pub fn with_source(
        kind: ErrorKind,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
        }
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidParameter(msg.into()))
    }

    /// Returns true if the failure is transient (connection trouble or a
    /// retriable HTTP status).
    pub fn is_retryable(&self) -> bool {
        match &self.kind {
            ErrorKind::TransportError(_) => true,
            ErrorKind::ServerError { status, .. } => crate::util::retriable_status(*status),
            _ => false,
        }
    }

    /// HTTP status carried by a [`ErrorKind::ServerError`].
    pub fn status(&self) -> Option<u16> {
        match &self.kind {
            ErrorKind::ServerError { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// The kind of error that occurred.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// No API key could be found at the point of use.
    #[error("missing API key: {0}")]
    MissingCredential(String),

    /// The request could not be encoded into a URL.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// Connection failure or timeout.
    #[error("transport error: {0}")]
    TransportError(String),

    /// Non-success HTTP status. The body is never decoded into a table.
    #[error("server error: HTTP {status}\n{message}")]
    ServerError { status: u16, message: String },

    /// The response body could not be decoded into a table.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// A lookup the operation depends on returned nothing usable.
    #[error("data unavailable: {0}")]
    DataUnavailable(String),

    /// The requested table is larger than one request may return.
    #[error("row limit exceeded: {rows} rows (limit {limit}). {hint}")]
    RowLimitExceeded { rows: u64, limit: u64, hint: String },

    /// A name lookup matched more than one record.
    #[error("ambiguous lookup: {0}")]
    AmbiguousLookup(String),

    /// A name lookup matched no record.
    #[error("not found: {0}")]
    NotFound(String),

    /// An argument failed validation before any request was sent.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Reading or writing the persisted API key failed.
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            ErrorKind::TransportError(format!("request timed out: {}", err))
        } else if err.is_connect() {
            ErrorKind::TransportError(format!("could not connect: {}", err))
        } else if err.is_builder() {
            ErrorKind::MalformedRequest(err.to_string())
        } else {
            ErrorKind::TransportError(err.to_string())
        };

        Error::with_source(kind, err)
    }
}

impl From<serde_urlencoded::ser::Error> for Error {
    fn from(err: serde_urlencoded::ser::Error) -> Self {
        Error::with_source(ErrorKind::MalformedRequest(err.to_string()), err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::with_source(
            ErrorKind::MalformedRequest(format!("invalid URL: {}", err)),
            err,
        )
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::with_source(ErrorKind::MalformedResponse(err.to_string()), err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::with_source(ErrorKind::Storage(err.to_string()), err)
    }
}

/// Builds a [`ErrorKind::ServerError`] for a non-success response, adding
/// remediation hints for the common auth and routing failures.
pub(crate) fn server_error(status: u16, url: &str, body: &str) -> Error {
    let body = body.trim();
    let server_message = if body.is_empty() { "(empty body)" } else { body };

    let message = match status {
        401 | 403 => format!(
            "CMAP authentication/authorization failed.\n- Check that the API key is valid (set CMAP_API_KEY or `api_key:` in ~/.cmapapirc)\n- API keys are issued from your account page on simonscmap.com\n\nServer message: {}\nrequest: {}",
            server_message, url
        ),
        404 => format!(
            "CMAP API endpoint not found.\n- The configured base URL may be wrong (default https://simonscmap.com)\n\nServer message: {}\nrequest: {}",
            server_message, url
        ),
        _ => format!("request: {}\n{}", url, server_message),
    };

    Error::new(ErrorKind::ServerError { status, message })
}
