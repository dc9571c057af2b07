use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use thiserror::Error;

/// A response the server answered with a status outside `200..400`.
///
/// The body is read in full before the error is built, so callers can
/// inspect it after the connection has been released.
#[derive(Debug, Clone)]
pub struct ApiError {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

impl ApiError {
    pub fn new(status: StatusCode, headers: HeaderMap, body: String) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Raw response text, possibly empty.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// The canonical reason phrase for the status (e.g. `"Bad Request"`).
    pub fn reason(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or("Unknown Status")
    }

    /// Decode the body as JSON.
    pub fn json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_str(&self.body)
    }

    /// Flatten the API's validation envelope into a list of messages.
    ///
    /// The server reports problems as
    /// `{"errors": {"<field>": [{"message": "..."}, ...], ...}}`.
    /// Returns `None` when the body is not JSON or has no `errors` object.
    pub fn field_messages(&self) -> Option<Vec<String>> {
        let value = self.json().ok()?;
        let errors = value.get("errors")?.as_object()?;

        let messages = errors
            .values()
            .filter_map(serde_json::Value::as_array)
            .flatten()
            .filter_map(|entry| entry.get("message").and_then(serde_json::Value::as_str))
            .map(String::from)
            .collect();

        Some(messages)
    }

    /// Best human-readable summary: field messages, else body, else reason.
    pub fn message(&self) -> String {
        if let Some(messages) = self.field_messages() {
            if !messages.is_empty() {
                return messages.join("; ");
            }
        }
        if self.body.trim().is_empty() {
            self.reason().to_owned()
        } else {
            self.body.clone()
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HTTP {}: {}", self.status.as_u16(), self.message())
    }
}

impl std::error::Error for ApiError {}

/// Top-level error type for the `cloak-api` crate.
#[derive(Debug, Error)]
pub enum Error {
    // ── Server API ──────────────────────────────────────────────────
    /// The server rejected the call (status outside `200..400`).
    #[error("Server API error: {0}")]
    Api(Box<ApiError>),

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing or joining error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A header value could not be encoded.
    #[error("Invalid value for header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },

    /// TLS setup error (unreadable or malformed CA certificate).
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Data ────────────────────────────────────────────────────────
    /// The response body was not the JSON we expected, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Certificates ────────────────────────────────────────────────
    /// The private key could not be loaded.
    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    /// The certificate request could not be built or signed.
    #[error("CSR generation failed: {0}")]
    Csr(String),
}

impl From<ApiError> for Error {
    fn from(err: ApiError) -> Self {
        Self::Api(Box::new(err))
    }
}

impl Error {
    /// The server's rejection, if this error carries one.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(err) => Some(err),
            _ => None,
        }
    }

    /// HTTP status of the failing response, when there was one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api(err) => Some(err.status()),
            Self::Transport(e) => e.status(),
            _ => None,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    /// Returns `true` if the server refused our credentials.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self.status(),
            Some(StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
        )
    }
}
