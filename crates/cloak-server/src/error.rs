//! CLI error types with miette diagnostics.
//!
//! Maps `cloak_api::Error` and `ConfigError` into user-facing errors with
//! exit codes and help text.

use miette::Diagnostic;
use thiserror::Error;

use cloak_api::ApiError;
use cloak_config::ConfigError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Server API ───────────────────────────────────────────────────
    #[error("{}", .0.message())]
    #[diagnostic(code(cloak::api_error))]
    Api(Box<ApiError>),

    #[error("Unexpected response from the server: {message}")]
    #[diagnostic(code(cloak::bad_response))]
    BadResponse { message: String },

    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to {url}")]
    #[diagnostic(
        code(cloak::connection_failed),
        help("Check the network and the base URL (--base-url).")
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("TLS setup failed: {reason}")]
    #[diagnostic(
        code(cloak::tls_error),
        help("Check the --ca-cert bundle, or use --insecure (-k) against a test server.")
    )]
    Tls { reason: String },

    #[error("Request timed out")]
    #[diagnostic(code(cloak::timeout), help("Increase the timeout with --timeout."))]
    Timeout,

    // ── Usage ────────────────────────────────────────────────────────
    #[error("This server is not registered")]
    #[diagnostic(
        code(cloak::no_credentials),
        help(
            "Register it first: cloak-server register --target <id>\n\
             Config file: {path}"
        )
    )]
    NoCredentials { path: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(cloak::validation))]
    Validation { field: String, reason: String },

    #[error("Unusable private key: {reason}")]
    #[diagnostic(
        code(cloak::key),
        help("Pass a PEM-encoded PKCS#8 private key with --key.")
    )]
    Key { reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(cloak::config))]
    Config(ConfigError),

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Tls { .. } => exit_code::CONNECTION,
            Self::Timeout => exit_code::TIMEOUT,
            Self::NoCredentials { .. } | Self::Validation { .. } | Self::Key { .. } => {
                exit_code::USAGE
            }
            Self::Api(_) | Self::BadResponse { .. } | Self::Config(_) | Self::Io(_) => {
                exit_code::GENERAL
            }
        }
    }

    /// Plain stderr lines for a server rejection: one `Error: <message>`
    /// per field message, else the body text, else the status reason.
    pub fn api_lines(&self) -> Option<Vec<String>> {
        let Self::Api(err) = self else {
            return None;
        };
        let lines = match err.field_messages() {
            Some(messages) if !messages.is_empty() => {
                messages.iter().map(|m| format!("Error: {m}")).collect()
            }
            _ if !err.body().trim().is_empty() => vec![err.body().to_owned()],
            _ => vec![err.reason().to_owned()],
        };
        Some(lines)
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(other),
        }
    }
}

// ── cloak_api::Error → CliError mapping ──────────────────────────────

impl From<cloak_api::Error> for CliError {
    fn from(err: cloak_api::Error) -> Self {
        use cloak_api::Error as E;

        match err {
            E::Api(api) => Self::Api(api),
            E::Transport(e) if e.is_timeout() => Self::Timeout,
            E::Transport(e) => Self::ConnectionFailed {
                url: e
                    .url()
                    .map_or_else(|| "(unknown)".into(), ToString::to_string),
                source: Box::new(e),
            },
            E::Tls(reason) => Self::Tls { reason },
            E::InvalidUrl(e) => Self::Validation {
                field: "base_url".into(),
                reason: e.to_string(),
            },
            E::InvalidHeader { name, reason } => Self::Validation {
                field: name,
                reason,
            },
            E::Deserialization { message, .. } => Self::BadResponse { message },
            E::InvalidKey(reason) | E::Csr(reason) => Self::Key { reason },
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use cloak_api::{Error, HeaderMap, StatusCode};

    use super::*;

    fn api_error(status: u16, body: &str) -> CliError {
        let status = StatusCode::from_u16(status).unwrap();
        Error::from(ApiError::new(status, HeaderMap::new(), body.into())).into()
    }

    #[test]
    fn field_messages_become_error_lines() {
        let err = api_error(
            400,
            concat!(
                r#"{"errors": {"email": [{"message": "Unknown account."}], "#,
                r#""target": [{"message": "No such target."}]}}"#,
            ),
        );
        let mut lines = err.api_lines().unwrap();
        lines.sort();
        assert_eq!(lines, vec!["Error: No such target.", "Error: Unknown account."]);
        assert_eq!(err.exit_code(), exit_code::GENERAL);
    }

    #[test]
    fn plain_body_is_printed_verbatim() {
        let err = api_error(502, "upstream down");
        assert_eq!(err.api_lines().unwrap(), vec!["upstream down"]);
    }

    #[test]
    fn empty_body_falls_back_to_reason() {
        let err = api_error(403, "");
        assert_eq!(err.api_lines().unwrap(), vec!["Forbidden"]);
    }

    #[test]
    fn usage_errors_exit_2() {
        let err = CliError::NoCredentials { path: "/x".into() };
        assert_eq!(err.exit_code(), exit_code::USAGE);
        assert!(err.api_lines().is_none());

        let err: CliError = Error::InvalidKey("bad".into()).into();
        assert!(matches!(err, CliError::Key { .. }));
        assert_eq!(err.exit_code(), exit_code::USAGE);
    }

    #[test]
    fn bad_json_maps_to_bad_response() {
        let err: CliError = Error::Deserialization {
            message: "expected value".into(),
            body: "<html>".into(),
        }
        .into();
        assert!(matches!(err, CliError::BadResponse { .. }));
        assert_eq!(err.exit_code(), exit_code::GENERAL);
    }
}
