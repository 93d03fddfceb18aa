use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum PackError {
    #[error("invalid JSON in `{field}`: {message}")]
    #[diagnostic(code(bt_pack::invalid_input))]
    InvalidInput { field: String, message: String },

    #[error("{0}")]
    #[diagnostic(code(bt_pack::not_found))]
    NotFound(String),

    #[error("{0}")]
    #[diagnostic(code(bt_pack::ambiguous_match))]
    AmbiguousMatch(String),

    /// The upstream answered with a non-success status.
    ///
    /// Together with [`PackError::RemoteTransport`] this is the single "remote request failed"
    /// kind; [`PackError::is_remote_failure`] matches both.
    #[error("Braintrust returned status {status}: {message}")]
    RemoteRequestFailed { status: u16, message: String },

    /// The request never produced a response (connect, TLS or timeout failure). Same error
    /// kind as [`PackError::RemoteRequestFailed`], split out only to keep the status code.
    #[error("Braintrust request failed: {0}")]
    RemoteTransport(String),

    #[error("unexpected Braintrust response: {0}")]
    InvalidResponse(String),

    #[error("missing Braintrust API key (set BRAINTRUST_API_KEY)")]
    #[diagnostic(help("create an API key in the Braintrust organization settings"))]
    MissingCredential,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl PackError {
    /// Errors the host renders verbatim to the end user, as opposed to internal faults.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            PackError::InvalidInput { .. } | PackError::NotFound(_) | PackError::AmbiguousMatch(_)
        )
    }

    /// The "remote request failed" kind, whether or not a status came back.
    pub fn is_remote_failure(&self) -> bool {
        matches!(
            self,
            PackError::RemoteRequestFailed { .. } | PackError::RemoteTransport(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_failures_are_user_facing() {
        assert!(PackError::NotFound("no project".to_string()).is_user_facing());
        assert!(PackError::AmbiguousMatch("two".to_string()).is_user_facing());
        assert!(
            PackError::InvalidInput {
                field: "input".to_string(),
                message: "eof".to_string(),
            }
            .is_user_facing()
        );
        assert!(!PackError::MissingCredential.is_user_facing());
    }

    #[test]
    fn transport_and_status_are_remote() {
        let status = PackError::RemoteRequestFailed {
            status: 502,
            message: "bad gateway".to_string(),
        };
        assert!(status.is_remote_failure());
        assert!(!status.is_user_facing());
        let transport = PackError::RemoteTransport("timeout".to_string());
        assert!(transport.is_remote_failure());
        assert!(!transport.is_user_facing());
        assert_eq!(
            status.to_string(),
            "Braintrust returned status 502: bad gateway"
        );
    }
}
