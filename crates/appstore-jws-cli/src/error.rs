//! Error types for CLI operations

use appstore_jws::JwsError;
use thiserror::Error;

/// CLI errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Signing or verification failed
    #[error(transparent)]
    Jws(#[from] JwsError),

    /// A required setting is not in flags, environment or config file
    #[error("missing setting `{0}`")]
    MissingSetting(&'static str),

    /// Invalid command arguments
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),
}

impl CliError {
    /// User-facing hints for resolving the error
    #[must_use]
    pub fn suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::MissingSetting(_) => vec![
                "Pass the matching command-line flag",
                "Or set APPSTORE_JWS_<SETTING> in the environment",
                "Or add it to the file given with --config",
            ],
            Self::Jws(e) if e.is_untrusted() => vec![
                "The token is well formed but not signed by a trusted chain",
                "Check that --trust-anchor points at the expected root certificate",
            ],
            Self::Jws(e) if e.is_malformed() => {
                vec!["The input is not a compact ES256 token with an x5c header"]
            }
            Self::Jws(JwsError::SigningFailed { .. }) => vec![
                "The private key must be a P-256 key in PKCS#8 (.p8) or SEC1 PEM form",
            ],
            _ => Vec::new(),
        }
    }
}

/// Result type for CLI operations
pub type CliResult<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;
    use appstore_jws::ChainStage;

    #[test]
    fn test_suggestions_follow_classification() {
        assert_eq!(CliError::MissingSetting("key_id").suggestions().len(), 3);

        let untrusted = CliError::from(JwsError::ChainValidation {
            stage: ChainStage::TrustAnchor,
            reason: "x".into(),
        });
        assert!(untrusted.suggestions()[1].contains("--trust-anchor"));

        let io = CliError::from(std::io::Error::other("boom"));
        assert!(io.suggestions().is_empty());
    }

    #[test]
    fn test_jws_errors_display_transparently() {
        let err = CliError::from(JwsError::UnsupportedAlgorithm {
            algorithm: "HS256".into(),
        });
        assert_eq!(err.to_string(), "unsupported algorithm: HS256");
    }
}
