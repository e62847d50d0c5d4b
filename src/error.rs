//! Crate error type.

use std::path::PathBuf;

use crate::distributions::DistributionError;

/// Errors raised while loading data or running an analysis stage.
#[derive(Debug, thiserror::Error)]
pub enum ZetaError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed record at line {line}: {reason} ({text:?})")]
    Malformed {
        line: usize,
        text: String,
        reason: String,
    },

    #[error("Dataset is empty: {0}")]
    EmptyDataset(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<DistributionError> for ZetaError {
    fn from(e: DistributionError) -> Self {
        ZetaError::InvalidParameter(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ZetaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = ZetaError::Malformed {
            line: 12,
            text: "abc".into(),
            reason: "not a number".into(),
        };
        assert_eq!(
            e.to_string(),
            "Malformed record at line 12: not a number (\"abc\")"
        );

        let e = ZetaError::Io {
            path: PathBuf::from("zeros.txt"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(e.to_string().starts_with("I/O error on zeros.txt"));
    }

    #[test]
    fn test_distribution_error_converts() {
        let e: ZetaError = DistributionError::InvalidParameters("p = 2".into()).into();
        assert!(matches!(e, ZetaError::InvalidParameter(_)));
    }
}
