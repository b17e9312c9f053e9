//! Error types shared across AEBridge crates.

use std::path::PathBuf;

/// Top-level error type for a bridge run.
///
/// The variants follow the run's failure taxonomy: configuration and graph
/// errors are fatal, `Cancelled` and `TimedOut` are interruptions that end
/// the run without being treated as failures by the caller.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Project graph error: {message}")]
    Graph { message: String },

    #[error("Output configuration error: {message}")]
    Output { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Run cancelled by user")]
    Cancelled,

    #[error("Run timed out after {idle_secs}s without progress")]
    TimedOut { idle_secs: u64 },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using BridgeError.
pub type BridgeResult<T> = Result<T, BridgeError>;

impl BridgeError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn graph(msg: impl Into<String>) -> Self {
        Self::Graph {
            message: msg.into(),
        }
    }

    pub fn output(msg: impl Into<String>) -> Self {
        Self::Output {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// True for user cancellation and inactivity timeouts.
    ///
    /// Interruptions are still recorded in the error status file but do not
    /// raise the user-facing failure report.
    pub fn is_interruption(&self) -> bool {
        matches!(self, Self::Cancelled | Self::TimedOut { .. })
    }

    /// True when the run stopped before any graph mutation could happen.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::FileNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interruptions_are_distinguished_from_failures() {
        assert!(BridgeError::Cancelled.is_interruption());
        assert!(BridgeError::TimedOut { idle_secs: 180 }.is_interruption());
        assert!(!BridgeError::graph("comp missing").is_interruption());
        assert!(!BridgeError::config("bad json").is_interruption());
    }

    #[test]
    fn display_prefixes_are_stable() {
        assert!(BridgeError::config("x")
            .to_string()
            .starts_with("Configuration error:"));
        assert!(BridgeError::graph("x")
            .to_string()
            .starts_with("Project graph error:"));
        assert_eq!(
            BridgeError::TimedOut { idle_secs: 180 }.to_string(),
            "Run timed out after 180s without progress"
        );
    }

    #[test]
    fn other_preserves_source() {
        let err = BridgeError::Other(anyhow::anyhow!("boom"));
        assert!(err.to_string().contains("boom"));
    }
}
