use isskit_core::{SecurityError, ValidationError};
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Security(#[from] SecurityError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error("failed to format timestamp: {0}")]
    Timestamp(#[from] time::error::Format),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Security(error) => match error {
                SecurityError::InvalidArgument(_) => 2,
                SecurityError::DataNotFound { .. } => 3,
                SecurityError::UnsupportedAttribute { .. } => 4,
                SecurityError::Provider(_) => 6,
            },
            Self::Serialization(_) | Self::Timestamp(_) => 7,
            Self::Io(_) => 10,
        }
    }
}
