use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] barkeep_core::ValidationError),

    #[error(transparent)]
    Fetch(#[from] barkeep_core::FetchError),

    #[error(transparent)]
    Audit(#[from] barkeep_core::AuditError),

    #[error(transparent)]
    Store(#[from] barkeep_core::WarehouseError),

    #[error("invalid date '{value}', expected YYYY-MM-DD")]
    InvalidDate { value: String },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) | Self::InvalidDate { .. } => 2,
            Self::Fetch(_) | Self::Audit(_) | Self::Store(_) => 10,
            Self::Serialization(_) | Self::Io(_) => 10,
        }
    }
}
