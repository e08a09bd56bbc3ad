use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArchGraphError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Completion service error: {0}")]
    Completion(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

impl ArchGraphError {
    /// Infrastructure failures propagate to the caller; everything else is
    /// resolved inside the stage that observed it.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            ArchGraphError::Io(_) | ArchGraphError::Store(_) | ArchGraphError::Completion(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ArchGraphError>;
