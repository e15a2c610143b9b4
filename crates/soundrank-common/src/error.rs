use thiserror::Error;

#[derive(Debug, Error)]
pub enum SoundrankError {
    /// A required field is missing or mistyped in input data.
    #[error("Schema error in {context}: {message}")]
    Schema { context: String, message: String },

    /// A stage was invoked with zero rows.
    #[error("Empty input to stage '{stage}'")]
    EmptyInput { stage: &'static str },

    /// A denominator would be zero or a ratio would be undefined.
    #[error("Degenerate input for product '{product_id}': {reason}")]
    DegenerateInput { product_id: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SoundrankError {
    pub fn schema(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Schema { context: context.into(), message: message.into() }
    }

    pub fn degenerate(product_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DegenerateInput { product_id: product_id.into(), reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, SoundrankError>;
