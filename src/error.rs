use thiserror::Error;

#[derive(Error, Debug)]
pub enum WipeError {
    #[error("Unknown method: {0}")]
    InvalidMethod(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("Short write: {written} of {expected} bytes")]
    ShortWrite { expected: usize, written: usize },

    #[error("Verification failed on pass {pass}")]
    VerificationFailed { pass: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl WipeError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, WipeError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, WipeError>;
