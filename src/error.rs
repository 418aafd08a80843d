use thiserror::Error;

#[derive(Error, Debug)]
pub enum PracticeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize/deserialize data: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to decode question text: {0}")]
    Decode(String),

    #[error("Unknown contest: {0}")]
    UnknownContest(String),

    #[error("Terminal error: {0}")]
    Terminal(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<base64::DecodeError> for PracticeError {
    fn from(err: base64::DecodeError) -> Self {
        PracticeError::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PracticeError>;
