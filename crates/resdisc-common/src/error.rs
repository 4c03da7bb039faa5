use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResdiscError {
    #[error("Value out of range: {0}")]
    OutOfRange(String),

    #[error("Invalid address format: {0}")]
    Format(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("Remote fault {code}: {message}")]
    Fault { code: i64, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<data_encoding::DecodeError> for ResdiscError {
    fn from(err: data_encoding::DecodeError) -> Self {
        ResdiscError::Format(err.to_string())
    }
}

impl From<std::str::Utf8Error> for ResdiscError {
    fn from(err: std::str::Utf8Error) -> Self {
        ResdiscError::InvalidResponse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ResdiscError>;
