use thiserror::Error;

#[derive(Error, Debug)]
pub enum FxError {
    #[error("Invalid currency pair: {0}")]
    InvalidPair(String),

    #[error("Unknown currency pair: {0}")]
    UnknownPair(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Rate source error: {0}")]
    SourceError(String),
}
