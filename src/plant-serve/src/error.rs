//! Failure categories shared by every component.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// A startup artifact (model, labels, metadata) is not available
    #[error("asset missing: {0}")]
    AssetMissing(String),

    /// The request carried missing or undecodable data
    #[error("bad input: {0}")]
    BadInput(String),

    /// The model could not produce a prediction
    #[error("inference failed: {0}")]
    InferenceFailed(String),

    /// The identity token was rejected or could not be checked
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// Writing the user record failed
    #[error("user store write failed: {0}")]
    StoreWriteFailed(String),
}

/// Fieldless view of [`Error`], used to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    AssetMissing,
    BadInput,
    InferenceFailed,
    AuthFailed,
    StoreWriteFailed,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::AssetMissing(_) => ErrorKind::AssetMissing,
            Error::BadInput(_) => ErrorKind::BadInput,
            Error::InferenceFailed(_) => ErrorKind::InferenceFailed,
            Error::AuthFailed(_) => ErrorKind::AuthFailed,
            Error::StoreWriteFailed(_) => ErrorKind::StoreWriteFailed,
        }
    }
}

impl From<tensorflow::Status> for Error {
    fn from(status: tensorflow::Status) -> Self {
        Error::InferenceFailed(status.to_string())
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Error::StoreWriteFailed(err.to_string())
    }
}
