use thiserror::Error;

use crate::wire::WireError;

/// Errors surfaced by the directory and transfer protocol machinery
#[derive(Debug, Error)]
pub enum Error {
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error("peer closed the connection mid-session")]
    Disconnected,

    #[error("malformed registration message: {0}")]
    Registration(String),

    #[error("'{0}' is not a connection speed (expected slow, medium or fast)")]
    Speed(String),

    #[error("invalid transfer command '{0}'")]
    Command(String),

    #[error("invalid file name '{0}'")]
    FileName(String),

    #[error("'{0}' is not a host:port data endpoint")]
    DataEndpoint(String),

    #[error("invalid host identity: {0}")]
    Identity(String),
}

pub type Result<T> = std::result::Result<T, Error>;
