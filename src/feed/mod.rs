use thiserror::Error;

pub mod protocol;
#[cfg(feature = "async")]
pub mod client;

pub use protocol::*;
#[cfg(feature = "async")]
pub use client::*;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing field '{0}'")]
    MissingField(&'static str),

    #[error("Invalid position: {0}")]
    InvalidPosition(String),

    #[error("Unknown message type: {0}")]
    UnknownType(String),

    #[error("Malformed message: {0}")]
    Malformed(String),

    #[cfg(feature = "async")]
    #[error("Transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    #[cfg(feature = "async")]
    #[error("Feed consumer went away")]
    ChannelClosed,
}

impl FeedError {
    /// Payload problems are dropped at the boundary; everything else is a
    /// connection problem.
    pub fn is_payload_error(&self) -> bool {
        matches!(
            self,
            FeedError::Json(_)
                | FeedError::MissingField(_)
                | FeedError::InvalidPosition(_)
                | FeedError::UnknownType(_)
                | FeedError::Malformed(_)
        )
    }
}

pub type FeedResult<T> = Result<T, FeedError>;
