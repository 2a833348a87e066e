//! Error type for collaborator failures (download, file I/O, persistence)

use thiserror::Error;

use crate::models::ChannelId;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Request failed: {0}")]
    Http(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Channel {0} not found")]
    ChannelNotFound(ChannelId),
}

pub type Result<T> = std::result::Result<T, Error>;
