/// Error types shared by the catalog, the media helpers and the provider.
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("SQLite error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
    #[error("{0}")]
    DocumentNotFound(String),
    #[error("Bad mode: {0}")]
    InvalidMode(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, ProviderError>;
