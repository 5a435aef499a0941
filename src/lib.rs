//! Sticker document provider
//!
//! Presents a personal sticker library (one image file per sticker plus a
//! SQLite catalog of titles, tags and MIME types) through a document-provider
//! interface, with content-sniffed formats and cached thumbnails.

pub mod config;
pub mod error;
pub mod media;
pub mod provider;
pub mod state;

pub use config::ProviderConfig;
pub use error::{ProviderError, Result};
pub use provider::{DocumentsProvider, StickerProvider};
pub use state::library::Library;
