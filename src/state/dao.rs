/// Narrow catalog capabilities consumed by the provider
///
/// Each trait is one lookup surface. The SQLite [`Library`](super::library::Library)
/// implements all of them; tests plug in small in-memory fakes.
use std::collections::HashMap;

use super::data::StickerRecord;
use crate::error::Result;

/// Batch metadata lookups over sticker records
pub trait StickerDao: Send + Sync {
    /// id -> last modification time (ms). Stickers never modified are left out.
    fn sticker_modified(&self, uuids: &[String]) -> Result<HashMap<String, i64>>;

    /// id -> stored title (possibly blank)
    fn sticker_titles(&self, uuids: &[String]) -> Result<HashMap<String, String>>;

    /// Most recently modified stickers, newest first
    fn recent_modified_stickers(&self, limit: usize) -> Result<Vec<StickerRecord>>;
}

/// Tag aggregation
pub trait TagDao: Send + Sync {
    /// id -> tags joined with ',' for every requested id that has tags
    fn tag_string_map(&self, uuids: &[String]) -> Result<HashMap<String, String>>;
}

/// Sniffed MIME types stored at import time
pub trait MimeTypeDao: Send + Sync {
    fn sticker_mime_types(&self, uuids: &[String]) -> Result<HashMap<String, String>>;
}

/// Free-text search over titles and tags
pub trait SearchRepository: Send + Sync {
    fn search_stickers(&self, query: &str) -> Result<Vec<StickerRecord>>;
}
