/// Shared data structures for the catalog
///
/// These structs mirror rows of the sticker database and flow between
/// the catalog layer and the provider.
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Represents a single sticker in the catalog
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StickerRecord {
    /// Opaque, immutable id; also the sticker's file name under the sticker root
    pub uuid: String,
    /// Display title, may be blank (tags are used instead)
    pub title: String,
    /// Hex digest of the sticker file content
    pub content_hash: String,
    /// Creation time in milliseconds since the Unix epoch
    pub create_time: i64,
    /// Last modification time in milliseconds, None if never modified
    pub modify_time: Option<i64>,
}

impl StickerRecord {
    /// Create a fresh record with a random id, created now
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            uuid: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            content_hash: String::new(),
            create_time: now_millis(),
            modify_time: None,
        }
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Milliseconds since the Unix epoch for a filesystem timestamp
pub fn system_time_millis(time: SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_has_unique_id() {
        let a = StickerRecord::new("cat");
        let b = StickerRecord::new("cat");
        assert_ne!(a.uuid, b.uuid);
        assert!(a.modify_time.is_none());
        assert!(a.create_time > 0);
    }
}
