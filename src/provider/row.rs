/// Document rows
///
/// Turns one filesystem path into the row the host displays: id, MIME type,
/// a human display name, size, timestamp and capability flags.
use chrono::{Local, TimeZone};
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use tracing::warn;

use super::contract::document;
use super::cursor::Cursor;
use crate::media::format::{self, ImageFormat};
use crate::state::data::system_time_millis;

/// One row of a document listing. Built fresh per query, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRow {
    pub document_id: String,
    pub mime_type: Option<String>,
    pub display_name: Option<String>,
    pub size: u64,
    pub last_modified: i64,
    pub flags: Option<i64>,
}

impl DocumentRow {
    pub fn write_to(&self, cursor: &mut Cursor) {
        let mut row = cursor.new_row();
        row.add(document::COLUMN_DOCUMENT_ID, self.document_id.as_str());
        if let Some(mime_type) = &self.mime_type {
            row.add(document::COLUMN_MIME_TYPE, mime_type.as_str());
        }
        if let Some(flags) = self.flags {
            row.add(document::COLUMN_FLAGS, flags);
        }
        if let Some(display_name) = &self.display_name {
            row.add(document::COLUMN_DISPLAY_NAME, display_name.as_str());
        }
        row.add(document::COLUMN_SIZE, self.size);
        row.add(document::COLUMN_LAST_MODIFIED, self.last_modified);
    }
}

/// Short local date and time, e.g. "10/19/26, 3:04 PM"
pub fn format_short_date_time(millis: i64) -> String {
    match Local.timestamp_millis_opt(millis).single() {
        Some(time) => time.format("%-m/%-d/%y, %-I:%M %p").to_string(),
        None => millis.to_string(),
    }
}

/// Build the row for `path`.
///
/// `last_modified` overrides the file's own modification time. MIME types
/// missing from `mime_type_map` are sniffed from the file and memoized there.
/// A path that is neither a file nor a directory (e.g. removed since it was
/// listed) only gets its id, size and timestamp.
pub fn build_row(
    path: &Path,
    last_modified: Option<i64>,
    display_map: &HashMap<String, String>,
    mime_type_map: &mut HashMap<String, String>,
) -> DocumentRow {
    let metadata = path.metadata().ok();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_modified = metadata
        .as_ref()
        .and_then(|m| m.modified().ok())
        .map(system_time_millis)
        .unwrap_or(0);
    let modified = last_modified.unwrap_or(file_modified);

    let mut row = DocumentRow {
        document_id: path.to_string_lossy().into_owned(),
        mime_type: None,
        display_name: None,
        size: metadata.as_ref().map(|m| m.len()).unwrap_or(0),
        last_modified: modified,
        flags: None,
    };

    match &metadata {
        Some(m) if m.is_file() => {
            let mime_type = mime_type_map
                .entry(file_name.clone())
                .or_insert_with(|| sniff_mime_type(path, &file_name))
                .clone();

            let title = display_map
                .get(&file_name)
                .filter(|title| !title.trim().is_empty())
                .cloned()
                .unwrap_or_else(|| file_name.clone());
            let display_name = format!(
                "{} - {}{}",
                title,
                format_short_date_time(modified),
                ImageFormat::from_mime_type(&mime_type)
            );

            row.mime_type = Some(mime_type);
            row.flags = Some(document::FLAG_SUPPORTS_THUMBNAIL);
            row.display_name = Some(display_name);
        }
        Some(m) if m.is_dir() => {
            row.mime_type = Some(document::MIME_TYPE_DIR.to_string());
            row.display_name = Some(file_name);
        }
        _ => {}
    }

    row
}

fn sniff_mime_type(path: &Path, file_name: &str) -> String {
    let sniffed = File::open(path).and_then(|file| format::check(file, file_name));
    match sniffed {
        Ok(format) => format.to_mime_type().to_string(),
        Err(e) => {
            warn!("⚠️  Could not sniff {}: {}", path.display(), e);
            ImageFormat::Undefined.to_mime_type().to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_display_name_uses_tags_date_and_suffix() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("abc");
        fs::write(&path, PNG_HEADER).unwrap();
        let t = 1_700_000_000_000;

        let display = map(&[("abc", "cat,funny")]);
        let mut mimes = HashMap::new();
        let row = build_row(&path, Some(t), &display, &mut mimes);

        assert_eq!(
            row.display_name.as_deref(),
            Some(format!("cat,funny - {}.png", format_short_date_time(t)).as_str())
        );
        assert_eq!(row.mime_type.as_deref(), Some("image/png"));
        assert_eq!(row.flags, Some(document::FLAG_SUPPORTS_THUMBNAIL));
        assert_eq!(row.last_modified, t);
        assert_eq!(row.size, PNG_HEADER.len() as u64);
        // Sniffed type is memoized
        assert_eq!(mimes["abc"], "image/png");
    }

    #[test]
    fn test_blank_title_falls_back_to_file_name() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("abc");
        fs::write(&path, b"not an image").unwrap();

        let mut mimes = map(&[("abc", "image/gif")]);
        let row = build_row(&path, None, &map(&[("abc", " ")]), &mut mimes);

        let name = row.display_name.unwrap();
        assert!(name.starts_with("abc - "), "{name}");
        // Cached MIME type wins over sniffing
        assert!(name.ends_with(".gif"), "{name}");
        assert_eq!(row.mime_type.as_deref(), Some("image/gif"));
        assert!(row.last_modified > 0);
    }

    #[test]
    fn test_unknown_content_has_no_suffix() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("abc");
        fs::write(&path, b"plain").unwrap();

        let mut mimes = HashMap::new();
        let row = build_row(&path, Some(0), &HashMap::new(), &mut mimes);
        assert_eq!(row.mime_type.as_deref(), Some("image/*"));
        assert_eq!(
            row.display_name.as_deref(),
            Some(format!("abc - {}", format_short_date_time(0)).as_str())
        );
    }

    #[test]
    fn test_directory_row() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("nested");
        fs::create_dir(&sub).unwrap();

        let row = build_row(&sub, None, &HashMap::new(), &mut HashMap::new());
        assert_eq!(row.mime_type.as_deref(), Some(document::MIME_TYPE_DIR));
        assert_eq!(row.display_name.as_deref(), Some("nested"));
        assert_eq!(row.flags, None);
    }

    #[test]
    fn test_vanished_path_only_has_size_and_time() {
        let dir = tempdir().unwrap();
        let row = build_row(&dir.path().join("gone"), Some(42), &HashMap::new(), &mut HashMap::new());
        assert_eq!(row.mime_type, None);
        assert_eq!(row.display_name, None);
        assert_eq!(row.size, 0);
        assert_eq!(row.last_modified, 42);

        let mut cursor = Cursor::new(document::DEFAULT_COLUMNS);
        row.write_to(&mut cursor);
        assert_eq!(cursor.get_long(0, document::COLUMN_SIZE), Some(0));
        assert_eq!(cursor.get(0, document::COLUMN_MIME_TYPE), None);
    }
}
