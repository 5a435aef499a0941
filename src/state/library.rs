use parking_lot::Mutex;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::dao::{MimeTypeDao, SearchRepository, StickerDao, TagDao};
use super::data::StickerRecord;
use crate::error::Result;

/// Upper bound on ids bound into a single `IN (...)` query
const MAX_BATCH: usize = 500;

const STICKER_COLUMNS: &str = "s.uuid, s.title, s.content_hash, s.create_time, s.modify_time";

/// The Library manages the SQLite sticker catalog.
/// It stores sticker records, their tags and their sniffed MIME types.
///
/// The connection sits behind a mutex so one Library can serve provider
/// calls arriving on arbitrary threads.
pub struct Library {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl Library {
    /// Open (or create) the catalog at `path` and initialize the schema.
    pub fn open(path: &Path) -> Result<Self> {
        // Ensure the parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA foreign_keys = ON;
            ",
        )?;

        info!("📁 Sticker catalog opened at: {}", path.display());

        let library = Library {
            conn: Mutex::new(conn),
            db_path: Some(path.to_path_buf()),
        };
        library.init_schema()?;
        Ok(library)
    }

    /// Open an in-memory catalog (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let library = Library {
            conn: Mutex::new(conn),
            db_path: None,
        };
        library.init_schema()?;
        Ok(library)
    }

    /// Initialize the database schema.
    /// Creates all necessary tables and indexes if they don't exist.
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS sticker (
                uuid            TEXT PRIMARY KEY NOT NULL,
                title           TEXT NOT NULL,
                content_hash    TEXT NOT NULL,
                create_time     INTEGER NOT NULL,
                modify_time     INTEGER
            )",
            [],
        )?;

        // Tags keep insertion order through the autoincrement id
        conn.execute(
            "CREATE TABLE IF NOT EXISTS tag (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                sticker_uuid    TEXT NOT NULL,
                tag             TEXT NOT NULL,
                FOREIGN KEY(sticker_uuid) REFERENCES sticker(uuid) ON DELETE CASCADE
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS mime_type (
                sticker_uuid    TEXT PRIMARY KEY NOT NULL,
                mime_type       TEXT NOT NULL,
                FOREIGN KEY(sticker_uuid) REFERENCES sticker(uuid) ON DELETE CASCADE
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_tag_sticker_uuid ON tag(sticker_uuid)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_sticker_recent
             ON sticker(COALESCE(modify_time, create_time) DESC)",
            [],
        )?;

        debug!("✅ Catalog schema initialized");
        Ok(())
    }

    /// Path of the database file, None for in-memory catalogs
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    pub fn sticker_count(&self) -> Result<i64> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM sticker", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn insert_sticker(&self, sticker: &StickerRecord) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO sticker (uuid, title, content_hash, create_time, modify_time)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                sticker.uuid,
                sticker.title,
                sticker.content_hash,
                sticker.create_time,
                sticker.modify_time,
            ],
        )?;
        Ok(())
    }

    /// Change a sticker's title and stamp its modification time
    pub fn update_title(&self, uuid: &str, title: &str, modify_time: i64) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE sticker SET title = ?1, modify_time = ?2 WHERE uuid = ?3",
            params![title, modify_time, uuid],
        )?;
        Ok(())
    }

    /// Replace all tags of a sticker
    pub fn set_tags(&self, uuid: &str, tags: &[String]) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM tag WHERE sticker_uuid = ?1", params![uuid])?;
        for tag in tags {
            tx.execute(
                "INSERT INTO tag (sticker_uuid, tag) VALUES (?1, ?2)",
                params![uuid, tag],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn set_mime_type(&self, uuid: &str, mime_type: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO mime_type (sticker_uuid, mime_type) VALUES (?1, ?2)",
            params![uuid, mime_type],
        )?;
        Ok(())
    }

    /// Delete a sticker; its tags and MIME type go with it
    pub fn delete_sticker(&self, uuid: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let changed = conn.execute("DELETE FROM sticker WHERE uuid = ?1", params![uuid])?;
        Ok(changed > 0)
    }

    /// Find a sticker by content hash, used to skip duplicate imports
    pub fn sticker_by_hash(&self, content_hash: &str) -> Result<Option<StickerRecord>> {
        let conn = self.conn.lock();
        let sticker = conn
            .query_row(
                &format!("SELECT {STICKER_COLUMNS} FROM sticker s WHERE s.content_hash = ?1 LIMIT 1"),
                params![content_hash],
                map_sticker,
            )
            .optional()?;
        Ok(sticker)
    }

    /// Get all stickers, newest first
    pub fn all_stickers(&self) -> Result<Vec<StickerRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {STICKER_COLUMNS} FROM sticker s
             ORDER BY COALESCE(s.modify_time, s.create_time) DESC"
        ))?;
        let stickers = stmt
            .query_map([], map_sticker)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(stickers)
    }

    /// Run a `SELECT key, value ... WHERE key IN (...)` query in batches
    fn batch_map<V: rusqlite::types::FromSql>(
        &self,
        sql_with_in: &str,
        uuids: &[String],
    ) -> Result<HashMap<String, V>> {
        let mut map = HashMap::new();
        if uuids.is_empty() {
            return Ok(map);
        }

        let conn = self.conn.lock();
        for chunk in uuids.chunks(MAX_BATCH) {
            let sql = sql_with_in.replace("{ids}", &placeholders(chunk.len()));
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(chunk.iter()), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, V>(1)?))
            })?;
            for row in rows {
                let (key, value) = row?;
                map.insert(key, value);
            }
        }
        Ok(map)
    }
}

impl StickerDao for Library {
    fn sticker_modified(&self, uuids: &[String]) -> Result<HashMap<String, i64>> {
        self.batch_map(
            "SELECT uuid, modify_time FROM sticker
             WHERE uuid IN ({ids}) AND modify_time IS NOT NULL",
            uuids,
        )
    }

    fn sticker_titles(&self, uuids: &[String]) -> Result<HashMap<String, String>> {
        self.batch_map("SELECT uuid, title FROM sticker WHERE uuid IN ({ids})", uuids)
    }

    fn recent_modified_stickers(&self, limit: usize) -> Result<Vec<StickerRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {STICKER_COLUMNS} FROM sticker s
             ORDER BY COALESCE(s.modify_time, s.create_time) DESC
             LIMIT ?1"
        ))?;
        let stickers = stmt
            .query_map(params![limit as i64], map_sticker)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(stickers)
    }
}

impl TagDao for Library {
    fn tag_string_map(&self, uuids: &[String]) -> Result<HashMap<String, String>> {
        self.batch_map(
            "SELECT sticker_uuid, group_concat(tag, ',') FROM (
                SELECT sticker_uuid, tag FROM tag
                WHERE sticker_uuid IN ({ids})
                ORDER BY id
             )
             GROUP BY sticker_uuid",
            uuids,
        )
    }
}

impl MimeTypeDao for Library {
    fn sticker_mime_types(&self, uuids: &[String]) -> Result<HashMap<String, String>> {
        self.batch_map(
            "SELECT sticker_uuid, mime_type FROM mime_type WHERE sticker_uuid IN ({ids})",
            uuids,
        )
    }
}

impl SearchRepository for Library {
    /// Every whitespace-separated term must appear in the title or in one of the tags.
    /// A blank query matches everything.
    fn search_stickers(&self, query: &str) -> Result<Vec<StickerRecord>> {
        let terms: Vec<String> = query
            .split_whitespace()
            .map(|term| format!("%{}%", escape_like(term)))
            .collect();

        let mut sql = format!("SELECT {STICKER_COLUMNS} FROM sticker s WHERE 1 = 1");
        for i in 1..=terms.len() {
            sql.push_str(&format!(
                " AND (s.title LIKE ?{i} ESCAPE '\\'
                   OR EXISTS (SELECT 1 FROM tag t
                              WHERE t.sticker_uuid = s.uuid AND t.tag LIKE ?{i} ESCAPE '\\'))"
            ));
        }
        sql.push_str(" ORDER BY COALESCE(s.modify_time, s.create_time) DESC");

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        let stickers = stmt
            .query_map(params_from_iter(terms.iter()), map_sticker)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(stickers)
    }
}

fn map_sticker(row: &Row<'_>) -> rusqlite::Result<StickerRecord> {
    Ok(StickerRecord {
        uuid: row.get(0)?,
        title: row.get(1)?,
        content_hash: row.get(2)?,
        create_time: row.get(3)?,
        modify_time: row.get(4)?,
    })
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(",")
}

fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

// Implement Debug for better error messages
impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("db_path", &self.db_path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sticker(uuid: &str, title: &str, create_time: i64, modify_time: Option<i64>) -> StickerRecord {
        StickerRecord {
            uuid: uuid.to_string(),
            title: title.to_string(),
            content_hash: format!("hash-{uuid}"),
            create_time,
            modify_time,
        }
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn seeded() -> Library {
        let library = Library::open_in_memory().unwrap();
        library.insert_sticker(&sticker("abc", "", 100, None)).unwrap();
        library.insert_sticker(&sticker("def", "Happy Dog", 200, Some(900))).unwrap();
        library.insert_sticker(&sticker("ghi", "Sad cat", 300, Some(500))).unwrap();
        library.set_tags("abc", &ids(&["cat", "funny"])).unwrap();
        library.set_tags("def", &ids(&["dog"])).unwrap();
        library.set_mime_type("abc", "image/png").unwrap();
        library.set_mime_type("def", "image/gif").unwrap();
        library
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("rays.db");
        let library = Library::open(&db_path).unwrap();
        assert!(db_path.exists());
        assert_eq!(library.path(), Some(db_path.as_path()));
        assert_eq!(library.sticker_count().unwrap(), 0);
    }

    #[test]
    fn test_batch_lookups_only_return_requested_ids() {
        let library = seeded();
        let wanted = ids(&["abc", "def", "missing"]);

        let titles = library.sticker_titles(&wanted).unwrap();
        assert_eq!(titles.len(), 2);
        assert_eq!(titles["abc"], "");
        assert_eq!(titles["def"], "Happy Dog");
        assert!(!titles.contains_key("ghi"));

        let modified = library.sticker_modified(&wanted).unwrap();
        assert_eq!(modified.len(), 1);
        assert_eq!(modified["def"], 900);

        let mimes = library.sticker_mime_types(&wanted).unwrap();
        assert_eq!(mimes.len(), 2);
        assert_eq!(mimes["def"], "image/gif");
    }

    #[test]
    fn test_empty_batch() {
        let library = seeded();
        assert!(library.sticker_titles(&[]).unwrap().is_empty());
        assert!(library.tag_string_map(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_tag_string_keeps_insertion_order() {
        let library = seeded();
        let tags = library.tag_string_map(&ids(&["abc", "ghi"])).unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags["abc"], "cat,funny");
    }

    #[test]
    fn test_recent_orders_by_modify_then_create_time() {
        let library = seeded();
        let recent = library.recent_modified_stickers(2).unwrap();
        let uuids: Vec<&str> = recent.iter().map(|s| s.uuid.as_str()).collect();
        assert_eq!(uuids, vec!["def", "ghi"]);
    }

    #[test]
    fn test_search_matches_title_and_tags() {
        let library = seeded();

        let by_tag = library.search_stickers("funny").unwrap();
        assert_eq!(by_tag.len(), 1);
        assert_eq!(by_tag[0].uuid, "abc");

        // "cat" hits the title of ghi and a tag of abc
        let by_both = library.search_stickers("CAT").unwrap();
        let mut uuids: Vec<&str> = by_both.iter().map(|s| s.uuid.as_str()).collect();
        uuids.sort();
        assert_eq!(uuids, vec!["abc", "ghi"]);

        // All terms must match
        assert!(library.search_stickers("cat dog").unwrap().is_empty());

        assert_eq!(library.search_stickers("  ").unwrap().len(), 3);
    }

    #[test]
    fn test_search_escapes_wildcards() {
        let library = seeded();
        assert!(library.search_stickers("%").unwrap().is_empty());
    }

    #[test]
    fn test_delete_cascades() {
        let library = seeded();
        assert!(library.delete_sticker("abc").unwrap());
        assert!(library.tag_string_map(&ids(&["abc"])).unwrap().is_empty());
        assert!(library.sticker_mime_types(&ids(&["abc"])).unwrap().is_empty());
        assert!(!library.delete_sticker("abc").unwrap());
    }

    #[test]
    fn test_sticker_by_hash() {
        let library = seeded();
        assert_eq!(library.sticker_by_hash("hash-def").unwrap().unwrap().title, "Happy Dog");
        assert!(library.sticker_by_hash("hash-none").unwrap().is_none());
    }

    #[test]
    fn test_update_title_stamps_modify_time() {
        let library = seeded();
        library.update_title("abc", "Cat", 1_000).unwrap();
        let modified = library.sticker_modified(&ids(&["abc"])).unwrap();
        assert_eq!(modified["abc"], 1_000);
        assert_eq!(library.recent_modified_stickers(1).unwrap()[0].uuid, "abc");
    }
}
