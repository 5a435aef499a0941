//! The host document-provider surface: column names, flags and the
//! [`DocumentsProvider`] trait every provider implements.

use std::sync::atomic::{AtomicBool, Ordering};

use super::cursor::Cursor;
use super::handle::{DocumentHandle, ThumbnailHandle};
use crate::error::Result;
pub use crate::media::thumbnail::SizeHint;

/// Columns of a root row
pub mod root {
    pub const COLUMN_ROOT_ID: &str = "root_id";
    pub const COLUMN_MIME_TYPES: &str = "mime_types";
    pub const COLUMN_FLAGS: &str = "flags";
    pub const COLUMN_ICON: &str = "icon";
    pub const COLUMN_TITLE: &str = "title";
    pub const COLUMN_SUMMARY: &str = "summary";
    pub const COLUMN_DOCUMENT_ID: &str = "document_id";
    pub const COLUMN_AVAILABLE_BYTES: &str = "available_bytes";

    pub const FLAG_SUPPORTS_CREATE: i64 = 1;
    pub const FLAG_LOCAL_ONLY: i64 = 1 << 1;
    pub const FLAG_SUPPORTS_RECENTS: i64 = 1 << 2;
    pub const FLAG_SUPPORTS_SEARCH: i64 = 1 << 3;
    pub const FLAG_SUPPORTS_IS_CHILD: i64 = 1 << 4;

    pub const DEFAULT_COLUMNS: &[&str] = &[
        COLUMN_ROOT_ID,
        COLUMN_MIME_TYPES,
        COLUMN_FLAGS,
        COLUMN_ICON,
        COLUMN_TITLE,
        COLUMN_SUMMARY,
        COLUMN_DOCUMENT_ID,
        COLUMN_AVAILABLE_BYTES,
    ];
}

/// Columns of a document row
pub mod document {
    pub const COLUMN_DOCUMENT_ID: &str = "document_id";
    pub const COLUMN_MIME_TYPE: &str = "mime_type";
    pub const COLUMN_DISPLAY_NAME: &str = "_display_name";
    pub const COLUMN_LAST_MODIFIED: &str = "last_modified";
    pub const COLUMN_FLAGS: &str = "flags";
    pub const COLUMN_SIZE: &str = "_size";
    pub const COLUMN_SUMMARY: &str = "summary";
    pub const COLUMN_ICON: &str = "icon";

    pub const MIME_TYPE_DIR: &str = "vnd.android.document/directory";

    pub const FLAG_SUPPORTS_THUMBNAIL: i64 = 1;

    pub const DEFAULT_COLUMNS: &[&str] = &[
        COLUMN_DOCUMENT_ID,
        COLUMN_MIME_TYPE,
        COLUMN_DISPLAY_NAME,
        COLUMN_LAST_MODIFIED,
        COLUMN_FLAGS,
        COLUMN_SIZE,
    ];
}

/// Cancellation flag passed along by the host. Long operations may poll it.
#[derive(Debug, Default)]
pub struct CancellationSignal {
    canceled: AtomicBool,
}

impl CancellationSignal {
    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }
}

/// Operations the host invokes on a document provider.
///
/// Calls may arrive on any thread and block the caller until done.
pub trait DocumentsProvider: Send + Sync {
    fn query_roots(&self, projection: Option<&[&str]>) -> Result<Cursor>;

    fn query_document(&self, document_id: &str, projection: Option<&[&str]>) -> Result<Cursor>;

    fn query_child_documents(
        &self,
        parent_document_id: Option<&str>,
        projection: Option<&[&str]>,
        sort_order: Option<&str>,
    ) -> Result<Cursor>;

    fn open_document(
        &self,
        document_id: &str,
        mode: &str,
        signal: Option<&CancellationSignal>,
    ) -> Result<DocumentHandle>;

    fn open_document_thumbnail(
        &self,
        document_id: &str,
        size_hint: SizeHint,
        signal: Option<&CancellationSignal>,
    ) -> Result<ThumbnailHandle>;

    fn query_recent_documents(
        &self,
        root_id: Option<&str>,
        projection: Option<&[&str]>,
    ) -> Result<Cursor>;

    fn query_search_documents(
        &self,
        root_id: Option<&str>,
        query: Option<&str>,
        projection: Option<&[&str]>,
    ) -> Result<Cursor>;

    fn is_child_document(&self, parent_document_id: Option<&str>, document_id: Option<&str>) -> bool;
}
