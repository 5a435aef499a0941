use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::contract::{document, root, CancellationSignal, DocumentsProvider, SizeHint};
use super::cursor::Cursor;
use super::handle::{DocumentHandle, OpenMode, ThumbnailHandle};
use super::metadata::MetadataLookup;
use super::row::build_row;
use crate::config::ProviderConfig;
use crate::error::{ProviderError, Result};
use crate::media::thumbnail::ThumbnailCache;
use crate::state::dao::{MimeTypeDao, SearchRepository, StickerDao, TagDao};
use crate::state::data::StickerRecord;
use crate::state::library::Library;

/// Icon resource advertised on the root row
const ROOT_ICON: &str = "ic_launcher";

/// Catalog capabilities the provider is wired with
#[derive(Clone)]
pub struct ProviderDeps {
    pub sticker_dao: Arc<dyn StickerDao>,
    pub tag_dao: Arc<dyn TagDao>,
    pub mime_type_dao: Arc<dyn MimeTypeDao>,
    pub search_repo: Arc<dyn SearchRepository>,
}

impl ProviderDeps {
    /// Use one SQLite library for every capability
    pub fn from_library(library: Arc<Library>) -> Self {
        Self {
            sticker_dao: library.clone(),
            tag_dao: library.clone(),
            mime_type_dao: library.clone(),
            search_repo: library,
        }
    }
}

/// Document provider over the sticker root directory.
///
/// Every sticker is a file named by its id; titles, tags and MIME types come
/// from the catalog.
pub struct StickerProvider {
    config: ProviderConfig,
    deps: ProviderDeps,
    metadata: MetadataLookup,
    thumbnails: ThumbnailCache,
}

impl StickerProvider {
    pub fn new(config: ProviderConfig, deps: ProviderDeps) -> Self {
        let metadata = MetadataLookup::new(
            deps.sticker_dao.clone(),
            deps.tag_dao.clone(),
            deps.mime_type_dao.clone(),
        );
        let thumbnails = ThumbnailCache::new(&config.thumbnail_dir, config.thumbnail_encoding);
        Self {
            config,
            deps,
            metadata,
            thumbnails,
        }
    }

    pub fn with_library(config: ProviderConfig, library: Arc<Library>) -> Self {
        Self::new(config, ProviderDeps::from_library(library))
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn thumbnails(&self) -> &ThumbnailCache {
        &self.thumbnails
    }

    pub fn root_id() -> String {
        format!("{}.id", std::any::type_name::<StickerProvider>())
    }

    /// Expected file of a sticker under the sticker root
    pub fn sticker_path(&self, uuid: &str) -> PathBuf {
        self.config.sticker_dir.join(uuid)
    }

    /// Emit rows for catalog records whose files currently exist.
    /// The record's modification time, when set, overrides the file's.
    fn include_records(&self, cursor: &mut Cursor, records: Vec<StickerRecord>) -> Result<()> {
        let mut seen = HashMap::new();
        let mut files = Vec::new();
        for record in records {
            let path = self.sticker_path(&record.uuid);
            if !path.exists() {
                debug!("Skipping {}: no sticker file", record.uuid);
                continue;
            }
            if seen.insert(record.uuid.clone(), record.modify_time).is_none() {
                files.push((record.uuid, path));
            }
        }

        let uuids: Vec<String> = files.iter().map(|(uuid, _)| uuid.clone()).collect();
        let display_map = self.metadata.display_map(&uuids)?;
        let mut mime_type_map = self.metadata.mime_type_map(&uuids)?;

        for (uuid, path) in &files {
            let last_modified = seen.get(uuid).copied().flatten();
            build_row(path, last_modified, &display_map, &mut mime_type_map).write_to(cursor);
        }
        Ok(())
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl DocumentsProvider for StickerProvider {
    fn query_roots(&self, projection: Option<&[&str]>) -> Result<Cursor> {
        let mut cursor = Cursor::with_projection(projection, root::DEFAULT_COLUMNS);
        cursor
            .new_row()
            .add(root::COLUMN_ROOT_ID, Self::root_id())
            .add(root::COLUMN_SUMMARY, self.config.root_summary.as_str())
            .add(
                root::COLUMN_FLAGS,
                root::FLAG_LOCAL_ONLY
                    | root::FLAG_SUPPORTS_CREATE
                    | root::FLAG_SUPPORTS_IS_CHILD
                    | root::FLAG_SUPPORTS_RECENTS
                    | root::FLAG_SUPPORTS_SEARCH,
            )
            .add(root::COLUMN_TITLE, self.config.root_title.as_str())
            // Must not change once shared with the host
            .add(
                root::COLUMN_DOCUMENT_ID,
                self.config.sticker_dir.to_string_lossy().into_owned(),
            )
            .add(root::COLUMN_MIME_TYPES, "image/*")
            .add(root::COLUMN_ICON, ROOT_ICON);
        Ok(cursor)
    }

    fn query_document(&self, document_id: &str, projection: Option<&[&str]>) -> Result<Cursor> {
        let mut cursor = Cursor::with_projection(projection, document::DEFAULT_COLUMNS);
        let path = Path::new(document_id);
        let uuids = vec![file_name_of(path)];

        let modified_map = self.metadata.modified_map(&uuids)?;
        let display_map = self.metadata.display_map(&uuids)?;
        let mut mime_type_map = self.metadata.mime_type_map(&uuids)?;

        build_row(
            path,
            modified_map.get(&uuids[0]).copied(),
            &display_map,
            &mut mime_type_map,
        )
        .write_to(&mut cursor);
        Ok(cursor)
    }

    fn query_child_documents(
        &self,
        parent_document_id: Option<&str>,
        projection: Option<&[&str]>,
        sort_order: Option<&str>,
    ) -> Result<Cursor> {
        if let Some(order) = sort_order {
            debug!("Sort order {:?} is not applied to child listings", order);
        }

        let mut cursor = Cursor::with_projection(projection, document::DEFAULT_COLUMNS);
        let parent = parent_document_id
            .map(PathBuf::from)
            .unwrap_or_else(|| self.config.sticker_dir.clone());

        // A missing parent lists as empty
        let children: Vec<PathBuf> = WalkDir::new(&parent)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|entry| entry.into_path())
            .collect();

        let uuids: Vec<String> = children.iter().map(|p| file_name_of(p)).collect();
        let modified_map = self.metadata.modified_map(&uuids)?;
        let display_map = self.metadata.display_map(&uuids)?;
        let mut mime_type_map = self.metadata.mime_type_map(&uuids)?;

        for (child, uuid) in children.iter().zip(&uuids) {
            build_row(
                child,
                modified_map.get(uuid).copied(),
                &display_map,
                &mut mime_type_map,
            )
            .write_to(&mut cursor);
        }
        Ok(cursor)
    }

    fn open_document(
        &self,
        document_id: &str,
        mode: &str,
        _signal: Option<&CancellationSignal>,
    ) -> Result<DocumentHandle> {
        let access = OpenMode::parse(mode)?;
        let path = Path::new(document_id);

        match access.open(path) {
            Ok(file) => Ok(DocumentHandle::new(document_id, access, file)),
            Err(e) => {
                warn!("⚠️  Open {} ({}) failed: {}", document_id, mode, e);
                Err(ProviderError::DocumentNotFound(format!(
                    "Failed to open document with id {} and mode {}",
                    document_id, mode
                )))
            }
        }
    }

    fn open_document_thumbnail(
        &self,
        document_id: &str,
        size_hint: SizeHint,
        _signal: Option<&CancellationSignal>,
    ) -> Result<ThumbnailHandle> {
        let thumb = self.thumbnails.ensure(Path::new(document_id), size_hint)?;
        ThumbnailHandle::open(thumb.path)
    }

    fn query_recent_documents(
        &self,
        _root_id: Option<&str>,
        projection: Option<&[&str]>,
    ) -> Result<Cursor> {
        let mut cursor = Cursor::with_projection(projection, document::DEFAULT_COLUMNS);
        let stickers = self
            .deps
            .sticker_dao
            .recent_modified_stickers(self.config.recent_limit)?;
        self.include_records(&mut cursor, stickers)?;
        Ok(cursor)
    }

    fn query_search_documents(
        &self,
        _root_id: Option<&str>,
        query: Option<&str>,
        projection: Option<&[&str]>,
    ) -> Result<Cursor> {
        let mut cursor = Cursor::with_projection(projection, document::DEFAULT_COLUMNS);
        let stickers = self.deps.search_repo.search_stickers(query.unwrap_or_default())?;
        self.include_records(&mut cursor, stickers)?;
        Ok(cursor)
    }

    fn is_child_document(&self, parent_document_id: Option<&str>, document_id: Option<&str>) -> bool {
        match (parent_document_id, document_id) {
            (Some(parent), Some(doc)) => doc.starts_with(parent),
            _ => false,
        }
    }
}
