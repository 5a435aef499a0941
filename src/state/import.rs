/// Sticker import
///
/// Copies image files into the sticker root under a fresh id and records
/// them in the catalog. Files whose content is already catalogued are skipped.
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use tracing::{info, warn};
use walkdir::WalkDir;

use super::data::StickerRecord;
use super::library::Library;
use crate::config::ProviderConfig;
use crate::error::Result;
use crate::media::format::{self, ImageFormat};

/// Outcome of importing one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    Imported(StickerRecord),
    /// Same content already in the catalog
    Duplicate(StickerRecord),
}

/// Result of a folder import operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportResult {
    pub imported_count: usize,
    pub skipped_count: usize,
}

/// Import a single image file
pub fn import_sticker(
    library: &Library,
    config: &ProviderConfig,
    source: &Path,
    title: &str,
    tags: &[String],
) -> Result<ImportOutcome> {
    let bytes = fs::read(source)?;
    let content_hash = format!("{:x}", Sha256::digest(&bytes));

    if let Some(existing) = library.sticker_by_hash(&content_hash)? {
        return Ok(ImportOutcome::Duplicate(existing));
    }

    let file_name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let format = format::check(bytes.as_slice(), &file_name)?;

    let mut sticker = StickerRecord::new(title);
    sticker.content_hash = content_hash;

    fs::create_dir_all(&config.sticker_dir)?;
    let target = config.sticker_dir.join(&sticker.uuid);
    fs::write(&target, &bytes)?;

    let recorded = library
        .insert_sticker(&sticker)
        .and_then(|_| library.set_tags(&sticker.uuid, tags))
        .and_then(|_| library.set_mime_type(&sticker.uuid, format.to_mime_type()));
    if let Err(e) = recorded {
        let _ = fs::remove_file(&target);
        let _ = library.delete_sticker(&sticker.uuid);
        return Err(e);
    }

    info!("📥 Imported {} as {}", source.display(), sticker.uuid);
    Ok(ImportOutcome::Imported(sticker))
}

/// Import every recognizable image under `folder`, recursively.
/// Titles are left blank; the file stem becomes the only tag.
pub fn import_folder(library: &Library, config: &ProviderConfig, folder: &Path) -> ImportResult {
    let mut result = ImportResult::default();

    for entry in WalkDir::new(folder)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let recognized = fs::File::open(path)
            .and_then(|file| format::check(file, &name))
            .map(|format| format != ImageFormat::Undefined)
            .unwrap_or(false);
        if !recognized {
            continue;
        }

        let tags: Vec<String> = path
            .file_stem()
            .map(|stem| vec![stem.to_string_lossy().into_owned()])
            .unwrap_or_default();

        match import_sticker(library, config, path, "", &tags) {
            Ok(ImportOutcome::Imported(_)) => result.imported_count += 1,
            Ok(ImportOutcome::Duplicate(_)) => result.skipped_count += 1,
            Err(e) => warn!("⚠️  Error importing {}: {}", path.display(), e),
        }
    }

    info!(
        "✅ Import complete: {} new, {} skipped",
        result.imported_count, result.skipped_count
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::dao::{MimeTypeDao, TagDao};
    use tempfile::tempdir;

    const GIF_BYTES: &[u8] = b"GIF89a\x01\0\x01\0\0\0\0;";

    #[test]
    fn test_import_copies_and_records() {
        let dir = tempdir().unwrap();
        let config = ProviderConfig::rooted_at(dir.path());
        let library = Library::open_in_memory().unwrap();
        let source = dir.path().join("party.gif");
        fs::write(&source, GIF_BYTES).unwrap();

        let tags = vec!["party".to_string(), "dance".to_string()];
        let sticker = match import_sticker(&library, &config, &source, "", &tags).unwrap() {
            ImportOutcome::Imported(sticker) => sticker,
            other => panic!("unexpected: {:?}", other),
        };

        assert_eq!(fs::read(config.sticker_dir.join(&sticker.uuid)).unwrap(), GIF_BYTES);
        assert_eq!(sticker.content_hash.len(), 64);
        let ids = vec![sticker.uuid.clone()];
        assert_eq!(library.tag_string_map(&ids).unwrap()[&sticker.uuid], "party,dance");
        assert_eq!(library.sticker_mime_types(&ids).unwrap()[&sticker.uuid], "image/gif");
    }

    #[test]
    fn test_duplicate_content_is_skipped() {
        let dir = tempdir().unwrap();
        let config = ProviderConfig::rooted_at(dir.path());
        let library = Library::open_in_memory().unwrap();
        let a = dir.path().join("a.gif");
        let b = dir.path().join("b.gif");
        fs::write(&a, GIF_BYTES).unwrap();
        fs::write(&b, GIF_BYTES).unwrap();

        import_sticker(&library, &config, &a, "first", &[]).unwrap();
        let second = import_sticker(&library, &config, &b, "second", &[]).unwrap();
        assert!(matches!(second, ImportOutcome::Duplicate(ref s) if s.title == "first"));
        assert_eq!(library.sticker_count().unwrap(), 1);
    }

    #[test]
    fn test_import_folder_skips_non_images() {
        let dir = tempdir().unwrap();
        let config = ProviderConfig::rooted_at(dir.path());
        let library = Library::open_in_memory().unwrap();
        let inbox = dir.path().join("inbox");
        fs::create_dir_all(inbox.join("nested")).unwrap();
        fs::write(inbox.join("one.gif"), GIF_BYTES).unwrap();
        fs::write(inbox.join("nested").join("two.png"), b"\x89PNG\r\n\x1a\n\0").unwrap();
        fs::write(inbox.join("notes.txt"), b"hello").unwrap();
        fs::write(inbox.join("copy.gif"), GIF_BYTES).unwrap();

        let result = import_folder(&library, &config, &inbox);
        assert_eq!(result, ImportResult { imported_count: 2, skipped_count: 1 });
        assert_eq!(library.sticker_count().unwrap(), 2);
    }
}
