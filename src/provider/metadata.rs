use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::state::dao::{MimeTypeDao, StickerDao, TagDao};

/// Batch metadata resolution for a set of sticker ids.
///
/// Each map only ever contains ids that were asked for.
#[derive(Clone)]
pub struct MetadataLookup {
    stickers: Arc<dyn StickerDao>,
    tags: Arc<dyn TagDao>,
    mime_types: Arc<dyn MimeTypeDao>,
}

impl MetadataLookup {
    pub fn new(
        stickers: Arc<dyn StickerDao>,
        tags: Arc<dyn TagDao>,
        mime_types: Arc<dyn MimeTypeDao>,
    ) -> Self {
        Self {
            stickers,
            tags,
            mime_types,
        }
    }

    /// id -> last modification time (ms)
    pub fn modified_map(&self, uuids: &[String]) -> Result<HashMap<String, i64>> {
        self.stickers.sticker_modified(uuids)
    }

    /// id -> display title.
    ///
    /// Blank titles are replaced by the sticker's joined tags, and when those
    /// are blank too, by the id itself.
    pub fn display_map(&self, uuids: &[String]) -> Result<HashMap<String, String>> {
        let mut titles = self.stickers.sticker_titles(uuids)?;

        let untitled: Vec<String> = titles
            .iter()
            .filter(|(_, title)| title.trim().is_empty())
            .map(|(uuid, _)| uuid.clone())
            .collect();
        if untitled.is_empty() {
            return Ok(titles);
        }

        for (uuid, tags) in self.tags.tag_string_map(&untitled)? {
            let label = if tags.trim().is_empty() { uuid.clone() } else { tags };
            titles.insert(uuid, label);
        }
        Ok(titles)
    }

    /// id -> MIME type recorded at import
    pub fn mime_type_map(&self, uuids: &[String]) -> Result<HashMap<String, String>> {
        self.mime_types.sticker_mime_types(uuids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::data::StickerRecord;

    #[derive(Default)]
    struct FakeCatalog {
        titles: HashMap<String, String>,
        tags: HashMap<String, String>,
        modified: HashMap<String, i64>,
        mime_types: HashMap<String, String>,
    }

    fn pick<V: Clone>(source: &HashMap<String, V>, uuids: &[String]) -> HashMap<String, V> {
        uuids
            .iter()
            .filter_map(|id| source.get(id).map(|v| (id.clone(), v.clone())))
            .collect()
    }

    impl StickerDao for FakeCatalog {
        fn sticker_modified(&self, uuids: &[String]) -> Result<HashMap<String, i64>> {
            Ok(pick(&self.modified, uuids))
        }

        fn sticker_titles(&self, uuids: &[String]) -> Result<HashMap<String, String>> {
            Ok(pick(&self.titles, uuids))
        }

        fn recent_modified_stickers(&self, _limit: usize) -> Result<Vec<StickerRecord>> {
            Ok(Vec::new())
        }
    }

    impl TagDao for FakeCatalog {
        fn tag_string_map(&self, uuids: &[String]) -> Result<HashMap<String, String>> {
            Ok(pick(&self.tags, uuids))
        }
    }

    impl MimeTypeDao for FakeCatalog {
        fn sticker_mime_types(&self, uuids: &[String]) -> Result<HashMap<String, String>> {
            Ok(pick(&self.mime_types, uuids))
        }
    }

    fn lookup(catalog: FakeCatalog) -> MetadataLookup {
        let catalog = Arc::new(catalog);
        MetadataLookup::new(catalog.clone(), catalog.clone(), catalog)
    }

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_display_title_fallback_chain() {
        let lookup = lookup(FakeCatalog {
            titles: map(&[("abc", ""), ("def", "Dog"), ("ghi", "  "), ("jkl", "")]),
            tags: map(&[("abc", "cat,funny"), ("def", "ignored"), ("ghi", "")]),
            ..Default::default()
        });
        let ids: Vec<String> = ["abc", "def", "ghi", "jkl"].iter().map(|s| s.to_string()).collect();

        let display = lookup.display_map(&ids).unwrap();
        assert_eq!(display["abc"], "cat,funny");
        assert_eq!(display["def"], "Dog");
        assert_eq!(display["ghi"], "ghi");
        // No tags at all: stays blank, the row falls back to the file name
        assert_eq!(display["jkl"], "");
    }

    #[test]
    fn test_maps_stay_within_requested_ids() {
        let lookup = lookup(FakeCatalog {
            titles: map(&[("a", ""), ("b", "B")]),
            tags: map(&[("a", "x"), ("b", "y")]),
            modified: [("a".to_string(), 1), ("b".to_string(), 2)].into_iter().collect(),
            mime_types: map(&[("a", "image/png"), ("b", "image/gif")]),
        });
        let ids = vec!["a".to_string(), "zzz".to_string()];

        let display = lookup.display_map(&ids).unwrap();
        assert_eq!(display.keys().cloned().collect::<Vec<String>>(), vec!["a".to_string()]);
        assert_eq!(lookup.modified_map(&ids).unwrap().len(), 1);
        assert_eq!(lookup.mime_type_map(&ids).unwrap()["a"], "image/png");
    }
}
