/// Image handling for the provider
///
/// This module handles:
/// - Sniffing sticker formats from their content (format.rs)
/// - Generating and caching downsampled thumbnails (thumbnail.rs)

pub mod format;
pub mod thumbnail;
