/// State management module
///
/// This module handles the sticker catalog:
/// - Database connections and queries (library.rs)
/// - Shared data structures (data.rs)
/// - Lookup capabilities consumed by the provider (dao.rs)
/// - Importing image files as stickers (import.rs)

pub mod dao;
pub mod data;
pub mod import;
pub mod library;
