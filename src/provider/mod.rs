//! Document provider
//!
//! Exposes the sticker root to a host file browser: root listing, directory
//! listing, single-document lookup, file and thumbnail opening, recents and
//! free-text search. Every query returns a [`cursor::Cursor`].

pub mod contract;
pub mod cursor;
pub mod handle;
pub mod metadata;
pub mod row;
pub mod sticker;

pub use contract::{CancellationSignal, DocumentsProvider, SizeHint};
pub use cursor::Cursor;
pub use sticker::{ProviderDeps, StickerProvider};
