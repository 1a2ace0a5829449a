pub mod bookmarks;
pub mod export;

pub use bookmarks::{Bookmark, Bookmarks};
pub use export::{EventExport, Exporter};
