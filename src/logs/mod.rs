//! In-memory log buffer and pagination

mod buffer;
mod page;

pub use buffer::LogBuffer;
pub use page::{DEFAULT_PAGE_SIZE, PageCursor, page};
