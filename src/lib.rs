//! logscope — log retrieval and live-tail controller for heterogeneous
//! log platforms.
//!
//! The controller turns filter criteria into platform-specific queries,
//! debounces free-text input, fetches bounded historical result sets with
//! client-side pagination, and manages a single live push subscription per
//! platform with idempotent teardown. Rendering and credential entry are
//! external collaborators behind narrow traits.

pub mod api;
pub mod config;
pub mod controller;
pub mod debounce;
pub mod error;
pub mod export;
pub mod filter;
pub mod logs;
pub mod query;
pub mod store;
pub mod tail;
pub mod types;

pub use api::{LogApiClient, LogFetcher, PlatformCatalog};
pub use controller::ViewController;
pub use debounce::Debouncer;
pub use error::{Error, Result};
pub use export::{DownloadSink, ExportFormat, FileSink};
pub use filter::{FilterKey, FilterState, clean_filters};
pub use logs::{LogBuffer, PageCursor};
pub use query::{HistoricalQuery, TailEndpoint};
pub use store::{JsonFileStore, MemoryStore, PersistedSession, SessionStore};
pub use tail::{TailSession, TailState, TailTransport};
pub use types::{LogLevel, LogRecord, Platform, PlatformContext, Status, ViewMode};
