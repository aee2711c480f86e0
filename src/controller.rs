//! The view controller: composes filters, query construction, historical
//! fetches, the tail session, and pagination behind one reactive surface.
//!
//! All asynchronous completions (fetch results, debounced edits, tail
//! events) are applied by `process_events` on the caller's task, so no two
//! controller operations ever run concurrently.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::api::LogFetcher;
use crate::debounce::Debouncer;
use crate::error::{Error, Result};
use crate::export::{self, DownloadSink, ExportFormat};
use crate::filter::{FilterKey, FilterState, clean_filters};
use crate::logs::{LogBuffer, PageCursor, page};
use crate::query;
use crate::store::{PersistedSession, SessionStore};
use crate::tail::{TailSession, TailState, TailTransport};
use crate::types::{LogLevel, LogRecord, Platform, PlatformContext, Status, ViewMode};

/// Quiet period for free-text filter fields
pub const DEBOUNCE_QUIET: Duration = Duration::from_millis(2000);

struct FetchOutcome {
    generation: u64,
    result: Result<Vec<LogRecord>>,
}

pub struct ViewController {
    fetcher: Arc<dyn LogFetcher>,
    store: Box<dyn SessionStore>,
    session: TailSession,
    token: Option<String>,

    platform: Option<PlatformContext>,
    filters: FilterState,
    buffer: LogBuffer,
    cursor: PageCursor,
    view: ViewMode,
    status: Status,

    /// Fetch generation token; results tagged with an older generation are
    /// stale and must be discarded.
    generation: u64,
    fetches_tx: mpsc::UnboundedSender<FetchOutcome>,
    fetches_rx: mpsc::UnboundedReceiver<FetchOutcome>,

    debounced_tx: mpsc::UnboundedSender<(FilterKey, String)>,
    debounced_rx: mpsc::UnboundedReceiver<(FilterKey, String)>,
    keyword_debounce: Debouncer<(FilterKey, String)>,
    file_path_debounce: Debouncer<(FilterKey, String)>,
}

impl ViewController {
    /// Build a controller. Must be called inside a tokio runtime (the
    /// debouncers spawn their timer tasks immediately).
    pub fn new(
        fetcher: Arc<dyn LogFetcher>,
        transport: Arc<dyn TailTransport>,
        store: Box<dyn SessionStore>,
        token: Option<String>,
    ) -> Self {
        let (fetches_tx, fetches_rx) = mpsc::unbounded_channel();
        let (debounced_tx, debounced_rx) = mpsc::unbounded_channel();

        Self {
            fetcher,
            store,
            session: TailSession::new(transport),
            token,
            platform: None,
            filters: FilterState::new(),
            buffer: LogBuffer::new(),
            cursor: PageCursor::default(),
            view: ViewMode::default(),
            status: Status::Ok,
            generation: 0,
            fetches_tx,
            fetches_rx,
            debounced_rx,
            keyword_debounce: Debouncer::new(DEBOUNCE_QUIET, debounced_tx.clone()),
            file_path_debounce: Debouncer::new(DEBOUNCE_QUIET, debounced_tx.clone()),
            debounced_tx,
        }
    }

    /// Restore the last persisted platform and filters
    pub fn init(&mut self) {
        if let Some(saved) = self.store.load() {
            if let Some(platform) = saved.platform {
                self.platform = Some(PlatformContext::of(platform));
            }
            self.filters = saved.filters;
        }
    }

    // ------------------------------------------------------------------
    // State accessors for the presentation layer
    // ------------------------------------------------------------------

    pub fn platform(&self) -> Option<Platform> {
        self.platform.map(|ctx| ctx.id)
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn status(&self) -> Status {
        self.status.clone()
    }

    pub fn view(&self) -> ViewMode {
        self.view
    }

    pub fn set_view(&mut self, view: ViewMode) {
        self.view = view;
    }

    pub fn is_tailing(&self) -> bool {
        self.session.is_live()
    }

    pub fn tail_state(&self) -> TailState {
        self.session.state()
    }

    pub fn records(&self) -> &[LogRecord] {
        self.buffer.records()
    }

    /// The page to render. While tailing the buffer grows unbounded and
    /// pages are not meaningful, so the whole buffer is returned.
    pub fn current_page(&self) -> &[LogRecord] {
        if self.is_tailing() {
            self.buffer.records()
        } else {
            page(
                self.buffer.records(),
                self.cursor.page_size(),
                self.cursor.page(),
            )
        }
    }

    pub fn page_number(&self) -> usize {
        self.cursor.page()
    }

    pub fn page_size(&self) -> usize {
        self.cursor.page_size()
    }

    pub fn total_pages(&self) -> usize {
        self.cursor.total_pages(self.buffer.len())
    }

    /// Pagination controls are disabled while a tail session is live
    pub fn pagination_enabled(&self) -> bool {
        !self.is_tailing()
    }

    /// Per-level record counts over the whole buffer, for the visual view
    pub fn level_counts(&self) -> Vec<(LogLevel, usize)> {
        [
            LogLevel::Info,
            LogLevel::Warn,
            LogLevel::Error,
            LogLevel::Debug,
            LogLevel::Unknown,
        ]
        .into_iter()
        .map(|level| (level, self.buffer.count_level(level)))
        .collect()
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Switch platforms. Invalidates all in-flight context: filters,
    /// buffer, pagination, any live tail session, and any pending fetch.
    pub fn select_platform(&mut self, platform: Platform) {
        self.session.stop();
        // Pending debounced edits belong to the old platform; replacing the
        // debouncers discards them, draining catches any already emitted
        self.keyword_debounce = Debouncer::new(DEBOUNCE_QUIET, self.debounced_tx.clone());
        self.file_path_debounce = Debouncer::new(DEBOUNCE_QUIET, self.debounced_tx.clone());
        while self.debounced_rx.try_recv().is_ok() {}
        self.filters = FilterState::new();
        self.buffer.clear();
        self.cursor.reset();
        self.generation += 1;
        self.status = Status::Ok;
        self.platform = Some(PlatformContext::of(platform));
        self.persist();
        tracing::debug!(platform = %platform, "platform selected");
    }

    /// Clean raw form input, persist it, and (when not tailing) trigger a
    /// historical fetch. A missing platform-required field is surfaced and
    /// no request is issued.
    pub fn apply_filters<I>(&mut self, raw: I) -> Result<()>
    where
        I: IntoIterator<Item = (FilterKey, Option<String>)>,
    {
        self.filters = clean_filters(raw);
        self.persist();
        if self.is_tailing() {
            return Ok(());
        }
        self.start_fetch().inspect_err(|err| {
            self.status = Status::Error(err.to_string());
        })
    }

    /// Clear every filter field, as the filter form's Reset button does
    pub fn reset_filters(&mut self) -> Result<()> {
        self.apply_filters(std::iter::empty())
    }

    /// Route one field edit: free-text fields settle through the
    /// debouncer, structured fields apply immediately.
    pub fn edit_field(&mut self, key: FilterKey, value: impl Into<String>) {
        let value = value.into();
        match key {
            FilterKey::Keyword => self.keyword_debounce.submit((key, value)),
            FilterKey::FilePath => self.file_path_debounce.submit((key, value)),
            _ => self.apply_field(key, value),
        }
    }

    /// Start or stop tailing. Exactly one of fetch mode and tail mode is
    /// active at any time.
    pub fn toggle_tailing(&mut self) -> Result<()> {
        if self.is_tailing() {
            self.session.stop();
            self.status = Status::Ok;
            return Ok(());
        }

        let Some(ctx) = self.platform else {
            return Ok(());
        };
        let endpoint = query::tail_endpoint(&self.filters, &ctx).inspect_err(|err| {
            self.status = Status::Error(err.to_string());
        })?;

        // A late historical result must not clobber the growing tail buffer
        self.generation += 1;
        self.session.start(endpoint, self.token.clone());
        self.cursor.reset();
        self.status = Status::Ok;
        Ok(())
    }

    pub fn set_page(&mut self, page: usize) {
        if !self.pagination_enabled() {
            return;
        }
        self.cursor.set_page(page, self.buffer.len());
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        if !self.pagination_enabled() {
            return;
        }
        self.cursor.set_page_size(page_size, self.buffer.len());
    }

    /// Serialize the current buffer and hand it to the download sink.
    /// Does not mutate controller state.
    pub fn export_buffer(&self, format: ExportFormat, sink: &dyn DownloadSink) -> Result<()> {
        let bytes = export::export(self.buffer.records(), format);
        let filename = export_filename(format, Utc::now());
        sink.save(&bytes, format.mime(), &filename)?;
        Ok(())
    }

    /// Apply queued asynchronous completions: fetch results (discarding
    /// stale generations), settled debounced edits, and tail events.
    pub fn process_events(&mut self) {
        while let Ok(outcome) = self.fetches_rx.try_recv() {
            if outcome.generation != self.generation {
                tracing::debug!("discarding stale fetch result");
                continue;
            }
            match outcome.result {
                Ok(records) => {
                    self.buffer.replace(records);
                    self.cursor.reset();
                    self.status = Status::Ok;
                }
                // The previous buffer is retained on every fetch failure
                Err(Error::AuthRequired) => self.status = Status::AuthRequired,
                Err(err) => self.status = Status::Error(err.to_string()),
            }
        }

        while let Ok((key, value)) = self.debounced_rx.try_recv() {
            self.apply_field(key, value);
        }

        let (records, failure) = self.session.drain();
        if !records.is_empty() {
            self.buffer.extend(records);
        }
        if let Some(err) = failure {
            self.status = Status::Error(err.to_string());
            // Error reported; return the session to Idle so the user can
            // start a fresh tail.
            self.session.stop();
        }
    }

    /// Terminal teardown. Must run on every component-teardown path.
    pub fn destroy(&mut self) {
        self.session.stop();
        self.keyword_debounce.cancel();
        self.file_path_debounce.cancel();
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn apply_field(&mut self, key: FilterKey, value: String) {
        self.filters.set(key, value);
        self.persist();
        if self.is_tailing() {
            return;
        }
        if let Err(err) = self.start_fetch() {
            self.status = Status::Error(err.to_string());
        }
    }

    fn start_fetch(&mut self) -> Result<()> {
        let Some(ctx) = self.platform else {
            return Ok(());
        };
        let query = query::historical_query(&self.filters, &ctx, Utc::now())?;

        self.generation += 1;
        let generation = self.generation;
        self.status = Status::Loading;

        let fetcher = Arc::clone(&self.fetcher);
        let tx = self.fetches_tx.clone();
        tokio::spawn(async move {
            let result = fetcher.fetch(query).await;
            let _ = tx.send(FetchOutcome { generation, result });
        });
        Ok(())
    }

    fn persist(&self) {
        self.store.save(&PersistedSession {
            platform: self.platform.map(|ctx| ctx.id),
            filters: self.filters.clone(),
        });
    }
}

impl Drop for ViewController {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn export_filename(format: ExportFormat, now: DateTime<Utc>) -> String {
    format!(
        "logs-{}.{}",
        now.format("%Y%m%d-%H%M%S"),
        format.extension()
    )
}
