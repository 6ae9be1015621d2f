//! The log session controller.
//!
//! [`SessionController`] owns everything about the one log being viewed:
//! the selection, search parameters, live polling, compressed gating and the
//! sequencing of content requests. It never performs I/O. Each transition
//! runs to completion and queues [`Effect`]s; the caller drains them with
//! [`SessionController::take_effects`], performs them, and feeds the replies
//! back through the `*_loaded` methods.
//!
//! # Ordering
//!
//! Every content fetch carries a [`Ticket`] `(epoch, seq)`. The epoch moves
//! whenever the selection changes. At most one fetch is outstanding; a fetch
//! requested while one is in flight is remembered as pending. When the
//! outstanding reply arrives it is applied only if its epoch is still
//! current and nothing newer is pending. Otherwise it is dropped and the
//! pending fetch goes out. A reply for a log that is no longer selected can
//! therefore never overwrite the view.

use crate::catalog::LogCatalog;
use crate::config::SessionConfig;
use crate::error::{ApiError, Guard, SessionError};
use crate::payload::{
    is_ok_status, GlobalMatch, ListPayload, SearchAllPayload, SearchAllRequest, TailPayload,
    TailRequest,
};
use crate::schedule::{Scheduler, TimerId};
use crate::status::Status;
use crate::types::{LineLimit, LogDescriptor, SearchParams, SessionMode};
use std::path::PathBuf;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Effects and views
// ---------------------------------------------------------------------------

/// Identity of one content fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket {
    pub epoch: u64,
    pub seq: u64,
}

/// Work the controller asks its executor to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    FetchTail { ticket: Ticket, request: TailRequest },
    SearchAll { seq: u64, request: SearchAllRequest },
    LoadCatalog { seq: u64 },
    Download { id: String, name: String },
}

/// Placeholder texts the log pane can show instead of lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    Initial,
    NotFound,
    Compressed,
}

/// What the log pane shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentView {
    Placeholder(Placeholder),
    /// A new selection is waiting for its first reply.
    Loading,
    /// Lines exactly as the server sent them.
    Lines(Vec<String>),
    /// Empty result for an active query.
    NoMatches,
    /// Empty result without a query.
    Empty,
    /// A fetch failed; nothing to show.
    Cleared,
}

impl ContentView {
    pub fn lines(&self) -> &[String] {
        match self {
            ContentView::Lines(lines) => lines,
            _ => &[],
        }
    }
}

/// Cross-log search results, shown over the selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalResults {
    pub query: String,
    pub sections: Vec<GlobalMatch>,
}

impl GlobalResults {
    pub fn total(&self) -> usize {
        self.sections.iter().map(|s| s.matches.len()).sum()
    }
}

/// Why a fetch was issued. Decides what a failure does to the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchKind {
    /// Selection, refresh or search: a failure clears the content.
    Explicit,
    /// Live polling: a failure keeps the last good content.
    Live,
}

impl FetchKind {
    fn merge(self, other: FetchKind) -> FetchKind {
        if self == FetchKind::Explicit || other == FetchKind::Explicit {
            FetchKind::Explicit
        } else {
            FetchKind::Live
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    ticket: Ticket,
    kind: FetchKind,
    with_query: bool,
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

pub struct SessionController<S: Scheduler> {
    catalog: LogCatalog,
    selected: Option<String>,
    /// Selection-based mode; [`SessionMode::SearchingAll`] is the overlay.
    mode: SessionMode,
    params: SearchParams,
    content: ContentView,
    overlay: Option<GlobalResults>,
    status: Status,
    busy: bool,

    scheduler: S,
    live_timer: Option<TimerId>,
    live_period: Duration,
    default_lines: u32,

    epoch: u64,
    seq: u64,
    in_flight: Option<InFlight>,
    pending: Option<FetchKind>,
    search_all_seq: u64,
    search_all_in_flight: Option<u64>,
    catalog_seq: u64,
    catalog_in_flight: Option<u64>,

    outbox: Vec<Effect>,
}

impl<S: Scheduler> SessionController<S> {
    pub fn new(scheduler: S, config: &SessionConfig) -> Self {
        let line_limit = LineLimit::clamped(config.default_lines as i64);
        Self {
            catalog: LogCatalog::default(),
            selected: None,
            mode: SessionMode::Idle,
            params: SearchParams {
                line_limit,
                ..SearchParams::default()
            },
            content: ContentView::Placeholder(Placeholder::Initial),
            overlay: None,
            status: Status::Ready,
            busy: false,
            scheduler,
            live_timer: None,
            live_period: config.live_period(),
            default_lines: line_limit.get(),
            epoch: 0,
            seq: 0,
            in_flight: None,
            pending: None,
            search_all_seq: 0,
            search_all_in_flight: None,
            catalog_seq: 0,
            catalog_in_flight: None,
            outbox: Vec::new(),
        }
    }

    /// Seed the catalog from an already-fetched list. Nothing is selected,
    /// so no fetch is issued until [`SessionController::select_log`].
    pub fn with_catalog(mut self, entries: Vec<LogDescriptor>) -> Self {
        self.catalog.replace(entries);
        self
    }

    // -- accessors ----------------------------------------------------------

    pub fn catalog(&self) -> &LogCatalog {
        &self.catalog
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected_log(&self) -> Option<&LogDescriptor> {
        self.selected.as_deref().and_then(|id| self.catalog.get(id))
    }

    /// The active mode, with the search-all overlay taking precedence.
    pub fn mode(&self) -> SessionMode {
        if self.overlay.is_some() {
            SessionMode::SearchingAll
        } else {
            self.mode
        }
    }

    /// True while live polling is armed, even under the search-all overlay.
    pub fn is_live(&self) -> bool {
        self.mode == SessionMode::Live
    }

    pub fn params(&self) -> &SearchParams {
        &self.params
    }

    pub fn content(&self) -> &ContentView {
        &self.content
    }

    pub fn overlay(&self) -> Option<&GlobalResults> {
        self.overlay.as_ref()
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn in_flight(&self) -> Option<Ticket> {
        self.in_flight.map(|f| f.ticket)
    }

    pub fn has_pending_fetch(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_searching_all(&self) -> bool {
        self.search_all_in_flight.is_some()
    }

    pub fn is_loading_catalog(&self) -> bool {
        self.catalog_in_flight.is_some()
    }

    pub fn live_timer(&self) -> Option<TimerId> {
        self.live_timer
    }

    pub fn live_period(&self) -> Duration {
        self.live_period
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Drain the queued effects in emission order.
    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.outbox)
    }

    // -- catalog ------------------------------------------------------------

    /// Ask for a fresh catalog.
    pub fn load_catalog(&mut self) -> Result<(), SessionError> {
        self.ensure_idle()?;
        self.catalog_seq += 1;
        self.catalog_in_flight = Some(self.catalog_seq);
        self.status = Status::LoadingCatalog;
        self.outbox.push(Effect::LoadCatalog {
            seq: self.catalog_seq,
        });
        tracing::debug!(seq = self.catalog_seq, "session: catalog requested");
        Ok(())
    }

    /// Apply a catalog reply. Replies for anything but the latest request
    /// are ignored.
    pub fn catalog_loaded(&mut self, seq: u64, result: Result<ListPayload, ApiError>) {
        if self.catalog_in_flight != Some(seq) {
            tracing::warn!(seq, "session: stale catalog reply dropped");
            return;
        }
        self.catalog_in_flight = None;

        let payload = match result {
            Ok(payload) if is_ok_status(&payload.status) => payload,
            Ok(payload) => {
                let err = SessionError::Server(payload.message.unwrap_or_default());
                tracing::warn!(error = %err, "session: catalog load rejected by server");
                self.status = Status::CatalogFailed(err);
                return;
            }
            Err(err) => {
                tracing::warn!(error = %err, "session: catalog load failed");
                self.status = Status::CatalogFailed(err.into());
                return;
            }
        };

        // An empty list halts here; the previous catalog and selection stay.
        if payload.data.is_empty() {
            tracing::warn!("session: server reports no configured logs");
            self.status = Status::NoLogsConfigured;
            return;
        }

        self.catalog.replace(payload.data);
        self.status = Status::catalog_summary(self.catalog.existing_count(), self.catalog.len());

        match self.selected.clone() {
            Some(id) if !self.catalog.contains(&id) => self.lose_selection(id),
            Some(id) => self.reconcile_selection(&id),
            None => {
                // Keep the catalog summary visible over the fetch status.
                let summary = self.status.clone();
                self.select_first_available();
                if summary != Status::Ready && !matches!(self.status, Status::Compressed) {
                    self.status = summary;
                }
            }
        }
    }

    /// Select the default log of the filtered view, if any.
    pub fn select_first_available(&mut self) -> Option<String> {
        let id = self.catalog.first_available()?.id.clone();
        self.select_log(&id).ok()?;
        Some(id)
    }

    pub fn set_filter(&mut self, term: impl Into<String>) {
        self.catalog.set_filter(term);
    }

    fn lose_selection(&mut self, id: String) {
        tracing::warn!(id = %id, "session: selected log left the catalog");
        self.disarm_live();
        self.epoch += 1;
        self.pending = None;
        self.selected = None;
        self.mode = SessionMode::Idle;
        self.content = ContentView::Placeholder(Placeholder::NotFound);
        self.status = Status::NotFound(id);
    }

    /// The selected log may have changed its compressed flag on reload.
    fn reconcile_selection(&mut self, id: &str) {
        let compressed = self.catalog.get(id).is_some_and(|log| log.compressed);
        if compressed && self.mode != SessionMode::Compressed {
            self.disarm_live();
            self.epoch += 1;
            self.pending = None;
            self.mode = SessionMode::Compressed;
            self.content = ContentView::Placeholder(Placeholder::Compressed);
        } else if !compressed && self.mode == SessionMode::Compressed {
            self.mode = SessionMode::Viewing;
            self.request_fetch(FetchKind::Explicit);
        }
    }

    // -- selection ----------------------------------------------------------

    /// Make `id` the selected log and show it from scratch.
    pub fn select_log(&mut self, id: &str) -> Result<(), SessionError> {
        self.ensure_idle()?;
        let compressed = match self.catalog.get(id) {
            Some(log) => log.compressed,
            None => return self.reject(SessionError::NotFound(id.to_string())),
        };

        self.disarm_live();
        self.epoch += 1;
        self.pending = None;
        self.overlay = None;
        self.selected = Some(id.to_string());
        tracing::debug!(id, epoch = self.epoch, compressed, "session: log selected");

        if compressed {
            self.mode = SessionMode::Compressed;
            self.content = ContentView::Placeholder(Placeholder::Compressed);
            self.status = Status::Compressed;
        } else {
            self.mode = SessionMode::Viewing;
            self.content = ContentView::Loading;
            self.status = self.fetch_status();
            self.request_fetch(FetchKind::Explicit);
        }
        Ok(())
    }

    // -- live ---------------------------------------------------------------

    /// Enter live mode: fetch now, then on every timer tick.
    pub fn start_live(&mut self) -> Result<(), SessionError> {
        self.ensure_idle()?;
        if self.mode == SessionMode::Live {
            return Ok(());
        }
        if self.selected.is_none() {
            return self.reject(SessionError::Guarded(Guard::NoSelection));
        }
        if self.mode == SessionMode::Compressed {
            return self.reject(SessionError::Guarded(Guard::Compressed));
        }
        if self.params.has_query() {
            return self.reject(SessionError::Guarded(Guard::SearchActive));
        }

        self.overlay = None;
        self.mode = SessionMode::Live;
        self.live_timer = Some(self.scheduler.schedule_repeating(self.live_period));
        self.status = Status::LiveStarted {
            seconds: self.live_period.as_millis().div_ceil(1_000) as u64,
        };
        tracing::debug!(period_ms = self.live_period.as_millis() as u64, "session: live started");
        self.request_fetch(FetchKind::Live);
        Ok(())
    }

    /// Leave live mode. A no-op when not live.
    pub fn stop_live(&mut self) -> Result<(), SessionError> {
        self.ensure_idle()?;
        self.leave_live();
        Ok(())
    }

    pub fn toggle_live(&mut self) -> Result<(), SessionError> {
        if self.mode == SessionMode::Live {
            self.stop_live()
        } else {
            self.start_live()
        }
    }

    /// Live timer entry point. Returns whether a fetch was issued.
    pub fn on_timer(&mut self, id: TimerId) -> bool {
        if self.live_timer != Some(id) {
            tracing::debug!(timer = id.0, "session: foreign timer tick ignored");
            return false;
        }
        let ready = self.mode == SessionMode::Live
            && self.selected.is_some()
            && !self.params.has_query()
            && self.in_flight.is_none()
            && !self.busy;
        if ready {
            self.request_fetch(FetchKind::Live);
        } else {
            tracing::debug!("session: live tick skipped");
        }
        ready
    }

    fn leave_live(&mut self) {
        if self.mode == SessionMode::Live {
            self.disarm_live();
            self.mode = SessionMode::Viewing;
            self.status = Status::LivePaused;
            tracing::debug!("session: live stopped");
        }
    }

    fn disarm_live(&mut self) {
        if let Some(timer) = self.live_timer.take() {
            self.scheduler.cancel(timer);
        }
    }

    // -- search -------------------------------------------------------------

    /// Replace the query text. A non-empty query ends live mode; nothing is
    /// fetched until [`SessionController::refresh`].
    pub fn edit_query(&mut self, text: impl Into<String>) -> Result<(), SessionError> {
        self.ensure_idle()?;
        self.params.query = text.into();
        if self.params.has_query() {
            self.leave_live();
        }
        Ok(())
    }

    pub fn set_case_sensitive(&mut self, case_sensitive: bool) {
        self.params.case_sensitive = case_sensitive;
    }

    /// Parse and clamp a typed line limit.
    pub fn set_line_limit_input(&mut self, input: &str) -> LineLimit {
        self.params.line_limit = LineLimit::parse_or(input, self.default_lines);
        self.params.line_limit
    }

    pub fn adjust_line_limit(&mut self, delta: i64) -> LineLimit {
        self.params.line_limit = self.params.line_limit.saturating_add(delta);
        self.params.line_limit
    }

    /// Fetch the selected log again with the current parameters.
    pub fn refresh(&mut self) -> Result<(), SessionError> {
        self.ensure_idle()?;
        if self.selected.is_none() {
            return self.reject(SessionError::Guarded(Guard::NoSelection));
        }
        if self.mode == SessionMode::Compressed {
            return self.reject(SessionError::Guarded(Guard::Compressed));
        }
        self.leave_live();
        self.overlay = None;
        self.status = self.fetch_status();
        self.request_fetch(FetchKind::Explicit);
        Ok(())
    }

    /// Empty the query and show the plain tail again.
    pub fn clear_search(&mut self) -> Result<(), SessionError> {
        self.ensure_idle()?;
        self.params.query.clear();
        self.leave_live();
        self.overlay = None;
        if self.selected.is_some() && self.mode == SessionMode::Viewing {
            self.status = self.fetch_status();
            self.request_fetch(FetchKind::Explicit);
        }
        Ok(())
    }

    /// One-shot search across every configured log.
    pub fn search_all(&mut self) -> Result<(), SessionError> {
        self.ensure_idle()?;
        if !self.params.has_query() {
            return self.reject(SessionError::Guarded(Guard::EmptyQuery));
        }
        self.search_all_seq += 1;
        self.search_all_in_flight = Some(self.search_all_seq);
        self.status = Status::SearchingAll;
        self.outbox.push(Effect::SearchAll {
            seq: self.search_all_seq,
            request: SearchAllRequest {
                search: self.params.effective_query().to_string(),
                lines: self.params.line_limit,
                case_sensitive: self.params.case_sensitive,
            },
        });
        tracing::debug!(seq = self.search_all_seq, "session: search-all requested");
        Ok(())
    }

    pub fn search_all_loaded(&mut self, seq: u64, result: Result<SearchAllPayload, ApiError>) {
        if self.search_all_in_flight != Some(seq) {
            tracing::warn!(seq, "session: stale search-all reply dropped");
            return;
        }
        self.search_all_in_flight = None;
        match result {
            Ok(payload) if is_ok_status(&payload.status) => {
                let results = GlobalResults {
                    query: self.params.effective_query().to_string(),
                    sections: payload.matches,
                };
                self.status = Status::GlobalMatches(results.total());
                self.overlay = Some(results);
            }
            Ok(payload) => {
                self.status = Status::SearchAllFailed(SessionError::Server(
                    payload.message.unwrap_or_default(),
                ));
            }
            Err(err) => {
                tracing::warn!(error = %err, "session: search-all failed");
                self.status = Status::SearchAllFailed(err.into());
            }
        }
    }

    /// Leave the search-all overlay and return to the selection's view.
    pub fn dismiss_overlay(&mut self) {
        self.overlay = None;
    }

    // -- download -----------------------------------------------------------

    /// Request a download of the selected compressed log.
    pub fn download(&mut self) -> Result<(), SessionError> {
        self.ensure_idle()?;
        let (id, name) = match self.selected_log() {
            Some(log) => (log.id.clone(), log.name.clone()),
            None => return self.reject(SessionError::Guarded(Guard::NoSelection)),
        };
        if self.mode != SessionMode::Compressed {
            return self.reject(SessionError::Guarded(Guard::NotCompressed));
        }
        self.status = Status::Downloading(name.clone());
        self.outbox.push(Effect::Download { id, name });
        Ok(())
    }

    pub fn download_finished(&mut self, result: Result<PathBuf, ApiError>) {
        self.status = match result {
            Ok(path) => Status::Downloaded(path.display().to_string()),
            Err(err) => Status::DownloadFailed(err.into()),
        };
    }

    // -- content fetches ----------------------------------------------------

    fn request_fetch(&mut self, kind: FetchKind) {
        if self.in_flight.is_some() {
            self.pending = Some(match self.pending {
                Some(prev) => prev.merge(kind),
                None => kind,
            });
            tracing::debug!(?kind, "session: fetch queued behind in-flight request");
            return;
        }
        self.issue_fetch(kind);
    }

    fn issue_fetch(&mut self, kind: FetchKind) {
        let id = match (&self.selected, self.mode) {
            (Some(id), SessionMode::Viewing | SessionMode::Live) => id.clone(),
            _ => return,
        };
        self.seq += 1;
        let ticket = Ticket {
            epoch: self.epoch,
            seq: self.seq,
        };
        let request = TailRequest {
            id,
            lines: self.params.line_limit,
            search: self.params.effective_query().to_string(),
            case_sensitive: self.params.case_sensitive,
        };
        self.in_flight = Some(InFlight {
            ticket,
            kind,
            with_query: !request.search.is_empty(),
        });
        tracing::debug!(?ticket, id = %request.id, lines = request.lines.get(), "session: fetch issued");
        self.outbox.push(Effect::FetchTail { ticket, request });
    }

    /// Apply the reply for a content fetch.
    pub fn tail_loaded(&mut self, ticket: Ticket, result: Result<TailPayload, ApiError>) {
        let flight = match self.in_flight {
            Some(flight) if flight.ticket == ticket => flight,
            _ => {
                tracing::warn!(?ticket, "session: reply for unknown ticket dropped");
                return;
            }
        };
        self.in_flight = None;

        if ticket.epoch != self.epoch || self.pending.is_some() {
            tracing::debug!(?ticket, epoch = self.epoch, "session: superseded reply dropped");
            if let Some(kind) = self.pending.take() {
                self.issue_fetch(kind);
            }
            return;
        }

        let outcome = match result {
            Ok(payload) if is_ok_status(&payload.status) => Ok(payload),
            Ok(payload) => Err(SessionError::Server(payload.message.unwrap_or_default())),
            Err(err) => Err(err.into()),
        };

        match outcome {
            Ok(payload) => self.apply_tail(flight, payload),
            Err(err) => {
                tracing::warn!(error = %err, kind = ?flight.kind, "session: fetch failed");
                if flight.kind == FetchKind::Explicit {
                    self.content = ContentView::Cleared;
                }
                self.status = Status::FetchFailed(err);
            }
        }
    }

    fn apply_tail(&mut self, flight: InFlight, payload: TailPayload) {
        if let (Some(id), Some(meta)) = (self.selected.as_deref(), payload.meta.as_ref()) {
            self.catalog.apply_meta(id, meta);
        }
        let count = payload.lines.len();
        self.content = match (count, flight.with_query) {
            (0, true) => ContentView::NoMatches,
            (0, false) => ContentView::Empty,
            _ => ContentView::Lines(payload.lines),
        };
        self.status = if flight.with_query {
            Status::SearchDone(count)
        } else if self.mode == SessionMode::Live {
            Status::LiveUpdated(count)
        } else {
            Status::ShowingLines(count)
        };
    }

    fn fetch_status(&self) -> Status {
        if self.params.has_query() {
            Status::Searching
        } else {
            Status::Reading
        }
    }

    // -- busy flag & teardown ---------------------------------------------

    /// Set while an update/installation runs; user actions are refused.
    pub fn set_update_in_progress(&mut self, busy: bool) {
        tracing::debug!(busy, "session: update flag");
        self.busy = busy;
    }

    /// Disarm every timer. The controller stays usable.
    pub fn shutdown(&mut self) {
        self.disarm_live();
        if self.mode == SessionMode::Live {
            self.mode = SessionMode::Viewing;
        }
    }

    fn ensure_idle(&mut self) -> Result<(), SessionError> {
        if self.busy {
            return self.reject(SessionError::Busy);
        }
        Ok(())
    }

    fn reject(&mut self, err: SessionError) -> Result<(), SessionError> {
        tracing::warn!(error = %err, "session: action rejected");
        self.status = Status::Rejected(err.clone());
        Err(err)
    }
}

impl<S: Scheduler> Drop for SessionController<S> {
    fn drop(&mut self) {
        self.disarm_live();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
