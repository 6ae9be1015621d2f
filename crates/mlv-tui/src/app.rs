//! Top-level application state and the main event loop.
//!
//! [`AppState`] holds the session controller and every widget state and
//! turns [`AppEvent`]s into controller calls. It is generic over the
//! scheduler so tests can drive it with a virtual clock.
//!
//! [`App::run`] sets up the terminal and drives a synchronous crossterm loop.
//! Network work runs on a tokio runtime owned by the [`App`]; replies and
//! timer ticks come back over channels and are drained between frames.

use crate::{
    commands::{execute_command, Command},
    event::{self, AppEvent, Keymap},
    theme::Theme,
    widgets::{
        catalog_tree::{CatalogTree, CatalogTreeState},
        command_bar::{CommandBar, CommandBarState},
        header::{Header, StatusLine},
        help::{HelpPopup, InfoPopup},
        log_view::{compose, LogView, LogViewState},
        query_bar::{QueryBar, QueryBarState},
    },
};
use crossterm::{
    event::{self as ct_event, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use mlv_client::{ApiClient, Executor, Reply};
use mlv_core::{
    config::Config,
    payload::{UpdateApplyPayload, UpdateCheckPayload},
    update, ApiError, Messages, Scheduler, SessionController, SessionMode, Severity, TimerId,
    TokioScheduler,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction as LayoutDir, Layout, Rect},
    Frame, Terminal,
};
use std::{
    io,
    time::{Duration, Instant},
};
use tokio::sync::mpsc;

/// Line-limit change per `]` / `[` press.
const LINE_STEP: i64 = 50;

// ---------------------------------------------------------------------------
// Focus + shell requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Catalog,
    Log,
    Query,
    Filter,
    /// Vim-style `:` command line is active.
    Command,
}

/// Work the shell does outside the session controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellRequest {
    CheckUpdate { manual: bool },
    ApplyUpdate,
}

#[derive(Debug)]
pub enum ShellReply {
    UpdateChecked {
        manual: bool,
        result: Result<UpdateCheckPayload, ApiError>,
    },
    UpdateApplied(Result<UpdateApplyPayload, ApiError>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Popup {
    pub title: String,
    pub lines: Vec<String>,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

pub struct AppState<S: Scheduler> {
    pub session: SessionController<S>,
    pub messages: Messages,
    pub theme: Theme,
    pub config: Config,
    pub keymap: Keymap,
    pub focus: Focus,
    /// Focus state before entering command mode, restored on exit.
    pub prev_focus: Focus,
    pub catalog: CatalogTreeState,
    pub view: LogViewState,
    pub query: QueryBarState,
    pub command_bar: CommandBarState,
    pub show_help: bool,
    pub popup: Option<Popup>,
    /// Shell message shown instead of the session status until the next key.
    flash: Option<(Severity, String)>,
    pub update_hint: Option<String>,
    /// Drained by the event loop after every event.
    pub requests: Vec<ShellRequest>,
    pub quit: bool,
    /// Selection the log view was last composed for.
    shown: Option<String>,
}

impl<S: Scheduler> AppState<S> {
    pub fn new(session: SessionController<S>, config: Config, theme: Theme, keymap: Keymap) -> Self {
        let mut view = LogViewState::default();
        view.show_line_numbers = config.ui.show_line_numbers;
        let mut state = Self {
            session,
            messages: Messages::english(),
            theme,
            config,
            keymap,
            focus: Focus::Catalog,
            prev_focus: Focus::Catalog,
            catalog: CatalogTreeState::default(),
            view,
            query: QueryBarState::default(),
            command_bar: CommandBarState::default(),
            show_help: false,
            popup: None,
            flash: None,
            update_hint: None,
            requests: Vec::new(),
            quit: false,
            shown: None,
        };
        state.sync_view();
        state
    }

    pub fn flash(&mut self, severity: Severity, text: String) {
        self.flash = Some((severity, text));
    }

    /// Text and severity for the status row.
    pub fn status_line(&self) -> (Severity, String) {
        match &self.flash {
            Some((severity, text)) => (*severity, text.clone()),
            None => {
                let status = self.session.status();
                (status.severity(), status.text(&self.messages))
            }
        }
    }

    pub fn toggle_case(&mut self) {
        let case_sensitive = !self.session.params().case_sensitive;
        self.session.set_case_sensitive(case_sensitive);
        tracing::debug!(case_sensitive, "case flag toggled");
        self.refresh_if_viewing();
    }

    /// Re-run the current view after a parameter change. Live mode picks
    /// the change up on its next tick.
    pub fn refresh_if_viewing(&mut self) {
        if self.session.mode() == SessionMode::Viewing {
            let _ = self.session.refresh();
        }
    }

    /// Recompose the log pane from the session.
    pub fn sync_view(&mut self) {
        let lines = compose(
            self.session.content(),
            self.session.overlay(),
            self.session.selected_log(),
            &self.messages,
        );

        let selected = self.session.selected_id().map(str::to_string);
        if selected != self.shown {
            if let Some(id) = &selected {
                self.catalog.reveal(self.session.catalog(), id);
            }
            self.shown = selected;
            self.view.reset(lines);
        } else {
            self.view.replace(lines);
        }

        let params = self.session.params();
        self.view.highlight = match self.session.overlay() {
            Some(results) => Some((results.query.clone(), params.case_sensitive)),
            None if params.has_query() => {
                Some((params.effective_query().to_string(), params.case_sensitive))
            }
            None => None,
        };
    }

    pub fn apply_shell_reply(&mut self, reply: ShellReply) {
        match reply {
            ShellReply::UpdateChecked { manual, result } => {
                if let Ok(payload) = &result {
                    self.update_hint = update::available_notice(payload, &self.messages);
                }
                if manual {
                    let severity = if result.is_ok() {
                        Severity::Info
                    } else {
                        Severity::Error
                    };
                    let summary = update::check_summary(&result, &self.messages);
                    self.flash(severity, summary);
                }
            }
            ShellReply::UpdateApplied(result) => {
                self.session.set_update_in_progress(false);
                if result.as_ref().is_ok_and(|p| mlv_core::payload::is_ok_status(&p.status)) {
                    self.update_hint = None;
                }
                self.flash = None;
                self.popup = Some(Popup {
                    title: "Update".to_string(),
                    lines: update::apply_report(&result, &self.messages),
                });
            }
        }
    }

    pub fn handle(&mut self, event: AppEvent) {
        if !matches!(event, AppEvent::Resize(_, _)) {
            self.flash = None;
        }

        // Popups intercept all events; only close keys pass through.
        if self.popup.is_some() || self.show_help {
            if matches!(
                event,
                AppEvent::Char('?') | AppEvent::Char('q') | AppEvent::Escape | AppEvent::Quit
            ) {
                tracing::debug!("popup closed");
                self.popup = None;
                self.show_help = false;
            }
            return;
        }

        match self.focus {
            Focus::Command => return self.handle_command_bar(event),
            Focus::Query => return self.handle_query(event),
            Focus::Filter => return self.handle_filter(event),
            Focus::Catalog | Focus::Log => {}
        }

        match event {
            AppEvent::Char('?') => {
                tracing::debug!("help popup opened");
                self.show_help = true;
            }
            AppEvent::Char(':') => {
                tracing::debug!(prev_focus = ?self.focus, "entering command mode");
                self.prev_focus = self.focus;
                self.command_bar.clear();
                self.focus = Focus::Command;
            }
            AppEvent::Quit => execute_command(self, Command::Quit),
            AppEvent::Escape => {
                if self.session.overlay().is_some() {
                    self.session.dismiss_overlay();
                }
            }
            AppEvent::FocusNext => self.cycle_focus(),
            AppEvent::QueryFocus => self.focus = Focus::Query,
            AppEvent::FilterFocus => self.focus = Focus::Filter,
            AppEvent::ToggleLive => {
                let _ = self.session.toggle_live();
            }
            AppEvent::Refresh => {
                let _ = self.session.refresh();
            }
            AppEvent::SearchAll => {
                let _ = self.session.search_all();
            }
            AppEvent::ToggleCase => self.toggle_case(),
            AppEvent::Download => {
                let _ = self.session.download();
            }
            AppEvent::LinesUp | AppEvent::LinesDown => {
                let delta = if event == AppEvent::LinesUp {
                    LINE_STEP
                } else {
                    -LINE_STEP
                };
                let limit = self.session.adjust_line_limit(delta);
                tracing::debug!(lines = limit.get(), "line limit adjusted");
                self.refresh_if_viewing();
            }
            AppEvent::ClearSearch => {
                self.query.clear();
                let _ = self.session.clear_search();
            }
            AppEvent::ScrollUp | AppEvent::ScrollDown | AppEvent::ScrollToTail => {
                self.view.handle(&event)
            }
            AppEvent::Resize(_, _) => {}
            other => self.dispatch_to_focused(other),
        }
    }

    fn cycle_focus(&mut self) {
        let next = match self.focus {
            Focus::Catalog => Focus::Log,
            Focus::Log => Focus::Query,
            Focus::Query | Focus::Filter | Focus::Command => Focus::Catalog,
        };
        tracing::debug!(from = ?self.focus, to = ?next, "focus cycle");
        self.focus = next;
    }

    fn dispatch_to_focused(&mut self, event: AppEvent) {
        match self.focus {
            Focus::Catalog => {
                if let Some(id) = self.catalog.handle(&event, self.session.catalog()) {
                    let _ = self.session.select_log(&id);
                }
            }
            Focus::Log => self.view.handle(&event),
            // Text inputs are routed before dispatch
            Focus::Query | Focus::Filter | Focus::Command => {}
        }
    }

    fn handle_command_bar(&mut self, event: AppEvent) {
        match event {
            AppEvent::Escape => {
                tracing::debug!("command bar cancelled");
                self.command_bar.clear();
                self.focus = self.prev_focus;
            }
            AppEvent::Quit => self.quit = true,
            AppEvent::Enter => {
                let input = self.command_bar.input.as_str().to_string();
                match Command::parse(&input) {
                    Ok(cmd) => {
                        tracing::debug!(command = ?cmd, "executing command");
                        self.command_bar.clear();
                        self.focus = self.prev_focus;
                        execute_command(self, cmd);
                    }
                    Err(msg) if msg.is_empty() => {
                        self.command_bar.clear();
                        self.focus = self.prev_focus;
                    }
                    Err(msg) => self.command_bar.error = Some(msg),
                }
            }
            other => self.command_bar.handle(&other),
        }
    }

    fn handle_query(&mut self, event: AppEvent) {
        match event {
            AppEvent::Escape => self.focus = Focus::Catalog,
            AppEvent::FocusNext => self.cycle_focus(),
            AppEvent::Quit => execute_command(self, Command::Quit),
            AppEvent::Enter => {
                tracing::debug!(query = %self.query.as_str(), "query submitted");
                if self.query.as_str().trim().is_empty() {
                    let _ = self.session.clear_search();
                } else if self.session.edit_query(self.query.as_str()).is_ok() {
                    let _ = self.session.refresh();
                }
                self.focus = Focus::Log;
            }
            other => {
                let before = self.query.clone();
                if self.query.handle(&other) {
                    // A non-empty query ends live mode immediately
                    if self.session.edit_query(self.query.as_str()).is_err() {
                        self.query = before;
                    }
                }
            }
        }
    }

    fn handle_filter(&mut self, event: AppEvent) {
        match event {
            AppEvent::Escape | AppEvent::Enter => self.focus = Focus::Catalog,
            AppEvent::FocusNext => self.cycle_focus(),
            AppEvent::Quit => execute_command(self, Command::Quit),
            other => {
                if self.catalog.filter.handle(&other) {
                    tracing::debug!(filter = %self.catalog.filter.as_str(), "catalog filter");
                    self.session.set_filter(self.catalog.filter.as_str());
                    self.catalog.cursor = 0;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct App {
    // Dropped before the runtime so timer tasks are aborted while it is alive.
    state: AppState<TokioScheduler>,
    executor: Executor,
    replies: mpsc::UnboundedReceiver<Reply>,
    ticks: mpsc::UnboundedReceiver<TimerId>,
    shell_tx: mpsc::UnboundedSender<ShellReply>,
    shell_rx: mpsc::UnboundedReceiver<ShellReply>,
    update_interval: Option<Duration>,
    next_update_check: Option<Instant>,
    runtime: tokio::runtime::Runtime,
}

impl App {
    pub fn new(config: Config, client: ApiClient, theme: Theme, keymap: Keymap) -> anyhow::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()?;

        let (scheduler, ticks) = TokioScheduler::new(runtime.handle().clone());
        let session = SessionController::new(scheduler, &config.session);
        let (executor, replies) = Executor::new(
            client,
            runtime.handle().clone(),
            config.api.download_dir.clone(),
        );
        let (shell_tx, shell_rx) = mpsc::unbounded_channel();
        let update_interval = config.session.update_check_interval();

        let mut state = AppState::new(session, config, theme, keymap);
        let _ = state.session.load_catalog();
        if update_interval.is_some() {
            state.requests.push(ShellRequest::CheckUpdate { manual: false });
        }

        Ok(Self {
            state,
            executor,
            replies,
            ticks,
            shell_tx,
            shell_rx,
            next_update_check: update_interval.map(|every| Instant::now() + every),
            update_interval,
            runtime,
        })
    }

    /// Set up the terminal, run the event loop, and restore the terminal on exit.
    pub fn run(mut self) -> anyhow::Result<()> {
        install_panic_hook();

        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(io::stdout());
        let mut terminal = Terminal::new(backend)?;

        let result = self.event_loop(&mut terminal);

        self.state.session.shutdown();

        // Always restore terminal, even if the loop returned an error
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        let _ = terminal.show_cursor();

        result
    }

    fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> anyhow::Result<()> {
        loop {
            let mut dirty = self.pump();
            self.flush();
            if dirty {
                self.state.sync_view();
            }

            {
                let s = &self.state;
                terminal.draw(|frame| draw(frame, s))?;
            }

            if self.state.quit {
                break;
            }

            dirty = false;
            if ct_event::poll(Duration::from_millis(16))? {
                let raw = ct_event::read()?;
                let app_event = match raw {
                    Event::Key(key) if key.kind != ct_event::KeyEventKind::Press => None,
                    Event::Key(_) if is_insert_mode(self.state.focus) => {
                        event::to_app_event_insert(raw)
                    }
                    other => event::to_app_event(other, &self.state.keymap),
                };
                if let Some(ev) = app_event {
                    tracing::debug!(focus = ?self.state.focus, event = ?ev, "key event");
                    self.state.handle(ev);
                    dirty = true;
                }
            }
            if dirty {
                self.state.sync_view();
            }
        }
        Ok(())
    }

    /// Apply every reply and tick that arrived since the last frame.
    fn pump(&mut self) -> bool {
        let mut dirty = false;
        while let Ok(reply) = self.replies.try_recv() {
            tracing::debug!(?reply, "reply");
            reply.apply(&mut self.state.session);
            dirty = true;
        }
        while let Ok(id) = self.ticks.try_recv() {
            dirty |= self.state.session.on_timer(id);
        }
        while let Ok(reply) = self.shell_rx.try_recv() {
            self.state.apply_shell_reply(reply);
            dirty = true;
        }
        if let (Some(due), Some(every)) = (self.next_update_check, self.update_interval) {
            if Instant::now() >= due {
                self.state.requests.push(ShellRequest::CheckUpdate { manual: false });
                self.next_update_check = Some(Instant::now() + every);
            }
        }
        dirty
    }

    /// Start whatever the last events asked for.
    fn flush(&mut self) {
        let effects = self.state.session.take_effects();
        if !effects.is_empty() {
            self.executor.dispatch(effects);
        }
        for request in std::mem::take(&mut self.state.requests) {
            tracing::debug!(?request, "shell request");
            let client = self.executor.client().clone();
            let tx = self.shell_tx.clone();
            self.runtime.spawn(async move {
                let reply = match request {
                    ShellRequest::CheckUpdate { manual } => ShellReply::UpdateChecked {
                        manual,
                        result: client.check_update().await,
                    },
                    ShellRequest::ApplyUpdate => ShellReply::UpdateApplied(client.apply_update().await),
                };
                let _ = tx.send(reply);
            });
        }
    }
}

/// Returns true when the current focus is on a text-input widget, meaning
/// alphabetic keys should produce characters rather than trigger shortcuts.
fn is_insert_mode(focus: Focus) -> bool {
    matches!(focus, Focus::Query | Focus::Filter | Focus::Command)
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn draw<S: Scheduler>(frame: &mut Frame, state: &AppState<S>) {
    let area = frame.area();

    // Vertical: header | body | 3-line query bar | status row
    let vert = Layout::default()
        .direction(LayoutDir::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Fill(1),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(area);

    let pct = state.config.ui.catalog_pane_width_pct.min(80);
    let horiz = Layout::default()
        .direction(LayoutDir::Horizontal)
        .constraints([Constraint::Percentage(pct), Constraint::Fill(1)])
        .split(vert[1]);

    let session = &state.session;
    let selected = session.selected_log();

    frame.render_widget(
        Header::new(session.mode(), &state.messages, &state.theme)
            .log_name(selected.map(|log| log.name.as_str()))
            .update_hint(state.update_hint.as_deref()),
        vert[0],
    );

    let tree = CatalogTree::new(&state.catalog, session.catalog(), &state.messages, &state.theme)
        .selected(session.selected_id())
        .focused(state.focus == Focus::Catalog, state.focus == Focus::Filter);
    let filter_cursor = tree.filter_cursor(horiz[0]);
    frame.render_widget(tree, horiz[0]);

    let title = match (session.overlay(), selected) {
        (Some(results), _) => format!("All logs: {}", results.query),
        (None, Some(log)) => format!("{} ({})", log.name, log.path),
        (None, None) => "Log".to_string(),
    };
    frame.render_widget(
        LogView::new(&state.view, &title, state.focus == Focus::Log, &state.theme),
        horiz[1],
    );

    let query_bar = QueryBar::new(
        &state.query,
        session.params(),
        state.focus == Focus::Query,
        &state.theme,
    );
    let query_cursor = query_bar.cursor_position(vert[2]);
    frame.render_widget(query_bar, vert[2]);

    let (severity, text) = state.status_line();
    frame.render_widget(StatusLine::new(&text, severity, &state.theme), vert[3]);

    if state.show_help {
        frame.render_widget(HelpPopup::new(&state.keymap, &state.theme), area);
    }
    if let Some(popup) = &state.popup {
        frame.render_widget(InfoPopup::new(&popup.title, &popup.lines, &state.theme), area);
    }

    match state.focus {
        // Command bar overlays the status row
        Focus::Command => {
            let cmd_area = Rect {
                y: area.bottom().saturating_sub(1),
                height: 1,
                ..area
            };
            frame.render_widget(CommandBar::new(&state.command_bar, &state.theme), cmd_area);
            frame.set_cursor_position((state.command_bar.cursor_col(cmd_area), cmd_area.y));
        }
        Focus::Query => frame.set_cursor_position(query_cursor),
        Focus::Filter => frame.set_cursor_position(filter_cursor),
        Focus::Catalog | Focus::Log => {}
    }
}

// ---------------------------------------------------------------------------
// Terminal helpers
// ---------------------------------------------------------------------------

fn install_panic_hook() {
    let original = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original(info);
    }));
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
