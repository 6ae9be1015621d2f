//! Non-interactive subcommands.
//!
//! Each command builds a [`SessionController`] on a virtual clock, queues
//! one action, drives it to rest with [`settle`], and prints what the TUI
//! would have shown in its log pane. Failures come back as `Err` carrying
//! the same status text the TUI displays.

use mlv_client::{settle, ApiClient};
use mlv_core::{
    config::Config, format, group_by_category, payload::is_ok_status, update, Guard,
    LogCatalog, LogDescriptor, ManualScheduler, Messages, SessionController, SessionError,
    Severity, Status,
};
use mlv_tui::widgets::log_view::compose;
use std::io::Write;
use std::path::Path;

/// Options shared by `tail` and `search-all`.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Raw line-limit input; parsed and clamped like the query bar does.
    pub lines: Option<String>,
    pub search: Option<String>,
    pub case_sensitive: bool,
}

pub struct Headless {
    client: ApiClient,
    config: Config,
    messages: Messages,
}

impl Headless {
    pub fn new(client: ApiClient, config: Config) -> Self {
        Self {
            client,
            config,
            messages: Messages::english(),
        }
    }

    async fn fetch_catalog(&self) -> anyhow::Result<Vec<LogDescriptor>> {
        let failed = |err: SessionError| {
            anyhow::anyhow!(Status::CatalogFailed(err).text(&self.messages))
        };
        let payload = self.client.list().await.map_err(|err| failed(err.into()))?;
        if !is_ok_status(&payload.status) {
            return Err(failed(SessionError::Server(payload.message.unwrap_or_default())));
        }
        tracing::debug!(logs = payload.data.len(), "headless: catalog fetched");
        Ok(payload.data)
    }

    fn session(&self, entries: Vec<LogDescriptor>, opts: &SearchOptions) -> SessionController<ManualScheduler> {
        let mut session =
            SessionController::new(ManualScheduler::new(), &self.config.session).with_catalog(entries);
        if let Some(lines) = &opts.lines {
            session.set_line_limit_input(lines);
        }
        session.set_case_sensitive(opts.case_sensitive);
        session
    }

    async fn settle(&self, session: &mut SessionController<ManualScheduler>) {
        settle(&self.client, session, &self.config.api.download_dir).await;
    }

    fn check(&self, session: &SessionController<ManualScheduler>) -> anyhow::Result<()> {
        let status = session.status();
        if status.severity() == Severity::Error {
            anyhow::bail!(status.text(&self.messages));
        }
        Ok(())
    }

    /// Print the catalog grouped by category.
    pub async fn list(&self, out: &mut impl Write) -> anyhow::Result<()> {
        let catalog = LogCatalog::new(self.fetch_catalog().await?);
        if catalog.is_empty() {
            anyhow::bail!(Status::NoLogsConfigured.text(&self.messages));
        }

        let view = catalog.view();
        for (i, group) in group_by_category(&view).into_iter().enumerate() {
            if i > 0 {
                writeln!(out)?;
            }
            writeln!(out, "{} ({})", self.messages.category(&group.category), group.logs.len())?;
            for log in group.logs {
                let mut line = format!("  {:<20} {}", log.id, log.name);
                if log.compressed {
                    line.push_str(&format!(" [{}]", self.messages.get("badge.compressed")));
                }
                if !log.exists {
                    line.push_str(&format!(" ✗ {}", self.messages.get("list.not_found")));
                }
                let subtitle = format::subtitle(log);
                if !subtitle.is_empty() {
                    line.push_str(&format!("  {subtitle}"));
                }
                writeln!(out, "{line}")?;
            }
        }

        let summary = Status::catalog_summary(catalog.existing_count(), catalog.len());
        if summary != Status::Ready {
            writeln!(out, "\n{}", summary.text(&self.messages))?;
        }
        tracing::info!(found = catalog.existing_count(), total = catalog.len(), "headless: list done");
        Ok(())
    }

    /// Print the tail (or search result) of one log.
    pub async fn tail(&self, id: &str, opts: &SearchOptions, out: &mut impl Write) -> anyhow::Result<()> {
        let mut session = self.session(self.fetch_catalog().await?, opts);
        if let Some(search) = &opts.search {
            session.edit_query(search.as_str())?;
        }
        if session.select_log(id).is_err() {
            self.check(&session)?;
        }
        self.settle(&mut session).await;
        self.check(&session)?;

        for line in compose(session.content(), None, session.selected_log(), &self.messages) {
            writeln!(out, "{}", line.text)?;
        }
        Ok(())
    }

    /// Search every configured log and print one section per log.
    pub async fn search_all(&self, query: &str, opts: &SearchOptions, out: &mut impl Write) -> anyhow::Result<()> {
        let mut session = self.session(Vec::new(), opts);
        session.edit_query(query)?;
        if session.search_all().is_err() {
            self.check(&session)?;
        }
        self.settle(&mut session).await;
        self.check(&session)?;

        for line in compose(session.content(), session.overlay(), None, &self.messages) {
            writeln!(out, "{}", line.text)?;
        }
        Ok(())
    }

    /// Save a compressed log into `dest` and print where it went.
    pub async fn download(&self, id: &str, dest: &Path, out: &mut impl Write) -> anyhow::Result<()> {
        let entries = self.fetch_catalog().await?;
        // Selecting a readable log would fetch its tail for nothing.
        let gate = match entries.iter().find(|log| log.id == id) {
            None => Some(SessionError::NotFound(id.to_string())),
            Some(log) if !log.compressed => Some(SessionError::Guarded(Guard::NotCompressed)),
            Some(_) => None,
        };
        if let Some(err) = gate {
            anyhow::bail!(Status::Rejected(err).text(&self.messages));
        }

        let mut session = self.session(entries, &SearchOptions::default());
        session.select_log(id)?;
        session.download()?;
        settle(&self.client, &mut session, dest).await;
        self.check(&session)?;
        writeln!(out, "{}", session.status().text(&self.messages))?;
        Ok(())
    }

    /// Print the installed and available versions, and the changelog when
    /// an update exists.
    pub async fn check_update(&self, out: &mut impl Write) -> anyhow::Result<()> {
        let result = self.client.check_update().await;
        let summary = update::check_summary(&result, &self.messages);
        let payload = result.map_err(|_| anyhow::anyhow!(summary.clone()))?;
        if !is_ok_status(&payload.status) {
            anyhow::bail!(summary);
        }
        writeln!(out, "{summary}")?;
        if let Some(notice) = update::available_notice(&payload, &self.messages) {
            writeln!(out, "{notice}")?;
            if let Some(changelog) = payload.changelog.as_deref().filter(|c| !c.trim().is_empty()) {
                writeln!(out)?;
                writeln!(out, "{}", changelog.trim_end())?;
            }
        }
        Ok(())
    }

    /// Run the server-side update and print its report.
    pub async fn apply_update(&self, out: &mut impl Write) -> anyhow::Result<()> {
        writeln!(out, "{}", self.messages.get("update.downloading"))?;
        let result = self.client.apply_update().await;
        let report = update::apply_report(&result, &self.messages);
        for line in &report {
            writeln!(out, "{line}")?;
        }
        match result {
            Ok(payload) if is_ok_status(&payload.status) => Ok(()),
            _ => anyhow::bail!(report.into_iter().next().unwrap_or_default()),
        }
    }
}
