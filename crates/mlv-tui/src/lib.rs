//! mlv TUI: ratatui application shell.

pub mod app;
pub mod commands;
pub mod event;
pub mod theme;
pub mod widgets;

pub use app::App;

/// Start the interactive viewer against the configured (or overridden) API.
pub fn run(config: mlv_core::config::Config, base_override: Option<&str>) -> anyhow::Result<()> {
    let theme = theme::Theme::by_name(&config.ui.theme).unwrap_or_else(|| {
        tracing::warn!(theme = %config.ui.theme, "unknown theme, using default");
        theme::Theme::load_default()
    });
    let keymap = event::Keymap::from_config(&config.keybindings)?;
    let client = mlv_client::ApiClient::from_config(&config.api, base_override)?;
    tracing::info!(base = %client.base_url(), "starting mlv");
    App::new(config, client, theme, keymap)?.run()
}
