//! Configuration types for mlv.
//!
//! [`Config::load`] layers, lowest first: the embedded defaults,
//! `~/.config/mlv/config.toml` (created with the defaults if it does not yet
//! exist), then `MLV_*` environment variables (`MLV_API__BASE_URL` sets
//! `api.base_url`). CLI flags are applied by the binary on top of the
//! result. [`Config::defaults`] returns the embedded defaults without
//! touching the filesystem or the environment (useful in tests).

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Embedded defaults
// ---------------------------------------------------------------------------

const DEFAULT_CONFIG: &str = r#"
[api]
# base_url  = "http://server.example:2086/cgi/mlv/"
page_url      = "http://127.0.0.1:2086/cgi/mlv/index.html"
endpoint      = "mlv.cgi"
timeout_secs  = 30
download_dir  = "."

[session]
default_lines              = 100
live_period_ms             = 5000
update_check_interval_secs = 1800

[ui]
catalog_pane_width_pct = 30
show_line_numbers      = false
theme                  = "default"

[keybindings]
toggle_focus   = "Tab"
query_focus    = "/"
filter_focus   = "f"
toggle_live    = "L"
refresh        = "r"
search_all     = "A"
toggle_case    = "c"
download       = "d"
lines_up       = "]"
lines_down     = "["
clear_search   = "x"
"#;

// ---------------------------------------------------------------------------
// Public config types
// ---------------------------------------------------------------------------

/// Top-level application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub keybindings: KeybindingsConfig,
}

/// `[api]` section: where the `mlv.cgi` endpoint lives and how to reach it.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Explicit base URL. Wins over `page_url` when set.
    #[serde(default)]
    pub base_url: Option<String>,
    /// URL of the viewer page the base is derived from.
    #[serde(default = "default_page_url")]
    pub page_url: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Sent verbatim as the `Authorization` header.
    #[serde(default)]
    pub authorization: Option<String>,
    /// Sent verbatim as the `Cookie` header.
    #[serde(default)]
    pub cookie: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
}

fn default_page_url() -> String { "http://127.0.0.1:2086/cgi/mlv/index.html".to_string() }
fn default_endpoint() -> String { "mlv.cgi".to_string() }
fn default_timeout_secs() -> u64 { 30 }
fn default_download_dir() -> PathBuf { PathBuf::from(".") }

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            page_url: default_page_url(),
            endpoint: default_endpoint(),
            authorization: None,
            cookie: None,
            timeout_secs: default_timeout_secs(),
            download_dir: default_download_dir(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// `[session]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_lines")]
    pub default_lines: u32,
    #[serde(default = "default_live_period_ms")]
    pub live_period_ms: u64,
    #[serde(default = "default_update_check_interval_secs")]
    pub update_check_interval_secs: u64,
}

fn default_lines() -> u32 { 100 }
fn default_live_period_ms() -> u64 { 5_000 }
fn default_update_check_interval_secs() -> u64 { 1_800 }

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_lines: default_lines(),
            live_period_ms: default_live_period_ms(),
            update_check_interval_secs: default_update_check_interval_secs(),
        }
    }
}

impl SessionConfig {
    pub fn live_period(&self) -> Duration {
        Duration::from_millis(self.live_period_ms.max(1))
    }

    /// Zero disables the periodic update check.
    pub fn update_check_interval(&self) -> Option<Duration> {
        (self.update_check_interval_secs > 0)
            .then(|| Duration::from_secs(self.update_check_interval_secs))
    }
}

/// `[ui]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_catalog_pane_width_pct")]
    pub catalog_pane_width_pct: u16,
    #[serde(default)]
    pub show_line_numbers: bool,
    #[serde(default = "default_theme")]
    pub theme: String,
}

fn default_catalog_pane_width_pct() -> u16 { 30 }
fn default_theme() -> String { "default".to_string() }

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            catalog_pane_width_pct: default_catalog_pane_width_pct(),
            show_line_numbers: false,
            theme: default_theme(),
        }
    }
}

/// `[keybindings]` section of `config.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct KeybindingsConfig {
    #[serde(default = "default_toggle_focus")]
    pub toggle_focus: String,
    #[serde(default = "default_query_focus")]
    pub query_focus: String,
    #[serde(default = "default_filter_focus")]
    pub filter_focus: String,
    #[serde(default = "default_toggle_live")]
    pub toggle_live: String,
    #[serde(default = "default_refresh")]
    pub refresh: String,
    #[serde(default = "default_search_all")]
    pub search_all: String,
    #[serde(default = "default_toggle_case")]
    pub toggle_case: String,
    #[serde(default = "default_download")]
    pub download: String,
    #[serde(default = "default_lines_up")]
    pub lines_up: String,
    #[serde(default = "default_lines_down")]
    pub lines_down: String,
    #[serde(default = "default_clear_search")]
    pub clear_search: String,
}

fn default_toggle_focus() -> String { "Tab".to_string() }
fn default_query_focus() -> String { "/".to_string() }
fn default_filter_focus() -> String { "f".to_string() }
fn default_toggle_live() -> String { "L".to_string() }
fn default_refresh() -> String { "r".to_string() }
fn default_search_all() -> String { "A".to_string() }
fn default_toggle_case() -> String { "c".to_string() }
fn default_download() -> String { "d".to_string() }
fn default_lines_up() -> String { "]".to_string() }
fn default_lines_down() -> String { "[".to_string() }
fn default_clear_search() -> String { "x".to_string() }

impl Default for KeybindingsConfig {
    fn default() -> Self {
        Self {
            toggle_focus: default_toggle_focus(),
            query_focus: default_query_focus(),
            filter_focus: default_filter_focus(),
            toggle_live: default_toggle_live(),
            refresh: default_refresh(),
            search_all: default_search_all(),
            toggle_case: default_toggle_case(),
            download: default_download(),
            lines_up: default_lines_up(),
            lines_down: default_lines_down(),
            clear_search: default_clear_search(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::defaults()
    }
}

impl Config {
    /// Load from `~/.config/mlv/config.toml` and the environment, layered on
    /// top of the built-in defaults. Creates the file with defaults if it
    /// does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let path = config_path();

        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, DEFAULT_CONFIG.trim_start())?;
            tracing::info!(path = %path.display(), "wrote default config");
        }

        Self::from_layers(Some(path))
    }

    /// Like [`Config::load`] but never writes to disk; `path` may be absent.
    pub fn from_layers(path: Option<PathBuf>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml));
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path.as_path()).required(false));
        }
        builder
            .add_source(
                config::Environment::with_prefix("MLV")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
            .map_err(Into::into)
    }

    /// Return the built-in defaults without touching the filesystem.
    pub fn defaults() -> Self {
        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .build()
            .expect("built-in default config must be valid TOML")
            .try_deserialize()
            .expect("built-in default config must deserialize correctly")
    }
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

/// `$XDG_CONFIG_HOME/mlv/config.toml`, falling back to `~/.config`.
pub fn config_path() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".to_string()))
                .join(".config")
        })
        .join("mlv")
        .join("config.toml")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
