//! Colour theme for the mlv TUI.
//!
//! Themes are defined as TOML files. Both built-in themes are embedded in the
//! binary via [`include_str!`] so the application works without any files on
//! disk. [`Theme::by_name`] resolves the `ui.theme` setting and the `:theme`
//! command.

use config::{Config, File, FileFormat};
use mlv_core::Severity;
use ratatui::style::{Color, Modifier, Style};
use serde::Deserialize;

const DEFAULT_THEME_SRC: &str = include_str!("themes/default.toml");
const GRUVBOX_DARK_THEME_SRC: &str = include_str!("themes/gruvbox_dark.toml");

// ---------------------------------------------------------------------------
// Raw (serde) types: mirror the TOML structure
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawStyle {
    fg: Option<String>,
    bg: Option<String>,
    #[serde(default)]
    bold: bool,
    #[serde(default)]
    dim: bool,
    #[serde(default)]
    italic: bool,
    #[serde(default)]
    underlined: bool,
}

impl RawStyle {
    fn into_style(self) -> Style {
        let mut style = Style::default();
        if let Some(c) = self.fg.as_deref().and_then(parse_color) {
            style = style.fg(c);
        }
        if let Some(c) = self.bg.as_deref().and_then(parse_color) {
            style = style.bg(c);
        }
        if self.bold {
            style = style.add_modifier(Modifier::BOLD);
        }
        if self.dim {
            style = style.add_modifier(Modifier::DIM);
        }
        if self.italic {
            style = style.add_modifier(Modifier::ITALIC);
        }
        if self.underlined {
            style = style.add_modifier(Modifier::UNDERLINED);
        }
        style
    }
}

#[derive(Debug, Deserialize)]
struct RawBorders {
    focused: RawStyle,
    command_bar: RawStyle,
    unfocused: RawStyle,
}

#[derive(Debug, Deserialize)]
struct RawSearch {
    highlight: RawStyle,
}

#[derive(Debug, Deserialize)]
struct RawStatus {
    info: RawStyle,
    error: RawStyle,
}

#[derive(Debug, Deserialize)]
struct RawBadges {
    live: RawStyle,
    compressed: RawStyle,
    search_all: RawStyle,
    update: RawStyle,
}

#[derive(Debug, Deserialize)]
struct RawCatalog {
    category: RawStyle,
    missing: RawStyle,
    compressed: RawStyle,
    subtitle: RawStyle,
    selected: RawStyle,
}

#[derive(Debug, Deserialize)]
struct RawViewer {
    section: RawStyle,
    placeholder: RawStyle,
    banner: RawStyle,
    line_number: RawStyle,
}

#[derive(Debug, Deserialize)]
struct RawTheme {
    borders: RawBorders,
    search: RawSearch,
    status: RawStatus,
    badges: RawBadges,
    catalog: RawCatalog,
    viewer: RawViewer,
}

// ---------------------------------------------------------------------------
// Public Theme type
// ---------------------------------------------------------------------------

/// Application colour theme. All styles are pre-resolved ratatui [`Style`]
/// values, so rendering never parses colours.
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: String,

    pub border_focused: Style,
    pub border_command_bar: Style,
    pub border_unfocused: Style,

    /// Inline highlight applied to matched search spans.
    pub search_highlight: Style,

    pub status_info: Style,
    pub status_error: Style,

    pub badge_live: Style,
    pub badge_compressed: Style,
    pub badge_search_all: Style,
    pub badge_update: Style,

    /// Category group headers in the catalog pane.
    pub category_header: Style,
    pub entry_missing: Style,
    pub entry_compressed: Style,
    pub entry_subtitle: Style,
    /// Marker style for the log currently being viewed.
    pub entry_selected: Style,

    /// `== name (path) ==` headers in cross-log results.
    pub section_header: Style,
    pub placeholder: Style,
    pub compressed_banner: Style,
    pub line_number: Style,
}

impl Theme {
    /// Load and parse the embedded default theme.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML is malformed.
    pub fn load_default() -> Self {
        Self::from_toml_str("default", DEFAULT_THEME_SRC)
            .expect("embedded default theme must be valid TOML")
    }

    /// Load and parse the embedded Gruvbox Dark theme.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML is malformed.
    pub fn load_gruvbox_dark() -> Self {
        Self::from_toml_str("gruvbox_dark", GRUVBOX_DARK_THEME_SRC)
            .expect("embedded gruvbox dark theme must be valid TOML")
    }

    /// Resolve a built-in theme name. Unknown names yield `None`.
    pub fn by_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "default" => Some(Self::load_default()),
            "gruvbox" | "gruvbox_dark" | "gruvbox-dark" => Some(Self::load_gruvbox_dark()),
            _ => None,
        }
    }

    /// Parse a theme from a TOML string. Unknown keys are ignored.
    pub fn from_toml_str(name: &str, src: &str) -> anyhow::Result<Self> {
        let raw: RawTheme = Config::builder()
            .add_source(File::from_str(src, FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        Ok(Self {
            name: name.to_string(),
            border_focused: raw.borders.focused.into_style(),
            border_command_bar: raw.borders.command_bar.into_style(),
            border_unfocused: raw.borders.unfocused.into_style(),
            search_highlight: raw.search.highlight.into_style(),
            status_info: raw.status.info.into_style(),
            status_error: raw.status.error.into_style(),
            badge_live: raw.badges.live.into_style(),
            badge_compressed: raw.badges.compressed.into_style(),
            badge_search_all: raw.badges.search_all.into_style(),
            badge_update: raw.badges.update.into_style(),
            category_header: raw.catalog.category.into_style(),
            entry_missing: raw.catalog.missing.into_style(),
            entry_compressed: raw.catalog.compressed.into_style(),
            entry_subtitle: raw.catalog.subtitle.into_style(),
            entry_selected: raw.catalog.selected.into_style(),
            section_header: raw.viewer.section.into_style(),
            placeholder: raw.viewer.placeholder.into_style(),
            compressed_banner: raw.viewer.banner.into_style(),
            line_number: raw.viewer.line_number.into_style(),
        })
    }

    pub fn status_style(&self, severity: Severity) -> Style {
        match severity {
            Severity::Info => self.status_info,
            Severity::Error => self.status_error,
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a colour name into a ratatui [`Color`].
///
/// Accepts:
/// - Named terminal colours (case-insensitive): `red`, `dark_gray`, etc.
/// - Hex RGB: `#rrggbb`
/// - 256-colour indexed: `indexed:N`
fn parse_color(s: &str) -> Option<Color> {
    match s.to_ascii_lowercase().as_str() {
        "black" => Some(Color::Black),
        "red" => Some(Color::Red),
        "green" => Some(Color::Green),
        "yellow" => Some(Color::Yellow),
        "blue" => Some(Color::Blue),
        "magenta" => Some(Color::Magenta),
        "cyan" => Some(Color::Cyan),
        "gray" | "grey" => Some(Color::Gray),
        "dark_gray" | "darkgray" | "dark_grey" | "darkgrey" => Some(Color::DarkGray),
        "light_red" => Some(Color::LightRed),
        "light_green" => Some(Color::LightGreen),
        "light_yellow" => Some(Color::LightYellow),
        "light_blue" => Some(Color::LightBlue),
        "light_magenta" => Some(Color::LightMagenta),
        "light_cyan" => Some(Color::LightCyan),
        "white" => Some(Color::White),
        s if s.starts_with('#') && s.len() == 7 => {
            let r = u8::from_str_radix(&s[1..3], 16).ok()?;
            let g = u8::from_str_radix(&s[3..5], 16).ok()?;
            let b = u8::from_str_radix(&s[5..7], 16).ok()?;
            Some(Color::Rgb(r, g, b))
        }
        s if s.starts_with("indexed:") => {
            let n: u8 = s["indexed:".len()..].parse().ok()?;
            Some(Color::Indexed(n))
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::default(Theme::load_default())]
    #[case::gruvbox(Theme::load_gruvbox_dark())]
    fn embedded_themes_load(#[case] theme: Theme) {
        assert_ne!(theme.border_focused, Style::default());
        assert_ne!(theme.search_highlight, Style::default());
        assert_ne!(theme.status_error, Style::default());
        assert_ne!(theme.badge_live, Style::default());
        assert_ne!(theme.section_header, Style::default());
    }

    #[test]
    fn by_name_resolves_aliases() {
        assert_eq!(Theme::by_name("Gruvbox").map(|t| t.name), Some("gruvbox_dark".to_string()));
        assert_eq!(Theme::by_name("default").map(|t| t.name), Some("default".to_string()));
        assert!(Theme::by_name("solarized").is_none());
    }

    #[test]
    fn status_style_follows_severity() {
        let theme = Theme::load_default();
        assert_eq!(theme.status_style(Severity::Error), theme.status_error);
        assert_ne!(theme.status_style(Severity::Info), theme.status_error);
    }

    #[test]
    fn incomplete_theme_is_an_error() {
        assert!(Theme::from_toml_str("broken", "[borders]\n").is_err());
    }

    #[rstest]
    #[case("#ff0080", Some(Color::Rgb(255, 0, 128)))]
    #[case("indexed:42", Some(Color::Indexed(42)))]
    #[case("Dark_Gray", Some(Color::DarkGray))]
    #[case("chartreuse", None)]
    fn parse_colors(#[case] raw: &str, #[case] expected: Option<Color>) {
        assert_eq!(parse_color(raw), expected);
    }
}
