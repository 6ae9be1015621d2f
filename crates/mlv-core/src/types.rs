//! Core types for mlv-core.
//!
//! This module defines the data shared by every layer: the server-reported
//! [`LogDescriptor`], its [`Category`] bucket, the user's [`SearchParams`]
//! with the clamped [`LineLimit`], and the [`SessionMode`] discriminant.

use serde::{Deserialize, Deserializer};
use std::cmp::Ordering;

/// Server-reported metadata for one log file.
///
/// Immutable once loaded, except `size` and `mtime` which the session
/// controller refreshes after every successful tail.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LogDescriptor {
    /// Stable unique key used in every API call.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub path: String,
    /// Free-form category label as sent by the server.
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub exists: bool,
    /// The server sends either `true` or the string `"true"`.
    #[serde(default, deserialize_with = "lenient_bool")]
    pub compressed: bool,
    /// Size in bytes.
    #[serde(default, deserialize_with = "lenient_opt_u64")]
    pub size: Option<u64>,
    /// Modification time, epoch seconds.
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub mtime: Option<i64>,
}

impl LogDescriptor {
    /// The taxonomy bucket for this log's category label.
    pub fn category(&self) -> Category {
        Category::from_label(self.category.as_deref())
    }

    /// A log can be read inline only when it exists and is not compressed.
    pub fn is_readable(&self) -> bool {
        self.exists && !self.compressed
    }
}

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// Fixed category taxonomy. Anything the server sends outside the fixed list
/// lands in [`Category::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Category {
    CPanel,
    WebServer,
    Mail,
    Security,
    Database,
    System,
    Other,
    Custom(String),
}

impl Category {
    /// Display priority of the fixed categories.
    pub const ORDER: [Category; 7] = [
        Category::CPanel,
        Category::WebServer,
        Category::Mail,
        Category::Security,
        Category::Database,
        Category::System,
        Category::Other,
    ];

    /// Bucket a raw label. A missing or blank label is [`Category::Other`].
    pub fn from_label(label: Option<&str>) -> Self {
        let label = match label.map(str::trim) {
            Some(l) if !l.is_empty() => l,
            _ => return Category::Other,
        };
        match label {
            "cPanel" => Category::CPanel,
            "Web Server" => Category::WebServer,
            "Mail" => Category::Mail,
            "Security" => Category::Security,
            "Database" => Category::Database,
            "System" => Category::System,
            "Other" => Category::Other,
            other => Category::Custom(other.to_string()),
        }
    }

    /// The label as the server spells it.
    pub fn label(&self) -> &str {
        match self {
            Category::CPanel => "cPanel",
            Category::WebServer => "Web Server",
            Category::Mail => "Mail",
            Category::Security => "Security",
            Category::Database => "Database",
            Category::System => "System",
            Category::Other => "Other",
            Category::Custom(label) => label,
        }
    }

    /// Message-table slug: lowercase with runs of non-alphanumerics folded
    /// to `_` (`"Web Server"` → `"web_server"`).
    pub fn slug(&self) -> String {
        let mut slug = String::new();
        let mut gap = false;
        for c in self.label().chars() {
            if c.is_ascii_alphanumeric() {
                slug.push(c.to_ascii_lowercase());
                gap = false;
            } else if !gap {
                slug.push('_');
                gap = true;
            }
        }
        slug
    }

    fn rank(&self) -> usize {
        Self::ORDER
            .iter()
            .position(|c| c == self)
            .unwrap_or(Self::ORDER.len())
    }
}

impl Ord for Category {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Category::Custom(a), Category::Custom(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Category {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Search parameters
// ---------------------------------------------------------------------------

/// Number of tail lines requested from the server, always within
/// [`LineLimit::MIN`]..=[`LineLimit::MAX`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineLimit(u32);

impl LineLimit {
    pub const MIN: u32 = 10;
    pub const MAX: u32 = 2000;
    pub const DEFAULT: u32 = 100;

    /// Clamp any integer into range.
    pub fn clamped(value: i64) -> Self {
        Self(value.clamp(Self::MIN as i64, Self::MAX as i64) as u32)
    }

    /// Parse user input. Leading integer digits are honoured (`"250 lines"`
    /// is 250); anything non-numeric falls back to `default`, itself clamped.
    pub fn parse_or(input: &str, default: u32) -> Self {
        let input = input.trim();
        let (sign, digits) = match input.strip_prefix('-') {
            Some(rest) => (-1i64, rest),
            None => (1i64, input.strip_prefix('+').unwrap_or(input)),
        };
        let end = digits
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(digits.len());
        match digits[..end].parse::<i64>() {
            Ok(n) => Self::clamped(sign * n),
            // Digit runs too long for i64 are still "a number", just huge
            Err(_) if end > 0 => Self::clamped(sign * i64::MAX),
            Err(_) => Self::clamped(default as i64),
        }
    }

    /// Shift by `delta`, clamping the result.
    pub fn saturating_add(self, delta: i64) -> Self {
        Self::clamped(self.0 as i64 + delta)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for LineLimit {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl std::fmt::Display for LineLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The user's search settings for tail and search-all requests.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchParams {
    /// Raw text as typed. Use [`SearchParams::effective_query`] for requests.
    pub query: String,
    pub case_sensitive: bool,
    pub line_limit: LineLimit,
}

impl SearchParams {
    /// The trimmed query; an empty string means "no filtering".
    pub fn effective_query(&self) -> &str {
        self.query.trim()
    }

    pub fn has_query(&self) -> bool {
        !self.effective_query().is_empty()
    }
}

// ---------------------------------------------------------------------------
// Session mode
// ---------------------------------------------------------------------------

/// Which of the mutually exclusive session states is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionMode {
    /// No log selected.
    Idle,
    /// Static tail, possibly filtered by the search query.
    Viewing,
    /// Auto-polling tail; the query must be empty.
    Live,
    /// The selected log is compressed; only download is allowed.
    Compressed,
    /// Cross-log search results are displayed over the selection.
    SearchingAll,
}

impl std::fmt::Display for SessionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionMode::Idle => write!(f, "idle"),
            SessionMode::Viewing => write!(f, "viewing"),
            SessionMode::Live => write!(f, "live"),
            SessionMode::Compressed => write!(f, "compressed"),
            SessionMode::SearchingAll => write!(f, "search-all"),
        }
    }
}

// ---------------------------------------------------------------------------
// Lenient serde helpers
// ---------------------------------------------------------------------------

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    use serde_json::Value;
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        _ => false,
    })
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde_json::Value;
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

/// Reads an explicit `null` as the default value.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub(crate) fn lenient_opt_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_number(deserializer)?
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map(|n| n as u64))
}

pub(crate) fn lenient_opt_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_number(deserializer)?
        .filter(|n| n.is_finite())
        .map(|n| n as i64))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
