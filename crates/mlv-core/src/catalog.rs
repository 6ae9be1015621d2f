//! Log catalog: the list of logs the server advertises, plus the user's
//! name filter over it.
//!
//! The server already sorts the list by priority, so the catalog never
//! re-sorts: every view is an order-preserving subsequence of what the
//! server sent. Grouping by category is a separate stateless projection
//! ([`group_by_category`]) used only for display.

use crate::payload::TailMeta;
use crate::types::{Category, LogDescriptor};
use std::collections::BTreeMap;

/// The loaded catalog. Replaced wholesale on every load.
#[derive(Debug, Clone, Default)]
pub struct LogCatalog {
    entries: Vec<LogDescriptor>,
    filter: String,
}

impl LogCatalog {
    pub fn new(entries: Vec<LogDescriptor>) -> Self {
        Self {
            entries,
            filter: String::new(),
        }
    }

    /// Swap in a freshly loaded list. The filter term survives.
    pub fn replace(&mut self, entries: Vec<LogDescriptor>) {
        tracing::debug!(count = entries.len(), "catalog: replaced");
        self.entries = entries;
    }

    pub fn entries(&self) -> &[LogDescriptor] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&LogDescriptor> {
        self.entries.iter().find(|log| log.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Number of logs the server reports as present on disk.
    pub fn existing_count(&self) -> usize {
        self.entries.iter().filter(|log| log.exists).count()
    }

    /// Case-insensitive substring match of `term` against `name` and `id`.
    /// A blank term returns the whole catalog in server order.
    pub fn filter(&self, term: &str) -> Vec<&LogDescriptor> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return self.entries.iter().collect();
        }
        self.entries
            .iter()
            .filter(|log| {
                log.name.to_lowercase().contains(&term) || log.id.to_lowercase().contains(&term)
            })
            .collect()
    }

    pub fn set_filter(&mut self, term: impl Into<String>) {
        self.filter = term.into();
    }

    pub fn filter_term(&self) -> &str {
        &self.filter
    }

    /// The catalog as seen through the current filter term.
    pub fn view(&self) -> Vec<&LogDescriptor> {
        self.filter(&self.filter)
    }

    /// Default pick for a fresh session, searched in the filtered view: the
    /// first readable log, else the first existing one, else the first one.
    pub fn first_available(&self) -> Option<&LogDescriptor> {
        let view = self.view();
        view.iter()
            .find(|log| log.is_readable())
            .or_else(|| view.iter().find(|log| log.exists))
            .or_else(|| view.first())
            .copied()
    }

    /// Refresh `size`/`mtime` of one entry from tail metadata. Fields the
    /// server left out are kept.
    pub fn apply_meta(&mut self, id: &str, meta: &TailMeta) -> bool {
        match self.entries.iter_mut().find(|log| log.id == id) {
            Some(log) => {
                if meta.size.is_some() {
                    log.size = meta.size;
                }
                if meta.mtime.is_some() {
                    log.mtime = meta.mtime;
                }
                true
            }
            None => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Category projection
// ---------------------------------------------------------------------------

/// One category section of the catalog display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryGroup<'a> {
    pub category: Category,
    /// Existing logs first, then missing ones; server order within each.
    pub logs: Vec<&'a LogDescriptor>,
}

/// Group a catalog view by category in display order: the fixed priority
/// list first, then unknown categories alphabetically.
pub fn group_by_category<'a>(logs: &[&'a LogDescriptor]) -> Vec<CategoryGroup<'a>> {
    let mut buckets: BTreeMap<Category, (Vec<&'a LogDescriptor>, Vec<&'a LogDescriptor>)> =
        BTreeMap::new();
    for log in logs {
        let (present, missing) = buckets.entry(log.category()).or_default();
        if log.exists {
            present.push(log);
        } else {
            missing.push(log);
        }
    }
    buckets
        .into_iter()
        .map(|(category, (mut present, missing))| {
            present.extend(missing);
            CategoryGroup {
                category,
                logs: present,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
