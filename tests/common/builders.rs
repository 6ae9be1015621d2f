//! Test builders: ergonomic constructors for catalog entries, payloads and
//! controllers.
//!
//! These builders are designed for readability in test assertions, not for
//! production use. They panic on invalid input rather than returning `Result`.

use mlv_core::config::SessionConfig;
use mlv_core::payload::{ListPayload, TailPayload};
use mlv_core::{Effect, LogDescriptor, ManualScheduler, SessionController, Ticket};
use mlv_core::payload::TailRequest;
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// LogBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for catalog entries, as wire JSON or as a descriptor.
///
/// # Example
///
/// ```rust
/// let log = LogBuilder::new("exim")
///     .name("Exim main log")
///     .category("Mail")
///     .compressed()
///     .descriptor();
/// ```
#[derive(Debug, Clone)]
pub struct LogBuilder {
    id: String,
    name: String,
    path: String,
    category: Option<String>,
    exists: bool,
    compressed: bool,
    size: Option<u64>,
    mtime: Option<i64>,
}

impl LogBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            path: format!("/var/log/{id}"),
            category: None,
            exists: true,
            compressed: false,
            size: None,
            mtime: None,
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }

    pub fn category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    pub fn missing(mut self) -> Self {
        self.exists = false;
        self
    }

    pub fn compressed(mut self) -> Self {
        self.compressed = true;
        self
    }

    pub fn size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn mtime(mut self, mtime: i64) -> Self {
        self.mtime = Some(mtime);
        self
    }

    pub fn json(&self) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "path": self.path,
            "category": self.category,
            "exists": self.exists,
            "compressed": self.compressed,
            "size": self.size,
            "mtime": self.mtime,
        })
    }

    pub fn descriptor(&self) -> LogDescriptor {
        serde_json::from_value(self.json()).unwrap()
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

pub fn list_payload(logs: &[LogBuilder]) -> ListPayload {
    ListPayload {
        status: "ok".into(),
        data: logs.iter().map(LogBuilder::descriptor).collect(),
        message: None,
    }
}

pub fn tail_payload(lines: &[&str]) -> TailPayload {
    TailPayload {
        status: "ok".into(),
        lines: lines.iter().map(|l| l.to_string()).collect(),
        meta: None,
        message: None,
    }
}

// ---------------------------------------------------------------------------
// Controllers
// ---------------------------------------------------------------------------

/// A controller on a virtual clock with the default 5 s live period. The
/// returned scheduler handle shares the controller's clock.
pub fn controller() -> (SessionController<ManualScheduler>, ManualScheduler) {
    let sched = ManualScheduler::new();
    let ctl = SessionController::new(sched.clone(), &SessionConfig::default());
    (ctl, sched)
}

/// A controller that went through a successful catalog load of `logs`
/// (which auto-selects the default log). Effects are left queued.
pub fn loaded(logs: &[LogBuilder]) -> (SessionController<ManualScheduler>, ManualScheduler) {
    let (mut ctl, sched) = controller();
    ctl.load_catalog().unwrap();
    let seq = match ctl.take_effects().as_slice() {
        [Effect::LoadCatalog { seq }] => *seq,
        other => panic!("expected a catalog load, got {other:?}"),
    };
    ctl.catalog_loaded(seq, Ok(list_payload(logs)));
    (ctl, sched)
}

/// Every tail fetch among `effects`.
pub fn fetches(effects: &[Effect]) -> Vec<(Ticket, TailRequest)> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::FetchTail { ticket, request } => Some((*ticket, request.clone())),
            _ => None,
        })
        .collect()
}

/// Drain the controller's effects, expecting exactly one tail fetch.
pub fn single_fetch(ctl: &mut SessionController<ManualScheduler>) -> (Ticket, TailRequest) {
    let mut all = fetches(&ctl.take_effects());
    assert_eq!(all.len(), 1, "expected exactly one fetch, got {all:?}");
    all.remove(0)
}
