//! Performs session [`Effect`]s against the API and routes the replies back.
//!
//! Each effect runs on its own tokio task. Replies travel over an unbounded
//! channel to whichever thread owns the [`SessionController`], which applies
//! them with [`Reply::apply`]. Ordering between replies is irrelevant: the
//! controller's tickets decide what is still wanted.

use crate::client::ApiClient;
use mlv_core::payload::{ListPayload, SearchAllPayload, TailPayload};
use mlv_core::schedule::Scheduler;
use mlv_core::{ApiError, Effect, SessionController, Ticket};
use std::path::{Path, PathBuf};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

/// The outcome of one effect.
#[derive(Debug)]
pub enum Reply {
    Tail {
        ticket: Ticket,
        result: Result<TailPayload, ApiError>,
    },
    SearchAll {
        seq: u64,
        result: Result<SearchAllPayload, ApiError>,
    },
    Catalog {
        seq: u64,
        result: Result<ListPayload, ApiError>,
    },
    Download {
        result: Result<PathBuf, ApiError>,
    },
}

impl Reply {
    /// Feed this reply into the controller it was produced for.
    pub fn apply<S: Scheduler>(self, session: &mut SessionController<S>) {
        match self {
            Reply::Tail { ticket, result } => session.tail_loaded(ticket, result),
            Reply::SearchAll { seq, result } => session.search_all_loaded(seq, result),
            Reply::Catalog { seq, result } => session.catalog_loaded(seq, result),
            Reply::Download { result } => session.download_finished(result),
        }
    }
}

/// Run one effect to completion.
pub async fn perform(client: &ApiClient, effect: Effect, download_dir: &Path) -> Reply {
    match effect {
        Effect::FetchTail { ticket, request } => Reply::Tail {
            ticket,
            result: client.tail(&request).await,
        },
        Effect::SearchAll { seq, request } => Reply::SearchAll {
            seq,
            result: client.search_all(&request).await,
        },
        Effect::LoadCatalog { seq } => Reply::Catalog {
            seq,
            result: client.list().await,
        },
        Effect::Download { id, .. } => Reply::Download {
            result: client.download(&id, download_dir).await,
        },
    }
}

/// Spawns effects onto a runtime and collects their replies.
pub struct Executor {
    client: ApiClient,
    runtime: Handle,
    download_dir: PathBuf,
    replies: mpsc::UnboundedSender<Reply>,
}

impl Executor {
    pub fn new(
        client: ApiClient,
        runtime: Handle,
        download_dir: PathBuf,
    ) -> (Self, mpsc::UnboundedReceiver<Reply>) {
        let (replies, rx) = mpsc::unbounded_channel();
        (
            Self {
                client,
                runtime,
                download_dir,
                replies,
            },
            rx,
        )
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Spawn every effect. Never blocks.
    pub fn dispatch(&self, effects: Vec<Effect>) {
        for effect in effects {
            tracing::debug!(?effect, "executor: dispatch");
            let client = self.client.clone();
            let dir = self.download_dir.clone();
            let replies = self.replies.clone();
            self.runtime.spawn(async move {
                let reply = perform(&client, effect, &dir).await;
                // The receiver is gone only during shutdown.
                let _ = replies.send(reply);
            });
        }
    }
}

/// Drive a controller until it has no effects left and no replies pending.
///
/// Used by the headless CLI paths: issue whatever the last action queued,
/// wait for the replies, apply them, and repeat.
pub async fn settle<S: Scheduler>(
    client: &ApiClient,
    session: &mut SessionController<S>,
    download_dir: &Path,
) {
    loop {
        let effects = session.take_effects();
        if effects.is_empty() {
            break;
        }
        for effect in effects {
            perform(client, effect, download_dir).await.apply(session);
        }
    }
}
