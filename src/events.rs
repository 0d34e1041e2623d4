//! Engine → view event stream.
//!
//! View components never share mutable state with the engine; they
//! subscribe here and re-read through the store when an event arrives.
//! The monotonic *refresh token* bumps after every mutating command so
//! observers know their cached projections (gutter diffs, previews) are
//! stale.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Mutex;

use crate::remote::merge_request::MergeRequest;

/// One state-change notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineEvent {
    /// Working tree, index, or refs changed; re-read projections.
    RefreshToken(u64),
    /// The current branch changed (`None` when detached).
    BranchName(Option<String>),
    /// The merge-request list of a remote changed.
    MergeRequests(Vec<MergeRequest>),
    /// The selected file's content changed underneath the editor.
    SelectedFileContent {
        /// Absolute path of the file.
        path: String,
        /// The new content.
        content: String,
    },
}

/// Fan-out event bus with a monotonic refresh counter.
#[derive(Debug, Default)]
pub struct EventBus {
    refresh: AtomicU64,
    subscribers: Mutex<Vec<Sender<EngineEvent>>>,
}

impl EventBus {
    /// A bus with no subscribers and the token at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe; the receiver sees every event emitted afterwards.
    pub fn subscribe(&self) -> Receiver<EngineEvent> {
        let (tx, rx) = channel();
        self.subscribers
            .lock()
            .expect("event bus poisoned")
            .push(tx);
        rx
    }

    /// Deliver an event to every live subscriber. Disconnected
    /// receivers are dropped from the list.
    pub fn emit(&self, event: &EngineEvent) {
        let mut subs = self.subscribers.lock().expect("event bus poisoned");
        subs.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// The current refresh token.
    #[must_use]
    pub fn refresh_token(&self) -> u64 {
        self.refresh.load(Ordering::Relaxed)
    }

    /// Bump the token and broadcast it. Returns the new value.
    pub fn bump_refresh(&self) -> u64 {
        let token = self.refresh.fetch_add(1, Ordering::Relaxed) + 1;
        self.emit(&EngineEvent::RefreshToken(token));
        token
    }
}
