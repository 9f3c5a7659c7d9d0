// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Delayed, serialized command dispatch.
//!
//! The server's internal bus can drop or reorder commands under load, so
//! outgoing control commands are never issued directly: they are enqueued
//! into an unbounded FIFO and a single background loop dispatches them one
//! at a time, sleeping a fixed delay between dispatches regardless of the
//! outcome. The stack is best-effort, not transactional: a failed dispatch
//! is logged and the loop moves on.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::session::SessionManager;

/// FIFO queue with rate-limited background dispatch.
///
/// Commands are fully formed request paths (e.g. a `zone/callScene` URL);
/// [`CommandStack::enqueue`] is fire-and-forget. The loop is started and
/// stopped by the host's lifecycle hooks.
///
/// # Ordering
///
/// Dispatch order equals enqueue order; commands are never reordered and
/// never dispatched concurrently with each other.
///
/// # Shutdown
///
/// [`CommandStack::stop`] signals the loop and joins it. An in-flight
/// dispatch is awaited to completion, the inter-dispatch sleep is cancelled,
/// and queued-but-undispatched commands are discarded.
#[derive(Debug)]
pub struct CommandStack {
    session: Arc<SessionManager>,
    delay: Duration,
    tx: mpsc::UnboundedSender<String>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<String>>>,
    shutdown: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl CommandStack {
    /// Creates a stack dispatching through the given session manager,
    /// sleeping `delay` between dispatches.
    #[must_use]
    pub fn new(session: Arc<SessionManager>, delay: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (shutdown, _) = watch::channel(false);
        Self {
            session,
            delay,
            tx,
            rx: Mutex::new(Some(rx)),
            shutdown,
            handle: Mutex::new(None),
        }
    }

    /// Enqueues a command for dispatch. Fire-and-forget: the call never
    /// blocks and reports no outcome. Commands enqueued after [`stop`]
    /// are dropped with a warning.
    ///
    /// [`stop`]: CommandStack::stop
    pub fn enqueue(&self, path: impl Into<String>) {
        let path = path.into();
        if self.tx.send(path.clone()).is_err() {
            tracing::warn!(path = %path, "command stack stopped, dropping command");
        }
    }

    /// Starts the background dispatch loop. Has no effect if the loop was
    /// already started.
    pub fn start(&self) {
        let Some(mut rx) = self.rx.lock().take() else {
            tracing::warn!("command stack loop already started");
            return;
        };

        let session = Arc::clone(&self.session);
        let delay = self.delay;
        let mut shutdown = self.shutdown.subscribe();

        let handle = tokio::spawn(async move {
            tracing::debug!("command stack loop started");
            loop {
                if *shutdown.borrow() {
                    break;
                }
                tokio::select! {
                    _ = shutdown.changed() => break,
                    command = rx.recv() => {
                        let Some(path) = command else { break };
                        // The dispatch itself is not raced against shutdown:
                        // the loop never stops mid-request.
                        if let Err(err) = session.request(&path, &[]).await {
                            tracing::warn!(path = %path, error = %err, "command dispatch failed");
                        }
                        tokio::select! {
                            _ = shutdown.changed() => break,
                            () = tokio::time::sleep(delay) => {}
                        }
                    }
                }
            }
            tracing::debug!("command stack loop stopped");
        });

        *self.handle.lock() = Some(handle);
    }

    /// Signals the loop to stop and waits for it to unwind.
    pub async fn stop(&self) {
        let _ = self.shutdown.send(true);
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                tracing::warn!(error = %err, "command stack loop panicked");
            }
        }
    }
}
