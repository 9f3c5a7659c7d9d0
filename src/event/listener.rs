// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Background event-polling loop.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::Result;
use crate::session::SessionManager;
use crate::transport::{self, RetryPolicy};

use super::{CallbackId, CallbackRegistry, Event};

/// Wait before re-subscribing after a failed subscribe attempt.
const RESUBSCRIBE_DELAY: Duration = Duration::from_secs(1);

/// Subscribes to a named server event stream and fans received events out to
/// registered callbacks.
///
/// The loop cycles through `Subscribing → Polling` states: it subscribes with
/// a generated subscription identifier, then long-polls repeatedly. A poll
/// failure (connection loss, subscription expiry) sends it back to
/// `Subscribing` with a fresh identifier; this is routine, not fatal, and is
/// never surfaced to callers. Callbacks registered before a re-subscribe keep
/// receiving events after it.
///
/// # Delivery semantics
///
/// Events are delivered in arrival order, to every registered callback,
/// at least once: a reconnect after a poll failure may redeliver a window of
/// events, so callbacks should be idempotent.
///
/// # Examples
///
/// ```no_run
/// # async fn example(listener: std::sync::Arc<dstrom_lib::EventListener>) {
/// listener.register(|event| {
///     if let Some(call) = event.scene_call() {
///         println!("zone {} scene {}", call.zone_id, call.scene_id);
///     }
/// });
/// listener.start();
/// // ... later
/// listener.stop().await;
/// # }
/// ```
#[derive(Debug)]
pub struct EventListener {
    session: Arc<SessionManager>,
    event_name: String,
    poll_timeout: Duration,
    callbacks: Arc<CallbackRegistry>,
    shutdown: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl EventListener {
    /// Creates a listener for the given event stream.
    #[must_use]
    pub fn new(
        session: Arc<SessionManager>,
        event_name: impl Into<String>,
        poll_timeout: Duration,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            session,
            event_name: event_name.into(),
            poll_timeout,
            callbacks: Arc::new(CallbackRegistry::new()),
            shutdown,
            handle: Mutex::new(None),
        }
    }

    /// Registers an event callback. Registration is independent of the loop
    /// lifecycle; callbacks survive re-subscriptions.
    pub fn register<F>(&self, callback: F) -> CallbackId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.callbacks.register(callback)
    }

    /// Removes a previously registered callback.
    pub fn unregister(&self, id: CallbackId) -> bool {
        self.callbacks.unregister(id)
    }

    /// Starts the subscribe/poll loop. Has no effect if already running;
    /// after [`EventListener::stop`] a new start establishes a fresh
    /// subscription.
    pub fn start(&self) {
        let mut handle = self.handle.lock();
        if handle.is_some() {
            tracing::warn!("event listener already started");
            return;
        }
        // Clear a shutdown signal left behind by an earlier stop.
        self.shutdown.send_replace(false);

        let worker = Worker {
            session: Arc::clone(&self.session),
            event_name: self.event_name.clone(),
            poll_timeout: self.poll_timeout,
            callbacks: Arc::clone(&self.callbacks),
        };
        let shutdown = self.shutdown.subscribe();
        *handle = Some(tokio::spawn(worker.run(shutdown)));
    }

    /// Signals the loop to stop, cancelling an in-flight poll, and waits for
    /// it to unwind. The server-side subscription is released best-effort.
    pub async fn stop(&self) {
        let _ = self.shutdown.send(true);
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                tracing::warn!(error = %err, "event listener loop panicked");
            }
        }
    }
}

/// State shared with the spawned loop.
struct Worker {
    session: Arc<SessionManager>,
    event_name: String,
    poll_timeout: Duration,
    callbacks: Arc<CallbackRegistry>,
}

impl Worker {
    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::debug!(event = %self.event_name, "event listener loop started");

        let mut subscription_id = next_subscription_id();
        // Tracks whether `subscription_id` is live on the server, so shutdown
        // only releases subscriptions that were actually established.
        let mut subscribed = false;

        'outer: loop {
            if *shutdown.borrow() {
                break;
            }

            // Subscribing
            tokio::select! {
                _ = shutdown.changed() => break 'outer,
                result = self.subscribe(subscription_id) => {
                    if let Err(err) = result {
                        tracing::warn!(error = %err, "event subscription failed");
                        tokio::select! {
                            _ = shutdown.changed() => break 'outer,
                            () = tokio::time::sleep(RESUBSCRIBE_DELAY) => {}
                        }
                        subscription_id = next_subscription_id();
                        continue 'outer;
                    }
                }
            }
            subscribed = true;
            tracing::debug!(subscription = subscription_id, "event subscription established");

            // Polling
            loop {
                tokio::select! {
                    _ = shutdown.changed() => break 'outer,
                    result = self.poll(subscription_id) => match result {
                        Ok(events) => {
                            for event in &events {
                                tracing::debug!(event = %event.name, "dispatching event");
                                self.callbacks.dispatch(event);
                            }
                        }
                        Err(err) => {
                            // Subscription lost; recovered by re-subscribing.
                            tracing::debug!(error = %err, "event poll failed, re-subscribing");
                            subscription_id = next_subscription_id();
                            subscribed = false;
                            continue 'outer;
                        }
                    }
                }
            }
        }

        if subscribed {
            self.unsubscribe(subscription_id).await;
        }
        tracing::debug!(event = %self.event_name, "event listener loop stopped");
    }

    async fn subscribe(&self, subscription_id: u32) -> Result<()> {
        let path = format!(
            "/json/event/subscribe?name={}&subscriptionID={subscription_id}",
            urlencoding::encode(&self.event_name)
        );
        self.session.request(&path, &[]).await.map(|_| ())
    }

    async fn poll(&self, subscription_id: u32) -> Result<Vec<Event>> {
        let timeout_ms = self.poll_timeout.as_millis();
        let path =
            format!("/json/event/get?subscriptionID={subscription_id}&timeout={timeout_ms}");
        let envelope = self.session.request(&path, &[]).await?;

        let events = transport::result_field(&envelope)?
            .get("events")
            .cloned()
            .unwrap_or_else(|| serde_json::Value::Array(Vec::new()));

        let events: Vec<Event> =
            serde_json::from_value(events).map_err(crate::error::ParseError::Json)?;
        Ok(events)
    }

    /// Best-effort unsubscribe on shutdown; failures are only logged.
    async fn unsubscribe(&self, subscription_id: u32) {
        let path = format!(
            "/json/event/unsubscribe?name={}&subscriptionID={subscription_id}",
            urlencoding::encode(&self.event_name)
        );
        if let Err(err) = self
            .session
            .request_with(&path, &[], &RetryPolicy::none())
            .await
        {
            tracing::debug!(error = %err, "event unsubscribe failed");
        }
    }
}

/// Generates a fresh subscription identifier. The server expects a numeric
/// id, so 32 bits of a v4 UUID are folded into a non-zero `u32`.
fn next_subscription_id() -> u32 {
    #[allow(clippy::cast_possible_truncation)]
    let id = (Uuid::new_v4().as_u128() % u128::from(u32::MAX - 1)) as u32;
    id + 1
}
