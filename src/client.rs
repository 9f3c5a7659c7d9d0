// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Host-facing client facade.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::command_stack::CommandStack;
use crate::config::ClientConfig;
use crate::devices::{Light, Meter, SceneDevice};
use crate::discovery;
use crate::error::{Error, Result};
use crate::event::EventListener;
use crate::session::SessionManager;
use crate::transport::Transport;

/// Client runtime for one digitalSTROM server.
///
/// Wires transport, session, command stack and event listener together and
/// holds the discovered entity maps. The host drives the lifecycle: call
/// [`Client::initialize`] to discover the topology, start the background
/// loops on startup and stop them on shutdown.
///
/// # Examples
///
/// ```no_run
/// use dstrom_lib::{Client, ClientConfig};
///
/// # async fn example() -> dstrom_lib::Result<()> {
/// let client = Client::new(ClientConfig::new("dss.local", "app-token"))?;
/// client.initialize().await?;
///
/// client.command_stack().start();
/// client.event_listener().start();
///
/// for scene in client.scenes().values() {
///     println!("{}: {}", scene.key(), scene.name());
/// }
///
/// client.event_listener().stop().await;
/// client.command_stack().stop().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Client {
    config: ClientConfig,
    session: Arc<SessionManager>,
    stack: Arc<CommandStack>,
    listener: Arc<EventListener>,
    scenes: RwLock<HashMap<String, SceneDevice>>,
    meters: RwLock<HashMap<String, Meter>>,
}

impl Client {
    /// Creates a client from the configuration. No network traffic happens
    /// until [`Client::initialize`].
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP transport cannot be constructed.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = Transport::new(&config)?;
        let session = Arc::new(SessionManager::new(transport, config.app_token()));
        let stack = Arc::new(CommandStack::new(
            Arc::clone(&session),
            config.stack_delay(),
        ));
        let listener = Arc::new(EventListener::new(
            Arc::clone(&session),
            config.event_name(),
            config.poll_timeout(),
        ));

        Ok(Self {
            config,
            session,
            stack,
            listener,
            scenes: RwLock::new(HashMap::new()),
            meters: RwLock::new(HashMap::new()),
        })
    }

    /// Discovers the zone/scene/meter topology and populates the entity
    /// maps, replacing any earlier content.
    ///
    /// Servers frequently fail the first connection attempt after boot, so
    /// a failed run is retried once before surfacing
    /// [`Error::Initialization`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Initialization`] wrapping the last failure once the
    /// retry is exhausted.
    pub async fn initialize(&self) -> Result<()> {
        let topology =
            match discovery::discover(&self.session, &self.stack, &self.config).await {
                Ok(topology) => topology,
                Err(err) => {
                    tracing::warn!(error = %err, "initialization failed, retrying once");
                    discovery::discover(&self.session, &self.stack, &self.config)
                        .await
                        .map_err(|err| Error::Initialization(Box::new(err)))?
                }
            };

        *self.scenes.write() = topology.scenes;
        *self.meters.write() = topology.meters;
        Ok(())
    }

    /// Snapshot of the discovered scenes, keyed by composite key.
    #[must_use]
    pub fn scenes(&self) -> HashMap<String, SceneDevice> {
        self.scenes.read().clone()
    }

    /// Snapshot of the discovered meters, keyed by dSUID.
    #[must_use]
    pub fn meters(&self) -> HashMap<String, Meter> {
        self.meters.read().clone()
    }

    /// Dimmable lights derived from the discovered scene pairs.
    #[must_use]
    pub fn lights(&self) -> Vec<Light> {
        Light::collect(&self.scenes.read())
    }

    /// The outgoing command queue.
    #[must_use]
    pub fn command_stack(&self) -> &Arc<CommandStack> {
        &self.stack
    }

    /// The event subscription loop.
    #[must_use]
    pub fn event_listener(&self) -> &Arc<EventListener> {
        &self.listener
    }

    /// The shared session manager, for on-demand authenticated calls.
    #[must_use]
    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// The configuration this client was built from.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}
