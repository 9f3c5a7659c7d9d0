// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `dstrom` Lib - A Rust client for digitalSTROM servers.
//!
//! This library implements the server's JSON/HTTP control plane: an
//! authenticated, retrying transport, the session-token lifecycle, topology
//! discovery, a rate-limited command queue and a live event feed.
//!
//! # Components
//!
//! - **Transport**: HTTPS GET with a self-signed-friendly TLS setup, envelope
//!   decoding and bounded retry of connection failures
//! - **Session manager**: mints short-lived session tokens from the
//!   application token and refreshes them transparently
//! - **Topology discovery**: flattens the zones/groups property tree into
//!   addressable scenes, color scenes and meters
//! - **Command stack**: FIFO background dispatch with a minimum delay
//!   between commands so the server's bus is not flooded
//! - **Event listener**: subscribes to a named event stream, long-polls it
//!   and fans events out to registered callbacks
//!
//! # Quick Start
//!
//! ```no_run
//! use dstrom_lib::{Client, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> dstrom_lib::Result<()> {
//!     let config = ClientConfig::new("dss.local", "application-token")
//!         .with_apartment_name("Home");
//!     let client = Client::new(config)?;
//!
//!     // Discover zones, scenes and meters.
//!     client.initialize().await?;
//!
//!     // Start the background loops.
//!     client.command_stack().start();
//!     client.event_listener().start();
//!
//!     // Scene activation is fire-and-forget through the command stack.
//!     if let Some(scene) = client.scenes().get("1_71") {
//!         scene.activate();
//!     }
//!
//!     // Lights derive their observed state from the event feed.
//!     for light in client.lights() {
//!         light.attach(client.event_listener());
//!     }
//!
//!     // ... on shutdown:
//!     client.event_listener().stop().await;
//!     client.command_stack().stop().await;
//!     Ok(())
//! }
//! ```

mod client;
mod command_stack;
mod config;
pub mod constants;
pub mod devices;
mod discovery;
pub mod error;
pub mod event;
mod session;
mod transport;

pub use client::Client;
pub use command_stack::CommandStack;
pub use config::ClientConfig;
pub use devices::{ColorScene, Light, Meter, Scene, SceneDevice};
pub use error::{Error, ParseError, Result, TransportError};
pub use event::{CallbackId, CallbackRegistry, Event, EventListener, SceneCall};
pub use session::SessionManager;
pub use transport::{RetryPolicy, Transport};
