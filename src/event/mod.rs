// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Server-pushed event subscription.
//!
//! The server publishes named event streams (e.g. `callScene`). The
//! [`EventListener`] subscribes to one stream, long-polls it in a background
//! loop and fans every received [`Event`] out to the registered callbacks.

mod callback;
mod listener;

pub use callback::{CallbackId, CallbackRegistry};
pub use listener::EventListener;

use serde::Deserialize;
use serde_json::Value;

/// One event received from the server's event stream.
///
/// Events carry a name and a loosely typed properties map; property values
/// arrive as strings or numbers depending on server firmware. Consumers
/// silently ignore events they cannot interpret.
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    /// Event stream name, e.g. `callScene`.
    pub name: String,
    /// Event payload.
    #[serde(default)]
    pub properties: serde_json::Map<String, Value>,
}

impl Event {
    /// Reads an integer property, accepting both numeric and string encodings.
    #[must_use]
    pub fn property_int(&self, key: &str) -> Option<i64> {
        match self.properties.get(key)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Interprets this event as a scene invocation.
    ///
    /// Returns `None` for events of a different name or with missing or
    /// malformed zone/group/scene identifiers.
    #[must_use]
    pub fn scene_call(&self) -> Option<SceneCall> {
        if self.name != "callScene" {
            return None;
        }
        let zone_id = self.property_int("zoneID")?;
        let group_id = u8::try_from(self.property_int("groupID")?).ok()?;
        let scene_id = u8::try_from(self.property_int("sceneID")?).ok()?;
        Some(SceneCall {
            zone_id,
            group_id,
            scene_id,
        })
    }
}

/// A decoded `callScene` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneCall {
    /// Zone the scene was called in.
    pub zone_id: i64,
    /// Group color code the call was scoped to.
    pub group_id: u8,
    /// Called scene number.
    pub scene_id: u8,
}
