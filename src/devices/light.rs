// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Dimmable-light abstraction derived from scene pairs.
//!
//! The server has no light entity of its own: a light is the pairing of an
//! off-scene (preset 0 or an area-off scene) with the on-scene five numbers
//! above it (`off + 5 = on`, a protocol convention). The pairing is derived
//! during collection, never stored server-side.
//!
//! Observed state is driven by the event stream: a light attached to an
//! [`EventListener`] flips its state when a matching `callScene` event
//! arrives, including the broadcast presets (scene 5 turns everything on,
//! scene 0 everything off).

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::constants::{
    GROUP_LIGHTS, LIGHT_OFF_SCENES, ON_SCENE_OFFSET, SCENE_PRESET0, SCENE_PRESET1,
};
use crate::event::{CallbackId, Event, EventListener};

use super::scene::{ColorScene, SceneDevice};

/// Preset 2-4 scene numbers paired with the basic (preset 0/1) bank.
const PRESET_COMPANIONS: [u8; 3] = [17, 18, 19];

/// A logical dimmable light backed by an on/off scene pair.
///
/// Cheap to clone; clones share the observed state.
#[derive(Debug, Clone)]
pub struct Light {
    inner: Arc<LightInner>,
}

#[derive(Debug)]
struct LightInner {
    scene_on: ColorScene,
    scene_off: ColorScene,
    presets: Vec<ColorScene>,
    state: RwLock<Option<bool>>,
}

impl Light {
    /// Pairs an off-scene with its `+5` on-counterpart from the scene map.
    ///
    /// Returns `None` if the scene is not one of the recognized off-scenes
    /// (preset 0, areas 1-4) or if the map holds no matching on-scene.
    #[must_use]
    pub fn pair(scene_off: &ColorScene, scenes: &HashMap<String, SceneDevice>) -> Option<Self> {
        if !LIGHT_OFF_SCENES.contains(&scene_off.scene_id()) {
            return None;
        }
        let on_key = format!(
            "{}_{}_{}",
            scene_off.zone_id(),
            scene_off.color(),
            scene_off.scene_id() + ON_SCENE_OFFSET
        );
        let scene_on = match scenes.get(&on_key)? {
            SceneDevice::Group(scene) => scene.clone(),
            SceneDevice::Zone(_) => return None,
        };

        // Preset 2-4 companions exist only for the basic bank.
        let presets = if scene_off.scene_id() == SCENE_PRESET0 {
            PRESET_COMPANIONS
                .iter()
                .filter_map(|scene_id| {
                    let key = format!("{}_{}_{scene_id}", scene_off.zone_id(), scene_off.color());
                    match scenes.get(&key)? {
                        SceneDevice::Group(scene) => Some(scene.clone()),
                        SceneDevice::Zone(_) => None,
                    }
                })
                .collect()
        } else {
            Vec::new()
        };

        Some(Self {
            inner: Arc::new(LightInner {
                scene_on,
                scene_off: scene_off.clone(),
                presets,
                state: RwLock::new(None),
            }),
        })
    }

    /// Builds all lights derivable from a scene map: every lighting-group
    /// off-scene (preset 0, areas 1-4) with an existing on-counterpart.
    /// Sorted by unique ID so the result is stable across rediscovery.
    #[must_use]
    pub fn collect(scenes: &HashMap<String, SceneDevice>) -> Vec<Self> {
        let mut lights: Vec<Self> = scenes
            .values()
            .filter_map(|device| match device {
                SceneDevice::Group(scene)
                    if scene.color() == GROUP_LIGHTS
                        && LIGHT_OFF_SCENES.contains(&scene.scene_id()) =>
                {
                    Self::pair(scene, scenes)
                }
                _ => None,
            })
            .collect();
        lights.sort_by_key(Light::unique_id);
        lights
    }

    /// Display name: the off-scene's name, or just "Light" for the plain
    /// preset-0 pair.
    #[must_use]
    pub fn name(&self) -> String {
        if self.inner.scene_off.scene_name() == "Preset0" {
            "Light".to_string()
        } else {
            self.inner.scene_off.scene_name().to_string()
        }
    }

    /// Stable unique identifier, derived from the off-scene key.
    #[must_use]
    pub fn unique_id(&self) -> String {
        format!("light_{}", self.inner.scene_off.key())
    }

    /// Zone this light lives in.
    #[must_use]
    pub fn zone_id(&self) -> i64 {
        self.inner.scene_off.zone_id()
    }

    /// Name of the zone this light lives in.
    #[must_use]
    pub fn zone_name(&self) -> &str {
        self.inner.scene_off.zone_name()
    }

    /// Observed state; `None` until the first command or event.
    #[must_use]
    pub fn is_on(&self) -> Option<bool> {
        *self.inner.state.read()
    }

    /// Preset 2-4 companion scenes, if discovered.
    #[must_use]
    pub fn presets(&self) -> &[ColorScene] {
        &self.inner.presets
    }

    /// Enqueues the on-scene and marks the light on.
    pub fn turn_on(&self) {
        self.inner.scene_on.activate();
        *self.inner.state.write() = Some(true);
    }

    /// Enqueues the off-scene and marks the light off.
    pub fn turn_off(&self) {
        self.inner.scene_off.activate();
        *self.inner.state.write() = Some(false);
    }

    /// Activates the preset companion at `index`. Returns `false` if no such
    /// preset was discovered.
    pub fn activate_preset(&self, index: usize) -> bool {
        match self.inner.presets.get(index) {
            Some(scene) => {
                scene.activate();
                *self.inner.state.write() = Some(true);
                true
            }
            None => false,
        }
    }

    /// Registers this light on an event listener; subsequent `callScene`
    /// events for its zone and group flip the observed state.
    pub fn attach(&self, listener: &EventListener) -> CallbackId {
        let light = self.clone();
        listener.register(move |event| light.handle_event(event))
    }

    /// Applies one event to the observed state. Irrelevant and malformed
    /// events are ignored.
    pub fn handle_event(&self, event: &Event) {
        let Some(call) = event.scene_call() else {
            return;
        };
        let on = &self.inner.scene_on;
        let off = &self.inner.scene_off;

        if call.zone_id == on.zone_id()
            && call.group_id == on.color()
            && (call.scene_id == on.scene_id() || call.scene_id == SCENE_PRESET1)
        {
            *self.inner.state.write() = Some(true);
        } else if call.zone_id == off.zone_id()
            && call.group_id == off.color()
            && (call.scene_id == off.scene_id() || call.scene_id == SCENE_PRESET0)
        {
            *self.inner.state.write() = Some(false);
        }
    }
}
