// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scene entities discovered from the server topology.
//!
//! Two kinds exist: zone-wide scenes (group-independent, e.g. "present" or
//! "wakeup") and group-scoped "color" scenes (e.g. a lighting preset in one
//! zone). Both activate by enqueuing a `zone/callScene` command into the
//! command stack; activation is idempotent, re-invoking a scene reissues the
//! same command.

use std::sync::Arc;

use crate::command_stack::CommandStack;

/// A zone-wide, group-independent scene.
#[derive(Debug, Clone)]
pub struct Scene {
    stack: Arc<CommandStack>,
    zone_id: i64,
    zone_name: String,
    scene_id: u8,
    scene_name: String,
}

impl Scene {
    pub(crate) fn new(
        stack: Arc<CommandStack>,
        zone_id: i64,
        zone_name: impl Into<String>,
        scene_id: u8,
        scene_name: impl Into<String>,
    ) -> Self {
        Self {
            stack,
            zone_id,
            zone_name: zone_name.into(),
            scene_id,
            scene_name: scene_name.into(),
        }
    }

    /// Stable composite key: `"{zone}_{scene}"`.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}_{}", self.zone_id, self.scene_id)
    }

    /// Human-readable name: `"{zone} / {scene}"`.
    #[must_use]
    pub fn name(&self) -> String {
        format!("{} / {}", self.zone_name, self.scene_name)
    }

    /// Zone this scene belongs to.
    #[must_use]
    pub fn zone_id(&self) -> i64 {
        self.zone_id
    }

    /// Name of the zone this scene belongs to.
    #[must_use]
    pub fn zone_name(&self) -> &str {
        &self.zone_name
    }

    /// Scene number.
    #[must_use]
    pub fn scene_id(&self) -> u8 {
        self.scene_id
    }

    /// Scene display name.
    #[must_use]
    pub fn scene_name(&self) -> &str {
        &self.scene_name
    }

    /// Enqueues the scene call. Fire-and-forget through the command stack.
    pub fn activate(&self) {
        self.stack.enqueue(format!(
            "/json/zone/callScene?id={}&sceneNumber={}&force=true",
            self.zone_id, self.scene_id
        ));
    }
}

/// A group-scoped scene, addressed by zone, group color and scene number.
#[derive(Debug, Clone)]
pub struct ColorScene {
    stack: Arc<CommandStack>,
    zone_id: i64,
    zone_name: String,
    color: u8,
    scene_id: u8,
    scene_name: String,
}

impl ColorScene {
    pub(crate) fn new(
        stack: Arc<CommandStack>,
        zone_id: i64,
        zone_name: impl Into<String>,
        color: u8,
        scene_id: u8,
        scene_name: impl Into<String>,
    ) -> Self {
        Self {
            stack,
            zone_id,
            zone_name: zone_name.into(),
            color,
            scene_id,
            scene_name: scene_name.into(),
        }
    }

    /// Stable composite key: `"{zone}_{color}_{scene}"`.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}_{}_{}", self.zone_id, self.color, self.scene_id)
    }

    /// Human-readable name: `"{zone} / {scene}"`.
    #[must_use]
    pub fn name(&self) -> String {
        format!("{} / {}", self.zone_name, self.scene_name)
    }

    /// Zone this scene belongs to.
    #[must_use]
    pub fn zone_id(&self) -> i64 {
        self.zone_id
    }

    /// Name of the zone this scene belongs to.
    #[must_use]
    pub fn zone_name(&self) -> &str {
        &self.zone_name
    }

    /// Group color code this scene is scoped to.
    #[must_use]
    pub fn color(&self) -> u8 {
        self.color
    }

    /// Scene number.
    #[must_use]
    pub fn scene_id(&self) -> u8 {
        self.scene_id
    }

    /// Scene display name.
    #[must_use]
    pub fn scene_name(&self) -> &str {
        &self.scene_name
    }

    /// Enqueues the scene call. Fire-and-forget through the command stack.
    pub fn activate(&self) {
        self.stack.enqueue(format!(
            "/json/zone/callScene?id={}&sceneNumber={}&groupID={}&force=true",
            self.zone_id, self.scene_id, self.color
        ));
    }
}

/// Tagged variant over the two scene kinds.
///
/// Consumers switch on the tag; both variants share the `activate`
/// capability, the group variant additionally carries a color code.
#[derive(Debug, Clone)]
pub enum SceneDevice {
    /// Zone-wide, group-independent scene.
    Zone(Scene),
    /// Group-scoped scene.
    Group(ColorScene),
}

impl SceneDevice {
    /// Stable composite key of the underlying scene.
    #[must_use]
    pub fn key(&self) -> String {
        match self {
            Self::Zone(scene) => scene.key(),
            Self::Group(scene) => scene.key(),
        }
    }

    /// Human-readable name of the underlying scene.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Zone(scene) => scene.name(),
            Self::Group(scene) => scene.name(),
        }
    }

    /// Zone the scene belongs to.
    #[must_use]
    pub fn zone_id(&self) -> i64 {
        match self {
            Self::Zone(scene) => scene.zone_id(),
            Self::Group(scene) => scene.zone_id(),
        }
    }

    /// Name of the zone the scene belongs to.
    #[must_use]
    pub fn zone_name(&self) -> &str {
        match self {
            Self::Zone(scene) => scene.zone_name(),
            Self::Group(scene) => scene.zone_name(),
        }
    }

    /// Scene number.
    #[must_use]
    pub fn scene_id(&self) -> u8 {
        match self {
            Self::Zone(scene) => scene.scene_id(),
            Self::Group(scene) => scene.scene_id(),
        }
    }

    /// Scene display name.
    #[must_use]
    pub fn scene_name(&self) -> &str {
        match self {
            Self::Zone(scene) => scene.scene_name(),
            Self::Group(scene) => scene.scene_name(),
        }
    }

    /// Group color code; present only for group-scoped scenes.
    #[must_use]
    pub fn color(&self) -> Option<u8> {
        match self {
            Self::Zone(_) => None,
            Self::Group(scene) => Some(scene.color()),
        }
    }

    /// Enqueues the scene call.
    pub fn activate(&self) {
        match self {
            Self::Zone(scene) => scene.activate(),
            Self::Group(scene) => scene.activate(),
        }
    }
}
