// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Topology discovery.
//!
//! Turns the server's nested zones/groups property tree into the flat
//! addressable entity maps the host consumes. Discovery runs a fixed call
//! sequence: one `property/query2` for the whole tree, one
//! `getReachableScenes` per lighting group, and per-meter name/dSID lookups.
//! A missing `result` anywhere is terminal for the whole run; the client
//! facade retries the complete procedure once before giving up.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::command_stack::CommandStack;
use crate::config::ClientConfig;
use crate::constants::{self, GROUP_INDEPENDENT_SCENES, GROUP_LIGHTS};
use crate::devices::{ColorScene, Meter, Scene, SceneDevice};
use crate::error::{ParseError, Result};
use crate::session::SessionManager;
use crate::transport;

const URL_SCENES: &str = "/json/property/query2?query=/apartment/zones/*(*)/groups/*(*)";
const URL_METERS: &str = "/json/property/getChildren?path=/apartment/dSMeters/";

/// The discovered entity maps, keyed by stable composite keys.
pub(crate) struct Topology {
    pub scenes: HashMap<String, SceneDevice>,
    pub meters: HashMap<String, Meter>,
}

/// Runs the full discovery procedure once.
pub(crate) async fn discover(
    session: &Arc<SessionManager>,
    stack: &Arc<CommandStack>,
    config: &ClientConfig,
) -> Result<Topology> {
    let scenes = discover_scenes(session, stack, config).await?;
    let meters = discover_meters(session).await?;
    tracing::debug!(
        scenes = scenes.len(),
        meters = meters.len(),
        "topology discovery complete"
    );
    Ok(Topology { scenes, meters })
}

async fn discover_scenes(
    session: &Arc<SessionManager>,
    stack: &Arc<CommandStack>,
    config: &ClientConfig,
) -> Result<HashMap<String, SceneDevice>> {
    let envelope = session.request(URL_SCENES, &[]).await?;
    let result = transport::result_field(&envelope)?;
    let zones = result.as_object().ok_or_else(|| ParseError::InvalidValue {
        field: "result".to_string(),
        message: "expected a zone object".to_string(),
    })?;

    let mut scenes = HashMap::new();

    for (zone_key, zone) in zones {
        // The root zone carries the configured apartment alias.
        let zone_name = if zone_key == "zone0" {
            config.apartment_name().to_string()
        } else {
            zone.get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        // Unnamed zones contribute no entities.
        if zone_name.is_empty() {
            continue;
        }
        let Some(zone_id) = zone.get("ZoneID").and_then(Value::as_i64) else {
            tracing::warn!(zone = %zone_key, "zone without ZoneID, skipping");
            continue;
        };
        tracing::debug!(zone_id, zone = %zone_name, "discovering zone");

        // Generic zone-wide scenes exist in every named zone.
        for (symbolic, scene_id) in GROUP_INDEPENDENT_SCENES {
            let scene = Scene::new(
                Arc::clone(stack),
                zone_id,
                &zone_name,
                *scene_id,
                constants::scene_display_name(symbolic),
            );
            scenes.insert(scene.key(), SceneDevice::Zone(scene));
        }

        let Some(zone_obj) = zone.as_object() else {
            continue;
        };
        for (group_key, group) in zone_obj {
            if !group_key.starts_with("group") {
                continue;
            }
            let Some(group_id) = read_u8(group.get("group")) else {
                continue;
            };
            if group_id != GROUP_LIGHTS {
                continue;
            }
            let Some(color) = read_u8(group.get("color")) else {
                tracing::warn!(zone_id, group = %group_key, "group without color, skipping");
                continue;
            };

            register_reachable_scenes(session, stack, &mut scenes, zone_id, &zone_name, group_id, color)
                .await?;

            // Custom-named scene entries override reachable ones sharing
            // the same key.
            let Some(group_obj) = group.as_object() else {
                continue;
            };
            for (scene_key, entry) in group_obj {
                if !scene_key.starts_with("scene") {
                    continue;
                }
                let Some(scene_id) = read_u8(entry.get("scene")) else {
                    continue;
                };
                let Some(custom_name) = entry.get("name").and_then(Value::as_str) else {
                    continue;
                };
                let scene = ColorScene::new(
                    Arc::clone(stack),
                    zone_id,
                    &zone_name,
                    color,
                    scene_id,
                    custom_name,
                );
                scenes.insert(scene.key(), SceneDevice::Group(scene));
            }
        }
    }

    Ok(scenes)
}

/// Registers one `ColorScene` per scene number the server reports as
/// reachable for the given zone/group.
async fn register_reachable_scenes(
    session: &Arc<SessionManager>,
    stack: &Arc<CommandStack>,
    scenes: &mut HashMap<String, SceneDevice>,
    zone_id: i64,
    zone_name: &str,
    group_id: u8,
    color: u8,
) -> Result<()> {
    let path = format!("/json/zone/getReachableScenes?id={zone_id}&groupID={group_id}");
    let envelope = session.request(&path, &[]).await?;
    let reachable = transport::result_field(&envelope)?
        .get("reachableScenes")
        .and_then(Value::as_array)
        .ok_or_else(|| ParseError::MissingField("result.reachableScenes".to_string()))?;

    for value in reachable {
        let Some(scene_id) = read_u8(Some(value)) else {
            continue;
        };
        let Some(symbolic) = constants::scene_name(scene_id) else {
            tracing::warn!(zone_id, scene_id, "reachable scene with unknown number, skipping");
            continue;
        };
        let scene = ColorScene::new(
            Arc::clone(stack),
            zone_id,
            zone_name,
            color,
            scene_id,
            constants::scene_display_name(symbolic),
        );
        scenes.insert(scene.key(), SceneDevice::Group(scene));
    }
    Ok(())
}

async fn discover_meters(session: &Arc<SessionManager>) -> Result<HashMap<String, Meter>> {
    let envelope = session.request(URL_METERS, &[]).await?;
    let entries = transport::result_field(&envelope)?
        .as_array()
        .ok_or_else(|| ParseError::InvalidValue {
            field: "result".to_string(),
            message: "expected a meter list".to_string(),
        })?
        .clone();

    let mut meters = HashMap::new();
    for entry in &entries {
        let Some(dsuid) = entry.get("name").and_then(Value::as_str) else {
            continue;
        };
        let meter = Meter::connect(Arc::clone(session), dsuid).await?;
        // Meters without a resolved name are not registered.
        if meter.name().is_empty() {
            tracing::debug!(dsuid = %dsuid, "meter without name, skipping");
            continue;
        }
        tracing::debug!(dsuid = %dsuid, name = %meter.name(), "discovered meter");
        meters.insert(dsuid.to_string(), meter);
    }
    Ok(meters)
}

/// Reads a `u8` out of a JSON number.
fn read_u8(value: Option<&Value>) -> Option<u8> {
    value.and_then(Value::as_u64).and_then(|v| u8::try_from(v).ok())
}
