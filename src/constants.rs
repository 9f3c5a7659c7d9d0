// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Protocol constants of the digitalSTROM scene model.
//!
//! Scene numbers and group color codes are fixed by the server firmware
//! (see the ds-basics and ds-light documents); the tables below are protocol
//! constants, not tunables. In particular the off/on pairing of preset and
//! area scenes follows the numeric `off + 5 = on` convention.

/// Lighting group color code.
pub const GROUP_LIGHTS: u8 = 1;
/// Blinds/shades group color code.
pub const GROUP_BLINDS: u8 = 2;
/// Heating group color code.
pub const GROUP_HEATING: u8 = 3;
/// Audio group color code.
pub const GROUP_AUDIO: u8 = 4;
/// Video group color code.
pub const GROUP_VIDEO: u8 = 5;
/// Joker (configurable) group color code.
pub const GROUP_JOKER: u8 = 8;
/// Cooling group color code.
pub const GROUP_COOLING: u8 = 9;
/// Ventilation group color code.
pub const GROUP_VENTILATION: u8 = 10;
/// Window group color code.
pub const GROUP_WINDOW: u8 = 11;
/// Recirculation group color code.
pub const GROUP_RECIRCULATION: u8 = 12;
/// Temperature control group color code.
pub const GROUP_TEMPERATURE_CONTROL: u8 = 48;
/// Apartment ventilation group color code.
pub const GROUP_APARTMENT_VENTILATION: u8 = 64;

/// Broadcast "off" preset (Preset 0).
pub const SCENE_PRESET0: u8 = 0;
/// Broadcast "on" preset (Preset 1).
pub const SCENE_PRESET1: u8 = 5;

/// Offset between an off-scene and its on-counterpart (`off + 5 = on`).
pub const ON_SCENE_OFFSET: u8 = 5;

/// Scene numbers that act as the "off" half of a dimmable-light pair:
/// Preset 0 and the four area-off scenes.
pub const LIGHT_OFF_SCENES: [u8; 5] = [0, 1, 2, 3, 4];

/// Group-scoped preset scenes.
pub const PRESET_SCENES: &[(&str, u8)] = &[
    ("SCENE_PRESET0", 0),
    ("SCENE_PRESET1", 5),
    ("SCENE_PRESET2", 17),
    ("SCENE_PRESET3", 18),
    ("SCENE_PRESET4", 19),
    ("SCENE_PRESET11", 33),
    ("SCENE_PRESET10", 32),
    ("SCENE_PRESET12", 32),
    ("SCENE_PRESET13", 21),
    ("SCENE_PRESET14", 22),
    ("SCENE_PRESET20", 34),
    ("SCENE_PRESET21", 35),
    ("SCENE_PRESET22", 23),
    ("SCENE_PRESET23", 24),
    ("SCENE_PRESET24", 25),
    ("SCENE_PRESET30", 36),
    ("SCENE_PRESET31", 37),
    ("SCENE_PRESET32", 26),
    ("SCENE_PRESET33", 27),
    ("SCENE_PRESET34", 28),
    ("SCENE_PRESET40", 38),
    ("SCENE_PRESET41", 39),
    ("SCENE_PRESET42", 29),
    ("SCENE_PRESET43", 30),
    ("SCENE_PRESET44", 31),
];

/// Dimming step scenes.
pub const STEPPING_SCENES: &[(&str, u8)] = &[
    ("SCENE_DECREMENT", 11),
    ("SCENE_INCREMENT", 12),
];

/// Area-scoped scenes (four areas per group).
pub const AREA_SCENES: &[(&str, u8)] = &[
    ("SCENE_AREA1_OFF", 1),
    ("SCENE_AREA1_ON", 6),
    ("SCENE_AREA1_DECREMENT", 42),
    ("SCENE_AREA1_INCREMENT", 43),
    ("SCENE_AREA1_STOP", 52),
    ("SCENE_AREA1_STEPPING_CONTINUE", 10),
    ("SCENE_AREA2_OFF", 2),
    ("SCENE_AREA2_ON", 7),
    ("SCENE_AREA2_DECREMENT", 44),
    ("SCENE_AREA2_INCREMENT", 45),
    ("SCENE_AREA2_STOP", 53),
    ("SCENE_AREA2_STEPPING_CONTINUE", 10),
    ("SCENE_AREA3_OFF", 3),
    ("SCENE_AREA3_ON", 8),
    ("SCENE_AREA3_DECREMENT", 46),
    ("SCENE_AREA3_INCREMENT", 47),
    ("SCENE_AREA3_STOP", 54),
    ("SCENE_AREA3_STEPPING_CONTINUE", 10),
    ("SCENE_AREA4_OFF", 4),
    ("SCENE_AREA4_ON", 9),
    ("SCENE_AREA4_DECREMENT", 48),
    ("SCENE_AREA4_INCREMENT", 49),
    ("SCENE_AREA4_STOP", 55),
    ("SCENE_AREA4_STEPPING_CONTINUE", 10),
];

/// Zone-wide scenes that are independent of any group. Discovery registers
/// one [`crate::devices::Scene`] per entry for every named zone.
pub const GROUP_INDEPENDENT_SCENES: &[(&str, u8)] = &[
    ("SCENE_DEEP_OFF", 68),
    ("SCENE_STANDBY", 67),
    ("SCENE_ZONE_ACTIVE", 75),
    ("SCENE_AUTO_STANDBY", 64),
    ("SCENE_ABSENT", 72),
    ("SCENE_PRESENT", 71),
    ("SCENE_SLEEPING", 69),
    ("SCENE_WAKEUP", 70),
    ("SCENE_DOOR_BELL", 73),
    ("SCENE_PANIC", 65),
    ("SCENE_FIRE", 76),
    ("SCENE_ALARM_1", 74),
    ("SCENE_ALARM_2", 83),
    ("SCENE_ALARM_3", 84),
    ("SCENE_ALARM_4", 85),
    ("SCENE_WIND", 86),
    ("SCENE_NO_WIND", 87),
    ("SCENE_RAIN", 88),
    ("SCENE_NO_RAIN", 89),
    ("SCENE_HAIL", 90),
    ("SCENE_NO_HAIL", 91),
    ("SCENE_POLLUTION", 92),
    ("SCENE_BURGLARY", 93),
];

/// Looks up the symbolic name for a scene number across all tables.
///
/// A few numbers appear in more than one table entry (e.g. 32 for presets
/// 10 and 12); the last entry wins, matching the server documentation's
/// canonical naming.
#[must_use]
pub fn scene_name(scene_id: u8) -> Option<&'static str> {
    let mut found = None;
    for (name, id) in PRESET_SCENES
        .iter()
        .chain(STEPPING_SCENES)
        .chain(AREA_SCENES)
        .chain(GROUP_INDEPENDENT_SCENES)
    {
        if *id == scene_id {
            found = Some(*name);
        }
    }
    found
}

/// Turns a symbolic `SCENE_*` name into a display name: the prefix is
/// stripped and each underscore-separated word is title-cased, so
/// `SCENE_PRESET0` becomes `Preset0` and `SCENE_DEEP_OFF` becomes `Deep_Off`.
#[must_use]
pub fn scene_display_name(symbolic: &str) -> String {
    let stripped = symbolic.strip_prefix("SCENE_").unwrap_or(symbolic);
    stripped
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("_")
}
