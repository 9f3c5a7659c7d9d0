// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Addressable entities discovered from the server topology.
//!
//! All entities are created once during topology discovery and held for the
//! lifetime of the client; their composite keys are stable across
//! reconnect/rediscovery so external consumers do not churn identities.

mod light;
mod meter;
mod scene;

pub use light::Light;
pub use meter::Meter;
pub use scene::{ColorScene, Scene, SceneDevice};
