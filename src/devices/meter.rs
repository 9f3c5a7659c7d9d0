// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Energy meter entities.

use std::sync::Arc;

use serde_json::Value;

use crate::error::{ParseError, Result};
use crate::session::SessionManager;
use crate::transport;

/// A physical energy meter.
///
/// Meters are addressed two ways: by dSUID (the node in the server's
/// property tree, used as map key) and by dSID (the externally addressable
/// device ID, used in metering queries). Name and dSID are resolved once
/// during [`Meter::connect`] and immutable afterwards; consumption and
/// energy are pull-based queries.
#[derive(Debug, Clone)]
pub struct Meter {
    session: Arc<SessionManager>,
    dsuid: String,
    dsid: String,
    name: String,
}

impl Meter {
    /// Resolves a meter's display name and dSID from its property subtree.
    ///
    /// # Errors
    ///
    /// Fails if either lookup misses its `result` envelope; discovery treats
    /// that as terminal for the whole initialization.
    pub(crate) async fn connect(
        session: Arc<SessionManager>,
        dsuid: impl Into<String>,
    ) -> Result<Self> {
        let dsuid = dsuid.into();

        let name = get_string(
            &session,
            &format!("/json/property/getString?path=/apartment/dSMeters/{dsuid}/name"),
        )
        .await?;
        let dsid = get_string(
            &session,
            &format!("/json/property/getString?path=/apartment/dSMeters/{dsuid}/dSID"),
        )
        .await?;

        Ok(Self {
            session,
            dsuid,
            dsid,
            name,
        })
    }

    /// The meter's property-tree node identifier; also its map key.
    #[must_use]
    pub fn dsuid(&self) -> &str {
        &self.dsuid
    }

    /// The externally addressable device ID.
    #[must_use]
    pub fn dsid(&self) -> &str {
        &self.dsid
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last-sampled instantaneous consumption, in watts.
    ///
    /// # Errors
    ///
    /// Propagates transport and envelope failures.
    pub async fn latest_consumption(&self) -> Result<f64> {
        self.latest("consumption").await
    }

    /// Cumulative energy, in watt-seconds.
    ///
    /// # Errors
    ///
    /// Propagates transport and envelope failures.
    pub async fn latest_energy(&self) -> Result<f64> {
        self.latest("energy").await
    }

    async fn latest(&self, kind: &str) -> Result<f64> {
        let path = format!(
            "/json/metering/getLatest?from=.meters({})&type={kind}",
            self.dsid
        );
        let envelope = self.session.request(&path, &[]).await?;

        transport::result_field(&envelope)?
            .get("values")
            .and_then(Value::as_array)
            .and_then(|values| values.first())
            .and_then(|entry| entry.get("value"))
            .and_then(Value::as_f64)
            .ok_or_else(|| {
                ParseError::MissingField("result.values[0].value".to_string()).into()
            })
    }
}

/// Fetches a single string property.
async fn get_string(session: &Arc<SessionManager>, path: &str) -> Result<String> {
    let envelope = session.request(path, &[]).await?;
    transport::result_field(&envelope)?
        .get("value")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| ParseError::MissingField("result.value".to_string()).into())
}
