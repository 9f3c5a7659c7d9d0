// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Session token lifecycle.
//!
//! The server issues short-lived session tokens minted from the long-lived
//! application token. A token stays valid for roughly 60 seconds after the
//! last request, so the manager refreshes it once 50 seconds have elapsed
//! (a 10 second safety margin) and attaches it to every authenticated call.
//!
//! # Concurrency
//!
//! Token and last-request timestamp live behind one `tokio::sync::Mutex`, so
//! at most one refresh is in flight at a time. The actual HTTP request runs
//! *outside* the lock; serializing whole requests would let the event
//! listener's long-poll starve every other caller.

use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::{ParseError, Result};
use crate::transport::{self, RetryPolicy, Transport};

/// Cached session credential plus the "last tried" stamp.
///
/// The timestamp tracks *tried*, not *succeeded*: it is bumped before the
/// request is issued, which mirrors how the server extends token validity.
#[derive(Debug, Default)]
struct SessionState {
    token: Option<String>,
    last_request: Option<Instant>,
}

/// Owns the application token and transparently maintains a session token.
///
/// One instance per server connection; all components (discovery, command
/// stack, event listener, meter reads) share it through an `Arc`.
#[derive(Debug)]
pub struct SessionManager {
    transport: Transport,
    app_token: String,
    refresh_after: Duration,
    state: Mutex<SessionState>,
}

impl SessionManager {
    /// Assumed session token lifetime.
    pub const TOKEN_LIFETIME: Duration = Duration::from_secs(60);
    /// Safety margin subtracted from the assumed lifetime.
    pub const REFRESH_MARGIN: Duration = Duration::from_secs(10);

    /// Creates a session manager on top of a transport.
    #[must_use]
    pub fn new(transport: Transport, app_token: impl Into<String>) -> Self {
        Self {
            transport,
            app_token: app_token.into(),
            refresh_after: Self::TOKEN_LIFETIME - Self::REFRESH_MARGIN,
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Overrides the refresh window. Intended for tests and servers with a
    /// non-standard session timeout.
    #[must_use]
    pub fn with_refresh_after(mut self, refresh_after: Duration) -> Self {
        self.refresh_after = refresh_after;
        self
    }

    /// Runs an authenticated request with the default retry policy.
    ///
    /// # Errors
    ///
    /// Propagates transport, status, rejection and parse errors; a login
    /// response without a token surfaces as [`ParseError::MissingField`].
    pub async fn request(&self, path: &str, extra_params: &[(&str, String)]) -> Result<Value> {
        self.request_with(path, extra_params, &RetryPolicy::default())
            .await
    }

    /// Runs an authenticated request with an explicit retry policy.
    ///
    /// # Errors
    ///
    /// Same as [`SessionManager::request`].
    pub async fn request_with(
        &self,
        path: &str,
        extra_params: &[(&str, String)],
        retry: &RetryPolicy,
    ) -> Result<Value> {
        let token = self.fresh_token().await?;

        let mut params: Vec<(&str, String)> = extra_params.to_vec();
        params.push(("token", token));

        tracing::debug!(path = %path, "authenticated request");
        self.transport.raw_request(path, &params, retry).await
    }

    /// Returns a token that is safely inside its validity window, refreshing
    /// it first if needed, and stamps the state as "tried now".
    async fn fresh_token(&self) -> Result<String> {
        let mut state = self.state.lock().await;

        let token = match (&state.token, state.last_request) {
            (Some(token), Some(last)) if last.elapsed() <= self.refresh_after => token.clone(),
            _ => {
                let token = self.login().await?;
                state.token = Some(token.clone());
                token
            }
        };

        state.last_request = Some(Instant::now());
        Ok(token)
    }

    /// Mints a new session token from the application token.
    async fn login(&self) -> Result<String> {
        tracing::debug!("requesting new session token");

        let path = format!(
            "/json/system/loginApplication?loginToken={}",
            urlencoding::encode(&self.app_token)
        );
        let envelope = self
            .transport
            .raw_request(&path, &[], &RetryPolicy::default())
            .await?;

        transport::result_field(&envelope)?
            .get("token")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| ParseError::MissingField("result.token".to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_window_leaves_safety_margin() {
        assert_eq!(
            SessionManager::TOKEN_LIFETIME - SessionManager::REFRESH_MARGIN,
            Duration::from_secs(50)
        );
    }
}
