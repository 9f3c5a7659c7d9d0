// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Raw HTTP transport with bounded retry.
//!
//! Every call against the server goes through [`Transport::raw_request`]:
//! one GET over TLS (certificate validation disabled, self-signed
//! certificates are the norm for this class of device), decoding of the
//! `{ "ok": bool, "result": ... }` envelope, and a retry loop that acts on
//! connection-class failures only. Application-level rejections (non-200
//! status, malformed JSON, `"ok": false`) never self-heal with a retry and
//! are surfaced immediately.

use std::time::Duration;

use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::{Error, ParseError, Result, TransportError};

/// Retry behavior of a single [`Transport::raw_request`] call.
///
/// Between attempts the transport sleeps `interval`, then multiplies the
/// interval by `backoff` for the next wait.
///
/// # Examples
///
/// ```
/// use dstrom_lib::RetryPolicy;
/// use std::time::Duration;
///
/// // Two extra attempts, 0.9s then 2.7s apart.
/// let policy = RetryPolicy::default();
///
/// // Fail fast.
/// let policy = RetryPolicy::none();
///
/// // Keep trying with short, flat waits.
/// let policy = RetryPolicy::unlimited().with_interval(Duration::from_secs(1));
/// ```
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Number of additional attempts after the first one. `-1` retries
    /// indefinitely, `0` disables retrying.
    pub retries: i32,
    /// Wait before the first retry.
    pub interval: Duration,
    /// Multiplier applied to the wait after each retry.
    pub backoff: f64,
}

impl RetryPolicy {
    /// Default number of retries.
    pub const DEFAULT_RETRIES: i32 = 2;
    /// Default initial wait between attempts.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(900);
    /// Default backoff multiplier.
    pub const DEFAULT_BACKOFF: f64 = 3.0;

    /// A policy that never retries.
    #[must_use]
    pub fn none() -> Self {
        Self {
            retries: 0,
            ..Self::default()
        }
    }

    /// A policy that retries indefinitely.
    #[must_use]
    pub fn unlimited() -> Self {
        Self {
            retries: -1,
            ..Self::default()
        }
    }

    /// Sets the initial wait between attempts.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the backoff multiplier.
    #[must_use]
    pub fn with_backoff(mut self, backoff: f64) -> Self {
        self.backoff = backoff;
        self
    }

    /// Total attempt budget; `None` means unlimited.
    fn attempts(&self) -> Option<i64> {
        if self.retries < 0 {
            None
        } else {
            Some(i64::from(self.retries) + 1)
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: Self::DEFAULT_RETRIES,
            interval: Self::DEFAULT_INTERVAL,
            backoff: Self::DEFAULT_BACKOFF,
        }
    }
}

/// HTTP transport against one digitalSTROM server.
#[derive(Debug, Clone)]
pub struct Transport {
    client: reqwest::Client,
    base_url: String,
}

impl Transport {
    /// Creates a transport from the client configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Setup`] if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(config.request_timeout())
            .build()
            .map_err(TransportError::Setup)?;

        Ok(Self {
            client,
            base_url: config.base_url(),
        })
    }

    /// Runs a raw request against the server.
    ///
    /// `path` may already carry a query string; `params` are appended to it.
    /// Connection-class failures are retried per `retry`; once the attempt
    /// budget is exhausted the last captured error is returned.
    ///
    /// # Errors
    ///
    /// - [`Error::Transport`] after all attempts failed on connection errors
    /// - [`Error::UnexpectedStatus`] on a non-200 response
    /// - [`Error::Parse`] on a body that is not valid JSON
    /// - [`Error::CommandRejected`] on an envelope without `"ok": true`
    pub async fn raw_request(
        &self,
        path: &str,
        params: &[(&str, String)],
        retry: &RetryPolicy,
    ) -> Result<Value> {
        let mut attempts_left = retry.attempts();
        let mut wait = retry.interval;

        loop {
            match self.attempt(path, params).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() => {
                    if let Some(left) = attempts_left.as_mut() {
                        *left -= 1;
                        if *left <= 0 {
                            return Err(err);
                        }
                    }
                    tracing::debug!(
                        path = %path,
                        error = %err,
                        wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                        "transport failure, retrying"
                    );
                    tokio::time::sleep(wait).await;
                    wait = wait.mul_f64(retry.backoff);
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// One request/decode attempt.
    async fn attempt(&self, path: &str, params: &[(&str, String)]) -> Result<Value> {
        let url = format!("{}{path}", self.base_url);
        tracing::debug!(url = %url, "raw request");

        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(TransportError::Http)?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(Error::UnexpectedStatus(status.as_u16()));
        }

        let body = response.text().await.map_err(TransportError::Http)?;
        let value: Value = serde_json::from_str(&body).map_err(ParseError::Json)?;

        if !value.get("ok").and_then(Value::as_bool).unwrap_or(false) {
            return Err(Error::CommandRejected);
        }

        Ok(value)
    }
}

/// Extracts the `result` field of a decoded envelope.
pub(crate) fn result_field(envelope: &Value) -> Result<&Value> {
    envelope
        .get("result")
        .ok_or_else(|| ParseError::MissingField("result".to_string()).into())
}
