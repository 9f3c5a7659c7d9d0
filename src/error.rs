// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `dstrom` library.
//!
//! The hierarchy separates retryable transport failures from terminal
//! application-level rejections: only [`TransportError`] participates in the
//! retry loop of [`crate::transport::Transport`], everything else propagates
//! to the caller immediately.

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Connection-class failure (refused, reset, timed out). Retryable.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The server answered with a non-200 status. Terminal per attempt;
    /// application-level rejections are surfaced fast rather than retried.
    #[error("unexpected HTTP status {0}")]
    UnexpectedStatus(u16),

    /// The server envelope carried `"ok": false` (or no `"ok"` at all),
    /// signaling a rejected command or query.
    #[error("command rejected by server")]
    CommandRejected,

    /// The response body could not be decoded or misses an expected field.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Topology discovery failed after the built-in retry.
    #[error("initialization failed: {0}")]
    Initialization(#[source] Box<Error>),

    /// The event subscription was rejected or expired. Handled internally
    /// by the event listener via re-subscription, never surfaced to callers.
    #[error("event subscription lost")]
    SubscriptionLost,
}

/// Connection-class transport failures. These are the only errors the
/// transport retry loop acts on.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The underlying HTTP request failed before a status was received.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The HTTP client could not be constructed.
    #[error("client setup failed: {0}")]
    Setup(#[source] reqwest::Error),
}

/// Errors related to decoding server responses.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The body was not valid JSON.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// An expected field is missing from the response envelope.
    #[error("missing field in response: {0}")]
    MissingField(String),

    /// A field was present but held an unusable value.
    #[error("failed to parse {field}: {message}")]
    InvalidValue {
        /// The field that failed to parse.
        field: String,
        /// Description of the parsing failure.
        message: String,
    },
}

impl Error {
    /// Returns `true` if this error is connection-class and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
