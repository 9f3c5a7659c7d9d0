// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Client configuration.

use std::time::Duration;

/// Configuration for a digitalSTROM server connection.
///
/// Holds the connection parameters, the long-lived application token and the
/// tunables of the background loops. All authenticated traffic derives from
/// this one configuration; create one `ClientConfig` per server.
///
/// # Examples
///
/// ```
/// use dstrom_lib::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::new("dss.local", "app-token")
///     .with_port(8080)
///     .with_apartment_name("Home")
///     .with_stack_delay(Duration::from_millis(250));
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    host: String,
    port: u16,
    app_token: String,
    apartment_name: String,
    stack_delay: Duration,
    event_name: String,
    poll_timeout: Duration,
    request_timeout: Duration,
    plain_http: bool,
}

impl ClientConfig {
    /// Default server port.
    pub const DEFAULT_PORT: u16 = 8080;
    /// Default alias for the root zone.
    pub const DEFAULT_APARTMENT_NAME: &'static str = "Apartment";
    /// Default delay between two command dispatches.
    pub const DEFAULT_STACK_DELAY: Duration = Duration::from_millis(500);
    /// Default event stream the listener subscribes to.
    pub const DEFAULT_EVENT_NAME: &'static str = "callScene";
    /// Default long-poll timeout for the event loop.
    pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(60);
    /// Default per-request timeout. Must exceed the poll timeout so the
    /// long-poll is terminated by the server, not by the HTTP client.
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

    /// Creates a configuration for the given host and application token.
    #[must_use]
    pub fn new(host: impl Into<String>, app_token: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: Self::DEFAULT_PORT,
            app_token: app_token.into(),
            apartment_name: Self::DEFAULT_APARTMENT_NAME.to_string(),
            stack_delay: Self::DEFAULT_STACK_DELAY,
            event_name: Self::DEFAULT_EVENT_NAME.to_string(),
            poll_timeout: Self::DEFAULT_POLL_TIMEOUT,
            request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
            plain_http: false,
        }
    }

    /// Sets a custom port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the alias used to rename the root zone (zone 0).
    #[must_use]
    pub fn with_apartment_name(mut self, name: impl Into<String>) -> Self {
        self.apartment_name = name.into();
        self
    }

    /// Sets the minimum delay between two command dispatches.
    #[must_use]
    pub fn with_stack_delay(mut self, delay: Duration) -> Self {
        self.stack_delay = delay;
        self
    }

    /// Sets the name of the server event stream to subscribe to.
    #[must_use]
    pub fn with_event_name(mut self, name: impl Into<String>) -> Self {
        self.event_name = name.into();
        self
    }

    /// Sets the long-poll timeout of the event loop.
    #[must_use]
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Talks plain HTTP instead of TLS.
    ///
    /// Real servers only speak TLS (with self-signed certificates); this is
    /// for test fixtures and reverse-proxied setups.
    #[must_use]
    pub fn with_plain_http(mut self) -> Self {
        self.plain_http = true;
        self
    }

    /// Returns the host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the application token.
    #[must_use]
    pub fn app_token(&self) -> &str {
        &self.app_token
    }

    /// Returns the root zone alias.
    #[must_use]
    pub fn apartment_name(&self) -> &str {
        &self.apartment_name
    }

    /// Returns the inter-dispatch delay of the command stack.
    #[must_use]
    pub fn stack_delay(&self) -> Duration {
        self.stack_delay
    }

    /// Returns the subscribed event stream name.
    #[must_use]
    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    /// Returns the event long-poll timeout.
    #[must_use]
    pub fn poll_timeout(&self) -> Duration {
        self.poll_timeout
    }

    /// Returns the per-request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Builds the base URL from this configuration.
    #[must_use]
    pub fn base_url(&self) -> String {
        let scheme = if self.plain_http { "http" } else { "https" };
        format!("{scheme}://{}:{}", self.host, self.port)
    }
}
