// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for transport, session, discovery and command stack
//! using wiremock.

use std::sync::Arc;
use std::time::Duration;

use dstrom_lib::{
    Client, ClientConfig, Error, ParseError, RetryPolicy, SessionManager, Transport,
};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const APP_TOKEN: &str = "app-token";

fn config_for(server: &MockServer) -> ClientConfig {
    let uri = server.uri();
    let address = uri.trim_start_matches("http://");
    let (host, port) = address.split_once(':').expect("host:port");
    ClientConfig::new(host, APP_TOKEN)
        .with_port(port.parse().unwrap())
        .with_plain_http()
        .with_stack_delay(Duration::from_millis(10))
}

fn ok_envelope(result: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": result}))
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/json/system/loginApplication"))
        .and(query_param("loginToken", APP_TOKEN))
        .respond_with(ok_envelope(json!({"token": "session-1"})))
        .mount(server)
        .await;
}

// ============================================================================
// Transport
// ============================================================================

mod transport {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// A listener that drops every connection before answering, so each
    /// attempt fails with a connection-class error that can be counted.
    async fn dropping_listener() -> (u16, Arc<AtomicU32>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                drop(stream);
            }
        });
        (port, attempts)
    }

    #[tokio::test]
    async fn ok_envelope_is_returned() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/apartment/getName"))
            .respond_with(ok_envelope(json!({"name": "Home"})))
            .mount(&server)
            .await;

        let transport = Transport::new(&config_for(&server)).unwrap();
        let envelope = transport
            .raw_request("/json/apartment/getName", &[], &RetryPolicy::none())
            .await
            .unwrap();

        assert_eq!(envelope["result"]["name"], "Home");
    }

    #[tokio::test]
    async fn non_200_is_terminal_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/apartment/getName"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let transport = Transport::new(&config_for(&server)).unwrap();
        let err = transport
            .raw_request(
                "/json/apartment/getName",
                &[],
                &RetryPolicy::default().with_interval(Duration::from_millis(1)),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::UnexpectedStatus(500)));
    }

    #[tokio::test]
    async fn not_ok_envelope_is_rejected_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/zone/callScene"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": false})))
            .expect(1)
            .mount(&server)
            .await;

        let transport = Transport::new(&config_for(&server)).unwrap();
        let err = transport
            .raw_request(
                "/json/zone/callScene?id=1&sceneNumber=5&force=true",
                &[],
                &RetryPolicy::default().with_interval(Duration::from_millis(1)),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::CommandRejected));
    }

    #[tokio::test]
    async fn malformed_json_is_terminal_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/apartment/getName"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .expect(1)
            .mount(&server)
            .await;

        let transport = Transport::new(&config_for(&server)).unwrap();
        let err = transport
            .raw_request(
                "/json/apartment/getName",
                &[],
                &RetryPolicy::default().with_interval(Duration::from_millis(1)),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Parse(ParseError::Json(_))));
    }

    #[tokio::test]
    async fn connection_failures_consume_the_whole_attempt_budget() {
        let (port, attempts) = dropping_listener().await;
        let config = ClientConfig::new("127.0.0.1", APP_TOKEN)
            .with_port(port)
            .with_plain_http();
        let transport = Transport::new(&config).unwrap();

        let policy = RetryPolicy {
            retries: 2,
            interval: Duration::from_millis(5),
            backoff: 1.0,
        };
        let err = transport
            .raw_request("/json/apartment/getName", &[], &policy)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Transport(_)));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_waits_grow_by_the_backoff_factor() {
        let (port, _attempts) = dropping_listener().await;
        let config = ClientConfig::new("127.0.0.1", APP_TOKEN)
            .with_port(port)
            .with_plain_http();
        let transport = Transport::new(&config).unwrap();

        // Two waits at a flat interval: 50ms + 50ms.
        let flat = RetryPolicy {
            retries: 2,
            interval: Duration::from_millis(50),
            backoff: 1.0,
        };
        let started = tokio::time::Instant::now();
        let _ = transport
            .raw_request("/json/apartment/getName", &[], &flat)
            .await
            .unwrap_err();
        let flat_elapsed = started.elapsed();

        // Two waits with the multiplier applied: 50ms + 250ms.
        let growing = RetryPolicy {
            retries: 2,
            interval: Duration::from_millis(50),
            backoff: 5.0,
        };
        let started = tokio::time::Instant::now();
        let _ = transport
            .raw_request("/json/apartment/getName", &[], &growing)
            .await
            .unwrap_err();
        let growing_elapsed = started.elapsed();

        assert!(
            flat_elapsed >= Duration::from_millis(100),
            "flat waits too short: {flat_elapsed:?}"
        );
        assert!(
            growing_elapsed >= Duration::from_millis(300),
            "backoff multiplier not applied: {growing_elapsed:?}"
        );
        assert!(growing_elapsed > flat_elapsed);
    }
}

// ============================================================================
// Session manager
// ============================================================================

mod session {
    use super::*;

    #[tokio::test]
    async fn token_is_minted_once_and_attached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/system/loginApplication"))
            .and(query_param("loginToken", APP_TOKEN))
            .respond_with(ok_envelope(json!({"token": "session-1"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/json/apartment/getName"))
            .and(query_param("token", "session-1"))
            .respond_with(ok_envelope(json!({"name": "Home"})))
            .expect(2)
            .mount(&server)
            .await;

        let transport = Transport::new(&config_for(&server)).unwrap();
        let session = SessionManager::new(transport, APP_TOKEN);

        // Two calls inside the validity window share one token.
        session
            .request("/json/apartment/getName", &[])
            .await
            .unwrap();
        session
            .request("/json/apartment/getName", &[])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn stale_token_is_refreshed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/system/loginApplication"))
            .respond_with(ok_envelope(json!({"token": "session-1"})))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/json/apartment/getName"))
            .and(query_param("token", "session-1"))
            .respond_with(ok_envelope(json!({"name": "Home"})))
            .mount(&server)
            .await;

        let transport = Transport::new(&config_for(&server)).unwrap();
        // Zero-width refresh window: every call is past the margin.
        let session =
            SessionManager::new(transport, APP_TOKEN).with_refresh_after(Duration::ZERO);

        session
            .request("/json/apartment/getName", &[])
            .await
            .unwrap();
        session
            .request("/json/apartment/getName", &[])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn login_without_token_is_a_parse_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/system/loginApplication"))
            .respond_with(ok_envelope(json!({})))
            .mount(&server)
            .await;

        let transport = Transport::new(&config_for(&server)).unwrap();
        let session = SessionManager::new(transport, APP_TOKEN);

        let err = session
            .request("/json/apartment/getName", &[])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Parse(ParseError::MissingField(field)) if field == "result.token"
        ));
    }
}

// ============================================================================
// Topology discovery
// ============================================================================

mod discovery {
    use super::*;

    /// One named zone with a lighting group (reachable 0/5/17, scene 17
    /// custom-named), one blinds group, one unnamed zone, two meters (one
    /// unnamed).
    async fn mount_topology(server: &MockServer) {
        mount_login(server).await;

        Mock::given(method("GET"))
            .and(path("/json/property/query2"))
            .respond_with(ok_envelope(json!({
                "zone0": {"name": "", "ZoneID": 0},
                "zone1": {
                    "name": "Kitchen",
                    "ZoneID": 1,
                    "group1": {
                        "group": 1,
                        "color": 1,
                        "scene17": {"scene": 17, "name": "Cooking"}
                    },
                    "group2": {"group": 2, "color": 2}
                },
                "zone2": {"name": "", "ZoneID": 2}
            })))
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path("/json/zone/getReachableScenes"))
            .and(query_param("id", "1"))
            .and(query_param("groupID", "1"))
            .respond_with(ok_envelope(json!({"reachableScenes": [0, 5, 17]})))
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path("/json/property/getChildren"))
            .and(query_param("path", "/apartment/dSMeters/"))
            .respond_with(ok_envelope(json!([
                {"name": "302ed89f43f0"},
                {"name": "302000000000"}
            ])))
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path("/json/property/getString"))
            .and(query_param("path", "/apartment/dSMeters/302ed89f43f0/name"))
            .respond_with(ok_envelope(json!({"value": "Main Meter"})))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/json/property/getString"))
            .and(query_param("path", "/apartment/dSMeters/302ed89f43f0/dSID"))
            .respond_with(ok_envelope(json!({"value": "3504175fe000"})))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/json/property/getString"))
            .and(query_param("path", "/apartment/dSMeters/302000000000/name"))
            .respond_with(ok_envelope(json!({"value": ""})))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/json/property/getString"))
            .and(query_param("path", "/apartment/dSMeters/302000000000/dSID"))
            .respond_with(ok_envelope(json!({"value": "350000000000"})))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn discovers_scenes_meters_and_lights() {
        let server = MockServer::start().await;
        mount_topology(&server).await;

        let client = Client::new(config_for(&server)).unwrap();
        client.initialize().await.unwrap();

        let scenes = client.scenes();

        // Zone-wide generic scenes in both named zones; the root zone was
        // renamed to the apartment alias.
        let present = scenes.get("1_71").unwrap();
        assert_eq!(present.name(), "Kitchen / Present");
        assert!(present.color().is_none());
        let root_present = scenes.get("0_71").unwrap();
        assert_eq!(root_present.zone_name(), "Apartment");

        // Reachable lighting scenes.
        let off = scenes.get("1_1_0").unwrap();
        assert_eq!(off.scene_name(), "Preset0");
        assert_eq!(off.color(), Some(1));
        assert!(scenes.contains_key("1_1_5"));

        // Custom name wins over the generic table name for the same key.
        let custom = scenes.get("1_1_17").unwrap();
        assert_eq!(custom.scene_name(), "Cooking");

        // The unnamed zone contributed nothing.
        assert!(!scenes.keys().any(|key| key.starts_with("2_")));
        // The blinds group has no reachable-scene entities.
        assert!(!scenes.keys().any(|key| key.starts_with("1_2_")));

        // Meters: the unnamed one is excluded.
        let meters = client.meters();
        assert_eq!(meters.len(), 1);
        let meter = meters.get("302ed89f43f0").unwrap();
        assert_eq!(meter.name(), "Main Meter");
        assert_eq!(meter.dsid(), "3504175fe000");

        // The 0/5 pair is recognized as one light.
        let lights = client.lights();
        assert_eq!(lights.len(), 1);
        assert_eq!(lights[0].unique_id(), "light_1_1_0");
        assert_eq!(lights[0].name(), "Light");
    }

    #[tokio::test]
    async fn discovery_is_idempotent() {
        let server = MockServer::start().await;
        mount_topology(&server).await;

        let client = Client::new(config_for(&server)).unwrap();
        client.initialize().await.unwrap();
        let first_scenes: Vec<String> = {
            let mut keys: Vec<_> = client.scenes().into_keys().collect();
            keys.sort();
            keys
        };
        let first_meters = client.meters().len();

        client.initialize().await.unwrap();
        let mut second_scenes: Vec<_> = client.scenes().into_keys().collect();
        second_scenes.sort();

        assert_eq!(first_scenes, second_scenes);
        assert_eq!(first_meters, client.meters().len());
    }

    #[tokio::test]
    async fn first_failure_is_retried_once() {
        let server = MockServer::start().await;
        // Mounted first so it shadows the healthy tree query exactly once.
        Mock::given(method("GET"))
            .and(path("/json/property/query2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": false})))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        mount_topology(&server).await;

        let client = Client::new(config_for(&server)).unwrap();
        client.initialize().await.unwrap();
        assert!(!client.scenes().is_empty());
    }

    #[tokio::test]
    async fn persistent_failure_surfaces_initialization_error() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        Mock::given(method("GET"))
            .and(path("/json/property/query2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": false})))
            .mount(&server)
            .await;

        let client = Client::new(config_for(&server)).unwrap();
        let err = client.initialize().await.unwrap_err();
        assert!(matches!(err, Error::Initialization(_)));
    }

    #[tokio::test]
    async fn meter_reads_pull_latest_values() {
        let server = MockServer::start().await;
        mount_topology(&server).await;
        Mock::given(method("GET"))
            .and(path("/json/metering/getLatest"))
            .and(query_param("type", "consumption"))
            .respond_with(ok_envelope(json!({"values": [{"value": 42.5}]})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/json/metering/getLatest"))
            .and(query_param("type", "energy"))
            .respond_with(ok_envelope(json!({"values": [{"value": 123456.0}]})))
            .mount(&server)
            .await;

        let client = Client::new(config_for(&server)).unwrap();
        client.initialize().await.unwrap();
        let meters = client.meters();
        let meter = meters.get("302ed89f43f0").unwrap();

        assert!((meter.latest_consumption().await.unwrap() - 42.5).abs() < f64::EPSILON);
        assert!((meter.latest_energy().await.unwrap() - 123_456.0).abs() < f64::EPSILON);
    }
}

// ============================================================================
// Command stack
// ============================================================================

mod command_stack {
    use super::*;

    async fn call_scene_params(server: &MockServer) -> Vec<String> {
        server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter(|request| request.url.path() == "/json/zone/callScene")
            .map(|request| {
                request
                    .url
                    .query_pairs()
                    .find(|(key, _)| key == "sceneNumber")
                    .map(|(_, value)| value.into_owned())
                    .unwrap_or_default()
            })
            .collect()
    }

    #[tokio::test]
    async fn commands_dispatch_in_fifo_order() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        Mock::given(method("GET"))
            .and(path("/json/zone/callScene"))
            .respond_with(ok_envelope(json!({})))
            .mount(&server)
            .await;

        let client = Client::new(config_for(&server)).unwrap();
        let stack = client.command_stack();
        stack.start();

        for scene in [71, 72, 69] {
            stack.enqueue(format!(
                "/json/zone/callScene?id=1&sceneNumber={scene}&force=true"
            ));
        }

        tokio::time::sleep(Duration::from_millis(200)).await;
        stack.stop().await;

        assert_eq!(call_scene_params(&server).await, vec!["71", "72", "69"]);
    }

    #[tokio::test]
    async fn failed_dispatch_does_not_halt_the_loop() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        Mock::given(method("GET"))
            .and(path("/json/zone/callScene"))
            .and(query_param("sceneNumber", "13"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": false})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/json/zone/callScene"))
            .and(query_param("sceneNumber", "71"))
            .respond_with(ok_envelope(json!({})))
            .mount(&server)
            .await;

        let client = Client::new(config_for(&server)).unwrap();
        let stack = client.command_stack();
        stack.start();

        stack.enqueue("/json/zone/callScene?id=1&sceneNumber=13&force=true");
        stack.enqueue("/json/zone/callScene?id=1&sceneNumber=71&force=true");

        tokio::time::sleep(Duration::from_millis(200)).await;
        stack.stop().await;

        assert_eq!(call_scene_params(&server).await, vec!["13", "71"]);
    }

    #[tokio::test]
    async fn scene_activation_goes_through_the_stack() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        Mock::given(method("GET"))
            .and(path("/json/property/query2"))
            .respond_with(ok_envelope(json!({
                "zone1": {"name": "Kitchen", "ZoneID": 1}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/json/property/getChildren"))
            .respond_with(ok_envelope(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/json/zone/callScene"))
            .and(query_param("id", "1"))
            .and(query_param("sceneNumber", "71"))
            .and(query_param("force", "true"))
            .respond_with(ok_envelope(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let client = Client::new(config_for(&server)).unwrap();
        client.initialize().await.unwrap();
        client.command_stack().start();

        client.scenes().get("1_71").unwrap().activate();

        tokio::time::sleep(Duration::from_millis(100)).await;
        client.command_stack().stop().await;
    }
}
