// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the HTTP backend using wiremock.

use std::time::Duration;

use powersched_lib::error::{Error, ProtocolError};
use powersched_lib::protocol::{HttpBackend, HttpConfig, RemoteMeterService, RemoteScheduleService};
use powersched_lib::schedule::{PowerSchedule, ScheduleWindow};
use powersched_lib::types::MeterId;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn schedule_json() -> serde_json::Value {
    serde_json::json!({
        "open_power": {"start": "08:00:00", "end": "18:00:00"},
        "close_power": {"start": "18:00:00", "end": "08:00:00"}
    })
}

fn day_schedule() -> PowerSchedule {
    PowerSchedule::new(
        ScheduleWindow::parse("08:00", "18:00").unwrap(),
        ScheduleWindow::parse("18:00", "08:00").unwrap(),
    )
}

// ============================================================================
// Schedule endpoints
// ============================================================================

mod schedule {
    use super::*;

    #[tokio::test]
    async fn fetch_schedule() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/system/power-schedule"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "data": schedule_json()
            })))
            .mount(&mock_server)
            .await;

        let backend = HttpBackend::new(mock_server.uri()).unwrap();
        let schedule = backend.fetch_schedule().await.unwrap();

        assert_eq!(schedule, day_schedule());
    }

    #[tokio::test]
    async fn fetch_schedule_without_data_is_parse_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/system/power-schedule"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"success": true})),
            )
            .mount(&mock_server)
            .await;

        let backend = HttpBackend::new(mock_server.uri()).unwrap();
        let err = backend.fetch_schedule().await.unwrap_err();

        assert!(matches!(err, Error::Parse(_)));
    }

    #[tokio::test]
    async fn save_schedule_puts_body_and_returns_echo() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/api/system/power-schedule"))
            .and(body_json(schedule_json()))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "message": "saved",
                "data": schedule_json()
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let backend = HttpBackend::new(mock_server.uri()).unwrap();
        let stored = backend.save_schedule(&day_schedule()).await.unwrap();

        assert_eq!(stored, day_schedule());
    }

    #[tokio::test]
    async fn save_schedule_without_echo_returns_sent_schedule() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/api/system/power-schedule"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"success": true})),
            )
            .mount(&mock_server)
            .await;

        let backend = HttpBackend::new(mock_server.uri()).unwrap();
        let stored = backend.save_schedule(&day_schedule()).await.unwrap();

        assert_eq!(stored, day_schedule());
    }

    #[tokio::test]
    async fn rejected_save_carries_backend_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/api/system/power-schedule"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "success": false,
                "error": "open_power.start is required"
            })))
            .mount(&mock_server)
            .await;

        let backend = HttpBackend::new(mock_server.uri()).unwrap();
        let err = backend.save_schedule(&day_schedule()).await.unwrap_err();

        match err {
            Error::Rejected(reason) => assert_eq!(reason, "open_power.start is required"),
            other => panic!("Expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fetch_config_reads_schedule_section() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/system/config"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "data": {
                    "power_schedule": schedule_json(),
                    "update_interval": {"current": 30}
                }
            })))
            .mount(&mock_server)
            .await;

        let backend = HttpBackend::new(mock_server.uri()).unwrap();
        let config = backend.fetch_config().await.unwrap();

        assert_eq!(config.power_schedule, Some(day_schedule()));
        assert_eq!(config.update_interval.map(|i| i.current), Some(30));
    }
}

// ============================================================================
// Meter endpoints
// ============================================================================

mod meters {
    use super::*;

    #[tokio::test]
    async fn list_meters() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/meters"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "data": [
                    {
                        "id": 1,
                        "power_on": true,
                        "voltage": 229.8,
                        "current": 1.2,
                        "power": 275.0,
                        "daily_energy": 3.4,
                        "cost_today": 1.7,
                        "name": "Unit 12",
                        "parking": "P-07",
                        "status": "online"
                    },
                    {"meter_id": 2, "status": "offline", "energy": 0.5}
                ]
            })))
            .mount(&mock_server)
            .await;

        let backend = HttpBackend::new(mock_server.uri()).unwrap();
        let meters = backend.list_meters().await.unwrap();

        assert_eq!(meters.len(), 2);
        assert_eq!(meters[0].id, MeterId::new(1));
        assert!(meters[0].power_on);
        assert_eq!(meters[0].name.as_deref(), Some("Unit 12"));
        assert!(meters[0].is_online());
        assert_eq!(meters[1].id, MeterId::new(2));
        assert!(!meters[1].is_online());
        assert_eq!(meters[1].energy, Some(0.5));
    }

    #[tokio::test]
    async fn set_power_posts_control_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/meters/7/control"))
            .and(body_json(serde_json::json!({"power_on": false})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"success": true})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let backend = HttpBackend::new(mock_server.uri()).unwrap();
        backend.set_power(MeterId::new(7), false).await.unwrap();
    }

    #[tokio::test]
    async fn set_power_relay_failure_is_rejected() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/meters/7/control"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": false,
                "error": "relay did not respond"
            })))
            .mount(&mock_server)
            .await;

        let backend = HttpBackend::new(mock_server.uri()).unwrap();
        let err = backend.set_power(MeterId::new(7), true).await.unwrap_err();

        assert!(matches!(err, Error::Rejected(ref r) if r == "relay did not respond"));
    }

    #[tokio::test]
    async fn batch_set_power() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/meters/batch/control"))
            .and(body_json(serde_json::json!({"meter_ids": [1, 2, 3], "power_on": true})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "data": {
                    "total_count": 3,
                    "success_count": 2,
                    "failed_count": 1,
                    "results": [
                        {"meter_id": 1, "success": true},
                        {"meter_id": 2, "success": true},
                        {"meter_id": 3, "success": false}
                    ]
                }
            })))
            .mount(&mock_server)
            .await;

        let backend = HttpBackend::new(mock_server.uri()).unwrap();
        let ids = [MeterId::new(1), MeterId::new(2), MeterId::new(3)];
        let report = backend.batch_set_power(&ids, true).await.unwrap();

        assert_eq!(report.total_count, 3);
        assert_eq!(report.success_count, 2);
        assert_eq!(report.failed_count, 1);
        assert!(!report.results[2].success);
    }
}

// ============================================================================
// Transport errors
// ============================================================================

mod errors {
    use super::*;

    #[tokio::test]
    async fn non_json_error_status_is_connection_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/meters"))
            .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
            .mount(&mock_server)
            .await;

        let backend = HttpBackend::new(mock_server.uri()).unwrap();
        let err = backend.list_meters().await.unwrap_err();

        match err {
            Error::Protocol(ProtocolError::ConnectionFailed(msg)) => {
                assert!(msg.contains("500"), "unexpected message: {msg}");
            }
            other => panic!("Expected ConnectionFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_json_is_parse_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/system/power-schedule"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let backend = HttpBackend::new(mock_server.uri()).unwrap();
        let err = backend.fetch_schedule().await.unwrap_err();

        assert!(matches!(err, Error::Parse(_)));
    }

    #[tokio::test]
    async fn empty_body_is_unexpected_format() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/meters"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let backend = HttpBackend::new(mock_server.uri()).unwrap();
        let err = backend.list_meters().await.unwrap_err();

        assert!(matches!(
            err,
            Error::Parse(powersched_lib::error::ParseError::UnexpectedFormat(_))
        ));
    }

    #[tokio::test]
    async fn slow_backend_times_out() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/meters"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"success": true, "data": []}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&mock_server)
            .await;

        let address = mock_server.address();
        let backend = HttpConfig::new(address.ip().to_string())
            .with_port(address.port())
            .with_timeout(Duration::from_millis(100))
            .into_backend()
            .unwrap();
        let err = backend.list_meters().await.unwrap_err();

        assert!(matches!(err, Error::Protocol(ProtocolError::Timeout(100))));
    }
}
