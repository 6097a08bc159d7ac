mod common;

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::StatusCode;
use serde_json::{json, Value};
use wiremock::matchers::{body_bytes, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use little_star_lib::util::config::ApiVersion;
use little_star_lib::util::error::TwinklyError;
use little_star_lib::util::session::{Session, TokenState};

use common::{config_for, mount_auth, mount_auth_with_delay, request_paths, token_for};

fn session_for(server: &MockServer) -> Session {
    Session::new(&config_for(server), ApiVersion::V1).unwrap()
}

#[tokio::test]
async fn test_token_is_reused_until_expiry() {
    let server = MockServer::start().await;
    let auth = mount_auth(&server, "/xled/v1", 14400).await;
    let session = session_for(&server);
    assert_eq!(session.state().await, TokenState::NoToken);

    let first = session.ensure_token().await.unwrap();
    let second = session.ensure_token().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.value(), token_for(1));
    assert_eq!(auth.logins(), 1);
    assert_eq!(session.state().await, TokenState::Valid);
}

#[tokio::test]
async fn test_expired_token_triggers_exactly_one_login() {
    let server = MockServer::start().await;
    let auth = mount_auth(&server, "/xled/v1", 1).await;
    let session = session_for(&server);

    let first = session.ensure_token().await.unwrap();
    assert_eq!(auth.logins(), 1);
    assert_eq!(session.state().await, TokenState::Valid);

    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert_eq!(session.state().await, TokenState::Expired);

    let second = session.ensure_token().await.unwrap();
    assert_eq!(auth.logins(), 2);
    assert_ne!(first, second);
    assert!(second.is_valid());
}

#[tokio::test]
async fn test_token_issued_expired_is_rejected() {
    let server = MockServer::start().await;
    let auth = mount_auth(&server, "/xled/v1", 0).await;
    Mock::given(method("GET"))
        .and(path("/xled/v1/gestalt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 1000})))
        .expect(0)
        .mount(&server)
        .await;
    let session = session_for(&server);

    let err = session.ensure_token().await.unwrap_err();
    assert!(matches!(err, TwinklyError::Auth(_)), "{:?}", err);
    assert_eq!(session.state().await, TokenState::NoToken);

    let err = session.get("gestalt").await.unwrap_err();
    assert!(matches!(err, TwinklyError::Auth(_)), "{:?}", err);
    assert_eq!(auth.logins(), 2);
}

#[tokio::test]
async fn test_login_sends_random_challenge_then_verifies() {
    let server = MockServer::start().await;
    mount_auth(&server, "/xled/v1", 14400).await;
    let session = session_for(&server);
    session.ensure_token().await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].url.path(), "/xled/v1/login");
    let login: Value = serde_json::from_slice(&requests[0].body).unwrap();
    let challenge = STANDARD
        .decode(login["challenge"].as_str().unwrap())
        .unwrap();
    assert_eq!(challenge.len(), 32);

    assert_eq!(requests[1].url.path(), "/xled/v1/verify");
    assert_eq!(
        requests[1].headers.get("X-Auth-Token").unwrap(),
        token_for(1).as_str()
    );
    let verify: Value = serde_json::from_slice(&requests[1].body).unwrap();
    assert_eq!(verify, json!({}));
}

#[tokio::test]
async fn test_concurrent_callers_share_one_login() {
    let server = MockServer::start().await;
    let auth = mount_auth_with_delay(&server, "/xled/v1", 14400, Duration::from_millis(100)).await;
    let session = session_for(&server);

    let (a, b, c) = tokio::join!(
        session.ensure_token(),
        session.ensure_token(),
        session.ensure_token()
    );

    assert_eq!(auth.logins(), 1);
    assert_eq!(a.unwrap(), b.unwrap());
    assert_eq!(c.unwrap().value(), token_for(1));
}

#[tokio::test]
async fn test_request_carries_token_and_returns_body() {
    let server = MockServer::start().await;
    mount_auth(&server, "/xled/v1", 14400).await;
    Mock::given(method("GET"))
        .and(path("/xled/v1/led/mode"))
        .and(header("X-Auth-Token", token_for(1).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"mode": "movie", "code": 1000})))
        .expect(1)
        .mount(&server)
        .await;

    let session = session_for(&server);
    let body = session.get("led/mode").await.unwrap();
    assert_eq!(body, json!({"mode": "movie", "code": 1000}));
}

#[tokio::test]
async fn test_unauthorized_is_retried_once_after_relogin() {
    let server = MockServer::start().await;
    let auth = mount_auth(&server, "/xled/v1", 14400).await;
    Mock::given(method("GET"))
        .and(path("/xled/v1/gestalt"))
        .and(header("X-Auth-Token", token_for(1).as_str()))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/xled/v1/gestalt"))
        .and(header("X-Auth-Token", token_for(2).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 1000})))
        .expect(1)
        .mount(&server)
        .await;

    let session = session_for(&server);
    let body = session.get("gestalt").await.unwrap();

    assert_eq!(body, json!({"code": 1000}));
    assert_eq!(auth.logins(), 2);
    assert_eq!(
        request_paths(&server).await,
        vec![
            "POST /xled/v1/login",
            "POST /xled/v1/verify",
            "GET /xled/v1/gestalt",
            "POST /xled/v1/login",
            "POST /xled/v1/verify",
            "GET /xled/v1/gestalt",
        ]
    );
}

#[tokio::test]
async fn test_second_unauthorized_propagates() {
    let server = MockServer::start().await;
    let auth = mount_auth(&server, "/xled/v1", 14400).await;
    Mock::given(method("GET"))
        .and(path("/xled/v1/gestalt"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    let session = session_for(&server);
    let err = session.get("gestalt").await.unwrap_err();

    assert!(err.is_unauthorized(), "{:?}", err);
    assert_eq!(auth.logins(), 2);
}

#[tokio::test]
async fn test_other_http_errors_are_not_retried() {
    let server = MockServer::start().await;
    let auth = mount_auth(&server, "/xled/v1", 14400).await;
    Mock::given(method("POST"))
        .and(path("/xled/v1/led/mode"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let session = session_for(&server);
    let err = session
        .post("led/mode", json!({"mode": "movie"}))
        .await
        .unwrap_err();

    match err {
        TwinklyError::Http { status, body, .. } => {
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(body, "boom");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(auth.logins(), 1);
}

#[tokio::test]
async fn test_rejected_login_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/xled/v1/login"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let session = session_for(&server);
    let err = session.get("gestalt").await.unwrap_err();
    assert!(matches!(err, TwinklyError::Auth(_)), "{:?}", err);
}

#[tokio::test]
async fn test_malformed_login_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/xled/v1/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 1000})))
        .mount(&server)
        .await;

    let session = session_for(&server);
    let err = session.ensure_token().await.unwrap_err();
    assert!(matches!(err, TwinklyError::Auth(_)), "{:?}", err);
}

#[tokio::test]
async fn test_failed_verify_is_fatal_and_caches_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/xled/v1/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "authentication_token": token_for(1),
            "authentication_token_expires_in": 14400
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/xled/v1/verify"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let session = session_for(&server);
    let err = session.get("gestalt").await.unwrap_err();
    assert!(matches!(err, TwinklyError::Auth(_)), "{:?}", err);
    assert_eq!(session.state().await, TokenState::NoToken);
}

#[tokio::test]
async fn test_timeout_is_transport_error_without_retry() {
    let server = MockServer::start().await;
    let auth = mount_auth(&server, "/xled/v1", 14400).await;
    Mock::given(method("GET"))
        .and(path("/xled/v1/summary"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server).with_timeout(Duration::from_millis(300));
    let session = Session::new(&config, ApiVersion::V1).unwrap();
    let err = session.get("summary").await.unwrap_err();

    assert!(err.is_timeout(), "{:?}", err);
    assert!(err.is_transport());
    assert_eq!(auth.logins(), 1);
}

#[tokio::test]
async fn test_octet_stream_upload() {
    let server = MockServer::start().await;
    mount_auth(&server, "/xled/v1", 14400).await;
    Mock::given(method("POST"))
        .and(path("/xled/v1/led/movie/full"))
        .and(header("Content-Type", "application/octet-stream"))
        .and(body_bytes(vec![1u8, 2, 3, 4, 5, 6]))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"frames_number": 1, "code": 1000})))
        .expect(1)
        .mount(&server)
        .await;

    let session = session_for(&server);
    let body = session
        .post_octets("led/movie/full", vec![1u8, 2, 3, 4, 5, 6])
        .await
        .unwrap();
    assert_eq!(body["frames_number"], 1);
}

#[tokio::test]
async fn test_empty_success_body_is_null() {
    let server = MockServer::start().await;
    mount_auth(&server, "/xled/v1", 14400).await;
    Mock::given(method("POST"))
        .and(path("/xled/v1/led/effects/current"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let session = session_for(&server);
    let body = session
        .post("led/effects/current", json!({"effect_id": 1}))
        .await
        .unwrap();
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn test_logout_drops_token() {
    let server = MockServer::start().await;
    let auth = mount_auth(&server, "/xled/v1", 14400).await;
    Mock::given(method("POST"))
        .and(path("/xled/v1/logout"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 1000})))
        .expect(1)
        .mount(&server)
        .await;

    let session = session_for(&server);
    session.logout().await.unwrap();
    assert_eq!(session.state().await, TokenState::NoToken);

    session.ensure_token().await.unwrap();
    assert_eq!(auth.logins(), 2);
}
