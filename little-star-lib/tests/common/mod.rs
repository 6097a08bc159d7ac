#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use little_star_lib::util::config::DeviceConfig;

/// Token handed out by the n-th login (1-based).
pub fn token_for(n: usize) -> String {
    STANDARD.encode([n as u8; 8])
}

pub fn raw_token_for(n: usize) -> Vec<u8> {
    vec![n as u8; 8]
}

/// Answers every login with a new token and counts the logins.
pub struct TokenIssuer {
    issued: Arc<AtomicUsize>,
    expires_in: u64,
    delay: Duration,
}

impl Respond for TokenIssuer {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        ResponseTemplate::new(200)
            .set_body_json(json!({
                "authentication_token": token_for(n),
                "authentication_token_expires_in": self.expires_in,
                "challenge-response": "0123456789abcdef",
                "code": 1000
            }))
            .set_delay(self.delay)
    }
}

pub struct Auth {
    issued: Arc<AtomicUsize>,
}

impl Auth {
    pub fn logins(&self) -> usize {
        self.issued.load(Ordering::SeqCst)
    }
}

pub async fn mount_auth(server: &MockServer, base: &str, expires_in: u64) -> Auth {
    mount_auth_with_delay(server, base, expires_in, Duration::ZERO).await
}

pub async fn mount_auth_with_delay(
    server: &MockServer,
    base: &str,
    expires_in: u64,
    delay: Duration,
) -> Auth {
    let issued = Arc::new(AtomicUsize::new(0));
    Mock::given(method("POST"))
        .and(path(format!("{}/login", base)))
        .respond_with(TokenIssuer {
            issued: issued.clone(),
            expires_in,
            delay,
        })
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{}/verify", base)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 1000})))
        .mount(server)
        .await;
    Auth { issued }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn config_for(server: &MockServer) -> DeviceConfig {
    init_logging();
    DeviceConfig::new("127.0.0.1")
        .with_http_port(server.address().port())
        .with_timeout(Duration::from_secs(2))
}

pub fn gestalt(number_of_led: usize, led_profile: &str) -> Value {
    json!({
        "product_name": "Twinkly",
        "hardware_version": "100",
        "bytes_per_led": 3,
        "hw_id": "e00000",
        "flash_size": 64,
        "led_type": 14,
        "product_code": "TWS250STP-B",
        "fw_family": "F",
        "device_name": "Xmas tree",
        "uptime": "21172191",
        "mac": "aa:bb:cc:dd:ee:ff",
        "uuid": "5b1e2e56-7f2b-4a3c-9a5e-0c3b1a2d9e11",
        "max_supported_led": 500,
        "number_of_led": number_of_led,
        "led_profile": led_profile,
        "frame_rate": 23.77,
        "measured_frame_rate": 25,
        "movie_capacity": 5397,
        "max_movies": 55,
        "copyright": "LEDWORKS 2021",
        "code": 1000
    })
}

/// Paths of every request the server saw, in arrival order.
pub async fn request_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|request| format!("{} {}", request.method, request.url.path()))
        .collect()
}
