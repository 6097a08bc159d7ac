use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::util::error::{Result, TwinklyError};

/// Size of the random login challenge in bytes.
pub const CHALLENGE_LEN: usize = 32;

pub struct Auth;

impl Auth {
    pub fn generate_challenge() -> Vec<u8> {
        let mut challenge = vec![0u8; CHALLENGE_LEN];
        rand::thread_rng().fill_bytes(&mut challenge);
        challenge
    }

    /// Builds the body for the `login` call from a fresh random challenge.
    pub fn login_request() -> LoginRequest {
        LoginRequest {
            challenge: STANDARD.encode(Self::generate_challenge()),
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub challenge: String,
}

#[derive(Deserialize, Debug)]
pub struct LoginResponse {
    pub authentication_token: String,
    /// Lifetime of the token in seconds.
    pub authentication_token_expires_in: u64,
}

/// A bearer token handed out by the device.
///
/// Tokens are never mutated. A refresh produces a new `AuthToken` that replaces
/// the old one in the session.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken {
    value: String,
    expires_at: Instant,
}

impl AuthToken {
    pub fn new(value: String, expires_at: Instant) -> Self {
        AuthToken { value, expires_at }
    }

    /// Token that expires `lifetime` after `now`.
    pub fn issued_at(value: String, now: Instant, lifetime: Duration) -> Self {
        AuthToken::new(value, now + lifetime)
    }

    pub fn from_login(response: LoginResponse) -> Self {
        AuthToken::issued_at(
            response.authentication_token,
            Instant::now(),
            Duration::from_secs(response.authentication_token_expires_in),
        )
    }

    /// The base64 string sent in the `X-Auth-Token` header.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Instant::now())
    }

    pub fn is_valid_at(&self, now: Instant) -> bool {
        now < self.expires_at
    }

    /// Decoded token bytes, as embedded in realtime datagrams.
    pub fn raw_bytes(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(&self.value)
            .map_err(|e| TwinklyError::protocol(format!("token is not valid base64: {}", e)))
    }
}

// Keep the secret out of debug logs.
impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
