//! Token-authenticated request pipeline.
//!
//! A [`Session`] owns the bearer token of one device handle. Every request goes
//! through [`Session::request`], which logs in when no valid token is cached and
//! retries exactly once after a fresh login when the device answers `401`.

use bytes::Bytes;
use log::debug;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, StatusCode};
use serde_json::{json, Value};
use tokio::sync::{Mutex, RwLock};

use crate::util::auth::{Auth, AuthToken, LoginResponse};
use crate::util::config::{ApiVersion, DeviceConfig};
use crate::util::error::{Result, TwinklyError};

/// How often a request is resent after an unauthorized answer.
pub const MAX_AUTH_RETRIES: usize = 1;
pub const AUTH_HEADER: &str = "X-Auth-Token";

#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Json(Value),
    /// Raw upload, sent as `application/octet-stream`.
    Octets(Bytes),
}

/// Observable token state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    NoToken,
    Valid,
    Expired,
}

pub struct Session {
    client: Client,
    base_url: String,
    token: RwLock<Option<AuthToken>>,
    // Held for the whole login+verify exchange so only one refresh runs at a time.
    refresh_lock: Mutex<()>,
}

impl Session {
    pub fn new(config: &DeviceConfig, api_version: ApiVersion) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Session::with_client(client, config.base_url(api_version)))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Session {
            client,
            base_url: base_url.into(),
            token: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    pub async fn state(&self) -> TokenState {
        match self.token.read().await.as_ref() {
            None => TokenState::NoToken,
            Some(token) if token.is_valid() => TokenState::Valid,
            Some(_) => TokenState::Expired,
        }
    }

    /// The cached token, if it has not expired yet.
    pub async fn cached_token(&self) -> Option<AuthToken> {
        self.token
            .read()
            .await
            .as_ref()
            .filter(|token| token.is_valid())
            .cloned()
    }

    /// Returns a valid token, logging in first when none is cached.
    ///
    /// Concurrent callers that find the cache empty queue up on the refresh lock
    /// and reuse the token obtained by whoever got there first.
    pub async fn ensure_token(&self) -> Result<AuthToken> {
        if let Some(token) = self.cached_token().await {
            debug!("Authentication token still valid");
            return Ok(token);
        }

        let _guard = self.refresh_lock.lock().await;
        if let Some(token) = self.cached_token().await {
            return Ok(token);
        }
        debug!("Authentication token expired, will refresh");
        self.login_and_store().await
    }

    /// Replaces `stale` with a fresh token.
    ///
    /// If another caller already swapped `stale` for a valid token while we were
    /// waiting for the lock, that token is returned without logging in again.
    pub async fn refresh_token(&self, stale: &AuthToken) -> Result<AuthToken> {
        let _guard = self.refresh_lock.lock().await;
        {
            let mut current = self.token.write().await;
            if let Some(token) = current
                .as_ref()
                .filter(|token| *token != stale && token.is_valid())
            {
                return Ok(token.clone());
            }
            *current = None;
        }
        self.login_and_store().await
    }

    async fn login_and_store(&self) -> Result<AuthToken> {
        let token = self.login().await?;
        self.verify(&token).await?;
        if !token.is_valid() {
            return Err(TwinklyError::auth("device issued an already expired token"));
        }
        *self.token.write().await = Some(token.clone());
        debug!("Authentication token refreshed");
        Ok(token)
    }

    async fn login(&self) -> Result<AuthToken> {
        let response = self
            .client
            .post(self.url("login"))
            .json(&Auth::login_request())
            .send()
            .await
            .map_err(|e| transport_error("login", e))?;

        let status = response.status();
        let content = response
            .text()
            .await
            .map_err(|e| transport_error("login", e))?;
        if !status.is_success() {
            return Err(TwinklyError::auth(format!(
                "login failed with status {}: {}",
                status, content
            )));
        }

        let login: LoginResponse = serde_json::from_str(&content)
            .map_err(|e| TwinklyError::auth(format!("malformed login response: {}", e)))?;
        Ok(AuthToken::from_login(login))
    }

    async fn verify(&self, token: &AuthToken) -> Result<()> {
        let response = self
            .client
            .post(self.url("verify"))
            .header(AUTH_HEADER, token.value())
            .json(&json!({}))
            .send()
            .await
            .map_err(|e| transport_error("verify", e))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(TwinklyError::auth(format!(
                "verification failed with status: {}",
                status
            )))
        }
    }

    /// Drops the token on the device and locally.
    pub async fn logout(&self) -> Result<Value> {
        let result = self
            .request(Method::POST, "logout", RequestBody::Json(json!({})))
            .await;
        *self.token.write().await = None;
        result
    }

    /// Sends one authenticated request, with a single re-login on `401`.
    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: RequestBody,
    ) -> Result<Value> {
        let mut token = self.ensure_token().await?;
        let mut retries = 0;
        loop {
            match self.send_once(method.clone(), endpoint, &body, &token).await {
                Err(TwinklyError::Unauthorized { .. }) if retries < MAX_AUTH_RETRIES => {
                    retries += 1;
                    debug!(
                        "Invalid token for request. Refreshing token and attempting retry {} of {}.",
                        retries, MAX_AUTH_RETRIES
                    );
                    token = self.refresh_token(&token).await?;
                }
                Err(err @ TwinklyError::Unauthorized { .. }) => {
                    debug!(
                        "Invalid token for request. Maximum retries of {} exceeded.",
                        MAX_AUTH_RETRIES
                    );
                    return Err(err);
                }
                outcome => return outcome,
            }
        }
    }

    pub async fn get(&self, endpoint: &str) -> Result<Value> {
        self.request(Method::GET, endpoint, RequestBody::Empty).await
    }

    pub async fn post(&self, endpoint: &str, payload: Value) -> Result<Value> {
        self.request(Method::POST, endpoint, RequestBody::Json(payload))
            .await
    }

    pub async fn post_octets(&self, endpoint: &str, data: impl Into<Bytes>) -> Result<Value> {
        self.request(Method::POST, endpoint, RequestBody::Octets(data.into()))
            .await
    }

    async fn send_once(
        &self,
        method: Method,
        endpoint: &str,
        body: &RequestBody,
        token: &AuthToken,
    ) -> Result<Value> {
        debug!("{} endpoint {}", method, endpoint);
        let request = self
            .client
            .request(method.clone(), self.url(endpoint))
            .header(AUTH_HEADER, token.value());
        let request = match body {
            RequestBody::Empty => request,
            RequestBody::Json(payload) => {
                debug!("{} payload {}", method, payload);
                request.json(payload)
            }
            RequestBody::Octets(data) => request
                .header(CONTENT_TYPE, "application/octet-stream")
                .body(data.clone()),
        };

        let response = request
            .send()
            .await
            .map_err(|e| transport_error(endpoint, e))?;
        let status = response.status();
        debug!("{} response {}", method, status);
        let content = response
            .text()
            .await
            .map_err(|e| transport_error(endpoint, e))?;

        match status {
            StatusCode::UNAUTHORIZED => Err(TwinklyError::Unauthorized {
                endpoint: endpoint.to_string(),
            }),
            status if status.is_success() => {
                if content.trim().is_empty() {
                    Ok(Value::Null)
                } else {
                    Ok(serde_json::from_str(&content)?)
                }
            }
            status => Err(TwinklyError::Http {
                endpoint: endpoint.to_string(),
                status,
                body: content,
            }),
        }
    }
}

fn transport_error(endpoint: &str, err: reqwest::Error) -> TwinklyError {
    if err.is_timeout() {
        TwinklyError::Timeout(format!("request to {}", endpoint))
    } else {
        TwinklyError::Transport(err)
    }
}
