use reqwest::StatusCode;
use thiserror::Error;

/// Errors raised while talking to a Twinkly device.
///
/// Transport failures (`Transport`, `Io`, `Timeout`) are never retried by the
/// session. `Unauthorized` only surfaces after the single automatic re-login has
/// already been spent.
#[derive(Error, Debug)]
pub enum TwinklyError {
    /// The HTTP exchange failed below the status-code level.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Socket or file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A request or datagram did not complete within the configured timeout.
    #[error("timed out: {0}")]
    Timeout(String),

    /// The login or verify exchange was rejected or returned garbage.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The device kept rejecting the token after a fresh login.
    #[error("unauthorized request to {endpoint}")]
    Unauthorized { endpoint: String },

    /// Any other non-2xx answer.
    #[error("HTTP {status} from {endpoint}: {body}")]
    Http {
        endpoint: String,
        status: StatusCode,
        body: String,
    },

    /// Well-formed answer without the OK sentinel or a required key, or a frame
    /// that does not fit the device.
    #[error("{0}")]
    Validation(String),

    /// Input the protocol cannot express: unknown mode, colour arity, driver name.
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl TwinklyError {
    pub fn validation(msg: impl Into<String>) -> Self {
        TwinklyError::Validation(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        TwinklyError::Protocol(msg.into())
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        TwinklyError::Auth(msg.into())
    }

    /// True for every failure that happened on the wire rather than in the payload.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            TwinklyError::Transport(_) | TwinklyError::Io(_) | TwinklyError::Timeout(_)
        )
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            TwinklyError::Timeout(_) => true,
            TwinklyError::Transport(e) => e.is_timeout(),
            _ => false,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, TwinklyError::Unauthorized { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, TwinklyError::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, TwinklyError>;
