use log::debug;
use serde_json::Value;

use crate::util::config::ApiVersion;
use crate::util::error::{Result, TwinklyError};

/// Name of the status field embedded in every JSON answer.
pub const RETURN_CODE_KEY: &str = "code";

/// The response code for a command.
///
/// The HTTP Status in a response may
/// only tell if a command could be error free received, but not if it was in any way valid
/// and could be processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResponseCode {
    pub code: u32,
    pub message: &'static str,
}

impl ResponseCode {
    /// This is a code that means "Ok".
    ///
    /// Use this function instead of comparing the code to "1000".
    pub fn is_ok(&self) -> bool {
        self.code == OK.code
    }

    pub fn is_error(&self) -> bool {
        !self.is_ok()
    }

    pub fn from_code(code: u32) -> ResponseCode {
        match code {
            1000 => OK,
            1001 => ERROR,
            1101 => ERROR_INVALID_ARGUMENT,
            1102 => ERROR2,
            1103 => ERROR_VALUE_WRONG_MISSING_KEY,
            1104 => ERROR_MALFORMED_JSON_INPUT,
            1105 => ERROR_INVALID_ARGUMENT_KEY,
            1107 => OK2,
            1108 => OK3,
            1205 => FIRMWARE_UPGRADE_ERROR,
            _ => ERROR,
        }
    }
}

// Errors codes from https://xled-docs.readthedocs.io/en/latest/rest_api.html#http-responses.

/// The OK sentinel.
pub const OK: ResponseCode = ResponseCode {
    code: 1000,
    message: "Ok",
};
pub const ERROR: ResponseCode = ResponseCode {
    code: 1001,
    message: "Error",
};
pub const ERROR_INVALID_ARGUMENT: ResponseCode = ResponseCode {
    code: 1101,
    message: "Invalid argument value",
};
pub const ERROR2: ResponseCode = ResponseCode {
    code: 1102,
    message: "Error",
};
pub const ERROR_VALUE_WRONG_MISSING_KEY: ResponseCode = ResponseCode {
    code: 1103,
    message: "Error - value too long? Or missing required object key?",
};
pub const ERROR_MALFORMED_JSON_INPUT: ResponseCode = ResponseCode {
    code: 1104,
    message: "Error - malformed JSON on input?",
};
pub const ERROR_INVALID_ARGUMENT_KEY: ResponseCode = ResponseCode {
    code: 1105,
    message: "Invalid argument key",
};
pub const OK2: ResponseCode = ResponseCode {
    code: 1107,
    message: "OK?",
};
pub const OK3: ResponseCode = ResponseCode {
    code: 1108,
    message: "OK?",
};
pub const FIRMWARE_UPGRADE_ERROR: ResponseCode = ResponseCode {
    code: 1205,
    message: "Error with firmware upgrade - SHA1SUM does not match",
};

/// Anything that carries a device status code.
pub trait ResponseCodeTrait {
    fn response_code(&self) -> Option<ResponseCode>;
}

impl ResponseCodeTrait for Value {
    fn response_code(&self) -> Option<ResponseCode> {
        self.get(RETURN_CODE_KEY)
            .and_then(Value::as_u64)
            .map(|code| ResponseCode::from_code(code as u32))
    }
}

/// Checks a device answer for the OK sentinel and, optionally, a required key.
///
/// API v2 nests the status object under `result`; the required key is always
/// looked up on the top level.
pub fn valid_response(
    response: Value,
    api_version: ApiVersion,
    check_for: Option<&str>,
) -> Result<Value> {
    let status = match api_version {
        ApiVersion::V1 => Some(&response),
        ApiVersion::V2 => response.get("result"),
    };
    let ok = status
        .and_then(|status| status.response_code())
        .is_some_and(|code| code.is_ok());
    let has_key = check_for.map_or(true, |key| response.get(key).is_some());

    if ok && has_key {
        debug!("Twinkly response: {}", response);
        Ok(response)
    } else {
        Err(TwinklyError::validation(format!(
            "Invalid response from Twinkly: {}",
            response
        )))
    }
}
