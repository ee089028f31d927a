use axum::extract::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::env;
use std::fmt::{self, Debug, Display};

pub const ENV_VAR_ERROR: i32 = 1;
pub const DATABASE_ERROR: i32 = 2;
pub const REQWEST_ERROR: i32 = 3;
pub const UPSTREAM_ERROR: i32 = 4;
pub const UNEXPECTED_ERROR: i32 = 5;
pub const AUTHORIZOR_ERROR: i32 = 6;

pub const VALIDATION_ERROR: i32 = 101;
pub const INVALID_STATUS_ERROR: i32 = 102;
pub const NOT_FOUND_ERROR: i32 = 103;
pub const UNAUTHORIZED_ERROR: i32 = 104;

#[derive(Debug)]
pub struct Error {
    pub code: i32,
    pub message: String,
}

impl Error {
    pub fn is_validation_error(&self) -> bool {
        self.code == VALIDATION_ERROR
    }

    pub fn is_invalid_status_error(&self) -> bool {
        self.code == INVALID_STATUS_ERROR
    }

    pub fn is_not_found_error(&self) -> bool {
        self.code == NOT_FOUND_ERROR
    }

    pub fn is_unauthorized_error(&self) -> bool {
        self.code == UNAUTHORIZED_ERROR
    }

    /// Storage failures; the transaction they happened in was not committed.
    pub fn is_storage_error(&self) -> bool {
        self.code == DATABASE_ERROR
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

impl std::error::Error for Error {}

impl From<env::VarError> for Error {
    fn from(err: env::VarError) -> Self {
        env_var_error(err)
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        database_error(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        reqwest_error(err)
    }
}

impl From<oso::OsoError> for Error {
    fn from(err: oso::OsoError) -> Self {
        tracing::error!("authorizor error: {}", err);

        Error {
            code: AUTHORIZOR_ERROR,
            message: "authorizor error".into(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_message) = match self.code {
            1..=99 => (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"),
            NOT_FOUND_ERROR => (StatusCode::NOT_FOUND, self.message.as_str()),
            UNAUTHORIZED_ERROR => (StatusCode::FORBIDDEN, self.message.as_str()),
            _ => (StatusCode::BAD_REQUEST, self.message.as_str()),
        };

        let body = Json(json!({
            "code": self.code,
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

pub fn validation_error(message: impl Into<String>) -> Error {
    Error {
        code: VALIDATION_ERROR,
        message: message.into(),
    }
}

pub fn invalid_status_error(status: &str) -> Error {
    Error {
        code: INVALID_STATUS_ERROR,
        message: format!("invalid status: {}", status),
    }
}

pub fn invalid_transition_error(from: &str, to: &str) -> Error {
    Error {
        code: INVALID_STATUS_ERROR,
        message: format!("status cannot change from {} to {}", from, to),
    }
}

pub fn not_found_error(what: &str) -> Error {
    Error {
        code: NOT_FOUND_ERROR,
        message: format!("{} not found", what),
    }
}

pub fn unauthorized_error() -> Error {
    Error {
        code: UNAUTHORIZED_ERROR,
        message: "unauthorized".into(),
    }
}

pub fn env_var_error(err: env::VarError) -> Error {
    Error {
        code: ENV_VAR_ERROR,
        message: format!("environment variable error: {}", err),
    }
}

pub fn database_error<T: Debug>(err: T) -> Error {
    tracing::error!("database error: {:?}", err);

    Error {
        code: DATABASE_ERROR,
        message: "database error".into(),
    }
}

pub fn reqwest_error(err: reqwest::Error) -> Error {
    tracing::warn!("reqwest error: {}", err);

    Error {
        code: REQWEST_ERROR,
        message: "reqwest error".into(),
    }
}

pub fn upstream_error() -> Error {
    Error {
        code: UPSTREAM_ERROR,
        message: "upstream error".into(),
    }
}

pub fn unexpected_error() -> Error {
    Error {
        code: UNEXPECTED_ERROR,
        message: "unexpected error".into(),
    }
}

#[test]
fn error_kinds_test() {
    assert!(validation_error("bad").is_validation_error());
    assert!(invalid_status_error("bogus").is_invalid_status_error());
    assert!(invalid_transition_error("completed", "pending").is_invalid_status_error());
    assert!(not_found_error("booking").is_not_found_error());
    assert!(unauthorized_error().is_unauthorized_error());
    assert!(database_error("boom").is_storage_error());
    assert_eq!(invalid_status_error("bogus").message, "invalid status: bogus");
}

#[test]
fn error_response_status_test() {
    let response = not_found_error("booking").into_response();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = invalid_status_error("bogus").into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = unauthorized_error().into_response();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = database_error("boom").into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
