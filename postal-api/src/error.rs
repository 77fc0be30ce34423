/// Error handling for the API server
///
/// Handlers return `Result<T, ApiError>`; every error renders as a JSON
/// [`ErrorResponse`] with a matching status code. Session failures also carry
/// the page the client should go to, both in the body and as a `Location`
/// header.
///
/// # Example
///
/// ```
/// use postal_api::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::json;
///
/// async fn handler(weight: f64) -> ApiResult<Json<serde_json::Value>> {
///     if weight <= 0.0 {
///         return Err(ApiError::BadRequest("Please enter a valid weight".to_string()));
///     }
///     Ok(Json(json!({ "weight": weight })))
/// }
/// ```

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use postal_shared::auth::account::AccountError;
use postal_shared::auth::jwt::JwtError;
use postal_shared::auth::password::PasswordError;
use postal_shared::auth::SessionError;
use postal_shared::dashboard::DashboardError;
use postal_shared::events::FeedError;
use postal_shared::store::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    /// 400
    BadRequest(String),

    /// 401
    Unauthorized(String),

    /// 401 or 403 with a page to go to
    Redirect {
        status: StatusCode,
        message: String,
        location: &'static str,
    },

    /// 404
    NotFound(String),

    /// 409, e.g. duplicate email
    Conflict(String),

    /// 422
    ValidationError(Vec<ValidationErrorDetail>),

    /// 500
    InternalError(String),

    /// 503
    ServiceUnavailable(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g. "bad_request", "unauthorized")
    pub error: String,

    /// Human-readable message
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,

    /// Page the client should navigate to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Redirect {
                message, location, ..
            } => write!(f, "Redirect to {}: {}", location, message),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

fn redirect_response(status: StatusCode, message: String, location: &'static str) -> Response {
    let code = if status == StatusCode::FORBIDDEN {
        "forbidden"
    } else {
        "unauthorized"
    };
    let body = Json(ErrorResponse {
        error: code.to_string(),
        message,
        details: None,
        redirect: Some(location.to_string()),
    });

    let mut response = (status, body).into_response();
    response
        .headers_mut()
        .insert(header::LOCATION, HeaderValue::from_static(location));
    response
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::ValidationError(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            ApiError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                msg,
                None,
            ),
            ApiError::Redirect {
                status,
                message,
                location,
            } => return redirect_response(status, message, location),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
            redirect: None,
        });

        (status, body).into_response()
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        let errors = err
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                })
            })
            .collect();
        ApiError::ValidationError(errors)
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => {
                if let Some(constraint) = db_err.constraint() {
                    if constraint.contains("email") {
                        return ApiError::Conflict("Email already exists".to_string());
                    }
                    return ApiError::BadRequest(format!("Constraint violation: {}", constraint));
                }
                ApiError::InternalError(format!("Database error: {}", db_err))
            }
            _ => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            StoreError::EmptyChangeset { .. } => ApiError::BadRequest(err.to_string()),
            StoreError::Database { source, .. } => {
                if matches!(source, sqlx::Error::Database(_)) {
                    ApiError::from(source)
                } else {
                    ApiError::InternalError(format!("Database error: {}", source))
                }
            }
            StoreError::Ambiguous { .. } => ApiError::InternalError(err.to_string()),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NoSession => ApiError::Redirect {
                status: StatusCode::UNAUTHORIZED,
                message: err.to_string(),
                location: "/",
            },
            SessionError::NotAdmin => ApiError::Redirect {
                status: StatusCode::FORBIDDEN,
                message: err.to_string(),
                location: "/user",
            },
            SessionError::UnknownUser(_) => ApiError::NotFound(err.to_string()),
            SessionError::Storage(e) => ApiError::from(e),
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::InvalidCredentials => ApiError::Unauthorized(err.to_string()),
            AccountError::EmailTaken => ApiError::Conflict(err.to_string()),
            AccountError::UnknownUser => ApiError::NotFound(err.to_string()),
            AccountError::PasswordMismatch | AccountError::IncorrectPassword => {
                ApiError::BadRequest(err.to_string())
            }
            AccountError::WeakPassword(weak) => ApiError::ValidationError(vec![ValidationErrorDetail {
                field: "password".to_string(),
                message: weak.to_string(),
            }]),
            AccountError::Password(e) => ApiError::from(e),
            AccountError::Storage(e) => ApiError::from(e),
            AccountError::Database(e) => ApiError::from(e),
        }
    }
}

impl From<DashboardError> for ApiError {
    fn from(err: DashboardError) -> Self {
        match err {
            DashboardError::Session(e) => ApiError::from(e),
            DashboardError::Storage(e) => ApiError::from(e),
            DashboardError::Account(e) => ApiError::from(e),
            DashboardError::Validation(msg) => ApiError::BadRequest(msg),
            DashboardError::TrackingNotFound => ApiError::NotFound(err.to_string()),
            DashboardError::NoPendingCancel => ApiError::BadRequest(err.to_string()),
            DashboardError::NotLoaded => ApiError::InternalError(err.to_string()),
        }
    }
}

impl From<FeedError> for ApiError {
    fn from(err: FeedError) -> Self {
        ApiError::ServiceUnavailable(err.to_string())
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            JwtError::InvalidIssuer => ApiError::Unauthorized("Invalid token issuer".to_string()),
            _ => ApiError::Unauthorized(format!("Invalid token: {}", err)),
        }
    }
}
