//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::medusa::MedusaError;
use crate::session::{AuthRedirect, StoreError};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// A session store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Visitor must log in first.
    #[error("Unauthorized")]
    Unauthorized { redirect: Option<String> },

    /// Visitor is already logged in.
    #[error("Already authenticated")]
    AlreadyAuthenticated { redirect: String },

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<MedusaError> for AppError {
    fn from(err: MedusaError) -> Self {
        Self::Store(StoreError::Remote(err))
    }
}

impl AppError {
    /// Deny a guarded route, pointing the client at `redirect`.
    #[must_use]
    pub fn login_required(redirect: AuthRedirect) -> Self {
        Self::Unauthorized {
            redirect: Some(redirect.location),
        }
    }

    /// Deny a guest-only route, pointing the client at `redirect`.
    #[must_use]
    pub fn guest_only(redirect: AuthRedirect) -> Self {
        Self::AlreadyAuthenticated {
            redirect: redirect.location,
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Store(err) => match err {
                StoreError::Remote(remote) => remote_status(remote),
                StoreError::StaleReference(_) => StatusCode::NOT_FOUND,
                StoreError::MissingPrecondition(_) => StatusCode::CONFLICT,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::AlreadyAuthenticated { .. } => StatusCode::CONFLICT,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error code for the response body.
    const fn code(&self) -> &'static str {
        match self {
            Self::Store(StoreError::Remote(MedusaError::NotFound(_)))
            | Self::Store(StoreError::StaleReference(_))
            | Self::NotFound(_) => "not_found",
            Self::Store(StoreError::Remote(MedusaError::Unauthorized(_)))
            | Self::Unauthorized { .. } => "unauthorized",
            Self::Store(StoreError::Remote(MedusaError::RateLimited(_))) => "rate_limited",
            Self::Store(StoreError::Remote(MedusaError::CartNotCompleted(_))) => {
                "checkout_incomplete"
            }
            Self::Store(StoreError::Remote(MedusaError::Api {
                status: 400..=499, ..
            })) => "rejected",
            Self::Store(StoreError::Remote(_)) => "upstream_error",
            Self::Store(StoreError::MissingPrecondition(_)) => "missing_precondition",
            Self::AlreadyAuthenticated { .. } => "already_authenticated",
            Self::BadRequest(_) => "bad_request",
            Self::Internal(_) => "internal",
        }
    }

    /// Client-facing message. Internal details are never echoed.
    fn public_message(&self) -> String {
        match self {
            Self::Store(StoreError::Remote(remote)) => match remote {
                MedusaError::NotFound(_) => "Not found".to_string(),
                MedusaError::Unauthorized(_) => "Invalid credentials".to_string(),
                MedusaError::RateLimited(secs) => {
                    format!("Too many requests, retry after {secs} seconds")
                }
                MedusaError::CartNotCompleted(message) => message.clone(),
                MedusaError::Api {
                    status: 400..=499,
                    message,
                    ..
                } => message.clone(),
                _ => "External service error".to_string(),
            },
            Self::Store(StoreError::StaleReference(_)) => "Cart not found".to_string(),
            Self::Store(StoreError::MissingPrecondition(what)) => capitalize(what),
            Self::Unauthorized { .. } => "Login required".to_string(),
            Self::AlreadyAuthenticated { .. } => "Already logged in".to_string(),
            Self::Internal(_) => "Internal server error".to_string(),
            Self::NotFound(_) | Self::BadRequest(_) => self.to_string(),
        }
    }

    fn redirect(&self) -> Option<&str> {
        match self {
            Self::Unauthorized {
                redirect: Some(location),
            } => Some(location.as_str()),
            Self::AlreadyAuthenticated { redirect } => Some(redirect.as_str()),
            _ => None,
        }
    }
}

/// Status for a remote failure: client-side conditions pass through,
/// everything else is a bad gateway.
const fn remote_status(err: &MedusaError) -> StatusCode {
    match err {
        MedusaError::NotFound(_) => StatusCode::NOT_FOUND,
        MedusaError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        MedusaError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        MedusaError::CartNotCompleted(_) => StatusCode::CONFLICT,
        MedusaError::Api {
            status: 400..=499, ..
        } => StatusCode::BAD_REQUEST,
        _ => StatusCode::BAD_GATEWAY,
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = json!({
            "error": {
                "code": self.code(),
                "message": self.public_message(),
                "redirect": self.redirect(),
            }
        });

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a customer ID.
///
/// Call this after successful authentication to associate errors with customers.
pub fn set_sentry_user(customer_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(customer_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the customer.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for shopper actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added item", Some(&[("variant_id", "variant_123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    async fn body_json(err: AppError) -> serde_json::Value {
        let bytes = err
            .into_response()
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized { redirect: None }),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_store_error_status_codes() {
        assert_eq!(
            get_status(StoreError::MissingPrecondition("no active cart").into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(StoreError::StaleReference("cart_1".to_string()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(MedusaError::NotFound("cart_1".to_string()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(MedusaError::Unauthorized("bad token".to_string()).into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(MedusaError::RateLimited(3).into()),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            get_status(
                MedusaError::Api {
                    status: 500,
                    kind: None,
                    message: "boom".to_string(),
                }
                .into()
            ),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(
                MedusaError::Api {
                    status: 400,
                    kind: Some("invalid_data".to_string()),
                    message: "Variant is out of stock".to_string(),
                }
                .into()
            ),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_upstream_details_are_not_echoed() {
        let body = body_json(
            MedusaError::Api {
                status: 503,
                kind: None,
                message: "db connection refused at 10.0.0.3".to_string(),
            }
            .into(),
        )
        .await;

        assert_eq!(body["error"]["code"], "upstream_error");
        assert_eq!(body["error"]["message"], "External service error");
    }

    #[tokio::test]
    async fn test_login_required_carries_redirect() {
        let body = body_json(AppError::login_required(AuthRedirect::to_login(
            "/account/orders",
        )))
        .await;

        assert_eq!(body["error"]["code"], "unauthorized");
        assert_eq!(
            body["error"]["redirect"],
            "/login?redirect=%2Faccount%2Forders"
        );
    }

    #[tokio::test]
    async fn test_missing_precondition_message() {
        let body = body_json(StoreError::MissingPrecondition("no active cart").into()).await;

        assert_eq!(body["error"]["code"], "missing_precondition");
        assert_eq!(body["error"]["message"], "No active cart");
        assert!(body["error"]["redirect"].is_null());
    }
}
