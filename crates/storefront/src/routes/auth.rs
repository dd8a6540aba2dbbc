//! Auth route handlers.
//!
//! Email/password registration and login against the Medusa auth API.
//! Both are guest-only: a logged-in visitor gets 409 pointing at `/account`.

use axum::{Json, http::StatusCode};
use secrecy::SecretString;
use serde::Deserialize;
use tracing::instrument;

use ilyo_core::Email;

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::medusa::Customer;
use crate::middleware::Visitor;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

fn parse_email(raw: &str) -> Result<Email> {
    Email::parse(raw).map_err(|e| AppError::BadRequest(e.to_string()))
}

fn parse_password(raw: String) -> Result<SecretString> {
    if raw.is_empty() {
        return Err(AppError::BadRequest("password is required".to_string()));
    }
    Ok(SecretString::from(raw))
}

/// Create an account and log it in.
#[instrument(skip_all)]
pub async fn register(
    Visitor(session): Visitor,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Customer>)> {
    let auth = session.auth();
    auth.guest_only().await.map_err(AppError::guest_only)?;

    let email = parse_email(&req.email)?;
    let password = parse_password(req.password)?;

    let customer = auth
        .register(&email, &password, &req.first_name, &req.last_name)
        .await?;
    set_sentry_user(&customer.id, Some(&customer.email));

    Ok((StatusCode::CREATED, Json(customer)))
}

/// Log in with email and password.
#[instrument(skip_all)]
pub async fn login(
    Visitor(session): Visitor,
    Json(req): Json<LoginRequest>,
) -> Result<Json<Customer>> {
    let auth = session.auth();
    auth.guest_only().await.map_err(AppError::guest_only)?;

    let email = parse_email(&req.email)?;
    let password = parse_password(req.password)?;

    let customer = auth.login(&email, &password).await?;
    set_sentry_user(&customer.id, Some(&customer.email));

    Ok(Json(customer))
}

/// Log out and forget the cart.
#[instrument(skip_all)]
pub async fn logout(Visitor(session): Visitor) -> StatusCode {
    session.logout().await;
    clear_sentry_user();
    StatusCode::NO_CONTENT
}
