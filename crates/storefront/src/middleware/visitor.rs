//! Visitor extractor.
//!
//! Resolves the cookie session to the visitor's [`StorefrontSession`],
//! assigning a fresh visitor id on the first request.

use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;
use tracing::Span;
use uuid::Uuid;

use crate::error::AppError;
use crate::session::StorefrontSession;
use crate::state::AppState;

/// Session key holding the visitor id.
pub const VISITOR_ID_KEY: &str = "visitor_id";

/// The calling visitor's storefront session.
///
/// # Example
///
/// ```rust,ignore
/// async fn cart_count(Visitor(session): Visitor) -> Json<u32> {
///     Json(session.cart().cart_count())
/// }
/// ```
pub struct Visitor(pub Arc<StorefrontSession>);

impl FromRequestParts<AppState> for Visitor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Set by SessionManagerLayer
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session layer not installed".to_string()))?;

        let visitor = visitor_id(&session).await?;
        Span::current().record("visitor_id", tracing::field::display(visitor));

        Ok(Self(state.sessions().get_or_create(visitor).await))
    }
}

async fn visitor_id(session: &Session) -> Result<Uuid, AppError> {
    let existing = session
        .get::<Uuid>(VISITOR_ID_KEY)
        .await
        .map_err(|e| AppError::Internal(format!("session read failed: {e}")))?;
    if let Some(id) = existing {
        return Ok(id);
    }

    let id = Uuid::new_v4();
    session
        .insert(VISITOR_ID_KEY, id)
        .await
        .map_err(|e| AppError::Internal(format!("session write failed: {e}")))?;
    Ok(id)
}
