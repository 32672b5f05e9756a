//! API handlers for the school library REST endpoints

pub mod auth;
pub mod books;
pub mod classes;
pub mod folders;
pub mod health;
pub mod history;
pub mod imports;
pub mod loans;
pub mod openapi;
pub mod students;
pub mod teachers;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::{error::AppError, models::SessionClaims, AppState};

/// Extractor for the session behind a `Bearer` token
pub struct AuthenticatedUser(pub SessionClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::Authentication("Missing or invalid authorization header".to_string()))?;

        let claims = state.services.auth.authenticate(bearer.token())?;
        Ok(AuthenticatedUser(claims))
    }
}
