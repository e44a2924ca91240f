//! Authentication middleware
//!
//! Protects routes that require authentication.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, HeaderMap},
};

use crate::data::Account;
use crate::error::AppError;
use crate::AppState;

fn extract_token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(ToOwned::to_owned)
}

async fn authenticate_token(token: &str, state: &AppState) -> Result<Account, AppError> {
    state
        .db
        .get_account_by_token(token)
        .await?
        .ok_or(AppError::Unauthorized)
}

/// Extractor for the current authenticated account
///
/// # Usage
/// ```ignore
/// async fn handler(
///     CurrentUser(account): CurrentUser,
/// ) -> impl IntoResponse {
///     format!("Hello, {}", account.username)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Account);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    /// Extract the current account from the bearer token.
    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(account) = parts.extensions.get::<Account>().cloned() {
            return Ok(CurrentUser(account));
        }

        let state = AppState::from_ref(state);
        let token = extract_token_from_headers(&parts.headers).ok_or(AppError::Unauthorized)?;
        let account = authenticate_token(&token, &state).await?;
        parts.extensions.insert(account.clone());

        Ok(CurrentUser(account))
    }
}
