use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    db::models::User,
    error::{AppError, Result},
    services::credentials,
    AppState,
};

pub const SESSION_COOKIE: &str = "lms_session";

/// Identity resolved from the session cookie, if any.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

/// Resolves the session cookie and attaches the user to the request. Anonymous
/// requests pass through untouched.
pub async fn session_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        let token = cookie.value();
        if let Some(user_id) = state.sessions.resolve(token).await {
            match credentials::find_by_id(&state.db.pool, user_id).await? {
                Some(user) => {
                    request.extensions_mut().insert(CurrentUser(user));
                }
                None => {
                    state.sessions.revoke(token).await;
                }
            }
        }
    }

    Ok(next.run(request).await)
}

/// Rejects requests that reach a session-only area without a session.
pub async fn require_session(request: Request, next: Next) -> Result<Response> {
    require_authenticated(request.extensions().get::<CurrentUser>())?;
    Ok(next.run(request).await)
}

pub fn require_authenticated(current: Option<&CurrentUser>) -> Result<User> {
    current
        .map(|CurrentUser(user)| user.clone())
        .ok_or(AppError::Unauthenticated)
}

pub fn require_admin(current: Option<&CurrentUser>) -> Result<User> {
    let user = require_authenticated(current)?;
    if !user.is_admin {
        tracing::warn!(user_id = user.id, "Non-admin user tried to reach an admin page");
        return Err(AppError::Forbidden);
    }
    Ok(user)
}

// Extractors for handlers that need a logged-in user or an admin
#[derive(Clone, Debug)]
pub struct AuthUser(pub User);

#[derive(Clone, Debug)]
pub struct AdminUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        require_authenticated(parts.extensions.get::<CurrentUser>()).map(AuthUser)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        require_admin(parts.extensions.get::<CurrentUser>()).map(AdminUser)
    }
}
