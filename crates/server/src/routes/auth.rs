use axum::{extract::State, routing::post, Form, Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;

use crate::{
    db::models::User,
    error::Result,
    middleware::auth::{AuthUser, SESSION_COOKIE},
    routes::Outcome,
    services::credentials,
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/admin/login", post(admin_login))
        .route("/logout", post(logout))
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

async fn start_session(state: &AppState, jar: CookieJar, user: &User) -> CookieJar {
    let token = state.sessions.create(user.id).await;
    tracing::info!(user_id = user.id, admin = user.is_admin, "User logged in");
    jar.add(session_cookie(token))
}

async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Result<Json<Outcome<User>>> {
    let user = credentials::register(&state.db.pool, &form.username, &form.email, &form.password)
        .await
        .map_err(|e| e.redirect_to("/register"))?;

    Ok(Json(Outcome::new("Registration successful", "/login", user)))
}

async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<(CookieJar, Json<Outcome<User>>)> {
    let user = credentials::verify(&state.db.pool, &form.username, &form.password).await?;
    let jar = start_session(&state, jar, &user).await;

    Ok((jar, Json(Outcome::new("Logged in", "/dashboard", user))))
}

async fn admin_login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<(CookieJar, Json<Outcome<User>>)> {
    let user = credentials::verify_admin(&state.db.pool, &form.username, &form.password)
        .await
        .map_err(|e| e.redirect_to("/admin/login"))?;
    let jar = start_session(&state, jar, &user).await;

    Ok((jar, Json(Outcome::new("Logged in", "/admin/dashboard", user))))
}

async fn logout(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    jar: CookieJar,
) -> (CookieJar, Json<Outcome<()>>) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.revoke(cookie.value()).await;
    }
    tracing::info!(user_id = user.id, "User logged out");

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/").build());
    (jar, Json(Outcome::notice("Logged out", "/login")))
}
