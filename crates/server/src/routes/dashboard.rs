use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::{
    db::models::{EnrollmentSummary, User},
    error::Result,
    middleware::auth::AuthUser,
    services::enrollment,
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/dashboard", get(dashboard))
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub user: User,
    pub enrollments: Vec<EnrollmentSummary>,
}

async fn dashboard(State(state): State<AppState>, AuthUser(user): AuthUser) -> Result<Response> {
    if user.is_admin {
        return Ok(Redirect::to("/admin/dashboard").into_response());
    }

    let enrollments = enrollment::dashboard(&state.db.pool, user.id).await?;
    Ok(Json(DashboardResponse { user, enrollments }).into_response())
}
