use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;

use crate::{
    db::models::{Course, Enrollment, EnrollmentStatus},
    error::Result,
    middleware::auth::AuthUser,
    routes::{parse_optional_id, Outcome},
    services::{
        catalog::{self, CourseDetail, CourseFilter},
        enrollment,
    },
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/courses", get(list_courses))
        .route("/courses/:id", get(view_course))
        .route("/courses/:id/enroll", post(enroll))
}

#[derive(Debug, Deserialize)]
pub struct CourseQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EnrollForm {
    pub batch_id: Option<String>,
}

async fn home(State(state): State<AppState>) -> Result<Json<Vec<Course>>> {
    let filter = CourseFilter {
        status: Some(EnrollmentStatus::Open),
        ..Default::default()
    };
    let courses = catalog::list_courses(&state.db.pool, &filter).await?;
    Ok(Json(courses))
}

async fn list_courses(
    State(state): State<AppState>,
    Query(query): Query<CourseQuery>,
) -> Result<Json<Vec<Course>>> {
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(raw.parse::<EnrollmentStatus>()?),
    };

    let filter = CourseFilter {
        status,
        search: query.search,
        category: query.category,
    };
    let courses = catalog::list_courses(&state.db.pool, &filter).await?;
    Ok(Json(courses))
}

async fn view_course(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CourseDetail>> {
    let detail = catalog::course_detail(&state.db.pool, id).await?;
    Ok(Json(detail))
}

async fn enroll(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(course_id): Path<i64>,
    Form(form): Form<EnrollForm>,
) -> Result<Json<Outcome<Enrollment>>> {
    let course_page = format!("/courses/{course_id}");

    let batch_id = parse_optional_id(form.batch_id.as_deref(), "batch")
        .map_err(|e| e.redirect_to(course_page.as_str()))?;

    let enrollment = enrollment::enroll(&state.db.pool, &user, course_id, batch_id)
        .await
        .map_err(|e| e.redirect_to(course_page.as_str()))?;

    Ok(Json(Outcome::new(
        "Enrolled successfully",
        "/dashboard",
        enrollment,
    )))
}
