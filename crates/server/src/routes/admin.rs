use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::{get, post},
    Form, Json, Router,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    db::models::{Batch, Course, Resource, ResourceKind, User},
    error::{AppError, Result},
    middleware::auth::AdminUser,
    routes::Outcome,
    services::{
        catalog::{self, CourseFields, CourseFilter, NewBatch, NewResource},
        credentials,
    },
    AppState,
};

const DASHBOARD: &str = "/admin/dashboard";

/// Admin routes. Resource uploads accept bodies up to `max_upload_bytes`.
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/admin/dashboard", get(dashboard))
        .route("/admin/courses", post(create_course))
        .route("/admin/courses/:id/edit", post(edit_course))
        .route("/admin/courses/:id/delete", post(delete_course))
        .route("/admin/courses/:id/batches", post(create_batch))
        .route(
            "/admin/courses/:id/resources",
            post(add_resource).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/admin/batches/:id/delete", post(delete_batch))
}

#[derive(Debug, Serialize)]
pub struct AdminDashboardResponse {
    pub courses: Vec<Course>,
    pub users: Vec<User>,
}

#[derive(Debug, Deserialize)]
pub struct CourseForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub enrollment_status: String,
}

impl TryFrom<CourseForm> for CourseFields {
    type Error = AppError;

    fn try_from(form: CourseForm) -> Result<Self> {
        if form.enrollment_status.trim().is_empty() {
            return Err(AppError::Validation(
                "Enrollment status is required".to_string(),
            ));
        }

        Ok(CourseFields {
            enrollment_status: form.enrollment_status.parse()?,
            name: form.name,
            description: form.description,
            duration: form.duration,
            category: form.category,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct BatchForm {
    #[serde(default)]
    pub name: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Accepts RFC 3339, `datetime-local` (`2026-01-10T09:00`) and plain dates.
/// Blank means not set.
fn parse_date(raw: Option<&str>, field: &str) -> Result<Option<DateTime<Utc>>> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(Some(dt.and_utc()));
        }
    }
    if let Some(dt) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(Some(dt.and_utc()));
    }

    Err(AppError::Validation(format!("Invalid {field}: '{raw}'")))
}

async fn dashboard(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<AdminDashboardResponse>> {
    let courses = catalog::list_courses(&state.db.pool, &CourseFilter::default()).await?;
    let users = credentials::list_students(&state.db.pool).await?;

    Ok(Json(AdminDashboardResponse { courses, users }))
}

async fn create_course(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Form(form): Form<CourseForm>,
) -> Result<Json<Outcome<Course>>> {
    let fields = CourseFields::try_from(form).map_err(|e| e.redirect_to(DASHBOARD))?;
    let course = catalog::create_course(&state.db.pool, fields)
        .await
        .map_err(|e| e.redirect_to(DASHBOARD))?;

    Ok(Json(Outcome::new("Course created successfully", DASHBOARD, course)))
}

async fn edit_course(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<i64>,
    Form(form): Form<CourseForm>,
) -> Result<Json<Outcome<Course>>> {
    let fields = CourseFields::try_from(form).map_err(|e| e.redirect_to(DASHBOARD))?;
    let course = catalog::update_course(&state.db.pool, id, fields)
        .await
        .map_err(|e| e.redirect_to(DASHBOARD))?;

    Ok(Json(Outcome::new("Course updated successfully", DASHBOARD, course)))
}

async fn delete_course(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<i64>,
) -> Result<Json<Outcome<()>>> {
    catalog::delete_course(&state.db.pool, &state.storage, id)
        .await
        .map_err(|e| e.redirect_to(DASHBOARD))?;

    Ok(Json(Outcome::notice("Course deleted successfully", DASHBOARD)))
}

async fn create_batch(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(course_id): Path<i64>,
    Form(form): Form<BatchForm>,
) -> Result<Json<Outcome<Batch>>> {
    let start_date = parse_date(form.start_date.as_deref(), "start date")
        .map_err(|e| e.redirect_to(DASHBOARD))?;
    let end_date =
        parse_date(form.end_date.as_deref(), "end date").map_err(|e| e.redirect_to(DASHBOARD))?;

    let new_batch = NewBatch {
        name: form.name,
        start_date,
        end_date,
    };
    let batch = catalog::create_batch(&state.db.pool, course_id, new_batch)
        .await
        .map_err(|e| e.redirect_to(DASHBOARD))?;

    Ok(Json(Outcome::new("Batch created successfully", DASHBOARD, batch)))
}

async fn delete_batch(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<i64>,
) -> Result<Json<Outcome<()>>> {
    catalog::delete_batch(&state.db.pool, id)
        .await
        .map_err(|e| e.redirect_to(DASHBOARD))?;

    Ok(Json(Outcome::notice("Batch deleted successfully", DASHBOARD)))
}

async fn add_resource(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(course_id): Path<i64>,
    multipart: Multipart,
) -> Result<Json<Outcome<Resource>>> {
    let resource = read_resource_form(multipart)
        .await
        .map_err(|e| e.redirect_to(DASHBOARD))?;

    let resource = catalog::add_resource(&state.db.pool, &state.storage, course_id, resource)
        .await
        .map_err(|e| e.redirect_to(DASHBOARD))?;

    Ok(Json(Outcome::new(
        "Resource added successfully",
        DASHBOARD,
        resource,
    )))
}

fn multipart_error(e: MultipartError, what: &str) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::Validation("File is too large".to_string());
    }
    AppError::Validation(format!("Failed to read {what}: {e}"))
}

async fn read_resource_form(mut multipart: Multipart) -> Result<NewResource> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut name = String::new();
    let mut kind = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, "multipart field"))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error(e, "file"))?;
                file = Some((file_name, data.to_vec()));
            }
            "name" => {
                name = field
                    .text()
                    .await
                    .map_err(|e| multipart_error(e, "name"))?;
            }
            "type" => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| multipart_error(e, "type"))?;
                kind = Some(raw.parse::<ResourceKind>()?);
            }
            _ => {}
        }
    }

    let (file_name, data) = file.ok_or(AppError::EmptyFile)?;
    let kind = kind.ok_or_else(|| AppError::Validation("Resource type is required".to_string()))?;

    Ok(NewResource {
        name,
        kind,
        file_name,
        data,
    })
}
