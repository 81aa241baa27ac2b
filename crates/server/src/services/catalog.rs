// Catalog store: courses, batches and resources

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::{
    db::models::{Batch, Course, EnrollmentStatus, Resource, ResourceKind},
    error::{AppError, Result},
    services::storage::StorageService,
};

#[derive(Debug, Clone)]
pub struct CourseFields {
    pub name: String,
    pub description: String,
    pub duration: String,
    pub category: String,
    pub enrollment_status: EnrollmentStatus,
}

#[derive(Debug, Clone, Default)]
pub struct CourseFilter {
    pub status: Option<EnrollmentStatus>,
    /// Case-insensitive substring of the course name.
    pub search: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewBatch {
    pub name: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewResource {
    pub name: String,
    pub kind: ResourceKind,
    pub file_name: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Serialize)]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: Course,
    pub batches: Vec<Batch>,
    pub resources: Vec<Resource>,
}

fn not_found(what: &str) -> AppError {
    AppError::NotFound(format!("{what} not found"))
}

fn validate_course(fields: &CourseFields) -> Result<()> {
    if fields.name.trim().is_empty() {
        return Err(AppError::Validation("Course name is required".to_string()));
    }
    Ok(())
}

pub async fn create_course(pool: &SqlitePool, fields: CourseFields) -> Result<Course> {
    validate_course(&fields)?;

    let course = sqlx::query_as::<_, Course>(
        r#"
        INSERT INTO courses (name, description, duration, category, enrollment_status, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(fields.name.trim())
    .bind(&fields.description)
    .bind(&fields.duration)
    .bind(fields.category.trim())
    .bind(fields.enrollment_status)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;

    tracing::info!(course_id = course.id, name = %course.name, "Created course");
    Ok(course)
}

pub async fn update_course(pool: &SqlitePool, id: i64, fields: CourseFields) -> Result<Course> {
    validate_course(&fields)?;

    let course = sqlx::query_as::<_, Course>(
        r#"
        UPDATE courses
        SET name = ?, description = ?, duration = ?, category = ?, enrollment_status = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(fields.name.trim())
    .bind(&fields.description)
    .bind(&fields.duration)
    .bind(fields.category.trim())
    .bind(fields.enrollment_status)
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| not_found("Course"))?;

    tracing::info!(course_id = id, status = %course.enrollment_status, "Updated course");
    Ok(course)
}

/// Deletes a course together with its batches and resources. Enrollments that
/// point at the course are kept. Stored files are removed once the rows are
/// gone.
pub async fn delete_course(pool: &SqlitePool, storage: &StorageService, id: i64) -> Result<()> {
    let mut tx = pool.begin().await?;

    let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM courses WHERE id = ?")
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

    if exists == 0 {
        return Err(not_found("Course"));
    }

    let files = sqlx::query_scalar::<_, String>("SELECT file_path FROM resources WHERE course_id = ?")
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM resources WHERE course_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM batches WHERE course_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM courses WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    discard_files(storage, &files).await;

    tracing::info!(course_id = id, resources = files.len(), "Deleted course");
    Ok(())
}

/// Removes stored files that no resource row points at anymore. Failures are
/// logged and counted, never returned.
async fn discard_files(storage: &StorageService, files: &[String]) -> usize {
    let mut failed = 0;
    for file in files {
        if let Err(e) = storage.remove(file).await {
            tracing::warn!(file = %file, "Failed to remove resource file: {e}");
            failed += 1;
        }
    }
    failed
}

pub async fn get_course(pool: &SqlitePool, id: i64) -> Result<Course> {
    sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| not_found("Course"))
}

pub async fn course_detail(pool: &SqlitePool, id: i64) -> Result<CourseDetail> {
    let course = get_course(pool, id).await?;
    let batches = list_batches(pool, id).await?;
    let resources = list_resources(pool, id).await?;

    Ok(CourseDetail {
        course,
        batches,
        resources,
    })
}

pub async fn list_courses(pool: &SqlitePool, filter: &CourseFilter) -> Result<Vec<Course>> {
    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM courses WHERE 1 = 1");

    if let Some(status) = filter.status {
        query.push(" AND enrollment_status = ").push_bind(status);
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        query
            .push(" AND instr(lower(name), lower(")
            .push_bind(search.to_string())
            .push(")) > 0");
    }
    if let Some(category) = filter.category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        query.push(" AND category = ").push_bind(category.to_string());
    }
    query.push(" ORDER BY id ASC");

    let courses = query.build_query_as::<Course>().fetch_all(pool).await?;
    Ok(courses)
}

pub async fn create_batch(pool: &SqlitePool, course_id: i64, batch: NewBatch) -> Result<Batch> {
    if batch.name.trim().is_empty() {
        return Err(AppError::Validation("Batch name is required".to_string()));
    }
    if let (Some(start), Some(end)) = (batch.start_date, batch.end_date) {
        if end < start {
            return Err(AppError::Validation(
                "Batch cannot end before it starts".to_string(),
            ));
        }
    }

    get_course(pool, course_id).await?;

    let batch = sqlx::query_as::<_, Batch>(
        "INSERT INTO batches (name, start_date, end_date, course_id) VALUES (?, ?, ?, ?) RETURNING *",
    )
    .bind(batch.name.trim())
    .bind(batch.start_date)
    .bind(batch.end_date)
    .bind(course_id)
    .fetch_one(pool)
    .await?;

    tracing::info!(course_id, batch_id = batch.id, "Created batch");
    Ok(batch)
}

pub async fn list_batches(pool: &SqlitePool, course_id: i64) -> Result<Vec<Batch>> {
    let batches = sqlx::query_as::<_, Batch>(
        "SELECT * FROM batches WHERE course_id = ? ORDER BY start_date ASC, id ASC",
    )
    .bind(course_id)
    .fetch_all(pool)
    .await?;
    Ok(batches)
}

pub async fn delete_batch(pool: &SqlitePool, id: i64) -> Result<()> {
    let result = sqlx::query("DELETE FROM batches WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(not_found("Batch"));
    }

    tracing::info!(batch_id = id, "Deleted batch");
    Ok(())
}

/// Stores the uploaded file and records a resource pointing at it.
pub async fn add_resource(
    pool: &SqlitePool,
    storage: &StorageService,
    course_id: i64,
    resource: NewResource,
) -> Result<Resource> {
    get_course(pool, course_id).await?;

    if resource.file_name.trim().is_empty() || resource.data.is_empty() {
        return Err(AppError::EmptyFile);
    }
    if resource.name.trim().is_empty() {
        return Err(AppError::Validation("Resource name is required".to_string()));
    }

    let reference = storage.store(&resource.file_name, &resource.data).await?;

    let inserted = sqlx::query_as::<_, Resource>(
        r#"
        INSERT INTO resources (name, kind, file_path, course_id, upload_date)
        VALUES (?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(resource.name.trim())
    .bind(resource.kind)
    .bind(&reference)
    .bind(course_id)
    .bind(Utc::now())
    .fetch_one(pool)
    .await;

    match inserted {
        Ok(row) => {
            tracing::info!(course_id, resource_id = row.id, file = %reference, "Added resource");
            Ok(row)
        }
        Err(e) => {
            discard_files(storage, std::slice::from_ref(&reference)).await;
            Err(e.into())
        }
    }
}

pub async fn list_resources(pool: &SqlitePool, course_id: i64) -> Result<Vec<Resource>> {
    let resources = sqlx::query_as::<_, Resource>(
        "SELECT * FROM resources WHERE course_id = ? ORDER BY upload_date ASC, id ASC",
    )
    .bind(course_id)
    .fetch_all(pool)
    .await?;
    Ok(resources)
}
