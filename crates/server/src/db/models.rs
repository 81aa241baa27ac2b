use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum EnrollmentStatus {
    Open,
    Closed,
}

impl EnrollmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EnrollmentStatus::Open => "Open",
            EnrollmentStatus::Closed => "Closed",
        }
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnrollmentStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Open" | "open" => Ok(EnrollmentStatus::Open),
            "Closed" | "closed" => Ok(EnrollmentStatus::Closed),
            other => Err(AppError::Validation(format!(
                "Enrollment status must be 'Open' or 'Closed', got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Course {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub duration: String,
    pub category: String,
    pub enrollment_status: EnrollmentStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Batch {
    pub id: i64,
    pub name: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub course_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ResourceKind {
    Pdf,
    Video,
}

impl FromStr for ResourceKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(ResourceKind::Pdf),
            "video" => Ok(ResourceKind::Video),
            other => Err(AppError::Validation(format!(
                "Resource type must be 'pdf' or 'video', got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Resource {
    pub id: i64,
    pub name: String,
    pub kind: ResourceKind,
    /// Storage key inside the upload directory, never a full path.
    pub file_path: String,
    pub course_id: i64,
    pub upload_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Enrollment {
    pub id: i64,
    pub student_id: i64,
    pub course_id: i64,
    pub batch_id: i64,
    pub enrollment_date: DateTime<Utc>,
    pub progress: f64,
}

/// Enrollment row joined with the names shown on a student's dashboard.
/// The names are missing once the course or batch has been deleted.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct EnrollmentSummary {
    pub id: i64,
    pub course_id: i64,
    pub course_name: Option<String>,
    pub batch_id: i64,
    pub batch_name: Option<String>,
    pub enrollment_date: DateTime<Utc>,
    pub progress: f64,
}
