// Enrollment workflow and ledger

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};

use crate::{
    db::models::{Enrollment, EnrollmentStatus, EnrollmentSummary, User},
    error::{AppError, Result},
};

/// Enrolls `student` in a batch of a course.
///
/// The course must exist and `batch_id` must be supplied before anything else
/// is checked. The batch has to belong to the course, the course has to be
/// open, admins cannot enroll, and a student holds at most one enrollment per
/// course and batch.
pub async fn enroll(
    pool: &SqlitePool,
    student: &User,
    course_id: i64,
    batch_id: Option<i64>,
) -> Result<Enrollment> {
    let mut tx = pool.begin().await?;

    let status = sqlx::query_scalar::<_, EnrollmentStatus>(
        "SELECT enrollment_status FROM courses WHERE id = ?",
    )
    .bind(course_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Course not found".to_string()))?;

    let batch_id = batch_id.ok_or(AppError::MissingBatch)?;

    let in_course = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM batches WHERE id = ? AND course_id = ?",
    )
    .bind(batch_id)
    .bind(course_id)
    .fetch_one(&mut *tx)
    .await?;

    if in_course == 0 {
        return Err(AppError::NotFound(
            "Batch not found for this course".to_string(),
        ));
    }

    if student.is_admin {
        return Err(AppError::Validation(
            "Administrators cannot enroll in courses".to_string(),
        ));
    }

    if status != EnrollmentStatus::Open {
        return Err(AppError::Validation(
            "Enrollment is closed for this course".to_string(),
        ));
    }

    let already = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM enrollments WHERE student_id = ? AND course_id = ? AND batch_id = ?",
    )
    .bind(student.id)
    .bind(course_id)
    .bind(batch_id)
    .fetch_one(&mut *tx)
    .await?;

    if already > 0 {
        return Err(already_enrolled());
    }

    let enrollment = insert_enrollment(&mut *tx, student.id, course_id, batch_id).await?;

    tx.commit().await?;

    tracing::info!(
        enrollment_id = enrollment.id,
        student_id = student.id,
        course_id,
        batch_id,
        "Enrolled student"
    );
    Ok(enrollment)
}

fn already_enrolled() -> AppError {
    AppError::Validation("You are already enrolled in this batch".to_string())
}

async fn insert_enrollment(
    conn: &mut SqliteConnection,
    student_id: i64,
    course_id: i64,
    batch_id: i64,
) -> Result<Enrollment> {
    sqlx::query_as::<_, Enrollment>(
        r#"
        INSERT INTO enrollments (student_id, course_id, batch_id, enrollment_date, progress)
        VALUES (?, ?, ?, ?, 0.0)
        RETURNING *
        "#,
    )
    .bind(student_id)
    .bind(course_id)
    .bind(batch_id)
    .bind(Utc::now())
    .fetch_one(conn)
    .await
    .map_err(|e| {
        // A concurrent request enrolled the same student first
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                return already_enrolled();
            }
        }
        AppError::Database(e)
    })
}

/// All enrollments of a student, oldest first.
pub async fn dashboard(pool: &SqlitePool, student_id: i64) -> Result<Vec<EnrollmentSummary>> {
    let enrollments = sqlx::query_as::<_, EnrollmentSummary>(
        r#"
        SELECT e.id, e.course_id, c.name AS course_name, e.batch_id, b.name AS batch_name,
               e.enrollment_date, e.progress
        FROM enrollments e
        LEFT JOIN courses c ON c.id = e.course_id
        LEFT JOIN batches b ON b.id = e.batch_id
        WHERE e.student_id = ?
        ORDER BY e.id ASC
        "#,
    )
    .bind(student_id)
    .fetch_all(pool)
    .await?;

    Ok(enrollments)
}

// Progress updates are not routed yet
#[allow(dead_code)]
pub async fn set_progress(
    pool: &SqlitePool,
    enrollment_id: i64,
    student_id: i64,
    progress: f64,
) -> Result<Enrollment> {
    if !(0.0..=1.0).contains(&progress) {
        return Err(AppError::Validation(
            "Progress must be between 0.0 and 1.0".to_string(),
        ));
    }

    sqlx::query_as::<_, Enrollment>(
        "UPDATE enrollments SET progress = ? WHERE id = ? AND student_id = ? RETURNING *",
    )
    .bind(progress)
    .bind(enrollment_id)
    .bind(student_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Enrollment not found".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::Database,
        services::{
            catalog::{self, CourseFields, NewBatch},
            credentials,
            storage::StorageService,
        },
    };

    struct Fixture {
        db: Database,
        alice: User,
        course_id: i64,
        batch_id: i64,
    }

    async fn fixture() -> Fixture {
        let db = Database::in_memory().await.unwrap();
        let alice = credentials::register(&db.pool, "alice", "a@x.com", "pw1")
            .await
            .unwrap();
        let course = catalog::create_course(
            &db.pool,
            CourseFields {
                name: "CS101".to_string(),
                description: String::new(),
                duration: String::new(),
                category: "cs".to_string(),
                enrollment_status: EnrollmentStatus::Open,
            },
        )
        .await
        .unwrap();
        let batch = catalog::create_batch(
            &db.pool,
            course.id,
            NewBatch {
                name: "B1".to_string(),
                start_date: None,
                end_date: None,
            },
        )
        .await
        .unwrap();

        Fixture {
            db,
            alice,
            course_id: course.id,
            batch_id: batch.id,
        }
    }

    async fn enrollment_count(pool: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM enrollments")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn enroll_writes_ledger_entry() {
        let f = fixture().await;

        let enrollment = enroll(&f.db.pool, &f.alice, f.course_id, Some(f.batch_id))
            .await
            .unwrap();
        assert_eq!(enrollment.student_id, f.alice.id);
        assert_eq!(enrollment.course_id, f.course_id);
        assert_eq!(enrollment.batch_id, f.batch_id);
        assert_eq!(enrollment.progress, 0.0);

        let listed = dashboard(&f.db.pool, f.alice.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, enrollment.id);
        assert_eq!(listed[0].course_name.as_deref(), Some("CS101"));
        assert_eq!(listed[0].batch_name.as_deref(), Some("B1"));
    }

    #[tokio::test]
    async fn enroll_without_batch_writes_nothing() {
        let f = fixture().await;

        let err = enroll(&f.db.pool, &f.alice, f.course_id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MissingBatch));
        assert_eq!(enrollment_count(&f.db.pool).await, 0);
    }

    #[tokio::test]
    async fn unknown_course_is_checked_before_batch() {
        let f = fixture().await;

        let err = enroll(&f.db.pool, &f.alice, 404, None).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn batch_must_belong_to_course() {
        let f = fixture().await;
        let other = catalog::create_course(
            &f.db.pool,
            CourseFields {
                name: "Art".to_string(),
                description: String::new(),
                duration: String::new(),
                category: "art".to_string(),
                enrollment_status: EnrollmentStatus::Open,
            },
        )
        .await
        .unwrap();

        let err = enroll(&f.db.pool, &f.alice, other.id, Some(f.batch_id))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(enrollment_count(&f.db.pool).await, 0);
    }

    #[tokio::test]
    async fn closed_course_rejects_new_enrollments_but_keeps_old_ones() {
        let f = fixture().await;
        enroll(&f.db.pool, &f.alice, f.course_id, Some(f.batch_id))
            .await
            .unwrap();

        let course = catalog::get_course(&f.db.pool, f.course_id).await.unwrap();
        catalog::update_course(
            &f.db.pool,
            f.course_id,
            CourseFields {
                name: course.name,
                description: course.description,
                duration: course.duration,
                category: course.category,
                enrollment_status: EnrollmentStatus::Closed,
            },
        )
        .await
        .unwrap();

        let bob = credentials::register(&f.db.pool, "bob", "b@x.com", "pw2")
            .await
            .unwrap();
        let err = enroll(&f.db.pool, &bob, f.course_id, Some(f.batch_id))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        assert_eq!(dashboard(&f.db.pool, f.alice.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_enrollment_is_rejected() {
        let f = fixture().await;
        enroll(&f.db.pool, &f.alice, f.course_id, Some(f.batch_id))
            .await
            .unwrap();

        let err = enroll(&f.db.pool, &f.alice, f.course_id, Some(f.batch_id))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(enrollment_count(&f.db.pool).await, 1);
    }

    #[tokio::test]
    async fn racing_duplicate_insert_reports_already_enrolled() {
        let f = fixture().await;
        let mut conn = f.db.pool.acquire().await.unwrap();

        insert_enrollment(&mut *conn, f.alice.id, f.course_id, f.batch_id)
            .await
            .unwrap();
        let err = insert_enrollment(&mut *conn, f.alice.id, f.course_id, f.batch_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref msg) if msg.contains("already enrolled")));
        drop(conn);

        assert_eq!(enrollment_count(&f.db.pool).await, 1);
    }

    #[tokio::test]
    async fn admins_cannot_enroll() {
        let f = fixture().await;
        credentials::ensure_admin(&f.db.pool, "admin", "admin@example.com", "admin123")
            .await
            .unwrap();
        let admin = credentials::verify_admin(&f.db.pool, "admin", "admin123")
            .await
            .unwrap();

        let err = enroll(&f.db.pool, &admin, f.course_id, Some(f.batch_id))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(enrollment_count(&f.db.pool).await, 0);
    }

    #[tokio::test]
    async fn enrollments_survive_course_deletion() {
        let f = fixture().await;
        let storage = StorageService::new(
            std::env::temp_dir().join(format!("lms-enroll-{}", uuid::Uuid::new_v4())),
        );
        enroll(&f.db.pool, &f.alice, f.course_id, Some(f.batch_id))
            .await
            .unwrap();

        catalog::delete_course(&f.db.pool, &storage, f.course_id)
            .await
            .unwrap();

        let listed = dashboard(&f.db.pool, f.alice.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].course_id, f.course_id);
        assert!(listed[0].course_name.is_none());
        assert!(listed[0].batch_name.is_none());
    }

    #[tokio::test]
    async fn progress_stays_within_bounds() {
        let f = fixture().await;
        let enrollment = enroll(&f.db.pool, &f.alice, f.course_id, Some(f.batch_id))
            .await
            .unwrap();

        let updated = set_progress(&f.db.pool, enrollment.id, f.alice.id, 0.5)
            .await
            .unwrap();
        assert_eq!(updated.progress, 0.5);

        for bad in [-0.1, 1.5, f64::NAN] {
            let err = set_progress(&f.db.pool, enrollment.id, f.alice.id, bad)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }

        // someone else's enrollment
        let err = set_progress(&f.db.pool, enrollment.id, f.alice.id + 100, 1.0)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
