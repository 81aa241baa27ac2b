// Credential store: registration and password verification

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    db::models::User,
    error::{AppError, Result},
};

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|_| AppError::Internal("Failed to hash password".to_string()))
}

fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub async fn register(
    pool: &SqlitePool,
    username: &str,
    email: &str,
    password: &str,
) -> Result<User> {
    let username = username.trim();
    let email = email.trim();

    if username.is_empty() {
        return Err(AppError::Validation("Username is required".to_string()));
    }
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::Validation("Invalid email address".to_string()));
    }
    if password.is_empty() {
        return Err(AppError::Validation("Password is required".to_string()));
    }

    let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE username = ?")
        .bind(username)
        .fetch_one(pool)
        .await?;

    if existing > 0 {
        return Err(AppError::DuplicateUsername);
    }

    let email_taken = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE email = ?")
        .bind(email)
        .fetch_one(pool)
        .await?;

    if email_taken > 0 {
        return Err(AppError::Validation("Email already registered".to_string()));
    }

    let user = insert_user(pool, username, email, password, false).await?;
    tracing::info!(user_id = user.id, username = %user.username, "Registered user");
    Ok(user)
}

async fn insert_user(
    pool: &SqlitePool,
    username: &str,
    email: &str,
    password: &str,
    is_admin: bool,
) -> Result<User> {
    let password_hash = hash_password(password)?;

    sqlx::query_as::<_, User>(
        "INSERT INTO users (username, email, password_hash, is_admin, created_at) VALUES (?, ?, ?, ?, ?) RETURNING *",
    )
    .bind(username)
    .bind(email)
    .bind(&password_hash)
    .bind(is_admin)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
    .map_err(|e| {
        // Lost a race against a concurrent registration
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                return if db.message().contains("users.username") {
                    AppError::DuplicateUsername
                } else {
                    AppError::Validation("Email already registered".to_string())
                };
            }
        }
        AppError::Database(e)
    })
}

/// Checks a username/password pair. Unknown users and wrong passwords fail
/// with the same error.
pub async fn verify(pool: &SqlitePool, username: &str, password: &str) -> Result<User> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
        .bind(username.trim())
        .fetch_optional(pool)
        .await?;

    check_password(user, password)
}

/// Like [`verify`], but only admin accounts can pass.
pub async fn verify_admin(pool: &SqlitePool, username: &str, password: &str) -> Result<User> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ? AND is_admin = 1")
        .bind(username.trim())
        .fetch_optional(pool)
        .await?;

    check_password(user, password)
}

fn check_password(user: Option<User>, password: &str) -> Result<User> {
    let user = user.ok_or(AppError::InvalidCredentials)?;

    if !verify_password(password, &user.password_hash)? {
        return Err(AppError::InvalidCredentials);
    }

    Ok(user)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn list_students(pool: &SqlitePool) -> Result<Vec<User>> {
    let users = sqlx::query_as::<_, User>("SELECT * FROM users WHERE is_admin = 0 ORDER BY id ASC")
        .fetch_all(pool)
        .await?;
    Ok(users)
}

/// Creates the bootstrap admin account unless the username is already taken.
/// Returns whether an account was created.
pub async fn ensure_admin(
    pool: &SqlitePool,
    username: &str,
    email: &str,
    password: &str,
) -> Result<bool> {
    let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE username = ?")
        .bind(username)
        .fetch_one(pool)
        .await?;

    if existing > 0 {
        return Ok(false);
    }

    let admin = insert_user(pool, username, email, password, true).await?;
    tracing::info!(user_id = admin.id, username = %admin.username, "Created admin account");
    Ok(true)
}
