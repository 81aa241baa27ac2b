pub mod admin;
pub mod auth;
pub mod courses;
pub mod dashboard;


use serde::Serialize;

/// Body of a successful form submission: what happened, where the client goes
/// next, and the record it produced.
#[derive(Debug, Serialize)]
pub struct Outcome<T> {
    pub notice: &'static str,
    pub redirect: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Outcome<T> {
    pub fn new(notice: &'static str, redirect: impl Into<String>, data: T) -> Self {
        Self {
            notice,
            redirect: redirect.into(),
            data: Some(data),
        }
    }
}

impl Outcome<()> {
    pub fn notice(notice: &'static str, redirect: impl Into<String>) -> Self {
        Self {
            notice,
            redirect: redirect.into(),
            data: None,
        }
    }
}

/// Reads an optional numeric form field; blank counts as missing.
pub(crate) fn parse_optional_id(raw: Option<&str>, field: &str) -> crate::error::Result<Option<i64>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| crate::error::AppError::Validation(format!("Invalid {field}"))),
    }
}
