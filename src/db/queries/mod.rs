pub mod categories;
pub mod checklist;
pub mod comments;
pub mod contact;
pub mod dashboard;
pub mod history;
pub mod social_media;
pub mod tasks;
pub mod users;
pub mod vacations;

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use regex::Regex;
use sqlx::{Any, AnyPool, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

pub(crate) fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Opens a transaction that already holds the write lock on `table`, so a
/// check followed by a write cannot interleave with another writer.
///
/// SQLite upgrades a deferred transaction to a writer on its first write
/// statement, which waits on the busy timeout instead of failing on a stale
/// snapshot. PostgreSQL takes a table lock that still admits plain readers.
pub(crate) async fn begin_write(
    pool: &AnyPool,
    table: &str,
) -> AppResult<Transaction<'static, Any>> {
    let mut tx = pool.begin().await?;

    let statement = if tx.backend_name() == "PostgreSQL" {
        format!("LOCK TABLE {table} IN SHARE ROW EXCLUSIVE MODE")
    } else {
        format!("DELETE FROM {table} WHERE 1 = 0")
    };
    sqlx::query(&statement).execute(&mut *tx).await?;

    Ok(tx)
}

pub(crate) fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db_error) if db_error.is_unique_violation())
}

pub(crate) fn required_text(value: &str, message: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::bad_request(message));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|candidate| candidate.trim().to_string())
        .filter(|candidate| !candidate.is_empty())
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp, as sent by browser date pickers.
pub(crate) fn parse_date(value: &str, field: &str) -> AppResult<NaiveDate> {
    let trimmed = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
        return Ok(date);
    }

    DateTime::parse_from_rfc3339(trimmed)
        .map(|timestamp| timestamp.with_timezone(&Utc).date_naive())
        .map_err(|_| {
            AppError::bad_request(format!(
                "Le champ {field} doit être une date au format AAAA-MM-JJ"
            ))
        })
}

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub(crate) fn parse_time_of_day(value: &str, field: &str) -> AppResult<String> {
    static TIME_PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = TIME_PATTERN.get_or_init(|| {
        Regex::new(r"^([01][0-9]|2[0-3]):[0-5][0-9]$").expect("time pattern is valid")
    });

    let trimmed = value.trim();
    if pattern.is_match(trimmed) {
        Ok(trimmed.to_string())
    } else {
        Err(AppError::bad_request(format!(
            "Le champ {field} doit être une heure au format HH:MM"
        )))
    }
}

pub(crate) fn normalize_email(value: &str) -> AppResult<String> {
    static EMAIL_PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = EMAIL_PATTERN.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
    });

    let candidate = value.trim().to_lowercase();
    if pattern.is_match(&candidate) {
        Ok(candidate)
    } else {
        Err(AppError::bad_request(format!(
            "Adresse e-mail invalide '{}'",
            value.trim()
        )))
    }
}

pub(crate) fn normalize_http_url(value: &str) -> AppResult<String> {
    let trimmed = value.trim();
    let parsed = reqwest::Url::parse(trimmed)
        .map_err(|_| AppError::bad_request("L'URL doit être une adresse http(s) valide"))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed.to_string()),
        _ => Err(AppError::bad_request("L'URL doit utiliser http ou https")),
    }
}

pub(crate) fn search_pattern(term: &str) -> Option<String> {
    let trimmed = term.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(format!("%{}%", trimmed.to_lowercase()))
    }
}
