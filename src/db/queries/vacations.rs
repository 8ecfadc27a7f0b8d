use chrono::NaiveDate;
use sqlx::{Any, AnyConnection, AnyPool};

use crate::db::models::VacationRecord;
use crate::db::queries::{begin_write, format_date, new_id, now_timestamp, required_text, today};
use crate::error::{AppError, AppResult};

const VACATION_SELECT: &str = r#"
    SELECT id, start_date, end_date, title, description, is_active, created_at, updated_at
    FROM vacations
"#;

#[derive(Debug, Clone)]
pub struct VacationInput {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub title: String,
    pub description: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateVacationInput {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

pub async fn list_vacations(pool: &AnyPool, active_only: bool) -> AppResult<Vec<VacationRecord>> {
    let vacations = sqlx::query_as::<Any, VacationRecord>(&format!(
        "{VACATION_SELECT} WHERE is_active = 1 OR ? = 0 ORDER BY start_date ASC"
    ))
    .bind(i64::from(active_only))
    .fetch_all(pool)
    .await?;

    Ok(vacations)
}

/// Active vacations that are ongoing or still to come.
pub async fn list_current_vacations(pool: &AnyPool) -> AppResult<Vec<VacationRecord>> {
    let vacations = sqlx::query_as::<Any, VacationRecord>(&format!(
        "{VACATION_SELECT} WHERE is_active = 1 AND end_date >= ? ORDER BY start_date ASC"
    ))
    .bind(format_date(today()))
    .fetch_all(pool)
    .await?;

    Ok(vacations)
}

pub async fn get_vacation(pool: &AnyPool, vacation_id: &str) -> AppResult<VacationRecord> {
    sqlx::query_as::<Any, VacationRecord>(&format!("{VACATION_SELECT} WHERE id = ?"))
        .bind(vacation_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Congé '{vacation_id}' introuvable")))
}

pub async fn create_vacation(pool: &AnyPool, input: VacationInput) -> AppResult<VacationRecord> {
    let title = required_text(&input.title, "Le titre du congé est requis")?;
    validate_range(input.start_date, input.end_date)?;

    let mut tx = begin_write(pool, "vacations").await?;
    if input.is_active {
        ensure_no_overlap(&mut tx, input.start_date, input.end_date, None).await?;
    }

    let vacation_id = new_id();
    let now = now_timestamp();

    sqlx::query(
        r#"
        INSERT INTO vacations (id, start_date, end_date, title, description, is_active, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&vacation_id)
    .bind(format_date(input.start_date))
    .bind(format_date(input.end_date))
    .bind(&title)
    .bind(input.description.unwrap_or_default().trim())
    .bind(i64::from(input.is_active))
    .bind(&now)
    .bind(&now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    get_vacation(pool, &vacation_id).await
}

pub async fn update_vacation(
    pool: &AnyPool,
    vacation_id: &str,
    input: UpdateVacationInput,
) -> AppResult<VacationRecord> {
    let mut tx = begin_write(pool, "vacations").await?;

    let existing = sqlx::query_as::<Any, VacationRecord>(&format!("{VACATION_SELECT} WHERE id = ?"))
        .bind(vacation_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Congé '{vacation_id}' introuvable")))?;

    let start_date = match input.start_date {
        Some(value) => value,
        None => stored_date(&existing.start_date)?,
    };
    let end_date = match input.end_date {
        Some(value) => value,
        None => stored_date(&existing.end_date)?,
    };
    validate_range(start_date, end_date)?;

    let title = match input.title {
        Some(value) => required_text(&value, "Le titre du congé est requis")?,
        None => existing.title,
    };
    let description = input
        .description
        .map(|value| value.trim().to_string())
        .unwrap_or(existing.description);
    let is_active = input.is_active.unwrap_or(existing.is_active == 1);

    if is_active {
        ensure_no_overlap(&mut tx, start_date, end_date, Some(vacation_id)).await?;
    }

    sqlx::query(
        r#"
        UPDATE vacations
        SET start_date = ?, end_date = ?, title = ?, description = ?, is_active = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(format_date(start_date))
    .bind(format_date(end_date))
    .bind(&title)
    .bind(&description)
    .bind(i64::from(is_active))
    .bind(now_timestamp())
    .bind(vacation_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    get_vacation(pool, vacation_id).await
}

pub async fn delete_vacation(pool: &AnyPool, vacation_id: &str) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM vacations WHERE id = ?")
        .bind(vacation_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found(format!(
            "Congé '{vacation_id}' introuvable"
        )));
    }

    Ok(())
}

fn validate_range(start_date: NaiveDate, end_date: NaiveDate) -> AppResult<()> {
    if start_date > end_date {
        return Err(AppError::bad_request(
            "La date de début doit précéder ou égaler la date de fin",
        ));
    }
    Ok(())
}

fn stored_date(value: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value, crate::db::queries::DATE_FORMAT).map_err(|error| {
        tracing::error!(error = ?error, value, "stored vacation date is malformed");
        AppError::Internal
    })
}

/// Inclusive interval intersection against the other active vacations.
async fn ensure_no_overlap(
    connection: &mut AnyConnection,
    start_date: NaiveDate,
    end_date: NaiveDate,
    exclude_id: Option<&str>,
) -> AppResult<()> {
    let conflicting = sqlx::query_as::<Any, VacationRecord>(&format!(
        "{VACATION_SELECT} WHERE is_active = 1 AND id <> ? AND start_date <= ? AND end_date >= ? ORDER BY start_date ASC LIMIT 1"
    ))
    .bind(exclude_id.unwrap_or(""))
    .bind(format_date(end_date))
    .bind(format_date(start_date))
    .fetch_optional(connection)
    .await?;

    match conflicting {
        Some(existing) => Err(AppError::bad_request(format!(
            "Ces dates chevauchent le congé « {} » du {} au {}",
            existing.title, existing.start_date, existing.end_date
        ))),
        None => Ok(()),
    }
}
