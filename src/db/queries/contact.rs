use std::collections::BTreeSet;

use sqlx::{Any, AnyPool, Executor};

use crate::db::models::{ContactHoursRecord, ContactInfoRecord};
use crate::db::queries::{
    is_unique_violation, new_id, normalize_email, now_timestamp, optional_text, parse_time_of_day,
};
use crate::error::{AppError, AppResult};

const CONTACT_INFO_ID: &str = "contact-info";

#[derive(Debug, Clone)]
pub struct ContactHoursInput {
    pub day_of_week: i64,
    pub start_time: String,
    pub end_time: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateContactHoursInput {
    pub day_of_week: Option<i64>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct ContactInfoInput {
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub is_active: Option<bool>,
}

/// A validated weekly slot.
struct Slot {
    day_of_week: i64,
    start_time: String,
    end_time: String,
}

pub async fn list_contact_hours(
    pool: &AnyPool,
    active_only: bool,
) -> AppResult<Vec<ContactHoursRecord>> {
    let hours = sqlx::query_as::<Any, ContactHoursRecord>(
        r#"
        SELECT id, day_of_week, start_time, end_time, is_active, created_at, updated_at
        FROM contact_hours
        WHERE is_active = 1 OR ? = 0
        ORDER BY day_of_week ASC, start_time ASC
        "#,
    )
    .bind(i64::from(active_only))
    .fetch_all(pool)
    .await?;

    Ok(hours)
}

pub async fn get_contact_hours(pool: &AnyPool, hours_id: &str) -> AppResult<ContactHoursRecord> {
    sqlx::query_as::<Any, ContactHoursRecord>(
        r#"
        SELECT id, day_of_week, start_time, end_time, is_active, created_at, updated_at
        FROM contact_hours
        WHERE id = ?
        "#,
    )
    .bind(hours_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found(format!("Horaire '{hours_id}' introuvable")))
}

pub async fn create_contact_hours(
    pool: &AnyPool,
    input: ContactHoursInput,
) -> AppResult<ContactHoursRecord> {
    let slot = validate_slot(input.day_of_week, &input.start_time, &input.end_time)?;
    if input.is_active {
        ensure_day_free(pool, slot.day_of_week, None).await?;
    }

    let hours_id = new_id();
    let now = now_timestamp();
    insert_slot(pool, &hours_id, &slot, input.is_active, &now).await?;

    get_contact_hours(pool, &hours_id).await
}

pub async fn update_contact_hours(
    pool: &AnyPool,
    hours_id: &str,
    input: UpdateContactHoursInput,
) -> AppResult<ContactHoursRecord> {
    let existing = get_contact_hours(pool, hours_id).await?;

    let slot = validate_slot(
        input.day_of_week.unwrap_or(existing.day_of_week),
        input.start_time.as_deref().unwrap_or(&existing.start_time),
        input.end_time.as_deref().unwrap_or(&existing.end_time),
    )?;
    let is_active = input.is_active.unwrap_or(existing.is_active == 1);
    if is_active {
        ensure_day_free(pool, slot.day_of_week, Some(hours_id)).await?;
    }

    sqlx::query(
        r#"
        UPDATE contact_hours
        SET day_of_week = ?, start_time = ?, end_time = ?, is_active = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(slot.day_of_week)
    .bind(&slot.start_time)
    .bind(&slot.end_time)
    .bind(i64::from(is_active))
    .bind(now_timestamp())
    .bind(hours_id)
    .execute(pool)
    .await
    .map_err(|error| day_conflict(error, slot.day_of_week))?;

    get_contact_hours(pool, hours_id).await
}

pub async fn delete_contact_hours(pool: &AnyPool, hours_id: &str) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM contact_hours WHERE id = ?")
        .bind(hours_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found(format!(
            "Horaire '{hours_id}' introuvable"
        )));
    }

    Ok(())
}

/// Replaces the whole weekly schedule in one transaction.
pub async fn replace_schedule(
    pool: &AnyPool,
    entries: Vec<ContactHoursInput>,
) -> AppResult<Vec<ContactHoursRecord>> {
    let mut active_days = BTreeSet::new();
    let mut slots = Vec::with_capacity(entries.len());
    for entry in entries {
        let slot = validate_slot(entry.day_of_week, &entry.start_time, &entry.end_time)?;
        if entry.is_active && !active_days.insert(slot.day_of_week) {
            return Err(AppError::bad_request(format!(
                "Le jour {} apparaît plusieurs fois dans les horaires actifs",
                slot.day_of_week
            )));
        }
        slots.push((slot, entry.is_active));
    }

    let now = now_timestamp();
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM contact_hours")
        .execute(&mut *tx)
        .await?;

    for (slot, is_active) in &slots {
        insert_slot(&mut *tx, &new_id(), slot, *is_active, &now).await?;
    }

    tx.commit().await?;

    list_contact_hours(pool, false).await
}

pub async fn get_contact_info(pool: &AnyPool, active_only: bool) -> AppResult<Option<ContactInfoRecord>> {
    let info = sqlx::query_as::<Any, ContactInfoRecord>(
        r#"
        SELECT id, phone, email, address, is_active, created_at, updated_at
        FROM contact_info
        WHERE is_active = 1 OR ? = 0
        ORDER BY created_at ASC
        LIMIT 1
        "#,
    )
    .bind(i64::from(active_only))
    .fetch_optional(pool)
    .await?;

    Ok(info)
}

/// Contact info is a singleton stored under a fixed id.
pub async fn upsert_contact_info(
    pool: &AnyPool,
    input: ContactInfoInput,
) -> AppResult<ContactInfoRecord> {
    let email = optional_text(input.email)
        .map(|value| normalize_email(&value))
        .transpose()?;
    let phone = optional_text(input.phone);
    let address = optional_text(input.address);
    let is_active = i64::from(input.is_active.unwrap_or(true));
    let now = now_timestamp();

    sqlx::query(
        r#"
        INSERT INTO contact_info (id, phone, email, address, is_active, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (id) DO UPDATE SET
            phone = excluded.phone,
            email = excluded.email,
            address = excluded.address,
            is_active = excluded.is_active,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(CONTACT_INFO_ID)
    .bind(phone)
    .bind(email)
    .bind(address)
    .bind(is_active)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    sqlx::query_as::<Any, ContactInfoRecord>(
        r#"
        SELECT id, phone, email, address, is_active, created_at, updated_at
        FROM contact_info
        WHERE id = ?
        "#,
    )
    .bind(CONTACT_INFO_ID)
    .fetch_one(pool)
    .await
    .map_err(AppError::from)
}

fn validate_slot(day_of_week: i64, start_time: &str, end_time: &str) -> AppResult<Slot> {
    if !(0..=6).contains(&day_of_week) {
        return Err(AppError::bad_request(format!(
            "Jour de la semaine invalide {day_of_week}, attendu entre 0 et 6"
        )));
    }

    let start_time = parse_time_of_day(start_time, "startTime")?;
    let end_time = parse_time_of_day(end_time, "endTime")?;
    // Zero-padded HH:MM compares correctly as text.
    if start_time >= end_time {
        return Err(AppError::bad_request(
            "L'heure de début doit précéder l'heure de fin",
        ));
    }

    Ok(Slot {
        day_of_week,
        start_time,
        end_time,
    })
}

async fn ensure_day_free(pool: &AnyPool, day_of_week: i64, exclude_id: Option<&str>) -> AppResult<()> {
    let taken: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM contact_hours
        WHERE day_of_week = ? AND is_active = 1 AND id <> ?
        "#,
    )
    .bind(day_of_week)
    .bind(exclude_id.unwrap_or(""))
    .fetch_one(pool)
    .await?;

    if taken > 0 {
        return Err(day_taken(day_of_week));
    }

    Ok(())
}

fn day_taken(day_of_week: i64) -> AppError {
    AppError::bad_request(format!(
        "Un horaire actif existe déjà pour le jour {day_of_week}"
    ))
}

/// A concurrent write can still claim the day between the check and the write;
/// the partial unique index on active days rejects it.
fn day_conflict(error: sqlx::Error, day_of_week: i64) -> AppError {
    if is_unique_violation(&error) {
        day_taken(day_of_week)
    } else {
        AppError::from(error)
    }
}

async fn insert_slot<'e, E>(
    executor: E,
    hours_id: &str,
    slot: &Slot,
    is_active: bool,
    now: &str,
) -> AppResult<()>
where
    E: Executor<'e, Database = Any>,
{
    sqlx::query(
        r#"
        INSERT INTO contact_hours (id, day_of_week, start_time, end_time, is_active, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(hours_id)
    .bind(slot.day_of_week)
    .bind(&slot.start_time)
    .bind(&slot.end_time)
    .bind(i64::from(is_active))
    .bind(now)
    .bind(now)
    .execute(executor)
    .await
    .map_err(|error| day_conflict(error, slot.day_of_week))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::db::queries::contact::{
        self, ContactHoursInput, ContactInfoInput, UpdateContactHoursInput,
    };
    use crate::error::AppError;
    use crate::testing::setup_db;

    fn slot(day_of_week: i64, start_time: &str, end_time: &str) -> ContactHoursInput {
        ContactHoursInput {
            day_of_week,
            start_time: start_time.to_string(),
            end_time: end_time.to_string(),
            is_active: true,
        }
    }

    #[tokio::test]
    async fn active_days_are_unique() {
        let (_temp_dir, pool) = setup_db("contact-hours-unique").await;

        let monday = contact::create_contact_hours(&pool, slot(1, "09:00", "12:00"))
            .await
            .expect("monday should be created");
        let duplicate = contact::create_contact_hours(&pool, slot(1, "14:00", "18:00")).await;
        assert!(matches!(duplicate, Err(AppError::BadRequest(_))));

        let inactive = contact::create_contact_hours(
            &pool,
            ContactHoursInput {
                is_active: false,
                ..slot(1, "14:00", "18:00")
            },
        )
        .await
        .expect("inactive duplicate is allowed");

        let reactivated = contact::update_contact_hours(
            &pool,
            &inactive.id,
            UpdateContactHoursInput {
                is_active: Some(true),
                ..UpdateContactHoursInput::default()
            },
        )
        .await;
        assert!(matches!(reactivated, Err(AppError::BadRequest(_))));

        let moved = contact::update_contact_hours(
            &pool,
            &monday.id,
            UpdateContactHoursInput {
                end_time: Some("12:30".to_string()),
                ..UpdateContactHoursInput::default()
            },
        )
        .await
        .expect("updating the same slot keeps its own day");
        assert_eq!(moved.end_time, "12:30");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_keep_one_active_slot_per_day() {
        let (_temp_dir, pool) = setup_db("contact-hours-concurrent").await;

        let attempts: Vec<_> = (0..8)
            .map(|_| {
                let pool = pool.clone();
                tokio::spawn(async move {
                    contact::create_contact_hours(&pool, slot(1, "09:00", "12:00")).await
                })
            })
            .collect();

        let mut created = 0;
        for attempt in attempts {
            match attempt.await.expect("task should not panic") {
                Ok(_) => created += 1,
                Err(error) => assert!(matches!(error, AppError::BadRequest(_)), "{error:?}"),
            }
        }

        assert_eq!(created, 1);
        assert_eq!(
            contact::list_contact_hours(&pool, true)
                .await
                .expect("hours should be listed")
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn slot_validation_rejects_bad_ranges() {
        let (_temp_dir, pool) = setup_db("contact-hours-validation").await;

        for bad in [slot(7, "09:00", "12:00"), slot(2, "12:00", "09:00"), slot(2, "9h", "12:00")] {
            let result = contact::create_contact_hours(&pool, bad).await;
            assert!(matches!(result, Err(AppError::BadRequest(_))));
        }
    }

    #[tokio::test]
    async fn replace_schedule_swaps_all_rows() {
        let (_temp_dir, pool) = setup_db("contact-hours-replace").await;
        contact::create_contact_hours(&pool, slot(0, "10:00", "11:00"))
            .await
            .expect("sunday should be created");

        let schedule = contact::replace_schedule(
            &pool,
            vec![slot(5, "09:00", "17:00"), slot(1, "09:00", "17:00")],
        )
        .await
        .expect("schedule should be replaced");
        let days: Vec<i64> = schedule.iter().map(|hours| hours.day_of_week).collect();
        assert_eq!(days, vec![1, 5]);

        let duplicated = contact::replace_schedule(
            &pool,
            vec![slot(2, "09:00", "12:00"), slot(2, "14:00", "17:00")],
        )
        .await;
        assert!(matches!(duplicated, Err(AppError::BadRequest(_))));
        assert_eq!(
            contact::list_contact_hours(&pool, true)
                .await
                .expect("hours should be listed")
                .len(),
            2
        );
    }

    #[tokio::test]
    async fn contact_info_is_a_singleton() {
        let (_temp_dir, pool) = setup_db("contact-info").await;
        assert!(contact::get_contact_info(&pool, true)
            .await
            .expect("lookup should succeed")
            .is_none());

        let first = contact::upsert_contact_info(
            &pool,
            ContactInfoInput {
                phone: Some("+33 6 12 34 56 78".to_string()),
                email: Some("Contact@Aurore.fr".to_string()),
                ..ContactInfoInput::default()
            },
        )
        .await
        .expect("contact info should be created");
        assert_eq!(first.email.as_deref(), Some("contact@aurore.fr"));

        let second = contact::upsert_contact_info(
            &pool,
            ContactInfoInput {
                address: Some("Paris".to_string()),
                is_active: Some(false),
                ..ContactInfoInput::default()
            },
        )
        .await
        .expect("contact info should be updated");
        assert_eq!(second.id, first.id);
        assert!(second.phone.is_none());
        assert!(contact::get_contact_info(&pool, true)
            .await
            .expect("lookup should succeed")
            .is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_upserts_share_one_record() {
        let (_temp_dir, pool) = setup_db("contact-info-concurrent").await;

        let attempts: Vec<_> = (0..8)
            .map(|index| {
                let pool = pool.clone();
                tokio::spawn(async move {
                    contact::upsert_contact_info(
                        &pool,
                        ContactInfoInput {
                            phone: Some(format!("+33 1 00 00 00 0{index}")),
                            ..ContactInfoInput::default()
                        },
                    )
                    .await
                })
            })
            .collect();

        for attempt in attempts {
            attempt
                .await
                .expect("task should not panic")
                .expect("upsert should succeed");
        }

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contact_info")
            .fetch_one(&pool)
            .await
            .expect("count should succeed");
        assert_eq!(count, 1);
    }
}
