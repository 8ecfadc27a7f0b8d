use sqlx::{Any, AnyPool};

use crate::db::models::SocialMediaRecord;
use crate::db::queries::{new_id, normalize_http_url, now_timestamp, required_text};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct SocialMediaInput {
    pub platform: String,
    pub url: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateSocialMediaInput {
    pub platform: Option<String>,
    pub url: Option<String>,
    pub is_active: Option<bool>,
}

pub async fn list_social_media(
    pool: &AnyPool,
    active_only: bool,
) -> AppResult<Vec<SocialMediaRecord>> {
    let links = sqlx::query_as::<Any, SocialMediaRecord>(
        r#"
        SELECT id, platform, url, is_active, created_at, updated_at
        FROM social_media
        WHERE is_active = 1 OR ? = 0
        ORDER BY platform ASC
        "#,
    )
    .bind(i64::from(active_only))
    .fetch_all(pool)
    .await?;

    Ok(links)
}

pub async fn get_social_media(pool: &AnyPool, link_id: &str) -> AppResult<SocialMediaRecord> {
    sqlx::query_as::<Any, SocialMediaRecord>(
        r#"
        SELECT id, platform, url, is_active, created_at, updated_at
        FROM social_media
        WHERE id = ?
        "#,
    )
    .bind(link_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found(format!("Réseau social '{link_id}' introuvable")))
}

pub async fn create_social_media(
    pool: &AnyPool,
    input: SocialMediaInput,
) -> AppResult<SocialMediaRecord> {
    let platform = normalize_platform(&input.platform)?;
    let url = normalize_http_url(&input.url)?;
    let link_id = new_id();
    let now = now_timestamp();

    sqlx::query(
        r#"
        INSERT INTO social_media (id, platform, url, is_active, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&link_id)
    .bind(&platform)
    .bind(&url)
    .bind(i64::from(input.is_active))
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    get_social_media(pool, &link_id).await
}

pub async fn update_social_media(
    pool: &AnyPool,
    link_id: &str,
    input: UpdateSocialMediaInput,
) -> AppResult<SocialMediaRecord> {
    let existing = get_social_media(pool, link_id).await?;

    let platform = match input.platform {
        Some(value) => normalize_platform(&value)?,
        None => existing.platform,
    };
    let url = match input.url {
        Some(value) => normalize_http_url(&value)?,
        None => existing.url,
    };
    let is_active = input.is_active.unwrap_or(existing.is_active == 1);

    sqlx::query(
        r#"
        UPDATE social_media
        SET platform = ?, url = ?, is_active = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&platform)
    .bind(&url)
    .bind(i64::from(is_active))
    .bind(now_timestamp())
    .bind(link_id)
    .execute(pool)
    .await?;

    get_social_media(pool, link_id).await
}

pub async fn delete_social_media(pool: &AnyPool, link_id: &str) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM social_media WHERE id = ?")
        .bind(link_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found(format!(
            "Réseau social '{link_id}' introuvable"
        )));
    }

    Ok(())
}

fn normalize_platform(value: &str) -> AppResult<String> {
    required_text(value, "La plateforme est requise").map(|platform| platform.to_lowercase())
}
