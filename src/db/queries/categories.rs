use std::sync::OnceLock;

use regex::Regex;
use sqlx::{Any, AnyPool, Executor};

use crate::db::models::CategoryRecord;
use crate::db::queries::{new_id, now_timestamp, required_text};
use crate::error::{AppError, AppResult};

pub const DEFAULT_COLOR: &str = "#6B7280";

const CATEGORY_SELECT: &str = r#"
    SELECT
        c.id,
        c.name,
        c.description,
        c.color,
        (SELECT COUNT(*) FROM users u WHERE u.category_id = c.id) AS client_count,
        c.created_at,
        c.updated_at
    FROM client_categories c
"#;

#[derive(Debug, Clone)]
pub struct CategoryInput {
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpdateCategoryInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
}

pub async fn list_categories(pool: &AnyPool) -> AppResult<Vec<CategoryRecord>> {
    let categories =
        sqlx::query_as::<Any, CategoryRecord>(&format!("{CATEGORY_SELECT} ORDER BY c.name ASC"))
            .fetch_all(pool)
            .await?;

    Ok(categories)
}

pub async fn get_category(pool: &AnyPool, category_id: &str) -> AppResult<CategoryRecord> {
    sqlx::query_as::<Any, CategoryRecord>(&format!("{CATEGORY_SELECT} WHERE c.id = ?"))
        .bind(category_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Catégorie '{category_id}' introuvable")))
}

pub async fn create_category(pool: &AnyPool, input: CategoryInput) -> AppResult<CategoryRecord> {
    let name = required_text(&input.name, "Le nom de la catégorie est requis")?;
    let color = match input.color {
        Some(value) => normalize_color(&value)?,
        None => DEFAULT_COLOR.to_string(),
    };
    let description = input.description.unwrap_or_default().trim().to_string();

    let category_id = new_id();
    let now = now_timestamp();

    sqlx::query(
        r#"
        INSERT INTO client_categories (id, name, description, color, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&category_id)
    .bind(&name)
    .bind(&description)
    .bind(&color)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    get_category(pool, &category_id).await
}

pub async fn update_category(
    pool: &AnyPool,
    category_id: &str,
    input: UpdateCategoryInput,
) -> AppResult<CategoryRecord> {
    let existing = get_category(pool, category_id).await?;

    let name = match input.name {
        Some(value) => required_text(&value, "Le nom de la catégorie est requis")?,
        None => existing.name,
    };
    let description = input
        .description
        .map(|value| value.trim().to_string())
        .unwrap_or(existing.description);
    let color = match input.color {
        Some(value) => normalize_color(&value)?,
        None => existing.color,
    };

    sqlx::query(
        r#"
        UPDATE client_categories
        SET name = ?, description = ?, color = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&name)
    .bind(&description)
    .bind(&color)
    .bind(now_timestamp())
    .bind(category_id)
    .execute(pool)
    .await?;

    get_category(pool, category_id).await
}

pub async fn delete_category(pool: &AnyPool, category_id: &str) -> AppResult<()> {
    let category = get_category(pool, category_id).await?;
    if category.client_count > 0 {
        return Err(AppError::bad_request(format!(
            "Impossible de supprimer la catégorie '{}' : {} client(s) y sont encore associés",
            category.name, category.client_count
        )));
    }

    let result = sqlx::query("DELETE FROM client_categories WHERE id = ?")
        .bind(category_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found(format!(
            "Catégorie '{category_id}' introuvable"
        )));
    }

    Ok(())
}

/// Rejects a category reference that does not resolve, inside the caller's transaction.
pub(crate) async fn ensure_category_exists<'e, E>(executor: E, category_id: &str) -> AppResult<()>
where
    E: Executor<'e, Database = Any>,
{
    let found: Option<String> = sqlx::query_scalar("SELECT id FROM client_categories WHERE id = ?")
        .bind(category_id)
        .fetch_optional(executor)
        .await?;

    match found {
        Some(_) => Ok(()),
        None => Err(AppError::bad_request(format!(
            "Catégorie '{category_id}' introuvable"
        ))),
    }
}

fn normalize_color(value: &str) -> AppResult<String> {
    static COLOR_PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = COLOR_PATTERN
        .get_or_init(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("color pattern is valid"));

    let trimmed = value.trim();
    if pattern.is_match(trimmed) {
        Ok(trimmed.to_ascii_uppercase())
    } else {
        Err(AppError::bad_request(format!(
            "Couleur invalide '{trimmed}', format attendu #RRGGBB"
        )))
    }
}
