use sqlx::query_builder::QueryBuilder;
use sqlx::{Any, AnyPool};

use crate::db::models::{Role, UserRecord};
use crate::db::queries::categories::ensure_category_exists;
use crate::db::queries::{
    begin_write, new_id, normalize_email, now_timestamp, required_text, search_pattern,
};
use crate::error::{AppError, AppResult};

const USER_SELECT: &str = r#"
    SELECT
        u.id,
        u.email,
        u.name,
        u.role,
        u.category_id,
        c.name AS category_name,
        u.created_at,
        u.updated_at
    FROM users u
    LEFT JOIN client_categories c ON c.id = u.category_id
"#;

#[derive(Debug, Clone, Default)]
pub struct UserFilters {
    pub role: Option<Role>,
    pub category_id: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewUserInput {
    pub email: String,
    pub name: String,
    pub role: Role,
    pub category_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateUserInput {
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: Option<Role>,
    /// `Some(None)` detaches the user from its category.
    pub category_id: Option<Option<String>>,
}

pub async fn list_users(
    pool: &AnyPool,
    filters: UserFilters,
    limit: i64,
    offset: i64,
) -> AppResult<Vec<UserRecord>> {
    let mut query = QueryBuilder::<Any>::new(USER_SELECT);
    query.push(" WHERE 1 = 1");

    if let Some(role) = filters.role {
        query.push(" AND u.role = ");
        query.push_bind(role.as_str());
    }

    if let Some(category_id) = filters.category_id {
        query.push(" AND u.category_id = ");
        query.push_bind(category_id);
    }

    if let Some(pattern) = filters.search.as_deref().and_then(search_pattern) {
        query.push(" AND (LOWER(u.name) LIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR LOWER(u.email) LIKE ");
        query.push_bind(pattern);
        query.push(")");
    }

    query.push(" ORDER BY u.name ASC, u.created_at ASC LIMIT ");
    query.push_bind(limit);
    query.push(" OFFSET ");
    query.push_bind(offset);

    let users = query.build_query_as::<UserRecord>().fetch_all(pool).await?;
    Ok(users)
}

pub async fn get_user(pool: &AnyPool, user_id: &str) -> AppResult<UserRecord> {
    sqlx::query_as::<Any, UserRecord>(&format!("{USER_SELECT} WHERE u.id = ?"))
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Utilisateur '{user_id}' introuvable")))
}

pub async fn find_user_by_email(pool: &AnyPool, email: &str) -> AppResult<Option<UserRecord>> {
    let user = sqlx::query_as::<Any, UserRecord>(&format!("{USER_SELECT} WHERE u.email = ?"))
        .bind(email.trim().to_lowercase())
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

pub async fn create_user(pool: &AnyPool, input: NewUserInput) -> AppResult<UserRecord> {
    let email = normalize_email(&input.email)?;
    let name = required_text(&input.name, "Le nom est requis")?;

    if let Some(category_id) = input.category_id.as_deref() {
        ensure_category_exists(pool, category_id).await?;
    }

    let user_id = new_id();
    let now = now_timestamp();

    sqlx::query(
        r#"
        INSERT INTO users (id, email, name, password_hash, role, category_id, created_at, updated_at)
        VALUES (?, ?, ?, NULL, ?, ?, ?, ?)
        "#,
    )
    .bind(&user_id)
    .bind(&email)
    .bind(&name)
    .bind(input.role.as_str())
    .bind(input.category_id)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    get_user(pool, &user_id).await
}

pub async fn update_user(
    pool: &AnyPool,
    user_id: &str,
    input: UpdateUserInput,
) -> AppResult<UserRecord> {
    let existing = get_user(pool, user_id).await?;

    let email = match input.email {
        Some(value) => normalize_email(&value)?,
        None => existing.email,
    };
    let name = match input.name {
        Some(value) => required_text(&value, "Le nom est requis")?,
        None => existing.name,
    };
    let role = input.role.map(Role::as_str).unwrap_or(existing.role.as_str());
    let category_id = match input.category_id {
        Some(Some(category_id)) => {
            ensure_category_exists(pool, &category_id).await?;
            Some(category_id)
        }
        Some(None) => None,
        None => existing.category_id,
    };

    sqlx::query(
        r#"
        UPDATE users
        SET email = ?, name = ?, role = ?, category_id = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&email)
    .bind(&name)
    .bind(role)
    .bind(category_id)
    .bind(now_timestamp())
    .bind(user_id)
    .execute(pool)
    .await?;

    get_user(pool, user_id).await
}

pub async fn delete_user(pool: &AnyPool, user_id: &str, acting_user_id: &str) -> AppResult<()> {
    if user_id == acting_user_id {
        return Err(AppError::bad_request(
            "Vous ne pouvez pas supprimer votre propre compte",
        ));
    }

    // Task membership is locked so a concurrent delete cannot strip a task's last client.
    let mut tx = begin_write(pool, "task_clients").await?;

    let sole_client_tasks: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM task_clients tc
        WHERE tc.user_id = ?
            AND (SELECT COUNT(*) FROM task_clients other WHERE other.task_id = tc.task_id) = 1
        "#,
    )
    .bind(user_id)
    .fetch_one(&mut *tx)
    .await?;

    if sole_client_tasks > 0 {
        return Err(AppError::bad_request(format!(
            "Ce client est le seul assigné à {sole_client_tasks} tâche(s), réassignez-les avant de le supprimer"
        )));
    }

    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found(format!(
            "Utilisateur '{user_id}' introuvable"
        )));
    }

    tx.commit().await?;
    tracing::info!(user_id, "user deleted");

    Ok(())
}
