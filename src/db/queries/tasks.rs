use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use sqlx::query_builder::QueryBuilder;
use sqlx::{Any, AnyPool, Transaction};

use crate::db::models::{
    TaskClientRecord, TaskDetails, TaskPriority, TaskRecord, TaskStatus, TaskWithClients,
};
use crate::db::queries::history::{self, diff_field};
use crate::db::queries::{
    begin_write, checklist, comments, format_date, new_id, now_timestamp, required_text,
    search_pattern,
};
use crate::error::{AppError, AppResult};

const TASK_COLUMNS: &str = r#"
    t.id,
    t.title,
    t.description,
    t.status,
    t.priority,
    t.due_date,
    t.allow_comments,
    t.created_at,
    t.updated_at
"#;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TaskSort {
    #[default]
    CreatedAt,
    UpdatedAt,
    DueDate,
    Priority,
    Status,
    Title,
}

impl TaskSort {
    pub fn parse(value: &str) -> AppResult<Self> {
        match value.trim() {
            "createdAt" => Ok(Self::CreatedAt),
            "updatedAt" => Ok(Self::UpdatedAt),
            "dueDate" => Ok(Self::DueDate),
            "priority" => Ok(Self::Priority),
            "status" => Ok(Self::Status),
            "title" => Ok(Self::Title),
            other => Err(AppError::bad_request(format!("Tri invalide '{other}'"))),
        }
    }

    fn order_expression(self) -> &'static str {
        match self {
            Self::CreatedAt => "t.created_at",
            Self::UpdatedAt => "t.updated_at",
            Self::DueDate => "t.due_date",
            Self::Priority => {
                "CASE t.priority WHEN 'LOW' THEN 0 WHEN 'MEDIUM' THEN 1 WHEN 'HIGH' THEN 2 ELSE 3 END"
            }
            Self::Status => {
                "CASE t.status WHEN 'TODO' THEN 0 WHEN 'IN_PROGRESS' THEN 1 WHEN 'REVIEW' THEN 2 ELSE 3 END"
            }
            Self::Title => "LOWER(t.title)",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TaskFilters {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub client_id: Option<String>,
    pub search: Option<String>,
    /// Restricts the listing to tasks this user is a client of.
    pub member_id: Option<String>,
    pub sort: TaskSort,
    pub descending: bool,
}

#[derive(Debug, Clone)]
pub struct NewTaskInput {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<NaiveDate>,
    pub allow_comments: bool,
    pub client_ids: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateTaskInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    /// `Some(None)` clears the due date.
    pub due_date: Option<Option<NaiveDate>>,
    pub allow_comments: Option<bool>,
    pub client_ids: Option<Vec<String>>,
}

impl UpdateTaskInput {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.allow_comments.is_none()
            && self.client_ids.is_none()
    }
}

pub async fn list_tasks(
    pool: &AnyPool,
    filters: TaskFilters,
    limit: i64,
    offset: i64,
) -> AppResult<Vec<TaskWithClients>> {
    let mut query = QueryBuilder::<Any>::new(format!("SELECT {TASK_COLUMNS} FROM tasks t WHERE 1 = 1"));

    if let Some(status) = filters.status {
        query.push(" AND t.status = ");
        query.push_bind(status.as_str());
    }

    if let Some(priority) = filters.priority {
        query.push(" AND t.priority = ");
        query.push_bind(priority.as_str());
    }

    if let Some(member_id) = filters.member_id {
        query.push(
            " AND EXISTS (SELECT 1 FROM task_clients m WHERE m.task_id = t.id AND m.user_id = ",
        );
        query.push_bind(member_id);
        query.push(")");
    }

    if let Some(client_id) = filters.client_id {
        query.push(
            " AND EXISTS (SELECT 1 FROM task_clients c WHERE c.task_id = t.id AND c.user_id = ",
        );
        query.push_bind(client_id);
        query.push(")");
    }

    if let Some(pattern) = filters.search.as_deref().and_then(search_pattern) {
        query.push(" AND (LOWER(t.title) LIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR LOWER(t.description) LIKE ");
        query.push_bind(pattern);
        query.push(")");
    }

    let direction = if filters.descending { "DESC" } else { "ASC" };
    query.push(" ORDER BY ");
    if filters.sort == TaskSort::DueDate {
        query.push("CASE WHEN t.due_date IS NULL THEN 1 ELSE 0 END, ");
    }
    query.push(format!(
        "{} {direction}, t.created_at {direction}, t.id ASC LIMIT ",
        filters.sort.order_expression()
    ));
    query.push_bind(limit);
    query.push(" OFFSET ");
    query.push_bind(offset);

    let tasks = query.build_query_as::<TaskRecord>().fetch_all(pool).await?;
    attach_clients(pool, tasks).await
}

pub async fn create_task(pool: &AnyPool, input: NewTaskInput) -> AppResult<TaskWithClients> {
    let title = required_text(&input.title, "Le titre de la tâche est requis")?;
    let client_ids = normalize_client_ids(input.client_ids)?;

    let task_id = new_id();
    let now = now_timestamp();
    let mut tx = pool.begin().await?;

    ensure_users_exist(&mut tx, &client_ids).await?;

    sqlx::query(
        r#"
        INSERT INTO tasks (
            id,
            title,
            description,
            status,
            priority,
            due_date,
            allow_comments,
            created_at,
            updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&task_id)
    .bind(&title)
    .bind(input.description.trim())
    .bind(input.status.as_str())
    .bind(input.priority.as_str())
    .bind(input.due_date.map(format_date))
    .bind(i64::from(input.allow_comments))
    .bind(&now)
    .bind(&now)
    .execute(&mut *tx)
    .await?;

    insert_clients(&mut tx, &task_id, &client_ids).await?;

    tx.commit().await?;

    get_task_with_clients(pool, &task_id).await
}

pub async fn get_task(pool: &AnyPool, task_id: &str) -> AppResult<TaskRecord> {
    sqlx::query_as::<Any, TaskRecord>(&format!("SELECT {TASK_COLUMNS} FROM tasks t WHERE t.id = ?"))
        .bind(task_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Tâche '{task_id}' introuvable")))
}

pub async fn get_task_with_clients(pool: &AnyPool, task_id: &str) -> AppResult<TaskWithClients> {
    let task = get_task(pool, task_id).await?;
    let clients = list_task_clients(pool, task_id).await?;
    Ok(TaskWithClients { task, clients })
}

pub async fn get_task_details(pool: &AnyPool, task_id: &str) -> AppResult<TaskDetails> {
    let TaskWithClients { task, clients } = get_task_with_clients(pool, task_id).await?;
    let checklist = checklist::list_items(pool, task_id).await?;
    let comments = comments::list_comments(pool, task_id).await?;
    let history = history::list_task_history(pool, task_id).await?;

    Ok(TaskDetails {
        task,
        clients,
        checklist,
        comments,
        history,
    })
}

pub async fn is_task_member(pool: &AnyPool, task_id: &str, user_id: &str) -> AppResult<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM task_clients WHERE task_id = ? AND user_id = ?")
            .bind(task_id)
            .bind(user_id)
            .fetch_one(pool)
            .await?;

    Ok(count > 0)
}

/// Applies a partial update and appends one history row per changed field, atomically.
pub async fn update_task(
    pool: &AnyPool,
    task_id: &str,
    input: UpdateTaskInput,
    changed_by_id: &str,
) -> AppResult<TaskWithClients> {
    if input.is_empty() {
        return Err(AppError::bad_request(
            "Au moins un champ doit être fourni",
        ));
    }

    let title = input
        .title
        .as_deref()
        .map(|value| required_text(value, "Le titre de la tâche est requis"))
        .transpose()?;
    let client_ids = input.client_ids.map(normalize_client_ids).transpose()?;

    let mut tx = begin_write(pool, "tasks").await?;

    let current = sqlx::query_as::<Any, TaskRecord>(&format!(
        "SELECT {TASK_COLUMNS} FROM tasks t WHERE t.id = ?"
    ))
    .bind(task_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::not_found(format!("Tâche '{task_id}' introuvable")))?;

    let current_client_ids: Vec<String> = sqlx::query_scalar(
        "SELECT user_id FROM task_clients WHERE task_id = ? ORDER BY user_id ASC",
    )
    .bind(task_id)
    .fetch_all(&mut *tx)
    .await?;

    let next_title = title.unwrap_or_else(|| current.title.clone());
    let next_description = input
        .description
        .map(|value| value.trim().to_string())
        .unwrap_or_else(|| current.description.clone());
    let next_status = input
        .status
        .map(|status| status.as_str().to_string())
        .unwrap_or_else(|| current.status.clone());
    let next_priority = input
        .priority
        .map(|priority| priority.as_str().to_string())
        .unwrap_or_else(|| current.priority.clone());
    let next_due_date = match input.due_date {
        Some(value) => value.map(format_date),
        None => current.due_date.clone(),
    };
    let next_allow_comments = input
        .allow_comments
        .map(i64::from)
        .unwrap_or(current.allow_comments);

    let mut changes = Vec::new();
    diff_field(
        &mut changes,
        "title",
        Some(current.title),
        Some(next_title.clone()),
    );
    diff_field(
        &mut changes,
        "description",
        Some(current.description),
        Some(next_description.clone()),
    );
    diff_field(
        &mut changes,
        "status",
        Some(current.status),
        Some(next_status.clone()),
    );
    diff_field(
        &mut changes,
        "priority",
        Some(current.priority),
        Some(next_priority.clone()),
    );
    diff_field(
        &mut changes,
        "dueDate",
        current.due_date,
        next_due_date.clone(),
    );
    diff_field(
        &mut changes,
        "allowComments",
        Some(flag_label(current.allow_comments)),
        Some(flag_label(next_allow_comments)),
    );

    if let Some(client_ids) = client_ids.as_ref() {
        ensure_users_exist(&mut tx, client_ids).await?;
        diff_field(
            &mut changes,
            "clientIds",
            Some(current_client_ids.join(",")),
            Some(client_ids.join(",")),
        );
    }

    if changes.is_empty() {
        tx.rollback().await?;
        return get_task_with_clients(pool, task_id).await;
    }

    sqlx::query(
        r#"
        UPDATE tasks
        SET title = ?, description = ?, status = ?, priority = ?, due_date = ?, allow_comments = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&next_title)
    .bind(&next_description)
    .bind(&next_status)
    .bind(&next_priority)
    .bind(next_due_date)
    .bind(next_allow_comments)
    .bind(now_timestamp())
    .bind(task_id)
    .execute(&mut *tx)
    .await?;

    if let Some(client_ids) = client_ids.as_ref() {
        if changes.iter().any(|change| change.field == "clientIds") {
            sqlx::query("DELETE FROM task_clients WHERE task_id = ?")
                .bind(task_id)
                .execute(&mut *tx)
                .await?;
            insert_clients(&mut tx, task_id, client_ids).await?;
        }
    }

    history::insert_changes(&mut tx, task_id, changed_by_id, &changes).await?;

    tx.commit().await?;

    tracing::info!(
        task_id,
        fields = ?changes.iter().map(|change| change.field).collect::<Vec<_>>(),
        "task updated"
    );

    get_task_with_clients(pool, task_id).await
}

pub async fn delete_task(pool: &AnyPool, task_id: &str) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
        .bind(task_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found(format!("Tâche '{task_id}' introuvable")));
    }

    Ok(())
}

pub(crate) async fn ensure_task_exists(pool: &AnyPool, task_id: &str) -> AppResult<()> {
    get_task(pool, task_id).await.map(|_| ())
}

async fn list_task_clients(pool: &AnyPool, task_id: &str) -> AppResult<Vec<TaskClientRecord>> {
    let clients = sqlx::query_as::<Any, TaskClientRecord>(
        r#"
        SELECT tc.task_id, tc.user_id, u.name, u.email
        FROM task_clients tc
        INNER JOIN users u ON u.id = tc.user_id
        WHERE tc.task_id = ?
        ORDER BY u.name ASC
        "#,
    )
    .bind(task_id)
    .fetch_all(pool)
    .await?;

    Ok(clients)
}

async fn attach_clients(pool: &AnyPool, tasks: Vec<TaskRecord>) -> AppResult<Vec<TaskWithClients>> {
    if tasks.is_empty() {
        return Ok(Vec::new());
    }

    let mut query = QueryBuilder::<Any>::new(
        r#"
        SELECT tc.task_id, tc.user_id, u.name, u.email
        FROM task_clients tc
        INNER JOIN users u ON u.id = tc.user_id
        WHERE tc.task_id IN (
        "#,
    );
    {
        let mut separated = query.separated(", ");
        for task in &tasks {
            separated.push_bind(task.id.clone());
        }
    }
    query.push(") ORDER BY u.name ASC");

    let rows = query
        .build_query_as::<TaskClientRecord>()
        .fetch_all(pool)
        .await?;

    let mut by_task: HashMap<String, Vec<TaskClientRecord>> = HashMap::new();
    for row in rows {
        by_task.entry(row.task_id.clone()).or_default().push(row);
    }

    Ok(tasks
        .into_iter()
        .map(|task| {
            let clients = by_task.remove(&task.id).unwrap_or_default();
            TaskWithClients { task, clients }
        })
        .collect())
}

async fn ensure_users_exist(tx: &mut Transaction<'_, Any>, user_ids: &[String]) -> AppResult<()> {
    let mut query = QueryBuilder::<Any>::new("SELECT id FROM users WHERE id IN (");
    {
        let mut separated = query.separated(", ");
        for user_id in user_ids {
            separated.push_bind(user_id.clone());
        }
    }
    query.push(")");

    let found: BTreeSet<String> = query
        .build_query_scalar::<String>()
        .fetch_all(&mut **tx)
        .await?
        .into_iter()
        .collect();

    let missing: Vec<&str> = user_ids
        .iter()
        .filter(|user_id| !found.contains(*user_id))
        .map(String::as_str)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::bad_request(format!(
            "Client(s) introuvable(s) : {}",
            missing.join(", ")
        )))
    }
}

async fn insert_clients(
    tx: &mut Transaction<'_, Any>,
    task_id: &str,
    client_ids: &[String],
) -> AppResult<()> {
    for client_id in client_ids {
        sqlx::query("INSERT INTO task_clients (task_id, user_id) VALUES (?, ?)")
            .bind(task_id)
            .bind(client_id)
            .execute(&mut **tx)
            .await?;
    }

    Ok(())
}

/// Trims, dedupes and sorts client ids; a task always needs at least one client.
fn normalize_client_ids(client_ids: Vec<String>) -> AppResult<Vec<String>> {
    let normalized: BTreeSet<String> = client_ids
        .into_iter()
        .map(|client_id| client_id.trim().to_string())
        .filter(|client_id| !client_id.is_empty())
        .collect();

    if normalized.is_empty() {
        return Err(AppError::bad_request(
            "Au moins un client doit être assigné à la tâche",
        ));
    }

    Ok(normalized.into_iter().collect())
}

fn flag_label(value: i64) -> String {
    let label = if value == 0 { "false" } else { "true" };
    label.to_string()
}

#[cfg(test)]
mod tests {
    use crate::db::models::{TaskPriority, TaskStatus};
    use crate::db::queries::history;
    use crate::db::queries::tasks::{self, NewTaskInput, TaskFilters, TaskSort, UpdateTaskInput};
    use crate::error::AppError;
    use crate::testing::{seed_admin, seed_client, seed_task, setup_db};

    #[tokio::test]
    async fn create_task_requires_a_client() {
        let (_temp_dir, pool) = setup_db("tasks-no-client").await;

        let result = tasks::create_task(
            &pool,
            NewTaskInput {
                title: "Article".to_string(),
                description: String::new(),
                status: TaskStatus::Todo,
                priority: TaskPriority::Medium,
                due_date: None,
                allow_comments: true,
                client_ids: vec!["  ".to_string()],
            },
        )
        .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn create_task_rejects_unknown_clients() {
        let (_temp_dir, pool) = setup_db("tasks-unknown-client").await;
        let client = seed_client(&pool, "client@example.com").await;

        let result = tasks::create_task(
            &pool,
            NewTaskInput {
                title: "Article".to_string(),
                description: String::new(),
                status: TaskStatus::Todo,
                priority: TaskPriority::Medium,
                due_date: None,
                allow_comments: true,
                client_ids: vec![client.id, "ghost".to_string()],
            },
        )
        .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
        let listed = tasks::list_tasks(&pool, TaskFilters::default(), 50, 0)
            .await
            .expect("tasks should be listed");
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn any_status_transition_writes_one_history_row() {
        let (_temp_dir, pool) = setup_db("tasks-status").await;
        let admin = seed_admin(&pool).await;
        let client = seed_client(&pool, "client@example.com").await;
        let task = seed_task(&pool, "Reportage", &[client.id.clone()]).await;

        let transitions = [
            TaskStatus::Completed,
            TaskStatus::Todo,
            TaskStatus::Review,
            TaskStatus::InProgress,
        ];
        for (index, status) in transitions.into_iter().enumerate() {
            let updated = tasks::update_task(
                &pool,
                &task.task.id,
                UpdateTaskInput {
                    status: Some(status),
                    ..UpdateTaskInput::default()
                },
                &admin.id,
            )
            .await
            .expect("status update should succeed");
            assert_eq!(updated.task.status, status.as_str());

            let history = history::list_task_history(&pool, &task.task.id)
                .await
                .expect("history should be listed");
            assert_eq!(history.len(), index + 1);
            assert!(history.iter().all(|entry| entry.field == "status"));
        }

        let history = history::list_task_history(&pool, &task.task.id)
            .await
            .expect("history should be listed");
        let first = history
            .iter()
            .find(|entry| entry.new_value.as_deref() == Some("COMPLETED"))
            .expect("first transition should be recorded");
        assert_eq!(first.old_value.as_deref(), Some("TODO"));
        assert_eq!(first.changed_by_id.as_deref(), Some(admin.id.as_str()));
    }

    #[tokio::test]
    async fn update_records_each_changed_field_and_skips_noops() {
        let (_temp_dir, pool) = setup_db("tasks-diff").await;
        let admin = seed_admin(&pool).await;
        let alice = seed_client(&pool, "alice@example.com").await;
        let bob = seed_client(&pool, "bob@example.com").await;
        let task = seed_task(&pool, "Portrait", &[alice.id.clone()]).await;

        let updated = tasks::update_task(
            &pool,
            &task.task.id,
            UpdateTaskInput {
                title: Some("Portrait".to_string()),
                priority: Some(TaskPriority::Urgent),
                allow_comments: Some(false),
                client_ids: Some(vec![bob.id.clone(), alice.id.clone()]),
                ..UpdateTaskInput::default()
            },
            &admin.id,
        )
        .await
        .expect("update should succeed");
        assert_eq!(updated.clients.len(), 2);
        assert_eq!(updated.task.allow_comments, 0);

        let history = history::list_task_history(&pool, &task.task.id)
            .await
            .expect("history should be listed");
        let mut fields: Vec<&str> = history.iter().map(|entry| entry.field.as_str()).collect();
        fields.sort_unstable();
        assert_eq!(fields, vec!["allowComments", "clientIds", "priority"]);

        tasks::update_task(
            &pool,
            &task.task.id,
            UpdateTaskInput {
                priority: Some(TaskPriority::Urgent),
                ..UpdateTaskInput::default()
            },
            &admin.id,
        )
        .await
        .expect("noop update should succeed");
        let history = history::list_task_history(&pool, &task.task.id)
            .await
            .expect("history should be listed");
        assert_eq!(history.len(), 3);
    }

    #[tokio::test]
    async fn history_lists_later_updates_first_within_the_same_instant() {
        let (_temp_dir, pool) = setup_db("tasks-history-order").await;
        let admin = seed_admin(&pool).await;
        let client = seed_client(&pool, "client@example.com").await;
        let task = seed_task(&pool, "Affiche", &[client.id.clone()]).await;

        for input in [
            UpdateTaskInput {
                status: Some(TaskStatus::InProgress),
                ..UpdateTaskInput::default()
            },
            UpdateTaskInput {
                title: Some("Affiche A3".to_string()),
                ..UpdateTaskInput::default()
            },
        ] {
            tasks::update_task(&pool, &task.task.id, input, &admin.id)
                .await
                .expect("update should succeed");
        }

        sqlx::query("UPDATE task_history SET created_at = ? WHERE task_id = ?")
            .bind("2030-01-01T00:00:00.000Z")
            .bind(&task.task.id)
            .execute(&pool)
            .await
            .expect("timestamps should be aligned");

        let history = history::list_task_history(&pool, &task.task.id)
            .await
            .expect("history should be listed");
        let fields: Vec<&str> = history.iter().map(|entry| entry.field.as_str()).collect();
        assert_eq!(fields, vec!["title", "status"]);
    }

    #[tokio::test]
    async fn update_cannot_remove_every_client() {
        let (_temp_dir, pool) = setup_db("tasks-empty-clients").await;
        let admin = seed_admin(&pool).await;
        let client = seed_client(&pool, "client@example.com").await;
        let task = seed_task(&pool, "Portrait", &[client.id.clone()]).await;

        let result = tasks::update_task(
            &pool,
            &task.task.id,
            UpdateTaskInput {
                client_ids: Some(Vec::new()),
                ..UpdateTaskInput::default()
            },
            &admin.id,
        )
        .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn list_tasks_scopes_to_member_and_sorts() {
        let (_temp_dir, pool) = setup_db("tasks-list").await;
        seed_admin(&pool).await;
        let alice = seed_client(&pool, "alice@example.com").await;
        let bob = seed_client(&pool, "bob@example.com").await;
        seed_task(&pool, "Beta", &[alice.id.clone()]).await;
        seed_task(&pool, "Alpha", &[alice.id.clone(), bob.id.clone()]).await;
        seed_task(&pool, "Gamma", &[bob.id.clone()]).await;

        let for_alice = tasks::list_tasks(
            &pool,
            TaskFilters {
                member_id: Some(alice.id.clone()),
                sort: TaskSort::Title,
                ..TaskFilters::default()
            },
            50,
            0,
        )
        .await
        .expect("tasks should be listed");
        let titles: Vec<&str> = for_alice
            .iter()
            .map(|entry| entry.task.title.as_str())
            .collect();
        assert_eq!(titles, vec!["Alpha", "Beta"]);
        assert_eq!(for_alice[0].clients.len(), 2);

        let all = tasks::list_tasks(&pool, TaskFilters::default(), 50, 0)
            .await
            .expect("tasks should be listed");
        assert_eq!(all.len(), 3);

        let searched = tasks::list_tasks(
            &pool,
            TaskFilters {
                search: Some("gam".to_string()),
                ..TaskFilters::default()
            },
            50,
            0,
        )
        .await
        .expect("search should succeed");
        assert_eq!(searched.len(), 1);
    }

    #[tokio::test]
    async fn delete_task_cascades_history() {
        let (_temp_dir, pool) = setup_db("tasks-delete").await;
        let admin = seed_admin(&pool).await;
        let client = seed_client(&pool, "client@example.com").await;
        let task = seed_task(&pool, "Portrait", &[client.id.clone()]).await;
        tasks::update_task(
            &pool,
            &task.task.id,
            UpdateTaskInput {
                status: Some(TaskStatus::Review),
                ..UpdateTaskInput::default()
            },
            &admin.id,
        )
        .await
        .expect("update should succeed");

        tasks::delete_task(&pool, &task.task.id)
            .await
            .expect("delete should succeed");

        assert!(matches!(
            tasks::get_task(&pool, &task.task.id).await,
            Err(AppError::NotFound(_))
        ));
        let history = history::list_task_history(&pool, &task.task.id)
            .await
            .expect("history query should succeed");
        assert!(history.is_empty());
        assert!(matches!(
            tasks::delete_task(&pool, &task.task.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
