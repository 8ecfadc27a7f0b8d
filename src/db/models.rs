use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Client,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Client => "CLIENT",
        }
    }

    pub fn parse(value: &str) -> AppResult<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Self::Admin),
            "CLIENT" => Ok(Self::Client),
            _ => Err(AppError::bad_request(format!("Rôle invalide '{value}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Review,
    Completed,
}

impl TaskStatus {
    pub const ALL: [Self; 4] = [Self::Todo, Self::InProgress, Self::Review, Self::Completed];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "TODO",
            Self::InProgress => "IN_PROGRESS",
            Self::Review => "REVIEW",
            Self::Completed => "COMPLETED",
        }
    }

    pub fn parse(value: &str) -> AppResult<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == value.trim().to_ascii_uppercase())
            .ok_or_else(|| AppError::bad_request(format!("Statut de tâche invalide '{value}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    pub const ALL: [Self; 4] = [Self::Low, Self::Medium, Self::High, Self::Urgent];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Urgent => "URGENT",
        }
    }

    pub fn parse(value: &str) -> AppResult<Self> {
        Self::ALL
            .into_iter()
            .find(|priority| priority.as_str() == value.trim().to_ascii_uppercase())
            .ok_or_else(|| {
                AppError::bad_request(format!("Priorité de tâche invalide '{value}'"))
            })
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: String,
    pub category_id: Option<String>,
    pub category_name: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl UserRecord {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin.as_str()
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CategoryRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    pub color: String,
    pub client_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TaskRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: String,
    pub priority: String,
    pub due_date: Option<String>,
    pub allow_comments: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TaskClientRecord {
    pub task_id: String,
    pub user_id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ChecklistItemRecord {
    pub id: String,
    pub task_id: String,
    pub title: String,
    pub is_completed: i64,
    pub sort_order: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CommentRecord {
    pub id: String,
    pub task_id: String,
    pub author_id: Option<String>,
    pub author_name: Option<String>,
    pub content: String,
    pub is_from_client: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TaskHistoryRecord {
    pub id: String,
    pub task_id: String,
    pub field: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub changed_by_id: Option<String>,
    pub changed_by_name: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ContactHoursRecord {
    pub id: String,
    pub day_of_week: i64,
    pub start_time: String,
    pub end_time: String,
    pub is_active: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ContactInfoRecord {
    pub id: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub is_active: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct VacationRecord {
    pub id: String,
    pub start_date: String,
    pub end_date: String,
    pub title: String,
    pub description: String,
    pub is_active: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SocialMediaRecord {
    pub id: String,
    pub platform: String,
    pub url: String,
    pub is_active: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// A task with its clients, used by list views.
#[derive(Debug, Clone)]
pub struct TaskWithClients {
    pub task: TaskRecord,
    pub clients: Vec<TaskClientRecord>,
}

#[derive(Debug, Clone)]
pub struct TaskDetails {
    pub task: TaskRecord,
    pub clients: Vec<TaskClientRecord>,
    pub checklist: Vec<ChecklistItemRecord>,
    pub comments: Vec<CommentRecord>,
    pub history: Vec<TaskHistoryRecord>,
}

#[derive(Debug, Clone)]
pub struct DashboardSummary {
    pub client_count: i64,
    pub category_count: i64,
    pub todo_count: i64,
    pub in_progress_count: i64,
    pub review_count: i64,
    pub completed_count: i64,
    pub overdue_count: i64,
    pub upcoming: Vec<TaskRecord>,
}
