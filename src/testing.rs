//! Fixtures shared by the query and HTTP tests.

use std::time::Duration;

use chrono::Utc;

use jsonwebtoken::{EncodingKey, Header};
use serde::Serialize;
use sqlx::AnyPool;
use tempfile::{tempdir, TempDir};
use tokio::task::JoinHandle;

use crate::config::{AuthConfig, Config};
use crate::db;
use crate::db::models::{Role, TaskPriority, TaskStatus, TaskWithClients, UserRecord};
use crate::db::queries::tasks::{self, NewTaskInput};
use crate::db::queries::users::{self, NewUserInput};
use crate::state::AppState;

pub const TEST_JWT_SECRET: &str = "test-secret-for-aurore";
pub const ADMIN_EMAIL: &str = "aurore@example.com";

pub fn test_config(db_url: String) -> Config {
    Config {
        port: 0,
        db_url,
        log_level: "info".to_string(),
        auth: AuthConfig {
            jwt_secret: TEST_JWT_SECRET.to_string(),
            issuer: None,
            audience: None,
            admin_emails: vec![ADMIN_EMAIL.to_string()],
        },
        cors_origins: Vec::new(),
        max_request_body_bytes: 1024 * 1024,
    }
}

pub async fn setup_db(db_name: &str) -> (TempDir, AnyPool) {
    let (temp_dir, config) = temp_config(db_name);
    let pool = db::connect_and_migrate(&config)
        .await
        .expect("database should initialize");

    (temp_dir, pool)
}

pub fn temp_config(db_name: &str) -> (TempDir, Config) {
    let temp_dir = tempdir().expect("tempdir should be created");
    let db_path = temp_dir.path().join(format!("{db_name}.db"));
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    (temp_dir, test_config(db_url))
}

pub async fn seed_admin(pool: &AnyPool) -> UserRecord {
    users::create_user(
        pool,
        NewUserInput {
            email: ADMIN_EMAIL.to_string(),
            name: "Aurore De Granier".to_string(),
            role: Role::Admin,
            category_id: None,
        },
    )
    .await
    .expect("admin should be created")
}

pub async fn seed_client(pool: &AnyPool, email: &str) -> UserRecord {
    let name = email.split('@').next().unwrap_or(email).to_string();
    users::create_user(
        pool,
        NewUserInput {
            email: email.to_string(),
            name,
            role: Role::Client,
            category_id: None,
        },
    )
    .await
    .expect("client should be created")
}

pub async fn seed_task(
    pool: &AnyPool,
    title: &str,
    client_ids: &[String],
) -> TaskWithClients {
    tasks::create_task(
        pool,
        NewTaskInput {
            title: title.to_string(),
            description: String::new(),
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            due_date: None,
            allow_comments: true,
            client_ids: client_ids.to_vec(),
        },
    )
    .await
    .expect("task should be created")
}

#[derive(Debug, Serialize)]
struct TestClaims<'a> {
    sub: &'a str,
    email: &'a str,
    exp: i64,
}

pub fn bearer_token(email: &str) -> String {
    bearer_token_with_secret(email, TEST_JWT_SECRET)
}

pub fn bearer_token_with_secret(email: &str, secret: &str) -> String {
    let exp = (Utc::now() + chrono::Duration::hours(1)).timestamp();

    jsonwebtoken::encode(
        &Header::default(),
        &TestClaims {
            sub: email,
            email,
            exp,
        },
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("token should encode")
}

/// Serves the full application on an ephemeral port.
pub async fn spawn_app(config: Config, pool: AnyPool) -> (String, JoinHandle<()>) {
    let state = AppState::new(config, pool);
    let app = crate::api::app(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let addr = listener
        .local_addr()
        .expect("listener address should be readable");
    let server = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (format!("http://{addr}"), server)
}

pub fn test_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .expect("client should build")
}
