//! In-memory fakes of the collaborator traits, and a router harness for
//! end-to-end handler tests. Compiled only for tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use crate::auth::provider::{IdentityProvider, IdentityProviderError};
use crate::auth::{IdentityResolver, UserIdentity};
use crate::config::Config;
use crate::llm_client::{CompletionBackend, CompletionRequest, LlmError};
use crate::models::records::{
    ContentPostRow, GoalRow, JobApplicationRow, LearningLogRow, ProjectRow, RecruiterRow,
};
use crate::rate_limit::InMemoryRateLimiter;
use crate::records::{RecordStore, RecordWindow, UserTable};
use crate::routes::build_router;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Identity provider
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeIdentityProvider {
    sessions: Mutex<HashMap<String, UserIdentity>>,
    users: Mutex<HashMap<Uuid, UserIdentity>>,
    deleted: Mutex<Vec<Uuid>>,
    fail_deletes: Mutex<bool>,
}

impl FakeIdentityProvider {
    /// A token that passes full session verification.
    pub fn add_session(&self, token: &str, user: UserIdentity) {
        self.add_user(user.clone());
        self.sessions.lock().unwrap().insert(token.to_string(), user);
    }

    /// A user known to the admin API only.
    pub fn add_user(&self, user: UserIdentity) {
        self.users.lock().unwrap().insert(user.id, user);
    }

    pub fn deleted(&self) -> Vec<Uuid> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn fail_deletes(&self) {
        *self.fail_deletes.lock().unwrap() = true;
    }

    pub fn find_by_email(&self, email: &str) -> Option<UserIdentity> {
        self.users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email.as_deref() == Some(email))
            .cloned()
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    async fn verify_session(
        &self,
        token: &str,
    ) -> Result<Option<UserIdentity>, IdentityProviderError> {
        Ok(self.sessions.lock().unwrap().get(token).cloned())
    }

    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<UserIdentity>, IdentityProviderError> {
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }

    async fn create_user(
        &self,
        email: &str,
        _password: &str,
    ) -> Result<UserIdentity, IdentityProviderError> {
        if self.find_by_email(email).is_some() {
            return Err(IdentityProviderError::Api {
                status: 422,
                message: "A user with this email address has already been registered".to_string(),
            });
        }
        let user = UserIdentity {
            id: Uuid::new_v4(),
            is_anonymous: false,
            email: Some(email.to_string()),
        };
        self.add_user(user.clone());
        Ok(user)
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), IdentityProviderError> {
        if *self.fail_deletes.lock().unwrap() {
            return Err(IdentityProviderError::Api {
                status: 500,
                message: "admin API unavailable".to_string(),
            });
        }
        self.users.lock().unwrap().remove(&id);
        self.deleted.lock().unwrap().push(id);
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Record store
// ────────────────────────────────────────────────────────────────────────────

/// Returns every pushed row regardless of user, capped by the window limit.
#[derive(Default)]
pub struct FakeRecordStore {
    display_name: Mutex<Option<String>>,
    jobs: Mutex<Vec<JobApplicationRow>>,
    recruiters: Mutex<Vec<RecruiterRow>>,
    learning: Mutex<Vec<LearningLogRow>>,
    projects: Mutex<Vec<ProjectRow>>,
    content: Mutex<Vec<ContentPostRow>>,
    goals: Mutex<Vec<GoalRow>>,
    job_windows: Mutex<Vec<RecordWindow>>,
    failing: Mutex<HashSet<String>>,
    tables: Mutex<HashMap<(UserTable, Uuid), Vec<Value>>>,
    latency: Mutex<Duration>,
}

impl FakeRecordStore {
    pub fn set_display_name(&self, name: &str) {
        *self.display_name.lock().unwrap() = Some(name.to_string());
    }

    pub fn push_job(&self, row: JobApplicationRow) {
        self.jobs.lock().unwrap().push(row);
    }

    pub fn push_learning(&self, row: LearningLogRow) {
        self.learning.lock().unwrap().push(row);
    }

    pub fn push_project(&self, row: ProjectRow) {
        self.projects.lock().unwrap().push(row);
    }

    /// Makes reads of a category (or bulk ops on a table of that name) fail.
    pub fn fail_category(&self, name: &str) {
        self.failing.lock().unwrap().insert(name.to_string());
    }

    /// Every read sleeps this long first (tokio time, so paused tests stay instant).
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = latency;
    }

    async fn pause(&self) {
        let latency = *self.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }

    pub fn job_windows(&self) -> Vec<RecordWindow> {
        self.job_windows.lock().unwrap().clone()
    }

    pub fn insert_rows(&self, table: UserTable, user_id: Uuid, rows: Vec<Value>) {
        self.tables.lock().unwrap().insert((table, user_id), rows);
    }

    pub fn rows(&self, table: UserTable, user_id: Uuid) -> Vec<Value> {
        self.tables
            .lock()
            .unwrap()
            .get(&(table, user_id))
            .cloned()
            .unwrap_or_default()
    }

    fn check(&self, name: &str) -> Result<(), sqlx::Error> {
        if self.failing.lock().unwrap().contains(name) {
            return Err(sqlx::Error::PoolTimedOut);
        }
        Ok(())
    }

    fn read<T: Clone>(&self, name: &str, rows: &Mutex<Vec<T>>, limit: i64) -> Result<Vec<T>, sqlx::Error> {
        self.check(name)?;
        Ok(rows
            .lock()
            .unwrap()
            .iter()
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RecordStore for FakeRecordStore {
    async fn display_name(&self, _user_id: Uuid) -> Result<Option<String>, sqlx::Error> {
        self.pause().await;
        self.check("profiles")?;
        Ok(self.display_name.lock().unwrap().clone())
    }

    async fn job_applications(
        &self,
        _user_id: Uuid,
        window: RecordWindow,
    ) -> Result<Vec<JobApplicationRow>, sqlx::Error> {
        self.job_windows.lock().unwrap().push(window);
        self.pause().await;
        self.read("job_applications", &self.jobs, window.limit)
    }

    async fn recruiters(
        &self,
        _user_id: Uuid,
        window: RecordWindow,
    ) -> Result<Vec<RecruiterRow>, sqlx::Error> {
        self.pause().await;
        self.read("recruiters", &self.recruiters, window.limit)
    }

    async fn learning_logs(
        &self,
        _user_id: Uuid,
        window: RecordWindow,
    ) -> Result<Vec<LearningLogRow>, sqlx::Error> {
        self.pause().await;
        self.read("learning_logs", &self.learning, window.limit)
    }

    async fn projects(&self, _user_id: Uuid, limit: i64) -> Result<Vec<ProjectRow>, sqlx::Error> {
        self.pause().await;
        self.read("projects", &self.projects, limit)
    }

    async fn content_posts(
        &self,
        _user_id: Uuid,
        window: RecordWindow,
    ) -> Result<Vec<ContentPostRow>, sqlx::Error> {
        self.pause().await;
        self.read("content_posts", &self.content, window.limit)
    }

    async fn active_goals(&self, _user_id: Uuid, limit: i64) -> Result<Vec<GoalRow>, sqlx::Error> {
        self.pause().await;
        self.read("goals", &self.goals, limit)
    }

    async fn export_table(
        &self,
        table: UserTable,
        user_id: Uuid,
    ) -> Result<Vec<Value>, sqlx::Error> {
        self.check(table.as_str())?;
        Ok(self.rows(table, user_id))
    }

    async fn delete_rows(&self, table: UserTable, user_id: Uuid) -> Result<u64, sqlx::Error> {
        self.check(table.as_str())?;
        let removed = self.tables.lock().unwrap().remove(&(table, user_id));
        Ok(removed.map_or(0, |rows| rows.len() as u64))
    }

    async fn reassign_rows(
        &self,
        table: UserTable,
        from: Uuid,
        to: Uuid,
    ) -> Result<u64, sqlx::Error> {
        self.check(table.as_str())?;
        let mut tables = self.tables.lock().unwrap();
        let Some(rows) = tables.remove(&(table, from)) else {
            return Ok(0);
        };
        let moved = rows.len() as u64;
        tables.entry((table, to)).or_default().extend(rows);
        Ok(moved)
    }
}

pub fn sample_job(company: &str, role: &str, status: &str) -> JobApplicationRow {
    JobApplicationRow {
        id: Uuid::new_v4(),
        company: company.to_string(),
        role: role.to_string(),
        status: status.to_string(),
        applied_date: None,
        notes: None,
        created_at: Utc::now(),
    }
}

pub fn sample_learning(topic: &str, minutes: i32) -> LearningLogRow {
    LearningLogRow {
        id: Uuid::new_v4(),
        topic: topic.to_string(),
        category: None,
        duration_minutes: minutes,
        takeaways: None,
        log_date: Utc::now().date_naive(),
        created_at: Utc::now(),
    }
}

pub fn sample_project(name: &str, status: &str) -> ProjectRow {
    ProjectRow {
        id: Uuid::new_v4(),
        name: name.to_string(),
        status: status.to_string(),
        description: None,
        tech_stack: None,
        updated_at: Utc::now(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Completion backend
// ────────────────────────────────────────────────────────────────────────────

enum Reply {
    Text(String),
    ApiError { status: u16, message: String },
    Unconfigured,
}

pub struct FakeCompletion {
    reply: Reply,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl FakeCompletion {
    fn with(reply: Reply) -> Self {
        Self {
            reply,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(text: &str) -> Self {
        Self::with(Reply::Text(text.to_string()))
    }

    pub fn failing(status: u16, message: &str) -> Self {
        Self::with(Reply::ApiError {
            status,
            message: message.to_string(),
        })
    }

    pub fn unconfigured() -> Self {
        Self::with(Reply::Unconfigured)
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionBackend for FakeCompletion {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        match &self.reply {
            Reply::Text(text) => Ok(text.clone()),
            Reply::ApiError { status, message } => Err(LlmError::Api {
                status: *status,
                message: message.clone(),
            }),
            Reply::Unconfigured => Err(LlmError::MissingApiKey),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Router harness
// ────────────────────────────────────────────────────────────────────────────

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/huntlog_test".to_string(),
        supabase_url: "http://localhost:54321".to_string(),
        supabase_anon_key: "anon".to_string(),
        supabase_service_role_key: "service".to_string(),
        openai_api_key: None,
        allowed_origins: vec![
            "https://app.huntlog.dev".to_string(),
            "http://localhost:5173".to_string(),
        ],
        port: 0,
        rust_log: "debug".to_string(),
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub struct TestApp {
    pub identity: Arc<FakeIdentityProvider>,
    pub records: Arc<FakeRecordStore>,
    pub llm: Arc<FakeCompletion>,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_llm(FakeCompletion::replying("You're making steady progress."))
    }

    pub fn with_llm(llm: FakeCompletion) -> Self {
        let identity = Arc::new(FakeIdentityProvider::default());
        let records = Arc::new(FakeRecordStore::default());
        let llm = Arc::new(llm);
        let state = AppState {
            config: test_config(),
            identity: IdentityResolver::new(identity.clone()),
            records: records.clone(),
            llm: llm.clone(),
            rate_limiter: Arc::new(InMemoryRateLimiter::new()),
        };
        Self {
            identity,
            records,
            llm,
            router: build_router(state),
        }
    }

    /// Registers a user with a verifiable session and returns its token.
    pub fn sign_in(&self, is_anonymous: bool) -> (UserIdentity, String) {
        let user = UserIdentity {
            id: Uuid::new_v4(),
            is_anonymous,
            email: (!is_anonymous).then(|| "seeker@example.com".to_string()),
        };
        let token = format!("session-{}", user.id);
        self.identity.add_session(&token, user.clone());
        (user, token)
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .header("origin", "http://localhost:5173");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let body = body.map_or_else(Body::empty, |b| Body::from(b.to_string()));
        self.send(builder.body(body).unwrap()).await
    }
}
