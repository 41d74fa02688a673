//! Read access to the user's job-search records, plus the bulk per-table
//! operations the account endpoints need. Everything is keyed by `user_id`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::models::records::{
    ContentPostRow, GoalRow, JobApplicationRow, LearningLogRow, ProjectRow, RecruiterRow,
};

pub mod postgres;

pub use postgres::PgRecordStore;

/// Every table that holds rows owned by a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserTable {
    JobApplications,
    Recruiters,
    LearningLogs,
    Projects,
    ContentPosts,
    Goals,
    WeeklyReviews,
    Profiles,
}

impl UserTable {
    pub const ALL: [UserTable; 8] = [
        UserTable::JobApplications,
        UserTable::Recruiters,
        UserTable::LearningLogs,
        UserTable::Projects,
        UserTable::ContentPosts,
        UserTable::Goals,
        UserTable::WeeklyReviews,
        UserTable::Profiles,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserTable::JobApplications => "job_applications",
            UserTable::Recruiters => "recruiters",
            UserTable::LearningLogs => "learning_logs",
            UserTable::Projects => "projects",
            UserTable::ContentPosts => "content_posts",
            UserTable::Goals => "goals",
            UserTable::WeeklyReviews => "weekly_reviews",
            UserTable::Profiles => "profiles",
        }
    }
}

/// Bounds for a category read: optional `[since, until)` on `created_at`
/// and a hard row cap. Results are always most-recent-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordWindow {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: i64,
}

impl RecordWindow {
    pub fn since(since: DateTime<Utc>, limit: i64) -> Self {
        Self {
            since: Some(since),
            until: None,
            limit,
        }
    }

    pub fn between(since: DateTime<Utc>, until: DateTime<Utc>, limit: i64) -> Self {
        Self {
            since: Some(since),
            until: Some(until),
            limit,
        }
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn display_name(&self, user_id: Uuid) -> Result<Option<String>, sqlx::Error>;

    async fn job_applications(
        &self,
        user_id: Uuid,
        window: RecordWindow,
    ) -> Result<Vec<JobApplicationRow>, sqlx::Error>;

    async fn recruiters(
        &self,
        user_id: Uuid,
        window: RecordWindow,
    ) -> Result<Vec<RecruiterRow>, sqlx::Error>;

    async fn learning_logs(
        &self,
        user_id: Uuid,
        window: RecordWindow,
    ) -> Result<Vec<LearningLogRow>, sqlx::Error>;

    /// Not date-bounded; most recently updated first.
    async fn projects(&self, user_id: Uuid, limit: i64) -> Result<Vec<ProjectRow>, sqlx::Error>;

    async fn content_posts(
        &self,
        user_id: Uuid,
        window: RecordWindow,
    ) -> Result<Vec<ContentPostRow>, sqlx::Error>;

    /// Goals with `status = 'active'` only.
    async fn active_goals(&self, user_id: Uuid, limit: i64) -> Result<Vec<GoalRow>, sqlx::Error>;

    /// All rows of `table` owned by the user, as JSON objects.
    async fn export_table(&self, table: UserTable, user_id: Uuid)
        -> Result<Vec<Value>, sqlx::Error>;

    async fn delete_rows(&self, table: UserTable, user_id: Uuid) -> Result<u64, sqlx::Error>;

    /// Moves ownership of every row in `table` from one user id to another.
    async fn reassign_rows(
        &self,
        table: UserTable,
        from: Uuid,
        to: Uuid,
    ) -> Result<u64, sqlx::Error>;
}
