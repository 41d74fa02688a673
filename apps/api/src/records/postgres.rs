use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::records::{
    ContentPostRow, GoalRow, JobApplicationRow, LearningLogRow, ProjectRow, RecruiterRow,
};
use crate::records::{RecordStore, RecordWindow, UserTable};

/// `RecordStore` over the platform's Postgres database.
/// Table names are only ever interpolated from [`UserTable::as_str`].
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn display_name(&self, user_id: Uuid) -> Result<Option<String>, sqlx::Error> {
        let name: Option<Option<String>> =
            sqlx::query_scalar("SELECT full_name FROM profiles WHERE user_id = $1 LIMIT 1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(name.flatten().filter(|n| !n.trim().is_empty()))
    }

    async fn job_applications(
        &self,
        user_id: Uuid,
        window: RecordWindow,
    ) -> Result<Vec<JobApplicationRow>, sqlx::Error> {
        sqlx::query_as::<_, JobApplicationRow>(
            r#"
            SELECT id, company, role, status, applied_date, notes, created_at
            FROM job_applications
            WHERE user_id = $1
              AND ($2::timestamptz IS NULL OR created_at >= $2)
              AND ($3::timestamptz IS NULL OR created_at < $3)
            ORDER BY created_at DESC
            LIMIT $4
            "#,
        )
        .bind(user_id)
        .bind(window.since)
        .bind(window.until)
        .bind(window.limit)
        .fetch_all(&self.pool)
        .await
    }

    async fn recruiters(
        &self,
        user_id: Uuid,
        window: RecordWindow,
    ) -> Result<Vec<RecruiterRow>, sqlx::Error> {
        sqlx::query_as::<_, RecruiterRow>(
            r#"
            SELECT id, name, company, status, last_contact_date, notes, created_at
            FROM recruiters
            WHERE user_id = $1
              AND ($2::timestamptz IS NULL OR created_at >= $2)
              AND ($3::timestamptz IS NULL OR created_at < $3)
            ORDER BY created_at DESC
            LIMIT $4
            "#,
        )
        .bind(user_id)
        .bind(window.since)
        .bind(window.until)
        .bind(window.limit)
        .fetch_all(&self.pool)
        .await
    }

    async fn learning_logs(
        &self,
        user_id: Uuid,
        window: RecordWindow,
    ) -> Result<Vec<LearningLogRow>, sqlx::Error> {
        sqlx::query_as::<_, LearningLogRow>(
            r#"
            SELECT id, topic, category, duration_minutes, takeaways, log_date, created_at
            FROM learning_logs
            WHERE user_id = $1
              AND ($2::timestamptz IS NULL OR created_at >= $2)
              AND ($3::timestamptz IS NULL OR created_at < $3)
            ORDER BY created_at DESC
            LIMIT $4
            "#,
        )
        .bind(user_id)
        .bind(window.since)
        .bind(window.until)
        .bind(window.limit)
        .fetch_all(&self.pool)
        .await
    }

    async fn projects(&self, user_id: Uuid, limit: i64) -> Result<Vec<ProjectRow>, sqlx::Error> {
        sqlx::query_as::<_, ProjectRow>(
            r#"
            SELECT id, name, status, description, tech_stack, updated_at
            FROM projects
            WHERE user_id = $1
            ORDER BY updated_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    async fn content_posts(
        &self,
        user_id: Uuid,
        window: RecordWindow,
    ) -> Result<Vec<ContentPostRow>, sqlx::Error> {
        sqlx::query_as::<_, ContentPostRow>(
            r#"
            SELECT id, title, platform, status, published_date, created_at
            FROM content_posts
            WHERE user_id = $1
              AND ($2::timestamptz IS NULL OR created_at >= $2)
              AND ($3::timestamptz IS NULL OR created_at < $3)
            ORDER BY created_at DESC
            LIMIT $4
            "#,
        )
        .bind(user_id)
        .bind(window.since)
        .bind(window.until)
        .bind(window.limit)
        .fetch_all(&self.pool)
        .await
    }

    async fn active_goals(&self, user_id: Uuid, limit: i64) -> Result<Vec<GoalRow>, sqlx::Error> {
        sqlx::query_as::<_, GoalRow>(
            r#"
            SELECT id, title, target_value, current_value, status, deadline
            FROM goals
            WHERE user_id = $1 AND status = 'active'
            ORDER BY deadline ASC NULLS LAST
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    async fn export_table(
        &self,
        table: UserTable,
        user_id: Uuid,
    ) -> Result<Vec<Value>, sqlx::Error> {
        let sql = format!(
            "SELECT to_jsonb(t) FROM {} t WHERE t.user_id = $1",
            table.as_str()
        );
        sqlx::query_scalar::<_, Value>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
    }

    async fn delete_rows(&self, table: UserTable, user_id: Uuid) -> Result<u64, sqlx::Error> {
        let sql = format!("DELETE FROM {} WHERE user_id = $1", table.as_str());
        let result = sqlx::query(&sql).bind(user_id).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn reassign_rows(
        &self,
        table: UserTable,
        from: Uuid,
        to: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let sql = format!("UPDATE {} SET user_id = $1 WHERE user_id = $2", table.as_str());
        let result = sqlx::query(&sql)
            .bind(to)
            .bind(from)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
