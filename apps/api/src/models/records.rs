use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobApplicationRow {
    pub id: Uuid,
    pub company: String,
    pub role: String,
    pub status: String,
    pub applied_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RecruiterRow {
    pub id: Uuid,
    pub name: String,
    pub company: Option<String>,
    pub status: Option<String>,
    pub last_contact_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LearningLogRow {
    pub id: Uuid,
    pub topic: String,
    pub category: Option<String>,
    pub duration_minutes: i32,
    pub takeaways: Option<String>,
    pub log_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProjectRow {
    pub id: Uuid,
    pub name: String,
    pub status: String,
    pub description: Option<String>,
    pub tech_stack: Option<Vec<String>>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectRow {
    pub fn is_active(&self) -> bool {
        matches!(self.status.as_str(), "active" | "in_progress")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ContentPostRow {
    pub id: Uuid,
    pub title: String,
    pub platform: String,
    pub status: String,
    pub published_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GoalRow {
    pub id: Uuid,
    pub title: String,
    pub target_value: Option<i32>,
    pub current_value: Option<i32>,
    pub status: String,
    pub deadline: Option<NaiveDate>,
}
