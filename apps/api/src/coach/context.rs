//! Context Assembler: turns bounded slices of the user's records into the
//! plain-text block injected into the LLM prompt.
//!
//! Each mode reads a fixed subset of categories concurrently. Every section is
//! always rendered, with `None` for an empty category, so the prompt keeps the
//! same structure. A failing category read is logged and rendered as empty;
//! it never fails the request.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use tracing::warn;
use uuid::Uuid;

use crate::coach::CoachMode;
use crate::models::records::{
    ContentPostRow, GoalRow, JobApplicationRow, LearningLogRow, ProjectRow, RecruiterRow,
};
use crate::records::{RecordStore, RecordWindow};

pub const DEFAULT_TIME_RANGE_DAYS: i64 = 30;
pub const MAX_TIME_RANGE_DAYS: i64 = 365;

/// Character budget for free-text fields (notes, takeaways, descriptions).
const TEXT_BUDGET: usize = 120;

// Row caps per category.
const JOB_CAP: i64 = 30;
const RECRUITER_CAP: i64 = 20;
const LEARNING_CAP: i64 = 30;
const PROJECT_CAP: i64 = 20;
const CONTENT_CAP: i64 = 30;
const GOAL_CAP: i64 = 10;
const GENERAL_CAP: i64 = 15;

const FALLBACK_NAME: &str = "User";

/// Normalises a caller-supplied range: absent or non-positive → default, else 1..=365.
pub fn clamp_time_range(days: Option<f64>) -> i64 {
    match days {
        Some(d) if d.is_finite() && d >= 1.0 => (d.round() as i64).min(MAX_TIME_RANGE_DAYS),
        Some(d) if d.is_finite() && d > 0.0 => 1,
        _ => DEFAULT_TIME_RANGE_DAYS,
    }
}

pub async fn assemble(
    store: &dyn RecordStore,
    user_id: Uuid,
    mode: CoachMode,
    time_range_days: i64,
) -> String {
    assemble_at(store, user_id, mode, time_range_days, Utc::now()).await
}

pub async fn assemble_at(
    store: &dyn RecordStore,
    user_id: Uuid,
    mode: CoachMode,
    time_range_days: i64,
    now: DateTime<Utc>,
) -> String {
    let since = now - Duration::days(time_range_days);

    let range = match mode {
        CoachMode::Projects => "all time (projects are not date-limited)".to_string(),
        _ => format!(
            "last {time_range_days} days ({} to {})",
            since.date_naive(),
            now.date_naive()
        ),
    };

    let sections = async {
        match mode {
            CoachMode::General => general_sections(store, user_id, since).await,
            CoachMode::Job => job_sections(store, user_id, since).await,
            CoachMode::Learning => learning_sections(store, user_id, since).await,
            CoachMode::Projects => project_sections(store, user_id).await,
            CoachMode::Content => content_sections(store, user_id, since).await,
        }
    };
    let (name, body) = tokio::join!(display_name(store, user_id), sections);

    format!("User: {name}\nDate range: {range}\n\n{}", body.join("\n\n"))
}

/// Activity inside `[week_start, week_end]` for the weekly summary prompt.
pub async fn assemble_week(
    store: &dyn RecordStore,
    user_id: Uuid,
    week_start: NaiveDate,
    week_end: NaiveDate,
) -> String {
    let since = week_start.and_time(NaiveTime::MIN).and_utc();
    let until = (week_end + Duration::days(1)).and_time(NaiveTime::MIN).and_utc();

    let (jobs, learning, content) = tokio::join!(
        store.job_applications(user_id, RecordWindow::between(since, until, JOB_CAP)),
        store.learning_logs(user_id, RecordWindow::between(since, until, LEARNING_CAP)),
        store.content_posts(user_id, RecordWindow::between(since, until, CONTENT_CAP)),
    );
    let jobs = or_empty("job_applications", jobs);
    let learning = or_empty("learning_logs", learning);
    let content = or_empty("content_posts", content);

    [
        jobs_section(&jobs),
        learning_section(&learning),
        content_section(&content),
    ]
    .join("\n\n")
}

async fn display_name(store: &dyn RecordStore, user_id: Uuid) -> String {
    match store.display_name(user_id).await {
        Ok(Some(name)) => name,
        Ok(None) => FALLBACK_NAME.to_string(),
        Err(e) => {
            warn!("Failed to load display name for {user_id}: {e}");
            FALLBACK_NAME.to_string()
        }
    }
}

async fn general_sections(
    store: &dyn RecordStore,
    user_id: Uuid,
    since: DateTime<Utc>,
) -> Vec<String> {
    let window = RecordWindow::since(since, GENERAL_CAP);
    let (jobs, recruiters, learning, projects, content, goals) = tokio::join!(
        store.job_applications(user_id, RecordWindow::since(since, JOB_CAP)),
        store.recruiters(user_id, window),
        store.learning_logs(user_id, window),
        store.projects(user_id, GENERAL_CAP),
        store.content_posts(user_id, window),
        store.active_goals(user_id, GOAL_CAP),
    );

    vec![
        jobs_section(&or_empty("job_applications", jobs)),
        recruiters_section(&or_empty("recruiters", recruiters)),
        learning_section(&or_empty("learning_logs", learning)),
        section("Projects", or_empty("projects", projects).iter().map(project_line)),
        content_section(&or_empty("content_posts", content)),
        goals_section(&or_empty("goals", goals)),
    ]
}

async fn job_sections(store: &dyn RecordStore, user_id: Uuid, since: DateTime<Utc>) -> Vec<String> {
    let (jobs, recruiters) = tokio::join!(
        store.job_applications(user_id, RecordWindow::since(since, JOB_CAP)),
        store.recruiters(user_id, RecordWindow::since(since, RECRUITER_CAP)),
    );
    vec![
        jobs_section(&or_empty("job_applications", jobs)),
        recruiters_section(&or_empty("recruiters", recruiters)),
    ]
}

async fn learning_sections(
    store: &dyn RecordStore,
    user_id: Uuid,
    since: DateTime<Utc>,
) -> Vec<String> {
    let (learning, goals) = tokio::join!(
        store.learning_logs(user_id, RecordWindow::since(since, LEARNING_CAP)),
        store.active_goals(user_id, GOAL_CAP),
    );
    let learning = or_empty("learning_logs", learning);

    let mut by_category: BTreeMap<String, i64> = BTreeMap::new();
    for log in &learning {
        let category = log.category.clone().unwrap_or_else(|| "uncategorized".to_string());
        *by_category.entry(category).or_default() += i64::from(log.duration_minutes);
    }

    vec![
        learning_section(&learning),
        section(
            "Minutes by category",
            by_category
                .iter()
                .map(|(category, minutes)| format!("{category}: {minutes} min")),
        ),
        goals_section(&or_empty("goals", goals)),
    ]
}

async fn project_sections(store: &dyn RecordStore, user_id: Uuid) -> Vec<String> {
    let projects = or_empty("projects", store.projects(user_id, PROJECT_CAP).await);
    let (active, other): (Vec<_>, Vec<_>) = projects.iter().partition(|p| p.is_active());
    vec![
        section("Active projects", active.into_iter().map(project_line)),
        section("Other projects", other.into_iter().map(project_line)),
    ]
}

async fn content_sections(
    store: &dyn RecordStore,
    user_id: Uuid,
    since: DateTime<Utc>,
) -> Vec<String> {
    let content = or_empty(
        "content_posts",
        store
            .content_posts(user_id, RecordWindow::since(since, CONTENT_CAP))
            .await,
    );
    let platforms = breakdown(content.iter().map(|c| c.platform.as_str()));
    vec![
        content_section(&content),
        format!("Platform breakdown: {}", format_breakdown(&platforms)),
    ]
}

fn or_empty<T>(category: &str, result: Result<Vec<T>, sqlx::Error>) -> Vec<T> {
    result.unwrap_or_else(|e| {
        warn!("Context fetch for {category} failed, rendering as empty: {e}");
        Vec::new()
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Rendering
// ────────────────────────────────────────────────────────────────────────────

/// `LABEL:` followed by one `- line` per item, or `None`.
fn section(label: &str, lines: impl Iterator<Item = String>) -> String {
    let lines: Vec<String> = lines.map(|l| format!("- {l}")).collect();
    if lines.is_empty() {
        format!("{label}:\nNone")
    } else {
        format!("{label}:\n{}", lines.join("\n"))
    }
}

fn jobs_section(jobs: &[JobApplicationRow]) -> String {
    let statuses = breakdown(jobs.iter().map(|j| j.status.as_str()));
    format!(
        "{}\nStatus breakdown: {}",
        section(
            &format!("Job applications ({})", jobs.len()),
            jobs.iter().map(job_line)
        ),
        format_breakdown(&statuses)
    )
}

fn recruiters_section(recruiters: &[RecruiterRow]) -> String {
    section(
        &format!("Recruiter contacts ({})", recruiters.len()),
        recruiters.iter().map(recruiter_line),
    )
}

fn learning_section(logs: &[LearningLogRow]) -> String {
    let total: i64 = logs.iter().map(|l| i64::from(l.duration_minutes)).sum();
    section(
        &format!("Learning sessions ({}, {total} minutes total)", logs.len()),
        logs.iter().map(learning_line),
    )
}

fn content_section(posts: &[ContentPostRow]) -> String {
    section(
        &format!("Content posts ({})", posts.len()),
        posts.iter().map(content_line),
    )
}

fn goals_section(goals: &[GoalRow]) -> String {
    section("Active goals", goals.iter().map(goal_line))
}

fn job_line(job: &JobApplicationRow) -> String {
    let mut line = format!("{} at {} ({})", job.role, job.company, job.status);
    if let Some(date) = job.applied_date {
        line.push_str(&format!(", applied {date}"));
    }
    push_note(&mut line, "notes", job.notes.as_deref());
    line
}

fn recruiter_line(recruiter: &RecruiterRow) -> String {
    let mut line = recruiter.name.clone();
    if let Some(company) = recruiter.company.as_deref().filter(|c| !c.is_empty()) {
        line.push_str(&format!(" ({company})"));
    }
    if let Some(status) = recruiter.status.as_deref().filter(|s| !s.is_empty()) {
        line.push_str(&format!(" [{status}]"));
    }
    if let Some(date) = recruiter.last_contact_date {
        line.push_str(&format!(", last contact {date}"));
    }
    push_note(&mut line, "notes", recruiter.notes.as_deref());
    line
}

fn learning_line(log: &LearningLogRow) -> String {
    let mut line = format!("{}: {} ({} min)", log.log_date, log.topic, log.duration_minutes);
    if let Some(category) = log.category.as_deref().filter(|c| !c.is_empty()) {
        line.push_str(&format!(" [{category}]"));
    }
    push_note(&mut line, "takeaways", log.takeaways.as_deref());
    line
}

fn project_line(project: &ProjectRow) -> String {
    let mut line = format!("{} ({})", project.name, project.status);
    if let Some(stack) = project.tech_stack.as_ref().filter(|s| !s.is_empty()) {
        line.push_str(&format!(" [{}]", stack.join(", ")));
    }
    push_note(&mut line, "description", project.description.as_deref());
    line
}

fn content_line(post: &ContentPostRow) -> String {
    let mut line = format!("{} on {} ({})", post.title, post.platform, post.status);
    if let Some(date) = post.published_date {
        line.push_str(&format!(", published {date}"));
    }
    line
}

fn goal_line(goal: &GoalRow) -> String {
    let mut line = goal.title.clone();
    if let Some(target) = goal.target_value {
        line.push_str(&format!(": {}/{target}", goal.current_value.unwrap_or(0)));
    }
    if let Some(deadline) = goal.deadline {
        line.push_str(&format!(", due {deadline}"));
    }
    line
}

fn push_note(line: &mut String, label: &str, text: Option<&str>) {
    if let Some(text) = text.map(|t| truncate(t, TEXT_BUDGET)).filter(|t| !t.is_empty()) {
        line.push_str(&format!(" | {label}: {text}"));
    }
}

/// Collapses whitespace and cuts to `budget` characters, marking the cut with `...`.
pub fn truncate(text: &str, budget: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= budget {
        return flat;
    }
    let cut: String = flat.chars().take(budget).collect();
    format!("{}...", cut.trim_end())
}

fn breakdown<'a>(values: impl Iterator<Item = &'a str>) -> BTreeMap<&'a str, usize> {
    let mut counts = BTreeMap::new();
    for value in values {
        *counts.entry(value).or_default() += 1;
    }
    counts
}

fn format_breakdown(counts: &BTreeMap<&str, usize>) -> String {
    if counts.is_empty() {
        return "None".to_string();
    }
    counts
        .iter()
        .map(|(k, v)| format!("{k}: {v}"))
        .collect::<Vec<_>>()
        .join(", ")
}
