//! Applicant dashboard: collection counts plus a recent-activity feed
//! stitched together from the child tables.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use tracing::instrument;
use uuid::Uuid;

use crate::auth::ApplicantUser;
use crate::error::ApiResult;
use crate::records::require_profile;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard/stats", get(get_stats))
        .route("/dashboard/recent-activity", get(get_recent_activity))
}

#[derive(Debug, Serialize, FromRow)]
pub struct DashboardStats {
    pub completion: i32,
    pub education_count: i64,
    pub work_experience_count: i64,
    pub skills_count: i64,
    pub projects_count: i64,
    pub certifications_count: i64,
    pub social_links_count: i64,
    pub has_resume: bool,
    pub has_job_preferences: bool,
}

async fn stats_for(db: &PgPool, profile_id: Uuid) -> anyhow::Result<DashboardStats> {
    let stats = sqlx::query_as::<_, DashboardStats>(
        r#"
        SELECT
            p.completion,
            (SELECT count(*) FROM education e
              WHERE e.profile_id = p.id)            AS education_count,
            (SELECT count(*) FROM work_experience w
              WHERE w.profile_id = p.id)            AS work_experience_count,
            (SELECT count(*) FROM skills s
              WHERE s.profile_id = p.id)            AS skills_count,
            (SELECT count(*) FROM projects pr
              WHERE pr.profile_id = p.id)           AS projects_count,
            (SELECT count(*) FROM certifications c
              WHERE c.profile_id = p.id)            AS certifications_count,
            (SELECT count(*) FROM social_links sl
              WHERE sl.profile_id = p.id)           AS social_links_count,
            (p.resume_key IS NOT NULL)              AS has_resume,
            EXISTS (SELECT 1 FROM job_preferences j
                     WHERE j.profile_id = p.id)     AS has_job_preferences
        FROM profiles p
        WHERE p.id = $1
        "#,
    )
    .bind(profile_id)
    .fetch_one(db)
    .await?;
    Ok(stats)
}

#[derive(Debug, Serialize, FromRow)]
pub struct ActivityItem {
    pub kind: String,
    pub title: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Ten most recent additions across all child collections.
async fn recent_activity(db: &PgPool, profile_id: Uuid) -> anyhow::Result<Vec<ActivityItem>> {
    let rows = sqlx::query_as::<_, ActivityItem>(
        r#"
        SELECT kind, title, created_at FROM (
            SELECT 'education' AS kind, degree_name AS title, created_at
              FROM education WHERE profile_id = $1
            UNION ALL
            SELECT 'work_experience', job_title, created_at
              FROM work_experience WHERE profile_id = $1
            UNION ALL
            SELECT 'skill', name, created_at
              FROM skills WHERE profile_id = $1
            UNION ALL
            SELECT 'project', title, created_at
              FROM projects WHERE profile_id = $1
            UNION ALL
            SELECT 'certification', name, created_at
              FROM certifications WHERE profile_id = $1
            UNION ALL
            SELECT 'social_link', platform, created_at
              FROM social_links WHERE profile_id = $1
        ) activity
        ORDER BY created_at DESC
        LIMIT 10
        "#,
    )
    .bind(profile_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

#[instrument(skip(state))]
async fn get_stats(
    State(state): State<AppState>,
    ApplicantUser(user): ApplicantUser,
) -> ApiResult<Json<DashboardStats>> {
    let profile_id = require_profile(&state.db, &user).await?;
    Ok(Json(stats_for(&state.db, profile_id).await?))
}

#[instrument(skip(state))]
async fn get_recent_activity(
    State(state): State<AppState>,
    ApplicantUser(user): ApplicantUser,
) -> ApiResult<Json<Vec<ActivityItem>>> {
    let profile_id = require_profile(&state.db, &user).await?;
    Ok(Json(recent_activity(&state.db, profile_id).await?))
}
