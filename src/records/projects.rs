use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::{Date, OffsetDateTime};
use tracing::instrument;
use uuid::Uuid;

use crate::auth::ApplicantUser;
use crate::error::{ApiError, ApiResult};
use crate::profile::completion;
use crate::records::{experience::month_year, require_profile};
use crate::state::AppState;
use crate::validation::check_optional_span;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Project {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub profile_id: Uuid,
    pub title: String,
    pub description: String,
    pub technologies: Vec<String>,
    pub project_url: Option<String>,
    pub github_url: Option<String>,
    pub start_date: Date,
    pub end_date: Option<Date>,
    pub is_ongoing: bool,
    pub created_at: OffsetDateTime,
}

impl Project {
    pub fn duration(&self) -> String {
        if self.is_ongoing {
            format!("{} - Present", month_year(self.start_date))
        } else if let Some(end) = self.end_date {
            format!("{} - {}", month_year(self.start_date), month_year(end))
        } else {
            month_year(self.start_date)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProjectView {
    #[serde(flatten)]
    pub record: Project,
    pub duration: String,
}

impl From<Project> for ProjectView {
    fn from(record: Project) -> Self {
        let duration = record.duration();
        Self { record, duration }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProjectPayload {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub technologies: Vec<String>,
    pub project_url: Option<String>,
    pub github_url: Option<String>,
    pub start_date: Date,
    pub end_date: Option<Date>,
    #[serde(default)]
    pub is_ongoing: bool,
}

impl ProjectPayload {
    /// Unlike education and work experience, a finished project may simply
    /// have no end date; only an ongoing one must not carry one.
    fn validate(&self) -> ApiResult<()> {
        if self.is_ongoing && self.end_date.is_some() {
            return Err(ApiError::field(
                "end_date",
                "Must not be set while the project is ongoing",
            ));
        }
        check_optional_span(&self.start_date, self.end_date.as_ref(), "end_date")
    }
}

const COLUMNS: &str = r#"
    id, profile_id, title, description, technologies, project_url, github_url,
    start_date, end_date, is_ongoing, created_at
"#;

pub async fn list_for_profile(db: &PgPool, profile_id: Uuid) -> anyhow::Result<Vec<Project>> {
    let rows = sqlx::query_as::<_, Project>(&format!(
        "SELECT {COLUMNS} FROM projects WHERE profile_id = $1 ORDER BY start_date DESC"
    ))
    .bind(profile_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

async fn find_owned(db: &PgPool, profile_id: Uuid, id: Uuid) -> anyhow::Result<Option<Project>> {
    let row = sqlx::query_as::<_, Project>(&format!(
        "SELECT {COLUMNS} FROM projects WHERE id = $1 AND profile_id = $2"
    ))
    .bind(id)
    .bind(profile_id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/projects", get(list).post(create))
        .route("/projects/:id", get(get_one).put(update).delete(delete_one))
}

#[instrument(skip(state))]
async fn list(
    State(state): State<AppState>,
    ApplicantUser(user): ApplicantUser,
) -> ApiResult<Json<Vec<ProjectView>>> {
    let profile_id = require_profile(&state.db, &user).await?;
    let rows = list_for_profile(&state.db, profile_id).await?;
    Ok(Json(rows.into_iter().map(ProjectView::from).collect()))
}

#[instrument(skip(state, payload))]
async fn create(
    State(state): State<AppState>,
    ApplicantUser(user): ApplicantUser,
    Json(payload): Json<ProjectPayload>,
) -> ApiResult<(StatusCode, Json<ProjectView>)> {
    let profile_id = require_profile(&state.db, &user).await?;
    payload.validate()?;

    let row = sqlx::query_as::<_, Project>(&format!(
        r#"
        INSERT INTO projects (profile_id, title, description, technologies,
                              project_url, github_url, start_date, end_date,
                              is_ongoing)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(profile_id)
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(&payload.technologies)
    .bind(&payload.project_url)
    .bind(&payload.github_url)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(payload.is_ongoing)
    .fetch_one(&state.db)
    .await?;

    completion::recompute(&state.db, profile_id).await?;
    Ok((StatusCode::CREATED, Json(ProjectView::from(row))))
}

#[instrument(skip(state))]
async fn get_one(
    State(state): State<AppState>,
    ApplicantUser(user): ApplicantUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ProjectView>> {
    let profile_id = require_profile(&state.db, &user).await?;
    let row = find_owned(&state.db, profile_id, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;
    Ok(Json(ProjectView::from(row)))
}

#[instrument(skip(state, payload))]
async fn update(
    State(state): State<AppState>,
    ApplicantUser(user): ApplicantUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProjectPayload>,
) -> ApiResult<Json<ProjectView>> {
    let profile_id = require_profile(&state.db, &user).await?;
    payload.validate()?;

    let row = sqlx::query_as::<_, Project>(&format!(
        r#"
        UPDATE projects SET
            title = $3, description = $4, technologies = $5, project_url = $6,
            github_url = $7, start_date = $8, end_date = $9, is_ongoing = $10
        WHERE id = $1 AND profile_id = $2
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(profile_id)
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(&payload.technologies)
    .bind(&payload.project_url)
    .bind(&payload.github_url)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(payload.is_ongoing)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Project not found"))?;

    completion::recompute(&state.db, profile_id).await?;
    Ok(Json(ProjectView::from(row)))
}

#[instrument(skip(state))]
async fn delete_one(
    State(state): State<AppState>,
    ApplicantUser(user): ApplicantUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let profile_id = require_profile(&state.db, &user).await?;
    let result = sqlx::query("DELETE FROM projects WHERE id = $1 AND profile_id = $2")
        .bind(id)
        .bind(profile_id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Project not found"));
    }
    completion::recompute(&state.db, profile_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn payload() -> ProjectPayload {
        ProjectPayload {
            title: "Side project".into(),
            description: String::new(),
            technologies: vec!["rust".into()],
            project_url: None,
            github_url: None,
            start_date: date!(2023 - 01 - 01),
            end_date: Some(date!(2023 - 06 - 01)),
            is_ongoing: false,
        }
    }

    #[test]
    fn ongoing_project_rejects_end_date() {
        let mut p = payload();
        p.is_ongoing = true;
        assert!(p.validate().is_err());
        p.end_date = None;
        assert!(p.validate().is_ok());
    }

    #[test]
    fn finished_project_may_omit_end_date() {
        let mut p = payload();
        p.end_date = None;
        assert!(p.validate().is_ok());
    }

    #[test]
    fn end_date_must_not_precede_start() {
        let mut p = payload();
        p.end_date = Some(date!(2022 - 12 - 31));
        assert!(p.validate().is_err());
    }

    #[test]
    fn duration_marks_ongoing_projects() {
        let mut record = Project {
            id: Uuid::new_v4(),
            profile_id: Uuid::new_v4(),
            title: "Side project".into(),
            description: String::new(),
            technologies: vec![],
            project_url: None,
            github_url: None,
            start_date: date!(2023 - 01 - 01),
            end_date: None,
            is_ongoing: true,
            created_at: OffsetDateTime::now_utc(),
        };
        assert_eq!(record.duration(), "Jan 2023 - Present");
        record.is_ongoing = false;
        assert_eq!(record.duration(), "Jan 2023");
        record.end_date = Some(date!(2023 - 06 - 01));
        assert_eq!(record.duration(), "Jan 2023 - Jun 2023");
    }
}
