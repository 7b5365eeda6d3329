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
use crate::records::require_profile;
use crate::state::AppState;
use crate::validation::check_span;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkExperience {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub profile_id: Uuid,
    pub job_title: String,
    pub company_name: String,
    pub employment_type: String,
    pub location: String,
    pub start_date: Date,
    pub end_date: Option<Date>,
    pub is_current: bool,
    pub description: String,
    pub key_achievements: String,
    pub created_at: OffsetDateTime,
}

/// "Jan 2021" style month-year label.
pub(crate) fn month_year(date: Date) -> String {
    const MONTHS: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];
    format!("{} {}", MONTHS[date.month() as usize - 1], date.year())
}

impl WorkExperience {
    pub fn duration(&self) -> String {
        if self.is_current {
            format!("{} - Present", month_year(self.start_date))
        } else if let Some(end) = self.end_date {
            format!("{} - {}", month_year(self.start_date), month_year(end))
        } else {
            month_year(self.start_date)
        }
    }

    /// "2y 4m" length of the stint; open stints count up to today.
    pub fn experience_length_on(&self, today: Date) -> String {
        let end = self.end_date.unwrap_or(today);
        let days = (end - self.start_date).whole_days().max(0);
        let years = days / 365;
        let months = (days % 365) / 30;
        if years > 0 {
            format!("{years}y {months}m")
        } else {
            format!("{months}m")
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WorkExperienceView {
    #[serde(flatten)]
    pub record: WorkExperience,
    pub duration: String,
    pub experience_length: String,
}

impl From<WorkExperience> for WorkExperienceView {
    fn from(record: WorkExperience) -> Self {
        let duration = record.duration();
        let today = OffsetDateTime::now_utc().date();
        let experience_length = record.experience_length_on(today);
        Self {
            record,
            duration,
            experience_length,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WorkExperiencePayload {
    pub job_title: String,
    pub company_name: String,
    pub employment_type: String,
    #[serde(default)]
    pub location: String,
    pub start_date: Date,
    pub end_date: Option<Date>,
    #[serde(default)]
    pub is_current: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub key_achievements: String,
}

impl WorkExperiencePayload {
    fn validate(&self) -> ApiResult<()> {
        check_span(
            &self.start_date,
            self.end_date.as_ref(),
            self.is_current,
            "end_date",
        )
    }
}

const COLUMNS: &str = r#"
    id, profile_id, job_title, company_name, employment_type, location,
    start_date, end_date, is_current, description, key_achievements, created_at
"#;

pub async fn list_for_profile(
    db: &PgPool,
    profile_id: Uuid,
) -> anyhow::Result<Vec<WorkExperience>> {
    let rows = sqlx::query_as::<_, WorkExperience>(&format!(
        "SELECT {COLUMNS} FROM work_experience WHERE profile_id = $1 ORDER BY start_date DESC"
    ))
    .bind(profile_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

async fn find_owned(
    db: &PgPool,
    profile_id: Uuid,
    id: Uuid,
) -> anyhow::Result<Option<WorkExperience>> {
    let row = sqlx::query_as::<_, WorkExperience>(&format!(
        "SELECT {COLUMNS} FROM work_experience WHERE id = $1 AND profile_id = $2"
    ))
    .bind(id)
    .bind(profile_id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/experience", get(list).post(create))
        .route(
            "/experience/:id",
            get(get_one).put(update).delete(delete_one),
        )
}

#[instrument(skip(state))]
async fn list(
    State(state): State<AppState>,
    ApplicantUser(user): ApplicantUser,
) -> ApiResult<Json<Vec<WorkExperienceView>>> {
    let profile_id = require_profile(&state.db, &user).await?;
    let rows = list_for_profile(&state.db, profile_id).await?;
    Ok(Json(rows.into_iter().map(WorkExperienceView::from).collect()))
}

#[instrument(skip(state, payload))]
async fn create(
    State(state): State<AppState>,
    ApplicantUser(user): ApplicantUser,
    Json(payload): Json<WorkExperiencePayload>,
) -> ApiResult<(StatusCode, Json<WorkExperienceView>)> {
    let profile_id = require_profile(&state.db, &user).await?;
    payload.validate()?;

    let row = sqlx::query_as::<_, WorkExperience>(&format!(
        r#"
        INSERT INTO work_experience (profile_id, job_title, company_name,
                                     employment_type, location, start_date,
                                     end_date, is_current, description,
                                     key_achievements)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(profile_id)
    .bind(&payload.job_title)
    .bind(&payload.company_name)
    .bind(&payload.employment_type)
    .bind(&payload.location)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(payload.is_current)
    .bind(&payload.description)
    .bind(&payload.key_achievements)
    .fetch_one(&state.db)
    .await?;

    completion::recompute(&state.db, profile_id).await?;
    Ok((StatusCode::CREATED, Json(WorkExperienceView::from(row))))
}

#[instrument(skip(state))]
async fn get_one(
    State(state): State<AppState>,
    ApplicantUser(user): ApplicantUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<WorkExperienceView>> {
    let profile_id = require_profile(&state.db, &user).await?;
    let row = find_owned(&state.db, profile_id, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Work experience not found"))?;
    Ok(Json(WorkExperienceView::from(row)))
}

#[instrument(skip(state, payload))]
async fn update(
    State(state): State<AppState>,
    ApplicantUser(user): ApplicantUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<WorkExperiencePayload>,
) -> ApiResult<Json<WorkExperienceView>> {
    let profile_id = require_profile(&state.db, &user).await?;
    payload.validate()?;

    find_owned(&state.db, profile_id, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Work experience not found"))?;

    let row = sqlx::query_as::<_, WorkExperience>(&format!(
        r#"
        UPDATE work_experience SET
            job_title = $3, company_name = $4, employment_type = $5,
            location = $6, start_date = $7, end_date = $8, is_current = $9,
            description = $10, key_achievements = $11
        WHERE id = $1 AND profile_id = $2
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(profile_id)
    .bind(&payload.job_title)
    .bind(&payload.company_name)
    .bind(&payload.employment_type)
    .bind(&payload.location)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(payload.is_current)
    .bind(&payload.description)
    .bind(&payload.key_achievements)
    .fetch_one(&state.db)
    .await?;

    completion::recompute(&state.db, profile_id).await?;
    Ok(Json(WorkExperienceView::from(row)))
}

#[instrument(skip(state))]
async fn delete_one(
    State(state): State<AppState>,
    ApplicantUser(user): ApplicantUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let profile_id = require_profile(&state.db, &user).await?;
    let result = sqlx::query("DELETE FROM work_experience WHERE id = $1 AND profile_id = $2")
        .bind(id)
        .bind(profile_id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Work experience not found"));
    }
    completion::recompute(&state.db, profile_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn record() -> WorkExperience {
        WorkExperience {
            id: Uuid::new_v4(),
            profile_id: Uuid::new_v4(),
            job_title: "Engineer".into(),
            company_name: "Acme".into(),
            employment_type: "full_time".into(),
            location: "Pune".into(),
            start_date: date!(2021 - 03 - 01),
            end_date: Some(date!(2023 - 07 - 15)),
            is_current: false,
            description: String::new(),
            key_achievements: String::new(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn duration_uses_month_year_labels() {
        let mut r = record();
        assert_eq!(r.duration(), "Mar 2021 - Jul 2023");
        r.is_current = true;
        r.end_date = None;
        assert_eq!(r.duration(), "Mar 2021 - Present");
    }

    #[test]
    fn experience_length_counts_years_and_months() {
        let r = record();
        assert_eq!(r.experience_length_on(date!(2024 - 01 - 01)), "2y 4m");
    }

    #[test]
    fn open_stint_counts_up_to_today() {
        let mut r = record();
        r.end_date = None;
        r.is_current = true;
        assert_eq!(r.experience_length_on(date!(2021 - 08 - 01)), "5m");
    }

    #[test]
    fn current_job_must_not_have_end_date() {
        let p = WorkExperiencePayload {
            job_title: "Engineer".into(),
            company_name: "Acme".into(),
            employment_type: "full_time".into(),
            location: String::new(),
            start_date: date!(2021 - 03 - 01),
            end_date: Some(date!(2023 - 07 - 15)),
            is_current: true,
            description: String::new(),
            key_achievements: String::new(),
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn start_after_end_is_rejected() {
        let p = WorkExperiencePayload {
            job_title: "Engineer".into(),
            company_name: "Acme".into(),
            employment_type: "full_time".into(),
            location: String::new(),
            start_date: date!(2024 - 01 - 01),
            end_date: Some(date!(2023 - 01 - 01)),
            is_current: false,
            description: String::new(),
            key_achievements: String::new(),
        };
        assert!(p.validate().is_err());
    }
}
