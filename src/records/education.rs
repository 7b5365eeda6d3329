use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use tracing::instrument;
use uuid::Uuid;

use crate::auth::ApplicantUser;
use crate::error::{ApiError, ApiResult};
use crate::profile::completion;
use crate::records::require_profile;
use crate::state::AppState;
use crate::validation::check_span;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Education {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub profile_id: Uuid,
    pub degree_type: String,
    pub degree_name: String,
    pub institution: String,
    pub field_of_study: String,
    pub start_year: i32,
    pub end_year: Option<i32>,
    pub is_current: bool,
    pub percentage: Option<Decimal>,
    pub cgpa: Option<Decimal>,
    pub description: String,
    pub created_at: OffsetDateTime,
}

impl Education {
    /// "2019 - 2023", "2021 - Present".
    pub fn duration(&self) -> String {
        if self.is_current {
            format!("{} - Present", self.start_year)
        } else if let Some(end) = self.end_year {
            format!("{} - {}", self.start_year, end)
        } else {
            self.start_year.to_string()
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EducationView {
    #[serde(flatten)]
    pub record: Education,
    pub duration: String,
}

impl From<Education> for EducationView {
    fn from(record: Education) -> Self {
        let duration = record.duration();
        Self { record, duration }
    }
}

#[derive(Debug, Deserialize)]
pub struct EducationPayload {
    pub degree_type: String,
    pub degree_name: String,
    pub institution: String,
    #[serde(default)]
    pub field_of_study: String,
    pub start_year: i32,
    pub end_year: Option<i32>,
    #[serde(default)]
    pub is_current: bool,
    pub percentage: Option<Decimal>,
    pub cgpa: Option<Decimal>,
    #[serde(default)]
    pub description: String,
}

impl EducationPayload {
    fn validate(&self) -> ApiResult<()> {
        check_span(
            &self.start_year,
            self.end_year.as_ref(),
            self.is_current,
            "end_year",
        )
    }
}

pub async fn list_for_profile(db: &PgPool, profile_id: Uuid) -> anyhow::Result<Vec<Education>> {
    let rows = sqlx::query_as::<_, Education>(
        r#"
        SELECT id, profile_id, degree_type, degree_name, institution,
               field_of_study, start_year, end_year, is_current, percentage,
               cgpa, description, created_at
        FROM education
        WHERE profile_id = $1
        ORDER BY end_year DESC NULLS FIRST, start_year DESC
        "#,
    )
    .bind(profile_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

async fn find_owned(db: &PgPool, profile_id: Uuid, id: Uuid) -> anyhow::Result<Option<Education>> {
    let row = sqlx::query_as::<_, Education>(
        r#"
        SELECT id, profile_id, degree_type, degree_name, institution,
               field_of_study, start_year, end_year, is_current, percentage,
               cgpa, description, created_at
        FROM education
        WHERE id = $1 AND profile_id = $2
        "#,
    )
    .bind(id)
    .bind(profile_id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/education", get(list).post(create))
        .route("/education/:id", get(get_one).put(update).delete(delete_one))
}

#[instrument(skip(state))]
async fn list(
    State(state): State<AppState>,
    ApplicantUser(user): ApplicantUser,
) -> ApiResult<Json<Vec<EducationView>>> {
    let profile_id = require_profile(&state.db, &user).await?;
    let rows = list_for_profile(&state.db, profile_id).await?;
    Ok(Json(rows.into_iter().map(EducationView::from).collect()))
}

#[instrument(skip(state, payload))]
async fn create(
    State(state): State<AppState>,
    ApplicantUser(user): ApplicantUser,
    Json(payload): Json<EducationPayload>,
) -> ApiResult<(StatusCode, Json<EducationView>)> {
    let profile_id = require_profile(&state.db, &user).await?;
    payload.validate()?;

    let row = sqlx::query_as::<_, Education>(
        r#"
        INSERT INTO education (profile_id, degree_type, degree_name, institution,
                               field_of_study, start_year, end_year, is_current,
                               percentage, cgpa, description)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING id, profile_id, degree_type, degree_name, institution,
                  field_of_study, start_year, end_year, is_current, percentage,
                  cgpa, description, created_at
        "#,
    )
    .bind(profile_id)
    .bind(&payload.degree_type)
    .bind(&payload.degree_name)
    .bind(&payload.institution)
    .bind(&payload.field_of_study)
    .bind(payload.start_year)
    .bind(payload.end_year)
    .bind(payload.is_current)
    .bind(payload.percentage)
    .bind(payload.cgpa)
    .bind(&payload.description)
    .fetch_one(&state.db)
    .await?;

    completion::recompute(&state.db, profile_id).await?;
    Ok((StatusCode::CREATED, Json(EducationView::from(row))))
}

#[instrument(skip(state))]
async fn get_one(
    State(state): State<AppState>,
    ApplicantUser(user): ApplicantUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<EducationView>> {
    let profile_id = require_profile(&state.db, &user).await?;
    let row = find_owned(&state.db, profile_id, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Education record not found"))?;
    Ok(Json(EducationView::from(row)))
}

#[instrument(skip(state, payload))]
async fn update(
    State(state): State<AppState>,
    ApplicantUser(user): ApplicantUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<EducationPayload>,
) -> ApiResult<Json<EducationView>> {
    let profile_id = require_profile(&state.db, &user).await?;
    payload.validate()?;

    find_owned(&state.db, profile_id, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Education record not found"))?;

    let row = sqlx::query_as::<_, Education>(
        r#"
        UPDATE education SET
            degree_type = $3, degree_name = $4, institution = $5,
            field_of_study = $6, start_year = $7, end_year = $8,
            is_current = $9, percentage = $10, cgpa = $11, description = $12
        WHERE id = $1 AND profile_id = $2
        RETURNING id, profile_id, degree_type, degree_name, institution,
                  field_of_study, start_year, end_year, is_current, percentage,
                  cgpa, description, created_at
        "#,
    )
    .bind(id)
    .bind(profile_id)
    .bind(&payload.degree_type)
    .bind(&payload.degree_name)
    .bind(&payload.institution)
    .bind(&payload.field_of_study)
    .bind(payload.start_year)
    .bind(payload.end_year)
    .bind(payload.is_current)
    .bind(payload.percentage)
    .bind(payload.cgpa)
    .bind(&payload.description)
    .fetch_one(&state.db)
    .await?;

    completion::recompute(&state.db, profile_id).await?;
    Ok(Json(EducationView::from(row)))
}

#[instrument(skip(state))]
async fn delete_one(
    State(state): State<AppState>,
    ApplicantUser(user): ApplicantUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let profile_id = require_profile(&state.db, &user).await?;
    let result = sqlx::query("DELETE FROM education WHERE id = $1 AND profile_id = $2")
        .bind(id)
        .bind(profile_id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Education record not found"));
    }
    completion::recompute(&state.db, profile_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> EducationPayload {
        EducationPayload {
            degree_type: "bachelor".into(),
            degree_name: "B.Tech".into(),
            institution: "IIT".into(),
            field_of_study: "CS".into(),
            start_year: 2018,
            end_year: Some(2022),
            is_current: false,
            percentage: None,
            cgpa: None,
            description: String::new(),
        }
    }

    #[test]
    fn completed_education_with_end_year_passes() {
        assert!(payload().validate().is_ok());
    }

    #[test]
    fn current_education_must_not_have_end_year() {
        let mut p = payload();
        p.is_current = true;
        assert!(p.validate().is_err());
        p.end_year = None;
        assert!(p.validate().is_ok());
    }

    #[test]
    fn completed_education_requires_end_year() {
        let mut p = payload();
        p.end_year = None;
        assert!(p.validate().is_err());
    }

    #[test]
    fn end_year_must_not_precede_start() {
        let mut p = payload();
        p.end_year = Some(2017);
        assert!(p.validate().is_err());
    }

    #[test]
    fn duration_renders_current_and_closed_spans() {
        let mut e = Education {
            id: Uuid::new_v4(),
            profile_id: Uuid::new_v4(),
            degree_type: "bachelor".into(),
            degree_name: "B.Tech".into(),
            institution: "IIT".into(),
            field_of_study: String::new(),
            start_year: 2018,
            end_year: Some(2022),
            is_current: false,
            percentage: None,
            cgpa: None,
            description: String::new(),
            created_at: OffsetDateTime::now_utc(),
        };
        assert_eq!(e.duration(), "2018 - 2022");
        e.is_current = true;
        e.end_year = None;
        assert_eq!(e.duration(), "2018 - Present");
        e.is_current = false;
        assert_eq!(e.duration(), "2018");
    }
}
