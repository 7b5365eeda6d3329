use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use tracing::instrument;
use uuid::Uuid;

use crate::auth::ApplicantUser;
use crate::error::{ApiError, ApiResult};
use crate::profile::completion;
use crate::records::require_profile;
use crate::reference::Industry;
use crate::state::AppState;
use crate::validation::check_salary_range;

/// 1:1 preference record. List-valued fields are stored natively as
/// Postgres text arrays.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobPreference {
    #[serde(skip_serializing)]
    pub profile_id: Uuid,
    pub job_types: Vec<String>,
    pub work_modes: Vec<String>,
    pub preferred_companies: Vec<String>,
    pub min_salary: Option<Decimal>,
    pub max_salary: Option<Decimal>,
}

impl JobPreference {
    pub fn salary_range(&self) -> Option<String> {
        match (self.min_salary, self.max_salary) {
            (Some(min), Some(max)) => Some(format!("₹{min} - ₹{max}")),
            (Some(min), None) => Some(format!("₹{min}+")),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JobPreferenceView {
    #[serde(flatten)]
    pub record: JobPreference,
    pub preferred_industries: Vec<Industry>,
    pub salary_range: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct JobPreferencePayload {
    #[serde(default)]
    pub job_types: Vec<String>,
    #[serde(default)]
    pub work_modes: Vec<String>,
    #[serde(default)]
    pub preferred_companies: Vec<String>,
    pub min_salary: Option<Decimal>,
    pub max_salary: Option<Decimal>,
    #[serde(default)]
    pub preferred_industry_ids: Vec<Uuid>,
}

pub async fn find_for_profile(
    db: &PgPool,
    profile_id: Uuid,
) -> anyhow::Result<Option<JobPreference>> {
    let row = sqlx::query_as::<_, JobPreference>(
        r#"
        SELECT profile_id, job_types, work_modes, preferred_companies,
               min_salary, max_salary
        FROM job_preferences
        WHERE profile_id = $1
        "#,
    )
    .bind(profile_id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn industries_for_profile(
    db: &PgPool,
    profile_id: Uuid,
) -> anyhow::Result<Vec<Industry>> {
    let rows = sqlx::query_as::<_, Industry>(
        r#"
        SELECT i.id, i.name, i.description
        FROM industries i
        JOIN job_preference_industries j ON j.industry_id = i.id
        WHERE j.profile_id = $1
        ORDER BY i.name
        "#,
    )
    .bind(profile_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub fn router() -> Router<AppState> {
    Router::new().route("/job-preferences", get(get_preferences).put(put_preferences))
}

async fn view_for(db: &PgPool, record: JobPreference) -> anyhow::Result<JobPreferenceView> {
    let preferred_industries = industries_for_profile(db, record.profile_id).await?;
    let salary_range = record.salary_range();
    Ok(JobPreferenceView {
        record,
        preferred_industries,
        salary_range,
    })
}

#[instrument(skip(state))]
async fn get_preferences(
    State(state): State<AppState>,
    ApplicantUser(user): ApplicantUser,
) -> ApiResult<Json<JobPreferenceView>> {
    let profile_id = require_profile(&state.db, &user).await?;
    let record = find_for_profile(&state.db, profile_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Job preferences not set"))?;
    Ok(Json(view_for(&state.db, record).await?))
}

#[instrument(skip(state, payload))]
async fn put_preferences(
    State(state): State<AppState>,
    ApplicantUser(user): ApplicantUser,
    Json(payload): Json<JobPreferencePayload>,
) -> ApiResult<Json<JobPreferenceView>> {
    let profile_id = require_profile(&state.db, &user).await?;
    check_salary_range(payload.min_salary, payload.max_salary)?;

    let mut tx = state.db.begin().await?;
    let record = sqlx::query_as::<_, JobPreference>(
        r#"
        INSERT INTO job_preferences (profile_id, job_types, work_modes,
                                     preferred_companies, min_salary, max_salary)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (profile_id) DO UPDATE SET
            job_types = EXCLUDED.job_types,
            work_modes = EXCLUDED.work_modes,
            preferred_companies = EXCLUDED.preferred_companies,
            min_salary = EXCLUDED.min_salary,
            max_salary = EXCLUDED.max_salary,
            updated_at = now()
        RETURNING profile_id, job_types, work_modes, preferred_companies,
                  min_salary, max_salary
        "#,
    )
    .bind(profile_id)
    .bind(&payload.job_types)
    .bind(&payload.work_modes)
    .bind(&payload.preferred_companies)
    .bind(payload.min_salary)
    .bind(payload.max_salary)
    .fetch_one(&mut *tx)
    .await
    ?;

    // Replace the industry link set; unknown ids are dropped.
    sqlx::query("DELETE FROM job_preference_industries WHERE profile_id = $1")
        .bind(profile_id)
        .execute(&mut *tx)
        .await
        ?;
    sqlx::query(
        r#"
        INSERT INTO job_preference_industries (profile_id, industry_id)
        SELECT $1, id FROM industries WHERE id = ANY($2)
        "#,
    )
    .bind(profile_id)
    .bind(&payload.preferred_industry_ids)
    .execute(&mut *tx)
    .await
    ?;
    tx.commit().await?;

    completion::recompute(&state.db, profile_id).await?;
    Ok(Json(view_for(&state.db, record).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(min: Option<Decimal>, max: Option<Decimal>) -> JobPreference {
        JobPreference {
            profile_id: Uuid::new_v4(),
            job_types: vec!["full_time".into()],
            work_modes: vec!["remote".into()],
            preferred_companies: vec![],
            min_salary: min,
            max_salary: max,
        }
    }

    #[test]
    fn salary_range_renders_both_shapes() {
        let both = record(Some(Decimal::new(500_000, 0)), Some(Decimal::new(900_000, 0)));
        assert_eq!(both.salary_range().unwrap(), "₹500000 - ₹900000");

        let open = record(Some(Decimal::new(500_000, 0)), None);
        assert_eq!(open.salary_range().unwrap(), "₹500000+");

        assert!(record(None, None).salary_range().is_none());
        assert!(record(None, Some(Decimal::new(1, 0))).salary_range().is_none());
    }
}
