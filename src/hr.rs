//! HR surface: a dashboard greeting and a paginated listing of applicant
//! profiles that opted into being discoverable.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use tracing::instrument;
use uuid::Uuid;

use crate::auth::{repo::User, HrUser, Role};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/hr/dashboard", get(get_dashboard))
        .route("/hr/applicants", get(list_applicants))
}

#[derive(Debug, Serialize)]
pub struct HrDashboard {
    pub message: String,
    pub email: String,
    pub role: Role,
}

#[instrument(skip(state))]
async fn get_dashboard(
    State(state): State<AppState>,
    HrUser(user): HrUser,
) -> ApiResult<Json<HrDashboard>> {
    let account = User::find_by_id(&state.db, user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(HrDashboard {
        message: format!("Welcome back, {}", account.email),
        email: account.email,
        role: account.role,
    }))
}

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Pagination {
    fn clamp(&self) -> (i64, i64) {
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }
}

#[derive(Debug, FromRow)]
struct ApplicantRow {
    id: Uuid,
    first_name: String,
    last_name: String,
    headline: String,
    current_city: String,
    current_state: String,
    total_experience_years: i32,
    total_experience_months: i32,
    completion: i32,
}

#[derive(Debug, Serialize)]
pub struct ApplicantSummary {
    pub id: Uuid,
    pub full_name: String,
    pub headline: String,
    pub location: String,
    pub experience_display: String,
    pub completion: i32,
    pub top_skills: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ApplicantPage {
    pub count: i64,
    pub limit: i64,
    pub offset: i64,
    pub results: Vec<ApplicantSummary>,
}

fn experience_display(years: i32, months: i32) -> String {
    let y_word = if years == 1 { "year" } else { "years" };
    let m_word = if months == 1 { "month" } else { "months" };
    if years > 0 && months > 0 {
        format!("{years} {y_word} {months} {m_word}")
    } else if years > 0 {
        format!("{years} {y_word}")
    } else if months > 0 {
        format!("{months} {m_word}")
    } else {
        "Fresher".to_string()
    }
}

/// Only public, job-seeking profiles are visible to HR.
const VISIBILITY: &str = "is_public AND is_available_for_jobs";

async fn top_skills(db: &PgPool, profile_id: Uuid) -> anyhow::Result<Vec<String>> {
    let names = sqlx::query_scalar::<_, String>(
        "SELECT name FROM skills WHERE profile_id = $1 ORDER BY created_at LIMIT 5",
    )
    .bind(profile_id)
    .fetch_all(db)
    .await?;
    Ok(names)
}

#[instrument(skip(state))]
async fn list_applicants(
    State(state): State<AppState>,
    HrUser(_): HrUser,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<ApplicantPage>> {
    let (limit, offset) = page.clamp();

    let count = sqlx::query_scalar::<_, i64>(&format!(
        "SELECT count(*) FROM profiles WHERE {VISIBILITY}"
    ))
    .fetch_one(&state.db)
    .await?;

    let rows = sqlx::query_as::<_, ApplicantRow>(&format!(
        r#"
        SELECT id, first_name, last_name, headline, current_city, current_state,
               total_experience_years, total_experience_months, completion
        FROM profiles
        WHERE {VISIBILITY}
        ORDER BY completion DESC, updated_at DESC
        LIMIT $1 OFFSET $2
        "#
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.db)
    .await?;

    let mut results = Vec::with_capacity(rows.len());
    for row in rows {
        let skills = top_skills(&state.db, row.id).await?;
        let location = if row.current_city.is_empty() {
            String::new()
        } else {
            format!("{}, {}", row.current_city, row.current_state)
        };
        results.push(ApplicantSummary {
            id: row.id,
            full_name: format!("{} {}", row.first_name, row.last_name),
            headline: row.headline,
            location,
            experience_display: experience_display(
                row.total_experience_years,
                row.total_experience_months,
            ),
            completion: row.completion,
            top_skills: skills,
        });
    }

    Ok(Json(ApplicantPage {
        count,
        limit,
        offset,
        results,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_clamps_to_sane_bounds() {
        let page = Pagination {
            limit: Some(1000),
            offset: Some(-5),
        };
        assert_eq!(page.clamp(), (MAX_PAGE_SIZE, 0));

        let default = Pagination {
            limit: None,
            offset: None,
        };
        assert_eq!(default.clamp(), (DEFAULT_PAGE_SIZE, 0));

        let zero = Pagination {
            limit: Some(0),
            offset: Some(40),
        };
        assert_eq!(zero.clamp(), (1, 40));
    }

    #[test]
    fn experience_display_falls_back_to_fresher() {
        assert_eq!(experience_display(0, 0), "Fresher");
        assert_eq!(experience_display(2, 1), "2 years 1 month");
        assert_eq!(experience_display(0, 6), "6 months");
    }
}
