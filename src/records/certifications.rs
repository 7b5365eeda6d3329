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
use crate::validation::check_optional_span;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Certification {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub profile_id: Uuid,
    pub name: String,
    pub issuing_organization: String,
    pub issue_date: Date,
    pub expiry_date: Option<Date>,
    pub credential_id: String,
    pub credential_url: Option<String>,
    pub created_at: OffsetDateTime,
}

impl Certification {
    pub fn is_expired_on(&self, today: Date) -> bool {
        self.expiry_date.map(|d| d < today).unwrap_or(false)
    }
}

#[derive(Debug, Serialize)]
pub struct CertificationView {
    #[serde(flatten)]
    pub record: Certification,
    pub is_expired: bool,
}

impl From<Certification> for CertificationView {
    fn from(record: Certification) -> Self {
        let is_expired = record.is_expired_on(OffsetDateTime::now_utc().date());
        Self { record, is_expired }
    }
}

#[derive(Debug, Deserialize)]
pub struct CertificationPayload {
    pub name: String,
    pub issuing_organization: String,
    pub issue_date: Date,
    pub expiry_date: Option<Date>,
    #[serde(default)]
    pub credential_id: String,
    pub credential_url: Option<String>,
}

impl CertificationPayload {
    fn validate(&self) -> ApiResult<()> {
        check_optional_span(&self.issue_date, self.expiry_date.as_ref(), "expiry_date")
    }
}

const COLUMNS: &str = r#"
    id, profile_id, name, issuing_organization, issue_date, expiry_date,
    credential_id, credential_url, created_at
"#;

pub async fn list_for_profile(
    db: &PgPool,
    profile_id: Uuid,
) -> anyhow::Result<Vec<Certification>> {
    let rows = sqlx::query_as::<_, Certification>(&format!(
        "SELECT {COLUMNS} FROM certifications WHERE profile_id = $1 ORDER BY issue_date DESC"
    ))
    .bind(profile_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/certifications", get(list).post(create))
        .route(
            "/certifications/:id",
            get(get_one).put(update).delete(delete_one),
        )
}

#[instrument(skip(state))]
async fn list(
    State(state): State<AppState>,
    ApplicantUser(user): ApplicantUser,
) -> ApiResult<Json<Vec<CertificationView>>> {
    let profile_id = require_profile(&state.db, &user).await?;
    let rows = list_for_profile(&state.db, profile_id).await?;
    Ok(Json(rows.into_iter().map(CertificationView::from).collect()))
}

#[instrument(skip(state, payload))]
async fn create(
    State(state): State<AppState>,
    ApplicantUser(user): ApplicantUser,
    Json(payload): Json<CertificationPayload>,
) -> ApiResult<(StatusCode, Json<CertificationView>)> {
    let profile_id = require_profile(&state.db, &user).await?;
    payload.validate()?;

    let row = sqlx::query_as::<_, Certification>(&format!(
        r#"
        INSERT INTO certifications (profile_id, name, issuing_organization,
                                    issue_date, expiry_date, credential_id,
                                    credential_url)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(profile_id)
    .bind(&payload.name)
    .bind(&payload.issuing_organization)
    .bind(payload.issue_date)
    .bind(payload.expiry_date)
    .bind(&payload.credential_id)
    .bind(&payload.credential_url)
    .fetch_one(&state.db)
    .await?;

    completion::recompute(&state.db, profile_id).await?;
    Ok((StatusCode::CREATED, Json(CertificationView::from(row))))
}

#[instrument(skip(state))]
async fn get_one(
    State(state): State<AppState>,
    ApplicantUser(user): ApplicantUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CertificationView>> {
    let profile_id = require_profile(&state.db, &user).await?;
    let row = sqlx::query_as::<_, Certification>(&format!(
        "SELECT {COLUMNS} FROM certifications WHERE id = $1 AND profile_id = $2"
    ))
    .bind(id)
    .bind(profile_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Certification not found"))?;
    Ok(Json(CertificationView::from(row)))
}

#[instrument(skip(state, payload))]
async fn update(
    State(state): State<AppState>,
    ApplicantUser(user): ApplicantUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CertificationPayload>,
) -> ApiResult<Json<CertificationView>> {
    let profile_id = require_profile(&state.db, &user).await?;
    payload.validate()?;

    let row = sqlx::query_as::<_, Certification>(&format!(
        r#"
        UPDATE certifications SET
            name = $3, issuing_organization = $4, issue_date = $5,
            expiry_date = $6, credential_id = $7, credential_url = $8
        WHERE id = $1 AND profile_id = $2
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(profile_id)
    .bind(&payload.name)
    .bind(&payload.issuing_organization)
    .bind(payload.issue_date)
    .bind(payload.expiry_date)
    .bind(&payload.credential_id)
    .bind(&payload.credential_url)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Certification not found"))?;

    completion::recompute(&state.db, profile_id).await?;
    Ok(Json(CertificationView::from(row)))
}

#[instrument(skip(state))]
async fn delete_one(
    State(state): State<AppState>,
    ApplicantUser(user): ApplicantUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let profile_id = require_profile(&state.db, &user).await?;
    let result = sqlx::query("DELETE FROM certifications WHERE id = $1 AND profile_id = $2")
        .bind(id)
        .bind(profile_id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Certification not found"));
    }
    completion::recompute(&state.db, profile_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn expiry_before_issue_is_rejected() {
        let p = CertificationPayload {
            name: "AWS SAA".into(),
            issuing_organization: "AWS".into(),
            issue_date: date!(2023 - 05 - 01),
            expiry_date: Some(date!(2022 - 05 - 01)),
            credential_id: String::new(),
            credential_url: None,
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn expiry_flag_reflects_today() {
        let record = Certification {
            id: Uuid::new_v4(),
            profile_id: Uuid::new_v4(),
            name: "AWS SAA".into(),
            issuing_organization: "AWS".into(),
            issue_date: date!(2020 - 01 - 01),
            expiry_date: Some(date!(2023 - 01 - 01)),
            credential_id: String::new(),
            credential_url: None,
            created_at: OffsetDateTime::now_utc(),
        };
        assert!(record.is_expired_on(date!(2024 - 01 - 01)));
        assert!(!record.is_expired_on(date!(2022 - 01 - 01)));

        let mut open = record.clone();
        open.expiry_date = None;
        assert!(!open.is_expired_on(date!(2024 - 01 - 01)));
    }
}
