use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
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
use crate::validation::check_social_url;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SocialLink {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub profile_id: Uuid,
    pub platform: String,
    pub url: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
pub struct SocialLinkPayload {
    pub platform: String,
    pub url: String,
}

impl SocialLinkPayload {
    fn validate(&self) -> ApiResult<()> {
        check_social_url(&self.platform, &self.url)
    }
}

pub async fn list_for_profile(db: &PgPool, profile_id: Uuid) -> anyhow::Result<Vec<SocialLink>> {
    let rows = sqlx::query_as::<_, SocialLink>(
        r#"
        SELECT id, profile_id, platform, url, created_at
        FROM social_links
        WHERE profile_id = $1
        ORDER BY platform
        "#,
    )
    .bind(profile_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// One link per platform and profile.
async fn platform_taken(
    db: &PgPool,
    profile_id: Uuid,
    platform: &str,
    exclude: Option<Uuid>,
) -> anyhow::Result<bool> {
    let taken = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM social_links
            WHERE profile_id = $1 AND platform = $2
              AND ($3::uuid IS NULL OR id <> $3)
        )
        "#,
    )
    .bind(profile_id)
    .bind(platform)
    .bind(exclude)
    .fetch_one(db)
    .await?;
    Ok(taken)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/social-links", get(list).post(create))
        .route(
            "/social-links/:id",
            get(get_one).put(update).delete(delete_one),
        )
}

#[instrument(skip(state))]
async fn list(
    State(state): State<AppState>,
    ApplicantUser(user): ApplicantUser,
) -> ApiResult<Json<Vec<SocialLink>>> {
    let profile_id = require_profile(&state.db, &user).await?;
    Ok(Json(list_for_profile(&state.db, profile_id).await?))
}

#[instrument(skip(state, payload))]
async fn create(
    State(state): State<AppState>,
    ApplicantUser(user): ApplicantUser,
    Json(payload): Json<SocialLinkPayload>,
) -> ApiResult<(StatusCode, Json<SocialLink>)> {
    let profile_id = require_profile(&state.db, &user).await?;
    payload.validate()?;

    if platform_taken(&state.db, profile_id, &payload.platform, None).await? {
        return Err(ApiError::field(
            "platform",
            "A link for this platform already exists",
        ));
    }

    let row = sqlx::query_as::<_, SocialLink>(
        r#"
        INSERT INTO social_links (profile_id, platform, url)
        VALUES ($1, $2, $3)
        RETURNING id, profile_id, platform, url, created_at
        "#,
    )
    .bind(profile_id)
    .bind(&payload.platform)
    .bind(&payload.url)
    .fetch_one(&state.db)
    .await?;

    completion::recompute(&state.db, profile_id).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

#[instrument(skip(state))]
async fn get_one(
    State(state): State<AppState>,
    ApplicantUser(user): ApplicantUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SocialLink>> {
    let profile_id = require_profile(&state.db, &user).await?;
    let row = sqlx::query_as::<_, SocialLink>(
        "SELECT id, profile_id, platform, url, created_at FROM social_links WHERE id = $1 AND profile_id = $2",
    )
    .bind(id)
    .bind(profile_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Social link not found"))?;
    Ok(Json(row))
}

#[instrument(skip(state, payload))]
async fn update(
    State(state): State<AppState>,
    ApplicantUser(user): ApplicantUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<SocialLinkPayload>,
) -> ApiResult<Json<SocialLink>> {
    let profile_id = require_profile(&state.db, &user).await?;
    payload.validate()?;

    if platform_taken(&state.db, profile_id, &payload.platform, Some(id)).await? {
        return Err(ApiError::field(
            "platform",
            "A link for this platform already exists",
        ));
    }

    let row = sqlx::query_as::<_, SocialLink>(
        r#"
        UPDATE social_links SET platform = $3, url = $4
        WHERE id = $1 AND profile_id = $2
        RETURNING id, profile_id, platform, url, created_at
        "#,
    )
    .bind(id)
    .bind(profile_id)
    .bind(&payload.platform)
    .bind(&payload.url)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Social link not found"))?;

    completion::recompute(&state.db, profile_id).await?;
    Ok(Json(row))
}

#[instrument(skip(state))]
async fn delete_one(
    State(state): State<AppState>,
    ApplicantUser(user): ApplicantUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let profile_id = require_profile(&state.db, &user).await?;
    let result = sqlx::query("DELETE FROM social_links WHERE id = $1 AND profile_id = $2")
        .bind(id)
        .bind(profile_id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Social link not found"));
    }
    completion::recompute(&state.db, profile_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linkedin_url_must_point_at_linkedin() {
        let bad = SocialLinkPayload {
            platform: "linkedin".into(),
            url: "https://example.com/in/jane".into(),
        };
        assert!(bad.validate().is_err());

        let good = SocialLinkPayload {
            platform: "linkedin".into(),
            url: "https://www.linkedin.com/in/jane".into(),
        };
        assert!(good.validate().is_ok());
    }

    #[test]
    fn portfolio_url_is_unconstrained() {
        let p = SocialLinkPayload {
            platform: "portfolio".into(),
            url: "https://jane.dev".into(),
        };
        assert!(p.validate().is_ok());
    }
}
