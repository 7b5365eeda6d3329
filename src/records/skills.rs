use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
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

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Skill {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub profile_id: Uuid,
    pub name: String,
    pub skill_type: String,
    pub proficiency: String,
    pub years_of_experience: i32,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
pub struct SkillPayload {
    pub name: String,
    pub skill_type: String,
    pub proficiency: String,
    #[serde(default)]
    pub years_of_experience: i32,
}

/// Bulk add: creates the named skills that do not exist yet, skipping
/// duplicates instead of failing.
#[derive(Debug, Deserialize)]
pub struct BulkSkillsPayload {
    pub skills: Vec<String>,
    pub skill_type: String,
    pub proficiency: String,
}

pub async fn list_for_profile(db: &PgPool, profile_id: Uuid) -> anyhow::Result<Vec<Skill>> {
    let rows = sqlx::query_as::<_, Skill>(
        r#"
        SELECT id, profile_id, name, skill_type, proficiency,
               years_of_experience, created_at
        FROM skills
        WHERE profile_id = $1
        ORDER BY created_at ASC
        "#,
    )
    .bind(profile_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Case-insensitive duplicate check, excluding the record being updated.
async fn name_taken(
    db: &PgPool,
    profile_id: Uuid,
    name: &str,
    exclude: Option<Uuid>,
) -> anyhow::Result<bool> {
    let taken = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM skills
            WHERE profile_id = $1 AND lower(name) = lower($2)
              AND ($3::uuid IS NULL OR id <> $3)
        )
        "#,
    )
    .bind(profile_id)
    .bind(name)
    .bind(exclude)
    .fetch_one(db)
    .await?;
    Ok(taken)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/skills", get(list).post(create))
        .route("/skills/bulk", post(create_bulk))
        .route("/skills/:id", get(get_one).put(update).delete(delete_one))
}

#[instrument(skip(state))]
async fn list(
    State(state): State<AppState>,
    ApplicantUser(user): ApplicantUser,
) -> ApiResult<Json<Vec<Skill>>> {
    let profile_id = require_profile(&state.db, &user).await?;
    Ok(Json(list_for_profile(&state.db, profile_id).await?))
}

#[instrument(skip(state, payload))]
async fn create(
    State(state): State<AppState>,
    ApplicantUser(user): ApplicantUser,
    Json(payload): Json<SkillPayload>,
) -> ApiResult<(StatusCode, Json<Skill>)> {
    let profile_id = require_profile(&state.db, &user).await?;

    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ApiError::field("name", "Required"));
    }
    if name_taken(&state.db, profile_id, name, None).await? {
        return Err(ApiError::field(
            "name",
            "You already have this skill in your profile",
        ));
    }

    let row = sqlx::query_as::<_, Skill>(
        r#"
        INSERT INTO skills (profile_id, name, skill_type, proficiency, years_of_experience)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, profile_id, name, skill_type, proficiency,
                  years_of_experience, created_at
        "#,
    )
    .bind(profile_id)
    .bind(name)
    .bind(&payload.skill_type)
    .bind(&payload.proficiency)
    .bind(payload.years_of_experience)
    .fetch_one(&state.db)
    .await?;

    completion::recompute(&state.db, profile_id).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

#[instrument(skip(state, payload))]
async fn create_bulk(
    State(state): State<AppState>,
    ApplicantUser(user): ApplicantUser,
    Json(payload): Json<BulkSkillsPayload>,
) -> ApiResult<(StatusCode, Json<Vec<Skill>>)> {
    let profile_id = require_profile(&state.db, &user).await?;
    if payload.skills.is_empty() {
        return Err(ApiError::field("skills", "At least one skill is required"));
    }
    if payload.skills.len() > 50 {
        return Err(ApiError::field("skills", "At most 50 skills per request"));
    }

    let mut created = Vec::new();
    for raw in &payload.skills {
        let name = raw.trim();
        if name.is_empty() || name_taken(&state.db, profile_id, name, None).await? {
            continue;
        }
        let row = sqlx::query_as::<_, Skill>(
            r#"
            INSERT INTO skills (profile_id, name, skill_type, proficiency, years_of_experience)
            VALUES ($1, $2, $3, $4, 0)
            RETURNING id, profile_id, name, skill_type, proficiency,
                      years_of_experience, created_at
            "#,
        )
        .bind(profile_id)
        .bind(name)
        .bind(&payload.skill_type)
        .bind(&payload.proficiency)
        .fetch_one(&state.db)
        .await?;
        created.push(row);
    }

    completion::recompute(&state.db, profile_id).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[instrument(skip(state))]
async fn get_one(
    State(state): State<AppState>,
    ApplicantUser(user): ApplicantUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Skill>> {
    let profile_id = require_profile(&state.db, &user).await?;
    let row = sqlx::query_as::<_, Skill>(
        r#"
        SELECT id, profile_id, name, skill_type, proficiency,
               years_of_experience, created_at
        FROM skills
        WHERE id = $1 AND profile_id = $2
        "#,
    )
    .bind(id)
    .bind(profile_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Skill not found"))?;
    Ok(Json(row))
}

#[instrument(skip(state, payload))]
async fn update(
    State(state): State<AppState>,
    ApplicantUser(user): ApplicantUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<SkillPayload>,
) -> ApiResult<Json<Skill>> {
    let profile_id = require_profile(&state.db, &user).await?;

    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ApiError::field("name", "Required"));
    }
    if name_taken(&state.db, profile_id, name, Some(id)).await? {
        return Err(ApiError::field(
            "name",
            "You already have this skill in your profile",
        ));
    }

    let row = sqlx::query_as::<_, Skill>(
        r#"
        UPDATE skills SET
            name = $3, skill_type = $4, proficiency = $5, years_of_experience = $6
        WHERE id = $1 AND profile_id = $2
        RETURNING id, profile_id, name, skill_type, proficiency,
                  years_of_experience, created_at
        "#,
    )
    .bind(id)
    .bind(profile_id)
    .bind(name)
    .bind(&payload.skill_type)
    .bind(&payload.proficiency)
    .bind(payload.years_of_experience)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Skill not found"))?;

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
    let result = sqlx::query("DELETE FROM skills WHERE id = $1 AND profile_id = $2")
        .bind(id)
        .bind(profile_id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Skill not found"));
    }
    completion::recompute(&state.db, profile_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
