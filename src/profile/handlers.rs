use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::{ApplicantUser, AuthUser, Role};
use crate::error::{ApiError, ApiResult};
use crate::records;
use crate::state::AppState;

use super::completion;
use super::dto::{
    CompleteProfileResponse, CompletionBreakdown, CompletionResponse, CreateProfileRequest,
    ProfileResponse, UpdateProfileRequest,
};
use super::repo::Profile;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profiles", post(create_profile))
        .route(
            "/profiles/my_profile",
            get(get_my_profile).put(update_my_profile).patch(update_my_profile),
        )
        .route("/profiles/:id", get(get_profile))
        .route("/profile/completion", get(get_completion))
}

#[instrument(skip(state, payload))]
async fn create_profile(
    State(state): State<AppState>,
    ApplicantUser(user): ApplicantUser,
    Json(payload): Json<CreateProfileRequest>,
) -> ApiResult<(StatusCode, Json<ProfileResponse>)> {
    if payload.first_name.trim().is_empty() || payload.last_name.trim().is_empty() {
        return Err(ApiError::validation("First and last name are required"));
    }
    if Profile::id_for_user(&state.db, user.id).await?.is_some() {
        return Err(ApiError::validation("Profile already exists"));
    }

    let email = payload.email.as_deref().unwrap_or_default();
    let profile = Profile::create(
        &state.db,
        user.id,
        payload.first_name.trim(),
        payload.last_name.trim(),
        email,
    )
    .await?;
    completion::recompute(&state.db, profile.id).await?;

    info!(profile_id = %profile.id, "profile created");
    let profile = Profile::find_by_user(&state.db, user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Profile not found"))?;
    Ok((
        StatusCode::CREATED,
        Json(ProfileResponse::load(&state.db, profile).await?),
    ))
}

/// The composite read: profile plus every child collection in one payload.
#[instrument(skip(state))]
async fn get_my_profile(
    State(state): State<AppState>,
    ApplicantUser(user): ApplicantUser,
) -> ApiResult<Json<CompleteProfileResponse>> {
    let profile = Profile::find_by_user(&state.db, user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Profile not found"))?;
    let profile_id = profile.id;

    let education = records::education::list_for_profile(&state.db, profile_id).await?;
    let work_experience = records::experience::list_for_profile(&state.db, profile_id).await?;
    let skills = records::skills::list_for_profile(&state.db, profile_id).await?;
    let projects = records::projects::list_for_profile(&state.db, profile_id).await?;
    let certifications = records::certifications::list_for_profile(&state.db, profile_id).await?;
    let social_links = records::social_links::list_for_profile(&state.db, profile_id).await?;
    let job_preferences = match records::preferences::find_for_profile(&state.db, profile_id).await?
    {
        Some(record) => {
            let industries =
                records::preferences::industries_for_profile(&state.db, profile_id).await?;
            let salary_range = record.salary_range();
            Some(records::preferences::JobPreferenceView {
                record,
                preferred_industries: industries,
                salary_range,
            })
        }
        None => None,
    };

    Ok(Json(CompleteProfileResponse {
        profile: ProfileResponse::load(&state.db, profile).await?,
        education: education.into_iter().map(Into::into).collect(),
        work_experience: work_experience.into_iter().map(Into::into).collect(),
        skills,
        projects: projects.into_iter().map(Into::into).collect(),
        certifications: certifications.into_iter().map(Into::into).collect(),
        social_links,
        job_preferences,
    }))
}

#[instrument(skip(state, payload))]
async fn update_my_profile(
    State(state): State<AppState>,
    ApplicantUser(user): ApplicantUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> ApiResult<Json<ProfileResponse>> {
    let mut profile = Profile::find_by_user(&state.db, user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Profile not found"))?;

    payload.apply_to(&mut profile);
    profile.save(&state.db).await?;
    if let Some(ids) = &payload.preferred_location_ids {
        Profile::set_preferred_locations(&state.db, profile.id, ids).await?;
    }
    profile.completion = completion::recompute(&state.db, profile.id).await?;

    Ok(Json(ProfileResponse::load(&state.db, profile).await?))
}

/// Fetch by profile id. Applicants only resolve their own row, HR also sees
/// public profiles, staff sees everything. A hidden id comes back as 404,
/// never 403.
#[instrument(skip(state))]
async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Path(profile_id): Path<Uuid>,
) -> ApiResult<Json<ProfileResponse>> {
    let profile = match user.role {
        Role::Hr => Profile::find_visible_to_hr(&state.db, profile_id, user.id).await?,
        _ => Profile::find_scoped(&state.db, profile_id, user.scope()).await?,
    }
    .ok_or_else(|| ApiError::not_found("Profile not found"))?;
    Ok(Json(ProfileResponse::load(&state.db, profile).await?))
}

#[instrument(skip(state))]
async fn get_completion(
    State(state): State<AppState>,
    ApplicantUser(user): ApplicantUser,
) -> ApiResult<Json<CompletionResponse>> {
    let profile_id = records::require_profile(&state.db, &user).await?;
    let facts = completion::facts_for(&state.db, profile_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Profile not found"))?;
    let score = completion::recompute(&state.db, profile_id).await?;
    Ok(Json(CompletionResponse {
        completion: score,
        breakdown: CompletionBreakdown::from(facts),
    }))
}
