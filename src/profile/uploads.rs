//! Resume and photo uploads. Files land in the blob store under a
//! per-user prefix; downloads redirect to a short-lived presigned URL.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    response::Redirect,
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::ApplicantUser;
use crate::error::{ApiError, ApiResult};
use crate::records::require_profile;
use crate::state::AppState;
use crate::validation::{UploadRule, PHOTO_RULE, RESUME_RULE};

use super::completion;
use super::repo::Profile;

const PRESIGN_SECONDS: u64 = 300;
// Multipart envelope overhead on top of the largest allowed file.
const BODY_LIMIT: usize = 8 * 1024 * 1024;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile/resume", post(upload_resume).get(download_resume))
        .route("/profile/photo", post(upload_photo).get(download_photo))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
}

struct Upload {
    filename: String,
    content_type: String,
    data: Bytes,
}

/// Pull the first file field out of a multipart body.
async fn read_upload(mut multipart: Multipart, field_name: &str) -> ApiResult<Upload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some(field_name) {
            continue;
        }
        let filename = field
            .file_name()
            .ok_or_else(|| ApiError::field(field_name, "Filename is required"))?
            .to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::validation(format!("Failed to read upload: {e}")))?;
        return Ok(Upload {
            filename,
            content_type,
            data,
        });
    }
    Err(ApiError::field(field_name, "Required"))
}

async fn store_upload(
    state: &AppState,
    user_id: Uuid,
    prefix: &str,
    rule: &UploadRule,
    upload: Upload,
) -> ApiResult<String> {
    let ext = rule.check(&upload.filename, upload.data.len())?;
    let key = format!("{prefix}/{user_id}/{}.{ext}", Uuid::new_v4());
    state
        .storage
        .put_object(&key, upload.data, &upload.content_type)
        .await?;
    Ok(key)
}

#[instrument(skip(state, multipart))]
async fn upload_resume(
    State(state): State<AppState>,
    ApplicantUser(user): ApplicantUser,
    multipart: Multipart,
) -> ApiResult<axum::Json<serde_json::Value>> {
    let profile_id = require_profile(&state.db, &user).await?;
    let upload = read_upload(multipart, RESUME_RULE.field).await?;
    let old_key = Profile::find_by_user(&state.db, user.id)
        .await?
        .and_then(|p| p.resume_key);

    let key = store_upload(&state, user.id, "resumes", &RESUME_RULE, upload).await?;
    Profile::set_resume(&state.db, profile_id, &key).await?;
    let score = completion::recompute(&state.db, profile_id).await?;

    if let Some(old) = old_key {
        if let Err(e) = state.storage.delete_object(&old).await {
            tracing::warn!(key = %old, error = ?e, "failed to delete previous resume");
        }
    }

    info!(profile_id = %profile_id, %key, "resume uploaded");
    Ok(axum::Json(serde_json::json!({
        "resume_key": key,
        "completion": score,
    })))
}

#[instrument(skip(state, multipart))]
async fn upload_photo(
    State(state): State<AppState>,
    ApplicantUser(user): ApplicantUser,
    multipart: Multipart,
) -> ApiResult<axum::Json<serde_json::Value>> {
    let profile_id = require_profile(&state.db, &user).await?;
    let upload = read_upload(multipart, PHOTO_RULE.field).await?;
    let old_key = Profile::find_by_user(&state.db, user.id)
        .await?
        .and_then(|p| p.photo_key);

    let key = store_upload(&state, user.id, "photos", &PHOTO_RULE, upload).await?;
    Profile::set_photo(&state.db, profile_id, &key).await?;
    let score = completion::recompute(&state.db, profile_id).await?;

    if let Some(old) = old_key {
        if let Err(e) = state.storage.delete_object(&old).await {
            tracing::warn!(key = %old, error = ?e, "failed to delete previous photo");
        }
    }

    info!(profile_id = %profile_id, %key, "photo uploaded");
    Ok(axum::Json(serde_json::json!({
        "photo_key": key,
        "completion": score,
    })))
}

#[instrument(skip(state))]
async fn download_resume(
    State(state): State<AppState>,
    ApplicantUser(user): ApplicantUser,
) -> ApiResult<Redirect> {
    let profile = Profile::find_by_user(&state.db, user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Profile not found"))?;
    let key = profile
        .resume_key
        .ok_or_else(|| ApiError::not_found("No resume uploaded"))?;
    let url = state.storage.presign_get(&key, PRESIGN_SECONDS).await?;
    Ok(Redirect::temporary(&url))
}

#[instrument(skip(state))]
async fn download_photo(
    State(state): State<AppState>,
    ApplicantUser(user): ApplicantUser,
) -> ApiResult<Redirect> {
    let profile = Profile::find_by_user(&state.db, user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Profile not found"))?;
    let key = profile
        .photo_key
        .ok_or_else(|| ApiError::not_found("No photo uploaded"))?;
    let url = state.storage.presign_get(&key, PRESIGN_SECONDS).await?;
    Ok(Redirect::temporary(&url))
}
