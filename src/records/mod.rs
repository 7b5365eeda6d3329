//! Child collections owned by a profile: education, work experience, skills,
//! projects, certifications, social links and the 1:1 job preferences.
//! Every query here is pre-filtered by the caller's profile, so foreign
//! records surface as 404 rather than 403.

use axum::Router;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::profile::repo::Profile;
use crate::state::AppState;

pub mod certifications;
pub mod education;
pub mod experience;
pub mod preferences;
pub mod projects;
pub mod skills;
pub mod social_links;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(education::router())
        .merge(experience::router())
        .merge(skills::router())
        .merge(projects::router())
        .merge(certifications::router())
        .merge(social_links::router())
        .merge(preferences::router())
}

/// Resolve the caller's profile id; child endpoints require one to exist.
pub(crate) async fn require_profile(db: &PgPool, user: &AuthUser) -> ApiResult<Uuid> {
    Profile::id_for_user(db, user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Profile not found"))
}
