use axum::{
    extract::{FromRef, Path, State},
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use time::Duration as TimeDuration;
use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        claims::Role,
        dto::{
            AuthResponse, Detail, LoginRequest, PasswordResetConfirmRequest,
            PasswordResetRequest, PublicUser, RefreshRequest, RegisterRequest,
        },
        extractors::AuthUser,
        jwt::JwtKeys,
        password::{check_strength, hash_password, verify_password},
        repo::{ResetToken, User},
        reset,
    },
    error::{ApiError, ApiResult},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/password-reset", post(password_reset))
        .route(
            "/auth/password-reset-confirm/:uidb64/:token",
            post(password_reset_confirm),
        )
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn token_pair(keys: &JwtKeys, user: &User) -> anyhow::Result<AuthResponse> {
    Ok(AuthResponse {
        access_token: keys.sign_access(user.id, user.role)?,
        refresh_token: keys.sign_refresh(user.id, user.role)?,
        role: user.role,
        user: PublicUser {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
        },
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> ApiResult<Json<AuthResponse>> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::field("email", "Invalid email"));
    }
    check_strength(&payload.password)?;

    if payload.role == Role::Staff {
        return Err(ApiError::field("role", "Staff accounts cannot self-register"));
    }

    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::field("email", "Email already registered"));
    }

    let hash = hash_password(&payload.password)?;
    let user = User::create(&state.db, &payload.email, &hash, payload.role).await?;

    let keys = JwtKeys::from_ref(&state);
    let response = token_pair(&keys, &user)?;

    info!(user_id = %user.id, email = %user.email, role = ?user.role, "user registered");
    Ok(Json(response))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::field("email", "Invalid email"));
    }

    let user = match User::find_by_email(&state.db, &payload.email).await? {
        Some(u) => u,
        None => {
            warn!(email = %payload.email, "login unknown email");
            return Err(ApiError::validation("Invalid credentials"));
        }
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err(ApiError::validation("Invalid credentials"));
    }

    let keys = JwtKeys::from_ref(&state);
    let response = token_pair(&keys, &user)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(response))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|_| ApiError::Unauthenticated("Invalid refresh token".into()))?;

    // Re-read the user so a role change takes effect on the next pair.
    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthenticated("User not found".into()))?;

    let response = token_pair(&keys, &user)?;
    Ok(Json(response))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<PublicUser>> {
    let user = User::find_by_id(&state.db, user.id)
        .await?
        .ok_or_else(|| ApiError::Unauthenticated("User not found".into()))?;

    Ok(Json(PublicUser {
        id: user.id,
        email: user.email,
        role: user.role,
    }))
}

#[instrument(skip(state, payload))]
pub async fn password_reset(
    State(state): State<AppState>,
    Json(mut payload): Json<PasswordResetRequest>,
) -> ApiResult<Json<Detail>> {
    payload.email = payload.email.trim().to_lowercase();

    let user = User::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| ApiError::field("email", "No user found with this email"))?;

    let token = reset::generate_token();
    let expires_at =
        OffsetDateTime::now_utc() + TimeDuration::minutes(state.config.reset_token_ttl_minutes);
    ResetToken::issue(&state.db, user.id, &token, expires_at).await?;

    let link = reset::reset_link(&state.config.public_base_url, user.id, &token);
    state
        .mailer
        .send(
            &user.email,
            "Password Reset",
            &format!("Reset your password using the link: {link}"),
        )
        .await?;

    info!(user_id = %user.id, "password reset link issued");
    Ok(Json(Detail::new("Password reset link sent.")))
}

#[instrument(skip(state, payload))]
pub async fn password_reset_confirm(
    State(state): State<AppState>,
    Path((uidb64, token)): Path<(String, String)>,
    Json(payload): Json<PasswordResetConfirmRequest>,
) -> ApiResult<Json<Detail>> {
    check_strength(&payload.password)?;

    let user_id = reset::decode_uid(&uidb64)?;
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::validation("Invalid user"))?;

    // Tokens are single-use and time-bound; anything else is indistinguishable
    // from tampering and leaves the password untouched.
    let stored = ResetToken::find_valid(&state.db, user.id, &token)
        .await?
        .ok_or_else(|| ApiError::validation("Invalid or expired token"))?;

    let hash = hash_password(&payload.password)?;
    User::set_password_hash(&state.db, user.id, &hash).await?;
    ResetToken::mark_used(&state.db, stored.id).await?;

    info!(user_id = %user.id, "password reset confirmed");
    Ok(Json(Detail::new("Password reset successful.")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_regex_accepts_plausible_addresses() {
        assert!(is_valid_email("jane@example.com"));
        assert!(is_valid_email("jane.doe+tag@sub.example.co"));
        assert!(!is_valid_email("jane@example"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("spaces in@example.com"));
    }
}
