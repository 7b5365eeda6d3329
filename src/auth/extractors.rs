use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use crate::auth::claims::{Role, TokenKind};
use crate::auth::jwt::JwtKeys;
use crate::error::ApiError;

/// Query scope derived from the caller's role: staff reads without
/// restriction, everyone else only their own records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Owner(Uuid),
    Unrestricted,
}

/// Extracts and validates the bearer token, yielding the caller's identity.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

impl AuthUser {
    pub fn scope(&self) -> Scope {
        match self.role {
            Role::Staff => Scope::Unrestricted,
            _ => Scope::Owner(self.id),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthenticated("Missing Authorization header".into()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .ok_or_else(|| ApiError::Unauthenticated("Invalid Authorization header".into()))?;

        let claims = match keys.verify(token) {
            Ok(c) => c,
            Err(_) => {
                warn!("invalid or expired token");
                return Err(ApiError::Unauthenticated("Invalid or expired token".into()));
            }
        };

        if claims.kind != TokenKind::Access {
            return Err(ApiError::Unauthenticated("Access token required".into()));
        }

        Ok(AuthUser {
            id: claims.sub,
            role: claims.role,
        })
    }
}

/// Gate for applicant-only endpoints; staff passes everywhere.
#[derive(Debug, Clone, Copy)]
pub struct ApplicantUser(pub AuthUser);

#[async_trait]
impl<S> FromRequestParts<S> for ApplicantUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        match user.role {
            Role::Applicant | Role::Staff => Ok(ApplicantUser(user)),
            Role::Hr => Err(ApiError::Forbidden("Applicant access required".into())),
        }
    }
}

/// Gate for HR-only endpoints; staff passes everywhere.
#[derive(Debug, Clone, Copy)]
pub struct HrUser(pub AuthUser);

#[async_trait]
impl<S> FromRequestParts<S> for HrUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        match user.role {
            Role::Hr | Role::Staff => Ok(HrUser(user)),
            Role::Applicant => Err(ApiError::Forbidden("HR access required".into())),
        }
    }
}

/// Gate for staff-only endpoints.
#[derive(Debug, Clone, Copy)]
pub struct StaffUser(pub AuthUser);

#[async_trait]
impl<S> FromRequestParts<S> for StaffUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        match user.role {
            Role::Staff => Ok(StaffUser(user)),
            _ => Err(ApiError::Forbidden("Staff access required".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staff_scope_is_unrestricted() {
        let staff = AuthUser {
            id: Uuid::new_v4(),
            role: Role::Staff,
        };
        assert_eq!(staff.scope(), Scope::Unrestricted);
    }

    #[test]
    fn applicant_and_hr_scope_to_their_own_records() {
        let id = Uuid::new_v4();
        let applicant = AuthUser {
            id,
            role: Role::Applicant,
        };
        assert_eq!(applicant.scope(), Scope::Owner(id));
        let hr = AuthUser { id, role: Role::Hr };
        assert_eq!(hr.scope(), Scope::Owner(id));
    }
}
