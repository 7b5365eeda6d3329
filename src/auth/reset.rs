//! Password-reset token plumbing: opaque random tokens plus the URL-safe
//! user-id encoding used in reset links.

use base64ct::{Base64UrlUnpadded, Encoding};
use rand::RngCore;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

const TOKEN_BYTES: usize = 32;

/// Random URL-safe token for the reset link.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    Base64UrlUnpadded::encode_string(&bytes)
}

/// Encode a user id for the `/:uidb64/` path segment.
pub fn encode_uid(user_id: Uuid) -> String {
    Base64UrlUnpadded::encode_string(user_id.as_bytes())
}

/// Decode the `/:uidb64/` path segment back into a user id. Any malformed
/// input maps to a plain validation error to avoid leaking which part of
/// the link was wrong.
pub fn decode_uid(uidb64: &str) -> ApiResult<Uuid> {
    let bytes = Base64UrlUnpadded::decode_vec(uidb64)
        .map_err(|_| ApiError::validation("Invalid reset link"))?;
    Uuid::from_slice(&bytes).map_err(|_| ApiError::validation("Invalid reset link"))
}

pub fn reset_link(base_url: &str, user_id: Uuid, token: &str) -> String {
    format!(
        "{}/api/v1/auth/password-reset-confirm/{}/{}",
        base_url.trim_end_matches('/'),
        encode_uid(user_id),
        token
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uid_roundtrip() {
        let id = Uuid::new_v4();
        let encoded = encode_uid(id);
        assert_eq!(decode_uid(&encoded).unwrap(), id);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_uid("not base64 at all!").is_err());
        // Valid base64, wrong length for a UUID.
        assert!(decode_uid(&Base64UrlUnpadded::encode_string(b"short")).is_err());
    }

    #[test]
    fn tokens_are_unique_and_urlsafe() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert!(!a.contains('+') && !a.contains('/') && !a.contains('='));
    }

    #[test]
    fn link_contains_uid_and_token() {
        let id = Uuid::new_v4();
        let link = reset_link("http://localhost:8080/", id, "tok123");
        assert!(link.starts_with(
            "http://localhost:8080/api/v1/auth/password-reset-confirm/"
        ));
        assert!(link.ends_with("/tok123"));
        assert!(link.contains(&encode_uid(id)));
    }
}
