//! Per-entity invariant checks shared by the record handlers. All failures
//! surface as field-level `ApiError::FieldValidation` payloads.

use rust_decimal::Decimal;

use crate::error::{ApiError, ApiResult};

/// Temporal-span rule for records carrying (start, optional end, current
/// flag): exactly one of {end present, flag true} must hold, and the span
/// must be ordered when closed.
pub fn check_span<T: PartialOrd>(
    start: &T,
    end: Option<&T>,
    is_current: bool,
    end_field: &str,
) -> ApiResult<()> {
    if is_current && end.is_some() {
        return Err(ApiError::field(
            end_field,
            "Must not be set while the record is marked current",
        ));
    }
    if !is_current && end.is_none() {
        return Err(ApiError::field(
            end_field,
            "Required for a completed record",
        ));
    }
    if let Some(end) = end {
        if start > end {
            return Err(ApiError::field(end_field, "Must not precede the start"));
        }
    }
    Ok(())
}

/// Ordering check for optional spans that never carry a current flag
/// (certification issue/expiry).
pub fn check_optional_span<T: PartialOrd>(
    start: &T,
    end: Option<&T>,
    end_field: &str,
) -> ApiResult<()> {
    if let Some(end) = end {
        if start > end {
            return Err(ApiError::field(end_field, "Must not precede the start"));
        }
    }
    Ok(())
}

const KNOWN_PLATFORM_HOSTS: &[(&str, &str)] = &[
    ("linkedin", "linkedin.com"),
    ("github", "github.com"),
    ("twitter", "twitter.com"),
    ("stackoverflow", "stackoverflow.com"),
];

/// Platforms with a known domain must link into that domain; anything else
/// (portfolio, behance, other, ...) is unconstrained.
pub fn check_social_url(platform: &str, url: &str) -> ApiResult<()> {
    for (name, host) in KNOWN_PLATFORM_HOSTS {
        if platform.eq_ignore_ascii_case(name) {
            if url.to_ascii_lowercase().contains(host) {
                return Ok(());
            }
            return Err(ApiError::field(
                "url",
                format!("Please provide a valid {platform} URL"),
            ));
        }
    }
    Ok(())
}

pub fn check_salary_range(min: Option<Decimal>, max: Option<Decimal>) -> ApiResult<()> {
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(ApiError::field(
                "max_salary",
                "Must not be below the minimum expectation",
            ));
        }
    }
    Ok(())
}

/// Extension allow-list plus size cap for one upload kind.
pub struct UploadRule {
    pub field: &'static str,
    pub allowed: &'static [&'static str],
    pub max_bytes: usize,
}

pub const RESUME_RULE: UploadRule = UploadRule {
    field: "resume",
    allowed: &["pdf", "doc", "docx"],
    max_bytes: 5 * 1024 * 1024,
};

pub const PHOTO_RULE: UploadRule = UploadRule {
    field: "photo",
    allowed: &["jpg", "jpeg", "png"],
    max_bytes: 2 * 1024 * 1024,
};

impl UploadRule {
    /// Returns the normalized extension on success.
    pub fn check(&self, filename: &str, size: usize) -> ApiResult<String> {
        let ext = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        if !self.allowed.contains(&ext.as_str()) {
            return Err(ApiError::field(
                self.field,
                format!("File type not allowed; expected one of {}", self.allowed.join(", ")),
            ));
        }
        if size > self.max_bytes {
            return Err(ApiError::field(
                self.field,
                format!("File exceeds the {} MB limit", self.max_bytes / (1024 * 1024)),
            ));
        }
        Ok(ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn current_record_must_not_carry_end() {
        let err = check_span(&2020, Some(&2023), true, "end_year").unwrap_err();
        assert!(matches!(err, ApiError::FieldValidation(_)));
    }

    #[test]
    fn completed_record_requires_end() {
        let err = check_span(&2020, None::<&i32>, false, "end_year").unwrap_err();
        assert!(matches!(err, ApiError::FieldValidation(_)));
    }

    #[test]
    fn span_must_be_ordered() {
        let start = date!(2023 - 05 - 01);
        let end = date!(2021 - 01 - 01);
        assert!(check_span(&start, Some(&end), false, "end_date").is_err());
        assert!(check_span(&end, Some(&start), false, "end_date").is_ok());
    }

    #[test]
    fn current_record_without_end_is_fine() {
        assert!(check_span(&2020, None::<&i32>, true, "end_year").is_ok());
    }

    #[test]
    fn optional_span_only_checks_order() {
        let issue = date!(2022 - 01 - 01);
        let expiry = date!(2021 - 01 - 01);
        assert!(check_optional_span(&issue, None::<&time::Date>, "expiry_date").is_ok());
        assert!(check_optional_span(&issue, Some(&expiry), "expiry_date").is_err());
    }

    #[test]
    fn known_platforms_require_matching_host() {
        assert!(check_social_url("linkedin", "https://www.linkedin.com/in/jane").is_ok());
        assert!(check_social_url("github", "https://github.com/jane").is_ok());
        assert!(check_social_url("github", "https://gitlab.com/jane").is_err());
        assert!(check_social_url("twitter", "https://example.com/jane").is_err());
    }

    #[test]
    fn unknown_platforms_are_unconstrained() {
        assert!(check_social_url("portfolio", "https://jane.dev").is_ok());
        assert!(check_social_url("behance", "https://whatever.example").is_ok());
    }

    #[test]
    fn resume_rule_enforces_extension_and_cap() {
        assert!(RESUME_RULE.check("cv.exe", 10).is_err());
        assert!(RESUME_RULE.check("cv.pdf", 6 * 1024 * 1024).is_err());
        assert_eq!(RESUME_RULE.check("cv.PDF", 4 * 1024 * 1024).unwrap(), "pdf");
        assert_eq!(RESUME_RULE.check("cv.docx", 1024).unwrap(), "docx");
        assert!(RESUME_RULE.check("no_extension", 10).is_err());
    }

    #[test]
    fn photo_rule_enforces_extension_and_cap() {
        assert!(PHOTO_RULE.check("me.gif", 10).is_err());
        assert!(PHOTO_RULE.check("me.png", 3 * 1024 * 1024).is_err());
        assert_eq!(PHOTO_RULE.check("me.jpeg", 1024).unwrap(), "jpeg");
    }

    #[test]
    fn salary_range_rejects_inverted_bounds() {
        let lo = Decimal::new(50_000, 0);
        let hi = Decimal::new(90_000, 0);
        assert!(check_salary_range(Some(lo), Some(hi)).is_ok());
        assert!(check_salary_range(Some(hi), Some(lo)).is_err());
        assert!(check_salary_range(Some(lo), None).is_ok());
        assert!(check_salary_range(None, None).is_ok());
    }
}
