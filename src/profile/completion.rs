//! Profile-completion scoring. The score is derived state: it is recomputed
//! after every mutation that can change one of the facts below and persisted
//! onto the profile row, never accepted from the client.

use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Presence facts the score is computed from. Pure data so the weighting
/// stays unit-testable without a database.
#[derive(Debug, Clone, Copy, Default, FromRow)]
pub struct CompletionFacts {
    pub has_email: bool,
    pub has_phone: bool,
    pub has_city: bool,
    pub has_headline: bool,
    pub has_date_of_birth: bool,
    pub has_photo: bool,
    pub has_summary: bool,
    pub has_resume: bool,
    pub has_employment_status: bool,
    pub has_experience_duration: bool,
    pub has_education: bool,
    pub has_work_experience: bool,
    pub has_skills: bool,
    pub has_preferred_locations: bool,
    pub has_job_preferences: bool,
    pub has_social_links: bool,
}

/// Total weight units: 12 single-unit facts plus 4 double-weight
/// collections, so a fully populated profile scores exactly 100.
pub const TOTAL_UNITS: i32 = 20;

pub fn score(facts: &CompletionFacts) -> i32 {
    let mut earned = 0;
    // Basic contact fields, one unit each.
    for present in [
        facts.has_email,
        facts.has_phone,
        facts.has_city,
        facts.has_headline,
        facts.has_date_of_birth,
        facts.has_photo,
        facts.has_summary,
        facts.has_resume,
        facts.has_employment_status,
        facts.has_experience_duration,
        facts.has_preferred_locations,
        facts.has_social_links,
    ] {
        if present {
            earned += 1;
        }
    }
    // Collections that carry real signal weigh double.
    for present in [
        facts.has_education,
        facts.has_work_experience,
        facts.has_skills,
        facts.has_job_preferences,
    ] {
        if present {
            earned += 2;
        }
    }
    (earned * 100 / TOTAL_UNITS).min(100)
}

pub async fn facts_for(db: &PgPool, profile_id: Uuid) -> anyhow::Result<Option<CompletionFacts>> {
    let facts = sqlx::query_as::<_, CompletionFacts>(
        r#"
        SELECT
            (p.email <> '')                         AS has_email,
            (p.phone <> '')                         AS has_phone,
            (p.current_city <> '')                  AS has_city,
            (p.headline <> '')                      AS has_headline,
            (p.date_of_birth IS NOT NULL)           AS has_date_of_birth,
            (p.photo_key IS NOT NULL)               AS has_photo,
            (p.summary <> '')                       AS has_summary,
            (p.resume_key IS NOT NULL)              AS has_resume,
            (p.employment_status IS NOT NULL)       AS has_employment_status,
            (p.total_experience_years > 0
             OR p.total_experience_months > 0)      AS has_experience_duration,
            EXISTS (SELECT 1 FROM education e
                     WHERE e.profile_id = p.id)     AS has_education,
            EXISTS (SELECT 1 FROM work_experience w
                     WHERE w.profile_id = p.id)     AS has_work_experience,
            EXISTS (SELECT 1 FROM skills s
                     WHERE s.profile_id = p.id)     AS has_skills,
            EXISTS (SELECT 1 FROM profile_preferred_locations l
                     WHERE l.profile_id = p.id)     AS has_preferred_locations,
            EXISTS (SELECT 1 FROM job_preferences j
                     WHERE j.profile_id = p.id)     AS has_job_preferences,
            EXISTS (SELECT 1 FROM social_links sl
                     WHERE sl.profile_id = p.id)    AS has_social_links
        FROM profiles p
        WHERE p.id = $1
        "#,
    )
    .bind(profile_id)
    .fetch_optional(db)
    .await?;
    Ok(facts)
}

/// Recompute the score from current facts and persist it. Returns the new
/// score, or 0 when the profile no longer exists (cascade delete race).
pub async fn recompute(db: &PgPool, profile_id: Uuid) -> anyhow::Result<i32> {
    let Some(facts) = facts_for(db, profile_id).await? else {
        return Ok(0);
    };
    let value = score(&facts);
    sqlx::query("UPDATE profiles SET completion = $2, updated_at = now() WHERE id = $1")
        .bind(profile_id)
        .bind(value)
        .execute(db)
        .await?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_facts() -> CompletionFacts {
        CompletionFacts {
            has_email: true,
            has_phone: true,
            has_city: true,
            has_headline: true,
            has_date_of_birth: true,
            has_photo: true,
            has_summary: true,
            has_resume: true,
            has_employment_status: true,
            has_experience_duration: true,
            has_education: true,
            has_work_experience: true,
            has_skills: true,
            has_preferred_locations: true,
            has_job_preferences: true,
            has_social_links: true,
        }
    }

    #[test]
    fn empty_profile_scores_zero() {
        assert_eq!(score(&CompletionFacts::default()), 0);
    }

    #[test]
    fn full_profile_scores_exactly_hundred() {
        // 12 single-unit facts + 4 double-weight collections = 20 of 20.
        assert_eq!(score(&full_facts()), 100);
    }

    #[test]
    fn basic_fields_score_one_unit_each() {
        let facts = CompletionFacts {
            has_email: true,
            has_phone: true,
            has_city: true,
            has_headline: true,
            ..Default::default()
        };
        assert_eq!(score(&facts), 4 * 100 / 20);
    }

    #[test]
    fn collections_weigh_double() {
        let facts = CompletionFacts {
            has_education: true,
            has_work_experience: true,
            has_skills: true,
            has_job_preferences: true,
            ..Default::default()
        };
        assert_eq!(score(&facts), 8 * 100 / 20);
    }

    #[test]
    fn score_is_monotonic_in_each_fact() {
        // Flipping any single fact on from an otherwise arbitrary baseline
        // must never lower the score.
        let baseline = CompletionFacts {
            has_email: true,
            has_skills: true,
            ..Default::default()
        };
        let base_score = score(&baseline);
        for i in 0..16 {
            let mut facts = baseline;
            let flags = [
                &mut facts.has_email,
                &mut facts.has_phone,
                &mut facts.has_city,
                &mut facts.has_headline,
                &mut facts.has_date_of_birth,
                &mut facts.has_photo,
                &mut facts.has_summary,
                &mut facts.has_resume,
                &mut facts.has_employment_status,
                &mut facts.has_experience_duration,
                &mut facts.has_education,
                &mut facts.has_work_experience,
                &mut facts.has_skills,
                &mut facts.has_preferred_locations,
                &mut facts.has_job_preferences,
                &mut facts.has_social_links,
            ];
            *flags[i] = true;
            assert!(score(&facts) >= base_score);
        }
    }

    #[test]
    fn score_stays_in_bounds() {
        assert!((0..=100).contains(&score(&CompletionFacts::default())));
        assert!((0..=100).contains(&score(&full_facts())));
    }
}
