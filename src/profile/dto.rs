use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use time::{Date, OffsetDateTime};

use crate::records::{
    certifications::CertificationView, education::EducationView, experience::WorkExperienceView,
    preferences::JobPreferenceView, projects::ProjectView, skills::Skill,
    social_links::SocialLink,
};
use crate::reference::LocationView;

use super::completion::CompletionFacts;
use super::repo::Profile;

#[derive(Debug, Deserialize)]
pub struct CreateProfileRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
}

/// Partial update: absent fields keep their stored values. `completion` is
/// never part of this shape, it is derived server-side.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<Date>,
    pub gender: Option<String>,
    pub current_city: Option<String>,
    pub current_state: Option<String>,
    pub current_country: Option<String>,
    pub headline: Option<String>,
    pub summary: Option<String>,
    pub total_experience_years: Option<i32>,
    pub total_experience_months: Option<i32>,
    pub employment_status: Option<String>,
    pub notice_period: Option<String>,
    pub current_salary: Option<Decimal>,
    pub expected_salary: Option<Decimal>,
    pub is_public: Option<bool>,
    pub is_available_for_jobs: Option<bool>,
    pub preferred_location_ids: Option<Vec<uuid::Uuid>>,
}

impl UpdateProfileRequest {
    /// Fold the present fields into an owned profile row.
    pub fn apply_to(&self, profile: &mut Profile) {
        let Self {
            first_name,
            last_name,
            email,
            phone,
            date_of_birth,
            gender,
            current_city,
            current_state,
            current_country,
            headline,
            summary,
            total_experience_years,
            total_experience_months,
            employment_status,
            notice_period,
            current_salary,
            expected_salary,
            is_public,
            is_available_for_jobs,
            preferred_location_ids: _,
        } = self;
        if let Some(v) = first_name {
            profile.first_name = v.clone();
        }
        if let Some(v) = last_name {
            profile.last_name = v.clone();
        }
        if let Some(v) = email {
            profile.email = v.clone();
        }
        if let Some(v) = phone {
            profile.phone = v.clone();
        }
        if let Some(v) = date_of_birth {
            profile.date_of_birth = Some(*v);
        }
        if let Some(v) = gender {
            profile.gender = Some(v.clone());
        }
        if let Some(v) = current_city {
            profile.current_city = v.clone();
        }
        if let Some(v) = current_state {
            profile.current_state = v.clone();
        }
        if let Some(v) = current_country {
            profile.current_country = v.clone();
        }
        if let Some(v) = headline {
            profile.headline = v.clone();
        }
        if let Some(v) = summary {
            profile.summary = v.clone();
        }
        if let Some(v) = total_experience_years {
            profile.total_experience_years = *v;
        }
        if let Some(v) = total_experience_months {
            profile.total_experience_months = *v;
        }
        if let Some(v) = employment_status {
            profile.employment_status = Some(v.clone());
        }
        if let Some(v) = notice_period {
            profile.notice_period = Some(v.clone());
        }
        if let Some(v) = current_salary {
            profile.current_salary = Some(*v);
        }
        if let Some(v) = expected_salary {
            profile.expected_salary = Some(*v);
        }
        if let Some(v) = is_public {
            profile.is_public = *v;
        }
        if let Some(v) = is_available_for_jobs {
            profile.is_available_for_jobs = *v;
        }
    }
}

/// Profile row plus the display fields computed from it.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub profile: Profile,
    pub full_name: String,
    pub experience_display: String,
    pub age: Option<i32>,
    pub preferred_locations: Vec<LocationView>,
}

impl ProfileResponse {
    pub async fn load(db: &PgPool, profile: Profile) -> anyhow::Result<Self> {
        let locations = Profile::preferred_locations(db, profile.id).await?;
        let today = OffsetDateTime::now_utc().date();
        Ok(Self {
            full_name: profile.full_name(),
            experience_display: profile.experience_display(),
            age: profile.age_on(today),
            preferred_locations: locations.into_iter().map(LocationView::from).collect(),
            profile,
        })
    }
}

/// Everything about one applicant in a single payload: the profile plus all
/// child collections.
#[derive(Debug, Serialize)]
pub struct CompleteProfileResponse {
    #[serde(flatten)]
    pub profile: ProfileResponse,
    pub education: Vec<EducationView>,
    pub work_experience: Vec<WorkExperienceView>,
    pub skills: Vec<Skill>,
    pub projects: Vec<ProjectView>,
    pub certifications: Vec<CertificationView>,
    pub social_links: Vec<SocialLink>,
    pub job_preferences: Option<JobPreferenceView>,
}

#[derive(Debug, Serialize)]
pub struct CompletionResponse {
    pub completion: i32,
    pub breakdown: CompletionBreakdown,
}

/// Per-fact breakdown exposed so a client can point at the missing pieces.
#[derive(Debug, Serialize)]
pub struct CompletionBreakdown {
    pub basic_info: bool,
    pub date_of_birth: bool,
    pub photo: bool,
    pub summary: bool,
    pub resume: bool,
    pub employment_status: bool,
    pub experience_duration: bool,
    pub education: bool,
    pub work_experience: bool,
    pub skills: bool,
    pub preferred_locations: bool,
    pub job_preferences: bool,
    pub social_links: bool,
}

impl From<CompletionFacts> for CompletionBreakdown {
    fn from(f: CompletionFacts) -> Self {
        Self {
            basic_info: f.has_email && f.has_phone && f.has_city && f.has_headline,
            date_of_birth: f.has_date_of_birth,
            photo: f.has_photo,
            summary: f.has_summary,
            resume: f.has_resume,
            employment_status: f.has_employment_status,
            experience_duration: f.has_experience_duration,
            education: f.has_education,
            work_experience: f.has_work_experience,
            skills: f.has_skills,
            preferred_locations: f.has_preferred_locations,
            job_preferences: f.has_job_preferences,
            social_links: f.has_social_links,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn base_profile() -> Profile {
        Profile {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            email: "jane@example.com".into(),
            phone: String::new(),
            date_of_birth: None,
            gender: None,
            photo_key: None,
            current_city: String::new(),
            current_state: String::new(),
            current_country: "India".into(),
            headline: String::new(),
            summary: String::new(),
            total_experience_years: 0,
            total_experience_months: 0,
            employment_status: None,
            notice_period: None,
            current_salary: None,
            expected_salary: None,
            resume_key: None,
            resume_updated_at: None,
            completion: 0,
            is_public: true,
            is_available_for_jobs: true,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn apply_to_updates_only_present_fields() {
        let mut profile = base_profile();
        let patch = UpdateProfileRequest {
            headline: Some("Backend engineer".into()),
            total_experience_years: Some(3),
            ..Default::default()
        };
        patch.apply_to(&mut profile);
        assert_eq!(profile.headline, "Backend engineer");
        assert_eq!(profile.total_experience_years, 3);
        // Untouched fields survive.
        assert_eq!(profile.first_name, "Jane");
        assert!(profile.is_public);
    }

    #[test]
    fn breakdown_requires_all_basic_fields() {
        let facts = CompletionFacts {
            has_email: true,
            has_phone: true,
            has_city: true,
            ..Default::default()
        };
        let breakdown = CompletionBreakdown::from(facts);
        assert!(!breakdown.basic_info);
    }
}
