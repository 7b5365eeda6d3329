use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::auth::Scope;
use crate::reference::Location;

/// Applicant profile row, 1:1 with a user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub date_of_birth: Option<Date>,
    pub gender: Option<String>,
    pub photo_key: Option<String>,
    pub current_city: String,
    pub current_state: String,
    pub current_country: String,
    pub headline: String,
    pub summary: String,
    pub total_experience_years: i32,
    pub total_experience_months: i32,
    pub employment_status: Option<String>,
    pub notice_period: Option<String>,
    pub current_salary: Option<Decimal>,
    pub expected_salary: Option<Decimal>,
    pub resume_key: Option<String>,
    pub resume_updated_at: Option<OffsetDateTime>,
    pub completion: i32,
    pub is_public: bool,
    pub is_available_for_jobs: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

const PROFILE_COLUMNS: &str = r#"
    id, user_id, first_name, last_name, email, phone, date_of_birth, gender,
    photo_key, current_city, current_state, current_country, headline, summary,
    total_experience_years, total_experience_months, employment_status,
    notice_period, current_salary, expected_salary, resume_key,
    resume_updated_at, completion, is_public, is_available_for_jobs,
    created_at, updated_at
"#;

impl Profile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Human experience string, "Fresher" when both counters are zero.
    pub fn experience_display(&self) -> String {
        let years = self.total_experience_years;
        let months = self.total_experience_months;
        let y_word = if years == 1 { "year" } else { "years" };
        let m_word = if months == 1 { "month" } else { "months" };
        if years > 0 && months > 0 {
            format!("{years} {y_word} {months} {m_word}")
        } else if years > 0 {
            format!("{years} {y_word}")
        } else if months > 0 {
            format!("{months} {m_word}")
        } else {
            "Fresher".to_string()
        }
    }

    pub fn age_on(&self, today: Date) -> Option<i32> {
        let dob = self.date_of_birth?;
        let mut age = today.year() - dob.year();
        if (today.month() as u8, today.day()) < (dob.month() as u8, dob.day()) {
            age -= 1;
        }
        Some(age)
    }

    pub async fn find_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<Profile>> {
        let row = sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    /// Scoped fetch by profile id: owners only see their own row, staff sees
    /// everything. A foreign id under an Owner scope comes back as None.
    pub async fn find_scoped(
        db: &PgPool,
        profile_id: Uuid,
        scope: Scope,
    ) -> anyhow::Result<Option<Profile>> {
        let row = match scope {
            Scope::Unrestricted => {
                sqlx::query_as::<_, Profile>(&format!(
                    "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"
                ))
                .bind(profile_id)
                .fetch_optional(db)
                .await?
            }
            Scope::Owner(user_id) => {
                sqlx::query_as::<_, Profile>(&format!(
                    "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1 AND user_id = $2"
                ))
                .bind(profile_id)
                .bind(user_id)
                .fetch_optional(db)
                .await?
            }
        };
        Ok(row)
    }

    /// HR visibility: a profile resolves when it is the caller's own or
    /// marked public.
    pub async fn find_visible_to_hr(
        db: &PgPool,
        profile_id: Uuid,
        user_id: Uuid,
    ) -> anyhow::Result<Option<Profile>> {
        let row = sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1 AND (user_id = $2 OR is_public)"
        ))
        .bind(profile_id)
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    pub async fn id_for_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<Uuid>> {
        let id = sqlx::query_scalar::<_, Uuid>("SELECT id FROM profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(db)
            .await?;
        Ok(id)
    }

    pub async fn create(
        db: &PgPool,
        user_id: Uuid,
        first_name: &str,
        last_name: &str,
        email: &str,
    ) -> anyhow::Result<Profile> {
        let row = sqlx::query_as::<_, Profile>(&format!(
            r#"
            INSERT INTO profiles (user_id, first_name, last_name, email)
            VALUES ($1, $2, $3, $4)
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(first_name)
        .bind(last_name)
        .bind(email)
        .fetch_one(db)
        .await?;
        Ok(row)
    }

    /// Persist the mutable columns of an already-loaded profile. The derived
    /// `completion` column is deliberately not written here.
    pub async fn save(&self, db: &PgPool) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE profiles SET
                first_name = $2, last_name = $3, email = $4, phone = $5,
                date_of_birth = $6, gender = $7, current_city = $8,
                current_state = $9, current_country = $10, headline = $11,
                summary = $12, total_experience_years = $13,
                total_experience_months = $14, employment_status = $15,
                notice_period = $16, current_salary = $17, expected_salary = $18,
                is_public = $19, is_available_for_jobs = $20, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(self.id)
        .bind(&self.first_name)
        .bind(&self.last_name)
        .bind(&self.email)
        .bind(&self.phone)
        .bind(self.date_of_birth)
        .bind(&self.gender)
        .bind(&self.current_city)
        .bind(&self.current_state)
        .bind(&self.current_country)
        .bind(&self.headline)
        .bind(&self.summary)
        .bind(self.total_experience_years)
        .bind(self.total_experience_months)
        .bind(&self.employment_status)
        .bind(&self.notice_period)
        .bind(self.current_salary)
        .bind(self.expected_salary)
        .bind(self.is_public)
        .bind(self.is_available_for_jobs)
        .execute(db)
        .await?;
        Ok(())
    }

    pub async fn set_resume(db: &PgPool, profile_id: Uuid, key: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE profiles
            SET resume_key = $2, resume_updated_at = now(), updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(profile_id)
        .bind(key)
        .execute(db)
        .await?;
        Ok(())
    }

    pub async fn set_photo(db: &PgPool, profile_id: Uuid, key: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE profiles SET photo_key = $2, updated_at = now() WHERE id = $1")
            .bind(profile_id)
            .bind(key)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Replace the preferred-locations link set. Unknown location ids are
    /// silently dropped, matching a filter-by-id semantics.
    pub async fn set_preferred_locations(
        db: &PgPool,
        profile_id: Uuid,
        location_ids: &[Uuid],
    ) -> anyhow::Result<()> {
        let mut tx = db.begin().await?;
        sqlx::query("DELETE FROM profile_preferred_locations WHERE profile_id = $1")
            .bind(profile_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            r#"
            INSERT INTO profile_preferred_locations (profile_id, location_id)
            SELECT $1, id FROM locations WHERE id = ANY($2)
            "#,
        )
        .bind(profile_id)
        .bind(location_ids)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn preferred_locations(
        db: &PgPool,
        profile_id: Uuid,
    ) -> anyhow::Result<Vec<Location>> {
        let rows = sqlx::query_as::<_, Location>(
            r#"
            SELECT l.id, l.city, l.state, l.country
            FROM locations l
            JOIN profile_preferred_locations p ON p.location_id = l.id
            WHERE p.profile_id = $1
            ORDER BY l.city
            "#,
        )
        .bind(profile_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn sample() -> Profile {
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
    fn full_name_joins_parts() {
        assert_eq!(sample().full_name(), "Jane Doe");
    }

    #[test]
    fn experience_display_covers_all_shapes() {
        let mut p = sample();
        assert_eq!(p.experience_display(), "Fresher");
        p.total_experience_years = 1;
        assert_eq!(p.experience_display(), "1 year");
        p.total_experience_months = 3;
        assert_eq!(p.experience_display(), "1 year 3 months");
        p.total_experience_years = 0;
        assert_eq!(p.experience_display(), "3 months");
        p.total_experience_years = 4;
        p.total_experience_months = 1;
        assert_eq!(p.experience_display(), "4 years 1 month");
    }

    #[test]
    fn age_accounts_for_birthday_not_yet_reached() {
        let mut p = sample();
        p.date_of_birth = Some(date!(1990 - 06 - 15));
        assert_eq!(p.age_on(date!(2024 - 06 - 14)), Some(33));
        assert_eq!(p.age_on(date!(2024 - 06 - 15)), Some(34));
        p.date_of_birth = None;
        assert_eq!(p.age_on(date!(2024 - 06 - 15)), None);
    }
}
