//! Shared reference data: locations and industries. Read-only for normal
//! callers; staff may seed new entries.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use tracing::instrument;
use uuid::Uuid;

use crate::auth::StaffUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Location {
    pub id: Uuid,
    pub city: String,
    pub state: String,
    pub country: String,
}

impl Location {
    pub fn display_name(&self) -> String {
        format!("{}, {}", self.city, self.state)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Industry {
    pub id: Uuid,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct LocationView {
    pub id: Uuid,
    pub city: String,
    pub state: String,
    pub country: String,
    pub display_name: String,
}

impl From<Location> for LocationView {
    fn from(l: Location) -> Self {
        let display_name = l.display_name();
        Self {
            id: l.id,
            city: l.city,
            state: l.state,
            country: l.country,
            display_name,
        }
    }
}

pub async fn list_locations(db: &PgPool) -> anyhow::Result<Vec<Location>> {
    let rows = sqlx::query_as::<_, Location>(
        "SELECT id, city, state, country FROM locations ORDER BY city, state",
    )
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn list_industries(db: &PgPool) -> anyhow::Result<Vec<Industry>> {
    let rows = sqlx::query_as::<_, Industry>(
        "SELECT id, name, description FROM industries ORDER BY name",
    )
    .fetch_all(db)
    .await?;
    Ok(rows)
}

#[derive(Debug, Deserialize)]
pub struct NewLocation {
    pub city: String,
    pub state: String,
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_country() -> String {
    "India".into()
}

#[derive(Debug, Deserialize)]
pub struct NewIndustry {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/locations", get(get_locations).post(create_location))
        .route("/industries", get(get_industries).post(create_industry))
}

#[instrument(skip(state))]
async fn get_locations(State(state): State<AppState>) -> ApiResult<Json<Vec<LocationView>>> {
    let rows = list_locations(&state.db).await?;
    Ok(Json(rows.into_iter().map(LocationView::from).collect()))
}

#[instrument(skip(state))]
async fn get_industries(State(state): State<AppState>) -> ApiResult<Json<Vec<Industry>>> {
    Ok(Json(list_industries(&state.db).await?))
}

#[instrument(skip(state, payload))]
async fn create_location(
    State(state): State<AppState>,
    StaffUser(_): StaffUser,
    Json(payload): Json<NewLocation>,
) -> ApiResult<(StatusCode, Json<LocationView>)> {
    if payload.city.trim().is_empty() || payload.state.trim().is_empty() {
        return Err(ApiError::validation("City and state are required"));
    }
    let row = sqlx::query_as::<_, Location>(
        r#"
        INSERT INTO locations (city, state, country)
        VALUES ($1, $2, $3)
        ON CONFLICT (city, state, country) DO UPDATE SET city = EXCLUDED.city
        RETURNING id, city, state, country
        "#,
    )
    .bind(payload.city.trim())
    .bind(payload.state.trim())
    .bind(payload.country.trim())
    .fetch_one(&state.db)
    .await?;
    Ok((StatusCode::CREATED, Json(LocationView::from(row))))
}

#[instrument(skip(state, payload))]
async fn create_industry(
    State(state): State<AppState>,
    StaffUser(_): StaffUser,
    Json(payload): Json<NewIndustry>,
) -> ApiResult<(StatusCode, Json<Industry>)> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::field("name", "Required"));
    }
    let row = sqlx::query_as::<_, Industry>(
        r#"
        INSERT INTO industries (name, description)
        VALUES ($1, $2)
        ON CONFLICT (name) DO UPDATE SET description = EXCLUDED.description
        RETURNING id, name, description
        "#,
    )
    .bind(payload.name.trim())
    .bind(payload.description.trim())
    .fetch_one(&state.db)
    .await?;
    Ok((StatusCode::CREATED, Json(row)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_display_name_joins_city_and_state() {
        let l = Location {
            id: Uuid::new_v4(),
            city: "Pune".into(),
            state: "Maharashtra".into(),
            country: "India".into(),
        };
        assert_eq!(l.display_name(), "Pune, Maharashtra");
    }
}
