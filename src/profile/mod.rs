//! Applicant profile: the core row, its derived completion score, display
//! DTOs and the file-upload endpoints.

use axum::Router;

use crate::state::AppState;

pub mod completion;
pub mod dto;
pub mod handlers;
pub mod repo;
pub mod uploads;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::router())
        .merge(uploads::router())
}
