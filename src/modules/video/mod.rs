use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;

pub mod delivery;
pub mod dto;
pub mod error;
pub mod handler;
pub mod job;
pub mod pipeline;
pub mod service;
pub mod transform;

#[cfg(test)]
pub mod testing;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/process-video", post(handler::process_video))
        .route("/download-video/{filename}", get(handler::download_video))
        .route("/videos/{filename}", get(handler::serve_video))
}
