//! Board directory routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::board;
use crate::state::{AppState, Segment};

#[derive(Debug, Serialize)]
pub struct BoardListingResponse {
    pub id: Uuid,
    pub name: String,
    /// Cached preview as a `data:image/png;base64,...` URL.
    pub preview: String,
}

#[derive(Debug, Serialize)]
pub struct BoardCreatedResponse {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct BoardDetailResponse {
    pub id: Uuid,
    pub name: String,
    pub segments: Vec<Segment>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateBoardBody {
    pub name: Option<String>,
}

type ApiError = (StatusCode, Json<serde_json::Value>);

fn not_found() -> ApiError {
    (StatusCode::NOT_FOUND, Json(serde_json::json!({"error": "Board not found"})))
}

/// `GET /boards` — list all boards with cached previews.
pub async fn list_boards(State(state): State<AppState>) -> Json<Vec<BoardListingResponse>> {
    let listings = board::list_boards(&state.store).await;
    Json(
        listings
            .into_iter()
            .map(|listing| BoardListingResponse {
                id: listing.id,
                name: listing.name,
                preview: format!("data:image/png;base64,{}", STANDARD.encode(&listing.preview)),
            })
            .collect(),
    )
}

/// `POST /boards` — create a new board. The body (and the name in it) is
/// optional; unnamed boards get a placeholder name.
pub async fn create_board(
    State(state): State<AppState>,
    body: Option<Json<CreateBoardBody>>,
) -> Result<Json<BoardCreatedResponse>, ApiError> {
    let name = body.as_ref().and_then(|body| body.name.as_deref());
    match board::create_board(&state.store, name).await {
        Ok(summary) => Ok(Json(BoardCreatedResponse { id: summary.id, name: summary.name })),
        Err(e) => Err((StatusCode::SERVICE_UNAVAILABLE, Json(serde_json::json!({"error": e.to_string()})))),
    }
}

/// `GET /boards/:id` — fetch one board with its full segment log.
pub async fn get_board(
    State(state): State<AppState>,
    Path(board_id): Path<String>,
) -> Result<Json<BoardDetailResponse>, ApiError> {
    // A malformed id is just an unknown board, not a client error.
    let Ok(board_id) = board_id.parse::<Uuid>() else {
        return Err(not_found());
    };
    let Some(detail) = board::get_board(&state.store, board_id).await else {
        return Err(not_found());
    };
    Ok(Json(BoardDetailResponse { id: detail.id, name: detail.name, segments: detail.segments }))
}

#[cfg(test)]
#[path = "boards_test.rs"]
mod tests;
