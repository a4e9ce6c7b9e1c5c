use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;

use super::{check_auth, json_body};
use crate::errors::AppError;
use crate::models::{CreateEventTypeRequest, EventType};
use crate::services::catalog;
use crate::state::AppState;

// GET /api/events
pub async fn list_events(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<EventType>>, AppError> {
    let db = state.db()?;
    Ok(Json(catalog::list_event_types(&db)?))
}

// GET /api/events/:id
pub async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<EventType>, AppError> {
    let db = state.db()?;
    Ok(Json(catalog::get_event_type(&db, &id)?))
}

// POST /api/events
pub async fn create_event(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<CreateEventTypeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<EventType>), AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let request = json_body(payload)?;
    let db = state.db()?;
    let created = catalog::create_event_type(&db, request)?;
    Ok((StatusCode::CREATED, Json(created)))
}
