use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;

use super::{check_auth, json_body, query_params};
use crate::errors::AppError;
use crate::models::{Booking, CreateBookingRequest, ListBookingsQuery, UpdateBookingRequest};
use crate::services::booking;
use crate::state::AppState;

// GET /api/bookings
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListBookingsQuery>, QueryRejection>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let query = query_params(query)?;
    let db = state.db()?;
    let bookings = booking::list_bookings(&db, query)?;
    Ok(Json(bookings))
}

// POST /api/bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateBookingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let request = json_body(payload)?;
    let db = state.db()?;
    let created = booking::create_booking(&db, request)?;
    Ok((StatusCode::CREATED, Json(created)))
}

// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let db = state.db()?;
    Ok(Json(booking::get_booking(&db, &id)?))
}

// PUT /api/bookings/:id
//
// With an admin bearer token the lifecycle rules are skipped so mistakes can
// be corrected. A token that does not match is rejected outright.
pub async fn update_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<UpdateBookingRequest>, JsonRejection>,
) -> Result<Json<Booking>, AppError> {
    let admin = headers.contains_key("authorization");
    if admin {
        check_auth(&headers, &state.config.admin_token)?;
    }

    let request = json_body(payload)?;
    let db = state.db()?;
    let updated = if admin {
        booking::correct_booking(&db, &id, request)?
    } else {
        booking::update_booking(&db, &id, request)?
    };
    Ok(Json(updated))
}

// DELETE /api/bookings/:id
pub async fn delete_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let db = state.db()?;
    booking::delete_booking(&db, &id)?;
    Ok(StatusCode::NO_CONTENT)
}
