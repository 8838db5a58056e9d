use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::TicketingResult;
use crate::middleware::ValidatedJson;
use crate::models::{Seat, Ticket, UpsertSeat};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/venues/{venue_id}/seats", get(list_seats))
        .route("/seats", post(upsert_seat))
        .route("/seats/batch", post(upsert_seats))
}

/* ---------- request / response ---------- */

#[derive(Debug, Deserialize)]
pub struct SeatQuery {
    pub event_id: Option<Uuid>,
}

/// A venue's seat map, applied all-or-nothing.
#[derive(Debug, Deserialize, Validate)]
#[serde(transparent)]
pub struct SeatBatch {
    #[validate(length(min = 1), nested)]
    pub seats: Vec<UpsertSeat>,
}

#[derive(Debug, Serialize)]
pub struct SeatWritten {
    pub seat_id: Uuid,
    pub ticket: Option<Ticket>,
}

#[derive(Debug, Serialize)]
pub struct SeatBatchWritten {
    pub seats: usize,
    pub tickets: Vec<Ticket>,
}

/* ---------- handlers ---------- */

// GET /api/venues/{venue_id}/seats?event_id=
async fn list_seats(
    State(state): State<Arc<AppState>>,
    Path(venue_id): Path<Uuid>,
    Query(query): Query<SeatQuery>,
) -> TicketingResult<Json<Vec<Seat>>> {
    let seats = state.seats.list(venue_id, query.event_id).await?;
    Ok(Json(seats))
}

// POST /api/seats
async fn upsert_seat(
    State(state): State<Arc<AppState>>,
    ValidatedJson(seat): ValidatedJson<UpsertSeat>,
) -> TicketingResult<impl IntoResponse> {
    let seat_id = seat.seat_id;
    let ticket = state.seats.upsert(seat).await?;
    Ok((StatusCode::CREATED, Json(SeatWritten { seat_id, ticket })))
}

// POST /api/seats/batch
async fn upsert_seats(
    State(state): State<Arc<AppState>>,
    ValidatedJson(batch): ValidatedJson<SeatBatch>,
) -> TicketingResult<impl IntoResponse> {
    let seats = batch.seats.len();
    let tickets = state.seats.upsert_batch(batch.seats).await?;
    Ok((StatusCode::CREATED, Json(SeatBatchWritten { seats, tickets })))
}
