use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;
use validator::Validate;

use super::render::off_thread;
use crate::error::{TicketingError, TicketingResult};
use crate::middleware::ValidatedJson;
use crate::models::{ReserveTicket, Ticket, TicketFilter, TicketStatus};
use crate::services::ticket_number::is_ticket_number;
use crate::AppState;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tickets", get(list_tickets).post(reserve_ticket))
        .route("/tickets/batch", post(reserve_tickets))
        .route("/tickets/number/{ticket_number}", get(get_ticket_by_number))
        .route("/tickets/{ticket_id}", get(get_ticket).patch(update_ticket))
}

/* ---------- request types ---------- */

#[derive(Debug, Default, Deserialize, Validate)]
pub struct TicketQuery {
    pub event_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub active_only: bool,
    #[validate(range(min = 1))]
    pub page: Option<i64>,
    #[validate(range(min = 1, max = 100))]
    pub page_size: Option<i64>,
}

impl TicketQuery {
    pub fn filter(&self) -> TicketFilter {
        let page = self.page.unwrap_or(1).max(1);
        let page_size = self.page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);

        TicketFilter {
            event_id: self.event_id,
            user_id: self.user_id,
            active_only: self.active_only,
            offset: Some((page - 1) * page_size),
            limit: Some(page_size),
        }
    }
}

/// Reservations placed together: all of them or none.
#[derive(Debug, Deserialize, Validate)]
#[serde(transparent)]
pub struct ReservationBatch {
    #[validate(length(min = 1), nested)]
    pub requests: Vec<ReserveTicket>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTicketStatus {
    pub ticket_id: Uuid,
    pub status: TicketStatus,
}

/* ---------- handlers ---------- */

// GET /api/tickets
async fn list_tickets(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TicketQuery>,
) -> TicketingResult<Json<Vec<Ticket>>> {
    query
        .validate()
        .map_err(|e| TicketingError::Validation(e.to_string()))?;

    let tickets = state.tickets.list(&query.filter()).await?;
    Ok(Json(tickets))
}

// POST /api/tickets
async fn reserve_ticket(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<ReserveTicket>,
) -> TicketingResult<impl IntoResponse> {
    let ticket = state.reservations.reserve(request).await?;

    if state.config.render.render_on_reserve {
        let renderer = state.renderer.clone();
        let printable = ticket.clone();
        // the ticket stands even if its document does not
        match off_thread(move || renderer.render(&printable)).await {
            Ok(path) => debug!("ticket {} rendered to {}", ticket.ticket_number, path.display()),
            Err(err) => warn!("ticket {} reserved but not rendered: {}", ticket.ticket_number, err),
        }
    }

    Ok((StatusCode::CREATED, Json(ticket)))
}

// POST /api/tickets/batch
async fn reserve_tickets(
    State(state): State<Arc<AppState>>,
    ValidatedJson(batch): ValidatedJson<ReservationBatch>,
) -> TicketingResult<impl IntoResponse> {
    let tickets = state.reservations.create_many(batch.requests).await?;
    Ok((StatusCode::CREATED, Json(tickets)))
}

// GET /api/tickets/{ticket_id}
async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Path(ticket_id): Path<Uuid>,
) -> TicketingResult<Json<Ticket>> {
    Ok(Json(state.tickets.get_by_id(ticket_id).await?))
}

// GET /api/tickets/number/{ticket_number}
async fn get_ticket_by_number(
    State(state): State<Arc<AppState>>,
    Path(ticket_number): Path<String>,
) -> TicketingResult<Json<Ticket>> {
    if !is_ticket_number(&ticket_number) {
        return Err(TicketingError::Validation(format!(
            "{:?} is not a ticket number",
            ticket_number
        )));
    }
    Ok(Json(state.tickets.get_by_ticket_number(&ticket_number).await?))
}

// PATCH /api/tickets/{ticket_id}
async fn update_ticket(
    State(state): State<Arc<AppState>>,
    Path(ticket_id): Path<Uuid>,
    ValidatedJson(update): ValidatedJson<UpdateTicketStatus>,
) -> TicketingResult<Json<Ticket>> {
    if update.ticket_id != ticket_id {
        return Err(TicketingError::Validation(
            "ticket_id in the body does not match the path".to_string(),
        ));
    }

    let ticket = state.tickets.update_status(ticket_id, update.status).await?;
    Ok(Json(ticket))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paging_defaults_to_the_first_page() {
        let filter = TicketQuery::default().filter();
        assert_eq!(filter.offset, Some(0));
        assert_eq!(filter.limit, Some(DEFAULT_PAGE_SIZE));
        assert!(!filter.active_only);
    }

    #[test]
    fn later_pages_skip_earlier_ones() {
        let query = TicketQuery {
            page: Some(3),
            page_size: Some(25),
            ..TicketQuery::default()
        };
        let filter = query.filter();
        assert_eq!(filter.offset, Some(50));
        assert_eq!(filter.limit, Some(25));
    }

    #[test]
    fn oversized_pages_fail_validation() {
        let query = TicketQuery {
            page_size: Some(MAX_PAGE_SIZE + 1),
            ..TicketQuery::default()
        };
        assert!(query.validate().is_err());

        let query = TicketQuery {
            page: Some(0),
            ..TicketQuery::default()
        };
        assert!(query.validate().is_err());
    }

    #[test]
    fn empty_reservation_batch_fails_validation() {
        let batch: ReservationBatch = serde_json::from_str("[]").unwrap();
        assert!(batch.validate().is_err());
    }
}
