use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{TicketingError, TicketingResult};
use crate::middleware::ValidatedJson;
use crate::models::{Ticket, TicketFilter};
use crate::render::RenderError;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tickets/render", post(render_ticket))
        .route("/events/{event_id}/tickets/render", post(render_event_tickets))
}

#[derive(Debug, Serialize)]
pub struct RenderedTicket {
    pub ticket_number: String,
    pub path: PathBuf,
}

/// Runs a rendering job on the blocking pool.
pub(crate) async fn off_thread<T, F>(job: F) -> TicketingResult<T>
where
    F: FnOnce() -> Result<T, RenderError> + Send + 'static,
    T: Send + 'static,
{
    let rendered = tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| RenderError::Task(e.to_string()))?;
    Ok(rendered?)
}

// POST /api/tickets/render
async fn render_ticket(
    State(state): State<Arc<AppState>>,
    ValidatedJson(ticket): ValidatedJson<Ticket>,
) -> TicketingResult<impl IntoResponse> {
    let renderer = state.renderer.clone();
    let ticket_number = ticket.ticket_number.clone();
    let path = off_thread(move || renderer.render(&ticket)).await?;

    Ok((StatusCode::CREATED, Json(RenderedTicket { ticket_number, path })))
}

// POST /api/events/{event_id}/tickets/render
#[instrument(skip(state))]
async fn render_event_tickets(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<Uuid>,
) -> TicketingResult<impl IntoResponse> {
    let tickets = state
        .tickets
        .list(&TicketFilter {
            event_id: Some(event_id),
            active_only: true,
            ..TicketFilter::default()
        })
        .await?;

    let Some(first) = tickets.first() else {
        return Err(TicketingError::NotFound(format!("tickets for event {}", event_id)));
    };
    let event_name = first.reservation.event.name.clone();
    info!("rendering {} tickets for {}", tickets.len(), event_name);

    let batches = state.batches.clone();
    let archive = off_thread(move || batches.render_event(&event_name, &tickets)).await?;

    Ok((StatusCode::CREATED, Json(archive)))
}
