use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sqlx::error::ErrorKind;
use thiserror::Error;
use uuid::Uuid;

use crate::render::RenderError;

/// Name of the partial unique index guarding one live ticket per (seat, event).
pub const SEAT_EVENT_CONSTRAINT: &str = "tickets_active_seat_event_key";
pub const TICKET_NUMBER_CONSTRAINT: &str = "tickets_ticket_number_key";
pub const SEAT_NUMBER_CONSTRAINT: &str = "seats_venue_seat_number_key";

#[derive(Debug, Error)]
pub enum TicketingError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("seat {seat_id} is already reserved for event {event_id}")]
    SeatTaken { seat_id: Uuid, event_id: Uuid },

    #[error("seat number {seat_number} is already used in venue {venue_id}")]
    DuplicateSeatNumber { venue_id: Uuid, seat_number: String },

    #[error("{0} not found")]
    NotFound(String),

    #[error("could not allocate an unused ticket number after {0} attempts")]
    TicketNumbersExhausted(u32),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("database error: {0}")]
    Persistence(#[from] sqlx::Error),
}

pub type TicketingResult<T> = Result<T, TicketingError>;

impl TicketingError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            TicketingError::Validation(_) => StatusCode::BAD_REQUEST,
            TicketingError::SeatTaken { .. } | TicketingError::DuplicateSeatNumber { .. } => {
                StatusCode::CONFLICT
            }
            TicketingError::NotFound(_) => StatusCode::NOT_FOUND,
            TicketingError::TicketNumbersExhausted(_)
            | TicketingError::Render(_)
            | TicketingError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.status_code() == StatusCode::CONFLICT
    }

    // Internal failures are logged in full and answered with a generic message
    fn public_message(&self) -> String {
        match self {
            TicketingError::Render(_) => "Failed to render ticket document".to_string(),
            TicketingError::TicketNumbersExhausted(_) | TicketingError::Persistence(_) => {
                "Failed to persist changes".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for TicketingError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        } else {
            tracing::debug!("request rejected ({}): {}", status, self);
        }

        (status, Json(serde_json::json!({ "error": self.public_message() }))).into_response()
    }
}

/// What a failed write tells us about the data it collided with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageViolation {
    /// Another live ticket holds the (seat, event) pair.
    SeatTaken,
    /// The freshly drawn ticket number is already in use.
    TicketNumberTaken,
    /// The seat number is already used by another seat of the venue.
    SeatNumberTaken,
    /// A referenced seat, event, user, venue or section does not exist.
    MissingReference(String),
    Other,
}

pub fn classify_violation(kind: ErrorKind, constraint: Option<&str>) -> StorageViolation {
    match kind {
        ErrorKind::UniqueViolation => match constraint {
            Some(TICKET_NUMBER_CONSTRAINT) => StorageViolation::TicketNumberTaken,
            Some(SEAT_NUMBER_CONSTRAINT) => StorageViolation::SeatNumberTaken,
            // Every other unique constraint on tickets is the seat/event guard
            _ => StorageViolation::SeatTaken,
        },
        ErrorKind::ForeignKeyViolation => {
            StorageViolation::MissingReference(referenced_entity(constraint).to_string())
        }
        _ => StorageViolation::Other,
    }
}

pub fn classify(err: &sqlx::Error) -> StorageViolation {
    match err {
        sqlx::Error::Database(db_err) => classify_violation(db_err.kind(), db_err.constraint()),
        _ => StorageViolation::Other,
    }
}

// Postgres names foreign keys "<table>_<column>_fkey"
fn referenced_entity(constraint: Option<&str>) -> &'static str {
    let Some(name) = constraint else {
        return "referenced record";
    };
    if name.contains("seat_section_id") {
        "seat section"
    } else if name.contains("seat_id") {
        "seat"
    } else if name.contains("event_id") {
        "event"
    } else if name.contains("user_id") {
        "user"
    } else if name.contains("venue_id") {
        "venue"
    } else {
        "referenced record"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violations_are_told_apart_by_constraint() {
        assert_eq!(
            classify_violation(ErrorKind::UniqueViolation, Some(SEAT_EVENT_CONSTRAINT)),
            StorageViolation::SeatTaken
        );
        assert_eq!(
            classify_violation(ErrorKind::UniqueViolation, Some(TICKET_NUMBER_CONSTRAINT)),
            StorageViolation::TicketNumberTaken
        );
        assert_eq!(
            classify_violation(ErrorKind::UniqueViolation, Some(SEAT_NUMBER_CONSTRAINT)),
            StorageViolation::SeatNumberTaken
        );
        assert_eq!(
            classify_violation(ErrorKind::UniqueViolation, None),
            StorageViolation::SeatTaken
        );
    }

    #[test]
    fn foreign_key_violations_name_the_missing_entity() {
        assert_eq!(
            classify_violation(ErrorKind::ForeignKeyViolation, Some("tickets_event_id_fkey")),
            StorageViolation::MissingReference("event".to_string())
        );
        assert_eq!(
            classify_violation(ErrorKind::ForeignKeyViolation, Some("seats_seat_section_id_fkey")),
            StorageViolation::MissingReference("seat section".to_string())
        );
        assert_eq!(
            classify_violation(ErrorKind::ForeignKeyViolation, Some("tickets_seat_id_fkey")),
            StorageViolation::MissingReference("seat".to_string())
        );
    }

    #[test]
    fn other_failures_stay_unclassified() {
        assert_eq!(
            classify_violation(ErrorKind::CheckViolation, Some("tickets_status_check")),
            StorageViolation::Other
        );
        assert_eq!(classify(&sqlx::Error::RowNotFound), StorageViolation::Other);
    }

    #[test]
    fn errors_map_to_http_statuses() {
        let taken = TicketingError::SeatTaken { seat_id: Uuid::nil(), event_id: Uuid::nil() };
        assert_eq!(taken.status_code(), StatusCode::CONFLICT);
        assert!(taken.is_conflict());

        assert_eq!(
            TicketingError::Validation("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(TicketingError::NotFound("ticket".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            TicketingError::Render(RenderError::NothingToRender).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            TicketingError::Persistence(sqlx::Error::PoolTimedOut).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn persistence_details_are_not_exposed() {
        let err = TicketingError::Persistence(sqlx::Error::PoolTimedOut);
        assert_eq!(err.public_message(), "Failed to persist changes");

        let err = TicketingError::NotFound("ticket 7F3A2B".into());
        assert_eq!(err.public_message(), "ticket 7F3A2B not found");
    }
}
