use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;
use validator::Validate;

use super::{EventBrief, Metadata, SeatBrief, UserBrief, VenueBrief};

/// Ticket lifecycle. Stored and serialized in lowercase.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TicketStatus {
    #[default]
    Reserved,
    Used,
    Canceled,
}

impl TicketStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TicketStatus::Reserved => "reserved",
            TicketStatus::Used => "used",
            TicketStatus::Canceled => "canceled",
        }
    }

    /// Reserved tickets can be checked in or canceled; used and canceled are final.
    /// Re-applying the current status is accepted as a no-op.
    pub fn can_transition_to(self, next: TicketStatus) -> bool {
        self == next || matches!((self, next), (TicketStatus::Reserved, _))
    }
}

/// A ticket joined with its seat, event, venue and attendee.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Ticket {
    pub ticket_id: Uuid,
    #[validate(custom(function = "crate::services::ticket_number::validate_ticket_number"))]
    pub ticket_number: String,
    pub status: TicketStatus,
    pub reserved_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Metadata,
    pub reservation: TicketReservation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketReservation {
    pub venue: VenueBrief,
    pub event: EventBrief,
    pub user: UserBrief,
    pub seat: SeatBrief,
}

/// Request to bind a seat to an event for one attendee.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReserveTicket {
    pub seat_id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    pub event_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    /// Leave out canceled tickets.
    pub active_only: bool,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}
