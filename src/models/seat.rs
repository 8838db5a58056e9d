use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;
use validator::Validate;

use super::{EventBrief, Metadata, UserBrief};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seat {
    pub seat_id: Uuid,
    pub seat_number: String,
    pub seat_section_id: Option<Uuid>,
    pub venue_id: Uuid,
    pub metadata: Metadata,
    /// Live ticket for the requested event, if any.
    pub reservation: Option<SeatReservation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeatReservation {
    pub reserved_at: DateTime<Utc>,
    pub ticket_number: String,
    pub user: UserBrief,
    pub event: EventBrief,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeatBrief {
    pub seat_id: Uuid,
    pub seat_number: String,
}

/// Insert-or-replace payload for one seat of a venue's seat map.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpsertSeat {
    pub seat_id: Uuid,
    #[validate(length(min = 1, max = 32))]
    pub seat_number: String,
    pub seat_section_id: Option<Uuid>,
    pub venue_id: Uuid,
    #[serde(default = "empty_metadata")]
    pub metadata: Metadata,
    pub reservation: Option<SeatReservationRequest>,
}

/// Reservation embedded in a seat upsert; the seat id comes from the enclosing seat.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SeatReservationRequest {
    pub user_id: Uuid,
    pub event_id: Uuid,
}

fn empty_metadata() -> Metadata {
    Metadata::Object(Default::default())
}

/// Orders seat labels numerically ("2" before "10"); labels that are not plain
/// numbers sort after numeric ones, alphabetically.
pub fn cmp_seat_numbers(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<u64>(), b.trim().parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seat_numbers_sort_numerically() {
        let mut numbers = vec!["10", "2", "1", "B4", "A1", "03"];
        numbers.sort_by(|a, b| cmp_seat_numbers(a, b));
        assert_eq!(numbers, vec!["1", "2", "03", "10", "A1", "B4"]);
    }

    #[test]
    fn upsert_payload_defaults_metadata_to_empty_object() {
        let seat: UpsertSeat = serde_json::from_value(serde_json::json!({
            "seat_id": Uuid::nil(),
            "seat_number": "12",
            "venue_id": Uuid::nil(),
        }))
        .unwrap();

        assert_eq!(seat.metadata, serde_json::json!({}));
        assert!(seat.reservation.is_none());
        assert!(seat.seat_section_id.is_none());
    }

    #[test]
    fn upsert_payload_keeps_metadata_verbatim() {
        let metadata = serde_json::json!({"row": "C", "pos": {"x": 10.5, "y": [1, 2]}});
        let seat: UpsertSeat = serde_json::from_value(serde_json::json!({
            "seat_id": Uuid::nil(),
            "seat_number": "12",
            "venue_id": Uuid::nil(),
            "metadata": metadata.clone(),
            "reservation": { "user_id": Uuid::nil(), "event_id": Uuid::nil() }
        }))
        .unwrap();

        assert_eq!(seat.metadata, metadata);
        assert!(seat.reservation.is_some());
    }

    #[test]
    fn empty_seat_number_is_rejected() {
        let seat = UpsertSeat {
            seat_id: Uuid::nil(),
            seat_number: String::new(),
            seat_section_id: None,
            venue_id: Uuid::nil(),
            metadata: empty_metadata(),
            reservation: None,
        };
        assert!(seat.validate().is_err());
    }
}
