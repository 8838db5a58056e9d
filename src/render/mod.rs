//! Printable ticket documents.
//!
//! A single ticket is one page drawn over the template's first page, with a QR
//! code carrying the ticket number. Batches lay four tickets on a Letter sheet
//! and ship the sheets as one zip archive per event.

pub mod batch;
pub mod layout;
pub mod pdf;
pub mod scan_code;
pub mod ticket;

use std::path::PathBuf;
use thiserror::Error;

pub use batch::{BatchArchive, BatchRenderer};
pub use scan_code::ScanCode;
pub use ticket::{DocumentRenderer, TicketTemplate};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to load ticket template {path}: {reason}")]
    Template { path: PathBuf, reason: String },

    #[error("document has no pages")]
    EmptyDocument,

    #[error("page has a malformed {0}")]
    MalformedPage(&'static str),

    #[error("{0:?} is not a valid ticket number")]
    InvalidTicketNumber(String),

    #[error("failed to assemble PDF: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("failed to encode scan code: {0}")]
    ScanCode(String),

    #[error("failed to write archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no tickets to render")]
    NothingToRender,

    #[error("render task failed: {0}")]
    Task(String),
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{TimeZone, Utc};
    use lopdf::content::Operation;
    use lopdf::{dictionary, Document};
    use uuid::Uuid;

    use super::layout::PageBox;
    use super::pdf::{finish_single_page, real};
    use crate::models::{
        EventBrief, SeatBrief, Ticket, TicketReservation, TicketStatus, UserBrief, VenueBrief,
    };

    /// A 612 x 252 template with a dark band, saved to bytes.
    pub fn template_bytes() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let ops = vec![
            Operation::new("rg", vec![real(0.11), real(0.13), real(0.34)]),
            Operation::new("re", vec![real(0.0), real(0.0), real(612.0), real(252.0)]),
            Operation::new("f", vec![]),
        ];
        finish_single_page(&mut doc, PageBox::new(0.0, 0.0, 612.0, 252.0), dictionary! {}, ops)
            .unwrap();

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    pub fn ticket(ticket_number: &str, seat_number: &str) -> Ticket {
        Ticket {
            ticket_id: Uuid::new_v4(),
            ticket_number: ticket_number.to_string(),
            status: TicketStatus::Reserved,
            reserved_at: Utc.with_ymd_and_hms(2024, 10, 1, 9, 0, 0).unwrap(),
            metadata: serde_json::json!({}),
            reservation: TicketReservation {
                venue: VenueBrief { venue_id: Uuid::new_v4(), name: "Grand Hall".into() },
                event: EventBrief {
                    event_id: Uuid::new_v4(),
                    name: "Autumn Recital".into(),
                    start_at: Utc.with_ymd_and_hms(2024, 11, 2, 18, 30, 0).unwrap(),
                    end_at: Utc.with_ymd_and_hms(2024, 11, 2, 21, 0, 0).unwrap(),
                },
                user: UserBrief {
                    user_id: Uuid::new_v4(),
                    first_name: "Ada".into(),
                    middle_name: None,
                    last_name: "Reyes".into(),
                    avatar_url: None,
                },
                seat: SeatBrief { seat_id: Uuid::new_v4(), seat_number: seat_number.into() },
            },
        }
    }
}
