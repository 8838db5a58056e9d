pub mod user;
pub mod event;
pub mod venue;
pub mod seat;
pub mod ticket;

pub use user::UserBrief;
pub use event::EventBrief;
pub use venue::VenueBrief;
pub use seat::{Seat, SeatBrief, SeatReservation, SeatReservationRequest, UpsertSeat};
pub use ticket::{ReserveTicket, Ticket, TicketFilter, TicketReservation, TicketStatus};

/// Free-form JSON attached to seats and tickets. Stored and returned verbatim.
pub type Metadata = serde_json::Value;
