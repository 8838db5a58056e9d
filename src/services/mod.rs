pub mod reservations;
pub mod seats;
pub mod ticket_number;
pub mod tickets;

pub use reservations::ReservationCoordinator;
pub use seats::SeatInventory;
pub use ticket_number::{RandomTicketNumbers, TicketNumberSource};
pub use tickets::TicketStore;
