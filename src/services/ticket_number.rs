use rand::Rng;
use validator::ValidationError;

pub const TICKET_NUMBER_LEN: usize = 6;
pub const TICKET_NUMBER_ALPHABET: &[u8; 16] = b"0123456789ABCDEF";

/// Source of short public ticket numbers. Uniqueness is not checked here;
/// the database constraint decides at insert time.
pub trait TicketNumberSource: Send + Sync {
    fn next_number(&self) -> String;
}

/// Six random uppercase hex digits, e.g. `4F0C9A`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomTicketNumbers;

impl TicketNumberSource for RandomTicketNumbers {
    fn next_number(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..TICKET_NUMBER_LEN)
            .map(|_| TICKET_NUMBER_ALPHABET[rng.gen_range(0..TICKET_NUMBER_ALPHABET.len())] as char)
            .collect()
    }
}

pub fn is_ticket_number(value: &str) -> bool {
    value.len() == TICKET_NUMBER_LEN
        && value.bytes().all(|b| TICKET_NUMBER_ALPHABET.contains(&b))
}

// Ticket numbers end up in file names, so anything else is refused outright
pub fn validate_ticket_number(value: &str) -> Result<(), ValidationError> {
    if is_ticket_number(value) {
        Ok(())
    } else {
        Err(ValidationError::new("ticket_number")
            .with_message("ticket number must be 6 uppercase hexadecimal characters".into()))
    }
}
