//! Turns (seat, event, attendee) requests into reserved tickets.
//!
//! The only concurrency control is the partial unique index on
//! `tickets (seat_id, event_id) WHERE status <> 'canceled'`. Concurrent inserts race
//! inside Postgres; the loser gets a unique violation which is reported as
//! [`TicketingError::SeatTaken`] and never retried. There is no existence pre-check.

use sqlx::Connection;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::ticket_number::{RandomTicketNumbers, TicketNumberSource};
use super::tickets::TicketStore;
use crate::database::{Database, UnitOfWork};
use crate::error::{classify, StorageViolation, TicketingError, TicketingResult};
use crate::models::{Metadata, ReserveTicket, Ticket};

#[derive(Clone)]
pub struct ReservationCoordinator {
    db: Database,
    numbers: Arc<dyn TicketNumberSource>,
    number_attempts: u32,
}

impl ReservationCoordinator {
    pub fn new(db: Database, number_attempts: u32) -> Self {
        Self::with_number_source(db, Arc::new(RandomTicketNumbers), number_attempts)
    }

    pub fn with_number_source(
        db: Database,
        numbers: Arc<dyn TicketNumberSource>,
        number_attempts: u32,
    ) -> Self {
        Self {
            db,
            numbers,
            number_attempts: number_attempts.max(1),
        }
    }

    /// Reserves one seat in its own transaction and returns the hydrated ticket
    /// as read back after commit.
    #[instrument(skip(self, request), fields(seat_id = %request.seat_id, event_id = %request.event_id))]
    pub async fn reserve(&self, request: ReserveTicket) -> TicketingResult<Ticket> {
        let mut uow = self.db.begin().await?;

        let ticket_number = match self.insert_ticket(&mut uow, &request).await {
            Ok(number) => number,
            Err(err) => {
                if let Err(rollback_err) = uow.rollback().await {
                    warn!("rollback after failed reservation also failed: {:?}", rollback_err);
                }
                return Err(err);
            }
        };
        uow.commit().await?;

        info!("ticket {} reserved", ticket_number);

        TicketStore::fetch_by_number(&self.db.pool, &ticket_number)
            .await?
            .ok_or_else(|| TicketingError::NotFound(format!("ticket {}", ticket_number)))
    }

    /// Reserves every request in one transaction. The first failure rolls back the
    /// whole batch; nothing is persisted unless every item succeeds.
    #[instrument(skip(self, requests), fields(count = requests.len()))]
    pub async fn create_many(&self, requests: Vec<ReserveTicket>) -> TicketingResult<Vec<Ticket>> {
        let mut uow = self.db.begin().await?;

        let mut tickets = Vec::with_capacity(requests.len());
        for (index, request) in requests.into_iter().enumerate() {
            match self.reserve_in(&mut uow, request).await {
                Ok(ticket) => tickets.push(ticket),
                Err(err) => {
                    warn!("batch reservation aborted at item {}: {}", index, err);
                    if let Err(rollback_err) = uow.rollback().await {
                        warn!("rollback of reservation batch failed: {:?}", rollback_err);
                    }
                    return Err(err);
                }
            }
        }

        uow.commit().await?;
        info!("reserved {} tickets in one batch", tickets.len());
        Ok(tickets)
    }

    /// Reserves inside the caller's unit of work. The caller decides whether to
    /// commit; the returned ticket reflects uncommitted state.
    pub async fn reserve_in(
        &self,
        uow: &mut UnitOfWork<'_>,
        request: ReserveTicket,
    ) -> TicketingResult<Ticket> {
        let ticket_number = self.insert_ticket(uow, &request).await?;
        debug!("ticket {} staged for seat {}", ticket_number, request.seat_id);

        TicketStore::fetch_by_number(&mut **uow, &ticket_number)
            .await?
            .ok_or_else(|| TicketingError::NotFound(format!("ticket {}", ticket_number)))
    }

    // Each attempt runs in a savepoint so a ticket-number collision can be undone
    // without poisoning the enclosing transaction.
    async fn insert_ticket(
        &self,
        uow: &mut UnitOfWork<'_>,
        request: &ReserveTicket,
    ) -> TicketingResult<String> {
        let metadata = request
            .metadata
            .clone()
            .unwrap_or_else(|| Metadata::Object(Default::default()));

        for attempt in 1..=self.number_attempts {
            let ticket_number = self.numbers.next_number();
            let mut savepoint = Connection::begin(&mut **uow).await?;

            let inserted = sqlx::query(
                r#"
                INSERT INTO tickets (ticket_id, ticket_number, status, seat_id, event_id, user_id, metadata)
                VALUES ($1, $2, 'reserved', $3, $4, $5, $6)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(&ticket_number)
            .bind(request.seat_id)
            .bind(request.event_id)
            .bind(request.user_id)
            .bind(&metadata)
            .execute(&mut *savepoint)
            .await;

            let err = match inserted {
                Ok(_) => {
                    savepoint.commit().await?;
                    return Ok(ticket_number);
                }
                Err(err) => err,
            };
            savepoint.rollback().await?;

            match classify(&err) {
                StorageViolation::TicketNumberTaken => {
                    warn!(
                        "ticket number {} already taken (attempt {}/{})",
                        ticket_number, attempt, self.number_attempts
                    );
                }
                StorageViolation::SeatTaken => {
                    warn!(
                        "seat {} already reserved for event {}",
                        request.seat_id, request.event_id
                    );
                    return Err(TicketingError::SeatTaken {
                        seat_id: request.seat_id,
                        event_id: request.event_id,
                    });
                }
                StorageViolation::MissingReference(entity) => {
                    return Err(TicketingError::NotFound(entity));
                }
                StorageViolation::SeatNumberTaken | StorageViolation::Other => {
                    return Err(TicketingError::Persistence(err));
                }
            }
        }

        Err(TicketingError::TicketNumbersExhausted(self.number_attempts))
    }
}
