use sqlx::{types::Json, FromRow};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::reservations::ReservationCoordinator;
use crate::database::{Database, UnitOfWork};
use crate::error::{classify, StorageViolation, TicketingError, TicketingResult};
use crate::models::seat::cmp_seat_numbers;
use crate::models::{Metadata, ReserveTicket, Seat, SeatReservation, Ticket, UpsertSeat};

#[derive(FromRow)]
struct SeatRow {
    seat_id: Uuid,
    seat_number: String,
    seat_section_id: Option<Uuid>,
    venue_id: Uuid,
    metadata: Metadata,
    reservation: Option<Json<SeatReservation>>,
}

impl From<SeatRow> for Seat {
    fn from(row: SeatRow) -> Self {
        Seat {
            seat_id: row.seat_id,
            seat_number: row.seat_number,
            seat_section_id: row.seat_section_id,
            venue_id: row.venue_id,
            metadata: row.metadata,
            reservation: row.reservation.map(|json| json.0),
        }
    }
}

/// Seat maps per venue. Upserts may carry a reservation, which is placed in the
/// same transaction as the seat row.
#[derive(Clone)]
pub struct SeatInventory {
    db: Database,
    reservations: ReservationCoordinator,
}

impl SeatInventory {
    pub fn new(db: Database, reservations: ReservationCoordinator) -> Self {
        Self { db, reservations }
    }

    /// Seats of a venue ordered by numeric seat number. With an event id, each seat
    /// carries its live reservation for that event, if there is one.
    pub async fn list(&self, venue_id: Uuid, event_id: Option<Uuid>) -> TicketingResult<Vec<Seat>> {
        let rows = sqlx::query_as::<_, SeatRow>(
            r#"
            SELECT
                s.seat_id,
                s.seat_number,
                s.seat_section_id,
                s.venue_id,
                s.metadata,
                CASE
                    WHEN t.ticket_id IS NOT NULL THEN
                        jsonb_build_object(
                            'reserved_at', t.created_at,
                            'ticket_number', t.ticket_number,
                            'user', jsonb_build_object(
                                'user_id', u.user_id,
                                'first_name', u.first_name,
                                'middle_name', u.middle_name,
                                'last_name', u.last_name
                            ),
                            'event', jsonb_build_object(
                                'event_id', e.event_id,
                                'name', e.name,
                                'start_at', e.start_at,
                                'end_at', e.end_at
                            )
                        )
                    ELSE NULL
                END AS reservation
            FROM seats s
            LEFT JOIN tickets t
                ON t.seat_id = s.seat_id
               AND t.event_id = $2
               AND t.status <> 'canceled'
            LEFT JOIN users u ON u.user_id = t.user_id
            LEFT JOIN events e ON e.event_id = t.event_id
            WHERE s.venue_id = $1
            "#,
        )
        .bind(venue_id)
        .bind(event_id)
        .fetch_all(&self.db.pool)
        .await?;

        let mut seats: Vec<Seat> = rows.into_iter().map(Seat::from).collect();
        seats.sort_by(|a, b| cmp_seat_numbers(&a.seat_number, &b.seat_number));
        Ok(seats)
    }

    /// Writes one seat (and its embedded reservation) in its own transaction.
    #[instrument(skip(self, seat), fields(seat_id = %seat.seat_id))]
    pub async fn upsert(&self, seat: UpsertSeat) -> TicketingResult<Option<Ticket>> {
        let mut uow = self.db.begin().await?;
        match self.upsert_in(&mut uow, seat).await {
            Ok(ticket) => {
                uow.commit().await?;
                Ok(ticket)
            }
            Err(err) => {
                if let Err(rollback_err) = uow.rollback().await {
                    warn!("rollback after failed seat upsert also failed: {:?}", rollback_err);
                }
                Err(err)
            }
        }
    }

    /// Applies a whole seat map atomically. Any failure, including a conflicting
    /// embedded reservation, leaves every seat and ticket untouched.
    #[instrument(skip(self, seats), fields(count = seats.len()))]
    pub async fn upsert_batch(&self, seats: Vec<UpsertSeat>) -> TicketingResult<Vec<Ticket>> {
        let mut uow = self.db.begin().await?;

        let mut tickets = Vec::new();
        for seat in seats {
            let seat_id = seat.seat_id;
            match self.upsert_in(&mut uow, seat).await {
                Ok(Some(ticket)) => tickets.push(ticket),
                Ok(None) => {}
                Err(err) => {
                    warn!("seat batch aborted at seat {}: {}", seat_id, err);
                    if let Err(rollback_err) = uow.rollback().await {
                        warn!("rollback of seat batch failed: {:?}", rollback_err);
                    }
                    return Err(err);
                }
            }
        }

        uow.commit().await?;
        info!("seat batch applied, {} reservations placed", tickets.len());
        Ok(tickets)
    }

    /// Upserts inside the caller's unit of work.
    pub async fn upsert_in(
        &self,
        uow: &mut UnitOfWork<'_>,
        seat: UpsertSeat,
    ) -> TicketingResult<Option<Ticket>> {
        let written = sqlx::query(
            r#"
            INSERT INTO seats (seat_id, seat_number, seat_section_id, venue_id, metadata)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (seat_id)
            DO UPDATE SET
                seat_number = EXCLUDED.seat_number,
                seat_section_id = EXCLUDED.seat_section_id,
                metadata = EXCLUDED.metadata
            "#,
        )
        .bind(seat.seat_id)
        .bind(&seat.seat_number)
        .bind(seat.seat_section_id)
        .bind(seat.venue_id)
        .bind(&seat.metadata)
        .execute(&mut **uow)
        .await;

        if let Err(err) = written {
            return Err(match classify(&err) {
                StorageViolation::SeatNumberTaken => TicketingError::DuplicateSeatNumber {
                    venue_id: seat.venue_id,
                    seat_number: seat.seat_number,
                },
                StorageViolation::MissingReference(entity) => TicketingError::NotFound(entity),
                _ => TicketingError::Persistence(err),
            });
        }
        debug!("seat {} ({}) written", seat.seat_id, seat.seat_number);

        let Some(reservation) = seat.reservation else {
            return Ok(None);
        };

        let request = ReserveTicket {
            seat_id: seat.seat_id,
            user_id: reservation.user_id,
            event_id: reservation.event_id,
            metadata: None,
        };
        self.reservations.reserve_in(uow, request).await.map(Some)
    }
}
