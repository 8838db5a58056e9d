use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, PgExecutor};
use std::str::FromStr;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::database::Database;
use crate::error::{TicketingError, TicketingResult};
use crate::models::{Metadata, Ticket, TicketFilter, TicketReservation, TicketStatus};

// One row per ticket with the joined details folded into a single JSON column
const HYDRATED_TICKET_SELECT: &str = r#"
    SELECT
        t.ticket_id,
        t.ticket_number,
        t.status,
        t.created_at AS reserved_at,
        t.metadata,
        jsonb_build_object(
            'user', jsonb_build_object(
                'user_id', u.user_id,
                'first_name', u.first_name,
                'middle_name', u.middle_name,
                'last_name', u.last_name,
                'avatar_url', u.avatar_url
            ),
            'event', jsonb_build_object(
                'event_id', e.event_id,
                'name', e.name,
                'start_at', e.start_at,
                'end_at', e.end_at
            ),
            'seat', jsonb_build_object(
                'seat_id', s.seat_id,
                'seat_number', s.seat_number
            ),
            'venue', jsonb_build_object(
                'venue_id', v.venue_id,
                'name', v.name
            )
        ) AS reservation
    FROM tickets t
    JOIN users u ON u.user_id = t.user_id
    JOIN events e ON e.event_id = t.event_id
    JOIN seats s ON s.seat_id = t.seat_id
    JOIN venues v ON v.venue_id = e.venue_id
"#;

#[derive(FromRow)]
struct TicketRow {
    ticket_id: Uuid,
    ticket_number: String,
    status: String,
    reserved_at: DateTime<Utc>,
    metadata: Metadata,
    reservation: Json<TicketReservation>,
}

impl TryFrom<TicketRow> for Ticket {
    type Error = TicketingError;

    fn try_from(row: TicketRow) -> Result<Self, Self::Error> {
        let status = TicketStatus::from_str(&row.status).map_err(|_| {
            TicketingError::Persistence(sqlx::Error::Decode(
                format!("unknown ticket status {:?}", row.status).into(),
            ))
        })?;

        Ok(Ticket {
            ticket_id: row.ticket_id,
            ticket_number: row.ticket_number,
            status,
            reserved_at: row.reserved_at,
            metadata: row.metadata,
            reservation: row.reservation.0,
        })
    }
}

/// Reads tickets with their seat, event, venue and attendee details.
#[derive(Clone)]
pub struct TicketStore {
    db: Database,
}

impl TicketStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn get_by_id(&self, ticket_id: Uuid) -> TicketingResult<Ticket> {
        Self::fetch_by_id(&self.db.pool, ticket_id)
            .await?
            .ok_or_else(|| TicketingError::NotFound(format!("ticket {}", ticket_id)))
    }

    pub async fn get_by_ticket_number(&self, ticket_number: &str) -> TicketingResult<Ticket> {
        Self::fetch_by_number(&self.db.pool, ticket_number)
            .await?
            .ok_or_else(|| TicketingError::NotFound(format!("ticket {}", ticket_number)))
    }

    /// Newest first.
    pub async fn list(&self, filter: &TicketFilter) -> TicketingResult<Vec<Ticket>> {
        let query = format!(
            "{HYDRATED_TICKET_SELECT}
             WHERE ($1::uuid IS NULL OR t.event_id = $1)
               AND ($2::uuid IS NULL OR t.user_id = $2)
               AND (NOT $3 OR t.status <> 'canceled')
             ORDER BY t.created_at DESC, t.ticket_id
             LIMIT $4 OFFSET $5"
        );

        let rows = sqlx::query_as::<_, TicketRow>(&query)
            .bind(filter.event_id)
            .bind(filter.user_id)
            .bind(filter.active_only)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.db.pool)
            .await?;

        rows.into_iter().map(Ticket::try_from).collect()
    }

    /// Applies a status transition. Reserved tickets may become used or
    /// canceled; used and canceled tickets are final.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        ticket_id: Uuid,
        status: TicketStatus,
    ) -> TicketingResult<Ticket> {
        let mut uow = self.db.begin().await?;

        let current: Option<String> =
            sqlx::query_scalar("SELECT status FROM tickets WHERE ticket_id = $1 FOR UPDATE")
                .bind(ticket_id)
                .fetch_optional(&mut *uow)
                .await?;
        let current = current
            .ok_or_else(|| TicketingError::NotFound(format!("ticket {}", ticket_id)))?;
        let current = TicketStatus::from_str(&current).map_err(|_| {
            TicketingError::Persistence(sqlx::Error::Decode(
                format!("unknown ticket status {:?}", current).into(),
            ))
        })?;

        if !current.can_transition_to(status) {
            return Err(TicketingError::Validation(format!(
                "ticket {} cannot change from {} to {}",
                ticket_id, current, status
            )));
        }

        if current != status {
            sqlx::query("UPDATE tickets SET status = $2 WHERE ticket_id = $1")
                .bind(ticket_id)
                .bind(status.as_str())
                .execute(&mut *uow)
                .await?;
        }

        let ticket = Self::fetch_by_id(&mut *uow, ticket_id)
            .await?
            .ok_or_else(|| TicketingError::NotFound(format!("ticket {}", ticket_id)))?;
        uow.commit().await?;

        info!("ticket {} moved from {} to {}", ticket.ticket_number, current, status);
        Ok(ticket)
    }

    // === Executor-level reads, usable inside a caller's unit of work ===

    pub(crate) async fn fetch_by_number<'e, E>(
        executor: E,
        ticket_number: &str,
    ) -> TicketingResult<Option<Ticket>>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("{HYDRATED_TICKET_SELECT} WHERE t.ticket_number = $1");
        let row = sqlx::query_as::<_, TicketRow>(&query)
            .bind(ticket_number)
            .fetch_optional(executor)
            .await?;

        row.map(Ticket::try_from).transpose()
    }

    pub(crate) async fn fetch_by_id<'e, E>(
        executor: E,
        ticket_id: Uuid,
    ) -> TicketingResult<Option<Ticket>>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("{HYDRATED_TICKET_SELECT} WHERE t.ticket_id = $1");
        let row = sqlx::query_as::<_, TicketRow>(&query)
            .bind(ticket_id)
            .fetch_optional(executor)
            .await?;

        row.map(Ticket::try_from).transpose()
    }
}
