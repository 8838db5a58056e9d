pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod middleware;
pub mod models;
pub mod render;
pub mod services;

use std::sync::Arc;

use config::Config;
use database::Database;
use render::{BatchRenderer, DocumentRenderer};
use services::{ReservationCoordinator, SeatInventory, TicketStore};

// Shared state for every request handler
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Config,
    pub seats: SeatInventory,
    pub reservations: ReservationCoordinator,
    pub tickets: TicketStore,
    pub renderer: DocumentRenderer,
    pub batches: BatchRenderer,
}

impl AppState {
    pub fn new(db: Database, config: Config) -> Arc<Self> {
        let reservations = ReservationCoordinator::new(db.clone(), config.tickets.number_attempts);
        let seats = SeatInventory::new(db.clone(), reservations.clone());
        let tickets = TicketStore::new(db.clone());
        let renderer =
            DocumentRenderer::new(&config.render.template_path, &config.render.output_dir);
        let batches =
            BatchRenderer::new(&config.render.template_path, &config.render.batch_output_dir);

        Arc::new(Self {
            db,
            config,
            seats,
            reservations,
            tickets,
            renderer,
            batches,
        })
    }
}
