pub mod render;
pub mod seats;
pub mod tickets;

use axum::Router;
use std::sync::Arc;

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(seats::routes())
        .merge(tickets::routes())
        .merge(render::routes())
}
