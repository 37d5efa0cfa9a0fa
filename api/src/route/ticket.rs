use axum::{routing::get, Router};
use registry::AppRegistry;

use crate::handler::ticket::download_ticket;

pub fn build_ticket_routers() -> Router<AppRegistry> {
    let ticket_routers = Router::new().route("/ticket/:reservation_id", get(download_ticket));

    Router::new().nest("/pdf", ticket_routers)
}
