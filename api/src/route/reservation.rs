use axum::{
    routing::{get, patch, post},
    Router,
};
use registry::AppRegistry;

use crate::handler::reservation::{
    cancel_reservation, confirm_reservation, refuse_reservation, reserve_event,
    show_available_capacity, show_my_reservations, show_reservation_list,
};

pub fn build_reservation_routers() -> Router<AppRegistry> {
    let reservation_routers = Router::new()
        .route("/", post(reserve_event))
        .route("/", get(show_reservation_list))
        .route("/my", get(show_my_reservations))
        .route("/:reservation_id/confirm", patch(confirm_reservation))
        .route("/:reservation_id/refuse", patch(refuse_reservation))
        .route("/:reservation_id/cancel", patch(cancel_reservation))
        .route("/events/:event_id/capacity", get(show_available_capacity));

    Router::new().nest("/reservations", reservation_routers)
}
