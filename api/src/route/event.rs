use axum::{
    routing::{get, patch, post},
    Router,
};
use registry::AppRegistry;

use crate::handler::event::{
    cancel_event, publish_event, register_event, show_event, show_event_list,
    show_published_event_list, update_event,
};

pub fn build_event_routers() -> Router<AppRegistry> {
    let event_routers = Router::new()
        .route("/", post(register_event))
        .route("/", get(show_published_event_list))
        .route("/all", get(show_event_list))
        .route("/:event_id", get(show_event))
        .route("/:event_id", patch(update_event))
        .route("/:event_id/publish", patch(publish_event))
        .route("/:event_id/cancel", patch(cancel_event));

    Router::new().nest("/events", event_routers)
}
