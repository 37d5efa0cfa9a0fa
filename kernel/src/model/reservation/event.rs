use crate::model::id::{EventId, ReservationId, UserId};
use derive_new::new;

#[derive(new)]
pub struct CreateReservation {
    pub event_id: EventId,
    pub reserved_by: UserId,
    pub quantity: i32,
}

#[derive(new)]
pub struct CancelReservation {
    pub reservation_id: ReservationId,
    pub requested_user: UserId,
}
