use chrono::{DateTime, Utc};
use garde::Validate;
use kernel::model::{
    id::{EventId, ReservationId, UserId},
    reservation::{Reservation, ReservationEvent, ReservationStatus},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatusName {
    Pending,
    Confirmed,
    Refused,
    Canceled,
}

impl From<ReservationStatus> for ReservationStatusName {
    fn from(value: ReservationStatus) -> Self {
        match value {
            ReservationStatus::Pending => Self::Pending,
            ReservationStatus::Confirmed => Self::Confirmed,
            ReservationStatus::Refused => Self::Refused,
            ReservationStatus::Canceled => Self::Canceled,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationRequest {
    #[garde(skip)]
    pub event_id: EventId,
    // 予約数量は 1 以上
    #[garde(range(min = 1))]
    pub quantity: i32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationsResponse {
    pub items: Vec<ReservationResponse>,
}

impl From<Vec<Reservation>> for ReservationsResponse {
    fn from(value: Vec<Reservation>) -> Self {
        Self {
            items: value.into_iter().map(ReservationResponse::from).collect(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationResponse {
    pub reservation_id: ReservationId,
    pub reserved_by: UserId,
    pub user_name: String,
    pub email: String,
    pub quantity: i32,
    pub status: ReservationStatusName,
    pub created_at: DateTime<Utc>,
    pub event: ReservationEventResponse,
}

impl From<Reservation> for ReservationResponse {
    fn from(value: Reservation) -> Self {
        let Reservation {
            reservation_id,
            reserved_by,
            user_name,
            email,
            quantity,
            status,
            created_at,
            event,
        } = value;
        Self {
            reservation_id,
            reserved_by,
            user_name,
            email,
            quantity,
            status: status.into(),
            created_at,
            event: event.into(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationEventResponse {
    pub event_id: EventId,
    pub title: String,
    pub location: String,
    pub event_date: DateTime<Utc>,
    pub capacity: i32,
}

impl From<ReservationEvent> for ReservationEventResponse {
    fn from(value: ReservationEvent) -> Self {
        let ReservationEvent {
            event_id,
            title,
            location,
            event_date,
            capacity,
        } = value;
        Self {
            event_id,
            title,
            location,
            event_date,
            capacity,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableCapacityResponse {
    pub event_id: EventId,
    pub available_capacity: i64,
}
