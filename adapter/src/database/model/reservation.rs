use chrono::{DateTime, Utc};
use kernel::model::{
    id::{EventId, ReservationId, UserId},
    reservation::{Reservation, ReservationEvent, ReservationStatus},
};
use shared::error::AppError;

// 予約一覧の取得に使う型。イベントとユーザーの射影を JOIN で埋める
#[derive(sqlx::FromRow)]
pub struct ReservationRow {
    pub reservation_id: ReservationId,
    pub user_id: UserId,
    pub user_name: String,
    pub email: String,
    pub quantity: i32,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub event_id: EventId,
    pub title: String,
    pub location: String,
    pub event_date: DateTime<Utc>,
    pub capacity: i32,
}

impl TryFrom<ReservationRow> for Reservation {
    type Error = AppError;

    fn try_from(value: ReservationRow) -> Result<Self, Self::Error> {
        let ReservationRow {
            reservation_id,
            user_id,
            user_name,
            email,
            quantity,
            status,
            created_at,
            event_id,
            title,
            location,
            event_date,
            capacity,
        } = value;
        let status = parse_reservation_status(&status)?;
        Ok(Reservation {
            reservation_id,
            reserved_by: user_id,
            user_name,
            email,
            quantity,
            status,
            created_at,
            event: ReservationEvent {
                event_id,
                title,
                location,
                event_date,
                capacity,
            },
        })
    }
}

pub fn parse_reservation_status(value: &str) -> Result<ReservationStatus, AppError> {
    value.parse().map_err(|_| {
        AppError::ConversionEntityError(format!("Unknown reservation status: {value}"))
    })
}
