use chrono::{DateTime, Utc};
use kernel::model::{
    event::{Event, EventStatus},
    id::EventId,
};
use shared::error::AppError;

#[derive(sqlx::FromRow)]
pub struct EventRow {
    pub event_id: EventId,
    pub title: String,
    pub description: String,
    pub location: String,
    pub event_date: DateTime<Utc>,
    pub capacity: i32,
    pub status: String,
}

impl TryFrom<EventRow> for Event {
    type Error = AppError;

    fn try_from(value: EventRow) -> Result<Self, Self::Error> {
        let EventRow {
            event_id,
            title,
            description,
            location,
            event_date,
            capacity,
            status,
        } = value;
        let status = parse_event_status(&status)?;
        Ok(Event {
            event_id,
            title,
            description,
            location,
            event_date,
            capacity,
            status,
        })
    }
}

pub fn parse_event_status(value: &str) -> Result<EventStatus, AppError> {
    value
        .parse()
        .map_err(|_| AppError::ConversionEntityError(format!("Unknown event status: {value}")))
}
