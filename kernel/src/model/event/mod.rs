use crate::model::id::EventId;
use chrono::{DateTime, Utc};
use derive_new::new;
use shared::error::{AppError, AppResult};
use strum::{AsRefStr, EnumString};

#[derive(Debug, Clone)]
pub struct Event {
    pub event_id: EventId,
    pub title: String,
    pub description: String,
    pub location: String,
    pub event_date: DateTime<Utc>,
    pub capacity: i32,
    pub status: EventStatus,
}

// イベントの公開状態。
// draft → published → canceled / draft → canceled の一方向のみ遷移できる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum EventStatus {
    Draft,
    Published,
    Canceled,
}

impl EventStatus {
    pub fn ensure_can_update(self) -> AppResult<()> {
        match self {
            EventStatus::Draft => Ok(()),
            EventStatus::Published => Err(AppError::UnprocessableEntity(
                "Cannot update a published event".into(),
            )),
            EventStatus::Canceled => Err(AppError::UnprocessableEntity(
                "Cannot update a canceled event".into(),
            )),
        }
    }

    pub fn ensure_can_publish(self) -> AppResult<()> {
        match self {
            EventStatus::Draft => Ok(()),
            _ => Err(AppError::UnprocessableEntity(
                "Only draft events can be published".into(),
            )),
        }
    }

    pub fn ensure_can_cancel(self) -> AppResult<()> {
        match self {
            EventStatus::Canceled => Err(AppError::UnprocessableEntity(
                "Event is already canceled".into(),
            )),
            _ => Ok(()),
        }
    }

    pub fn ensure_reservable(self) -> AppResult<()> {
        match self {
            EventStatus::Published => Ok(()),
            _ => Err(AppError::UnprocessableEntity(
                "Cannot book a non-published event".into(),
            )),
        }
    }
}

#[derive(new)]
pub struct CreateEvent {
    pub title: String,
    pub description: String,
    pub location: String,
    pub event_date: DateTime<Utc>,
    pub capacity: i32,
}

#[derive(Debug)]
pub struct UpdateEvent {
    pub event_id: EventId,
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub event_date: Option<DateTime<Utc>>,
    pub capacity: Option<i32>,
}
