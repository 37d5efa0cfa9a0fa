use chrono::{DateTime, Utc};
use derive_new::new;
use garde::Validate;
use kernel::model::{
    event::{CreateEvent, Event, EventStatus, UpdateEvent},
    id::EventId,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventStatusName {
    Draft,
    Published,
    Canceled,
}

impl From<EventStatus> for EventStatusName {
    fn from(value: EventStatus) -> Self {
        match value {
            EventStatus::Draft => Self::Draft,
            EventStatus::Published => Self::Published,
            EventStatus::Canceled => Self::Canceled,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    #[garde(length(min = 1))]
    pub title: String,
    #[garde(skip)]
    pub description: String,
    #[garde(length(min = 1))]
    pub location: String,
    #[garde(skip)]
    pub event_date: DateTime<Utc>,
    // 定員は 1 以上
    #[garde(range(min = 1))]
    pub capacity: i32,
}

impl From<CreateEventRequest> for CreateEvent {
    fn from(value: CreateEventRequest) -> Self {
        let CreateEventRequest {
            title,
            description,
            location,
            event_date,
            capacity,
        } = value;
        CreateEvent {
            title,
            description,
            location,
            event_date,
            capacity,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    #[garde(inner(length(min = 1)))]
    pub title: Option<String>,
    #[garde(skip)]
    pub description: Option<String>,
    #[garde(inner(length(min = 1)))]
    pub location: Option<String>,
    #[garde(skip)]
    pub event_date: Option<DateTime<Utc>>,
    #[garde(inner(range(min = 1)))]
    pub capacity: Option<i32>,
}

#[derive(new)]
pub struct UpdateEventRequestWithId(EventId, UpdateEventRequest);

impl From<UpdateEventRequestWithId> for UpdateEvent {
    fn from(value: UpdateEventRequestWithId) -> Self {
        let UpdateEventRequestWithId(
            event_id,
            UpdateEventRequest {
                title,
                description,
                location,
                event_date,
                capacity,
            },
        ) = value;
        UpdateEvent {
            event_id,
            title,
            description,
            location,
            event_date,
            capacity,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsResponse {
    pub items: Vec<EventResponse>,
}

impl From<Vec<Event>> for EventsResponse {
    fn from(value: Vec<Event>) -> Self {
        Self {
            items: value.into_iter().map(EventResponse::from).collect(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    pub event_id: EventId,
    pub title: String,
    pub description: String,
    pub location: String,
    pub event_date: DateTime<Utc>,
    pub capacity: i32,
    pub status: EventStatusName,
}

impl From<Event> for EventResponse {
    fn from(value: Event) -> Self {
        let Event {
            event_id,
            title,
            description,
            location,
            event_date,
            capacity,
            status,
        } = value;
        Self {
            event_id,
            title,
            description,
            location,
            event_date,
            capacity,
            status: status.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> CreateEventRequest {
        CreateEventRequest {
            title: "Rust Meetup".into(),
            description: "Monthly meetup".into(),
            location: "Tokyo".into(),
            event_date: Utc::now(),
            capacity: 30,
        }
    }

    #[test]
    fn create_request_requires_positive_capacity() {
        let mut req = valid_request();
        assert!(req.validate(&()).is_ok());

        req.capacity = 0;
        assert!(req.validate(&()).is_err());
    }

    #[test]
    fn create_request_requires_title() {
        let mut req = valid_request();
        req.title = "".into();
        assert!(req.validate(&()).is_err());
    }

    #[test]
    fn update_request_validates_only_present_fields() {
        let req = UpdateEventRequest {
            title: None,
            description: None,
            location: None,
            event_date: None,
            capacity: None,
        };
        assert!(req.validate(&()).is_ok());

        let req = UpdateEventRequest {
            title: Some("".into()),
            description: None,
            location: None,
            event_date: None,
            capacity: Some(0),
        };
        assert!(req.validate(&()).is_err());
    }
}
