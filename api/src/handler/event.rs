use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use garde::Validate;
use kernel::model::id::EventId;
use registry::AppRegistry;
use shared::error::{AppError, AppResult};

use crate::{
    extractor::AuthorizedUser,
    model::event::{
        CreateEventRequest, EventResponse, EventsResponse, UpdateEventRequest,
        UpdateEventRequestWithId,
    },
};

pub async fn register_event(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
    Json(req): Json<CreateEventRequest>,
) -> AppResult<(StatusCode, Json<EventResponse>)> {
    user.require_admin()?;
    req.validate(&())?;

    let event_id = registry.event_repository().create(req.into()).await?;
    registry
        .event_repository()
        .find_by_id(event_id)
        .await?
        .map(|event| (StatusCode::CREATED, Json(event.into())))
        .ok_or_else(|| AppError::EntityNotFound("Event not found".into()))
}

// 公開中のイベントのみ。認証不要
pub async fn show_published_event_list(
    State(registry): State<AppRegistry>,
) -> AppResult<Json<EventsResponse>> {
    registry
        .event_repository()
        .find_published_all()
        .await
        .map(EventsResponse::from)
        .map(Json)
}

// 下書き・キャンセル済みも含む一覧。管理者向け
pub async fn show_event_list(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<EventsResponse>> {
    user.require_admin()?;

    registry
        .event_repository()
        .find_all()
        .await
        .map(EventsResponse::from)
        .map(Json)
}

pub async fn show_event(
    Path(event_id): Path<EventId>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<EventResponse>> {
    registry
        .event_repository()
        .find_published_by_id(event_id)
        .await
        .and_then(|event| match event {
            Some(event) => Ok(Json(event.into())),
            None => Err(AppError::EntityNotFound("Event not found".into())),
        })
}

pub async fn update_event(
    user: AuthorizedUser,
    Path(event_id): Path<EventId>,
    State(registry): State<AppRegistry>,
    Json(req): Json<UpdateEventRequest>,
) -> AppResult<StatusCode> {
    user.require_admin()?;
    req.validate(&())?;

    let update_event = UpdateEventRequestWithId::new(event_id, req);
    registry
        .event_repository()
        .update(update_event.into())
        .await
        .map(|_| StatusCode::OK)
}

pub async fn publish_event(
    user: AuthorizedUser,
    Path(event_id): Path<EventId>,
    State(registry): State<AppRegistry>,
) -> AppResult<StatusCode> {
    user.require_admin()?;

    registry
        .event_repository()
        .publish(event_id)
        .await
        .map(|_| StatusCode::OK)
}

pub async fn cancel_event(
    user: AuthorizedUser,
    Path(event_id): Path<EventId>,
    State(registry): State<AppRegistry>,
) -> AppResult<StatusCode> {
    user.require_admin()?;

    registry
        .event_repository()
        .cancel(event_id)
        .await
        .map(|_| StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use kernel::model::{
        auth::AccessToken,
        event::{Event, EventStatus},
        id::UserId,
        role::Role,
        user::User,
    };
    use kernel::repository::event::MockEventRepository;
    use registry::MockAppRegistryExt;

    use super::*;

    fn admin_user() -> AuthorizedUser {
        AuthorizedUser {
            access_token: AccessToken("test-token".into()),
            user: User {
                user_id: UserId::new(),
                user_name: "Admin".into(),
                email: "admin@example.com".into(),
                role: Role::Admin,
            },
        }
    }

    fn participant_user() -> AuthorizedUser {
        AuthorizedUser {
            access_token: AccessToken("test-token".into()),
            user: User {
                user_id: UserId::new(),
                user_name: "Taro".into(),
                email: "taro@example.com".into(),
                role: Role::Participant,
            },
        }
    }

    fn fixture_event(event_id: EventId, status: EventStatus) -> Event {
        Event {
            event_id,
            title: "Rust Meetup".into(),
            description: "Monthly meetup".into(),
            location: "Tokyo".into(),
            event_date: Utc::now(),
            capacity: 30,
            status,
        }
    }

    #[tokio::test]
    async fn admin_can_register_event() {
        let event_id = EventId::new();

        let mut event_repo = MockEventRepository::new();
        event_repo.expect_create().returning(move |_| Ok(event_id));
        event_repo
            .expect_find_by_id()
            .returning(|id| Ok(Some(fixture_event(id, EventStatus::Draft))));

        let mut mock = MockAppRegistryExt::new();
        let event_repo = Arc::new(event_repo);
        mock.expect_event_repository()
            .returning(move || event_repo.clone());
        let registry: AppRegistry = Arc::new(mock);

        let req = CreateEventRequest {
            title: "Rust Meetup".into(),
            description: "Monthly meetup".into(),
            location: "Tokyo".into(),
            event_date: Utc::now(),
            capacity: 30,
        };
        let result = register_event(admin_user(), State(registry), Json(req)).await;

        let (status, Json(body)) = result.unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body.event_id, event_id);
    }

    #[tokio::test]
    async fn participant_cannot_register_event() {
        let mock = MockAppRegistryExt::new();
        let registry: AppRegistry = Arc::new(mock);

        let req = CreateEventRequest {
            title: "Rust Meetup".into(),
            description: "Monthly meetup".into(),
            location: "Tokyo".into(),
            event_date: Utc::now(),
            capacity: 30,
        };
        let result = register_event(participant_user(), State(registry), Json(req)).await;

        assert!(matches!(result, Err(AppError::ForbiddenOperation(_))));
    }

    #[tokio::test]
    async fn unpublished_event_is_hidden_from_public_detail() {
        let mut event_repo = MockEventRepository::new();
        event_repo.expect_find_published_by_id().returning(|_| Ok(None));

        let mut mock = MockAppRegistryExt::new();
        let event_repo = Arc::new(event_repo);
        mock.expect_event_repository()
            .returning(move || event_repo.clone());
        let registry: AppRegistry = Arc::new(mock);

        let result = show_event(Path(EventId::new()), State(registry)).await;

        assert!(matches!(result, Err(AppError::EntityNotFound(_))));
    }
}
