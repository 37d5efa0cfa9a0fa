use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use garde::Validate;
use kernel::model::{
    id::{EventId, ReservationId},
    reservation::event::{CancelReservation, CreateReservation},
};
use registry::AppRegistry;
use shared::error::{AppError, AppResult};

use crate::{
    extractor::AuthorizedUser,
    model::reservation::{
        AvailableCapacityResponse, CreateReservationRequest, ReservationResponse,
        ReservationsResponse,
    },
};

pub async fn reserve_event(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
    Json(req): Json<CreateReservationRequest>,
) -> AppResult<(StatusCode, Json<ReservationResponse>)> {
    req.validate(&())?;

    let create_reservation = CreateReservation::new(req.event_id, user.id(), req.quantity);
    let reservation_id = registry
        .reservation_repository()
        .create(create_reservation)
        .await?;

    registry
        .reservation_repository()
        .find_by_id(reservation_id)
        .await?
        .map(|reservation| (StatusCode::CREATED, Json(reservation.into())))
        .ok_or_else(|| AppError::EntityNotFound("Reservation not found".into()))
}

// 全ユーザーの予約一覧。管理者向け
pub async fn show_reservation_list(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<ReservationsResponse>> {
    user.require_admin()?;

    registry
        .reservation_repository()
        .find_all()
        .await
        .map(ReservationsResponse::from)
        .map(Json)
}

pub async fn show_my_reservations(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<ReservationsResponse>> {
    registry
        .reservation_repository()
        .find_by_user_id(user.id())
        .await
        .map(ReservationsResponse::from)
        .map(Json)
}

pub async fn confirm_reservation(
    user: AuthorizedUser,
    Path(reservation_id): Path<ReservationId>,
    State(registry): State<AppRegistry>,
) -> AppResult<StatusCode> {
    user.require_admin()?;

    registry
        .reservation_repository()
        .confirm(reservation_id)
        .await
        .map(|_| StatusCode::OK)
}

pub async fn refuse_reservation(
    user: AuthorizedUser,
    Path(reservation_id): Path<ReservationId>,
    State(registry): State<AppRegistry>,
) -> AppResult<StatusCode> {
    user.require_admin()?;

    registry
        .reservation_repository()
        .refuse(reservation_id)
        .await
        .map(|_| StatusCode::OK)
}

pub async fn cancel_reservation(
    user: AuthorizedUser,
    Path(reservation_id): Path<ReservationId>,
    State(registry): State<AppRegistry>,
) -> AppResult<StatusCode> {
    let cancel_reservation = CancelReservation::new(reservation_id, user.id());
    registry
        .reservation_repository()
        .cancel(cancel_reservation)
        .await
        .map(|_| StatusCode::OK)
}

// 公開イベントの残席数。認証不要
pub async fn show_available_capacity(
    Path(event_id): Path<EventId>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<AvailableCapacityResponse>> {
    registry
        .reservation_repository()
        .find_available_capacity(event_id)
        .await
        .map(|available_capacity| {
            Json(AvailableCapacityResponse {
                event_id,
                available_capacity,
            })
        })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use kernel::model::{
        auth::AccessToken,
        id::UserId,
        reservation::{Reservation, ReservationEvent, ReservationStatus},
        role::Role,
        user::User,
    };
    use kernel::repository::reservation::MockReservationRepository;
    use registry::MockAppRegistryExt;

    use super::*;

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

    fn fixture_reservation(reservation_id: ReservationId, reserved_by: UserId) -> Reservation {
        Reservation {
            reservation_id,
            reserved_by,
            user_name: "Taro".into(),
            email: "taro@example.com".into(),
            quantity: 2,
            status: ReservationStatus::Pending,
            created_at: Utc::now(),
            event: ReservationEvent {
                event_id: EventId::new(),
                title: "Rust Meetup".into(),
                location: "Tokyo".into(),
                event_date: Utc::now(),
                capacity: 30,
            },
        }
    }

    fn registry_with(repo: MockReservationRepository) -> AppRegistry {
        let mut mock = MockAppRegistryExt::new();
        let repo = Arc::new(repo);
        mock.expect_reservation_repository()
            .returning(move || repo.clone());
        Arc::new(mock)
    }

    #[tokio::test]
    async fn reservation_is_created_as_pending() {
        let reservation_id = ReservationId::new();
        let user = participant_user();
        let user_id = user.id();

        let mut repo = MockReservationRepository::new();
        repo.expect_create().returning(move |_| Ok(reservation_id));
        repo.expect_find_by_id()
            .returning(move |id| Ok(Some(fixture_reservation(id, user_id))));

        let req = CreateReservationRequest {
            event_id: EventId::new(),
            quantity: 2,
        };
        let result = reserve_event(user, State(registry_with(repo)), Json(req)).await;

        let (status, Json(body)) = result.unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body.reservation_id, reservation_id);
        assert_eq!(
            body.status,
            crate::model::reservation::ReservationStatusName::Pending
        );
    }

    #[tokio::test]
    async fn zero_quantity_reservation_is_rejected() {
        let repo = MockReservationRepository::new();

        let req = CreateReservationRequest {
            event_id: EventId::new(),
            quantity: 0,
        };
        let result =
            reserve_event(participant_user(), State(registry_with(repo)), Json(req)).await;

        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn participant_cannot_confirm_reservation() {
        let repo = MockReservationRepository::new();

        let result = confirm_reservation(
            participant_user(),
            Path(ReservationId::new()),
            State(registry_with(repo)),
        )
        .await;

        assert!(matches!(result, Err(AppError::ForbiddenOperation(_))));
    }

    #[tokio::test]
    async fn confirm_propagates_capacity_error() {
        let mut repo = MockReservationRepository::new();
        repo.expect_confirm().returning(|_| {
            Err(AppError::CapacityExceeded(
                "Event capacity would be exceeded".into(),
            ))
        });

        let result = confirm_reservation(
            admin_user(),
            Path(ReservationId::new()),
            State(registry_with(repo)),
        )
        .await;

        assert!(matches!(result, Err(AppError::CapacityExceeded(_))));
    }

    #[tokio::test]
    async fn capacity_endpoint_reports_remaining_seats() {
        let mut repo = MockReservationRepository::new();
        repo.expect_find_available_capacity().returning(|_| Ok(12));

        let event_id = EventId::new();
        let result =
            show_available_capacity(Path(event_id), State(registry_with(repo))).await;

        let Json(body) = result.unwrap();
        assert_eq!(body.event_id, event_id);
        assert_eq!(body.available_capacity, 12);
    }
}
