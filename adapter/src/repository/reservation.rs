use crate::database::{
    model::{
        event::parse_event_status,
        reservation::{parse_reservation_status, ReservationRow},
    },
    ConnectionPool,
};
use async_trait::async_trait;
use derive_new::new;
use kernel::model::{
    id::{EventId, ReservationId, UserId},
    reservation::{
        ensure_capacity_not_exceeded,
        event::{CancelReservation, CreateReservation},
        Reservation, ReservationStatus,
    },
};
use kernel::repository::reservation::ReservationRepository;
use shared::error::{AppError, AppResult};

#[derive(new)]
pub struct ReservationRepositoryImpl {
    db: ConnectionPool,
}

#[async_trait]
impl ReservationRepository for ReservationRepositoryImpl {
    // 予約作成を行う
    async fn create(&self, event: CreateReservation) -> AppResult<ReservationId> {
        let mut tx = self.db.begin().await?;

        // 対象イベントの行ロックを取る。
        // 同一イベントへ同時に走る作成・確定はこのロックで直列化されるため、
        // 以降の検査と挿入はレースなしに行える。別イベント同士は並行のまま
        let row = sqlx::query_as::<_, (String, i32)>(
            r#"
                SELECT status, capacity
                FROM events
                WHERE event_id = $1
                FOR UPDATE
            "#,
        )
        .bind(event.event_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        let Some((status, capacity)) = row else {
            return Err(AppError::EntityNotFound("Event not found".into()));
        };
        parse_event_status(&status)?.ensure_reservable()?;

        // 同一ユーザーは同一イベントに pending の予約を複数持てない
        let pending = sqlx::query_scalar::<_, i64>(
            r#"
                SELECT COUNT(*)
                FROM reservations
                WHERE user_id = $1 AND event_id = $2 AND status = 'pending'
            "#,
        )
        .bind(event.reserved_by)
        .bind(event.event_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        if pending > 0 {
            return Err(AppError::Conflict(
                "You already have a pending reservation for this event".into(),
            ));
        }

        // 確定済み数量の合計に希望数量を足しても定員に収まるか
        let confirmed_sum = self.confirmed_sum(&mut tx, event.event_id, None).await?;
        ensure_capacity_not_exceeded(capacity, confirmed_sum, event.quantity)?;

        let reservation_id = ReservationId::new();
        let res = sqlx::query(
            r#"
                INSERT INTO reservations (reservation_id, user_id, event_id, quantity, status)
                VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(reservation_id)
        .bind(event.reserved_by)
        .bind(event.event_id)
        .bind(event.quantity)
        .bind(ReservationStatus::Pending.as_ref())
        .execute(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No reservation record has been created".into(),
            ));
        }

        tx.commit().await.map_err(AppError::TransactionError)?;

        Ok(reservation_id)
    }

    // 予約確定を行う。作成時の検査と確定時の検査の間に確定集合が
    // 変わっている可能性があるため、ここでも定員を検査し直す
    async fn confirm(&self, reservation_id: ReservationId) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, (EventId, i32, String)>(
            r#"
                SELECT event_id, quantity, status
                FROM reservations
                WHERE reservation_id = $1
                FOR UPDATE
            "#,
        )
        .bind(reservation_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        let Some((event_id, quantity, status)) = row else {
            return Err(AppError::EntityNotFound("Reservation not found".into()));
        };
        parse_reservation_status(&status)?.ensure_can_confirm()?;

        // イベント行のロックで、並行する作成・確定と直列化する
        let capacity = sqlx::query_scalar::<_, i32>(
            r#"
                SELECT capacity FROM events WHERE event_id = $1 FOR UPDATE
            "#,
        )
        .bind(event_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        // 確定しようとしている予約自身は合計から除いて数え直す。
        // 除かないと、残り定員ちょうどの予約が確定できなくなる
        let confirmed_sum = self
            .confirmed_sum(&mut tx, event_id, Some(reservation_id))
            .await?;
        ensure_capacity_not_exceeded(capacity, confirmed_sum, quantity)?;

        self.set_status(&mut tx, reservation_id, ReservationStatus::Confirmed)
            .await?;

        tx.commit().await.map_err(AppError::TransactionError)?;
        Ok(())
    }

    async fn refuse(&self, reservation_id: ReservationId) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let status = sqlx::query_scalar::<_, String>(
            r#"
                SELECT status FROM reservations WHERE reservation_id = $1 FOR UPDATE
            "#,
        )
        .bind(reservation_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        let Some(status) = status else {
            return Err(AppError::EntityNotFound("Reservation not found".into()));
        };
        parse_reservation_status(&status)?.ensure_can_refuse()?;

        self.set_status(&mut tx, reservation_id, ReservationStatus::Refused)
            .await?;

        tx.commit().await.map_err(AppError::TransactionError)?;
        Ok(())
    }

    // 予約者本人によるキャンセルを行う
    async fn cancel(&self, event: CancelReservation) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, (UserId, String)>(
            r#"
                SELECT user_id, status
                FROM reservations
                WHERE reservation_id = $1
                FOR UPDATE
            "#,
        )
        .bind(event.reservation_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        let Some((reserved_by, status)) = row else {
            return Err(AppError::EntityNotFound("Reservation not found".into()));
        };

        if reserved_by != event.requested_user {
            return Err(AppError::ForbiddenOperation(
                "You can only cancel your own reservations".into(),
            ));
        }
        parse_reservation_status(&status)?.ensure_can_cancel()?;

        self.set_status(&mut tx, event.reservation_id, ReservationStatus::Canceled)
            .await?;

        tx.commit().await.map_err(AppError::TransactionError)?;
        Ok(())
    }

    // すべての予約を取得する。イベントとユーザーの情報も一緒に抽出する
    async fn find_all(&self) -> AppResult<Vec<Reservation>> {
        let rows = sqlx::query_as::<_, ReservationRow>(
            r#"
                SELECT
                    r.reservation_id,
                    r.user_id,
                    u.user_name,
                    u.email,
                    r.quantity,
                    r.status,
                    r.created_at,
                    e.event_id,
                    e.title,
                    e.location,
                    e.event_date,
                    e.capacity
                FROM reservations AS r
                INNER JOIN events AS e ON r.event_id = e.event_id
                INNER JOIN users AS u ON r.user_id = u.user_id
                ORDER BY r.created_at ASC
            "#,
        )
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        rows.into_iter().map(Reservation::try_from).collect()
    }

    // ユーザー ID に紐づく予約を取得する
    async fn find_by_user_id(&self, user_id: UserId) -> AppResult<Vec<Reservation>> {
        let rows = sqlx::query_as::<_, ReservationRow>(
            r#"
                SELECT
                    r.reservation_id,
                    r.user_id,
                    u.user_name,
                    u.email,
                    r.quantity,
                    r.status,
                    r.created_at,
                    e.event_id,
                    e.title,
                    e.location,
                    e.event_date,
                    e.capacity
                FROM reservations AS r
                INNER JOIN events AS e ON r.event_id = e.event_id
                INNER JOIN users AS u ON r.user_id = u.user_id
                WHERE r.user_id = $1
                ORDER BY r.created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        rows.into_iter().map(Reservation::try_from).collect()
    }

    async fn find_by_id(&self, reservation_id: ReservationId) -> AppResult<Option<Reservation>> {
        let row = sqlx::query_as::<_, ReservationRow>(
            r#"
                SELECT
                    r.reservation_id,
                    r.user_id,
                    u.user_name,
                    u.email,
                    r.quantity,
                    r.status,
                    r.created_at,
                    e.event_id,
                    e.title,
                    e.location,
                    e.event_date,
                    e.capacity
                FROM reservations AS r
                INNER JOIN events AS e ON r.event_id = e.event_id
                INNER JOIN users AS u ON r.user_id = u.user_id
                WHERE r.reservation_id = $1
            "#,
        )
        .bind(reservation_id)
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        row.map(Reservation::try_from).transpose()
    }

    // 残り定員 = capacity - 確定済み数量の合計
    async fn find_available_capacity(&self, event_id: EventId) -> AppResult<i64> {
        let capacity = sqlx::query_scalar::<_, i32>(
            r#"
                SELECT capacity FROM events WHERE event_id = $1 AND status = 'published'
            "#,
        )
        .bind(event_id)
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        let Some(capacity) = capacity else {
            return Err(AppError::EntityNotFound("Published event not found".into()));
        };

        let confirmed_sum = sqlx::query_scalar::<_, i64>(
            r#"
                SELECT COALESCE(SUM(quantity), 0)
                FROM reservations
                WHERE event_id = $1 AND status = 'confirmed'
            "#,
        )
        .bind(event_id)
        .fetch_one(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        Ok(i64::from(capacity) - confirmed_sum)
    }
}

impl ReservationRepositoryImpl {
    // トランザクション内で確定済み数量の合計を取る。
    // exclude に予約 ID を渡した場合、その予約は合計から除く
    async fn confirmed_sum(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        event_id: EventId,
        exclude: Option<ReservationId>,
    ) -> AppResult<i64> {
        match exclude {
            None => sqlx::query_scalar::<_, i64>(
                r#"
                    SELECT COALESCE(SUM(quantity), 0)
                    FROM reservations
                    WHERE event_id = $1 AND status = 'confirmed'
                "#,
            )
            .bind(event_id)
            .fetch_one(&mut **tx)
            .await
            .map_err(AppError::SpecificOperationError),
            Some(reservation_id) => sqlx::query_scalar::<_, i64>(
                r#"
                    SELECT COALESCE(SUM(quantity), 0)
                    FROM reservations
                    WHERE event_id = $1 AND status = 'confirmed' AND reservation_id <> $2
                "#,
            )
            .bind(event_id)
            .bind(reservation_id)
            .fetch_one(&mut **tx)
            .await
            .map_err(AppError::SpecificOperationError),
        }
    }

    async fn set_status(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        reservation_id: ReservationId,
        status: ReservationStatus,
    ) -> AppResult<()> {
        let res = sqlx::query(
            r#"
                UPDATE reservations
                SET status = $2, updated_at = NOW()
                WHERE reservation_id = $1
            "#,
        )
        .bind(reservation_id)
        .bind(status.as_ref())
        .execute(&mut **tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No reservation record has been updated".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{event::EventRepositoryImpl, user::UserRepositoryImpl};
    use chrono::{Duration, Utc};
    use kernel::model::{event::CreateEvent, id::UserId, user::event::CreateUser};
    use kernel::repository::{event::EventRepository, user::UserRepository};

    async fn fixture_user(pool: &sqlx::PgPool, email: &str) -> anyhow::Result<UserId> {
        let repo = UserRepositoryImpl::new(ConnectionPool::new(pool.clone()));
        let user = repo
            .create(CreateUser {
                user_name: "Taro".into(),
                email: email.into(),
                password: "hunter2".into(),
            })
            .await?;
        Ok(user.user_id)
    }

    async fn fixture_published_event(
        pool: &sqlx::PgPool,
        capacity: i32,
    ) -> anyhow::Result<EventId> {
        let repo = EventRepositoryImpl::new(ConnectionPool::new(pool.clone()));
        let event_id = repo
            .create(CreateEvent::new(
                "Rust Meetup".into(),
                "Monthly meetup".into(),
                "Tokyo".into(),
                Utc::now() + Duration::days(7),
                capacity,
            ))
            .await?;
        repo.publish(event_id).await?;
        Ok(event_id)
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn test_reservation_lifecycle(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let repo = ReservationRepositoryImpl::new(ConnectionPool::new(pool.clone()));
        let event_id = fixture_published_event(&pool, 3).await?;
        let taro = fixture_user(&pool, "taro@example.com").await?;
        let jiro = fixture_user(&pool, "jiro@example.com").await?;

        // pending のうちは残り定員を消費しない
        let r_taro = repo
            .create(CreateReservation::new(event_id, taro, 2))
            .await?;
        let r_jiro = repo
            .create(CreateReservation::new(event_id, jiro, 2))
            .await?;
        assert_eq!(repo.find_available_capacity(event_id).await?, 3);

        repo.confirm(r_taro).await?;
        assert_eq!(repo.find_available_capacity(event_id).await?, 1);

        // 確定すると定員を超えるので失敗する
        let err = repo.confirm(r_jiro).await.unwrap_err();
        assert!(matches!(err, AppError::CapacityExceeded(_)));

        repo.refuse(r_jiro).await?;
        let found = repo.find_by_id(r_jiro).await?.unwrap();
        assert_eq!(found.status, ReservationStatus::Refused);

        // 他人の予約はキャンセルできない
        let err = repo
            .cancel(CancelReservation::new(r_taro, jiro))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ForbiddenOperation(_)));

        repo.cancel(CancelReservation::new(r_taro, taro)).await?;
        assert_eq!(repo.find_available_capacity(event_id).await?, 3);

        let mine = repo.find_by_user_id(taro).await?;
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].status, ReservationStatus::Canceled);
        assert_eq!(mine[0].event.event_id, event_id);
        Ok(())
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn test_create_is_rejected_once_capacity_is_confirmed(
        pool: sqlx::PgPool,
    ) -> anyhow::Result<()> {
        let repo = ReservationRepositoryImpl::new(ConnectionPool::new(pool.clone()));
        let event_id = fixture_published_event(&pool, 2).await?;
        let taro = fixture_user(&pool, "taro@example.com").await?;
        let jiro = fixture_user(&pool, "jiro@example.com").await?;

        let r_taro = repo
            .create(CreateReservation::new(event_id, taro, 2))
            .await?;
        repo.confirm(r_taro).await?;

        // 確定済み合計がすでに定員に達している
        let err = repo
            .create(CreateReservation::new(event_id, jiro, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::CapacityExceeded(_)));

        let err = repo
            .create(CreateReservation::new(EventId::new(), jiro, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::EntityNotFound(_)));
        Ok(())
    }

    // 定員ちょうどの予約でも、自分自身を合計から除いて数え直すので確定できる
    #[sqlx::test(migrations = "../migrations")]
    async fn test_confirm_excludes_own_quantity_from_the_sum(
        pool: sqlx::PgPool,
    ) -> anyhow::Result<()> {
        let repo = ReservationRepositoryImpl::new(ConnectionPool::new(pool.clone()));
        let event_id = fixture_published_event(&pool, 2).await?;
        let taro = fixture_user(&pool, "taro@example.com").await?;
        let jiro = fixture_user(&pool, "jiro@example.com").await?;

        let r_taro = repo
            .create(CreateReservation::new(event_id, taro, 2))
            .await?;
        let r_jiro = repo
            .create(CreateReservation::new(event_id, jiro, 1))
            .await?;

        repo.confirm(r_taro).await?;
        let found = repo.find_by_id(r_taro).await?.unwrap();
        assert_eq!(found.status, ReservationStatus::Confirmed);

        let err = repo.confirm(r_jiro).await.unwrap_err();
        assert!(matches!(err, AppError::CapacityExceeded(_)));
        Ok(())
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn test_second_pending_for_the_same_event_is_rejected(
        pool: sqlx::PgPool,
    ) -> anyhow::Result<()> {
        let repo = ReservationRepositoryImpl::new(ConnectionPool::new(pool.clone()));
        let event_id = fixture_published_event(&pool, 5).await?;
        let taro = fixture_user(&pool, "taro@example.com").await?;

        let r_taro = repo
            .create(CreateReservation::new(event_id, taro, 1))
            .await?;
        let err = repo
            .create(CreateReservation::new(event_id, taro, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // アプリ側の検査をすり抜けても部分一意インデックスが弾く
        let res = sqlx::query(
            r#"
                INSERT INTO reservations (reservation_id, user_id, event_id, quantity, status)
                VALUES ($1, $2, $3, 1, 'pending')
            "#,
        )
        .bind(ReservationId::new())
        .bind(taro)
        .bind(event_id)
        .execute(&pool)
        .await;
        match res {
            Err(sqlx::Error::Database(db)) => assert!(db.is_unique_violation()),
            other => panic!("expected a unique violation, got {other:?}"),
        }

        // キャンセル後は新しい pending を作れる
        repo.cancel(CancelReservation::new(r_taro, taro)).await?;
        repo.create(CreateReservation::new(event_id, taro, 1))
            .await?;
        Ok(())
    }

    // 同じイベントへの確定はイベント行のロックで直列化されるため、
    // 同時に走っても定員を超える組は片方しか成功しない
    #[sqlx::test(migrations = "../migrations")]
    async fn test_concurrent_confirms_cannot_overbook(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let repo = ReservationRepositoryImpl::new(ConnectionPool::new(pool.clone()));
        let event_id = fixture_published_event(&pool, 1).await?;
        let taro = fixture_user(&pool, "taro@example.com").await?;
        let jiro = fixture_user(&pool, "jiro@example.com").await?;

        let r_taro = repo
            .create(CreateReservation::new(event_id, taro, 1))
            .await?;
        let r_jiro = repo
            .create(CreateReservation::new(event_id, jiro, 1))
            .await?;

        let (res_taro, res_jiro) = tokio::join!(repo.confirm(r_taro), repo.confirm(r_jiro));
        assert!(res_taro.is_ok() != res_jiro.is_ok());
        let err = res_taro.and(res_jiro).unwrap_err();
        assert!(matches!(err, AppError::CapacityExceeded(_)));

        assert_eq!(repo.find_available_capacity(event_id).await?, 0);
        Ok(())
    }
}
