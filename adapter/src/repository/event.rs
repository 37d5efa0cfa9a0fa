use crate::database::{
    model::event::{parse_event_status, EventRow},
    ConnectionPool,
};
use async_trait::async_trait;
use derive_new::new;
use kernel::model::{
    event::{CreateEvent, Event, EventStatus, UpdateEvent},
    id::EventId,
};
use kernel::repository::event::EventRepository;
use shared::error::{AppError, AppResult};

#[derive(new)]
pub struct EventRepositoryImpl {
    db: ConnectionPool,
}

#[async_trait]
impl EventRepository for EventRepositoryImpl {
    async fn create(&self, event: CreateEvent) -> AppResult<EventId> {
        let event_id = EventId::new();
        let res = sqlx::query(
            r#"
                INSERT INTO events (event_id, title, description, location, event_date, capacity, status)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(event_id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.location)
        .bind(event.event_date)
        .bind(event.capacity)
        // 作成されるイベントは常に draft から始まる
        .bind(EventStatus::Draft.as_ref())
        .execute(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No event record has been created".into(),
            ));
        }

        Ok(event_id)
    }

    async fn find_published_all(&self) -> AppResult<Vec<Event>> {
        let rows = sqlx::query_as::<_, EventRow>(
            r#"
                SELECT event_id, title, description, location, event_date, capacity, status
                FROM events
                WHERE status = 'published'
                ORDER BY event_date ASC
            "#,
        )
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        rows.into_iter().map(Event::try_from).collect()
    }

    async fn find_all(&self) -> AppResult<Vec<Event>> {
        let rows = sqlx::query_as::<_, EventRow>(
            r#"
                SELECT event_id, title, description, location, event_date, capacity, status
                FROM events
                ORDER BY event_date DESC
            "#,
        )
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        rows.into_iter().map(Event::try_from).collect()
    }

    async fn find_by_id(&self, event_id: EventId) -> AppResult<Option<Event>> {
        let row = sqlx::query_as::<_, EventRow>(
            r#"
                SELECT event_id, title, description, location, event_date, capacity, status
                FROM events
                WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        row.map(Event::try_from).transpose()
    }

    async fn find_published_by_id(&self, event_id: EventId) -> AppResult<Option<Event>> {
        let row = sqlx::query_as::<_, EventRow>(
            r#"
                SELECT event_id, title, description, location, event_date, capacity, status
                FROM events
                WHERE event_id = $1 AND status = 'published'
            "#,
        )
        .bind(event_id)
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        row.map(Event::try_from).transpose()
    }

    async fn update(&self, event: UpdateEvent) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        // 更新は draft のイベントにしか許されないので、
        // 行ロックを取って状態を検査してから書き込む
        let status = self.find_status_for_update(&mut tx, event.event_id).await?;
        parse_event_status(&status)?.ensure_can_update()?;

        let res = sqlx::query(
            r#"
                UPDATE events
                SET title = COALESCE($2, title),
                    description = COALESCE($3, description),
                    location = COALESCE($4, location),
                    event_date = COALESCE($5, event_date),
                    capacity = COALESCE($6, capacity),
                    updated_at = NOW()
                WHERE event_id = $1
            "#,
        )
        .bind(event.event_id)
        .bind(event.title)
        .bind(event.description)
        .bind(event.location)
        .bind(event.event_date)
        .bind(event.capacity)
        .execute(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No event record has been updated".into(),
            ));
        }

        tx.commit().await.map_err(AppError::TransactionError)?;
        Ok(())
    }

    async fn publish(&self, event_id: EventId) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let status = self.find_status_for_update(&mut tx, event_id).await?;
        parse_event_status(&status)?.ensure_can_publish()?;

        let res = sqlx::query(
            r#"
                UPDATE events
                SET status = $2, updated_at = NOW()
                WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .bind(EventStatus::Published.as_ref())
        .execute(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No event record has been published".into(),
            ));
        }

        tx.commit().await.map_err(AppError::TransactionError)?;
        Ok(())
    }

    async fn cancel(&self, event_id: EventId) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let status = self.find_status_for_update(&mut tx, event_id).await?;
        parse_event_status(&status)?.ensure_can_cancel()?;

        let res = sqlx::query(
            r#"
                UPDATE events
                SET status = $2, updated_at = NOW()
                WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .bind(EventStatus::Canceled.as_ref())
        .execute(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No event record has been canceled".into(),
            ));
        }

        tx.commit().await.map_err(AppError::TransactionError)?;
        Ok(())
    }
}

impl EventRepositoryImpl {
    // 状態遷移の前提を検査するため、イベント行をロックして現在の状態を取る
    async fn find_status_for_update(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        event_id: EventId,
    ) -> AppResult<String> {
        let status = sqlx::query_scalar::<_, String>(
            r#"
                SELECT status FROM events WHERE event_id = $1 FOR UPDATE
            "#,
        )
        .bind(event_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        status.ok_or_else(|| AppError::EntityNotFound("Event not found".into()))
    }
}
