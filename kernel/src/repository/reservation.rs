use crate::model::{
    id::{EventId, ReservationId, UserId},
    reservation::{
        event::{CancelReservation, CreateReservation},
        Reservation,
    },
};
use async_trait::async_trait;
use mockall::automock;
use shared::error::AppResult;

#[automock]
#[async_trait]
pub trait ReservationRepository: Send + Sync {
    // 予約を pending 状態で作成する。
    // イベントの行ロックを取ったトランザクション内で、公開状態・重複 pending・
    // 確定済み数量の合計を検査してから挿入する
    async fn create(&self, event: CreateReservation) -> AppResult<ReservationId>;
    // pending → confirmed。確定時にも定員を再検査する
    async fn confirm(&self, reservation_id: ReservationId) -> AppResult<()>;
    // pending → refused
    async fn refuse(&self, reservation_id: ReservationId) -> AppResult<()>;
    // 予約者本人による {pending, confirmed} → canceled
    async fn cancel(&self, event: CancelReservation) -> AppResult<()>;
    // すべての予約を取得する（管理者向け）
    async fn find_all(&self) -> AppResult<Vec<Reservation>>;
    // ユーザー ID に紐づく予約を取得する
    async fn find_by_user_id(&self, user_id: UserId) -> AppResult<Vec<Reservation>>;
    async fn find_by_id(&self, reservation_id: ReservationId) -> AppResult<Option<Reservation>>;
    // イベントの残り定員（capacity - 確定済み数量の合計）を取得する
    async fn find_available_capacity(&self, event_id: EventId) -> AppResult<i64>;
}
