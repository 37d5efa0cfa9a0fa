use crate::model::{
    event::{CreateEvent, Event, UpdateEvent},
    id::EventId,
};
use async_trait::async_trait;
use mockall::automock;
use shared::error::AppResult;

#[automock]
#[async_trait]
pub trait EventRepository: Send + Sync {
    // イベントを draft 状態で登録する
    async fn create(&self, event: CreateEvent) -> AppResult<EventId>;
    // 公開中のイベントを開催日の昇順で取得する
    async fn find_published_all(&self) -> AppResult<Vec<Event>>;
    // 全イベントを開催日の降順で取得する（管理者向け）
    async fn find_all(&self) -> AppResult<Vec<Event>>;
    async fn find_by_id(&self, event_id: EventId) -> AppResult<Option<Event>>;
    async fn find_published_by_id(&self, event_id: EventId) -> AppResult<Option<Event>>;
    // draft のイベントのみ更新できる
    async fn update(&self, event: UpdateEvent) -> AppResult<()>;
    // draft → published の遷移のみ許す
    async fn publish(&self, event_id: EventId) -> AppResult<()>;
    // canceled への遷移。すでに canceled の場合は失敗する
    async fn cancel(&self, event_id: EventId) -> AppResult<()>;
}
