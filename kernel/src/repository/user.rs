use crate::model::{
    id::UserId,
    user::{event::CreateUser, User},
};
use async_trait::async_trait;
use mockall::automock;
use shared::error::AppResult;

#[automock]
#[async_trait]
pub trait UserRepository: Send + Sync {
    // 登録する。メールアドレスが既に使われている場合は conflict
    async fn create(&self, event: CreateUser) -> AppResult<User>;
    // トークン検証後のユーザー情報の復元に使う
    async fn find_current_user(&self, current_user_id: UserId) -> AppResult<Option<User>>;
}
