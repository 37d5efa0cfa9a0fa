use crate::database::{model::user::UserRow, ConnectionPool};
use async_trait::async_trait;
use derive_new::new;
use kernel::model::{
    id::UserId,
    role::Role,
    user::{event::CreateUser, User},
};
use kernel::repository::user::UserRepository;
use shared::error::{AppError, AppResult};

#[derive(new)]
pub struct UserRepositoryImpl {
    db: ConnectionPool,
}

#[async_trait]
impl UserRepository for UserRepositoryImpl {
    async fn create(&self, event: CreateUser) -> AppResult<User> {
        // メールアドレスの一意性はアプリ側で先に確認する。
        // 競合した場合の最終防衛線は users.email の UNIQUE 制約
        let taken = sqlx::query_scalar::<_, i64>(
            r#"
                SELECT COUNT(*) FROM users WHERE email = $1
            "#,
        )
        .bind(&event.email)
        .fetch_one(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        if taken > 0 {
            return Err(AppError::Conflict(
                "User with this email already exists".into(),
            ));
        }

        let user_id = UserId::new();
        let password_hash = bcrypt::hash(&event.password, bcrypt::DEFAULT_COST)?;

        self.insert(user_id, &event, &password_hash).await?;

        Ok(User {
            user_id,
            user_name: event.user_name,
            email: event.email,
            // 自己登録で作られるユーザーは常に participant
            role: Role::Participant,
        })
    }

    async fn find_current_user(&self, current_user_id: UserId) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
                SELECT user_id, user_name, email, role
                FROM users
                WHERE user_id = $1
            "#,
        )
        .bind(current_user_id)
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        row.map(User::try_from).transpose()
    }
}

impl UserRepositoryImpl {
    // 事前確認をすり抜けた同時登録は users.email の UNIQUE 制約に
    // 行き着くので、その一意性違反も conflict として返す
    async fn insert(
        &self,
        user_id: UserId,
        event: &CreateUser,
        password_hash: &str,
    ) -> AppResult<()> {
        let res = sqlx::query(
            r#"
                INSERT INTO users (user_id, user_name, email, password_hash, role)
                VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user_id)
        .bind(&event.user_name)
        .bind(&event.email)
        .bind(password_hash)
        .bind(Role::Participant.as_ref())
        .execute(self.db.inner_ref())
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                AppError::Conflict("User with this email already exists".into())
            }
            e => AppError::SpecificOperationError(e),
        })?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No user record has been created".into(),
            ));
        }
        Ok(())
    }
}
