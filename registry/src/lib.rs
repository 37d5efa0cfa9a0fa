use std::sync::Arc;

use adapter::database::ConnectionPool;
use adapter::redis::RedisClient;
use adapter::repository::auth::AuthRepositoryImpl;
use adapter::repository::event::EventRepositoryImpl;
use adapter::repository::health::HealthCheckRepositoryImpl;
use adapter::repository::reservation::ReservationRepositoryImpl;
use adapter::repository::user::UserRepositoryImpl;
use kernel::repository::auth::AuthRepository;
use kernel::repository::event::EventRepository;
use kernel::repository::health::HealthCheckRepository;
use kernel::repository::reservation::ReservationRepository;
use kernel::repository::user::UserRepository;
use shared::config::AppConfig;

// DI コンテナ。リポジトリの実体はここで一度だけ組み立てる
#[derive(Clone)]
pub struct AppRegistryImpl {
    health_check_repository: Arc<dyn HealthCheckRepository>,
    user_repository: Arc<dyn UserRepository>,
    auth_repository: Arc<dyn AuthRepository>,
    event_repository: Arc<dyn EventRepository>,
    reservation_repository: Arc<dyn ReservationRepository>,
}

impl AppRegistryImpl {
    pub fn new(pool: ConnectionPool, redis_client: Arc<RedisClient>, app_config: AppConfig) -> Self {
        let health_check_repository = Arc::new(HealthCheckRepositoryImpl::new(pool.clone()));
        let user_repository = Arc::new(UserRepositoryImpl::new(pool.clone()));
        let auth_repository = Arc::new(AuthRepositoryImpl::new(
            pool.clone(),
            redis_client.clone(),
            app_config.auth.ttl,
        ));
        let event_repository = Arc::new(EventRepositoryImpl::new(pool.clone()));
        let reservation_repository = Arc::new(ReservationRepositoryImpl::new(pool.clone()));
        Self {
            health_check_repository,
            user_repository,
            auth_repository,
            event_repository,
            reservation_repository,
        }
    }
}

#[mockall::automock]
pub trait AppRegistryExt {
    fn health_check_repository(&self) -> Arc<dyn HealthCheckRepository>;
    fn user_repository(&self) -> Arc<dyn UserRepository>;
    fn auth_repository(&self) -> Arc<dyn AuthRepository>;
    fn event_repository(&self) -> Arc<dyn EventRepository>;
    fn reservation_repository(&self) -> Arc<dyn ReservationRepository>;
}

impl AppRegistryExt for AppRegistryImpl {
    fn health_check_repository(&self) -> Arc<dyn HealthCheckRepository> {
        self.health_check_repository.clone()
    }

    fn user_repository(&self) -> Arc<dyn UserRepository> {
        self.user_repository.clone()
    }

    fn auth_repository(&self) -> Arc<dyn AuthRepository> {
        self.auth_repository.clone()
    }

    fn event_repository(&self) -> Arc<dyn EventRepository> {
        self.event_repository.clone()
    }

    fn reservation_repository(&self) -> Arc<dyn ReservationRepository> {
        self.reservation_repository.clone()
    }
}

pub type AppRegistry = Arc<dyn AppRegistryExt + Send + Sync + 'static>;
