pub mod auth;
pub mod event;
pub mod health;
pub mod reservation;
pub mod ticket;
pub mod user;
pub mod v1;
