pub mod auth;
pub mod event;
pub mod reservation;
pub mod user;
