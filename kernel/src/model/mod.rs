pub mod auth;
pub mod event;
pub mod id;
pub mod reservation;
pub mod role;
pub mod user;
