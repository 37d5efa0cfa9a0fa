pub mod event;
pub mod reservation;
pub mod user;
