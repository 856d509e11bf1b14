pub mod artist;
pub mod auth;
pub mod booking;
pub mod chapter;
pub mod health;
pub mod media;
pub mod requests;
pub mod user;
