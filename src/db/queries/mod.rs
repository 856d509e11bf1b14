pub mod artist;
pub mod booking;
pub mod chapter;
pub mod requests;
pub mod user;
