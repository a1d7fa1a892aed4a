pub mod auth;
pub mod booking;
pub mod notify;
pub mod slots;
pub mod storage;
pub mod store;
