//! Authenticated user records

pub mod cache;

pub use cache::UserCache;
