//! OAuth client orchestration

pub mod client;
pub mod ports;

pub use client::{map_endpoint_error, map_token_error, OAuthClient};
pub use ports::ResourceFetcher;
