//! Outbound HTTP adapters

pub mod graph;

pub use graph::{resource_path, GraphResourceFetcher};
