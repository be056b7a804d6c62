//! Application services layer.

pub mod chrome;
pub mod error;
pub mod fetcher;
pub mod posts;
pub mod render;
pub mod source;
