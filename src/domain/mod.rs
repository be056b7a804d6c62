//! Domain layer: page properties, posts and block trees.

pub mod blocks;
pub mod posts;
pub mod properties;
pub mod slug;
pub mod tags;
