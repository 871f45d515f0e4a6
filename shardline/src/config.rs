//! Configuration.

pub use shardline_config::*;
