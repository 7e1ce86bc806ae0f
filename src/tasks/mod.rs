//! Background Tasks Module
//!
//! Contains background tasks that run alongside a cache.
//!
//! # Tasks
//! - TTL Sweeper: removes each entry as soon as its TTL runs out

mod sweeper;

pub use sweeper::{spawn_sweeper, Sweeper};
