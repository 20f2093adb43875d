//! Background Tasks Module
//!
//! # Tasks
//! - TTL Sweep: purges expired memory-backend entries at configured intervals

mod cleanup;

pub use cleanup::{spawn_cleanup_task, sweep_once};
