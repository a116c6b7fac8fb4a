//! Background Tasks Module
//!
//! Tasks the store detaches from the call that started them.
//!
//! # Tasks
//! - Write-back: persists a value produced on a cache miss

mod write_back;

pub use write_back::{spawn_write_back, WriteBackTracker};
