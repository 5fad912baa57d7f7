//! UKNF Worker
//!
//! Periodic background tasks that run beside the request-scoped services.

pub mod sweeper;

pub use sweeper::{SweepSummary, SweeperConfig, TimeoutSweeper};
