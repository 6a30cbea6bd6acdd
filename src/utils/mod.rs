//! Shared helpers.

pub mod parallel;

pub use parallel::{ParallelConfig, ParallelExecutor};
