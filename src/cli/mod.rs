//! Command orchestration shared by the binary and integration tests

pub mod orchestration;

pub use orchestration::{Pipeline, PipelineCommand, RunLock};
