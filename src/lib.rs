pub mod atomic;
pub mod boundary;
pub mod cli;
pub mod concat;
pub mod config;
pub mod domain;
pub mod error;
pub mod git;
pub mod manifest;
pub mod release;
pub mod sync;
pub mod tasks;
pub mod tools;
pub mod ui;
pub mod watch;

pub use error::{PipelineError, Result};
