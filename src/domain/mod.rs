//! Domain logic - pure version rules independent of files and git

pub mod template;
pub mod version;

pub use template::VersionTemplate;
pub use version::{bump, parse_version, BumpKind};
