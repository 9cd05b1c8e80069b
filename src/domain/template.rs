use crate::error::{PipelineError, Result};
use semver::Version;

/// Placeholder substituted by release message templates.
pub const VERSION_PLACEHOLDER: &str = "%VERSION%";

/// Release message template (e.g., "Release v%VERSION%", "v%VERSION%")
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionTemplate {
    pub pattern: String,
}

impl VersionTemplate {
    pub fn new(pattern: impl Into<String>) -> Self {
        VersionTemplate {
            pattern: pattern.into(),
        }
    }

    /// Format a version according to the template
    /// Example: pattern="v%VERSION%", version="1.2.3" -> "v1.2.3"
    pub fn render(&self, version: &Version) -> String {
        self.pattern
            .replace(VERSION_PLACEHOLDER, &version.to_string())
    }

    /// Templates used as tag names must vary with the version, otherwise every
    /// release would try to create the same tag.
    pub fn require_placeholder(&self, field: &str) -> Result<()> {
        if self.pattern.contains(VERSION_PLACEHOLDER) {
            Ok(())
        } else {
            Err(PipelineError::config(format!(
                "{} must contain the {} placeholder (got '{}')",
                field, VERSION_PLACEHOLDER, self.pattern
            )))
        }
    }
}
