use crate::error::{PipelineError, Result};
use crate::git::VersionControl;
use std::path::{Path, PathBuf};

/// A recorded call against [`MockRepository`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VcsOperation {
    Commit { paths: Vec<PathBuf>, message: String },
    Tag { name: String, message: String },
    Push { remote: String, branch: String, tag: String },
}

/// Mock repository for testing without actual git operations
pub struct MockRepository {
    branch: String,
    operations: Vec<VcsOperation>,
    tags: Vec<String>,
    fail_commit: Option<String>,
    fail_tag: Option<String>,
    fail_push: Option<String>,
}

impl MockRepository {
    /// Create a new mock repository on branch `master`
    pub fn new() -> Self {
        MockRepository {
            branch: "master".to_string(),
            operations: Vec::new(),
            tags: Vec::new(),
            fail_commit: None,
            fail_tag: None,
            fail_push: None,
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    /// Make the next commit fail with `message`
    pub fn fail_commit(&mut self, message: impl Into<String>) {
        self.fail_commit = Some(message.into());
    }

    pub fn fail_tag(&mut self, message: impl Into<String>) {
        self.fail_tag = Some(message.into());
    }

    /// Make the push fail, e.g. to simulate a network outage
    pub fn fail_push(&mut self, message: impl Into<String>) {
        self.fail_push = Some(message.into());
    }

    /// Every successful operation, in call order
    pub fn operations(&self) -> &[VcsOperation] {
        &self.operations
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn commits(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| matches!(op, VcsOperation::Commit { .. }))
            .count()
    }
}

impl Default for MockRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl VersionControl for MockRepository {
    fn commit(&mut self, paths: &[&Path], message: &str) -> Result<String> {
        if let Some(reason) = self.fail_commit.take() {
            return Err(PipelineError::Git(git2::Error::from_str(&reason)));
        }
        self.operations.push(VcsOperation::Commit {
            paths: paths.iter().map(|p| p.to_path_buf()).collect(),
            message: message.to_string(),
        });
        Ok(format!("{:040x}", self.commits()))
    }

    fn tag(&mut self, name: &str, message: &str) -> Result<()> {
        if let Some(reason) = self.fail_tag.take() {
            return Err(PipelineError::Git(git2::Error::from_str(&reason)));
        }
        if self.tags.iter().any(|t| t == name) {
            return Err(PipelineError::Git(git2::Error::from_str(&format!(
                "tag '{}' already exists",
                name
            ))));
        }
        self.tags.push(name.to_string());
        self.operations.push(VcsOperation::Tag {
            name: name.to_string(),
            message: message.to_string(),
        });
        Ok(())
    }

    fn current_branch(&self) -> Result<String> {
        Ok(self.branch.clone())
    }

    fn push(&mut self, remote: &str, branch: &str, tag: &str) -> Result<()> {
        if let Some(reason) = self.fail_push.take() {
            return Err(PipelineError::Git(git2::Error::from_str(&reason)));
        }
        self.operations.push(VcsOperation::Push {
            remote: remote.to_string(),
            branch: branch.to_string(),
            tag: tag.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_records_operations_in_order() {
        let mut repo = MockRepository::new();
        let id = repo
            .commit(&[Path::new("package.json")], "Release v1.0.0")
            .unwrap();
        repo.tag("v1.0.0", "Version 1.0.0").unwrap();
        repo.push("origin", "master", "v1.0.0").unwrap();

        assert_eq!(id.len(), 40);
        assert_eq!(repo.operations().len(), 3);
        assert!(matches!(repo.operations()[0], VcsOperation::Commit { .. }));
        assert!(matches!(repo.operations()[2], VcsOperation::Push { .. }));
    }

    #[test]
    fn test_mock_duplicate_tag_fails() {
        let mut repo = MockRepository::new();
        repo.tag("v1.0.0", "").unwrap();
        assert!(repo.tag("v1.0.0", "").is_err());
    }

    #[test]
    fn test_mock_injected_failure_is_one_shot() {
        let mut repo = MockRepository::new();
        repo.fail_push("network unreachable");
        let err = repo.push("origin", "master", "v1").unwrap_err();
        assert!(err.to_string().contains("network unreachable"));
        assert!(repo.push("origin", "master", "v1").is_ok());
    }

    #[test]
    fn test_mock_branch() {
        let repo = MockRepository::new().with_branch("main");
        assert_eq!(repo.current_branch().unwrap(), "main");
    }
}
