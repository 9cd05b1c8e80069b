//! Version-control abstraction layer
//!
//! The release sequence only needs four operations from the repository:
//! commit a set of files, create an annotated tag, name the current branch and
//! push. [`VersionControl`] captures exactly those so the sequence can run
//! against a real repository or a recording mock.
//!
//! - [repository::Git2Repository]: implementation using the `git2` crate
//! - [mock::MockRepository]: in-memory implementation for tests

pub mod mock;
pub mod repository;

pub use mock::{MockRepository, VcsOperation};
pub use repository::Git2Repository;

use crate::error::Result;
use std::path::Path;

/// Repository operations used by a release.
///
/// None of these are retried by callers. Implementations should report
/// failures as they happen and leave the repository as it is.
pub trait VersionControl {
    /// Stage exactly `paths` and commit them on the current branch.
    ///
    /// # Returns
    /// * `Ok(String)` - Full hash of the new commit
    /// * `Err` - If a path is outside the repository or the commit fails
    fn commit(&mut self, paths: &[&Path], message: &str) -> Result<String>;

    /// Create an annotated tag on HEAD.
    ///
    /// Fails if the tag already exists.
    fn tag(&mut self, name: &str, message: &str) -> Result<()>;

    /// Short name of the checked-out branch (e.g., "master").
    fn current_branch(&self) -> Result<String>;

    /// Push `branch` and the tag `tag` to `remote`.
    fn push(&mut self, remote: &str, branch: &str, tag: &str) -> Result<()>;
}
