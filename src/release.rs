//! Versioned release: build, bump, commit, tag, push.
//!
//! The sequence is linear and stops at the first failure. Nothing is rolled
//! back and nothing is retried: a release that fails after the commit was
//! created leaves the commit (and possibly the tag) in place, and the failure
//! carries a [`BoundaryWarning::PartialRelease`] describing what was done.

use std::fmt;
use std::path::PathBuf;

use semver::Version;

use crate::boundary::BoundaryWarning;
use crate::config::Config;
use crate::domain::{bump, BumpKind, VersionTemplate};
use crate::error::{PipelineError, Result};
use crate::git::VersionControl;
use crate::manifest::PackageMetadata;
use crate::sync::sync_files;
use crate::tasks::TaskGraph;

/// Name of the task run before bumping.
pub const BUILD_TASK: &str = "build";

/// The working stages of a release, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Building,
    Bumping,
    Committing,
    Tagging,
    Pushing,
}

impl Stage {
    pub fn description(&self) -> &'static str {
        match self {
            Stage::Building => "building",
            Stage::Bumping => "bumping the version",
            Stage::Committing => "committing",
            Stage::Tagging => "tagging",
            Stage::Pushing => "pushing",
        }
    }

    /// Whether failing in this stage can leave the repository modified
    pub fn touches_repository(&self) -> bool {
        *self >= Stage::Committing
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseState {
    Idle,
    Running(Stage),
    Done,
    Failed(Stage),
}

/// What a release did, filled in as stages complete
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseRecord {
    pub kind: BumpKind,
    pub old_version: Option<Version>,
    pub new_version: Option<Version>,
    pub files_changed: Vec<PathBuf>,
    pub commit: Option<String>,
    pub tag: Option<String>,
    pub pushed: bool,
    pub warnings: Vec<BoundaryWarning>,
}

impl ReleaseRecord {
    fn new(kind: BumpKind) -> Self {
        ReleaseRecord {
            kind,
            old_version: None,
            new_version: None,
            files_changed: Vec::new(),
            commit: None,
            tag: None,
            pushed: false,
            warnings: Vec::new(),
        }
    }

    fn completed_steps(&self) -> Vec<String> {
        let mut done = Vec::new();
        if !self.files_changed.is_empty() {
            done.push(format!("updated {} version file(s)", self.files_changed.len()));
        }
        if let Some(commit) = &self.commit {
            done.push(format!("committed {}", &commit[..commit.len().min(7)]));
        }
        if let Some(tag) = &self.tag {
            done.push(format!("tagged {}", tag));
        }
        done
    }
}

/// Release settings taken from configuration
#[derive(Debug, Clone)]
pub struct ReleaseSettings {
    pub kind: BumpKind,
    pub manifest: PathBuf,
    /// Manifest first, then mirrors
    pub targets: Vec<PathBuf>,
    pub commit_message: VersionTemplate,
    pub tag_name: VersionTemplate,
    pub tag_message: VersionTemplate,
    pub remote: String,
    pub push: bool,
}

impl ReleaseSettings {
    pub fn from_config(
        config: &Config,
        root: &std::path::Path,
        package_name: &str,
        kind: BumpKind,
    ) -> Self {
        ReleaseSettings {
            kind,
            manifest: config.resolve(root, &config.package.manifest),
            targets: config.version_targets(root, package_name),
            commit_message: config.commit_message(),
            tag_name: config.tag_name(),
            tag_message: config.tag_message(),
            remote: config.release.remote.clone(),
            push: config.release.push,
        }
    }
}

/// What a release would do, without doing it
#[derive(Debug, Clone, PartialEq)]
pub struct ReleasePlan {
    pub kind: BumpKind,
    pub old_version: Version,
    pub new_version: Version,
    pub tag: String,
    pub targets: Vec<PathBuf>,
    pub remote: Option<String>,
}

pub struct ReleaseSequencer<'r> {
    settings: ReleaseSettings,
    vcs: &'r mut dyn VersionControl,
    state: ReleaseState,
    record: ReleaseRecord,
}

impl<'r> ReleaseSequencer<'r> {
    pub fn new(settings: ReleaseSettings, vcs: &'r mut dyn VersionControl) -> Self {
        let record = ReleaseRecord::new(settings.kind);
        ReleaseSequencer {
            settings,
            vcs,
            state: ReleaseState::Idle,
            record,
        }
    }

    pub fn state(&self) -> ReleaseState {
        self.state
    }

    pub fn record(&self) -> &ReleaseRecord {
        &self.record
    }

    /// Compute the new version and tag without building or writing anything.
    pub fn plan(&self) -> Result<ReleasePlan> {
        let package = PackageMetadata::load(&self.settings.manifest)?;
        let new_version = bump(&package.version, self.settings.kind)?;
        Ok(ReleasePlan {
            kind: self.settings.kind,
            tag: self.settings.tag_name.render(&new_version),
            old_version: package.version,
            new_version,
            targets: self.settings.targets.clone(),
            remote: self.settings.push.then(|| self.settings.remote.clone()),
        })
    }

    /// Run the release to completion or to the first failure.
    pub fn run(&mut self, graph: &mut TaskGraph<'_>) -> Result<ReleaseRecord> {
        self.settings
            .tag_name
            .require_placeholder("release.tag_name")?;

        self.stage(Stage::Building, |_| graph.run(BUILD_TASK).map(|_| ()))?;
        self.stage(Stage::Bumping, Self::bump_versions)?;
        self.stage(Stage::Committing, Self::commit)?;
        self.stage(Stage::Tagging, Self::tag)?;
        if self.settings.push {
            self.stage(Stage::Pushing, Self::push)?;
        } else if let Some(tag) = self.record.tag.clone() {
            self.record.warnings.push(BoundaryWarning::TagNotPushed {
                tag,
                remote: self.settings.remote.clone(),
            });
        }

        self.state = ReleaseState::Done;
        tracing::info!(
            version = ?self.record.new_version.as_ref().map(|v| v.to_string()),
            "release complete"
        );
        Ok(self.record.clone())
    }

    fn stage<F>(&mut self, stage: Stage, action: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.state = ReleaseState::Running(stage);
        tracing::debug!(stage = stage.description(), "release stage");
        match action(self) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.state = ReleaseState::Failed(stage);
                if stage.touches_repository() && self.record.commit.is_some() {
                    self.record.warnings.push(BoundaryWarning::PartialRelease {
                        failed_stage: stage.description().to_string(),
                        completed: self.record.completed_steps(),
                    });
                }
                Err(PipelineError::Release {
                    stage: stage.description().to_string(),
                    source: Box::new(e),
                })
            }
        }
    }

    fn new_version(&self) -> Result<&Version> {
        self.record
            .new_version
            .as_ref()
            .ok_or_else(|| PipelineError::config("Release has no new version yet"))
    }

    fn bump_versions(&mut self) -> Result<()> {
        let package = PackageMetadata::load(&self.settings.manifest)?;
        let new_version = bump(&package.version, self.settings.kind)?;
        tracing::info!(
            from = %package.version,
            to = %new_version,
            kind = %self.settings.kind,
            "bumping version"
        );

        let changed = sync_files(&new_version, &self.settings.targets)?;
        for (path, was_changed) in changed {
            if was_changed {
                self.record.files_changed.push(path);
            } else {
                self.record.warnings.push(BoundaryWarning::TargetAlreadyCurrent {
                    path,
                    version: new_version.to_string(),
                });
            }
        }

        self.record.old_version = Some(package.version);
        self.record.new_version = Some(new_version);
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        let version = self.new_version()?.clone();
        let message = self.settings.commit_message.render(&version);
        let paths: Vec<&std::path::Path> =
            self.settings.targets.iter().map(PathBuf::as_path).collect();
        let id = self.vcs.commit(&paths, &message)?;
        self.record.commit = Some(id);
        Ok(())
    }

    fn tag(&mut self) -> Result<()> {
        let version = self.new_version()?.clone();
        let name = self.settings.tag_name.render(&version);
        let message = self.settings.tag_message.render(&version);
        self.vcs.tag(&name, &message)?;
        self.record.tag = Some(name);
        Ok(())
    }

    fn push(&mut self) -> Result<()> {
        let tag = self
            .record
            .tag
            .clone()
            .ok_or_else(|| PipelineError::config("Release has no tag to push"))?;
        let branch = self.vcs.current_branch()?;
        self.vcs.push(&self.settings.remote, &branch, &tag)?;
        self.record.pushed = true;
        Ok(())
    }
}
