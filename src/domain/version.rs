use crate::error::{PipelineError, Result};
use semver::{BuildMetadata, Prerelease, Version};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier used when a release version first becomes a pre-release.
const PRERELEASE_ID: &str = "pre";

/// Granularity of a version bump
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BumpKind {
    Major,
    Minor,
    Patch,
    Prerelease,
}

impl BumpKind {
    pub fn name(&self) -> &'static str {
        match self {
            BumpKind::Major => "major",
            BumpKind::Minor => "minor",
            BumpKind::Patch => "patch",
            BumpKind::Prerelease => "prerelease",
        }
    }
}

impl Default for BumpKind {
    fn default() -> Self {
        BumpKind::Minor
    }
}

impl fmt::Display for BumpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parse a `MAJOR.MINOR.PATCH[-TAG][+BUILD]` version string.
pub fn parse_version(input: &str) -> Result<Version> {
    Version::parse(input.trim()).map_err(|_| PipelineError::InvalidVersion(input.to_string()))
}

/// Bump a version according to the bump kind.
///
/// - **Major**: major += 1, minor = 0, patch = 0
/// - **Minor**: minor += 1, patch = 0
/// - **Patch**: patch += 1
/// - **Prerelease**: the numeric core is kept; `-pre.1` is appended, or the
///   trailing numeric identifier of an existing pre-release is incremented
///
/// Numeric bumps drop any pre-release tag. Build metadata never survives a bump.
///
/// Fails with [`PipelineError::InvalidVersion`] when the bumped component
/// would overflow.
///
/// # Example
/// ```ignore
/// let v = parse_version("1.2.3")?;
/// assert_eq!(bump(&v, BumpKind::Minor)?.to_string(), "1.3.0");
/// assert_eq!(bump(&v, BumpKind::Prerelease)?.to_string(), "1.2.3-pre.1");
/// ```
pub fn bump(current: &Version, kind: BumpKind) -> Result<Version> {
    let overflow = || PipelineError::InvalidVersion(format!("{} cannot be bumped further", current));
    let mut next = Version::new(current.major, current.minor, current.patch);
    match kind {
        BumpKind::Major => {
            next.major = next.major.checked_add(1).ok_or_else(overflow)?;
            next.minor = 0;
            next.patch = 0;
        }
        BumpKind::Minor => {
            next.minor = next.minor.checked_add(1).ok_or_else(overflow)?;
            next.patch = 0;
        }
        BumpKind::Patch => {
            next.patch = next.patch.checked_add(1).ok_or_else(overflow)?;
        }
        BumpKind::Prerelease => {
            next.pre = next_prerelease(&current.pre).ok_or_else(overflow)?;
        }
    }
    next.build = BuildMetadata::EMPTY;
    Ok(next)
}

fn next_prerelease(pre: &Prerelease) -> Option<Prerelease> {
    let text = if pre.is_empty() {
        format!("{}.1", PRERELEASE_ID)
    } else {
        let mut parts: Vec<String> = pre.as_str().split('.').map(str::to_string).collect();
        match parts.last().and_then(|last| last.parse::<u64>().ok()) {
            Some(n) => {
                let idx = parts.len() - 1;
                parts[idx] = n.checked_add(1)?.to_string();
            }
            None => parts.push("1".to_string()),
        }
        parts.join(".")
    };

    Prerelease::new(&text).ok()
}
