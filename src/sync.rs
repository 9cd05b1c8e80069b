//! Keeps every version-sync target declaring the same version.
//!
//! Matching is deliberately loose so one pattern covers JSON manifests, YAML or
//! TOML descriptors, SCSS headers and banner comments alike. See
//! [`VERSION_PATTERN`] for the tolerated forms. Only the first declaration in a
//! file is rewritten.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::{Captures, Regex};
use semver::Version;

use crate::atomic::StagedFile;
use crate::error::{PipelineError, Result};

/// Version declaration pattern, matched case-insensitively.
///
/// - group 1: the key with optional single or double quotes, `:` or `=`, and an
///   optional opening quote on the value (`"version": "`, `version = '`,
///   `VERSION: `)
/// - group 2: `MAJOR.MINOR.PATCH` plus any pre-release or build suffix, all of
///   which is replaced
/// - group 3: the optional closing quote
pub const VERSION_PATTERN: &str = r#"(?i)(['"]?version['"]?\s*[:=]\s*['"]?)(\d+\.\d+\.\d+(?:-[0-9A-Za-z.-]+)?(?:\+[0-9A-Za-z.-]+)?)(['"]?)"#;

fn version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(VERSION_PATTERN).expect("VERSION_PATTERN is a valid regex"))
}

/// The version value of the first declaration in `content`.
pub fn find_version(content: &str) -> Option<&str> {
    version_regex()
        .captures(content)
        .and_then(|caps| caps.get(2))
        .map(|m| m.as_str())
}

/// Rewrite the first version declaration in `content`. `None` if there is none.
pub fn replace_version(content: &str, new_version: &str) -> Option<String> {
    let re = version_regex();
    if !re.is_match(content) {
        return None;
    }
    let replaced = re.replacen(content, 1, |caps: &Captures| {
        format!("{}{}{}", &caps[1], new_version, &caps[3])
    });
    Some(replaced.into_owned())
}

/// Write `new_version` into every target.
///
/// All targets are read and rewritten in memory, then staged as temporary
/// files, before any of them is replaced. If any target has no
/// version declaration the call fails with [`PipelineError::PatternNotFound`]
/// and no file is touched. The returned map is `true` for files that were
/// rewritten and `false` for files that already declared `new_version`.
pub fn sync_files(new_version: &Version, targets: &[PathBuf]) -> Result<BTreeMap<PathBuf, bool>> {
    let new_version = new_version.to_string();
    let mut planned: Vec<(PathBuf, Option<String>)> = Vec::with_capacity(targets.len());

    for target in targets {
        let content = read_target(target)?;
        let current = find_version(&content).ok_or_else(|| PipelineError::PatternNotFound {
            path: target.clone(),
        })?;

        if current == new_version {
            planned.push((target.clone(), None));
            continue;
        }

        let updated = replace_version(&content, &new_version).ok_or_else(|| {
            PipelineError::PatternNotFound {
                path: target.clone(),
            }
        })?;
        planned.push((target.clone(), Some(updated)));
    }

    let mut staged = Vec::new();
    let mut changed = BTreeMap::new();
    for (target, updated) in planned {
        match updated {
            Some(content) => {
                staged.push(StagedFile::new(&target, content.as_bytes())?);
                changed.insert(target, true);
            }
            None => {
                tracing::debug!(file = %target.display(), "version already current");
                changed.insert(target, false);
            }
        }
    }

    for file in staged {
        let target = file.commit()?;
        tracing::info!(file = %target.display(), version = %new_version, "updated version");
    }
    Ok(changed)
}

fn read_target(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            PipelineError::config(format!("Version target {} does not exist", path.display()))
        } else {
            PipelineError::Io(e)
        }
    })
}
