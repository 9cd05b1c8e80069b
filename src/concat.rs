//! Ordered concatenation of stylesheet partials into one distributable file.
//!
//! Output order is exactly the declared order of the source list. Sources are
//! read in full before anything is written, and the destination is replaced
//! through a temporary file in the same directory, so a failed run never leaves
//! a partial artifact behind.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::atomic::write_atomic;
use crate::boundary::BoundaryWarning;
use crate::error::{PipelineError, Result};
use crate::manifest::PackageMetadata;

/// Banner template with `{name}`, `{version}` and `{date}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub template: String,
}

impl Banner {
    pub fn new(template: impl Into<String>) -> Self {
        Banner {
            template: template.into(),
        }
    }

    /// Render the banner. The date is formatted `yyyy-mm-dd`.
    pub fn render(&self, package: &PackageMetadata, date: NaiveDate) -> String {
        self.template
            .replace("{name}", &package.name)
            .replace("{version}", &package.version.to_string())
            .replace("{date}", &date.format("%Y-%m-%d").to_string())
    }
}

/// Outcome of a successful concatenation
#[derive(Debug, Clone, PartialEq)]
pub struct ConcatResult {
    /// Size of the written artifact, banner included
    pub bytes: u64,
    /// Files included, in output order
    pub included: Vec<PathBuf>,
    pub warnings: Vec<BoundaryWarning>,
}

fn is_glob(entry: &str) -> bool {
    entry.contains(['*', '?', '['])
}

/// Expand a declared source list into concrete files, preserving declared order.
///
/// Literal entries must exist. Glob entries must match at least one file and
/// contribute their matches in lexical order. A file reached a second time is
/// skipped with a warning.
pub fn resolve_sources(
    root: &Path,
    entries: &[String],
) -> Result<(Vec<PathBuf>, Vec<BoundaryWarning>)> {
    let mut files: Vec<PathBuf> = Vec::new();
    let mut warnings = Vec::new();

    for entry in entries {
        let matched: Vec<PathBuf> = if is_glob(entry) {
            let pattern = root.join(entry);
            let pattern = pattern.to_string_lossy();
            let paths = glob::glob(&pattern).map_err(|e| {
                PipelineError::config(format!("Invalid source pattern '{}': {}", entry, e))
            })?;
            let mut matched: Vec<PathBuf> = paths
                .filter_map(|p| p.ok())
                .filter(|p| p.is_file())
                .collect();
            matched.sort();
            matched
        } else {
            let path = root.join(entry);
            if path.is_file() {
                vec![path]
            } else {
                Vec::new()
            }
        };

        if matched.is_empty() {
            return Err(PipelineError::MissingSource {
                path: root.join(entry),
            });
        }

        for path in matched {
            if files.contains(&path) {
                warnings.push(BoundaryWarning::DuplicateSource { path });
            } else {
                files.push(path);
            }
        }
    }

    Ok((files, warnings))
}

/// Concatenate `sources` in order under a rendered banner and write the result
/// to `destination`, replacing any existing file.
pub fn concatenate(sources: &[PathBuf], destination: &Path, banner: &str) -> Result<ConcatResult> {
    let mut output = banner.as_bytes().to_vec();

    for source in sources {
        let bytes = fs::read(source).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PipelineError::MissingSource {
                    path: source.clone(),
                }
            } else {
                PipelineError::Io(e)
            }
        })?;
        tracing::debug!(file = %source.display(), bytes = bytes.len(), "read source");
        output.extend_from_slice(&bytes);
    }

    write_atomic(destination, &output)?;

    tracing::info!(
        destination = %destination.display(),
        files = sources.len(),
        bytes = output.len(),
        "wrote concatenated artifact"
    );

    Ok(ConcatResult {
        bytes: output.len() as u64,
        included: sources.to_vec(),
        warnings: Vec::new(),
    })
}

/// Resolve the declared entries under `root` and concatenate them.
pub fn concatenate_entries(
    root: &Path,
    entries: &[String],
    destination: &Path,
    banner: &str,
) -> Result<ConcatResult> {
    if entries.is_empty() {
        return Err(PipelineError::config(
            "concat.sources is empty - list the partials to bundle, in order",
        ));
    }
    let (files, warnings) = resolve_sources(root, entries)?;
    let mut result = concatenate(&files, destination, banner)?;
    result.warnings = warnings;
    Ok(result)
}
