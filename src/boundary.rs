use std::fmt;
use std::path::PathBuf;

/// Non-fatal conditions met while building or releasing.
/// These do not stop the run but must be reported to the operator.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundaryWarning {
    /// A source file was reached again by a later entry and skipped
    DuplicateSource { path: PathBuf },
    /// A version target already declared the new version and was not rewritten
    TargetAlreadyCurrent { path: PathBuf, version: String },
    /// A release stopped after changing the repository; nothing was rolled back
    PartialRelease {
        failed_stage: String,
        completed: Vec<String>,
    },
    /// The tag exists locally but was not pushed
    TagNotPushed { tag: String, remote: String },
}

impl fmt::Display for BoundaryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryWarning::DuplicateSource { path } => {
                write!(
                    f,
                    "Source '{}' is listed more than once; keeping its first position",
                    path.display()
                )
            }
            BoundaryWarning::TargetAlreadyCurrent { path, version } => {
                write!(
                    f,
                    "'{}' already declares version {}; left unchanged",
                    path.display(),
                    version
                )
            }
            BoundaryWarning::PartialRelease {
                failed_stage,
                completed,
            } => {
                write!(
                    f,
                    "Release stopped while {} after: {}. Nothing was rolled back; finish or undo these steps by hand",
                    failed_stage,
                    completed.join(", ")
                )
            }
            BoundaryWarning::TagNotPushed { tag, remote } => {
                write!(
                    f,
                    "Tag '{}' was created locally but not pushed; run `git push {} HEAD {}`",
                    tag, remote, tag
                )
            }
        }
    }
}
