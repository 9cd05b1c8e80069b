use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for bem-pipeline operations
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown task: '{0}'")]
    UnknownTask(String),

    #[error("Duplicate task: '{0}' is already registered")]
    DuplicateTask(String),

    #[error("Task '{task}' refers to unknown step '{step}'")]
    UnresolvedStep { task: String, step: String },

    #[error("Task '{0}' depends on itself")]
    TaskCycle(String),

    #[error("Missing source file: {}", .path.display())]
    MissingSource { path: PathBuf },

    #[error("No version declaration found in {}", .path.display())]
    PatternNotFound { path: PathBuf },

    #[error("Invalid version: '{0}' - expected MAJOR.MINOR.PATCH[-TAG]")]
    InvalidVersion(String),

    #[error("{tool} failed{}\nStdout: {stdout}\nStderr: {stderr}", exit_code_suffix(.code))]
    ExternalTool {
        tool: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("Step '{step}' failed: {source}")]
    StepFailed {
        step: String,
        #[source]
        source: Box<PipelineError>,
    },

    #[error("Release failed while {stage}: {source}")]
    Release {
        stage: String,
        #[source]
        source: Box<PipelineError>,
    },

    #[error("Another pipeline run holds the lock at {}", .path.display())]
    RunInProgress { path: PathBuf },

    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("Watch error: {0}")]
    Watch(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_code_suffix(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" with exit code {}", code),
        None => String::new(),
    }
}

/// Convenience type alias for Results in bem-pipeline
pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        PipelineError::Config(msg.into())
    }

    /// Create an external tool failure that carries no process output
    pub fn tool(tool: impl Into<String>, msg: impl Into<String>) -> Self {
        PipelineError::ExternalTool {
            tool: tool.into(),
            code: None,
            stdout: String::new(),
            stderr: msg.into(),
        }
    }

    pub fn watch(msg: impl Into<String>) -> Self {
        PipelineError::Watch(msg.into())
    }

    /// True for errors that stem from how tasks or files were declared rather
    /// than from running them.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            PipelineError::Config(_)
                | PipelineError::UnknownTask(_)
                | PipelineError::DuplicateTask(_)
                | PipelineError::UnresolvedStep { .. }
                | PipelineError::TaskCycle(_)
        )
    }

    /// The innermost error, looking through step and release wrappers.
    pub fn root_cause(&self) -> &PipelineError {
        match self {
            PipelineError::StepFailed { source, .. } | PipelineError::Release { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }
}
