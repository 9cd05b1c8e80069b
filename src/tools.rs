//! External tools the test task delegates to.
//!
//! The SCSS compiler and the assertion runner are opaque: they are invoked as
//! processes and judged only by their exit status. Their output is carried
//! into the error verbatim on failure so the diagnostics reach a human.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{PipelineError, Result};

/// Compiles an SCSS entry point to CSS
pub trait Compiler {
    fn compile(&mut self, input: &Path, output: &Path, load_paths: &[PathBuf]) -> Result<()>;
}

/// Runs assertions over a compiled stylesheet
pub trait AssertionRunner {
    fn run(&mut self, css: &Path) -> Result<()>;
}

/// Run `program` with `args` and turn a non-zero exit into [`PipelineError::ExternalTool`].
///
/// Returns the captured stdout on success.
pub fn run_tool(program: &str, args: &[String], cwd: &Path) -> Result<String> {
    tracing::debug!(program, ?args, "spawning external tool");

    let output = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .output()
        .map_err(|e| PipelineError::tool(program, format!("Failed to execute {}: {}", program, e)))?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if !output.status.success() {
        return Err(PipelineError::ExternalTool {
            tool: program.to_string(),
            code: output.status.code(),
            stdout,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    Ok(stdout)
}

/// Compiler backed by a `sass` executable (Dart Sass command line)
pub struct ProcessCompiler {
    pub program: String,
    pub cwd: PathBuf,
}

impl ProcessCompiler {
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        ProcessCompiler {
            program: program.into(),
            cwd: cwd.into(),
        }
    }

    /// Command line for one compilation
    pub fn args(input: &Path, output: &Path, load_paths: &[PathBuf]) -> Vec<String> {
        let mut args: Vec<String> = load_paths
            .iter()
            .map(|p| format!("--load-path={}", p.display()))
            .collect();
        args.push("--no-source-map".to_string());
        args.push(input.display().to_string());
        args.push(output.display().to_string());
        args
    }
}

impl Compiler for ProcessCompiler {
    fn compile(&mut self, input: &Path, output: &Path, load_paths: &[PathBuf]) -> Result<()> {
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)?;
        }
        let args = Self::args(input, output, load_paths);
        run_tool(&self.program, &args, &self.cwd)?;
        tracing::info!(input = %input.display(), output = %output.display(), "compiled stylesheet");
        Ok(())
    }
}

/// Assertion runner backed by an executable. `{css}` in `args` is replaced
/// by the compiled stylesheet path.
pub struct ProcessAssertionRunner {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

impl ProcessAssertionRunner {
    pub fn new(program: impl Into<String>, args: Vec<String>, cwd: impl Into<PathBuf>) -> Self {
        ProcessAssertionRunner {
            program: program.into(),
            args,
            cwd: cwd.into(),
        }
    }
}

impl AssertionRunner for ProcessAssertionRunner {
    fn run(&mut self, css: &Path) -> Result<()> {
        let css = css.display().to_string();
        let args: Vec<String> = self.args.iter().map(|a| a.replace("{css}", &css)).collect();
        let stdout = run_tool(&self.program, &args, &self.cwd)?;
        for line in stdout.lines() {
            tracing::info!(target: "bem_pipeline::assertions", "{}", line);
        }
        Ok(())
    }
}
