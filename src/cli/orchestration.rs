//! Pipeline orchestration
//!
//! Builds a [`TaskGraph`] from configuration and the external-tool
//! capabilities, then runs one command against it. Keeping this out of
//! `main.rs` lets tests drive whole commands with fake tools.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use fs2::FileExt;

use crate::concat::{concatenate_entries, Banner};
use crate::config::{load_config, Config};
use crate::domain::BumpKind;
use crate::error::{PipelineError, Result};
use crate::git::{Git2Repository, VersionControl};
use crate::manifest::PackageMetadata;
use crate::release::{ReleaseRecord, ReleaseSequencer, ReleaseSettings, ReleaseState};
use crate::tasks::TaskGraph;
use crate::tools::{AssertionRunner, Compiler, ProcessAssertionRunner, ProcessCompiler};
use crate::ui;
use crate::watch::{watch, WatchSet};

/// Lock file guarding against two pipeline runs in the same project.
pub const LOCK_FILE_NAME: &str = ".bem-pipeline.lock";

/// A command to run, independent of how it was parsed
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineCommand {
    Test,
    Build,
    Release {
        bump: Option<BumpKind>,
        dry_run: bool,
    },
    Dev,
    List,
}

/// Exclusive hold on the project lock file, released on drop
#[derive(Debug)]
pub struct RunLock {
    file: File,
}

impl RunLock {
    pub fn acquire(root: &Path) -> Result<Self> {
        let path = root.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)?;
        if file.try_lock_exclusive().is_err() {
            return Err(PipelineError::RunInProgress { path });
        }
        tracing::debug!(lock = %path.display(), "acquired run lock");
        Ok(RunLock { file })
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// Loaded configuration for one project
#[derive(Debug, Clone)]
pub struct Pipeline {
    root: PathBuf,
    config: Config,
}

impl Pipeline {
    pub fn new(root: impl Into<PathBuf>, config: Config) -> Self {
        Pipeline {
            root: root.into(),
            config,
        }
    }

    pub fn load(root: impl Into<PathBuf>, config_path: Option<&Path>) -> Result<Self> {
        let root = root.into();
        let config = load_config(config_path, &root)?;
        Ok(Pipeline { root, config })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn package(&self) -> Result<PackageMetadata> {
        PackageMetadata::load(&self.config.resolve(&self.root, &self.config.package.manifest))
    }

    /// Register the `sass`, `assertions` and `concat` steps and the `test`
    /// and `build` tasks.
    pub fn register<'a>(
        &'a self,
        graph: &mut TaskGraph<'a>,
        compiler: &'a mut dyn Compiler,
        runner: &'a mut dyn AssertionRunner,
        date: NaiveDate,
    ) -> Result<()> {
        let config = &self.config;
        let root = self.root.as_path();
        let package = self.package()?;

        let input = config.resolve(root, &config.sass.input);
        let css = config.resolve(root, &config.sass.output);
        let load_paths: Vec<PathBuf> = config
            .sass
            .load_paths
            .iter()
            .map(|p| config.resolve(root, p))
            .collect();

        let compiled = css.clone();
        graph.register_step("sass", move || compiler.compile(&input, &compiled, &load_paths))?;
        graph.register_step("assertions", move || runner.run(&css))?;

        let sources: Vec<String> = config
            .concat
            .sources
            .iter()
            .map(|entry| config.expand(entry))
            .collect();
        let destination = config.destination(root, &package.name);
        let banner = Banner::new(&config.concat.banner).render(&package, date);
        graph.register_step("concat", move || {
            let result = concatenate_entries(root, &sources, &destination, &banner)?;
            ui::display_warnings(&result.warnings);
            ui::display_concat_result(&result, &destination);
            Ok(())
        })?;

        graph.register_task("test", ["sass", "assertions"])?;
        graph.register_task("build", ["test", "concat"])?;
        graph.validate()
    }

    /// Run a named task with the given tools.
    pub fn run_task_with(
        &self,
        name: &str,
        compiler: &mut dyn Compiler,
        runner: &mut dyn AssertionRunner,
        date: NaiveDate,
    ) -> Result<Vec<String>> {
        let mut graph = TaskGraph::new();
        self.register(&mut graph, compiler, runner, date)?;
        graph.run(name)
    }

    /// Release with the given tools and repository.
    ///
    /// On failure the returned error names the stage; the state and the
    /// partial record have already been reported through `ui`.
    pub fn release_with(
        &self,
        kind: BumpKind,
        compiler: &mut dyn Compiler,
        runner: &mut dyn AssertionRunner,
        vcs: &mut dyn VersionControl,
        date: NaiveDate,
    ) -> Result<ReleaseRecord> {
        let package = self.package()?;
        let settings = ReleaseSettings::from_config(&self.config, &self.root, &package.name, kind);

        let mut graph = TaskGraph::new();
        self.register(&mut graph, compiler, runner, date)?;

        let mut sequencer = ReleaseSequencer::new(settings, vcs);
        match sequencer.run(&mut graph) {
            Ok(record) => {
                ui::display_warnings(&record.warnings);
                Ok(record)
            }
            Err(e) => {
                if let ReleaseState::Failed(stage) = sequencer.state() {
                    tracing::error!(stage = stage.description(), "release failed");
                }
                ui::display_warnings(&sequencer.record().warnings);
                Err(e)
            }
        }
    }

    fn tools(&self) -> (ProcessCompiler, ProcessAssertionRunner) {
        (
            ProcessCompiler::new(&self.config.sass.program, &self.root),
            ProcessAssertionRunner::new(
                &self.config.assertions.program,
                self.config.assertions.args.clone(),
                &self.root,
            ),
        )
    }

    /// Run `test` once, then again on every batch of matching changes.
    pub fn dev(&self) -> Result<()> {
        let (mut compiler, mut runner) = self.tools();
        let date = today();

        match self.run_task_with("test", &mut compiler, &mut runner, date) {
            Ok(_) => ui::display_success("Tests passed"),
            Err(e) => ui::display_error(&e.to_string()),
        }

        let globs: Vec<String> = self
            .config
            .watch
            .files
            .iter()
            .map(|g| self.config.expand(g))
            .collect();
        let set = WatchSet::new(&self.root, &globs)?;
        let debounce = Duration::from_millis(self.config.watch.debounce_ms);

        watch(&set, debounce, |changed| {
            for path in changed {
                tracing::debug!(file = %path.display(), "changed");
            }
            self.run_task_with("test", &mut compiler, &mut runner, today())?;
            ui::display_success("Tests passed");
            Ok(())
        })
    }

    fn run_and_report(
        &self,
        name: &str,
        compiler: &mut dyn Compiler,
        runner: &mut dyn AssertionRunner,
    ) -> Result<()> {
        let steps = self.run_task_with(name, compiler, runner, today())?;
        ui::display_success(&format!("{} finished ({})", name, steps.join(", ")));
        Ok(())
    }

    /// Execute one command with the real tools and repository.
    pub fn execute(&self, command: &PipelineCommand) -> Result<()> {
        if let PipelineCommand::List = command {
            let (mut compiler, mut runner) = self.tools();
            let mut graph = TaskGraph::new();
            self.register(&mut graph, &mut compiler, &mut runner, today())?;
            ui::display_tasks(&graph.tasks());
            return Ok(());
        }

        let _lock = RunLock::acquire(&self.root)?;
        let (mut compiler, mut runner) = self.tools();

        match command {
            PipelineCommand::Test => self.run_and_report("test", &mut compiler, &mut runner),
            PipelineCommand::Build => self.run_and_report("build", &mut compiler, &mut runner),
            PipelineCommand::Release { bump, dry_run } => {
                let kind = bump.unwrap_or(self.config.release.default_bump);
                if *dry_run {
                    let package = self.package()?;
                    let settings =
                        ReleaseSettings::from_config(&self.config, &self.root, &package.name, kind);
                    let mut vcs = Git2Repository::open(&self.root)?;
                    let plan = ReleaseSequencer::new(settings, &mut vcs).plan()?;
                    ui::display_release_plan(&plan);
                    return Ok(());
                }
                let mut vcs = Git2Repository::open(&self.root)?;
                let record =
                    self.release_with(kind, &mut compiler, &mut runner, &mut vcs, today())?;
                ui::display_release(&record);
                Ok(())
            }
            PipelineCommand::Dev => self.dev(),
            PipelineCommand::List => Ok(()),
        }
    }
}

/// Local date used in banners.
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
