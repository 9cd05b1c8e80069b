use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use bem_pipeline::cli::{Pipeline, PipelineCommand};
use bem_pipeline::domain::BumpKind;
use bem_pipeline::ui;

#[derive(Parser)]
#[command(
    name = "bem-pipeline",
    version,
    about = "Test, build and release a BEM stylesheet library"
)]
struct Args {
    #[arg(short, long, global = true, help = "Custom configuration file path")]
    config: Option<PathBuf>,

    #[arg(
        short = 'C',
        long,
        global = true,
        default_value = ".",
        help = "Project root"
    )]
    dir: PathBuf,

    #[arg(short, long, global = true, help = "Log every step and file operation")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile the test stylesheet and run its assertions
    Test,
    /// Run the tests, then concatenate the partials into the distributable file
    Build,
    /// Build, bump the version, commit, tag and push
    Release {
        #[arg(long = "version-bump", alias = "versionBump", value_enum)]
        version_bump: Option<BumpKind>,

        #[arg(long, help = "Preview the release without changing anything")]
        dry_run: bool,
    },
    /// Run the tests, then re-run them whenever a watched file changes
    Dev,
    /// Show the available tasks and their steps
    List,
}

impl From<Command> for PipelineCommand {
    fn from(command: Command) -> Self {
        match command {
            Command::Test => PipelineCommand::Test,
            Command::Build => PipelineCommand::Build,
            Command::Release {
                version_bump,
                dry_run,
            } => PipelineCommand::Release {
                bump: version_bump,
                dry_run,
            },
            Command::Dev => PipelineCommand::Dev,
            Command::List => PipelineCommand::List,
        }
    }
}

fn main() {
    if let Err(e) = run() {
        ui::display_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("bem_pipeline=debug")
    } else {
        EnvFilter::new("bem_pipeline=info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let pipeline = Pipeline::load(&args.dir, args.config.as_deref())?;
    pipeline.execute(&args.command.into())?;
    Ok(())
}
