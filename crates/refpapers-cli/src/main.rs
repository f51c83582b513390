//! Command line interface for the refpapers bibliography manager.
//!
//! Papers live in a directory tree under canonical file names. This binary
//! keeps a full-text index of that tree and answers questions about it:
//!
//! ```bash
//! # Bring the index up to date, incrementally if git is enabled
//! refpapers index
//!
//! # Search, grouped by category
//! refpapers search neural machine translation
//!
//! # Show or open the best match
//! refpapers one bojar2017findings
//! refpapers open attention is all you need
//!
//! # Find file names that do not parse, and likely duplicates
//! refpapers check
//! refpapers duplicates
//!
//! # Suggest a canonical name for a downloaded file
//! refpapers rename ~/Downloads/1706.03762.pdf --category nlp/transformers
//! ```
//!
//! The configuration is read from `conf.toml` in the conf directory,
//! `~/.refpapers` unless `--confdir` is given. Logging goes to standard error,
//! with `-v` flags raising the level, and additionally to `paths.log` if it is
//! configured.

#![warn(missing_docs, clippy::missing_docs_in_private_items)]

use std::{
  path::{Path, PathBuf},
  process::ExitCode,
};

use clap::{builder::ArgAction, Args, Parser, Subcommand, ValueEnum};
use console::style;
use refpapers::{
  configuration::{Config, CONF_FILE},
  database::Database,
  error::RefpapersError,
  paper::Paper,
  prelude::*,
  state::Decisions,
};
use tracing::{debug, trace};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter, Layer, Registry};

pub mod commands;
pub mod error;
pub mod interaction;

use crate::{commands::*, error::*, interaction::*};

/// Command line interface configuration and argument parsing
#[derive(Parser)]
#[command(author, version, about = "Bibliography management built on canonical file names")]
pub struct Cli {
  /// Verbose mode (-v, -vv, -vvv) for different levels of logging detail
  #[arg(
        short,
        long,
        action = ArgAction::Count,
        global = true,
        help = "Increase logging verbosity"
    )]
  verbose: u8,

  /// Path to directory containing conf.toml and stored state. Default: ~/.refpapers
  #[arg(long, global = true)]
  confdir: Option<PathBuf>,

  /// Skip all prompts and accept defaults (mostly for testing)
  #[arg(long, hide = true, global = true)]
  accept_defaults: bool,

  /// The subcommand to execute
  #[command(subcommand)]
  command: Commands,
}

/// What every command works with.
pub struct Context {
  /// The loaded configuration
  pub config:  Config,
  /// Directory holding the configuration and stored state
  pub confdir: PathBuf,
}

impl Context {
  /// Opens the search index.
  pub async fn open_db(&self) -> Result<Database> { Ok(Database::open(self.config.paths.index_path()).await?) }

  /// Loads the recorded decisions.
  pub fn decisions(&self) -> Result<Decisions> { Ok(Decisions::open(&self.confdir)?) }
}

/// Handle for adding the log file once the configuration is known.
type LogFileHandle = reload::Handle<Option<Box<dyn Layer<Registry> + Send + Sync>>, Registry>;

/// Configures the logging system based on the verbosity level
///
/// The verbosity levels are:
/// - 0: warn (default)
/// - 1: info
/// - 2: debug
/// - 3+: trace
///
/// `RUST_LOG` overrides the level. Events go to standard error from the start;
/// a log file is added later through the returned handle.
fn setup_logging(verbosity: u8) -> LogFileHandle {
  let filter = match verbosity {
    0 => "warn",
    1 => "info",
    2 => "debug",
    _ => "trace",
  };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
  let (file_layer, handle) = reload::Layer::new(None);

  tracing_subscriber::registry()
    .with(file_layer)
    .with(filter)
    .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
    .init();
  handle
}

/// Appends all further events to `log_file` as well.
///
/// The returned guard must be held until exit.
fn add_log_file(handle: &LogFileHandle, log_file: &Path) -> Result<WorkerGuard> {
  if let Some(parent) = log_file.parent() {
    std::fs::create_dir_all(parent)?;
  }
  let file = std::fs::OpenOptions::new().create(true).append(true).open(log_file)?;
  let (writer, guard) = tracing_appender::non_blocking(file);
  handle.reload(Some(fmt::layer().with_writer(writer).with_ansi(false).boxed()))?;
  debug!("Logging to {}", log_file.display());
  Ok(guard)
}

/// Loads `conf.toml`, offering to write a minimal one if it is missing.
fn load_config<I: UserInteraction>(interaction: &I, confdir: &Path) -> Result<Config> {
  if !confdir.join(CONF_FILE).exists() {
    interaction.reply(ResponseContent::Warning(&format!(
      "No configuration found at {}",
      confdir.join(CONF_FILE).display()
    )))?;
    if !interaction.confirm("Write a minimal configuration now?", false)? {
      return Err(RefpapersCliError::Usage(format!(
        "Create {} with at least paths.data and paths.index",
        confdir.join(CONF_FILE).display()
      )));
    }
    let data = interaction.prompt("Directory containing your papers", None)?;
    let index = confdir.join("index");
    let index = interaction.prompt("Directory for the search index", Some(&index.display().to_string()))?;
    Config::write_minimal(confdir, Path::new(data.trim()), Path::new(index.trim()))?;
    interaction.reply(ResponseContent::Success(&format!(
      "Wrote {}",
      confdir.join(CONF_FILE).display()
    )))?;
  }
  Ok(Config::from_confdir(confdir)?)
}

/// Runs the parsed command line.
async fn run<I: UserInteraction>(interaction: &I, cli: Cli, log_file: &LogFileHandle) -> Result<()> {
  let confdir = cli.confdir.clone().unwrap_or_else(Config::default_confdir);
  debug!("Using conf dir {}", confdir.display());
  let config = load_config(interaction, &confdir)?;
  let _guard = config.paths.log.as_deref().map(|path| add_log_file(log_file, path)).transpose()?;
  let context = Context { config, confdir };

  match cli.command {
    Commands::Index(args) => index(interaction, &context, args).await,
    Commands::Search(args) => search(interaction, &context, args).await,
    Commands::One(args) => one(interaction, &context, args).await,
    Commands::Open(args) => open(interaction, &context, args).await,
    Commands::Check => check(interaction, &context).await,
    Commands::Duplicates(args) => duplicates(interaction, &context, args).await,
    Commands::Rename(args) => rename(interaction, &context, args).await,
  }
}

/// Entry point for the refpapers CLI application
///
/// Errors are printed to standard error and turn into a failing exit code.
#[tokio::main]
async fn main() -> ExitCode {
  let cli = Cli::parse();
  let log_file = setup_logging(cli.verbose);
  let interaction = Terminal::new(cli.accept_defaults);
  match run(&interaction, cli, &log_file).await {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      trace!("Command failed: {e:?}");
      eprintln!("{} {e}", style(ERROR_PREFIX).red());
      ExitCode::FAILURE
    },
  }
}
