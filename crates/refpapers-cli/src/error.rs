//! Errors of the command line interface.

use refpapers::error::RefpapersError;
use thiserror::Error;

/// Result alias for the [`refpapers`](crate) binary.
pub type Result<T> = core::result::Result<T, RefpapersCliError>;

/// Everything a command can fail with.
#[derive(Error, Debug)]
pub enum RefpapersCliError {
  /// Errors from the library
  #[error(transparent)]
  Refpapers(#[from] RefpapersError),

  /// Terminal or file system errors
  #[error(transparent)]
  Io(#[from] std::io::Error),

  /// A prompt could not be shown
  #[error(transparent)]
  Dialog(#[from] dialoguer::Error),

  /// The log file could not be attached
  #[error(transparent)]
  Logging(#[from] tracing_subscriber::reload::Error),

  /// The command can not proceed with the given input
  #[error("{0}")]
  Usage(String),
}
