//! Error types for the refpapers library.
//!
//! File names that do not follow the grammar are *not* errors in this sense:
//! [`filename::parse`](crate::filename::parse) reports them as
//! [`ParseError`](crate::filename::ParseError) values so that a whole tree can be
//! checked in one pass. The variants here abort the current operation.
//!
//! # Examples
//!
//! ```no_run
//! use refpapers::{database::Database, error::RefpapersError};
//!
//! # async fn example() -> Result<(), RefpapersError> {
//! match Database::open("/nonexistent/dir/index.db").await {
//!   Err(RefpapersError::AsyncSqlite(e)) => println!("could not open index: {e}"),
//!   Err(e) => println!("other error: {e}"),
//!   Ok(_) => println!("opened"),
//! }
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Error type alias used for the [`refpapers`](crate) crate.
pub type Result<T> = core::result::Result<T, RefpapersError>;

/// Errors that can occur while indexing, searching or configuring refpapers.
#[derive(Error, Debug)]
pub enum RefpapersError {
  /// A string could not be parsed as a [`BibtexKey`](crate::paper::BibtexKey).
  #[error("Unable to parse BibtexKey {0}")]
  InvalidBibtexKey(String),

  /// An indexing action code other than `A`, `M`, `D` or `??`.
  #[error("Unknown indexing action \"{0}\"")]
  InvalidAction(String),

  /// A git command exited unsuccessfully.
  ///
  /// VCS failures are fatal to the current indexing run: there is no sensible
  /// partial result from a broken diff.
  #[error("git {command} failed: {stderr}")]
  Git {
    /// The git subcommand that was run
    command: String,
    /// Captured standard error of the command
    stderr:  String,
  },

  /// A search matched no documents where at least one was required.
  #[error("No papers matched the query \"{0}\"")]
  NoMatch(String),

  /// No viewer program is configured for a file ending.
  #[error("To use this command, a viewer must be set for ending: {0}")]
  MissingViewer(String),

  /// The configuration is invalid or missing.
  #[error("{0}")]
  Config(String),

  /// A line of a JSON lines cache file could not be read.
  #[error("Can not parse line {line} of {path}: {reason}")]
  Cache {
    /// The cache file
    path:   PathBuf,
    /// Zero-based line number
    line:   usize,
    /// Description of the problem
    reason: String,
  },

  /// A SQLite operation failed.
  #[error(transparent)]
  Sqlite(#[from] rusqlite::Error),

  /// An async SQLite operation failed.
  #[error(transparent)]
  AsyncSqlite(#[from] tokio_rusqlite::Error),

  /// A file system operation failed.
  #[error(transparent)]
  Path(#[from] std::io::Error),

  /// A walk over the data directory failed.
  #[error(transparent)]
  Walk(#[from] walkdir::Error),

  /// A network request failed.
  #[error(transparent)]
  Network(#[from] reqwest::Error),

  /// PDF parsing errors from the built-in extractor.
  #[error(transparent)]
  Lopdf(#[from] lopdf::Error),

  /// The configuration file is not valid TOML for [`Config`](crate::configuration::Config).
  #[error(transparent)]
  TomlDe(#[from] toml::de::Error),

  /// JSON (de)serialization of persisted state failed.
  #[error(transparent)]
  Json(#[from] serde_json::Error),

  /// An arXiv response could not be deserialized.
  #[error(transparent)]
  Xml(#[from] quick_xml::DeError),
}
