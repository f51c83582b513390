//! The subcommands of the CLI.

use super::*;

pub mod check;
pub mod duplicates;
pub mod index;
pub mod open;
pub mod rename;
pub mod search;

pub use check::check;
pub use duplicates::{duplicates, DuplicatesArgs};
pub use index::{index, IndexArgs};
pub use open::{one, open};
pub use rename::{rename, RenameArgs};
pub use search::{search, SearchArgs};

/// Available commands for the CLI
#[derive(Subcommand, Clone)]
pub enum Commands {
  /// Refresh the search index
  Index(IndexArgs),

  /// Search for papers
  Search(SearchArgs),

  /// Show details of one paper
  One(QueryArgs),

  /// Open one paper in viewer
  Open(QueryArgs),

  /// Check for data issues
  Check,

  /// Find and resolve likely duplicate papers
  Duplicates(DuplicatesArgs),

  /// Suggest a canonical name and category for a file
  Rename(RenameArgs),
}

/// A free text query given as the remaining arguments.
#[derive(Args, Clone)]
pub struct QueryArgs {
  /// Search terms, matched against bibtex key, authors and title
  #[arg(required = true)]
  pub query: Vec<String>,
}

impl QueryArgs {
  /// The terms joined into one query.
  pub fn joined(&self) -> String { self.query.join(" ") }
}
