//! The full-text search index.
//!
//! Papers are stored in a SQLite database with an FTS5 table over the
//! searchable fields. The stored fields of a paper are enough to rebuild the
//! [`Paper`] exactly; the full text (`body`) is searchable but never returned.
//!
//! All access goes through [`DatabaseInstruction`]s:
//!
//! - [`Commit`]: one transaction of additions, deletions and optionally a reset
//! - [`Query`]: text, field and path lookups
//! - [`MoreLikeThis`]: papers sharing the most distinctive terms of a reference
//!
//! # Examples
//!
//! ```no_run
//! use refpapers::{
//!   database::{Commit, Database, Document, Field, Query},
//!   prelude::*,
//! };
//!
//! # async fn example(paper: refpapers::paper::Paper) -> Result<(), RefpapersError> {
//! let mut db = Database::open("index/refpapers.db").await?;
//!
//! let mut commit = Commit::new();
//! commit.add(Document::new(paper, "full text of the paper"));
//! commit.execute(&mut db).await?;
//!
//! let papers =
//!   Query::fields("bojar", &[Field::Bibtex, Field::Authors, Field::Title]).limit(1).execute(&mut db).await?;
//! # Ok(())
//! # }
//! ```

use rusqlite::Row;
use tokio_rusqlite::Connection;

use super::*;

pub mod instruction;
#[cfg(test)] mod tests;

pub use self::instruction::*;

/// Version of the index layout. A stored version that differs forces a full
/// reindex.
pub const SCHEMA_VERSION: &str = "1";

/// Stored columns of a paper, in the order [`paper_from_row`] reads them.
const PAPER_COLUMNS: &str =
  "p.path, p.bibtex, p.title, p.authors, p.year, p.pub_type, p.tags, p.number, p.doi, p.arxiv";

/// Searchable fields of the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
  /// The bibtex key, also split into letter and digit runs
  Bibtex,
  /// The title
  Title,
  /// Free form comment
  Comment,
  /// Comma separated authors
  Authors,
  /// Extracted full text
  Body,
}

impl Field {
  /// Every searchable field, in column order.
  pub const ALL: [Field; 5] = [Field::Bibtex, Field::Title, Field::Comment, Field::Authors, Field::Body];

  /// Column name in the FTS table.
  pub fn column(&self) -> &'static str {
    match self {
      Field::Bibtex => "bibtex",
      Field::Title => "title",
      Field::Comment => "comment",
      Field::Authors => "authors",
      Field::Body => "body",
    }
  }

  /// Relative importance of a match in this field.
  pub fn weight(&self) -> f64 {
    match self {
      Field::Bibtex => 100.0,
      Field::Title => 30.0,
      Field::Comment => 30.0,
      Field::Authors => 60.0,
      Field::Body => 1.0,
    }
  }
}

impl Display for Field {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{}", self.column()) }
}

/// A paper together with its unstored searchable text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
  /// The paper, keyed by its path
  pub paper:   Paper,
  /// Extracted full text
  pub body:    String,
  /// Free form comment
  pub comment: String,
}

impl Document {
  /// Creates a document without a comment.
  pub fn new(paper: Paper, body: impl Into<String>) -> Self {
    Self { paper, body: body.into(), comment: String::new() }
  }
}

/// Handle to the search index.
pub struct Database {
  /// Async SQLite connection handle
  conn: Connection,
}

impl Database {
  /// Opens the index, creating the file, its directory and the schema if
  /// needed.
  ///
  /// # Examples
  ///
  /// ```no_run
  /// # use refpapers::database::Database;
  /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
  /// let db = Database::open("/home/me/.refpapers/index/refpapers.db").await?;
  /// # Ok(())
  /// # }
  /// ```
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
      tokio::fs::create_dir_all(parent).await?;
    }
    let conn = Connection::open(path).await?;
    conn
      .call(|conn| {
        conn.execute_batch(include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/migrations/init.sql")))?;
        Ok(())
      })
      .await?;
    debug!("Opened index {}", path.display());
    Ok(Self { conn })
  }

  /// Number of indexed papers.
  pub async fn len(&self) -> Result<usize> {
    let count = self
      .conn
      .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM papers", [], |row| row.get::<_, i64>(0))?))
      .await?;
    Ok(count as usize)
  }

  /// Whether the index holds no papers.
  pub async fn is_empty(&self) -> Result<bool> { Ok(self.len().await? == 0) }
}

/// Text put in the bibtex column: the key followed by its letter and digit runs.
///
/// ```text
/// bojar2017findings -> "bojar2017findings bojar 2017 findings"
/// ```
fn bibtex_terms(key: &BibtexKey) -> String {
  lazy_static! {
    static ref RE_RUNS: Regex = Regex::new(r"[[:alpha:]]+|[0-9]+").unwrap();
  }
  let key = key.to_string();
  let runs: Vec<&str> = RE_RUNS.find_iter(&key).map(|run| run.as_str()).collect();
  format!("{key} {}", runs.join(" "))
}

/// Wraps a conversion failure of column `index` for rusqlite.
fn conversion_error(index: usize, error: RefpapersError) -> rusqlite::Error {
  rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Text, Box::new(error))
}

/// Splits a stored list, treating the empty string as the empty list.
fn split_stored(value: &str, separator: &str) -> Vec<String> {
  if value.is_empty() {
    Vec::new()
  } else {
    value.split(separator).map(String::from).collect()
  }
}

/// Rebuilds a paper from a row selected with [`PAPER_COLUMNS`].
fn paper_from_row(row: &Row<'_>) -> rusqlite::Result<Paper> {
  let bibtex: String = row.get(1)?;
  let pub_type: String = row.get(5)?;
  let tags: String = row.get(6)?;
  Ok(Paper {
    path:     PathBuf::from(row.get::<_, String>(0)?),
    bibtex:   BibtexKey::parse(&bibtex).map_err(|e| conversion_error(1, e))?,
    title:    row.get(2)?,
    authors:  split_stored(&row.get::<_, String>(3)?, ", "),
    year:     row.get(4)?,
    pub_type: pub_type
      .split_whitespace()
      .map(PubType::from_str)
      .collect::<Result<_>>()
      .map_err(|e| conversion_error(5, e))?,
    tags:     split_stored(&tags, " "),
    number:   row.get(7)?,
    doi:      row.get(8)?,
    arxiv:    row.get(9)?,
  })
}
