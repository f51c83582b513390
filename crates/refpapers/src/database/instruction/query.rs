//! Reading papers from the index.
//!
//! Text queries use the FTS5 query syntax: words are combined with AND,
//! `OR`/`NOT`, `"phrases"`, `prefix*` and `column:word` work as documented by
//! SQLite. Queries that are not valid FTS5 syntax, such as hyphenated names,
//! are retried with every word quoted.
//!
//! Matches are ranked with per-field weights (bibtex 100, authors 60, title
//! and comment 30, body 1), ties going to the newer paper.
//!
//! # Examples
//!
//! ```no_run
//! use refpapers::{
//!   database::{Database, Field, Query},
//!   prelude::*,
//! };
//!
//! # async fn example() -> Result<(), RefpapersError> {
//! let mut db = Database::open("refpapers.db").await?;
//!
//! // Search all fields
//! let papers = Query::text("neural machine translation").limit(10).execute(&mut db).await?;
//!
//! // Best match among bibtex, authors and title, or an error
//! let paper = Query::fields("bojar findings", &[Field::Bibtex, Field::Authors, Field::Title])
//!   .first(&mut db)
//!   .await?;
//! # Ok(())
//! # }
//! ```

use rusqlite::{params_from_iter, types::Value};

use super::*;

/// What a [`Query`] selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryCriteria {
  /// Full text search over every field
  Text(String),
  /// Full text search restricted to some fields
  Fields {
    /// The FTS5 query
    query:  String,
    /// Fields searched
    fields: Vec<Field>,
  },
  /// The paper stored at exactly this path
  Path(PathBuf),
  /// Every paper, ordered by bibtex key
  All,
}

/// A query for papers in the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
  /// Selection
  criteria: QueryCriteria,
  /// Maximum number of results, unlimited if unset
  limit:    Option<usize>,
}

impl Query {
  /// Creates a query with the given criteria.
  pub fn new(criteria: QueryCriteria) -> Self { Self { criteria, limit: None } }

  /// Searches every field.
  pub fn text(query: impl Into<String>) -> Self { Self::new(QueryCriteria::Text(query.into())) }

  /// Searches only the given fields.
  pub fn fields(query: impl Into<String>, fields: &[Field]) -> Self {
    Self::new(QueryCriteria::Fields { query: query.into(), fields: fields.to_vec() })
  }

  /// Looks up the paper stored at a path.
  pub fn by_path(path: impl Into<PathBuf>) -> Self { Self::new(QueryCriteria::Path(path.into())) }

  /// Lists every paper.
  pub fn all() -> Self { Self::new(QueryCriteria::All) }

  /// Limits the number of results.
  pub fn limit(mut self, limit: usize) -> Self {
    self.limit = Some(limit);
    self
  }

  /// The best match.
  ///
  /// # Errors
  ///
  /// Returns [`RefpapersError::NoMatch`] if nothing matches.
  pub async fn first(&self, db: &mut Database) -> Result<Paper> {
    let query = Self { criteria: self.criteria.clone(), limit: Some(1) };
    query.execute(db).await?.into_iter().next().ok_or_else(|| RefpapersError::NoMatch(self.describe()))
  }

  /// The query as entered, for messages.
  fn describe(&self) -> String {
    match &self.criteria {
      QueryCriteria::Text(query) | QueryCriteria::Fields { query, .. } => query.clone(),
      QueryCriteria::Path(path) => path.display().to_string(),
      QueryCriteria::All => "*".into(),
    }
  }

  /// SQL, arguments and the argument list to retry with on a syntax error.
  fn build_sql(&self) -> (String, Vec<Value>, Option<Vec<Value>>) {
    let limit = Value::Integer(self.limit.map_or(-1, |limit| limit as i64));
    let match_sql = format!(
      "SELECT {PAPER_COLUMNS} FROM papers_fts JOIN papers p ON p.id = papers_fts.rowid
       WHERE papers_fts MATCH ?1 {} LIMIT ?2",
      rank_order()
    );
    match &self.criteria {
      QueryCriteria::Text(query) => (
        match_sql,
        vec![Value::Text(query.clone()), limit.clone()],
        Some(vec![Value::Text(quote_terms(query)), limit]),
      ),
      QueryCriteria::Fields { query, fields } => (
        match_sql,
        vec![Value::Text(restrict(query, fields)), limit.clone()],
        Some(vec![Value::Text(restrict(&quote_terms(query), fields)), limit]),
      ),
      QueryCriteria::Path(path) => (
        format!("SELECT {PAPER_COLUMNS} FROM papers p WHERE p.path = ?1 LIMIT ?2"),
        vec![Value::Text(path.to_string_lossy().into_owned()), limit],
        None,
      ),
      QueryCriteria::All => {
        (format!("SELECT {PAPER_COLUMNS} FROM papers p ORDER BY p.bibtex, p.path LIMIT ?1"), vec![limit], None)
      },
    }
  }
}

/// Runs a select over [`PAPER_COLUMNS`].
pub(super) fn select(conn: &rusqlite::Connection, sql: &str, args: &[Value]) -> rusqlite::Result<Vec<Paper>> {
  let mut stmt = conn.prepare_cached(sql)?;
  let papers = stmt.query_map(params_from_iter(args.iter()), paper_from_row)?;
  papers.collect()
}

#[async_trait]
impl DatabaseInstruction for Query {
  type Output = Vec<Paper>;

  async fn execute(&self, db: &mut Database) -> Result<Self::Output> {
    if let QueryCriteria::Text(query) | QueryCriteria::Fields { query, .. } = &self.criteria {
      if query.trim().is_empty() {
        return Ok(Vec::new());
      }
    }
    let (sql, args, fallback) = self.build_sql();
    let papers = db
      .conn
      .call(move |conn| match (select(conn, &sql, &args), fallback) {
        (Err(e), Some(fallback)) if is_query_syntax_error(&e) => {
          debug!("Query not understood ({e}), searching for the literal words instead");
          Ok(select(conn, &sql, &fallback)?)
        },
        (result, _) => Ok(result?),
      })
      .await?;
    trace!("Query {:?} returned {} papers", self.criteria, papers.len());
    Ok(papers)
  }
}
