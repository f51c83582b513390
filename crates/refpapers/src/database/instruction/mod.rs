//! Operations on the index.
//!
//! Every operation is a value implementing [`DatabaseInstruction`]; building
//! it is separate from running it against a [`Database`].

use super::*;

pub mod commit;
pub mod more_like_this;
pub mod query;

use rusqlite::params;

pub use self::{commit::*, more_like_this::*, query::*};

/// An operation that can be executed against the index.
#[async_trait]
pub trait DatabaseInstruction {
  /// What the operation produces
  type Output;

  /// Runs the operation.
  async fn execute(&self, db: &mut Database) -> Result<Self::Output>;
}

/// Whether a failed MATCH was caused by the query syntax rather than the index.
fn is_query_syntax_error(error: &rusqlite::Error) -> bool {
  match error {
    rusqlite::Error::SqliteFailure(_, Some(message)) =>
      message.starts_with("fts5:") || message.contains("no such column"),
    _ => false,
  }
}

/// Quotes every whitespace separated word of a query as an FTS5 string.
///
/// The result matches documents containing all words, with every character of
/// the input taken literally.
pub fn quote_terms(query: &str) -> String {
  query.split_whitespace().map(quote).collect::<Vec<_>>().join(" ")
}

/// Quotes a single term as an FTS5 string.
fn quote(term: &str) -> String { format!("\"{}\"", term.replace('"', "\"\"")) }

/// Restricts an FTS5 expression to some columns.
pub(crate) fn restrict(expression: &str, fields: &[Field]) -> String {
  if fields.is_empty() || fields.len() == Field::ALL.len() {
    return expression.to_string();
  }
  let columns: Vec<&str> = fields.iter().map(Field::column).collect();
  format!("{{{}}} : ({expression})", columns.join(" "))
}

/// `ORDER BY` clause ranking FTS matches with the field weights, newest first
/// among equal scores.
fn rank_order() -> String {
  let weights: Vec<String> = Field::ALL.iter().map(|field| format!("{:.1}", field.weight())).collect();
  format!("ORDER BY bm25(papers_fts, {}), p.year DESC", weights.join(", "))
}
