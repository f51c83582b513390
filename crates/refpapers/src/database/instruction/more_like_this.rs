//! Papers resembling an indexed paper.
//!
//! The most distinctive terms of one field of the reference paper are picked by
//! tf-idf, using the FTS5 column vocabulary for document frequencies, and other papers are searched for
//! any of them in the same field. The reference itself is never returned.

use rusqlite::{types::Value, OptionalExtension};

use super::*;

/// Number of distinctive terms used when not set explicitly.
pub const DEFAULT_TOP_TERMS: usize = 5;

/// Finds papers sharing the most distinctive terms of a reference paper.
///
/// # Examples
///
/// ```no_run
/// use refpapers::{
///   database::{Database, Field, MoreLikeThis},
///   prelude::*,
/// };
///
/// # async fn example() -> Result<(), RefpapersError> {
/// let mut db = Database::open("refpapers.db").await?;
/// let similar = MoreLikeThis::new("/papers/nlp/Bojar_etAl_-_Findings_2017.pdf", Field::Title)
///   .limit(10)
///   .execute(&mut db)
///   .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoreLikeThis {
  /// Path of the reference paper
  path:      PathBuf,
  /// Field whose terms are compared
  field:     Field,
  /// Maximum number of results, unlimited if unset
  limit:     Option<usize>,
  /// Number of terms taken from the reference
  top_terms: usize,
}

impl MoreLikeThis {
  /// Compares `field` of the paper at `path` with the other papers.
  pub fn new(path: impl Into<PathBuf>, field: Field) -> Self {
    Self { path: path.into(), field, limit: None, top_terms: DEFAULT_TOP_TERMS }
  }

  /// Limits the number of results.
  pub fn limit(mut self, limit: usize) -> Self {
    self.limit = Some(limit);
    self
  }

  /// Sets how many distinctive terms of the reference are searched for.
  pub fn top_terms(mut self, top_terms: usize) -> Self {
    self.top_terms = top_terms;
    self
  }
}

/// Scratch tables tokenizing one text with the tokenizer of `papers_fts`.
const REFERENCE_TERMS: &str = "
  CREATE VIRTUAL TABLE IF NOT EXISTS temp.reference_terms USING fts5(text, tokenize = 'porter unicode61');
  CREATE VIRTUAL TABLE IF NOT EXISTS temp.reference_terms_row USING fts5vocab(temp, reference_terms, 'row');
  DELETE FROM temp.reference_terms;";

/// The `count` terms of `column` in document `rowid` with the highest tf-idf.
///
/// Only the stored text of that one column is tokenized for term frequencies.
/// Document frequencies are looked up per term in the column vocabulary.
pub(crate) fn distinctive_terms(
  conn: &rusqlite::Connection,
  rowid: i64,
  column: &str,
  count: usize,
) -> rusqlite::Result<Vec<String>> {
  let Some(text) = conn
    .query_row(&format!("SELECT {column} FROM papers_fts WHERE rowid = ?1"), params![rowid], |row| {
      row.get::<_, Option<String>>(0)
    })
    .optional()?
    .flatten()
  else {
    return Ok(Vec::new());
  };
  conn.execute_batch(REFERENCE_TERMS)?;
  conn.execute("INSERT INTO temp.reference_terms (text) VALUES (?1)", params![text])?;
  let frequencies = conn
    .prepare_cached("SELECT term, cnt FROM temp.reference_terms_row")?
    .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let documents: i64 = conn.query_row("SELECT COUNT(*) FROM papers", [], |row| row.get(0))?;
  let mut document_frequency = conn.prepare_cached("SELECT doc FROM papers_fts_col WHERE term = ?1 AND col = ?2")?;
  let mut scored = Vec::with_capacity(frequencies.len());
  for (term, tf) in frequencies {
    let df: i64 =
      document_frequency.query_row(params![term, column], |row| row.get(0)).optional()?.unwrap_or(1);
    let idf = 1.0 + (documents as f64 / df.max(1) as f64).ln();
    scored.push((term, tf as f64 * idf));
  }
  scored.sort_by(|(a_term, a), (b_term, b)| b.total_cmp(a).then_with(|| a_term.cmp(b_term)));
  Ok(scored.into_iter().take(count).map(|(term, _)| term).collect())
}

#[async_trait]
impl DatabaseInstruction for MoreLikeThis {
  type Output = Vec<Paper>;

  async fn execute(&self, db: &mut Database) -> Result<Self::Output> {
    let path = self.path.to_string_lossy().into_owned();
    let field = self.field;
    let top_terms = self.top_terms;
    let limit = self.limit.map_or(-1, |limit| limit as i64);
    let papers = db
      .conn
      .call(move |conn| {
        let Some(rowid) = conn
          .query_row("SELECT id FROM papers WHERE path = ?1", params![path], |row| row.get::<_, i64>(0))
          .optional()?
        else {
          return Ok(Vec::new());
        };
        let terms = distinctive_terms(conn, rowid, field.column(), top_terms)?;
        if terms.is_empty() {
          return Ok(Vec::new());
        }
        let alternatives: Vec<String> = terms.iter().map(|term| quote(term)).collect();
        let expression = format!("{} : ({})", field.column(), alternatives.join(" OR "));
        let sql = format!(
          "SELECT {PAPER_COLUMNS} FROM papers_fts JOIN papers p ON p.id = papers_fts.rowid
           WHERE papers_fts MATCH ?1 AND papers_fts.rowid != ?2 {} LIMIT ?3",
          rank_order()
        );
        Ok(select(conn, &sql, &[Value::Text(expression), Value::Integer(rowid), Value::Integer(limit)])?)
      })
      .await?;
    trace!("{} papers resemble {} in {}", papers.len(), self.path.display(), self.field);
    Ok(papers)
  }
}
