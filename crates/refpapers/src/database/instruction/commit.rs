//! Writing to the index.
//!
//! A [`Commit`] collects every change of an indexing run and applies them in
//! a single transaction, so an interrupted run leaves the index as it was.

use super::*;

/// Counts of applied changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitStats {
  /// Documents written
  pub added:   usize,
  /// Documents removed by path
  pub deleted: usize,
}

/// One transaction of changes to the index.
///
/// Changes are applied in the order: reset, deletions, additions. Adding a
/// document whose path is already indexed replaces it.
#[derive(Debug, Clone, Default)]
pub struct Commit {
  /// Remove every document before applying the other changes
  reset:     bool,
  /// Paths to remove
  deletions: Vec<PathBuf>,
  /// Documents to write
  documents: Vec<Document>,
}

impl Commit {
  /// Creates an empty commit.
  pub fn new() -> Self { Self::default() }

  /// Clears the whole index as part of this commit.
  pub fn reset(mut self) -> Self {
    self.reset = true;
    self
  }

  /// Adds or replaces a document.
  pub fn add(&mut self, document: Document) { self.documents.push(document); }

  /// Removes the document at `path`, if any.
  pub fn delete(&mut self, path: impl Into<PathBuf>) { self.deletions.push(path.into()); }

  /// Whether applying this commit would change nothing.
  pub fn is_empty(&self) -> bool { !self.reset && self.deletions.is_empty() && self.documents.is_empty() }
}

/// Stored and searchable values of one document, ready to be bound.
struct StoredRow {
  /// Path, the unique key
  path:         String,
  /// Key string
  bibtex:       String,
  /// Key with its letter and digit runs
  bibtex_terms: String,
  /// Title
  title:        String,
  /// Comment
  comment:      String,
  /// Comma separated authors
  authors:      String,
  /// Year
  year:         u32,
  /// Space separated flags
  pub_type:     String,
  /// Space separated tags
  tags:         String,
  /// Leading number
  number:       Option<String>,
  /// DOI
  doi:          Option<String>,
  /// arXiv id
  arxiv:        Option<String>,
  /// Full text
  body:         String,
}

impl From<&Document> for StoredRow {
  fn from(document: &Document) -> Self {
    let paper = &document.paper;
    Self {
      path:         paper.path.to_string_lossy().into_owned(),
      bibtex:       paper.bibtex.to_string(),
      bibtex_terms: bibtex_terms(&paper.bibtex),
      title:        paper.title.clone(),
      comment:      document.comment.clone(),
      authors:      paper.authors.join(", "),
      year:         paper.year,
      pub_type:     paper.pub_type.iter().map(PubType::as_str).collect::<Vec<_>>().join(" "),
      tags:         paper.tags.join(" "),
      number:       paper.number.clone(),
      doi:          paper.doi.clone(),
      arxiv:        paper.arxiv.clone(),
      body:         document.body.clone(),
    }
  }
}

/// Removes the document with `path` from both tables, returning whether it existed.
fn delete_path(tx: &rusqlite::Transaction<'_>, path: &str) -> rusqlite::Result<bool> {
  let id: Option<i64> = {
    let mut stmt = tx.prepare_cached("SELECT id FROM papers WHERE path = ?1")?;
    let mut rows = stmt.query([path])?;
    match rows.next()? {
      Some(row) => Some(row.get(0)?),
      None => None,
    }
  };
  let Some(id) = id else { return Ok(false) };
  tx.prepare_cached("DELETE FROM papers_fts WHERE rowid = ?1")?.execute([id])?;
  tx.prepare_cached("DELETE FROM papers WHERE id = ?1")?.execute([id])?;
  Ok(true)
}

#[async_trait]
impl DatabaseInstruction for Commit {
  type Output = CommitStats;

  async fn execute(&self, db: &mut Database) -> Result<Self::Output> {
    let reset = self.reset;
    let deletions: Vec<String> =
      self.deletions.iter().map(|path| path.to_string_lossy().into_owned()).collect();
    let rows: Vec<StoredRow> = self.documents.iter().map(StoredRow::from).collect();

    let stats = db
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if reset {
          tx.execute("DELETE FROM papers_fts", [])?;
          tx.execute("DELETE FROM papers", [])?;
        }

        let mut stats = CommitStats::default();
        for path in &deletions {
          if delete_path(&tx, path)? {
            stats.deleted += 1;
          }
        }

        for row in &rows {
          delete_path(&tx, &row.path)?;
          let id: i64 = tx.prepare_cached(
            "INSERT INTO papers (path, bibtex, title, comment, authors, year, pub_type, tags, number, doi, arxiv)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             RETURNING id",
          )?
          .query_row(
            params![
              row.path,
              row.bibtex,
              row.title,
              row.comment,
              row.authors,
              row.year,
              row.pub_type,
              row.tags,
              row.number,
              row.doi,
              row.arxiv,
            ],
            |r| r.get(0),
          )?;
          tx.prepare_cached(
            "INSERT INTO papers_fts (rowid, bibtex, title, comment, authors, body)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          )?
          .execute(params![id, row.bibtex_terms, row.title, row.comment, row.authors, row.body])?;
          stats.added += 1;
        }

        tx.commit()?;
        Ok(stats)
      })
      .await?;

    debug!("Committed {} additions and {} deletions", stats.added, stats.deleted);
    Ok(stats)
  }
}
