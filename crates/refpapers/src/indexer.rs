//! Full and incremental indexing runs.
//!
//! A run first decides between a full and an incremental index:
//!
//! - **Full**: every document below the data root is indexed again, and the old contents of the
//!   index are removed in the same transaction.
//! - **Incremental**: only the files version control reports as changed since the last indexed
//!   commit are touched. Staged and untracked files are handled by the `git_uncommitted` and
//!   `git_untracked` policies.
//!
//! Paths are then parsed into papers, full text and identifiers are extracted,
//! and all changes are committed at once. Afterwards the category registry,
//! decisions, schema version and indexed commit are persisted.
//!
//! # Examples
//!
//! ```no_run
//! use refpapers::{
//!   configuration::Config,
//!   database::Database,
//!   git::Git,
//!   indexer::Indexer,
//!   state::{Decisions, StoredState},
//! };
//!
//! # async fn example() -> Result<(), refpapers::error::RefpapersError> {
//! let confdir = Config::default_confdir();
//! let config = Config::from_confdir(&confdir)?;
//! let mut db = Database::open(config.paths.index_path()).await?;
//! let git = Git::new(&config.paths.data);
//!
//! let mut indexer = Indexer::new(&config, StoredState::new(&confdir), Decisions::open(&confdir)?);
//! let report = indexer.run(&mut db, &git, false).await?;
//! for reason in &report.reasons {
//!   println!("{reason}, performing full indexing");
//! }
//! # Ok(())
//! # }
//! ```

use crate::{
  actions::{all_actions, apply_all_filters},
  configuration::GitPolicy,
  database::{Commit, Database, DatabaseInstruction, Document, Query, SCHEMA_VERSION},
  extract::{extract_ids, TextExtractor},
  filename,
  git::VersionControl,
  state::{AllCategories, Relation, StateVariable, StoredState},
};

use super::*;

/// Why a full index was performed instead of an incremental one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FullReason {
  /// Asked for explicitly
  Requested,
  /// Nothing has been indexed before
  FirstIndexing,
  /// The index was built with another schema version
  SchemaChanged(String),
  /// Version control is turned off in the configuration
  GitDisabled,
  /// No indexed commit is recorded
  NoRecordedCommit,
  /// The data repository has no commits yet
  NoCommits,
}

impl Display for FullReason {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      FullReason::Requested => write!(f, "Full indexing requested"),
      FullReason::FirstIndexing => write!(f, "First indexing"),
      FullReason::SchemaChanged(stored) =>
        write!(f, "Existing index uses schema version {stored} instead of {SCHEMA_VERSION}"),
      FullReason::GitDisabled => write!(f, "Not configured to use git"),
      FullReason::NoRecordedCommit => write!(f, "No recorded git commit"),
      FullReason::NoCommits => write!(f, "The data repository has no commits"),
    }
  }
}

/// How a run brings the index up to date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexMode {
  /// Reindex everything
  Full,
  /// Apply changes since the given commit
  Incremental {
    /// The last indexed commit
    from: String,
  },
}

impl IndexMode {
  /// Picks the mode of a run, with every reason that forces a full index.
  ///
  /// Version control is only consulted when it is enabled.
  pub async fn select(
    full: bool,
    config: &Config,
    state: &StoredState,
    vcs: &dyn VersionControl,
  ) -> Result<(Self, Vec<FullReason>)> {
    let mut reasons = Vec::new();
    if full {
      reasons.push(FullReason::Requested);
    }
    match state.read(StateVariable::SchemaVersion)? {
      None => reasons.push(FullReason::FirstIndexing),
      Some(stored) if stored != SCHEMA_VERSION => reasons.push(FullReason::SchemaChanged(stored)),
      Some(_) => {},
    }
    let commit = state.read(StateVariable::LastIndexedCommit)?.filter(|commit| !commit.is_empty());
    if !config.use_git {
      reasons.push(FullReason::GitDisabled);
    } else {
      if commit.is_none() {
        reasons.push(FullReason::NoRecordedCommit);
      }
      if vcs.head_commit().await?.is_none() {
        reasons.push(FullReason::NoCommits);
      }
    }
    match commit {
      Some(from) if reasons.is_empty() => Ok((IndexMode::Incremental { from }, reasons)),
      _ => Ok((IndexMode::Full, reasons)),
    }
  }
}

/// Which class of uncommitted change a [`GitWarning`] is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Uncommitted {
  /// Staged but not committed
  Staged,
  /// Not known to version control
  Untracked,
}

/// An uncommitted change left out of an incremental index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitWarning {
  /// Staged or untracked
  pub kind:   Uncommitted,
  /// The change
  pub action: IndexingAction,
}

impl Display for GitWarning {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let kind = match self.kind {
      Uncommitted::Staged => "STAGED",
      Uncommitted::Untracked => "UNTRACKED",
    };
    write!(f, "{kind:9} {:2} {}", self.action.action.to_string(), self.action.path().display())
  }
}

/// Statistics of an indexing run.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexReport {
  /// Mode the run used
  pub mode:     IndexMode,
  /// Reasons a full index was forced, empty for incremental runs
  pub reasons:  Vec<FullReason>,
  /// Documents written
  pub added:    usize,
  /// Documents removed
  pub deleted:  usize,
  /// Actions dropped because the path did not parse or was already indexed
  pub skipped:  usize,
  /// Uncommitted changes that were not indexed
  pub warnings: Vec<GitWarning>,
  /// Wall clock time of the run
  pub elapsed:  Duration,
}

impl IndexReport {
  /// Number of documents changed by the run.
  pub fn changed(&self) -> usize { self.added + self.deleted }

  /// Average time per changed document, `None` if nothing changed.
  pub fn per_paper(&self) -> Option<Duration> {
    u32::try_from(self.changed()).ok().filter(|changed| *changed > 0).map(|changed| self.elapsed / changed)
  }

  /// Whether the run found nothing to do.
  pub fn is_up_to_date(&self) -> bool { self.changed() == 0 }
}

/// Brings the index up to date with the data directory.
pub struct Indexer<'a> {
  /// Configuration of the run
  config:    &'a Config,
  /// Indexed commit and schema version
  state:     StoredState,
  /// Ignored paths, bibtex overrides and slow files
  decisions: Decisions,
}

impl<'a> Indexer<'a> {
  /// Creates an indexer. Decisions made during runs are added to `decisions`.
  pub fn new(config: &'a Config, state: StoredState, decisions: Decisions) -> Self {
    Self { config, state, decisions }
  }

  /// Decisions, including those recorded by previous runs.
  pub fn decisions(&self) -> &Decisions { &self.decisions }

  /// Performs one indexing run.
  ///
  /// # Errors
  ///
  /// Version control and index failures abort the run. Files that fail to
  /// parse or to extract are logged and skipped.
  pub async fn run(&mut self, db: &mut Database, vcs: &dyn VersionControl, full: bool) -> Result<IndexReport> {
    let start = Instant::now();
    let (mode, reasons) = IndexMode::select(full, self.config, &self.state, vcs).await?;
    for reason in &reasons {
      info!("{reason}, performing full indexing");
    }

    let (actions, warnings) = match &mode {
      IndexMode::Full => (all_actions(&self.config.paths.data, self.config, &self.decisions)?, Vec::new()),
      IndexMode::Incremental { from } => self.incremental_actions(vcs, from).await?,
    };
    let action_count = actions.len();

    let mut papers = self.parse_all(actions);
    if let IndexMode::Incremental { .. } = mode {
      papers = deduplicate(db, papers).await?;
    }
    let skipped = action_count - papers.len();

    let mut commit = match mode {
      IndexMode::Full => Commit::new().reset(),
      IndexMode::Incremental { .. } => Commit::new(),
    };
    let mut indexed = Vec::new();
    for (action, paper) in papers {
      if action == Action::Delete {
        commit.delete(paper.path);
      } else {
        let document = self.document(paper).await;
        indexed.push(document.paper.tags.clone());
        commit.add(document);
      }
    }

    let stats = if commit.is_empty() {
      info!("Up to date, nothing to index");
      Default::default()
    } else {
      let stats = commit.execute(db).await?;
      self.state.write(StateVariable::SchemaVersion, SCHEMA_VERSION)?;
      stats
    };

    let mut categories = AllCategories::open(self.state.confdir())?;
    let new_categories = indexed.iter().filter(|tags| categories.add(tags)).count();
    if new_categories > 0 {
      categories.write()?;
    }
    self.decisions.write()?;
    if self.config.use_git {
      if let Some(head) = vcs.head_commit().await? {
        self.state.write(StateVariable::LastIndexedCommit, &head)?;
      }
    }

    let report = IndexReport {
      mode,
      reasons,
      added: stats.added,
      deleted: stats.deleted,
      skipped,
      warnings,
      elapsed: start.elapsed(),
    };
    info!(
      "Indexed {} papers ({} added/{} deleted) in {:.2} seconds",
      report.changed(),
      report.added,
      report.deleted,
      report.elapsed.as_secs_f64()
    );
    Ok(report)
  }

  /// Changes since `from`, merged with uncommitted changes per policy.
  async fn incremental_actions(
    &self,
    vcs: &dyn VersionControl,
    from: &str,
  ) -> Result<(Vec<IndexingAction>, Vec<GitWarning>)> {
    info!("Performing incremental indexing from commit {from}");
    let mut actions = vcs.diff_tree(from).await?;
    let mut warnings = Vec::new();
    let (uncommitted, untracked) = (self.config.git_uncommitted, self.config.git_untracked);
    if uncommitted != GitPolicy::Ignore || untracked != GitPolicy::Ignore {
      let status = vcs.status().await?;
      let staged = apply_all_filters(status.staged, self.config, &self.decisions);
      match uncommitted {
        GitPolicy::Warn =>
          warnings.extend(staged.into_iter().map(|action| GitWarning { kind: Uncommitted::Staged, action })),
        GitPolicy::Add => actions.extend(staged),
        GitPolicy::Ignore => {},
      }
      let new_files = apply_all_filters(status.untracked, self.config, &self.decisions);
      match untracked {
        GitPolicy::Warn => warnings
          .extend(new_files.into_iter().map(|action| GitWarning { kind: Uncommitted::Untracked, action })),
        GitPolicy::Add => actions.extend(new_files.iter().map(|action| action.with_action(Action::Add))),
        GitPolicy::Ignore => {},
      }
    }
    for warning in &warnings {
      warn!("Not indexed: {warning}");
    }
    Ok((apply_all_filters(actions, self.config, &self.decisions), warnings))
  }

  /// Parses the path of every action, dropping those that do not parse.
  fn parse_all(&self, actions: Vec<IndexingAction>) -> Vec<(Action, Paper)> {
    let overrides = self.decisions.bibtex_overrides();
    actions
      .into_iter()
      .filter_map(|action| {
        let paper = filename::parse(action.path(), &self.config.paths.data, &overrides).ok()?;
        Some((action.action, paper))
      })
      .collect()
  }

  /// The document of a paper, with full text and identifiers extracted.
  ///
  /// Files recorded as too slow are indexed without full text.
  async fn document(&mut self, paper: Paper) -> Document {
    let path = paper.path.to_string_lossy().into_owned();
    if self.decisions.contains(Relation::FulltextTooSlow, &path, None) {
      info!("Skipping full text of this file (was too slow previously): {path}");
      return Document::new(paper, "");
    }
    let extraction = TextExtractor::new(self.config).fulltext(&paper.path).await;
    if extraction.too_slow {
      self.decisions.add(Relation::FulltextTooSlow, &path);
    }
    let (doi, arxiv) = extract_ids(&extraction.text, &paper.path, self.config.ids_chars, self.config.max_ids);
    Document::new(paper.with_ids(doi, arxiv), extraction.text)
  }
}

/// Drops additions of paths that already have a document.
///
/// Mixing full and incremental runs, or an interrupted run, can otherwise add
/// a paper twice.
async fn deduplicate(db: &mut Database, papers: Vec<(Action, Paper)>) -> Result<Vec<(Action, Paper)>> {
  let mut kept = Vec::with_capacity(papers.len());
  for (action, paper) in papers {
    if action == Action::Add && !Query::by_path(&paper.path).limit(1).execute(db).await?.is_empty() {
      info!("Path already indexed: {}", paper.path.display());
      continue;
    }
    kept.push((action, paper));
  }
  Ok(kept)
}
