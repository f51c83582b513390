//! Pending changes to the index and the filters applied to them.
//!
//! A full run scans the data directory with [`all_actions`]. An incremental
//! run gets its actions from version control and passes them through
//! [`apply_all_filters`]. Either way the result only holds files with a
//! recognized ending, outside `.git`, that the user has not chosen to ignore.

use walkdir::WalkDir;

use super::*;
use crate::state::Relation;

/// Whether any component of the path is a `.git` directory.
pub fn is_in_gitdir(path: &Path) -> bool { path.components().any(|c| c.as_os_str() == ".git") }

/// Whether the file ending of the path is one of `endings`, ignoring case.
fn has_ending(path: &Path, endings: &BTreeSet<String>) -> bool {
  path
    .extension()
    .and_then(|ext| ext.to_str())
    .is_some_and(|ext| endings.contains(&ext.to_lowercase()))
}

/// An add action for every file below `root` with one of the given endings.
///
/// Paths are returned in lexicographic order.
///
/// # Errors
///
/// Fails if `root` or any directory below it can not be read.
pub fn all_paths(root: &Path, endings: &BTreeSet<String>) -> Result<Vec<IndexingAction>> {
  let mut paths = Vec::new();
  for entry in WalkDir::new(root) {
    let entry = entry?;
    if entry.file_type().is_file() && has_ending(entry.path(), endings) {
      paths.push(entry.into_path());
    }
  }
  paths.sort();
  trace!("Found {} files below {}", paths.len(), root.display());
  Ok(paths.into_iter().map(|path| IndexingAction::from_path(Action::Add, path)).collect())
}

/// Drops actions on paths the user has chosen to ignore.
pub fn apply_decisions(
  actions: impl IntoIterator<Item = IndexingAction>,
  decisions: &Decisions,
) -> Vec<IndexingAction> {
  let ignored = decisions.paths(Relation::Ignore);
  actions.into_iter().filter(|action| !ignored.contains(action.path())).collect()
}

/// Drops actions on files whose ending is not indexed.
pub fn keep_valid_endings(
  actions: impl IntoIterator<Item = IndexingAction>,
  endings: &BTreeSet<String>,
) -> Vec<IndexingAction> {
  actions.into_iter().filter(|action| has_ending(action.path(), endings)).collect()
}

/// Every document below `root` that should be indexed.
pub fn all_actions(root: &Path, config: &Config, decisions: &Decisions) -> Result<Vec<IndexingAction>> {
  let paths = all_paths(root, &config.all_endings())?;
  Ok(apply_decisions(paths.into_iter().filter(|action| !is_in_gitdir(action.path())), decisions))
}

/// Keeps only the given actions that concern documents to be indexed.
pub fn apply_all_filters(
  actions: impl IntoIterator<Item = IndexingAction>,
  config: &Config,
  decisions: &Decisions,
) -> Vec<IndexingAction> {
  let outside_git = actions.into_iter().filter(|action| !is_in_gitdir(action.path()));
  apply_decisions(keep_valid_endings(outside_git, &config.all_endings()), decisions)
}
