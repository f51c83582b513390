//! Version control of the data directory.
//!
//! Incremental indexing asks version control which files changed since the
//! last indexed commit. [`VersionControl`] is the seam for this, with [`Git`]
//! shelling out to the `git` binary. Paths reported by version control are
//! relative to the data root and are joined to it before being returned.

use std::process::Output;

use tokio::process::Command;

use super::*;

/// Uncommitted changes reported by version control.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Status {
  /// Staged additions and modifications
  pub staged:    Vec<IndexingAction>,
  /// Files not known to version control
  pub untracked: Vec<IndexingAction>,
}

/// Access to the history of the data directory.
#[async_trait]
pub trait VersionControl: Send + Sync {
  /// The current commit, `None` if there are no commits yet.
  async fn head_commit(&self) -> Result<Option<String>>;

  /// Changes between `from` and the current commit.
  ///
  /// Renames are reported as a deletion of the old path and an addition of
  /// the new one.
  async fn diff_tree(&self, from: &str) -> Result<Vec<IndexingAction>>;

  /// Staged and untracked changes in the working tree.
  async fn status(&self) -> Result<Status>;
}

/// [`VersionControl`] through the `git` command line tool.
#[derive(Debug, Clone)]
pub struct Git {
  /// Root of the work tree
  root: PathBuf,
}

impl Git {
  /// Uses the repository with its work tree at `root`.
  pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

  /// Runs a git subcommand in the work tree.
  async fn run(&self, args: &[&str]) -> Result<Output> {
    trace!("Running git {}", args.join(" "));
    Ok(Command::new("git").arg("-C").arg(&self.root).args(args).output().await?)
  }

  /// Runs a git subcommand, failing on a non-zero exit status.
  async fn run_checked(&self, args: &[&str]) -> Result<String> {
    let output = self.run(args).await?;
    if !output.status.success() {
      return Err(RefpapersError::Git {
        command: args.join(" "),
        stderr:  String::from_utf8_lossy(&output.stderr).trim().to_string(),
      });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
  }
}

#[async_trait]
impl VersionControl for Git {
  async fn head_commit(&self) -> Result<Option<String>> {
    let args = ["rev-parse", "--verify", "--quiet", "HEAD"];
    let output = self.run(&args).await?;
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    match output.status.code() {
      Some(0) => Ok(Some(stdout)),
      // --verify --quiet exits with 1 and no output for an unborn HEAD
      Some(1) if stdout.is_empty() => Ok(None),
      _ => Err(RefpapersError::Git {
        command: args.join(" "),
        stderr:  String::from_utf8_lossy(&output.stderr).trim().to_string(),
      }),
    }
  }

  async fn diff_tree(&self, from: &str) -> Result<Vec<IndexingAction>> {
    let output = self.run_checked(&["diff-tree", "-r", "--name-status", "-z", from, "HEAD"]).await?;
    Ok(parse_diff_tree(&self.root, &output))
  }

  async fn status(&self) -> Result<Status> {
    let output = self.run_checked(&["status", "--porcelain=1", "--untracked-files", "-z"]).await?;
    Ok(parse_status(&self.root, &output))
  }
}

/// Parses `git diff-tree --name-status -z` output.
///
/// Fields come in `status, path` pairs, with a second path for renames and
/// copies.
fn parse_diff_tree(root: &Path, output: &str) -> Vec<IndexingAction> {
  let mut fields = output.split('\0').filter(|field| !field.is_empty());
  let mut actions = Vec::new();
  while let (Some(code), Some(path)) = (fields.next(), fields.next()) {
    match code.chars().next() {
      Some('R') => {
        let Some(new_path) = fields.next() else { break };
        actions.push(IndexingAction::from_path(Action::Delete, root.join(path)));
        actions.push(IndexingAction::from_path(Action::Add, root.join(new_path)));
      },
      Some('C') => {
        let Some(new_path) = fields.next() else { break };
        actions.push(IndexingAction::from_path(Action::Add, root.join(new_path)));
      },
      Some('T') => actions.push(IndexingAction::from_path(Action::Modify, root.join(path))),
      _ => match code.parse::<Action>() {
        Ok(action) => actions.push(IndexingAction::from_path(action, root.join(path))),
        Err(e) => warn!("Did not understand git diff-tree entry \"{code} {path}\": {e}"),
      },
    }
  }
  actions
}

/// Parses `git status --porcelain=1 -z` output.
///
/// Staged additions and modifications, and untracked files, are kept.
/// Uncommitted deletions are ignored.
fn parse_status(root: &Path, output: &str) -> Status {
  let mut status = Status::default();
  let mut entries = output.split('\0').filter(|entry| !entry.is_empty());
  while let Some(entry) = entries.next() {
    let (Some(xy), Some(path)) = (entry.get(..2), entry.get(3..)) else {
      warn!("Did not understand git status: \"{entry}\"");
      continue;
    };
    if xy.starts_with(['R', 'C']) {
      // the source path of a rename or copy follows as its own entry
      entries.next();
    }
    match xy.trim() {
      "M" => status.staged.push(IndexingAction::from_path(Action::Modify, root.join(path))),
      "A" => status.staged.push(IndexingAction::from_path(Action::Add, root.join(path))),
      "??" => status.untracked.push(IndexingAction::from_path(Action::Untracked, root.join(path))),
      "D" => trace!("Ignoring uncommitted deletion of {path}"),
      _ => warn!("Did not understand git status: \"{entry}\""),
    }
  }
  status
}
