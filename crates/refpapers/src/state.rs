//! State persisted in the conf directory between runs.
//!
//! Three independent stores live next to `conf.toml`:
//!
//! - [`StoredState`]: scalar variables, one file per variable
//! - [`Decisions`]: user and indexer decisions, one tab separated line each
//! - [`AllCategories`]: every tag sequence that has been indexed, as JSON
//!
//! Decisions and stored variables are written to a temporary file and renamed
//! into place, so a crash never leaves a half written file behind.

use super::*;

/// Scalar variables kept by [`StoredState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateVariable {
  /// Commit the index was last brought up to date with
  LastIndexedCommit,
  /// Schema version the index was built with
  SchemaVersion,
}

impl StateVariable {
  /// File name of the variable inside the conf directory.
  pub fn file_name(&self) -> &'static str {
    match self {
      StateVariable::LastIndexedCommit => "last_indexed_commit",
      StateVariable::SchemaVersion => "schema_version",
    }
  }
}

/// Scalar variables stored one file per variable.
#[derive(Debug, Clone)]
pub struct StoredState {
  /// Directory the variable files live in
  confdir: PathBuf,
}

impl StoredState {
  /// Creates a store in the given directory.
  pub fn new(confdir: impl Into<PathBuf>) -> Self { Self { confdir: confdir.into() } }

  /// Directory the variable files live in.
  pub fn confdir(&self) -> &Path { &self.confdir }

  /// Reads a variable, `None` if it was never written.
  pub fn read(&self, variable: StateVariable) -> Result<Option<String>> {
    let path = self.confdir.join(variable.file_name());
    if !path.exists() {
      return Ok(None);
    }
    let content = std::fs::read_to_string(&path)?;
    Ok(content.lines().next().map(|line| line.trim().to_string()))
  }

  /// Overwrites a variable.
  pub fn write(&self, variable: StateVariable, value: &str) -> Result<()> {
    let path = self.confdir.join(variable.file_name());
    let tmp_path = self.confdir.join(format!(".{}.tmp", variable.file_name()));
    std::fs::write(&tmp_path, format!("{value}\n"))?;
    std::fs::rename(&tmp_path, &path)?;
    trace!("Stored {} = {value}", variable.file_name());
    Ok(())
  }
}

/// The kind of a [`Decision`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Relation {
  /// Full text extraction of `arg1` is skipped
  FulltextTooSlow,
  /// The path in `arg1` is never indexed
  Ignore,
  /// The paths in `arg1` and `arg2` are not duplicates
  IgnoreDuplicate,
  /// The path in `arg1` gets the bibtex key in `arg2`
  OverrideBibtex,
}

impl Relation {
  /// Name used in the decisions file.
  pub fn as_str(&self) -> &'static str {
    match self {
      Relation::Ignore => "IGNORE",
      Relation::FulltextTooSlow => "FULLTEXT_TOO_SLOW",
      Relation::IgnoreDuplicate => "IGNORE_DUPLICATE",
      Relation::OverrideBibtex => "OVERRIDE_BIBTEX",
    }
  }
}

impl Display for Relation {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{}", self.as_str()) }
}

impl FromStr for Relation {
  type Err = RefpapersError;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "IGNORE" => Ok(Relation::Ignore),
      "FULLTEXT_TOO_SLOW" => Ok(Relation::FulltextTooSlow),
      "IGNORE_DUPLICATE" => Ok(Relation::IgnoreDuplicate),
      "OVERRIDE_BIBTEX" => Ok(Relation::OverrideBibtex),
      other => Err(RefpapersError::Config(format!("unknown decision relation \"{other}\""))),
    }
  }
}

/// One recorded decision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Decision {
  /// What was decided
  pub relation: Relation,
  /// First argument, usually a path
  pub arg1:     String,
  /// Optional second argument
  pub arg2:     Option<String>,
}

impl Display for Decision {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match &self.arg2 {
      Some(arg2) => write!(f, "{}\t{}\t{arg2}", self.relation, self.arg1),
      None => write!(f, "{}\t{}", self.relation, self.arg1),
    }
  }
}

/// All decisions, loaded in memory and written back in full.
#[derive(Debug, Clone)]
pub struct Decisions {
  /// The decisions file
  path:      PathBuf,
  /// Temporary file renamed over `path` on write
  tmp_path:  PathBuf,
  /// Decisions in insertion order, possibly with duplicates
  decisions: Vec<Decision>,
}

impl Decisions {
  /// Loads the decisions file of a conf directory, if any.
  pub fn open(confdir: impl AsRef<Path>) -> Result<Self> {
    let confdir = confdir.as_ref();
    let path = confdir.join("decisions");
    let decisions = if path.exists() { Self::read(&std::fs::read_to_string(&path)?) } else { Vec::new() };
    debug!("Loaded {} decisions from {}", decisions.len(), path.display());
    Ok(Self { path, tmp_path: confdir.join(".decisions.tmp"), decisions })
  }

  /// Parses the lines of a decisions file.
  ///
  /// Lines without arguments and lines with unknown relations are skipped.
  fn read(content: &str) -> Vec<Decision> {
    content
      .lines()
      .filter_map(|line| {
        let mut parts = line.split('\t');
        let relation = parts.next()?.trim();
        let arg1 = parts.next()?.to_string();
        let arg2 = parts.next().map(String::from);
        match relation.parse() {
          Ok(relation) => Some(Decision { relation, arg1, arg2 }),
          Err(e) => {
            warn!("Skipping decision: {e}");
            None
          },
        }
      })
      .collect()
  }

  /// Records a decision. Call [`Decisions::write`] to persist it.
  pub fn add(&mut self, relation: Relation, arg1: impl Display) {
    self.decisions.push(Decision { relation, arg1: arg1.to_string(), arg2: None });
  }

  /// Records a decision with two arguments.
  pub fn add_pair(&mut self, relation: Relation, arg1: impl Display, arg2: impl Display) {
    self.decisions.push(Decision { relation, arg1: arg1.to_string(), arg2: Some(arg2.to_string()) });
  }

  /// Decisions with the given relation, in insertion order.
  pub fn get(&self, relation: Relation) -> impl Iterator<Item = &Decision> {
    self.decisions.iter().filter(move |decision| decision.relation == relation)
  }

  /// Whether a decision with exactly these arguments exists.
  pub fn contains(&self, relation: Relation, arg1: &str, arg2: Option<&str>) -> bool {
    self.get(relation).any(|decision| decision.arg1 == arg1 && decision.arg2.as_deref() == arg2)
  }

  /// First arguments of all decisions with the given relation, as paths.
  pub fn paths(&self, relation: Relation) -> HashSet<PathBuf> {
    self.get(relation).map(|decision| PathBuf::from(&decision.arg1)).collect()
  }

  /// Bibtex key overrides, keyed by path.
  pub fn bibtex_overrides(&self) -> HashMap<PathBuf, String> {
    self
      .get(Relation::OverrideBibtex)
      .filter_map(|decision| Some((PathBuf::from(&decision.arg1), decision.arg2.clone()?)))
      .collect()
  }

  /// Writes all decisions, sorted and without duplicates.
  pub fn write(&self) -> Result<()> {
    let unique: BTreeSet<&Decision> = self.decisions.iter().collect();
    let content: String = unique.iter().map(|decision| format!("{decision}\n")).collect();
    std::fs::write(&self.tmp_path, content)?;
    std::fs::rename(&self.tmp_path, &self.path)?;
    debug!("Wrote {} decisions to {}", unique.len(), self.path.display());
    Ok(())
  }
}

/// Every category (tag sequence) that has been indexed.
#[derive(Debug, Clone)]
pub struct AllCategories {
  /// The JSON file
  path:       PathBuf,
  /// Known categories
  categories: BTreeSet<Vec<String>>,
}

impl AllCategories {
  /// Loads `all_categories.json` from a conf directory, if present.
  pub fn open(confdir: impl AsRef<Path>) -> Result<Self> {
    let path = confdir.as_ref().join("all_categories.json");
    let categories = if path.exists() {
      serde_json::from_str(&std::fs::read_to_string(&path)?)?
    } else {
      BTreeSet::new()
    };
    Ok(Self { path, categories })
  }

  /// Adds a category, returning whether it was new.
  pub fn add(&mut self, category: &[String]) -> bool { self.categories.insert(category.to_vec()) }

  /// Whether a category is known.
  pub fn contains(&self, category: &[String]) -> bool { self.categories.contains(category) }

  /// Known categories in sorted order.
  pub fn iter(&self) -> impl Iterator<Item = &Vec<String>> { self.categories.iter() }

  /// Writes the registry as a sorted JSON array of arrays.
  pub fn write(&self) -> Result<()> {
    std::fs::write(&self.path, serde_json::to_string(&self.categories)?)?;
    Ok(())
  }
}
