//! User configuration read from `conf.toml`.
//!
//! The configuration lives in a conf directory, `~/.refpapers` unless given
//! otherwise. Only the `[paths]` table is required:
//!
//! ```toml
//! use_git = true
//! git_untracked = "ADD"
//!
//! [paths]
//! index = "~/.refpapers/index"
//! data = "~/papers"
//!
//! [software.viewers]
//! pdf = "evince"
//!
//! [software.extractors]
//! pdf = "pdftotext -l 20"
//! djvu = "none"
//! ```

use std::sync::{Arc, Mutex};

use serde::Deserializer;

use super::*;

/// Name of the configuration file inside the conf directory.
pub const CONF_FILE: &str = "conf.toml";

/// Extractor used for endings without a configured one.
pub const DEFAULT_EXTRACTOR: &str = "pdftotext";

/// Endings recognized when no viewers or extractors are configured.
const DEFAULT_ENDINGS: [&str; 2] = ["pdf", "djvu"];

/// How uncommitted or untracked files are treated in incremental indexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GitPolicy {
  /// Leave them out of the index, but report them
  #[default]
  Warn,
  /// Leave them out silently
  Ignore,
  /// Index them as if committed
  Add,
}

/// File system locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paths {
  /// Directory holding the search index
  #[serde(deserialize_with = "expand_user")]
  pub index:     PathBuf,
  /// Root of the paper tree
  #[serde(deserialize_with = "expand_user")]
  pub data:      PathBuf,
  /// Optional log file
  #[serde(default, deserialize_with = "expand_user_opt")]
  pub log:       Option<PathBuf>,
  /// Directory for metadata API caches, the conf directory if unset
  #[serde(default, deserialize_with = "expand_user_opt")]
  pub api_cache: Option<PathBuf>,
  /// The conf directory, filled in from the location of the conf file
  #[serde(default, deserialize_with = "expand_user_opt")]
  pub confdir:   Option<PathBuf>,
}

impl Paths {
  /// The SQLite file inside the index directory.
  pub fn index_path(&self) -> PathBuf { self.index.join("refpapers.db") }

  /// Directory for metadata API caches.
  pub fn api_cache_dir(&self) -> PathBuf {
    self.api_cache.clone().or_else(|| self.confdir.clone()).unwrap_or_else(|| PathBuf::from("."))
  }
}

/// External programs, keyed by file ending without the dot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Software {
  /// Programs used to open papers
  #[serde(default, deserialize_with = "strip_dots")]
  pub viewers:    BTreeMap<String, String>,
  /// Commands used to extract full text
  #[serde(default, deserialize_with = "strip_dots")]
  pub extractors: BTreeMap<String, String>,
  /// Endings already warned about in [`Software::get_extractor`]
  #[serde(skip)]
  warned:         Arc<Mutex<HashSet<String>>>,
}

impl Software {
  /// The viewer for a file ending.
  ///
  /// # Errors
  ///
  /// Returns [`RefpapersError::MissingViewer`] if none is configured.
  pub fn get_viewer(&self, ending: &str) -> Result<&str> {
    let ending = ending.trim_matches('.');
    self
      .viewers
      .get(ending)
      .map(String::as_str)
      .ok_or_else(|| RefpapersError::MissingViewer(ending.to_string()))
  }

  /// The extractor for a file ending, falling back to [`DEFAULT_EXTRACTOR`].
  ///
  /// The fallback is logged once per ending.
  pub fn get_extractor(&self, ending: &str) -> &str {
    let ending = ending.trim_matches('.');
    if let Some(extractor) = self.extractors.get(ending) {
      return extractor;
    }
    if let Ok(mut warned) = self.warned.lock() {
      if warned.insert(ending.to_string()) {
        warn!("No extractor set for {ending}, defaulting to {DEFAULT_EXTRACTOR}");
      }
    }
    DEFAULT_EXTRACTOR
  }
}

/// The whole configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
  /// Maximum number of full text characters to index, unlimited if unset
  #[serde(default)]
  pub fulltext_chars:      Option<usize>,
  /// Number of leading characters searched for identifiers, all if unset
  #[serde(default = "default_ids_chars")]
  pub ids_chars:           Option<usize>,
  /// Maximum number of distinct identifiers of one kind before they are ignored
  #[serde(default = "default_max_ids")]
  pub max_ids:             usize,
  /// Author list length limit for papers built from metadata, off if not above one
  #[serde(default = "default_max_authors")]
  pub max_authors:         i64,
  /// Extraction time after which a file is marked too slow
  #[serde(default = "default_extract_max_seconds")]
  pub extract_max_seconds: f64,
  /// Whether incremental indexing through git is enabled
  #[serde(default)]
  pub use_git:             bool,
  /// Treatment of staged but uncommitted files
  #[serde(default)]
  pub git_uncommitted:     GitPolicy,
  /// Treatment of untracked files
  #[serde(default)]
  pub git_untracked:       GitPolicy,
  /// File system locations
  pub paths:               Paths,
  /// External programs
  #[serde(default)]
  pub software:            Software,
}

fn default_ids_chars() -> Option<usize> { Some(5000) }

fn default_max_ids() -> usize { 1 }

fn default_max_authors() -> i64 { -1 }

fn default_extract_max_seconds() -> f64 { 3.0 }

impl Config {
  /// The conf directory used when none is given: `~/.refpapers`.
  pub fn default_confdir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".refpapers")
  }

  /// Reads `conf.toml` from a conf directory.
  ///
  /// # Errors
  ///
  /// Fails if the file is missing, empty or not a valid configuration.
  pub fn from_confdir(confdir: impl AsRef<Path>) -> Result<Self> {
    Self::from_file(confdir.as_ref().join(CONF_FILE))
  }

  /// Reads a configuration file.
  ///
  /// Unless the file sets `paths.confdir`, it is set to the directory
  /// containing the file.
  pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
      return Err(RefpapersError::Config(format!(
        "Configuration file {} can not be empty",
        path.display()
      )));
    }
    let mut config: Config = toml::from_str(&content)?;
    if config.paths.confdir.is_none() {
      config.paths.confdir = path.parent().map(Path::to_path_buf);
    }
    debug!("Loaded configuration from {}", path.display());
    Ok(config)
  }

  /// Creates a configuration with default settings for the given locations.
  pub fn new(data: impl Into<PathBuf>, index: impl Into<PathBuf>) -> Self {
    Self {
      fulltext_chars:      None,
      ids_chars:           default_ids_chars(),
      max_ids:             default_max_ids(),
      max_authors:         default_max_authors(),
      extract_max_seconds: default_extract_max_seconds(),
      use_git:             false,
      git_uncommitted:     GitPolicy::default(),
      git_untracked:       GitPolicy::default(),
      paths:               Paths {
        index:     index.into(),
        data:      data.into(),
        log:       None,
        api_cache: None,
        confdir:   None,
      },
      software:            Software::default(),
    }
  }

  /// Writes a conf file holding only the two required paths.
  ///
  /// An existing file is left alone and `false` returned.
  pub fn write_minimal(confdir: impl AsRef<Path>, data: &Path, index: &Path) -> Result<bool> {
    let confdir = confdir.as_ref();
    let path = confdir.join(CONF_FILE);
    if path.exists() {
      return Ok(false);
    }
    std::fs::create_dir_all(confdir)?;
    let mut paths = toml::Table::new();
    paths.insert("index".into(), toml::Value::String(index.display().to_string()));
    paths.insert("data".into(), toml::Value::String(data.display().to_string()));
    let mut root = toml::Table::new();
    root.insert("paths".into(), toml::Value::Table(paths));
    std::fs::write(&path, root.to_string())?;
    info!("Wrote minimal configuration to {}", path.display());
    Ok(true)
  }

  /// All file endings that are indexed.
  ///
  /// These are the endings with a viewer or an extractor, or `pdf` and `djvu`
  /// if nothing is configured.
  pub fn all_endings(&self) -> BTreeSet<String> {
    let endings: BTreeSet<String> =
      self.software.viewers.keys().chain(self.software.extractors.keys()).cloned().collect();
    if endings.is_empty() {
      DEFAULT_ENDINGS.iter().map(|ending| ending.to_string()).collect()
    } else {
      endings
    }
  }
}

/// Replaces a leading `~` with the home directory.
fn expand_tilde(path: &str) -> PathBuf {
  match (path.strip_prefix('~'), dirs::home_dir()) {
    (Some(rest), Some(home)) => home.join(rest.trim_start_matches('/')),
    _ => PathBuf::from(path),
  }
}

/// Deserializes a path, expanding `~`.
fn expand_user<'de, D: Deserializer<'de>>(deserializer: D) -> core::result::Result<PathBuf, D::Error> {
  let raw = String::deserialize(deserializer)?;
  Ok(expand_tilde(&raw))
}

/// Deserializes an optional path, expanding `~`.
fn expand_user_opt<'de, D: Deserializer<'de>>(
  deserializer: D,
) -> core::result::Result<Option<PathBuf>, D::Error> {
  let raw = Option::<String>::deserialize(deserializer)?;
  Ok(raw.as_deref().map(expand_tilde))
}

/// Deserializes an ending map, removing dots around the endings.
fn strip_dots<'de, D: Deserializer<'de>>(
  deserializer: D,
) -> core::result::Result<BTreeMap<String, String>, D::Error> {
  let raw = BTreeMap::<String, String>::deserialize(deserializer)?;
  Ok(raw.into_iter().map(|(ending, program)| (ending.trim_matches('.').to_string(), program)).collect())
}
