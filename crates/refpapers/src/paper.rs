//! Core bibliography record types.
//!
//! This module provides the value types shared by every other part of the
//! crate:
//!
//! - [`Paper`]: one bibliography entry, reconstructed from a file name or from the index
//! - [`BibtexKey`]: the `{author}{year}{word}` citation key derived from a paper
//! - [`PubType`]: publication type flags encoded as file name suffixes
//! - [`IndexingAction`]: one pending change to the index
//!
//! A [`Paper`] is never mutated in place once it has been handed to another
//! component. Changing a field, e.g. moving a paper into another category,
//! produces a modified copy through the `with_*` methods.
//!
//! # Examples
//!
//! ```
//! use refpapers::paper::BibtexKey;
//!
//! let key = BibtexKey::parse("bojar2017findings").unwrap();
//! assert_eq!(key.author, "bojar");
//! assert_eq!(key.year, 2017);
//! assert_eq!(key.word, "findings");
//! assert_eq!(key.to_string(), "bojar2017findings");
//! ```

use super::*;
use crate::api::Metadata;

/// Author token used in place of the remaining authors of a paper.
pub const ET_AL: &str = "etAl";

/// Words that are never chosen as the title word of a [`BibtexKey`].
const SKIP_TITLE_WORDS: [&str; 5] = ["a", "an", "on", "in", "the"];

lazy_static! {
  static ref RE_BIBTEX: Regex = Regex::new(r"^([a-z-].*)([0-9]{4})([a-z-].*)$").unwrap();
  static ref RE_TITLE_WORD: Regex = Regex::new(r"^[a-z]").unwrap();
  static ref RE_UNWANTED: Regex = Regex::new(r"[^\w\+\.-]").unwrap();
}

/// Citation key of the form `{author}{year}{word}`.
///
/// The string form has no separators. It can still be parsed back, because
/// the author part starts with a letter or hyphen and carries no four digit
/// run, and the word part starts with a letter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BibtexKey {
  /// Lowercased surname of the first author
  pub author: String,
  /// Publication year
  pub year:   u32,
  /// First content word of the title, lowercased
  pub word:   String,
}

impl BibtexKey {
  /// Creates a key from its three parts.
  pub fn new(author: impl Into<String>, year: u32, word: impl Into<String>) -> Self {
    Self { author: author.into(), year, word: word.into() }
  }

  /// Parses the string form of a key.
  ///
  /// # Errors
  ///
  /// Returns [`RefpapersError::InvalidBibtexKey`] if the string does not consist
  /// of an author part, a four digit year and a word part.
  pub fn parse(input: &str) -> Result<Self> {
    let captures =
      RE_BIBTEX.captures(input).ok_or_else(|| RefpapersError::InvalidBibtexKey(input.into()))?;
    let year = captures[2].parse().map_err(|_| RefpapersError::InvalidBibtexKey(input.into()))?;
    Ok(Self::new(&captures[1], year, &captures[3]))
  }

  /// Selects the word of a title used in the key.
  ///
  /// This is the first whitespace separated token that, after lowercasing and
  /// removing unwanted characters, starts with a letter and is not a stopword.
  /// Returns an empty string if there is no such token.
  ///
  /// ```
  /// use refpapers::paper::BibtexKey;
  ///
  /// assert_eq!(BibtexKey::title_word("The 2nd Annual Report"), "annual");
  /// assert_eq!(BibtexKey::title_word("1984"), "");
  /// ```
  pub fn title_word(title: &str) -> String {
    title
      .split_whitespace()
      .map(|word| RE_UNWANTED.replace_all(&word.to_lowercase(), "").into_owned())
      .filter(|word| RE_TITLE_WORD.is_match(word))
      .find(|word| !SKIP_TITLE_WORDS.contains(&word.as_str()))
      .unwrap_or_default()
  }
}

impl Display for BibtexKey {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}{}{}", self.author, self.year, self.word)
  }
}

impl FromStr for BibtexKey {
  type Err = RefpapersError;

  fn from_str(s: &str) -> Result<Self> { Self::parse(s) }
}

/// Publication type flags.
///
/// The declaration order is the order in which flags appear in a generated
/// file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PubType {
  /// A whole book
  Book,
  /// Presentation slides
  Slides,
  /// A survey article
  Survey,
  /// A doctoral or master's thesis
  Thesis,
}

impl PubType {
  /// All flags in file name order.
  pub const ALL: [PubType; 4] = [PubType::Book, PubType::Slides, PubType::Survey, PubType::Thesis];

  /// The lowercase name used in file names and in the index.
  pub fn as_str(&self) -> &'static str {
    match self {
      PubType::Book => "book",
      PubType::Slides => "slides",
      PubType::Survey => "survey",
      PubType::Thesis => "thesis",
    }
  }
}

impl Display for PubType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for PubType {
  type Err = RefpapersError;

  fn from_str(s: &str) -> Result<Self> {
    PubType::ALL
      .into_iter()
      .find(|pub_type| pub_type.as_str() == s)
      .ok_or_else(|| RefpapersError::Config(format!("unknown publication type \"{s}\"")))
  }
}

/// One entry of the bibliography.
///
/// # Examples
///
/// ```
/// use std::path::Path;
///
/// use refpapers::filename;
///
/// let path = Path::new("r/nlp/Bojar_etAl_-_FindingsOfThe2017Conference_2017.pdf");
/// let paper = filename::parse(path, Path::new("r"), &Default::default()).unwrap();
/// assert_eq!(paper.tags, vec!["nlp"]);
/// assert_eq!(paper.authors, vec!["Bojar", "etAl"]);
/// assert_eq!(paper.bibtex.to_string(), "bojar2017findings");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Paper {
  /// Location of the file
  pub path:     PathBuf,
  /// Derived citation key
  pub bibtex:   BibtexKey,
  /// Human readable title
  pub title:    String,
  /// Author surnames in order, possibly ending in [`ET_AL`]
  pub authors:  Vec<String>,
  /// Publication year
  pub year:     u32,
  /// Publication type flags, in [`PubType::ALL`] order
  pub pub_type: Vec<PubType>,
  /// Directory components between the data root and the file
  pub tags:     Vec<String>,
  /// Optional leading number of the file name
  pub number:   Option<String>,
  /// Digital Object Identifier, if known
  pub doi:      Option<String>,
  /// arXiv identifier, if known
  pub arxiv:    Option<String>,
}

impl Paper {
  /// File ending of the paper, without the dot.
  pub fn suffix(&self) -> Option<&str> { self.path.extension().and_then(|ext| ext.to_str()) }

  /// Whether the author list was truncated with [`ET_AL`].
  pub fn has_et_al(&self) -> bool { self.authors.iter().any(|author| author == ET_AL) }

  /// Returns a copy of this paper at another location.
  pub fn with_path(&self, path: impl Into<PathBuf>) -> Self {
    Self { path: path.into(), ..self.clone() }
  }

  /// Returns a copy of this paper in another category.
  pub fn with_tags(&self, tags: Vec<String>) -> Self { Self { tags, ..self.clone() } }

  /// Returns a copy of this paper with the given identifiers.
  pub fn with_ids(&self, doi: Option<String>, arxiv: Option<String>) -> Self {
    Self { doi, arxiv, ..self.clone() }
  }

  /// Builds a paper from metadata fetched from an external service.
  ///
  /// If `max_authors` is larger than one, author lists longer than it are cut
  /// to `max_authors - 1` names followed by [`ET_AL`]. Returns `None` if the
  /// metadata has no title or no authors.
  pub fn from_metadata(meta: &Metadata, path: impl Into<PathBuf>, max_authors: i64) -> Option<Self> {
    if meta.title.is_empty() {
      return None;
    }
    let first = meta.authors.first()?;
    let mut authors = meta.authors.clone();
    if max_authors > 1 && authors.len() as i64 > max_authors {
      authors.truncate(max_authors as usize - 1);
      authors.push(ET_AL.to_string());
    }
    Some(Self {
      path: path.into(),
      bibtex: BibtexKey::new(first.to_lowercase(), meta.year, BibtexKey::title_word(&meta.title)),
      title: meta.title.clone(),
      authors,
      year: meta.year,
      pub_type: Vec::new(),
      tags: Vec::new(),
      number: None,
      doi: meta.doi.clone(),
      arxiv: meta.arxiv.clone(),
    })
  }
}

impl PartialOrd for Paper {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for Paper {
  fn cmp(&self, other: &Self) -> Ordering {
    self
      .bibtex
      .to_string()
      .cmp(&other.bibtex.to_string())
      .then_with(|| format!("{self:?}").cmp(&format!("{other:?}")))
  }
}

/// Kind of change an [`IndexingAction`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
  /// `A`: a new file
  Add,
  /// `M`: a modified file
  Modify,
  /// `D`: a removed file
  Delete,
  /// `??`: a file unknown to version control
  Untracked,
}

impl Display for Action {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let code = match self {
      Action::Add => "A",
      Action::Modify => "M",
      Action::Delete => "D",
      Action::Untracked => "??",
    };
    write!(f, "{code}")
  }
}

impl FromStr for Action {
  type Err = RefpapersError;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "A" => Ok(Action::Add),
      "M" => Ok(Action::Modify),
      "D" => Ok(Action::Delete),
      "??" => Ok(Action::Untracked),
      other => Err(RefpapersError::InvalidAction(other.to_owned())),
    }
  }
}

/// What an [`IndexingAction`] applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionTarget {
  /// A file that has not been parsed yet
  Path(PathBuf),
  /// A successfully parsed file
  Paper(Paper),
}

/// One pending change to the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexingAction {
  /// Kind of change
  pub action: Action,
  /// The file concerned
  pub target: ActionTarget,
}

impl IndexingAction {
  /// Creates an action on an unparsed path.
  pub fn from_path(action: Action, path: impl Into<PathBuf>) -> Self {
    Self { action, target: ActionTarget::Path(path.into()) }
  }

  /// Creates an action on a parsed paper.
  pub fn from_paper(action: Action, paper: Paper) -> Self {
    Self { action, target: ActionTarget::Paper(paper) }
  }

  /// The file this action concerns, whichever target variant is held.
  pub fn path(&self) -> &Path {
    match &self.target {
      ActionTarget::Path(path) => path,
      ActionTarget::Paper(paper) => &paper.path,
    }
  }

  /// The parsed paper, if this action holds one.
  pub fn as_paper(&self) -> Option<&Paper> {
    match &self.target {
      ActionTarget::Paper(paper) => Some(paper),
      ActionTarget::Path(_) => None,
    }
  }

  /// Returns a copy of this action with another action code.
  pub fn with_action(&self, action: Action) -> Self { Self { action, target: self.target.clone() } }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_bibtex_key_parse() {
    for (input, author, year, word) in [
      ("foo2021bar", "foo", 2021, "bar"),
      ("a1000b", "a", 1000, "b"),
      ("hyphen-name1024multiWord", "hyphen-name", 1024, "multiWord"),
      ("aa9999word2profit", "aa", 9999, "word2profit"),
    ] {
      let key = BibtexKey::parse(input).unwrap();
      assert_eq!(key, BibtexKey::new(author, year, word));
      assert_eq!(key.to_string(), input);
    }
  }

  #[test]
  fn test_bibtex_key_invalid() {
    for input in ["foobar", "author2021", "2021foo", "1900"] {
      assert!(matches!(BibtexKey::parse(input), Err(RefpapersError::InvalidBibtexKey(_))));
    }
  }

  #[test]
  fn test_bibtex_key_round_trip() {
    for author in ["a", "smith", "-", "van-der-berg", "o-neil"] {
      for year in [1000, 1999, 2024] {
        for word in ["x", "findings", "word2vec", "multi-task"] {
          let key = BibtexKey::new(author, year, word);
          assert_eq!(BibtexKey::parse(&key.to_string()).unwrap(), key);
        }
      }
    }
  }

  #[test]
  fn test_title_word() {
    assert_eq!(BibtexKey::title_word("An example title here"), "example");
    assert_eq!(BibtexKey::title_word("On the (Im)possibility"), "impossibility");
    assert_eq!(BibtexKey::title_word("In a 2017 conference"), "conference");
    assert_eq!(BibtexKey::title_word(""), "");
  }

  fn metadata(authors: &[&str]) -> Metadata {
    Metadata {
      title:   "an example title here".into(),
      year:    2022,
      authors: authors.iter().map(|s| s.to_string()).collect(),
      doi:     None,
      arxiv:   None,
    }
  }

  #[test]
  fn test_paper_from_metadata() {
    let paper = Paper::from_metadata(&metadata(&["foo"]), ".", -1).unwrap();
    assert_eq!(paper.bibtex, BibtexKey::new("foo", 2022, "example"));
    assert_eq!(paper.authors, vec!["foo"]);
    assert!(paper.tags.is_empty());
    assert!(paper.pub_type.is_empty());
    assert_eq!(paper.number, None);
  }

  #[test]
  fn test_paper_from_metadata_truncates_authors() {
    let paper = Paper::from_metadata(&metadata(&["A", "B", "C", "D"]), ".", 3).unwrap();
    assert_eq!(paper.authors, vec!["A", "B", ET_AL]);
    assert!(paper.has_et_al());

    let paper = Paper::from_metadata(&metadata(&["A", "B", "C"]), ".", 3).unwrap();
    assert_eq!(paper.authors, vec!["A", "B", "C"]);
  }

  #[test]
  fn test_paper_from_metadata_requires_authors() {
    assert!(Paper::from_metadata(&metadata(&[]), ".", -1).is_none());
  }

  #[test]
  fn test_paper_order_by_bibtex() {
    let a = Paper::from_metadata(&metadata(&["alpha"]), "x", -1).unwrap();
    let b = Paper::from_metadata(&metadata(&["beta"]), "a", -1).unwrap();
    assert!(a < b);
    let c = a.with_path("y");
    assert!(a < c);
    assert_eq!(a.cmp(&a.clone()), Ordering::Equal);
  }

  #[test]
  fn test_action_codes() {
    for code in ["A", "M", "D", "??"] {
      assert_eq!(code.parse::<Action>().unwrap().to_string(), code);
    }
    assert!("X".parse::<Action>().is_err());
  }

  #[test]
  fn test_indexing_action_path() {
    let paper = Paper::from_metadata(&metadata(&["foo"]), "r/A_-_T_2021.pdf", -1).unwrap();
    let by_path = IndexingAction::from_path(Action::Add, "r/A_-_T_2021.pdf");
    let by_paper = IndexingAction::from_paper(Action::Add, paper.clone());
    assert_eq!(by_path.path(), by_paper.path());
    assert_eq!(by_paper.as_paper(), Some(&paper));
    assert_eq!(by_path.as_paper(), None);
  }
}
