//! The canonical file name grammar.
//!
//! A canonical path looks like
//!
//! ```text
//! {root}/{tag}/.../{number_}{Author}_{Author}_-_{CamelCaseTitle}{_flag}_{year}.{ending}
//! ```
//!
//! [`parse`] turns such a path into a [`Paper`], [`generate`] turns a [`Paper`]
//! back into a path. The mapping is lossy (title casing and some punctuation
//! do not survive) but stable: generating from a parsed canonical path gives
//! back the same path.

use deunicode::deunicode_with_tofu;

use super::*;
use crate::paper::ET_AL;

/// Separates the author part from the title part of a file name.
pub const SEPARATOR: &str = "_-_";

lazy_static! {
  static ref RE_NAME: Regex = Regex::new(r"^[A-Za-z]").unwrap();
  static ref RE_NUMBER: Regex = Regex::new(r"^[0-9]+$").unwrap();
  static ref RE_MAIN: Regex = Regex::new(r"^(.*)_.*([0-9]{4})").unwrap();
  static ref RE_CAPWORDS: Regex = Regex::new(r"([^A-Z])([A-Z])").unwrap();
  static ref RE_MULTISPACE: Regex = Regex::new(r"  +").unwrap();
  static ref RE_MULTIUNDER: Regex = Regex::new(r"__+").unwrap();
  static ref RE_UNWANTED: Regex = Regex::new(r"[^\w\+\.-]").unwrap();
  static ref RE_HYPHEN_COMPOUND: Regex =
    Regex::new(r"(?i)\b(cross|low|multi|n|non|pre|semi|sub)-(\w)").unwrap();
  static ref RE_CONTRACTION: Regex = Regex::new(r"(\w)['’](\w)").unwrap();
  static ref PUB_TYPE_MARKERS: Vec<(PubType, Regex)> = PubType::ALL
    .into_iter()
    .map(|pub_type| {
      let name = pub_type.as_str();
      let first = &name[..1];
      let pattern = format!("_[{}{}]{}", first.to_uppercase(), first, &name[1..]);
      (pub_type, Regex::new(&pattern).unwrap())
    })
    .collect();
}

/// Why a file name could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseFailure {
  /// The file name lacks [`SEPARATOR`].
  #[error("missing separator \"{SEPARATOR}\"")]
  MissingSeparator,
  /// Nothing but an optional number precedes the separator.
  #[error("no authors")]
  NoAuthors,
  /// Some author does not start with a letter. Holds the comma-joined authors.
  #[error("non-name author in {0}")]
  NonNameAuthor(String),
  /// The title part carries no four digit year after an underscore.
  #[error("no year")]
  NoYear,
  /// The derived or overridden bibtex key does not parse.
  #[error("invalid BibTex key {0}")]
  InvalidBibtexKey(String),
}

/// A file that does not follow the canonical grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
  /// The offending file
  pub path:   PathBuf,
  /// What is wrong with its name
  pub reason: ParseFailure,
}

impl ParseError {
  /// Single line description with the reason padded for column alignment.
  pub fn describe(&self) -> String { format!("{:18} - {}", self.reason.to_string(), self.path.display()) }
}

impl Display for ParseError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "Unable to parse filename: {}", self.describe())
  }
}

/// Splits CamelCase into lowercase words.
///
/// A single `A` before another capital is treated as the article. Runs of
/// capitals such as acronyms are left alone.
///
/// ```
/// use refpapers::filename::uncapword;
///
/// assert_eq!(uncapword("InAMiddle"), "In a middle");
/// assert_eq!(uncapword("HTML"), "HTML");
/// ```
pub fn uncapword(text: &str) -> String {
  let chars: Vec<char> = text.chars().collect();
  let mut articles = String::with_capacity(text.len());
  let mut i = 0;
  while i < chars.len() {
    let after_capital = i > 0 && chars[i - 1].is_ascii_uppercase();
    if chars[i] == 'A' && !after_capital && chars.get(i + 1).is_some_and(char::is_ascii_uppercase) {
      articles.push_str("A ");
      articles.push(chars[i + 1].to_ascii_lowercase());
      i += 2;
    } else {
      articles.push(chars[i]);
      i += 1;
    }
  }
  RE_CAPWORDS
    .replace_all(&articles, |caps: &regex::Captures| format!("{} {}", &caps[1], caps[2].to_lowercase()))
    .into_owned()
}

/// Joins words into CamelCase, the inverse of [`uncapword`].
///
/// ```
/// use refpapers::filename::capword;
///
/// assert_eq!(capword("foo bar baz"), "FooBarBaz");
/// assert_eq!(capword("Sanchez-Cartagena"), "SanchezCartagena");
/// ```
pub fn capword(text: &str) -> String {
  uncapword(text).replace('-', " ").split_whitespace().map(capitalize).collect()
}

/// Uppercases the first character and lowercases the rest.
fn capitalize(word: &str) -> String {
  let mut chars = word.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
    None => String::new(),
  }
}

/// Prepares a title for CamelCasing.
///
/// Hyphenated compounds with a common prefix ("multi-task") become one word and
/// apostrophes inside words are dropped.
fn beautify(title: &str) -> String {
  let title = RE_HYPHEN_COMPOUND.replace_all(title, "$1 $2");
  RE_CONTRACTION.replace_all(&title, "$1$2").into_owned()
}

/// Directory components of `path` below `root`.
fn tags_of(path: &Path, root: &Path) -> Vec<String> {
  let dir = path.parent().unwrap_or_else(|| Path::new(""));
  let components: Vec<String> = match dir.strip_prefix(root) {
    Ok(relative) => relative.components().map(|c| c.as_os_str().to_string_lossy().into_owned()).collect(),
    Err(_) => dir
      .components()
      .skip(root.components().count())
      .map(|c| c.as_os_str().to_string_lossy().into_owned())
      .collect(),
  };
  components.into_iter().filter(|tag| !tag.is_empty()).collect()
}

/// Parses a canonical path into a [`Paper`].
///
/// `overrides` maps paths to bibtex keys that replace the derived one. Every
/// failure is also logged as a warning.
///
/// # Errors
///
/// Returns a [`ParseError`] naming the first rule the file name breaks.
pub fn parse(
  path: &Path,
  root: &Path,
  overrides: &HashMap<PathBuf, String>,
) -> std::result::Result<Paper, ParseError> {
  parse_inner(path, root, overrides).map_err(|reason| {
    let error = ParseError { path: path.to_path_buf(), reason };
    warn!("{error}");
    error
  })
}

/// [`parse`] without the logging and path bookkeeping.
fn parse_inner(
  path: &Path,
  root: &Path,
  overrides: &HashMap<PathBuf, String>,
) -> std::result::Result<Paper, ParseFailure> {
  let file_name = path.file_name().map(|name| name.to_string_lossy()).unwrap_or_default();
  let (authors_part, title_part) =
    file_name.split_once(SEPARATOR).ok_or(ParseFailure::MissingSeparator)?;

  let mut authors: Vec<String> = authors_part.split('_').map(String::from).collect();
  let mut number = None;
  if RE_NUMBER.is_match(&authors[0]) {
    number = Some(authors.remove(0));
  }
  if authors.is_empty() {
    return Err(ParseFailure::NoAuthors);
  }
  if authors.iter().any(|author| !RE_NAME.is_match(author)) {
    return Err(ParseFailure::NonNameAuthor(authors.join(", ")));
  }

  let captures = RE_MAIN.captures(title_part).ok_or(ParseFailure::NoYear)?;
  let year: u32 = captures[2].parse().map_err(|_| ParseFailure::NoYear)?;
  let mut title = captures[1].to_string();

  let mut pub_type = Vec::new();
  for (flag, marker) in PUB_TYPE_MARKERS.iter() {
    if marker.is_match(&title) {
      pub_type.push(*flag);
      title = marker.replace_all(&title, "").into_owned();
    }
  }
  let title = uncapword(&title.replace('_', " - "));
  let title = RE_MULTISPACE.replace_all(&title, " ").into_owned();

  let key = match overrides.get(path) {
    Some(key) => key.clone(),
    None => BibtexKey::new(authors[0].to_lowercase(), year, BibtexKey::title_word(&title)).to_string(),
  };
  let bibtex = BibtexKey::parse(&key).map_err(|_| ParseFailure::InvalidBibtexKey(key.clone()))?;

  Ok(Paper {
    path: path.to_path_buf(),
    bibtex,
    title,
    authors,
    year,
    pub_type,
    tags: tags_of(path, root),
    number,
    doi: None,
    arxiv: None,
  })
}

/// Generates the canonical path of a paper.
///
/// The path is placed under `tags` if given and non-empty, otherwise under the
/// paper's own tags, and under `root` if given.
///
/// ```
/// use std::path::Path;
///
/// use refpapers::filename::{generate, parse};
///
/// let path = Path::new("r/Author_-_Title_book_2021.pdf");
/// let paper = parse(path, Path::new("r"), &Default::default()).unwrap();
/// assert_eq!(generate(&paper, Some(Path::new("r")), None, "pdf"), path);
/// ```
pub fn generate(paper: &Paper, root: Option<&Path>, tags: Option<&[String]>, suffix: &str) -> PathBuf {
  let authors = paper
    .authors
    .iter()
    .map(|author| if author == ET_AL { author.clone() } else { capword(author) })
    .collect::<Vec<_>>()
    .join("_");

  let title = beautify(&paper.title).replace(": ", "_ ").replace('-', "_ ").replace('?', " ");
  let title = capword(&RE_MULTISPACE.replace_all(&title, " "));

  let flags: String = paper.pub_type.iter().map(|flag| format!("_{flag}")).collect();
  let number = paper.number.as_ref().map(|number| format!("{number}_")).unwrap_or_default();

  let file_name = format!("{number}{authors}{SEPARATOR}{title}{flags}_{}.{suffix}", paper.year);
  let file_name = RE_UNWANTED.replace_all(&file_name, "_");
  let file_name = deunicode_with_tofu(file_name.trim_start_matches('.'), "_");
  let file_name = RE_MULTIUNDER.replace_all(&file_name, "_");

  let tags = match tags {
    Some(tags) if !tags.is_empty() => tags,
    _ => paper.tags.as_slice(),
  };
  let mut path = root.map(Path::to_path_buf).unwrap_or_default();
  path.extend(tags);
  path.push(&*file_name);
  path
}
