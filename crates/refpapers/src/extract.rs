//! Full text and identifier extraction.
//!
//! The full text of a paper is produced by an external command configured per
//! file ending, run as `<command> <path> -` with the text read from standard
//! output. Two command names are special: [`NO_EXTRACTOR`] disables
//! extraction and [`BUILTIN_EXTRACTOR`] reads PDFs in process.
//!
//! DOI and arXiv identifiers are then searched for near the start of the text.

use tokio::process::Command;

use super::*;
use crate::pdf::PdfAnalyzer;

/// Extractor name that disables full text extraction.
pub const NO_EXTRACTOR: &str = "none";

/// Extractor name selecting the in-process PDF reader.
pub const BUILTIN_EXTRACTOR: &str = "builtin";

lazy_static! {
  static ref RE_DOI: Regex =
    Regex::new(r#"(?i)(?:\bdoi:\s*|doi\.org/|info:doi/|\b)(10\.\d{4,9}/[^\s"<>]+)"#).unwrap();
  static ref RE_ARXIV: Regex = Regex::new(r"(?i)\barxiv:\s*(\d{4}\.\d{4,5}(?:v\d+)?)").unwrap();
}

/// Characters that end a sentence rather than an identifier.
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', ')', ']', '}', '\'', '"'];

/// Result of extracting the full text of one file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
  /// The text, possibly truncated, empty if extraction failed or is disabled
  pub text:     String,
  /// Wall clock time spent
  pub elapsed:  Duration,
  /// Whether extraction took longer than allowed
  pub too_slow: bool,
}

/// Runs the configured extractors.
#[derive(Debug, Clone)]
pub struct TextExtractor<'a> {
  /// Source of extractor commands and limits
  config: &'a Config,
}

impl<'a> TextExtractor<'a> {
  /// Creates an extractor using the commands in `config`.
  pub fn new(config: &'a Config) -> Self { Self { config } }

  /// Extracts the full text of a file.
  ///
  /// A failing extractor is logged and gives an empty text, it does not abort
  /// indexing. The text is truncated to `fulltext_chars` characters.
  pub async fn fulltext(&self, path: &Path) -> Extraction {
    let ending = path.extension().and_then(|ext| ext.to_str()).unwrap_or_default();
    let command = self.config.software.get_extractor(ending).trim();
    if command.is_empty() || command.eq_ignore_ascii_case(NO_EXTRACTOR) {
      return Extraction::default();
    }
    let path = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());

    let start = Instant::now();
    let result = if command.eq_ignore_ascii_case(BUILTIN_EXTRACTOR) {
      let builtin_path = path.clone();
      match tokio::task::spawn_blocking(move || PdfAnalyzer::new().extract_text(builtin_path)).await {
        Ok(result) => result,
        Err(e) => Err(RefpapersError::Path(std::io::Error::other(e))),
      }
    } else {
      run_command(command, &path).await
    };
    let elapsed = start.elapsed();

    let mut text = match result {
      Ok(text) => text,
      Err(e) => {
        warn!("Extraction failed for {}: {e}", path.display());
        String::new()
      },
    };
    if let Some(max_chars) = self.config.fulltext_chars {
      if let Some((index, _)) = text.char_indices().nth(max_chars) {
        text.truncate(index);
      }
    }

    let too_slow = elapsed.as_secs_f64() > self.config.extract_max_seconds;
    if too_slow {
      warn!(
        "Full text extraction was too slow {:.2} > {} seconds, will skip file in the future: {}",
        elapsed.as_secs_f64(),
        self.config.extract_max_seconds,
        path.display()
      );
    }
    Extraction { text, elapsed, too_slow }
  }
}

/// Runs `<command> <path> -` and returns its standard output.
async fn run_command(command: &str, path: &Path) -> Result<String> {
  let mut words = shlex::split(command)
    .ok_or_else(|| RefpapersError::Config(format!("can not parse extractor command \"{command}\"")))?
    .into_iter();
  let program = words.next().ok_or_else(|| RefpapersError::Config("empty extractor command".into()))?;
  trace!("Extracting {} with {command}", path.display());
  let output = Command::new(program).args(words).arg(path).arg("-").output().await?;
  if !output.status.success() {
    return Err(RefpapersError::Path(std::io::Error::other(format!(
      "{command} exited with {}",
      output.status
    ))));
  }
  Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Drops every candidate that is a strict prefix of another candidate.
///
/// Identifiers broken by a line wrap show up as prefixes of the whole one.
///
/// ```
/// use std::collections::BTreeSet;
///
/// use refpapers::extract::remove_prefixes;
///
/// let ids = BTreeSet::from(["1404.7828".to_string(), "1404.7828v4".to_string()]);
/// assert_eq!(remove_prefixes(ids), BTreeSet::from(["1404.7828v4".to_string()]));
/// ```
pub fn remove_prefixes(candidates: BTreeSet<String>) -> BTreeSet<String> {
  candidates
    .iter()
    .filter(|id| !candidates.iter().any(|other| other.len() > id.len() && other.starts_with(id.as_str())))
    .cloned()
    .collect()
}

/// The first candidate left after [`remove_prefixes`], unless more than `max_ids` are left.
fn unambiguous(kind: &str, candidates: BTreeSet<String>, max_ids: usize, path: &Path) -> Option<String> {
  let candidates = remove_prefixes(candidates);
  if candidates.len() > max_ids {
    let joined = candidates.iter().cloned().collect::<Vec<_>>().join(", ");
    warn!("Ambiguous {kind} in {}: {joined}", path.display());
    return None;
  }
  candidates.into_iter().next()
}

/// Finds the DOI and arXiv identifier of a paper in its full text.
///
/// Only the first `ids_chars` characters are searched. If more than `max_ids`
/// distinct identifiers of a kind remain after [`remove_prefixes`], that kind
/// is treated as absent.
pub fn extract_ids(
  text: &str,
  path: &Path,
  ids_chars: Option<usize>,
  max_ids: usize,
) -> (Option<String>, Option<String>) {
  let head = match ids_chars.and_then(|max_chars| text.char_indices().nth(max_chars)) {
    Some((index, _)) => &text[..index],
    None => text,
  };
  let dois: BTreeSet<String> = RE_DOI
    .captures_iter(head)
    .map(|caps| caps[1].trim_end_matches(TRAILING_PUNCTUATION).to_string())
    .collect();
  let arxivs: BTreeSet<String> = RE_ARXIV.captures_iter(head).map(|caps| caps[1].to_string()).collect();
  (unambiguous("DOI", dois, max_ids, path), unambiguous("arXiv id", arxivs, max_ids, path))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn set(items: &[&str]) -> BTreeSet<String> { items.iter().map(|s| s.to_string()).collect() }

  #[test]
  fn test_remove_prefixes() {
    for (input, expected) in [
      (set(&["aaaa", "aaa", "aaaaa", "baaa"]), set(&["aaaaa", "baaa"])),
      (set(&["10.1145/3299869.3314036", "10.1145/3299869"]), set(&["10.1145/3299869.3314036"])),
      (set(&["1404.7828", "1404.7828v4"]), set(&["1404.7828v4"])),
    ] {
      assert_eq!(remove_prefixes(input), expected);
    }
  }

  #[test]
  fn test_extract_ids() {
    for (text, doi, arxiv) in [
      ("Foo bar baz doi: 10.1101/708206 quux", Some("10.1101/708206"), None),
      ("Mumble mumble stuff arXiv:2004.04002 also foo", None, Some("2004.04002")),
      (
        "Mumble mumble stuff arXiv:2004.04002 but this version is arXiv:2004.04002v2",
        None,
        Some("2004.04002v2"),
      ),
      (
        "This doi 10.1145/3299869. 3314036 gets chopped while this doi 10.1145/3299869.3314036 is whole",
        Some("10.1145/3299869.3314036"),
        None,
      ),
      (
        "Both a doi 10.1145/3299869.3314036 and arXiv:2004.04002 although not for the same paper lol",
        Some("10.1145/3299869.3314036"),
        Some("2004.04002"),
      ),
      ("See https://doi.org/10.18653/v1/W17-4717.", Some("10.18653/v1/W17-4717"), None),
    ] {
      let (found_doi, found_arxiv) = extract_ids(text, Path::new("."), Some(5000), 1);
      assert_eq!(found_doi.as_deref(), doi, "{text}");
      assert_eq!(found_arxiv.as_deref(), arxiv, "{text}");
    }
  }

  #[traced_test]
  #[test]
  fn test_extract_ids_ambiguous() {
    let text = "cites doi:10.1000/aaa and doi:10.1000/bbb";
    assert_eq!(extract_ids(text, Path::new("x.pdf"), None, 1), (None, None));
    assert!(logs_contain("Ambiguous DOI in x.pdf"));
    let (doi, _) = extract_ids(text, Path::new("x.pdf"), None, 2);
    assert_eq!(doi.as_deref(), Some("10.1000/aaa"));
  }

  #[test]
  fn test_extract_ids_only_searches_head() {
    let text = format!("{}arXiv:2004.04002", "x".repeat(100));
    assert_eq!(extract_ids(&text, Path::new("."), Some(50), 1), (None, None));
    assert_eq!(extract_ids(&text, Path::new("."), None, 1).1.as_deref(), Some("2004.04002"));
  }

  fn config_with_extractor(command: &str, max_seconds: f64) -> Config {
    let mut config = Config::new(".", ".");
    config.software.extractors.insert("txt".into(), command.into());
    config.extract_max_seconds = max_seconds;
    config
  }

  #[tokio::test]
  async fn test_fulltext_disabled() {
    let config = config_with_extractor("None", 3.0);
    let extraction = TextExtractor::new(&config).fulltext(Path::new("paper.txt")).await;
    assert_eq!(extraction, Extraction::default());
  }

  #[tokio::test]
  async fn test_fulltext_command() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("paper.txt");
    std::fs::write(&path, "Neural machine translation\n").unwrap();
    let mut config = config_with_extractor("cat", 60.0);
    config.fulltext_chars = Some(6);
    let extraction = TextExtractor::new(&config).fulltext(&path).await;
    assert_eq!(extraction.text, "Neural");
    assert!(!extraction.too_slow);
  }

  #[traced_test]
  #[tokio::test]
  async fn test_fulltext_too_slow() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("paper.txt");
    std::fs::write(&path, "text").unwrap();
    let config = config_with_extractor("sh -c 'cat \"$0\"'", 0.0);
    let extraction = TextExtractor::new(&config).fulltext(&path).await;
    assert_eq!(extraction.text, "text");
    assert!(extraction.too_slow);
    assert!(logs_contain("Full text extraction was too slow"));
  }

  #[traced_test]
  #[tokio::test]
  async fn test_fulltext_failing_command() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("paper.txt");
    std::fs::write(&path, "text").unwrap();
    let config = config_with_extractor("refpapers-no-such-extractor", 60.0);
    let extraction = TextExtractor::new(&config).fulltext(&path).await;
    assert!(extraction.text.is_empty());
    assert!(logs_contain("Extraction failed"));
  }
}
