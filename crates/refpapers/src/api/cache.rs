//! Append-only key-value cache in a JSON lines file.
//!
//! Every line is a two element array `[key, value]`, where a `null` value
//! records that the service had no answer. Later lines win.

use std::io::Write;

use serde_json::Value;

use super::*;

/// Cached answers of one metadata service.
#[derive(Debug)]
pub struct JsonlCache {
  /// The backing file
  path:    PathBuf,
  /// Answers by key
  entries: HashMap<String, Option<Metadata>>,
}

impl JsonlCache {
  /// Loads the cache file, which need not exist yet.
  ///
  /// # Errors
  ///
  /// Returns [`RefpapersError::Cache`] for a line that is not a `[key, value]`
  /// pair.
  pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
    let path = path.into();
    let mut entries = HashMap::new();
    if path.exists() {
      let content = std::fs::read_to_string(&path)?;
      for (line_number, line) in content.lines().enumerate().filter(|(_, line)| !line.trim().is_empty()) {
        let error = |reason: String| RefpapersError::Cache { path: path.clone(), line: line_number, reason };
        let values: Vec<Value> = serde_json::from_str(line).map_err(|e| error(e.to_string()))?;
        let [key, value]: [Value; 2] = values
          .try_into()
          .map_err(|values: Vec<Value>| error(format!("saw {} values, expecting 2", values.len())))?;
        let key = match key {
          Value::String(key) => key,
          other => return Err(error(format!("key {other} is not a string"))),
        };
        let metadata = serde_json::from_value(value).map_err(|e| error(e.to_string()))?;
        entries.insert(key, metadata);
      }
    }
    trace!("Loaded {} cached answers from {}", entries.len(), path.display());
    Ok(Self { path, entries })
  }

  /// The cached answer for a key, `None` if the key was never looked up.
  pub fn get(&self, key: &str) -> Option<&Option<Metadata>> { self.entries.get(key) }

  /// Records an answer, appending it to the file.
  pub fn insert(&mut self, key: String, value: Option<Metadata>) -> Result<()> {
    let line = serde_json::to_string(&(&key, &value))?;
    let mut file = std::fs::OpenOptions::new().create(true).append(true).open(&self.path)?;
    writeln!(file, "{line}")?;
    self.entries.insert(key, value);
    Ok(())
  }

  /// Number of cached answers.
  pub fn len(&self) -> usize { self.entries.len() }

  /// Whether nothing is cached.
  pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn metadata() -> Metadata {
    Metadata {
      title:   "Findings of the 2017 Conference on Machine Translation".into(),
      year:    2017,
      authors: vec!["Bojar".into(), "Chatterjee".into()],
      doi:     Some("10.18653/v1/W17-4717".into()),
      arxiv:   None,
    }
  }

  #[test]
  fn test_missing_file_is_empty() {
    let dir = tempdir().unwrap();
    let cache = JsonlCache::open(dir.path().join("crossref.jsonl")).unwrap();
    assert!(cache.is_empty());
  }

  #[test]
  fn test_insert_persists() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("crossref.jsonl");
    let mut cache = JsonlCache::open(&path).unwrap();
    cache.insert("10.18653/v1/W17-4717".into(), Some(metadata())).unwrap();
    cache.insert("10.1000/missing".into(), None).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().count(), 2);
    assert!(content.lines().nth(1).unwrap().starts_with("[\"10.1000/missing\",null]"));

    let reopened = JsonlCache::open(&path).unwrap();
    assert_eq!(reopened.len(), 2);
    assert_eq!(reopened.get("10.18653/v1/W17-4717"), Some(&Some(metadata())));
    assert_eq!(reopened.get("10.1000/missing"), Some(&None));
    assert_eq!(reopened.get("10.1000/other"), None);
  }

  #[test]
  fn test_malformed_lines() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("arxiv.jsonl");
    for (content, expected) in [
      ("[\"a\", null]\nnot json\n", "line 1"),
      ("[\"a\", null, 3]\n", "saw 3 values, expecting 2"),
      ("[1, null]\n", "is not a string"),
    ] {
      std::fs::write(&path, content).unwrap();
      let error = JsonlCache::open(&path).unwrap_err();
      assert!(matches!(error, RefpapersError::Cache { .. }));
      assert!(error.to_string().contains(expected), "{error}");
    }
  }
}
