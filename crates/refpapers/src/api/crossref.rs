//! Metadata for DOIs from the Crossref REST API.

use serde_json::Value;

use super::*;

/// Crossref REST API endpoint.
pub const CROSSREF_URL: &str = "https://api.crossref.org";

/// Date fields tried in turn for the publication year.
const YEAR_FIELDS: [&str; 4] = ["published", "issued", "published-print", "published-online"];

/// Resolves DOIs with Crossref.
#[derive(Debug, Clone)]
pub struct Crossref {
  /// HTTP client
  client:   reqwest::Client,
  /// API root, without trailing slash
  base_url: String,
}

impl Crossref {
  /// A client for the public Crossref API.
  pub fn new() -> Result<Self> { Self::with_base_url(CROSSREF_URL) }

  /// A client for a Crossref compatible API at another location.
  pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
    Ok(Self { client: client()?, base_url: base_url.into().trim_end_matches('/').to_string() })
  }
}

#[async_trait]
impl MetadataApi for Crossref {
  fn name(&self) -> &'static str { "crossref" }

  async fn fetch(&self, doi: &str) -> Result<Option<Metadata>> {
    let url = format!("{}/works/{doi}", self.base_url);
    debug!("Fetching from crossref via: {url}");
    let response = self.client.get(&url).send().await?;
    if response.status() == reqwest::StatusCode::NOT_FOUND {
      return Ok(None);
    }
    let body: Value = response.error_for_status()?.json().await?;
    Ok(parse_work(&body["message"], doi))
  }
}

/// Joins the strings of a Crossref string array field.
fn joined(work: &Value, field: &str) -> String {
  work[field].as_array().map(|parts| parts.iter().filter_map(Value::as_str).collect()).unwrap_or_default()
}

/// Metadata of a Crossref work record, `None` without authors or year.
///
/// A subtitle is appended to the title after `" - "`.
pub fn parse_work(work: &Value, doi: &str) -> Option<Metadata> {
  let mut title = joined(work, "title");
  let subtitle = joined(work, "subtitle");
  if !subtitle.is_empty() {
    title = format!("{title} - {subtitle}");
  }
  let year = YEAR_FIELDS
    .iter()
    .find_map(|field| work[field]["date-parts"][0][0].as_u64())
    .and_then(|year| u32::try_from(year).ok())?;
  let people = work.get("authors").or_else(|| work.get("author"))?.as_array()?;
  let authors: Vec<String> =
    people.iter().filter_map(|person| person["family"].as_str()).map(String::from).collect();
  if authors.is_empty() {
    return None;
  }
  Some(Metadata { title, year, authors, doi: Some(doi.to_string()), arxiv: None })
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn test_parse_work() {
    let work = json!({
      "title": ["Findings of the 2017 Conference on Machine Translation"],
      "subtitle": ["WMT17"],
      "issued": {"date-parts": [[2017, 9]]},
      "author": [
        {"given": "Ondřej", "family": "Bojar"},
        {"given": "Rajen", "family": "Chatterjee"},
        {"name": "WMT consortium"}
      ]
    });
    let metadata = parse_work(&work, "10.18653/v1/W17-4717").unwrap();
    assert_eq!(metadata.title, "Findings of the 2017 Conference on Machine Translation - WMT17");
    assert_eq!(metadata.year, 2017);
    assert_eq!(metadata.authors, vec!["Bojar", "Chatterjee"]);
    assert_eq!(metadata.doi.as_deref(), Some("10.18653/v1/W17-4717"));
  }

  #[test]
  fn test_parse_work_prefers_published() {
    let work = json!({
      "title": ["T"],
      "published": {"date-parts": [[2016]]},
      "issued": {"date-parts": [[2017]]},
      "author": [{"family": "Sennrich"}]
    });
    assert_eq!(parse_work(&work, "10.1000/x").unwrap().year, 2016);
  }

  #[test]
  fn test_parse_work_incomplete() {
    assert_eq!(parse_work(&json!({"title": ["T"], "author": [{"family": "A"}]}), "d"), None);
    assert_eq!(parse_work(&json!({"title": ["T"], "issued": {"date-parts": [[2017]]}}), "d"), None);
    let no_family = json!({"title": ["T"], "issued": {"date-parts": [[2017]]}, "author": [{"name": "X"}]});
    assert_eq!(parse_work(&no_family, "d"), None);
  }
}
