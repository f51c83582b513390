//! Metadata for arXiv ids from the arXiv Atom API.

use super::*;

/// arXiv API query endpoint.
pub const ARXIV_URL: &str = "https://export.arxiv.org/api/query";

/// The parts of an Atom feed that are used.
#[derive(Debug, Deserialize)]
struct Feed {
  /// Entries, one per requested id
  #[serde(rename = "entry", default)]
  entries: Vec<Entry>,
}

/// One paper in an Atom feed.
#[derive(Debug, Deserialize)]
struct Entry {
  /// Title, possibly wrapped over several lines
  title:     Option<String>,
  /// Publication timestamp of the first version
  published: Option<String>,
  /// Authors, in order
  #[serde(rename = "author", default)]
  authors:   Vec<Author>,
  /// DOI of the published version
  #[serde(rename = "arxiv:doi", alias = "doi", default)]
  doi:       Option<String>,
}

/// An author of an Atom entry.
#[derive(Debug, Deserialize)]
struct Author {
  /// Full name
  name: String,
}

/// Resolves arXiv ids with the arXiv API.
#[derive(Debug, Clone)]
pub struct Arxiv {
  /// HTTP client
  client:   reqwest::Client,
  /// Query endpoint
  base_url: String,
}

impl Arxiv {
  /// A client for the public arXiv API.
  pub fn new() -> Result<Self> { Self::with_base_url(ARXIV_URL) }

  /// A client for an arXiv compatible API at another location.
  pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
    Ok(Self { client: client()?, base_url: base_url.into() })
  }
}

#[async_trait]
impl MetadataApi for Arxiv {
  fn name(&self) -> &'static str { "arxiv" }

  /// Drops an `arXiv:` prefix.
  fn normalize_key(&self, key: &str) -> String {
    let key = key.trim();
    key.strip_prefix("arXiv:").unwrap_or(key).to_string()
  }

  async fn fetch(&self, id: &str) -> Result<Option<Metadata>> {
    debug!("Fetching from arxiv via: {}?id_list={id}", self.base_url);
    let response = self.client.get(&self.base_url).query(&[("id_list", id)]).send().await?;
    let body = response.error_for_status()?.text().await?;
    parse_feed(&body, id)
  }
}

/// Metadata of the first entry of an Atom feed.
///
/// Feeds without a complete entry, such as the error feed returned for an
/// unknown id, give `None`. Authors are reduced to the last word of their
/// name.
pub fn parse_feed(xml: &str, id: &str) -> Result<Option<Metadata>> {
  let feed: Feed = quick_xml::de::from_str(xml)?;
  let Some(entry) = feed.entries.into_iter().next() else {
    return Ok(None);
  };
  let title = entry.title.map(|title| title.split_whitespace().collect::<Vec<_>>().join(" "));
  let year = entry.published.as_deref().and_then(|published| published.get(..4)).and_then(|y| y.parse().ok());
  let authors: Vec<String> = entry
    .authors
    .iter()
    .filter_map(|author| author.name.split_whitespace().last())
    .map(String::from)
    .collect();
  match (title, year) {
    (Some(title), Some(year)) if !title.is_empty() && !authors.is_empty() => Ok(Some(Metadata {
      title,
      year,
      authors,
      doi: entry.doi.filter(|doi| !doi.trim().is_empty()),
      arxiv: Some(id.to_string()),
    })),
    _ => Ok(None),
  }
}
