//! Bibliographic metadata services.
//!
//! A paper's DOI or arXiv id, found in its full text, can be turned into
//! title, authors and year by asking Crossref or arXiv. Every service sits
//! behind [`MetadataApi`] and is used through a [`CachedApi`], which keeps
//! all answers, including "not found", in an append-only JSON lines file so
//! that the same identifier is never fetched twice.
//!
//! # Examples
//!
//! ```no_run
//! use refpapers::api::{arxiv::Arxiv, crossref::Crossref, CachedApi};
//!
//! # async fn example() -> Result<(), refpapers::error::RefpapersError> {
//! let mut crossref = CachedApi::open(Crossref::new()?, "/home/me/.refpapers")?;
//! if let Some(paper) = crossref.paper("10.18653/v1/W17-4717", "/tmp/download.pdf", 3).await? {
//!   println!("{} ({})", paper.title, paper.year);
//! }
//!
//! let mut arxiv = CachedApi::open(Arxiv::new()?, "/home/me/.refpapers")?;
//! let metadata = arxiv.lookup("arXiv:1706.03762").await?;
//! # Ok(())
//! # }
//! ```

use super::*;

pub mod arxiv;
pub mod cache;
pub mod crossref;

pub use self::cache::JsonlCache;

/// User agent sent to metadata services.
const USER_AGENT: &str = concat!("refpapers/", env!("CARGO_PKG_VERSION"));

/// What a metadata service knows about a paper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
  /// Full title
  pub title:   String,
  /// Publication year
  pub year:    u32,
  /// Surnames, in order
  pub authors: Vec<String>,
  /// DOI, if known
  #[serde(default)]
  pub doi:     Option<String>,
  /// arXiv id, if known
  #[serde(default)]
  pub arxiv:   Option<String>,
}

/// A service resolving identifiers to [`Metadata`].
#[async_trait]
pub trait MetadataApi: Send + Sync {
  /// Name of the service, also the name of its cache file.
  fn name(&self) -> &'static str;

  /// The form of an identifier used for requests and as cache key.
  fn normalize_key(&self, key: &str) -> String { key.trim().to_string() }

  /// Asks the service. `Ok(None)` means the service does not know the key.
  async fn fetch(&self, key: &str) -> Result<Option<Metadata>>;
}

/// A [`MetadataApi`] answering from its cache when it can.
#[derive(Debug)]
pub struct CachedApi<A> {
  /// The service
  api:   A,
  /// Earlier answers of the service
  cache: JsonlCache,
}

impl<A: MetadataApi> CachedApi<A> {
  /// Uses `{cache_dir}/{name}.jsonl` as the cache of `api`, creating the
  /// directory if needed.
  pub fn open(api: A, cache_dir: impl AsRef<Path>) -> Result<Self> {
    let cache_dir = cache_dir.as_ref();
    std::fs::create_dir_all(cache_dir)?;
    let cache = JsonlCache::open(cache_dir.join(format!("{}.jsonl", api.name())))?;
    Ok(Self { api, cache })
  }

  /// Metadata for an identifier.
  ///
  /// Answers are cached, including negative ones. A failed request is logged
  /// and gives `None` without being cached.
  ///
  /// # Errors
  ///
  /// Fails only if the cache can not be written.
  pub async fn lookup(&mut self, key: &str) -> Result<Option<Metadata>> {
    let key = self.api.normalize_key(key);
    if let Some(cached) = self.cache.get(&key) {
      debug!("Using cached metadata for \"{key}\"");
      return Ok(cached.clone());
    }
    let metadata = match self.api.fetch(&key).await {
      Ok(metadata) => metadata,
      Err(e) => {
        warn!("{} lookup of \"{key}\" failed: {e}", self.api.name());
        return Ok(None);
      },
    };
    self.cache.insert(key, metadata.clone())?;
    Ok(metadata)
  }

  /// A paper at `path` built from the metadata of an identifier.
  ///
  /// See [`Paper::from_metadata`] for the meaning of `max_authors`.
  pub async fn paper(&mut self, key: &str, path: impl Into<PathBuf>, max_authors: i64) -> Result<Option<Paper>> {
    Ok(self.lookup(key).await?.and_then(|metadata| Paper::from_metadata(&metadata, path, max_authors)))
  }
}

/// A client with the headers every service gets.
fn client() -> Result<reqwest::Client> { Ok(reqwest::Client::builder().user_agent(USER_AGENT).build()?) }
