//! Near-duplicate detection.
//!
//! Candidates for a reference paper are gathered from the index with cheap
//! queries, then ranked by [`paper_distance`]:
//!
//! - For a text query, the best match among bibtex, authors and title becomes the reference and
//!   candidates are the papers most like it in each of those fields.
//! - For a paper, the words of its title are shuffled into triples that must all appear in a
//!   candidate title, and papers by its first author are added.
//!
//! [`all_duplicates`] uses every indexed paper as a reference in turn.
//!
//! # Examples
//!
//! ```no_run
//! use refpapers::{
//!   database::Database,
//!   duplicates::{all_duplicates, find_close_matches, MatchQuery},
//!   state::Decisions,
//! };
//!
//! # async fn example() -> Result<(), refpapers::error::RefpapersError> {
//! let mut db = Database::open("refpapers.db").await?;
//! let close = find_close_matches(&mut db, &MatchQuery::Text("bojar findings".into()), 10, 0.35, false).await?;
//! for (distance, paper) in &close.matches {
//!   println!("{distance:.3} {}", paper.path.display());
//! }
//!
//! let decisions = Decisions::open("/home/me/.refpapers")?;
//! for pair in all_duplicates(&mut db, &decisions).await? {
//!   println!("{:.3} {} {}", pair.distance, pair.a.path.display(), pair.b.path.display());
//! }
//! # Ok(())
//! # }
//! ```

use rand::{seq::SliceRandom, Rng};

use super::*;
use crate::{
  database::{Database, DatabaseInstruction, Field, MoreLikeThis, Query},
  paper::ET_AL,
  state::Relation,
};

pub mod distance;

pub use self::distance::paper_distance;

/// Number of candidates kept per reference.
pub const DEFAULT_LIMIT: usize = 10;

/// Candidates further away than this are not duplicates.
pub const DEFAULT_MAX_DISTANCE: f64 = 0.35;

/// Fields searched for candidates.
const CANDIDATE_FIELDS: [Field; 3] = [Field::Bibtex, Field::Authors, Field::Title];

/// Number of times the title words are shuffled into triples.
const SHUFFLES: usize = 3;

/// What to find close matches for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchQuery {
  /// The best match of a search over bibtex, authors and title
  Text(String),
  /// A paper, indexed or not
  Paper(Paper),
}

/// A reference paper and its closest candidates.
#[derive(Debug, Clone, PartialEq)]
pub struct CloseMatches {
  /// The paper the candidates were compared with
  pub reference: Paper,
  /// Candidates with their distance, closest first
  pub matches:   Vec<(f64, Paper)>,
}

/// Two papers that are likely the same.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicatePair {
  /// The paper with the smaller path
  pub a:        Paper,
  /// The paper with the larger path
  pub b:        Paper,
  /// Their distance
  pub distance: f64,
}

impl DuplicatePair {
  /// Orders the two papers by path.
  fn new(first: Paper, second: Paper, distance: f64) -> Self {
    if first.path <= second.path {
      Self { a: first, b: second, distance }
    } else {
      Self { a: second, b: first, distance }
    }
  }

  /// Whether the user has chosen to ignore this pair.
  pub fn is_ignored(&self, decisions: &Decisions) -> bool {
    let (a, b) = (self.a.path.to_string_lossy(), self.b.path.to_string_lossy());
    decisions.contains(Relation::IgnoreDuplicate, &a, Some(&b))
      || decisions.contains(Relation::IgnoreDuplicate, &b, Some(&a))
  }
}

/// Groups the words of a title into triples, from several random orders.
///
/// Leftover words that do not fill a triple are dropped, so titles of fewer
/// than three words give no triples.
pub fn title_triples<R: Rng + ?Sized>(title: &str, rng: &mut R) -> BTreeSet<Vec<String>> {
  let mut triples = BTreeSet::new();
  for _ in 0..SHUFFLES {
    let mut words: Vec<String> = title.split_whitespace().map(String::from).collect();
    words.shuffle(rng);
    triples.extend(words.chunks_exact(3).map(<[String]>::to_vec));
  }
  triples
}

/// Candidates resembling the best match of a text query.
async fn more_like_query(db: &mut Database, query: &str, limit: usize) -> Result<(Paper, BTreeSet<Paper>)> {
  let reference = Query::fields(query, &CANDIDATE_FIELDS).first(db).await?;
  let mut candidates = BTreeSet::new();
  for field in CANDIDATE_FIELDS {
    candidates.extend(MoreLikeThis::new(&reference.path, field).limit(limit).execute(db).await?);
  }
  Ok((reference, candidates))
}

/// Candidates sharing title words or the first author with a paper.
async fn more_like_paper(
  db: &mut Database,
  paper: &Paper,
  limit: usize,
  include_exact: bool,
) -> Result<BTreeSet<Paper>> {
  let mut queries: Vec<Query> = title_triples(&paper.title, &mut rand::rng())
    .into_iter()
    .map(|triple| Query::fields(triple.join(" "), &[Field::Title]).limit(limit))
    .collect();
  if let Some(first_author) = paper.authors.first().filter(|author| *author != ET_AL) {
    queries.push(Query::fields(first_author.as_str(), &[Field::Authors]).limit(limit));
  }

  let mut candidates = BTreeSet::new();
  for query in queries {
    for candidate in query.execute(db).await? {
      if include_exact || candidate.path != paper.path {
        candidates.insert(candidate);
      }
    }
  }
  Ok(candidates)
}

/// The candidates closest to a query.
///
/// Candidates are sorted by [`paper_distance`] to the reference, truncated to
/// `limit` and then those further than `max_dist` are dropped. The reference
/// itself is only a candidate of a paper query with `include_exact`.
///
/// # Errors
///
/// Returns [`RefpapersError::NoMatch`] if a text query matches nothing.
pub async fn find_close_matches(
  db: &mut Database,
  query: &MatchQuery,
  limit: usize,
  max_dist: f64,
  include_exact: bool,
) -> Result<CloseMatches> {
  let (reference, candidates) = match query {
    MatchQuery::Text(text) => more_like_query(db, text, limit).await?,
    MatchQuery::Paper(paper) => (paper.clone(), more_like_paper(db, paper, limit, include_exact).await?),
  };
  let mut matches: Vec<(f64, Paper)> =
    candidates.into_iter().map(|candidate| (paper_distance(&reference, &candidate), candidate)).collect();
  matches.sort_by(|(a_dist, a), (b_dist, b)| a_dist.total_cmp(b_dist).then_with(|| a.cmp(b)));
  matches.truncate(limit);
  matches.retain(|(distance, _)| *distance <= max_dist);
  trace!("{} close matches for {}", matches.len(), reference.path.display());
  Ok(CloseMatches { reference, matches })
}

/// Every pair of indexed papers that look like duplicates, closest first.
///
/// Pairs are identified by their two paths. A pair found from both ends keeps
/// the smaller distance. Pairs the user has chosen to ignore are left out.
pub async fn all_duplicates(db: &mut Database, decisions: &Decisions) -> Result<Vec<DuplicatePair>> {
  let papers = Query::all().execute(db).await?;
  info!("Scoring potential duplicates of {} papers", papers.len());
  let mut pairs: BTreeMap<(PathBuf, PathBuf), DuplicatePair> = BTreeMap::new();
  for paper in papers {
    let query = MatchQuery::Paper(paper);
    let close = find_close_matches(db, &query, DEFAULT_LIMIT, DEFAULT_MAX_DISTANCE, false).await?;
    for (distance, candidate) in close.matches {
      let pair = DuplicatePair::new(close.reference.clone(), candidate, distance);
      if pair.is_ignored(decisions) {
        continue;
      }
      let key = (pair.a.path.clone(), pair.b.path.clone());
      match pairs.get(&key) {
        Some(existing) if existing.distance <= pair.distance => {},
        _ => {
          pairs.insert(key, pair);
        },
      }
    }
  }
  let mut pairs: Vec<DuplicatePair> = pairs.into_values().collect();
  pairs.sort_by(|x, y| x.distance.total_cmp(&y.distance).then_with(|| x.a.path.cmp(&y.a.path)));
  debug!("Found {} potential duplicates", pairs.len());
  Ok(pairs)
}

/// Records that a pair is not a duplicate, and persists the decision.
pub fn mark_pair_ignored(decisions: &mut Decisions, pair: &DuplicatePair) -> Result<()> {
  decisions.add_pair(Relation::IgnoreDuplicate, pair.a.path.display(), pair.b.path.display());
  decisions.write()
}
