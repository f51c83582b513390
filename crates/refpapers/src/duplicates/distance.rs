//! Distance between two papers.
//!
//! Every field gets its own distance in `[0, 1]`, and [`paper_distance`] is
//! their weighted mean. Identical papers are at distance 0 and the measure is
//! symmetric.

use std::hash::Hash;

use super::*;

/// Year differences at or above this count as completely different.
pub const MAX_YEAR_DIFF: u32 = 10;

/// Weights of the field distances in [`paper_distance`].
const WEIGHTS: FieldValues = FieldValues {
  bibtex:   1.0,
  title:    3.0,
  authors:  2.0,
  year:     1.0,
  pub_type: 0.5,
  tags:     1.0,
  number:   0.5,
  arxiv:    0.5,
  doi:      0.5,
};

/// One number per compared field, used both for weights and distances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldValues {
  /// Citation key
  pub bibtex:   f64,
  /// Title
  pub title:    f64,
  /// Author list
  pub authors:  f64,
  /// Publication year
  pub year:     f64,
  /// Publication type flags
  pub pub_type: f64,
  /// Category
  pub tags:     f64,
  /// Leading number
  pub number:   f64,
  /// arXiv id
  pub arxiv:    f64,
  /// DOI
  pub doi:      f64,
}

impl FieldValues {
  /// The values in field order.
  fn values(&self) -> [f64; 9] {
    [
      self.bibtex,
      self.title,
      self.authors,
      self.year,
      self.pub_type,
      self.tags,
      self.number,
      self.arxiv,
      self.doi,
    ]
  }
}

/// Removes spaces, hyphens and colons and lowercases.
pub fn normalize(text: &str) -> String {
  text.chars().filter(|c| !matches!(c, ' ' | '-' | ':')).flat_map(char::to_lowercase).collect()
}

/// Edit distance between two sequences.
fn levenshtein<T: PartialEq>(a: &[T], b: &[T]) -> usize {
  let mut previous: Vec<usize> = (0..=b.len()).collect();
  let mut current = vec![0; b.len() + 1];
  for (i, x) in a.iter().enumerate() {
    current[0] = i + 1;
    for (j, y) in b.iter().enumerate() {
      let substitution = previous[j] + usize::from(x != y);
      current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
    }
    std::mem::swap(&mut previous, &mut current);
  }
  previous[b.len()]
}

/// Edit distance scaled to `[0, 1]`.
///
/// The distance is capped at `max(3, longest / 3)`. Anything further apart
/// than the cap is at distance 1.
///
/// ```
/// use refpapers::duplicates::distance::scaled_lev;
///
/// assert_eq!(scaled_lev("bojar2017findings", "bojar2017findings"), 0.0);
/// assert_eq!(scaled_lev("abc", "abd"), 0.25);
/// assert_eq!(scaled_lev("abc", "xyz123"), 1.0);
/// ```
pub fn scaled_lev(a: &str, b: &str) -> f64 {
  let a: Vec<char> = a.chars().collect();
  let b: Vec<char> = b.chars().collect();
  let cap = 3.max(a.len().max(b.len()) / 3);
  let distance = levenshtein(&a, &b).min(cap + 1);
  distance as f64 / (cap + 1) as f64
}

/// One minus the fraction of the shorter sequence that is a common prefix.
///
/// Two empty sequences are equal, an empty and a non-empty one are completely
/// different.
pub fn prefix_match<T: PartialEq>(a: &[T], b: &[T]) -> f64 {
  let shortest = a.len().min(b.len());
  if shortest == 0 {
    return if a.len() == b.len() { 0.0 } else { 1.0 };
  }
  let common = a.iter().zip(b).take_while(|(x, y)| x == y).count();
  1.0 - common as f64 / shortest as f64
}

/// [`prefix_match`] over the characters of two strings.
fn prefix_match_str(a: &str, b: &str) -> f64 {
  prefix_match(&a.chars().collect::<Vec<_>>(), &b.chars().collect::<Vec<_>>())
}

/// Jaccard distance, 0 for two empty sets.
pub fn set_distance<T: Eq + Hash>(a: &HashSet<T>, b: &HashSet<T>) -> f64 {
  let union = a.union(b).count();
  if union == 0 {
    return 0.0;
  }
  1.0 - a.intersection(b).count() as f64 / union as f64
}

/// Jaccard distance of the items of two slices.
fn slice_set_distance<T: Eq + Hash>(a: &[T], b: &[T]) -> f64 {
  set_distance(&a.iter().collect(), &b.iter().collect())
}

/// Distance between citation keys.
pub fn bibtex_distance(a: &Paper, b: &Paper) -> f64 {
  let (a, b) = (a.bibtex.to_string(), b.bibtex.to_string());
  scaled_lev(&a, &b).min(prefix_match_str(&a, &b))
}

/// Distance between titles, ignoring case, spaces, hyphens and colons.
pub fn title_distance(a: &Paper, b: &Paper) -> f64 {
  scaled_lev(&normalize(&a.title), &normalize(&b.title)).min(prefix_match_str(&a.title, &b.title))
}

/// Distance between author lists.
///
/// Mostly the shared prefix of the named authors, then their overlap in any
/// order, then whether both lists were truncated.
pub fn author_distance(a: &Paper, b: &Paper) -> f64 {
  let named = |paper: &Paper| -> Vec<String> {
    paper.authors.iter().filter(|author| *author != ET_AL).cloned().collect()
  };
  let (a_named, b_named) = (named(a), named(b));
  let et_al = if a.has_et_al() == b.has_et_al() { 0.0 } else { 1.0 };
  let parts = [(1.0, et_al), (5.0, prefix_match(&a_named, &b_named)), (2.0, slice_set_distance(&a_named, &b_named))];
  weighted_mean(&parts)
}

/// Squared year difference, saturating at [`MAX_YEAR_DIFF`].
pub fn year_distance(a: &Paper, b: &Paper) -> f64 {
  let diff = a.year.abs_diff(b.year).min(MAX_YEAR_DIFF);
  (diff * diff) as f64 / (MAX_YEAR_DIFF * MAX_YEAR_DIFF) as f64
}

/// Distance between optional identifiers.
///
/// A paper with an identifier and one without are at `one_missing`.
fn identifier_distance(a: Option<&str>, b: Option<&str>, one_missing: f64) -> f64 {
  match (a, b) {
    (None, None) => 0.0,
    (Some(a), Some(b)) => prefix_match_str(a, b),
    _ => one_missing,
  }
}

/// Distance between arXiv ids.
pub fn arxiv_distance(a: &Paper, b: &Paper) -> f64 { identifier_distance(a.arxiv.as_deref(), b.arxiv.as_deref(), 0.5) }

/// Distance between DOIs.
pub fn doi_distance(a: &Paper, b: &Paper) -> f64 { identifier_distance(a.doi.as_deref(), b.doi.as_deref(), 1.0) }

/// 0 if both papers have the same leading number or neither has one.
pub fn number_distance(a: &Paper, b: &Paper) -> f64 { if a.number == b.number { 0.0 } else { 1.0 } }

/// Weighted mean of `(weight, distance)` pairs.
fn weighted_mean(parts: &[(f64, f64)]) -> f64 {
  let total: f64 = parts.iter().map(|(weight, _)| weight).sum();
  parts.iter().map(|(weight, distance)| weight * distance).sum::<f64>() / total
}

/// Field distances between two papers, per field.
pub fn field_distances(a: &Paper, b: &Paper) -> FieldValues {
  FieldValues {
    bibtex:   bibtex_distance(a, b),
    title:    title_distance(a, b),
    authors:  author_distance(a, b),
    year:     year_distance(a, b),
    pub_type: slice_set_distance(&a.pub_type, &b.pub_type),
    tags:     slice_set_distance(&a.tags, &b.tags),
    number:   number_distance(a, b),
    arxiv:    arxiv_distance(a, b),
    doi:      doi_distance(a, b),
  }
}

/// Weighted mean of all field distances, in `[0, 1]`.
pub fn paper_distance(a: &Paper, b: &Paper) -> f64 {
  let distances = field_distances(a, b).values();
  let parts: Vec<(f64, f64)> = WEIGHTS.values().into_iter().zip(distances).collect();
  weighted_mean(&parts)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse(name: &str) -> Paper {
    let root = Path::new("/data");
    filename::parse(&root.join(name), root, &HashMap::new()).unwrap()
  }

  fn samples() -> Vec<Paper> {
    vec![
      parse("nlp/Bojar_etAl_-_FindingsOfThe2017Conference_2017.pdf"),
      parse("nlp/Bojar_etAl_-_FindingsOfThe2018Conference_2018.pdf"),
      parse("Bojar_Chatterjee_-_FindingsOfThe2017Conference_survey_2017.pdf"),
      parse("3_Vaswani_etAl_-_AttentionIsAllYouNeed_2017.pdf"),
      parse("Smith_-_X_1990.djvu").with_ids(Some("10.1000/x".into()), Some("2004.04002".into())),
    ]
  }

  #[test]
  fn test_levenshtein() {
    let chars = |s: &str| s.chars().collect::<Vec<_>>();
    assert_eq!(levenshtein(&chars("kitten"), &chars("sitting")), 3);
    assert_eq!(levenshtein(&chars(""), &chars("abc")), 3);
    assert_eq!(levenshtein(&chars("flaw"), &chars("lawn")), 2);
  }

  #[test]
  fn test_scaled_lev_cap() {
    // cap grows with length: 30 chars allows 10 edits
    let a = "a".repeat(30);
    let b = format!("{}{}", "a".repeat(25), "b".repeat(5));
    assert!((scaled_lev(&a, &b) - 5.0 / 11.0).abs() < 1e-9);
    assert_eq!(scaled_lev(&a, &"b".repeat(30)), 1.0);
  }

  #[test]
  fn test_prefix_match() {
    assert_eq!(prefix_match_str("abc", "abd"), 1.0 - 2.0 / 3.0);
    assert_eq!(prefix_match_str("abc", "abcdef"), 0.0);
    assert_eq!(prefix_match_str("", ""), 0.0);
    assert_eq!(prefix_match_str("", "a"), 1.0);
    assert_eq!(prefix_match(&["Bojar", "Chatterjee"], &["Bojar"]), 0.0);
  }

  #[test]
  fn test_set_distance() {
    let set = |items: &[&'static str]| items.iter().copied().collect::<HashSet<_>>();
    assert_eq!(set_distance(&set(&[]), &set(&[])), 0.0);
    assert_eq!(set_distance(&set(&["a", "b"]), &set(&["b", "c"])), 1.0 - 1.0 / 3.0);
  }

  #[test]
  fn test_normalize() {
    assert_eq!(normalize("Neural Machine-Translation: A Survey"), "neuralmachinetranslationasurvey");
  }

  #[test]
  fn test_field_distances() {
    let papers = samples();
    assert_eq!(year_distance(&papers[0], &papers[1]), 0.01);
    assert_eq!(year_distance(&papers[3], &papers[4]), 1.0);
    assert_eq!(number_distance(&papers[0], &papers[3]), 1.0);
    assert_eq!(doi_distance(&papers[0], &papers[4]), 1.0);
    assert_eq!(arxiv_distance(&papers[4], &papers[0]), 0.5);
    assert_eq!(author_distance(&papers[0], &papers[1]), 0.0);
    // etAl mismatch and one extra named author
    let distance = author_distance(&papers[0], &papers[2]);
    assert!((distance - (1.0 + 2.0 * 0.5) / 8.0).abs() < 1e-9, "{distance}");
  }

  #[test]
  fn test_paper_distance_properties() {
    let papers = samples();
    for a in &papers {
      assert_eq!(paper_distance(a, a), 0.0, "{}", a.path.display());
      for b in &papers {
        let distance = paper_distance(a, b);
        assert!((0.0..=1.0).contains(&distance));
        assert_eq!(distance, paper_distance(b, a), "{} {}", a.path.display(), b.path.display());
      }
    }
  }

  #[test]
  fn test_near_duplicates_are_close() {
    let papers = samples();
    assert!(paper_distance(&papers[0], &papers[1]) < 0.35);
    assert!(paper_distance(&papers[0], &papers[3]) > 0.35);
  }
}
