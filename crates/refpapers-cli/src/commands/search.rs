//! Full text search, listed by category.

use std::{cmp::Ordering, collections::BTreeMap};

use refpapers::database::Query;

use super::*;

/// Field to sort search results by.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortField {
  /// File location
  Path,
  /// Bibtex key
  Bibtex,
  /// Title
  Title,
  /// Author list
  Authors,
  /// Publication year
  Year,
  /// Publication types
  PubType,
  /// Category
  Tags,
  /// Leading number
  Number,
  /// DOI
  Doi,
  /// arXiv id
  Arxiv,
}

impl SortField {
  /// Compares two papers by this field.
  pub fn compare(&self, a: &Paper, b: &Paper) -> Ordering {
    match self {
      SortField::Path => a.path.cmp(&b.path),
      SortField::Bibtex => a.bibtex.to_string().cmp(&b.bibtex.to_string()),
      SortField::Title => a.title.cmp(&b.title),
      SortField::Authors => a.authors.cmp(&b.authors),
      SortField::Year => a.year.cmp(&b.year),
      SortField::PubType => a.pub_type.cmp(&b.pub_type),
      SortField::Tags => a.tags.cmp(&b.tags),
      SortField::Number => a.number.cmp(&b.number),
      SortField::Doi => a.doi.cmp(&b.doi),
      SortField::Arxiv => a.arxiv.cmp(&b.arxiv),
    }
  }
}

/// Arguments of [`Commands::Search`]
#[derive(Args, Clone)]
pub struct SearchArgs {
  /// Search terms, in the full text query syntax
  #[arg(required = true)]
  pub query: Vec<String>,

  /// Do not group by tags
  #[arg(long)]
  pub nogroup: bool,

  /// Sort by field (default: order of relevance)
  #[arg(long, value_enum)]
  pub sort: Option<SortField>,

  /// Maximum number of results to show
  #[arg(long, default_value_t = 10)]
  pub limit: usize,
}

/// Groups papers by tags, keeping their order within each group.
///
/// A group ranks by the sum of its best and its average position in `papers`,
/// so one very relevant hit and many fairly relevant hits both pull a group
/// up.
pub fn sorted_groups(papers: Vec<Paper>) -> Vec<(Vec<String>, Vec<Paper>)> {
  let mut groups: BTreeMap<Vec<String>, Vec<(usize, Paper)>> = BTreeMap::new();
  for (rank, paper) in papers.into_iter().enumerate() {
    groups.entry(paper.tags.clone()).or_default().push((rank, paper));
  }
  let mut scored: Vec<(f64, Vec<String>, Vec<Paper>)> = groups
    .into_iter()
    .map(|(tags, ranked)| {
      let best = ranked.iter().map(|(rank, _)| *rank).min().unwrap_or(0) as f64;
      let mean = ranked.iter().map(|(rank, _)| *rank as f64).sum::<f64>() / ranked.len() as f64;
      (best + mean, tags, ranked.into_iter().map(|(_, paper)| paper).collect())
    })
    .collect();
  scored.sort_by(|(a_score, a_tags, _), (b_score, b_tags, _)| a_score.total_cmp(b_score).then_with(|| a_tags.cmp(b_tags)));
  scored.into_iter().map(|(_, tags, papers)| (tags, papers)).collect()
}

/// Function for the [`Commands::Search`] in the CLI.
pub async fn search<I: UserInteraction>(interaction: &I, context: &Context, args: SearchArgs) -> Result<()> {
  let query = args.query.join(" ");
  let mut db = context.open_db().await?;
  let mut papers = Query::text(&query).limit(args.limit).execute(&mut db).await?;
  trace!("{} hits for \"{query}\"", papers.len());
  if papers.is_empty() {
    return interaction.reply(ResponseContent::Info("No papers matched the query"));
  }
  if let Some(field) = args.sort {
    papers.sort_by(|a, b| field.compare(a, b));
  }
  if args.nogroup {
    return interaction.reply(ResponseContent::Papers(&papers));
  }
  for (tags, group) in sorted_groups(papers) {
    interaction.reply(ResponseContent::Heading(&tags.join(" / ")))?;
    interaction.reply(ResponseContent::Papers(&group))?;
  }
  Ok(())
}
