//! Resolving likely duplicates.

use refpapers::duplicates::{
  all_duplicates, find_close_matches, mark_pair_ignored, MatchQuery, DEFAULT_LIMIT, DEFAULT_MAX_DISTANCE,
};

use super::*;

/// Answers to a duplicate pair, the last is the default.
const CHOICES: [&str; 4] = ["delete the 1st paper", "delete the 2nd paper", "ignore it in the future", "skip"];

/// Arguments of [`Commands::Duplicates`]
#[derive(Args, Clone)]
pub struct DuplicatesArgs {
  /// Only show the papers closest to the best match of this query
  #[arg(long)]
  pub query: Option<String>,

  /// Number of candidates compared with each paper
  #[arg(long, default_value_t = DEFAULT_LIMIT)]
  pub limit: usize,

  /// Largest distance still considered a duplicate
  #[arg(long, default_value_t = DEFAULT_MAX_DISTANCE)]
  pub max_distance: f64,
}

/// Function for the [`Commands::Duplicates`] in the CLI.
pub async fn duplicates<I: UserInteraction>(
  interaction: &I,
  context: &Context,
  args: DuplicatesArgs,
) -> Result<()> {
  let mut db = context.open_db().await?;
  if let Some(query) = args.query {
    let close = find_close_matches(&mut db, &MatchQuery::Text(query), args.limit, args.max_distance, false).await?;
    interaction.reply(ResponseContent::Paper(&close.reference))?;
    if close.matches.is_empty() {
      return interaction.reply(ResponseContent::Info("No close matches"));
    }
    for (distance, paper) in &close.matches {
      interaction.reply(ResponseContent::Info(&format!("Distance: {distance:.3}")))?;
      interaction.reply(ResponseContent::Paper(paper))?;
    }
    return Ok(());
  }

  let mut decisions = context.decisions()?;
  let pairs = all_duplicates(&mut db, &decisions).await?;
  if pairs.is_empty() {
    return interaction.reply(ResponseContent::Success("No duplicates found"));
  }
  let total = pairs.len();
  for (i, pair) in pairs.iter().enumerate() {
    interaction.reply(ResponseContent::Info(&format!("Duplicate {}/{total}. Distance: {:.3}", i + 1, pair.distance)))?;
    interaction.reply(ResponseContent::Paper(&pair.a))?;
    interaction.reply(ResponseContent::Paper(&pair.b))?;
    match interaction.choose("How to resolve?", &CHOICES, CHOICES.len() - 1)? {
      0 => {
        interaction.reply(ResponseContent::Warning("You can delete the 1st file by copypasting this command:"))?;
        interaction.reply(ResponseContent::Command(&format!("rm \"{}\"", pair.a.path.display())))?;
      },
      1 => {
        interaction.reply(ResponseContent::Warning("You can delete the 2nd file by copypasting this command:"))?;
        interaction.reply(ResponseContent::Command(&format!("rm \"{}\"", pair.b.path.display())))?;
      },
      2 => mark_pair_ignored(&mut decisions, pair)?,
      _ => {},
    }
  }
  Ok(())
}
