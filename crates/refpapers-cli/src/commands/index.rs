//! Refreshing the search index.

use refpapers::{git::Git, indexer::Indexer, state::StoredState};

use super::*;

/// Arguments of [`Commands::Index`]
#[derive(Args, Clone)]
pub struct IndexArgs {
  /// Perform a full indexing, as opposed to incremental
  #[arg(long)]
  pub full: bool,
}

/// Function for the [`Commands::Index`] in the CLI.
pub async fn index<I: UserInteraction>(interaction: &I, context: &Context, args: IndexArgs) -> Result<()> {
  let mut db = context.open_db().await?;
  let git = Git::new(&context.config.paths.data);
  let state = StoredState::new(&context.confdir);
  let mut indexer = Indexer::new(&context.config, state, context.decisions()?);
  let report = indexer.run(&mut db, &git, args.full).await?;

  for reason in &report.reasons {
    interaction.reply(ResponseContent::Info(&format!("{reason}, performing full indexing")))?;
  }
  for warning in &report.warnings {
    interaction.reply(ResponseContent::Warning(&warning.to_string()))?;
  }
  if report.is_up_to_date() {
    return interaction.reply(ResponseContent::Success("Up to date, nothing to index"));
  }
  let mut summary = format!(
    "Indexed {} papers ({} added/{} deleted) in {:.2} seconds",
    report.changed(),
    report.added,
    report.deleted,
    report.elapsed.as_secs_f64()
  );
  if let Some(per_paper) = report.per_paper() {
    summary.push_str(&format!(" ({:.3} s per paper)", per_paper.as_secs_f64()));
  }
  interaction.reply(ResponseContent::Success(&summary))?;
  if report.skipped > 0 {
    interaction.reply(ResponseContent::Info(&format!(
      "Skipped {} files that did not parse or were already indexed, see `refpapers check`",
      report.skipped
    )))?;
  }
  Ok(())
}
