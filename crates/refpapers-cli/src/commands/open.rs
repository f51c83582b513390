//! Showing and opening the best match of a query.

use refpapers::database::{Field, Query};

use super::*;

/// Fields searched when a single paper is wanted.
const LOOKUP_FIELDS: [Field; 3] = [Field::Bibtex, Field::Authors, Field::Title];

/// The best match of a query over bibtex key, authors and title.
async fn best_match(context: &Context, query: &QueryArgs) -> Result<Paper> {
  let mut db = context.open_db().await?;
  Ok(Query::fields(query.joined(), &LOOKUP_FIELDS).first(&mut db).await?)
}

/// Function for the [`Commands::One`] in the CLI.
pub async fn one<I: UserInteraction>(interaction: &I, context: &Context, args: QueryArgs) -> Result<()> {
  match best_match(context, &args).await {
    Ok(paper) => interaction.reply(ResponseContent::Paper(&paper)),
    Err(RefpapersCliError::Refpapers(RefpapersError::NoMatch(_))) =>
      interaction.reply(ResponseContent::Info("No papers matched the query")),
    Err(e) => Err(e),
  }
}

/// Function for the [`Commands::Open`] in the CLI.
///
/// The viewer configured for the file ending is started in the background.
pub async fn open<I: UserInteraction>(interaction: &I, context: &Context, args: QueryArgs) -> Result<()> {
  let paper = best_match(context, &args).await?;
  let ending = paper.suffix().unwrap_or_default();
  let viewer = context.config.software.get_viewer(ending)?;
  let mut words = shlex::split(viewer).unwrap_or_default().into_iter();
  let program = words
    .next()
    .ok_or_else(|| RefpapersCliError::Usage(format!("Invalid viewer command \"{viewer}\" for ending {ending}")))?;
  debug!("Opening {} with {program}", paper.path.display());
  tokio::process::Command::new(&program)
    .args(words)
    .arg(&paper.path)
    .stdin(std::process::Stdio::null())
    .stdout(std::process::Stdio::null())
    .stderr(std::process::Stdio::null())
    .spawn()?;
  interaction.reply(ResponseContent::Info(&format!("Opening {}", paper.path.display())))
}
