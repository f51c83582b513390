//! Finding files that do not follow the file name grammar.

use refpapers::{actions::all_actions, filename, state::Relation};

use super::*;

/// Answers to a file name problem, the first is the default.
const CHOICES: [&str; 3] = ["ok", "ignore it in the future", "quit"];

/// Function for the [`Commands::Check`] in the CLI.
pub async fn check<I: UserInteraction>(interaction: &I, context: &Context) -> Result<()> {
  let data = &context.config.paths.data;
  let mut decisions = context.decisions()?;
  let actions = all_actions(data, &context.config, &decisions)?;
  let overrides = decisions.bibtex_overrides();

  interaction.reply(ResponseContent::Heading("Filename syntax"))?;
  interaction.reply(ResponseContent::Info(
    "Checking that filenames follow the parser format. To avoid seeing these errors again, either \
     rename the file and choose ok, or ignore it in the future.",
  ))?;
  let mut problems = 0;
  let mut ignored = 0;
  for action in &actions {
    let Err(error) = filename::parse(action.path(), data, &overrides) else {
      continue;
    };
    problems += 1;
    interaction.reply(ResponseContent::Warning(&error.describe()))?;
    match interaction.choose("?", &CHOICES, 0)? {
      1 => {
        decisions.add(Relation::Ignore, error.path.display());
        ignored += 1;
      },
      2 => break,
      _ => {},
    }
  }
  decisions.write()?;

  if problems == 0 {
    interaction.reply(ResponseContent::Success(&format!("All {} file names parse", actions.len())))
  } else {
    interaction.reply(ResponseContent::Info(&format!(
      "{problems} file names did not parse, {ignored} will be ignored from now on"
    )))
  }
}
