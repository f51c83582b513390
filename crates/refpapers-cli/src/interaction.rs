//! Everything the commands show to and ask from the user.

use console::Term;
use dialoguer::{Confirm, Input, Select};
use refpapers::paper::PubType;

use super::*;

/// Prefix for information messages
pub static INFO_PREFIX: &str = "ℹ ";
/// Prefix for success messages
pub static SUCCESS_PREFIX: &str = "✓ ";
/// Prefix for warning messages
pub static WARNING_PREFIX: &str = "! ";
/// Prefix for error messages
pub static ERROR_PREFIX: &str = "✗ ";
/// Prefix for commands to copy
pub static PROMPT_PREFIX: &str = "❯ ";
/// Rule in front of headings
pub static RULE_PREFIX: &str = "── ";
/// Marker of list items
pub static BULLET: &str = "•";

/// Longer author lists are cut in paper lists.
const MAX_LEN_AUTHORS: usize = 50;

/// Something to show the user.
#[derive(Debug)]
pub enum ResponseContent<'a> {
  /// Full details of one paper
  Paper(&'a Paper),
  /// A compact list of papers
  Papers(&'a [Paper]),
  /// A section heading
  Heading(&'a str),
  /// Plain text, printed as is
  Text(&'a str),
  /// A shell command for the user to run
  Command(&'a str),
  /// A completed step
  Success(&'a str),
  /// Something the user should look at
  Warning(&'a str),
  /// Anything else
  Info(&'a str),
}

/// The user's side of a command.
pub trait UserInteraction {
  /// Asks a yes/no question.
  fn confirm(&self, message: &str, default: bool) -> Result<bool>;

  /// Asks for a line of text.
  fn prompt(&self, message: &str, default: Option<&str>) -> Result<String>;

  /// Asks to pick one of `choices`, returning its index.
  fn choose(&self, message: &str, choices: &[&str], default: usize) -> Result<usize>;

  /// Shows something.
  fn reply(&self, content: ResponseContent) -> Result<()>;
}

/// Interaction on the terminal.
pub struct Terminal {
  /// Answer every question with its default without asking
  accept_defaults: bool,
  /// Standard output
  term:            Term,
}

impl Terminal {
  /// A terminal, optionally answering all questions with their defaults.
  pub fn new(accept_defaults: bool) -> Self { Self { accept_defaults, term: Term::stdout() } }
}

impl UserInteraction for Terminal {
  fn confirm(&self, message: &str, default: bool) -> Result<bool> {
    if self.accept_defaults {
      return Ok(default);
    }
    Ok(Confirm::new().with_prompt(message).default(default).interact()?)
  }

  fn prompt(&self, message: &str, default: Option<&str>) -> Result<String> {
    if self.accept_defaults {
      return Ok(default.unwrap_or_default().to_string());
    }
    let mut input = Input::<String>::new().with_prompt(message).allow_empty(true);
    if let Some(default) = default {
      input = input.default(default.to_string());
    }
    Ok(input.interact_text()?)
  }

  fn choose(&self, message: &str, choices: &[&str], default: usize) -> Result<usize> {
    if self.accept_defaults {
      return Ok(default);
    }
    Ok(Select::new().with_prompt(message).items(choices).default(default).interact()?)
  }

  fn reply(&self, content: ResponseContent) -> Result<()> {
    match content {
      ResponseContent::Paper(paper) =>
        for line in render_details(paper) {
          self.term.write_line(&line)?;
        },
      ResponseContent::Papers(papers) =>
        for line in render_list(papers) {
          self.term.write_line(&line)?;
        },
      ResponseContent::Heading(heading) =>
        self.term.write_line(&format!("{}{}", style(RULE_PREFIX).cyan().dim(), style(heading).cyan().bold()))?,
      ResponseContent::Text(text) => self.term.write_line(text)?,
      ResponseContent::Command(command) =>
        self.term.write_line(&format!("{}{}", style(PROMPT_PREFIX).dim(), command))?,
      ResponseContent::Success(message) =>
        self.term.write_line(&format!("{}{}", style(SUCCESS_PREFIX).green(), message))?,
      ResponseContent::Warning(message) =>
        self.term.write_line(&format!("{}{}", style(WARNING_PREFIX).yellow().bold(), style(message).yellow()))?,
      ResponseContent::Info(message) =>
        self.term.write_line(&format!("{}{}", style(INFO_PREFIX).blue(), message))?,
    }
    Ok(())
  }
}

/// Short marker of a publication type in paper lists.
fn flag(pub_type: &PubType) -> &'static str {
  match pub_type {
    PubType::Book => "B",
    PubType::Slides => "Pres",
    PubType::Survey => "S",
    PubType::Thesis => "T",
  }
}

/// Comma separated authors, cut to `etAl` if long and `truncate` is set.
pub fn render_authors(authors: &[String], truncate: bool) -> String {
  let Some((first, rest)) = authors.split_first() else {
    return String::new();
  };
  if rest.is_empty() {
    return first.clone();
  }
  if truncate && authors.join(", ").len() > MAX_LEN_AUTHORS {
    return format!("{first}, etAl");
  }
  format!("{first}, {}", rest.join(", "))
}

/// Two lines per paper: the bibtex key with flags and authors, then the title.
pub fn render_list(papers: &[Paper]) -> Vec<String> {
  let left = papers.iter().map(|paper| paper.bibtex.author.len()).max().unwrap_or(0).max(9) + 1;
  let right = papers.iter().map(|paper| paper.bibtex.word.len()).max().unwrap_or(0) + 1;
  let mut lines = Vec::with_capacity(papers.len() * 2);
  for paper in papers {
    let flags: String = paper.pub_type.iter().map(flag).collect();
    lines.push(format!(
      "{BULLET} {}{} {}{:>4}  {}",
      style(format!("{:<left$}", paper.bibtex.author)).cyan().dim(),
      style(paper.bibtex.year).bold(),
      style(format!("{:<right$}", paper.bibtex.word)).cyan().dim(),
      style(flags).red(),
      render_authors(&paper.authors, true),
    ));
    lines.push(format!("{:indent$}{}", "", style(&paper.title).cyan(), indent = left + right + 13));
  }
  lines
}

/// Title, path, key, all authors, publication types, tags and identifiers.
pub fn render_details(paper: &Paper) -> Vec<String> {
  let mut ids = Vec::new();
  if let Some(doi) = &paper.doi {
    ids.push(format!("DOI: {doi}"));
  }
  if let Some(arxiv) = &paper.arxiv {
    ids.push(format!("arXiv:{arxiv}"));
  }
  let pub_types = paper.pub_type.iter().map(PubType::as_str).collect::<Vec<_>>().join(", ");
  vec![
    format!("{}{}", style(RULE_PREFIX).cyan().dim(), style(&paper.title).cyan().bold()),
    format!("{}", style(paper.path.display()).dim()),
    format!(
      "  {:<35} {}",
      format!("{}{}{}", paper.bibtex.author, paper.bibtex.year, paper.bibtex.word),
      render_authors(&paper.authors, false)
    ),
    format!("  {:<35} {}    {}", pub_types, paper.tags.join(" / "), ids.join("\t\t")).trim_end().to_string(),
  ]
}
