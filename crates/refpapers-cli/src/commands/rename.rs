//! Suggesting a canonical name for a new file.
//!
//! Metadata comes from Crossref if the file mentions a DOI, then from arXiv if
//! it mentions an arXiv id, and from the user otherwise, with the title embedded
//! in a PDF as the default. The category is picked among the indexed ones or
//! typed in. The file is never moved: the command prints the `mv` to run.

use std::collections::HashMap;

use refpapers::{
  api::{arxiv::Arxiv, crossref::Crossref, CachedApi, Metadata},
  database::{Field, Query},
  extract::{extract_ids, TextExtractor},
  filename,
  pdf::{PdfAnalyzer, PdfMetadata},
  state::AllCategories,
};

use super::*;

/// Number of non-empty lines of full text shown.
const HEAD_LINES: usize = 15;

/// Number of search hits consulted for a category suggestion.
const CATEGORY_HITS: usize = 10;

/// Last choice of the category menu.
const NEW_CATEGORY: &str = "new category...";

/// Arguments of [`Commands::Rename`]
#[derive(Args, Clone)]
pub struct RenameArgs {
  /// The file to name
  pub file: PathBuf,

  /// Category as slash separated tags, e.g. nlp/transformers. Asked for if not given
  #[arg(long)]
  pub category: Option<String>,
}

/// Metadata typed in by the user, `None` if it is incomplete.
///
/// The embedded PDF title, if any, is the default title.
fn prompt_metadata<I: UserInteraction>(
  interaction: &I,
  path: &Path,
  embedded: &PdfMetadata,
  max_authors: i64,
) -> Result<Option<Paper>> {
  if let Some(author) = &embedded.author {
    interaction.reply(ResponseContent::Info(&format!("Embedded author: {author}")))?;
  }
  let title = interaction.prompt("Title", embedded.title.as_deref())?;
  let year = interaction.prompt("Year", None)?;
  let authors = interaction.prompt("Authors (surnames)", None)?;
  let Some(year) = year.trim().parse::<u32>().ok().filter(|year| (1000..3000).contains(year)) else {
    return Ok(None);
  };
  let metadata = Metadata {
    title: title.trim().to_string(),
    year,
    authors: authors.split([',', ' ']).filter(|author| !author.is_empty()).map(String::from).collect(),
    doi: None,
    arxiv: None,
  };
  Ok(Paper::from_metadata(&metadata, path, max_authors))
}

/// The document information of a PDF, empty for other files or on failure.
async fn embedded_metadata(path: &Path) -> PdfMetadata {
  let is_pdf = path.extension().and_then(|ext| ext.to_str()).is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
  if !is_pdf {
    return PdfMetadata::default();
  }
  let owned = path.to_path_buf();
  match tokio::task::spawn_blocking(move || PdfAnalyzer::new().metadata(owned)).await {
    Ok(Ok(metadata)) => metadata,
    Ok(Err(e)) => {
      debug!("No embedded metadata in {}: {e}", path.display());
      PdfMetadata::default()
    },
    Err(e) => {
      debug!("Reading embedded metadata of {} failed: {e}", path.display());
      PdfMetadata::default()
    },
  }
}

/// Splits a slash separated category into tags.
fn category_tags(category: &str) -> Vec<String> {
  category.split('/').map(str::trim).filter(|tag| !tag.is_empty()).map(String::from).collect()
}

/// Asks for a category among the known ones, the suggestion first.
///
/// Picking [`NEW_CATEGORY`], or having no known categories, asks for the
/// category as text. Unknown categories are warned about.
fn pick_category<I: UserInteraction>(
  interaction: &I,
  categories: &AllCategories,
  suggestion: Option<&str>,
) -> Result<Vec<String>> {
  let mut choices: Vec<String> = suggestion.map(String::from).into_iter().collect();
  choices.extend(categories.iter().map(|tags| tags.join("/")).filter(|category| Some(category.as_str()) != suggestion));

  let category = if categories.iter().next().is_none() {
    interaction.prompt("Category", suggestion)?
  } else {
    let mut items: Vec<&str> = choices.iter().map(String::as_str).collect();
    items.push(NEW_CATEGORY);
    match interaction.choose("Category", &items, 0)? {
      chosen if chosen < choices.len() => choices[chosen].clone(),
      _ => interaction.prompt("Category", suggestion)?,
    }
  };
  let tags = category_tags(&category);
  warn_if_new(interaction, categories, &tags)?;
  Ok(tags)
}

/// Warns when `tags` has never been indexed.
fn warn_if_new<I: UserInteraction>(interaction: &I, categories: &AllCategories, tags: &[String]) -> Result<()> {
  if categories.contains(tags) {
    return Ok(());
  }
  interaction.reply(ResponseContent::Warning(&format!("New category: {}", tags.join("/"))))
}

/// The most common category among papers with similar titles.
///
/// Ties go to the category of the better ranked hit.
async fn suggest_category(context: &Context, title: &str) -> Result<Option<String>> {
  let words: Vec<String> = title
    .split(|c: char| !c.is_alphanumeric())
    .filter(|word| word.len() > 2)
    .map(|word| format!("\"{word}\""))
    .collect();
  if words.is_empty() {
    return Ok(None);
  }
  let mut db = context.open_db().await?;
  let hits = Query::fields(words.join(" OR "), &[Field::Title]).limit(CATEGORY_HITS).execute(&mut db).await?;
  let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
  for (rank, paper) in hits.iter().enumerate().filter(|(_, paper)| !paper.tags.is_empty()) {
    counts.entry(paper.tags.join("/")).or_insert((0, rank)).0 += 1;
  }
  Ok(
    counts
      .into_iter()
      .max_by(|(_, (a_count, a_rank)), (_, (b_count, b_rank))| a_count.cmp(b_count).then(b_rank.cmp(a_rank)))
      .map(|(category, _)| category),
  )
}

/// Function for the [`Commands::Rename`] in the CLI.
pub async fn rename<I: UserInteraction>(interaction: &I, context: &Context, args: RenameArgs) -> Result<()> {
  let config = &context.config;
  let file = &args.file;
  if !file.is_file() {
    return Err(RefpapersCliError::Usage(format!("No such file: {}", file.display())));
  }

  let extraction = TextExtractor::new(config).fulltext(file).await;
  interaction.reply(ResponseContent::Heading(&format!("Head of {}", file.display())))?;
  for line in extraction.text.lines().filter(|line| !line.trim().is_empty()).take(HEAD_LINES) {
    interaction.reply(ResponseContent::Text(line))?;
  }

  let (doi, arxiv) = extract_ids(&extraction.text, file, config.ids_chars, config.max_ids);
  let cache_dir = config.paths.api_cache_dir();
  let mut paper = None;
  if let Some(doi) = &doi {
    interaction.reply(ResponseContent::Info(&format!("Crossref DOI query... ({doi})")))?;
    paper = CachedApi::open(Crossref::new()?, &cache_dir)?.paper(doi, file, config.max_authors).await?;
  }
  if paper.is_none() {
    if let Some(arxiv) = &arxiv {
      interaction.reply(ResponseContent::Info(&format!("ArXiv query... ({arxiv})")))?;
      paper = CachedApi::open(Arxiv::new()?, &cache_dir)?.paper(arxiv, file, config.max_authors).await?;
    }
  }
  let paper = match paper {
    Some(paper) => {
      interaction.reply(ResponseContent::Success("Found metadata"))?;
      paper
    },
    None => match prompt_metadata(interaction, file, &embedded_metadata(file).await, config.max_authors)? {
      Some(paper) => paper,
      None => return interaction.reply(ResponseContent::Warning("Renaming failed")),
    },
  };

  let categories = AllCategories::open(&context.confdir)?;
  let tags = match args.category {
    Some(category) => {
      let tags = category_tags(&category);
      warn_if_new(interaction, &categories, &tags)?;
      tags
    },
    None => {
      let suggestion = suggest_category(context, &paper.title).await?;
      pick_category(interaction, &categories, suggestion.as_deref())?
    },
  };
  let suffix = file.extension().and_then(|ext| ext.to_str()).unwrap_or("pdf");
  let target = filename::generate(&paper, Some(&config.paths.data), Some(&tags), suffix);
  let paper = paper.with_path(target).with_tags(tags);

  interaction.reply(ResponseContent::Paper(&paper))?;
  if interaction.confirm("Apply the rename", true)? {
    interaction.reply(ResponseContent::Command(&format!(
      "mv -i \"{}\" \"{}\"",
      file.display(),
      paper.path.display()
    )))?;
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use std::cell::RefCell;

  use super::*;

  /// Answers prompts and menus from scripts and records replies.
  ///
  /// An empty answer takes the default, as on the terminal.
  struct Scripted {
    answers: RefCell<Vec<String>>,
    choices: RefCell<Vec<usize>>,
    offered: RefCell<Vec<Vec<String>>>,
    replies: RefCell<Vec<String>>,
  }

  impl Scripted {
    fn new(answers: &[&str]) -> Self {
      Self {
        answers: RefCell::new(answers.iter().rev().map(|answer| answer.to_string()).collect()),
        choices: RefCell::new(Vec::new()),
        offered: RefCell::new(Vec::new()),
        replies: RefCell::new(Vec::new()),
      }
    }

    fn choosing(self, choices: &[usize]) -> Self {
      *self.choices.borrow_mut() = choices.iter().rev().copied().collect();
      self
    }
  }

  impl UserInteraction for Scripted {
    fn confirm(&self, _message: &str, default: bool) -> Result<bool> { Ok(default) }

    fn prompt(&self, _message: &str, default: Option<&str>) -> Result<String> {
      let answer = self.answers.borrow_mut().pop().filter(|answer| !answer.is_empty());
      Ok(answer.or(default.map(String::from)).unwrap_or_default())
    }

    fn choose(&self, _message: &str, choices: &[&str], default: usize) -> Result<usize> {
      self.offered.borrow_mut().push(choices.iter().map(|choice| choice.to_string()).collect());
      Ok(self.choices.borrow_mut().pop().unwrap_or(default))
    }

    fn reply(&self, content: ResponseContent) -> Result<()> {
      self.replies.borrow_mut().push(format!("{content:?}"));
      Ok(())
    }
  }

  fn known_categories(dir: &Path) -> AllCategories {
    let mut categories = AllCategories::open(dir).unwrap();
    categories.add(&["nlp".to_string(), "mt".to_string()]);
    categories.add(&["vision".to_string()]);
    categories
  }

  #[test]
  fn test_prompt_metadata() {
    let interaction = Scripted::new(&["Attention is all you need", "2017", "Vaswani, Shazeer Parmar"]);
    let embedded = PdfMetadata::default();
    let paper = prompt_metadata(&interaction, Path::new("/tmp/download.pdf"), &embedded, 3).unwrap().unwrap();
    assert_eq!(paper.authors, vec!["Vaswani", "Shazeer", "Parmar"]);
    assert_eq!(paper.bibtex.to_string(), "vaswani2017attention");
    assert_eq!(paper.path, Path::new("/tmp/download.pdf"));
  }

  #[test]
  fn test_prompt_metadata_defaults_to_embedded_title() {
    let interaction = Scripted::new(&["", "2017", "Vaswani"]);
    let embedded =
      PdfMetadata { title: Some("Attention is all you need".into()), author: Some("Ashish Vaswani".into()) };
    let paper = prompt_metadata(&interaction, Path::new("/tmp/download.pdf"), &embedded, -1).unwrap().unwrap();
    assert_eq!(paper.title, "Attention is all you need");
    assert!(interaction.replies.borrow()[0].contains("Embedded author: Ashish Vaswani"));
  }

  #[test]
  fn test_prompt_metadata_needs_a_year() {
    let embedded = PdfMetadata::default();
    let interaction = Scripted::new(&["Attention is all you need", "recent", "Vaswani"]);
    assert!(prompt_metadata(&interaction, Path::new("/tmp/download.pdf"), &embedded, -1).unwrap().is_none());
    let interaction = Scripted::new(&["", "2017", "Vaswani"]);
    assert!(prompt_metadata(&interaction, Path::new("/tmp/download.pdf"), &embedded, -1).unwrap().is_none());
  }

  #[tokio::test]
  async fn test_embedded_metadata_of_broken_pdf_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("broken.pdf");
    std::fs::write(&file, "%PDF-1.4").unwrap();
    assert_eq!(embedded_metadata(&file).await, PdfMetadata::default());
    assert_eq!(embedded_metadata(Path::new("/tmp/notes.djvu")).await, PdfMetadata::default());
  }

  #[test]
  fn test_known_categories_are_offered() {
    let dir = tempfile::tempdir().unwrap();
    let categories = known_categories(dir.path());

    let interaction = Scripted::new(&[]);
    let tags = pick_category(&interaction, &categories, Some("vision")).unwrap();
    assert_eq!(tags, vec!["vision"]);
    assert_eq!(interaction.offered.borrow()[0], vec!["vision", "nlp/mt", NEW_CATEGORY]);
    assert!(interaction.replies.borrow().is_empty());

    let interaction = Scripted::new(&[]).choosing(&[1]);
    let tags = pick_category(&interaction, &categories, None).unwrap();
    assert_eq!(tags, vec!["vision"]);
  }

  #[test]
  fn test_new_category_is_warned_about() {
    let dir = tempfile::tempdir().unwrap();
    let categories = known_categories(dir.path());
    let interaction = Scripted::new(&["robotics/ grasping"]).choosing(&[2]);
    let tags = pick_category(&interaction, &categories, None).unwrap();
    assert_eq!(tags, vec!["robotics", "grasping"]);
    assert_eq!(interaction.replies.borrow().as_slice(), ["Warning(\"New category: robotics/grasping\")"]);
  }

  #[test]
  fn test_without_known_categories_the_suggestion_is_the_default() {
    let dir = tempfile::tempdir().unwrap();
    let categories = AllCategories::open(dir.path()).unwrap();
    let interaction = Scripted::new(&[]);
    let tags = pick_category(&interaction, &categories, Some("nlp/mt")).unwrap();
    assert_eq!(tags, vec!["nlp", "mt"]);
    assert!(interaction.offered.borrow().is_empty());
  }

  #[tokio::test]
  async fn test_rename_prints_move() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("papers");
    let file = dir.path().join("1706.03762.pdf");
    std::fs::write(&file, "").unwrap();
    let mut config = Config::new(&data, dir.path().join("index"));
    config.software.extractors.insert("pdf".into(), "none".into());
    let context = Context { config, confdir: dir.path().join("conf") };

    let interaction = Scripted::new(&["Attention is all you need", "2017", "Vaswani Shazeer"]);
    let args = RenameArgs { file: file.clone(), category: Some("nlp/transformers".into()) };
    rename(&interaction, &context, args).await.unwrap();

    let target = data.join("nlp/transformers/Vaswani_Shazeer_-_AttentionIsAllYouNeed_2017.pdf");
    let expected = format!("Command(\"mv -i \\\"{}\\\" \\\"{}\\\"\")", file.display(), target.display());
    let replies = interaction.replies.borrow();
    assert_eq!(replies.last(), Some(&expected));
  }
}
