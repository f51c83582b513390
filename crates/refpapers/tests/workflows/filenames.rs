use std::collections::HashMap;

use super::*;

fn parse(root: &Path, relative: &str) -> refpapers::paper::Paper {
  filename::parse(&root.join(relative), root, &HashMap::new()).unwrap()
}

#[test]
fn test_canonical_names_round_trip() {
  let root = Path::new("/home/me/papers");
  for relative in [
    "nlp/Bojar_etAl_-_FindingsOfThe2017Conference_2017.pdf",
    "nlp/mt/Sennrich_Haddow_Birch_-_NeuralMachineTranslationOfRareWordsWithSubwordUnits_2016.pdf",
    "ml/surveys/Ruder_-_AnOverviewOfGradientDescentOptimizationAlgorithms_survey_2016.pdf",
    "books/3_Manning_Schutze_-_FoundationsOfStatisticalNaturalLanguageProcessing_book_1999.djvu",
  ] {
    let paper = parse(root, relative);
    let generated = filename::generate(&paper, Some(root), None, paper.suffix().unwrap());
    assert_eq!(generated, root.join(relative));
  }
}

#[test]
fn test_retagging_moves_the_file() {
  let root = Path::new("/data");
  let paper = parse(root, "inbox/Vaswani_etAl_-_AttentionIsAllYouNeed_2017.pdf");
  let tags = vec!["nlp".to_string(), "transformers".to_string()];
  let moved = filename::generate(&paper, Some(root), Some(&tags), "pdf");
  assert_eq!(moved, Path::new("/data/nlp/transformers/Vaswani_etAl_-_AttentionIsAllYouNeed_2017.pdf"));
}

#[test]
fn test_override_changes_only_the_key() {
  let root = Path::new("/data");
  let path = root.join("nlp/Bojar_etAl_-_FindingsOfThe2017Conference_2017.pdf");
  let overrides = HashMap::from([(path.clone(), "wmt2017findings".to_string())]);
  let paper = filename::parse(&path, root, &overrides).unwrap();
  assert_eq!(paper.bibtex.to_string(), "wmt2017findings");
  assert_eq!(paper.authors, vec!["Bojar", "etAl"]);
  assert_eq!(filename::generate(&paper, Some(root), None, "pdf"), path);
}
