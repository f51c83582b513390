use super::*;

const COPIES: [&str; 2] = [
  "nlp/Bojar_etAl_-_FindingsOfThe2017ConferenceOnMachineTranslation_2017.pdf",
  "inbox/Bojar_Chatterjee_-_FindingsOfThe2017ConferenceOnMachineTranslation_2017.pdf",
];
const OTHER: &str = "nlp/Vaswani_etAl_-_AttentionIsAllYouNeed_2017.pdf";

async fn indexed_library() -> (Library, Database) {
  let library = Library::new();
  for relative in COPIES.iter().chain([&OTHER]) {
    library.add_file(relative);
  }
  let mut db = library.open_db().await;
  library.indexer().run(&mut db, &ScriptedVcs::default(), true).await.unwrap();
  (library, db)
}

#[traced_test]
#[tokio::test]
async fn test_duplicates_found_and_ignored() -> TestResult<()> {
  let (library, mut db) = indexed_library().await;
  let mut decisions = Decisions::open(&library.confdir)?;

  let pairs = all_duplicates(&mut db, &decisions).await?;
  assert_eq!(pairs.len(), 1);
  let pair = &pairs[0];
  let mut paths = vec![pair.a.path.clone(), pair.b.path.clone()];
  paths.sort();
  let mut expected: Vec<PathBuf> = COPIES.iter().map(|relative| library.data.join(relative)).collect();
  expected.sort();
  assert_eq!(paths, expected);
  assert!(pair.distance < 0.35);

  mark_pair_ignored(&mut decisions, pair)?;
  let reopened = Decisions::open(&library.confdir)?;
  assert!(all_duplicates(&mut db, &reopened).await?.is_empty());
  Ok(())
}

#[traced_test]
#[tokio::test]
async fn test_close_matches_of_text() -> TestResult<()> {
  let (_library, mut db) = indexed_library().await;
  let close = find_close_matches(&mut db, &MatchQuery::Text("findings conference".into()), 10, 0.35, true).await?;
  assert_eq!(close.reference.bibtex.to_string(), "bojar2017findings");
  assert!(close.matches.iter().all(|(_, paper)| paper.authors[0] == "Bojar"));
  assert!(!close.matches.is_empty());
  Ok(())
}
