use super::*;

const FINDINGS: &str = "nlp/mt/Bojar_etAl_-_FindingsOfThe2017ConferenceOnMachineTranslation_2017.pdf";
const ATTENTION: &str = "nlp/Vaswani_etAl_-_AttentionIsAllYouNeed_2017.pdf";
const SUBWORDS: &str = "nlp/mt/Sennrich_Haddow_Birch_-_NeuralMachineTranslationOfRareWordsWithSubwordUnits_2016.pdf";

#[traced_test]
#[tokio::test]
async fn test_full_then_incremental() -> TestResult<()> {
  let mut library = Library::new();
  library.config.use_git = true;
  library.config.git_untracked = GitPolicy::Add;
  library.add_file(FINDINGS);
  library.add_file(ATTENTION);
  let mut db = library.open_db().await;
  let vcs = ScriptedVcs::default();
  vcs.at("c1", Vec::new());

  // first run is always full
  let report = library.indexer().run(&mut db, &vcs, false).await?;
  assert_eq!(report.mode, IndexMode::Full);
  assert_eq!(report.reasons, vec![FullReason::FirstIndexing, FullReason::NoRecordedCommit]);
  assert_eq!(report.added, 2);
  assert_eq!(db.len().await?, 2);
  assert!(logs_contain("Indexed 2 papers (2 added/0 deleted)"));

  // a commit adding one paper and removing another, plus an untracked file
  let subwords = library.add_file(SUBWORDS);
  let scratch = library.add_file("nlp/Scratch_-_NotesOnDecoding_2020.pdf");
  std::fs::remove_file(library.data.join(ATTENTION))?;
  vcs.at("c2", vec![
    IndexingAction::from_path(Action::Add, &subwords),
    IndexingAction::from_path(Action::Delete, library.data.join(ATTENTION)),
  ]);
  *vcs.status.lock().unwrap() =
    Status { staged: Vec::new(), untracked: vec![IndexingAction::from_path(Action::Untracked, &scratch)] };

  let report = library.indexer().run(&mut db, &vcs, false).await?;
  assert_eq!(report.mode, IndexMode::Incremental { from: "c1".into() });
  assert_eq!((report.added, report.deleted), (2, 1));
  assert!(vcs.calls.lock().unwrap().contains(&"diff_tree c1".to_string()));

  let titles: Vec<String> = Query::all().execute(&mut db).await?.into_iter().map(|paper| paper.title).collect();
  assert_eq!(titles, vec![
    "Findings of the2017 conference on machine translation",
    "Notes on decoding",
    "Neural machine translation of rare words with subword units",
  ]);

  // the recorded commit moved on
  let state = StoredState::new(&library.confdir);
  assert_eq!(state.read(refpapers::state::StateVariable::LastIndexedCommit)?.as_deref(), Some("c2"));
  Ok(())
}

#[traced_test]
#[tokio::test]
async fn test_rerun_is_up_to_date() -> TestResult<()> {
  let mut library = Library::new();
  library.config.use_git = true;
  library.add_file(FINDINGS);
  let mut db = library.open_db().await;
  let vcs = ScriptedVcs::default();
  vcs.at("c1", Vec::new());
  library.indexer().run(&mut db, &vcs, false).await?;

  // replaying an already applied addition changes nothing
  vcs.at("c1", vec![IndexingAction::from_path(Action::Add, library.data.join(FINDINGS))]);
  let report = library.indexer().run(&mut db, &vcs, false).await?;
  assert!(report.is_up_to_date());
  assert_eq!(report.skipped, 1);
  assert_eq!(db.len().await?, 1);
  assert!(logs_contain("Path already indexed"));
  assert!(logs_contain("Up to date, nothing to index"));
  Ok(())
}

#[traced_test]
#[tokio::test]
async fn test_categories_and_search() -> TestResult<()> {
  let library = Library::new();
  library.add_file(FINDINGS);
  library.add_file(ATTENTION);
  library.add_file(SUBWORDS);
  library.add_file("nlp/not a canonical name.pdf");
  let mut db = library.open_db().await;

  let report = library.indexer().run(&mut db, &ScriptedVcs::default(), true).await?;
  assert_eq!(report.reasons, vec![FullReason::Requested, FullReason::FirstIndexing, FullReason::GitDisabled]);
  assert_eq!(report.added, 3);
  assert_eq!(report.skipped, 1);

  let categories = AllCategories::open(&library.confdir)?;
  assert!(categories.contains(&["nlp".to_string()]));
  assert!(categories.contains(&["nlp".to_string(), "mt".to_string()]));

  let hits = Query::text("machine translation").execute(&mut db).await?;
  assert_eq!(hits.len(), 2);
  assert!(hits.iter().all(|paper| paper.tags == vec!["nlp", "mt"]));

  let best = Query::text("vaswani").first(&mut db).await?;
  assert_eq!(best.bibtex.to_string(), "vaswani2017attention");
  Ok(())
}

#[traced_test]
#[tokio::test]
async fn test_ignored_path_stays_out() -> TestResult<()> {
  let library = Library::new();
  let ignored = library.add_file(ATTENTION);
  library.add_file(FINDINGS);
  let mut decisions = Decisions::open(&library.confdir)?;
  decisions.add(Relation::Ignore, ignored.display());
  decisions.write()?;

  let mut db = library.open_db().await;
  library.indexer().run(&mut db, &ScriptedVcs::default(), false).await?;
  assert_eq!(db.len().await?, 1);
  assert!(Query::text("attention").execute(&mut db).await?.is_empty());
  Ok(())
}
