use super::*;

/// Helper function to set up a test database
async fn setup_test_db() -> (Database, PathBuf, tempfile::TempDir) {
  let dir = tempdir().unwrap();
  let path = dir.path().join("index").join("refpapers.db");
  let db = Database::open(&path).await.unwrap();
  (db, path, dir)
}

fn paper(path: &str, authors: &[&str], title: &str, year: u32) -> Paper {
  Paper {
    path: PathBuf::from(path),
    bibtex: BibtexKey::new(authors[0].to_lowercase(), year, BibtexKey::title_word(title)),
    title: title.into(),
    authors: authors.iter().map(|author| author.to_string()).collect(),
    year,
    pub_type: vec![],
    tags: vec![],
    number: None,
    doi: None,
    arxiv: None,
  }
}

fn bojar() -> Paper {
  Paper {
    pub_type: vec![PubType::Survey, PubType::Thesis],
    tags: vec!["nlp".into(), "machineTranslation".into()],
    number: Some("2".into()),
    doi: Some("10.18653/v1/W17-4717".into()),
    arxiv: Some("1707.01234v2".into()),
    ..paper(
      "/data/nlp/machineTranslation/2_Bojar_etAl_-_FindingsOfThe2017Conference_survey_thesis_2017.pdf",
      &["Bojar", "etAl"],
      "Findings of the 2017 Conference",
      2017,
    )
  }
}

/// Indexes the given documents in one commit.
async fn index(db: &mut Database, documents: Vec<Document>) {
  let mut commit = Commit::new();
  for document in documents {
    commit.add(document);
  }
  commit.execute(db).await.unwrap();
}

fn paths(papers: &[Paper]) -> Vec<&Path> { papers.iter().map(|paper| paper.path.as_path()).collect() }

#[traced_test]
#[tokio::test]
async fn test_database_creation() {
  let (db, path, _dir) = setup_test_db().await;
  assert!(path.exists());
  assert!(db.is_empty().await.unwrap());
}

#[traced_test]
#[tokio::test]
async fn test_reopen_keeps_documents() {
  let (mut db, path, _dir) = setup_test_db().await;
  index(&mut db, vec![Document::new(bojar(), "")]).await;
  drop(db);
  let db = Database::open(&path).await.unwrap();
  assert_eq!(db.len().await.unwrap(), 1);
}

#[traced_test]
#[tokio::test]
async fn test_stored_fields_rebuild_paper() {
  let (mut db, _path, _dir) = setup_test_db().await;
  let paper = bojar();
  index(&mut db, vec![Document::new(paper.clone(), "body text")]).await;

  let found = Query::by_path(&paper.path).execute(&mut db).await.unwrap();
  assert_eq!(found, vec![paper]);
}

#[traced_test]
#[tokio::test]
async fn test_optional_fields_absent() {
  let (mut db, _path, _dir) = setup_test_db().await;
  let plain = paper("/data/Sennrich_-_RareWords_2016.pdf", &["Sennrich"], "Rare words", 2016);
  index(&mut db, vec![Document::new(plain.clone(), "")]).await;
  let found = Query::all().execute(&mut db).await.unwrap();
  assert_eq!(found, vec![plain]);
}

#[traced_test]
#[tokio::test]
async fn test_text_query() {
  let (mut db, _path, _dir) = setup_test_db().await;
  index(&mut db, vec![
    Document::new(bojar(), ""),
    Document::new(paper("/d/Vaswani_-_Attention_2017.pdf", &["Vaswani"], "Attention is all you need", 2017), ""),
  ])
  .await;

  let found = Query::text("attention").execute(&mut db).await.unwrap();
  assert_eq!(paths(&found), vec![Path::new("/d/Vaswani_-_Attention_2017.pdf")]);
  assert!(Query::text("transformer").execute(&mut db).await.unwrap().is_empty());
}

#[traced_test]
#[tokio::test]
async fn test_bibtex_runs_are_searchable() {
  let (mut db, _path, _dir) = setup_test_db().await;
  index(&mut db, vec![Document::new(bojar(), "")]).await;

  for query in ["bojar2017findings", "bojar 2017", "findings"] {
    let found = Query::fields(query, &[Field::Bibtex]).execute(&mut db).await.unwrap();
    assert_eq!(found.len(), 1, "{query}");
  }
}

#[traced_test]
#[tokio::test]
async fn test_body_is_searchable_but_not_stored() {
  let (mut db, _path, _dir) = setup_test_db().await;
  index(&mut db, vec![Document::new(bojar(), "byte pair encoding")]).await;

  assert_eq!(Query::text("encoding").execute(&mut db).await.unwrap(), vec![bojar()]);
  let title_only = Query::fields("encoding", &[Field::Title, Field::Authors]).execute(&mut db).await.unwrap();
  assert!(title_only.is_empty());
}

#[traced_test]
#[tokio::test]
async fn test_field_weights_rank_results() {
  let (mut db, _path, _dir) = setup_test_db().await;
  let in_body = paper("/d/A_-_Other_2020.pdf", &["A"], "Other", 2020);
  let in_title = paper("/d/B_-_Transformers_2010.pdf", &["B"], "Transformers", 2010);
  index(&mut db, vec![
    Document::new(in_body.clone(), "transformers transformers transformers"),
    Document::new(in_title.clone(), ""),
  ])
  .await;

  let found = Query::text("transformers").execute(&mut db).await.unwrap();
  assert_eq!(found, vec![in_title, in_body]);
}

#[traced_test]
#[tokio::test]
async fn test_syntax_error_falls_back_to_quoted_terms() {
  let (mut db, _path, _dir) = setup_test_db().await;
  let nmt = paper("/d/Ng_-_NeuralMachine_2018.pdf", &["Ng"], "Neural machine translation", 2018);
  index(&mut db, vec![Document::new(nmt.clone(), "")]).await;

  assert_eq!(Query::text("neural-machine").execute(&mut db).await.unwrap(), vec![nmt.clone()]);
  assert!(logs_contain("searching for the literal words instead"));
  assert!(Query::text("nosuchfield:neural").execute(&mut db).await.unwrap().is_empty());
}

#[traced_test]
#[tokio::test]
async fn test_empty_query() {
  let (mut db, _path, _dir) = setup_test_db().await;
  index(&mut db, vec![Document::new(bojar(), "")]).await;
  assert!(Query::text("  ").execute(&mut db).await.unwrap().is_empty());
}

#[traced_test]
#[tokio::test]
async fn test_first_and_no_match() {
  let (mut db, _path, _dir) = setup_test_db().await;
  index(&mut db, vec![Document::new(bojar(), "")]).await;

  let query = Query::fields("bojar findings", &[Field::Bibtex, Field::Authors, Field::Title]);
  assert_eq!(query.first(&mut db).await.unwrap(), bojar());
  let missing = Query::text("vaswani").first(&mut db).await;
  assert!(matches!(missing, Err(RefpapersError::NoMatch(query)) if query == "vaswani"));
}

#[traced_test]
#[tokio::test]
async fn test_all_is_sorted_and_limited() {
  let (mut db, _path, _dir) = setup_test_db().await;
  index(&mut db, vec![
    Document::new(paper("/d/c.pdf", &["Cho"], "Properties", 2014), ""),
    Document::new(paper("/d/a.pdf", &["Ahmed"], "Weighted", 2017), ""),
    Document::new(paper("/d/b.pdf", &["Bahdanau"], "Jointly", 2015), ""),
  ])
  .await;

  let all = Query::all().execute(&mut db).await.unwrap();
  assert_eq!(paths(&all), vec![Path::new("/d/a.pdf"), Path::new("/d/b.pdf"), Path::new("/d/c.pdf")]);
  assert_eq!(Query::all().limit(2).execute(&mut db).await.unwrap().len(), 2);
}

#[traced_test]
#[tokio::test]
async fn test_add_replaces_same_path() {
  let (mut db, _path, _dir) = setup_test_db().await;
  let original = bojar();
  index(&mut db, vec![Document::new(original.clone(), "old body")]).await;
  let renamed = Paper { title: "Findings of the 2017 Workshop".into(), ..original.clone() };
  index(&mut db, vec![Document::new(renamed.clone(), "new body")]).await;

  assert_eq!(db.len().await.unwrap(), 1);
  assert_eq!(Query::by_path(&original.path).execute(&mut db).await.unwrap(), vec![renamed]);
  assert!(Query::text("old").execute(&mut db).await.unwrap().is_empty());
}

#[traced_test]
#[tokio::test]
async fn test_delete() {
  let (mut db, _path, _dir) = setup_test_db().await;
  index(&mut db, vec![Document::new(bojar(), "")]).await;

  let mut commit = Commit::new();
  commit.delete(bojar().path);
  commit.delete("/not/indexed.pdf");
  let stats = commit.execute(&mut db).await.unwrap();
  assert_eq!(stats, CommitStats { added: 0, deleted: 1 });
  assert!(db.is_empty().await.unwrap());
  assert!(Query::text("findings").execute(&mut db).await.unwrap().is_empty());
}

#[traced_test]
#[tokio::test]
async fn test_reset_in_same_transaction() {
  let (mut db, _path, _dir) = setup_test_db().await;
  index(&mut db, vec![
    Document::new(paper("/d/a.pdf", &["Ahmed"], "Weighted", 2017), ""),
    Document::new(paper("/d/b.pdf", &["Bahdanau"], "Jointly", 2015), ""),
  ])
  .await;

  let mut commit = Commit::new().reset();
  commit.add(Document::new(bojar(), ""));
  let stats = commit.execute(&mut db).await.unwrap();
  assert_eq!(stats.added, 1);
  assert_eq!(Query::all().execute(&mut db).await.unwrap(), vec![bojar()]);
}

#[traced_test]
#[tokio::test]
async fn test_more_like_this() {
  let (mut db, _path, _dir) = setup_test_db().await;
  let reference = paper("/d/a.pdf", &["Luong"], "Neural machine translation with attention", 2015);
  let similar = paper("/d/b.pdf", &["Bahdanau"], "Neural machine translation by jointly learning", 2015);
  let unrelated = paper("/d/c.pdf", &["Gehring"], "Convolutional sequence learning", 2017);
  index(&mut db, vec![
    Document::new(reference.clone(), ""),
    Document::new(similar.clone(), ""),
    Document::new(unrelated, ""),
  ])
  .await;

  let found = MoreLikeThis::new(&reference.path, Field::Title).top_terms(10).execute(&mut db).await.unwrap();
  assert_eq!(found, vec![similar]);
}

#[traced_test]
#[tokio::test]
async fn test_distinctive_terms_come_from_one_column() {
  let (mut db, _path, _dir) = setup_test_db().await;
  let reference = paper("/d/a.pdf", &["Gale"], "Sparse sparse models", 2020);
  let other = paper("/d/b.pdf", &["Church"], "Dense models", 2021);
  index(&mut db, vec![
    Document::new(reference, "quokka quokka quokka quokka wombat"),
    Document::new(other, "quokka"),
  ])
  .await;

  let rowid: i64 = db
    .conn
    .call(|conn| Ok(conn.query_row("SELECT id FROM papers WHERE path = '/d/a.pdf'", [], |row| row.get(0))?))
    .await
    .unwrap();
  let terms = db
    .conn
    .call(move |conn| Ok(instruction::more_like_this::distinctive_terms(conn, rowid, "title", 10)?))
    .await
    .unwrap();
  assert_eq!(terms.len(), 2);
  assert!(terms[0].starts_with("spars"));
  assert!(!terms.iter().any(|term| term == "quokka" || term == "wombat"));

  let body_terms = db
    .conn
    .call(move |conn| Ok(instruction::more_like_this::distinctive_terms(conn, rowid, "body", 1)?))
    .await
    .unwrap();
  assert_eq!(body_terms, vec!["quokka".to_string()]);
}

#[traced_test]
#[tokio::test]
async fn test_more_like_this_unknown_path() {
  let (mut db, _path, _dir) = setup_test_db().await;
  index(&mut db, vec![Document::new(bojar(), "")]).await;
  let found = MoreLikeThis::new("/not/indexed.pdf", Field::Title).execute(&mut db).await.unwrap();
  assert!(found.is_empty());
}

#[test]
fn test_bibtex_terms() {
  let key = BibtexKey::parse("bojar2017findings").unwrap();
  assert_eq!(bibtex_terms(&key), "bojar2017findings bojar 2017 findings");
}

#[test]
fn test_quote_terms() {
  assert_eq!(quote_terms("neural-machine \"x\""), "\"neural-machine\" \"\"\"x\"\"\"");
  assert_eq!(instruction::restrict("a", &[Field::Title]), "{title} : (a)");
  assert_eq!(instruction::restrict("a", &Field::ALL), "a");
}
