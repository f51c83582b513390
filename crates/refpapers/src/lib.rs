//! Personal bibliography management built on canonical file names.
//!
//! `refpapers` treats a directory tree of PDF/DjVu files as the single source of
//! truth for a bibliography. Every file name encodes the metadata of one paper:
//!
//! ```text
//! <data root>/nlp/machineTranslation/Bojar_etAl_-_FindingsOfThe2017Conference_2017.pdf
//!             └─────── tags ───────┘ └ authors ┘   └────────── title ────────┘ └year┘
//! ```
//!
//! The library provides:
//!
//! - A reversible file name grammar, see [`filename::parse`] and [`filename::generate`]
//! - Full and incremental (git-diff based) indexing into a SQLite full-text index
//! - Near-duplicate detection using a weighted multi-feature distance
//! - Cached metadata lookups for DOI and arXiv identifiers
//!
//! # Getting Started
//!
//! ```no_run
//! use refpapers::{
//!   configuration::Config,
//!   database::{Database, Query},
//!   git::Git,
//!   indexer::Indexer,
//!   prelude::*,
//!   state::{Decisions, StoredState},
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!   let confdir = Config::default_confdir();
//!   let config = Config::from_confdir(&confdir)?;
//!   let mut db = Database::open(config.paths.index_path()).await?;
//!
//!   // Bring the index up to date with the data directory
//!   let git = Git::new(&config.paths.data);
//!   let mut indexer = Indexer::new(&config, StoredState::new(&confdir), Decisions::open(&confdir)?);
//!   let report = indexer.run(&mut db, &git, false).await?;
//!   println!("indexed {} papers", report.added);
//!
//!   // Search for papers
//!   let papers = Query::text("neural machine translation").execute(&mut db).await?;
//!   Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`paper`]: The [`Paper`](paper::Paper) record, bibtex keys and indexing actions
//! - [`filename`]: Parsing and generating canonical paths
//! - [`actions`]: Directory scans and action filters
//! - [`database`]: The full-text index and its instructions
//! - [`indexer`]: Full and incremental indexing runs
//! - [`duplicates`]: Distance metric and near-duplicate search
//! - [`extract`]: Full text and identifier extraction
//! - [`api`]: Metadata services and their on-disk cache

#![warn(missing_docs, clippy::missing_docs_in_private_items)]

use std::{
  cmp::Ordering,
  collections::{BTreeMap, BTreeSet, HashMap, HashSet},
  fmt::Display,
  path::{Path, PathBuf},
  str::FromStr,
  time::{Duration, Instant},
};

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};
#[cfg(test)]
use {tempfile::tempdir, tracing_test::traced_test};

pub mod actions;
pub mod api;
pub mod configuration;
pub mod database;
pub mod duplicates;
pub mod error;
pub mod extract;
pub mod filename;
pub mod git;
pub mod indexer;
pub mod paper;
pub mod pdf;
pub mod state;

use crate::{
  configuration::Config,
  error::*,
  paper::{Action, BibtexKey, IndexingAction, Paper, PubType},
  state::Decisions,
};

/// Common traits and types for ergonomic imports.
///
/// ```no_run
/// use refpapers::{database::Database, prelude::*};
///
/// async fn example() -> Result<(), RefpapersError> {
///   let mut db = Database::open("index.db").await?;
///   let papers = refpapers::database::Query::all().execute(&mut db).await?;
///   Ok(())
/// }
/// ```
pub mod prelude {
  pub use crate::{
    api::MetadataApi, database::DatabaseInstruction, error::RefpapersError, git::VersionControl,
  };
}
