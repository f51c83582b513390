use super::*;

mod duplicates;
mod filenames;
mod indexing;
