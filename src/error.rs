//! Crate-wide error types.
//!
//! Grounded on `other_examples/.../twuebi-kenlm-rs/.../arpa/mod.rs`, the
//! only Rust ARPA reader in the retrieval pack: a `thiserror` enum with
//! one variant per distinguishable fatal condition, plus a
//! recoverable/fatal split matching spec §7's error taxonomy.

use std::path::PathBuf;

/// Fatal configuration errors (§7 ArgumentError, plus the
/// continuity check supplemented from `AWordIndex.hpp`, see
/// SPEC_FULL.md §C.1).
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
  #[error("trie layout {trie:?} requires a continuous word index, but {word_index:?} is discontinuous")]
  IncompatibleWordIndex { word_index: &'static str, trie: &'static str },
  #[error("max_level must be in [2, 7], got {got}")]
  InvalidMaxLevel { got: usize },
}

/// Fatal and recoverable ARPA parsing errors (§7 ParseError, IOError).
#[derive(thiserror::Error, Debug)]
pub enum ArpaError {
  #[error("could not open ARPA model file {path:?}: {source}")]
  Io { path: PathBuf, #[source] source: std::io::Error },
  #[error("the \\data\\ header is missing")]
  DataHeaderMissing,
  #[error("ngram count header is missing or malformed: {0}")]
  CountsHeaderMalformed(String),
  #[error("the \\data\\ header declares order {header}, but the trie was configured for order {trie}")]
  OrderMismatch { header: usize, trie: usize },
  #[error("expected section marker \\{expected}-grams:, found {found:?}")]
  SectionMarkerMismatch { expected: usize, found: String },
  #[error("expected the \\end\\ marker, found {found:?}")]
  EndMarkerMissing { found: String },
  #[error("level {level} declared {declared} m-grams in the header but {actual} passed validation")]
  CountMismatch { level: usize, declared: usize, actual: usize },
  #[error("OOM while preallocating trie storage for counts {0:?}")]
  Preallocate(String),
}

/// A single recoverable parse failure on one ARPA line; collected by
/// the builder rather than aborting the whole load (§7: "recoverable
/// parse errors are handled locally").
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum LineParseError {
  #[error("line {line} at level {level}: first field {field:?} is not a valid log10 probability")]
  BadProbability { line: usize, level: usize, field: String },
  #[error("line {line} at level {level}: expected {expected} words, found {found}")]
  WordCountMismatch { line: usize, level: usize, expected: usize, found: usize },
  #[error("line {line} at level {level}: missing a required tab-delimited field")]
  MissingField { line: usize, level: usize },
}

/// File reader errors (§4.6).
#[derive(thiserror::Error, Debug)]
pub enum ReaderError {
  #[error("could not open {path:?}: {source}")]
  Open { path: PathBuf, #[source] source: std::io::Error },
  #[error("could not memory-map {path:?}: {source}")]
  Mmap { path: PathBuf, #[source] source: std::io::Error },
  #[error("I/O error reading {path:?}: {source}")]
  Read { path: PathBuf, #[source] source: std::io::Error },
}
