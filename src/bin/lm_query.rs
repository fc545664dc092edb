//! `lm_query`: load an ARPA file and report the log10 probability of
//! one or more queries (spec §6).
//!
//! Grounded on `llamapun`'s existing CLI binaries (clap derive, one
//! `tracing-subscriber` init call at the top of `main`), generalized to
//! the four-flag surface (`-m -q -c -d`) spec §6 fixes exactly.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ngram_lm::config::{Config, DebugLevel, TrieKind, WordIndexKind};
use ngram_lm::error::{LoadError, ReaderError};
use ngram_lm::model::LanguageModel;
use ngram_lm::reader::{open_buffered, FileReader};
use ngram_lm::trie::{C2dhTrie, C2dmTrie, C2waTrie, G2dmTrie, H2dmTrie, TrieStore, W2caTrie, W2chTrie};
use ngram_lm::word_index::{BasicWordIndex, CountingWordIndex, HashingWordIndex, OptimizingWordIndex, WordIndex};

/// Query a back-off n-gram language model stored in ARPA format.
#[derive(Parser, Debug)]
#[command(name = "lm_query", version, about)]
struct Args {
  /// Path to the ARPA language model file.
  #[arg(short = 'm', long = "model")]
  model: PathBuf,

  /// Path to a file of whitespace-separated queries, one per line.
  #[arg(short = 'q', long = "queries")]
  queries: PathBuf,

  /// Report the cumulative/sliding-window log probability of each
  /// whole query line instead of a single last-m-gram score.
  #[arg(short = 'c', long = "cumulative")]
  cumulative: bool,

  /// Logging verbosity, one of the §6 debug-level names (default
  /// "warning").
  #[arg(short = 'd', long = "debug-level", default_value = "warning")]
  debug_level: DebugLevel,

  /// Trie storage layout to build (default c2dm).
  #[arg(long = "trie", default_value = "c2dm")]
  trie: TrieArg,

  /// Word index variant to build (default basic).
  #[arg(long = "word-index", default_value = "basic")]
  word_index: WordIndexArg,

  /// Maximum n-gram order to support (default 5).
  #[arg(long = "max-level", default_value_t = 5)]
  max_level: usize,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum TrieArg {
  C2dh,
  C2dm,
  G2dm,
  W2ca,
  C2wa,
  W2ch,
  H2dm,
}

impl From<TrieArg> for TrieKind {
  fn from(value: TrieArg) -> Self {
    match value {
      TrieArg::C2dh => TrieKind::C2dh,
      TrieArg::C2dm => TrieKind::C2dm,
      TrieArg::G2dm => TrieKind::G2dm,
      TrieArg::W2ca => TrieKind::W2ca,
      TrieArg::C2wa => TrieKind::C2wa,
      TrieArg::W2ch => TrieKind::W2ch,
      TrieArg::H2dm => TrieKind::H2dm,
    }
  }
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum WordIndexArg {
  Basic,
  Counting,
  OptimizingBasic,
  OptimizingCounting,
  Hashing,
}

impl From<WordIndexArg> for WordIndexKind {
  fn from(value: WordIndexArg) -> Self {
    match value {
      WordIndexArg::Basic => WordIndexKind::Basic,
      WordIndexArg::Counting => WordIndexKind::Counting,
      WordIndexArg::OptimizingBasic => WordIndexKind::OptimizingBasic,
      WordIndexArg::OptimizingCounting => WordIndexKind::OptimizingCounting,
      WordIndexArg::Hashing => WordIndexKind::Hashing,
    }
  }
}

fn main() -> ExitCode {
  let args = Args::parse();
  let config = Config {
    word_index: args.word_index.into(),
    trie_type: args.trie.into(),
    max_level: args.max_level,
    cumulative: args.cumulative,
    debug_level: args.debug_level,
  };

  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::new(tracing_level_name(config.debug_level)))
    .with_target(false)
    .init();

  if let Err(e) = config.validate() {
    eprintln!("lm_query: invalid configuration: {e}");
    return ExitCode::FAILURE;
  }

  match dispatch(&args, &config) {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      eprintln!("lm_query: {e}");
      ExitCode::FAILURE
    }
  }
}

fn tracing_level_name(level: DebugLevel) -> &'static str {
  match level.tracing_level() {
    tracing::Level::ERROR => "error",
    tracing::Level::WARN => "warn",
    tracing::Level::INFO => "info",
    tracing::Level::DEBUG => "debug",
    tracing::Level::TRACE => "trace",
  }
}

#[derive(thiserror::Error, Debug)]
enum AppError {
  #[error(transparent)]
  Load(#[from] LoadError),
  #[error("could not open queries file {0:?}: {1}")]
  Queries(PathBuf, ReaderError),
}

/// Builds the concrete `(WordIndex, TrieStore)` pair the config names,
/// then runs every query line against it. One `run` instantiation per
/// trie/word-index pair keeps `LanguageModel` itself free of any
/// runtime type erasure (spec §9: "monomorphic dispatch, no `dyn`").
fn dispatch(args: &Args, config: &Config) -> Result<(), AppError> {
  macro_rules! with_trie {
    ($word_index:expr) => {
      match config.trie_type {
        TrieKind::C2dh => run(args, config, $word_index, C2dhTrie::new(config.max_level))?,
        TrieKind::C2dm => run(args, config, $word_index, C2dmTrie::new(config.max_level))?,
        TrieKind::G2dm => run(args, config, $word_index, G2dmTrie::new(config.max_level))?,
        TrieKind::W2ca => run(args, config, $word_index, W2caTrie::new(config.max_level))?,
        TrieKind::C2wa => run(args, config, $word_index, C2waTrie::new(config.max_level))?,
        TrieKind::W2ch => run(args, config, $word_index, W2chTrie::new(config.max_level))?,
        TrieKind::H2dm => run(args, config, $word_index, H2dmTrie::new(config.max_level))?,
      }
    };
  }

  match config.word_index {
    WordIndexKind::Basic => with_trie!(BasicWordIndex::new()),
    WordIndexKind::Counting => with_trie!(CountingWordIndex::new()),
    WordIndexKind::OptimizingBasic => with_trie!(OptimizingWordIndex::wrapping_basic()),
    WordIndexKind::OptimizingCounting => with_trie!(OptimizingWordIndex::wrapping_counting()),
    WordIndexKind::Hashing => with_trie!(HashingWordIndex::new()),
  }
  Ok(())
}

fn run<W: WordIndex, T: TrieStore>(args: &Args, config: &Config, word_index: W, trie: T) -> Result<(), AppError> {
  let model = LanguageModel::load(&args.model, config, word_index, trie)?;

  let mut reader = open_buffered(&args.queries).map_err(|e| AppError::Queries(args.queries.clone(), e))?;
  while let Some(line) = reader.next_line() {
    let line = String::from_utf8_lossy(line);
    let tokens: Vec<&str> = line.split_ascii_whitespace().collect();
    if tokens.is_empty() {
      continue;
    }
    if config.cumulative {
      let score = model.log_prob_cumulative(&tokens, 1);
      println!("log_10( Prob( {} ) ) = {}", line.trim(), score.total);
      for window in &score.windows {
        println!("  [{}] = {}", window.predicted_index, window.log_prob);
      }
    } else {
      let score = model.log_prob(&tokens);
      println!("log_10( Prob( {} ) ) = {}", line.trim(), score);
    }
  }
  Ok(())
}
