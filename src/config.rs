//! Configuration enumerated options (spec §6).

use crate::error::ConfigError;
use crate::word_id::MAX_NGRAM_ORDER;

/// One of the `WordIndex` variants from §4.1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WordIndexKind {
  Basic,
  Counting,
  OptimizingBasic,
  OptimizingCounting,
  Hashing,
}

impl WordIndexKind {
  /// True iff this variant issues a contiguous id range (§4.1
  /// `is_continuous`); only those may be paired with trie layouts that
  /// direct-index unigram payloads by id.
  pub fn is_continuous(self) -> bool {
    !matches!(self, WordIndexKind::Hashing)
  }

  pub fn name(self) -> &'static str {
    match self {
      WordIndexKind::Basic => "basic",
      WordIndexKind::Counting => "counting",
      WordIndexKind::OptimizingBasic => "optimizing_basic",
      WordIndexKind::OptimizingCounting => "optimizing_counting",
      WordIndexKind::Hashing => "hashing",
    }
  }
}

/// One of the `TrieStore` layout families from §4.2.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrieKind {
  C2dh,
  C2dm,
  G2dm,
  W2ca,
  C2wa,
  W2ch,
  H2dm,
}

impl TrieKind {
  /// True iff this layout requires direct-array indexing of 1-gram
  /// payloads by word id, and therefore a continuous word index
  /// (supplemented from `AWordIndex.hpp`, see SPEC_FULL.md §C.1).
  pub fn requires_continuous_word_index(self) -> bool {
    !matches!(self, TrieKind::H2dm)
  }

  pub fn name(self) -> &'static str {
    match self {
      TrieKind::C2dh => "c2dh",
      TrieKind::C2dm => "c2dm",
      TrieKind::G2dm => "g2dm",
      TrieKind::W2ca => "w2ca",
      TrieKind::C2wa => "c2wa",
      TrieKind::W2ch => "w2ch",
      TrieKind::H2dm => "h2dm",
    }
  }
}

/// The `debug_level` enumeration of §6, mapped onto `tracing` levels
/// plus a `kind` field for the three tiers `tracing` has no level for
/// (see SPEC_FULL.md §B).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum DebugLevel {
  Error,
  Warning,
  Usage,
  Result,
  Info,
  Info1,
  Info2,
  Info3,
  Debug,
  Debug1,
  Debug2,
  Debug3,
  Debug4,
}

impl DebugLevel {
  /// The `tracing` level this debug tier is logged at.
  pub fn tracing_level(self) -> tracing::Level {
    use tracing::Level;
    match self {
      DebugLevel::Error => Level::ERROR,
      DebugLevel::Warning | DebugLevel::Usage | DebugLevel::Result => Level::WARN,
      DebugLevel::Info | DebugLevel::Info1 | DebugLevel::Info2 | DebugLevel::Info3 => Level::INFO,
      DebugLevel::Debug
      | DebugLevel::Debug1
      | DebugLevel::Debug2
      | DebugLevel::Debug3
      | DebugLevel::Debug4 => Level::DEBUG,
    }
  }
}

impl std::str::FromStr for DebugLevel {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, String> {
    Ok(match s {
      "error" => DebugLevel::Error,
      "warning" => DebugLevel::Warning,
      "usage" => DebugLevel::Usage,
      "result" => DebugLevel::Result,
      "info" => DebugLevel::Info,
      "info1" => DebugLevel::Info1,
      "info2" => DebugLevel::Info2,
      "info3" => DebugLevel::Info3,
      "debug" => DebugLevel::Debug,
      "debug1" => DebugLevel::Debug1,
      "debug2" => DebugLevel::Debug2,
      "debug3" => DebugLevel::Debug3,
      "debug4" => DebugLevel::Debug4,
      other => return Err(format!("unknown debug level {other:?}")),
    })
  }
}

/// Top-level configuration, built either by the CLI or programmatically.
#[derive(Clone, Copy, Debug)]
pub struct Config {
  pub word_index: WordIndexKind,
  pub trie_type: TrieKind,
  pub max_level: usize,
  pub cumulative: bool,
  pub debug_level: DebugLevel,
}

impl Config {
  pub fn validate(&self) -> Result<(), ConfigError> {
    if !(2..=MAX_NGRAM_ORDER).contains(&self.max_level) {
      return Err(ConfigError::InvalidMaxLevel { got: self.max_level });
    }
    if self.trie_type.requires_continuous_word_index() && !self.word_index.is_continuous() {
      return Err(ConfigError::IncompatibleWordIndex {
        word_index: self.word_index.name(),
        trie: self.trie_type.name(),
      });
    }
    Ok(())
  }
}

impl Default for Config {
  fn default() -> Self {
    Config {
      word_index: WordIndexKind::Basic,
      trie_type: TrieKind::C2dm,
      max_level: 5,
      cumulative: false,
      debug_level: DebugLevel::Warning,
    }
  }
}
