//! Glues a `WordIndex`, a `TrieStore`, the ARPA builder, and the query
//! evaluator into one load-once, query-many handle (spec §5).
//!
//! Grounded on `llamapun::ngrams::NgramModel`'s load-then-query surface,
//! generalized to the two independent capability-set type parameters
//! spec §9 calls for instead of one fixed concrete type.

use std::path::Path;

use tracing::info;

use crate::arpa::{self, BuildReport};
use crate::config::Config;
use crate::error::{ArpaError, ConfigError, ReaderError};
use crate::query::{self, CumulativeScore};
use crate::reader::{self, FileReader};
use crate::trie::TrieStore;
use crate::word_id::WordId;
use crate::word_index::WordIndex;

/// A loaded language model: a word index and a trie built from one ARPA
/// file, ready to answer `log_prob` queries (§5).
pub struct LanguageModel<W: WordIndex, T: TrieStore> {
  word_index: W,
  trie: T,
  report: BuildReport,
}

impl<W: WordIndex, T: TrieStore> LanguageModel<W, T> {
  /// Builds a model by reading `path` in full through `reader_for`,
  /// validating `config` first (§6: "an incompatible word
  /// index/trie pairing is rejected before any I/O").
  pub fn load(path: &Path, config: &Config, word_index: W, trie: T) -> Result<Self, LoadError> {
    config.validate()?;
    let mut file_reader = reader::open_mmap(path)?;
    let model = Self::load_with_reader(&mut file_reader, word_index, trie)?;
    info!(
      max_level = model.report.max_level,
      skipped_lines = model.report.line_errors.len(),
      "loaded ARPA model from {}",
      path.display()
    );
    Ok(model)
  }

  /// As `load`, but reads through a plain buffered reader instead of
  /// mmap (spec §4.6's second `FileReader` variant; useful on
  /// filesystems where mmap is unavailable or undesirable).
  pub fn load_buffered(path: &Path, config: &Config, word_index: W, trie: T) -> Result<Self, LoadError> {
    config.validate()?;
    let mut file_reader = reader::open_buffered(path)?;
    Self::load_with_reader(&mut file_reader, word_index, trie)
  }

  fn load_with_reader(
    file_reader: &mut impl FileReader,
    mut word_index: W,
    mut trie: T,
  ) -> Result<Self, LoadError> {
    if T::requires_continuous_word_index() && !word_index.is_continuous() {
      return Err(LoadError::Config(ConfigError::IncompatibleWordIndex {
        word_index: "<runtime>",
        trie: "<runtime>",
      }));
    }
    let report = arpa::build(file_reader, &mut word_index, &mut trie)?;
    Ok(LanguageModel { word_index, trie, report })
  }

  /// Resolves each token through the word index, substituting
  /// `UNKNOWN_WORD_ID` for out-of-vocabulary tokens, then evaluates
  /// `log_prob` (single-query mode, §4.5).
  pub fn log_prob(&self, tokens: &[&str]) -> f32 {
    let ids = self.resolve(tokens);
    query::log_prob(&self.trie, &ids)
  }

  /// As `log_prob`, but in cumulative/sliding-window mode (§4.5).
  pub fn log_prob_cumulative(&self, tokens: &[&str], min_level: usize) -> CumulativeScore {
    let ids = self.resolve(tokens);
    query::log_prob_cumulative(&self.trie, &ids, min_level)
  }

  fn resolve(&self, tokens: &[&str]) -> Vec<WordId> {
    tokens.iter().map(|t| self.word_index.get_word_id(t)).collect()
  }

  pub fn report(&self) -> &BuildReport {
    &self.report
  }

  pub fn max_level(&self) -> usize {
    self.trie.max_level()
  }

  pub fn vocabulary_size(&self) -> usize {
    self.word_index.len()
  }
}

/// Everything that can go wrong building a `LanguageModel` (a thin
/// wrapper tying together the per-stage error types of §7).
#[derive(thiserror::Error, Debug)]
pub enum LoadError {
  #[error(transparent)]
  Config(#[from] ConfigError),
  #[error(transparent)]
  Reader(#[from] ReaderError),
  #[error(transparent)]
  Arpa(#[from] ArpaError),
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::config::{Config, TrieKind, WordIndexKind};
  use crate::trie::C2dmTrie;
  use crate::word_index::BasicWordIndex;
  use std::io::Write;

  fn write_fixture() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
      file,
      "\\data\\\nngram 1=3\nngram 2=1\n\n\\1-grams:\n-1.0\t<unk>\n-0.3\tthe\t-0.1\n-0.8\tcat\n\n\\2-grams:\n-0.2\tthe cat\n\\end\\\n"
    )
    .unwrap();
    file
  }

  #[test]
  fn loads_and_answers_a_query() {
    let file = write_fixture();
    let config = Config {
      word_index: WordIndexKind::Basic,
      trie_type: TrieKind::C2dm,
      max_level: 2,
      cumulative: false,
      debug_level: crate::config::DebugLevel::Warning,
    };
    let model =
      LanguageModel::load(file.path(), &config, BasicWordIndex::new(), C2dmTrie::new(2)).unwrap();
    assert_eq!(model.log_prob(&["the", "cat"]), -0.2);
    assert_eq!(model.report().stored[1], 3);
  }

  #[test]
  fn unknown_token_falls_back_to_unk() {
    let file = write_fixture();
    let config = Config {
      word_index: WordIndexKind::Basic,
      trie_type: TrieKind::C2dm,
      max_level: 2,
      cumulative: false,
      debug_level: crate::config::DebugLevel::Warning,
    };
    let model =
      LanguageModel::load(file.path(), &config, BasicWordIndex::new(), C2dmTrie::new(2)).unwrap();
    assert_eq!(model.log_prob(&["nonexistent-word"]), model.log_prob(&["<unk>"]));
  }
}
