//! End-to-end tests driving the full `LanguageModel::load` ->
//! `log_prob`/`log_prob_cumulative` pipeline against small ARPA
//! fixtures, one per documented scenario. Individual trie layouts and
//! word index variants already have unit coverage; these exercise the
//! glue between the ARPA builder, the word index, the trie, and the
//! query evaluator together.

use std::io::Write;

use ngram_lm::config::{Config, TrieKind, WordIndexKind};
use ngram_lm::model::LanguageModel;
use ngram_lm::trie::C2dmTrie;
use ngram_lm::word_index::{BasicWordIndex, CountingWordIndex};

fn fixture(contents: &str) -> tempfile::NamedTempFile {
  let mut file = tempfile::NamedTempFile::new().unwrap();
  write!(file, "{contents}").unwrap();
  file
}

fn basic_config(max_level: usize) -> Config {
  Config {
    word_index: WordIndexKind::Basic,
    trie_type: TrieKind::C2dm,
    max_level,
    cumulative: false,
    debug_level: ngram_lm::config::DebugLevel::Warning,
  }
}

#[test]
fn scenario_1_single_unigram() {
  let file = fixture(
    "\\data\\\nngram 1=2\nngram 2=0\n\n\\1-grams:\n-1.0\t<unk>\n-0.5\tthe\t-0.30103\n\n\\2-grams:\n\\end\\\n",
  );
  let config = basic_config(2);
  let model = LanguageModel::load(file.path(), &config, BasicWordIndex::new(), C2dmTrie::new(2)).unwrap();

  assert_eq!(model.log_prob(&["the"]), -0.5);
  assert_eq!(model.log_prob(&["<unk>"]), -1.0);
  assert_eq!(model.log_prob(&["foo"]), -1.0);
}

#[test]
fn scenario_2_bigram_back_off_through_unknown() {
  let file = fixture(
    "\\data\\\nngram 1=2\nngram 2=1\n\n\\1-grams:\n-1.0\t<unk>\n-0.5\tthe\t-0.30103\n\n\\2-grams:\n-0.7\tthe cat\n\\end\\\n",
  );
  let config = basic_config(2);
  let model = LanguageModel::load(file.path(), &config, BasicWordIndex::new(), C2dmTrie::new(2)).unwrap();

  assert_eq!(model.log_prob(&["the", "cat"]), -0.7);
  // "a" and "cat" are both out of vocabulary; back-off of an unknown
  // unigram prefix is 0.0, so the result is just logp(cat) = -1.0.
  assert_eq!(model.log_prob(&["a", "cat"]), -1.0);
}

#[test]
fn scenario_3_trigram_back_off_chain() {
  let file = fixture(
    "\\data\\\nngram 1=3\nngram 2=1\nngram 3=0\n\n\\1-grams:\n-1.0\ta\n-1.0\tb\n-1.0\tc\n\n\\2-grams:\n-0.5\ta b\t-0.2\n\n\\3-grams:\n\\end\\\n",
  );
  let config = basic_config(3);
  let model = LanguageModel::load(file.path(), &config, BasicWordIndex::new(), C2dmTrie::new(3)).unwrap();

  let result = model.log_prob(&["a", "b", "c"]);
  assert!((result - -1.2).abs() < 1e-6, "got {result}");
}

#[test]
fn scenario_4_cumulative_window_matches_sum_of_windows() {
  let file = fixture(
    "\\data\\\nngram 1=4\nngram 2=2\nngram 3=1\n\n\
     \\1-grams:\n-1.0\ta\n-1.0\tb\n-1.0\tc\n-1.0\td\n\n\
     \\2-grams:\n-0.3\ta b\n-0.4\tb c\n\n\
     \\3-grams:\n-0.2\ta b c\n\\end\\\n",
  );
  let config = basic_config(3);
  let model = LanguageModel::load(file.path(), &config, BasicWordIndex::new(), C2dmTrie::new(3)).unwrap();

  let tokens = ["a", "b", "c", "d"];
  let cumulative = model.log_prob_cumulative(&tokens, 1);
  let expected = model.log_prob(&["a"])
    + model.log_prob(&["a", "b"])
    + model.log_prob(&["a", "b", "c"])
    + model.log_prob(&["b", "c", "d"]);
  assert!((cumulative.total - expected).abs() < 1e-6);
  assert_eq!(cumulative.windows.len(), 4);
}

#[test]
fn scenario_5_duplicate_key_overwrites_and_is_queryable() {
  let file = fixture(
    "\\data\\\nngram 1=2\nngram 2=2\n\n\\1-grams:\n-1.0\t<unk>\n-1.0\tthe\n\n\\2-grams:\n-0.5\tthe the\n-0.9\tthe the\n\\end\\\n",
  );
  let config = basic_config(2);
  let model = LanguageModel::load(file.path(), &config, BasicWordIndex::new(), C2dmTrie::new(2)).unwrap();

  assert_eq!(model.log_prob(&["the", "the"]), -0.9);
}

#[test]
fn scenario_6_counting_index_reassigns_ids_by_probability() {
  let file = fixture(
    "\\data\\\nngram 1=3\nngram 2=0\n\n\\1-grams:\n-1.0\t<unk>\n-2.0\trare\n-0.1\tcommon\n\n\\2-grams:\n\\end\\\n",
  );
  let config = Config {
    word_index: WordIndexKind::Counting,
    trie_type: TrieKind::C2dm,
    max_level: 2,
    cumulative: false,
    debug_level: ngram_lm::config::DebugLevel::Warning,
  };
  let model =
    LanguageModel::load(file.path(), &config, CountingWordIndex::new(), C2dmTrie::new(2)).unwrap();

  assert_eq!(model.log_prob(&["rare"]), -2.0);
  assert_eq!(model.log_prob(&["common"]), -0.1);
}

#[test]
fn boundary_query_longer_than_max_order_condenses_to_trailing_window() {
  let file = fixture(
    "\\data\\\nngram 1=3\nngram 2=1\n\n\\1-grams:\n-1.0\t<unk>\n-1.0\ta\n-1.0\tb\n\n\\2-grams:\n-0.2\ta b\n\\end\\\n",
  );
  let config = basic_config(2);
  let model = LanguageModel::load(file.path(), &config, BasicWordIndex::new(), C2dmTrie::new(2)).unwrap();

  // max_level is 2: a 3-token query should condense to its trailing bigram.
  assert_eq!(model.log_prob(&["b", "a", "b"]), model.log_prob(&["a", "b"]));
}

#[test]
fn reloading_the_same_file_yields_identical_answers() {
  let file = fixture(
    "\\data\\\nngram 1=2\nngram 2=1\n\n\\1-grams:\n-1.0\t<unk>\n-0.5\tthe\t-0.1\n\n\\2-grams:\n-0.7\tthe the\n\\end\\\n",
  );
  let config = basic_config(2);
  let first = LanguageModel::load(file.path(), &config, BasicWordIndex::new(), C2dmTrie::new(2)).unwrap();
  let second = LanguageModel::load(file.path(), &config, BasicWordIndex::new(), C2dmTrie::new(2)).unwrap();

  assert_eq!(first.log_prob(&["the", "the"]), second.log_prob(&["the", "the"]));
  assert_eq!(first.log_prob(&["the"]), second.log_prob(&["the"]));
}
