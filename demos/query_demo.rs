//! Minimal end-to-end demonstration: build a tiny ARPA model in memory,
//! load it, and print the log probability of a couple of queries.

use std::io::Write;

use ngram_lm::config::{Config, TrieKind, WordIndexKind};
use ngram_lm::model::LanguageModel;
use ngram_lm::trie::C2dmTrie;
use ngram_lm::word_index::BasicWordIndex;

fn main() {
  let mut file = tempfile::NamedTempFile::new().expect("create temp ARPA file");
  write!(
    file,
    "\\data\\\n\
     ngram 1=4\n\
     ngram 2=2\n\
     ngram 3=1\n\
     \n\
     \\1-grams:\n\
     -1.0\t<unk>\n\
     -0.30103\tthe\t-0.2\n\
     -0.47712\tcat\t-0.1\n\
     -0.60206\tsat\n\
     \n\
     \\2-grams:\n\
     -0.2\tthe cat\t-0.05\n\
     -0.3\tcat sat\n\
     \n\
     \\3-grams:\n\
     -0.1\tthe cat sat\n\
     \\end\\\n"
  )
  .expect("write ARPA fixture");

  let config = Config { word_index: WordIndexKind::Basic, trie_type: TrieKind::C2dm, max_level: 3, cumulative: true, debug_level: ngram_lm::config::DebugLevel::Warning };

  let model = LanguageModel::load(file.path(), &config, BasicWordIndex::new(), C2dmTrie::new(3))
    .expect("load ARPA model");

  println!("vocabulary size: {}", model.vocabulary_size());
  println!("log_10 P(the cat sat) = {}", model.log_prob(&["the", "cat", "sat"]));

  let cumulative = model.log_prob_cumulative(&["the", "cat", "sat"], 1);
  println!("cumulative log_10 P = {}", cumulative.total);
  for window in &cumulative.windows {
    println!("  window ending at token {}: {}", window.predicted_index, window.log_prob);
  }
}
