//! Katz back-off query evaluator (spec §4.5): single-query and
//! cumulative/sliding-window modes, built entirely on `TrieStore`'s
//! query operations.
//!
//! Grounded on the `logp`/`BACKOFF` algorithm of spec §4.5 itself
//! (distilled from `m_gram_query.hpp`/`generic_trie_base.hpp`); the
//! recursive shape (`try the full m-gram, fall back one level with an
//! added back-off weight`) is kept as a small loop over a shrinking
//! window rather than literal recursion, since the window never
//! exceeds `MAX_NGRAM_ORDER` and a loop avoids the borrow-checker
//! friction of a function carrying its own trie reference while also
//! recursing on a sub-slice of its own argument.

use crate::trie::TrieStore;
use crate::word_id::WordId;

/// log10 P(w_m | w_1 .. w_{m-1}) for the m-gram `word_ids` (§4.5
/// single-query mode). If `word_ids` is longer than the trie's
/// configured order, only the trailing `max_level()` tokens are
/// considered (B3: "single-mode condenses to the last N tokens").
pub fn log_prob(trie: &impl TrieStore, word_ids: &[WordId]) -> f32 {
  let n = trie.max_level();
  let window = if word_ids.len() > n { &word_ids[word_ids.len() - n..] } else { word_ids };
  log_prob_window(trie, window)
}

fn log_prob_window(trie: &impl TrieStore, word_ids: &[WordId]) -> f32 {
  let m = word_ids.len();
  debug_assert!(m >= 1 && m <= trie.max_level());

  if m == 1 {
    return trie.get_1_gram(word_ids[0]).prob;
  }

  let found = if m < trie.max_level() {
    trie.get_m_gram(word_ids).map(|p| p.prob)
  } else {
    trie.get_n_gram(word_ids)
  };
  if let Some(prob) = found {
    return prob;
  }

  let prefix = &word_ids[..m - 1];
  let back_off = prefix_back_off(trie, prefix);
  back_off + log_prob_window(trie, &word_ids[1..])
}

/// The stored back-off weight of `prefix` (length `1..N-1`), or `0.0`
/// if the prefix itself was never stored (I2: a missing back-off is
/// neutral under addition in log10 space).
fn prefix_back_off(trie: &impl TrieStore, prefix: &[WordId]) -> f32 {
  if prefix.len() == 1 {
    trie.get_1_gram(prefix[0]).back
  } else {
    trie.get_m_gram(prefix).map_or(0.0, |p| p.back)
  }
}

/// One sliding window's contribution to a cumulative query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindowScore {
  /// Index (1-based, inclusive) of the word this window predicts.
  pub predicted_index: usize,
  pub log_prob: f32,
}

/// The result of a cumulative/sliding-window query (§4.5): the total
/// log probability plus each window's individual contribution, in
/// left-to-right evaluation order.
#[derive(Clone, Debug, PartialEq)]
pub struct CumulativeScore {
  pub total: f32,
  pub windows: Vec<WindowScore>,
}

/// Evaluates `tokens` in cumulative mode: `sum over i in
/// [min_level..=tokens.len()] of logp(tokens[max(0, i-N)..i])`.
/// `min_level` is 1-based; pass `1` for the full joint probability
/// (including the lone leading unigram) or `2` to skip it.
pub fn log_prob_cumulative(trie: &impl TrieStore, tokens: &[WordId], min_level: usize) -> CumulativeScore {
  let n = trie.max_level();
  let mut windows = Vec::with_capacity(tokens.len().saturating_sub(min_level.saturating_sub(1)));
  let mut total = 0.0f32;
  for i in min_level.max(1)..=tokens.len() {
    let begin = i.saturating_sub(n);
    let window = &tokens[begin..i];
    let score = log_prob_window(trie, window);
    total += score;
    windows.push(WindowScore { predicted_index: i, log_prob: score });
  }
  CumulativeScore { total, windows }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::payload::{MGramPayload, NGramPayload};
  use crate::trie::C2dmTrie;
  use crate::word_id::{MIN_KNOWN_WORD_ID, UNKNOWN_WORD_ID, UNK_DEFAULT};

  fn build_scenario_3() -> C2dmTrie {
    // Scenario 3 from spec §8: a, b, c unigrams; bigram (a, b) with
    // back-off -0.2; trigram (a, b, c) absent.
    let mut trie = C2dmTrie::new(3);
    trie.preallocate(&[3, 1, 0]);
    let a = MIN_KNOWN_WORD_ID;
    let b = a + 1;
    let c = a + 2;
    trie.add_1_gram(UNKNOWN_WORD_ID, MGramPayload::new(UNK_DEFAULT, 0.0));
    trie.add_1_gram(a, MGramPayload::new(-1.0, 0.0));
    trie.add_1_gram(b, MGramPayload::new(-1.0, 0.0));
    trie.add_1_gram(c, MGramPayload::new(-1.0, 0.0));
    trie.add_m_gram(&[a, b], 2, MGramPayload::new(-0.5, -0.2));
    trie.finalize();
    trie
  }

  #[test]
  fn exact_match_skips_back_off() {
    let trie = build_scenario_3();
    let a = MIN_KNOWN_WORD_ID;
    let b = a + 1;
    assert_eq!(log_prob(&trie, &[a, b]), -0.5);
  }

  #[test]
  fn trigram_back_off_chain_matches_scenario_3() {
    let trie = build_scenario_3();
    let a = MIN_KNOWN_WORD_ID;
    let b = a + 1;
    let c = a + 2;
    // trigram miss -> back-off(a b) + logp(b c)
    // bigram (b c) miss -> back-off(b) + logp(c) = 0.0 + -1.0
    // total: -0.2 + 0.0 + -1.0 = -1.2
    let result = log_prob(&trie, &[a, b, c]);
    assert!((result - -1.2).abs() < 1e-6, "got {result}");
  }

  #[test]
  fn unknown_unigram_uses_default() {
    let trie = build_scenario_3();
    assert_eq!(log_prob(&trie, &[UNKNOWN_WORD_ID]), UNK_DEFAULT);
  }

  #[test]
  fn cumulative_equals_sum_of_single_windows() {
    let mut trie = C2dmTrie::new(3);
    trie.preallocate(&[4, 2, 1]);
    let a = MIN_KNOWN_WORD_ID;
    let b = a + 1;
    let c = a + 2;
    let d = a + 3;
    for (w, p) in [(a, -1.0), (b, -1.0), (c, -1.0), (d, -1.0)] {
      trie.add_1_gram(w, MGramPayload::new(p, 0.0));
    }
    trie.add_m_gram(&[a, b], 2, MGramPayload::new(-0.3, 0.0));
    trie.add_n_gram(&[a, b, c], NGramPayload::new(-0.2));
    trie.add_n_gram(&[b, c, d], NGramPayload::new(-0.6));
    trie.finalize();

    let tokens = [a, b, c, d];
    let cumulative = log_prob_cumulative(&trie, &tokens, 1);
    let expected: f32 = (1..=4).map(|i| log_prob(&trie, &tokens[i.saturating_sub(3)..i])).sum();
    assert!((cumulative.total - expected).abs() < 1e-6);
    assert_eq!(cumulative.windows.len(), 4);
  }
}
