use std::collections::HashMap;

use tracing::debug;

use crate::word_id::{MIN_KNOWN_WORD_ID, UNKNOWN_WORD_ID, UNKNOWN_WORD_STR, WordId};
use super::WordIndex;

/// As `BasicWordIndex`, but after the first pass over the 1-grams
/// re-assigns ids by descending unigram probability, so downstream
/// code can exploit smaller ids for hotter words (§4.1).
///
/// Grounded on `CountingWordIndex.hpp`: the original literally reuses
/// the id hash map's value slot to stash the probability during the
/// counting pass, then overwrites it with the final id. We keep the
/// two concerns in separate maps -- clearer, and the `prob`/`WordId`
/// size-equality hack (`ASSERT_CONDITION_THROW(sizeof(TWordIdType) !=
/// sizeof(TLogProbBackOff))` in the original) has no idiomatic Rust
/// equivalent worth keeping.
#[derive(Debug, Default)]
pub struct CountingWordIndex {
  counted: HashMap<String, f32>,
  ids: HashMap<String, WordId>,
  next_id: WordId,
  finalized: bool,
}

impl CountingWordIndex {
  pub fn new() -> Self {
    CountingWordIndex { counted: HashMap::new(), ids: HashMap::new(), next_id: MIN_KNOWN_WORD_ID, finalized: false }
  }
}

impl CountingWordIndex {
  /// Enumerates every registered `(token, id)` pair (same role as
  /// `BasicWordIndex::iter_entries`).
  pub(crate) fn iter_entries(&self) -> impl Iterator<Item = (&str, WordId)> {
    self.ids.iter().map(|(token, &id)| (token.as_str(), id))
  }
}

impl WordIndex for CountingWordIndex {
  fn reserve(&mut self, n: usize) {
    self.counted.reserve(n);
    self.ids.reserve(n);
  }

  fn get_word_id(&self, token: &str) -> WordId {
    self.ids.get(token).copied().unwrap_or(UNKNOWN_WORD_ID)
  }

  fn register_word(&mut self, token: &str) -> WordId {
    if let Some(&id) = self.ids.get(token) {
      return id;
    }
    // Not seen during the counting pass (only possible if counting was
    // skipped for this token); fall back to plain sequential issuance
    // so registration stays idempotent (R1) in every case.
    let id = self.next_id;
    self.next_id += 1;
    self.ids.insert(token.to_owned(), id);
    id
  }

  fn len(&self) -> usize {
    self.ids.len() + 1
  }

  fn is_continuous(&self) -> bool {
    true
  }

  fn needs_counting(&self) -> bool {
    true
  }

  fn count_word(&mut self, token: &str, prob: f32) {
    if token == UNKNOWN_WORD_STR {
      return;
    }
    self.counted.insert(token.to_owned(), prob);
  }

  fn finalize_counting(&mut self) {
    if self.finalized {
      return;
    }
    let mut by_prob: Vec<(String, f32)> = self.counted.drain().collect();
    // Highest probability first; ties keep hash-map (arbitrary but
    // deterministic-per-run) order, matching the original's unstable
    // `qsort`.
    by_prob.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    self.ids.insert(UNKNOWN_WORD_STR.to_owned(), UNKNOWN_WORD_ID);
    self.next_id = MIN_KNOWN_WORD_ID;
    for (word, prob) in by_prob {
      let id = self.next_id;
      self.next_id += 1;
      debug!(word, prob, id, "assigned id by descending unigram probability");
      self.ids.insert(word, id);
    }
    self.finalized = true;
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn common_words_get_lower_ids() {
    let mut idx = CountingWordIndex::new();
    idx.count_word("rare", -2.0);
    idx.count_word("common", -0.1);
    idx.finalize_counting();

    let common_id = idx.register_word("common");
    let rare_id = idx.register_word("rare");
    assert!(common_id < rare_id);
  }

  #[test]
  fn unknown_keeps_fixed_id() {
    let mut idx = CountingWordIndex::new();
    idx.count_word("a", -1.0);
    idx.finalize_counting();
    assert_eq!(idx.get_word_id(UNKNOWN_WORD_STR), UNKNOWN_WORD_ID);
  }
}
