use std::collections::HashMap;

use tracing::trace;

use crate::word_id::{UNDEFINED_WORD_ID, UNKNOWN_WORD_ID, MIN_KNOWN_WORD_ID, UNKNOWN_WORD_STR, WordId};
use super::WordIndex;

/// Hash-map token -> id, continuous ids issued in insertion order.
/// A direct generalization of `llamapun::ngrams::Dictionary`, which
/// does the same thing but without reserving the `UNDEFINED`/`UNKNOWN`
/// slots this format requires.
#[derive(Debug, Default)]
pub struct BasicWordIndex {
  map: HashMap<String, WordId>,
  next_id: WordId,
}

impl BasicWordIndex {
  pub fn new() -> Self {
    let mut index = BasicWordIndex { map: HashMap::new(), next_id: MIN_KNOWN_WORD_ID };
    index.map.insert(UNKNOWN_WORD_STR.to_owned(), UNKNOWN_WORD_ID);
    index
  }
}

impl BasicWordIndex {
  /// Enumerates every registered `(token, id)` pair. Not part of the
  /// `WordIndex` contract -- used internally by `OptimizingWordIndex`
  /// to build its probe table after finalization.
  pub(crate) fn iter_entries(&self) -> impl Iterator<Item = (&str, WordId)> {
    self.map.iter().map(|(token, &id)| (token.as_str(), id))
  }
}

impl WordIndex for BasicWordIndex {
  fn reserve(&mut self, n: usize) {
    self.map.reserve(n);
  }

  fn get_word_id(&self, token: &str) -> WordId {
    self.map.get(token).copied().unwrap_or(UNKNOWN_WORD_ID)
  }

  fn register_word(&mut self, token: &str) -> WordId {
    if let Some(&id) = self.map.get(token) {
      return id;
    }
    let id = self.next_id;
    self.next_id += 1;
    trace!(token, id, "registered new word");
    self.map.insert(token.to_owned(), id);
    id
  }

  fn len(&self) -> usize {
    // +1 for UNDEFINED, which is never a map entry but is still a
    // valid, reserved id in the index's range.
    self.map.len() + 1
  }

  fn is_continuous(&self) -> bool {
    true
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn unknown_is_reserved() {
    let idx = BasicWordIndex::new();
    assert_eq!(idx.get_word_id(UNKNOWN_WORD_STR), UNKNOWN_WORD_ID);
    assert_eq!(idx.get_word_id("never seen"), UNKNOWN_WORD_ID);
  }

  #[test]
  fn registering_is_idempotent() {
    let mut idx = BasicWordIndex::new();
    let a = idx.register_word("the");
    let b = idx.register_word("the");
    assert_eq!(a, b);
    assert!(a >= MIN_KNOWN_WORD_ID);
  }

  #[test]
  fn ids_are_dense() {
    let mut idx = BasicWordIndex::new();
    let a = idx.register_word("a");
    let b = idx.register_word("b");
    let c = idx.register_word("c");
    assert_eq!([a, b, c], [MIN_KNOWN_WORD_ID, MIN_KNOWN_WORD_ID + 1, MIN_KNOWN_WORD_ID + 2]);
  }

  #[test]
  fn undefined_is_never_issued() {
    let mut idx = BasicWordIndex::new();
    assert_ne!(idx.register_word("x"), UNDEFINED_WORD_ID);
  }
}
