use crate::util::hashing::{fold32, hash64};
use crate::word_id::{MIN_KNOWN_WORD_ID, UNDEFINED_WORD_ID, UNKNOWN_WORD_ID, UNKNOWN_WORD_STR, WordId};
use super::WordIndex;

/// `WordId = hash(token)`, discontinuous. Only pairable with trie
/// layouts whose payloads are keyed entirely by hashes (H2DMap), never
/// with a layout that direct-indexes unigram payloads by id.
///
/// Spec note (§3, §9 Open Questions): two distinct tokens may collide
/// on their hash; this variant maintains no collision table, an
/// accepted approximate-mode trade-off. We fold the 64-bit FNV hash
/// down to the crate's 32-bit `WordId` (see DESIGN.md for why `WordId`
/// stays `u32` uniformly rather than widening to 64 bits for just this
/// variant), which narrows the birthday bound further than the
/// original's 64-bit scheme -- a deliberate, documented trade-off, not
/// an oversight.
#[derive(Debug, Default)]
pub struct HashingWordIndex {
  len: usize,
}

impl HashingWordIndex {
  pub fn new() -> Self {
    HashingWordIndex { len: 1 }
  }

  fn hash_token(token: &str) -> WordId {
    let folded = fold32(hash64(token.as_bytes()));
    // Never collide with the two reserved ids; remap the (astronomically
    // unlikely) hit onto an adjacent value.
    match folded {
      UNDEFINED_WORD_ID => MIN_KNOWN_WORD_ID,
      UNKNOWN_WORD_ID => MIN_KNOWN_WORD_ID + 1,
      other => other,
    }
  }
}

impl WordIndex for HashingWordIndex {
  fn reserve(&mut self, _n: usize) {}

  fn get_word_id(&self, token: &str) -> WordId {
    if token == UNKNOWN_WORD_STR {
      return UNKNOWN_WORD_ID;
    }
    Self::hash_token(token)
  }

  fn register_word(&mut self, token: &str) -> WordId {
    if token == UNKNOWN_WORD_STR {
      return UNKNOWN_WORD_ID;
    }
    self.len += 1;
    Self::hash_token(token)
  }

  fn len(&self) -> usize {
    self.len
  }

  fn is_continuous(&self) -> bool {
    false
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn hashing_is_idempotent() {
    let mut idx = HashingWordIndex::new();
    assert_eq!(idx.register_word("dog"), idx.register_word("dog"));
  }

  #[test]
  fn unknown_token_still_reserved() {
    let idx = HashingWordIndex::new();
    assert_eq!(idx.get_word_id(UNKNOWN_WORD_STR), UNKNOWN_WORD_ID);
  }
}
