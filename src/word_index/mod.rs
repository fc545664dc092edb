//! The word index: a (bijective or hashed) mapping between surface
//! tokens and dense `WordId`s (spec §4.1).
//!
//! Grounded on `llamapun::ngrams::Dictionary` (token -> insertion-order
//! id hash map) and `llamapun::glove::vocab_count` (a direct port of
//! GloVe's `vocab_count.c`, which builds a unigram frequency table
//! before assigning ids) -- generalized here into the four variants
//! spec §4.1 requires, plus the original's `<unk>`/`UNDEFINED` id
//! reservation (`AWordIndex.hpp`).

mod basic;
mod counting;
mod hashing;
mod optimizing;

pub use basic::BasicWordIndex;
pub use counting::CountingWordIndex;
pub use hashing::HashingWordIndex;
pub use optimizing::OptimizingWordIndex;

use crate::word_id::WordId;

/// The shared contract every word index variant implements (§4.1).
pub trait WordIndex {
  /// Hint to preallocate capacity for `n` distinct words.
  fn reserve(&mut self, n: usize);

  /// Resolve a token to its id. Never fails: returns `UNKNOWN_WORD_ID`
  /// for an unseen token in continuous variants, or the freshly hashed
  /// id in discontinuous ones.
  fn get_word_id(&self, token: &str) -> WordId;

  /// Register a token during build, returning a fresh or existing id.
  /// Idempotent: registering the same token twice returns the same id
  /// (R1).
  fn register_word(&mut self, token: &str) -> WordId;

  /// Total number of entries, including `UNDEFINED` and `UNKNOWN`
  /// (supplemented from `AWordIndex::get_number_of_words`).
  fn len(&self) -> usize;

  fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// True iff issued ids form the contiguous range `[2, 2+|V|)`.
  fn is_continuous(&self) -> bool;

  /// Whether this variant needs the two-pass counting protocol before
  /// ids can be registered.
  fn needs_counting(&self) -> bool {
    false
  }

  /// Record a unigram's probability during the first pass. Only
  /// meaningful when `needs_counting()` is true; id registration for
  /// that token is deferred until `finalize_counting`.
  fn count_word(&mut self, _token: &str, _prob: f32) {}

  /// Reassign ids by descending unigram probability; must be called
  /// exactly once, after all `count_word` calls and before any
  /// `register_word` call, when `needs_counting()` is true.
  fn finalize_counting(&mut self) {}

  /// Whether a post-build finalization step is needed (e.g. building
  /// the optimizing variant's closed-addressing probe table).
  fn needs_post_actions(&self) -> bool {
    false
  }

  fn post_actions(&mut self) {}
}
