//! Trie storage layouts implementing the shared `TrieStore` contract
//! (spec §4.2/§4.3).
//!
//! Grounded on the original `ContextMultiHashMapTrie.cpp` /
//! `C2DMapTrie.cpp` / `C2DMapArrayTrie.cpp` / `c2w_array_trie.cpp` /
//! `h2d_map_trie.cpp` family (`original_source/src/`), generalized into
//! idiomatic Rust per the "capability set, monomorphic dispatch"
//! re-architecture note in spec §9: `TrieStore` is exactly the
//! capability set named there --
//! `{preallocate, add_1_gram, add_m_gram, add_n_gram, finalize,
//! get_1_gram, get_m_gram, get_n_gram}` -- one trait, several
//! independent implementors, no inheritance. `ContextId` and
//! `get_context_id` (§4.3's layered-layout-only context walk) stay
//! private to each layered layout's own implementation of
//! `get_m_gram`/`get_n_gram`; the evaluator never needs to see a
//! context handle, only "does this exact word sequence have a stored
//! payload".

pub mod bitmap_cache;
mod c2d_hybrid;
mod c2d_map;
mod c2w_array;
mod g2d_map;
mod h2d_map;
mod w2c_array;

pub use c2d_hybrid::C2dhTrie;
pub use c2d_map::C2dmTrie;
pub use c2w_array::C2waTrie;
pub use g2d_map::G2dmTrie;
pub use h2d_map::H2dmTrie;
pub use w2c_array::{W2caTrie, W2chTrie};

use crate::payload::{MGramPayload, NGramPayload};
use crate::word_id::WordId;

/// The operations every trie layout exposes (§4.3, §9 capability set).
/// `N` (the model order) is a run-time constant bounded by
/// `MAX_NGRAM_ORDER`, per the "compile-time N as a template parameter"
/// re-architecture note in spec §9.
pub trait TrieStore {
  /// True iff 1-gram payloads are stored in a word-id-indexed array and
  /// therefore require a continuous word index (supplemented from
  /// `AWordIndex.hpp`, see SPEC_FULL.md §C.1).
  fn requires_continuous_word_index() -> bool
  where
    Self: Sized;

  /// Size internal arrays/maps per level from the ARPA counts header
  /// (invariant I5: an upper bound used for preallocation).
  fn preallocate(&mut self, counts: &[usize]);

  /// Store a unigram payload. Idempotent duplicates are a collision
  /// (tracked via `collision_count`); last write wins (see
  /// SPEC_FULL.md §C.2a for why this resolves the original's
  /// inconsistent overwrite-vs-keep-first behavior).
  fn add_1_gram(&mut self, word_id: WordId, payload: MGramPayload);

  /// Store an m-gram payload, `word_ids.len() == level`, for
  /// `2 <= level <= N-1`.
  fn add_m_gram(&mut self, word_ids: &[WordId], level: usize, payload: MGramPayload);

  /// Store the highest-order (`word_ids.len() == N`) m-gram payload; no
  /// back-off is stored at this level.
  fn add_n_gram(&mut self, word_ids: &[WordId], payload: NGramPayload);

  /// Finalize build-time structures (sorting, rehashing, shrinking).
  /// No further mutation is allowed after this call (invariant I4).
  fn finalize(&mut self);

  /// The number of m-grams stored at `level` among `[1, N]`.
  fn count_at_level(&self, level: usize) -> usize;

  /// The highest configured order.
  fn max_level(&self) -> usize;

  /// Fetch the unigram payload; always defined (the `UNKNOWN` slot is
  /// always present, per invariant I1).
  fn get_1_gram(&self, word_id: WordId) -> MGramPayload;

  /// Fetch the payload of the exact m-gram `word_ids`
  /// (`2 <= word_ids.len() <= N-1`), or `None` if it was never stored.
  fn get_m_gram(&self, word_ids: &[WordId]) -> Option<MGramPayload>;

  /// Fetch the probability of the exact highest-order m-gram
  /// `word_ids` (`word_ids.len() == N`), or `None`.
  fn get_n_gram(&self, word_ids: &[WordId]) -> Option<f32>;

  /// Number of duplicate-key insertions observed so far (supplemented
  /// from SPEC_FULL.md §C.2).
  fn collision_count(&self) -> u64;
}
