//! Dense word identifiers and opaque context handles.
//!
//! Mirrors `AWordIndex` from the original implementation: id 0 is
//! reserved for "undefined", id 1 is the fixed `<unk>` id, and every
//! real word starts at 2.

/// A dense (or hashed, for the `Hashing` word index) word identifier.
pub type WordId = u32;

/// Never issued to a real word; the default value of a freshly
/// allocated `WordId` slot.
pub const UNDEFINED_WORD_ID: WordId = 0;

/// The fixed id of the out-of-vocabulary token `<unk>`.
pub const UNKNOWN_WORD_ID: WordId = 1;

/// The first id a real, known word can receive.
pub const MIN_KNOWN_WORD_ID: WordId = 2;

/// The surface form of the out-of-vocabulary token, as it appears in
/// ARPA files.
pub const UNKNOWN_WORD_STR: &str = "<unk>";

/// Sentinel probability used for `<unk>` when the ARPA file carries no
/// explicit `<unk>` entry (invariant I1).
pub const UNK_DEFAULT: f32 = -10.0;

/// The maximum supported model order. Chosen at configure time, bounded
/// here so fixed-size, stack-allocated per-level buffers are possible.
pub const MAX_NGRAM_ORDER: usize = 7;

/// An opaque handle identifying a context (an (m-1)-gram prefix) within
/// a trie level. Its value is layout-private: a dense per-level index
/// for the array-backed layouts, the word id itself for the 1-gram
/// context, or a running hash for the flat (G2D/H2D) layouts. Callers
/// must never construct one except by calling `TrieStore` methods, and
/// must never compare handles produced by different trie instances or
/// different levels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(pub u32);

impl ContextId {
  /// The "no context yet" handle, used as the implicit parent of a
  /// 1-gram context.
  pub const ROOT: ContextId = ContextId(0);
}

/// Packs a `(parent_ctx_id, word_id)` pair into the 64-bit key used by
/// the hash-map-backed layered layouts (spec §4.3: `key =
/// (parent_ctx_id as u64) << 32 | word_id`).
#[inline]
pub fn pack_context_key(parent_ctx_id: ContextId, word_id: WordId) -> u64 {
  ((parent_ctx_id.0 as u64) << 32) | (word_id as u64)
}
