use crate::payload::{MGramPayload, NGramPayload};
use crate::util::hashing::mix64;
use crate::word_id::WordId;
use super::TrieStore;

/// One entry in a `G2dmTrie` open-addressing table: the full word-id
/// sequence (kept to verify a probe isn't a false hit from a fingerprint
/// collision) plus its payload.
#[derive(Clone)]
struct Slot<P> {
  key: Vec<WordId>,
  payload: P,
}

/// A single per-level open-addressing table, linear-probed, growing by
/// rebuilding when the load factor would exceed 0.5 (spec §4.3:
/// "collisions are resolved by linear probing; the full key ... is
/// stored alongside the payload to detect false hits").
struct FlatTable<P: Clone> {
  slots: Vec<Option<Slot<P>>>,
  len: usize,
  mask: u64,
}

impl<P: Clone> FlatTable<P> {
  fn with_capacity(capacity: usize) -> Self {
    let cap = capacity.max(4).next_power_of_two();
    FlatTable { slots: vec![None; cap], len: 0, mask: (cap - 1) as u64 }
  }

  fn fingerprint(word_ids: &[WordId]) -> u64 {
    let mut h = 0u64;
    for &w in word_ids {
      h = mix64(h, w as u64);
    }
    h
  }

  fn grow(&mut self) {
    let mut bigger = FlatTable::with_capacity(self.slots.len() * 2);
    for slot in self.slots.drain(..).flatten() {
      bigger.raw_insert(slot);
    }
    *self = bigger;
  }

  fn raw_insert(&mut self, slot: Slot<P>) {
    let hash = Self::fingerprint(&slot.key);
    let mut idx = (hash & self.mask) as usize;
    loop {
      if self.slots[idx].is_none() {
        self.slots[idx] = Some(slot);
        self.len += 1;
        return;
      }
      idx = (idx + 1) & (self.mask as usize);
    }
  }

  /// Inserts or overwrites; returns `true` if an existing entry with
  /// the same key was overwritten (a collision at the semantic level,
  /// not just the fingerprint level).
  fn insert(&mut self, word_ids: &[WordId], payload: P) -> bool {
    if (self.len + 1) * 2 > self.slots.len() {
      self.grow();
    }
    let hash = Self::fingerprint(word_ids);
    let mut idx = (hash & self.mask) as usize;
    loop {
      match &mut self.slots[idx] {
        Some(slot) if slot.key == word_ids => {
          slot.payload = payload;
          return true;
        }
        Some(_) => idx = (idx + 1) & (self.mask as usize),
        None => {
          self.slots[idx] = Some(Slot { key: word_ids.to_vec(), payload });
          self.len += 1;
          return false;
        }
      }
    }
  }

  fn get(&self, word_ids: &[WordId]) -> Option<&P> {
    if self.slots.is_empty() {
      return None;
    }
    let hash = Self::fingerprint(word_ids);
    let mut idx = (hash & self.mask) as usize;
    let start = idx;
    loop {
      match &self.slots[idx] {
        Some(slot) if slot.key == word_ids => return Some(&slot.payload),
        None => return None,
        _ => {}
      }
      idx = (idx + 1) & (self.mask as usize);
      if idx == start {
        return None;
      }
    }
  }

  fn shrink(&mut self) {
    // Linear-probed tables can't be shrunk in place without risking
    // probe-sequence breakage; nothing to do beyond what `grow` already
    // guarantees (load factor <= 0.5).
  }
}

/// Gram-to-data layout (§4.2 G2DMap): every m-gram, at every level, is
/// keyed directly by a fingerprint of its full word-id sequence into one
/// flat open-addressing table per level -- no per-level context chain,
/// unlike the C2D family.
///
/// Grounded on `G2DMapTrie.cpp`. The original stores a packed integer
/// key and a separate equality check against a parallel "full m-gram"
/// array to rule out fingerprint collisions; we fold the two into one
/// `Slot` holding the key verbatim, which is simpler and just as cheap
/// in practice since `word_ids` is already a short-lived borrowed slice
/// at the call site.
pub struct G2dmTrie {
  max_level: usize,
  unigrams: Vec<MGramPayload>,
  mid_levels: Vec<FlatTable<MGramPayload>>,
  top_level: FlatTable<f32>,
  collisions: u64,
}

impl G2dmTrie {
  pub fn new(max_level: usize) -> Self {
    let mid_count = max_level.saturating_sub(2);
    G2dmTrie {
      max_level,
      unigrams: Vec::new(),
      mid_levels: (0..mid_count).map(|_| FlatTable::with_capacity(4)).collect(),
      top_level: FlatTable::with_capacity(4),
      collisions: 0,
    }
  }

  fn ensure_unigram_capacity(&mut self, word_id: WordId) {
    let needed = word_id as usize + 1;
    if self.unigrams.len() < needed {
      self.unigrams.resize(needed, MGramPayload::default());
    }
  }
}

impl TrieStore for G2dmTrie {
  fn requires_continuous_word_index() -> bool {
    false
  }

  fn preallocate(&mut self, counts: &[usize]) {
    if let Some(&n1) = counts.first() {
      self.unigrams.resize((n1 + 2).max(self.unigrams.len()), MGramPayload::default());
    }
    for (i, table) in self.mid_levels.iter_mut().enumerate() {
      if let Some(&count) = counts.get(i + 1) {
        *table = FlatTable::with_capacity(count * 2);
      }
    }
    if let Some(&count) = counts.get(self.max_level.saturating_sub(1)) {
      self.top_level = FlatTable::with_capacity(count * 2);
    }
  }

  fn add_1_gram(&mut self, word_id: WordId, payload: MGramPayload) {
    self.ensure_unigram_capacity(word_id);
    self.unigrams[word_id as usize] = payload;
  }

  fn add_m_gram(&mut self, word_ids: &[WordId], level: usize, payload: MGramPayload) {
    debug_assert_eq!(word_ids.len(), level);
    debug_assert!((2..self.max_level).contains(&level));
    if self.mid_levels[level - 2].insert(word_ids, payload) {
      self.collisions += 1;
    }
  }

  fn add_n_gram(&mut self, word_ids: &[WordId], payload: NGramPayload) {
    debug_assert_eq!(word_ids.len(), self.max_level);
    if self.top_level.insert(word_ids, payload.prob) {
      self.collisions += 1;
    }
  }

  fn finalize(&mut self) {
    for table in &mut self.mid_levels {
      table.shrink();
    }
    self.top_level.shrink();
  }

  fn count_at_level(&self, level: usize) -> usize {
    if level == 0 {
      return 0;
    }
    if level == 1 {
      return self.unigrams.iter().filter(|p| p.prob != f32::NEG_INFINITY).count();
    }
    if level == self.max_level {
      return self.top_level.len;
    }
    self.mid_levels.get(level - 2).map_or(0, |t| t.len)
  }

  fn max_level(&self) -> usize {
    self.max_level
  }

  fn get_1_gram(&self, word_id: WordId) -> MGramPayload {
    self.unigrams.get(word_id as usize).copied().unwrap_or_default()
  }

  fn get_m_gram(&self, word_ids: &[WordId]) -> Option<MGramPayload> {
    self.mid_levels.get(word_ids.len() - 2)?.get(word_ids).copied()
  }

  fn get_n_gram(&self, word_ids: &[WordId]) -> Option<f32> {
    self.top_level.get(word_ids).copied()
  }

  fn collision_count(&self) -> u64 {
    self.collisions
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::word_id::MIN_KNOWN_WORD_ID;

  #[test]
  fn exact_key_lookup_ignores_fingerprint_collisions() {
    let mut trie = G2dmTrie::new(3);
    trie.preallocate(&[4, 2, 1]);
    let a = MIN_KNOWN_WORD_ID;
    let b = a + 1;
    let c = a + 2;
    trie.add_1_gram(a, MGramPayload::new(-1.0, 0.0));
    trie.add_m_gram(&[a, b], 2, MGramPayload::new(-0.5, -0.1));
    trie.add_n_gram(&[a, b, c], NGramPayload::new(-0.3));
    trie.finalize();

    assert_eq!(trie.get_m_gram(&[a, b]).map(|p| p.prob), Some(-0.5));
    assert_eq!(trie.get_n_gram(&[a, b, c]), Some(-0.3));
    assert_eq!(trie.get_n_gram(&[a, c, b]), None);
  }

  #[test]
  fn duplicate_key_overwrites_and_counts_as_collision() {
    let mut trie = G2dmTrie::new(2);
    trie.add_n_gram(&[1, 2], NGramPayload::new(-0.9));
    trie.add_n_gram(&[1, 2], NGramPayload::new(-0.1));
    assert_eq!(trie.collision_count(), 1);
    assert_eq!(trie.get_n_gram(&[1, 2]), Some(-0.1));
  }

  #[test]
  fn table_grows_past_initial_capacity() {
    let mut trie = G2dmTrie::new(2);
    for w in 0..100u32 {
      trie.add_n_gram(&[0, w], NGramPayload::new(-1.0));
    }
    for w in 0..100u32 {
      assert_eq!(trie.get_n_gram(&[0, w]), Some(-1.0));
    }
  }
}
