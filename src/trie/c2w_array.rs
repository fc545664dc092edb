use std::collections::HashMap;

use rayon::slice::ParallelSliceMut;
use tracing::warn;

use crate::payload::{MGramPayload, NGramPayload};
use crate::word_id::{pack_context_key, ContextId, WordId};
use super::TrieStore;

/// One finalized level of a `C2waTrie`/`C2chTrie`: a flat array of
/// `(word_id, payload)` sorted by `(parent_dense_id, word_id)`, plus a
/// `[begin, end)` range per parent dense id for binary search within a
/// context (§4.2 C2WArray: "a flat array... sorted by word_id; each
/// context... stores a `[begin, end)` range").
struct FlatLevel<P> {
  entries: Vec<(WordId, P, u32)>,
  ranges: Vec<(u32, u32)>,
}

impl<P: Copy> FlatLevel<P> {
  fn empty() -> Self {
    FlatLevel { entries: Vec::new(), ranges: Vec::new() }
  }

  /// Binary search for `word_id` within the range owned by
  /// `parent_dense_id`; returns the matching entry's `(payload,
  /// dense_id)` pair.
  fn lookup(&self, parent_dense_id: u32, word_id: WordId) -> Option<(P, u32)> {
    let &(begin, end) = self.ranges.get(parent_dense_id as usize)?;
    let slice = &self.entries[begin as usize..end as usize];
    slice.binary_search_by_key(&word_id, |&(w, _, _)| w).ok().map(|i| {
      let (_, payload, dense_id) = slice[i];
      (payload, dense_id)
    })
  }
}

/// Builds a `FlatLevel` from a build-time hash map keyed by the packed
/// `(parent_dense_id, word_id)` pair, grouping entries by parent and
/// sorting each group by word id.
fn finalize_level<P: Copy + Send>(built: &HashMap<u64, (u32, P)>, parent_count: usize) -> FlatLevel<P> {
  let mut decoded: Vec<(u32, WordId, u32, P)> = built
    .iter()
    .map(|(&key, &(dense_id, payload))| {
      let parent = (key >> 32) as u32;
      let word = key as u32;
      (parent, word, dense_id, payload)
    })
    .collect();
  // Finalization is the one place a very large trie spends real wall-clock
  // time, and the sort is embarrassingly parallel (independent keys, no
  // shared state) -- `par_sort_unstable_by` instead of a sequential
  // `sort_unstable_by_key`, per §4.2's "array-of-ranges" layout.
  decoded.par_sort_unstable_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

  let mut entries = Vec::with_capacity(decoded.len());
  let mut ranges = vec![(0u32, 0u32); parent_count];
  let mut i = 0usize;
  while i < decoded.len() {
    let parent = decoded[i].0;
    let begin = entries.len() as u32;
    while i < decoded.len() && decoded[i].0 == parent {
      let (_, word, dense_id, payload) = decoded[i];
      entries.push((word, payload, dense_id));
      i += 1;
    }
    let end = entries.len() as u32;
    if (parent as usize) < ranges.len() {
      ranges[parent as usize] = (begin, end);
    }
  }
  FlatLevel { entries, ranges }
}

/// Context-to-word, sorted-array layout (§4.2 C2WArray/W2CHybrid naming
/// aside -- this module covers the array-of-`{word_id, payload}`
/// variant; `finalize()` performs the sort the spec calls out
/// explicitly for this layout).
///
/// Grounded on `c2w_array_trie.cpp`; build-time state reuses the same
/// packed-key hash map approach as `C2dmTrie` (dense ids assigned on
/// first insertion double as parent handles for the next level down),
/// but `finalize()` flattens each level into a sorted array instead of
/// leaving it as a hash map, trading a bit of build-time work for
/// smaller, binary-searchable storage.
pub struct C2waTrie {
  max_level: usize,
  unigrams: Vec<MGramPayload>,
  build_mid: Vec<HashMap<u64, (u32, MGramPayload)>>,
  build_mid_next_id: Vec<u32>,
  build_top: HashMap<u64, f32>,
  mid_levels: Vec<FlatLevel<MGramPayload>>,
  top_level: FlatLevel<f32>,
  finalized: bool,
  collisions: u64,
}

impl C2waTrie {
  pub fn new(max_level: usize) -> Self {
    let mid_count = max_level.saturating_sub(2);
    C2waTrie {
      max_level,
      unigrams: Vec::new(),
      build_mid: (0..mid_count).map(|_| HashMap::new()).collect(),
      build_mid_next_id: vec![0; mid_count],
      build_top: HashMap::new(),
      mid_levels: Vec::new(),
      top_level: FlatLevel::empty(),
      finalized: false,
      collisions: 0,
    }
  }

  fn ensure_unigram_capacity(&mut self, word_id: WordId) {
    let needed = word_id as usize + 1;
    if self.unigrams.len() < needed {
      self.unigrams.resize(needed, MGramPayload::default());
    }
  }

  /// Walks `prefix` down the finalized levels, returning the dense
  /// parent id to address the next level with. Level-1 contexts use the
  /// word id itself as its dense id (see `C2dmTrie::ctx_of_unigram`).
  fn resolve_prefix(&self, prefix: &[WordId]) -> Option<u32> {
    debug_assert!(self.finalized, "C2waTrie queried before finalize()");
    let mut iter = prefix.iter();
    let mut dense_id = *iter.next()?;
    for (i, &w) in iter.enumerate() {
      let level = i + 2; // the level we're resolving a child within
      let (_, next_dense_id) = if level - 2 < self.mid_levels.len() {
        self.mid_levels[level - 2].lookup(dense_id, w)?
      } else {
        return None;
      };
      dense_id = next_dense_id;
    }
    Some(dense_id)
  }
}

impl TrieStore for C2waTrie {
  fn requires_continuous_word_index() -> bool {
    true
  }

  fn preallocate(&mut self, counts: &[usize]) {
    if let Some(&n1) = counts.first() {
      self.unigrams.resize((n1 + 2).max(self.unigrams.len()), MGramPayload::default());
    }
    for (i, map) in self.build_mid.iter_mut().enumerate() {
      if let Some(&count) = counts.get(i + 1) {
        map.reserve(count);
      }
    }
    if let Some(&count) = counts.get(self.max_level.saturating_sub(1)) {
      self.build_top.reserve(count);
    }
  }

  fn add_1_gram(&mut self, word_id: WordId, payload: MGramPayload) {
    self.ensure_unigram_capacity(word_id);
    self.unigrams[word_id as usize] = payload;
  }

  fn add_m_gram(&mut self, word_ids: &[WordId], level: usize, payload: MGramPayload) {
    debug_assert_eq!(word_ids.len(), level);
    debug_assert!((2..self.max_level).contains(&level));
    let parent = if level == 2 {
      Some(word_ids[0])
    } else {
      // Build-time parent resolution still has to chase the chain
      // through the not-yet-flattened hash maps.
      self.build_resolve_prefix(&word_ids[..level - 1])
    };
    let Some(parent) = parent else {
      warn!(level, "dropping m-gram whose prefix context could not be resolved");
      return;
    };
    let key = pack_context_key(ContextId(parent), word_ids[level - 1]);
    let slot = &mut self.build_mid[level - 2];
    match slot.get_mut(&key) {
      Some((_, existing)) => {
        self.collisions += 1;
        warn!(level, key, "duplicate m-gram insertion, overwriting");
        *existing = payload;
      }
      None => {
        let id = self.build_mid_next_id[level - 2];
        self.build_mid_next_id[level - 2] += 1;
        slot.insert(key, (id, payload));
      }
    }
  }

  fn add_n_gram(&mut self, word_ids: &[WordId], payload: NGramPayload) {
    debug_assert_eq!(word_ids.len(), self.max_level);
    let Some(parent) = self.build_resolve_prefix(&word_ids[..word_ids.len() - 1]) else {
      warn!("dropping n-gram whose prefix context could not be resolved");
      return;
    };
    let key = pack_context_key(ContextId(parent), word_ids[word_ids.len() - 1]);
    if self.build_top.insert(key, payload.prob).is_some() {
      self.collisions += 1;
      warn!(key, "duplicate n-gram insertion, overwriting");
    }
  }

  fn finalize(&mut self) {
    let mid_count = self.build_mid.len();
    let mut finalized_mid = Vec::with_capacity(mid_count);
    let mut prev_parent_count = self.unigrams.len();
    for (i, built) in self.build_mid.iter().enumerate() {
      let level_flat = finalize_level(built, prev_parent_count);
      prev_parent_count = self.build_mid_next_id[i] as usize;
      finalized_mid.push(level_flat);
    }
    self.mid_levels = finalized_mid;

    let last_mid_count = if mid_count == 0 { self.unigrams.len() } else { self.build_mid_next_id[mid_count - 1] as usize };
    self.top_level = finalize_level(&self.build_top, last_mid_count);
    self.finalized = true;
  }

  fn count_at_level(&self, level: usize) -> usize {
    if level == 0 {
      return 0;
    }
    if level == 1 {
      return self.unigrams.iter().filter(|p| p.prob != f32::NEG_INFINITY).count();
    }
    if level == self.max_level {
      return self.top_level.entries.len();
    }
    self.mid_levels.get(level - 2).map_or(0, |l| l.entries.len())
  }

  fn max_level(&self) -> usize {
    self.max_level
  }

  fn get_1_gram(&self, word_id: WordId) -> MGramPayload {
    self.unigrams.get(word_id as usize).copied().unwrap_or_default()
  }

  fn get_m_gram(&self, word_ids: &[WordId]) -> Option<MGramPayload> {
    let level = word_ids.len();
    let parent = self.resolve_prefix(&word_ids[..level - 1])?;
    self.mid_levels[level - 2].lookup(parent, word_ids[level - 1]).map(|(payload, _)| payload)
  }

  fn get_n_gram(&self, word_ids: &[WordId]) -> Option<f32> {
    let parent = self.resolve_prefix(&word_ids[..word_ids.len() - 1])?;
    self.top_level.lookup(parent, word_ids[word_ids.len() - 1]).map(|(prob, _)| prob)
  }

  fn collision_count(&self) -> u64 {
    self.collisions
  }
}

impl C2waTrie {
  /// Pre-finalize prefix resolution, walking the still-mutable build
  /// hash maps (mirrors `C2dmTrie::resolve_prefix`). Used only while
  /// ingesting an ARPA file, before the flat arrays exist.
  fn build_resolve_prefix(&self, prefix: &[WordId]) -> Option<u32> {
    let mut iter = prefix.iter();
    let mut dense_id = *iter.next()?;
    for (i, &w) in iter.enumerate() {
      let level = i + 2;
      if level - 2 >= self.build_mid.len() {
        return None;
      }
      let key = pack_context_key(ContextId(dense_id), w);
      dense_id = self.build_mid[level - 2].get(&key)?.0;
    }
    Some(dense_id)
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::word_id::MIN_KNOWN_WORD_ID;

  #[test]
  fn binary_search_finds_exact_trigram() {
    let mut trie = C2waTrie::new(3);
    trie.preallocate(&[4, 2, 1]);
    let a = MIN_KNOWN_WORD_ID;
    let b = a + 1;
    let c = a + 2;
    let d = a + 3;
    trie.add_1_gram(a, MGramPayload::new(-1.0, 0.0));
    trie.add_1_gram(b, MGramPayload::new(-1.0, 0.0));
    trie.add_1_gram(c, MGramPayload::new(-1.0, 0.0));
    trie.add_1_gram(d, MGramPayload::new(-1.0, 0.0));
    trie.add_m_gram(&[a, c], 2, MGramPayload::new(-0.4, -0.1));
    trie.add_m_gram(&[a, d], 2, MGramPayload::new(-0.6, -0.1));
    trie.add_n_gram(&[a, c, b], NGramPayload::new(-0.2));
    trie.finalize();

    assert_eq!(trie.get_m_gram(&[a, c]).map(|p| p.prob), Some(-0.4));
    assert_eq!(trie.get_m_gram(&[a, d]).map(|p| p.prob), Some(-0.6));
    assert_eq!(trie.get_n_gram(&[a, c, b]), Some(-0.2));
    assert_eq!(trie.get_n_gram(&[a, d, b]), None);
  }

  #[test]
  fn unrelated_contexts_do_not_collide_in_shared_ranges() {
    let mut trie = C2waTrie::new(2);
    trie.preallocate(&[3, 2]);
    let a = MIN_KNOWN_WORD_ID;
    let b = a + 1;
    let c = a + 2;
    trie.add_1_gram(a, MGramPayload::new(-1.0, 0.0));
    trie.add_1_gram(b, MGramPayload::new(-1.0, 0.0));
    trie.add_1_gram(c, MGramPayload::new(-1.0, 0.0));
    trie.add_n_gram(&[a, c], NGramPayload::new(-0.1));
    trie.add_n_gram(&[b, c], NGramPayload::new(-0.9));
    trie.finalize();
    assert_eq!(trie.get_n_gram(&[a, c]), Some(-0.1));
    assert_eq!(trie.get_n_gram(&[b, c]), Some(-0.9));
  }
}
