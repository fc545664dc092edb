use std::collections::HashMap;

use tracing::warn;

use crate::payload::{MGramPayload, NGramPayload};
use crate::word_id::{pack_context_key, ContextId, WordId};
use super::TrieStore;

/// Context-to-data hybrid layout (§4.2 C2DH): identical to `C2dmTrie` for
/// mid levels, but the top (N-gram) level is stored in a single flat,
/// sorted `Vec<(u64, f32)>` instead of a hash map -- denser and with a
/// smaller per-entry footprint once the key set is known and fixed at
/// `finalize()` time.
///
/// Grounded on `C2DMapTrie.cpp`'s "hybrid" variant, which swaps the last
/// level's backing container for a sorted array after the count is
/// known; `mid_levels`/context resolution are lifted verbatim from
/// `C2dmTrie` (see its doc comment for the private `ContextId` scheme).
#[derive(Default)]
pub struct C2dhTrie {
  max_level: usize,
  unigrams: Vec<MGramPayload>,
  mid_levels: Vec<HashMap<u64, (u32, MGramPayload)>>,
  mid_next_ctx_id: Vec<u32>,
  top_level: Vec<(u64, f32)>,
  top_level_sorted: bool,
  collisions: u64,
}

impl C2dhTrie {
  pub fn new(max_level: usize) -> Self {
    let mid_count = max_level.saturating_sub(2);
    C2dhTrie {
      max_level,
      unigrams: Vec::new(),
      mid_levels: (0..mid_count).map(|_| HashMap::new()).collect(),
      mid_next_ctx_id: vec![1; mid_count],
      top_level: Vec::new(),
      top_level_sorted: false,
      collisions: 0,
    }
  }

  fn ensure_unigram_capacity(&mut self, word_id: WordId) {
    let needed = word_id as usize + 1;
    if self.unigrams.len() < needed {
      self.unigrams.resize(needed, MGramPayload::default());
    }
  }

  fn ctx_of_unigram(&self, word_id: WordId) -> ContextId {
    ContextId(word_id)
  }

  fn ctx_extend(&self, parent: ContextId, word_id: WordId, level: usize) -> Option<ContextId> {
    if !(2..self.max_level).contains(&level) {
      return None;
    }
    let key = pack_context_key(parent, word_id);
    self.mid_levels[level - 2].get(&key).map(|&(id, _)| ContextId(id))
  }

  fn resolve_prefix(&self, prefix: &[WordId]) -> Option<ContextId> {
    let mut iter = prefix.iter();
    let mut ctx = self.ctx_of_unigram(*iter.next()?);
    for (i, &w) in iter.enumerate() {
      ctx = self.ctx_extend(ctx, w, i + 2)?;
    }
    Some(ctx)
  }

  fn top_level_find(&self, key: u64) -> Option<usize> {
    if self.top_level_sorted {
      self.top_level.binary_search_by_key(&key, |&(k, _)| k).ok()
    } else {
      self.top_level.iter().position(|&(k, _)| k == key)
    }
  }
}

impl TrieStore for C2dhTrie {
  fn requires_continuous_word_index() -> bool {
    true
  }

  fn preallocate(&mut self, counts: &[usize]) {
    if let Some(&n1) = counts.first() {
      self.unigrams.resize((n1 + 2).max(self.unigrams.len()), MGramPayload::default());
    }
    for (i, map) in self.mid_levels.iter_mut().enumerate() {
      if let Some(&count) = counts.get(i + 1) {
        map.reserve(count);
      }
    }
    if let Some(&count) = counts.get(self.max_level.saturating_sub(1)) {
      self.top_level.reserve(count);
    }
  }

  fn add_1_gram(&mut self, word_id: WordId, payload: MGramPayload) {
    self.ensure_unigram_capacity(word_id);
    self.unigrams[word_id as usize] = payload;
  }

  fn add_m_gram(&mut self, word_ids: &[WordId], level: usize, payload: MGramPayload) {
    debug_assert_eq!(word_ids.len(), level);
    debug_assert!((2..self.max_level).contains(&level));
    let Some(parent) = self.resolve_prefix(&word_ids[..level - 1]) else {
      warn!(level, "dropping m-gram whose prefix context could not be resolved");
      return;
    };
    let key = pack_context_key(parent, word_ids[level - 1]);
    let slot = &mut self.mid_levels[level - 2];
    let next_id = &mut self.mid_next_ctx_id[level - 2];
    match slot.get_mut(&key) {
      Some((_, existing)) => {
        self.collisions += 1;
        warn!(level, key, "duplicate m-gram insertion, overwriting");
        *existing = payload;
      }
      None => {
        let id = *next_id;
        *next_id += 1;
        slot.insert(key, (id, payload));
      }
    }
  }

  fn add_n_gram(&mut self, word_ids: &[WordId], payload: NGramPayload) {
    debug_assert_eq!(word_ids.len(), self.max_level);
    debug_assert!(!self.top_level_sorted, "add_n_gram called after finalize()");
    let Some(parent) = self.resolve_prefix(&word_ids[..word_ids.len() - 1]) else {
      warn!("dropping n-gram whose prefix context could not be resolved");
      return;
    };
    let key = pack_context_key(parent, word_ids[word_ids.len() - 1]);
    if let Some(pos) = self.top_level.iter().position(|&(k, _)| k == key) {
      self.collisions += 1;
      warn!(key, "duplicate n-gram insertion, overwriting");
      self.top_level[pos].1 = payload.prob;
    } else {
      self.top_level.push((key, payload.prob));
    }
  }

  fn finalize(&mut self) {
    for map in &mut self.mid_levels {
      map.shrink_to_fit();
    }
    self.top_level.sort_unstable_by_key(|&(k, _)| k);
    self.top_level.shrink_to_fit();
    self.top_level_sorted = true;
  }

  fn count_at_level(&self, level: usize) -> usize {
    if level == 0 {
      return 0;
    }
    if level == 1 {
      return self.unigrams.iter().filter(|p| p.prob != f32::NEG_INFINITY).count();
    }
    if level == self.max_level {
      return self.top_level.len();
    }
    self.mid_levels.get(level - 2).map_or(0, |m| m.len())
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
    let key = pack_context_key(parent, word_ids[level - 1]);
    self.mid_levels[level - 2].get(&key).map(|&(_, payload)| payload)
  }

  fn get_n_gram(&self, word_ids: &[WordId]) -> Option<f32> {
    let parent = self.resolve_prefix(&word_ids[..word_ids.len() - 1])?;
    let key = pack_context_key(parent, word_ids[word_ids.len() - 1]);
    self.top_level_find(key).map(|i| self.top_level[i].1)
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
  fn trigram_round_trips_after_finalize() {
    let mut trie = C2dhTrie::new(3);
    trie.preallocate(&[3, 1, 1]);
    let a = MIN_KNOWN_WORD_ID;
    let b = a + 1;
    let c = a + 2;
    trie.add_1_gram(a, MGramPayload::new(-1.0, 0.0));
    trie.add_1_gram(b, MGramPayload::new(-1.0, -0.2));
    trie.add_1_gram(c, MGramPayload::new(-1.0, 0.0));
    trie.add_m_gram(&[a, b], 2, MGramPayload::new(-0.5, -0.1));
    trie.add_n_gram(&[a, b, c], NGramPayload::new(-0.3));
    trie.finalize();

    assert_eq!(trie.get_n_gram(&[a, b, c]), Some(-0.3));
    assert_eq!(trie.get_n_gram(&[a, c, b]), None);
  }

  #[test]
  fn top_level_lookup_works_before_and_after_sort() {
    let mut trie = C2dhTrie::new(2);
    trie.preallocate(&[2, 1]);
    let a = MIN_KNOWN_WORD_ID;
    let b = a + 1;
    trie.add_1_gram(a, MGramPayload::new(-1.0, 0.0));
    trie.add_1_gram(b, MGramPayload::new(-1.0, 0.0));
    trie.add_n_gram(&[a, b], NGramPayload::new(-0.7));
    assert_eq!(trie.get_n_gram(&[a, b]), Some(-0.7));
    trie.finalize();
    assert_eq!(trie.get_n_gram(&[a, b]), Some(-0.7));
  }
}
