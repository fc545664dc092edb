use std::collections::HashMap;

use crate::payload::{MGramPayload, NGramPayload};
use crate::util::hashing::mix64;
use crate::word_id::WordId;
use super::TrieStore;

/// Hash-to-data layout (§4.2 H2DMap): keys are combined hashes of the
/// full word-id sequence, stored in one `HashMap` per level. Meant to
/// pair with `HashingWordIndex`, where word ids are themselves already
/// hash-derived, so there is no separate dense id space to exploit the
/// way the C2D family does -- a pure hash layout is the natural fit.
///
/// Grounded on `h2d_map_trie.cpp`. Where `G2dmTrie` hand-rolls an
/// open-addressing table to show the probing mechanics explicitly,
/// this layout leans on `std::collections::HashMap` directly per the
/// original's own choice of a generic hash map for this variant; the
/// combined-hash *key* is still the hand-rolled `mix64` from
/// `util::hashing`, since that part of the original is bespoke.
pub struct H2dmTrie {
  max_level: usize,
  unigrams: Vec<MGramPayload>,
  mid_levels: Vec<HashMap<u64, MGramPayload>>,
  top_level: HashMap<u64, f32>,
  collisions: u64,
}

impl H2dmTrie {
  pub fn new(max_level: usize) -> Self {
    let mid_count = max_level.saturating_sub(2);
    H2dmTrie {
      max_level,
      unigrams: Vec::new(),
      mid_levels: (0..mid_count).map(|_| HashMap::new()).collect(),
      top_level: HashMap::new(),
      collisions: 0,
    }
  }

  fn ensure_unigram_capacity(&mut self, word_id: WordId) {
    let needed = word_id as usize + 1;
    if self.unigrams.len() < needed {
      self.unigrams.resize(needed, MGramPayload::default());
    }
  }

  fn combined_key(word_ids: &[WordId]) -> u64 {
    word_ids.iter().fold(0u64, |h, &w| mix64(h, w as u64))
  }
}

impl TrieStore for H2dmTrie {
  fn requires_continuous_word_index() -> bool {
    false
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
    let key = Self::combined_key(word_ids);
    if self.mid_levels[level - 2].insert(key, payload).is_some() {
      self.collisions += 1;
    }
  }

  fn add_n_gram(&mut self, word_ids: &[WordId], payload: NGramPayload) {
    debug_assert_eq!(word_ids.len(), self.max_level);
    let key = Self::combined_key(word_ids);
    if self.top_level.insert(key, payload.prob).is_some() {
      self.collisions += 1;
    }
  }

  fn finalize(&mut self) {
    for map in &mut self.mid_levels {
      map.shrink_to_fit();
    }
    self.top_level.shrink_to_fit();
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
    let key = Self::combined_key(word_ids);
    self.mid_levels.get(word_ids.len() - 2)?.get(&key).copied()
  }

  fn get_n_gram(&self, word_ids: &[WordId]) -> Option<f32> {
    let key = Self::combined_key(word_ids);
    self.top_level.get(&key).copied()
  }

  fn collision_count(&self) -> u64 {
    self.collisions
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn exact_hash_key_round_trips() {
    let mut trie = H2dmTrie::new(3);
    trie.preallocate(&[4, 2, 1]);
    trie.add_1_gram(5, MGramPayload::new(-1.0, 0.0));
    trie.add_m_gram(&[5, 9], 2, MGramPayload::new(-0.5, -0.1));
    trie.add_n_gram(&[5, 9, 12], NGramPayload::new(-0.3));
    trie.finalize();

    assert_eq!(trie.get_m_gram(&[5, 9]).map(|p| p.prob), Some(-0.5));
    assert_eq!(trie.get_n_gram(&[5, 9, 12]), Some(-0.3));
    assert_eq!(trie.get_n_gram(&[5, 12, 9]), None);
  }

  #[test]
  fn duplicate_key_overwrites_and_counts_as_collision() {
    let mut trie = H2dmTrie::new(2);
    trie.add_n_gram(&[1, 2], NGramPayload::new(-0.9));
    trie.add_n_gram(&[1, 2], NGramPayload::new(-0.1));
    assert_eq!(trie.collision_count(), 1);
    assert_eq!(trie.get_n_gram(&[1, 2]), Some(-0.1));
  }
}
