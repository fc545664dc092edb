use tracing::debug;

use crate::util::hashing::hash64;
use crate::word_id::WordId;
use super::{BasicWordIndex, CountingWordIndex, WordIndex};

/// Which concrete word index `OptimizingWordIndex` wraps.
#[derive(Debug)]
enum Base {
  Basic(BasicWordIndex),
  Counting(CountingWordIndex),
}

impl Base {
  fn iter_entries(&self) -> Box<dyn Iterator<Item = (&str, WordId)> + '_> {
    match self {
      Base::Basic(b) => Box::new(b.iter_entries()),
      Base::Counting(c) => Box::new(c.iter_entries()),
    }
  }
}

/// A closed-addressing probe table mapping a token's hash to its id,
/// built once after the wrapped index is fully populated. Memory
/// layout per §4.1: sized as a power of two >= k*|V| (k ~= 2) so a
/// lookup is a single masked probe with open-addressing fallback --
/// no pointer chasing through a `HashMap`'s buckets.
struct ProbeTable {
  mask: u64,
  slots: Vec<Option<(u64, WordId)>>,
}

impl ProbeTable {
  fn build<'a>(entries: impl Iterator<Item = (&'a str, WordId)>, len_hint: usize) -> Self {
    const LOAD_FACTOR: usize = 2;
    let capacity = (len_hint * LOAD_FACTOR).next_power_of_two().max(4);
    let mask = (capacity - 1) as u64;
    let mut slots = vec![None; capacity];
    for (token, id) in entries {
      let hash = hash64(token.as_bytes());
      let mut slot = (hash & mask) as usize;
      while slots[slot].is_some() {
        slot = (slot + 1) & (mask as usize);
      }
      slots[slot] = Some((hash, id));
    }
    ProbeTable { mask, slots }
  }

  fn probe(&self, token: &str) -> Option<WordId> {
    let hash = hash64(token.as_bytes());
    let mut slot = (hash & self.mask) as usize;
    let start = slot;
    loop {
      match self.slots[slot] {
        Some((h, id)) if h == hash => return Some(id),
        None => return None,
        _ => {}
      }
      slot = (slot + 1) & (self.mask as usize);
      if slot == start {
        return None;
      }
    }
  }
}

/// Wraps `BasicWordIndex`/`CountingWordIndex`; after finalization,
/// builds the closed-addressing probe table described above for
/// branchless lookups (§4.1). Before finalization, behaves exactly
/// like the wrapped base.
pub struct OptimizingWordIndex {
  base: Base,
  table: Option<ProbeTable>,
}

impl OptimizingWordIndex {
  pub fn wrapping_basic() -> Self {
    OptimizingWordIndex { base: Base::Basic(BasicWordIndex::new()), table: None }
  }

  pub fn wrapping_counting() -> Self {
    OptimizingWordIndex { base: Base::Counting(CountingWordIndex::new()), table: None }
  }
}

impl WordIndex for OptimizingWordIndex {
  fn reserve(&mut self, n: usize) {
    match &mut self.base {
      Base::Basic(b) => b.reserve(n),
      Base::Counting(c) => c.reserve(n),
    }
  }

  fn get_word_id(&self, token: &str) -> WordId {
    if let Some(table) = &self.table {
      if let Some(id) = table.probe(token) {
        return id;
      }
    }
    match &self.base {
      Base::Basic(b) => b.get_word_id(token),
      Base::Counting(c) => c.get_word_id(token),
    }
  }

  fn register_word(&mut self, token: &str) -> WordId {
    match &mut self.base {
      Base::Basic(b) => b.register_word(token),
      Base::Counting(c) => c.register_word(token),
    }
  }

  fn len(&self) -> usize {
    match &self.base {
      Base::Basic(b) => b.len(),
      Base::Counting(c) => c.len(),
    }
  }

  fn is_continuous(&self) -> bool {
    true
  }

  fn needs_counting(&self) -> bool {
    matches!(self.base, Base::Counting(_))
  }

  fn count_word(&mut self, token: &str, prob: f32) {
    if let Base::Counting(c) = &mut self.base {
      c.count_word(token, prob);
    }
  }

  fn finalize_counting(&mut self) {
    if let Base::Counting(c) = &mut self.base {
      c.finalize_counting();
    }
  }

  fn needs_post_actions(&self) -> bool {
    true
  }

  fn post_actions(&mut self) {
    let len = self.base.iter_entries().count();
    let table = ProbeTable::build(self.base.iter_entries(), len);
    debug!(len, capacity = table.slots.len(), "built optimizing word index probe table");
    self.table = Some(table);
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn probe_table_agrees_with_base_after_post_actions() {
    let mut idx = OptimizingWordIndex::wrapping_basic();
    let a = idx.register_word("alpha");
    let b = idx.register_word("beta");
    idx.post_actions();
    assert_eq!(idx.get_word_id("alpha"), a);
    assert_eq!(idx.get_word_id("beta"), b);
    assert_eq!(idx.get_word_id("gamma"), crate::word_id::UNKNOWN_WORD_ID);
  }

  #[test]
  fn wraps_counting_variant() {
    let mut idx = OptimizingWordIndex::wrapping_counting();
    idx.count_word("rare", -2.0);
    idx.count_word("common", -0.1);
    idx.finalize_counting();
    idx.post_actions();
    assert!(idx.register_word("common") < idx.register_word("rare"));
  }
}
