//! Optional bitmap-hash cache (spec §4.3): a bitset sized ~k*(#m-grams)
//! rounded to a power of two, indexed by `hash(key) & mask`. A zero bit
//! proves absence; a one bit means "maybe present", giving a cheap
//! negative short-circuit before a full lookup.
//!
//! Grounded on `BitmapHashCache.hpp`/`bitmap_hash_cache.hpp`. The
//! original hand-rolls a byte array with manual bit twiddling; we use a
//! `Vec<u64>` word-oriented bitset, which is the idiomatic Rust
//! equivalent with the same asymptotic cost.

/// Presence changes only performance, never semantics -- a layout can
/// be correct without ever consulting one of these.
pub struct BitmapHashCache {
  words: Vec<u64>,
  mask: u64,
}

impl BitmapHashCache {
  /// `expected_entries` is the (upper-bound) m-gram count at this
  /// level; `buckets_factor` (k in the spec) controls the bitset's
  /// size relative to that count, trading memory for fewer false
  /// positives.
  pub fn new(expected_entries: usize, buckets_factor: usize) -> Self {
    let num_buckets = (expected_entries.max(1) * buckets_factor.max(1)).next_power_of_two();
    let num_words = (num_buckets + 63) / 64;
    BitmapHashCache { words: vec![0u64; num_words.max(1)], mask: (num_words.max(1) * 64 - 1) as u64 }
  }

  #[inline]
  fn bit_index(&self, hash: u64) -> usize {
    (hash & self.mask) as usize
  }

  pub fn set(&mut self, hash: u64) {
    let idx = self.bit_index(hash);
    self.words[idx / 64] |= 1u64 << (idx % 64);
  }

  /// `false` proves the key is absent; `true` only means "maybe
  /// present" (the caller must still do the full lookup).
  pub fn maybe_present(&self, hash: u64) -> bool {
    let idx = self.bit_index(hash);
    (self.words[idx / 64] >> (idx % 64)) & 1 == 1
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn absent_key_is_never_a_false_negative() {
    let mut cache = BitmapHashCache::new(8, 2);
    cache.set(42);
    cache.set(1337);
    assert!(cache.maybe_present(42));
    assert!(cache.maybe_present(1337));
  }

  #[test]
  fn untouched_bits_prove_absence() {
    let cache = BitmapHashCache::new(64, 4);
    // With a large, sparsely populated cache a never-set hash must
    // read back as absent.
    assert!(!cache.maybe_present(7));
  }
}
