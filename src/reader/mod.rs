//! File reader abstraction (spec §4.6): produces successive lines from
//! an ARPA file without heap-allocating per line, plus small helpers
//! for splitting a held line on the first tab or space.
//!
//! Grounded on `llamapun`'s own file-reading conventions (buffered,
//! `std::io`-based) for the buffered variant, and on the wider
//! corpus's use of `memmap2` (`other_examples/manifests/NLnetLabs-rotonda-store`
//! and peers) for the mmap variant spec.md explicitly calls for.

mod buffered;
mod mmap;

pub use buffered::BufferedReader;
pub use mmap::MmapReader;

use std::path::Path;

use crate::error::ReaderError;

/// A source of successive text lines, with CR-before-LF stripped and no
/// further encoding transformation. Implementations must not
/// heap-allocate per call to `next_line` (mmap returns a view into the
/// map; the buffered variant reuses one growable buffer).
pub trait FileReader {
  /// Advances to and returns the next line, or `None` at EOF. The
  /// returned slice excludes the line terminator.
  fn next_line(&mut self) -> Option<&[u8]>;
}

/// Opens `path` as a memory-mapped reader (spec §4.6's mmap variant).
pub fn open_mmap(path: &Path) -> Result<MmapReader, ReaderError> {
  MmapReader::open(path)
}

/// Opens `path` as a buffered, `getline`-style reader (spec §4.6's
/// buffered variant).
pub fn open_buffered(path: &Path) -> Result<BufferedReader, ReaderError> {
  BufferedReader::open(path)
}

/// Splits `line` at its first tab byte, returning `(before, after)`
/// with the tab itself excluded. `None` if no tab is present.
pub fn split_first_tab(line: &[u8]) -> Option<(&[u8], &[u8])> {
  split_first(line, b'\t')
}

/// Splits `line` at its first space byte. `None` if no space is
/// present.
pub fn split_first_space(line: &[u8]) -> Option<(&[u8], &[u8])> {
  split_first(line, b' ')
}

fn split_first(line: &[u8], delim: u8) -> Option<(&[u8], &[u8])> {
  let pos = line.iter().position(|&b| b == delim)?;
  Some((&line[..pos], &line[pos + 1..]))
}

/// Strips a trailing `\r` left by a CRLF-terminated source line.
pub(crate) fn strip_cr(line: &[u8]) -> &[u8] {
  match line.last() {
    Some(b'\r') => &line[..line.len() - 1],
    _ => line,
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn splits_on_first_tab_only() {
    let line = b"-0.5\tthe cat\t-0.1";
    let (prob, rest) = split_first_tab(line).unwrap();
    assert_eq!(prob, b"-0.5");
    assert_eq!(rest, b"the cat\t-0.1");
  }

  #[test]
  fn strips_trailing_cr() {
    assert_eq!(strip_cr(b"hello\r"), b"hello");
    assert_eq!(strip_cr(b"hello"), b"hello");
  }
}
