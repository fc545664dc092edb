use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use crate::error::ReaderError;
use super::{strip_cr, FileReader};

/// A read-only memory-mapped ARPA file; `next_line` scans forward for
/// `\n` and returns a borrowed slice into the map (spec §4.6: "mmap
/// returns a pointer+length into the map").
pub struct MmapReader {
  map: Mmap,
  pos: usize,
}

impl MmapReader {
  pub fn open(path: &Path) -> Result<Self, ReaderError> {
    let file = File::open(path).map_err(|source| ReaderError::Open { path: path.to_owned(), source })?;
    // Safety: the file is treated as an immutable snapshot for the
    // lifetime of this reader, matching the single-threaded-build
    // contract of spec §5; concurrent external mutation of the
    // backing file is outside this crate's control, same as any mmap
    // consumer.
    let map = unsafe { Mmap::map(&file) }.map_err(|source| ReaderError::Mmap { path: path.to_owned(), source })?;
    Ok(MmapReader { map, pos: 0 })
  }
}

impl FileReader for MmapReader {
  fn next_line(&mut self) -> Option<&[u8]> {
    if self.pos >= self.map.len() {
      return None;
    }
    let rest = &self.map[self.pos..];
    let (line, advance) = match rest.iter().position(|&b| b == b'\n') {
      Some(nl) => (&rest[..nl], nl + 1),
      None => (rest, rest.len()),
    };
    self.pos += advance;
    Some(strip_cr(line))
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use std::io::Write;

  #[test]
  fn reads_lines_without_terminators() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "first\r\nsecond\nthird").unwrap();
    let mut reader = MmapReader::open(file.path()).unwrap();
    assert_eq!(reader.next_line(), Some(&b"first"[..]));
    assert_eq!(reader.next_line(), Some(&b"second"[..]));
    assert_eq!(reader.next_line(), Some(&b"third"[..]));
    assert_eq!(reader.next_line(), None);
  }

  #[test]
  fn empty_file_yields_no_lines() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let reader = MmapReader::open(file.path());
    // An empty file maps to a zero-length region on some platforms and
    // fails to map at all on others; either outcome is acceptable as
    // long as no line is ever produced.
    if let Ok(mut reader) = reader {
      assert_eq!(reader.next_line(), None);
    }
  }
}
