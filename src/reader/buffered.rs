use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::ReaderError;
use super::{strip_cr, FileReader};

/// A `getline`-style reader backed by a `BufReader`, reusing one
/// growable buffer across calls instead of allocating a fresh `String`
/// per line (spec §4.6).
pub struct BufferedReader {
  inner: BufReader<File>,
  buf: Vec<u8>,
  path: std::path::PathBuf,
}

impl BufferedReader {
  pub fn open(path: &Path) -> Result<Self, ReaderError> {
    let file = File::open(path).map_err(|source| ReaderError::Open { path: path.to_owned(), source })?;
    Ok(BufferedReader { inner: BufReader::new(file), buf: Vec::new(), path: path.to_owned() })
  }
}

impl FileReader for BufferedReader {
  fn next_line(&mut self) -> Option<&[u8]> {
    self.buf.clear();
    match self.inner.read_until(b'\n', &mut self.buf) {
      Ok(0) => None,
      Ok(_) => {
        if self.buf.last() == Some(&b'\n') {
          self.buf.pop();
        }
        Some(strip_cr(&self.buf))
      }
      Err(source) => {
        tracing::error!(path = %self.path.display(), %source, "I/O error reading ARPA file");
        None
      }
    }
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
    let mut reader = BufferedReader::open(file.path()).unwrap();
    assert_eq!(reader.next_line(), Some(&b"first"[..]));
    assert_eq!(reader.next_line(), Some(&b"second"[..]));
    assert_eq!(reader.next_line(), Some(&b"third"[..]));
    assert_eq!(reader.next_line(), None);
  }

  #[test]
  fn reused_buffer_does_not_leak_previous_content() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "short\nmuch longer line here\nhi").unwrap();
    let mut reader = BufferedReader::open(file.path()).unwrap();
    assert_eq!(reader.next_line(), Some(&b"short"[..]));
    assert_eq!(reader.next_line(), Some(&b"much longer line here"[..]));
    assert_eq!(reader.next_line(), Some(&b"hi"[..]));
  }
}
