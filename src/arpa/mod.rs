//! ARPA file builder (spec §4.4): drives a `FileReader` through the
//! `\data\` header and each `\m-grams:` section, registering words and
//! populating a `TrieStore`.
//!
//! Grounded on the build algorithm of spec §4.4 itself (distilled from
//! `arpa_builder.hpp`/`arpa_model_reader.hpp`), with line tokenization
//! style borrowed from `other_examples/.../twuebi-kenlm-rs`'s
//! `ArpaReader` (tab/whitespace splitting, one `thiserror` enum per
//! fatal condition, a local recoverable-vs-fatal split).

use tracing::warn;

use crate::error::{ArpaError, LineParseError};
use crate::payload::{MGramPayload, NGramPayload};
use crate::reader::{split_first_tab, FileReader};
use crate::trie::TrieStore;
use crate::word_id::{MAX_NGRAM_ORDER, UNKNOWN_WORD_ID, UNKNOWN_WORD_STR, UNK_DEFAULT};
use crate::word_index::WordIndex;

const DATA_HEADER: &[u8] = b"\\data\\";
const END_MARKER: &[u8] = b"\\end\\";

/// Per-level and summary statistics returned by a completed build
/// (supplemented from `StatisticsMonitor.hpp`, minus the progress/timing
/// half that is out of scope -- see SPEC_FULL.md §C.4).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildReport {
  /// `counts[m]` is the number of m-grams declared by the header, for
  /// `m` in `1..=max_level`; unused higher indices stay zero.
  pub counts: [usize; MAX_NGRAM_ORDER + 1],
  /// `stored[m]` is the number actually inserted (T6: `stored[m] <=
  /// counts[m]`; strictly less is fine, the header count is only an
  /// upper bound per invariant I5).
  pub stored: [usize; MAX_NGRAM_ORDER + 1],
  pub max_level: usize,
  /// Recoverable per-line parse failures encountered and skipped.
  pub line_errors: Vec<LineParseError>,
}

fn trim(line: &[u8]) -> &[u8] {
  let start = line.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(line.len());
  let end = line.iter().rposition(|b| !b.is_ascii_whitespace()).map_or(start, |p| p + 1);
  &line[start..end]
}

/// One parsed, not-yet-registered ARPA m-gram line.
struct ParsedLine {
  prob: f32,
  words: Vec<String>,
  back: f32,
}

fn parse_line(line: &[u8], level: usize, line_no: usize) -> Result<ParsedLine, LineParseError> {
  let (prob_field, rest) = split_first_tab(line).ok_or(LineParseError::MissingField { line: line_no, level })?;
  let prob_str = std::str::from_utf8(prob_field).unwrap_or("");
  let prob: f32 = prob_str
    .trim()
    .parse()
    .map_err(|_| LineParseError::BadProbability { line: line_no, level, field: prob_str.to_owned() })?;

  let (words_field, back) = match split_first_tab(rest) {
    Some((words_field, back_field)) => {
      let back_str = std::str::from_utf8(back_field).unwrap_or("0.0");
      let back: f32 = back_str.trim().parse().unwrap_or(0.0);
      (words_field, back)
    }
    None => (rest, 0.0),
  };

  let words: Vec<String> = std::str::from_utf8(trim(words_field))
    .unwrap_or("")
    .split_ascii_whitespace()
    .map(|s| s.to_owned())
    .collect();
  if words.len() != level {
    return Err(LineParseError::WordCountMismatch { line: line_no, level, expected: level, found: words.len() });
  }
  Ok(ParsedLine { prob, words, back })
}

fn looks_like_marker(line: &[u8]) -> bool {
  line.starts_with(b"\\")
}

/// Reads forward, skipping blank lines, until a non-blank line (the
/// next section marker, or `\end\`) is found.
fn scan_for_next_marker(reader: &mut impl FileReader, line_no: &mut usize) -> Option<Vec<u8>> {
  loop {
    let line = reader.next_line()?;
    *line_no += 1;
    let trimmed = trim(line);
    if !trimmed.is_empty() {
      return Some(trimmed.to_vec());
    }
  }
}

/// Populates `word_index` and `trie` from the ARPA file read through
/// `reader`.
pub fn build<W: WordIndex, T: TrieStore>(
  reader: &mut impl FileReader,
  word_index: &mut W,
  trie: &mut T,
) -> Result<BuildReport, ArpaError> {
  let header_line = reader.next_line().ok_or(ArpaError::DataHeaderMissing)?;
  if trim(header_line) != DATA_HEADER {
    return Err(ArpaError::DataHeaderMissing);
  }

  let mut counts = [0usize; MAX_NGRAM_ORDER + 1];
  let mut max_level = 0usize;
  let mut pending_marker: Option<Vec<u8>> = None;
  let mut line_no = 1usize;

  loop {
    let Some(line) = reader.next_line() else {
      return Err(ArpaError::CountsHeaderMalformed("unexpected end of file in counts header".to_owned()));
    };
    line_no += 1;
    let trimmed = trim(line);
    if trimmed.is_empty() {
      continue;
    }
    if let Some(rest) = trimmed.strip_prefix(b"ngram ") {
      let rest = std::str::from_utf8(rest).map_err(|_| ArpaError::CountsHeaderMalformed("non-UTF8 counts line".to_owned()))?;
      let (m_str, count_str) =
        rest.split_once('=').ok_or_else(|| ArpaError::CountsHeaderMalformed(rest.to_owned()))?;
      let m: usize = m_str.trim().parse().map_err(|_| ArpaError::CountsHeaderMalformed(rest.to_owned()))?;
      let count: usize = count_str.trim().parse().map_err(|_| ArpaError::CountsHeaderMalformed(rest.to_owned()))?;
      if m == 0 || m > MAX_NGRAM_ORDER {
        return Err(ArpaError::CountsHeaderMalformed(format!("ngram order {m} out of range")));
      }
      counts[m] = count;
      max_level = max_level.max(m);
      continue;
    }
    pending_marker = Some(trimmed.to_vec());
    break;
  }

  if max_level == 0 {
    return Err(ArpaError::CountsHeaderMalformed("no ngram counts declared".to_owned()));
  }

  // The highest declared header level is routed through `add_n_gram`
  // into the trie's top-level bucket, everything below it through
  // `add_m_gram` into a mid-level map; both are sized off
  // `trie.max_level()`. If the header's order and the trie's configured
  // order disagree, the level that should be "last" is keyed and routed
  // as a mid-level gram instead (or vice versa) and becomes unreachable
  // from the query path, which dispatches on `trie.max_level()` too.
  if max_level != trie.max_level() {
    return Err(ArpaError::OrderMismatch { header: max_level, trie: trie.max_level() });
  }

  // `preallocate` has no failure path of its own: an allocator-level
  // out-of-memory condition aborts the process rather than returning a
  // `Result`, matching spec §7's "OOM at preallocate terminates the
  // build" (Rust's allocator abort substitutes for the original's
  // explicit fatal-error path; `ArpaError::Preallocate` is kept for a
  // future caller that wants to catch this via `std::alloc::set_alloc_error_hook`).
  trie.preallocate(&counts[1..=max_level]);
  word_index.reserve(counts[1]);

  let mut line_errors = Vec::new();
  let mut stored = [0usize; MAX_NGRAM_ORDER + 1];

  for level in 1..=max_level {
    let marker = match pending_marker.take() {
      Some(m) => m,
      None => scan_for_next_marker(reader, &mut line_no)
        .ok_or(ArpaError::SectionMarkerMismatch { expected: level, found: "<eof>".to_owned() })?,
    };
    let expected_marker = format!("\\{level}-grams:");
    if marker != expected_marker.as_bytes() {
      return Err(ArpaError::SectionMarkerMismatch {
        expected: level,
        found: String::from_utf8_lossy(&marker).into_owned(),
      });
    }

    // Each `ingest_*` reads up to `counts[level]` lines, but may stop
    // early if it runs into the next section marker -- that marker is
    // handed back via `pending_marker` so the outer loop doesn't have
    // to re-scan for it (invariant I5 only bounds the count from
    // above, so an early marker is not itself an error).
    if level == 1 && word_index.needs_counting() {
      let (n, marker) =
        ingest_counting_unigrams(reader, word_index, trie, counts[1], &mut line_no, &mut line_errors)?;
      stored[1] = n;
      pending_marker = marker;
    } else if level == max_level {
      let (n, marker) =
        ingest_n_grams(reader, word_index, trie, level, counts[level], &mut line_no, &mut line_errors)?;
      stored[level] = n;
      pending_marker = marker;
    } else if level == 1 {
      let (n, marker) = ingest_unigrams(reader, word_index, trie, counts[1], &mut line_no, &mut line_errors)?;
      stored[1] = n;
      pending_marker = marker;
    } else {
      let (n, marker) =
        ingest_m_grams(reader, word_index, trie, level, counts[level], &mut line_no, &mut line_errors)?;
      stored[level] = n;
      pending_marker = marker;
    }

    if stored[level] > counts[level] {
      return Err(ArpaError::CountMismatch { level, declared: counts[level], actual: stored[level] });
    }

    if pending_marker.is_none() {
      pending_marker = scan_for_next_marker(reader, &mut line_no);
    }
  }

  match pending_marker {
    Some(marker) if marker == END_MARKER => {}
    Some(marker) => {
      return Err(ArpaError::EndMarkerMissing { found: String::from_utf8_lossy(&marker).into_owned() });
    }
    None => return Err(ArpaError::EndMarkerMissing { found: "<eof>".to_owned() }),
  }

  trie.finalize();
  if word_index.needs_post_actions() {
    word_index.post_actions();
  }

  Ok(BuildReport { counts, stored, max_level, line_errors })
}

/// Reads up to `expected` valid 1-gram lines for a non-counting word
/// index. Returns the number stored and, if the section ended early
/// because a marker line was seen, that marker.
fn ingest_unigrams<W: WordIndex, T: TrieStore>(
  reader: &mut impl FileReader,
  word_index: &mut W,
  trie: &mut T,
  expected: usize,
  line_no: &mut usize,
  line_errors: &mut Vec<LineParseError>,
) -> Result<(usize, Option<Vec<u8>>), ArpaError> {
  let mut stored = 0usize;
  let mut saw_unknown = false;
  let marker = loop {
    if stored >= expected {
      break None;
    }
    let Some(line) = reader.next_line() else { break None };
    *line_no += 1;
    let trimmed = trim(line);
    if trimmed.is_empty() {
      continue;
    }
    if looks_like_marker(trimmed) {
      break Some(trimmed.to_vec());
    }
    match parse_line(trimmed, 1, *line_no) {
      Ok(parsed) => {
        let word = &parsed.words[0];
        if word == UNKNOWN_WORD_STR {
          saw_unknown = true;
        }
        let id = word_index.register_word(word);
        trie.add_1_gram(id, MGramPayload::new(parsed.prob, parsed.back));
        stored += 1;
      }
      Err(e) => {
        warn!(line = *line_no, "skipping malformed 1-gram line: {e}");
        line_errors.push(e);
      }
    }
  };
  if !saw_unknown {
    // I1: UNKNOWN must always carry a payload, even if absent from the
    // ARPA file.
    trie.add_1_gram(UNKNOWN_WORD_ID, MGramPayload::new(UNK_DEFAULT, 0.0));
  }
  Ok((stored, marker))
}

/// As `ingest_unigrams`, but for a word index needing the two-pass
/// counting protocol: buffers the section (bounded by vocabulary size)
/// instead of re-reading the file, which would require a seekable
/// `FileReader`.
fn ingest_counting_unigrams<W: WordIndex, T: TrieStore>(
  reader: &mut impl FileReader,
  word_index: &mut W,
  trie: &mut T,
  expected: usize,
  line_no: &mut usize,
  line_errors: &mut Vec<LineParseError>,
) -> Result<(usize, Option<Vec<u8>>), ArpaError> {
  let mut buffered = Vec::with_capacity(expected);
  let mut saw_unknown = false;
  let marker = loop {
    if buffered.len() >= expected {
      break None;
    }
    let Some(line) = reader.next_line() else { break None };
    *line_no += 1;
    let trimmed = trim(line);
    if trimmed.is_empty() {
      continue;
    }
    if looks_like_marker(trimmed) {
      break Some(trimmed.to_vec());
    }
    match parse_line(trimmed, 1, *line_no) {
      Ok(parsed) => {
        if parsed.words[0] == UNKNOWN_WORD_STR {
          saw_unknown = true;
        }
        buffered.push(parsed);
      }
      Err(e) => {
        warn!(line = *line_no, "skipping malformed 1-gram line: {e}");
        line_errors.push(e);
      }
    }
  };

  for parsed in &buffered {
    word_index.count_word(&parsed.words[0], parsed.prob);
  }
  word_index.finalize_counting();

  for parsed in &buffered {
    let id = word_index.register_word(&parsed.words[0]);
    trie.add_1_gram(id, MGramPayload::new(parsed.prob, parsed.back));
  }
  if !saw_unknown {
    trie.add_1_gram(UNKNOWN_WORD_ID, MGramPayload::new(UNK_DEFAULT, 0.0));
  }
  Ok((buffered.len(), marker))
}

fn ingest_m_grams<W: WordIndex, T: TrieStore>(
  reader: &mut impl FileReader,
  word_index: &mut W,
  trie: &mut T,
  level: usize,
  expected: usize,
  line_no: &mut usize,
  line_errors: &mut Vec<LineParseError>,
) -> Result<(usize, Option<Vec<u8>>), ArpaError> {
  let mut stored = 0usize;
  let marker = loop {
    if stored >= expected {
      break None;
    }
    let Some(line) = reader.next_line() else { break None };
    *line_no += 1;
    let trimmed = trim(line);
    if trimmed.is_empty() {
      continue;
    }
    if looks_like_marker(trimmed) {
      break Some(trimmed.to_vec());
    }
    match parse_line(trimmed, level, *line_no) {
      Ok(parsed) => {
        let ids: Vec<_> = parsed.words.iter().map(|w| word_index.get_word_id(w)).collect();
        trie.add_m_gram(&ids, level, MGramPayload::new(parsed.prob, parsed.back));
        stored += 1;
      }
      Err(e) => {
        warn!(line = *line_no, level, "skipping malformed m-gram line: {e}");
        line_errors.push(e);
      }
    }
  };
  Ok((stored, marker))
}

fn ingest_n_grams<W: WordIndex, T: TrieStore>(
  reader: &mut impl FileReader,
  word_index: &mut W,
  trie: &mut T,
  level: usize,
  expected: usize,
  line_no: &mut usize,
  line_errors: &mut Vec<LineParseError>,
) -> Result<(usize, Option<Vec<u8>>), ArpaError> {
  let mut stored = 0usize;
  let marker = loop {
    if stored >= expected {
      break None;
    }
    let Some(line) = reader.next_line() else { break None };
    *line_no += 1;
    let trimmed = trim(line);
    if trimmed.is_empty() {
      continue;
    }
    if looks_like_marker(trimmed) {
      break Some(trimmed.to_vec());
    }
    match parse_line(trimmed, level, *line_no) {
      Ok(parsed) => {
        let ids: Vec<_> = parsed.words.iter().map(|w| word_index.get_word_id(w)).collect();
        trie.add_n_gram(&ids, NGramPayload::new(parsed.prob));
        stored += 1;
      }
      Err(e) => {
        warn!(line = *line_no, level, "skipping malformed n-gram line: {e}");
        line_errors.push(e);
      }
    }
  };
  Ok((stored, marker))
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::reader::FileReader;
  use crate::trie::C2dmTrie;
  use crate::word_index::BasicWordIndex;

  struct VecReader {
    lines: Vec<Vec<u8>>,
    pos: usize,
  }

  impl VecReader {
    fn new(text: &str) -> Self {
      VecReader { lines: text.lines().map(|l| l.as_bytes().to_vec()).collect(), pos: 0 }
    }
  }

  impl FileReader for VecReader {
    fn next_line(&mut self) -> Option<&[u8]> {
      if self.pos >= self.lines.len() {
        return None;
      }
      let line = &self.lines[self.pos];
      self.pos += 1;
      Some(line)
    }
  }

  #[test]
  fn loads_scenario_1_single_unigram() {
    let text = "\\data\\\nngram 1=2\n\n\\1-grams:\n-1.0\t<unk>\n-0.5\tthe\t-0.30103\n\\end\\\n";
    let mut reader = VecReader::new(text);
    let mut wi = BasicWordIndex::new();
    let mut trie = C2dmTrie::new(1);
    let report = build(&mut reader, &mut wi, &mut trie).unwrap();
    assert_eq!(report.stored[1], 2);
    let the_id = wi.get_word_id("the");
    assert_eq!(trie.get_1_gram(the_id).prob, -0.5);
  }

  #[test]
  fn missing_data_header_is_fatal() {
    let mut reader = VecReader::new("ngram 1=1\n\\1-grams:\n-1.0\tfoo\n\\end\\\n");
    let mut wi = BasicWordIndex::new();
    let mut trie = C2dmTrie::new(2);
    assert!(build(&mut reader, &mut wi, &mut trie).is_err());
  }

  #[test]
  fn malformed_probability_is_recoverable() {
    let text = "\\data\\\nngram 1=2\n\n\\1-grams:\nNOTANUMBER\tbad\n-0.5\tthe\n\\end\\\n";
    let mut reader = VecReader::new(text);
    let mut wi = BasicWordIndex::new();
    let mut trie = C2dmTrie::new(1);
    let report = build(&mut reader, &mut wi, &mut trie).unwrap();
    assert_eq!(report.line_errors.len(), 1);
    assert_eq!(report.stored[1], 1);
  }

  #[test]
  fn section_ending_before_declared_count_is_not_an_error() {
    // I5: the header count is only an upper bound.
    let text = "\\data\\\nngram 1=5\n\n\\1-grams:\n-1.0\t<unk>\n-0.5\tthe\n\\end\\\n";
    let mut reader = VecReader::new(text);
    let mut wi = BasicWordIndex::new();
    let mut trie = C2dmTrie::new(1);
    let report = build(&mut reader, &mut wi, &mut trie).unwrap();
    assert_eq!(report.stored[1], 2);
  }

  #[test]
  fn counting_word_index_reassigns_ids_by_probability() {
    let text = "\\data\\\nngram 1=2\nngram 2=0\n\n\\1-grams:\n-2.0\trare\n-0.1\tcommon\n\n\\2-grams:\n\\end\\\n";
    let mut reader = VecReader::new(text);
    let mut wi = crate::word_index::CountingWordIndex::new();
    let mut trie = C2dmTrie::new(2);
    build(&mut reader, &mut wi, &mut trie).unwrap();
    assert!(wi.get_word_id("common") < wi.get_word_id("rare"));
  }
}
