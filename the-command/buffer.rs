//! Cursor-based view over the tokens of one command line.
//!
//! An [`ArgBuffer`] owns the split tokens together with the raw line they came
//! from. Parameter types read from it through [`ArgBuffer::next`] and
//! [`ArgBuffer::require_next`], the parser puts tokens back with
//! [`ArgBuffer::rewind`], and completion replays from a copy made with
//! [`ArgBuffer::snapshot_at`]. Copies share the backing storage, so they are
//! cheap.
//!
//! # Merging
//!
//! Before parsing, a schema may run [`ArgBuffer::merge`] to rejoin tokens the
//! caller split inside a quoted span:
//!
//! | Tokens | Merged |
//! |--------|--------|
//! | `say "hello world"` | `say`, `hello world` |
//! | `"a"` | `a` |
//! | `\"a` | `"a` |
//! | `"it\"s done"` | `it"s done` |
//! | `"never closed` | `never closed` |
//!
//! The delimiter only closes a span when it is the last character of a token.
//! An unterminated span runs to the end of the input.

use std::sync::Arc;

use crate::error::ParamError;

/// Splits a raw line into tokens on whitespace.
///
/// When `keep_trailing` is set and the line ends in whitespace (or is empty),
/// an empty final token is appended. Completion uses this to represent the
/// argument the user is about to type.
pub fn split(line: &str, keep_trailing: bool) -> Vec<String> {
  let mut tokens: Vec<String> = line.split_whitespace().map(str::to_string).collect();
  if keep_trailing && (line.is_empty() || line.ends_with(char::is_whitespace)) {
    tokens.push(String::new());
  }
  tokens
}

/// Delimiters used by [`ArgBuffer::merge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeRule {
  pub open:   char,
  pub close:  char,
  pub escape: char,
}

impl Default for MergeRule {
  fn default() -> Self {
    Self {
      open:   '"',
      close:  '"',
      escape: '\\',
    }
  }
}

impl MergeRule {
  fn is_special(&self, ch: char) -> bool {
    ch == self.open || ch == self.close || ch == self.escape
  }

  /// Unescapes `text`, reporting whether it ends with an unescaped closing
  /// delimiter. The delimiter itself is dropped from the output.
  fn unescape(&self, text: &str, watch_close: bool) -> (String, bool) {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
      if ch == self.escape {
        match chars.peek() {
          Some(&(_, next)) if self.is_special(next) => {
            out.push(next);
            chars.next();
          },
          _ => out.push(ch),
        }
        continue;
      }

      if watch_close && ch == self.close && idx + ch.len_utf8() == text.len() {
        return (out, true);
      }
      out.push(ch);
    }

    (out, false)
  }
}

#[derive(Debug, Clone)]
pub struct ArgBuffer {
  tokens: Arc<[String]>,
  raw:    Arc<str>,
  pos:    usize,
}

impl ArgBuffer {
  pub fn new(tokens: impl Into<Arc<[String]>>, raw: impl Into<Arc<str>>) -> Self {
    Self {
      tokens: tokens.into(),
      raw:    raw.into(),
      pos:    0,
    }
  }

  /// Builds a buffer from a raw line, see [`split`].
  pub fn from_line(line: &str, keep_trailing: bool) -> Self {
    Self::new(split(line, keep_trailing), line)
  }

  /// The unmodified input line.
  pub fn raw(&self) -> &str {
    &self.raw
  }

  pub fn tokens(&self) -> &[String] {
    &self.tokens
  }

  pub fn len(&self) -> usize {
    self.tokens.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tokens.is_empty()
  }

  /// Index of the next token to be read.
  pub fn position(&self) -> usize {
    self.pos
  }

  pub fn has_next(&self) -> bool {
    self.pos < self.tokens.len()
  }

  /// Number of tokens not read yet.
  pub fn remaining(&self) -> usize {
    self.tokens.len().saturating_sub(self.pos)
  }

  pub fn get(&self, index: usize) -> Option<&str> {
    self.tokens.get(index).map(String::as_str)
  }

  pub fn last(&self) -> Option<&str> {
    self.tokens.last().map(String::as_str)
  }

  pub fn peek(&self) -> Option<&str> {
    self.get(self.pos)
  }

  /// Reads the next token and advances the cursor.
  #[allow(clippy::should_implement_trait)]
  pub fn next(&mut self) -> Option<&str> {
    let token = self.tokens.get(self.pos)?;
    self.pos += 1;
    Some(token.as_str())
  }

  /// Like [`Self::next`] but fails with [`ParamError::Missing`] when the
  /// buffer is exhausted.
  pub fn require_next(&mut self) -> Result<&str, ParamError> {
    self.next().ok_or(ParamError::Missing)
  }

  /// Reads every remaining token.
  pub fn rest(&mut self) -> &[String] {
    let start = self.pos.min(self.tokens.len());
    self.pos = self.tokens.len();
    &self.tokens[start..]
  }

  /// Moves the cursor back by one token.
  pub fn rewind(&mut self) {
    debug_assert!(self.pos > 0, "rewound an argument buffer at its start");
    self.pos = self.pos.saturating_sub(1);
  }

  /// A copy of this buffer at the same position. Reading from the copy does
  /// not move this buffer's cursor.
  pub fn snapshot(&self) -> Self {
    self.clone()
  }

  /// A copy of this buffer with its cursor at `pos`.
  pub fn snapshot_at(&self, pos: usize) -> Self {
    Self {
      tokens: Arc::clone(&self.tokens),
      raw:    Arc::clone(&self.raw),
      pos:    pos.min(self.tokens.len()),
    }
  }

  /// A buffer over the tokens from the cursor onward. The raw line is kept.
  pub fn split_off(&self) -> Self {
    let start = self.pos.min(self.tokens.len());
    Self {
      tokens: self.tokens[start..].into(),
      raw:    Arc::clone(&self.raw),
      pos:    0,
    }
  }

  /// Derives a buffer whose quoted spans are joined into single tokens.
  ///
  /// The derived buffer starts at position zero and keeps this buffer's raw
  /// line. See the module docs for the exact rules.
  pub fn merge(&self, rule: MergeRule) -> Self {
    let mut merged = Vec::with_capacity(self.tokens.len());
    let mut open_span: Option<String> = None;

    for token in self.tokens.iter() {
      match open_span.take() {
        Some(mut span) => {
          let (text, closed) = rule.unescape(token, true);
          span.push(' ');
          span.push_str(&text);
          if closed {
            merged.push(span);
          } else {
            open_span = Some(span);
          }
        },
        None => {
          match token.strip_prefix(rule.open) {
            Some(body) => {
              let (text, closed) = rule.unescape(body, true);
              if closed {
                merged.push(text);
              } else {
                open_span = Some(text);
              }
            },
            None => merged.push(rule.unescape(token, false).0),
          }
        },
      }
    }

    if let Some(span) = open_span {
      merged.push(span);
    }

    Self {
      tokens: merged.into(),
      raw:    Arc::clone(&self.raw),
      pos:    0,
    }
  }
}
