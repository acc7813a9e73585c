//! Media query lists
//!
//! Structural parsing only: a media list is split on top-level commas and
//! each query keeps its canonical text. Evaluating queries against a device
//! context is the embedder's concern, the same way selector matching is.

use std::fmt::Write;

use crate::cursor::TokenCursor;
use crate::tokenizer::TokenKind;

/// One media query, kept as canonical text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaQuery {
  text: String,
}

impl MediaQuery {
  pub fn new(text: impl Into<String>) -> Self {
    MediaQuery { text: text.into() }
  }

  pub fn text(&self) -> &str {
    &self.text
  }
}

impl std::fmt::Display for MediaQuery {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.text)
  }
}

/// An ordered, comma-separated list of media queries.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MediaList {
  pub queries: Vec<MediaQuery>,
}

impl MediaList {
  pub fn is_empty(&self) -> bool {
    self.queries.is_empty()
  }

  pub fn len(&self) -> usize {
    self.queries.len()
  }

  /// Consume an entire cursor (typically a carved prelude) into a list.
  ///
  /// Commas inside parentheses do not split; whitespace runs collapse to a
  /// single space in the canonical text.
  pub fn from_cursor(cursor: &mut TokenCursor) -> Self {
    let mut queries = Vec::new();
    let mut current = String::new();
    let mut pending_space = false;
    let mut depth = 0usize;

    let flush = |current: &mut String, queries: &mut Vec<MediaQuery>| {
      let text = std::mem::take(current);
      let trimmed = text.trim();
      if !trimmed.is_empty() {
        queries.push(MediaQuery::new(trimmed));
      }
    };

    while let Some(kind) = cursor.current_kind() {
      match kind {
        TokenKind::Comma if depth == 0 => {
          pending_space = false;
          flush(&mut current, &mut queries);
        }
        TokenKind::Whitespace => {
          if !current.is_empty() {
            pending_space = true;
          }
        }
        other => {
          match other {
            TokenKind::RoundOpen | TokenKind::Function(_) => depth += 1,
            TokenKind::RoundClose => depth = depth.saturating_sub(1),
            _ => {}
          }
          if pending_space {
            current.push(' ');
            pending_space = false;
          }
          let _ = write!(current, "{}", other);
        }
      }
      cursor.bump();
    }
    flush(&mut current, &mut queries);

    MediaList { queries }
  }
}

impl std::fmt::Display for MediaList {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    for (index, query) in self.queries.iter().enumerate() {
      if index > 0 {
        f.write_str(", ")?;
      }
      f.write_str(query.text())?;
    }
    Ok(())
  }
}
