//! Selector construction hook
//!
//! Rule parsing feeds prelude tokens to a [`SelectorConstructor`]; what a
//! selector *is* stays external. The default constructor keeps the
//! canonical text form, which is all the object model itself needs, and
//! what the round-trip serializer emits.

use std::fmt::Write;

use crate::tokenizer::{Token, TokenKind};

/// A parsed selector, as produced by a [`SelectorConstructor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
  text: String,
}

impl Selector {
  pub fn new(text: impl Into<String>) -> Self {
    Selector { text: text.into() }
  }

  /// Canonical text form of the selector.
  pub fn text(&self) -> &str {
    &self.text
  }
}

impl std::fmt::Display for Selector {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.text)
  }
}

/// Collaborator that receives a style rule's prelude token by token.
///
/// An embedding selector engine implements this to build its own matcher
/// representation while the rule parser stays engine-agnostic.
pub trait SelectorConstructor {
  /// Called for every prelude token, in source order.
  fn consume(&mut self, token: &Token);

  /// Called once the prelude ends. Returns `None` when no selector could
  /// be formed (e.g. an empty prelude); the rule is then dropped.
  fn finish(&mut self) -> Option<Selector>;
}

/// The default constructor: canonical text accumulation.
#[derive(Debug, Default)]
pub struct TextSelectorConstructor {
  text: String,
  pending_space: bool,
}

impl TextSelectorConstructor {
  pub fn new() -> Self {
    TextSelectorConstructor::default()
  }
}

impl SelectorConstructor for TextSelectorConstructor {
  fn consume(&mut self, token: &Token) {
    match &token.kind {
      TokenKind::Whitespace => {
        if !self.text.is_empty() {
          self.pending_space = true;
        }
      }
      kind => {
        // A comma binds to the component before it.
        if matches!(kind, TokenKind::Comma) {
          self.pending_space = false;
        }
        if self.pending_space {
          self.text.push(' ');
          self.pending_space = false;
        }
        let _ = write!(self.text, "{}", kind);
      }
    }
  }

  fn finish(&mut self) -> Option<Selector> {
    self.pending_space = false;
    let text = std::mem::take(&mut self.text);
    if text.is_empty() {
      None
    } else {
      Some(Selector::new(text))
    }
  }
}
