//! Token cursor
//!
//! A restartable view over the tokenizer with single-token lookahead: the
//! current token is the lookahead, `advance` consumes it. The cursor also
//! carves sub-ranges (to a `;`, to the matching `}`) into child cursors, so
//! the grammar can recurse without holding references into its parent.

use std::rc::Rc;

use crate::error::{ErrorCode, ErrorSink};
use crate::stream::SourcePosition;
use crate::tokenizer::{Token, TokenKind, Tokenizer};

enum CursorSource {
  Stream(Box<Tokenizer>),
  Slice(std::vec::IntoIter<Token>),
}

/// Cursor over a token sequence.
///
/// Sub-slices returned by the carving methods are cursors themselves,
/// sharing the parse's error sink.
pub struct TokenCursor {
  source: CursorSource,
  current: Option<Token>,
  last_position: SourcePosition,
  sink: Rc<ErrorSink>,
}

impl TokenCursor {
  /// Cursor over a live tokenizer.
  pub fn from_tokenizer(tokenizer: Tokenizer, sink: Rc<ErrorSink>) -> Self {
    let mut cursor = TokenCursor {
      source: CursorSource::Stream(Box::new(tokenizer)),
      current: None,
      last_position: SourcePosition::start(),
      sink,
    };
    cursor.bump();
    cursor
  }

  /// Cursor over an already-collected token range.
  pub fn from_tokens(tokens: Vec<Token>, sink: Rc<ErrorSink>) -> Self {
    let mut cursor = TokenCursor {
      source: CursorSource::Slice(tokens.into_iter()),
      current: None,
      last_position: SourcePosition::start(),
      sink,
    };
    cursor.bump();
    cursor
  }

  /// The lookahead token, if any.
  pub fn current(&self) -> Option<&Token> {
    self.current.as_ref()
  }

  /// Kind of the lookahead token, if any.
  pub fn current_kind(&self) -> Option<&TokenKind> {
    self.current.as_ref().map(|t| &t.kind)
  }

  pub fn eof(&self) -> bool {
    self.current.is_none()
  }

  /// Position of the lookahead token, or of the end of input at EOF.
  pub fn position(&self) -> SourcePosition {
    match &self.current {
      Some(token) => token.position,
      None => self.last_position,
    }
  }

  /// Consume the current token and return the new lookahead.
  pub fn advance(&mut self) -> Option<&Token> {
    self.bump();
    self.current()
  }

  /// Consume the current token, returning it by value.
  pub fn bump(&mut self) -> Option<Token> {
    let next = match &mut self.source {
      CursorSource::Stream(tokenizer) => tokenizer.next(),
      CursorSource::Slice(iter) => iter.next(),
    };
    match &next {
      Some(token) => self.last_position = token.position,
      None => {
        if let CursorSource::Stream(tokenizer) = &self.source {
          self.last_position = Tokenizer::position(tokenizer);
        }
      }
    }
    std::mem::replace(&mut self.current, next)
  }

  /// Skip whitespace tokens; the cursor stops at the first non-whitespace.
  pub fn skip_whitespace(&mut self) {
    while matches!(self.current_kind(), Some(TokenKind::Whitespace)) {
      self.bump();
    }
  }

  /// Consume the current token, then any whitespace after it.
  pub fn advance_to_non_whitespace(&mut self) -> Option<&Token> {
    self.bump();
    self.skip_whitespace();
    self.current()
  }

  /// Advance until the cursor rests on a top-level `;` (or EOF, or a `}`
  /// belonging to the enclosing block).
  pub fn skip_to_semicolon(&mut self) {
    let mut depth = 0usize;
    while let Some(kind) = self.current_kind() {
      match kind {
        TokenKind::Semicolon if depth == 0 => return,
        TokenKind::CurlyClose if depth == 0 => return,
        TokenKind::CurlyOpen | TokenKind::RoundOpen | TokenKind::SquareOpen => depth += 1,
        TokenKind::CurlyClose | TokenKind::RoundClose | TokenKind::SquareClose => {
          depth = depth.saturating_sub(1)
        }
        _ => {}
      }
      self.bump();
    }
  }

  /// Like [`skip_to_semicolon`](Self::skip_to_semicolon), but consumes the
  /// semicolon as well.
  pub fn skip_past_semicolon(&mut self) {
    self.skip_to_semicolon();
    if matches!(self.current_kind(), Some(TokenKind::Semicolon)) {
      self.bump();
    }
  }

  /// Carve the tokens up to (not including) the next top-level `;`.
  ///
  /// The semicolon itself is consumed. A `}` at depth zero also terminates
  /// the slice, without being consumed; it closes the enclosing block.
  pub fn slice_until_semicolon(&mut self) -> TokenCursor {
    let mut tokens = Vec::new();
    let mut depth = 0usize;
    loop {
      match self.current_kind() {
        None => break,
        Some(TokenKind::Semicolon) if depth == 0 => {
          self.bump();
          break;
        }
        Some(TokenKind::CurlyClose) if depth == 0 => break,
        Some(kind) => {
          match kind {
            TokenKind::CurlyOpen | TokenKind::RoundOpen | TokenKind::SquareOpen => depth += 1,
            TokenKind::CurlyClose | TokenKind::RoundClose | TokenKind::SquareClose => {
              depth = depth.saturating_sub(1)
            }
            _ => {}
          }
          if let Some(token) = self.bump() {
            tokens.push(token);
          }
        }
      }
    }
    TokenCursor::from_tokens(tokens, Rc::clone(&self.sink))
  }

  /// Carve the body of a block whose `{` has just been consumed.
  ///
  /// Nested braces are counted; the matching `}` is consumed and excluded.
  /// Running out of input before the match is reported as `UnexpectedEof`
  /// and yields whatever was collected.
  pub fn slice_current_block(&mut self) -> TokenCursor {
    let mut tokens = Vec::new();
    let mut depth = 0usize;
    loop {
      match self.bump() {
        None => {
          self
            .sink
            .report(ErrorCode::UnexpectedEof, "unclosed block", self.position());
          break;
        }
        Some(token) => match token.kind {
          TokenKind::CurlyOpen => {
            depth += 1;
            tokens.push(token);
          }
          TokenKind::CurlyClose => {
            if depth == 0 {
              break;
            }
            depth -= 1;
            tokens.push(token);
          }
          _ => tokens.push(token),
        },
      }
    }
    TokenCursor::from_tokens(tokens, Rc::clone(&self.sink))
  }

  /// Shared error sink for this parse.
  pub fn sink(&self) -> &Rc<ErrorSink> {
    &self.sink
  }
}
