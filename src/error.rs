//! Error types for the CSS parsing core
//!
//! Two kinds of failure live here:
//! - `ParseErrorEvent`: a recoverable, positioned diagnostic emitted while
//!   parsing. The parser reports these through an [`ErrorSink`] and keeps
//!   going; the returned stylesheet is always best-effort.
//! - `Error`: a hard failure of the call itself (driver misuse, cancelled
//!   parse, undecodable input, fundamentally malformed fragment input).
//!
//! All hard errors use the `thiserror` crate for minimal boilerplate and
//! proper error trait implementations.

use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::stream::SourcePosition;

/// Result type alias for parser operations
pub type Result<T> = std::result::Result<T, Error>;

/// Machine-readable classification of a parse diagnostic.
///
/// Tokenization codes come out of the tokenizer state machine, grammar codes
/// out of the rule/declaration builders, semantic codes out of property
/// validation, and driver codes out of the `Parser` state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
  // Tokenization
  UnterminatedString,
  InvalidEscape,
  BadUrl,
  InvalidCharacter,
  // Grammar
  InputUnexpected,
  MissingSemicolon,
  UnbalancedBracket,
  UnexpectedEof,
  // Semantics
  InvalidProperty,
  InvalidValue,
  UnknownAtRule,
  // Driver
  InvalidOperation,
  SyntaxError,
}

impl ErrorCode {
  /// Stable lowercase name, used in log output and event display.
  pub fn name(self) -> &'static str {
    match self {
      ErrorCode::UnterminatedString => "unterminated-string",
      ErrorCode::InvalidEscape => "invalid-escape",
      ErrorCode::BadUrl => "bad-url",
      ErrorCode::InvalidCharacter => "invalid-character",
      ErrorCode::InputUnexpected => "input-unexpected",
      ErrorCode::MissingSemicolon => "missing-semicolon",
      ErrorCode::UnbalancedBracket => "unbalanced-bracket",
      ErrorCode::UnexpectedEof => "unexpected-eof",
      ErrorCode::InvalidProperty => "invalid-property",
      ErrorCode::InvalidValue => "invalid-value",
      ErrorCode::UnknownAtRule => "unknown-at-rule",
      ErrorCode::InvalidOperation => "invalid-operation",
      ErrorCode::SyntaxError => "syntax-error",
    }
  }
}

impl fmt::Display for ErrorCode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// A recoverable parse diagnostic with its 1-based source position.
///
/// Events are delivered to subscribed handlers in source order, during the
/// parse call that produced them, and are retained on the parser for
/// inspection afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseErrorEvent {
  pub code: ErrorCode,
  pub message: String,
  pub line: u32,
  pub column: u32,
}

impl ParseErrorEvent {
  pub fn new(code: ErrorCode, message: impl Into<String>, position: SourcePosition) -> Self {
    ParseErrorEvent {
      code,
      message: message.into(),
      line: position.line,
      column: position.column,
    }
  }

  /// Position of the offending input.
  pub fn position(&self) -> SourcePosition {
    SourcePosition {
      line: self.line,
      column: self.column,
    }
  }
}

impl fmt::Display for ParseErrorEvent {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{} at line {}, column {}: {}",
      self.code, self.line, self.column, self.message
    )
  }
}

/// Handler invoked for every reported parse event, on the parsing worker.
pub type ErrorHandler = Arc<dyn Fn(&ParseErrorEvent) + Send + Sync>;

/// Collects parse diagnostics in source order and fans them out to handlers.
///
/// One sink is created per parse invocation and shared (reference-counted)
/// by the tokenizer and every builder, so a single ordered event list covers
/// the whole pass. The sink never aborts anything; recovery is the
/// reporter's job.
pub struct ErrorSink {
  events: RefCell<Vec<ParseErrorEvent>>,
  handlers: Vec<ErrorHandler>,
}

impl ErrorSink {
  pub fn new(handlers: Vec<ErrorHandler>) -> Self {
    ErrorSink {
      events: RefCell::new(Vec::new()),
      handlers,
    }
  }

  /// Record an event and synchronously invoke every subscribed handler.
  pub fn report(&self, code: ErrorCode, message: impl Into<String>, position: SourcePosition) {
    let event = ParseErrorEvent::new(code, message, position);
    for handler in &self.handlers {
      handler(&event);
    }
    self.events.borrow_mut().push(event);
  }

  /// Number of events reported so far.
  pub fn error_count(&self) -> usize {
    self.events.borrow().len()
  }

  /// Snapshot of the events reported so far, in source order.
  pub fn events(&self) -> Vec<ParseErrorEvent> {
    self.events.borrow().clone()
  }

  /// Drain the collected events, leaving the sink empty.
  pub fn take_events(&self) -> Vec<ParseErrorEvent> {
    std::mem::take(&mut *self.events.borrow_mut())
  }
}

impl fmt::Debug for ErrorSink {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ErrorSink")
      .field("events", &self.events.borrow().len())
      .field("handlers", &self.handlers.len())
      .finish()
  }
}

/// Hard failure of a parser call.
///
/// Parse-time problems inside the input never surface here; they become
/// [`ParseErrorEvent`]s and the parse continues. This enum covers misuse of
/// the driver and the fragment entry points.
#[derive(Error, Debug, Clone)]
pub enum Error {
  /// Fundamentally malformed input handed to a single-fragment entry point
  /// (for example CDO/CDC at the top level of `parse_rule`).
  #[error("Syntax error at line {line}, column {column}: {message}")]
  Syntax {
    message: String,
    line: u32,
    column: u32,
  },

  /// Driver misuse, such as calling `parse()` while an asynchronous parse
  /// is running.
  #[error("Invalid operation: {0}")]
  InvalidOperation(String),

  /// The parse was cancelled between top-level rules; no partial stylesheet
  /// is surfaced.
  #[error("Parse was cancelled")]
  Cancelled,

  /// Byte input could not be decoded with the given charset label.
  #[error("Cannot decode input with charset '{label}'")]
  Decode { label: String },

  /// An asynchronous parse task terminated abnormally.
  #[error("Parser task failed: {0}")]
  TaskFailed(String),
}

impl Error {
  pub(crate) fn syntax(message: impl Into<String>, position: SourcePosition) -> Self {
    Error::Syntax {
      message: message.into(),
      line: position.line,
      column: position.column,
    }
  }
}
