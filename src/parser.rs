//! Parser driver
//!
//! [`Parser`] owns one parse of one source: Fresh → Running → Done, guarded
//! by a mutex so a second start while a worker is running fails instead of
//! racing. The body itself is single-threaded; `parse_async` merely runs it
//! on a worker thread. Cancellation is cooperative and polled between
//! top-level rules only.
//!
//! The free functions at the bottom are the convenience entry points for
//! fragments (`parse_rule`, `parse_declaration`, `parse_value`, …). They
//! validate leniently by construction; the instance API honors whatever
//! [`PropertyRegistry`] is installed.

use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;

use parking_lot::Mutex;

use crate::cursor::TokenCursor;
use crate::declaration::{Declaration, DeclarationBuilder};
use crate::error::{Error, ErrorHandler, ErrorSink, ParseErrorEvent, Result};
use crate::properties::{AcceptAllRegistry, PropertyRegistry, StandardRegistry};
use crate::rule::{KeyframeRule, Rule, RuleBuilder, Stylesheet};
use crate::selector::{Selector, SelectorConstructor, TextSelectorConstructor};
use crate::stream::CharacterStream;
use crate::tokenizer::{TokenKind, Tokenizer};
use crate::value::{Value, ValueBuilder};

/// Options accepted by the convenience entry points.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
  pub quirks_mode: bool,
}

/// Cooperative cancellation flag, polled between top-level rules.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
  flag: Arc<AtomicBool>,
}

impl CancellationToken {
  pub fn new() -> Self {
    CancellationToken::default()
  }

  pub fn cancel(&self) {
    self.flag.store(true, Ordering::SeqCst);
  }

  pub fn is_cancelled(&self) -> bool {
    self.flag.load(Ordering::SeqCst)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DriverState {
  Fresh,
  Running,
  Done,
}

struct ParserInner {
  source: String,
  /// Seed stylesheet for re-entrant (appending) parses, taken by the body.
  base: Mutex<Option<Stylesheet>>,
  state: Mutex<DriverState>,
  sheet: OnceLock<Stylesheet>,
  errors: Mutex<Vec<ParseErrorEvent>>,
  handlers: Mutex<Vec<ErrorHandler>>,
  registry: Mutex<Arc<dyn PropertyRegistry>>,
  strict: AtomicBool,
  quirks: AtomicBool,
  cancel: CancellationToken,
}

/// CSS parser over one source text.
///
/// # Examples
///
/// ```
/// use cssom::Parser;
///
/// let parser = Parser::new("h1 { color: red; }");
/// let sheet = parser.result().unwrap();
/// assert_eq!(sheet.len(), 1);
/// ```
pub struct Parser {
  inner: Arc<ParserInner>,
}

impl Parser {
  /// Parser over already-decoded text.
  pub fn new(source: impl Into<String>) -> Self {
    Parser {
      inner: Arc::new(ParserInner {
        source: source.into(),
        base: Mutex::new(None),
        state: Mutex::new(DriverState::Fresh),
        sheet: OnceLock::new(),
        errors: Mutex::new(Vec::new()),
        handlers: Mutex::new(Vec::new()),
        registry: Mutex::new(Arc::new(StandardRegistry::new())),
        strict: AtomicBool::new(false),
        quirks: AtomicBool::new(false),
        cancel: CancellationToken::new(),
      }),
    }
  }

  /// Parser over raw bytes, decoded via an optional charset label (a
  /// leading `@charset` in the bytes wins over the hint).
  pub fn from_bytes(bytes: &[u8], charset_hint: Option<&str>) -> Result<Self> {
    let stream = CharacterStream::from_bytes(bytes, charset_hint)?;
    Ok(Parser::new(stream_to_string(stream)))
  }

  /// Re-entrant form: parsed rules are appended to `stylesheet`.
  pub fn append_to(stylesheet: Stylesheet, source: impl Into<String>) -> Self {
    let parser = Parser::new(source);
    *parser.inner.base.lock() = Some(stylesheet);
    parser
  }

  pub fn quirks_mode(&self) -> bool {
    self.inner.quirks.load(Ordering::SeqCst)
  }

  pub fn set_quirks_mode(&self, quirks: bool) {
    self.inner.quirks.store(quirks, Ordering::SeqCst);
  }

  pub fn strict_validation(&self) -> bool {
    self.inner.strict.load(Ordering::SeqCst)
  }

  /// Discard declarations the registry rejects instead of keeping them.
  pub fn set_strict_validation(&self, strict: bool) {
    self.inner.strict.store(strict, Ordering::SeqCst);
  }

  /// Replace the property registry consulted during declaration parsing.
  pub fn set_property_registry(&self, registry: Arc<dyn PropertyRegistry>) {
    *self.inner.registry.lock() = registry;
  }

  /// Subscribe to parse error events. Handlers run on the parsing worker,
  /// in source order, before `parse()` returns.
  pub fn on_error(&self, handler: impl Fn(&ParseErrorEvent) + Send + Sync + 'static) {
    self.inner.handlers.lock().push(Arc::new(handler));
  }

  /// Token for cooperative cancellation, polled between top-level rules.
  pub fn cancellation_token(&self) -> CancellationToken {
    self.inner.cancel.clone()
  }

  /// Run the parse on the calling thread.
  ///
  /// Idempotent once finished; fails with `InvalidOperation` while an
  /// asynchronous parse is in flight.
  pub fn parse(&self) -> Result<()> {
    {
      let mut state = self.inner.state.lock();
      match *state {
        DriverState::Done => return Ok(()),
        DriverState::Running => {
          return Err(Error::InvalidOperation(
            "a parse of this source is already running".to_string(),
          ))
        }
        DriverState::Fresh => *state = DriverState::Running,
      }
    }
    Self::finish(&self.inner, Self::run(&self.inner))
  }

  /// Start the parse on a worker thread.
  ///
  /// The returned task resolves to the same result `parse()` would have
  /// produced; a parse that already completed yields an immediately-ready
  /// task.
  pub fn parse_async(&self) -> ParseTask {
    {
      let mut state = self.inner.state.lock();
      match *state {
        DriverState::Done => return ParseTask::ready(Ok(())),
        DriverState::Running => {
          return ParseTask::ready(Err(Error::InvalidOperation(
            "a parse of this source is already running".to_string(),
          )))
        }
        DriverState::Fresh => *state = DriverState::Running,
      }
    }
    let inner = Arc::clone(&self.inner);
    let handle = thread::spawn(move || Parser::finish(&inner, Parser::run(&inner)));
    ParseTask {
      handle: Some(handle),
      ready: None,
    }
  }

  /// The parsed stylesheet, driving `parse()` on first access.
  pub fn result(&self) -> Result<&Stylesheet> {
    if self.inner.sheet.get().is_none() {
      self.parse()?;
    }
    self
      .inner
      .sheet
      .get()
      .ok_or_else(|| Error::InvalidOperation("parse did not produce a stylesheet".to_string()))
  }

  /// The parsed stylesheet, if the parse has completed.
  pub fn stylesheet(&self) -> Option<&Stylesheet> {
    self.inner.sheet.get()
  }

  /// Errors collected by the last parse, in source order.
  pub fn errors(&self) -> Vec<ParseErrorEvent> {
    self.inner.errors.lock().clone()
  }

  pub fn error_count(&self) -> usize {
    self.inner.errors.lock().len()
  }

  /// Store the outcome and release the Running state.
  fn finish(inner: &ParserInner, outcome: Result<Stylesheet>) -> Result<()> {
    let mut state = inner.state.lock();
    match outcome {
      Ok(sheet) => {
        let _ = inner.sheet.set(sheet);
        *state = DriverState::Done;
        Ok(())
      }
      Err(error) => {
        // A cancelled or failed parse may be retried from scratch.
        *state = DriverState::Fresh;
        Err(error)
      }
    }
  }

  /// The parse body. Single-threaded; runs on whichever thread drives it.
  fn run(inner: &ParserInner) -> Result<Stylesheet> {
    let handlers = inner.handlers.lock().clone();
    let registry = Arc::clone(&*inner.registry.lock());
    let strict = inner.strict.load(Ordering::SeqCst);
    let quirks = inner.quirks.load(Ordering::SeqCst);

    let sink = Rc::new(ErrorSink::new(handlers));
    let tokenizer = Tokenizer::new(CharacterStream::new(&inner.source), Rc::clone(&sink));
    let mut cursor = TokenCursor::from_tokenizer(tokenizer, Rc::clone(&sink));
    let mut builder = RuleBuilder::new(Rc::clone(&sink), registry, strict, quirks);
    let mut sheet = inner.base.lock().take().unwrap_or_default();

    let outcome = loop {
      cursor.skip_whitespace();
      if cursor.eof() {
        break Ok(());
      }
      if inner.cancel.is_cancelled() {
        break Err(Error::Cancelled);
      }
      if let Some(rule) = builder.rule(&mut cursor, true) {
        sheet.rules.push(rule);
      }
    };

    debug_assert_eq!(builder.open_depth(), 0, "open-rule stack must be empty");
    *inner.errors.lock() = sink.take_events();
    outcome.map(|_| sheet)
  }
}

fn stream_to_string(mut stream: CharacterStream) -> String {
  let mut out = String::new();
  while let Some(ch) = stream.next() {
    out.push(ch);
  }
  out
}

/// Handle to an asynchronous parse started with [`Parser::parse_async`].
pub struct ParseTask {
  handle: Option<thread::JoinHandle<Result<()>>>,
  ready: Option<Result<()>>,
}

impl ParseTask {
  fn ready(result: Result<()>) -> Self {
    ParseTask {
      handle: None,
      ready: Some(result),
    }
  }

  /// Block until the parse finishes and return its outcome.
  pub fn wait(self) -> Result<()> {
    match (self.ready, self.handle) {
      (Some(result), _) => result,
      (None, Some(handle)) => handle
        .join()
        .map_err(|_| Error::TaskFailed("parser worker panicked".to_string()))?,
      (None, None) => Ok(()),
    }
  }

  pub fn is_finished(&self) -> bool {
    match (&self.ready, &self.handle) {
      (Some(_), _) => true,
      (None, Some(handle)) => handle.is_finished(),
      (None, None) => true,
    }
  }
}

// ============================================================================
// Convenience entry points
// ============================================================================

struct Fragment {
  cursor: TokenCursor,
  sink: Rc<ErrorSink>,
}

fn fragment(text: &str) -> Fragment {
  let sink = Rc::new(ErrorSink::new(Vec::new()));
  let tokenizer = Tokenizer::new(CharacterStream::new(text), Rc::clone(&sink));
  Fragment {
    cursor: TokenCursor::from_tokenizer(tokenizer, Rc::clone(&sink)),
    sink,
  }
}

/// Reject CDO/CDC at the top of a fragment; they are only tolerated at the
/// stylesheet level.
fn reject_cdx(cursor: &mut TokenCursor) -> Result<()> {
  cursor.skip_whitespace();
  match cursor.current_kind() {
    Some(TokenKind::Cdo) | Some(TokenKind::Cdc) => Err(Error::syntax(
      "HTML comment delimiter in a CSS fragment",
      cursor.position(),
    )),
    _ => Ok(()),
  }
}

fn lenient_rule_builder(sink: &Rc<ErrorSink>, options: ParseOptions) -> RuleBuilder {
  RuleBuilder::new(
    Rc::clone(sink),
    Arc::new(AcceptAllRegistry),
    false,
    options.quirks_mode,
  )
}

/// Parse a complete stylesheet.
pub fn parse_stylesheet(text: &str) -> Result<Stylesheet> {
  parse_stylesheet_with_options(text, ParseOptions::default())
}

pub fn parse_stylesheet_with_options(text: &str, options: ParseOptions) -> Result<Stylesheet> {
  Ok(parse_stylesheet_with_errors(text, options).stylesheet)
}

/// A stylesheet plus the diagnostics its parse produced.
#[derive(Debug, Clone)]
pub struct ParseResult {
  pub stylesheet: Stylesheet,
  pub errors: Vec<ParseErrorEvent>,
}

impl ParseResult {
  pub fn error_count(&self) -> usize {
    self.errors.len()
  }
}

/// Parse a stylesheet and keep the collected errors alongside it.
pub fn parse_stylesheet_with_errors(text: &str, options: ParseOptions) -> ParseResult {
  let Fragment { mut cursor, sink } = fragment(text);
  let mut builder = lenient_rule_builder(&sink, options);
  let rules = builder.rule_list(&mut cursor, true);
  debug_assert_eq!(builder.open_depth(), 0);
  ParseResult {
    stylesheet: Stylesheet { rules },
    errors: sink.take_events(),
  }
}

/// Parse a single rule (style rule or at-rule).
pub fn parse_rule(text: &str) -> Result<Rule> {
  parse_rule_with_options(text, ParseOptions::default())
}

pub fn parse_rule_with_options(text: &str, options: ParseOptions) -> Result<Rule> {
  let Fragment { mut cursor, sink } = fragment(text);
  reject_cdx(&mut cursor)?;
  let position = cursor.position();
  let mut builder = lenient_rule_builder(&sink, options);
  builder
    .rule(&mut cursor, false)
    .ok_or_else(|| Error::syntax("input does not contain a rule", position))
}

/// Parse a single declaration (`color: red !important`).
pub fn parse_declaration(text: &str) -> Result<Declaration> {
  parse_declaration_with_options(text, ParseOptions::default())
}

pub fn parse_declaration_with_options(text: &str, options: ParseOptions) -> Result<Declaration> {
  let Fragment { mut cursor, sink } = fragment(text);
  reject_cdx(&mut cursor)?;
  let position = cursor.position();
  let builder = DeclarationBuilder::new(
    Rc::clone(&sink),
    Arc::new(AcceptAllRegistry),
    false,
    options.quirks_mode,
  );
  builder
    .declaration(&mut cursor)
    .ok_or_else(|| Error::syntax("input does not contain a declaration", position))
}

/// Parse a declaration block, e.g. an inline `style` attribute.
pub fn parse_declarations(text: &str) -> Vec<Declaration> {
  parse_declarations_with_options(text, ParseOptions::default())
}

pub fn parse_declarations_with_options(text: &str, options: ParseOptions) -> Vec<Declaration> {
  let Fragment { mut cursor, sink } = fragment(text);
  let builder = DeclarationBuilder::new(
    Rc::clone(&sink),
    Arc::new(AcceptAllRegistry),
    false,
    options.quirks_mode,
  );
  builder.declaration_list(&mut cursor)
}

/// Parse one atomic value.
pub fn parse_value(text: &str) -> Result<Value> {
  parse_value_with_options(text, ParseOptions::default())
}

pub fn parse_value_with_options(text: &str, options: ParseOptions) -> Result<Value> {
  let Fragment { mut cursor, sink } = fragment(text);
  reject_cdx(&mut cursor)?;
  let position = cursor.position();
  let builder = ValueBuilder::new(Rc::clone(&sink), options.quirks_mode);
  cursor.skip_whitespace();
  builder
    .value(&mut cursor)
    .ok_or_else(|| Error::syntax("input does not contain a value", position))
}

/// Parse comma-separated value lists (the full right-hand side of a
/// declaration).
pub fn parse_value_list(text: &str) -> Result<Vec<Value>> {
  parse_value_list_with_options(text, ParseOptions::default())
}

pub fn parse_value_list_with_options(text: &str, options: ParseOptions) -> Result<Vec<Value>> {
  let Fragment { mut cursor, sink } = fragment(text);
  reject_cdx(&mut cursor)?;
  let position = cursor.position();
  let builder = ValueBuilder::new(Rc::clone(&sink), options.quirks_mode);
  let values = builder.multi_values(&mut cursor);
  if values.is_empty() {
    Err(Error::syntax("input does not contain a value", position))
  } else {
    Ok(values)
  }
}

/// Parse a selector through the default constructor.
pub fn parse_selector(text: &str) -> Result<Selector> {
  parse_selector_with_options(text, ParseOptions::default())
}

pub fn parse_selector_with_options(text: &str, _options: ParseOptions) -> Result<Selector> {
  let Fragment { mut cursor, .. } = fragment(text);
  reject_cdx(&mut cursor)?;
  let position = cursor.position();
  let mut constructor = TextSelectorConstructor::new();
  while let Some(token) = cursor.current() {
    constructor.consume(token);
    cursor.bump();
  }
  constructor
    .finish()
    .ok_or_else(|| Error::syntax("input does not contain a selector", position))
}

/// Parse one keyframe rule (`from { opacity: 0 }`).
pub fn parse_keyframe_rule(text: &str) -> Result<KeyframeRule> {
  parse_keyframe_rule_with_options(text, ParseOptions::default())
}

pub fn parse_keyframe_rule_with_options(
  text: &str,
  options: ParseOptions,
) -> Result<KeyframeRule> {
  let Fragment { mut cursor, sink } = fragment(text);
  reject_cdx(&mut cursor)?;
  let position = cursor.position();
  let mut builder = lenient_rule_builder(&sink, options);
  builder
    .keyframe_rule(&mut cursor)
    .ok_or_else(|| Error::syntax("input does not contain a keyframe rule", position))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::rule::Rule;
  use std::sync::atomic::AtomicUsize;

  #[test]
  fn test_parse_is_idempotent() {
    let parser = Parser::new("h1 { color: red }");
    assert!(parser.parse().is_ok());
    assert!(parser.parse().is_ok());
    assert_eq!(parser.result().unwrap().len(), 1);
  }

  #[test]
  fn test_result_drives_parse() {
    let parser = Parser::new("h1 { } h2 { }");
    assert!(parser.stylesheet().is_none());
    assert_eq!(parser.result().unwrap().len(), 2);
    assert!(parser.stylesheet().is_some());
  }

  #[test]
  fn test_parse_async_completes() {
    let parser = Parser::new("h1 { color: red } @media screen { p { } }");
    let task = parser.parse_async();
    task.wait().unwrap();
    assert_eq!(parser.result().unwrap().len(), 2);
  }

  #[test]
  fn test_parse_async_then_parse_is_invalid_until_done() {
    // After the async task completes, parse() is a no-op rather than an
    // error; the InvalidOperation window is while it runs. Exercising the
    // race deterministically needs a long input, so here we only pin the
    // terminal behavior.
    let parser = Parser::new("h1 { }");
    let task = parser.parse_async();
    task.wait().unwrap();
    assert!(parser.parse().is_ok());
  }

  #[test]
  fn test_double_async_start_fails() {
    // A second task started while the state is Running resolves to
    // InvalidOperation. Use a handler to hold the worker inside the body.
    use std::sync::mpsc;
    let source = "h1 { color: one } h2 { color: two }".repeat(200);
    let parser = Parser::new(source + "p { color: ; }");
    let (tx, rx) = mpsc::channel::<()>();
    let rx = std::sync::Mutex::new(rx);
    parser.on_error(move |_event| {
      // Block the worker until the main thread has observed the state.
      let _ = rx.lock().unwrap().recv();
    });
    let task = parser.parse_async();
    // The worker is either queued or blocked in the handler; either way a
    // synchronous parse must not start a second run.
    let second = parser.parse();
    let second_async = parser.parse_async();
    tx.send(()).ok();
    drop(tx);
    task.wait().unwrap();
    assert!(matches!(second, Err(Error::InvalidOperation(_))));
    assert!(matches!(
      second_async.wait(),
      Err(Error::InvalidOperation(_))
    ));
  }

  #[test]
  fn test_cancellation_between_rules() {
    let parser = Parser::new("h1 { } h2 { }");
    parser.cancellation_token().cancel();
    assert!(matches!(parser.parse(), Err(Error::Cancelled)));
    assert!(parser.stylesheet().is_none());
  }

  #[test]
  fn test_on_error_handler_sees_events_in_order() {
    let parser = Parser::new("p { color: ; } q { margin: }");
    let seen = Arc::new(AtomicUsize::new(0));
    let seen_clone = Arc::clone(&seen);
    parser.on_error(move |_| {
      seen_clone.fetch_add(1, Ordering::SeqCst);
    });
    parser.parse().unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), parser.error_count());
    assert!(parser.error_count() >= 2);
    let errors = parser.errors();
    assert!(errors.windows(2).all(|pair| {
      (pair[0].line, pair[0].column) <= (pair[1].line, pair[1].column)
    }));
  }

  #[test]
  fn test_append_to_extends_stylesheet() {
    let base = parse_stylesheet("h1 { }").unwrap();
    let parser = Parser::append_to(base, "h2 { }");
    let sheet = parser.result().unwrap();
    assert_eq!(sheet.len(), 2);
  }

  #[test]
  fn test_from_bytes_with_charset() {
    let parser = Parser::from_bytes(b"@charset \"windows-1252\"; p { content: '\xe9'; }", None)
      .unwrap();
    let sheet = parser.result().unwrap();
    assert_eq!(sheet.len(), 2);
  }

  #[test]
  fn test_strict_validation_drops_rejected() {
    let parser = Parser::new("p { display: 42; color: red; }");
    parser.set_strict_validation(true);
    let sheet = parser.result().unwrap();
    let Rule::Style(style) = &sheet.rules[0] else {
      panic!("expected style rule");
    };
    assert_eq!(style.declarations.len(), 1);
    assert_eq!(style.declarations[0].name, "color");
  }

  #[test]
  fn test_static_parse_rule() {
    let rule = parse_rule("@import url(\"a.css\") screen;").unwrap();
    assert!(matches!(rule, Rule::Import(_)));
  }

  #[test]
  fn test_static_parse_rule_rejects_cdo() {
    assert!(matches!(
      parse_rule("<!-- h1 { } -->"),
      Err(Error::Syntax { .. })
    ));
  }

  #[test]
  fn test_static_parse_declaration() {
    let declaration = parse_declaration("color: red !important").unwrap();
    assert_eq!(declaration.name, "color");
    assert!(declaration.important);
  }

  #[test]
  fn test_static_parse_declarations() {
    let declarations = parse_declarations("color: red; margin: 0");
    assert_eq!(declarations.len(), 2);
  }

  #[test]
  fn test_static_parse_value() {
    let value = parse_value("12px").unwrap();
    assert_eq!(value.as_primitive().unwrap().number, Some(12.0));
  }

  #[test]
  fn test_static_parse_value_list() {
    let values = parse_value_list("serif, sans-serif").unwrap();
    assert_eq!(values.len(), 2);
  }

  #[test]
  fn test_static_parse_selector() {
    let selector = parse_selector("div  >  p").unwrap();
    assert_eq!(selector.text(), "div > p");
  }

  #[test]
  fn test_static_parse_keyframe_rule() {
    let frame = parse_keyframe_rule("from { opacity: 0 }").unwrap();
    assert_eq!(frame.key_text, "from");
    assert_eq!(frame.declarations.len(), 1);
  }

  #[test]
  fn test_static_entry_points_are_lenient() {
    // `display: 42` fails the standard registry, but statics accept it.
    let declaration = parse_declaration("display: 42").unwrap();
    assert_eq!(declaration.name, "display");
  }

  #[test]
  fn test_quirks_option_propagates() {
    let options = ParseOptions { quirks_mode: true };
    let declaration = parse_declaration_with_options("color: ff0000", options).unwrap();
    assert_eq!(declaration.value.as_primitive().unwrap().text, "#ff0000");
  }

  #[test]
  fn test_parse_stylesheet_with_errors_collects() {
    let result = parse_stylesheet_with_errors("p { color: ; } q { }", ParseOptions::default());
    assert_eq!(result.stylesheet.len(), 2);
    assert_eq!(result.error_count(), 1);
    assert!(result.errors[0].line >= 1);
    assert!(result.errors[0].column >= 1);
  }
}
