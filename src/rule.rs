//! Rule model and rule construction
//!
//! The [`Rule`] sum type and the [`RuleBuilder`] that dispatches on an
//! `@`-keyword or a qualified (style) rule. Block-carrying rules recurse;
//! every descent pushes the rule onto an explicit open-rule stack, which is
//! how construction tracks lexical nesting and how tests pin down that the
//! stack unwinds fully.
//!
//! The stylesheet is the sole owner of the rule tree. Parent and owner
//! back-pointers are relations, not ownership: they are derived from index
//! paths ([`Stylesheet::rule_at`], [`Stylesheet::parent_of`]) instead of
//! being stored, so they can never dangle and never count references.

use std::fmt::Write;
use std::rc::Rc;
use std::sync::Arc;

use crate::cursor::TokenCursor;
use crate::declaration::{Declaration, DeclarationBuilder};
use crate::error::{ErrorCode, ErrorSink};
use crate::media::MediaList;
use crate::properties::PropertyRegistry;
use crate::selector::{Selector, SelectorConstructor, TextSelectorConstructor};
use crate::stream::SourcePosition;
use crate::tokenizer::TokenKind;

/// A style rule: selector list plus declaration block.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleRule {
  pub selector: Selector,
  pub declarations: Vec<Declaration>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaRule {
  pub media: MediaList,
  pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageRule {
  /// Optional page selector (`:first`, a page name, …), canonical text.
  pub selector: Option<String>,
  pub declarations: Vec<Declaration>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportRule {
  pub href: String,
  pub media: MediaList,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CharsetRule {
  pub encoding: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceRule {
  pub prefix: Option<String>,
  pub uri: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FontFaceRule {
  pub declarations: Vec<Declaration>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyframesRule {
  pub name: String,
  pub keyframes: Vec<KeyframeRule>,
}

/// One keyframe: `from`, `to`, or a percentage list, plus declarations.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyframeRule {
  pub key_text: String,
  pub declarations: Vec<Declaration>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SupportsRule {
  /// The condition, canonical text; evaluation is external.
  pub condition: String,
  pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentConditionKind {
  Url,
  UrlPrefix,
  Domain,
  RegExp,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentCondition {
  pub kind: DocumentConditionKind,
  pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRule {
  pub conditions: Vec<DocumentCondition>,
  pub rules: Vec<Rule>,
}

/// An at-rule the grammar does not know, captured as balanced raw text.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownRule {
  pub raw_text: String,
}

/// A CSS rule.
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
  Style(StyleRule),
  Media(MediaRule),
  Page(PageRule),
  Import(ImportRule),
  Charset(CharsetRule),
  Namespace(NamespaceRule),
  FontFace(FontFaceRule),
  Keyframes(KeyframesRule),
  Supports(SupportsRule),
  Document(DocumentRule),
  Unknown(UnknownRule),
}

impl Rule {
  /// Nested rules, for the grouping/conditional variants.
  pub fn child_rules(&self) -> Option<&[Rule]> {
    match self {
      Rule::Media(rule) => Some(&rule.rules),
      Rule::Supports(rule) => Some(&rule.rules),
      Rule::Document(rule) => Some(&rule.rules),
      _ => None,
    }
  }

  /// Declarations, for the declaration-block variants.
  pub fn declarations(&self) -> Option<&[Declaration]> {
    match self {
      Rule::Style(rule) => Some(&rule.declarations),
      Rule::Page(rule) => Some(&rule.declarations),
      Rule::FontFace(rule) => Some(&rule.declarations),
      _ => None,
    }
  }

  pub fn kind_name(&self) -> &'static str {
    match self {
      Rule::Style(_) => "style",
      Rule::Media(_) => "media",
      Rule::Page(_) => "page",
      Rule::Import(_) => "import",
      Rule::Charset(_) => "charset",
      Rule::Namespace(_) => "namespace",
      Rule::FontFace(_) => "font-face",
      Rule::Keyframes(_) => "keyframes",
      Rule::Supports(_) => "supports",
      Rule::Document(_) => "document",
      Rule::Unknown(_) => "unknown",
    }
  }
}

/// An ordered sequence of top-level rules; the exclusive owner of the rule
/// tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Stylesheet {
  pub rules: Vec<Rule>,
}

impl Stylesheet {
  pub fn new() -> Self {
    Stylesheet { rules: Vec::new() }
  }

  pub fn is_empty(&self) -> bool {
    self.rules.is_empty()
  }

  pub fn len(&self) -> usize {
    self.rules.len()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
    self.rules.iter()
  }

  /// Address a rule by its index path (`[2, 0]` is the first child of the
  /// third top-level rule).
  pub fn rule_at(&self, path: &[usize]) -> Option<&Rule> {
    let (&first, rest) = path.split_first()?;
    let mut rule = self.rules.get(first)?;
    for &index in rest {
      rule = rule.child_rules()?.get(index)?;
    }
    Some(rule)
  }

  /// The parent rule of the rule at `path`; `None` when the parent is the
  /// stylesheet itself.
  pub fn parent_of(&self, path: &[usize]) -> Option<&Rule> {
    if path.len() < 2 {
      return None;
    }
    self.rule_at(&path[..path.len() - 1])
  }
}

/// Canonical-text accumulator for preludes and raw at-rule bodies.
///
/// Whitespace runs collapse to one space; `,`, `;` and `)` bind to the
/// token before them.
#[derive(Default)]
struct TextAccumulator {
  text: String,
  pending_space: bool,
}

impl TextAccumulator {
  fn push(&mut self, kind: &TokenKind) {
    match kind {
      TokenKind::Whitespace => {
        if !self.text.is_empty() {
          self.pending_space = true;
        }
      }
      other => {
        if matches!(
          other,
          TokenKind::Comma | TokenKind::Semicolon | TokenKind::RoundClose
        ) {
          self.pending_space = false;
        }
        if self.pending_space {
          self.text.push(' ');
          self.pending_space = false;
        }
        let _ = write!(self.text, "{}", other);
      }
    }
  }

  fn finish(self) -> String {
    self.text
  }
}

/// Canonical text of an entire carved slice.
fn canonical_text(cursor: &mut TokenCursor) -> String {
  let mut acc = TextAccumulator::default();
  while let Some(token) = cursor.current() {
    acc.push(&token.kind);
    cursor.bump();
  }
  acc.finish()
}

/// Builds [`Rule`]s out of a token cursor.
///
/// One builder serves a whole parse invocation; it carries the declaration
/// and value builders, the selector constructor, and the open-rule stack.
pub struct RuleBuilder {
  sink: Rc<ErrorSink>,
  declarations: DeclarationBuilder,
  selectors: Box<dyn SelectorConstructor>,
  open_rules: Vec<&'static str>,
  seen_rule: bool,
}

impl RuleBuilder {
  pub fn new(
    sink: Rc<ErrorSink>,
    registry: Arc<dyn PropertyRegistry>,
    strict: bool,
    quirks_mode: bool,
  ) -> Self {
    RuleBuilder {
      declarations: DeclarationBuilder::new(Rc::clone(&sink), registry, strict, quirks_mode),
      selectors: Box::new(TextSelectorConstructor::new()),
      sink,
      open_rules: Vec::new(),
      seen_rule: false,
    }
  }

  /// Swap in an embedder's selector constructor.
  pub fn with_selector_constructor(mut self, constructor: Box<dyn SelectorConstructor>) -> Self {
    self.selectors = constructor;
    self
  }

  /// Current depth of the open-rule stack. Zero whenever no rule is being
  /// constructed; the parser checks this on return.
  pub fn open_depth(&self) -> usize {
    self.open_rules.len()
  }

  pub fn declaration_builder(&self) -> &DeclarationBuilder {
    &self.declarations
  }

  /// Parse one rule. `None` means EOF, a recovered error, or a tolerated
  /// CDO/CDC; callers loop until the cursor is exhausted.
  pub fn rule(&mut self, cursor: &mut TokenCursor, top_level: bool) -> Option<Rule> {
    cursor.skip_whitespace();
    let position = cursor.position();
    let rule = match cursor.current_kind()? {
      TokenKind::Cdo | TokenKind::Cdc => {
        // Legacy HTML comment delimiters are tolerated at the stylesheet
        // level only.
        if !top_level {
          self.sink.report(
            ErrorCode::InputUnexpected,
            "HTML comment delimiter inside a block",
            position,
          );
        }
        cursor.bump();
        None
      }
      TokenKind::AtKeyword(keyword) => {
        let keyword = keyword.clone();
        cursor.bump();
        self.at_rule(&keyword, position, cursor)
      }
      _ => self.style_rule(cursor),
    };
    if rule.is_some() {
      self.seen_rule = true;
    }
    rule
  }

  /// Parse rules until the cursor is exhausted (used for nested blocks;
  /// the driver runs the top-level loop itself for cancellation polling).
  pub fn rule_list(&mut self, cursor: &mut TokenCursor, top_level: bool) -> Vec<Rule> {
    let mut rules = Vec::new();
    loop {
      cursor.skip_whitespace();
      if cursor.eof() {
        break;
      }
      if let Some(rule) = self.rule(cursor, top_level) {
        rules.push(rule);
      }
    }
    rules
  }

  // ==========================================================================
  // Qualified (style) rules
  // ==========================================================================

  fn style_rule(&mut self, cursor: &mut TokenCursor) -> Option<Rule> {
    let start = cursor.position();
    loop {
      match cursor.current_kind() {
        None => {
          self.sink.report(
            ErrorCode::UnexpectedEof,
            "expected '{' to open a declaration block",
            cursor.position(),
          );
          let _ = self.selectors.finish();
          return None;
        }
        Some(TokenKind::CurlyOpen) => break,
        Some(TokenKind::CurlyClose) => {
          // A stray close brace cannot belong to this rule.
          self.sink.report(
            ErrorCode::UnbalancedBracket,
            "unexpected '}'",
            cursor.position(),
          );
          cursor.bump();
          let _ = self.selectors.finish();
          return None;
        }
        Some(TokenKind::Semicolon) => {
          self.sink.report(
            ErrorCode::InputUnexpected,
            "unexpected ';' in selector",
            cursor.position(),
          );
          cursor.bump();
          let _ = self.selectors.finish();
          return None;
        }
        Some(_) => {
          if let Some(token) = cursor.current() {
            self.selectors.consume(token);
          }
          cursor.bump();
        }
      }
    }
    cursor.bump();
    let mut block = cursor.slice_current_block();

    let selector = self.selectors.finish();
    self.open_rules.push("style");
    let declarations = self.declarations.declaration_list(&mut block);
    self.open_rules.pop();

    match selector {
      Some(selector) => Some(Rule::Style(StyleRule {
        selector,
        declarations,
      })),
      None => {
        self.sink.report(
          ErrorCode::InputUnexpected,
          "style rule with an empty selector",
          start,
        );
        None
      }
    }
  }

  // ==========================================================================
  // At-rules
  // ==========================================================================

  fn at_rule(
    &mut self,
    keyword: &str,
    position: SourcePosition,
    cursor: &mut TokenCursor,
  ) -> Option<Rule> {
    let normalized = keyword.to_ascii_lowercase();
    // Vendor prefixes on @keyframes are pervasive enough to fold in.
    let name = if normalized.ends_with("keyframes") {
      "keyframes"
    } else {
      normalized.as_str()
    };
    match name {
      "media" => self.at_media(cursor),
      "import" => self.at_import(cursor),
      "charset" => self.at_charset(position, cursor),
      "namespace" => self.at_namespace(cursor),
      "page" => self.at_page(cursor),
      "font-face" => self.at_font_face(cursor),
      "keyframes" => self.at_keyframes(cursor),
      "supports" => self.at_supports(cursor),
      "document" | "-moz-document" => self.at_document(cursor),
      _ => self.unknown_at_rule(keyword, position, cursor),
    }
  }

  /// Collect the prelude up to the rule's `{`, consuming the brace.
  ///
  /// Reports and returns `None` when the rule never opens a block.
  fn prelude_until_block(&mut self, cursor: &mut TokenCursor) -> Option<TokenCursor> {
    let mut tokens = Vec::new();
    let mut depth = 0usize;
    loop {
      match cursor.current_kind() {
        None => {
          self.sink.report(
            ErrorCode::UnexpectedEof,
            "expected '{' to open a block",
            cursor.position(),
          );
          return None;
        }
        // The first `{` opens the rule's block no matter what the prelude
        // looked like; that is the recovery boundary.
        Some(TokenKind::CurlyOpen) => {
          cursor.bump();
          return Some(TokenCursor::from_tokens(tokens, Rc::clone(&self.sink)));
        }
        Some(TokenKind::Semicolon) if depth == 0 => {
          self.sink.report(
            ErrorCode::InputUnexpected,
            "expected a block, found ';'",
            cursor.position(),
          );
          cursor.bump();
          return None;
        }
        Some(TokenKind::CurlyClose) if depth == 0 => {
          self.sink.report(
            ErrorCode::InputUnexpected,
            "expected a block, found '}'",
            cursor.position(),
          );
          return None;
        }
        Some(kind) => {
          match kind {
            TokenKind::RoundOpen | TokenKind::Function(_) | TokenKind::SquareOpen => depth += 1,
            TokenKind::RoundClose | TokenKind::SquareClose => depth = depth.saturating_sub(1),
            _ => {}
          }
          if let Some(token) = cursor.bump() {
            tokens.push(token);
          }
        }
      }
    }
  }

  /// Consume the `;` that should terminate a statement at-rule.
  fn expect_semicolon(&mut self, cursor: &mut TokenCursor) {
    cursor.skip_whitespace();
    match cursor.current_kind() {
      Some(TokenKind::Semicolon) => {
        cursor.bump();
      }
      None | Some(TokenKind::CurlyClose) => {
        self.sink.report(
          ErrorCode::MissingSemicolon,
          "missing ';' after at-rule",
          cursor.position(),
        );
      }
      Some(_) => {
        self.sink.report(
          ErrorCode::MissingSemicolon,
          "missing ';' after at-rule",
          cursor.position(),
        );
        cursor.skip_past_semicolon();
      }
    }
  }

  /// `{ … }` with no prelude (for `@font-face` and friends).
  fn expect_block(&mut self, cursor: &mut TokenCursor) -> Option<TokenCursor> {
    cursor.skip_whitespace();
    match cursor.current_kind() {
      Some(TokenKind::CurlyOpen) => {
        cursor.bump();
        Some(cursor.slice_current_block())
      }
      _ => {
        self.sink.report(
          ErrorCode::InputUnexpected,
          "expected '{' to open a block",
          cursor.position(),
        );
        cursor.skip_past_semicolon();
        None
      }
    }
  }

  fn at_media(&mut self, cursor: &mut TokenCursor) -> Option<Rule> {
    let mut prelude = self.prelude_until_block(cursor)?;
    let media = MediaList::from_cursor(&mut prelude);
    let mut block = cursor.slice_current_block();
    self.open_rules.push("media");
    let rules = self.rule_list(&mut block, false);
    self.open_rules.pop();
    Some(Rule::Media(MediaRule { media, rules }))
  }

  fn at_import(&mut self, cursor: &mut TokenCursor) -> Option<Rule> {
    cursor.skip_whitespace();
    let href = match cursor.current_kind() {
      Some(TokenKind::String(href)) | Some(TokenKind::Url(href)) => {
        let href = href.clone();
        cursor.bump();
        href
      }
      Some(TokenKind::Function(name)) if name.eq_ignore_ascii_case("url") => {
        cursor.bump();
        self.quoted_function_argument(cursor, "url")?
      }
      _ => {
        self.sink.report(
          ErrorCode::InputUnexpected,
          "expected a url or string after @import",
          cursor.position(),
        );
        cursor.skip_past_semicolon();
        return None;
      }
    };
    let mut rest = cursor.slice_until_semicolon();
    let media = MediaList::from_cursor(&mut rest);
    Some(Rule::Import(ImportRule { href, media }))
  }

  /// The `name("…")` form: string argument plus closing paren.
  fn quoted_function_argument(&mut self, cursor: &mut TokenCursor, name: &str) -> Option<String> {
    cursor.skip_whitespace();
    let value = match cursor.current_kind() {
      Some(TokenKind::String(value)) => {
        let value = value.clone();
        cursor.bump();
        value
      }
      _ => {
        self.sink.report(
          ErrorCode::InputUnexpected,
          format!("expected a string inside {}()", name),
          cursor.position(),
        );
        cursor.skip_past_semicolon();
        return None;
      }
    };
    cursor.skip_whitespace();
    match cursor.current_kind() {
      Some(TokenKind::RoundClose) => {
        cursor.bump();
        Some(value)
      }
      _ => {
        self.sink.report(
          ErrorCode::UnbalancedBracket,
          format!("missing ')' after {}()", name),
          cursor.position(),
        );
        cursor.skip_past_semicolon();
        None
      }
    }
  }

  fn at_charset(&mut self, position: SourcePosition, cursor: &mut TokenCursor) -> Option<Rule> {
    cursor.skip_whitespace();
    match cursor.current_kind() {
      Some(TokenKind::String(encoding)) => {
        let encoding = encoding.clone();
        cursor.bump();
        self.expect_semicolon(cursor);
        if self.seen_rule {
          // Standards want @charset first; parse it anyway, but flag it.
          self.sink.report(
            ErrorCode::InputUnexpected,
            "@charset is only meaningful as the first rule",
            position,
          );
          log::warn!("@charset after the first rule has no effect");
        }
        Some(Rule::Charset(CharsetRule { encoding }))
      }
      _ => {
        self.sink.report(
          ErrorCode::InputUnexpected,
          "expected a string after @charset",
          cursor.position(),
        );
        cursor.skip_past_semicolon();
        None
      }
    }
  }

  fn at_namespace(&mut self, cursor: &mut TokenCursor) -> Option<Rule> {
    cursor.skip_whitespace();
    let mut prefix = None;
    if let Some(TokenKind::Ident(name)) = cursor.current_kind() {
      prefix = Some(name.clone());
      cursor.advance_to_non_whitespace();
    }
    let uri = match cursor.current_kind() {
      Some(TokenKind::String(uri)) | Some(TokenKind::Url(uri)) => {
        let uri = uri.clone();
        cursor.bump();
        uri
      }
      Some(TokenKind::Function(name)) if name.eq_ignore_ascii_case("url") => {
        cursor.bump();
        self.quoted_function_argument(cursor, "url")?
      }
      _ => {
        self.sink.report(
          ErrorCode::InputUnexpected,
          "expected a namespace uri",
          cursor.position(),
        );
        cursor.skip_past_semicolon();
        return None;
      }
    };
    self.expect_semicolon(cursor);
    Some(Rule::Namespace(NamespaceRule { prefix, uri }))
  }

  fn at_page(&mut self, cursor: &mut TokenCursor) -> Option<Rule> {
    let mut prelude = self.prelude_until_block(cursor)?;
    let selector_text = canonical_text(&mut prelude);
    let selector = if selector_text.is_empty() {
      None
    } else {
      Some(selector_text)
    };
    let mut block = cursor.slice_current_block();
    self.open_rules.push("page");
    let declarations = self.declarations.declaration_list(&mut block);
    self.open_rules.pop();
    Some(Rule::Page(PageRule {
      selector,
      declarations,
    }))
  }

  fn at_font_face(&mut self, cursor: &mut TokenCursor) -> Option<Rule> {
    let mut block = self.expect_block(cursor)?;
    self.open_rules.push("font-face");
    let declarations = self.declarations.declaration_list(&mut block);
    self.open_rules.pop();
    Some(Rule::FontFace(FontFaceRule { declarations }))
  }

  fn at_keyframes(&mut self, cursor: &mut TokenCursor) -> Option<Rule> {
    cursor.skip_whitespace();
    let name = match cursor.current_kind() {
      Some(TokenKind::Ident(name)) | Some(TokenKind::String(name)) => {
        let name = name.clone();
        cursor.bump();
        name
      }
      _ => {
        self.sink.report(
          ErrorCode::InputUnexpected,
          "expected a name after @keyframes",
          cursor.position(),
        );
        // Consume the rule's block, if any, so recovery lands after it.
        if let Some(_prelude) = self.prelude_until_block(cursor) {
          let _ = cursor.slice_current_block();
        }
        return None;
      }
    };
    let mut block = self.expect_block(cursor)?;
    self.open_rules.push("keyframes");
    let mut keyframes = Vec::new();
    loop {
      block.skip_whitespace();
      if block.eof() {
        break;
      }
      if let Some(frame) = self.keyframe_rule(&mut block) {
        keyframes.push(frame);
      }
    }
    self.open_rules.pop();
    Some(Rule::Keyframes(KeyframesRule { name, keyframes }))
  }

  /// One `from | to | <pct>[, …] { declarations }` entry.
  pub fn keyframe_rule(&mut self, cursor: &mut TokenCursor) -> Option<KeyframeRule> {
    let start = cursor.position();
    let mut prelude = self.prelude_until_block(cursor)?;
    let key_text = canonical_text(&mut prelude);
    let mut block = cursor.slice_current_block();
    self.open_rules.push("keyframe");
    let declarations = self.declarations.declaration_list(&mut block);
    self.open_rules.pop();
    if key_text.is_empty() {
      self.sink.report(
        ErrorCode::InputUnexpected,
        "keyframe without a selector",
        start,
      );
      return None;
    }
    Some(KeyframeRule {
      key_text,
      declarations,
    })
  }

  fn at_supports(&mut self, cursor: &mut TokenCursor) -> Option<Rule> {
    let start = cursor.position();
    let mut prelude = self.prelude_until_block(cursor)?;
    let condition = canonical_text(&mut prelude);
    let mut block = cursor.slice_current_block();
    self.open_rules.push("supports");
    let rules = self.rule_list(&mut block, false);
    self.open_rules.pop();
    if condition.is_empty() {
      self.sink.report(
        ErrorCode::InputUnexpected,
        "@supports without a condition",
        start,
      );
      return None;
    }
    Some(Rule::Supports(SupportsRule { condition, rules }))
  }

  fn at_document(&mut self, cursor: &mut TokenCursor) -> Option<Rule> {
    let mut prelude = self.prelude_until_block(cursor)?;
    let conditions = self.document_conditions(&mut prelude);
    let mut block = cursor.slice_current_block();
    self.open_rules.push("document");
    let rules = self.rule_list(&mut block, false);
    self.open_rules.pop();
    Some(Rule::Document(DocumentRule { conditions, rules }))
  }

  /// Comma-separated `url() | url-prefix() | domain() | regexp("…")`.
  ///
  /// A missing comma between conditions is reported but parsing continues.
  fn document_conditions(&mut self, cursor: &mut TokenCursor) -> Vec<DocumentCondition> {
    let mut conditions = Vec::new();
    let mut expect_comma = false;
    loop {
      cursor.skip_whitespace();
      let position = cursor.position();
      let Some(kind) = cursor.current_kind() else {
        break;
      };
      if expect_comma {
        if matches!(kind, TokenKind::Comma) {
          cursor.bump();
        } else {
          self.sink.report(
            ErrorCode::InputUnexpected,
            "expected ',' between @document conditions",
            position,
          );
        }
        expect_comma = false;
        continue;
      }
      match kind {
        TokenKind::Url(text) => {
          conditions.push(DocumentCondition {
            kind: DocumentConditionKind::Url,
            text: text.clone(),
          });
          cursor.bump();
          expect_comma = true;
        }
        TokenKind::UrlPrefix(text) => {
          conditions.push(DocumentCondition {
            kind: DocumentConditionKind::UrlPrefix,
            text: text.clone(),
          });
          cursor.bump();
          expect_comma = true;
        }
        TokenKind::Domain(text) => {
          conditions.push(DocumentCondition {
            kind: DocumentConditionKind::Domain,
            text: text.clone(),
          });
          cursor.bump();
          expect_comma = true;
        }
        TokenKind::Function(name) => {
          let function = name.to_ascii_lowercase();
          let kind = match function.as_str() {
            "url" => Some(DocumentConditionKind::Url),
            "url-prefix" => Some(DocumentConditionKind::UrlPrefix),
            "domain" => Some(DocumentConditionKind::Domain),
            "regexp" => Some(DocumentConditionKind::RegExp),
            _ => None,
          };
          match kind {
            Some(kind) => {
              cursor.bump();
              if let Some(text) = self.quoted_function_argument(cursor, &function) {
                conditions.push(DocumentCondition { kind, text });
                expect_comma = true;
              }
            }
            None => {
              self.sink.report(
                ErrorCode::InputUnexpected,
                format!("'{}(' is not a @document condition", function),
                position,
              );
              cursor.bump();
            }
          }
        }
        _ => {
          self.sink.report(
            ErrorCode::InputUnexpected,
            "invalid @document condition",
            position,
          );
          cursor.bump();
        }
      }
    }
    conditions
  }

  /// Capture an unrecognized at-rule as balanced raw text, terminating on
  /// `;` at depth zero or on the `}` closing its own block.
  fn unknown_at_rule(
    &mut self,
    keyword: &str,
    position: SourcePosition,
    cursor: &mut TokenCursor,
  ) -> Option<Rule> {
    self.sink.report(
      ErrorCode::UnknownAtRule,
      format!("unknown at-rule '@{}'", keyword),
      position,
    );
    let mut acc = TextAccumulator::default();
    acc.push(&TokenKind::AtKeyword(keyword.to_string()));
    let mut depth = 0usize;
    loop {
      let Some(kind) = cursor.current_kind() else {
        if depth > 0 {
          self.sink.report(
            ErrorCode::UnexpectedEof,
            "unclosed block in at-rule",
            cursor.position(),
          );
          // Close what the source left open so the captured text stays
          // balanced.
          for _ in 0..depth {
            acc.push(&TokenKind::CurlyClose);
          }
        }
        break;
      };
      match kind {
        TokenKind::Semicolon if depth == 0 => {
          acc.push(&TokenKind::Semicolon);
          cursor.bump();
          break;
        }
        TokenKind::CurlyClose if depth == 0 => break,
        TokenKind::CurlyOpen => {
          depth += 1;
          acc.push(&TokenKind::CurlyOpen);
          cursor.bump();
        }
        TokenKind::CurlyClose => {
          depth -= 1;
          acc.push(&TokenKind::CurlyClose);
          cursor.bump();
          if depth == 0 {
            break;
          }
        }
        other => {
          acc.push(other);
          cursor.bump();
        }
      }
    }
    Some(Rule::Unknown(UnknownRule {
      raw_text: acc.finish(),
    }))
  }
}
