//! CSS value model and builder
//!
//! Converts token ranges into [`Value`] trees: primitives with typed units,
//! functions with recursively parsed arguments, and whitespace- or
//! comma-separated lists. The builder is shared by the declaration parser
//! and the fragment entry points.

use std::rc::Rc;

use crate::cursor::TokenCursor;
use crate::error::{ErrorCode, ErrorSink};
use crate::tokenizer::TokenKind;

/// Typed length units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthUnit {
  Px,
  Em,
  Rem,
  Ex,
  Ch,
  Vw,
  Vh,
  Vmin,
  Vmax,
  Cm,
  Mm,
  Q,
  In,
  Pt,
  Pc,
}

impl LengthUnit {
  pub fn from_suffix(suffix: &str) -> Option<Self> {
    match suffix.to_ascii_lowercase().as_str() {
      "px" => Some(LengthUnit::Px),
      "em" => Some(LengthUnit::Em),
      "rem" => Some(LengthUnit::Rem),
      "ex" => Some(LengthUnit::Ex),
      "ch" => Some(LengthUnit::Ch),
      "vw" => Some(LengthUnit::Vw),
      "vh" => Some(LengthUnit::Vh),
      "vmin" => Some(LengthUnit::Vmin),
      "vmax" => Some(LengthUnit::Vmax),
      "cm" => Some(LengthUnit::Cm),
      "mm" => Some(LengthUnit::Mm),
      "q" => Some(LengthUnit::Q),
      "in" => Some(LengthUnit::In),
      "pt" => Some(LengthUnit::Pt),
      "pc" => Some(LengthUnit::Pc),
      _ => None,
    }
  }

  pub fn suffix(self) -> &'static str {
    match self {
      LengthUnit::Px => "px",
      LengthUnit::Em => "em",
      LengthUnit::Rem => "rem",
      LengthUnit::Ex => "ex",
      LengthUnit::Ch => "ch",
      LengthUnit::Vw => "vw",
      LengthUnit::Vh => "vh",
      LengthUnit::Vmin => "vmin",
      LengthUnit::Vmax => "vmax",
      LengthUnit::Cm => "cm",
      LengthUnit::Mm => "mm",
      LengthUnit::Q => "q",
      LengthUnit::In => "in",
      LengthUnit::Pt => "pt",
      LengthUnit::Pc => "pc",
    }
  }
}

/// Unit classification of a primitive value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Unit {
  String,
  Uri,
  Ident,
  Number,
  Percentage,
  Length(LengthUnit),
  Angle,
  Time,
  Frequency,
  HexColor,
  Unknown,
}

/// An atomic value: unit classification, canonical text, and the numeric
/// payload where one applies.
#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
  pub unit: Unit,
  pub text: String,
  pub number: Option<f32>,
}

impl Primitive {
  pub fn ident(text: impl Into<String>) -> Self {
    Primitive {
      unit: Unit::Ident,
      text: text.into(),
      number: None,
    }
  }

  pub fn string(text: impl Into<String>) -> Self {
    Primitive {
      unit: Unit::String,
      text: text.into(),
      number: None,
    }
  }

  pub fn uri(text: impl Into<String>) -> Self {
    Primitive {
      unit: Unit::Uri,
      text: text.into(),
      number: None,
    }
  }

  pub fn number(value: f32) -> Self {
    Primitive {
      unit: Unit::Number,
      text: format!("{}", value),
      number: Some(value),
    }
  }

  pub fn percentage(value: f32) -> Self {
    Primitive {
      unit: Unit::Percentage,
      text: format!("{}%", value),
      number: Some(value),
    }
  }

  /// Classify a dimension by its unit suffix.
  pub fn dimension(value: f32, unit_text: &str) -> Self {
    let lower = unit_text.to_ascii_lowercase();
    let unit = if let Some(length) = LengthUnit::from_suffix(&lower) {
      Unit::Length(length)
    } else {
      match lower.as_str() {
        "deg" | "rad" | "grad" | "turn" => Unit::Angle,
        "s" | "ms" => Unit::Time,
        "hz" | "khz" => Unit::Frequency,
        _ => Unit::Unknown,
      }
    };
    Primitive {
      unit,
      text: format!("{}{}", value, lower),
      number: Some(value),
    }
  }

  pub fn hex_color(normalized: String) -> Self {
    Primitive {
      unit: Unit::HexColor,
      text: normalized,
      number: None,
    }
  }

  /// A composite carrying an un-typed textual form (ratio syntax and other
  /// constructs that have no dedicated unit yet).
  pub fn unknown(text: impl Into<String>) -> Self {
    Primitive {
      unit: Unit::Unknown,
      text: text.into(),
      number: None,
    }
  }
}

/// A parsed CSS value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
  Primitive(Primitive),
  Function { name: String, args: Vec<Value> },
  List { items: Vec<Value>, comma_separated: bool },
  Inherit,
  Initial,
}

impl Value {
  pub fn as_primitive(&self) -> Option<&Primitive> {
    match self {
      Value::Primitive(p) => Some(p),
      _ => None,
    }
  }

  /// Identifier text, if this is an ident primitive.
  pub fn keyword(&self) -> Option<&str> {
    match self {
      Value::Primitive(p) if p.unit == Unit::Ident => Some(&p.text),
      _ => None,
    }
  }
}

/// Normalize `candidate` to `#rrggbb` if it is a 3- or 6-digit hex run.
pub(crate) fn normalize_hex_color(candidate: &str) -> Option<String> {
  if !candidate.chars().all(|c| c.is_ascii_hexdigit()) {
    return None;
  }
  let lower = candidate.to_ascii_lowercase();
  match lower.len() {
    6 => Some(format!("#{}", lower)),
    3 => {
      let mut out = String::with_capacity(7);
      out.push('#');
      for ch in lower.chars() {
        out.push(ch);
        out.push(ch);
      }
      Some(out)
    }
    _ => None,
  }
}

/// Does this token map to a value per the builder's table?
fn maps_to_value(kind: &TokenKind) -> bool {
  matches!(
    kind,
    TokenKind::String(_)
      | TokenKind::Url(_)
      | TokenKind::Ident(_)
      | TokenKind::Percentage(_)
      | TokenKind::Number(_)
      | TokenKind::Dimension { .. }
      | TokenKind::Hash(_)
      | TokenKind::Delim('#')
      | TokenKind::Function(_)
  )
}

/// Builds [`Value`] trees out of a token cursor.
pub struct ValueBuilder {
  sink: Rc<ErrorSink>,
  quirks_mode: bool,
}

impl ValueBuilder {
  pub fn new(sink: Rc<ErrorSink>, quirks_mode: bool) -> Self {
    ValueBuilder { sink, quirks_mode }
  }

  /// Parse one atomic value, advancing the cursor past it.
  ///
  /// Tokens outside the value grammar are consumed and yield `None`.
  pub fn value(&self, cursor: &mut TokenCursor) -> Option<Value> {
    let position = cursor.position();
    let kind = cursor.current_kind()?.clone();
    match kind {
      TokenKind::String(text) => {
        cursor.bump();
        Some(Value::Primitive(Primitive::string(text)))
      }
      TokenKind::Url(text) => {
        cursor.bump();
        Some(Value::Primitive(Primitive::uri(text)))
      }
      TokenKind::Ident(text) => {
        cursor.bump();
        if text.eq_ignore_ascii_case("inherit") {
          Some(Value::Inherit)
        } else if text.eq_ignore_ascii_case("initial") {
          Some(Value::Initial)
        } else {
          Some(Value::Primitive(Primitive::ident(text)))
        }
      }
      TokenKind::Percentage(value) => {
        cursor.bump();
        Some(Value::Primitive(Primitive::percentage(value)))
      }
      TokenKind::Number(value) => {
        cursor.bump();
        Some(Value::Primitive(Primitive::number(value)))
      }
      TokenKind::Dimension { value, unit } => {
        cursor.bump();
        self.dimension_or_ratio(cursor, value, &unit)
      }
      TokenKind::Hash(text) => {
        cursor.bump();
        match normalize_hex_color(&text) {
          Some(normalized) => Some(Value::Primitive(Primitive::hex_color(normalized))),
          None => {
            self.sink.report(
              ErrorCode::InvalidValue,
              format!("'#{}' is not a color", text),
              position,
            );
            None
          }
        }
      }
      TokenKind::Delim('#') => {
        cursor.bump();
        self.legacy_hash_color(cursor, position)
      }
      TokenKind::Function(name) => {
        cursor.bump();
        Some(self.function(cursor, name))
      }
      _ => {
        cursor.bump();
        None
      }
    }
  }

  /// A dimension, or the `<dim>/<number>` ratio composite.
  fn dimension_or_ratio(&self, cursor: &mut TokenCursor, value: f32, unit: &str) -> Option<Value> {
    let primitive = Primitive::dimension(value, unit);
    if cursor.current_kind() != Some(&TokenKind::Delim('/')) {
      if self.quirks_mode && primitive.unit == Unit::Unknown {
        // Relaxed numeric parsing: trailing garbage after the number is
        // dropped and the numeric part survives.
        return Some(Value::Primitive(Primitive::number(value)));
      }
      return Some(Value::Primitive(primitive));
    }
    cursor.bump();
    let position = cursor.position();
    match cursor.current_kind() {
      Some(&TokenKind::Number(denominator)) => {
        cursor.bump();
        Some(Value::Primitive(Primitive::unknown(format!(
          "{}/{}",
          primitive.text, denominator
        ))))
      }
      _ => {
        self.sink.report(
          ErrorCode::InputUnexpected,
          "expected a number after '/'",
          position,
        );
        Some(Value::Primitive(primitive))
      }
    }
  }

  /// Reconstruct a legacy color written as `#` followed by tokens the
  /// tokenizer could not keep together (e.g. `#00cc00` lexing as number
  /// pieces). Consumes up to six hex digits' worth of ident/number/
  /// dimension tokens.
  fn legacy_hash_color(
    &self,
    cursor: &mut TokenCursor,
    position: crate::stream::SourcePosition,
  ) -> Option<Value> {
    let mut digits = String::new();
    while digits.len() < 6 {
      let piece = match cursor.current_kind() {
        Some(TokenKind::Ident(text)) => text.clone(),
        Some(&TokenKind::Number(value)) => format!("{}", value),
        Some(TokenKind::Dimension { value, unit }) => format!("{}{}", value, unit),
        _ => break,
      };
      if !piece.chars().all(|c| c.is_ascii_hexdigit()) {
        break;
      }
      cursor.bump();
      digits.push_str(&piece);
    }
    match normalize_hex_color(&digits) {
      Some(normalized) => Some(Value::Primitive(Primitive::hex_color(normalized))),
      None => {
        self.sink.report(
          ErrorCode::InvalidValue,
          format!("'#{}' is not a color", digits),
          position,
        );
        None
      }
    }
  }

  /// Parse a function's comma-separated arguments up to the matching `)`.
  fn function(&self, cursor: &mut TokenCursor, name: String) -> Value {
    let mut args = Vec::new();
    loop {
      cursor.skip_whitespace();
      match cursor.current_kind() {
        None => {
          self.sink.report(
            ErrorCode::UnexpectedEof,
            format!("unclosed '{}(' arguments", name),
            cursor.position(),
          );
          break;
        }
        Some(TokenKind::RoundClose) => {
          cursor.bump();
          break;
        }
        Some(TokenKind::Comma) => {
          cursor.bump();
        }
        Some(kind) if maps_to_value(kind) => {
          if let Some(arg) = self.function_argument(cursor) {
            args.push(arg);
          }
        }
        Some(_) => {
          self.sink.report(
            ErrorCode::InputUnexpected,
            format!("unexpected token in '{}(' arguments", name),
            cursor.position(),
          );
          self.skip_to_function_end(cursor);
          break;
        }
      }
    }
    Value::Function { name, args }
  }

  /// One argument slot: a whitespace-separated run of values.
  fn function_argument(&self, cursor: &mut TokenCursor) -> Option<Value> {
    let mut items = Vec::new();
    loop {
      cursor.skip_whitespace();
      match cursor.current_kind() {
        None | Some(TokenKind::RoundClose) | Some(TokenKind::Comma) => break,
        Some(kind) if maps_to_value(kind) => {
          if let Some(value) = self.value(cursor) {
            items.push(value);
          }
        }
        Some(_) => break,
      }
    }
    match items.len() {
      0 => None,
      1 => items.pop(),
      _ => Some(Value::List {
        items,
        comma_separated: false,
      }),
    }
  }

  /// Consume to the `)` that closes the current function invocation.
  fn skip_to_function_end(&self, cursor: &mut TokenCursor) {
    let mut depth = 0usize;
    while let Some(kind) = cursor.current_kind() {
      match kind {
        TokenKind::RoundOpen | TokenKind::Function(_) => depth += 1,
        TokenKind::RoundClose => {
          cursor.bump();
          if depth == 0 {
            return;
          }
          depth -= 1;
          continue;
        }
        _ => {}
      }
      cursor.bump();
    }
  }

  /// Accumulate whitespace-separated values until `,`, `;`, or block end.
  pub fn value_list(&self, cursor: &mut TokenCursor) -> Vec<Value> {
    let mut items = Vec::new();
    loop {
      cursor.skip_whitespace();
      match cursor.current_kind() {
        None
        | Some(TokenKind::Comma)
        | Some(TokenKind::Semicolon)
        | Some(TokenKind::CurlyClose)
        | Some(TokenKind::RoundClose)
        // `!` introduces an importance flag, which belongs to the
        // declaration grammar, not the value.
        | Some(TokenKind::Delim('!')) => break,
        Some(_) => {
          if let Some(value) = self.value(cursor) {
            items.push(value);
          }
        }
      }
    }
    items
  }

  /// Comma-separated lists of value-lists; singleton inner lists collapse
  /// to their single value.
  pub fn multi_values(&self, cursor: &mut TokenCursor) -> Vec<Value> {
    let mut values = Vec::new();
    loop {
      let mut items = self.value_list(cursor);
      match items.len() {
        0 => {}
        1 => values.push(items.pop().expect("len checked")),
        _ => values.push(Value::List {
          items,
          comma_separated: false,
        }),
      }
      if cursor.current_kind() == Some(&TokenKind::Comma) {
        cursor.bump();
      } else {
        break;
      }
    }
    values
  }

  /// Quirks-mode reinterpretation of a hashless color (`color: ff0000`).
  ///
  /// Returns the replacement value when the primitive's text is a valid
  /// 3- or 6-digit hex run.
  pub fn hashless_color(&self, value: &Value) -> Option<Value> {
    let primitive = value.as_primitive()?;
    match primitive.unit {
      Unit::Ident | Unit::Number | Unit::Unknown | Unit::Length(_) => {
        normalize_hex_color(&primitive.text)
          .map(|normalized| Value::Primitive(Primitive::hex_color(normalized)))
      }
      _ => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::stream::CharacterStream;
  use crate::tokenizer::Tokenizer;

  fn setup(input: &str) -> (TokenCursor, ValueBuilder, Rc<ErrorSink>) {
    let sink = Rc::new(ErrorSink::new(Vec::new()));
    let tokenizer = Tokenizer::new(CharacterStream::new(input), Rc::clone(&sink));
    let cursor = TokenCursor::from_tokenizer(tokenizer, Rc::clone(&sink));
    let builder = ValueBuilder::new(Rc::clone(&sink), false);
    (cursor, builder, sink)
  }

  fn one_value(input: &str) -> Option<Value> {
    let (mut cursor, builder, _sink) = setup(input);
    builder.value(&mut cursor)
  }

  #[test]
  fn test_primitive_values() {
    assert_eq!(
      one_value("red"),
      Some(Value::Primitive(Primitive::ident("red")))
    );
    assert_eq!(
      one_value("\"text\""),
      Some(Value::Primitive(Primitive::string("text")))
    );
    assert_eq!(
      one_value("url(a.png)"),
      Some(Value::Primitive(Primitive::uri("a.png")))
    );
    assert_eq!(one_value("42"), Some(Value::Primitive(Primitive::number(42.0))));
    assert_eq!(
      one_value("50%"),
      Some(Value::Primitive(Primitive::percentage(50.0)))
    );
  }

  #[test]
  fn test_global_keywords() {
    assert_eq!(one_value("inherit"), Some(Value::Inherit));
    assert_eq!(one_value("INITIAL"), Some(Value::Initial));
  }

  #[test]
  fn test_dimension_units() {
    let value = one_value("12px").unwrap();
    let primitive = value.as_primitive().unwrap();
    assert_eq!(primitive.unit, Unit::Length(LengthUnit::Px));
    assert_eq!(primitive.number, Some(12.0));
    assert_eq!(primitive.text, "12px");

    let angle = one_value("90deg").unwrap();
    assert_eq!(angle.as_primitive().unwrap().unit, Unit::Angle);
    let time = one_value("200ms").unwrap();
    assert_eq!(time.as_primitive().unwrap().unit, Unit::Time);
    let freq = one_value("44khz").unwrap();
    assert_eq!(freq.as_primitive().unwrap().unit, Unit::Frequency);
    let unknown = one_value("3foo").unwrap();
    assert_eq!(unknown.as_primitive().unwrap().unit, Unit::Unknown);
  }

  #[test]
  fn test_ratio_folds_to_unknown() {
    let value = one_value("16px/2").unwrap();
    let primitive = value.as_primitive().unwrap();
    assert_eq!(primitive.unit, Unit::Unknown);
    assert_eq!(primitive.text, "16px/2");
  }

  #[test]
  fn test_ratio_missing_number_reports() {
    let (mut cursor, builder, sink) = setup("16px/foo");
    let value = builder.value(&mut cursor).unwrap();
    assert_eq!(value.as_primitive().unwrap().text, "16px");
    assert_eq!(sink.events()[0].code, ErrorCode::InputUnexpected);
  }

  #[test]
  fn test_hex_colors() {
    let value = one_value("#f0f").unwrap();
    let primitive = value.as_primitive().unwrap();
    assert_eq!(primitive.unit, Unit::HexColor);
    assert_eq!(primitive.text, "#ff00ff");

    let value = one_value("#ABCDEF").unwrap();
    assert_eq!(value.as_primitive().unwrap().text, "#abcdef");
  }

  #[test]
  fn test_invalid_hash_is_skipped() {
    let (mut cursor, builder, sink) = setup("#zzz");
    assert_eq!(builder.value(&mut cursor), None);
    assert_eq!(sink.events()[0].code, ErrorCode::InvalidValue);
  }

  #[test]
  fn test_legacy_hash_color_reconstruction() {
    use crate::stream::SourcePosition;
    use crate::tokenizer::Token;

    // A `#` the tokenizer could not attach to an ident run arrives as a
    // delim followed by loose pieces.
    let sink = Rc::new(ErrorSink::new(Vec::new()));
    let tokens = vec![
      Token::new(TokenKind::Delim('#'), SourcePosition::start()),
      Token::new(TokenKind::Ident("abc".to_string()), SourcePosition::start()),
    ];
    let mut cursor = TokenCursor::from_tokens(tokens, Rc::clone(&sink));
    let builder = ValueBuilder::new(Rc::clone(&sink), false);
    let value = builder.value(&mut cursor).unwrap();
    assert_eq!(value.as_primitive().unwrap().text, "#aabbcc");

    let tokens = vec![
      Token::new(TokenKind::Delim('#'), SourcePosition::start()),
      Token::new(TokenKind::Ident("xyz".to_string()), SourcePosition::start()),
    ];
    let mut cursor = TokenCursor::from_tokens(tokens, Rc::clone(&sink));
    assert_eq!(builder.value(&mut cursor), None);
    assert!(sink.events().iter().any(|e| e.code == ErrorCode::InvalidValue));
  }

  #[test]
  fn test_function_with_comma_args() {
    let value = one_value("rgb(1, 2, 3)").unwrap();
    match value {
      Value::Function { name, args } => {
        assert_eq!(name, "rgb");
        assert_eq!(args.len(), 3);
        assert_eq!(args[0], Value::Primitive(Primitive::number(1.0)));
      }
      other => panic!("expected function, got {:?}", other),
    }
  }

  #[test]
  fn test_function_with_space_separated_argument() {
    let value = one_value("drop-shadow(1px 2px)").unwrap();
    match value {
      Value::Function { args, .. } => {
        assert_eq!(args.len(), 1);
        assert!(matches!(
          args[0],
          Value::List {
            comma_separated: false,
            ..
          }
        ));
      }
      other => panic!("expected function, got {:?}", other),
    }
  }

  #[test]
  fn test_function_skips_to_close_on_garbage() {
    let (mut cursor, builder, sink) = setup("calc(1 ! 2) red");
    let value = builder.value(&mut cursor).unwrap();
    assert!(matches!(value, Value::Function { .. }));
    assert!(sink
      .events()
      .iter()
      .any(|e| e.code == ErrorCode::InputUnexpected));
    cursor.skip_whitespace();
    assert_eq!(
      builder.value(&mut cursor),
      Some(Value::Primitive(Primitive::ident("red")))
    );
  }

  #[test]
  fn test_value_list_stops_at_comma() {
    let (mut cursor, builder, _sink) = setup("1px solid red, blue");
    let items = builder.value_list(&mut cursor);
    assert_eq!(items.len(), 3);
    assert_eq!(cursor.current_kind(), Some(&TokenKind::Comma));
  }

  #[test]
  fn test_multi_values_collapses_singletons() {
    let (mut cursor, builder, _sink) = setup("serif, sans-serif");
    let values = builder.multi_values(&mut cursor);
    assert_eq!(values.len(), 2);
    assert_eq!(values[0], Value::Primitive(Primitive::ident("serif")));
  }

  #[test]
  fn test_multi_values_keeps_inner_lists() {
    let (mut cursor, builder, _sink) = setup("1px solid, 2px dashed");
    let values = builder.multi_values(&mut cursor);
    assert_eq!(values.len(), 2);
    assert!(matches!(values[0], Value::List { .. }));
  }

  #[test]
  fn test_quirks_hashless_color() {
    let sink = Rc::new(ErrorSink::new(Vec::new()));
    let builder = ValueBuilder::new(Rc::clone(&sink), true);
    let ident = Value::Primitive(Primitive::ident("ff0000"));
    let replaced = builder.hashless_color(&ident).unwrap();
    assert_eq!(replaced.as_primitive().unwrap().text, "#ff0000");
    assert!(builder
      .hashless_color(&Value::Primitive(Primitive::ident("red")))
      .is_none());
  }

  #[test]
  fn test_quirks_relaxed_numeric() {
    let sink = Rc::new(ErrorSink::new(Vec::new()));
    let tokenizer = Tokenizer::new(CharacterStream::new("10bogus"), Rc::clone(&sink));
    let mut cursor = TokenCursor::from_tokenizer(tokenizer, Rc::clone(&sink));
    let builder = ValueBuilder::new(Rc::clone(&sink), true);
    let value = builder.value(&mut cursor).unwrap();
    let primitive = value.as_primitive().unwrap();
    assert_eq!(primitive.unit, Unit::Number);
    assert_eq!(primitive.number, Some(10.0));
  }
}
