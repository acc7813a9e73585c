//! Declaration parsing
//!
//! `property: value !important;` → [`Declaration`], with the value built by
//! the [`ValueBuilder`] and the result checked against the configured
//! [`PropertyRegistry`]. A rejected declaration is discarded in strict mode
//! and kept as-written in lenient mode (the default); either way the
//! rejection is reported. Recovery is always to the next `;`.

use std::rc::Rc;
use std::sync::Arc;

use crate::cursor::TokenCursor;
use crate::error::{ErrorCode, ErrorSink};
use crate::properties::{is_legacy_color_property, PropertyRegistry, ValidationOutcome};
use crate::tokenizer::TokenKind;
use crate::value::{Value, ValueBuilder};

/// A CSS property declaration. Names are normalized to ASCII lowercase.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
  pub name: String,
  pub value: Value,
  pub important: bool,
}

/// Builds [`Declaration`]s out of a token cursor.
pub struct DeclarationBuilder {
  sink: Rc<ErrorSink>,
  values: ValueBuilder,
  registry: Arc<dyn PropertyRegistry>,
  strict: bool,
  quirks_mode: bool,
}

impl DeclarationBuilder {
  pub fn new(
    sink: Rc<ErrorSink>,
    registry: Arc<dyn PropertyRegistry>,
    strict: bool,
    quirks_mode: bool,
  ) -> Self {
    DeclarationBuilder {
      values: ValueBuilder::new(Rc::clone(&sink), quirks_mode),
      sink,
      registry,
      strict,
      quirks_mode,
    }
  }

  pub fn value_builder(&self) -> &ValueBuilder {
    &self.values
  }

  /// Parse one declaration. The cursor ends up past the terminating `;`
  /// whether or not the declaration survived.
  pub fn declaration(&self, cursor: &mut TokenCursor) -> Option<Declaration> {
    cursor.skip_whitespace();
    let start = cursor.position();

    let name = match cursor.current_kind() {
      Some(TokenKind::Ident(text)) => {
        let name = text.to_ascii_lowercase();
        cursor.bump();
        name
      }
      Some(_) => {
        self.sink.report(
          ErrorCode::InputUnexpected,
          "expected a property name",
          start,
        );
        // Consume the offending token before recovering, so a stray
        // closing brace cannot stall the loop.
        cursor.bump();
        cursor.skip_past_semicolon();
        return None;
      }
      None => return None,
    };

    cursor.skip_whitespace();
    if cursor.current_kind() != Some(&TokenKind::Colon) {
      self.sink.report(
        ErrorCode::InvalidCharacter,
        format!("expected ':' after '{}'", name),
        cursor.position(),
      );
      cursor.skip_past_semicolon();
      return None;
    }
    cursor.bump();

    let mut values = self.values.multi_values(cursor);
    if values.is_empty() {
      self.sink.report(
        ErrorCode::InputUnexpected,
        format!("declaration '{}' has no value", name),
        cursor.position(),
      );
      cursor.skip_past_semicolon();
      return None;
    }
    let mut value = if values.len() == 1 {
      values.pop().expect("length checked")
    } else {
      Value::List {
        items: values,
        comma_separated: true,
      }
    };

    let important = self.consume_importance(cursor);

    if self.quirks_mode && is_legacy_color_property(&name) {
      if let Some(replacement) = self.values.hashless_color(&value) {
        value = replacement;
      }
    }

    match self.registry.validate(&name, &value) {
      ValidationOutcome::Valid => {}
      ValidationOutcome::Invalid => {
        self.sink.report(
          ErrorCode::InvalidValue,
          format!("value does not match the grammar of '{}'", name),
          start,
        );
        if self.strict {
          cursor.skip_past_semicolon();
          return None;
        }
      }
      ValidationOutcome::UnknownProperty => {
        self.sink.report(
          ErrorCode::InvalidProperty,
          format!("unknown property '{}'", name),
          start,
        );
        if self.strict {
          cursor.skip_past_semicolon();
          return None;
        }
      }
    }

    cursor.skip_past_semicolon();
    Some(Declaration {
      name,
      value,
      important,
    })
  }

  /// `!important` (case-insensitive), if present at the cursor.
  fn consume_importance(&self, cursor: &mut TokenCursor) -> bool {
    cursor.skip_whitespace();
    if cursor.current_kind() != Some(&TokenKind::Delim('!')) {
      return false;
    }
    cursor.advance_to_non_whitespace();
    match cursor.current_kind() {
      Some(TokenKind::Ident(text)) if text.eq_ignore_ascii_case("important") => {
        cursor.bump();
        true
      }
      _ => {
        self.sink.report(
          ErrorCode::InputUnexpected,
          "expected 'important' after '!'",
          cursor.position(),
        );
        false
      }
    }
  }

  /// Parse a whole declaration block (the carved inside of `{ … }`).
  pub fn declaration_list(&self, cursor: &mut TokenCursor) -> Vec<Declaration> {
    let mut declarations = Vec::new();
    loop {
      cursor.skip_whitespace();
      match cursor.current_kind() {
        None => break,
        // Tolerate stray semicolons between declarations.
        Some(TokenKind::Semicolon) => {
          cursor.bump();
        }
        Some(_) => {
          if let Some(declaration) = self.declaration(cursor) {
            declarations.push(declaration);
          }
        }
      }
    }
    declarations
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::properties::{AcceptAllRegistry, StandardRegistry};
  use crate::stream::CharacterStream;
  use crate::tokenizer::Tokenizer;
  use crate::value::{Primitive, Unit};

  fn builder_with(
    registry: Arc<dyn PropertyRegistry>,
    strict: bool,
    quirks: bool,
  ) -> (DeclarationBuilder, Rc<ErrorSink>) {
    let sink = Rc::new(ErrorSink::new(Vec::new()));
    (
      DeclarationBuilder::new(Rc::clone(&sink), registry, strict, quirks),
      sink,
    )
  }

  fn cursor_for(input: &str, sink: &Rc<ErrorSink>) -> TokenCursor {
    let tokenizer = Tokenizer::new(CharacterStream::new(input), Rc::clone(sink));
    TokenCursor::from_tokenizer(tokenizer, Rc::clone(sink))
  }

  #[test]
  fn test_simple_declaration() {
    let (builder, sink) = builder_with(Arc::new(AcceptAllRegistry), false, false);
    let mut cursor = cursor_for("color: red;", &sink);
    let declaration = builder.declaration(&mut cursor).unwrap();
    assert_eq!(declaration.name, "color");
    assert_eq!(declaration.value.keyword(), Some("red"));
    assert!(!declaration.important);
  }

  #[test]
  fn test_name_is_lowercased() {
    let (builder, sink) = builder_with(Arc::new(AcceptAllRegistry), false, false);
    let mut cursor = cursor_for("COLOR: red", &sink);
    let declaration = builder.declaration(&mut cursor).unwrap();
    assert_eq!(declaration.name, "color");
  }

  #[test]
  fn test_important_flag() {
    let (builder, sink) = builder_with(Arc::new(AcceptAllRegistry), false, false);
    let mut cursor = cursor_for("color: red !important;", &sink);
    let declaration = builder.declaration(&mut cursor).unwrap();
    assert!(declaration.important);

    let mut cursor = cursor_for("color: red ! IMPORTANT", &sink);
    let declaration = builder.declaration(&mut cursor).unwrap();
    assert!(declaration.important);
  }

  #[test]
  fn test_missing_colon_recovers_to_semicolon() {
    let (builder, sink) = builder_with(Arc::new(AcceptAllRegistry), false, false);
    let mut cursor = cursor_for("color red; margin: 0", &sink);
    assert!(builder.declaration(&mut cursor).is_none());
    assert_eq!(sink.events()[0].code, ErrorCode::InvalidCharacter);
    // The next declaration parses cleanly.
    let declaration = builder.declaration(&mut cursor).unwrap();
    assert_eq!(declaration.name, "margin");
  }

  #[test]
  fn test_empty_value_reports_input_unexpected() {
    let (builder, sink) = builder_with(Arc::new(AcceptAllRegistry), false, false);
    let mut cursor = cursor_for("color: ;", &sink);
    assert!(builder.declaration(&mut cursor).is_none());
    assert_eq!(sink.events()[0].code, ErrorCode::InputUnexpected);
  }

  #[test]
  fn test_comma_separated_value_wraps_in_list() {
    let (builder, sink) = builder_with(Arc::new(AcceptAllRegistry), false, false);
    let mut cursor = cursor_for("font-family: serif, sans-serif;", &sink);
    let declaration = builder.declaration(&mut cursor).unwrap();
    match declaration.value {
      Value::List {
        comma_separated, ..
      } => assert!(comma_separated),
      other => panic!("expected comma list, got {:?}", other),
    }
  }

  #[test]
  fn test_lenient_keeps_invalid_value() {
    let (builder, sink) = builder_with(Arc::new(StandardRegistry::new()), false, false);
    let mut cursor = cursor_for("display: 42;", &sink);
    let declaration = builder.declaration(&mut cursor).unwrap();
    assert_eq!(declaration.name, "display");
    assert!(sink.events().iter().any(|e| e.code == ErrorCode::InvalidValue));
  }

  #[test]
  fn test_strict_discards_invalid_value() {
    let (builder, sink) = builder_with(Arc::new(StandardRegistry::new()), true, false);
    let mut cursor = cursor_for("display: 42;", &sink);
    assert!(builder.declaration(&mut cursor).is_none());
    assert!(sink.events().iter().any(|e| e.code == ErrorCode::InvalidValue));
  }

  #[test]
  fn test_strict_discards_unknown_property() {
    let (builder, sink) = builder_with(Arc::new(StandardRegistry::new()), true, false);
    let mut cursor = cursor_for("frobnicate: yes;", &sink);
    assert!(builder.declaration(&mut cursor).is_none());
    assert!(sink
      .events()
      .iter()
      .any(|e| e.code == ErrorCode::InvalidProperty));
  }

  #[test]
  fn test_quirks_hashless_color() {
    let (builder, sink) = builder_with(Arc::new(AcceptAllRegistry), false, true);
    let mut cursor = cursor_for("color: ff0000;", &sink);
    let declaration = builder.declaration(&mut cursor).unwrap();
    let primitive = declaration.value.as_primitive().unwrap();
    assert_eq!(primitive.unit, Unit::HexColor);
    assert_eq!(primitive.text, "#ff0000");
  }

  #[test]
  fn test_declaration_list_preserves_order_and_duplicates() {
    let (builder, sink) = builder_with(Arc::new(AcceptAllRegistry), false, false);
    let mut cursor = cursor_for("color: red; color: blue;; margin: 0", &sink);
    let declarations = builder.declaration_list(&mut cursor);
    assert_eq!(declarations.len(), 3);
    assert_eq!(declarations[0].value.keyword(), Some("red"));
    assert_eq!(declarations[1].value.keyword(), Some("blue"));
    assert_eq!(declarations[2].name, "margin");
  }

  #[test]
  fn test_recovery_mid_block() {
    let (builder, sink) = builder_with(Arc::new(AcceptAllRegistry), false, false);
    let mut cursor = cursor_for("color: ; margin: 1px", &sink);
    let declarations = builder.declaration_list(&mut cursor);
    assert_eq!(declarations.len(), 1);
    assert_eq!(declarations[0].name, "margin");
    let margin = declarations[0].value.as_primitive().unwrap();
    assert_eq!(margin.number, Some(1.0));
    assert_eq!(sink.error_count(), 1);
  }

  #[test]
  fn test_value_keeps_primitive_through_registry() {
    let (builder, sink) = builder_with(Arc::new(StandardRegistry::new()), false, false);
    let mut cursor = cursor_for("margin: 1px 2px;", &sink);
    let declaration = builder.declaration(&mut cursor).unwrap();
    match &declaration.value {
      Value::List { items, .. } => {
        assert_eq!(items[0], Value::Primitive(Primitive::dimension(1.0, "px")));
      }
      other => panic!("expected list, got {:?}", other),
    }
    assert!(sink.events().is_empty());
  }
}
