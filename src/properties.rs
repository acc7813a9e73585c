//! Property registry
//!
//! Declaration validation is pluggable: the parser only ever talks to the
//! [`PropertyRegistry`] trait. The standard registry stores each property's
//! grammar as data (accepted value classes, keyword list, list semantics)
//! rather than as per-property code, which keeps the table inspectable and
//! the validation rules uniform.

use rustc_hash::FxHashMap;

use crate::value::{Unit, Value};

/// Outcome of validating a declaration against a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationOutcome {
  Valid,
  /// The property is known but the value does not fit its grammar.
  Invalid,
  /// The property is not in the registry.
  UnknownProperty,
}

/// Pluggable declaration validator.
///
/// Implementations must be safe for concurrent read; the parser may consult
/// the registry from a worker thread.
pub trait PropertyRegistry: Send + Sync {
  fn validate(&self, name: &str, value: &Value) -> ValidationOutcome;
}

/// Registry that accepts every declaration. The static convenience entry
/// points use this, making them lenient by construction.
#[derive(Debug, Default)]
pub struct AcceptAllRegistry;

impl PropertyRegistry for AcceptAllRegistry {
  fn validate(&self, _name: &str, _value: &Value) -> ValidationOutcome {
    ValidationOutcome::Valid
  }
}

/// Broad value classes a property can accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueClass {
  Length,
  Percentage,
  Number,
  Color,
  String,
  Uri,
  Angle,
  Time,
  /// Any identifier, beyond the property's enumerated keywords.
  AnyKeyword,
}

/// How a property treats multiple values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListSemantics {
  /// A single value only.
  Single,
  /// Whitespace-separated values (shorthands like `margin`).
  SpaceSeparated,
  /// Comma-separated values (`font-family`, `transition`).
  CommaSeparated,
  /// Anything goes (`font` and other grab-bag shorthands).
  Any,
}

/// A property's grammar, stored as data.
#[derive(Debug, Clone, Copy)]
pub struct PropertyGrammar {
  pub classes: &'static [ValueClass],
  pub keywords: &'static [&'static str],
  pub list: ListSemantics,
}

impl PropertyGrammar {
  const fn new(
    classes: &'static [ValueClass],
    keywords: &'static [&'static str],
    list: ListSemantics,
  ) -> Self {
    PropertyGrammar {
      classes,
      keywords,
      list,
    }
  }
}

use ListSemantics::{Any, CommaSeparated, Single, SpaceSeparated};
use ValueClass::{AnyKeyword, Angle, Color, Length, Number, Percentage, String as StringClass, Time, Uri};

const SIZING: &[ValueClass] = &[Length, Percentage, Number];
const COLOR_ONLY: &[ValueClass] = &[Color];
const NONE_KW: &[&str] = &["none"];
const AUTO_KW: &[&str] = &["auto", "none"];

/// `(name, grammar)` table for the properties the standard registry knows.
///
/// This is deliberately the common core, not an exhaustive CSS property
/// database; embedders with stricter needs supply their own registry.
const STANDARD_GRAMMARS: &[(&str, PropertyGrammar)] = &[
  ("color", PropertyGrammar::new(COLOR_ONLY, &[], Single)),
  ("background-color", PropertyGrammar::new(COLOR_ONLY, &["transparent"], Single)),
  ("background", PropertyGrammar::new(&[Color, Uri, Percentage, Length, AnyKeyword], &[], Any)),
  ("background-image", PropertyGrammar::new(&[Uri], NONE_KW, CommaSeparated)),
  ("background-position", PropertyGrammar::new(&[Length, Percentage], &["left", "right", "top", "bottom", "center"], SpaceSeparated)),
  ("background-repeat", PropertyGrammar::new(&[], &["repeat", "repeat-x", "repeat-y", "no-repeat"], SpaceSeparated)),
  ("border-color", PropertyGrammar::new(COLOR_ONLY, &[], SpaceSeparated)),
  ("border-top-color", PropertyGrammar::new(COLOR_ONLY, &[], Single)),
  ("border-right-color", PropertyGrammar::new(COLOR_ONLY, &[], Single)),
  ("border-bottom-color", PropertyGrammar::new(COLOR_ONLY, &[], Single)),
  ("border-left-color", PropertyGrammar::new(COLOR_ONLY, &[], Single)),
  ("border-style", PropertyGrammar::new(&[], &["none", "hidden", "dotted", "dashed", "solid", "double", "groove", "ridge", "inset", "outset"], SpaceSeparated)),
  ("border-width", PropertyGrammar::new(&[Length], &["thin", "medium", "thick"], SpaceSeparated)),
  ("border", PropertyGrammar::new(&[Color, Length, AnyKeyword], &[], SpaceSeparated)),
  ("border-radius", PropertyGrammar::new(&[Length, Percentage], &[], SpaceSeparated)),
  ("outline-color", PropertyGrammar::new(COLOR_ONLY, &["invert"], Single)),
  ("margin", PropertyGrammar::new(SIZING, AUTO_KW, SpaceSeparated)),
  ("margin-top", PropertyGrammar::new(SIZING, AUTO_KW, Single)),
  ("margin-right", PropertyGrammar::new(SIZING, AUTO_KW, Single)),
  ("margin-bottom", PropertyGrammar::new(SIZING, AUTO_KW, Single)),
  ("margin-left", PropertyGrammar::new(SIZING, AUTO_KW, Single)),
  ("padding", PropertyGrammar::new(SIZING, &[], SpaceSeparated)),
  ("padding-top", PropertyGrammar::new(SIZING, &[], Single)),
  ("padding-right", PropertyGrammar::new(SIZING, &[], Single)),
  ("padding-bottom", PropertyGrammar::new(SIZING, &[], Single)),
  ("padding-left", PropertyGrammar::new(SIZING, &[], Single)),
  ("width", PropertyGrammar::new(SIZING, AUTO_KW, Single)),
  ("height", PropertyGrammar::new(SIZING, AUTO_KW, Single)),
  ("min-width", PropertyGrammar::new(SIZING, NONE_KW, Single)),
  ("min-height", PropertyGrammar::new(SIZING, NONE_KW, Single)),
  ("max-width", PropertyGrammar::new(SIZING, NONE_KW, Single)),
  ("max-height", PropertyGrammar::new(SIZING, NONE_KW, Single)),
  ("top", PropertyGrammar::new(SIZING, AUTO_KW, Single)),
  ("right", PropertyGrammar::new(SIZING, AUTO_KW, Single)),
  ("bottom", PropertyGrammar::new(SIZING, AUTO_KW, Single)),
  ("left", PropertyGrammar::new(SIZING, AUTO_KW, Single)),
  ("position", PropertyGrammar::new(&[], &["static", "relative", "absolute", "fixed", "sticky"], Single)),
  ("display", PropertyGrammar::new(&[], &["none", "block", "inline", "inline-block", "flex", "inline-flex", "grid", "inline-grid", "table", "table-row", "table-cell", "list-item", "contents"], Single)),
  ("float", PropertyGrammar::new(&[], &["left", "right", "none"], Single)),
  ("clear", PropertyGrammar::new(&[], &["left", "right", "both", "none"], Single)),
  ("overflow", PropertyGrammar::new(&[], &["visible", "hidden", "scroll", "auto", "clip"], SpaceSeparated)),
  ("visibility", PropertyGrammar::new(&[], &["visible", "hidden", "collapse"], Single)),
  ("z-index", PropertyGrammar::new(&[Number], &["auto"], Single)),
  ("opacity", PropertyGrammar::new(&[Number, Percentage], &[], Single)),
  ("font-family", PropertyGrammar::new(&[StringClass, AnyKeyword], &[], CommaSeparated)),
  ("font-size", PropertyGrammar::new(SIZING, &["xx-small", "x-small", "small", "medium", "large", "x-large", "xx-large", "smaller", "larger"], Single)),
  ("font-style", PropertyGrammar::new(&[], &["normal", "italic", "oblique"], Single)),
  ("font-weight", PropertyGrammar::new(&[Number], &["normal", "bold", "bolder", "lighter"], Single)),
  ("font", PropertyGrammar::new(&[Length, Percentage, Number, StringClass, AnyKeyword], &[], Any)),
  ("line-height", PropertyGrammar::new(SIZING, &["normal"], Single)),
  ("letter-spacing", PropertyGrammar::new(&[Length], &["normal"], Single)),
  ("word-spacing", PropertyGrammar::new(&[Length], &["normal"], Single)),
  ("text-align", PropertyGrammar::new(&[], &["left", "right", "center", "justify", "start", "end"], Single)),
  ("text-decoration", PropertyGrammar::new(&[Color, AnyKeyword], &[], SpaceSeparated)),
  ("text-transform", PropertyGrammar::new(&[], &["none", "capitalize", "uppercase", "lowercase"], Single)),
  ("text-indent", PropertyGrammar::new(&[Length, Percentage], &[], Single)),
  ("white-space", PropertyGrammar::new(&[], &["normal", "nowrap", "pre", "pre-wrap", "pre-line", "break-spaces"], Single)),
  ("vertical-align", PropertyGrammar::new(&[Length, Percentage], &["baseline", "sub", "super", "top", "text-top", "middle", "bottom", "text-bottom"], Single)),
  ("cursor", PropertyGrammar::new(&[Uri, AnyKeyword], &[], CommaSeparated)),
  ("content", PropertyGrammar::new(&[StringClass, Uri], &["none", "normal", "open-quote", "close-quote"], SpaceSeparated)),
  ("quotes", PropertyGrammar::new(&[StringClass], NONE_KW, SpaceSeparated)),
  ("list-style-type", PropertyGrammar::new(&[], &["disc", "circle", "square", "decimal", "lower-alpha", "upper-alpha", "lower-roman", "upper-roman", "none"], Single)),
  ("transition", PropertyGrammar::new(&[Time, Number, AnyKeyword], &[], CommaSeparated)),
  ("transition-duration", PropertyGrammar::new(&[Time], &[], CommaSeparated)),
  ("transition-delay", PropertyGrammar::new(&[Time], &[], CommaSeparated)),
  ("animation-delay", PropertyGrammar::new(&[Time], &[], CommaSeparated)),
  ("animation-duration", PropertyGrammar::new(&[Time], &[], CommaSeparated)),
  ("animation-name", PropertyGrammar::new(&[AnyKeyword], NONE_KW, CommaSeparated)),
  ("transform", PropertyGrammar::new(&[AnyKeyword], NONE_KW, SpaceSeparated)),
  ("transform-origin", PropertyGrammar::new(&[Length, Percentage], &["left", "right", "top", "bottom", "center"], SpaceSeparated)),
  ("rotate", PropertyGrammar::new(&[Angle], NONE_KW, SpaceSeparated)),
];

/// Properties whose values may be written as hashless colors in quirks
/// mode.
const LEGACY_COLOR_PROPERTIES: &[&str] = &[
  "color",
  "background",
  "background-color",
  "border-color",
  "border-top-color",
  "border-right-color",
  "border-bottom-color",
  "border-left-color",
  "outline-color",
];

/// True for properties that historically accepted hashless colors.
pub fn is_legacy_color_property(name: &str) -> bool {
  LEGACY_COLOR_PROPERTIES
    .iter()
    .any(|p| p.eq_ignore_ascii_case(name))
}

/// The built-in, data-driven registry.
pub struct StandardRegistry {
  grammars: FxHashMap<&'static str, PropertyGrammar>,
}

impl StandardRegistry {
  pub fn new() -> Self {
    let mut grammars = FxHashMap::default();
    for (name, grammar) in STANDARD_GRAMMARS {
      grammars.insert(*name, *grammar);
    }
    StandardRegistry { grammars }
  }

  pub fn grammar(&self, name: &str) -> Option<&PropertyGrammar> {
    self.grammars.get(name)
  }

  fn primitive_fits(grammar: &PropertyGrammar, value: &Value) -> bool {
    let primitive = match value {
      Value::Primitive(p) => p,
      // Function grammars (calc, gradients, …) are out of scope here.
      Value::Function { .. } => return true,
      Value::Inherit | Value::Initial => return true,
      Value::List { .. } => return false,
    };
    match primitive.unit {
      Unit::Ident => {
        grammar
          .keywords
          .iter()
          .any(|k| k.eq_ignore_ascii_case(&primitive.text))
          || grammar.classes.contains(&AnyKeyword)
          // Named colors (`red`, `rebeccapurple`, …) count wherever a
          // color does.
          || (grammar.classes.contains(&Color)
            && csscolorparser::parse(&primitive.text).is_ok())
      }
      Unit::String => grammar.classes.contains(&StringClass),
      Unit::Uri => grammar.classes.contains(&Uri),
      Unit::Number => {
        grammar.classes.contains(&Number)
          // Zero is a valid length wherever lengths are.
          || (primitive.number == Some(0.0) && grammar.classes.contains(&Length))
      }
      Unit::Percentage => grammar.classes.contains(&Percentage),
      Unit::Length(_) => grammar.classes.contains(&Length),
      Unit::Angle => grammar.classes.contains(&Angle),
      Unit::Time => grammar.classes.contains(&Time),
      Unit::Frequency => false,
      Unit::HexColor => grammar.classes.contains(&Color),
      Unit::Unknown => false,
    }
  }

  fn value_fits(grammar: &PropertyGrammar, value: &Value) -> bool {
    match value {
      Value::List {
        items,
        comma_separated,
      } => {
        let list_ok = match grammar.list {
          Single => false,
          SpaceSeparated => !comma_separated,
          CommaSeparated => *comma_separated,
          Any => true,
        };
        list_ok && items.iter().all(|item| Self::value_fits(grammar, item))
      }
      other => Self::primitive_fits(grammar, other),
    }
  }
}

impl Default for StandardRegistry {
  fn default() -> Self {
    StandardRegistry::new()
  }
}

impl PropertyRegistry for StandardRegistry {
  fn validate(&self, name: &str, value: &Value) -> ValidationOutcome {
    // Custom properties accept anything.
    if name.starts_with("--") {
      return ValidationOutcome::Valid;
    }
    let Some(grammar) = self.grammars.get(name) else {
      return ValidationOutcome::UnknownProperty;
    };
    if Self::value_fits(grammar, value) {
      ValidationOutcome::Valid
    } else {
      ValidationOutcome::Invalid
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::value::Primitive;

  fn ident(text: &str) -> Value {
    Value::Primitive(Primitive::ident(text))
  }

  #[test]
  fn test_keyword_validation() {
    let registry = StandardRegistry::new();
    assert_eq!(
      registry.validate("display", &ident("block")),
      ValidationOutcome::Valid
    );
    assert_eq!(
      registry.validate("display", &ident("bogus")),
      ValidationOutcome::Invalid
    );
  }

  #[test]
  fn test_unit_validation() {
    let registry = StandardRegistry::new();
    let px = Value::Primitive(Primitive::dimension(4.0, "px"));
    assert_eq!(registry.validate("margin-top", &px), ValidationOutcome::Valid);
    let angle = Value::Primitive(Primitive::dimension(45.0, "deg"));
    assert_eq!(
      registry.validate("margin-top", &angle),
      ValidationOutcome::Invalid
    );
  }

  #[test]
  fn test_zero_is_a_length() {
    let registry = StandardRegistry::new();
    let zero = Value::Primitive(Primitive::number(0.0));
    assert_eq!(
      registry.validate("letter-spacing", &zero),
      ValidationOutcome::Valid
    );
  }

  #[test]
  fn test_color_validation() {
    let registry = StandardRegistry::new();
    let color = Value::Primitive(Primitive::hex_color("#ff00ff".to_string()));
    assert_eq!(registry.validate("color", &color), ValidationOutcome::Valid);
    assert_eq!(
      registry.validate("color", &ident("rebeccapurple")),
      ValidationOutcome::Valid
    );
    assert_eq!(
      registry.validate("color", &ident("not-a-known-color")),
      ValidationOutcome::Invalid
    );
  }

  #[test]
  fn test_list_semantics() {
    let registry = StandardRegistry::new();
    let families = Value::List {
      items: vec![ident("serif"), ident("monospace")],
      comma_separated: true,
    };
    assert_eq!(
      registry.validate("font-family", &families),
      ValidationOutcome::Valid
    );
    // Single-value properties reject lists outright.
    let list = Value::List {
      items: vec![ident("static"), ident("relative")],
      comma_separated: false,
    };
    assert_eq!(registry.validate("position", &list), ValidationOutcome::Invalid);
  }

  #[test]
  fn test_unknown_property() {
    let registry = StandardRegistry::new();
    assert_eq!(
      registry.validate("frobnicate", &ident("yes")),
      ValidationOutcome::UnknownProperty
    );
  }

  #[test]
  fn test_custom_properties_always_valid() {
    let registry = StandardRegistry::new();
    assert_eq!(
      registry.validate("--brand-color", &ident("anything")),
      ValidationOutcome::Valid
    );
  }

  #[test]
  fn test_global_keywords_always_fit() {
    let registry = StandardRegistry::new();
    assert_eq!(
      registry.validate("display", &Value::Inherit),
      ValidationOutcome::Valid
    );
  }

  #[test]
  fn test_legacy_color_properties() {
    assert!(is_legacy_color_property("color"));
    assert!(is_legacy_color_property("Border-Color"));
    assert!(!is_legacy_color_property("width"));
  }
}
