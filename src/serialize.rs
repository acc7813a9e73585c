//! Canonical re-serialization
//!
//! Writes the object model back out as CSS text in one canonical form:
//! single spaces, double-quoted strings, `url("…")`, lowercase hex colors.
//! The point is stability, not beauty — parsing the serialized text must
//! reproduce the same rule tree, which is what the round-trip tests pin
//! down. A pretty-printer or minifier is an embedder concern.

use std::fmt;

use crate::declaration::Declaration;
use crate::media::MediaList;
use crate::rule::{
  DocumentCondition, DocumentConditionKind, KeyframeRule, Rule, Stylesheet,
};
use crate::tokenizer::write_quoted;
use crate::value::{Primitive, Unit, Value};

/// Serialization to canonical CSS text.
pub trait ToCssText {
  fn to_css(&self, dest: &mut dyn fmt::Write) -> fmt::Result;

  fn to_css_string(&self) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = self.to_css(&mut out);
    out
  }
}

impl ToCssText for Primitive {
  fn to_css(&self, dest: &mut dyn fmt::Write) -> fmt::Result {
    match self.unit {
      Unit::String => write_quoted(dest, &self.text),
      Unit::Uri => {
        dest.write_str("url(")?;
        write_quoted(dest, &self.text)?;
        dest.write_str(")")
      }
      _ => dest.write_str(&self.text),
    }
  }
}

impl ToCssText for Value {
  fn to_css(&self, dest: &mut dyn fmt::Write) -> fmt::Result {
    match self {
      Value::Primitive(primitive) => primitive.to_css(dest),
      Value::Function { name, args } => {
        write!(dest, "{}(", name)?;
        for (index, arg) in args.iter().enumerate() {
          if index > 0 {
            dest.write_str(", ")?;
          }
          arg.to_css(dest)?;
        }
        dest.write_str(")")
      }
      Value::List {
        items,
        comma_separated,
      } => {
        let separator = if *comma_separated { ", " } else { " " };
        for (index, item) in items.iter().enumerate() {
          if index > 0 {
            dest.write_str(separator)?;
          }
          item.to_css(dest)?;
        }
        Ok(())
      }
      Value::Inherit => dest.write_str("inherit"),
      Value::Initial => dest.write_str("initial"),
    }
  }
}

impl ToCssText for Declaration {
  fn to_css(&self, dest: &mut dyn fmt::Write) -> fmt::Result {
    write!(dest, "{}: ", self.name)?;
    self.value.to_css(dest)?;
    if self.important {
      dest.write_str(" !important")?;
    }
    Ok(())
  }
}

fn write_declaration_block(dest: &mut dyn fmt::Write, declarations: &[Declaration]) -> fmt::Result {
  if declarations.is_empty() {
    return dest.write_str("{ }");
  }
  dest.write_str("{ ")?;
  for declaration in declarations {
    declaration.to_css(dest)?;
    dest.write_str("; ")?;
  }
  dest.write_str("}")
}

fn write_rule_block(dest: &mut dyn fmt::Write, rules: &[Rule]) -> fmt::Result {
  if rules.is_empty() {
    return dest.write_str("{ }");
  }
  dest.write_str("{ ")?;
  for rule in rules {
    rule.to_css(dest)?;
    dest.write_str(" ")?;
  }
  dest.write_str("}")
}

fn write_media_prelude(dest: &mut dyn fmt::Write, media: &MediaList) -> fmt::Result {
  if !media.is_empty() {
    write!(dest, " {}", media)?;
  }
  Ok(())
}

impl ToCssText for DocumentCondition {
  fn to_css(&self, dest: &mut dyn fmt::Write) -> fmt::Result {
    let function = match self.kind {
      DocumentConditionKind::Url => "url",
      DocumentConditionKind::UrlPrefix => "url-prefix",
      DocumentConditionKind::Domain => "domain",
      DocumentConditionKind::RegExp => "regexp",
    };
    write!(dest, "{}(", function)?;
    write_quoted(dest, &self.text)?;
    dest.write_str(")")
  }
}

impl ToCssText for KeyframeRule {
  fn to_css(&self, dest: &mut dyn fmt::Write) -> fmt::Result {
    write!(dest, "{} ", self.key_text)?;
    write_declaration_block(dest, &self.declarations)
  }
}

impl ToCssText for Rule {
  fn to_css(&self, dest: &mut dyn fmt::Write) -> fmt::Result {
    match self {
      Rule::Style(rule) => {
        write!(dest, "{} ", rule.selector.text())?;
        write_declaration_block(dest, &rule.declarations)
      }
      Rule::Media(rule) => {
        dest.write_str("@media")?;
        write_media_prelude(dest, &rule.media)?;
        dest.write_str(" ")?;
        write_rule_block(dest, &rule.rules)
      }
      Rule::Page(rule) => {
        dest.write_str("@page")?;
        if let Some(selector) = &rule.selector {
          write!(dest, " {}", selector)?;
        }
        dest.write_str(" ")?;
        write_declaration_block(dest, &rule.declarations)
      }
      Rule::Import(rule) => {
        dest.write_str("@import url(")?;
        write_quoted(dest, &rule.href)?;
        dest.write_str(")")?;
        write_media_prelude(dest, &rule.media)?;
        dest.write_str(";")
      }
      Rule::Charset(rule) => {
        dest.write_str("@charset ")?;
        write_quoted(dest, &rule.encoding)?;
        dest.write_str(";")
      }
      Rule::Namespace(rule) => {
        dest.write_str("@namespace")?;
        if let Some(prefix) = &rule.prefix {
          write!(dest, " {}", prefix)?;
        }
        dest.write_str(" ")?;
        write_quoted(dest, &rule.uri)?;
        dest.write_str(";")
      }
      Rule::FontFace(rule) => {
        dest.write_str("@font-face ")?;
        write_declaration_block(dest, &rule.declarations)
      }
      Rule::Keyframes(rule) => {
        write!(dest, "@keyframes {} ", rule.name)?;
        if rule.keyframes.is_empty() {
          return dest.write_str("{ }");
        }
        dest.write_str("{ ")?;
        for keyframe in &rule.keyframes {
          keyframe.to_css(dest)?;
          dest.write_str(" ")?;
        }
        dest.write_str("}")
      }
      Rule::Supports(rule) => {
        write!(dest, "@supports {} ", rule.condition)?;
        write_rule_block(dest, &rule.rules)
      }
      Rule::Document(rule) => {
        dest.write_str("@document ")?;
        for (index, condition) in rule.conditions.iter().enumerate() {
          if index > 0 {
            dest.write_str(", ")?;
          }
          condition.to_css(dest)?;
        }
        dest.write_str(" ")?;
        write_rule_block(dest, &rule.rules)
      }
      Rule::Unknown(rule) => dest.write_str(&rule.raw_text),
    }
  }
}

impl ToCssText for Stylesheet {
  fn to_css(&self, dest: &mut dyn fmt::Write) -> fmt::Result {
    for (index, rule) in self.rules.iter().enumerate() {
      if index > 0 {
        dest.write_str("\n")?;
      }
      rule.to_css(dest)?;
    }
    Ok(())
  }
}
