//! CSS parser and object model
//!
//! Parses CSS text (or bytes) into a [`Stylesheet`] rule tree, surviving
//! malformed input: errors are reported as positioned events and the parser
//! recovers at the next safe boundary, so the result is always best-effort.
//! The HTML side of a document pipeline, selector matching, and cascade are
//! collaborator concerns; the seams for them are [`SelectorConstructor`]
//! and [`PropertyRegistry`].

pub mod cursor;
pub mod declaration;
pub mod error;
pub mod media;
pub mod parser;
pub mod properties;
pub mod rule;
pub mod selector;
pub mod serialize;
pub mod stream;
pub mod tokenizer;
pub mod value;

pub use error::{Error, ErrorCode, ParseErrorEvent, Result};
pub use parser::{
  parse_declaration, parse_declarations, parse_keyframe_rule, parse_rule, parse_selector,
  parse_stylesheet, parse_stylesheet_with_errors, parse_value, parse_value_list,
  CancellationToken, ParseOptions, ParseResult, ParseTask, Parser,
};
pub use properties::{
  AcceptAllRegistry, PropertyRegistry, StandardRegistry, ValidationOutcome,
};
pub use rule::{Rule, Stylesheet};
pub use selector::{Selector, SelectorConstructor, TextSelectorConstructor};
pub use serialize::ToCssText;
pub use stream::{CharacterStream, SourcePosition};
pub use tokenizer::{Token, TokenKind, Tokenizer};
pub use value::{LengthUnit, Primitive, Unit, Value};

pub use declaration::Declaration;
pub use media::{MediaList, MediaQuery};
