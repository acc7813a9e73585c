//! CSS parse benchmark
//!
//! Measures tokenization and full stylesheet construction over
//! programmatically generated input (no committed real-site CSS).
//!
//! Running:
//! ```bash
//! cargo bench --bench parse_bench -- --noplot
//! ```

use std::fmt::Write;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use cssom::parser::parse_stylesheet_with_errors;
use cssom::{parse_stylesheet, ParseOptions};

fn build_stylesheet_source(rule_count: usize) -> String {
  let mut css = String::new();
  css.push_str("@charset \"utf-8\";\n@import url(base.css) screen;\n");
  for idx in 0..rule_count {
    let _ = write!(
      css,
      ".card-{idx} > .title:hover {{ color: #4a90d9; margin: 0 auto {}px; font: {}px/1.5 \"Inter\", sans-serif; }}\n",
      idx % 32,
      12 + idx % 6,
    );
    if idx % 8 == 0 {
      let _ = write!(
        css,
        "@media screen and (min-width: {}px) {{ .card-{idx} {{ display: flex; opacity: 0.{}; }} }}\n",
        320 + (idx % 5) * 160,
        1 + idx % 9,
      );
    }
    if idx % 16 == 0 {
      let _ = write!(
        css,
        "@keyframes pulse-{idx} {{ from {{ opacity: 0 }} 50% {{ opacity: 0.5 }} to {{ opacity: 1 }} }}\n"
      );
    }
  }
  css
}

fn bench_parse_stylesheet(c: &mut Criterion) {
  let mut group = c.benchmark_group("parse_stylesheet");
  for rule_count in [100usize, 1000] {
    let source = build_stylesheet_source(rule_count);
    group.throughput(criterion::Throughput::Bytes(source.len() as u64));
    group.bench_with_input(
      BenchmarkId::from_parameter(rule_count),
      &source,
      |b, source| {
        b.iter(|| {
          let sheet = parse_stylesheet(black_box(source)).unwrap();
          black_box(sheet.len())
        });
      },
    );
  }
  group.finish();
}

fn bench_parse_with_errors(c: &mut Criterion) {
  // Error-dense input stresses the recovery paths rather than the happy
  // path.
  let mut source = String::new();
  for idx in 0..500 {
    let _ = write!(
      source,
      ".bad-{idx} {{ color: ; margin 0; width: {idx}px }}\n"
    );
  }
  c.bench_function("parse_stylesheet_with_errors/recovery", |b| {
    b.iter(|| {
      let result = parse_stylesheet_with_errors(black_box(&source), ParseOptions::default());
      black_box((result.stylesheet.len(), result.error_count()))
    });
  });
}

fn bench_tokenizer(c: &mut Criterion) {
  use cssom::error::ErrorSink;
  use cssom::{CharacterStream, Tokenizer};
  use std::rc::Rc;

  let source = build_stylesheet_source(1000);
  c.bench_function("tokenize/1000-rules", |b| {
    b.iter(|| {
      let sink = Rc::new(ErrorSink::new(Vec::new()));
      let tokenizer = Tokenizer::new(CharacterStream::new(black_box(&source)), sink);
      black_box(tokenizer.count())
    });
  });
}

criterion_group!(
  benches,
  bench_parse_stylesheet,
  bench_parse_with_errors,
  bench_tokenizer
);
criterion_main!(benches);
