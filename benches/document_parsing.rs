//! Benchmark: Document Parsing
//!
//! Measures header split, full parse, validation and hashing.
//! Run: cargo bench --bench document_parsing

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use markflow::ast::frontmatter::split_front_matter;
use markflow::util::content_hash;
use markflow::validate::validate;
use markflow::Workflow;

/// Generate a document with `sections` body sections, each with parameters,
/// a tool mention and a sub-workflow block
fn generate_document(sections: usize) -> String {
    let mut doc = String::from(
        r#"---
name: "bench"
model: gpt-4o
tools: [project-analysis, file-system]
config:
  temperature: 0.3
input:
  schema:
    target: {type: string}
    depth: {type: integer}
markflow.resume:
  checkpoint-frequency: after-each-tool
markflow.sub-workflows:
  - name: lint
    path: ./lint.prompt.md
---
"#,
    );

    for i in 0..sections {
        doc.push_str(&format!(
            r#"## Step {i}

Analyze {{{{target}}}} to depth {{{{depth}}}} with project_analysis.

> Execute: ./lint.prompt.md
> Parameters:
> - path: "{{{{target}}}}"
> - pass: {i}

```bash
echo "{{{{not_a_param}}}}"
```

"#
        ));
    }
    doc
}

fn bench_split_front_matter(c: &mut Criterion) {
    let doc = generate_document(10);
    c.bench_function("split_front_matter", |b| {
        b.iter(|| black_box(split_front_matter(black_box(&doc))));
    });
}

fn bench_parse_document(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_document");

    for size in [1, 10, 50, 200].iter() {
        let doc = generate_document(*size);
        group.throughput(Throughput::Bytes(doc.len() as u64));

        group.bench_with_input(BenchmarkId::new("sections", size), &doc, |b, doc| {
            b.iter(|| {
                let workflow = Workflow::parse_str(black_box(doc)).unwrap();
                black_box(workflow)
            });
        });
    }

    group.finish();
}

fn bench_validate(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate");

    // Parse once, validate repeatedly
    for size in [10, 200].iter() {
        let workflow = Workflow::parse_str(&generate_document(*size)).unwrap();
        group.bench_with_input(BenchmarkId::new("sections", size), &workflow, |b, wf| {
            b.iter(|| black_box(validate(wf)));
        });
    }

    group.finish();
}

fn bench_content_hash(c: &mut Criterion) {
    let mut group = c.benchmark_group("content_hash");

    for size in [10, 200].iter() {
        let doc = generate_document(*size);
        group.throughput(Throughput::Bytes(doc.len() as u64));
        group.bench_with_input(BenchmarkId::new("xxh3_64", size), &doc, |b, doc| {
            b.iter(|| black_box(content_hash(black_box(doc))));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_split_front_matter,
    bench_parse_document,
    bench_validate,
    bench_content_hash
);
criterion_main!(benches);
