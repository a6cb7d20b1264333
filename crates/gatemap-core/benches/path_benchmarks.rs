//! Benchmarks for path parsing, resolution and whole mapping runs

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gatemap_core::{
    Document, DocumentFormat, FieldMapping, MappingEngine, MappingSet, SourcePath, StaticValues,
    TransformerRegistry, TransformerSpec,
};
use serde_json::{json, Value};

fn create_large_data(size: usize) -> Value {
    let items: Vec<Value> = (0..size)
        .map(|i| {
            json!({
                "id": i,
                "name": format!("Item {}", i),
                "category": if i % 3 == 0 { "A" } else if i % 3 == 1 { "B" } else { "C" },
                "price": (i as f64) * 1.5 + 10.0,
                "metadata": { "tags": ["tag1", "tag2"] }
            })
        })
        .collect();
    json!({ "order": { "id": "o-1", "items": items } })
}

fn create_xml(size: usize) -> Document {
    let lines: String = (0..size)
        .map(|i| format!(r#"<Line sku="S{i}"><Qty>{i}</Qty></Line>"#))
        .collect();
    Document::parse(DocumentFormat::Xml, &format!("<Order>{}</Order>", lines))
        .expect("benchmark XML parses")
}

fn bench_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("parsing");
    let expressions = [
        "$.order.id",
        "$.order.items[*].name",
        "$..tags[0]",
        "$.order.items[?(@.category == 'A' && @.price != 10)].id",
        "/Order/Line[2]/@sku",
        "//Qty",
        "$$Region",
    ];
    for expr in expressions {
        group.bench_with_input(BenchmarkId::from_parameter(expr), expr, |b, expr| {
            b.iter(|| SourcePath::parse(black_box(expr)))
        });
    }
    group.finish();
}

fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolution");
    let statics = StaticValues::default();

    for size in [10, 100, 1000] {
        let json_doc = Document::Json(create_large_data(size));
        let xml_doc = create_xml(size);
        let cases = [
            ("wildcard", SourcePath::parse("$.order.items[*].name"), &json_doc),
            ("filter", SourcePath::parse("$.order.items[?(@.category == 'B')].id"), &json_doc),
            ("descent", SourcePath::parse("$..tags[1]"), &json_doc),
            ("element", SourcePath::parse("/Order/Line/@sku"), &xml_doc),
            ("element_descendant", SourcePath::parse("//Qty"), &xml_doc),
        ];
        for (name, path, doc) in cases {
            let path = path.expect("benchmark path parses");
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| path.resolve(Some(black_box(doc)), &statics))
            });
        }
    }
    group.finish();
}

fn bench_mapping(c: &mut Criterion) {
    let mut group = c.benchmark_group("mapping");
    let registry = TransformerRegistry::with_built_ins();
    let mappings = MappingSet::compile(vec![
        FieldMapping::new("$.order.id", "/Order/@id"),
        FieldMapping::new("$.order.items[*].name", "/Order/Line/Name")
            .transformer(TransformerSpec::new("ToUpper")),
        FieldMapping::new("$.order.items[*].price", "/Order/Line/Price"),
    ])
    .expect("benchmark mappings compile");

    for size in [10, 100, 1000] {
        let source = Document::Json(create_large_data(size));
        group.bench_with_input(BenchmarkId::new("json_to_xml", size), &size, |b, _| {
            b.iter(|| {
                let mut destination = Document::empty(DocumentFormat::Xml, Some("Order"))
                    .expect("root is set");
                MappingEngine::new().apply_mapping(
                    &mappings,
                    Some(&source),
                    Some(&mut destination),
                    &StaticValues::default(),
                    &registry,
                )
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parsing, bench_resolution, bench_mapping);
criterion_main!(benches);
