use std::collections::BTreeMap;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use binding_broker::{
    ChangeSetTranslator, QName, RawChangeEvent, RawNode, RawPath, SchemaCodec, SchemaContext,
    TranslatedDataChangeEvent, TypedId,
};

fn q(name: &str) -> QName {
    QName::new("urn:bench", name)
}

fn translator() -> ChangeSetTranslator {
    let ctx = SchemaContext::builder(1)
        .container(q("cars"), "Cars")
        .list(q("car"), "Car")
        .container(q("engine"), "Engine")
        .leaf(q("id"))
        .leaf(q("power"))
        .build();
    ChangeSetTranslator::new(Arc::new(SchemaCodec::with_context(Arc::new(ctx))))
}

// Each car contributes an entry at depth 2 and one at depth 3, so sorting
// has to interleave the two levels.
fn change_set(cars: u32) -> BTreeMap<RawPath, RawNode> {
    let root = RawPath::root().node(q("cars"));
    let mut out = BTreeMap::new();
    for i in 0..cars {
        let id = i.to_string();
        let car = root.keyed(q("car"), [(q("id"), id.as_str())]);
        out.insert(
            car.node(q("engine")),
            RawNode::container(q("engine"), vec![RawNode::leaf(q("power"), i)]),
        );
        out.insert(car, RawNode::container(q("car"), vec![RawNode::leaf(q("id"), id)]));
    }
    out
}

fn bench_translate_map(c: &mut Criterion) {
    let translator = translator();
    let anchor = TypedId::root().child("Cars");

    let mut group = c.benchmark_group("translate_map");
    for cars in [64u32, 1024, 8192] {
        let raw = change_set(cars);
        group.throughput(Throughput::Elements(raw.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(cars), &raw, |b, raw| {
            b.iter(|| translator.translate_map(&anchor, raw));
        });
    }
    group.finish();
}

fn bench_lazy_event(c: &mut Criterion) {
    let translator = translator();
    let anchor = TypedId::root().child("Cars");
    let mut builder = RawChangeEvent::builder();
    for (path, node) in change_set(1024) {
        builder = builder.created(path, node);
    }
    let raw = Arc::new(builder.build());

    c.bench_function("event/untouched", |b| {
        b.iter(|| TranslatedDataChangeEvent::new(translator.clone(), anchor.clone(), Arc::clone(&raw)));
    });

    c.bench_function("event/created_twice", |b| {
        b.iter(|| {
            let event = TranslatedDataChangeEvent::new(translator.clone(), anchor.clone(), Arc::clone(&raw));
            let first = event.created_data().len();
            first + event.created_data().len()
        });
    });
}

criterion_group!(benches, bench_translate_map, bench_lazy_event);
criterion_main!(benches);
