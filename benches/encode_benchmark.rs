// Encoder benchmarks
// Author: Gabriel Demetrios Lafis

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;

use checkmk_query_engine::{
    encode::{build_context, build_filter_expression, build_graph_spec, BackendVersion, FilterDomain, TimeRange},
    response::normalize_graph,
    spec::{Aggregation, Edition, GraphType, NegatableOption, RequestSpec, TagOperator, TagValue},
};

fn sample_spec() -> RequestSpec {
    RequestSpec::default_query()
        .with_graph_type(GraphType::PredefinedGraph)
        .with_aggregation(Aggregation::Average)
        .with_site("heute")
        .with_host_name_regex(NegatableOption::new("^web", true))
        .with_host_labels(vec!["os:linux".to_string(), "cmk/site:heute".to_string()])
        .with_host_tag(2, TagValue::new("criticality", TagOperator::Is, "prod"))
        .with_service("CPU load")
        .with_graph("cpu_load")
}

fn bench_encoders(c: &mut Criterion) {
    let spec = sample_spec();
    let old_backend = BackendVersion::new(2, 1, 0);

    c.bench_function("build_context", |b| {
        b.iter(|| build_context(black_box(&spec), None))
    });

    c.bench_function("build_context_indexed_labels", |b| {
        b.iter(|| build_context(black_box(&spec), Some(&old_backend)))
    });

    c.bench_function("build_filter_expression", |b| {
        b.iter(|| build_filter_expression(black_box(&spec), FilterDomain::Service))
    });

    c.bench_function("build_graph_spec_body", |b| {
        b.iter(|| {
            build_graph_spec(black_box(&spec), TimeRange::new(0, 3600), Edition::Commercial, None)
                .and_then(|request| request.to_body())
        })
    });
}

fn bench_reshape(c: &mut Criterion) {
    let samples: Vec<f64> = (0..1440).map(|i| i as f64).collect();
    let result = json!({
        "start_time": 0,
        "step": 60,
        "curves": [
            {"title": "a", "rrddata": samples},
            {"title": "b", "rrddata": samples},
        ],
    });

    c.bench_function("normalize_graph", |b| {
        b.iter(|| normalize_graph(black_box(result.clone())))
    });
}

criterion_group!(benches, bench_encoders, bench_reshape);
criterion_main!(benches);
