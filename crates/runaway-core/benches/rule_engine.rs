//! Criterion benchmarks for the per-process path in `runaway-core`.
//!
//! A forced scan fuzzifies and scores every visible process, so these are
//! the costs that scale with the process table. No real `/proc` is touched.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use runaway_core::collect::{
    parse_loadavg, parse_proc_stat, LoadAverages, ProcessSample, RawMetrics,
};
use runaway_core::decision::{assess_with, triage};
use runaway_core::inference::{validate_cover, FuzzyInputs, TruthTable, RUNAWAY_RULES};

fn samples() -> [(&'static str, ProcessSample); 3] {
    let base = ProcessSample {
        pid: 4242,
        nice: Some(0),
        parent_pid: 500,
        cpu_percent: 0.0,
        mem_percent: 0.0,
    };
    [
        ("idle", base),
        (
            "orphan_mid",
            ProcessSample {
                parent_pid: 1,
                cpu_percent: 35.0,
                mem_percent: 12.0,
                ..base
            },
        ),
        (
            "hot",
            ProcessSample {
                cpu_percent: 180.0,
                mem_percent: 91.0,
                ..base
            },
        ),
    ]
}

fn bench_scoring(c: &mut Criterion) {
    let mut group = c.benchmark_group("rule_engine");

    for (name, sample) in samples() {
        group.bench_with_input(BenchmarkId::new("fuzzify", name), &sample, |b, s| {
            b.iter(|| black_box(FuzzyInputs::from_sample(black_box(s))));
        });
        let inputs = FuzzyInputs::from_sample(&sample);
        group.bench_with_input(BenchmarkId::new("score", name), &inputs, |b, i| {
            b.iter(|| black_box(RUNAWAY_RULES.score(black_box(i))));
        });
        group.bench_with_input(BenchmarkId::new("assess", name), &sample, |b, s| {
            b.iter(|| black_box(assess_with(&RUNAWAY_RULES, black_box(*s))));
        });
    }

    group.finish();
}

fn bench_triage(c: &mut Criterion) {
    let metrics = RawMetrics {
        load: LoadAverages::new(3.2, 2.9, 2.1),
        memory_used_ratio: 0.62,
        io_wait_ratio: 0.04,
        cpu_count: 8,
    };
    c.bench_function("decision/triage", |b| {
        b.iter(|| black_box(triage(black_box(&metrics))));
    });
}

fn bench_cover_validation(c: &mut Criterion) {
    let table = TruthTable::embedded().expect("embedded table should parse");
    c.bench_function("inference/validate_cover", |b| {
        b.iter(|| black_box(validate_cover(black_box(&table), &RUNAWAY_RULES).is_ok()));
    });
}

fn bench_parsers(c: &mut Criterion) {
    let loadavg = "0.52 0.58 0.59 2/1189 123456\n";
    let stat = "12345 (node dev server) S 1 2 3 4 5 0 0 0 0 0 100 200 0 0 20 5 4 0 123456 1000000 1024";

    let mut group = c.benchmark_group("collect_parsers");
    group.bench_function("parse_loadavg", |b| {
        b.iter(|| black_box(parse_loadavg(black_box(loadavg))));
    });
    group.bench_function("parse_proc_stat", |b| {
        b.iter(|| black_box(parse_proc_stat(black_box(stat))));
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_scoring,
    bench_triage,
    bench_cover_validation,
    bench_parsers
);
criterion_main!(benches);
