// Benchmark window replays and the per-window metrics on synthetic histories.

use chrono::{Days, NaiveDate};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use keydev_core::config::KeydevConfig;
use keydev_core::dataset::Dataset;
use keydev_core::engine::KnowledgeEngine;
use keydev_core::experiment::run_experiment;
use keydev_core::progress::NoopReporter;
use keydev_core::types::{ChangeSet, CodeChange};

/// `days` days of history, `per_day` commits a day.
///
/// Authors and files are picked with prime strides so that developers share
/// files without every commit touching the same ones.
fn synthetic_dataset(days: u64, per_day: usize, developers: usize, files: usize) -> Dataset {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let mut change_sets = Vec::new();

    for day in 0..days {
        let date = start.checked_add_days(Days::new(day)).unwrap();
        for k in 0..per_day {
            let i = usize::try_from(day).unwrap() * per_day + k;
            let code_changes = (0..3)
                .map(|j| CodeChange::Modify {
                    path: format!("src/f{}.rs", (i * 7 + j * 13) % files),
                })
                .collect();
            change_sets.push(ChangeSet {
                commit_hash: format!("c{i}"),
                author: format!("dev{}", (i * 31) % developers),
                date,
                issues: vec![format!("KD-{}", i % 50)],
                code_changes,
                num_files_in_project: files,
            });
        }
    }

    Dataset::new(change_sets)
}

fn bench_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("replay");
    group.sample_size(10);

    for days in [30, 90] {
        let dataset = synthetic_dataset(days, 4, 12, 200);
        group.bench_with_input(BenchmarkId::new("days", days), &dataset, |b, data| {
            b.iter(|| {
                run_experiment(data.clone(), KeydevConfig::with_window_size(14), &NoopReporter)
                    .unwrap()
            });
        });
    }

    group.finish();
}

fn bench_window_metrics(c: &mut Criterion) {
    let mut group = c.benchmark_group("window_metrics");
    group.sample_size(10);

    for developers in [10, 30] {
        let dataset = synthetic_dataset(30, developers / 2, developers, 300);
        let engine =
            KnowledgeEngine::new(dataset, KeydevConfig::with_window_size(30)).unwrap();

        group.bench_with_input(
            BenchmarkId::new("developers", developers),
            &engine,
            |b, engine| {
                b.iter(|| {
                    // Fresh caches on every iteration.
                    let engine = engine.clone();
                    let jacks = engine.jacks().map(keydev_core::types::Scores::len);
                    let connectors = engine.connectors().len();
                    (jacks, connectors, engine.balanced_or_hero())
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_replay, bench_window_metrics);
criterion_main!(benches);
