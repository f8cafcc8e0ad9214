use std::collections::BTreeSet;

use proptest::prelude::*;

use keydev_core::types::CodeChange;
use keydev_test::{DatasetBuilder, add, config, delete, modify, rename, start_date};

const FILES: [&str; 6] = ["a.rs", "b.rs", "c.rs", "d.rs", "e.rs", "f.rs"];
const AUTHORS: [&str; 4] = ["ann", "ben", "cid", "dot"];
const LAST_DAY: u64 = 10;

fn change(kind: u8, file: usize) -> CodeChange {
    let path = FILES[file];
    match kind {
        0 => add(path),
        1 => modify(path),
        2 => delete(path),
        _ => rename(path, FILES[(file + 1) % FILES.len()]),
    }
}

fn history() -> impl Strategy<Value = Vec<(u64, usize, Vec<(u8, usize)>)>> {
    prop::collection::vec(
        (
            0..=LAST_DAY,
            0..AUTHORS.len(),
            prop::collection::vec((0u8..4, 0..FILES.len()), 1..4),
        ),
        1..25,
    )
}

fn build(commits: &[(u64, usize, Vec<(u8, usize)>)]) -> DatasetBuilder {
    let mut builder = DatasetBuilder::new(start_date())
        .modify("first", "ann", 0, &["a.rs"])
        .modify("last", "ben", LAST_DAY, &["b.rs"]);
    for (i, (day, author, changes)) in commits.iter().enumerate() {
        let changes = changes.iter().map(|&(kind, file)| change(kind, file)).collect();
        builder = builder.commit(&format!("c{i}"), AUTHORS[*author], *day, changes);
    }
    builder
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn window_invariants_hold_on_every_slide(commits in history(), window in 1u32..6) {
        let fixture = build(&commits);
        let mut engine = fixture.engine(config(window));
        let mut slides = 0usize;

        loop {
            let (first, last) = (engine.first_included_date(), engine.last_included_date());
            let graph = engine.artifact_graph();
            prop_assert_eq!(graph.num_isolated_nodes(), 0);

            for (_, _, edge) in graph.edges() {
                if let Some(date) = edge.date {
                    prop_assert!(first <= date && date <= last);
                }
            }

            let expected: BTreeSet<&str> = fixture
                .change_sets()
                .iter()
                .filter(|cs| first <= cs.date && cs.date <= last)
                .map(|cs| cs.author.as_str())
                .collect();
            let actual: BTreeSet<&str> = engine.developers().into_iter().collect();
            prop_assert_eq!(actual, expected);

            let jacks = engine.jacks().cloned();
            prop_assert_eq!(engine.jacks().cloned(), jacks);
            for files in engine.dev_to_rare_files().values() {
                for file in files {
                    prop_assert_eq!(engine.file_to_devs()[file].len(), 1);
                }
            }

            if !engine.forward_one_day().unwrap() {
                break;
            }
            slides += 1;
        }

        prop_assert_eq!(slides + 1, engine.num_iterations());
    }
}
