mod common;

use bdt_sync::{WriteCoalescer, WriteConfig};
use bdt_types::{EntityId, ScreenerBenefits};
use common::{TestStore, screener};
use proptest::prelude::*;
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Step {
    Edit,
    CompleteWrite,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![3 => Just(Step::Edit), 1 => Just(Step::CompleteWrite)]
}

fn revision(n: usize) -> Arc<ScreenerBenefits> {
    let mut doc = screener("s1", &[]);
    doc.screener_name = n.to_string();
    Arc::new(doc)
}

fn revisions(store: &TestStore<ScreenerBenefits>) -> Vec<usize> {
    store
        .written()
        .iter()
        .map(|d| d.screener_name.parse().unwrap())
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn interleaved_edits_and_completions(steps in prop::collection::vec(step(), 1..60)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let (edits, written, max_concurrent) = runtime.block_on(async {
            let store = Arc::new(TestStore::<ScreenerBenefits>::gated_writes());
            let writer = WriteCoalescer::<ScreenerBenefits>::new(EntityId::new("s1"), store.clone(), WriteConfig::default()).unwrap();

            let mut edits = 0;
            for step in &steps {
                match step {
                    Step::Edit => {
                        edits += 1;
                        writer.on_document_changed(revision(edits));
                    }
                    Step::CompleteWrite => store.release_writes(1),
                }
                for _ in 0..4 {
                    tokio::task::yield_now().await;
                }
            }
            store.release_writes(steps.len());
            writer.wait_idle().await;

            (edits, revisions(&store), store.max_concurrent_writes())
        });

        prop_assert!(max_concurrent <= 1);
        prop_assert!(written.len() <= edits);
        prop_assert!(written.windows(2).all(|w| w[0] < w[1]));
        if edits > 0 {
            prop_assert_eq!(written.first().copied(), Some(1));
            prop_assert_eq!(written.last().copied(), Some(edits));
        } else {
            prop_assert!(written.is_empty());
        }
    }
}
