//! Integration tests for the parallel batch runner.

use std::sync::atomic::{AtomicUsize, Ordering};

use molpipe_lib::batch::{BatchRunner, ItemError};
use molpipe_lib::progress::ProgressSink;
use molpipe_lib::stages;

use crate::helpers::{NumberToolkit, molecules, number_store};

/// 1000 items, item 500 fails: the other 999 are updated and progress reaches 1000.
#[test]
fn test_single_failure_is_isolated() {
    let (sink, lines) = ProgressSink::buffer();
    let runner = BatchRunner::new(4).unwrap().with_verbose(true).with_sink(sink);
    let mut items: Vec<u32> = (0..1000).collect();

    let report = runner.update("Incrementing", &mut items, |i, item| {
        if i == 500 {
            return Err(ItemError::Failed("item 500".to_string()));
        }
        *item += 10_000;
        Ok(())
    });

    assert_eq!(report.processed, 1000);
    assert_eq!(report.failed, 1);
    assert_eq!(report.samples, vec![(500, "item 500".to_string())]);
    assert_eq!(items[500], 500);
    let updated = items.iter().filter(|&&v| v >= 10_000).count();
    assert_eq!(updated, 999);

    let lines = lines.lock();
    let last = lines.last().expect("progress lines");
    assert!(last.contains("100.00%"), "{last}");
    assert!(last.contains("1,000/1,000"), "{last}");
}

#[test]
fn test_panicking_items_do_not_abort_the_batch() {
    let runner = BatchRunner::new(3).unwrap().with_sink(ProgressSink::Silent);
    let visited = AtomicUsize::new(0);
    let report = runner.run("Visiting", 200, |i| {
        visited.fetch_add(1, Ordering::Relaxed);
        assert!(i % 50 != 7, "boom at {i}");
        Ok(())
    });
    assert_eq!(visited.load(Ordering::Relaxed), 200);
    assert_eq!(report.panicked, 4);
    assert_eq!(report.failed, 0);
    assert_eq!(report.succeeded(), 196);
    assert!(report.samples.iter().all(|(i, _)| i % 50 == 7));
}

#[test]
fn test_toolkit_panic_leaves_record_unchanged() {
    let toolkit = NumberToolkit::panicking_on(&[21]);
    let runner = BatchRunner::new(2).unwrap().with_sink(ProgressSink::Silent);
    let mut store = number_store([10, 21, 30]);
    let report = stages::apply_transform(
        &toolkit,
        &mut store,
        &runner,
        molpipe_lib::toolkit::Transform::Neutralize,
    );
    assert_eq!(report.panicked, 1);
    assert_eq!(molecules(&store), vec![Some(11), Some(21), Some(31)]);
}

#[test]
fn test_map_results_are_in_item_order() {
    let items: Vec<u64> = (0..5000).collect();
    for workers in [1, 2, 8] {
        let runner = BatchRunner::new(workers).unwrap().with_sink(ProgressSink::Silent);
        let (results, report) = runner.map("Squaring", &items, |i, &x| {
            assert_eq!(i as u64, x);
            Ok(x * x)
        });
        assert_eq!(report.total_failed(), 0);
        let squares: Vec<u64> = results.into_iter().map(Result::unwrap).collect();
        assert_eq!(squares, items.iter().map(|x| x * x).collect::<Vec<_>>());
    }
}
