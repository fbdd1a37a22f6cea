//! Execution counters.

use anyhow::Result;
use boundflow::ops::{Count, InnerJoiner, SumFolder};
use boundflow::testing::*;
use boundflow::*;
use serde_json::json;

fn counted_runner(metrics: &ExecutionMetrics) -> Runner {
    Runner::new(
        RunConfig::default()
            .with_sort(SortConfig::default().with_chunk_size(4).with_merge_fan_in(8))
            .with_metrics(metrics.clone()),
    )
}

#[test]
fn counters_follow_the_run() -> Result<()> {
    let metrics = ExecutionMetrics::new();
    let graph = graph_from_iter("rows")
        .sort(["k"])
        .reduce(Count::new("n"), ["k"]);
    let bindings = Bindings::new().bind("rows", || numbered_rows(10, 3));

    let out: Vec<Row> = counted_runner(&metrics)
        .run(&graph, &bindings)?
        .collect::<boundflow::Result<_>>()?;

    let snap = metrics.snapshot();
    assert_eq!(snap.source_rows, 10);
    assert_eq!(snap.sort_passes, 1);
    // Chunks of 4, 4 and a 2-row tail kept in memory.
    assert_eq!(snap.spilled_runs, 2);
    assert_eq!(snap.spilled_rows, 8);
    assert_eq!(snap.merge_passes, 0);
    assert_eq!(snap.reduce_groups, u64::try_from(out.len())?);
    Ok(())
}

#[test]
fn join_and_fold_counters() -> Result<()> {
    let metrics = ExecutionMetrics::new();
    let graph = graph_from_iter("left")
        .join(InnerJoiner::new(), &graph_from_iter("right"), ["key"])
        .fold(SumFolder::new(["key"]), row! { "key" => 0 });
    let bindings = Bindings::new()
        .bind("left", join_left)
        .bind("right", join_right);

    let out: Vec<Row> = counted_runner(&metrics)
        .run(&graph, &bindings)?
        .collect::<boundflow::Result<_>>()?;
    assert_rows_equal(&out, &[row! { "key" => 8 }]);

    let snap = metrics.snapshot();
    assert_eq!(snap.join_keys, 2);
    assert_eq!(snap.folded_rows, 3);
    assert_eq!(snap.source_rows, 7);
    Ok(())
}

#[test]
fn snapshot_serializes_and_resets() -> Result<()> {
    let metrics = ExecutionMetrics::new();
    let graph = graph_from_iter("rows").sort(["k"]);
    let bindings = Bindings::new().bind("rows", || numbered_rows(3, 2));
    let drained = counted_runner(&metrics).run(&graph, &bindings)?.count();
    assert_eq!(drained, 3);

    let json = metrics.to_json();
    assert_eq!(json["sort_passes"], json!(1));
    assert_eq!(json["peak_buffered_rows"], json!(3));
    assert_eq!(json["spilled_runs"], json!(0));

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("metrics.json");
    metrics.save_to_file(&path)?;
    let saved: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
    assert_eq!(saved, json);

    metrics.reset();
    assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    Ok(())
}
