//! External sort: correctness across chunk sizes, spilling, multi-pass merges
//! and bounded buffering.

use anyhow::Result;
use boundflow::testing::*;
use boundflow::*;
use std::fs;
use tracing_subscriber::EnvFilter;

/// Show spill and merge events with `RUST_LOG=boundflow=debug`.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn runner(chunk_size: usize, fan_in: usize, metrics: &ExecutionMetrics) -> Runner {
    Runner::new(
        RunConfig::default()
            .with_sort(
                SortConfig::default()
                    .with_chunk_size(chunk_size)
                    .with_merge_fan_in(fan_in),
            )
            .with_metrics(metrics.clone()),
    )
}

fn in_memory_sort(rows: &[Row], keys: &[&str]) -> Vec<Row> {
    let mut keyed: Vec<(Vec<Value>, Row)> = rows
        .iter()
        .map(|r| {
            let key = keys.iter().filter_map(|k| r.get(k).cloned()).collect();
            (key, r.clone())
        })
        .collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    keyed.into_iter().map(|(_, r)| r).collect()
}

#[test]
fn chunk_size_never_changes_the_result() -> Result<()> {
    let input = numbered_rows(200, 17);
    let expected = in_memory_sort(&input, &["k"]);
    let graph = graph_from_iter("rows").sort(["k"]);

    for chunk_size in [1, 2, 7, 64, 199, 200, 201, 10_000] {
        let rows = input.clone();
        let bindings = Bindings::new().bind("rows", move || rows.clone());
        let metrics = ExecutionMetrics::new();
        let out: Vec<Row> = runner(chunk_size, 4, &metrics)
            .run(&graph, &bindings)?
            .collect::<boundflow::Result<_>>()?;

        assert_rows_equal(&out, &expected);
        assert_sorted_by(&out, &["k"]);
    }
    Ok(())
}

#[test]
fn small_input_stays_in_memory() -> Result<()> {
    let metrics = ExecutionMetrics::new();
    let graph = graph_from_iter("rows").sort(["k"]);
    let bindings = Bindings::new().bind("rows", || numbered_rows(10, 5));
    let out: Vec<Row> = runner(100, 4, &metrics)
        .run(&graph, &bindings)?
        .collect::<boundflow::Result<_>>()?;

    assert_eq!(out.len(), 10);
    let snap = metrics.snapshot();
    assert_eq!(snap.sort_passes, 1);
    assert_eq!(snap.spilled_runs, 0);
    assert_eq!(snap.peak_buffered_rows, 10);
    Ok(())
}

#[test]
fn many_runs_take_several_merge_passes() -> Result<()> {
    init_tracing();
    let metrics = ExecutionMetrics::new();
    let graph = graph_from_iter("rows").sort(["k", "id"]);
    let bindings = Bindings::new().bind("rows", || numbered_rows(100, 10));
    let out: Vec<Row> = runner(5, 3, &metrics)
        .run(&graph, &bindings)?
        .collect::<boundflow::Result<_>>()?;

    assert_eq!(out.len(), 100);
    assert_sorted_by(&out, &["k", "id"]);

    // 20 runs of 5 rows: 20 -> 7 -> 3 runs, then the final merge.
    let snap = metrics.snapshot();
    assert_eq!(snap.merge_passes, 2);
    assert_eq!(snap.spilled_runs, 20 + 7 + 3);
    assert_eq!(snap.spilled_rows, 300);
    Ok(())
}

#[test]
fn equal_keys_keep_arrival_order() -> Result<()> {
    let input = numbered_rows(300, 4);
    let graph = graph_from_iter("rows").sort(["k"]);
    let metrics = ExecutionMetrics::new();
    let bindings = Bindings::new().bind("rows", move || input.clone());
    let out: Vec<Row> = runner(8, 2, &metrics)
        .run(&graph, &bindings)?
        .collect::<boundflow::Result<_>>()?;

    assert_sorted_by(&out, &["k", "id"]);
    Ok(())
}

#[test]
fn empty_key_list_keeps_input_order() -> Result<()> {
    let input = numbered_rows(50, 9);
    let expected = input.clone();
    let metrics = ExecutionMetrics::new();
    let graph = graph_from_iter("rows").sort(NO_KEYS);
    let bindings = Bindings::new().bind("rows", move || input.clone());
    let out: Vec<Row> = runner(6, 2, &metrics)
        .run(&graph, &bindings)?
        .collect::<boundflow::Result<_>>()?;

    assert_rows_equal(&out, &expected);
    Ok(())
}

#[test]
fn heterogeneous_values_sort_by_kind_then_payload() -> Result<()> {
    let input = vec![
        row! { "v" => "b" },
        row! { "v" => 2.5 },
        row! { "v" => true },
        row! { "v" => Value::Null },
        row! { "v" => 2 },
        row! { "v" => "a" },
        row! { "v" => Value::List(vec![Value::Int(1)]) },
        row! { "v" => 2.0 },
    ];
    let graph = graph_from_iter("rows").sort(["v"]);
    let out = graph.collect(&Bindings::new().bind("rows", move || input.clone()))?;
    let values: Vec<Value> = out.iter().filter_map(|r| r.get("v").cloned()).collect();
    assert_eq!(
        values,
        vec![
            Value::Null,
            Value::Bool(true),
            Value::Int(2),
            Value::float(2.0),
            Value::float(2.5),
            Value::from("a"),
            Value::from("b"),
            Value::List(vec![Value::Int(1)]),
        ]
    );
    Ok(())
}

#[test]
fn buffering_is_bounded_by_chunk_and_fan_in() -> Result<()> {
    init_tracing();
    let (chunk_size, fan_in) = (16, 4);
    let source = CountingSource::generated(5_000, |i| row! { "id" => i, "k" => (i * 7919) % 1000 });
    let metrics = ExecutionMetrics::new();
    let graph = graph_from_iter("rows").sort(["k"]);

    let mut stream = runner(chunk_size, fan_in, &metrics)
        .run(&graph, &source.bind_to(Bindings::new(), "rows"))?;
    assert_eq!(source.pulled(), 0);

    let first = stream.next().transpose()?;
    assert_eq!(first.and_then(|r| r.get("k").cloned()), Some(Value::Int(0)));
    assert_eq!(source.pulled(), 5_000);
    assert_eq!(stream.count(), 4_999);

    let peak = usize::try_from(metrics.snapshot().peak_buffered_rows)?;
    assert!(peak <= chunk_size + fan_in + 1, "peak {peak}");
    Ok(())
}

#[test]
fn spill_directory_is_removed_after_completion_and_drop() -> Result<()> {
    let scratch = tempfile::tempdir()?;
    let runner = Runner::new(RunConfig::default().with_sort(
        SortConfig::default()
            .with_chunk_size(3)
            .with_spill_dir(scratch.path()),
    ));
    let graph = graph_from_iter("rows").sort(["k"]);
    let bindings = Bindings::new().bind("rows", || numbered_rows(40, 6));

    let drained = runner.run(&graph, &bindings)?.count();
    assert_eq!(drained, 40);
    assert_eq!(fs::read_dir(scratch.path())?.count(), 0);

    let mut partial = runner.run(&graph, &bindings)?;
    partial.next().transpose()?;
    assert_eq!(fs::read_dir(scratch.path())?.count(), 1);
    drop(partial);
    assert_eq!(fs::read_dir(scratch.path())?.count(), 0);
    Ok(())
}
