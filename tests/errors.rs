//! Error reporting: every failure surfaces through the output stream at the
//! row it affects, and the graph stays usable afterwards.

use anyhow::Result;
use boundflow::ops::{Count, Divide, Project, Sum};
use boundflow::testing::*;
use boundflow::*;
use std::io::Write;

#[test]
fn unbound_source_is_reported_before_running() {
    let p = Pipeline::default();
    let graph = p
        .source("left")
        .join(boundflow::ops::InnerJoiner::new(), &p.source("right"), ["k"]);
    let bindings = Bindings::new().bind("left", Vec::<Row>::new);

    match graph.run(&bindings) {
        Err(PipelineError::UnboundSource { name }) => assert_eq!(name, "right"),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("run should fail without a binding for `right`"),
    }
}

#[test]
fn missing_column_keeps_the_valid_prefix() -> Result<()> {
    let graph = graph_from_iter("rows").map(Project::new(["a"]));
    let mut out = graph.run(&Bindings::new().bind("rows", || {
        vec![row! { "a" => 1 }, row! { "b" => 2 }, row! { "a" => 3 }]
    }))?;

    assert_eq!(out.next().transpose()?, Some(row! { "a" => 1 }));
    match out.next() {
        Some(Err(PipelineError::MissingColumn { column })) => assert_eq!(column, "a"),
        other => panic!("expected MissingColumn, got {other:?}"),
    }
    assert!(out.next().is_none());
    Ok(())
}

#[test]
fn missing_reduce_key_is_reported() {
    let graph = graph_from_iter("rows").reduce(Count::new("n"), ["k"]);
    let result = graph.collect(&Bindings::new().bind("rows", || vec![row! { "x" => 1 }]));
    assert!(matches!(result, Err(PipelineError::MissingColumn { ref column }) if column == "k"));
}

#[test]
fn type_mismatch_names_the_column() {
    let graph = graph_from_iter("rows").reduce(Sum::new("v"), NO_KEYS);
    let result = graph.collect(&Bindings::new().bind("rows", || {
        vec![row! { "v" => 1 }, row! { "v" => "two" }]
    }));
    match result {
        Err(PipelineError::TypeMismatch { column, found, .. }) => {
            assert_eq!((column.as_str(), found), ("v", "text"));
        }
        other => panic!("expected TypeMismatch, got {other:?}"),
    }
}

#[test]
fn operator_failures_are_wrapped() {
    let graph = graph_from_iter("rows").map(Divide::new("n", "d", "q"));
    let result = graph.collect(&Bindings::new().bind("rows", || vec![row! { "n" => 1, "d" => 0 }]));
    let err = result.err().map(|e| e.to_string()).unwrap_or_default();
    assert!(err.contains("division by zero"), "{err}");
}

#[test]
fn unsorted_reduce_input_is_detected() {
    let graph = graph_from_iter("rows").reduce(Count::new("n"), ["k"]);
    let bindings = Bindings::new().bind("rows", || {
        vec![row! { "k" => 1 }, row! { "k" => 2 }, row! { "k" => 1 }]
    });

    match graph.collect(&bindings) {
        Err(PipelineError::UnsortedInput { previous, current }) => {
            assert_eq!(previous, vec![Value::Int(2)]);
            assert_eq!(current, vec![Value::Int(1)]);
        }
        other => panic!("expected UnsortedInput, got {other:?}"),
    }

    // With the check off the run completes and groups by adjacency.
    let lenient = Runner::new(RunConfig::default().with_check_sorted(false));
    let out: boundflow::Result<Vec<Row>> = lenient
        .run(&graph, &bindings)
        .and_then(|rows| rows.collect());
    assert_eq!(out.map(|rows| rows.len()).ok(), Some(3));
}

#[test]
fn unsorted_join_input_is_detected() {
    let left = graph_from_iter("left");
    let graph = left.join(
        boundflow::ops::OuterJoiner::new(),
        &graph_from_iter("right"),
        ["key"],
    );
    let result = graph.collect(
        &Bindings::new()
            .bind("left", || {
                let mut rows = join_left();
                rows.reverse();
                rows
            })
            .bind("right", join_right),
    );
    assert!(matches!(result, Err(PipelineError::UnsortedInput { .. })));
}

#[test]
fn source_errors_end_the_stream() -> Result<()> {
    let graph = graph_from_iter("rows").sort(["k"]);
    let bindings = Bindings::new().bind_fallible("rows", || {
        vec![
            Ok(row! { "k" => 2 }),
            Err(PipelineError::Operator(anyhow::anyhow!("upstream broke"))),
            Ok(row! { "k" => 1 }),
        ]
    });
    let result = graph.collect(&bindings);
    assert!(matches!(result, Err(PipelineError::Operator(_))));

    // The graph is still usable with healthy input.
    let out = graph.collect(&Bindings::new().bind("rows", || vec![row! { "k" => 2 }, row! { "k" => 1 }]))?;
    assert_rows_equal(&out, &[row! { "k" => 1 }, row! { "k" => 2 }]);
    Ok(())
}

#[test]
fn malformed_file_line_reports_its_position() -> Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    writeln!(file, "1")?;
    writeln!(file)?;
    writeln!(file, "2")?;
    writeln!(file, "three")?;
    writeln!(file, "4")?;

    let graph = graph_from_file(file.path(), |line: &str| -> anyhow::Result<Row> {
        Ok(row! { "n" => line.trim().parse::<i64>()? })
    });
    let rows: Vec<boundflow::Result<Row>> = graph.run(&Bindings::new())?.collect();

    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].as_ref().ok(), Some(&row! { "n" => 1 }));
    assert_eq!(rows[1].as_ref().ok(), Some(&row! { "n" => 2 }));
    match &rows[2] {
        Err(PipelineError::MalformedInput { line, .. }) => assert_eq!(*line, 4),
        other => panic!("expected MalformedInput, got {other:?}"),
    }
    Ok(())
}

#[test]
fn missing_file_is_a_source_io_error() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let graph = graph_from_file(dir.path().join("absent.jsonl"), parse_json_row);
    let result = graph.collect(&Bindings::new());
    assert!(matches!(result, Err(PipelineError::SourceIo { .. })));
    Ok(())
}
