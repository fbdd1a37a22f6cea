//! Operator library, exercised through single-node graphs.

use anyhow::Result;
use boundflow::ops::*;
use boundflow::testing::*;
use boundflow::*;

#[macro_use]
mod macros;

fn run_map(mapper: impl Mapper + 'static, rows: Vec<Row>) -> boundflow::Result<Vec<Row>> {
    graph_from_iter("in")
        .map(mapper)
        .collect(&Bindings::new().bind("in", move || rows.clone()))
}

fn run_reduce<const N: usize>(
    reducer: impl Reducer + 'static,
    keys: [&str; N],
    rows: Vec<Row>,
) -> boundflow::Result<Vec<Row>> {
    graph_from_iter("in")
        .reduce(reducer, keys)
        .collect(&Bindings::new().bind("in", move || rows.clone()))
}

fn axis_values() -> Vec<Row> {
    vec![
        row! { "test_id" => 1, "axis" => "a", "value" => 2 },
        row! { "test_id" => 2, "axis" => "b", "value" => 1 },
        row! { "test_id" => 3, "axis" => "c", "value" => 6 },
    ]
}

#[test]
fn division() -> Result<()> {
    let out = run_map(
        Divide::new("num", "denom", "res"),
        vec![
            row! { "num" => 1, "denom" => 2 },
            row! { "num" => 2, "denom" => 2 },
            row! { "num" => 3, "denom" => 3 },
        ],
    )?;
    assert_rows_equal(
        &out,
        &[
            row! { "num" => 1, "denom" => 2, "res" => 0.5 },
            row! { "num" => 2, "denom" => 2, "res" => 1.0 },
            row! { "num" => 3, "denom" => 3, "res" => 1.0 },
        ],
    );
    Ok(())
}

#[test]
fn project_keeps_listed_columns() -> Result<()> {
    let out = run_map(Project::new(["value"]), axis_values())?;
    assert_rows_equal(
        &out,
        &[row! { "value" => 2 }, row! { "value" => 1 }, row! { "value" => 6 }],
    );
    Ok(())
}

#[test]
fn mean_over_whole_stream() -> Result<()> {
    let out = run_reduce(Mean::new("value", "mean"), [], axis_values())?;
    assert_rows_equal(&out, &[row! { "mean" => 3.0 }]);
    Ok(())
}

#[test]
fn mean_of_nothing_emits_nothing() -> Result<()> {
    assert!(run_reduce(Mean::new("value", "mean"), [], Vec::new())?.is_empty());
    Ok(())
}

#[test]
fn filter_drops_short_words() -> Result<()> {
    let long = Filter::try_new(|row: &Row| Ok(row.require_str("text")?.chars().count() > 4));
    let out = run_map(
        long,
        vec![
            row! { "text" => "hello" },
            row! { "text" => "hi" },
            row! { "text" => "world" },
            row! { "text" => "tiny" },
        ],
    )?;
    assert_rows_equal(&out, &[row! { "text" => "hello" }, row! { "text" => "world" }]);
    Ok(())
}

#[test]
fn split_on_separator_and_whitespace() -> Result<()> {
    let out = run_map(Split::on("csv", ","), vec![row! { "id" => 1, "csv" => "a,b,,c" }])?;
    let parts: Vec<Option<&str>> = out.iter().map(|r| r.get("csv").and_then(Value::as_str)).collect();
    assert_eq!(parts, vec![Some("a"), Some("b"), Some(""), Some("c")]);
    assert!(out.iter().all(|r| r.get("id") == Some(&Value::Int(1))));

    let out = run_map(Split::whitespace("t"), vec![row! { "t" => "  one \t two\n" }])?;
    assert_rows_equal(&out, &[row! { "t" => "one" }, row! { "t" => "two" }]);
    Ok(())
}

#[test]
fn punctuation_and_case() -> Result<()> {
    let out = graph_from_iter("in")
        .map(FilterPunctuation::new("t"))
        .map(LowerCase::new("t"))
        .map(Identity)
        .collect(&Bindings::new().bind("in", || vec![row! { "t" => "It's A-OK!" }]))?;
    assert_rows_equal(&out, &[row! { "t" => "its aok" }]);
    Ok(())
}

#[test]
fn product_keeps_integers_integral() -> Result<()> {
    let out = run_map(
        Product::new(["a", "b"], "p"),
        vec![row! { "a" => 3, "b" => 4 }, row! { "a" => 3, "b" => 0.5 }],
    )?;
    assert_eq!(out[0].get("p"), Some(&Value::Int(12)));
    assert_eq!(out[1].get("p"), Some(&Value::float(1.5)));
    Ok(())
}

#[test]
fn idf_and_pmi_are_log_ratios() -> Result<()> {
    let out = run_map(
        Idf::new("docs", "with_word", "w", "idf"),
        vec![row! { "w" => "x", "docs" => 8, "with_word" => 2, "noise" => 1 }],
    )?;
    assert_eq!(out[0].len(), 2);
    assert_approx_eq!(out[0].require_f64("idf")?, 4.0_f64.ln());

    let out = run_map(
        Pmi::new("tf", "tf_total", "pmi"),
        vec![row! { "tf" => 0.3, "tf_total" => 0.1 }],
    )?;
    assert_approx_eq!(out[0].require_f64("pmi")?, 3.0_f64.ln(), 1e-9);
    Ok(())
}

#[test]
fn sums_and_counts() -> Result<()> {
    let rows = vec![
        row! { "k" => "a", "x" => 1, "y" => 0.5 },
        row! { "k" => "a", "x" => 2, "y" => 0.25 },
        row! { "k" => "b", "x" => 10, "y" => 1 },
    ];
    assert_rows_equal(
        &run_reduce(Sum::new("x"), ["k"], rows.clone())?,
        &[row! { "k" => "a", "x" => 3 }, row! { "k" => "b", "x" => 10 }],
    );
    assert_rows_equal(
        &run_reduce(MultiSum::new(["x", "y"]), ["k"], rows.clone())?,
        &[
            row! { "k" => "a", "x" => 3, "y" => 0.75 },
            row! { "k" => "b", "x" => 10, "y" => 1 },
        ],
    );
    assert_rows_equal(
        &run_reduce(RepeatCount::new("n"), ["k"], rows)?,
        &[
            row! { "k" => "a", "n" => 2 },
            row! { "k" => "a", "n" => 2 },
            row! { "k" => "b", "n" => 1 },
        ],
    );
    Ok(())
}

#[test]
fn term_frequency_in_first_seen_order() -> Result<()> {
    let out = run_reduce(
        TermFrequency::new("w", "tf"),
        ["doc"],
        vec![
            row! { "doc" => 1, "w" => "b" },
            row! { "doc" => 1, "w" => "a" },
            row! { "doc" => 1, "w" => "b" },
            row! { "doc" => 1, "w" => "b" },
            row! { "doc" => 2, "w" => "c" },
        ],
    )?;
    assert_rows_equal(
        &out,
        &[
            row! { "doc" => 1, "w" => "b", "tf" => 0.75 },
            row! { "doc" => 1, "w" => "a", "tf" => 0.25 },
            row! { "doc" => 2, "w" => "c", "tf" => 1.0 },
        ],
    );
    Ok(())
}

#[test]
fn top_n_prefers_earlier_rows_on_ties() -> Result<()> {
    let out = run_reduce(
        TopN::new("score", 3),
        ["g"],
        vec![
            row! { "g" => 1, "id" => "p", "score" => 5 },
            row! { "g" => 1, "id" => "q", "score" => 7 },
            row! { "g" => 1, "id" => "r", "score" => 5 },
            row! { "g" => 1, "id" => "s", "score" => 1 },
            row! { "g" => 1, "id" => "t", "score" => 5 },
            row! { "g" => 2, "id" => "u", "score" => 0 },
        ],
    )?;
    let ids: Vec<Option<&str>> = out.iter().map(|r| r.get("id").and_then(Value::as_str)).collect();
    assert_eq!(ids, vec![Some("q"), Some("p"), Some("r"), Some("u")]);
    Ok(())
}

#[test]
fn closures_work_as_mappers() -> Result<()> {
    let doubled = |row: Row| -> boundflow::Result<Rows> {
        let x = row.require("x")?.as_int().unwrap_or_default();
        Ok(rows_from(vec![row.clone().with("x", x * 2), row]))
    };
    let out = run_map(doubled, vec![row! { "x" => 4 }])?;
    assert_rows_equal(&out, &[row! { "x" => 8 }, row! { "x" => 4 }]);
    Ok(())
}

#[test]
fn sum_folder_starts_missing_columns_at_zero() -> Result<()> {
    let out = graph_from_iter("in")
        .fold(SumFolder::new(["a", "b"]), row! { "label" => "total" })
        .collect(&Bindings::new().bind("in", || {
            vec![row! { "a" => 1, "b" => 2.5 }, row! { "a" => 4, "b" => 0.5 }]
        }))?;
    assert_rows_equal(&out, &[row! { "label" => "total", "a" => 5, "b" => 3.0 }]);
    Ok(())
}

fn point(lon: f64, lat: f64) -> Value {
    Value::List(vec![Value::float(lon), Value::float(lat)])
}

fn traversals() -> Vec<Row> {
    vec![
        row! {
            "leave_time" => "20171020T112238.723000",
            "enter_time" => "20171020T112237.427000",
            "edge_id" => 8_414_926_848_168_493_057_i64,
        },
        row! {
            "leave_time" => "20171011T145553.040000",
            "enter_time" => "20171011T145551.957000",
            "edge_id" => 8_414_926_848_168_493_057_i64,
        },
    ]
}

#[test]
fn edge_lengths_agree_across_formulas() -> Result<()> {
    let edges = vec![
        row! { "start" => point(37.84870228730142, 55.73853974696249), "end" => point(37.8490418381989, 55.73832445777953) },
        row! { "start" => point(37.524768467992544, 55.88785375468433), "end" => point(37.52415172755718, 55.88807155843824) },
    ];
    let expected = [0.03201389419178626, 0.04544992068115006];
    for formula in [Formula::Haversine, Formula::CosineLaw] {
        let out = run_map(
            SphericalLength::new("start", "end", "length").with_formula(formula),
            edges.clone(),
        )?;
        for (row, km) in out.iter().zip(expected) {
            assert_approx_eq!(row.require_f64("length")?, km, 1e-6);
        }
    }
    Ok(())
}

#[test]
fn weekday_and_hour_of_entry() -> Result<()> {
    let out = run_map(WeekdayHour::new("enter_time", "weekday", "hour"), traversals())?;
    assert_eq!(out[0].get("weekday"), Some(&Value::from("Fri")));
    assert_eq!(out[0].get("hour"), Some(&Value::Int(11)));
    assert_eq!(out[1].get("weekday"), Some(&Value::from("Wed")));
    assert_eq!(out[1].get("hour"), Some(&Value::Int(14)));
    Ok(())
}

#[test]
fn time_between_timestamps() -> Result<()> {
    let out = run_map(TimeDiff::hours("enter_time", "leave_time", "time"), traversals())?;
    assert_approx_eq!(out[0].require_f64("time")?, 0.00036, 1e-12);
    assert_approx_eq!(out[1].require_f64("time")?, 0.000_300_833_333_333_333_35, 1e-12);

    let out = run_map(
        TravelTime::new("enter_time", "leave_time", "time", "weekday", "hour"),
        traversals(),
    )?;
    assert_approx_eq!(out[0].require_f64("time")?, 1.296, 1e-9);
    assert_eq!(out[1].get("weekday"), Some(&Value::from("Wed")));
    Ok(())
}

#[test]
fn speed_is_km_per_hour() -> Result<()> {
    let out = run_map(
        Speed::new("length", "time", "speed"),
        vec![row! { "length" => 1.5, "time" => 90 }],
    )?;
    assert_approx_eq!(out[0].require_f64("speed")?, 60.0);
    Ok(())
}
