//! JSON Lines rows.
//!
//! One JSON object per line maps to one [`Row`]: numbers become `Int` when
//! they fit `i64` and `Float` otherwise, arrays become `List`, `null` becomes
//! `Null`. Nested objects have no [`Value`] counterpart and are rejected.
//! Blank lines are skipped on read.
//!
//! Files ending in `.gz` are compressed and decompressed transparently.

use crate::graph::{Graph, graph_from_file};
use crate::io::compression::{FinishWrite, create_writer, open_reader};
use crate::{Row, Value};
use anyhow::{Context, Result, bail};
use serde_json::{Map, Number, Value as Json};
use std::io::{BufRead, Write};
use std::path::Path;

/// Convert a JSON scalar or array into a [`Value`].
///
/// # Errors
/// Fails on JSON objects.
pub fn json_to_value(json: Json) -> Result<Value> {
    Ok(match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Json::String(s) => Value::Text(s),
        Json::Array(items) => Value::List(
            items
                .into_iter()
                .map(json_to_value)
                .collect::<Result<_>>()?,
        ),
        Json::Object(_) => bail!("nested objects are not supported"),
    })
}

/// Convert a [`Value`] to JSON. Non-finite floats have no JSON form and become `null`.
#[must_use]
pub fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(i) => Json::Number((*i).into()),
        Value::Float(f) => Number::from_f64(f.0).map_or(Json::Null, Json::Number),
        Value::Text(s) => Json::String(s.clone()),
        Value::List(items) => Json::Array(items.iter().map(value_to_json).collect()),
    }
}

/// Parse one JSONL line into a row. Usable directly as a file-source parser.
///
/// # Errors
/// Fails on invalid JSON, on a top level that is not an object, and on nested objects.
pub fn parse_json_row(line: &str) -> Result<Row> {
    let Json::Object(fields) = serde_json::from_str::<Json>(line).context("invalid JSON")? else {
        bail!("expected a JSON object");
    };
    fields
        .into_iter()
        .map(|(column, json)| {
            let value = json_to_value(json).with_context(|| format!("column `{column}`"))?;
            Ok::<_, anyhow::Error>((column, value))
        })
        .collect()
}

/// The row as a JSON object, columns in row order.
#[must_use]
pub fn row_to_json(row: &Row) -> Json {
    let fields: Map<String, Json> = row
        .iter()
        .map(|(column, value)| (column.to_string(), value_to_json(value)))
        .collect();
    Json::Object(fields)
}

/// Graph source reading `path` as JSONL.
#[must_use]
pub fn jsonl_source(path: impl AsRef<Path>) -> Graph {
    graph_from_file(path.as_ref(), parse_json_row)
}

/// Read a whole JSONL file into memory.
///
/// # Errors
/// Fails if the file cannot be read or any non-blank line does not parse.
pub fn read_jsonl(path: impl AsRef<Path>) -> Result<Vec<Row>> {
    let path = path.as_ref();
    let reader = open_reader(path).with_context(|| format!("open {}", path.display()))?;
    let mut out = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("read line {} in {}", i + 1, path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        out.push(
            parse_json_row(&line)
                .with_context(|| format!("parse JSONL line {} in {}", i + 1, path.display()))?,
        );
    }
    Ok(out)
}

/// Write a row stream (typically a run's output) as JSONL.
///
/// Stops at the first error in `rows`; lines written before it stay on disk.
///
/// # Returns
/// The number of rows written.
///
/// # Errors
/// The first stream error, or any failure creating or writing the file.
pub fn write_jsonl<I>(path: impl AsRef<Path>, rows: I) -> Result<usize>
where
    I: IntoIterator<Item = crate::Result<Row>>,
{
    let path = path.as_ref();
    let mut w = create_writer(path).with_context(|| format!("create {}", path.display()))?;
    let mut written = 0;
    for row in rows {
        let row = row?;
        serde_json::to_writer(&mut w, &row_to_json(&row))
            .with_context(|| format!("serialize row #{written} to {}", path.display()))?;
        w.write_all(b"\n")?;
        written += 1;
    }
    w.finish()
        .with_context(|| format!("finish {}", path.display()))?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row;

    #[test]
    fn parses_scalars_and_lists() -> Result<()> {
        let r = parse_json_row(r#"{"text": "hi", "n": 3, "x": 0.5, "ok": true, "none": null, "pt": [1, 2.5]}"#)?;
        assert_eq!(
            r,
            row! {
                "text" => "hi",
                "n" => 3,
                "x" => 0.5,
                "ok" => true,
                "none" => Value::Null,
                "pt" => Value::List(vec![Value::Int(1), Value::float(2.5)]),
            }
        );
        Ok(())
    }

    #[test]
    fn column_order_follows_the_line() -> Result<()> {
        let r = parse_json_row(r#"{"text": "a", "doc_id": 1}"#)?;
        assert_eq!(r.columns().collect::<Vec<_>>(), vec!["text", "doc_id"]);
        assert_eq!(row_to_json(&r).to_string(), r#"{"text":"a","doc_id":1}"#);
        Ok(())
    }

    #[test]
    fn rejects_non_objects_and_nesting() {
        assert!(parse_json_row("[1, 2]").is_err());
        assert!(parse_json_row(r#"{"a": {"b": 1}}"#).is_err());
        assert!(parse_json_row("{").is_err());
    }
}
