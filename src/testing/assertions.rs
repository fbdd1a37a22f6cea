//! Assertion functions for comparing graph output.

use crate::{Row, Value};

/// Assert that two row sequences are equal in order and content.
///
/// # Panics
///
/// Panics if the sequences differ in length or at any position.
///
/// # Example
///
/// ```
/// use boundflow::row;
/// use boundflow::testing::assert_rows_equal;
///
/// let actual = vec![row! { "a" => 1 }, row! { "a" => 2 }];
/// assert_rows_equal(&actual, &[row! { "a" => 1 }, row! { "a" => 2 }]);
/// ```
pub fn assert_rows_equal(actual: &[Row], expected: &[Row]) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "Row count mismatch:\n  Expected count: {}\n  Actual count: {}\n  Expected: {}\n  Actual: {}",
        expected.len(),
        actual.len(),
        render(expected),
        render(actual)
    );

    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert_eq!(
            a,
            e,
            "Row mismatch at index {i}:\n  Expected: {e}\n  Actual: {a}\n  Full expected: {}\n  Full actual: {}",
            render(expected),
            render(actual)
        );
    }
}

/// Assert that two row sequences hold the same rows, ignoring order.
///
/// Duplicates count: each expected row must be matched by a distinct actual row.
///
/// # Panics
///
/// Panics if the multisets of rows differ.
pub fn assert_rows_unordered_equal(actual: &[Row], expected: &[Row]) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "Row count mismatch:\n  Expected count: {}\n  Actual count: {}\n  Expected: {}\n  Actual: {}",
        expected.len(),
        actual.len(),
        render(expected),
        render(actual)
    );

    let mut unmatched: Vec<&Row> = actual.iter().collect();
    let mut missing: Vec<&Row> = Vec::new();
    for e in expected {
        match unmatched.iter().position(|a| *a == e) {
            Some(i) => {
                unmatched.swap_remove(i);
            }
            None => missing.push(e),
        }
    }

    if !missing.is_empty() {
        panic!(
            "Row content mismatch:\n  Missing rows: {}\n  Extra rows: {}\n  Expected: {}\n  Actual: {}",
            render_refs(&missing),
            render_refs(&unmatched),
            render(expected),
            render(actual)
        );
    }
}

/// Assert that rows are in ascending order of the `keys` columns.
///
/// # Panics
///
/// Panics if a row lacks a key column or sorts before its predecessor.
pub fn assert_sorted_by<S: AsRef<str>>(rows: &[Row], keys: &[S]) {
    let key_of = |i: usize, row: &Row| -> Vec<Value> {
        keys.iter()
            .map(|k| {
                let k = k.as_ref();
                row.get(k)
                    .cloned()
                    .unwrap_or_else(|| panic!("Row {i} has no key column `{k}`: {row}"))
            })
            .collect()
    };

    for (i, pair) in rows.windows(2).enumerate() {
        let (prev, next) = (key_of(i, &pair[0]), key_of(i + 1, &pair[1]));
        assert!(
            prev <= next,
            "Rows out of order at index {}:\n  Previous: {}\n  Current: {}",
            i + 1,
            pair[0],
            pair[1]
        );
    }
}

fn render(rows: &[Row]) -> String {
    render_refs(&rows.iter().collect::<Vec<_>>())
}

fn render_refs(rows: &[&Row]) -> String {
    let parts: Vec<String> = rows.iter().map(ToString::to_string).collect();
    format!("[{}]", parts.join(", "))
}
