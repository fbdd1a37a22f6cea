//! Pre-built datasets for common testing scenarios.

use crate::{Row, row};

/// The two-document corpus of the classic word-count check.
///
/// ```
/// use boundflow::testing::word_count_docs;
///
/// assert_eq!(word_count_docs().len(), 2);
/// ```
#[must_use]
pub fn word_count_docs() -> Vec<Row> {
    vec![
        row! { "text" => "Hello, world!" },
        row! { "text" => "hello" },
    ]
}

/// Small corpus with `doc_id` and `text` columns, for tf-idf and PMI graphs.
#[must_use]
pub fn sample_docs() -> Vec<Row> {
    vec![
        row! { "doc_id" => 1, "text" => "hello, little world" },
        row! { "doc_id" => 2, "text" => "little" },
        row! { "doc_id" => 3, "text" => "little little little" },
        row! { "doc_id" => 4, "text" => "little? hello little world" },
        row! { "doc_id" => 5, "text" => "HELLO HELLO! WORLD..." },
        row! { "doc_id" => 6, "text" => "world? world... world!!! WORLD!!! HELLO!!!" },
    ]
}

/// Words to reduce, already sorted by `text`.
///
/// Distinct words with their multiplicities: hell 1, hello 2, little 3, my 2, world 1.
#[must_use]
pub fn sorted_words() -> Vec<Row> {
    ["hell", "hello", "hello", "little", "little", "little", "my", "my", "world"]
        .into_iter()
        .enumerate()
        .map(|(i, w)| row! { "id" => i, "text" => w })
        .collect()
}

/// Left join input, sorted by `key`: keys 1, 2 and 3.
#[must_use]
pub fn join_left() -> Vec<Row> {
    vec![
        row! { "key" => 1, "left" => "a" },
        row! { "key" => 2, "left" => "b" },
        row! { "key" => 3, "left" => "c" },
    ]
}

/// Right join input, sorted by `key`: keys 2, 3 and 4, with key 3 twice.
#[must_use]
pub fn join_right() -> Vec<Row> {
    vec![
        row! { "key" => 2, "right" => "x" },
        row! { "key" => 3, "right" => "y" },
        row! { "key" => 3, "right" => "z" },
        row! { "key" => 4, "right" => "w" },
    ]
}

/// `n` rows with an integer `id` and a pseudo-random integer `k` in `0..modulus`.
///
/// The sequence is deterministic, so tests can sort by `k` and check stability
/// through `id`.
#[must_use]
pub fn numbered_rows(n: usize, modulus: i64) -> Vec<Row> {
    let modulus = modulus.max(1);
    let mut state: u64 = 0x2545_F491_4F6C_DD1D;
    (0..n)
        .map(|i| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let k = i64::try_from(state % modulus.unsigned_abs()).unwrap_or_default();
            row! { "id" => i, "k" => k }
        })
        .collect()
}
