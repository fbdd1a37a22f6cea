//! Sort-merge joiners.
//!
//! For a key present on both sides every joiner emits the cross product of
//! the two groups, left row by left row, so only the right group is held in
//! memory. Each output row holds the left row's columns followed by
//! the right row's. A non-key column present on both sides is renamed with
//! the left suffix (default `_1`) in the left copy and the right suffix
//! (default `_2`) in the right copy. A key present on one side only is
//! emitted as that side's rows unchanged, when the mode keeps it.

use crate::error::{PipelineError, Result};
use crate::group::LeftGroup;
use crate::operators::{JoinMode, Joiner, Rows, no_rows};
use crate::row::GroupKey;
use crate::Row;
use std::sync::Arc;

#[derive(Clone, Debug)]
struct Suffixes {
    left: String,
    right: String,
}

impl Default for Suffixes {
    fn default() -> Self {
        Self {
            left: "_1".to_string(),
            right: "_2".to_string(),
        }
    }
}

fn merge_pair(keys: &[String], left: &Row, right: &Row, suffixes: &Suffixes) -> Row {
    let collides = |column: &str, other: &Row| {
        other.contains(column) && !keys.iter().any(|k| k == column)
    };
    let mut out = Row::with_capacity(left.len() + right.len());
    for (column, value) in left.iter() {
        if collides(column, right) {
            out.insert(format!("{column}{}", suffixes.left), value.clone());
        } else {
            out.insert(column, value.clone());
        }
    }
    for (column, value) in right.iter() {
        if collides(column, left) {
            out.insert(format!("{column}{}", suffixes.right), value.clone());
        } else {
            out.insert(column, value.clone());
        }
    }
    out
}

/// Lazy cross product of the streamed left group with the buffered right one.
fn cross(key: &GroupKey<'_>, left: LeftGroup, right: Arc<[Row]>, suffixes: &Suffixes) -> Rows {
    let keys: Arc<[String]> = key.columns.into();
    let suffixes = Arc::new(suffixes.clone());
    Box::new(left.flat_map(move |l| {
        let (keys, right, suffixes) = (Arc::clone(&keys), Arc::clone(&right), Arc::clone(&suffixes));
        (0..right.len())
            .map(move |i| Ok::<_, PipelineError>(merge_pair(&keys, &l, &right[i], &suffixes)))
    }))
}

fn join_by_mode(
    mode: JoinMode,
    key: &GroupKey<'_>,
    left: LeftGroup,
    right: Arc<[Row]>,
    suffixes: &Suffixes,
) -> Rows {
    match (left.is_absent(), right.is_empty()) {
        (false, false) => cross(key, left, right, suffixes),
        (false, true) if mode.keeps_left() => Box::new(left.map(Ok)),
        (true, false) if mode.keeps_right() => {
            Box::new((0..right.len()).map(move |i| Ok(right[i].clone())))
        }
        _ => no_rows(),
    }
}

macro_rules! joiner {
    ($(#[$doc:meta])* $name:ident, $mode:expr) => {
        $(#[$doc])*
        #[derive(Clone, Debug, Default)]
        pub struct $name {
            suffixes: Suffixes,
        }

        impl $name {
            #[must_use]
            pub fn new() -> Self {
                Self::default()
            }

            /// Suffixes appended to colliding non-key columns from the left and right rows.
            #[must_use]
            pub fn with_suffixes(left: impl Into<String>, right: impl Into<String>) -> Self {
                Self {
                    suffixes: Suffixes {
                        left: left.into(),
                        right: right.into(),
                    },
                }
            }
        }

        impl Joiner for $name {
            fn mode(&self) -> JoinMode {
                $mode
            }

            fn join(&self, key: &GroupKey<'_>, left: LeftGroup, right: Arc<[Row]>) -> Result<Rows> {
                Ok(join_by_mode($mode, key, left, right, &self.suffixes))
            }
        }
    };
}

joiner!(
    /// Keys present on both sides.
    InnerJoiner,
    JoinMode::Inner
);
joiner!(
    /// Every left key; unmatched left rows pass through.
    LeftJoiner,
    JoinMode::Left
);
joiner!(
    /// Every right key; unmatched right rows pass through.
    RightJoiner,
    JoinMode::Right
);
joiner!(
    /// Every key from either side.
    OuterJoiner,
    JoinMode::Outer
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Value, row};

    #[test]
    fn colliding_columns_get_suffixes() {
        let keys = vec!["id".to_string()];
        let merged = merge_pair(
            &keys,
            &row! { "id" => 1, "score" => 10, "a" => "x" },
            &row! { "id" => 1, "score" => 20, "b" => "y" },
            &Suffixes::default(),
        );
        assert_eq!(
            merged,
            row! { "id" => 1, "score_1" => 10, "a" => "x", "score_2" => 20, "b" => "y" }
        );
        assert_eq!(merged.get("score"), None::<&Value>);
    }
}
