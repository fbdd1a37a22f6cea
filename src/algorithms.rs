//! Ready-made graphs over a stream of text documents.
//!
//! Each builder takes the name of the source to bind at run time plus the
//! column names to read and write. All branches of a graph share one arena
//! and one source node, so a single binding feeds every branch.
//! [`road_speed_graph`] reads two sources and joins them.

use crate::graph::{Graph, NO_KEYS};
use crate::ops::{
    Count, FilterPunctuation, First, Filter, Idf, InnerJoiner, LowerCase, MultiSum, Pmi, Product,
    Project, RepeatCount, SphericalLength, Speed, Split, TermFrequency, TopN, TravelTime,
};
use crate::pipeline::Pipeline;

fn words(docs: &Graph, text_column: &str) -> Graph {
    docs.map(FilterPunctuation::new(text_column))
        .map(LowerCase::new(text_column))
        .map(Split::whitespace(text_column))
}

/// Count occurrences of every word in `text_column`.
///
/// Output rows hold `text_column` and `count_column`, sorted by count, then word.
#[must_use]
pub fn word_count_graph(input: &str, text_column: &str, count_column: &str) -> Graph {
    words(&Pipeline::default().source(input), text_column)
        .sort([text_column])
        .reduce(Count::new(count_column), [text_column])
        .sort([count_column, text_column])
}

/// tf-idf of every (word, document) pair, keeping the three best documents per word.
///
/// Output rows hold `doc_column`, `text_column` and `result_column`, grouped
/// by word in word order, best score first within a word.
#[must_use]
pub fn inverted_index_graph(
    input: &str,
    doc_column: &str,
    text_column: &str,
    result_column: &str,
) -> Graph {
    let docs = Pipeline::default().source(input);
    let words = words(&docs, text_column);

    let doc_count = docs.reduce(Count::new("doc_count"), NO_KEYS);

    let idf = words
        .sort([doc_column, text_column])
        .reduce(First, [doc_column, text_column])
        .sort([text_column])
        .reduce(Count::new("word_docs"), [text_column])
        .join(InnerJoiner::new(), &doc_count, NO_KEYS)
        .map(Idf::new("doc_count", "word_docs", text_column, "idf"))
        .sort([text_column]);

    let tf = words
        .sort([doc_column])
        .reduce(TermFrequency::new(text_column, "tf"), [doc_column])
        .sort([text_column]);

    tf.join(InnerJoiner::new(), &idf, [text_column])
        .map(Product::new(["tf", "idf"], result_column))
        .map(Project::new([result_column, doc_column, text_column]))
        .sort([text_column])
        .reduce(TopN::new(result_column, 3), [text_column])
}

/// Top ten words per document by pointwise mutual information.
///
/// Only words longer than four characters that occur at least twice in a
/// document are considered. Output rows hold `doc_column`, `text_column` and
/// `result_column`, grouped by document, best score first.
#[must_use]
pub fn pmi_graph(input: &str, doc_column: &str, text_column: &str, result_column: &str) -> Graph {
    let text = text_column.to_string();
    let long_words = words(&Pipeline::default().source(input), text_column)
        .map(Filter::try_new(move |row| {
            Ok(row.require_str(&text)?.chars().count() > 4)
        }))
        .sort([doc_column, text_column])
        .reduce(RepeatCount::new("occurrences"), [doc_column, text_column])
        .map(Filter::try_new(|row| {
            Ok(row.require("occurrences")?.as_int().is_some_and(|n| n >= 2))
        }));

    let tf = long_words
        .sort([doc_column])
        .reduce(TermFrequency::new(text_column, "tf"), [doc_column])
        .sort([text_column]);

    let tf_total = long_words
        .reduce(TermFrequency::new(text_column, "tf_total"), NO_KEYS)
        .sort([text_column]);

    tf.join(InnerJoiner::new(), &tf_total, [text_column])
        .map(Pmi::new("tf", "tf_total", result_column))
        .map(Project::new([doc_column, text_column, result_column]))
        .sort([doc_column])
        .reduce(TopN::new(result_column, 10), [doc_column])
}

/// Column names read and written by [`road_speed_graph`].
#[derive(Clone, Debug)]
pub struct RoadSpeedColumns {
    pub enter_time: String,
    pub leave_time: String,
    pub edge_id: String,
    pub start: String,
    pub end: String,
    pub weekday: String,
    pub hour: String,
    pub speed: String,
}

impl Default for RoadSpeedColumns {
    fn default() -> Self {
        Self {
            enter_time: "enter_time".to_string(),
            leave_time: "leave_time".to_string(),
            edge_id: "edge_id".to_string(),
            start: "start".to_string(),
            end: "end".to_string(),
            weekday: "weekday".to_string(),
            hour: "hour".to_string(),
            speed: "speed".to_string(),
        }
    }
}

/// Average speed in km/h per weekday and hour of entering an edge.
///
/// `times` holds one row per edge traversal (edge id, enter and leave
/// timestamps); `lengths` holds one row per edge (edge id, start and end
/// coordinates). Total distance is divided by total time within each
/// (weekday, hour). Output rows hold the weekday, hour and speed columns,
/// sorted by weekday name, then hour.
#[must_use]
pub fn road_speed_graph(times: &str, lengths: &str, columns: &RoadSpeedColumns) -> Graph {
    let p = Pipeline::default();
    let edge = [columns.edge_id.as_str()];
    let slot = [columns.weekday.as_str(), columns.hour.as_str()];

    let lengths = p
        .source(lengths)
        .map(SphericalLength::new(&columns.start, &columns.end, "length"))
        .sort(edge);

    p.source(times)
        .map(TravelTime::new(
            &columns.enter_time,
            &columns.leave_time,
            "duration",
            &columns.weekday,
            &columns.hour,
        ))
        .sort(edge)
        .join(InnerJoiner::new(), &lengths, edge)
        .sort(slot)
        .reduce(MultiSum::new(["duration", "length"]), slot)
        .map(Speed::new("length", "duration", &columns.speed))
        .map(Project::new([
            columns.weekday.as_str(),
            columns.hour.as_str(),
            columns.speed.as_str(),
        ]))
        .sort(slot)
}
