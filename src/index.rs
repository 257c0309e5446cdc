//! The content index: per-type buckets of date-named entries, kept sorted
//! newest-first and rendered as flat string maps for template consumption.

use std::collections::BTreeMap;

use serde_yaml::Value;

/// A flattened view of one indexable source file: its bucket type, sort key,
/// date components, display title, and page URL. All fields are strings;
/// sort keys compare lexicographically, which orders correctly because
/// derived keys carry zero-padded dates.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IndexTuple {
    pub kind: String,
    pub sort_key: String,
    pub year: String,
    pub month: String,
    pub day: String,
    pub title: String,
    pub url: String,
}

impl IndexTuple {
    /// Compiles the tuple down to a flat string map. `title` is omitted when
    /// empty so templates can test for its presence.
    pub fn render(&self) -> BTreeMap<String, String> {
        let mut entry = BTreeMap::new();
        entry.insert("type".to_owned(), self.kind.clone());
        entry.insert("sortkey".to_owned(), self.sort_key.clone());
        entry.insert("year".to_owned(), self.year.clone());
        entry.insert("month".to_owned(), self.month.clone());
        entry.insert("day".to_owned(), self.day.clone());
        entry.insert("url".to_owned(), self.url.clone());
        if !self.title.is_empty() {
            entry.insert("title".to_owned(), self.title.clone());
        }
        entry
    }
}

/// Buckets of [`IndexTuple`]s keyed by type. Each bucket re-sorts on every
/// contribution, so a bucket is never observed unsorted.
#[derive(Debug, Default)]
pub struct Index {
    buckets: BTreeMap<String, Vec<IndexTuple>>,
}

impl Index {
    pub fn new() -> Index {
        Index::default()
    }

    /// Appends `tuple` to the bucket named by its type, creating the bucket
    /// if needed, and re-sorts that bucket descending by sort key.
    pub fn contribute(&mut self, tuple: IndexTuple) {
        let bucket = self.buckets.entry(tuple.kind.clone()).or_default();
        bucket.push(tuple);
        bucket.sort_by(|a, b| b.sort_key.cmp(&a.sort_key));
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// The sorted entries of one bucket, newest-first.
    pub fn bucket(&self, kind: &str) -> Option<&[IndexTuple]> {
        self.buckets.get(kind).map(Vec::as_slice)
    }

    /// Renders the first `n` entries of every bucket as flat string maps.
    /// Pass [`crate::stack::UNBOUNDED`] for every entry.
    pub fn render(&self, n: usize) -> BTreeMap<String, Vec<BTreeMap<String, String>>> {
        self.buckets
            .iter()
            .map(|(kind, tuples)| {
                (
                    kind.clone(),
                    tuples.iter().take(n).map(IndexTuple::render).collect(),
                )
            })
            .collect()
    }

    /// [`Index::render`] as a metadata value, ready to merge into a page's
    /// context under the index key.
    pub fn render_value(&self, n: usize) -> Value {
        let mut buckets = serde_yaml::Mapping::new();
        for (kind, entries) in self.render(n) {
            let entries = entries
                .into_iter()
                .map(|entry| {
                    let mut mapping = serde_yaml::Mapping::new();
                    for (key, value) in entry {
                        mapping.insert(Value::String(key), Value::String(value));
                    }
                    Value::Mapping(mapping)
                })
                .collect();
            buckets.insert(Value::String(kind), Value::Sequence(entries));
        }
        Value::Mapping(buckets)
    }
}
