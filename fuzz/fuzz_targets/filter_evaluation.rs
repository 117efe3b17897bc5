//! Fuzz target for compiled filter evaluation.
//!
//! Generates arbitrary filters, compiles them and runs them against a
//! fixed set of documents. A filter and its negation must select
//! disjoint documents that together cover the whole set.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_filter_evaluation
//! ```

#![no_main]

use arbitrary::{Arbitrary, Unstructured};
use bson::{Document, doc};
use libfuzzer_sys::fuzz_target;
use trailstore_mongodb::compile_filter;
use trailstore_mongodb::memory::matches;
use trailstore_query::Filter;

/// Keys the fixture documents use, plus one they never carry.
const KEYS: &[&str] = &["title", "tags", "size", "public", "content.location", "missing"];

/// A fuzzable leaf filter.
#[derive(Debug, Arbitrary)]
enum FuzzFilter {
    Contains(u8, String),
    Matches(u8, String),
    Eq(u8, i32),
    Gt(u8, f32),
    Gte(u8, i32),
    Lt(u8, f32),
    Lte(u8, i32),
    Is(u8, bool),
    Radius(u8, i16, i16, u16),
}

impl FuzzFilter {
    fn to_filter(self) -> Filter {
        let key = |k: u8| KEYS[k as usize % KEYS.len()];
        match self {
            // Keep patterns literal so the regex engine never rejects them
            FuzzFilter::Contains(k, s) => Filter::contains(key(k), alphanumeric(s)),
            FuzzFilter::Matches(k, s) => Filter::matches(key(k), s),
            FuzzFilter::Eq(k, v) => Filter::eq(key(k), v),
            FuzzFilter::Gt(k, v) => Filter::gt(key(k), finite(v)),
            FuzzFilter::Gte(k, v) => Filter::gte(key(k), v),
            FuzzFilter::Lt(k, v) => Filter::lt(key(k), finite(v)),
            FuzzFilter::Lte(k, v) => Filter::lte(key(k), v),
            FuzzFilter::Is(k, b) => Filter::is(key(k), b),
            FuzzFilter::Radius(k, lon, lat, km) => {
                let center = [
                    f64::from(lon) / f64::from(i16::MAX) * 180.0,
                    f64::from(lat) / f64::from(i16::MAX) * 90.0,
                ];
                Filter::radius(key(k), center, f64::from(km))
            }
        }
    }
}

fn alphanumeric(s: String) -> String {
    s.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

fn finite(v: f32) -> f64 {
    if v.is_finite() { f64::from(v) } else { 0.0 }
}

fn fixtures() -> Vec<Document> {
    vec![
        doc! {
            "title": "one",
            "tags": ["pic", "photo"],
            "size": 1,
            "public": true,
            "content": { "location": { "type": "Point", "coordinates": [13.41, 52.53] } },
        },
        doc! { "title": "two", "tags": [], "size": 2.5, "public": false },
        doc! { "title": "three", "size": "large", "public": null },
        doc! { "tags": "solo", "content": { "location": [-74.0, 40.7] } },
    ]
}

fuzz_target!(|data: &[u8]| {
    let mut unstructured = Unstructured::new(data);
    let Ok(fuzz_filter) = FuzzFilter::arbitrary(&mut unstructured) else {
        return;
    };

    let filter = fuzz_filter.to_filter();
    let positive = compile_filter(&filter).expect("a leaf compiles");
    let negative = compile_filter(&filter.clone().negated()).expect("a leaf compiles");

    for doc in fixtures() {
        let (Ok(p), Ok(n)) = (matches(&doc, &positive), matches(&doc, &negative)) else {
            continue;
        };
        assert_ne!(p, n, "{:?} and its negation agree on {}", filter, doc);
    }
});
