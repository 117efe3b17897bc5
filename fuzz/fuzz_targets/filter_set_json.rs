//! Fuzz target for filter set parsing.
//!
//! Feeds arbitrary JSON to the filter set parser. Whatever parses must
//! also compile and survive a serialize/parse round trip.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_filter_set_json
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;
use trailstore_mongodb::Projection;
use trailstore_mongodb::pipeline::build_pipeline;
use trailstore_query::{FilterSet, Pagination};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    // The parser should never panic, only return errors
    let Ok(filter_set) = FilterSet::from_json_str(input) else {
        return;
    };

    build_pipeline(&filter_set, &Pagination::default(), Projection::Full)
        .expect("a parsed filter set compiles");

    let json = serde_json::to_value(&filter_set).expect("a filter set serializes");
    let reparsed = FilterSet::from_json(json).expect("serialized output parses");
    assert_eq!(reparsed.len(), filter_set.len());
});
