//! Compilation of the filter algebra into MongoDB query documents.
//!
//! Every leaf compiles to one field-keyed fragment, `{ key: predicate }`.
//! Concatenations compile to `{ "$and" | "$or": [fragment, ...] }` with the
//! leaves in input order.
//!
//! | Operation | Fragment | Negated |
//! |---|---|---|
//! | CONTAINS | `{k: {$regex: v, $options: "i"}}` | `{k: {$not: {...}}}` |
//! | MATCHES | `{k: v}` | `{k: {$ne: v}}` |
//! | CONTAINS / MATCHES on `_id` | `{_id: id}` | `{_id: {$ne: id}}` |
//! | EQ, GT, GTE, LT, LTE | `{k: {$op: n}}` | `{k: {$not: {$op: n}}}` |
//! | IS | `{k: {$eq: b}}` | `{k: {$not: {$eq: b}}}` |
//! | RADIUS | `{k: {$geoWithin: {$centerSphere: [[lon, lat], km / 6378.1]}}}` | `$not` |
//! | AREA | `{k: {$geoWithin: {$geometry: {type: "Polygon", ...}}}}` | `$not` |
//!
//! ```rust
//! use bson::doc;
//! use trailstore_mongodb::filter::compile_filter;
//! use trailstore_query::Filter;
//!
//! let fragment = compile_filter(&Filter::contains("tags", "photo").negated()).unwrap();
//! assert_eq!(
//!     fragment,
//!     doc! { "tags": { "$not": { "$regex": "photo", "$options": "i" } } }
//! );
//! ```

use bson::{Bson, Document, doc, oid::ObjectId};
use tracing::debug;
use trailstore_query::{
    AnyFilter, BooleanOperation, ConcatenationFilter, FieldPath, Filter, FilterOperation,
    Number, QueryResult, check_pattern,
};

/// Predicate builders, one per operation family.
///
/// Each takes the already-typed operand and returns the field-keyed fragment.
pub mod predicates {
    use super::*;
    use crate::document::identifier_value;
    use trailstore_query::{AreaValue, RadiusValue};

    /// Mean equatorial radius of the Earth, used to turn kilometres into radians.
    pub const EARTH_RADIUS_KM: f64 = 6378.1;

    fn keyed(key: &FieldPath, predicate: impl Into<Bson>) -> Document {
        let mut fragment = Document::new();
        fragment.insert(key.as_str(), predicate.into());
        fragment
    }

    /// Wrap `predicate` in `$not` when negated.
    fn negatable(key: &FieldPath, predicate: Document, negate: bool) -> Document {
        if negate {
            keyed(key, doc! { "$not": predicate })
        } else {
            keyed(key, predicate)
        }
    }

    /// Case-insensitive substring match.
    pub fn contains(key: &FieldPath, value: &str, negate: bool) -> Document {
        negatable(key, doc! { "$regex": value, "$options": "i" }, negate)
    }

    /// Exact equality; negation is `$ne`.
    pub fn matches(key: &FieldPath, value: &str, negate: bool) -> Document {
        if negate {
            keyed(key, doc! { "$ne": value })
        } else {
            keyed(key, value)
        }
    }

    /// Equality on the document identifier; negation is `$ne`.
    pub fn identifier(value: &str, negate: bool) -> Document {
        let id = identifier_value(value);
        if negate {
            doc! { "_id": { "$ne": id } }
        } else {
            doc! { "_id": id }
        }
    }

    /// Numeric comparison with operator `op` (`$eq`, `$gt`, ...).
    pub fn number(key: &FieldPath, op: &str, value: Number, negate: bool) -> Document {
        let value = match value {
            Number::Int(v) => Bson::Int64(v),
            Number::Float(v) => Bson::Double(v),
        };
        let mut predicate = Document::new();
        predicate.insert(op, value);
        negatable(key, predicate, negate)
    }

    /// Boolean equality.
    pub fn boolean(key: &FieldPath, value: bool, negate: bool) -> Document {
        negatable(key, doc! { "$eq": value }, negate)
    }

    /// Point within a spherical cap.
    pub fn radius(key: &FieldPath, value: &RadiusValue, negate: bool) -> Document {
        let [lon, lat] = value.center;
        negatable(
            key,
            doc! {
                "$geoWithin": {
                    "$centerSphere": [[lon, lat], value.radius_km / EARTH_RADIUS_KM]
                }
            },
            negate,
        )
    }

    /// Point within a polygon.
    pub fn area(key: &FieldPath, value: &AreaValue, negate: bool) -> Document {
        let ring: Vec<Bson> = value
            .vertices
            .iter()
            .map(|[lon, lat]| Bson::Array(vec![Bson::Double(*lon), Bson::Double(*lat)]))
            .collect();
        negatable(
            key,
            doc! {
                "$geoWithin": {
                    "$geometry": { "type": "Polygon", "coordinates": [ring] }
                }
            },
            negate,
        )
    }
}

/// Compile one leaf filter.
///
/// String operations on `_id` compile to identifier equality instead of a
/// substring or string match. A CONTAINS value that is not a valid pattern
/// fails with `InvalidFilter`.
pub fn compile_filter(filter: &Filter) -> QueryResult<Document> {
    let key = &filter.key;
    let negate = filter.negate;

    let fragment = match &filter.operation {
        FilterOperation::Contains(v) | FilterOperation::Matches(v) if key.is_identifier() => {
            predicates::identifier(v, negate)
        }
        FilterOperation::Contains(v) => {
            check_pattern(key, v)?;
            predicates::contains(key, v, negate)
        }
        FilterOperation::Matches(v) => predicates::matches(key, v, negate),
        FilterOperation::Eq(n) => predicates::number(key, "$eq", *n, negate),
        FilterOperation::Gt(n) => predicates::number(key, "$gt", *n, negate),
        FilterOperation::Gte(n) => predicates::number(key, "$gte", *n, negate),
        FilterOperation::Lt(n) => predicates::number(key, "$lt", *n, negate),
        FilterOperation::Lte(n) => predicates::number(key, "$lte", *n, negate),
        FilterOperation::Is(b) => predicates::boolean(key, *b, negate),
        FilterOperation::Radius(r) => predicates::radius(key, r, negate),
        FilterOperation::Area(a) => predicates::area(key, a, negate),
    };

    debug!(key = %key, operation = %filter.kind(), negate, "Compiled filter");
    Ok(fragment)
}

/// The query operator for a boolean combinator.
pub fn boolean_operator(op: BooleanOperation) -> &'static str {
    match op {
        BooleanOperation::And => "$and",
        BooleanOperation::Or => "$or",
    }
}

/// Compile a concatenation into one combinator fragment.
pub fn compile_concatenation(filter: &ConcatenationFilter) -> QueryResult<Document> {
    let fragments = filter
        .filters
        .iter()
        .map(|f| compile_filter(f).map(Bson::Document))
        .collect::<QueryResult<Vec<_>>>()?;

    debug!(
        operation = %filter.boolean_operation,
        filters = fragments.len(),
        "Compiled concatenation"
    );

    let mut combined = Document::new();
    combined.insert(boolean_operator(filter.boolean_operation), fragments);
    Ok(combined)
}

/// Compile either kind of filter-set entry.
pub fn compile_any(filter: &AnyFilter) -> QueryResult<Document> {
    match filter {
        AnyFilter::Basic(f) => compile_filter(f),
        AnyFilter::Concatenation(c) => compile_concatenation(c),
    }
}

/// Match a single document by identifier.
pub fn by_id(id: ObjectId) -> Document {
    doc! { "_id": id }
}

/// Match any of the given identifiers.
pub fn by_ids(ids: &[ObjectId]) -> Document {
    doc! { "_id": { "$in": ids.iter().copied().map(Bson::ObjectId).collect::<Vec<_>>() } }
}

/// Match every document.
pub fn all() -> Document {
    Document::new()
}
