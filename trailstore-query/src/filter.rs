//! The filter algebra.
//!
//! A [`FilterSet`] is an ordered list of [`AnyFilter`] entries. Each entry is
//! either a leaf [`Filter`] (one typed predicate on one field) or a
//! [`ConcatenationFilter`] combining leaves under AND/OR. Entries of a set are
//! conjunctive: a document must pass every entry.
//!
//! The operation and its value are a single [`FilterOperation`] variant, so a
//! RADIUS filter can only ever carry a center and a radius. Values received on
//! the wire are validated while parsing and are never coerced.
//!
//! ```rust
//! use trailstore_query::{ConcatenationFilter, Filter, FilterSet};
//!
//! let set = FilterSet::from_json(serde_json::json!({
//!     "filterSet": [
//!         { "key": "title", "operation": "CONTAINS", "value": "berlin" },
//!         {
//!             "booleanOperation": "OR",
//!             "filters": [
//!                 { "key": "tags", "operation": "MATCHES", "value": "photo" },
//!                 { "key": "tags", "operation": "MATCHES", "negate": true, "value": "draft" }
//!             ]
//!         }
//!     ]
//! }))
//! .unwrap();
//!
//! let built = FilterSet::new()
//!     .push(Filter::contains("title", "berlin"))
//!     .push(ConcatenationFilter::or([
//!         Filter::matches("tags", "photo"),
//!         Filter::matches("tags", "draft").negated(),
//!     ]));
//!
//! assert_eq!(set, built);
//! ```

use crate::error::{QueryError, QueryResult};
use crate::path::FieldPath;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value, json};
use std::fmt;
use std::str::FromStr;

/// A `[longitude, latitude]` pair, in the order GeoJSON uses.
pub type Position = [f64; 2];

/// Numeric filter operand that keeps integer and float apart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Number {
    /// Integer operand.
    Int(i64),
    /// Floating point operand.
    Float(f64),
}

impl Number {
    /// The operand as a float.
    pub fn as_f64(&self) -> f64 {
        match self {
            Self::Int(v) => *v as f64,
            Self::Float(v) => *v,
        }
    }
}

impl From<i64> for Number {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Number {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f64> for Number {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
        }
    }
}

/// Disc on the sphere, for RADIUS filters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiusValue {
    /// Disc center.
    pub center: Position,
    /// Radius in kilometres.
    pub radius_km: f64,
}

/// Closed polygon ring, for AREA filters. The first vertex is repeated last.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaValue {
    /// Ring vertices.
    pub vertices: Vec<Position>,
}

/// Payload-free operation discriminant, as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Case-insensitive substring match.
    Contains,
    /// Exact equality.
    Matches,
    /// Numeric `==`.
    Eq,
    /// Numeric `>`.
    Gt,
    /// Numeric `>=`.
    Gte,
    /// Numeric `<`.
    Lt,
    /// Numeric `<=`.
    Lte,
    /// Boolean equality.
    Is,
    /// Point within a disc.
    Radius,
    /// Point within a polygon.
    Area,
}

impl OperationKind {
    /// All operation kinds.
    pub const ALL: [OperationKind; 10] = [
        Self::Contains,
        Self::Matches,
        Self::Eq,
        Self::Gt,
        Self::Gte,
        Self::Lt,
        Self::Lte,
        Self::Is,
        Self::Radius,
        Self::Area,
    ];

    /// Wire name of the operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contains => "CONTAINS",
            Self::Matches => "MATCHES",
            Self::Eq => "EQ",
            Self::Gt => "GT",
            Self::Gte => "GTE",
            Self::Lt => "LT",
            Self::Lte => "LTE",
            Self::Is => "IS",
            Self::Radius => "RADIUS",
            Self::Area => "AREA",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| QueryError::operation_not_supported(s))
    }
}

/// A leaf operation together with its typed operand.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOperation {
    /// Case-insensitive substring match; identifier equality on `_id`.
    Contains(String),
    /// Exact equality; identifier equality on `_id`.
    Matches(String),
    /// Numeric equality.
    Eq(Number),
    /// Numeric greater-than.
    Gt(Number),
    /// Numeric greater-or-equal.
    Gte(Number),
    /// Numeric less-than.
    Lt(Number),
    /// Numeric less-or-equal.
    Lte(Number),
    /// Boolean equality.
    Is(bool),
    /// Point within a disc.
    Radius(RadiusValue),
    /// Point within a polygon.
    Area(AreaValue),
}

impl FilterOperation {
    /// The discriminant of this operation.
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Contains(_) => OperationKind::Contains,
            Self::Matches(_) => OperationKind::Matches,
            Self::Eq(_) => OperationKind::Eq,
            Self::Gt(_) => OperationKind::Gt,
            Self::Gte(_) => OperationKind::Gte,
            Self::Lt(_) => OperationKind::Lt,
            Self::Lte(_) => OperationKind::Lte,
            Self::Is(_) => OperationKind::Is,
            Self::Radius(_) => OperationKind::Radius,
            Self::Area(_) => OperationKind::Area,
        }
    }

    /// Parse the operand for `kind` from its wire value.
    pub fn parse(key: &FieldPath, kind: OperationKind, value: &Value) -> QueryResult<Self> {
        let op = match kind {
            OperationKind::Contains => {
                let pattern = parse_string(key, kind, value)?;
                check_pattern(key, &pattern)?;
                Self::Contains(pattern)
            }
            OperationKind::Matches => Self::Matches(parse_string(key, kind, value)?),
            OperationKind::Eq => Self::Eq(parse_number(key, kind, value)?),
            OperationKind::Gt => Self::Gt(parse_number(key, kind, value)?),
            OperationKind::Gte => Self::Gte(parse_number(key, kind, value)?),
            OperationKind::Lt => Self::Lt(parse_number(key, kind, value)?),
            OperationKind::Lte => Self::Lte(parse_number(key, kind, value)?),
            OperationKind::Is => Self::Is(value.as_bool().ok_or_else(|| {
                QueryError::invalid_filter(key.as_str(), "IS expects a boolean value")
            })?),
            OperationKind::Radius => Self::Radius(parse_radius(key, value)?),
            OperationKind::Area => Self::Area(parse_area(key, value)?),
        };
        Ok(op)
    }

    /// The operand in its wire representation.
    pub fn value_json(&self) -> Value {
        match self {
            Self::Contains(s) | Self::Matches(s) => Value::String(s.clone()),
            Self::Eq(n) | Self::Gt(n) | Self::Gte(n) | Self::Lt(n) | Self::Lte(n) => match n {
                Number::Int(v) => json!(v),
                Number::Float(v) => json!(v),
            },
            Self::Is(b) => Value::Bool(*b),
            Self::Radius(r) => json!({ "center": r.center, "radius": r.radius_km }),
            Self::Area(a) => json!({ "vertices": a.vertices }),
        }
    }
}

fn parse_string(key: &FieldPath, kind: OperationKind, value: &Value) -> QueryResult<String> {
    value.as_str().map(str::to_owned).ok_or_else(|| {
        QueryError::invalid_filter(key.as_str(), format!("{} expects a string value", kind))
    })
}

/// Reject a CONTAINS value that is not a valid regular expression.
///
/// The value reaches the store as a pattern, so `(` or `*photo` would otherwise
/// fail there as a store error.
pub fn check_pattern(key: &FieldPath, pattern: &str) -> QueryResult<()> {
    regex_lite::Regex::new(pattern).map(|_| ()).map_err(|e| {
        QueryError::invalid_filter(
            key.as_str(),
            format!("CONTAINS expects a valid regular expression: {}", e),
        )
        .with_suggestion("escape regex metacharacters such as + ( [ with a backslash")
    })
}

fn parse_number(key: &FieldPath, kind: OperationKind, value: &Value) -> QueryResult<Number> {
    let invalid =
        || QueryError::invalid_filter(key.as_str(), format!("{} expects a numeric value", kind));
    let Value::Number(number) = value else {
        return Err(invalid());
    };

    if let Some(v) = number.as_i64() {
        return Ok(Number::Int(v));
    }
    match number.as_f64() {
        Some(v) if v.is_finite() => Ok(Number::Float(v)),
        _ => Err(invalid()),
    }
}

fn parse_position(key: &FieldPath, value: &Value) -> QueryResult<Position> {
    let invalid = |msg: &str| QueryError::invalid_filter(key.as_str(), msg.to_string());

    let pair = value
        .as_array()
        .ok_or_else(|| invalid("a position must be a [longitude, latitude] array"))?;
    if pair.len() != 2 {
        return Err(invalid("a position needs exactly two coordinates"));
    }

    let coord = |v: &Value| v.as_f64().filter(|c| c.is_finite());
    let (Some(lon), Some(lat)) = (coord(&pair[0]), coord(&pair[1])) else {
        return Err(invalid("coordinates must be finite numbers"));
    };
    if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
        return Err(invalid("coordinates are out of range"));
    }
    Ok([lon, lat])
}

fn parse_radius(key: &FieldPath, value: &Value) -> QueryResult<RadiusValue> {
    let obj = value.as_object().ok_or_else(|| {
        QueryError::invalid_filter(key.as_str(), "RADIUS expects { center, radius }")
    })?;

    let center = obj
        .get("center")
        .ok_or_else(|| QueryError::invalid_filter(key.as_str(), "RADIUS is missing its center"))
        .and_then(|c| parse_position(key, c))?;

    let radius_km = obj
        .get("radius")
        .or_else(|| obj.get("radiusKm"))
        .and_then(Value::as_f64)
        .ok_or_else(|| {
            QueryError::invalid_filter(key.as_str(), "RADIUS expects a numeric radius")
        })?;
    if !radius_km.is_finite() || radius_km < 0.0 {
        return Err(QueryError::invalid_filter(
            key.as_str(),
            "radius must be a non-negative number of kilometres",
        ));
    }

    Ok(RadiusValue { center, radius_km })
}

fn parse_area(key: &FieldPath, value: &Value) -> QueryResult<AreaValue> {
    let vertices = value
        .get("vertices")
        .and_then(Value::as_array)
        .ok_or_else(|| QueryError::invalid_filter(key.as_str(), "AREA expects { vertices }"))?
        .iter()
        .map(|v| parse_position(key, v))
        .collect::<QueryResult<Vec<_>>>()?;

    if vertices.len() < 4 {
        return Err(QueryError::invalid_filter(
            key.as_str(),
            "a polygon ring needs at least four vertices",
        ));
    }
    if vertices.first() != vertices.last() {
        return Err(QueryError::invalid_filter(
            key.as_str(),
            "a polygon ring must repeat its first vertex as the last",
        ));
    }

    Ok(AreaValue { vertices })
}

/// Wire shape of a leaf filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawFilter {
    key: String,
    operation: String,
    #[serde(default)]
    negate: bool,
    #[serde(default)]
    value: Value,
}

/// One typed predicate on one field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawFilter")]
pub struct Filter {
    /// Field the predicate applies to.
    pub key: FieldPath,
    /// Invert the predicate.
    pub negate: bool,
    /// Operation and operand.
    pub operation: FilterOperation,
}

impl Filter {
    /// Create a non-negated filter.
    pub fn new(key: impl Into<FieldPath>, operation: FilterOperation) -> Self {
        Self {
            key: key.into(),
            negate: false,
            operation,
        }
    }

    /// Case-insensitive substring filter.
    pub fn contains(key: impl Into<FieldPath>, value: impl Into<String>) -> Self {
        Self::new(key, FilterOperation::Contains(value.into()))
    }

    /// Exact equality filter.
    pub fn matches(key: impl Into<FieldPath>, value: impl Into<String>) -> Self {
        Self::new(key, FilterOperation::Matches(value.into()))
    }

    /// Numeric equality filter.
    pub fn eq(key: impl Into<FieldPath>, value: impl Into<Number>) -> Self {
        Self::new(key, FilterOperation::Eq(value.into()))
    }

    /// Numeric greater-than filter.
    pub fn gt(key: impl Into<FieldPath>, value: impl Into<Number>) -> Self {
        Self::new(key, FilterOperation::Gt(value.into()))
    }

    /// Numeric greater-or-equal filter.
    pub fn gte(key: impl Into<FieldPath>, value: impl Into<Number>) -> Self {
        Self::new(key, FilterOperation::Gte(value.into()))
    }

    /// Numeric less-than filter.
    pub fn lt(key: impl Into<FieldPath>, value: impl Into<Number>) -> Self {
        Self::new(key, FilterOperation::Lt(value.into()))
    }

    /// Numeric less-or-equal filter.
    pub fn lte(key: impl Into<FieldPath>, value: impl Into<Number>) -> Self {
        Self::new(key, FilterOperation::Lte(value.into()))
    }

    /// Boolean equality filter.
    pub fn is(key: impl Into<FieldPath>, value: bool) -> Self {
        Self::new(key, FilterOperation::Is(value))
    }

    /// Point-within-disc filter; `center` is `[lon, lat]`.
    pub fn radius(key: impl Into<FieldPath>, center: Position, radius_km: f64) -> Self {
        Self::new(key, FilterOperation::Radius(RadiusValue { center, radius_km }))
    }

    /// Point-within-polygon filter over a closed ring of `[lon, lat]` vertices.
    pub fn area(key: impl Into<FieldPath>, vertices: impl Into<Vec<Position>>) -> Self {
        Self::new(
            key,
            FilterOperation::Area(AreaValue {
                vertices: vertices.into(),
            }),
        )
    }

    /// Flip the negation flag.
    pub fn negated(mut self) -> Self {
        self.negate = !self.negate;
        self
    }

    /// The operation discriminant.
    pub fn kind(&self) -> OperationKind {
        self.operation.kind()
    }

    /// Parse and validate a leaf filter from JSON.
    pub fn from_json(value: Value) -> QueryResult<Self> {
        if value.get("booleanOperation").is_some() {
            return Err(QueryError::invalid_filter(
                "filters",
                "concatenations only combine leaf filters",
            ));
        }
        let raw: RawFilter = serde_json::from_value(value)
            .map_err(|e| QueryError::failed_to_parse(format!("filter: {}", e)))?;
        Self::try_from(raw)
    }
}

impl TryFrom<RawFilter> for Filter {
    type Error = QueryError;

    fn try_from(raw: RawFilter) -> Result<Self, Self::Error> {
        let kind: OperationKind = raw.operation.parse()?;
        let key = FieldPath::new(&raw.key);
        if key.is_empty() {
            return Err(QueryError::invalid_filter(raw.key, "the key must name a field"));
        }
        let operation = FilterOperation::parse(&key, kind, &raw.value)?;
        Ok(Self {
            key,
            negate: raw.negate,
            operation,
        })
    }
}

impl From<&Filter> for RawFilter {
    fn from(filter: &Filter) -> Self {
        Self {
            key: filter.key.to_string(),
            operation: filter.kind().as_str().to_string(),
            negate: filter.negate,
            value: filter.operation.value_json(),
        }
    }
}

impl Serialize for Filter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        RawFilter::from(self).serialize(serializer)
    }
}

/// Boolean combinator of a concatenation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BooleanOperation {
    /// Every filter must match.
    And,
    /// At least one filter must match.
    Or,
}

impl BooleanOperation {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

impl fmt::Display for BooleanOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BooleanOperation {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AND" => Ok(Self::And),
            "OR" => Ok(Self::Or),
            other => Err(QueryError::operation_not_supported(other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConcatenation {
    boolean_operation: String,
    #[serde(default)]
    filters: Vec<Value>,
}

/// Leaf filters combined under one boolean operator.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawConcatenation")]
pub struct ConcatenationFilter {
    /// The combinator.
    pub boolean_operation: BooleanOperation,
    /// Leaves, in evaluation order.
    pub filters: Vec<Filter>,
}

impl ConcatenationFilter {
    /// Create a concatenation.
    pub fn new(
        boolean_operation: BooleanOperation,
        filters: impl IntoIterator<Item = Filter>,
    ) -> Self {
        Self {
            boolean_operation,
            filters: filters.into_iter().collect(),
        }
    }

    /// AND over the given filters.
    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        Self::new(BooleanOperation::And, filters)
    }

    /// OR over the given filters.
    pub fn or(filters: impl IntoIterator<Item = Filter>) -> Self {
        Self::new(BooleanOperation::Or, filters)
    }

    /// Parse and validate a concatenation from JSON.
    pub fn from_json(value: Value) -> QueryResult<Self> {
        let raw: RawConcatenation = serde_json::from_value(value)
            .map_err(|e| QueryError::failed_to_parse(format!("concatenation filter: {}", e)))?;
        Self::try_from(raw)
    }
}

impl TryFrom<RawConcatenation> for ConcatenationFilter {
    type Error = QueryError;

    fn try_from(raw: RawConcatenation) -> Result<Self, Self::Error> {
        let boolean_operation: BooleanOperation = raw.boolean_operation.parse()?;
        if raw.filters.is_empty() {
            return Err(QueryError::invalid_filter(
                "filters",
                format!("{} needs at least one filter", boolean_operation),
            ));
        }
        let filters = raw
            .filters
            .into_iter()
            .map(Filter::from_json)
            .collect::<QueryResult<Vec<_>>>()?;
        Ok(Self {
            boolean_operation,
            filters,
        })
    }
}

impl Serialize for ConcatenationFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Wire<'a> {
            boolean_operation: &'static str,
            filters: &'a [Filter],
        }

        Wire {
            boolean_operation: self.boolean_operation.as_str(),
            filters: &self.filters,
        }
        .serialize(serializer)
    }
}

/// Either a leaf or a concatenation; concatenations carry `booleanOperation`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub enum AnyFilter {
    /// A leaf filter.
    Basic(Filter),
    /// A concatenation of leaves.
    Concatenation(ConcatenationFilter),
}

impl AnyFilter {
    /// Parse an entry, dispatching on the presence of `booleanOperation`.
    pub fn from_json(value: Value) -> QueryResult<Self> {
        if !value.is_object() {
            return Err(QueryError::failed_to_parse("a filter must be an object"));
        }
        if value.get("booleanOperation").is_some() {
            ConcatenationFilter::from_json(value).map(Self::Concatenation)
        } else {
            Filter::from_json(value).map(Self::Basic)
        }
    }
}

impl TryFrom<Value> for AnyFilter {
    type Error = QueryError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_json(value)
    }
}

impl Serialize for AnyFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Basic(f) => f.serialize(serializer),
            Self::Concatenation(c) => c.serialize(serializer),
        }
    }
}

impl From<Filter> for AnyFilter {
    fn from(filter: Filter) -> Self {
        Self::Basic(filter)
    }
}

impl From<ConcatenationFilter> for AnyFilter {
    fn from(filter: ConcatenationFilter) -> Self {
        Self::Concatenation(filter)
    }
}

/// Ordered, conjunctive list of filters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSet {
    /// Entries, applied in order.
    #[serde(default)]
    pub filter_set: Vec<AnyFilter>,
}

impl FilterSet {
    /// Create an empty set, which matches every document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn push(mut self, filter: impl Into<AnyFilter>) -> Self {
        self.filter_set.push(filter.into());
        self
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.filter_set.len()
    }

    /// Whether the set has no entries.
    pub fn is_empty(&self) -> bool {
        self.filter_set.is_empty()
    }

    /// Iterate over the entries.
    pub fn iter(&self) -> std::slice::Iter<'_, AnyFilter> {
        self.filter_set.iter()
    }

    /// Parse and validate a `{ "filterSet": [...] }` object.
    ///
    /// The first invalid entry fails the whole set.
    pub fn from_json(value: Value) -> QueryResult<Self> {
        let mut obj: Map<String, Value> = match value {
            Value::Object(obj) => obj,
            _ => return Err(QueryError::failed_to_parse("a filter set must be an object")),
        };
        let entries = match obj.remove("filterSet") {
            Some(Value::Array(entries)) => entries,
            Some(_) => return Err(QueryError::failed_to_parse("filterSet must be an array")),
            None => return Err(QueryError::failed_to_parse("missing field `filterSet`")),
        };

        let filter_set = entries
            .into_iter()
            .enumerate()
            .map(|(i, entry)| {
                AnyFilter::from_json(entry)
                    .map_err(|e| e.with_context(format!("parsing filterSet[{}]", i)))
            })
            .collect::<QueryResult<Vec<_>>>()?;
        Ok(Self { filter_set })
    }

    /// Parse a filter set from a JSON string.
    pub fn from_json_str(s: &str) -> QueryResult<Self> {
        let value: Value = serde_json::from_str(s)
            .map_err(|e| QueryError::failed_to_parse(format!("filter set JSON: {}", e)))?;
        Self::from_json(value)
    }
}

impl FromIterator<AnyFilter> for FilterSet {
    fn from_iter<I: IntoIterator<Item = AnyFilter>>(iter: I) -> Self {
        Self {
            filter_set: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a FilterSet {
    type Item = &'a AnyFilter;
    type IntoIter = std::slice::Iter<'a, AnyFilter>;

    fn into_iter(self) -> Self::IntoIter {
        self.filter_set.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use pretty_assertions::assert_eq;

    // ========== Leaf Parsing Tests ==========

    #[test]
    fn test_parse_contains_rejects_bad_pattern() {
        for pattern in ["(", "[a-", "*photo"] {
            let err = Filter::from_json(json!({
                "key": "tags",
                "operation": "CONTAINS",
                "value": pattern
            }))
            .unwrap_err();
            assert_eq!(err.code, ErrorCode::InvalidFilter, "{}", pattern);
            assert_eq!(err.http_status(), 400);
        }

        let escaped = Filter::from_json(json!({
            "key": "tags",
            "operation": "CONTAINS",
            "value": "c\\+\\+"
        }))
        .unwrap();
        assert_eq!(escaped.operation, FilterOperation::Contains("c\\+\\+".into()));
    }

    #[test]
    fn test_parse_contains() {
        let filter = Filter::from_json(json!({
            "key": "tags",
            "operation": "CONTAINS",
            "value": "photo"
        }))
        .unwrap();

        assert_eq!(filter, Filter::contains("tags", "photo"));
        assert!(!filter.negate);
    }

    #[test]
    fn test_parse_numbers_keep_integers() {
        let int = Filter::from_json(json!({ "key": "size", "operation": "GT", "value": 3 })).unwrap();
        assert_eq!(int.operation, FilterOperation::Gt(Number::Int(3)));

        let float =
            Filter::from_json(json!({ "key": "size", "operation": "LTE", "value": 2.5 })).unwrap();
        assert_eq!(float.operation, FilterOperation::Lte(Number::Float(2.5)));
    }

    #[test]
    fn test_parse_radius_accepts_alias() {
        let a = Filter::from_json(json!({
            "key": "content.location",
            "operation": "RADIUS",
            "value": { "center": [13.418964, 52.530173], "radius": 10 }
        }))
        .unwrap();
        let b = Filter::from_json(json!({
            "key": "content.location",
            "operation": "RADIUS",
            "value": { "center": [13.418964, 52.530173], "radiusKm": 10 }
        }))
        .unwrap();

        assert_eq!(a, b);
        assert_eq!(a, Filter::radius("content.location", [13.418964, 52.530173], 10.0));
    }

    #[test]
    fn test_parse_bracketed_key() {
        let filter =
            Filter::from_json(json!({ "key": "content.data[0].name", "operation": "MATCHES", "value": "x" }))
                .unwrap();
        assert_eq!(filter.key.as_str(), "content.data.0.name");
    }

    // ========== Validation Tests ==========

    #[test]
    fn test_unknown_operation() {
        let err = Filter::from_json(json!({ "key": "a", "operation": "BETWEEN", "value": 1 }))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::OperationNotSupported);
    }

    #[test]
    fn test_value_shape_mismatch_is_not_coerced() {
        let cases = [
            json!({ "key": "a", "operation": "CONTAINS", "value": 5 }),
            json!({ "key": "a", "operation": "EQ", "value": "5" }),
            json!({ "key": "a", "operation": "IS", "value": "true" }),
            json!({ "key": "a", "operation": "RADIUS", "value": { "center": [1.0], "radius": 1 } }),
            json!({ "key": "a", "operation": "RADIUS", "value": { "center": [1.0, 2.0], "radius": -1 } }),
            json!({ "key": "a", "operation": "RADIUS", "value": { "center": [1.0, 200.0], "radius": 1 } }),
        ];

        for case in cases {
            let err = Filter::from_json(case.clone()).unwrap_err();
            assert_eq!(err.code, ErrorCode::InvalidFilter, "{}", case);
        }
    }

    #[test]
    fn test_area_ring_must_be_closed() {
        let open = json!({
            "key": "loc",
            "operation": "AREA",
            "value": { "vertices": [[0, 0], [1, 0], [1, 1], [0, 1]] }
        });
        assert_eq!(Filter::from_json(open).unwrap_err().code, ErrorCode::InvalidFilter);

        let short = json!({
            "key": "loc",
            "operation": "AREA",
            "value": { "vertices": [[0, 0], [1, 0], [0, 0]] }
        });
        assert_eq!(Filter::from_json(short).unwrap_err().code, ErrorCode::InvalidFilter);

        let closed = json!({
            "key": "loc",
            "operation": "AREA",
            "value": { "vertices": [[0, 0], [1, 0], [1, 1], [0, 0]] }
        });
        assert!(Filter::from_json(closed).is_ok());
    }

    #[test]
    fn test_missing_key_fails_to_parse() {
        let err = Filter::from_json(json!({ "operation": "IS", "value": true })).unwrap_err();
        assert_eq!(err.code, ErrorCode::FailedToParse);
    }

    // ========== Concatenation Tests ==========

    #[test]
    fn test_unknown_boolean_operation() {
        let err = AnyFilter::from_json(json!({
            "booleanOperation": "XOR",
            "filters": [{ "key": "a", "operation": "IS", "value": true }]
        }))
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::OperationNotSupported);
    }

    #[test]
    fn test_nested_concatenation_rejected() {
        let err = ConcatenationFilter::from_json(json!({
            "booleanOperation": "AND",
            "filters": [{ "booleanOperation": "OR", "filters": [] }]
        }))
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFilter);
    }

    #[test]
    fn test_any_filter_dispatch() {
        let leaf = AnyFilter::from_json(json!({ "key": "a", "operation": "IS", "value": false }))
            .unwrap();
        assert!(matches!(leaf, AnyFilter::Basic(_)));

        let concat = AnyFilter::from_json(json!({
            "booleanOperation": "AND",
            "filters": [{ "key": "a", "operation": "IS", "value": false }]
        }))
        .unwrap();
        assert!(matches!(concat, AnyFilter::Concatenation(_)));
    }

    // ========== Filter Set Tests ==========

    #[test]
    fn test_filter_set_reports_entry() {
        let err = FilterSet::from_json(json!({
            "filterSet": [
                { "key": "a", "operation": "IS", "value": true },
                { "key": "b", "operation": "NEAR", "value": 1 }
            ]
        }))
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::OperationNotSupported);
        assert_eq!(err.context.operation.as_deref(), Some("parsing filterSet[1]"));
    }

    #[test]
    fn test_filter_set_malformed_json() {
        assert_eq!(
            FilterSet::from_json_str("{ filterSet: ").unwrap_err().code,
            ErrorCode::FailedToParse
        );
        assert_eq!(
            FilterSet::from_json(json!([])).unwrap_err().code,
            ErrorCode::FailedToParse
        );
    }

    #[test]
    fn test_wire_roundtrip_through_serde() {
        let set = FilterSet::new()
            .push(Filter::area(
                "content.location",
                vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]],
            ))
            .push(ConcatenationFilter::and([
                Filter::contains("tags", "photo"),
                Filter::contains("tags", "test").negated(),
            ]));

        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json["filterSet"][1]["booleanOperation"], "AND");
        assert_eq!(json["filterSet"][1]["filters"][1]["negate"], true);

        let back: FilterSet = serde_json::from_value(json).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn test_negated_toggles() {
        let f = Filter::is("visible", true).negated();
        assert!(f.negate);
        assert!(!f.negated().negate);
    }
}
