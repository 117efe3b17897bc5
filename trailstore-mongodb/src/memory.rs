//! In-process [`DocumentCollection`].
//!
//! Evaluates the query operators and pipeline stages that the filter
//! compiler and the entity services emit, with MongoDB semantics:
//!
//! - field paths fan out over arrays, so `{tags: "photo"}` matches a
//!   document whose `tags` array contains `"photo"`
//! - `$ne` and `$not` match documents where the field is missing
//! - `$geoWithin` accepts GeoJSON points and legacy `[lon, lat]` pairs;
//!   `$centerSphere` uses great-circle distance and polygons use even-odd
//!   ray casting, both including their boundary
//!
//! Anything outside that subset is rejected with a query error rather than
//! silently matching.

use std::cmp::Ordering;

use async_trait::async_trait;
use bson::{Bson, Document, oid::ObjectId};
use parking_lot::RwLock;
use regex_lite::{Regex, RegexBuilder};
use tracing::debug;
use trailstore_query::FieldPath;

use crate::document::{DocumentExt, bson_as_f64};
use crate::error::{MongoError, MongoResult};
use crate::store::DocumentCollection;

/// Maximum nesting depth of `$and`/`$or`/`$not` expressions.
const MAX_EXPRESSION_DEPTH: usize = 32;

/// Collection held in memory, in insertion order.
#[derive(Debug, Default)]
pub struct MemoryCollection {
    name: String,
    documents: RwLock<Vec<Document>>,
}

impl MemoryCollection {
    /// Create an empty collection.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            documents: RwLock::new(Vec::new()),
        }
    }

    /// Create a collection holding `documents`. Documents without `_id` get one.
    pub fn with_documents(name: impl Into<String>, documents: impl IntoIterator<Item = Document>) -> Self {
        let documents = documents.into_iter().map(with_id).map(|(doc, _)| doc).collect();
        Self {
            name: name.into(),
            documents: RwLock::new(documents),
        }
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    /// Copy of every stored document.
    pub fn snapshot(&self) -> Vec<Document> {
        self.documents.read().clone()
    }
}

fn with_id(mut doc: Document) -> (Document, Bson) {
    let id = match doc.get("_id") {
        Some(id) => id.clone(),
        None => {
            let id = Bson::ObjectId(ObjectId::new());
            // keep _id first, as the server does
            let mut with_id = Document::new();
            with_id.insert("_id", id.clone());
            for (key, value) in std::mem::take(&mut doc) {
                with_id.insert(key, value);
            }
            doc = with_id;
            id
        }
    };
    (doc, id)
}

#[async_trait]
impl DocumentCollection for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn aggregate(&self, pipeline: Vec<Document>) -> MongoResult<Vec<Document>> {
        let documents = self.snapshot();
        debug!(collection = %self.name, stages = pipeline.len(), "Running in-memory aggregation");
        run_pipeline(documents, &pipeline)
    }

    async fn find(&self, filter: Document) -> MongoResult<Vec<Document>> {
        let documents = self.documents.read();
        let mut found = Vec::new();
        for doc in documents.iter() {
            if matches(doc, &filter)? {
                found.push(doc.clone());
            }
        }
        Ok(found)
    }

    async fn find_one(&self, filter: Document) -> MongoResult<Option<Document>> {
        let documents = self.documents.read();
        for doc in documents.iter() {
            if matches(doc, &filter)? {
                return Ok(Some(doc.clone()));
            }
        }
        Ok(None)
    }

    async fn insert_one(&self, document: Document) -> MongoResult<ObjectId> {
        let (document, id) = with_id(document);
        let oid = id
            .as_object_id()
            .ok_or_else(|| MongoError::Internal("inserted _id is not an ObjectId".to_string()))?;

        let mut documents = self.documents.write();
        if documents.iter().any(|d| d.get("_id") == Some(&id)) {
            return Err(MongoError::query(format!(
                "duplicate key: _id {} already exists in {}",
                oid, self.name
            )));
        }
        documents.push(document);
        Ok(oid)
    }

    async fn find_one_and_update(
        &self,
        filter: Document,
        update: Document,
    ) -> MongoResult<Option<Document>> {
        let mut documents = self.documents.write();
        for doc in documents.iter_mut() {
            if matches(doc, &filter)? {
                let mut updated = doc.clone();
                apply_update(&mut updated, &update)?;
                *doc = updated.clone();
                return Ok(Some(updated));
            }
        }
        Ok(None)
    }

    async fn find_one_and_delete(&self, filter: Document) -> MongoResult<Option<Document>> {
        let mut documents = self.documents.write();
        for i in 0..documents.len() {
            if matches(&documents[i], &filter)? {
                return Ok(Some(documents.remove(i)));
            }
        }
        Ok(None)
    }

    async fn delete_many(&self, filter: Document) -> MongoResult<u64> {
        let mut documents = self.documents.write();
        let mut doomed = Vec::with_capacity(documents.len());
        for doc in documents.iter() {
            doomed.push(matches(doc, &filter)?);
        }

        let before = documents.len();
        let mut doomed = doomed.into_iter();
        documents.retain(|_| !doomed.next().unwrap_or(false));
        Ok((before - documents.len()) as u64)
    }
}

// ============== Pipeline ==============

/// Run pipeline stages over `documents`.
pub fn run_pipeline(mut documents: Vec<Document>, pipeline: &[Document]) -> MongoResult<Vec<Document>> {
    for stage in pipeline {
        let Some((name, arg)) = single_entry(stage) else {
            return Err(MongoError::query(
                "a pipeline stage must have exactly one field",
            ));
        };

        documents = match name {
            "$match" => {
                let filter = as_document(arg, "$match")?;
                let mut kept = Vec::with_capacity(documents.len());
                for doc in documents {
                    if matches(&doc, filter)? {
                        kept.push(doc);
                    }
                }
                kept
            }
            "$skip" => {
                let n = non_negative(arg, "$skip")?;
                documents.into_iter().skip(n).collect()
            }
            "$limit" => {
                let n = non_negative(arg, "$limit")?;
                if n == 0 {
                    return Err(MongoError::query("the limit must be positive"));
                }
                documents.into_iter().take(n).collect()
            }
            "$unset" => {
                let paths = unset_paths(arg)?;
                for doc in &mut documents {
                    for path in &paths {
                        doc.remove_path(path);
                    }
                }
                documents
            }
            "$count" => {
                let field = arg
                    .as_str()
                    .filter(|f| !f.is_empty() && !f.starts_with('$'))
                    .ok_or_else(|| MongoError::query("$count expects a field name"))?;
                if documents.is_empty() {
                    Vec::new()
                } else {
                    let mut count = Document::new();
                    count.insert(field, documents.len() as i32);
                    vec![count]
                }
            }
            other => {
                return Err(MongoError::query(format!(
                    "unsupported pipeline stage {}",
                    other
                )));
            }
        };
    }
    Ok(documents)
}

fn single_entry(doc: &Document) -> Option<(&str, &Bson)> {
    let mut iter = doc.iter();
    let (k, v) = iter.next()?;
    iter.next().is_none().then_some((k.as_str(), v))
}

fn as_document<'a>(value: &'a Bson, ctx: &str) -> MongoResult<&'a Document> {
    value
        .as_document()
        .ok_or_else(|| MongoError::query(format!("{} expects a document", ctx)))
}

fn non_negative(value: &Bson, ctx: &str) -> MongoResult<usize> {
    match bson_as_f64(value) {
        Some(n) if n >= 0.0 && n.fract() == 0.0 => Ok(n as usize),
        _ => Err(MongoError::query(format!(
            "{} expects a non-negative integer",
            ctx
        ))),
    }
}

fn unset_paths(value: &Bson) -> MongoResult<Vec<FieldPath>> {
    match value {
        Bson::String(path) => Ok(vec![FieldPath::new(path)]),
        Bson::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(FieldPath::new)
                    .ok_or_else(|| MongoError::query("$unset expects field names"))
            })
            .collect(),
        _ => Err(MongoError::query("$unset expects a field name or a list of them")),
    }
}

// ============== Updates ==============

fn apply_update(doc: &mut Document, update: &Document) -> MongoResult<()> {
    for (op, arg) in update {
        let fields = as_document(arg, op)?;
        match op.as_str() {
            "$set" => {
                for (path, value) in fields {
                    let path = FieldPath::new(path);
                    if path.is_identifier() {
                        return Err(MongoError::query("the _id field is immutable"));
                    }
                    doc.set_path(&path, value.clone())?;
                }
            }
            "$unset" => {
                for (path, _) in fields {
                    doc.remove_path(&FieldPath::new(path));
                }
            }
            other => {
                return Err(MongoError::query(format!(
                    "unsupported update operator {}",
                    other
                )));
            }
        }
    }
    Ok(())
}

// ============== Matching ==============

/// Whether `doc` satisfies the query `filter`.
pub fn matches(doc: &Document, filter: &Document) -> MongoResult<bool> {
    matches_at(doc, filter, 0)
}

fn matches_at(doc: &Document, filter: &Document, depth: usize) -> MongoResult<bool> {
    if depth > MAX_EXPRESSION_DEPTH {
        return Err(MongoError::query(format!(
            "expression depth exceeds maximum of {}",
            MAX_EXPRESSION_DEPTH
        )));
    }

    for (key, condition) in filter {
        let ok = match key.as_str() {
            "$and" => {
                let mut all = true;
                for clause in clauses(condition, "$and")? {
                    if !matches_at(doc, clause, depth + 1)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            "$or" => {
                let mut any = false;
                for clause in clauses(condition, "$or")? {
                    if matches_at(doc, clause, depth + 1)? {
                        any = true;
                        break;
                    }
                }
                any
            }
            op if op.starts_with('$') => {
                return Err(MongoError::query(format!(
                    "unsupported top-level operator {}",
                    op
                )));
            }
            field => {
                let values = resolve(doc, &FieldPath::new(field));
                field_matches(&values, condition, depth)?
            }
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn clauses<'a>(value: &'a Bson, op: &str) -> MongoResult<Vec<&'a Document>> {
    let items = value
        .as_array()
        .filter(|items| !items.is_empty())
        .ok_or_else(|| MongoError::query(format!("{} expects a non-empty array", op)))?;
    items.iter().map(|item| as_document(item, op)).collect()
}

/// Every value `path` reaches, descending into arrays along the way.
/// An array at the end of the path contributes itself and its elements.
fn resolve<'a>(doc: &'a Document, path: &FieldPath) -> Vec<&'a Bson> {
    let segments: Vec<&str> = path.segments().collect();
    let mut out = Vec::new();
    if let Some((first, rest)) = segments.split_first() {
        if let Some(value) = doc.get(*first) {
            collect(value, rest, &mut out);
        }
    }
    out
}

fn collect<'a>(value: &'a Bson, segments: &[&str], out: &mut Vec<&'a Bson>) {
    let Some((segment, rest)) = segments.split_first() else {
        out.push(value);
        if let Bson::Array(items) = value {
            out.extend(items.iter());
        }
        return;
    };

    match value {
        Bson::Document(doc) => {
            if let Some(next) = doc.get(*segment) {
                collect(next, rest, out);
            }
        }
        Bson::Array(items) => {
            if let Ok(index) = segment.parse::<usize>() {
                if let Some(next) = items.get(index) {
                    collect(next, rest, out);
                }
            }
            for item in items {
                if let Bson::Document(_) = item {
                    collect(item, segments, out);
                }
            }
        }
        _ => {}
    }
}

fn operator_document(value: &Bson) -> Option<&Document> {
    value
        .as_document()
        .filter(|doc| doc.keys().next().is_some_and(|k| k.starts_with('$')))
}

fn field_matches(values: &[&Bson], condition: &Bson, depth: usize) -> MongoResult<bool> {
    let Some(ops) = operator_document(condition) else {
        return Ok(equals_any(values, condition));
    };

    for (op, arg) in ops {
        let ok = match op.as_str() {
            "$eq" => equals_any(values, arg),
            "$ne" => !equals_any(values, arg),
            "$gt" => compares_any(values, arg, |o| o == Ordering::Greater),
            "$gte" => compares_any(values, arg, |o| o != Ordering::Less),
            "$lt" => compares_any(values, arg, |o| o == Ordering::Less),
            "$lte" => compares_any(values, arg, |o| o != Ordering::Greater),
            "$in" => {
                let candidates = arg
                    .as_array()
                    .ok_or_else(|| MongoError::query("$in expects an array"))?;
                candidates.iter().any(|c| equals_any(values, c))
            }
            "$not" => {
                if depth >= MAX_EXPRESSION_DEPTH {
                    return Err(MongoError::query("expression nesting is too deep"));
                }
                match arg {
                    Bson::Document(_) if operator_document(arg).is_some() => {
                        !field_matches(values, arg, depth + 1)?
                    }
                    Bson::RegularExpression(re) => {
                        let regex = compile_regex(&re.pattern, &re.options)?;
                        !regex_matches_any(values, &regex)
                    }
                    _ => return Err(MongoError::query("$not expects an operator expression")),
                }
            }
            "$regex" => {
                let regex = match arg {
                    Bson::String(pattern) => {
                        let options = ops.get_str("$options").unwrap_or_default();
                        compile_regex(pattern, options)?
                    }
                    Bson::RegularExpression(re) => compile_regex(&re.pattern, &re.options)?,
                    _ => return Err(MongoError::query("$regex expects a string pattern")),
                };
                regex_matches_any(values, &regex)
            }
            "$options" => {
                if !ops.contains_key("$regex") {
                    return Err(MongoError::query("$options needs a $regex"));
                }
                true
            }
            "$geoWithin" => {
                let shape = Shape::parse(as_document(arg, "$geoWithin")?)?;
                values
                    .iter()
                    .filter_map(|v| point_of(v))
                    .any(|p| shape.contains(p))
            }
            other => {
                return Err(MongoError::query(format!(
                    "unsupported query operator {}",
                    other
                )));
            }
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn equals_any(values: &[&Bson], target: &Bson) -> bool {
    if values.is_empty() {
        return matches!(target, Bson::Null);
    }
    values.iter().any(|v| bson_eq(v, target))
}

fn bson_eq(a: &Bson, b: &Bson) -> bool {
    match (bson_as_f64(a), bson_as_f64(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn compares_any(values: &[&Bson], target: &Bson, accept: impl Fn(Ordering) -> bool) -> bool {
    values
        .iter()
        .filter_map(|v| compare(v, target))
        .any(accept)
}

fn compare(a: &Bson, b: &Bson) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (bson_as_f64(a), bson_as_f64(b)) {
        return x.partial_cmp(&y);
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => Some(x.cmp(y)),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => Some(x.cmp(y)),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn compile_regex(pattern: &str, options: &str) -> MongoResult<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(options.contains('i'))
        .multi_line(options.contains('m'))
        .dot_matches_new_line(options.contains('s'))
        .ignore_whitespace(options.contains('x'))
        .build()
        .map_err(|e| MongoError::query(format!("invalid regular expression: {}", e)))
}

fn regex_matches_any(values: &[&Bson], regex: &Regex) -> bool {
    values
        .iter()
        .any(|v| matches!(v, Bson::String(s) if regex.is_match(s)))
}

// ============== Geometry ==============

/// Mean equatorial radius of the Earth in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6378.1;

enum Shape {
    /// Center and angular radius in radians.
    Cap([f64; 2], f64),
    /// Outer ring of a polygon.
    Polygon(Vec<[f64; 2]>),
}

impl Shape {
    fn parse(spec: &Document) -> MongoResult<Self> {
        if let Some(sphere) = spec.get("$centerSphere") {
            let parts = sphere
                .as_array()
                .filter(|p| p.len() == 2)
                .ok_or_else(|| MongoError::query("$centerSphere expects [[lon, lat], radians]"))?;
            let center = point_of(&parts[0])
                .ok_or_else(|| MongoError::query("$centerSphere center must be [lon, lat]"))?;
            let radians = bson_as_f64(&parts[1])
                .filter(|r| *r >= 0.0)
                .ok_or_else(|| MongoError::query("$centerSphere radius must be non-negative"))?;
            return Ok(Shape::Cap(center, radians));
        }

        if let Some(geometry) = spec.get_document("$geometry").ok() {
            if geometry.get_str("type").ok() != Some("Polygon") {
                return Err(MongoError::query("$geometry supports Polygon only"));
            }
            let ring = geometry
                .get_array("coordinates")
                .ok()
                .and_then(|rings| rings.first())
                .and_then(Bson::as_array)
                .ok_or_else(|| MongoError::query("Polygon coordinates must hold a ring"))?
                .iter()
                .map(|v| point_of(v).ok_or_else(|| MongoError::query("invalid polygon vertex")))
                .collect::<MongoResult<Vec<_>>>()?;
            if ring.len() < 4 || ring.first() != ring.last() {
                return Err(MongoError::query("Polygon ring must be closed"));
            }
            return Ok(Shape::Polygon(ring));
        }

        Err(MongoError::query(
            "$geoWithin supports $centerSphere and $geometry",
        ))
    }

    fn contains(&self, point: [f64; 2]) -> bool {
        match self {
            Shape::Cap(center, radians) => central_angle(*center, point) <= *radians + 1e-12,
            Shape::Polygon(ring) => on_boundary(ring, point) || ray_cast(ring, point),
        }
    }
}

/// `[lon, lat]` of a GeoJSON point or a legacy coordinate pair.
fn point_of(value: &Bson) -> Option<[f64; 2]> {
    let coords = match value {
        Bson::Document(doc) => {
            if doc.get_str("type").ok() != Some("Point") {
                return None;
            }
            doc.get_array("coordinates").ok()?
        }
        Bson::Array(items) => items,
        _ => return None,
    };
    match coords.as_slice() {
        [lon, lat] => Some([bson_as_f64(lon)?, bson_as_f64(lat)?]),
        _ => None,
    }
}

/// Great-circle angle between two `[lon, lat]` points, in radians.
pub fn central_angle(a: [f64; 2], b: [f64; 2]) -> f64 {
    let (lon1, lat1) = (a[0].to_radians(), a[1].to_radians());
    let (lon2, lat2) = (b[0].to_radians(), b[1].to_radians());
    let h = ((lat2 - lat1) / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * ((lon2 - lon1) / 2.0).sin().powi(2);
    2.0 * h.sqrt().min(1.0).asin()
}

fn ray_cast(ring: &[[f64; 2]], [x, y]: [f64; 2]) -> bool {
    let mut inside = false;
    for edge in ring.windows(2) {
        let ([x1, y1], [x2, y2]) = (edge[0], edge[1]);
        if (y1 > y) != (y2 > y) {
            let cross_x = x1 + (y - y1) * (x2 - x1) / (y2 - y1);
            if x < cross_x {
                inside = !inside;
            }
        }
    }
    inside
}

fn on_boundary(ring: &[[f64; 2]], [x, y]: [f64; 2]) -> bool {
    const EPS: f64 = 1e-12;
    ring.windows(2).any(|edge| {
        let ([x1, y1], [x2, y2]) = (edge[0], edge[1]);
        let cross = (x2 - x1) * (y - y1) - (y2 - y1) * (x - x1);
        cross.abs() <= EPS
            && x >= x1.min(x2) - EPS
            && x <= x1.max(x2) + EPS
            && y >= y1.min(y2) - EPS
            && y <= y1.max(y2) + EPS
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use pretty_assertions::assert_eq;

    fn point(lon: f64, lat: f64) -> Document {
        doc! { "type": "Point", "coordinates": [lon, lat] }
    }

    // ========== Matching Tests ==========

    #[test]
    fn test_implicit_equality_on_arrays() {
        let doc = doc! { "tags": ["pic", "photo"] };
        assert!(matches(&doc, &doc! { "tags": "photo" }).unwrap());
        assert!(!matches(&doc, &doc! { "tags": "video" }).unwrap());
        assert!(matches(&doc, &doc! { "tags": ["pic", "photo"] }).unwrap());
    }

    #[test]
    fn test_regex_with_options() {
        let doc = doc! { "title": "Berlin Wall" };
        assert!(matches(&doc, &doc! { "title": { "$regex": "wall", "$options": "i" } }).unwrap());
        assert!(!matches(&doc, &doc! { "title": { "$regex": "wall" } }).unwrap());
        assert!(
            matches(&doc, &doc! { "title": { "$not": { "$regex": "paris", "$options": "i" } } })
                .unwrap()
        );
    }

    #[test]
    fn test_negation_matches_missing_field() {
        let doc = doc! { "title": "x" };
        assert!(matches(&doc, &doc! { "size": { "$ne": 3 } }).unwrap());
        assert!(matches(&doc, &doc! { "size": { "$not": { "$gt": 3 } } }).unwrap());
        assert!(!matches(&doc, &doc! { "size": { "$gt": 3 } }).unwrap());
    }

    #[test]
    fn test_numeric_comparison_across_types() {
        let doc = doc! { "size": 3_i64 };
        assert!(matches(&doc, &doc! { "size": { "$eq": 3.0 } }).unwrap());
        assert!(matches(&doc, &doc! { "size": { "$gte": 3_i32, "$lt": 4 } }).unwrap());
        assert!(!matches(&doc, &doc! { "size": { "$gt": 3 } }).unwrap());
    }

    #[test]
    fn test_and_or() {
        let doc = doc! { "a": 1, "b": 2 };
        assert!(matches(&doc, &doc! { "$and": [ { "a": 1 }, { "b": 2 } ] }).unwrap());
        assert!(!matches(&doc, &doc! { "$and": [ { "a": 1 }, { "b": 3 } ] }).unwrap());
        assert!(matches(&doc, &doc! { "$or": [ { "a": 5 }, { "b": 2 } ] }).unwrap());
        assert!(matches(&doc, &doc! { "$or": [] }).is_err());
    }

    #[test]
    fn test_nested_path_into_array_of_documents() {
        let doc = doc! { "collections": [ { "title": "a" }, { "title": "b" } ] };
        assert!(matches(&doc, &doc! { "collections.title": "b" }).unwrap());
        assert!(matches(&doc, &doc! { "collections.1.title": "b" }).unwrap());
        assert!(!matches(&doc, &doc! { "collections.0.title": "b" }).unwrap());
    }

    #[test]
    fn test_in_operator() {
        let a = ObjectId::new();
        let doc = doc! { "_id": a };
        assert!(matches(&doc, &doc! { "_id": { "$in": [ObjectId::new(), a] } }).unwrap());
        assert!(!matches(&doc, &doc! { "_id": { "$in": [ObjectId::new()] } }).unwrap());
    }

    #[test]
    fn test_unsupported_operator_rejected() {
        let doc = doc! { "a": 1 };
        assert!(matches(&doc, &doc! { "a": { "$where": "1" } }).is_err());
        assert!(matches(&doc, &doc! { "$nor": [ { "a": 1 } ] }).is_err());
    }

    // ========== Geometry Tests ==========

    #[test]
    fn test_center_sphere() {
        let near = doc! { "loc": point(13.413444, 52.531029) };
        let far = doc! { "loc": point(20.997325, 52.193696) };
        let filter = doc! {
            "loc": { "$geoWithin": { "$centerSphere": [[13.418964, 52.530173], 10.0 / EARTH_RADIUS_KM] } }
        };

        assert!(matches(&near, &filter).unwrap());
        assert!(!matches(&far, &filter).unwrap());
    }

    #[test]
    fn test_polygon() {
        let square = doc! {
            "loc": { "$geoWithin": { "$geometry": {
                "type": "Polygon",
                "coordinates": [[[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0], [0.0, 0.0]]]
            } } }
        };

        assert!(matches(&doc! { "loc": point(1.0, 1.0) }, &square).unwrap());
        assert!(matches(&doc! { "loc": [1.5, 0.5] }, &square).unwrap());
        assert!(matches(&doc! { "loc": point(2.0, 1.0) }, &square).unwrap());
        assert!(!matches(&doc! { "loc": point(3.0, 1.0) }, &square).unwrap());
        assert!(!matches(&doc! { "title": "no location" }, &square).unwrap());
    }

    #[test]
    fn test_central_angle() {
        let angle = central_angle([13.418964, 52.530173], [13.413444, 52.531029]);
        let km = angle * EARTH_RADIUS_KM;
        assert!(km > 0.3 && km < 0.5, "{}", km);
    }

    // ========== Pipeline Tests ==========

    #[test]
    fn test_pipeline_stages() {
        let docs = (0..5).map(|i| doc! { "n": i, "content": { "data": [i], "url": "u" } });
        let out = run_pipeline(
            docs.collect(),
            &[
                doc! { "$match": { "n": { "$gte": 1 } } },
                doc! { "$skip": 1_i64 },
                doc! { "$limit": 2_i64 },
                doc! { "$unset": "content.data" },
            ],
        )
        .unwrap();

        assert_eq!(
            out,
            vec![
                doc! { "n": 2, "content": { "url": "u" } },
                doc! { "n": 3, "content": { "url": "u" } },
            ]
        );
    }

    #[test]
    fn test_count_stage() {
        let docs = vec![doc! { "a": 1 }, doc! { "a": 2 }];
        let out = run_pipeline(docs.clone(), &[doc! { "$count": "totalCount" }]).unwrap();
        assert_eq!(out, vec![doc! { "totalCount": 2 }]);

        let none = run_pipeline(
            docs,
            &[doc! { "$match": { "a": 9 } }, doc! { "$count": "totalCount" }],
        )
        .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_zero_limit_rejected() {
        assert!(run_pipeline(vec![doc! {}], &[doc! { "$limit": 0 }]).is_err());
    }

    // ========== Collection Tests ==========

    #[tokio::test]
    async fn test_insert_assigns_id() {
        let coll = MemoryCollection::new("records");
        let id = coll.insert_one(doc! { "title": "a" }).await.unwrap();
        let stored = coll.find_one(doc! { "_id": id }).await.unwrap().unwrap();
        assert_eq!(stored, doc! { "_id": id, "title": "a" });
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let id = ObjectId::new();
        let coll = MemoryCollection::with_documents("records", [doc! { "_id": id }]);
        assert!(coll.insert_one(doc! { "_id": id }).await.is_err());
    }

    #[tokio::test]
    async fn test_update_returns_after_image() {
        let coll = MemoryCollection::new("records");
        let id = coll.insert_one(doc! { "title": "a", "content": { "data": 1 } }).await.unwrap();

        let updated = coll
            .find_one_and_update(
                doc! { "_id": id },
                doc! { "$set": { "title": "b" }, "$unset": { "content.data": "" } },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated, doc! { "_id": id, "title": "b", "content": {} });
        assert_eq!(coll.snapshot(), vec![updated]);
    }

    #[tokio::test]
    async fn test_delete() {
        let coll = MemoryCollection::with_documents(
            "records",
            [doc! { "n": 1 }, doc! { "n": 2 }, doc! { "n": 3 }],
        );
        let removed = coll.find_one_and_delete(doc! { "n": 2 }).await.unwrap();
        assert!(removed.is_some());
        assert_eq!(coll.delete_many(doc! { "n": { "$gte": 1 } }).await.unwrap(), 2);
        assert!(coll.is_empty());
    }
}
