//! Document mapping and path utilities.

use bson::{Bson, Document, oid::ObjectId};
use serde::{Serialize, de::DeserializeOwned};
use trailstore_query::{FieldPath, QueryError, QueryResult};

use crate::error::{MongoError, MongoResult};

/// Path access on BSON documents.
///
/// Numeric segments index into arrays, so `content.data.0` is the first
/// element of `content.data`.
pub trait DocumentExt {
    /// The value at `path`, if present.
    fn get_path(&self, path: &FieldPath) -> Option<&Bson>;

    /// Set the value at `path`, creating intermediate documents.
    fn set_path(&mut self, path: &FieldPath, value: Bson) -> MongoResult<()>;

    /// Remove the value at `path`, returning it.
    fn remove_path(&mut self, path: &FieldPath) -> Option<Bson>;

    /// Get the `_id` field as ObjectId.
    fn id(&self) -> MongoResult<ObjectId>;
}

impl DocumentExt for Document {
    fn get_path(&self, path: &FieldPath) -> Option<&Bson> {
        let mut segments = path.segments();
        let mut current = self.get(segments.next()?)?;
        for segment in segments {
            current = child(current, segment)?;
        }
        Some(current)
    }

    fn set_path(&mut self, path: &FieldPath, value: Bson) -> MongoResult<()> {
        let segments: Vec<&str> = path.segments().collect();
        let Some((first, rest)) = segments.split_first() else {
            return Err(MongoError::query("cannot set an empty path"));
        };
        if rest.is_empty() {
            self.insert(*first, value);
            return Ok(());
        }
        let slot = self
            .entry(first.to_string())
            .or_insert_with(|| Bson::Document(Document::new()));
        set_in(slot, rest, value, path)
    }

    fn remove_path(&mut self, path: &FieldPath) -> Option<Bson> {
        let segments: Vec<&str> = path.segments().collect();
        let (last, parents) = segments.split_last()?;
        if parents.is_empty() {
            return self.remove(*last);
        }

        let mut current = self.get_mut(parents[0])?;
        for segment in &parents[1..] {
            current = child_mut(current, segment)?;
        }
        match current {
            Bson::Document(doc) => doc.remove(*last),
            // unsetting an array element leaves a null in its place
            Bson::Array(items) => {
                let slot = items.get_mut(last.parse::<usize>().ok()?)?;
                Some(std::mem::replace(slot, Bson::Null))
            }
            _ => None,
        }
    }

    fn id(&self) -> MongoResult<ObjectId> {
        self.get_object_id("_id")
            .map_err(|_| MongoError::query("field '_id' is not an ObjectId"))
    }
}

fn child<'a>(value: &'a Bson, segment: &str) -> Option<&'a Bson> {
    match value {
        Bson::Document(doc) => doc.get(segment),
        Bson::Array(items) => items.get(segment.parse::<usize>().ok()?),
        _ => None,
    }
}

fn child_mut<'a>(value: &'a mut Bson, segment: &str) -> Option<&'a mut Bson> {
    match value {
        Bson::Document(doc) => doc.get_mut(segment),
        Bson::Array(items) => items.get_mut(segment.parse::<usize>().ok()?),
        _ => None,
    }
}

/// Most nulls a single write may append to pad an array up to an index.
pub const MAX_ARRAY_PADDING: usize = 1_500_000;

fn set_in(target: &mut Bson, segments: &[&str], value: Bson, path: &FieldPath) -> MongoResult<()> {
    let Some((segment, rest)) = segments.split_first() else {
        *target = value;
        return Ok(());
    };

    let slot = match target {
        Bson::Document(doc) => {
            if rest.is_empty() {
                doc.insert(*segment, value);
                return Ok(());
            }
            doc.entry(segment.to_string())
                .or_insert_with(|| Bson::Document(Document::new()))
        }
        Bson::Array(items) => {
            let index = segment.parse::<usize>().map_err(|_| {
                MongoError::query(format!(
                    "cannot create field '{}' in an array element of '{}'",
                    segment, path
                ))
            })?;
            if index.saturating_sub(items.len()) > MAX_ARRAY_PADDING {
                return Err(MongoError::query(format!(
                    "index {} in '{}' would pad the array past {} elements",
                    index, path, MAX_ARRAY_PADDING
                )));
            }
            if items.len() <= index {
                items.resize(index + 1, Bson::Null);
            }
            &mut items[index]
        }
        other => {
            return Err(MongoError::query(format!(
                "cannot create field '{}' in element of type {:?} at '{}'",
                segment,
                other.element_type(),
                path
            )));
        }
    };

    if rest.is_empty() {
        *slot = value;
        Ok(())
    } else {
        if matches!(slot, Bson::Null) {
            *slot = Bson::Document(Document::new());
        }
        set_in(slot, rest, value, path)
    }
}

/// Convert a struct to a BSON document.
pub fn to_document<T: Serialize>(value: &T) -> QueryResult<Document> {
    bson::to_document(value).map_err(|e| MongoError::from(e).into())
}

/// Convert a BSON document to a struct.
pub fn from_document<T: DeserializeOwned>(doc: Document) -> QueryResult<T> {
    bson::from_document(doc).map_err(|e| MongoError::from(e).into())
}

/// Parse an ObjectId from a string, rejecting malformed identifiers.
pub fn parse_object_id(s: &str) -> QueryResult<ObjectId> {
    ObjectId::parse_str(s.trim()).map_err(|e| {
        QueryError::invalid_input("id", format!("'{}' is not a valid identifier", s)).with_source(e)
    })
}

/// Parse every identifier, failing on the first malformed one.
pub fn parse_object_ids<I, S>(ids: I) -> QueryResult<Vec<ObjectId>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    ids.into_iter().map(|s| parse_object_id(s.as_ref())).collect()
}

/// Parse a comma-separated identifier list such as `"a, b,c"`.
pub fn parse_id_list(ids: &str) -> QueryResult<Vec<ObjectId>> {
    parse_object_ids(ids.split(',').map(str::trim).filter(|s| !s.is_empty()))
}

/// An identifier value as the store compares it: an ObjectId when the
/// string is one, otherwise the string itself.
pub fn identifier_value(s: &str) -> Bson {
    match ObjectId::parse_str(s) {
        Ok(oid) => Bson::ObjectId(oid),
        Err(_) => Bson::String(s.to_string()),
    }
}

/// BSON number as a float.
pub fn bson_as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Double(v) => Some(*v),
        Bson::Int32(v) => Some(*v as f64),
        Bson::Int64(v) => Some(*v as f64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_get_path() {
        let doc = doc! {
            "content": { "data": [ { "v": 1 }, { "v": 2 } ], "url": "x" }
        };

        assert_eq!(
            doc.get_path(&FieldPath::new("content.url")),
            Some(&Bson::String("x".into()))
        );
        assert_eq!(
            doc.get_path(&FieldPath::new("content.data[1].v")),
            Some(&Bson::Int32(2))
        );
        assert_eq!(doc.get_path(&FieldPath::new("content.data.5")), None);
        assert_eq!(doc.get_path(&FieldPath::new("content.url.deeper")), None);
    }

    #[test]
    fn test_set_path_creates_documents() {
        let mut doc = doc! { "title": "a" };
        doc.set_path(&FieldPath::new("content.data.rows"), Bson::Int32(3))
            .unwrap();
        assert_eq!(doc, doc! { "title": "a", "content": { "data": { "rows": 3 } } });
    }

    #[test]
    fn test_set_path_into_array() {
        let mut doc = doc! { "rows": [ { "a": 1 } ] };
        doc.set_path(&FieldPath::new("rows[0].a"), Bson::Int32(9)).unwrap();
        doc.set_path(&FieldPath::new("rows.2"), Bson::Int32(7)).unwrap();
        assert_eq!(doc, doc! { "rows": [ { "a": 9 }, Bson::Null, 7 ] });
    }

    #[test]
    fn test_set_path_rejects_far_array_index() {
        let mut doc = doc! { "rows": [1, 2] };
        let overflow = FieldPath::new(format!("rows.{}", usize::MAX));
        assert!(doc.set_path(&overflow, Bson::Int32(1)).is_err());
        assert!(doc.set_path(&FieldPath::new("rows.100000000"), Bson::Int32(1)).is_err());
        assert_eq!(doc, doc! { "rows": [1, 2] });

        doc.set_path(&FieldPath::new("rows.4"), Bson::Int32(5)).unwrap();
        assert_eq!(doc, doc! { "rows": [1, 2, Bson::Null, Bson::Null, 5] });
    }

    #[test]
    fn test_set_path_through_scalar_fails() {
        let mut doc = doc! { "title": "a" };
        assert!(doc.set_path(&FieldPath::new("title.x"), Bson::Int32(1)).is_err());
    }

    #[test]
    fn test_remove_path() {
        let mut doc = doc! { "content": { "data": [1, 2], "url": "x" } };
        assert_eq!(
            doc.remove_path(&FieldPath::new("content.url")),
            Some(Bson::String("x".into()))
        );
        assert_eq!(
            doc.remove_path(&FieldPath::new("content.data.0")),
            Some(Bson::Int32(1))
        );
        assert_eq!(doc, doc! { "content": { "data": [Bson::Null, 2] } });
        assert_eq!(doc.remove_path(&FieldPath::new("missing.path")), None);
    }

    #[test]
    fn test_parse_object_id() {
        let oid = ObjectId::new();
        assert_eq!(parse_object_id(&oid.to_hex()).unwrap(), oid);

        let err = parse_object_id("not-an-id").unwrap_err();
        assert_eq!(err.code, trailstore_query::ErrorCode::InvalidInput);
    }

    #[test]
    fn test_parse_id_list() {
        let (a, b) = (ObjectId::new(), ObjectId::new());
        let ids = parse_id_list(&format!(" {}, {} ,", a, b)).unwrap();
        assert_eq!(ids, vec![a, b]);
        assert!(parse_id_list("abc,def").is_err());
    }

    #[test]
    fn test_identifier_value() {
        let oid = ObjectId::new();
        assert_eq!(identifier_value(&oid.to_hex()), Bson::ObjectId(oid));
        assert_eq!(identifier_value("legacy-7"), Bson::String("legacy-7".into()));
    }
}
