use bson::{Bson, DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

use super::Entity;
use crate::pipeline::BULK_DATA_FIELD;

/// Whether a record points at external media or carries its data inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataType {
    /// Content is a URL to a media file.
    Referenced,
    /// Content holds the data itself.
    #[serde(rename = "NOTREFERENCED")]
    NotReferenced,
}

/// Kind of referenced media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MediaType {
    /// Still image.
    Photo,
    /// Video clip.
    Video,
    /// Audio recording.
    #[serde(rename = "SOUNDFILE")]
    SoundFile,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
enum PointType {
    #[default]
    Point,
}

/// GeoJSON point, `[lon, lat]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(rename = "type", default)]
    kind: PointType,
    /// `[longitude, latitude]`
    pub coordinates: [f64; 2],
}

impl GeoPoint {
    /// Point at `longitude`, `latitude`.
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            kind: PointType::Point,
            coordinates: [longitude, latitude],
        }
    }

    /// Longitude in degrees.
    pub fn longitude(&self) -> f64 {
        self.coordinates[0]
    }

    /// Latitude in degrees.
    pub fn latitude(&self) -> f64 {
        self.coordinates[1]
    }
}

/// Record payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    /// A link to media stored elsewhere.
    Referenced {
        /// Media location.
        url: String,
        /// Media kind.
        #[serde(rename = "mediaType")]
        media_type: MediaType,
        /// Where the media was captured.
        location: GeoPoint,
    },
    /// Data stored with the record.
    Inline {
        /// Arbitrary document or array. Large; dropped by metadata-only listings.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Bson>,
        /// Where the data was captured.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        location: Option<GeoPoint>,
    },
}

impl Content {
    /// Where the content was captured, if known.
    pub fn location(&self) -> Option<&GeoPoint> {
        match self {
            Content::Referenced { location, .. } => Some(location),
            Content::Inline { location, .. } => location.as_ref(),
        }
    }

    /// Inline data, if present.
    pub fn data(&self) -> Option<&Bson> {
        match self {
            Content::Referenced { .. } => None,
            Content::Inline { data, .. } => data.as_ref(),
        }
    }
}

/// A single data record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub data_type: DataType,
    /// Dataset format the record was ingested from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_set: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub content: Content,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// Fields for a new record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordCreateParams {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub data_type: DataType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_set: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub content: Content,
}

impl RecordCreateParams {
    /// A record carrying `data` inline.
    pub fn inline(title: impl Into<String>, data: impl Into<Bson>) -> Self {
        Self {
            title: title.into(),
            description: None,
            data_type: DataType::NotReferenced,
            data_set: None,
            tags: Vec::new(),
            content: Content::Inline {
                data: Some(data.into()),
                location: None,
            },
        }
    }

    /// A record pointing at media.
    pub fn referenced(
        title: impl Into<String>,
        url: impl Into<String>,
        media_type: MediaType,
        location: GeoPoint,
    ) -> Self {
        Self {
            title: title.into(),
            description: None,
            data_type: DataType::Referenced,
            data_set: None,
            tags: Vec::new(),
            content: Content::Referenced {
                url: url.into(),
                media_type,
                location,
            },
        }
    }

    /// Set the tags.
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the capture location of inline content.
    pub fn located(mut self, point: GeoPoint) -> Self {
        if let Content::Inline { location, .. } = &mut self.content {
            *location = Some(point);
        }
        self
    }
}

/// Fields to change on a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordUpdateParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<DataType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_set: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,
}

impl Entity for Record {
    const MODEL_NAME: &'static str = "Record";
    const COLLECTION: &'static str = "records";
    const BULK_DATA_FIELD: Option<&'static str> = Some(BULK_DATA_FIELD);

    type CreateParams = RecordCreateParams;
    type UpdateParams = RecordUpdateParams;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn created_at(&self) -> DateTime {
        self.created_at
    }

    fn updated_at(&self) -> DateTime {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_referenced_content_shape() {
        let content = Content::Referenced {
            url: "https://media.example/1.jpg".into(),
            media_type: MediaType::Photo,
            location: GeoPoint::new(13.4, 52.5),
        };

        assert_eq!(
            bson::to_document(&content).unwrap(),
            doc! {
                "url": "https://media.example/1.jpg",
                "mediaType": "PHOTO",
                "location": { "type": "Point", "coordinates": [13.4, 52.5] },
            }
        );
    }

    #[test]
    fn test_content_variant_detection() {
        let referenced: Content = bson::from_document(doc! {
            "url": "u",
            "mediaType": "SOUNDFILE",
            "location": { "type": "Point", "coordinates": [1, 2] },
        })
        .unwrap();
        assert!(matches!(
            referenced,
            Content::Referenced { media_type: MediaType::SoundFile, .. }
        ));
        assert_eq!(referenced.location().unwrap().latitude(), 2.0);

        let inline: Content = bson::from_document(doc! { "data": { "rows": [1, 2] } }).unwrap();
        assert_eq!(inline.data(), Some(&Bson::Document(doc! { "rows": [1, 2] })));
        assert!(inline.location().is_none());
    }

    #[test]
    fn test_record_round_trip_keeps_wire_names() {
        let now = DateTime::now();
        let record = Record {
            id: ObjectId::new(),
            title: "bike ride".into(),
            description: None,
            data_type: DataType::NotReferenced,
            data_set: Some("SIMRA".into()),
            tags: vec!["bike".into()],
            content: Content::Inline {
                data: Some(Bson::Int32(1)),
                location: None,
            },
            created_at: now,
            updated_at: now,
        };

        let doc = bson::to_document(&record).unwrap();
        assert!(doc.contains_key("_id"));
        assert_eq!(doc.get_str("dataType").unwrap(), "NOTREFERENCED");
        assert_eq!(doc.get_str("dataSet").unwrap(), "SIMRA");
        assert!(doc.contains_key("createdAt"));

        let back: Record = bson::from_document(doc).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_update_params_skip_absent_fields() {
        let params = RecordUpdateParams {
            title: Some("renamed".into()),
            ..Default::default()
        };
        assert_eq!(bson::to_document(&params).unwrap(), doc! { "title": "renamed" });
    }
}
