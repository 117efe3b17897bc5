use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};
use trailstore_query::{AnyFilter, FilterSet};

use super::{Entity, Visibility};

/// A titled filter set inside a journey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyCollection {
    pub title: String,
    #[serde(default)]
    pub filter_set: Vec<AnyFilter>,
}

impl JourneyCollection {
    /// Collection named `title` selecting records by `filter_set`.
    pub fn new(title: impl Into<String>, filter_set: FilterSet) -> Self {
        Self {
            title: title.into(),
            filter_set: filter_set.filter_set,
        }
    }

    /// The filters as a set ready for compilation.
    pub fn filter_set(&self) -> FilterSet {
        self.filter_set.iter().cloned().collect()
    }
}

/// A curated sequence of record collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Journey {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub author: String,
    /// Journey this one was copied from.
    #[serde(rename = "parentID", default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ObjectId>,
    #[serde(default)]
    pub collections: Vec<JourneyCollection>,
    pub visibility: Visibility,
    /// Records the author unchecked.
    #[serde(rename = "excludedIDs", default)]
    pub excluded_ids: Vec<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// Fields for a new journey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyCreateParams {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub author: String,
    #[serde(rename = "parentID", default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ObjectId>,
    #[serde(default)]
    pub collections: Vec<JourneyCollection>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(rename = "excludedIDs", default)]
    pub excluded_ids: Vec<String>,
}

impl JourneyCreateParams {
    /// An empty private journey.
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            tags: Vec::new(),
            author: author.into(),
            parent_id: None,
            collections: Vec::new(),
            visibility: Visibility::default(),
            excluded_ids: Vec::new(),
        }
    }

    /// Append a collection.
    pub fn collection(mut self, collection: JourneyCollection) -> Self {
        self.collections.push(collection);
        self
    }

    /// Set the visibility.
    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }
}

/// Fields to change on a journey.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyUpdateParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(rename = "parentID", default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collections: Option<Vec<JourneyCollection>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
    #[serde(rename = "excludedIDs", default, skip_serializing_if = "Option::is_none")]
    pub excluded_ids: Option<Vec<String>>,
}

impl Entity for Journey {
    const MODEL_NAME: &'static str = "Journey";
    const COLLECTION: &'static str = "journeys";

    type CreateParams = JourneyCreateParams;
    type UpdateParams = JourneyUpdateParams;

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
    use trailstore_query::Filter;

    #[test]
    fn test_collection_keeps_filter_wire_shape() {
        let collection = JourneyCollection::new(
            "photos",
            FilterSet::new().push(Filter::contains("tags", "photo")),
        );
        let doc = bson::to_document(&collection).unwrap();

        assert_eq!(
            doc,
            doc! {
                "title": "photos",
                "filterSet": [
                    { "key": "tags", "operation": "CONTAINS", "negate": false, "value": "photo" }
                ],
            }
        );

        let back: JourneyCollection = bson::from_document(doc).unwrap();
        assert_eq!(back.filter_set().len(), 1);
    }

    #[test]
    fn test_create_params_wire_names() {
        let params = JourneyCreateParams::new("Berlin", "ada").visibility(Visibility::Public);
        let doc = bson::to_document(&params).unwrap();

        assert_eq!(doc.get_str("visibility").unwrap(), "PUBLIC");
        assert!(doc.contains_key("excludedIDs"));
        assert!(!doc.contains_key("parentID"));
    }
}
