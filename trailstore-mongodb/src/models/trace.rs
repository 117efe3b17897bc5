use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};
use trailstore_query::{AnyFilter, FilterSet};

use super::{Entity, Visibility};

/// A saved filter over records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trace {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ObjectId>,
    pub visibility: Visibility,
    #[serde(default)]
    pub filter_set: Vec<AnyFilter>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Trace {
    /// The saved filters as a set ready for compilation.
    pub fn filter_set(&self) -> FilterSet {
        self.filter_set.iter().cloned().collect()
    }
}

/// Fields for a new trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceCreateParams {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ObjectId>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub filter_set: Vec<AnyFilter>,
}

impl TraceCreateParams {
    /// A private trace saving `filter_set`.
    pub fn new(title: impl Into<String>, author: impl Into<String>, filter_set: FilterSet) -> Self {
        Self {
            title: title.into(),
            description: None,
            tags: Vec::new(),
            author: author.into(),
            parent: None,
            visibility: Visibility::default(),
            filter_set: filter_set.filter_set,
        }
    }
}

/// Fields to change on a trace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceUpdateParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_set: Option<Vec<AnyFilter>>,
}

impl Entity for Trace {
    const MODEL_NAME: &'static str = "Trace";
    const COLLECTION: &'static str = "traces";

    type CreateParams = TraceCreateParams;
    type UpdateParams = TraceUpdateParams;

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
