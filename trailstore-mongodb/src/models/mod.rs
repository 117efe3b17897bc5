//! Persisted entity types.

mod journey;
mod record;
mod trace;

pub use journey::{Journey, JourneyCollection, JourneyCreateParams, JourneyUpdateParams};
pub use record::{
    Content, DataType, GeoPoint, MediaType, Record, RecordCreateParams, RecordUpdateParams,
};
pub use trace::{Trace, TraceCreateParams, TraceUpdateParams};

use bson::{DateTime, oid::ObjectId};
use chrono::Utc;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// Field holding the creation timestamp.
pub const CREATED_AT: &str = "createdAt";
/// Field holding the last-update timestamp.
pub const UPDATED_AT: &str = "updatedAt";

/// A document type stored in its own collection.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Name used in errors and logs.
    const MODEL_NAME: &'static str;

    /// Collection the entity lives in.
    const COLLECTION: &'static str;

    /// Bulk payload dropped by metadata-only listings, if the entity has one.
    const BULK_DATA_FIELD: Option<&'static str> = None;

    /// Fields accepted on creation.
    type CreateParams: Serialize + Send + Sync;

    /// Fields accepted on update. Absent fields are left untouched.
    type UpdateParams: Serialize + Send + Sync;

    /// The stored identifier.
    fn id(&self) -> ObjectId;

    /// When the entity was created.
    fn created_at(&self) -> DateTime;

    /// When the entity was last written.
    fn updated_at(&self) -> DateTime;

    /// [`updated_at`](Self::updated_at) as a chrono timestamp.
    fn last_modified(&self) -> chrono::DateTime<Utc> {
        self.updated_at().to_chrono()
    }
}

/// Who can see a journey or trace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Visibility {
    /// Visible to everyone.
    Public,
    /// Visible to the author only.
    #[default]
    Private,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visibility_wire_names() {
        assert_eq!(serde_json::to_value(Visibility::Public).unwrap(), "PUBLIC");
        let private: Visibility = serde_json::from_value("PRIVATE".into()).unwrap();
        assert_eq!(private, Visibility::Private);
        assert!(serde_json::from_value::<Visibility>("public".into()).is_err());
    }
}
