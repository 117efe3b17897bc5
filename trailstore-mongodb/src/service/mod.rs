//! Entity services.
//!
//! One generic [`CrudService`] serves every entity; records add the
//! nested-value operations in [`record`].

mod crud;
pub mod record;

pub use crud::CrudService;

use crate::models::{Journey, Record, Trace};

/// Service over the `records` collection.
pub type RecordService = CrudService<Record>;
/// Service over the `journeys` collection.
pub type JourneyService = CrudService<Journey>;
/// Service over the `traces` collection.
pub type TraceService = CrudService<Trace>;
