//! Organization domain model and its response projection.

use super::activity::{Activity, ActivityId};
use super::building::{Building, BuildingId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Stable organization identifier.
pub type OrganizationId = i64;

/// Business entity located in one building and tagged with activities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    /// Unordered list as stored; duplicates are not collapsed.
    pub phone_numbers: Vec<String>,
    pub building_id: BuildingId,
    /// Membership relation; a set, so no duplicate pairs.
    pub activity_ids: BTreeSet<ActivityId>,
}

/// Response shape for one organization with its relations resolved.
///
/// Mirrors what callers of the directory expect to render: the full building
/// and the tagged activities rather than bare identifiers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrganizationView {
    pub id: OrganizationId,
    pub name: String,
    pub phone_numbers: Vec<String>,
    pub building: Building,
    pub activities: Vec<Activity>,
}
