//! Directory query use-case service.
//!
//! # Responsibility
//! - Compose hierarchy resolution, geo filtering and store predicates into
//!   the directory query operations.
//! - Own the "empty result is an error" policy.
//! - Shape organizations into response views.
//!
//! # Invariants
//! - Multi-result operations deduplicate by organization id, keeping first
//!   occurrence order, before the emptiness check.
//! - A successful multi-result operation never returns an empty `Vec`.
//! - The service never writes through the store.

use crate::model::activity::{ActivityId, ACTIVITY_TREE_MAX_DEPTH};
use crate::model::building::{Building, BuildingId};
use crate::model::organization::{Organization, OrganizationId, OrganizationView};
use crate::query::error::{NotFoundTarget, QueryError, QueryResult};
use crate::query::geo::{distance_km, within_radius};
use crate::query::hierarchy::resolve_subtree;
use crate::repo::directory_repo::{DirectoryStore, StoreError};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::time::Instant;

/// Radius search request: a center point in degrees and a radius in km.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RadiusSearch {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
}

impl RadiusSearch {
    pub fn new(latitude: f64, longitude: f64, radius_km: f64) -> Self {
        Self {
            latitude,
            longitude,
            radius_km,
        }
    }

    /// Rejects a non-positive or non-finite radius.
    ///
    /// Coordinates are taken as given.
    pub fn validate(&self) -> QueryResult<()> {
        if !self.radius_km.is_finite() || self.radius_km <= 0.0 {
            return Err(QueryError::Validation(format!(
                "radius_km must be a positive number, got {}",
                self.radius_km
            )));
        }
        Ok(())
    }
}

/// Directory query service facade.
pub struct QueryService<S: DirectoryStore> {
    store: S,
}

impl<S: DirectoryStore> QueryService<S> {
    /// Creates service from store implementation.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Organizations located in one building.
    pub fn by_building(&self, building_id: BuildingId) -> QueryResult<Vec<Organization>> {
        let started_at = Instant::now();
        let result = self
            .store
            .fetch_organizations_by_building_id(building_id)
            .map_err(QueryError::from)
            .and_then(|organizations| {
                non_empty(
                    organizations,
                    NotFoundTarget::OrganizationsInBuilding(building_id),
                )
            });
        log_outcome("by_building", started_at, result.as_ref().map(Vec::len));
        result
    }

    /// Organizations tagged directly with one activity, without hierarchy
    /// expansion.
    pub fn by_activity(&self, activity_id: ActivityId) -> QueryResult<Vec<Organization>> {
        let started_at = Instant::now();
        let result = self
            .store
            .fetch_organizations_by_activity_ids(&BTreeSet::from([activity_id]))
            .map_err(QueryError::from)
            .and_then(|organizations| {
                non_empty(
                    organizations,
                    NotFoundTarget::OrganizationsWithActivity(activity_id),
                )
            });
        log_outcome("by_activity", started_at, result.as_ref().map(Vec::len));
        result
    }

    /// Organizations tagged with the named activity or any descendant up to
    /// two generations below it.
    pub fn by_activity_name(&self, root_name: &str) -> QueryResult<Vec<Organization>> {
        let started_at = Instant::now();
        let result = self.by_activity_tree(root_name, ACTIVITY_TREE_MAX_DEPTH);
        log_outcome("by_activity_name", started_at, result.as_ref().map(Vec::len));
        result
    }

    /// Organizations whose building lies within `search.radius_km` of the
    /// center point, boundary included.
    pub fn by_radius(&self, search: &RadiusSearch) -> QueryResult<Vec<Organization>> {
        let started_at = Instant::now();
        let result = search.validate().and_then(|()| self.organizations_in_radius(search));
        log_outcome("by_radius", started_at, result.as_ref().map(Vec::len));
        result
    }

    /// Organizations whose name contains `fragment`, ignoring case.
    ///
    /// An empty fragment matches every organization.
    pub fn by_name_substring(&self, fragment: &str) -> QueryResult<Vec<Organization>> {
        let started_at = Instant::now();
        debug!(
            "event=query module=query op=by_name_substring status=start fragment_chars={}",
            fragment.chars().count()
        );
        let result = self
            .store
            .fetch_organizations_by_name_fragment(fragment)
            .map_err(QueryError::from)
            .and_then(|organizations| {
                non_empty(
                    organizations,
                    NotFoundTarget::OrganizationsByName(fragment.to_string()),
                )
            });
        log_outcome("by_name_substring", started_at, result.as_ref().map(Vec::len));
        result
    }

    /// One organization by id.
    pub fn by_identity(&self, organization_id: OrganizationId) -> QueryResult<Organization> {
        let started_at = Instant::now();
        let result = self
            .store
            .fetch_organization_by_id(organization_id)
            .map_err(QueryError::from)
            .and_then(|organization| {
                organization.ok_or(QueryError::NotFound(NotFoundTarget::Organization(
                    organization_id,
                )))
            });
        log_outcome("by_identity", started_at, result.as_ref().map(|_| 1));
        result
    }

    /// Every building in the store.
    pub fn all_buildings(&self) -> QueryResult<Vec<Building>> {
        let started_at = Instant::now();
        let result = self
            .store
            .fetch_all_buildings()
            .map_err(QueryError::from)
            .and_then(|buildings| {
                if buildings.is_empty() {
                    return Err(QueryError::NotFound(NotFoundTarget::Buildings));
                }
                Ok(buildings)
            });
        log_outcome("all_buildings", started_at, result.as_ref().map(Vec::len));
        result
    }

    /// Resolves building and activity references for response rendering.
    ///
    /// # Errors
    /// - `QueryError::Store` with `StoreError::InvalidData` when an
    ///   organization points at a building the store does not hold.
    pub fn present(&self, organizations: &[Organization]) -> QueryResult<Vec<OrganizationView>> {
        let mut buildings: BTreeMap<BuildingId, Building> = BTreeMap::new();
        for building_id in organizations.iter().map(|org| org.building_id) {
            if buildings.contains_key(&building_id) {
                continue;
            }
            let building = self.store.fetch_building_by_id(building_id)?.ok_or_else(|| {
                StoreError::InvalidData(format!(
                    "organization references missing building {building_id}"
                ))
            })?;
            buildings.insert(building_id, building);
        }

        let activity_ids = organizations
            .iter()
            .flat_map(|org| org.activity_ids.iter().copied())
            .collect::<BTreeSet<_>>();
        let activities = self.store.fetch_activities_by_ids(&activity_ids)?;

        let views = organizations
            .iter()
            .map(|org| OrganizationView {
                id: org.id,
                name: org.name.clone(),
                phone_numbers: org.phone_numbers.clone(),
                building: buildings[&org.building_id].clone(),
                activities: activities
                    .iter()
                    .filter(|activity| org.activity_ids.contains(&activity.id))
                    .cloned()
                    .collect(),
            })
            .collect();
        Ok(views)
    }

    fn by_activity_tree(&self, root_name: &str, max_depth: u32) -> QueryResult<Vec<Organization>> {
        let activity_ids = resolve_subtree(&self.store, root_name, max_depth)?;
        let organizations = self
            .store
            .fetch_organizations_by_activity_ids(&activity_ids)?;
        non_empty(
            organizations,
            NotFoundTarget::OrganizationsInActivityTree(root_name.to_string()),
        )
    }

    fn organizations_in_radius(&self, search: &RadiusSearch) -> QueryResult<Vec<Organization>> {
        let buildings = self.store.fetch_all_buildings()?;
        let building_ids = buildings
            .iter()
            .filter(|building| {
                let distance = distance_km(
                    search.latitude,
                    search.longitude,
                    building.latitude,
                    building.longitude,
                );
                within_radius(distance, search.radius_km)
            })
            .map(|building| building.id)
            .collect::<BTreeSet<_>>();
        debug!(
            "event=radius_filter module=query status=ok scanned={} kept={}",
            buildings.len(),
            building_ids.len()
        );

        let organizations = self
            .store
            .fetch_organizations_by_building_ids(&building_ids)?;
        non_empty(organizations, NotFoundTarget::OrganizationsInRadius)
    }
}

/// Drops repeated organization ids, keeping the first occurrence.
pub fn dedup_by_identity(organizations: Vec<Organization>) -> Vec<Organization> {
    let mut seen = HashSet::with_capacity(organizations.len());
    organizations
        .into_iter()
        .filter(|organization| seen.insert(organization.id))
        .collect()
}

fn non_empty(
    organizations: Vec<Organization>,
    target: NotFoundTarget,
) -> QueryResult<Vec<Organization>> {
    let organizations = dedup_by_identity(organizations);
    if organizations.is_empty() {
        return Err(QueryError::NotFound(target));
    }
    Ok(organizations)
}

fn log_outcome(op: &str, started_at: Instant, outcome: Result<usize, &QueryError>) {
    let duration_ms = started_at.elapsed().as_millis();
    match outcome {
        Ok(count) => info!(
            "event=query module=query op={op} status=ok count={count} duration_ms={duration_ms}"
        ),
        Err(QueryError::Store(err)) => warn!(
            "event=query module=query op={op} status=error error_code=store_failed duration_ms={duration_ms} error={err}"
        ),
        Err(err) => info!(
            "event=query module=query op={op} status=rejected error_code={} duration_ms={duration_ms}",
            err.http_status()
        ),
    }
}
