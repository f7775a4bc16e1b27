//! Directory store contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide the read-only fetch-by-predicate capability set over buildings,
//!   activities, organizations and their membership relation.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Every fetch is a read; no statement issued here writes.
//! - Organizations are returned with their full `activity_ids` set attached.
//! - Results are ordered by ascending id.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::activity::{Activity, ActivityId};
use crate::model::building::{Building, BuildingId};
use crate::model::organization::{Organization, OrganizationId};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

const BUILDING_SELECT_SQL: &str = "SELECT
    id,
    address,
    latitude,
    longitude
FROM buildings";

const ACTIVITY_SELECT_SQL: &str = "SELECT
    id,
    name,
    parent_id
FROM activities";

/// Upper bound on ids bound into one `IN (...)` list; stays under SQLite's
/// smallest default variable limit (999).
const MAX_IDS_PER_STATEMENT: usize = 500;

const ORGANIZATION_SELECT_SQL: &str = "SELECT
    id,
    name,
    phone_numbers,
    building_id
FROM organizations";

/// Result type used by directory store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from directory store operations.
///
/// These are infrastructure failures. Callers treat them as opaque and
/// propagate them unchanged.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "directory store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "directory store requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid directory data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::UninitializedConnection { .. } => None,
            Self::MissingRequiredTable(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Read-only capability set consumed by the query engine.
pub trait DirectoryStore {
    /// Loads one building by id.
    fn fetch_building_by_id(&self, id: BuildingId) -> StoreResult<Option<Building>>;
    /// Lists every building.
    fn fetch_all_buildings(&self) -> StoreResult<Vec<Building>>;
    /// Loads the activity whose name matches exactly.
    fn fetch_activity_by_name(&self, name: &str) -> StoreResult<Option<Activity>>;
    /// Lists direct children of one activity.
    fn fetch_children(&self, parent_id: ActivityId) -> StoreResult<Vec<Activity>>;
    /// Loads the activities named by `ids`; unknown ids are skipped.
    fn fetch_activities_by_ids(&self, ids: &BTreeSet<ActivityId>) -> StoreResult<Vec<Activity>>;
    /// Lists organizations located in one building.
    fn fetch_organizations_by_building_id(
        &self,
        building_id: BuildingId,
    ) -> StoreResult<Vec<Organization>>;
    /// Lists organizations located in any of `building_ids`.
    fn fetch_organizations_by_building_ids(
        &self,
        building_ids: &BTreeSet<BuildingId>,
    ) -> StoreResult<Vec<Organization>>;
    /// Lists organizations tagged with any of `activity_ids`.
    fn fetch_organizations_by_activity_ids(
        &self,
        activity_ids: &BTreeSet<ActivityId>,
    ) -> StoreResult<Vec<Organization>>;
    /// Lists organizations whose name contains `fragment`, ignoring case.
    fn fetch_organizations_by_name_fragment(
        &self,
        fragment: &str,
    ) -> StoreResult<Vec<Organization>>;
    /// Loads one organization by id.
    fn fetch_organization_by_id(&self, id: OrganizationId) -> StoreResult<Option<Organization>>;
}

/// SQLite-backed directory store.
pub struct SqliteDirectoryStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDirectoryStore<'conn> {
    /// Creates a store from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        ensure_directory_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl DirectoryStore for SqliteDirectoryStore<'_> {
    fn fetch_building_by_id(&self, id: BuildingId) -> StoreResult<Option<Building>> {
        let building = self
            .conn
            .query_row(
                &format!("{BUILDING_SELECT_SQL} WHERE id = ?1;"),
                [id],
                parse_building_row,
            )
            .optional()?;
        Ok(building)
    }

    fn fetch_all_buildings(&self) -> StoreResult<Vec<Building>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{BUILDING_SELECT_SQL} ORDER BY id ASC;"))?;
        let buildings = stmt
            .query_map([], parse_building_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(buildings)
    }

    fn fetch_activity_by_name(&self, name: &str) -> StoreResult<Option<Activity>> {
        let activity = self
            .conn
            .query_row(
                &format!("{ACTIVITY_SELECT_SQL} WHERE name = ?1;"),
                [name],
                parse_activity_row,
            )
            .optional()?;
        Ok(activity)
    }

    fn fetch_children(&self, parent_id: ActivityId) -> StoreResult<Vec<Activity>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ACTIVITY_SELECT_SQL} WHERE parent_id = ?1 ORDER BY id ASC;"
        ))?;
        let children = stmt
            .query_map([parent_id], parse_activity_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(children)
    }

    fn fetch_activities_by_ids(&self, ids: &BTreeSet<ActivityId>) -> StoreResult<Vec<Activity>> {
        let ids = ids.iter().copied().collect::<Vec<_>>();
        let mut activities = Vec::with_capacity(ids.len());
        // Chunks of an ordered set stay ordered and disjoint.
        for chunk in ids.chunks(MAX_IDS_PER_STATEMENT) {
            let sql = format!(
                "{ACTIVITY_SELECT_SQL} WHERE id IN ({}) ORDER BY id ASC;",
                placeholders(chunk.len())
            );
            let mut stmt = self.conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(chunk.iter()), parse_activity_row)?;
            for activity in rows {
                activities.push(activity?);
            }
        }
        Ok(activities)
    }

    fn fetch_organizations_by_building_id(
        &self,
        building_id: BuildingId,
    ) -> StoreResult<Vec<Organization>> {
        load_organizations(
            self.conn,
            "WHERE building_id = ?",
            vec![Value::Integer(building_id)],
        )
    }

    fn fetch_organizations_by_building_ids(
        &self,
        building_ids: &BTreeSet<BuildingId>,
    ) -> StoreResult<Vec<Organization>> {
        load_organizations_by_id_chunks(self.conn, building_ids, |list| {
            format!("WHERE building_id IN ({list})")
        })
    }

    fn fetch_organizations_by_activity_ids(
        &self,
        activity_ids: &BTreeSet<ActivityId>,
    ) -> StoreResult<Vec<Organization>> {
        load_organizations_by_id_chunks(self.conn, activity_ids, |list| {
            format!(
                "WHERE id IN (
                    SELECT organization_id
                    FROM organization_activity
                    WHERE activity_id IN ({list})
                )"
            )
        })
    }

    fn fetch_organizations_by_name_fragment(
        &self,
        fragment: &str,
    ) -> StoreResult<Vec<Organization>> {
        // SQLite LIKE only folds ASCII case, so matching happens here.
        let mut organizations = load_organizations(self.conn, "", Vec::new())?;
        organizations.retain(|organization| name_contains_fragment(&organization.name, fragment));
        Ok(organizations)
    }

    fn fetch_organization_by_id(&self, id: OrganizationId) -> StoreResult<Option<Organization>> {
        let mut organizations =
            load_organizations(self.conn, "WHERE id = ?", vec![Value::Integer(id)])?;
        Ok(organizations.pop())
    }
}

/// Case-insensitive substring test over Unicode names.
///
/// An empty fragment matches every name.
pub fn name_contains_fragment(name: &str, fragment: &str) -> bool {
    if fragment.is_empty() {
        return true;
    }
    name.to_lowercase().contains(&fragment.to_lowercase())
}

fn load_organizations(
    conn: &Connection,
    filter_sql: &str,
    bind_values: Vec<Value>,
) -> StoreResult<Vec<Organization>> {
    let sql = format!("{ORGANIZATION_SELECT_SQL} {filter_sql} ORDER BY id ASC;");
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values.iter()))?;

    let mut organizations = Vec::new();
    while let Some(row) = rows.next()? {
        organizations.push(parse_organization_row(row)?);
    }

    attach_activity_ids(conn, &mut organizations, filter_sql, &bind_values)?;
    Ok(organizations)
}

/// Runs one organization load per chunk of `ids` and merges the results in
/// ascending id order without repeats.
fn load_organizations_by_id_chunks(
    conn: &Connection,
    ids: &BTreeSet<i64>,
    filter_for: impl Fn(&str) -> String,
) -> StoreResult<Vec<Organization>> {
    let ids = ids.iter().copied().collect::<Vec<_>>();
    let mut merged: BTreeMap<OrganizationId, Organization> = BTreeMap::new();
    for chunk in ids.chunks(MAX_IDS_PER_STATEMENT) {
        let organizations = load_organizations(
            conn,
            &filter_for(&placeholders(chunk.len())),
            chunk.iter().copied().map(Value::Integer).collect(),
        )?;
        for organization in organizations {
            merged.entry(organization.id).or_insert(organization);
        }
    }
    Ok(merged.into_values().collect())
}

/// Fills `activity_ids` for organizations loaded with `filter_sql`.
///
/// Memberships are selected through the same filter as a subquery, so the
/// bound parameter count does not grow with the number of organizations.
fn attach_activity_ids(
    conn: &Connection,
    organizations: &mut [Organization],
    filter_sql: &str,
    bind_values: &[Value],
) -> StoreResult<()> {
    if organizations.is_empty() {
        return Ok(());
    }

    let sql = format!(
        "SELECT organization_id, activity_id
         FROM organization_activity
         WHERE organization_id IN (SELECT id FROM organizations {filter_sql})
         ORDER BY organization_id ASC, activity_id ASC;"
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values.iter()))?;

    let mut memberships: BTreeMap<OrganizationId, BTreeSet<ActivityId>> = BTreeMap::new();
    while let Some(row) = rows.next()? {
        let organization_id: OrganizationId = row.get(0)?;
        let activity_id: ActivityId = row.get(1)?;
        memberships
            .entry(organization_id)
            .or_default()
            .insert(activity_id);
    }

    for organization in organizations.iter_mut() {
        if let Some(activity_ids) = memberships.remove(&organization.id) {
            organization.activity_ids = activity_ids;
        }
    }
    Ok(())
}

fn parse_building_row(row: &Row<'_>) -> rusqlite::Result<Building> {
    Ok(Building {
        id: row.get("id")?,
        address: row.get("address")?,
        latitude: row.get("latitude")?,
        longitude: row.get("longitude")?,
    })
}

fn parse_activity_row(row: &Row<'_>) -> rusqlite::Result<Activity> {
    Ok(Activity {
        id: row.get("id")?,
        name: row.get("name")?,
        parent_id: row.get("parent_id")?,
    })
}

fn parse_organization_row(row: &Row<'_>) -> StoreResult<Organization> {
    let id: OrganizationId = row.get("id")?;
    let phones_text: String = row.get("phone_numbers")?;
    let phone_numbers = serde_json::from_str::<Vec<String>>(&phones_text).map_err(|err| {
        StoreError::InvalidData(format!(
            "invalid phone_numbers `{phones_text}` in organizations.phone_numbers (id={id}): {err}"
        ))
    })?;

    Ok(Organization {
        id,
        name: row.get("name")?,
        phone_numbers,
        building_id: row.get("building_id")?,
        activity_ids: BTreeSet::new(),
    })
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn ensure_directory_connection_ready(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in [
        "buildings",
        "activities",
        "organizations",
        "organization_activity",
    ] {
        if !table_exists(conn, table)? {
            return Err(StoreError::MissingRequiredTable(table));
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
