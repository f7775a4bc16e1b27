//! Directory seeding and administration write path.
//!
//! # Responsibility
//! - Insert buildings, activities and organizations with referential checks.
//! - Load the bundled demo dataset.
//!
//! # Invariants
//! - Activity nesting never exceeds three levels (root plus two generations).
//! - Organizations reference an existing building and existing activities.
//! - `seed_demo_data` replaces all directory data atomically.

use crate::db::migrations::latest_version;
use crate::db::{DbError, DbResult};
use crate::model::activity::{Activity, ActivityId, ACTIVITY_TREE_MAX_DEPTH};
use crate::model::building::{Building, BuildingId};
use crate::model::organization::Organization;
use crate::model::ModelValidationError;
use log::info;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SeedResult<T> = Result<T, SeedError>;

#[derive(Debug)]
pub enum SeedError {
    Validation(ModelValidationError),
    BuildingNotFound(BuildingId),
    ActivityNotFound(ActivityId),
    DuplicateActivityName(String),
    /// Insert would put an activity below the deepest allowed level.
    ActivityTooDeep { name: String, max_levels: u32 },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    Db(DbError),
}

impl Display for SeedError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::BuildingNotFound(id) => write!(f, "building not found: {id}"),
            Self::ActivityNotFound(id) => write!(f, "activity not found: {id}"),
            Self::DuplicateActivityName(name) => {
                write!(f, "activity name already exists: {name}")
            }
            Self::ActivityTooDeep { name, max_levels } => write!(
                f,
                "activity `{name}` would exceed {max_levels} levels of nesting"
            ),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "seeding requires schema version {expected_version}, got {actual_version}"
            ),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SeedError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ModelValidationError> for SeedError {
    fn from(value: ModelValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for SeedError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for SeedError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Insert request for one organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrganization {
    pub name: String,
    pub phone_numbers: Vec<String>,
    pub building_id: BuildingId,
    pub activity_ids: BTreeSet<ActivityId>,
}

/// Row counts after a seeding run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub buildings: usize,
    pub activities: usize,
    pub organizations: usize,
}

/// Writer for directory data.
pub struct DirectorySeeder<'conn> {
    conn: &'conn Connection,
}

impl<'conn> DirectorySeeder<'conn> {
    /// Creates a seeder from a migrated read-write connection.
    pub fn try_new(conn: &'conn Connection) -> SeedResult<Self> {
        let expected_version = latest_version();
        let actual_version: u32 =
            conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
        if actual_version != expected_version {
            return Err(SeedError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self { conn })
    }

    /// Removes every directory row.
    pub fn clear(&self) -> SeedResult<()> {
        self.conn.execute_batch(
            "DELETE FROM organization_activity;
             DELETE FROM organizations;
             DELETE FROM activities;
             DELETE FROM buildings;",
        )?;
        Ok(())
    }

    pub fn insert_building(
        &self,
        address: &str,
        latitude: f64,
        longitude: f64,
    ) -> SeedResult<Building> {
        let mut building = Building {
            id: 0,
            address: address.trim().to_string(),
            latitude,
            longitude,
        };
        building.validate()?;

        self.conn.execute(
            "INSERT INTO buildings (address, latitude, longitude) VALUES (?1, ?2, ?3);",
            params![building.address, building.latitude, building.longitude],
        )?;
        building.id = self.conn.last_insert_rowid();
        Ok(building)
    }

    /// Inserts an activity under an optional parent.
    ///
    /// # Errors
    /// - `DuplicateActivityName` when the name is taken.
    /// - `ActivityNotFound` when `parent_id` does not exist.
    /// - `ActivityTooDeep` when the parent already sits on the deepest level.
    pub fn insert_activity(
        &self,
        name: &str,
        parent_id: Option<ActivityId>,
    ) -> SeedResult<Activity> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ModelValidationError::BlankField("activity name").into());
        }
        if self.activity_name_exists(name)? {
            return Err(SeedError::DuplicateActivityName(name.to_string()));
        }
        if let Some(parent_id) = parent_id {
            if self.activity_level(parent_id)? >= ACTIVITY_TREE_MAX_DEPTH {
                return Err(SeedError::ActivityTooDeep {
                    name: name.to_string(),
                    max_levels: ACTIVITY_TREE_MAX_DEPTH + 1,
                });
            }
        }

        self.conn.execute(
            "INSERT INTO activities (name, parent_id) VALUES (?1, ?2);",
            params![name, parent_id],
        )?;
        Ok(Activity {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
            parent_id,
        })
    }

    /// Inserts an organization and its activity memberships.
    pub fn insert_organization(&self, request: &NewOrganization) -> SeedResult<Organization> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(ModelValidationError::BlankField("organization name").into());
        }
        if !self.row_exists("buildings", request.building_id)? {
            return Err(SeedError::BuildingNotFound(request.building_id));
        }
        for activity_id in &request.activity_ids {
            if !self.row_exists("activities", *activity_id)? {
                return Err(SeedError::ActivityNotFound(*activity_id));
            }
        }

        let phones = serde_json::to_string(&request.phone_numbers).map_err(|err| {
            DbError::Sqlite(rusqlite::Error::ToSqlConversionFailure(Box::new(err)))
        })?;
        self.conn.execute(
            "INSERT INTO organizations (name, phone_numbers, building_id) VALUES (?1, ?2, ?3);",
            params![name, phones, request.building_id],
        )?;
        let id = self.conn.last_insert_rowid();

        for activity_id in &request.activity_ids {
            self.conn.execute(
                "INSERT INTO organization_activity (organization_id, activity_id) VALUES (?1, ?2);",
                params![id, activity_id],
            )?;
        }

        Ok(Organization {
            id,
            name: name.to_string(),
            phone_numbers: request.phone_numbers.clone(),
            building_id: request.building_id,
            activity_ids: request.activity_ids.clone(),
        })
    }

    /// Current row counts.
    pub fn summary(&self) -> SeedResult<SeedSummary> {
        Ok(SeedSummary {
            buildings: count_rows(self.conn, "buildings")?,
            activities: count_rows(self.conn, "activities")?,
            organizations: count_rows(self.conn, "organizations")?,
        })
    }

    fn activity_name_exists(&self, name: &str) -> SeedResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM activities WHERE name = ?1);",
            [name],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    /// Zero-based level of an existing activity (root = 0).
    fn activity_level(&self, activity_id: ActivityId) -> SeedResult<u32> {
        let mut level = 0;
        let mut cursor = activity_id;
        loop {
            let parent: Option<ActivityId> = self
                .conn
                .query_row(
                    "SELECT parent_id FROM activities WHERE id = ?1;",
                    [cursor],
                    |row| row.get(0),
                )
                .optional()?
                .ok_or(SeedError::ActivityNotFound(cursor))?;

            match parent {
                // Anything past the deepest level is already too deep.
                Some(_) if level > ACTIVITY_TREE_MAX_DEPTH => return Ok(level),
                Some(parent_id) => {
                    level += 1;
                    cursor = parent_id;
                }
                None => return Ok(level),
            }
        }
    }

    fn row_exists(&self, table: &'static str, id: i64) -> SeedResult<bool> {
        let exists: i64 = self.conn.query_row(
            &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1);"),
            [id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}

fn count_rows(conn: &Connection, table: &'static str) -> DbResult<usize> {
    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })?;
    row_count(count)
}

fn row_count(count: i64) -> DbResult<usize> {
    usize::try_from(count)
        .map_err(|_| DbError::Sqlite(rusqlite::Error::IntegralValueOutOfRange(0, count)))
}

/// Replaces all directory data with the demo dataset: two buildings in
/// Moscow, an eight-node activity forest three levels deep, and four
/// organizations.
pub fn seed_demo_data(conn: &mut Connection) -> SeedResult<SeedSummary> {
    let tx = conn.transaction()?;
    let summary = {
        let seeder = DirectorySeeder::try_new(&tx)?;
        seeder.clear()?;

        let lenina = seeder.insert_building("г. Москва, ул. Ленина 1, офис 3", 55.7558, 37.6173)?;
        let blyukhera = seeder.insert_building("г. Москва, ул. Блюхера 32/1", 55.7650, 37.5900)?;

        let food = seeder.insert_activity("Еда", None)?;
        let cars = seeder.insert_activity("Автомобили", None)?;
        let meat = seeder.insert_activity("Мясная продукция", Some(food.id))?;
        let dairy = seeder.insert_activity("Молочная продукция", Some(food.id))?;
        let trucks = seeder.insert_activity("Грузовые", Some(cars.id))?;
        let passenger = seeder.insert_activity("Легковые", Some(cars.id))?;
        let parts = seeder.insert_activity("Запчасти", Some(passenger.id))?;
        seeder.insert_activity("Аксессуары", Some(passenger.id))?;

        let organizations = [
            (
                "ООО “Рога и Копыта”",
                vec!["2-222-222", "3-333-333"],
                lenina.id,
                vec![food.id, meat.id],
            ),
            (
                "ООО “МолокоДел”",
                vec!["8-923-666-13-13"],
                lenina.id,
                vec![food.id, dairy.id],
            ),
            (
                "ООО “Грузовики Плюс”",
                vec!["1-111-111"],
                blyukhera.id,
                vec![cars.id, trucks.id],
            ),
            (
                "АвтоЗапчасти",
                vec!["4-444-444"],
                blyukhera.id,
                vec![cars.id, passenger.id, parts.id],
            ),
        ];
        for (name, phones, building_id, activity_ids) in organizations {
            seeder.insert_organization(&NewOrganization {
                name: name.to_string(),
                phone_numbers: phones.into_iter().map(str::to_string).collect(),
                building_id,
                activity_ids: activity_ids.into_iter().collect(),
            })?;
        }

        seeder.summary()?
    };
    tx.commit()?;

    info!(
        "event=seed module=seed status=ok buildings={} activities={} organizations={}",
        summary.buildings, summary.activities, summary.organizations
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::row_count;
    use crate::db::DbError;

    #[test]
    fn row_count_rejects_negative_values() {
        assert_eq!(row_count(4).unwrap(), 4);
        assert!(matches!(
            row_count(-1),
            Err(DbError::Sqlite(rusqlite::Error::IntegralValueOutOfRange(
                0,
                -1
            )))
        ));
    }
}
