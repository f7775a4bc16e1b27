use orgdir_core::db::open_db_in_memory;
use orgdir_core::{
    resolve_subtree, Activity, ActivityId, Building, BuildingId, DirectorySeeder, DirectoryStore,
    NotFoundTarget, Organization, OrganizationId, QueryError, SqliteDirectoryStore, StoreResult,
    ACTIVITY_TREE_MAX_DEPTH,
};
use rusqlite::Connection;
use std::cell::Cell;
use std::collections::BTreeSet;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

/// Inserts a parent chain directly, bypassing the seeder's nesting limit.
fn insert_chain(conn: &Connection, names: &[&str]) -> Vec<ActivityId> {
    let mut ids = Vec::new();
    let mut parent: Option<ActivityId> = None;
    for name in names {
        conn.execute(
            "INSERT INTO activities (name, parent_id) VALUES (?1, ?2);",
            rusqlite::params![name, parent],
        )
        .unwrap();
        let id = conn.last_insert_rowid();
        ids.push(id);
        parent = Some(id);
    }
    ids
}

#[test]
fn childless_root_resolves_to_itself() {
    let conn = setup();
    let seeder = DirectorySeeder::try_new(&conn).unwrap();
    let root = seeder.insert_activity("Lonely", None).unwrap();

    let store = SqliteDirectoryStore::try_new(&conn).unwrap();
    let ids = resolve_subtree(&store, "Lonely", ACTIVITY_TREE_MAX_DEPTH).unwrap();
    assert_eq!(ids, BTreeSet::from([root.id]));
}

#[test]
fn resolves_root_and_two_generations() {
    let conn = setup();
    let seeder = DirectorySeeder::try_new(&conn).unwrap();
    let food = seeder.insert_activity("Food", None).unwrap();
    let meat = seeder.insert_activity("Meat", Some(food.id)).unwrap();
    let dairy = seeder.insert_activity("Dairy", Some(food.id)).unwrap();
    let cheese = seeder.insert_activity("Cheese", Some(dairy.id)).unwrap();
    seeder.insert_activity("Cars", None).unwrap();

    let store = SqliteDirectoryStore::try_new(&conn).unwrap();
    let ids = resolve_subtree(&store, "Food", 2).unwrap();
    assert_eq!(ids, BTreeSet::from([food.id, meat.id, dairy.id, cheese.id]));

    let subtree = resolve_subtree(&store, "Dairy", 2).unwrap();
    assert_eq!(subtree, BTreeSet::from([dairy.id, cheese.id]));
}

#[test]
fn descendants_beyond_max_depth_are_excluded() {
    let conn = setup();
    let ids = insert_chain(&conn, &["L0", "L1", "L2", "L3", "L4"]);

    let store = SqliteDirectoryStore::try_new(&conn).unwrap();
    let resolved = resolve_subtree(&store, "L0", ACTIVITY_TREE_MAX_DEPTH).unwrap();
    assert_eq!(resolved, BTreeSet::from([ids[0], ids[1], ids[2]]));

    assert_eq!(
        resolve_subtree(&store, "L0", 0).unwrap(),
        BTreeSet::from([ids[0]])
    );
    assert_eq!(
        resolve_subtree(&store, "L1", 3).unwrap(),
        BTreeSet::from([ids[1], ids[2], ids[3], ids[4]])
    );
}

#[test]
fn unknown_root_name_is_not_found() {
    let conn = setup();
    let store = SqliteDirectoryStore::try_new(&conn).unwrap();

    let err = resolve_subtree(&store, "Missing", 2).unwrap_err();
    assert!(matches!(
        err,
        QueryError::NotFound(NotFoundTarget::ActivityName(name)) if name == "Missing"
    ));
}

#[test]
fn root_name_match_is_exact() {
    let conn = setup();
    let seeder = DirectorySeeder::try_new(&conn).unwrap();
    seeder.insert_activity("Food", None).unwrap();

    let store = SqliteDirectoryStore::try_new(&conn).unwrap();
    assert!(resolve_subtree(&store, "food", 2).unwrap_err().is_not_found());
    assert!(resolve_subtree(&store, "Foo", 2).unwrap_err().is_not_found());
}

#[test]
fn cyclic_parent_relation_terminates() {
    let conn = setup();
    let ids = insert_chain(&conn, &["A", "B", "C"]);
    conn.execute(
        "UPDATE activities SET parent_id = ?1 WHERE id = ?2;",
        [ids[2], ids[0]],
    )
    .unwrap();

    let store = SqliteDirectoryStore::try_new(&conn).unwrap();
    let resolved = resolve_subtree(&store, "A", 10).unwrap();
    assert_eq!(resolved, BTreeSet::from([ids[0], ids[1], ids[2]]));
}

/// Store whose activity relation is a self-loop and which counts child
/// fetches.
struct SelfLoopStore {
    child_fetches: Cell<u32>,
}

impl DirectoryStore for SelfLoopStore {
    fn fetch_building_by_id(&self, _id: BuildingId) -> StoreResult<Option<Building>> {
        Ok(None)
    }

    fn fetch_all_buildings(&self) -> StoreResult<Vec<Building>> {
        Ok(Vec::new())
    }

    fn fetch_activity_by_name(&self, name: &str) -> StoreResult<Option<Activity>> {
        Ok(Some(Activity {
            id: 1,
            name: name.to_string(),
            parent_id: Some(1),
        }))
    }

    fn fetch_children(&self, parent_id: ActivityId) -> StoreResult<Vec<Activity>> {
        self.child_fetches.set(self.child_fetches.get() + 1);
        Ok(vec![Activity {
            id: parent_id,
            name: "loop".to_string(),
            parent_id: Some(parent_id),
        }])
    }

    fn fetch_activities_by_ids(&self, _ids: &BTreeSet<ActivityId>) -> StoreResult<Vec<Activity>> {
        Ok(Vec::new())
    }

    fn fetch_organizations_by_building_id(
        &self,
        _building_id: BuildingId,
    ) -> StoreResult<Vec<Organization>> {
        Ok(Vec::new())
    }

    fn fetch_organizations_by_building_ids(
        &self,
        _building_ids: &BTreeSet<BuildingId>,
    ) -> StoreResult<Vec<Organization>> {
        Ok(Vec::new())
    }

    fn fetch_organizations_by_activity_ids(
        &self,
        _activity_ids: &BTreeSet<ActivityId>,
    ) -> StoreResult<Vec<Organization>> {
        Ok(Vec::new())
    }

    fn fetch_organizations_by_name_fragment(
        &self,
        _fragment: &str,
    ) -> StoreResult<Vec<Organization>> {
        Ok(Vec::new())
    }

    fn fetch_organization_by_id(&self, _id: OrganizationId) -> StoreResult<Option<Organization>> {
        Ok(None)
    }
}

#[test]
fn self_loop_is_expanded_at_most_once_per_layer() {
    let store = SelfLoopStore {
        child_fetches: Cell::new(0),
    };

    let resolved = resolve_subtree(&store, "Ouroboros", ACTIVITY_TREE_MAX_DEPTH).unwrap();
    assert_eq!(resolved, BTreeSet::from([1]));
    assert!(store.child_fetches.get() <= ACTIVITY_TREE_MAX_DEPTH);
}
