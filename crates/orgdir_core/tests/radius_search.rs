use orgdir_core::db::open_db_in_memory;
use orgdir_core::{
    distance_km, seed_demo_data, Building, DirectorySeeder, NewOrganization, NotFoundTarget,
    Organization, QueryError, QueryService, RadiusSearch, SqliteDirectoryStore,
};
use rusqlite::Connection;
use std::collections::BTreeSet;

/// Two buildings on the equator about 12 km apart, one organization each.
struct TwoBuildings {
    conn: Connection,
    a: Building,
    b: Building,
    org_a: Organization,
    org_b: Organization,
}

fn two_buildings() -> TwoBuildings {
    let conn = open_db_in_memory().unwrap();
    let (a, b, org_a, org_b) = {
        let seeder = DirectorySeeder::try_new(&conn).unwrap();
        let a = seeder.insert_building("Equator 0", 0.0, 0.0).unwrap();
        let b = seeder.insert_building("Equator 12", 0.0, 0.108).unwrap();
        let org_a = seeder
            .insert_organization(&NewOrganization {
                name: "West Office".to_string(),
                phone_numbers: Vec::new(),
                building_id: a.id,
                activity_ids: BTreeSet::new(),
            })
            .unwrap();
        let org_b = seeder
            .insert_organization(&NewOrganization {
                name: "East Office".to_string(),
                phone_numbers: Vec::new(),
                building_id: b.id,
                activity_ids: BTreeSet::new(),
            })
            .unwrap();
        (a, b, org_a, org_b)
    };
    TwoBuildings {
        conn,
        a,
        b,
        org_a,
        org_b,
    }
}

fn ids(organizations: &[Organization]) -> BTreeSet<i64> {
    organizations.iter().map(|org| org.id).collect()
}

#[test]
fn fixture_buildings_are_twelve_km_apart() {
    let fixture = two_buildings();
    let distance = distance_km(
        fixture.a.latitude,
        fixture.a.longitude,
        fixture.b.latitude,
        fixture.b.longitude,
    );
    assert!((distance - 12.0).abs() < 0.05, "got {distance}");
}

#[test]
fn radius_ten_from_a_finds_only_a() {
    let fixture = two_buildings();
    let service = QueryService::new(SqliteDirectoryStore::try_new(&fixture.conn).unwrap());

    let found = service
        .by_radius(&RadiusSearch::new(
            fixture.a.latitude,
            fixture.a.longitude,
            10.0,
        ))
        .unwrap();
    assert_eq!(ids(&found), BTreeSet::from([fixture.org_a.id]));
}

#[test]
fn radius_fifteen_from_a_finds_both() {
    let fixture = two_buildings();
    let service = QueryService::new(SqliteDirectoryStore::try_new(&fixture.conn).unwrap());

    let found = service
        .by_radius(&RadiusSearch::new(
            fixture.a.latitude,
            fixture.a.longitude,
            15.0,
        ))
        .unwrap();
    assert_eq!(
        ids(&found),
        BTreeSet::from([fixture.org_a.id, fixture.org_b.id])
    );
}

#[test]
fn radius_boundary_is_inclusive() {
    let fixture = two_buildings();
    let service = QueryService::new(SqliteDirectoryStore::try_new(&fixture.conn).unwrap());
    let exact = distance_km(
        fixture.a.latitude,
        fixture.a.longitude,
        fixture.b.latitude,
        fixture.b.longitude,
    );

    let on_boundary = service
        .by_radius(&RadiusSearch::new(
            fixture.a.latitude,
            fixture.a.longitude,
            exact,
        ))
        .unwrap();
    assert!(ids(&on_boundary).contains(&fixture.org_b.id));

    let just_short = service
        .by_radius(&RadiusSearch::new(
            fixture.a.latitude,
            fixture.a.longitude,
            exact - 1e-9,
        ))
        .unwrap();
    assert!(!ids(&just_short).contains(&fixture.org_b.id));
}

#[test]
fn tiny_radius_at_building_coordinates_includes_it() {
    let fixture = two_buildings();
    let service = QueryService::new(SqliteDirectoryStore::try_new(&fixture.conn).unwrap());

    let found = service
        .by_radius(&RadiusSearch::new(
            fixture.b.latitude,
            fixture.b.longitude,
            f64::MIN_POSITIVE,
        ))
        .unwrap();
    assert_eq!(ids(&found), BTreeSet::from([fixture.org_b.id]));
}

#[test]
fn non_positive_radius_is_a_validation_error() {
    let fixture = two_buildings();
    let service = QueryService::new(SqliteDirectoryStore::try_new(&fixture.conn).unwrap());

    for radius in [0.0, -5.0] {
        let err = service
            .by_radius(&RadiusSearch::new(
                fixture.a.latitude,
                fixture.a.longitude,
                radius,
            ))
            .unwrap_err();
        assert!(matches!(err, QueryError::Validation(_)));
    }
}

#[test]
fn empty_radius_is_not_found() {
    let fixture = two_buildings();
    let service = QueryService::new(SqliteDirectoryStore::try_new(&fixture.conn).unwrap());

    let err = service
        .by_radius(&RadiusSearch::new(45.0, 45.0, 100.0))
        .unwrap_err();
    assert!(matches!(
        err,
        QueryError::NotFound(NotFoundTarget::OrganizationsInRadius)
    ));
}

#[test]
fn demo_buildings_are_two_km_apart() {
    let mut conn = open_db_in_memory().unwrap();
    seed_demo_data(&mut conn).unwrap();
    let service = QueryService::new(SqliteDirectoryStore::try_new(&conn).unwrap());

    let near = service
        .by_radius(&RadiusSearch::new(55.7558, 37.6173, 1.0))
        .unwrap();
    assert_eq!(near.len(), 2);

    let wide = service
        .by_radius(&RadiusSearch::new(55.7558, 37.6173, 2.5))
        .unwrap();
    assert_eq!(wide.len(), 4);
}
