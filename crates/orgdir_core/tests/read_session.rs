use orgdir_core::db::{open_db, DbError};
use orgdir_core::{
    seed_demo_data, DirectoryReader, NotFoundTarget, QueryError, StoreError,
};
use rusqlite::{Connection, TransactionBehavior};
use std::path::Path;

fn seeded_file(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("orgdir.db");
    let mut conn = open_db(&path).unwrap();
    seed_demo_data(&mut conn).unwrap();
    path
}

#[test]
fn session_runs_queries_against_file() {
    let dir = tempfile::tempdir().unwrap();
    let reader = DirectoryReader::new(seeded_file(dir.path()));

    let buildings = reader.session(|service| service.all_buildings()).unwrap();
    assert_eq!(buildings.len(), 2);

    let views = reader
        .session(|service| {
            let found = service.by_activity_name("Еда")?;
            service.present(&found)
        })
        .unwrap();
    assert_eq!(views.len(), 2);
}

#[test]
fn session_propagates_domain_errors() {
    let dir = tempfile::tempdir().unwrap();
    let reader = DirectoryReader::new(seeded_file(dir.path()));

    let err = reader
        .session(|service| service.by_identity(12_345))
        .unwrap_err();
    assert!(matches!(
        err,
        QueryError::NotFound(NotFoundTarget::Organization(12_345))
    ));
}

#[test]
fn session_releases_connection_on_every_exit() {
    let dir = tempfile::tempdir().unwrap();
    let path = seeded_file(dir.path());
    let reader = DirectoryReader::new(&path);

    reader.session(|service| service.all_buildings()).unwrap();
    reader
        .session(|service| service.by_name_substring("no such name"))
        .unwrap_err();

    // An exclusive lock is only granted when no reader holds the file.
    let mut writer = Connection::open(&path).unwrap();
    let tx = writer
        .transaction_with_behavior(TransactionBehavior::Exclusive)
        .unwrap();
    tx.execute("DELETE FROM organization_activity;", []).unwrap();
    tx.commit().unwrap();
}

#[test]
fn session_on_missing_database_is_a_store_error() {
    let dir = tempfile::tempdir().unwrap();
    let reader = DirectoryReader::new(dir.path().join("absent.db"));

    let err = reader.session(|service| service.all_buildings()).unwrap_err();
    assert!(matches!(err, QueryError::Store(StoreError::Db(DbError::Sqlite(_)))));
    assert_eq!(err.http_status(), 500);
}

#[test]
fn session_on_unmigrated_database_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("raw.db");
    Connection::open(&path)
        .unwrap()
        .execute_batch("CREATE TABLE placeholder (id INTEGER);")
        .unwrap();

    let err = DirectoryReader::new(&path)
        .session(|service| service.all_buildings())
        .unwrap_err();
    assert!(matches!(
        err,
        QueryError::Store(StoreError::Db(DbError::SchemaNotReady { .. }))
    ));
}
