use parcel_core::db::{ensure_schema, open_db, open_db_in_memory};
use parcel_core::{
    Parcel, ParcelRepository, ParcelService, ParcelServiceError, ParcelStatus, RepoError,
    SqliteParcelRepository,
};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_creates_parcel_table() {
    let conn = open_db_in_memory().unwrap();
    assert_table_exists(&conn, "parcel");
}

#[test]
fn reopening_file_database_keeps_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tracker.db");

    let number = {
        let conn = open_db(&path).unwrap();
        let repo = SqliteParcelRepository::try_new(&conn).unwrap();
        repo.add(&Parcel::new(5, "kept")).unwrap()
    };

    let conn = open_db(&path).unwrap();
    let repo = SqliteParcelRepository::try_new(&conn).unwrap();
    assert_eq!(repo.get(number).unwrap().address, "kept");
}

#[test]
fn ensure_schema_is_idempotent() {
    let conn = Connection::open_in_memory().unwrap();
    ensure_schema(&conn).unwrap();
    ensure_schema(&conn).unwrap();
    assert_table_exists(&conn, "parcel");
}

#[test]
fn repository_rejects_connection_without_parcel_table() {
    let conn = Connection::open_in_memory().unwrap();

    let result = SqliteParcelRepository::try_new(&conn);
    assert!(matches!(result, Err(RepoError::MissingRequiredTable("parcel"))));
}

#[test]
fn repository_rejects_parcel_table_missing_column() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE parcel (
            number INTEGER PRIMARY KEY AUTOINCREMENT,
            client INTEGER NOT NULL,
            status TEXT NOT NULL,
            address TEXT NOT NULL
        );",
    )
    .unwrap();

    let result = SqliteParcelRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredColumn {
            table: "parcel",
            column: "created_at"
        })
    ));
}

#[test]
fn storage_failure_surfaces_as_db_error_on_every_operation() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteParcelRepository::try_new(&conn).unwrap();
    conn.execute_batch("DROP TABLE parcel;").unwrap();

    let results = [
        ("add", repo.add(&Parcel::new(1, "addr")).map(|_| ())),
        ("get", repo.get(1).map(|_| ())),
        ("get_by_client", repo.get_by_client(1).map(|_| ())),
        ("set_status", repo.set_status(1, &ParcelStatus::Sent)),
        ("set_address", repo.set_address(1, "addr")),
        ("delete", repo.delete(1)),
    ];

    for (operation, result) in results {
        let err = result.unwrap_err();
        assert!(
            matches!(err, RepoError::Db(_)),
            "{operation} returned {err:?}"
        );
        assert!(std::error::Error::source(&err).is_some());
    }
}

#[test]
fn service_runs_full_lifecycle_on_sqlite() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteParcelRepository::try_new(&conn).unwrap();
    let service = ParcelService::new(repo);

    let parcel = service.register(77, "Lenina 1").unwrap();
    let number = parcel.number.unwrap();

    assert!(service.change_address(number, "Lenina 2").unwrap());
    assert_eq!(
        service.next_status(number).unwrap(),
        Some(ParcelStatus::Sent)
    );
    assert!(!service.change_address(number, "ignored").unwrap());

    let stored = service.parcel(number).unwrap();
    assert_eq!(stored.address, "Lenina 2");
    assert_eq!(stored.status, ParcelStatus::Sent);
    assert_eq!(stored.created_at, parcel.created_at);

    let fresh = service.register(77, "Lenina 3").unwrap();
    assert!(service.delete(fresh.number.unwrap()).unwrap());
    assert_eq!(service.client_parcels(77).unwrap(), vec![stored]);

    assert!(matches!(
        service.parcel(fresh.number.unwrap()),
        Err(ParcelServiceError::ParcelNotFound(_))
    ));
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
