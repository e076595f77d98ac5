use rusqlite::Connection;
use serde_json::{json, Value};
use tacom_core::db::open_db_in_memory;
use tacom_core::{BridgeError, Equipment, HostBridge, Role, RowData, SqliteTableBridge, TableRow};

fn row(value: Value) -> RowData {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

#[test]
fn try_new_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();
    let err = SqliteTableBridge::try_new(&conn).err().unwrap();
    assert!(matches!(err, BridgeError::UninitializedConnection { .. }));
}

#[test]
fn insert_assigns_id_and_returns_stored_defaults() {
    let conn = open_db_in_memory().unwrap();
    let bridge = SqliteTableBridge::try_new(&conn).unwrap();

    let stored = bridge
        .insert_into_table("equipments", row(json!({"name": "Crane"})))
        .unwrap();

    assert!(!stored.id().is_empty());
    assert_eq!(stored.get("status"), Some(&json!("available")));
    assert_eq!(stored.get("quantity"), Some(&json!(1)));

    let typed: Equipment = stored.into_record().unwrap();
    assert_eq!(typed.name, "Crane");
}

#[test]
fn insert_keeps_caller_id_and_rejects_non_string_ids() {
    let conn = open_db_in_memory().unwrap();
    let bridge = SqliteTableBridge::try_new(&conn).unwrap();

    let stored = bridge
        .insert_into_table("companies", row(json!({"id": "c-1", "name": "TACOM"})))
        .unwrap();
    assert_eq!(stored.id(), "c-1");

    let err = bridge
        .insert_into_table("companies", row(json!({"id": 5, "name": "Other"})))
        .unwrap_err();
    assert!(matches!(err, BridgeError::InvalidRow(_)));
}

#[test]
fn get_all_filters_by_every_entry_in_storage_order() {
    let conn = open_db_in_memory().unwrap();
    let bridge = SqliteTableBridge::try_new(&conn).unwrap();
    for (name, status) in [("A", "available"), ("B", "rented"), ("C", "available")] {
        bridge
            .insert_into_table("equipments", row(json!({"name": name, "status": status})))
            .unwrap();
    }

    let available = bridge
        .get_all_from_table("equipments", &row(json!({"status": "available"})))
        .unwrap();
    let names: Vec<&Value> = available.iter().filter_map(|r| r.get("name")).collect();
    assert_eq!(names, vec![&json!("A"), &json!("C")]);

    let narrowed = bridge
        .get_all_from_table(
            "equipments",
            &row(json!({"status": "available", "name": "C"})),
        )
        .unwrap();
    assert_eq!(narrowed.len(), 1);

    let everything = bridge
        .get_all_from_table("equipments", &RowData::new())
        .unwrap();
    assert_eq!(everything.len(), 3);
}

#[test]
fn rejects_unknown_tables_and_columns() {
    let conn = open_db_in_memory().unwrap();
    let bridge = SqliteTableBridge::try_new(&conn).unwrap();

    let err = bridge
        .get_all_from_table("session_kv", &RowData::new())
        .unwrap_err();
    assert!(matches!(err, BridgeError::UnknownTable(table) if table == "session_kv"));

    let err = bridge
        .insert_into_table("companies", row(json!({"name": "X", "color": "red"})))
        .unwrap_err();
    assert!(matches!(err, BridgeError::UnknownColumn { column, .. } if column == "color"));
}

#[test]
fn update_and_delete_report_whether_a_row_changed() {
    let conn = open_db_in_memory().unwrap();
    let bridge = SqliteTableBridge::try_new(&conn).unwrap();
    let stored = bridge
        .insert_into_table("companies", row(json!({"name": "Old"})))
        .unwrap();

    assert!(bridge
        .update_in_table("companies", stored.id(), &row(json!({"name": "New"})))
        .unwrap());
    assert!(!bridge
        .update_in_table("companies", "missing", &row(json!({"name": "New"})))
        .unwrap());

    let reloaded = bridge
        .get_all_from_table("companies", &row(json!({"id": stored.id()})))
        .unwrap();
    assert_eq!(reloaded[0].get("name"), Some(&json!("New")));

    assert!(bridge.delete_from_table("companies", stored.id()).unwrap());
    assert!(!bridge.delete_from_table("companies", stored.id()).unwrap());
}

#[test]
fn update_ignores_id_in_patch() {
    let conn = open_db_in_memory().unwrap();
    let bridge = SqliteTableBridge::try_new(&conn).unwrap();
    let stored = bridge
        .insert_into_table("companies", row(json!({"id": "c-1", "name": "Old"})))
        .unwrap();

    bridge
        .update_in_table(
            "companies",
            stored.id(),
            &row(json!({"id": "c-2", "name": "Renamed"})),
        )
        .unwrap();

    let rows = bridge
        .get_all_from_table("companies", &RowData::new())
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id(), "c-1");
}

#[test]
fn users_rows_never_expose_password_columns() {
    let conn = open_db_in_memory().unwrap();
    let bridge = SqliteTableBridge::try_new(&conn).unwrap();
    bridge
        .create_user("ana", "Ana", Role::Operational, "pw")
        .unwrap();

    let users: Vec<TableRow> = bridge
        .get_all_from_table("users", &RowData::new())
        .unwrap();
    assert_eq!(users.len(), 1);
    assert!(users[0].get("password_hash").is_none());

    let err = bridge
        .update_in_table(
            "users",
            users[0].id(),
            &row(json!({"password_hash": "forged"})),
        )
        .unwrap_err();
    assert!(matches!(err, BridgeError::UnknownColumn { .. }));
}

#[test]
fn login_checks_username_and_secret() {
    let conn = open_db_in_memory().unwrap();
    let bridge = SqliteTableBridge::try_new(&conn).unwrap();
    let account = bridge
        .create_user("rui", "Rui", Role::Operational, "s3cret")
        .unwrap();

    let identity = bridge.login("rui", "s3cret").unwrap().unwrap();
    assert_eq!(identity.id, account.id);
    assert_eq!(identity.role, Role::Operational);

    assert!(bridge.login("rui", "wrong").unwrap().is_none());
    assert!(bridge.login("nobody", "s3cret").unwrap().is_none());
}

#[test]
fn passwords_are_stored_as_argon2_phc_strings() {
    let conn = open_db_in_memory().unwrap();
    let bridge = SqliteTableBridge::try_new(&conn).unwrap();
    let account = bridge
        .create_user("ana", "Ana", Role::Operational, "pw")
        .unwrap();

    let stored: String = conn
        .query_row(
            "SELECT password_hash FROM users WHERE id = ?1;",
            [account.id.as_str()],
            |row| row.get(0),
        )
        .unwrap();
    assert!(stored.starts_with("$argon2"));
    assert!(!stored.contains("pw"));

    conn.execute(
        "UPDATE users SET password_hash = 'not-a-phc-string' WHERE id = ?1;",
        [account.id.as_str()],
    )
    .unwrap();
    let err = bridge.login("ana", "pw").unwrap_err();
    assert!(matches!(err, BridgeError::Password(_)));
}
