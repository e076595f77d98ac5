use rusqlite::Connection;
use tacom_core::db::open_db_in_memory;
use tacom_core::{
    AccessAdapter, AppModule, Capabilities, GrantRepository, Identity, ModuleKey,
    ModuleNamespace, PermissionAction, PermissionEngine, PermissionError, PermissionGrant,
    ReportModule, RepoError, Role, SqliteGrantRepository, SqliteTableBridge,
};

fn create_user(conn: &Connection, username: &str, role: Role) -> Identity {
    let bridge = SqliteTableBridge::try_new(conn).unwrap();
    bridge
        .create_user(username, username, role, "pw")
        .unwrap()
        .identity()
}

#[test]
fn grant_repository_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();
    let err = SqliteGrantRepository::try_new(&conn).err().unwrap();
    assert!(matches!(err, RepoError::UninitializedConnection { .. }));
}

#[test]
fn administrator_is_allowed_everything_without_grants() {
    let conn = open_db_in_memory().unwrap();
    let admin = create_user(&conn, "boss", Role::Administrator);
    let mut engine = PermissionEngine::new(SqliteGrantRepository::try_new(&conn).unwrap());
    engine.load_for(&admin).unwrap();

    for namespace in [ModuleNamespace::App, ModuleNamespace::Report] {
        for module in namespace.keys() {
            for action in PermissionAction::ALL {
                assert!(engine.can(&admin, module, action), "{module} {action:?}");
            }
        }
    }
}

#[test]
fn operational_user_without_grant_is_denied() {
    let conn = open_db_in_memory().unwrap();
    let user = create_user(&conn, "ana", Role::Operational);
    let mut engine = PermissionEngine::new(SqliteGrantRepository::try_new(&conn).unwrap());

    assert!(!engine.can(&user, AppModule::Equipments, PermissionAction::View));
    engine.load_for(&user).unwrap();
    assert!(!engine.can(&user, AppModule::Equipments, PermissionAction::View));
}

#[test]
fn view_only_grant_allows_view_and_nothing_else() {
    let conn = open_db_in_memory().unwrap();
    let admin = create_user(&conn, "boss", Role::Administrator);
    let user = create_user(&conn, "ana", Role::Operational);
    let mut engine = PermissionEngine::new(SqliteGrantRepository::try_new(&conn).unwrap());

    engine
        .save_grants(
            &admin,
            &user.id,
            ModuleNamespace::App,
            &[PermissionGrant::new(
                user.id.clone(),
                AppModule::Companies,
                Capabilities::view_only(),
            )],
        )
        .unwrap();
    engine.load_for(&user).unwrap();

    assert!(engine.can(&user, AppModule::Companies, PermissionAction::View));
    assert!(!engine.can(&user, AppModule::Companies, PermissionAction::Create));
    assert!(!engine.can(&user, AppModule::Companies, PermissionAction::Edit));
    assert!(!engine.can(&user, AppModule::Companies, PermissionAction::Delete));
    assert!(!engine.can(&user, AppModule::Fleet, PermissionAction::View));
}

#[test]
fn saving_replaces_the_namespace_and_empty_set_clears_it() {
    let conn = open_db_in_memory().unwrap();
    let admin = create_user(&conn, "boss", Role::Administrator);
    let user = create_user(&conn, "ana", Role::Operational);
    let mut engine = PermissionEngine::new(SqliteGrantRepository::try_new(&conn).unwrap());

    engine
        .save_grants(
            &admin,
            &user.id,
            ModuleNamespace::App,
            &[
                PermissionGrant::new(user.id.clone(), AppModule::Companies, Capabilities::all()),
                PermissionGrant::new(user.id.clone(), AppModule::Fleet, Capabilities::all()),
            ],
        )
        .unwrap();
    engine
        .save_grants(
            &admin,
            &user.id,
            ModuleNamespace::App,
            &[PermissionGrant::new(
                user.id.clone(),
                AppModule::Movements,
                Capabilities::view_only(),
            )],
        )
        .unwrap();

    let stored = engine.grants_for(&user.id).unwrap();
    assert_eq!(
        stored.modules().collect::<Vec<_>>(),
        vec![ModuleKey::App(AppModule::Movements)]
    );

    engine
        .save_grants(&admin, &user.id, ModuleNamespace::App, &[])
        .unwrap();
    assert!(engine.grants_for(&user.id).unwrap().is_empty());
}

#[test]
fn namespaces_are_replaced_independently() {
    let conn = open_db_in_memory().unwrap();
    let admin = create_user(&conn, "boss", Role::Administrator);
    let user = create_user(&conn, "ana", Role::Operational);
    let mut engine = PermissionEngine::new(SqliteGrantRepository::try_new(&conn).unwrap());

    engine
        .save_grants(
            &admin,
            &user.id,
            ModuleNamespace::App,
            &[PermissionGrant::new(
                user.id.clone(),
                AppModule::Equipments,
                Capabilities::all(),
            )],
        )
        .unwrap();
    engine
        .save_grants(
            &admin,
            &user.id,
            ModuleNamespace::Report,
            &[PermissionGrant::new(
                user.id.clone(),
                ReportModule::Equipments,
                Capabilities::view_only(),
            )],
        )
        .unwrap();
    engine
        .save_grants(&admin, &user.id, ModuleNamespace::Report, &[])
        .unwrap();

    let stored = engine.grants_for(&user.id).unwrap();
    assert_eq!(
        stored.get(ModuleKey::App(AppModule::Equipments)),
        Some(Capabilities::all())
    );
    assert_eq!(stored.get(ModuleKey::Report(ReportModule::Equipments)), None);
}

#[test]
fn failed_replace_keeps_previous_grants() {
    let conn = open_db_in_memory().unwrap();
    let user = create_user(&conn, "ana", Role::Operational);
    let repo = SqliteGrantRepository::try_new(&conn).unwrap();
    repo.replace_grants(
        &user.id,
        ModuleNamespace::App,
        &[PermissionGrant::new(
            user.id.clone(),
            AppModule::Protocols,
            Capabilities::view_only(),
        )],
    )
    .unwrap();

    let duplicated = [
        PermissionGrant::new(user.id.clone(), AppModule::Fleet, Capabilities::all()),
        PermissionGrant::new(user.id.clone(), AppModule::Fleet, Capabilities::view_only()),
    ];
    let err = repo
        .replace_grants(&user.id, ModuleNamespace::App, &duplicated)
        .unwrap_err();
    assert!(matches!(err, RepoError::Db(_)));

    let stored = repo.list_grants(&user.id).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].module, ModuleKey::App(AppModule::Protocols));
}

#[test]
fn replace_rejects_grants_for_another_subject() {
    let conn = open_db_in_memory().unwrap();
    let ana = create_user(&conn, "ana", Role::Operational);
    let rui = create_user(&conn, "rui", Role::Operational);
    let repo = SqliteGrantRepository::try_new(&conn).unwrap();

    let err = repo
        .replace_grants(
            &ana.id,
            ModuleNamespace::App,
            &[PermissionGrant::new(
                rui.id.clone(),
                AppModule::Fleet,
                Capabilities::all(),
            )],
        )
        .unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
    assert!(repo.list_grants(&rui.id).unwrap().is_empty());
}

#[test]
fn operational_actor_cannot_change_grants() {
    let conn = open_db_in_memory().unwrap();
    let user = create_user(&conn, "ana", Role::Operational);
    let mut engine = PermissionEngine::new(SqliteGrantRepository::try_new(&conn).unwrap());

    let err = engine
        .save_grants(
            &user,
            &user.id,
            ModuleNamespace::App,
            &[PermissionGrant::new(
                user.id.clone(),
                AppModule::Users,
                Capabilities::all(),
            )],
        )
        .unwrap_err();
    assert!(matches!(err, PermissionError::AdministratorRequired));
    assert!(engine.grants_for(&user.id).unwrap().is_empty());
}

#[test]
fn grants_written_through_the_adapter_are_read_by_the_engine() {
    let conn = open_db_in_memory().unwrap();
    let user = create_user(&conn, "ana", Role::Operational);
    let bridge = SqliteTableBridge::try_new(&conn).unwrap();
    let adapter = AccessAdapter::new(&bridge);

    let mut row = tacom_core::RowData::new();
    row.insert("user_id".into(), user.id.clone().into());
    row.insert("module_name".into(), "fleet_report".into());
    row.insert("can_view".into(), true.into());
    adapter
        .from_table("user_permissions")
        .insert(row)
        .unwrap()
        .into_result()
        .unwrap();

    let mut engine = PermissionEngine::new(SqliteGrantRepository::try_new(&conn).unwrap());
    engine.load_for(&user).unwrap();
    assert!(engine.can(&user, ReportModule::Fleet, PermissionAction::View));
    assert!(!engine.can(&user, ReportModule::Fleet, PermissionAction::Edit));
    assert!(!engine.can(&user, AppModule::Fleet, PermissionAction::View));
}

#[test]
fn adapter_rejects_grants_for_unknown_modules() {
    let conn = open_db_in_memory().unwrap();
    let user = create_user(&conn, "ana", Role::Operational);
    let bridge = SqliteTableBridge::try_new(&conn).unwrap();
    let adapter = AccessAdapter::new(&bridge);

    for module_name in ["Equipments", "inventory", " fleet"] {
        let mut row = tacom_core::RowData::new();
        row.insert("user_id".into(), user.id.clone().into());
        row.insert("module_name".into(), module_name.into());
        row.insert("can_view".into(), true.into());
        let response = adapter.from_table("user_permissions").insert(row).unwrap();
        assert!(response.error.is_some(), "{module_name} was accepted");
    }

    let mut valid = tacom_core::RowData::new();
    valid.insert("module_name".into(), "fleet".into());
    valid.insert("user_id".into(), user.id.clone().into());
    adapter
        .from_table("user_permissions")
        .insert(valid)
        .unwrap()
        .into_result()
        .unwrap();
    let mut rename = tacom_core::RowData::new();
    rename.insert("module_name".into(), "Fleet".into());
    let response = adapter
        .from_table("user_permissions")
        .update(rename)
        .eq("module_name", "fleet")
        .unwrap();
    assert!(response.error.is_some());
}

#[test]
fn stray_module_rows_do_not_revoke_valid_grants() {
    let conn = open_db_in_memory().unwrap();
    let user = create_user(&conn, "ana", Role::Operational);
    let grant = |id: &str, module_name: &str| {
        conn.execute(
            "INSERT INTO user_permissions (id, user_id, module_name, can_view)
             VALUES (?1, ?2, ?3, 1);",
            [id, user.id.as_str(), module_name],
        )
        .unwrap();
    };
    grant("p-1", "equipments");
    grant("p-2", "Equipments");
    grant("p-3", "retired_module");

    let mut engine = PermissionEngine::new(SqliteGrantRepository::try_new(&conn).unwrap());
    engine.load_for(&user).unwrap();
    assert!(engine.can(&user, AppModule::Equipments, PermissionAction::View));
    assert!(!engine.can(&user, AppModule::Equipments, PermissionAction::Edit));
    assert_eq!(
        engine.grants_for(&user.id).unwrap().modules().collect::<Vec<_>>(),
        vec![ModuleKey::App(AppModule::Equipments)]
    );
}

#[test]
fn operator_scenario_from_grant_to_sign_out() {
    let conn = open_db_in_memory().unwrap();
    let admin = create_user(&conn, "boss", Role::Administrator);
    let user = create_user(&conn, "ana", Role::Operational);
    let mut engine = PermissionEngine::new(SqliteGrantRepository::try_new(&conn).unwrap());

    engine
        .save_grants(
            &admin,
            &user.id,
            ModuleNamespace::App,
            &[PermissionGrant::new(
                user.id.clone(),
                AppModule::Equipments,
                Capabilities {
                    can_view: true,
                    can_create: true,
                    ..Capabilities::default()
                },
            )],
        )
        .unwrap();

    engine.load_for(&user).unwrap();
    assert_eq!(engine.loaded_subject(), Some(user.id.as_str()));
    assert!(engine.can(&user, AppModule::Equipments, PermissionAction::Create));
    assert!(!engine.can(&user, AppModule::Equipments, PermissionAction::Delete));

    engine
        .save_grants(&admin, &user.id, ModuleNamespace::App, &[])
        .unwrap();
    assert!(!engine.can(&user, AppModule::Equipments, PermissionAction::View));

    engine.clear();
    assert!(engine.loaded_grants().is_none());
    assert!(engine.can(&admin, AppModule::Settings, PermissionAction::Edit));
}
