//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `tacom_core` linkage.
//! - Open a store, seed the default administrator and print table sizes.
//!
//! Usage: `tacom_cli [db_path]`. Without a path an in-memory store is used.

use std::process::ExitCode;
use tacom_core::db::{open_db, open_db_in_memory};
use tacom_core::{
    seed_default_user, AccessAdapter, SqliteSessionStore, SqliteTableBridge, BRIDGED_TABLES,
};

fn main() -> ExitCode {
    println!("tacom_core ping={}", tacom_core::ping());
    println!("tacom_core version={}", tacom_core::core_version());

    match run(std::env::args().nth(1)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(db_path: Option<String>) -> Result<(), String> {
    let conn = match db_path.as_deref() {
        Some(path) => open_db(path),
        None => open_db_in_memory(),
    }
    .map_err(|err| err.to_string())?;
    let bridge = SqliteTableBridge::try_new(&conn).map_err(|err| err.to_string())?;
    if seed_default_user(&bridge, &SqliteSessionStore::new(&conn))
        .map_err(|err| err.to_string())?
        .is_some()
    {
        println!("seeded default administrator");
    }

    let adapter = AccessAdapter::new(&bridge);
    for table in BRIDGED_TABLES {
        let response = adapter
            .from_table(*table)
            .select(None)
            .execute()
            .map_err(|err| err.to_string())?;
        match response.into_result() {
            Ok(rows) => println!("table={table} rows={}", rows.len()),
            Err(message) => println!("table={table} error={message}"),
        }
    }
    Ok(())
}
