use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::domain::entities::institution::INSTITUTION_COLUMNS;

pub fn open_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)
        .with_context(|| format!("failed to open db: {}", db_path.display()))?;
    conn.execute("PRAGMA foreign_keys = ON", [])
        .context("failed to enable foreign key enforcement")?;
    Ok(conn)
}

pub fn init_db(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create parent dir: {}", parent.display()))?;
    }

    let conn = open_connection(db_path)?;
    init_schema(&conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(&institutions_ddl())
        .context("failed to create institutions table")?;

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS fields (
            field_id        INTEGER PRIMARY KEY,
            field_name      TEXT NOT NULL UNIQUE,
            title           TEXT,
            description     TEXT,
            title_alt       TEXT,
            description_alt TEXT
        );

        CREATE TABLE IF NOT EXISTS report_periods (
            report_period_id INTEGER PRIMARY KEY,
            report_date      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS reported_values (
            report_period_id INTEGER NOT NULL,
            field_id         INTEGER NOT NULL,
            institution_id   INTEGER NOT NULL,
            value            REAL,
            PRIMARY KEY (report_period_id, field_id, institution_id),
            FOREIGN KEY (report_period_id) REFERENCES report_periods(report_period_id),
            FOREIGN KEY (field_id) REFERENCES fields(field_id)
        );

        CREATE INDEX IF NOT EXISTS idx_institutions_asset ON institutions(asset);
        CREATE INDEX IF NOT EXISTS idx_institutions_dep ON institutions(dep);
        ",
    )
    .context("failed to initialize schema")?;

    Ok(())
}

/// One column per catalog entry; dates are ISO-8601 text.
fn institutions_ddl() -> String {
    let columns = INSTITUTION_COLUMNS
        .iter()
        .map(|column| {
            let sql_type = if column.kind.is_numeric() { "REAL" } else { "TEXT" };
            format!("    \"{}\" {sql_type}", column.id)
        })
        .collect::<Vec<_>>()
        .join(",\n");
    format!("CREATE TABLE IF NOT EXISTS institutions (\n    id INTEGER PRIMARY KEY,\n{columns}\n);")
}

/// Column names of `table`, empty when the table does not exist.
pub fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")
        .context("failed to prepare table info query")?;
    let columns = stmt
        .query_map([table], |row| row.get::<_, String>(0))
        .with_context(|| format!("failed to read columns of {table}"))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to collect table columns")?;
    Ok(columns)
}
