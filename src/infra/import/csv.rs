use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::types::Value;
use tracing::{info, warn};

use crate::domain::entities::institution::{column_kind, ColumnKind};
use crate::domain::entities::predicate::calendar_date_instant;
use crate::infra::sqlite::queries::quote_ident;
use crate::infra::sqlite::schema::{init_db, open_connection, table_columns};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportResult {
    pub table: String,
    pub row_count: i64,
    /// Header names that matched no column of the target table.
    pub skipped_columns: Vec<String>,
}

/// Loads a CSV export into one mirror table, replacing rows with the same key.
pub fn import_csv_to_sqlite(db_path: &Path, table: &str, csv_path: &Path) -> Result<ImportResult> {
    init_db(db_path)?;

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open csv: {}", csv_path.display()))?;
    let headers = reader
        .headers()
        .with_context(|| format!("failed to read headers from csv: {}", csv_path.display()))?
        .iter()
        .map(|header| header.trim().to_ascii_lowercase())
        .collect::<Vec<_>>();

    if headers.is_empty() {
        anyhow::bail!("csv header is required")
    }

    let mut conn = open_connection(db_path)?;
    let known = table_columns(&conn, table)?;
    if known.is_empty() {
        anyhow::bail!("unknown table: {table}")
    }

    let mut targets = Vec::new();
    let mut skipped_columns = Vec::new();
    for (idx, header) in headers.iter().enumerate() {
        if known.contains(header) {
            targets.push((idx, header.clone()));
        } else {
            warn!(table, column = %header, "csv column has no matching table column");
            skipped_columns.push(header.clone());
        }
    }
    if targets.is_empty() {
        anyhow::bail!("csv shares no columns with table {table}")
    }

    let column_list = targets
        .iter()
        .map(|(_, name)| quote_ident(name))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = std::iter::repeat_n("?", targets.len())
        .collect::<Vec<_>>()
        .join(", ");
    let insert_sql = format!(
        "INSERT OR REPLACE INTO {}({column_list}) VALUES ({placeholders})",
        quote_ident(table)
    );

    let tx = conn.transaction().context("failed to start transaction")?;
    let mut insert_row = tx
        .prepare(&insert_sql)
        .context("failed to prepare row insert")?;

    let mut row_count = 0_i64;
    for record in reader.records() {
        let record = record.context("failed to parse csv record")?;
        let values = targets
            .iter()
            .map(|(idx, name)| cell_value(name, record.get(*idx).unwrap_or("")))
            .collect::<Vec<_>>();
        insert_row
            .execute(rusqlite::params_from_iter(values))
            .with_context(|| format!("failed to insert row {}", row_count + 1))?;
        row_count += 1;
    }
    drop(insert_row);

    tx.commit().context("failed to commit import transaction")?;
    info!(table, row_count, source = %csv_path.display(), "csv import finished");

    Ok(ImportResult {
        table: table.to_string(),
        row_count,
        skipped_columns,
    })
}

/// Blank cells become NULL; numeric-looking cells are stored as numbers and
/// institution date columns as ISO-8601 instants.
pub fn cell_value(column: &str, raw: &str) -> Value {
    let raw = raw.trim();
    if raw.is_empty() {
        return Value::Null;
    }

    if column_kind(column) == Some(ColumnKind::Date) {
        return Value::Text(calendar_date_instant(raw).unwrap_or_else(|| raw.to_string()));
    }
    if column_kind(column) == Some(ColumnKind::Text) {
        return Value::Text(raw.to_string());
    }

    let numeric = raw.replace(',', "");
    if let Ok(integer) = numeric.parse::<i64>() {
        return Value::Integer(integer);
    }
    if let Ok(real) = numeric.parse::<f64>() {
        if real.is_finite() {
            return Value::Real(real);
        }
    }
    Value::Text(raw.to_string())
}
