use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::{Datelike, Utc};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{json, Number, Value};
use tracing::warn;

use crate::domain::entities::comparison::{FieldMeta, InstitutionOption, ReportPeriod};
use crate::domain::entities::filter::{Row, ID_COLUMN};
use crate::domain::entities::predicate::{Comparison, Condition, FilterSink, Predicate, SortTerm};
use crate::domain::entities::statistics::MarketShareKind;
use crate::infra::sqlite::schema::table_columns;
use crate::usecase::ports::data_service::{RawPage, TableQuery};

/// Parameterized `WHERE` clause collected from a filter plan.
#[derive(Debug, Default)]
pub struct SqlWhere {
    clauses: Vec<String>,
    params: Vec<SqlValue>,
}

impl SqlWhere {
    pub fn sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }
}

impl FilterSink for SqlWhere {
    fn constrain(&mut self, predicate: &Predicate) {
        let clause = predicate_sql(predicate, &mut self.params);
        self.clauses.push(clause);
    }

    fn constrain_any(&mut self, predicates: &[Predicate]) {
        let clauses = predicates
            .iter()
            .map(|predicate| predicate_sql(predicate, &mut self.params))
            .collect::<Vec<_>>();
        self.clauses.push(format!("({})", clauses.join(" OR ")));
    }
}

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn predicate_sql(predicate: &Predicate, params: &mut Vec<SqlValue>) -> String {
    let column = quote_ident(&predicate.column);
    match &predicate.condition {
        Condition::Compare(comparison, value) => {
            params.push(SqlValue::Text(value.clone()));
            let op = match comparison {
                Comparison::Eq => "=",
                Comparison::Ne => "<>",
                Comparison::Gt => ">",
                Comparison::Gte => ">=",
                Comparison::Lt => "<",
                Comparison::Lte => "<=",
            };
            format!("{column} {op} ?")
        }
        // LIKE is case-insensitive for ASCII in SQLite.
        Condition::ILike(pattern) => {
            params.push(SqlValue::Text(pattern.clone()));
            format!("{column} LIKE ?")
        }
        Condition::In(values) => {
            if values.is_empty() {
                return "0".to_string();
            }
            params.extend(values.iter().cloned().map(SqlValue::Text));
            let placeholders = std::iter::repeat_n("?", values.len())
                .collect::<Vec<_>>()
                .join(",");
            format!("{column} IN ({placeholders})")
        }
    }
}

pub fn order_sql(terms: &[SortTerm], tiebreak: Option<&str>) -> String {
    let mut parts = terms
        .iter()
        .map(|term| {
            format!(
                "{} {} {}",
                quote_ident(&term.column),
                if term.descending { "DESC" } else { "ASC" },
                if term.nulls_first { "NULLS FIRST" } else { "NULLS LAST" }
            )
        })
        .collect::<Vec<_>>();
    if let Some(column) = tiebreak {
        parts.push(format!("{} ASC", quote_ident(column)));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ORDER BY {}", parts.join(", "))
    }
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null | ValueRef::Blob(_) => Value::Null,
        ValueRef::Integer(number) => Value::from(number),
        ValueRef::Real(number) => Number::from_f64(number).map_or(Value::Null, Value::Number),
        ValueRef::Text(text) => Value::String(String::from_utf8_lossy(text).into_owned()),
    }
}

fn to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Runs a table read; columns, filters and sort terms on columns the table
/// lacks are dropped.
pub fn query_table(conn: &Connection, query: &TableQuery) -> Result<RawPage> {
    let known = table_columns(conn, &query.table)?;
    if known.is_empty() {
        anyhow::bail!("unknown table: {}", query.table)
    }
    let is_known = |column: &str| known.iter().any(|existing| existing == column);

    let mut selected = Vec::new();
    for column in &query.columns {
        if is_known(column) {
            selected.push(quote_ident(column));
        } else {
            warn!(table = %query.table, column = %column, "skipping unknown column");
        }
    }
    let select_list = if selected.is_empty() {
        "*".to_string()
    } else {
        selected.join(", ")
    };

    let filter = query.filter.clone().retain_columns(is_known);
    let mut where_clause = SqlWhere::default();
    filter.apply(&mut where_clause);
    let where_sql = where_clause.sql();

    let table = quote_ident(&query.table);
    let count_sql = format!("SELECT COUNT(*) FROM {table}{where_sql}");
    let total: i64 = conn
        .query_row(
            &count_sql,
            rusqlite::params_from_iter(where_clause.params().iter()),
            |row| row.get(0),
        )
        .context("failed to query filtered row count")?;

    let order = query
        .order
        .iter()
        .filter(|term| is_known(&term.column))
        .cloned()
        .collect::<Vec<_>>();
    let tiebreak = is_known(ID_COLUMN).then_some(ID_COLUMN);
    let order_clause = order_sql(&order, tiebreak);

    let page_sql =
        format!("SELECT {select_list} FROM {table}{where_sql}{order_clause} LIMIT ? OFFSET ?");
    let mut page_params = where_clause.params().to_vec();
    page_params.push(SqlValue::Integer(to_sql_int(query.limit)));
    page_params.push(SqlValue::Integer(to_sql_int(query.offset)));

    let mut stmt = conn
        .prepare(&page_sql)
        .context("failed to prepare page query")?;
    let names = stmt
        .column_names()
        .into_iter()
        .map(String::from)
        .collect::<Vec<_>>();
    let mut result = stmt
        .query(rusqlite::params_from_iter(page_params))
        .context("failed to run page query")?;

    let mut rows = Vec::new();
    while let Some(row) = result.next().context("failed to read page row")? {
        let mut record = Row::new();
        for (idx, name) in names.iter().enumerate() {
            let value = row.get_ref(idx).context("failed to read cell")?;
            record.insert(name.clone(), to_json(value));
        }
        rows.push(record);
    }

    Ok(RawPage {
        rows,
        total: u64::try_from(total).unwrap_or(0),
    })
}

pub fn field_by_name(conn: &Connection, field_name: &str) -> Result<Option<FieldMeta>> {
    conn.query_row(
        "SELECT field_id, field_name, title, description, title_alt, description_alt
         FROM fields
         WHERE field_name = ?1",
        [field_name],
        |row| {
            Ok(FieldMeta {
                field_id: row.get(0)?,
                field_name: row.get(1)?,
                title: row.get(2)?,
                description: row.get(3)?,
                title_alt: row.get(4)?,
                description_alt: row.get(5)?,
            })
        },
    )
    .optional()
    .with_context(|| format!("failed to look up field {field_name}"))
}

pub fn reported_value(
    conn: &Connection,
    report_period_id: i64,
    field_id: i64,
    institution_id: i64,
) -> Result<Option<f64>> {
    let value = conn
        .query_row(
            "SELECT value
             FROM reported_values
             WHERE report_period_id = ?1 AND field_id = ?2 AND institution_id = ?3",
            params![report_period_id, field_id, institution_id],
            |row| row.get::<_, Option<f64>>(0),
        )
        .optional()
        .context("failed to look up reported value")?;
    Ok(value.flatten())
}

pub fn institution_options(conn: &Connection, limit: u64) -> Result<Vec<InstitutionOption>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, COALESCE(name, ''), cert, dep
             FROM institutions
             WHERE dep IS NOT NULL
             ORDER BY dep DESC
             LIMIT ?1",
        )
        .context("failed to prepare institution options query")?;
    let options = stmt
        .query_map([to_sql_int(limit)], |row| {
            Ok(InstitutionOption {
                id: row.get(0)?,
                name: row.get(1)?,
                cert: row.get(2)?,
                dep: row.get(3)?,
            })
        })
        .context("failed to query institution options")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to collect institution options")?;
    Ok(options)
}

pub fn report_periods(conn: &Connection, limit: u64) -> Result<Vec<ReportPeriod>> {
    let mut stmt = conn
        .prepare(
            "SELECT report_period_id, report_date
             FROM report_periods
             ORDER BY report_period_id ASC
             LIMIT ?1",
        )
        .context("failed to prepare report periods query")?;
    let periods = stmt
        .query_map([to_sql_int(limit)], |row| {
            Ok(ReportPeriod {
                report_period_id: row.get(0)?,
                report_date: row.get(1)?,
            })
        })
        .context("failed to query report periods")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to collect report periods")?;
    Ok(periods)
}

/// Local versions of the dashboard procedures. `None` for unknown names.
pub fn call_rpc(conn: &Connection, name: &str) -> Result<Option<Value>> {
    let payload = match name {
        "get_key_statistics" => key_statistics(conn)?,
        "get_bank_age_distribution" => age_distribution(conn, Utc::now().year())?,
        "get_bank_establishment_trend" => establishment_trend(conn)?,
        "get_bank_deposit_distribution" => deposit_distribution(conn)?,
        other => match MarketShareKind::ALL
            .into_iter()
            .find(|kind| kind.rpc_name() == other)
        {
            Some(kind) => market_share(conn, kind.column())?,
            None => return Ok(None),
        },
    };
    Ok(Some(payload))
}

fn key_statistics(conn: &Connection) -> Result<Value> {
    conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(asset), 0), COALESCE(SUM(dep), 0), COALESCE(SUM(offices), 0)
         FROM institutions",
        [],
        |row| {
            Ok(json!([{
                "total_institutions": row.get::<_, i64>(0)?,
                "total_assets": row.get::<_, f64>(1)?,
                "total_deposits": row.get::<_, f64>(2)?,
                "total_branches": row.get::<_, f64>(3)?,
            }]))
        },
    )
    .context("failed to compute key statistics")
}

fn column_values<T: rusqlite::types::FromSql>(conn: &Connection, sql: &str) -> Result<Vec<T>> {
    let mut stmt = conn.prepare(sql).context("failed to prepare aggregate query")?;
    let values = stmt
        .query_map([], |row| row.get::<_, T>(0))
        .context("failed to run aggregate query")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to collect aggregate values")?;
    Ok(values)
}

fn leading_year(date: &str) -> Option<i32> {
    date.get(..4)?.parse().ok()
}

pub fn age_distribution(conn: &Connection, current_year: i32) -> Result<Value> {
    let dates = column_values::<Option<String>>(conn, "SELECT estymd FROM institutions")?;
    let mut buckets = BTreeMap::<i32, i64>::new();
    let mut unknown = 0_i64;
    for date in dates {
        match date.as_deref().and_then(leading_year) {
            Some(year) => {
                let start = (current_year - year).max(0) / 10 * 10;
                *buckets.entry(start).or_insert(0) += 1;
            }
            None => unknown += 1,
        }
    }

    let mut payload = buckets
        .into_iter()
        .map(|(start, count)| json!({ "age_range": format!("{start}-{}", start + 9), "count": count }))
        .collect::<Vec<_>>();
    if unknown > 0 {
        payload.push(json!({ "age_range": "Unknown", "count": unknown }));
    }
    Ok(Value::Array(payload))
}

fn establishment_trend(conn: &Connection) -> Result<Value> {
    let mut stmt = conn
        .prepare(
            "SELECT substr(estymd, 1, 4) AS year, COUNT(*)
             FROM institutions
             WHERE estymd IS NOT NULL
             GROUP BY year
             ORDER BY year",
        )
        .context("failed to prepare establishment trend query")?;
    let payload = stmt
        .query_map([], |row| {
            Ok(json!({ "year": row.get::<_, String>(0)?, "count": row.get::<_, i64>(1)? }))
        })
        .context("failed to query establishment trend")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to collect establishment trend")?;
    Ok(Value::Array(payload))
}

/// Deposit bands in thousands of dollars, as reported.
const DEPOSIT_BANDS: [(&str, f64); 5] = [
    ("< $100M", 100_000.0),
    ("$100M - $1B", 1_000_000.0),
    ("$1B - $10B", 10_000_000.0),
    ("$10B - $100B", 100_000_000.0),
    ("> $100B", f64::INFINITY),
];

fn deposit_distribution(conn: &Connection) -> Result<Value> {
    let deposits = column_values::<f64>(conn, "SELECT dep FROM institutions WHERE dep IS NOT NULL")?;
    let mut counts = [0_i64; DEPOSIT_BANDS.len()];
    for deposit in deposits {
        if let Some(band) = DEPOSIT_BANDS.iter().position(|(_, upper)| deposit < *upper) {
            counts[band] += 1;
        }
    }
    let payload = DEPOSIT_BANDS
        .iter()
        .zip(counts)
        .map(|((label, _), count)| json!({ "deposit_range": label, "count": count }))
        .collect();
    Ok(Value::Array(payload))
}

const TOP_GROUPS: [(&str, f64); 3] = [("Top 0.1%", 0.001), ("Top 1%", 0.01), ("Top 10%", 0.1)];

/// Share of the column total held by the largest institutions.
pub fn market_share(conn: &Connection, column: &str) -> Result<Value> {
    let column = quote_ident(column);
    let values = column_values::<f64>(
        conn,
        &format!("SELECT {column} FROM institutions WHERE {column} IS NOT NULL ORDER BY {column} DESC"),
    )?;
    let total = values.iter().sum::<f64>();
    if values.is_empty() || total == 0.0 {
        return Ok(Value::Array(Vec::new()));
    }

    let share = |slice: &[f64]| slice.iter().sum::<f64>() / total * 100.0;
    let mut payload = Vec::new();
    let mut widest = 0;
    for (group_name, fraction) in TOP_GROUPS {
        let count = ((values.len() as f64 * fraction).ceil() as usize).clamp(1, values.len());
        widest = count;
        payload.push(json!({
            "group_name": group_name,
            "percentage_of_total": share(&values[..count]),
            "bank_count": count,
        }));
    }
    payload.push(json!({
        "group_name": "All Others",
        "percentage_of_total": share(&values[widest..]),
        "bank_count": values.len() - widest,
    }));
    Ok(Value::Array(payload))
}
