use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::domain::entities::comparison::{FieldMeta, InstitutionOption, ReportPeriod};
use crate::domain::entities::filter::Row;
use crate::domain::entities::predicate::{FilterPlan, SortTerm};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("request to data service failed: {0}")]
    Transport(String),
    #[error("data service returned {status}: {body}")]
    Remote { status: u16, body: String },
    #[error("failed to decode data service response: {0}")]
    Decode(String),
    #[error("local storage error: {0}")]
    Storage(String),
    #[error("unsupported procedure: {0}")]
    UnsupportedRpc(String),
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ServiceError::Decode(err.to_string())
        } else {
            ServiceError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::Decode(err.to_string())
    }
}

impl From<anyhow::Error> for ServiceError {
    fn from(err: anyhow::Error) -> Self {
        ServiceError::Storage(format!("{err:#}"))
    }
}

/// One storage-agnostic read against a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableQuery {
    pub table: String,
    pub columns: Vec<String>,
    pub filter: FilterPlan,
    pub order: Vec<SortTerm>,
    pub offset: u64,
    pub limit: u64,
}

impl TableQuery {
    pub fn new(table: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            table: table.into(),
            columns,
            filter: FilterPlan::Unfiltered,
            order: Vec::new(),
            offset: 0,
            limit: 1000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPage {
    pub rows: Vec<Row>,
    /// Exact number of rows matching the filter, ignoring offset and limit.
    pub total: u64,
}

#[async_trait]
pub trait DataService: Send + Sync {
    async fn fetch_rows(&self, query: TableQuery) -> Result<RawPage, ServiceError>;

    async fn call_rpc(&self, name: &str) -> Result<Value, ServiceError>;

    async fn field_by_name(&self, field_name: &str) -> Result<Option<FieldMeta>, ServiceError>;

    async fn reported_value(
        &self,
        report_period_id: i64,
        field_id: i64,
        institution_id: i64,
    ) -> Result<Option<f64>, ServiceError>;

    /// Largest institutions by deposits, skipping those without a deposit figure.
    async fn institution_options(&self, limit: u64)
        -> Result<Vec<InstitutionOption>, ServiceError>;

    async fn report_periods(&self, limit: u64) -> Result<Vec<ReportPeriod>, ServiceError>;
}
