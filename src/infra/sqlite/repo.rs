use std::path::PathBuf;

use async_trait::async_trait;
use rusqlite::Connection;
use serde_json::Value;

use crate::domain::entities::comparison::{FieldMeta, InstitutionOption, ReportPeriod};
use crate::infra::sqlite::queries::{
    call_rpc, field_by_name, institution_options, query_table, report_periods, reported_value,
};
use crate::infra::sqlite::schema::{init_db, open_connection};
use crate::usecase::ports::data_service::{DataService, RawPage, ServiceError, TableQuery};

/// Data service backed by a local SQLite mirror of the remote tables.
pub struct SqliteRepo {
    pub db_path: PathBuf,
}

impl SqliteRepo {
    pub fn new(db_path: PathBuf) -> Self {
        Self { db_path }
    }

    pub fn init(&self) -> anyhow::Result<()> {
        init_db(&self.db_path)
    }

    async fn with_connection<T, F>(&self, work: F) -> Result<T, ServiceError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> anyhow::Result<T> + Send + 'static,
    {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = open_connection(&db_path)?;
            work(&conn)
        })
        .await
        .map_err(|err| ServiceError::Storage(format!("sqlite worker failed: {err}")))?
        .map_err(ServiceError::from)
    }
}

#[async_trait]
impl DataService for SqliteRepo {
    async fn fetch_rows(&self, query: TableQuery) -> Result<RawPage, ServiceError> {
        self.with_connection(move |conn| query_table(conn, &query))
            .await
    }

    async fn call_rpc(&self, name: &str) -> Result<Value, ServiceError> {
        let rpc = name.to_string();
        self.with_connection(move |conn| call_rpc(conn, &rpc))
            .await?
            .ok_or_else(|| ServiceError::UnsupportedRpc(name.to_string()))
    }

    async fn field_by_name(&self, field_name: &str) -> Result<Option<FieldMeta>, ServiceError> {
        let field_name = field_name.to_string();
        self.with_connection(move |conn| field_by_name(conn, &field_name))
            .await
    }

    async fn reported_value(
        &self,
        report_period_id: i64,
        field_id: i64,
        institution_id: i64,
    ) -> Result<Option<f64>, ServiceError> {
        self.with_connection(move |conn| {
            reported_value(conn, report_period_id, field_id, institution_id)
        })
        .await
    }

    async fn institution_options(
        &self,
        limit: u64,
    ) -> Result<Vec<InstitutionOption>, ServiceError> {
        self.with_connection(move |conn| institution_options(conn, limit))
            .await
    }

    async fn report_periods(&self, limit: u64) -> Result<Vec<ReportPeriod>, ServiceError> {
        self.with_connection(move |conn| report_periods(conn, limit))
            .await
    }
}
