use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, CONTENT_RANGE};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use crate::domain::entities::comparison::{FieldMeta, InstitutionOption, ReportPeriod};
use crate::domain::entities::filter::Row;
use crate::domain::entities::predicate::SortTerm;
use crate::domain::entities::statistics::number_field;
use crate::infra::postgrest::params::{parse_content_range, query_pairs};
use crate::usecase::ports::data_service::{DataService, RawPage, ServiceError, TableQuery};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgrestConfig {
    pub base_url: Url,
    pub api_key: String,
    pub schema: String,
}

impl PostgrestConfig {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        schema: impl Into<String>,
    ) -> anyhow::Result<Self> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url = Url::parse(&normalized)
            .with_context(|| format!("invalid data service url: {base_url}"))?;
        Ok(Self {
            base_url,
            api_key: api_key.into(),
            schema: schema.into(),
        })
    }
}

pub struct PostgrestClient {
    http: Client,
    config: PostgrestConfig,
}

impl PostgrestClient {
    pub fn new(config: PostgrestConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, ServiceError> {
        self.config
            .base_url
            .join(&format!("rest/v1/{path}"))
            .map_err(|err| ServiceError::Transport(format!("invalid endpoint {path}: {err}")))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
            .header("Accept-Profile", &self.config.schema)
    }

    async fn select(
        &self,
        table: &str,
        pairs: &[(String, String)],
        count: bool,
    ) -> Result<(Vec<Row>, Option<u64>), ServiceError> {
        let url = self.endpoint(table)?;
        debug!(%url, ?pairs, "postgrest select");

        let mut request = self.authorized(self.http.get(url)).query(pairs);
        if count {
            request = request.header("Prefer", "count=exact");
        }
        let response = ensure_success(request.send().await?).await?;
        let total = content_range_total(response.headers());
        let rows = decode::<Vec<Row>>(response).await?;
        Ok((rows, total))
    }

    async fn select_as<T: DeserializeOwned>(
        &self,
        table: &str,
        pairs: &[(String, String)],
    ) -> Result<Vec<T>, ServiceError> {
        let (rows, _) = self.select(table, pairs, false).await?;
        rows.into_iter()
            .map(|row| serde_json::from_value(Value::Object(row)).map_err(ServiceError::from))
            .collect()
    }
}

async fn ensure_success(response: Response) -> Result<Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ServiceError::Remote {
        status: status.as_u16(),
        body,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ServiceError> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn content_range_total(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_RANGE)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_content_range)
}

fn eq_pair(column: &str, value: impl ToString) -> (String, String) {
    (column.to_string(), format!("eq.{}", value.to_string()))
}

#[async_trait]
impl DataService for PostgrestClient {
    async fn fetch_rows(&self, query: TableQuery) -> Result<RawPage, ServiceError> {
        let pairs = query_pairs(&query);
        let (rows, total) = self.select(&query.table, &pairs, true).await?;
        let total = total.unwrap_or(query.offset + rows.len() as u64);
        Ok(RawPage { rows, total })
    }

    async fn call_rpc(&self, name: &str) -> Result<Value, ServiceError> {
        let url = self.endpoint(&format!("rpc/{name}"))?;
        debug!(%url, "postgrest rpc");
        let request = self
            .authorized(self.http.post(url))
            .header("Content-Profile", &self.config.schema)
            .json(&json!({}));
        let response = ensure_success(request.send().await?).await?;
        decode(response).await
    }

    async fn field_by_name(&self, field_name: &str) -> Result<Option<FieldMeta>, ServiceError> {
        let pairs = vec![
            ("select".to_string(), "*".to_string()),
            eq_pair("field_name", field_name),
            ("limit".to_string(), "1".to_string()),
        ];
        let mut fields = self.select_as::<FieldMeta>("fields", &pairs).await?;
        Ok(fields.pop())
    }

    async fn reported_value(
        &self,
        report_period_id: i64,
        field_id: i64,
        institution_id: i64,
    ) -> Result<Option<f64>, ServiceError> {
        let pairs = vec![
            ("select".to_string(), "value".to_string()),
            eq_pair("report_period_id", report_period_id),
            eq_pair("field_id", field_id),
            eq_pair("institution_id", institution_id),
            ("limit".to_string(), "1".to_string()),
        ];
        let (rows, _) = self.select("reported_values", &pairs, false).await?;
        Ok(rows.first().and_then(|row| match row.get("value") {
            None | Some(Value::Null) => None,
            Some(_) => Some(number_field(&Value::Object(row.clone()), "value")),
        }))
    }

    async fn institution_options(
        &self,
        limit: u64,
    ) -> Result<Vec<InstitutionOption>, ServiceError> {
        let mut query = TableQuery::new(
            "institutions",
            ["id", "name", "cert", "dep"].map(String::from).to_vec(),
        );
        query.order = vec![SortTerm::new("dep", true)];
        query.limit = limit;
        let mut pairs = query_pairs(&query);
        pairs.push(("dep".to_string(), "not.is.null".to_string()));
        self.select_as("institutions", &pairs).await
    }

    async fn report_periods(&self, limit: u64) -> Result<Vec<ReportPeriod>, ServiceError> {
        let pairs = vec![
            ("select".to_string(), "*".to_string()),
            ("limit".to_string(), limit.to_string()),
        ];
        self.select_as("report_periods", &pairs).await
    }
}
