use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use futures_util::future::join_all;
use serde_json::Value;
use tracing::error;

use crate::domain::entities::filter::ID_COLUMN;
use crate::domain::entities::predicate::{
    Comparison, Condition, FilterPlan, Predicate, SortTerm,
};
use crate::domain::entities::statistics::{
    bucket_counts, category_bars, charter_type_bars, group_by_decade, market_share_items,
    BucketCount, CategoryChart, KeyStatistics, MarketShareItem, MarketShareKind,
};
use crate::usecase::ports::cache::{cache_key, cached, CachePolicy, QueryCache};
use crate::usecase::ports::data_service::{DataService, ServiceError, TableQuery};
use crate::usecase::services::query_service::INSTITUTIONS_TABLE;

const STATISTICS_TTL: Duration = Duration::from_secs(3600);
const TREND_TTL: Duration = Duration::from_secs(10);
const TALLY_PAGE_SIZE: u64 = 1000;

/// Call report data on the dashboard is as of this quarter end.
pub const QUARTERLY_UPDATE_DATE: &str = "12/31/2024";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardSnapshot {
    pub key_statistics: KeyStatistics,
    pub age_distribution: Vec<BucketCount>,
    pub establishment_by_decade: Vec<BucketCount>,
    pub deposit_distribution: Vec<BucketCount>,
    pub market_share: Vec<(MarketShareKind, Vec<MarketShareItem>)>,
    pub categories: Vec<(CategoryChart, Vec<BucketCount>)>,
    pub charter_types: Vec<BucketCount>,
    pub quarterly_update: String,
    pub weekly_update: String,
}

pub struct DashboardService {
    data: Arc<dyn DataService>,
    cache: Arc<dyn QueryCache>,
}

impl DashboardService {
    pub fn new(data: Arc<dyn DataService>, cache: Arc<dyn QueryCache>) -> Self {
        Self { data, cache }
    }

    pub async fn snapshot(&self) -> DashboardSnapshot {
        let (key_statistics, age_distribution, trend, deposit_distribution, charter_types) = tokio::join!(
            self.key_statistics(),
            self.age_distribution(),
            self.establishment_trend(),
            self.deposit_distribution(),
            self.charter_types(),
        );

        let market_share = join_all(
            MarketShareKind::ALL
                .into_iter()
                .map(|kind| async move { (kind, self.market_share(kind).await) }),
        )
        .await;
        let categories = join_all(
            CategoryChart::ALL
                .into_iter()
                .map(|chart| async move { (chart, self.category(chart).await) }),
        )
        .await;

        DashboardSnapshot {
            key_statistics,
            age_distribution,
            establishment_by_decade: group_by_decade(&trend),
            deposit_distribution,
            market_share,
            categories,
            charter_types,
            quarterly_update: QUARTERLY_UPDATE_DATE.to_string(),
            weekly_update: Local::now().format("%-m/%-d/%Y").to_string(),
        }
    }

    pub async fn key_statistics(&self) -> KeyStatistics {
        let payload = self
            .rpc_cached("get_key_statistics", STATISTICS_TTL, "keyStatistics")
            .await;
        KeyStatistics::from_rpc(&payload)
    }

    pub async fn age_distribution(&self) -> Vec<BucketCount> {
        let payload = self
            .rpc_cached("get_bank_age_distribution", STATISTICS_TTL, "ageDistribution")
            .await;
        bucket_counts(&payload, "age_range")
    }

    /// Yearly establishment counts, before decade grouping.
    pub async fn establishment_trend(&self) -> Vec<BucketCount> {
        let payload = self
            .rpc_cached("get_bank_establishment_trend", TREND_TTL, "establishmentTrend")
            .await;
        bucket_counts(&payload, "year")
    }

    pub async fn deposit_distribution(&self) -> Vec<BucketCount> {
        let payload = self
            .rpc_cached(
                "get_bank_deposit_distribution",
                STATISTICS_TTL,
                "depositDistribution",
            )
            .await;
        bucket_counts(&payload, "deposit_range")
    }

    pub async fn market_share(&self, kind: MarketShareKind) -> Vec<MarketShareItem> {
        let payload = self
            .rpc_cached(kind.rpc_name(), STATISTICS_TTL, kind.cache_tag())
            .await;
        market_share_items(&payload)
    }

    pub async fn category(&self, chart: CategoryChart) -> Vec<BucketCount> {
        let key = cache_key("getCategoryCounts", chart.column());
        let policy = CachePolicy::new(
            STATISTICS_TTL,
            &["statistics", INSTITUTIONS_TABLE, chart.cache_tag()],
        );
        cached(self.cache.as_ref(), &key, policy, || async {
            match tally_column(self.data.as_ref(), chart.column()).await {
                Ok(tallies) => category_bars(chart, &tallies),
                Err(err) => {
                    error!(column = chart.column(), error = %err, "failed to tally institutions");
                    Vec::new()
                }
            }
        })
        .await
    }

    pub async fn charter_types(&self) -> Vec<BucketCount> {
        let key = cache_key("getCharterTypes", &["fedchrtr", "stchrtr"]);
        let policy = CachePolicy::new(
            STATISTICS_TTL,
            &["statistics", INSTITUTIONS_TABLE, "charterTypes"],
        );
        cached(self.cache.as_ref(), &key, policy, || async {
            let (federal, state) = tokio::join!(
                count_flagged(self.data.as_ref(), "fedchrtr"),
                count_flagged(self.data.as_ref(), "stchrtr"),
            );
            let federal = federal.unwrap_or_else(|err| {
                error!(error = %err, "failed to count federal charters");
                0
            });
            let state = state.unwrap_or_else(|err| {
                error!(error = %err, "failed to count state charters");
                0
            });
            charter_type_bars(federal as f64, state as f64)
        })
        .await
    }

    async fn rpc_cached(&self, name: &str, ttl: Duration, tag: &'static str) -> Value {
        let key = cache_key(name, &Value::Null);
        let policy = CachePolicy::new(ttl, &["statistics", INSTITUTIONS_TABLE, tag]);
        cached(self.cache.as_ref(), &key, policy, || async {
            self.data.call_rpc(name).await.unwrap_or_else(|err| {
                error!(rpc = name, error = %err, "statistics call failed");
                Value::Null
            })
        })
        .await
    }
}

/// Counts institutions per distinct value of `column`; nulls count as `unknown`.
pub async fn tally_column(
    data: &dyn DataService,
    column: &str,
) -> Result<BTreeMap<String, f64>, ServiceError> {
    let mut tallies = BTreeMap::new();
    let mut offset = 0;
    loop {
        let mut query = TableQuery::new(
            INSTITUTIONS_TABLE,
            vec![ID_COLUMN.to_string(), column.to_string()],
        );
        query.order = vec![SortTerm::new(ID_COLUMN, false)];
        query.offset = offset;
        query.limit = TALLY_PAGE_SIZE;

        let page = data.fetch_rows(query).await?;
        if page.rows.is_empty() {
            break;
        }
        offset += page.rows.len() as u64;
        for row in &page.rows {
            let category = match row.get(column) {
                Some(Value::String(text)) if !text.trim().is_empty() => text.clone(),
                Some(Value::Number(number)) => number.to_string(),
                Some(Value::Bool(flag)) => flag.to_string(),
                _ => "unknown".to_string(),
            };
            *tallies.entry(category).or_insert(0.0) += 1.0;
        }
        if offset >= page.total {
            break;
        }
    }
    Ok(tallies)
}

async fn count_flagged(data: &dyn DataService, column: &str) -> Result<u64, ServiceError> {
    let mut query = TableQuery::new(INSTITUTIONS_TABLE, vec![ID_COLUMN.to_string()]);
    query.filter = FilterPlan::All(vec![Predicate {
        column: column.to_string(),
        condition: Condition::Compare(Comparison::Eq, "1".to_string()),
    }]);
    query.limit = 1;
    Ok(data.fetch_rows(query).await?.total)
}
