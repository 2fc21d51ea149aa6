use std::sync::Arc;
use std::time::Duration;

use tracing::error;

use crate::domain::entities::filter::{page_count, PageRequest, PageResult};
use crate::domain::entities::predicate::{lower_filters, lower_sort};
use crate::usecase::ports::cache::{cache_key, cached, CachePolicy, QueryCache};
use crate::usecase::ports::data_service::{DataService, TableQuery};

pub const INSTITUTIONS_TABLE: &str = "institutions";

const INSTITUTIONS_TTL: Duration = Duration::from_secs(60);

pub struct QueryService {
    data: Arc<dyn DataService>,
    cache: Arc<dyn QueryCache>,
}

impl QueryService {
    pub fn new(data: Arc<dyn DataService>, cache: Arc<dyn QueryCache>) -> Self {
        Self { data, cache }
    }

    /// One page of institutions. Never fails: backend errors are logged and
    /// come back as an empty page with no pages.
    pub async fn fetch_page(&self, request: &PageRequest) -> PageResult {
        let key = cache_key("getInstitutions", request);
        let policy = CachePolicy::new(INSTITUTIONS_TTL, &[INSTITUTIONS_TABLE]);
        cached(self.cache.as_ref(), &key, policy, || {
            self.fetch_page_uncached(request)
        })
        .await
    }

    pub async fn fetch_page_uncached(&self, request: &PageRequest) -> PageResult {
        let query = build_table_query(request);
        match self.data.fetch_rows(query).await {
            Ok(page) => PageResult {
                rows: page.rows,
                page_count: page_count(page.total, request.per_page),
            },
            Err(err) => {
                error!(error = %err, page = request.page, "failed to fetch institutions page");
                PageResult::empty()
            }
        }
    }
}

pub fn build_table_query(request: &PageRequest) -> TableQuery {
    TableQuery {
        table: INSTITUTIONS_TABLE.to_string(),
        columns: request.selected_columns(),
        filter: lower_filters(&request.filters, request.join_operator),
        order: lower_sort(&request.sort),
        offset: request.offset(),
        limit: u64::from(request.per_page),
    }
}
