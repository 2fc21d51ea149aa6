use std::sync::Arc;

use crate::domain::entities::taxonomy::Taxonomy;
use crate::usecase::ports::cache::QueryCache;
use crate::usecase::ports::data_service::DataService;
use crate::usecase::services::comparison_service::ComparisonService;
use crate::usecase::services::dashboard_service::DashboardService;
use crate::usecase::services::query_service::QueryService;

/// Shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub queries: Arc<QueryService>,
    pub dashboard: Arc<DashboardService>,
    pub comparison: Arc<ComparisonService>,
    pub cache: Arc<dyn QueryCache>,
}

impl AppState {
    pub fn new(
        data: Arc<dyn DataService>,
        cache: Arc<dyn QueryCache>,
        taxonomy: Arc<Taxonomy>,
    ) -> Self {
        Self {
            queries: Arc::new(QueryService::new(data.clone(), cache.clone())),
            dashboard: Arc::new(DashboardService::new(data.clone(), cache.clone())),
            comparison: Arc::new(ComparisonService::new(data, taxonomy)),
            cache,
        }
    }
}
