pub mod comparison_service;
pub mod dashboard_service;
pub mod query_service;
