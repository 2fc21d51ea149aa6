pub mod cache;
pub mod data_service;
