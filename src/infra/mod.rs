pub mod cache;
pub mod import;
pub mod postgrest;
pub mod sqlite;
pub mod taxonomy;
