pub mod comparison;
pub mod filter;
pub mod institution;
pub mod predicate;
pub mod statistics;
pub mod taxonomy;
