pub mod comparison;
pub mod dashboard;
pub mod layout;
pub mod table;
