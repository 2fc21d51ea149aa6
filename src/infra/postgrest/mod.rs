pub mod client;
pub mod params;
