pub mod format;
pub mod pages;
pub mod params;
pub mod styles;
