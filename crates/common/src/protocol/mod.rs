pub mod actions;
pub mod envelope;
pub mod lenient;
pub mod params;
pub mod payload;
