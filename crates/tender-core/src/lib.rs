pub mod config;
pub mod error;
pub mod procurement;
pub mod telemetry;
