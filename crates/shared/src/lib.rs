pub mod config;
pub mod telemetry;

pub use config::*;
pub use telemetry::*;
