pub mod config;
pub mod loader;
pub mod lvl;
pub mod schema;

pub use config::{SimConfig, TelemetryConfig, load_config};
pub use loader::{DataLoadError, Format, load_level};
