//! Persistent configuration for the label printer: app settings and printer locations.
//! 標籤列印的持久化設定：應用程式設定與印表機位置。

pub mod config;
pub mod locations;
pub mod storage;

pub use config::{AppConfig, BrokerConfig, ConfigStore, RasterConfig, DEFAULT_BROKER_URL};
pub use locations::{LocationError, PrinterGroupStore, DEFAULT_LOCATION_NAME};
pub use storage::StoreError;

/// File name of the application configuration inside a workspace.
pub const CONFIG_FILE_NAME: &str = "tagsheet.json";
/// File name of the printer location store inside a workspace.
pub const LOCATIONS_FILE_NAME: &str = "locations.json";
