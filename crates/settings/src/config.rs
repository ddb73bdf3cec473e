use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tagsheet_printing::{LayoutSettings, RasterOptions};

use crate::storage::{read_json, write_json_atomic, StoreError};

const CONFIG_VERSION: u32 = 1;
/// Default address of the local print broker.
pub const DEFAULT_BROKER_URL: &str = "ws://localhost:8182";

/// Application configuration persisted as `tagsheet.json`.
/// 以 `tagsheet.json` 儲存的應用程式設定。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub layout: LayoutSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_group_id: Option<u64>,
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub raster: RasterConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_path: Option<PathBuf>,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            layout: LayoutSettings::default(),
            active_group_id: None,
            broker: BrokerConfig::default(),
            raster: RasterConfig::default(),
            font_path: None,
        }
    }
}

impl AppConfig {
    pub fn sanitize(&mut self) {
        if self.version == 0 {
            self.version = CONFIG_VERSION;
        }
        sanitize_layout(&mut self.layout);
        self.broker.sanitize();
        self.raster.sanitize();
    }
}

/// Replaces negative or non-finite lengths with their defaults.
/// 將負值或非有限數的長度還原為預設值。
fn sanitize_layout(layout: &mut LayoutSettings) {
    let defaults = LayoutSettings::default();
    let fields = [
        (&mut layout.page_width, defaults.page_width),
        (&mut layout.margin_top, defaults.margin_top),
        (&mut layout.margin_left, defaults.margin_left),
        (&mut layout.gap_x, defaults.gap_x),
        (&mut layout.gap_y, defaults.gap_y),
        (&mut layout.label_width, defaults.label_width),
        (&mut layout.label_height, defaults.label_height),
    ];
    for (value, default) in fields {
        if !value.is_finite() || *value < 0.0 {
            *value = default;
        }
    }
}

/// Broker endpoint and signing credentials.
/// 列印代理程式位址與簽章憑證。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerConfig {
    #[serde(default = "default_broker_url")]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key_path: Option<PathBuf>,
}

fn default_broker_url() -> String {
    DEFAULT_BROKER_URL.to_string()
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            url: default_broker_url(),
            certificate_path: None,
            private_key_path: None,
        }
    }
}

impl BrokerConfig {
    fn sanitize(&mut self) {
        if self.url.trim().is_empty() {
            self.url = default_broker_url();
        }
    }
}

/// Raster capture constants.
/// 點陣擷取參數。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RasterConfig {
    #[serde(default = "default_scale")]
    pub scale: f32,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

fn default_scale() -> f32 {
    2.0
}

fn default_jpeg_quality() -> u8 {
    80
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            scale: default_scale(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

impl RasterConfig {
    fn sanitize(&mut self) {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            self.scale = default_scale();
        }
        self.scale = self.scale.clamp(0.5, 8.0);
        if self.jpeg_quality == 0 {
            self.jpeg_quality = default_jpeg_quality();
        }
        self.jpeg_quality = self.jpeg_quality.min(100);
    }

    pub fn options(&self) -> RasterOptions {
        RasterOptions {
            scale: self.scale,
            jpeg_quality: self.jpeg_quality,
        }
    }
}

/// Loads and saves [`AppConfig`], sanitizing on every change.
/// 載入並儲存 [`AppConfig`]，每次變更都會重新整理數值。
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    data: AppConfig,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>, config: AppConfig) -> Self {
        let mut data = config;
        data.sanitize();
        Self {
            path: path.into(),
            data,
        }
    }

    /// Missing files yield the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let data = read_json::<AppConfig>(&path)?.unwrap_or_default();
        Ok(Self::new(path, data))
    }

    pub fn config(&self) -> &AppConfig {
        &self.data
    }

    pub fn update<F>(&mut self, op: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut AppConfig),
    {
        op(&mut self.data);
        self.data.sanitize();
        self.save()
    }

    pub fn save(&self) -> Result<(), StoreError> {
        write_json_atomic(&self.path, &self.data)?;
        tracing::debug!(path = %self.path.display(), "saved configuration");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
