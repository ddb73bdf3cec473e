use std::fmt;

use serde::{Deserialize, Serialize};

const MM_PER_INCH: f64 = 25.4;
const POINTS_PER_INCH: f64 = 72.0;

/// Converts millimetres to PDF points (1/72").
/// 將公釐換算為 PDF 點數（1/72 英吋）。
pub fn mm_to_points(mm: f64) -> f64 {
    mm / MM_PER_INCH * POINTS_PER_INCH
}

/// One of the two label output streams, chosen by the item durability flag.
/// 依商品耐久標記區分的兩條標籤輸出通道之一。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Permanent,
    NonPermanent,
}

impl Channel {
    /// Processing order for a print action.
    pub const ALL: [Channel; 2] = [Channel::Permanent, Channel::NonPermanent];

    pub fn for_item(is_permanent: bool) -> Self {
        if is_permanent {
            Channel::Permanent
        } else {
            Channel::NonPermanent
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Channel::Permanent => "permanent",
            Channel::NonPermanent => "non-permanent",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Orientation of a physical page.
/// 實體頁面的方向。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

impl Orientation {
    /// Landscape only when strictly wider than tall.
    /// 僅在寬度嚴格大於高度時為橫向。
    pub fn from_dimensions(width: f64, height: f64) -> Self {
        if width > height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Orientation::Portrait => "portrait",
            Orientation::Landscape => "landscape",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Physical page size, orientation and broker device name for one channel.
/// 單一通道的實體紙張尺寸、方向與印表機名稱。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterProfile {
    pub name: String,
    pub width: f64,
    pub height: f64,
    pub orientation: Orientation,
}

impl PrinterProfile {
    pub fn new(name: impl Into<String>, width: f64, height: f64, orientation: Orientation) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            orientation,
        }
    }

    /// A profile without a device name cannot receive jobs.
    /// 未設定印表機名稱的設定檔無法接收列印工作。
    pub fn is_configured(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

impl Default for PrinterProfile {
    fn default() -> Self {
        Self::new("", 102.5, 32.5, Orientation::Portrait)
    }
}

/// A named printer location pairing the two channel profiles.
/// 具名的印表機位置，包含兩個通道的設定檔。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrinterGroup {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub permanent_printer: PrinterProfile,
    #[serde(default)]
    pub non_permanent_printer: PrinterProfile,
}

impl PrinterGroup {
    pub fn profile(&self, channel: Channel) -> &PrinterProfile {
        match channel {
            Channel::Permanent => &self.permanent_printer,
            Channel::NonPermanent => &self.non_permanent_printer,
        }
    }

    pub fn profile_mut(&mut self, channel: Channel) -> &mut PrinterProfile {
        match channel {
            Channel::Permanent => &mut self.permanent_printer,
            Channel::NonPermanent => &mut self.non_permanent_printer,
        }
    }
}

/// Grid geometry of the label sheet, all values in millimetres.
/// 標籤頁的網格幾何設定，單位皆為公釐。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutSettings {
    pub page_width: f64,
    pub margin_top: f64,
    pub margin_left: f64,
    pub gap_x: f64,
    pub gap_y: f64,
    pub label_width: f64,
    pub label_height: f64,
}

impl LayoutSettings {
    /// Horizontal distance between the left edges of adjacent labels.
    /// 相鄰標籤左緣之間的水平距離。
    pub fn pitch(&self) -> f64 {
        self.label_width + self.gap_x
    }

    /// Height of one page region (a single row of labels).
    /// 單一頁面區域（一列標籤）的高度。
    pub fn region_height(&self) -> f64 {
        self.margin_top + self.label_height + self.gap_y
    }
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            page_width: 101.0,
            margin_top: 0.0,
            margin_left: 0.0,
            gap_x: 3.0,
            gap_y: 0.0,
            label_width: 49.0,
            label_height: 29.0,
        }
    }
}
