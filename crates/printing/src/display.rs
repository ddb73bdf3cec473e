//! Device-independent drawing commands produced by label composition.
//! 標籤組版產生的裝置無關繪圖指令。
//!
//! Coordinates are millimetres from the top-left corner of the page region.

/// Ordered drawing commands for one page region.
#[derive(Debug, Clone, Default)]
pub struct PrintDisplayList {
    pub commands: Vec<DisplayCommand>,
}

impl PrintDisplayList {
    pub fn push(&mut self, command: DisplayCommand) {
        self.commands.push(command);
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// 所有文字指令。 / Every text run, in drawing order.
    pub fn glyph_runs(&self) -> impl Iterator<Item = &GlyphRun> {
        self.commands.iter().filter_map(|command| match command {
            DisplayCommand::GlyphRun(run) => Some(run),
            _ => None,
        })
    }

    /// 所有條碼區塊。 / Every barcode block, in drawing order.
    pub fn barcodes(&self) -> impl Iterator<Item = &BarcodeBlock> {
        self.commands.iter().filter_map(|command| match command {
            DisplayCommand::Barcode(block) => Some(block),
            _ => None,
        })
    }
}

#[derive(Debug, Clone)]
pub enum DisplayCommand {
    GlyphRun(GlyphRun),
    FillRect(Rectangle),
    HorizontalRule {
        start: Point,
        end: Point,
        stroke: Stroke,
    },
    Barcode(BarcodeBlock),
}

/// One line of text; `position` is the top-left corner of its line box.
/// 單行文字；`position` 為行框的左上角。
///
/// Text wider than `max_width_mm` is clipped by the rasterizer.
#[derive(Debug, Clone)]
pub struct GlyphRun {
    pub text: String,
    pub font_size_pt: f32,
    pub bold: bool,
    pub position: Point,
    pub color: Color,
    pub max_width_mm: Option<f32>,
}

/// Code 128 modules drawn across `area`; `true` marks a bar.
/// 於 `area` 內繪製的 Code 128 模組；`true` 代表黑條。
#[derive(Debug, Clone)]
pub struct BarcodeBlock {
    pub area: Rectangle,
    pub modules: Vec<bool>,
}

#[derive(Debug, Clone, Copy)]
pub struct Rectangle {
    pub origin: Point,
    pub size: Size,
    pub color: Color,
}

#[derive(Debug, Clone, Copy)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// RGB in `0.0..=1.0`; alpha blends over what is already drawn.
/// RGB（0.0 至 1.0）；alpha 與已繪製內容混合。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn grey(level: f32) -> Self {
        Self::new(level, level, level, 1.0)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Stroke {
    pub width: f32,
    pub color: Color,
}
