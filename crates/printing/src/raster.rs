use std::fs;
use std::path::Path;

use ab_glyph::{point, Font, FontArc, GlyphId, PxScale, ScaleFont};
use image::{codecs::jpeg::JpegEncoder, ColorType, ImageBuffer, ImageEncoder, Rgb};

use crate::display::{BarcodeBlock, Color, DisplayCommand, GlyphRun, Stroke};
use crate::error::PrintError;
use crate::label::{pt_to_mm, PageRegion};

const BASELINE_PX_PER_INCH: f32 = 96.0;
const MM_PER_INCH: f32 = 25.4;

/// DejaVu Sans, drawn when no other font is configured.
const DEFAULT_FONT: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

type Canvas = ImageBuffer<Rgb<u8>, Vec<u8>>;

/// An encoded JPEG capture of one page region.
/// 單一頁面區域的 JPEG 點陣影像。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterPage {
    pub width_px: u32,
    pub height_px: u32,
    pub jpeg: Vec<u8>,
}

/// Oversampling factor over the 96 px/in baseline and JPEG quality.
/// 相對於 96 px/in 基準的取樣倍率與 JPEG 品質。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterOptions {
    pub scale: f32,
    pub jpeg_quality: u8,
}

impl RasterOptions {
    pub fn px_per_mm(&self) -> f32 {
        BASELINE_PX_PER_INCH * self.scale / MM_PER_INCH
    }
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            scale: 2.0,
            jpeg_quality: 80,
        }
    }
}

/// Captures a page region as a fixed-resolution raster.
/// 將頁面區域擷取為固定解析度的點陣影像。
pub trait PageRasterizer {
    fn rasterize(&self, region: &PageRegion) -> Result<RasterPage, PrintError>;
}

/// Default rasterizer drawing display lists onto a white RGB canvas.
/// 預設點陣化器：將繪圖指令繪製於白色 RGB 畫布。
pub struct LabelRasterizer {
    options: RasterOptions,
    font: Option<FontArc>,
}

impl LabelRasterizer {
    /// Uses the bundled DejaVu Sans for text.
    /// 文字使用內建的 DejaVu Sans 字型。
    pub fn new(options: RasterOptions) -> Self {
        Self {
            options,
            font: bundled_font(),
        }
    }

    pub fn with_font(mut self, font: FontArc) -> Self {
        self.font = Some(font);
        self
    }

    /// Loads a TTF/OTF font used for all glyph runs instead of the bundled one.
    /// 載入 TTF/OTF 字型取代內建字型。
    pub fn with_font_file(self, path: impl AsRef<Path>) -> Result<Self, PrintError> {
        let path = path.as_ref();
        let data = fs::read(path)
            .map_err(|err| PrintError::Raster(format!("failed to read font {path:?}: {err}")))?;
        let font = FontArc::try_from_vec(data)
            .map_err(|err| PrintError::Raster(format!("invalid font {path:?}: {err}")))?;
        Ok(self.with_font(font))
    }

    pub fn options(&self) -> RasterOptions {
        self.options
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    fn draw_glyph_run(&self, canvas: &mut Canvas, run: &GlyphRun, px_per_mm: f32) {
        let x = run.position.x * px_per_mm;
        let y = run.position.y * px_per_mm;
        let clip_right = run
            .max_width_mm
            .map(|width| (x + width * px_per_mm).round() as i32)
            .unwrap_or(canvas.width() as i32);
        let size_px = pt_to_mm(run.font_size_pt) * px_per_mm;

        match &self.font {
            Some(font) => {
                draw_text(canvas, font, run, x, y, size_px, clip_right);
                if run.bold {
                    draw_text(canvas, font, run, x + 1.0, y, size_px, clip_right);
                }
            }
            None => {
                let width = estimate_text_width(&run.text, run.font_size_pt) * px_per_mm;
                let right = ((x + width).round() as i32).min(clip_right);
                let height = (size_px * if run.bold { 0.75 } else { 0.6 }).max(1.0);
                let left = x.round() as i32;
                fill_rect(
                    canvas,
                    left,
                    (y + size_px * 0.2).round() as i32,
                    right - left,
                    height.ceil() as i32,
                    run.color,
                );
            }
        }
    }
}

impl Default for LabelRasterizer {
    fn default() -> Self {
        Self::new(RasterOptions::default())
    }
}

impl PageRasterizer for LabelRasterizer {
    fn rasterize(&self, region: &PageRegion) -> Result<RasterPage, PrintError> {
        let px_per_mm = self.options.px_per_mm();
        if !px_per_mm.is_finite() || px_per_mm <= 0.0 {
            return Err(PrintError::Raster(format!(
                "invalid raster scale {}",
                self.options.scale
            )));
        }
        let width_px = (region.width_mm as f32 * px_per_mm).ceil();
        let height_px = (region.height_mm as f32 * px_per_mm).ceil();
        if !(width_px >= 1.0 && height_px >= 1.0 && width_px.is_finite() && height_px.is_finite())
        {
            return Err(PrintError::Raster(format!(
                "page region {}x{} mm is empty",
                region.width_mm, region.height_mm
            )));
        }
        let (width_px, height_px) = (width_px as u32, height_px as u32);

        let mut canvas = ImageBuffer::from_pixel(width_px, height_px, Rgb([255, 255, 255]));
        for command in &region.display_list.commands {
            match command {
                DisplayCommand::GlyphRun(run) => self.draw_glyph_run(&mut canvas, run, px_per_mm),
                DisplayCommand::FillRect(rect) => {
                    let x = (rect.origin.x * px_per_mm).round() as i32;
                    let y = (rect.origin.y * px_per_mm).round() as i32;
                    let w = (rect.size.width * px_per_mm).ceil() as i32;
                    let h = (rect.size.height * px_per_mm).ceil() as i32;
                    fill_rect(&mut canvas, x, y, w, h, rect.color);
                }
                DisplayCommand::HorizontalRule { start, end, stroke } => {
                    let x0 = (start.x * px_per_mm).round() as i32;
                    let x1 = (end.x * px_per_mm).round() as i32;
                    let y = (start.y * px_per_mm).round() as i32;
                    draw_horizontal_line(&mut canvas, x0, x1, y, stroke, px_per_mm);
                }
                DisplayCommand::Barcode(block) => draw_barcode(&mut canvas, block, px_per_mm),
            }
        }

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, self.options.jpeg_quality.clamp(1, 100))
            .write_image(canvas.as_raw(), width_px, height_px, ColorType::Rgb8)
            .map_err(|err| PrintError::Raster(err.to_string()))?;

        tracing::trace!(
            page = region.page_number,
            width_px,
            height_px,
            bytes = jpeg.len(),
            "rasterized page region"
        );

        Ok(RasterPage {
            width_px,
            height_px,
            jpeg,
        })
    }
}

fn bundled_font() -> Option<FontArc> {
    match FontArc::try_from_slice(DEFAULT_FONT) {
        Ok(font) => Some(font),
        Err(err) => {
            tracing::warn!(error = %err, "bundled font is unreadable, text is drawn as blocks");
            None
        }
    }
}

fn draw_text(
    canvas: &mut Canvas,
    font: &FontArc,
    run: &GlyphRun,
    x: f32,
    y: f32,
    size_px: f32,
    clip_right: i32,
) {
    let scale = PxScale::from(size_px);
    let scaled = font.as_scaled(scale);
    let baseline = y + scaled.ascent();
    let mut caret = x;
    let mut previous: Option<GlyphId> = None;

    for ch in run.text.chars() {
        let id = scaled.glyph_id(ch);
        if let Some(prev) = previous {
            caret += scaled.kern(prev, id);
        }
        previous = Some(id);
        let glyph = id.with_scale_and_position(scale, point(caret, baseline));
        caret += scaled.h_advance(id);

        let Some(outline) = font.outline_glyph(glyph) else {
            continue;
        };
        let bounds = outline.px_bounds();
        outline.draw(|gx, gy, coverage| {
            let px = bounds.min.x as i32 + gx as i32;
            let py = bounds.min.y as i32 + gy as i32;
            if px < clip_right {
                blend_pixel(canvas, px, py, run.color, coverage);
            }
        });
    }
}

/// Draws bars snapped to whole pixels, right aligned inside the block area.
/// A code with more modules than the block has pixels is not drawn.
fn draw_barcode(canvas: &mut Canvas, block: &BarcodeBlock, px_per_mm: f32) {
    let count = block.modules.len() as i32;
    if count == 0 {
        return;
    }
    let left = (block.area.origin.x * px_per_mm).round() as i32;
    let width = (block.area.size.width * px_per_mm).floor() as i32;
    if count > width {
        tracing::warn!(
            modules = count,
            width_px = width,
            "barcode does not fit its label, skipped"
        );
        return;
    }
    let module_px = width / count;
    let start = left + width - count * module_px;
    let top = (block.area.origin.y * px_per_mm).round() as i32;
    let height = (block.area.size.height * px_per_mm).round() as i32;

    for (index, bar) in block.modules.iter().enumerate() {
        if *bar {
            fill_rect(
                canvas,
                start + index as i32 * module_px,
                top,
                module_px,
                height,
                block.area.color,
            );
        }
    }
}

fn fill_rect(canvas: &mut Canvas, x: i32, y: i32, width: i32, height: i32, color: Color) {
    if width <= 0 || height <= 0 {
        return;
    }
    let width_px = canvas.width() as i32;
    let height_px = canvas.height() as i32;
    let x0 = x.clamp(0, width_px);
    let y0 = y.clamp(0, height_px);
    let x1 = (x + width).clamp(0, width_px);
    let y1 = (y + height).clamp(0, height_px);
    let rgb = color_to_rgb(color);
    for yy in y0..y1 {
        for xx in x0..x1 {
            canvas.put_pixel(xx as u32, yy as u32, rgb);
        }
    }
}

fn draw_horizontal_line(
    canvas: &mut Canvas,
    x0: i32,
    x1: i32,
    y: i32,
    stroke: &Stroke,
    px_per_mm: f32,
) {
    let thickness = (stroke.width * px_per_mm).round().max(1.0) as i32;
    fill_rect(
        canvas,
        x0.min(x1),
        y,
        (x1 - x0).abs(),
        thickness,
        stroke.color,
    );
}

fn blend_pixel(canvas: &mut Canvas, x: i32, y: i32, color: Color, coverage: f32) {
    if x < 0 || y < 0 || x >= canvas.width() as i32 || y >= canvas.height() as i32 {
        return;
    }
    let alpha = (coverage * color.a).clamp(0.0, 1.0);
    let target = color_to_rgb(color);
    let pixel = canvas.get_pixel_mut(x as u32, y as u32);
    for channel in 0..3 {
        let current = f32::from(pixel.0[channel]);
        let blended = current + (f32::from(target.0[channel]) - current) * alpha;
        pixel.0[channel] = blended.round() as u8;
    }
}

fn color_to_rgb(color: Color) -> Rgb<u8> {
    Rgb([
        clamp_to_u8(color.r),
        clamp_to_u8(color.g),
        clamp_to_u8(color.b),
    ])
}

fn clamp_to_u8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Estimated run width in millimetres for text drawn without a font.
fn estimate_text_width(text: &str, font_size_pt: f32) -> f32 {
    text.chars().count() as f32 * pt_to_mm(font_size_pt) * 0.6
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::{Point, PrintDisplayList, Rectangle, Size};
    use crate::job::LayoutSettings;
    use crate::label::compose_page;
    use crate::layout::resolve;
    use tagsheet_catalog::Item;

    fn region(display_list: PrintDisplayList) -> PageRegion {
        PageRegion {
            page_number: 1,
            width_mm: 101.0,
            height_mm: 29.0,
            display_list,
        }
    }

    #[test]
    fn default_scale_is_about_192_dpi() {
        let options = RasterOptions::default();
        assert!((options.px_per_mm() * 25.4 - 192.0).abs() < 1e-3);
    }

    #[test]
    fn raster_size_follows_region_millimetres() {
        let page = LabelRasterizer::default()
            .rasterize(&region(PrintDisplayList::default()))
            .unwrap();
        assert_eq!(page.width_px, 764);
        assert_eq!(page.height_px, 220);
        assert_eq!(&page.jpeg[..2], &[0xFF, 0xD8]);

        let decoded = image::load_from_memory(&page.jpeg).unwrap();
        assert_eq!(decoded.width(), 764);
        assert_eq!(decoded.height(), 220);
    }

    #[test]
    fn scale_changes_resolution() {
        let rasterizer = LabelRasterizer::new(RasterOptions {
            scale: 1.0,
            jpeg_quality: 60,
        });
        let page = rasterizer
            .rasterize(&region(PrintDisplayList::default()))
            .unwrap();
        assert_eq!(page.width_px, 382);
    }

    #[test]
    fn empty_regions_are_rejected() {
        let mut empty = region(PrintDisplayList::default());
        empty.height_mm = 0.0;
        assert!(matches!(
            LabelRasterizer::default().rasterize(&empty),
            Err(PrintError::Raster(_))
        ));
    }

    #[test]
    fn filled_rectangles_are_dark_in_the_capture() {
        let mut list = PrintDisplayList::default();
        list.push(DisplayCommand::FillRect(Rectangle {
            origin: Point { x: 10.0, y: 10.0 },
            size: Size {
                width: 10.0,
                height: 10.0,
            },
            color: Color::BLACK,
        }));
        let page = LabelRasterizer::default().rasterize(&region(list)).unwrap();
        let luma = image::load_from_memory(&page.jpeg).unwrap().to_luma8();
        assert!(luma.get_pixel(113, 113).0[0] < 40);
        assert!(luma.get_pixel(20, 20).0[0] > 215);
    }

    #[test]
    fn text_uses_the_bundled_font() {
        let rasterizer = LabelRasterizer::default();
        assert!(rasterizer.has_font());

        let mut list = PrintDisplayList::default();
        list.push(DisplayCommand::GlyphRun(GlyphRun {
            text: "Chair".into(),
            font_size_pt: 14.0,
            bold: false,
            position: Point { x: 5.0, y: 5.0 },
            color: Color::BLACK,
            max_width_mm: None,
        }));
        let page = rasterizer.rasterize(&region(list)).unwrap();
        let luma = image::load_from_memory(&page.jpeg).unwrap().to_luma8();
        let dark = luma.pixels().filter(|pixel| pixel.0[0] < 100).count();
        assert!(dark > 50, "only {dark} dark pixels");
    }

    #[test]
    fn oversized_barcode_stays_inside_its_label() {
        let first = Item::new("1", "Lamp", "LGT-001");
        let second = Item::new("2", "Booth sign", "SGN-042")
            .with_ean("EXPO-2026-HALL-C-STAND-0042-BOOTH-ABCDEF");
        let settings = LayoutSettings::default();
        let layout = resolve(&[&first, &second], &settings).unwrap();
        let region = compose_page(&layout.pages[0], &settings);
        let block = region.display_list.barcodes().next().unwrap().clone();
        assert_eq!(block.modules.len(), 475);

        let options = RasterOptions::default();
        let page = LabelRasterizer::new(options).rasterize(&region).unwrap();
        let luma = image::load_from_memory(&page.jpeg).unwrap().to_luma8();

        let px_per_mm = options.px_per_mm();
        let y = ((block.area.origin.y + block.area.size.height / 2.0) * px_per_mm) as u32;
        let block_left = (block.area.origin.x * px_per_mm) as u32;
        let stray = (0..block_left)
            .filter(|x| luma.get_pixel(*x, y).0[0] < 128)
            .count();
        assert_eq!(stray, 0);
    }

    #[test]
    fn missing_font_file_is_a_raster_error() {
        let result = LabelRasterizer::default().with_font_file("/nonexistent/font.ttf");
        assert!(matches!(result, Err(PrintError::Raster(_))));
    }
}
