use tagsheet_catalog::Item;

use crate::barcode::Code128;
use crate::display::{
    BarcodeBlock, Color, DisplayCommand, GlyphRun, Point, PrintDisplayList, Rectangle, Size,
    Stroke,
};
use crate::job::{Channel, LayoutSettings};
use crate::layout::{label_origin, LabelOrigin, LayoutPage};

/// Inner padding between the label edge and its content.
pub const LABEL_PADDING_MM: f32 = 2.0;
/// Nominal barcode bar height.
pub const BARCODE_HEIGHT_MM: f32 = 7.94;

const HEADER_PT: f32 = 8.0;
const NAME_PT: f32 = 11.0;
const PRICE_PT: f32 = 14.0;
const SKU_PT: f32 = 8.0;
const BARCODE_TEXT_PT: f32 = 6.0;
const BARCODE_MODULE_MM: f32 = 0.33;
const BARCODE_MAX_WIDTH_RATIO: f32 = 0.8;
const LINE_GAP_MM: f32 = 0.8;

/// Visual region of one laid-out page, ready for rasterization.
/// 一個已排版頁面的可視區域，供點陣化使用。
#[derive(Debug, Clone)]
pub struct PageRegion {
    pub page_number: u32,
    pub width_mm: f64,
    pub height_mm: f64,
    pub display_list: PrintDisplayList,
}

/// Line box height of a font size, in millimetres.
/// 指定字級的行高（公釐）。
pub fn pt_to_mm(pt: f32) -> f32 {
    pt * 25.4 / 72.0
}

/// Formats a price as `€ 45,00`; absent or zero prices are not printed.
/// 以 `€ 45,00` 格式輸出價格；未提供或為零時不列印。
pub fn format_price(price: Option<f64>) -> Option<String> {
    match price {
        Some(value) if value.is_finite() && value != 0.0 => {
            Some(format!("€ {value:.2}").replace('.', ","))
        }
        _ => None,
    }
}

/// Uppercased exhibitor heading with the channel's fallback name.
/// 轉為大寫的參展商標題，未提供時使用通道預設名稱。
pub fn exhibitor_heading(item: &Item) -> String {
    let name = item
        .exhibitor
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(match Channel::for_item(item.is_permanent) {
            Channel::Permanent => "Exhibitor Nameless",
            Channel::NonPermanent => "TICA",
        });
    name.to_uppercase()
}

/// Builds the page region for one row of labels.
/// 為一列標籤建立頁面區域。
pub fn compose_page(page: &LayoutPage<&Item>, settings: &LayoutSettings) -> PageRegion {
    let mut display_list = PrintDisplayList::default();
    for (slot, item) in page.items.iter().enumerate() {
        compose_label(
            &mut display_list,
            item,
            label_origin(settings, slot),
            settings,
        );
    }
    PageRegion {
        page_number: page.page_number,
        width_mm: settings.page_width,
        height_mm: settings.region_height(),
        display_list,
    }
}

/// Appends the drawing commands of a single label at `origin`.
pub fn compose_label(
    display_list: &mut PrintDisplayList,
    item: &Item,
    origin: LabelOrigin,
    settings: &LayoutSettings,
) {
    let left = origin.x as f32 + LABEL_PADDING_MM;
    let top = origin.y as f32 + LABEL_PADDING_MM;
    let inner_width = (settings.label_width as f32 - 2.0 * LABEL_PADDING_MM).max(0.0);
    let bottom = origin.y as f32 + settings.label_height as f32 - LABEL_PADDING_MM;
    let grey = Color::grey(0.4);

    push_text(
        display_list,
        exhibitor_heading(item),
        HEADER_PT,
        false,
        Point { x: left, y: top },
        grey,
        inner_width,
    );
    let rule_y = top + pt_to_mm(HEADER_PT) + 0.3;
    display_list.push(DisplayCommand::HorizontalRule {
        start: Point { x: left, y: rule_y },
        end: Point {
            x: left + inner_width,
            y: rule_y,
        },
        stroke: Stroke {
            width: 0.2,
            color: Color::grey(0.6),
        },
    });

    let name_y = rule_y + LINE_GAP_MM;
    push_text(
        display_list,
        item.name.clone(),
        NAME_PT,
        true,
        Point { x: left, y: name_y },
        Color::BLACK,
        inner_width,
    );

    if let Some(price) = format_price(item.price) {
        push_text(
            display_list,
            price,
            PRICE_PT,
            true,
            Point {
                x: left,
                y: name_y + pt_to_mm(NAME_PT) + LINE_GAP_MM,
            },
            Color::BLACK,
            inner_width,
        );
    }

    let barcode_width = item
        .ean
        .as_deref()
        .map(str::trim)
        .filter(|ean| !ean.is_empty())
        .and_then(|ean| push_barcode(display_list, ean, left + inner_width, bottom, inner_width))
        .unwrap_or(0.0);

    if !item.sku.is_empty() {
        push_text(
            display_list,
            item.sku.clone(),
            SKU_PT,
            false,
            Point {
                x: left,
                y: bottom - pt_to_mm(SKU_PT),
            },
            grey,
            (inner_width - barcode_width - 1.0).max(0.0),
        );
    }
}

/// Draws the barcode anchored at the bottom-right corner; returns its width.
fn push_barcode(
    display_list: &mut PrintDisplayList,
    value: &str,
    right: f32,
    bottom: f32,
    inner_width: f32,
) -> Option<f32> {
    let code = match Code128::encode(value) {
        Ok(code) => code,
        Err(err) => {
            tracing::warn!(value, error = %err, "invalid barcode value");
            return None;
        }
    };

    let modules = code.modules();
    let width = (modules.len() as f32 * BARCODE_MODULE_MM)
        .min(inner_width * BARCODE_MAX_WIDTH_RATIO);
    let text_height = pt_to_mm(BARCODE_TEXT_PT);
    let bar_top = bottom - text_height - BARCODE_HEIGHT_MM;
    let origin = Point {
        x: right - width,
        y: bar_top,
    };

    display_list.push(DisplayCommand::Barcode(BarcodeBlock {
        area: Rectangle {
            origin,
            size: Size {
                width,
                height: BARCODE_HEIGHT_MM,
            },
            color: Color::BLACK,
        },
        modules,
    }));
    push_text(
        display_list,
        code.value().to_string(),
        BARCODE_TEXT_PT,
        false,
        Point {
            x: origin.x,
            y: bottom - text_height,
        },
        Color::BLACK,
        width,
    );
    Some(width)
}

fn push_text(
    display_list: &mut PrintDisplayList,
    text: String,
    font_size_pt: f32,
    bold: bool,
    position: Point,
    color: Color,
    max_width_mm: f32,
) {
    if text.is_empty() {
        return;
    }
    display_list.push(DisplayCommand::GlyphRun(GlyphRun {
        text,
        font_size_pt,
        bold,
        position,
        color,
        max_width_mm: Some(max_width_mm),
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::resolve;

    fn chair() -> Item {
        Item::new("1", "Conference Chair", "FUR-001")
            .with_price(45.0)
            .with_ean("8711234567890")
            .with_exhibitor("Acme Events")
            .permanent(true)
    }

    #[test]
    fn formats_prices_with_comma_decimals() {
        assert_eq!(format_price(Some(45.0)).as_deref(), Some("€ 45,00"));
        assert_eq!(format_price(Some(12.5)).as_deref(), Some("€ 12,50"));
        assert_eq!(format_price(Some(0.0)), None);
        assert_eq!(format_price(None), None);
    }

    #[test]
    fn heading_falls_back_per_channel() {
        let permanent = Item::new("1", "Chair", "X").permanent(true);
        let paper = Item::new("2", "Lamp", "Y");
        assert_eq!(exhibitor_heading(&permanent), "EXHIBITOR NAMELESS");
        assert_eq!(exhibitor_heading(&paper), "TICA");
        assert_eq!(exhibitor_heading(&chair()), "ACME EVENTS");
    }

    #[test]
    fn page_region_spans_page_width_and_one_row() {
        let settings = LayoutSettings {
            margin_top: 1.0,
            gap_y: 2.0,
            ..LayoutSettings::default()
        };
        let item = chair();
        let stream = vec![&item, &item];
        let layout = resolve(&stream, &settings).unwrap();
        let region = compose_page(&layout.pages[0], &settings);

        assert_eq!(region.width_mm, 101.0);
        assert_eq!(region.height_mm, 32.0);
        assert_eq!(region.display_list.barcodes().count(), 2);

        let names: Vec<f32> = region
            .display_list
            .glyph_runs()
            .filter(|run| run.text == "Conference Chair")
            .map(|run| run.position.x)
            .collect();
        assert_eq!(names, vec![2.0, 54.0]);
    }

    #[test]
    fn barcode_stays_inside_the_label() {
        let settings = LayoutSettings::default();
        let item = chair();
        let mut list = PrintDisplayList::default();
        compose_label(&mut list, &item, label_origin(&settings, 0), &settings);

        let block = list.barcodes().next().unwrap();
        let inner = settings.label_width as f32 - 2.0 * LABEL_PADDING_MM;
        assert!(block.area.size.width <= inner * BARCODE_MAX_WIDTH_RATIO + 1e-4);
        let right = block.area.origin.x + block.area.size.width;
        assert!((right - (settings.label_width as f32 - LABEL_PADDING_MM)).abs() < 1e-4);
        assert!(list.glyph_runs().any(|run| run.text == "8711234567890"));
    }

    #[test]
    fn invalid_barcode_value_keeps_the_rest_of_the_label() {
        let settings = LayoutSettings::default();
        let item = Item::new("4", "Caf\u{e9} Table", "FUR-009").with_ean("caf\u{e9}");
        let mut list = PrintDisplayList::default();
        compose_label(&mut list, &item, label_origin(&settings, 0), &settings);

        assert_eq!(list.barcodes().count(), 0);
        assert!(list.glyph_runs().any(|run| run.text == "FUR-009"));
        assert!(list.glyph_runs().all(|run| !run.text.starts_with("\u{20ac}")));
    }
}
