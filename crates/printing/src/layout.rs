use crate::error::PrintError;
use crate::job::LayoutSettings;

/// Position of a label's top-left corner inside its page region, in millimetres.
/// 標籤左上角於頁面區域內的位置（公釐）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelOrigin {
    pub x: f64,
    pub y: f64,
}

/// A single physical page: one row of at most `items_per_row` labels.
/// 單一實體頁面：最多 `items_per_row` 張標籤的一列。
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutPage<T> {
    pub page_number: u32,
    pub items: Vec<T>,
}

/// Result of laying out one channel's item stream.
/// 單一通道商品串流的排版結果。
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutResult<T> {
    pub items_per_row: usize,
    pub pages: Vec<LayoutPage<T>>,
}

impl<T> LayoutResult<T> {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn total_items(&self) -> usize {
        self.pages.iter().map(|page| page.items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Number of labels fitting on one row, never less than one.
/// 一列可容納的標籤數量，至少為一。
pub fn items_per_row(settings: &LayoutSettings) -> Result<usize, PrintError> {
    let pitch = settings.pitch();
    if !pitch.is_finite() || pitch <= 0.0 {
        return Err(PrintError::InvalidLayoutSettings { pitch });
    }
    let effective_width = settings.page_width - settings.margin_left;
    let fitting = ((effective_width + settings.gap_x) / pitch).floor();
    if fitting.is_finite() && fitting >= 1.0 {
        Ok(fitting as usize)
    } else {
        Ok(1)
    }
}

/// Splits the stream into consecutive pages of `items_per_row`, preserving order.
/// 依序將串流切分為每頁 `items_per_row` 個項目的頁面。
pub fn resolve<T: Clone>(
    items: &[T],
    settings: &LayoutSettings,
) -> Result<LayoutResult<T>, PrintError> {
    let per_row = items_per_row(settings)?;
    let pages = items
        .chunks(per_row)
        .enumerate()
        .map(|(index, chunk)| LayoutPage {
            page_number: index as u32 + 1,
            items: chunk.to_vec(),
        })
        .collect();

    Ok(LayoutResult {
        items_per_row: per_row,
        pages,
    })
}

/// Places the label at `slot` (0-based) within a page region.
/// 計算第 `slot` 個（由零起算）標籤在頁面區域中的位置。
pub fn label_origin(settings: &LayoutSettings, slot: usize) -> LabelOrigin {
    LabelOrigin {
        x: settings.margin_left + slot as f64 * settings.pitch(),
        y: settings.margin_top,
    }
}
