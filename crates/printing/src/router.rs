use std::time::Instant;

use tagsheet_catalog::{Catalog, Item, Selection};

use crate::document::{assemble, PrintDocument};
use crate::error::PrintError;
use crate::job::{Channel, LayoutSettings, PrinterGroup, PrinterProfile};
use crate::label::compose_page;
use crate::layout::resolve;
use crate::raster::{PageRasterizer, RasterPage};

/// The selection expanded into one ordered item stream per channel.
/// 依通道展開後的有序商品串流。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelStreams<'a> {
    pub permanent: Vec<&'a Item>,
    pub non_permanent: Vec<&'a Item>,
}

impl<'a> ChannelStreams<'a> {
    pub fn stream(&self, channel: Channel) -> &[&'a Item] {
        match channel {
            Channel::Permanent => &self.permanent,
            Channel::NonPermanent => &self.non_permanent,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.permanent.is_empty() && self.non_permanent.is_empty()
    }

    pub fn units(&self) -> usize {
        self.permanent.len() + self.non_permanent.len()
    }
}

/// Per-channel documents produced by [`ChannelRouter::route`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoutedDocuments {
    pub permanent: Option<PrintDocument>,
    pub non_permanent: Option<PrintDocument>,
}

impl RoutedDocuments {
    pub fn get(&self, channel: Channel) -> Option<&PrintDocument> {
        match channel {
            Channel::Permanent => self.permanent.as_ref(),
            Channel::NonPermanent => self.non_permanent.as_ref(),
        }
    }
}

/// Splits selections by durability and renders each stream with its profile.
/// 依耐久標記分流，並以各通道的印表機設定檔輸出文件。
pub struct ChannelRouter<R> {
    settings: LayoutSettings,
    rasterizer: R,
}

impl<R: PageRasterizer> ChannelRouter<R> {
    pub fn new(settings: LayoutSettings, rasterizer: R) -> Self {
        Self {
            settings,
            rasterizer,
        }
    }

    pub fn settings(&self) -> &LayoutSettings {
        &self.settings
    }

    pub fn rasterizer(&self) -> &R {
        &self.rasterizer
    }

    /// Expands every selected unit into exactly one channel stream.
    /// 將每個選取單位展開至唯一對應的通道串流。
    pub fn split<'a>(&self, selection: &Selection, catalog: &'a Catalog) -> ChannelStreams<'a> {
        let mut streams = ChannelStreams::default();
        for (id, quantity) in selection.iter() {
            let Some(item) = catalog.find(id) else {
                tracing::warn!(id, "selected item is missing from the catalog");
                continue;
            };
            let stream = match Channel::for_item(item.is_permanent) {
                Channel::Permanent => &mut streams.permanent,
                Channel::NonPermanent => &mut streams.non_permanent,
            };
            stream.extend(std::iter::repeat(item).take(quantity as usize));
        }
        streams
    }

    /// Renders one channel; an empty stream yields no document.
    /// 輸出單一通道；串流為空時不產生文件。
    pub fn render_channel(
        &self,
        channel: Channel,
        stream: &[&Item],
        profile: &PrinterProfile,
    ) -> Result<Option<PrintDocument>, PrintError> {
        if stream.is_empty() {
            return Ok(None);
        }
        if !profile.is_configured() {
            return Err(PrintError::UnconfiguredPrinter { channel });
        }

        let started = Instant::now();
        let rasters = self.rasterize_stream(stream)?;
        let document = assemble(rasters, profile.width, profile.height)?;
        tracing::info!(
            channel = %channel,
            pages = document.page_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "rendered channel"
        );
        Ok(Some(document))
    }

    /// Renders both channels, failing on the first error.
    /// 輸出兩個通道，遇到第一個錯誤即停止。
    pub fn route(
        &self,
        selection: &Selection,
        catalog: &Catalog,
        group: &PrinterGroup,
    ) -> Result<RoutedDocuments, PrintError> {
        let streams = self.split(selection, catalog);
        if streams.is_empty() {
            return Err(PrintError::NoLabelsSelected);
        }
        for channel in Channel::ALL {
            if !streams.stream(channel).is_empty() && !group.profile(channel).is_configured() {
                return Err(PrintError::UnconfiguredPrinter { channel });
            }
        }

        Ok(RoutedDocuments {
            permanent: self.render_channel(
                Channel::Permanent,
                &streams.permanent,
                &group.permanent_printer,
            )?,
            non_permanent: self.render_channel(
                Channel::NonPermanent,
                &streams.non_permanent,
                &group.non_permanent_printer,
            )?,
        })
    }

    /// Renders the on-screen sheet for download: permanent rows, then non-permanent rows.
    /// 產生供下載的標籤頁：先永久通道各列，再一般通道各列。
    pub fn sheet(
        &self,
        selection: &Selection,
        catalog: &Catalog,
    ) -> Result<PrintDocument, PrintError> {
        let streams = self.split(selection, catalog);
        if streams.is_empty() {
            return Err(PrintError::NoLabelsSelected);
        }
        let mut rasters = self.rasterize_stream(&streams.permanent)?;
        rasters.extend(self.rasterize_stream(&streams.non_permanent)?);
        assemble(
            rasters,
            self.settings.page_width,
            self.settings.region_height(),
        )
    }

    fn rasterize_stream(&self, stream: &[&Item]) -> Result<Vec<RasterPage>, PrintError> {
        let layout = resolve(stream, &self.settings)?;
        layout
            .pages
            .iter()
            .map(|page| self.rasterizer.rasterize(&compose_page(page, &self.settings)))
            .collect()
    }
}
