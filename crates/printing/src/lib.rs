//! Label sheet printing pipeline: layout, rasterization, PDF assembly and channel dispatch.
//! 標籤列印管線：排版、點陣化、PDF 組裝與通道派送。

pub mod barcode;
pub mod controller;
pub mod display;
pub mod document;
pub mod error;
pub mod job;
pub mod label;
pub mod layout;
pub mod platform;
pub mod raster;
pub mod router;

pub use barcode::{BarcodeError, Code128};
pub use controller::{run_print_action, ChannelOutcome, PrintReport};
pub use display::{BarcodeBlock, DisplayCommand, GlyphRun, PrintDisplayList};
pub use document::{assemble, DocumentPage, DownloadArtifact, PrintDocument};
pub use error::{PrintError, TransportError};
pub use job::{Channel, LayoutSettings, Orientation, PrinterGroup, PrinterProfile};
pub use label::{compose_page, PageRegion};
pub use layout::{items_per_row, label_origin, resolve, LayoutPage, LayoutResult};
pub use platform::{PrintTransport, SessionState};
pub use raster::{LabelRasterizer, PageRasterizer, RasterOptions, RasterPage};
pub use router::{ChannelRouter, ChannelStreams, RoutedDocuments};
