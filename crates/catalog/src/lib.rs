//! Item catalog and label selection shared by the printing pipeline and CLI.
//! 列印管線與命令列共用的商品目錄與標籤選取資料。

pub mod item;
pub mod selection;

pub use item::{Catalog, CatalogError, Item};
pub use selection::{Selection, SelectionError};
