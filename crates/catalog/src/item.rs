use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating a catalog.
/// 載入或驗證商品目錄時可能發生的錯誤。
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse catalog {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("catalog contains duplicate item id '{0}'")]
    DuplicateId(String),
    #[error("item '{id}' has a negative price")]
    NegativePrice { id: String },
}

/// A single catalog article that can be printed on a label.
/// 可列印於標籤上的單一商品。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub sku: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ean: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exhibitor: Option<String>,
    /// Printed on durable sticker stock instead of paper.
    /// 是否列印於永久性貼紙上（而非一般紙張）。
    #[serde(default)]
    pub is_permanent: bool,
}

impl Item {
    pub fn new(id: impl Into<String>, name: impl Into<String>, sku: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            sku: sku.into(),
            price: None,
            ean: None,
            exhibitor: None,
            is_permanent: false,
        }
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_ean(mut self, ean: impl Into<String>) -> Self {
        self.ean = Some(ean.into());
        self
    }

    pub fn with_exhibitor(mut self, exhibitor: impl Into<String>) -> Self {
        self.exhibitor = Some(exhibitor.into());
        self
    }

    pub fn permanent(mut self, is_permanent: bool) -> Self {
        self.is_permanent = is_permanent;
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    Bare(Vec<Item>),
    Wrapped { items: Vec<Item> },
}

/// Read-only snapshot of the articles available for labelling.
/// 可供製作標籤的商品快照（唯讀）。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    items: Vec<Item>,
}

impl Catalog {
    /// Builds a catalog, rejecting duplicate ids and negative prices.
    /// 建立目錄，並拒絕重複的識別碼與負數價格。
    pub fn new(items: Vec<Item>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::with_capacity(items.len());
        for item in &items {
            if !seen.insert(item.id.as_str()) {
                return Err(CatalogError::DuplicateId(item.id.clone()));
            }
            if matches!(item.price, Some(price) if price < 0.0) {
                return Err(CatalogError::NegativePrice {
                    id: item.id.clone(),
                });
            }
        }
        Ok(Self { items })
    }

    /// Loads a catalog from a JSON file holding either an array or `{ "items": [...] }`.
    /// 從 JSON 檔載入目錄，可為陣列或 `{ "items": [...] }` 形式。
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref().to_path_buf();
        let contents = fs::read_to_string(&path).map_err(|source| CatalogError::Read {
            path: path.clone(),
            source,
        })?;
        let file: CatalogFile =
            serde_json::from_str(&contents).map_err(|source| CatalogError::Parse {
                path: path.clone(),
                source,
            })?;
        let items = match file {
            CatalogFile::Bare(items) => items,
            CatalogFile::Wrapped { items } => items,
        };
        Self::new(items)
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn find(&self, id: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Case-insensitive match on name or SKU.
    /// 以名稱或 SKU 進行不分大小寫的搜尋。
    pub fn search(&self, term: &str) -> Vec<&Item> {
        let needle = term.to_lowercase();
        self.items
            .iter()
            .filter(|item| {
                item.name.to_lowercase().contains(&needle)
                    || item.sku.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Overrides the durability flag of an item; returns false when the id is unknown.
    /// 變更商品的永久標記；找不到識別碼時回傳 false。
    pub fn set_permanent(&mut self, id: &str, is_permanent: bool) -> bool {
        match self.items.iter_mut().find(|item| item.id == id) {
            Some(item) => {
                item.is_permanent = is_permanent;
                true
            }
            None => false,
        }
    }
}
