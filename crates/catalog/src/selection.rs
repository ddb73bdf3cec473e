use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

/// Errors raised while parsing selection input.
/// 解析選取輸入時可能發生的錯誤。
#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("selection entry '{0}' must look like ID=QTY")]
    MalformedPair(String),
    #[error("invalid quantity '{value}' for item '{id}'")]
    InvalidQuantity { id: String, value: String },
    #[error("failed to read selection {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse selection {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("selection file {0} must contain a JSON object of id -> quantity")]
    NotAnObject(PathBuf),
}

/// Ordered mapping of item id to a strictly positive label quantity.
/// 商品識別碼對應標籤數量（必為正數）的有序集合。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    entries: Vec<(String, u32)>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the quantity for an item; zero or negative quantities remove the entry.
    /// 設定商品數量；數量為零或負數時移除該項目。
    pub fn set(&mut self, id: impl Into<String>, quantity: i64) {
        let id = id.into();
        if quantity <= 0 {
            self.remove(&id);
            return;
        }
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        match self.entries.iter_mut().find(|(existing, _)| *existing == id) {
            Some(entry) => entry.1 = quantity,
            None => self.entries.push((id, quantity)),
        }
    }

    pub fn get(&self, id: &str) -> u32 {
        self.entries
            .iter()
            .find(|(existing, _)| existing == id)
            .map(|(_, quantity)| *quantity)
            .unwrap_or(0)
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(existing, _)| existing != id);
        before != self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterates entries in insertion order.
    /// 依插入順序列舉項目。
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.entries.iter().map(|(id, qty)| (id.as_str(), *qty))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of label units across all entries.
    /// 所有項目的標籤總張數。
    pub fn units(&self) -> u64 {
        self.entries.iter().map(|(_, qty)| u64::from(*qty)).sum()
    }

    /// Parses a single `ID=QTY` pair.
    pub fn parse_pair(input: &str) -> Result<(String, i64), SelectionError> {
        let (id, quantity) = input
            .split_once('=')
            .ok_or_else(|| SelectionError::MalformedPair(input.to_string()))?;
        let id = id.trim();
        if id.is_empty() {
            return Err(SelectionError::MalformedPair(input.to_string()));
        }
        let quantity = quantity
            .trim()
            .parse::<i64>()
            .map_err(|_| SelectionError::InvalidQuantity {
                id: id.to_string(),
                value: quantity.trim().to_string(),
            })?;
        Ok((id.to_string(), quantity))
    }

    /// Builds a selection from `ID=QTY` pairs; later pairs override earlier ones.
    /// 由多個 `ID=QTY` 建立選取；後出現者覆寫先前的數量。
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self, SelectionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut selection = Self::new();
        for pair in pairs {
            let (id, quantity) = Self::parse_pair(pair.as_ref())?;
            selection.set(id, quantity);
        }
        Ok(selection)
    }

    /// Loads `{ "id": qty, ... }` from a JSON file, keeping file order.
    /// 從 JSON 檔載入 `{ "id": qty }`，並保留檔案中的順序。
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SelectionError> {
        let path = path.as_ref().to_path_buf();
        let contents = fs::read_to_string(&path).map_err(|source| SelectionError::Read {
            path: path.clone(),
            source,
        })?;
        let value: Value =
            serde_json::from_str(&contents).map_err(|source| SelectionError::Parse {
                path: path.clone(),
                source,
            })?;
        let Value::Object(map) = value else {
            return Err(SelectionError::NotAnObject(path));
        };

        let mut selection = Self::new();
        for (id, quantity) in map {
            let parsed = quantity
                .as_i64()
                .ok_or_else(|| SelectionError::InvalidQuantity {
                    id: id.clone(),
                    value: quantity.to_string(),
                })?;
            selection.set(id, parsed);
        }
        Ok(selection)
    }
}
