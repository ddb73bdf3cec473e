use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tagsheet_printing::{Orientation, PrinterGroup, PrinterProfile};
use thiserror::Error;

use crate::storage::{read_json, write_json_atomic, StoreError};

/// Name of the location created for an empty store.
pub const DEFAULT_LOCATION_NAME: &str = "Default Location";

/// 印表機位置存放區錯誤。 / Errors raised by the printer location store.
#[derive(Debug, Error)]
pub enum LocationError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("location name must not be empty")]
    EmptyName,
    #[error("location {0} not found")]
    NotFound(u64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocationsFile {
    #[serde(default = "first_id")]
    next_id: u64,
    #[serde(default)]
    groups: Vec<PrinterGroup>,
}

fn first_id() -> u64 {
    1
}

impl Default for LocationsFile {
    fn default() -> Self {
        Self {
            next_id: first_id(),
            groups: Vec::new(),
        }
    }
}

/// 以 JSON 儲存的印表機位置清單，識別碼自動遞增且不重複使用。 / Printer locations persisted as JSON with auto-incremented, never reused ids.
#[derive(Debug)]
pub struct PrinterGroupStore {
    path: PathBuf,
    data: LocationsFile,
}

impl PrinterGroupStore {
    /// 載入位置清單；檔案不存在時為空。 / Loads the store, empty when the file is missing.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LocationError> {
        let path = path.as_ref().to_path_buf();
        let mut data = read_json::<LocationsFile>(&path)?.unwrap_or_default();
        let highest = data.groups.iter().map(|group| group.id).max().unwrap_or(0);
        data.next_id = data.next_id.max(highest + 1);
        Ok(Self { path, data })
    }

    /// 清單為空時建立預設位置。 / Seeds the default location when the store is empty.
    pub fn initialize(&mut self) -> Result<Option<u64>, LocationError> {
        if !self.data.groups.is_empty() {
            return Ok(None);
        }
        let profile = PrinterProfile::new("", 50.0, 30.0, Orientation::Portrait);
        let id = self.add(DEFAULT_LOCATION_NAME, profile.clone(), profile)?;
        tracing::info!(id, "created default printer location");
        Ok(Some(id))
    }

    /// 所有位置，依建立順序。 / All locations in creation order.
    pub fn list(&self) -> &[PrinterGroup] {
        &self.data.groups
    }

    pub fn get(&self, id: u64) -> Option<&PrinterGroup> {
        self.data.groups.iter().find(|group| group.id == id)
    }

    /// 依名稱（不分大小寫）尋找位置。 / Case-insensitive lookup by name.
    pub fn find_by_name(&self, name: &str) -> Option<&PrinterGroup> {
        let name = name.trim();
        self.data
            .groups
            .iter()
            .find(|group| group.name.eq_ignore_ascii_case(name))
    }

    /// 新增位置並立即寫回檔案。 / Adds a location and persists it.
    pub fn add(
        &mut self,
        name: &str,
        permanent_printer: PrinterProfile,
        non_permanent_printer: PrinterProfile,
    ) -> Result<u64, LocationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LocationError::EmptyName);
        }
        let id = self.data.next_id;
        self.data.next_id += 1;
        self.data.groups.push(PrinterGroup {
            id,
            name: name.to_string(),
            permanent_printer,
            non_permanent_printer,
        });
        self.save()?;
        Ok(id)
    }

    /// 取代既有位置並儲存。 / Replaces an existing location and persists it.
    pub fn update(&mut self, group: PrinterGroup) -> Result<(), LocationError> {
        if group.name.trim().is_empty() {
            return Err(LocationError::EmptyName);
        }
        let slot = self
            .data
            .groups
            .iter_mut()
            .find(|existing| existing.id == group.id)
            .ok_or(LocationError::NotFound(group.id))?;
        *slot = group;
        self.save()
    }

    /// 刪除位置並儲存。 / Removes a location and persists the change.
    pub fn remove(&mut self, id: u64) -> Result<PrinterGroup, LocationError> {
        let index = self
            .data
            .groups
            .iter()
            .position(|group| group.id == id)
            .ok_or(LocationError::NotFound(id))?;
        let removed = self.data.groups.remove(index);
        self.save()?;
        Ok(removed)
    }

    pub fn save(&self) -> Result<(), LocationError> {
        write_json_atomic(&self.path, &self.data)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
