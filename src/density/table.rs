use std::path::Path;

use ahash::AHashMap;
use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use crate::error::DensityError;
use super::ZoneClass;

/// One row of the density dataset.
#[derive(Debug, Clone, Deserialize)]
pub struct DensityRecord {
    pub code: String,
    pub profession: String,
    pub zone: u8,
}

#[derive(Debug, Deserialize)]
struct DensityFile {
    #[serde(default)]
    version: Option<String>,
    records: Vec<DensityRecord>,
}

/// Static `(sub-region code, profession) -> zone class` table. Read-only after load.
#[derive(Debug, Clone, Default)]
pub struct DensityTable {
    version: Option<String>,
    by_profession: AHashMap<String, AHashMap<String, ZoneClass>>,
}

impl DensityTable {
    /// Build from records; a later record for the same key replaces an earlier one.
    pub fn from_records<I>(version: Option<String>, records: I) -> Result<Self, DensityError>
    where I: IntoIterator<Item = DensityRecord> {
        let mut by_profession: AHashMap<String, AHashMap<String, ZoneClass>> = AHashMap::new();
        for record in records {
            let zone = ZoneClass::from_rank(record.zone).ok_or_else(|| DensityError::InvalidRank {
                code: record.code.clone(),
                profession: record.profession.clone(),
                rank: record.zone,
            })?;
            by_profession.entry(record.profession).or_default().insert(record.code, zone);
        }
        Ok(Self { version, by_profession })
    }

    /// Parse `{"version": "...", "records": [{"code", "profession", "zone"}]}`.
    pub fn from_json(bytes: &[u8]) -> Result<Self, DensityError> {
        let file: DensityFile = serde_json::from_slice(bytes)?;
        Self::from_records(file.version, file.records)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).with_context(|| format!("failed to read density table {}", path.display()))?;
        let table = Self::from_json(&bytes).with_context(|| format!("invalid density table {}", path.display()))?;
        info!(entries = table.len(), professions = table.by_profession.len(), version = ?table.version, "density table loaded");
        Ok(table)
    }

    #[inline] pub fn version(&self) -> Option<&str> { self.version.as_deref() }

    pub fn len(&self) -> usize { self.by_profession.values().map(|codes| codes.len()).sum() }

    #[inline] pub fn is_empty(&self) -> bool { self.by_profession.is_empty() }

    /// Known profession codes, sorted.
    pub fn professions(&self) -> Vec<&str> {
        let mut professions: Vec<&str> = self.by_profession.keys().map(String::as_str).collect();
        professions.sort_unstable();
        professions
    }

    /// Pure lookup. `None` means no data, which callers render neutrally.
    pub fn classify(&self, code: &str, profession: &str) -> Option<ZoneClass> {
        self.by_profession.get(profession)?.get(code).copied()
    }
}
