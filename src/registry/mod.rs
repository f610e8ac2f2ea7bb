//! Static mapping from region codes to the datasets holding their boundaries.

mod departments;
mod overrides;

use std::{collections::BTreeMap, fmt, path::PathBuf};

use crate::config::DataOptions;

pub use overrides::{default_overrides, OverrideSpec};

/// Where a boundary dataset can be fetched from. Decoupled from the actual hosting.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DatasetLocator {
    Url(String),
    Path(PathBuf),
    /// Pack-relative key, resolved by in-memory sources.
    Key(String),
}

impl fmt::Display for DatasetLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetLocator::Url(url) => write!(f, "{url}"),
            DatasetLocator::Path(path) => write!(f, "{}", path.display()),
            DatasetLocator::Key(key) => write!(f, "key:{key}"),
        }
    }
}

/// How relative dataset names turn into locators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocatorScheme {
    Url(String),
    Dir(PathBuf),
    Keys,
}

impl LocatorScheme {
    pub fn from_options(data: &DataOptions) -> Self {
        match (&data.data_dir, &data.base_url) {
            (Some(dir), _) => LocatorScheme::Dir(dir.clone()),
            (None, Some(url)) => LocatorScheme::Url(url.trim_end_matches('/').to_string()),
            (None, None) => LocatorScheme::Keys,
        }
    }

    /// Resolve a dataset name such as "regions/75.geojson".
    pub fn locate(&self, rel: &str) -> DatasetLocator {
        match self {
            LocatorScheme::Url(base) => DatasetLocator::Url(format!("{base}/{rel}")),
            LocatorScheme::Dir(dir) => DatasetLocator::Path(dir.join(rel)),
            LocatorScheme::Keys => DatasetLocator::Key(rel.to_string()),
        }
    }
}

/// Dataset names, relative to the scheme root.
pub fn top_level_key() -> String { "regions.geojson".to_string() }
pub fn sub_region_key(region_code: &str) -> String { format!("regions/{region_code}.geojson") }
pub fn override_key(commune_code: &str) -> String { format!("overrides/{commune_code}.geojson") }

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionEntry {
    pub code: String,
    pub name: String,
    pub locator: DatasetLocator,
}

/// Region code -> dataset locator, plus the override list. Built once, read-only afterwards.
#[derive(Debug, Clone)]
pub struct RegionRegistry {
    top_level: DatasetLocator,
    entries: BTreeMap<String, RegionEntry>,
    overrides: Vec<OverrideSpec>,
    scheme: LocatorScheme,
}

impl RegionRegistry {
    /// Registry over the built-in region table with the default overrides plus `extra_overrides`.
    /// A later override for the same parent replaces an earlier one.
    pub fn new(scheme: LocatorScheme, extra_overrides: &[OverrideSpec]) -> Self {
        let entries = departments::DEPARTMENTS.iter()
            .map(|&(code, name)| (code.to_string(), RegionEntry {
                code: code.to_string(),
                name: name.to_string(),
                locator: scheme.locate(&sub_region_key(code)),
            }))
            .collect();

        let mut overrides = default_overrides();
        for spec in extra_overrides {
            overrides.retain(|existing| existing.parent_code != spec.parent_code);
            overrides.push(spec.clone());
        }

        Self { top_level: scheme.locate(&top_level_key()), entries, overrides, scheme }
    }

    pub fn from_options(data: &DataOptions, extra_overrides: &[OverrideSpec]) -> Self {
        Self::new(LocatorScheme::from_options(data), extra_overrides)
    }

    #[inline] pub fn len(&self) -> usize { self.entries.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Locator of the top-level region collection.
    #[inline] pub fn top_level_locator(&self) -> &DatasetLocator { &self.top_level }

    #[inline] pub fn get(&self, code: &str) -> Option<&RegionEntry> { self.entries.get(code.trim()) }

    /// All registered regions, ordered by code.
    pub fn regions(&self) -> impl Iterator<Item = &RegionEntry> { self.entries.values() }

    /// Locator of the sub-region collection of `code`.
    pub fn sub_region_locator(&self, code: &str) -> Option<&DatasetLocator> {
        self.get(code).map(|entry| &entry.locator)
    }

    #[inline] pub fn overrides(&self) -> &[OverrideSpec] { &self.overrides }

    pub fn override_for(&self, parent_code: &str) -> Option<&OverrideSpec> {
        self.overrides.iter().find(|spec| spec.parent_code == parent_code)
    }

    pub fn override_locator(&self, spec: &OverrideSpec) -> DatasetLocator {
        self.scheme.locate(&override_key(&spec.commune_code))
    }
}

impl Default for RegionRegistry {
    fn default() -> Self { Self::new(LocatorScheme::Keys, &[]) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_table_is_complete() {
        let registry = RegionRegistry::default();
        assert_eq!(registry.len(), 101);
        assert_eq!(registry.get("2A").map(|e| e.name.as_str()), Some("Corse-du-Sud"));
        assert_eq!(registry.get("971").map(|e| e.name.as_str()), Some("Guadeloupe"));
        assert!(registry.get("20").is_none());
    }

    #[test]
    fn locators_follow_scheme() {
        let url = RegionRegistry::new(LocatorScheme::Url("https://example.org/geo".into()), &[]);
        assert_eq!(url.sub_region_locator("01"), Some(&DatasetLocator::Url("https://example.org/geo/regions/01.geojson".into())));
        assert_eq!(url.top_level_locator(), &DatasetLocator::Url("https://example.org/geo/regions.geojson".into()));

        let dir = RegionRegistry::new(LocatorScheme::Dir("/data".into()), &[]);
        assert_eq!(dir.sub_region_locator("75"), Some(&DatasetLocator::Path("/data/regions/75.geojson".into())));

        let keys = RegionRegistry::default();
        let paris = keys.override_for("75").unwrap();
        assert_eq!(keys.override_locator(paris), DatasetLocator::Key("overrides/75056.geojson".into()));
    }

    #[test]
    fn data_dir_wins_over_base_url() {
        let options = DataOptions { base_url: Some("https://example.org/".into()), data_dir: Some("/data".into()) };
        assert_eq!(LocatorScheme::from_options(&options), LocatorScheme::Dir("/data".into()));

        let options = DataOptions { base_url: Some("https://example.org/".into()), data_dir: None };
        assert_eq!(LocatorScheme::from_options(&options), LocatorScheme::Url("https://example.org".into()));
    }

    #[test]
    fn extra_override_replaces_same_parent() {
        let lyon = OverrideSpec { parent_code: "69".into(), commune_code: "69123".into(), city: "Lyon".into(), partitions: vec![] };
        let toulouse = OverrideSpec { parent_code: "31".into(), commune_code: "31555".into(), city: "Toulouse".into(), partitions: vec![] };
        let registry = RegionRegistry::new(LocatorScheme::Keys, &[lyon, toulouse]);

        assert_eq!(registry.overrides().len(), 4);
        assert!(registry.override_for("69").unwrap().partitions.is_empty());
        assert_eq!(registry.override_for("31").map(|s| s.city.as_str()), Some("Toulouse"));
        assert!(registry.override_for("01").is_none());
    }
}
