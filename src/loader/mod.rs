//! Boundary loading: top-level regions, override preload and last-request-wins sub-region fetches.
//!
//! Each sub-region request takes a generation number. A result is written to the
//! visible set only if its generation is still the latest when it resolves; the
//! comparison and the write happen under one lock. Issuing a newer request (or
//! cancelling) also wakes older in-flight fetches so they stop waiting on I/O.

mod merge;
mod source;

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock},
};

use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::error::{LoadCause, RegionLoadError};
use crate::io::geojson::{feature_collection, read_boundary_features, BoundaryFeature};
use crate::registry::{DatasetLocator, RegionRegistry};
use crate::types::{Region, SubRegion};

pub use source::{BoundarySource, DiskSource, MemSource};
#[cfg(feature = "download")]
pub use source::HttpSource;

/// Parent code used in errors about the top-level collection.
pub const TOP_LEVEL: &str = "top-level";

/// The sub-regions currently shown for one parent region.
#[derive(Debug, Clone)]
pub struct SubRegionSet {
    pub parent_code: Arc<str>,
    pub sub_regions: Arc<[SubRegion]>,
    /// Request generation that produced this set.
    pub generation: u64,
    /// City whose override was spliced in, if any.
    pub overridden: Option<String>,
}

impl SubRegionSet {
    #[inline] pub fn len(&self) -> usize { self.sub_regions.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.sub_regions.is_empty() }

    pub fn get(&self, code: &str) -> Option<&SubRegion> {
        self.sub_regions.iter().find(|sub| &*sub.code == code)
    }

    /// GeoJSON FeatureCollection with `name` and `parent` properties.
    pub fn to_geojson(&self) -> serde_json::Value {
        feature_collection(self.sub_regions.iter().map(|sub| {
            let mut properties = serde_json::Map::new();
            properties.insert("name".into(), sub.display_name().into());
            properties.insert("parent".into(), sub.parent_region_code.to_string().into());
            (&*sub.code, &*sub.boundary, properties)
        }))
    }
}

/// Result of a sub-region request that did not fail.
#[derive(Debug, Clone)]
pub enum LoadOutcome {
    /// The request was still the latest and its set is now visible.
    Applied(SubRegionSet),
    /// A newer request or a cancellation took over; nothing was written.
    Superseded { parent_code: String, generation: u64 },
}

impl LoadOutcome {
    pub fn applied(&self) -> Option<&SubRegionSet> {
        match self {
            LoadOutcome::Applied(set) => Some(set),
            LoadOutcome::Superseded { .. } => None,
        }
    }
}

#[derive(Debug, Default)]
struct LoaderState {
    generation: u64,
    pending: Option<(u64, String)>,
    visible: Option<SubRegionSet>,
}

pub struct RegionLoader<S> {
    source: S,
    registry: Arc<RegionRegistry>,
    overrides: RwLock<HashMap<String, Arc<[SubRegion]>>>,
    state: Mutex<LoaderState>,
    superseded: Notify,
}

impl<S: BoundarySource> RegionLoader<S> {
    pub fn new(source: S, registry: Arc<RegionRegistry>) -> Self {
        Self {
            source,
            registry,
            overrides: RwLock::new(HashMap::new()),
            state: Mutex::new(LoaderState::default()),
            superseded: Notify::new(),
        }
    }

    #[inline] pub fn registry(&self) -> &RegionRegistry { &self.registry }

    fn state(&self) -> MutexGuard<'_, LoaderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn fetch_features(&self, parent_code: &str, locator: &DatasetLocator) -> Result<Vec<BoundaryFeature>, RegionLoadError> {
        let bytes = self.source.fetch(locator).await
            .map_err(|cause| RegionLoadError::new(parent_code, cause))?;
        parse(parent_code, &bytes)
    }

    /// Fetch the top-level region collection. Called once at startup.
    pub async fn load_regions(&self) -> Result<Vec<Region>, RegionLoadError> {
        let locator = self.registry.top_level_locator().clone();
        let regions = merge::build_regions(self.fetch_features(TOP_LEVEL, &locator).await?);
        info!(count = regions.len(), %locator, "top-level regions loaded");
        Ok(regions)
    }

    /// Fetch every override dataset and keep it ready to splice. Returns how many loaded.
    /// A failed override is logged and its region falls back to the raw sub-region list.
    pub async fn preload_overrides(&self) -> usize {
        let mut loaded = HashMap::new();
        for spec in self.registry.overrides() {
            let locator = self.registry.override_locator(spec);
            match self.fetch_features(&spec.parent_code, &locator).await {
                Ok(features) => {
                    let partitions = merge::build_sub_regions(&spec.parent_code, features);
                    merge::check_partitions(spec, &partitions);
                    debug!(city = %spec.city, partitions = partitions.len(), "override preloaded");
                    loaded.insert(spec.parent_code.clone(), Arc::from(partitions));
                }
                Err(err) => warn!(city = %spec.city, error = %err, "override preload failed"),
            }
        }

        let count = loaded.len();
        *self.overrides.write().unwrap_or_else(PoisonError::into_inner) = loaded;
        count
    }

    /// Preloaded partitions for `parent_code`, if it is an override region.
    pub fn override_partitions(&self, parent_code: &str) -> Option<Arc<[SubRegion]>> {
        self.overrides.read().unwrap_or_else(PoisonError::into_inner).get(parent_code).cloned()
    }

    /// Start a request: bump the generation, record it as pending and wake superseded fetches.
    fn issue(&self, parent_code: &str) -> u64 {
        let generation = {
            let mut state = self.state();
            state.generation += 1;
            state.pending = Some((state.generation, parent_code.to_string()));
            state.generation
        };
        self.superseded.notify_waiters();
        generation
    }

    /// Drop any pending request. Its result will never be applied.
    pub fn cancel(&self) {
        {
            let mut state = self.state();
            state.generation += 1;
            if let Some((_, parent)) = state.pending.take() {
                debug!(parent = %parent, "pending sub-region request cancelled");
            }
        }
        self.superseded.notify_waiters();
    }

    /// Whether `generation` is still the latest request.
    fn is_current(&self, generation: u64) -> bool { self.state().generation == generation }

    /// Mark a failed request finished if it is still current. Returns whether it was.
    fn finish_failed(&self, generation: u64) -> bool {
        let mut state = self.state();
        if state.generation != generation { return false }
        state.pending = None;
        true
    }

    /// Write `set` as visible if its generation is still current.
    fn commit(&self, set: SubRegionSet) -> LoadOutcome {
        let mut state = self.state();
        if state.generation != set.generation {
            return LoadOutcome::Superseded { parent_code: set.parent_code.to_string(), generation: set.generation };
        }
        state.pending = None;
        state.visible = Some(set.clone());
        LoadOutcome::Applied(set)
    }

    /// Fetch, merge and publish the sub-regions of `parent_code`.
    ///
    /// The latest request wins: a result whose request was superseded (by another call or by
    /// [`RegionLoader::cancel`]) is dropped even if its fetch completes later. On failure the
    /// previously visible set is kept and the error is returned, unless the request was
    /// already superseded, in which case the failure is irrelevant and `Superseded` is returned.
    pub async fn load_sub_regions(&self, parent_code: &str) -> Result<LoadOutcome, RegionLoadError> {
        let parent_code = parent_code.trim();
        let locator = self.registry.sub_region_locator(parent_code)
            .ok_or_else(|| RegionLoadError::new(parent_code, LoadCause::UnknownRegion(parent_code.to_string())))?
            .clone();

        let generation = self.issue(parent_code);
        let superseded = self.superseded.notified();
        debug!(parent = parent_code, generation, %locator, "sub-region request issued");

        let fetched = tokio::select! {
            biased;
            _ = superseded => None,
            bytes = self.source.fetch(&locator) => Some(bytes),
        };

        let stale = || LoadOutcome::Superseded { parent_code: parent_code.to_string(), generation };
        let bytes = match fetched {
            Some(bytes) => bytes,
            None => {
                debug!(parent = parent_code, generation, "sub-region fetch abandoned");
                return Ok(stale());
            }
        };

        let raw = match bytes.map_err(|cause| RegionLoadError::new(parent_code, cause))
            .and_then(|bytes| parse(parent_code, &bytes)) {
            Ok(features) => merge::build_sub_regions(parent_code, features),
            Err(err) => {
                if !self.finish_failed(generation) { return Ok(stale()) }
                warn!(parent = parent_code, generation, error = %err, "sub-region load failed");
                return Err(err);
            }
        };

        // Merging is cheap; skip it when the request already lost.
        if !self.is_current(generation) { return Ok(stale()) }

        let spec = self.registry.override_for(parent_code);
        let partitions = self.override_partitions(parent_code);
        let (sub_regions, overridden) = match (spec, partitions) {
            (Some(spec), Some(partitions)) => (merge::splice_override(raw, spec, &partitions), Some(spec.city.clone())),
            _ => (raw, None),
        };

        let outcome = self.commit(SubRegionSet {
            parent_code: Arc::from(parent_code),
            sub_regions: Arc::from(sub_regions),
            generation,
            overridden,
        });
        match &outcome {
            LoadOutcome::Applied(set) => info!(parent = parent_code, generation, count = set.len(), "sub-regions applied"),
            LoadOutcome::Superseded { .. } => debug!(parent = parent_code, generation, "stale sub-regions dropped"),
        }
        Ok(outcome)
    }

    /// The sub-region set currently visible, if any request has been applied.
    pub fn visible(&self) -> Option<SubRegionSet> { self.state().visible.clone() }

    /// Whether a request is in flight.
    pub fn is_loading(&self) -> bool { self.state().pending.is_some() }

    /// Parent code of the in-flight request.
    pub fn pending_parent(&self) -> Option<String> {
        self.state().pending.as_ref().map(|(_, parent)| parent.clone())
    }
}

fn parse(parent_code: &str, bytes: &[u8]) -> Result<Vec<BoundaryFeature>, RegionLoadError> {
    read_boundary_features(bytes)
        .map_err(|e| RegionLoadError::new(parent_code, LoadCause::Parse(format!("{e:#}"))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{override_key, sub_region_key, top_level_key};

    fn collection(codes: &[&str]) -> Vec<u8> {
        let features: Vec<String> = codes.iter().map(|code| format!(
            r#"{{"type":"Feature","properties":{{"code":"{code}","nom":"N{code}"}},
                "geometry":{{"type":"Polygon","coordinates":[[[2.0,48.0],[2.1,48.0],[2.1,48.1],[2.0,48.0]]]}}}}"#
        )).collect();
        format!(r#"{{"type":"FeatureCollection","features":[{}]}}"#, features.join(",")).into_bytes()
    }

    fn loader(files: &[(String, Vec<u8>)]) -> RegionLoader<MemSource> {
        let mut source = MemSource::default();
        for (key, bytes) in files { source.insert(key.clone(), bytes.clone()) }
        RegionLoader::new(source, Arc::new(RegionRegistry::default()))
    }

    #[tokio::test]
    async fn plain_region_loads_unchanged() {
        let loader = loader(&[(sub_region_key("01"), collection(&["01001", "01002"]))]);
        let outcome = loader.load_sub_regions("01").await.unwrap();

        let set = outcome.applied().unwrap();
        assert_eq!(&*set.parent_code, "01");
        assert_eq!(set.len(), 2);
        assert!(set.overridden.is_none());
        assert!(!loader.is_loading());
        assert_eq!(loader.visible().unwrap().generation, set.generation);
    }

    #[tokio::test]
    async fn override_is_spliced_after_preload() {
        let loader = loader(&[
            (sub_region_key("69"), collection(&["69001", "69123"])),
            (override_key("69123"), collection(&["69381", "69382"])),
        ]);
        assert_eq!(loader.preload_overrides().await, 1);

        let set = loader.load_sub_regions("69").await.unwrap().applied().cloned().unwrap();
        let codes: Vec<&str> = set.sub_regions.iter().map(|s| &*s.code).collect();
        assert_eq!(codes, vec!["69001", "69381", "69382"]);
        assert_eq!(set.overridden.as_deref(), Some("Lyon"));
    }

    #[tokio::test]
    async fn missing_override_keeps_raw_list() {
        let loader = loader(&[(sub_region_key("69"), collection(&["69001", "69123"]))]);
        assert_eq!(loader.preload_overrides().await, 0);

        let set = loader.load_sub_regions("69").await.unwrap().applied().cloned().unwrap();
        assert!(set.get("69123").is_some());
    }

    #[tokio::test]
    async fn failure_keeps_previous_visible_set() {
        let loader = loader(&[
            (sub_region_key("01"), collection(&["01001"])),
            (sub_region_key("02"), b"not json".to_vec()),
        ]);
        loader.load_sub_regions("01").await.unwrap();

        let err = loader.load_sub_regions("02").await.unwrap_err();
        assert_eq!(err.parent_code, "02");
        assert!(matches!(err.cause, LoadCause::Parse(_)));
        assert!(!loader.is_loading());
        assert_eq!(&*loader.visible().unwrap().parent_code, "01");

        let err = loader.load_sub_regions("03").await.unwrap_err();
        assert!(matches!(err.cause, LoadCause::Missing(_)));
    }

    #[tokio::test]
    async fn unknown_region_is_rejected_without_issuing() {
        let loader = loader(&[]);
        let err = loader.load_sub_regions("20").await.unwrap_err();
        assert!(matches!(err.cause, LoadCause::UnknownRegion(_)));
        assert!(!loader.is_loading());
    }

    #[tokio::test]
    async fn top_level_regions_load() {
        let loader = loader(&[(top_level_key(), collection(&["01", "02", "01"]))]);
        let regions = loader.load_regions().await.unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!(&*regions[1].name, "N02");
    }
}
