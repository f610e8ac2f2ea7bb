use std::{collections::HashSet, sync::Arc};

use tracing::{debug, warn};

use crate::io::geojson::BoundaryFeature;
use crate::registry::OverrideSpec;
use crate::types::{parent_code_of, Region, SubRegion};

/// Turn raw features into regions, keeping the first occurrence of each code.
pub(crate) fn build_regions(features: Vec<BoundaryFeature>) -> Vec<Region> {
    let mut seen = HashSet::new();
    features.into_iter()
        .filter(|feature| {
            let fresh = seen.insert(feature.code.clone());
            if !fresh { warn!(code = %feature.code, "duplicate region code dropped") }
            fresh
        })
        .map(|feature| Region::new(&feature.code, &feature.name, feature.boundary))
        .collect()
}

/// Turn raw features into sub-regions of `parent_code`, keeping the first occurrence of each code.
/// Every entry gets `parent_code` as its parent, whatever the feature's own code says.
pub(crate) fn build_sub_regions(parent_code: &str, features: Vec<BoundaryFeature>) -> Vec<SubRegion> {
    let parent: Arc<str> = Arc::from(parent_code);
    let mut seen = HashSet::new();

    features.into_iter()
        .filter(|feature| {
            let fresh = seen.insert(feature.code.clone());
            if !fresh { warn!(parent = parent_code, code = %feature.code, "duplicate sub-region code dropped") }
            fresh
        })
        .map(|feature| {
            if parent_code_of(&feature.code).is_some_and(|p| p != parent_code) {
                warn!(parent = parent_code, code = %feature.code, "sub-region code outside its parent region");
            }
            SubRegion {
                code: Arc::from(feature.code),
                name: Arc::from(feature.name),
                parent_region_code: parent.clone(),
                boundary: Arc::new(feature.boundary),
                display_name_override: feature.label.map(Arc::from),
            }
        })
        .collect()
}

/// Check an override dataset against its expected partition codes. Only logs; the data wins.
pub(crate) fn check_partitions(spec: &OverrideSpec, partitions: &[SubRegion]) {
    if spec.partitions.is_empty() { return }
    let loaded: HashSet<&str> = partitions.iter().map(|s| &*s.code).collect();
    let expected: HashSet<&str> = spec.partitions.iter().map(String::as_str).collect();

    let mut missing: Vec<&str> = expected.difference(&loaded).copied().collect();
    let mut unexpected: Vec<&str> = loaded.difference(&expected).copied().collect();
    missing.sort_unstable();
    unexpected.sort_unstable();
    if !missing.is_empty() || !unexpected.is_empty() {
        warn!(city = %spec.city, ?missing, ?unexpected, "override partitions differ from expected codes");
    }
}

/// Replace the principal-city commune of `raw` by the override partitions.
/// Raw entries whose code collides with a partition are dropped too, so codes stay unique.
pub(crate) fn splice_override(raw: Vec<SubRegion>, spec: &OverrideSpec, partitions: &[SubRegion]) -> Vec<SubRegion> {
    let replaced: HashSet<&str> = partitions.iter().map(|s| &*s.code)
        .chain(std::iter::once(spec.commune_code.as_str()))
        .collect();

    let before = raw.len();
    let mut merged: Vec<SubRegion> = raw.into_iter()
        .filter(|sub| !replaced.contains(&*sub.code))
        .collect();
    debug!(city = %spec.city, removed = before - merged.len(), added = partitions.len(), "override spliced");

    merged.extend(partitions.iter().cloned());
    merged
}
