//! Runtime configuration.
//!
//! Every section has defaults, so a config file only needs to name what it
//! changes. Files are JSON, e.g.
//!
//! ```json
//! { "cluster": { "radius_px": 80 }, "data": { "data_dir": "./boundaries" } }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::registry::OverrideSpec;

/// Marker clustering parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterOptions {
    /// Cluster radius in screen pixels.
    pub radius_px: f64,
    /// Tile extent in pixels (world width at zoom 0).
    pub extent_px: f64,
    /// Lowest zoom clustered.
    pub min_zoom: u8,
    /// Highest zoom clustered; above it every marker is its own node.
    pub max_zoom: u8,
    /// Smallest group emitted as a cluster.
    pub min_points: usize,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self { radius_px: 60.0, extent_px: 256.0, min_zoom: 0, max_zoom: 16, min_points: 2 }
    }
}

/// Heat surface generation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatmapOptions {
    /// Extra points sampled per sub-region besides its centroid.
    pub jitter_points: usize,
    /// Sampling window around the centroid, as a fraction of the half bbox extent.
    pub jitter_spread: f64,
    /// Lowest weight emitted, so saturated sub-regions stay faintly visible.
    pub weight_floor: f64,
    /// Base seed; each sub-region derives its own stream from it and its code.
    pub seed: u64,
}

impl Default for HeatmapOptions {
    fn default() -> Self {
        Self { jitter_points: 4, jitter_spread: 0.35, weight_floor: 0.1, seed: 0x5eed }
    }
}

/// Zoom thresholds and camera behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomOptions {
    /// Below this zoom the display hint asks for top-level regions.
    pub region_threshold: f64,
    /// Fraction of a region's bbox added on each side when fitting the camera.
    pub fit_padding: f64,
    /// Zoom used when flying to a searched place that is not a region.
    pub place_zoom: f64,
}

impl Default for ZoomOptions {
    fn default() -> Self {
        Self { region_threshold: 7.0, fit_padding: 0.05, place_zoom: 12.0 }
    }
}

/// Where boundary datasets live. `data_dir` wins over `base_url` when both are set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataOptions {
    pub base_url: Option<String>,
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavConfig {
    pub cluster: ClusterOptions,
    pub heatmap: HeatmapOptions,
    pub zoom: ZoomOptions,
    pub data: DataOptions,
    /// Overrides added on top of the built-in large-city ones.
    pub overrides: Vec<OverrideSpec>,
}

impl NavConfig {
    /// Read and validate a JSON config file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&bytes)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_slice(bytes)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));
        let c = &self.cluster;
        if !(c.radius_px > 0.0) { return invalid(format!("cluster.radius_px must be positive, got {}", c.radius_px)) }
        if !(c.extent_px > 0.0) { return invalid(format!("cluster.extent_px must be positive, got {}", c.extent_px)) }
        if c.min_zoom > c.max_zoom { return invalid(format!("cluster.min_zoom {} above max_zoom {}", c.min_zoom, c.max_zoom)) }
        if c.max_zoom > 24 { return invalid(format!("cluster.max_zoom {} above 24", c.max_zoom)) }
        if c.min_points < 2 { return invalid(format!("cluster.min_points must be at least 2, got {}", c.min_points)) }

        let h = &self.heatmap;
        if !(0.0..=1.0).contains(&h.jitter_spread) { return invalid(format!("heatmap.jitter_spread must be in [0, 1], got {}", h.jitter_spread)) }
        if !(h.weight_floor > 0.0 && h.weight_floor < 1.0) { return invalid(format!("heatmap.weight_floor must be in (0, 1), got {}", h.weight_floor)) }

        if !(self.zoom.fit_padding >= 0.0) { return invalid(format!("zoom.fit_padding must be non-negative, got {}", self.zoom.fit_padding)) }

        for spec in &self.overrides {
            if crate::types::parent_code_of(&spec.commune_code) != Some(spec.parent_code.as_str()) {
                return invalid(format!("override commune {} is not inside region {}", spec.commune_code, spec.parent_code));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let config = NavConfig::from_json(b"{}").unwrap();
        assert_eq!(config, NavConfig::default());
        assert_eq!(config.cluster.radius_px, 60.0);
        assert_eq!(config.heatmap.jitter_points, 4);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = NavConfig::from_json(br#"{"cluster": {"radius_px": 40}, "zoom": {"place_zoom": 10}}"#).unwrap();
        assert_eq!(config.cluster.radius_px, 40.0);
        assert_eq!(config.cluster.max_zoom, 16);
        assert_eq!(config.zoom.place_zoom, 10.0);
        assert_eq!(config.zoom.region_threshold, 7.0);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(NavConfig::from_json(br#"{"cluster": {"radius_px": 0}}"#).is_err());
        assert!(NavConfig::from_json(br#"{"cluster": {"min_zoom": 10, "max_zoom": 4}}"#).is_err());
        assert!(NavConfig::from_json(br#"{"cluster": {"min_points": 1}}"#).is_err());
        assert!(NavConfig::from_json(br#"{"heatmap": {"weight_floor": 0}}"#).is_err());
        assert!(NavConfig::from_json(br#"{"overrides": [{"parent_code": "31", "commune_code": "69123", "city": "Lyon"}]}"#).is_err());
    }

    #[test]
    fn extra_override_is_accepted() {
        let config = NavConfig::from_json(br#"{"overrides": [{"parent_code": "31", "commune_code": "31555", "city": "Toulouse"}]}"#).unwrap();
        assert_eq!(config.overrides.len(), 1);
        assert_eq!(config.overrides[0].city, "Toulouse");
    }
}
