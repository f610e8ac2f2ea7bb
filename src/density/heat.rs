use geo::{Contains, Point};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;

use crate::config::HeatmapOptions;
use crate::types::{Bounded, SubRegion};
use super::ZoneClass;

/// Weighted sample for a continuous heat surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeatPoint {
    pub lat: f64,
    pub lng: f64,
    pub weight: f64,
}

/// `1 - rank/max_rank`, never below `floor`.
#[inline]
pub fn heat_weight(zone: ZoneClass, floor: f64) -> f64 {
    (1.0 - zone.rank() as f64 / ZoneClass::MAX_RANK as f64).max(floor)
}

/// Stable per-code seed, so a sub-region jitters the same way on every run.
fn code_seed(base: u64, code: &str) -> u64 {
    code.bytes().fold(base ^ 0xcbf2_9ce4_8422_2325, |h, b| (h ^ b as u64).wrapping_mul(0x0100_0000_01b3))
}

/// Heat samples for every sub-region `classify` knows: its centroid plus up to
/// `jitter_points` extra points drawn around the centroid and kept only inside the boundary.
pub fn heat_points<'a, I, F>(sub_regions: I, classify: F, options: &HeatmapOptions) -> Vec<HeatPoint>
where
    I: IntoIterator<Item = &'a SubRegion>,
    F: Fn(&SubRegion) -> Option<ZoneClass>,
{
    let mut points = Vec::new();
    for sub in sub_regions {
        let (Some(zone), Some(centroid), Some(bbox)) = (classify(sub), sub.centroid(), sub.bbox()) else { continue };
        let weight = heat_weight(zone, options.weight_floor);
        points.push(HeatPoint { lat: centroid.y(), lng: centroid.x(), weight });

        let half_w = bbox.width() * 0.5 * options.jitter_spread;
        let half_h = bbox.height() * 0.5 * options.jitter_spread;
        let mut rng = StdRng::seed_from_u64(code_seed(options.seed, &sub.code));
        let mut kept = 0;
        for _ in 0..options.jitter_points * 4 {
            if kept == options.jitter_points { break }
            let lng = centroid.x() + rng.random_range(-half_w..=half_w);
            let lat = centroid.y() + rng.random_range(-half_h..=half_h);
            if sub.boundary.contains(&Point::new(lng, lat)) {
                points.push(HeatPoint { lat, lng, weight });
                kept += 1;
            }
        }
    }
    points
}
