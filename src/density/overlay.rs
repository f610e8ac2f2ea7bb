use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::config::HeatmapOptions;
use crate::io::geojson::feature_collection;
use crate::types::SubRegion;
use super::{color, heat, DensityTable, HeatPoint, Rgb, ZoneClass};

/// Which zone classes are drawn and counted. Sub-regions without data are
/// governed separately by `show_no_data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ZoneFilter {
    enabled: [bool; 5],
    pub show_no_data: bool,
}

impl Default for ZoneFilter {
    fn default() -> Self { Self { enabled: [true; 5], show_no_data: true } }
}

impl ZoneFilter {
    /// Filter letting only `zones` through.
    pub fn only(zones: &[ZoneClass]) -> Self {
        let mut enabled = [false; 5];
        for zone in zones { enabled[zone.rank() as usize] = true }
        Self { enabled, show_no_data: true }
    }

    #[inline] pub fn allows(&self, zone: ZoneClass) -> bool { self.enabled[zone.rank() as usize] }

    pub fn set(&mut self, zone: ZoneClass, enabled: bool) { self.enabled[zone.rank() as usize] = enabled }

    pub fn toggle(&mut self, zone: ZoneClass) { self.set(zone, !self.allows(zone)) }

    /// Whether a sub-region with this classification is shown.
    pub fn admits(&self, zone: Option<ZoneClass>) -> bool {
        zone.map_or(self.show_no_data, |zone| self.allows(zone))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayMode {
    #[default]
    Choropleth,
    Heatmap,
}

/// Fill decision for one sub-region polygon.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StyledFeature {
    pub code: Arc<str>,
    pub zone: Option<ZoneClass>,
    pub fill: Rgb,
}

/// Sub-region counts per zone class plus those without data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Legend {
    pub counts: [usize; 5],
    pub no_data: usize,
}

impl Legend {
    #[inline] pub fn count(&self, zone: ZoneClass) -> usize { self.counts[zone.rank() as usize] }

    pub fn total(&self) -> usize { self.counts.iter().sum::<usize>() + self.no_data }

    /// (class, color, count) rows in rank order.
    pub fn rows(&self) -> impl Iterator<Item = (ZoneClass, Rgb, usize)> + '_ {
        ZoneClass::ALL.into_iter().map(|zone| (zone, color::color_for(zone), self.count(zone)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", content = "data", rename_all = "lowercase")]
pub enum Overlay {
    Choropleth(Vec<StyledFeature>),
    Heatmap(Vec<HeatPoint>),
}

/// Styles sub-regions from a density table for the selected profession.
/// Switching mode or filter reuses the same table; nothing is fetched again.
#[derive(Debug, Clone)]
pub struct OverlayRenderer {
    table: Arc<DensityTable>,
    heatmap: HeatmapOptions,
    profession: Option<String>,
    filter: ZoneFilter,
    mode: OverlayMode,
}

impl OverlayRenderer {
    pub fn new(table: Arc<DensityTable>, heatmap: HeatmapOptions) -> Self {
        Self { table, heatmap, profession: None, filter: ZoneFilter::default(), mode: OverlayMode::default() }
    }

    #[inline] pub fn table(&self) -> &DensityTable { &self.table }

    #[inline] pub fn profession(&self) -> Option<&str> { self.profession.as_deref() }

    pub fn set_profession(&mut self, profession: Option<String>) {
        debug!(profession = ?profession, "profession selected");
        self.profession = profession;
    }

    #[inline] pub fn mode(&self) -> OverlayMode { self.mode }

    pub fn set_mode(&mut self, mode: OverlayMode) { self.mode = mode }

    #[inline] pub fn filter(&self) -> &ZoneFilter { &self.filter }

    #[inline] pub fn filter_mut(&mut self) -> &mut ZoneFilter { &mut self.filter }

    /// Zone of `sub` for the selected profession. No profession means no data.
    pub fn classify(&self, sub: &SubRegion) -> Option<ZoneClass> {
        self.table.classify(&sub.code, self.profession.as_deref()?)
    }

    /// Choropleth fills for the sub-regions the filter admits.
    pub fn styles(&self, sub_regions: &[SubRegion]) -> Vec<StyledFeature> {
        sub_regions.iter()
            .map(|sub| (sub, self.classify(sub)))
            .filter(|(_, zone)| self.filter.admits(*zone))
            .map(|(sub, zone)| StyledFeature { code: sub.code.clone(), zone, fill: color::fill_for(zone) })
            .collect()
    }

    /// Heat samples for the classified sub-regions the filter admits.
    pub fn heat_points(&self, sub_regions: &[SubRegion]) -> Vec<HeatPoint> {
        let classify = |sub: &SubRegion| self.classify(sub).filter(|&zone| self.filter.allows(zone));
        heat::heat_points(sub_regions, classify, &self.heatmap)
    }

    pub fn legend(&self, sub_regions: &[SubRegion]) -> Legend {
        let mut legend = Legend::default();
        for sub in sub_regions {
            match self.classify(sub) {
                Some(zone) if self.filter.allows(zone) => legend.counts[zone.rank() as usize] += 1,
                Some(_) => {}
                None if self.filter.show_no_data => legend.no_data += 1,
                None => {}
            }
        }
        legend
    }

    /// Output for the current mode.
    pub fn render(&self, sub_regions: &[SubRegion]) -> Overlay {
        match self.mode {
            OverlayMode::Choropleth => Overlay::Choropleth(self.styles(sub_regions)),
            OverlayMode::Heatmap => Overlay::Heatmap(self.heat_points(sub_regions)),
        }
    }

    /// Choropleth as a GeoJSON FeatureCollection with `name`, `zone` and `fill` properties.
    pub fn to_geojson(&self, sub_regions: &[SubRegion]) -> Value {
        let features: Vec<_> = sub_regions.iter()
            .filter_map(|sub| {
                let zone = self.classify(sub);
                if !self.filter.admits(zone) { return None }
                let mut properties = Map::new();
                properties.insert("name".into(), json!(sub.display_name()));
                properties.insert("zone".into(), json!(zone.map(ZoneClass::to_str)));
                properties.insert("fill".into(), json!(color::fill_for(zone).to_string()));
                Some((&*sub.code, &*sub.boundary, properties))
            })
            .collect();
        feature_collection(features)
    }
}

#[cfg(test)]
mod tests {
    use geo::{polygon, MultiPolygon};

    use super::*;
    use crate::density::{DensityRecord, NO_DATA};

    fn sub(code: &str, x: f64) -> SubRegion {
        SubRegion::new(code, code, "01", MultiPolygon(vec![polygon![(x: x, y: 46.0), (x: x + 0.1, y: 46.0), (x: x + 0.1, y: 46.1), (x: x, y: 46.1)]]))
    }

    fn renderer() -> (OverlayRenderer, Vec<SubRegion>) {
        let record = |code: &str, zone| DensityRecord { code: code.into(), profession: "kine".into(), zone };
        let table = DensityTable::from_records(None, vec![record("01001", 0), record("01002", 4)]).unwrap();
        let mut renderer = OverlayRenderer::new(Arc::new(table), HeatmapOptions::default());
        renderer.set_profession(Some("kine".into()));
        (renderer, vec![sub("01001", 5.0), sub("01002", 5.2), sub("01003", 5.4)])
    }

    #[test]
    fn misses_render_neutral() {
        let (renderer, subs) = renderer();
        let styles = renderer.styles(&subs);
        assert_eq!(styles.len(), 3);
        assert_eq!(styles[0].zone, Some(ZoneClass::VeryUnderServed));
        assert_eq!(styles[2].zone, None);
        assert_eq!(styles[2].fill, NO_DATA);
    }

    #[test]
    fn no_profession_means_no_data() {
        let (mut renderer, subs) = renderer();
        renderer.set_profession(None);
        assert!(renderer.styles(&subs).iter().all(|s| s.zone.is_none()));
        assert!(renderer.heat_points(&subs).is_empty());
    }

    #[test]
    fn filter_restricts_render_and_legend() {
        let (mut renderer, subs) = renderer();
        assert_eq!(renderer.legend(&subs), Legend { counts: [1, 0, 0, 0, 1], no_data: 1 });

        renderer.filter_mut().toggle(ZoneClass::OverServed);
        renderer.filter_mut().show_no_data = false;
        let styles = renderer.styles(&subs);
        assert_eq!(styles.len(), 1);
        assert_eq!(&*styles[0].code, "01001");
        assert_eq!(renderer.legend(&subs).total(), 1);
        assert!(renderer.heat_points(&subs).iter().all(|p| p.weight == 1.0));
    }

    #[test]
    fn mode_switch_reuses_classification() {
        let (mut renderer, subs) = renderer();
        assert!(matches!(renderer.render(&subs), Overlay::Choropleth(ref s) if s.len() == 3));

        renderer.set_mode(OverlayMode::Heatmap);
        let Overlay::Heatmap(points) = renderer.render(&subs) else { panic!("expected heat points") };
        assert_eq!(points.len(), 2 * (1 + HeatmapOptions::default().jitter_points));
        assert!(points.iter().any(|p| (p.weight - 0.1).abs() < 1e-12));
    }

    #[test]
    fn geojson_carries_fill() {
        let (renderer, subs) = renderer();
        let collection = renderer.to_geojson(&subs);
        let features = collection["features"].as_array().unwrap();
        assert_eq!(features.len(), 3);
        assert_eq!(features[1]["properties"]["zone"], "over-served");
        assert_eq!(features[2]["properties"]["zone"], Value::Null);
        assert_eq!(features[2]["properties"]["fill"], "#969696");
    }
}
