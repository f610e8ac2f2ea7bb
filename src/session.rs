//! One map view: navigation, boundary loading, marker clusters and density overlay wired together.
//!
//! Operations that drill into a region come in two halves so a UI loop can run the fetch
//! elsewhere: [`MapSession::begin_region`] moves the camera and returns the code to load,
//! [`MapSession::finish_load`] applies the loader's result. The async helpers do both in sequence.

use std::sync::{Arc, Mutex, PoisonError};

use geo::MultiPolygon;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cluster::{ClusterIndex, ClusterNode, MarkerLayer};
use crate::config::NavConfig;
use crate::density::{DensityTable, Legend, Overlay, OverlayRenderer};
use crate::error::{LoadCause, NavError, RegionLoadError, SessionError};
use crate::geom::{BoundingBox, PolygonIndex};
use crate::loader::{BoundarySource, LoadOutcome, RegionLoader, SubRegionSet};
use crate::nav::{
    apply_camera, ErrorNotice, FeatureDispatch, FeatureEvent, FeatureTarget, LayerHint, Level, MapViewport,
    NavEffect, Navigator, ViewportEvent, VisibleLayer,
};
use crate::registry::RegionRegistry;
use crate::types::{markers_from_listings, Listing, ListingPayload, Region};

/// Case- and accent-insensitive search key.
pub fn fold_key(s: &str) -> String {
    deunicode::deunicode(s).to_lowercase()
}

/// A free-text search result that is not a region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub label: String,
    pub lng: f64,
    pub lat: f64,
    /// Zoom to fly to; the configured place zoom when absent.
    #[serde(default)]
    pub zoom: Option<f64>,
}

/// Resolves free text to a place, e.g. a geocoder.
pub trait PlaceResolver: Send + Sync {
    fn resolve(&self, query: &str) -> Option<Place>;
}

/// Fixed gazetteer matched on folded labels, exact matches first, then prefixes.
#[derive(Debug, Clone, Default)]
pub struct StaticPlaces {
    places: Vec<(String, Place)>,
}

impl StaticPlaces {
    pub fn new(places: Vec<Place>) -> Self {
        Self { places: places.into_iter().map(|place| (fold_key(&place.label), place)).collect() }
    }

    /// Parse a JSON array of places.
    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        Ok(Self::new(serde_json::from_slice(bytes)?))
    }
}

impl PlaceResolver for StaticPlaces {
    fn resolve(&self, query: &str) -> Option<Place> {
        let q = fold_key(query.trim());
        if q.is_empty() { return None }
        self.places.iter().find(|(key, _)| *key == q)
            .or_else(|| self.places.iter().find(|(key, _)| key.starts_with(&q)))
            .map(|(_, place)| place.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchHit {
    Region { code: Arc<str>, name: Arc<str> },
    SubRegion { code: Arc<str>, name: String },
    Place(Place),
}

/// Everything the UI shell needs to draw the current state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub level: Level,
    pub region: Option<String>,
    pub sub_region: Option<String>,
    pub hovered_label: Option<String>,
    pub layer: VisibleLayer,
    pub zoom: f64,
    pub loading: bool,
    pub pending_parent: Option<String>,
    pub notice: Option<ErrorNotice>,
    pub profession: Option<String>,
}

pub struct MapSession<S, V> {
    config: NavConfig,
    loader: Arc<RegionLoader<S>>,
    navigator: Navigator,
    viewport: V,
    view: Arc<Mutex<Option<ViewportEvent>>>,
    features: FeatureDispatch,
    regions: Vec<Region>,
    region_index: PolygonIndex,
    sub_region_index: Option<(u64, PolygonIndex)>,
    markers: MarkerLayer<ListingPayload>,
    overlay: OverlayRenderer,
    resolver: Option<Box<dyn PlaceResolver>>,
}

impl<S: BoundarySource, V: MapViewport> MapSession<S, V> {
    pub fn new(config: NavConfig, source: S, mut viewport: V, density: Arc<DensityTable>) -> Self {
        let registry = Arc::new(RegionRegistry::from_options(&config.data, &config.overrides));
        let view = Arc::new(Mutex::new(None));
        let sink = view.clone();
        viewport.on_viewport_change(Box::new(move |event: &ViewportEvent| {
            *sink.lock().unwrap_or_else(PoisonError::into_inner) = Some(*event);
        }));

        Self {
            loader: Arc::new(RegionLoader::new(source, registry)),
            navigator: Navigator::new(config.zoom.fit_padding),
            viewport,
            view,
            features: FeatureDispatch::new(),
            regions: Vec::new(),
            region_index: PolygonIndex::new(std::iter::empty::<(&str, &MultiPolygon<f64>)>()),
            sub_region_index: None,
            markers: MarkerLayer::new(config.cluster),
            overlay: OverlayRenderer::new(density, config.heatmap),
            resolver: None,
            config,
        }
    }

    pub fn with_resolver(mut self, resolver: impl PlaceResolver + 'static) -> Self {
        self.resolver = Some(Box::new(resolver));
        self
    }

    #[inline] pub fn config(&self) -> &NavConfig { &self.config }

    /// Shared handle to the loader, for running fetches outside the session.
    #[inline] pub fn loader(&self) -> Arc<RegionLoader<S>> { self.loader.clone() }

    #[inline] pub fn navigator(&self) -> &Navigator { &self.navigator }

    #[inline] pub fn viewport(&self) -> &V { &self.viewport }

    #[inline] pub fn viewport_mut(&mut self) -> &mut V { &mut self.viewport }

    #[inline] pub fn regions(&self) -> &[Region] { &self.regions }

    #[inline] pub fn overlay(&self) -> &OverlayRenderer { &self.overlay }

    #[inline] pub fn overlay_mut(&mut self) -> &mut OverlayRenderer { &mut self.overlay }

    /// Load the top-level regions and preload the overrides, then frame the country.
    pub async fn start(&mut self) -> Result<usize, RegionLoadError> {
        let regions = self.loader.load_regions().await?;
        let overrides = self.loader.preload_overrides().await;

        self.region_index = PolygonIndex::new(regions.iter().map(|r| (&*r.code, &*r.boundary)));
        self.features.set_regions(&regions);
        self.navigator.set_home(self.region_index.bounds());
        self.regions = regions;
        info!(regions = self.regions.len(), overrides, "session started");

        let effects = self.navigator.navigate_to_country();
        self.run_effects(&effects);
        Ok(self.regions.len())
    }

    /// Loaded region with this code, else a boundary-less one from the registry.
    fn region(&self, code: &str) -> Option<Region> {
        let code = code.trim();
        self.regions.iter().find(|r| &*r.code == code).cloned().or_else(|| {
            self.loader.registry().get(code).map(|entry| Region::new(&entry.code, &entry.name, MultiPolygon(vec![])))
        })
    }

    /// Carry out camera effects and loader cancellation. Returns the region to load, if any.
    fn run_effects(&mut self, effects: &[NavEffect]) -> Option<Arc<str>> {
        apply_camera(&mut self.viewport, effects);
        let mut load = None;
        for effect in effects {
            match effect {
                NavEffect::CancelLoad => self.loader.cancel(),
                NavEffect::LoadSubRegions { parent_code } => load = Some(parent_code.clone()),
                NavEffect::FitBounds { .. } | NavEffect::FlyTo { .. } => {}
            }
        }
        load
    }

    /// First half of a drill-in: update the state, frame the region and return the code to load.
    pub fn begin_region(&mut self, code: &str) -> Result<Arc<str>, RegionLoadError> {
        let region = self.region(code)
            .ok_or_else(|| RegionLoadError::new(code, LoadCause::UnknownRegion(code.to_string())))?;
        let effects = self.navigator.navigate_to_region(region.clone());
        Ok(self.run_effects(&effects).unwrap_or(region.code))
    }

    /// Second half of a drill-in: apply a loader result to the navigation state.
    pub fn finish_load(&mut self, result: Result<LoadOutcome, RegionLoadError>) -> Result<LoadOutcome, RegionLoadError> {
        match &result {
            Ok(LoadOutcome::Applied(set)) => {
                if self.navigator.load_succeeded(&set.parent_code) {
                    self.features.set_sub_regions(&set.sub_regions);
                    self.sub_region_index = Some((set.generation, PolygonIndex::new(set.sub_regions.iter().map(|s| (&*s.code, &*s.boundary)))));
                }
            }
            Ok(LoadOutcome::Superseded { parent_code, generation }) => debug!(parent = %parent_code, generation, "load superseded"),
            Err(err) => {
                let effects = self.navigator.load_failed(err);
                self.run_effects(&effects);
            }
        }
        result
    }

    pub async fn navigate_to_region(&mut self, code: &str) -> Result<LoadOutcome, RegionLoadError> {
        let parent = self.begin_region(code)?;
        let result = self.loader.load_sub_regions(&parent).await;
        self.finish_load(result)
    }

    /// Select a sub-region of the visible set.
    pub fn navigate_to_sub_region(&mut self, code: &str) -> Result<(), NavError> {
        let sub = self.visible_sub_regions()
            .and_then(|set| set.get(code.trim()).cloned())
            .ok_or_else(|| NavError::UnknownSubRegion { code: code.to_string() })?;
        let effects = self.navigator.navigate_to_sub_region(sub)?;
        self.run_effects(&effects);
        Ok(())
    }

    pub fn navigate_to_country(&mut self) {
        let effects = self.navigator.navigate_to_country();
        self.run_effects(&effects);
    }

    pub fn dismiss_notice(&mut self) -> Option<ErrorNotice> { self.navigator.dismiss_notice() }

    /// Route a pointer event on a rendered feature. Loads when a region is clicked.
    pub async fn dispatch(&mut self, event: &FeatureEvent) -> Result<Option<LoadOutcome>, SessionError> {
        let effects = self.navigator.dispatch(&self.features, event)?;
        let Some(parent) = self.run_effects(&effects) else { return Ok(None) };
        let result = self.loader.load_sub_regions(&parent).await;
        Ok(Some(self.finish_load(result)?))
    }

    /// Last viewport reported by the map; the whole world before any move.
    pub fn current_view(&self) -> ViewportEvent {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
            .unwrap_or(ViewportEvent { bounds: BoundingBox::world(), zoom: self.viewport.zoom() })
    }

    /// Layer to draw, with the zoom display hint applied.
    pub fn displayed_layer(&self) -> VisibleLayer {
        let hint = LayerHint::from_zoom(self.viewport.zoom(), self.config.zoom.region_threshold);
        self.navigator.state().displayed_layer(hint)
    }

    /// Sub-regions of the selected region, once they are loaded.
    pub fn visible_sub_regions(&self) -> Option<SubRegionSet> {
        let selected = self.navigator.state().region_code()?;
        self.loader.visible().filter(|set| &*set.parent_code == selected)
    }

    /// Feature under a point of the displayed layer.
    pub fn feature_at(&self, lng: f64, lat: f64) -> Option<&FeatureTarget> {
        let code = match (self.displayed_layer(), &self.sub_region_index, self.visible_sub_regions()) {
            (VisibleLayer::SubRegions { .. }, Some((generation, index)), Some(set)) if *generation == set.generation => index.locate(lng, lat),
            _ => self.region_index.locate(lng, lat),
        }?;
        self.features.get(code)
    }

    /// Replace the listing markers and rebuild the cluster index.
    pub fn set_listings(&mut self, listings: Vec<Listing>) -> usize {
        let markers = markers_from_listings(listings);
        self.markers.set_markers(markers).len()
    }

    /// Snapshot of the cluster index to query with [`MapSession::clusters`].
    pub fn cluster_index(&self) -> Arc<ClusterIndex<ListingPayload>> { self.markers.index() }

    /// Nodes for the current viewport.
    pub fn clusters<'a>(&self, index: &'a ClusterIndex<ListingPayload>) -> Vec<ClusterNode<'a, ListingPayload>> {
        let view = self.current_view();
        self.markers.query(index, &view.bounds, self.viewport.zoom())
    }

    /// Fly to a cluster at the zoom where it splits. Navigation state is untouched.
    pub fn zoom_to_cluster(&mut self, cluster_id: usize) -> Option<u8> {
        let index = self.markers.index();
        let zoom = index.expansion_zoom(cluster_id)?;
        let (lng, lat) = index.get(cluster_id)?.position();
        self.viewport.fly_to(lng, lat, zoom as f64);
        Some(zoom)
    }

    /// Density overlay of the visible sub-regions in the current mode.
    pub fn render_overlay(&self) -> Option<Overlay> {
        self.visible_sub_regions().map(|set| self.overlay.render(&set.sub_regions))
    }

    pub fn legend(&self) -> Option<Legend> {
        self.visible_sub_regions().map(|set| self.overlay.legend(&set.sub_regions))
    }

    /// Search visible sub-regions, then regions, then the place resolver.
    /// A region or sub-region hit navigates to it; a place only moves the camera.
    pub async fn search(&mut self, query: &str) -> Result<Option<SearchHit>, SessionError> {
        let q = fold_key(query.trim());
        if q.is_empty() { return Ok(None) }

        if let Some(sub) = self.visible_sub_regions().and_then(|set| {
            set.sub_regions.iter()
                .find(|s| fold_key(&s.code) == q || fold_key(s.display_name()) == q || fold_key(&s.name) == q)
                .cloned()
        }) {
            self.navigate_to_sub_region(&sub.code)?;
            return Ok(Some(SearchHit::SubRegion { name: sub.display_name().to_string(), code: sub.code }));
        }

        let region = {
            let exact = self.regions.iter().find(|r| fold_key(&r.code) == q || fold_key(&r.name) == q);
            let prefix = || self.regions.iter().find(|r| fold_key(&r.name).starts_with(&q));
            let partial = || self.regions.iter().find(|r| fold_key(&r.name).contains(&q));
            exact.or_else(prefix).or_else(partial).map(|r| (r.code.clone(), r.name.clone()))
        };
        if let Some((code, name)) = region {
            self.navigate_to_region(&code).await?;
            return Ok(Some(SearchHit::Region { code, name }));
        }

        let Some(place) = self.resolver.as_ref().and_then(|resolver| resolver.resolve(query)) else {
            debug!(query, "search found nothing");
            return Ok(None);
        };
        let zoom = place.zoom.unwrap_or(self.config.zoom.place_zoom);
        let effects = [NavEffect::FlyTo { lng: place.lng, lat: place.lat, zoom }];
        self.run_effects(&effects);
        Ok(Some(SearchHit::Place(place)))
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.navigator.state();
        SessionSnapshot {
            level: state.level,
            region: state.region_code().map(str::to_string),
            sub_region: state.sub_region_code().map(str::to_string),
            hovered_label: state.hovered_label.clone(),
            layer: self.displayed_layer(),
            zoom: self.viewport.zoom(),
            loading: self.loader.is_loading(),
            pending_parent: self.loader.pending_parent(),
            notice: self.navigator.notice().cloned(),
            profession: self.overlay.profession().map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folding_ignores_case_and_accents() {
        assert_eq!(fold_key("Bouches-du-Rhône"), "bouches-du-rhone");
        assert_eq!(fold_key("ÎLE"), "ile");
    }

    #[test]
    fn static_places_prefer_exact() {
        let place = |label: &str, lng| Place { label: label.into(), lng, lat: 45.0, zoom: None };
        let places = StaticPlaces::new(vec![place("Saint-Étienne-du-Rouvray", 1.0), place("Saint-Étienne", 4.39)]);

        assert_eq!(places.resolve("saint-etienne").map(|p| p.lng), Some(4.39));
        assert_eq!(places.resolve("SAINT-ÉTIENNE-DU").map(|p| p.lng), Some(1.0));
        assert!(places.resolve("  ").is_none());
        assert!(places.resolve("Lille").is_none());
    }
}
