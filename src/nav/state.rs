use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::error::{NavError, RegionLoadError};
use crate::geom::BoundingBox;
use crate::types::{Bounded, Region, SubRegion};

/// Drill level of the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    #[default]
    Country,
    Region,
    SubRegion,
}

impl Level {
    pub fn to_str(&self) -> &'static str {
        match self {
            Level::Country => "country",
            Level::Region => "region",
            Level::SubRegion => "subregion",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavigationState {
    pub level: Level,
    pub selected_region: Option<Region>,
    pub selected_sub_region: Option<SubRegion>,
    pub hovered_label: Option<String>,
}

/// Which polygon set the renderer should draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "layer", rename_all = "snake_case")]
pub enum VisibleLayer {
    Regions,
    SubRegions { region_code: Arc<str> },
}

/// Zoom-derived display preference. Never changes selections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerHint {
    Regions,
    SubRegions,
}

impl LayerHint {
    pub fn from_zoom(zoom: f64, region_threshold: f64) -> Self {
        if zoom < region_threshold { LayerHint::Regions } else { LayerHint::SubRegions }
    }
}

impl NavigationState {
    /// Layer implied by the drill level alone.
    pub fn visible_layer(&self) -> VisibleLayer {
        match (&self.level, &self.selected_region) {
            (Level::Region | Level::SubRegion, Some(region)) => VisibleLayer::SubRegions { region_code: region.code.clone() },
            _ => VisibleLayer::Regions,
        }
    }

    /// Layer to draw once the zoom hint is taken into account. The hint can only pull a
    /// drilled-in view back to the region layer; it cannot show sub-regions at country level.
    pub fn displayed_layer(&self, hint: LayerHint) -> VisibleLayer {
        match (self.visible_layer(), hint) {
            (VisibleLayer::SubRegions { .. }, LayerHint::Regions) => VisibleLayer::Regions,
            (layer, _) => layer,
        }
    }

    #[inline] pub fn region_code(&self) -> Option<&str> { self.selected_region.as_ref().map(|r| &*r.code) }

    #[inline] pub fn sub_region_code(&self) -> Option<&str> { self.selected_sub_region.as_ref().map(|s| &*s.code) }
}

/// Side effects a transition asks the shell to perform, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum NavEffect {
    FitBounds { bbox: BoundingBox },
    FlyTo { lng: f64, lat: f64, zoom: f64 },
    LoadSubRegions { parent_code: Arc<str> },
    CancelLoad,
}

/// Dismissible notice left by a failed drill-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorNotice {
    pub parent_code: String,
    pub message: String,
}

/// Navigation state machine. The only writer of [`NavigationState`].
#[derive(Debug, Clone)]
pub struct Navigator {
    state: NavigationState,
    /// State to restore if the awaited load fails.
    restore: Option<NavigationState>,
    awaiting: Option<Arc<str>>,
    notice: Option<ErrorNotice>,
    home: Option<BoundingBox>,
    fit_padding: f64,
}

impl Default for Navigator {
    fn default() -> Self { Self::new(0.05) }
}

impl Navigator {
    pub fn new(fit_padding: f64) -> Self {
        Self { state: NavigationState::default(), restore: None, awaiting: None, notice: None, home: None, fit_padding }
    }

    #[inline] pub fn state(&self) -> &NavigationState { &self.state }

    #[inline] pub fn level(&self) -> Level { self.state.level }

    #[inline] pub fn notice(&self) -> Option<&ErrorNotice> { self.notice.as_ref() }

    /// Region whose sub-regions have been requested but not yet applied.
    #[inline] pub fn awaiting(&self) -> Option<&str> { self.awaiting.as_deref() }

    /// Bounds the camera returns to at country level.
    pub fn set_home(&mut self, bbox: Option<BoundingBox>) { self.home = bbox }

    fn fit(&self, target: &impl Bounded) -> Option<NavEffect> {
        target.bbox().map(|bbox| NavEffect::FitBounds { bbox: bbox.padded(self.fit_padding) })
    }

    fn fit_state(&self, state: &NavigationState) -> Option<NavEffect> {
        match (&state.selected_sub_region, &state.selected_region) {
            (Some(sub), _) => self.fit(sub),
            (None, Some(region)) => self.fit(region),
            (None, None) => self.home.map(|bbox| NavEffect::FitBounds { bbox }),
        }
    }

    /// Drill into `region` from any state. The camera fit comes before the load request.
    pub fn navigate_to_region(&mut self, region: Region) -> Vec<NavEffect> {
        if self.awaiting.is_none() { self.restore = Some(self.state.clone()) }
        self.notice = None;
        self.awaiting = Some(region.code.clone());
        debug!(from = self.state.level.to_str(), region = %region.code, "navigate to region");

        let mut effects: Vec<NavEffect> = self.fit(&region).into_iter().collect();
        effects.push(NavEffect::LoadSubRegions { parent_code: region.code.clone() });

        self.state.level = Level::Region;
        self.state.selected_region = Some(region);
        self.state.selected_sub_region = None;
        effects
    }

    /// Select a sub-region of the selected region.
    pub fn navigate_to_sub_region(&mut self, sub_region: SubRegion) -> Result<Vec<NavEffect>, NavError> {
        let selected = match (&self.state.level, self.state.region_code()) {
            (Level::Region | Level::SubRegion, Some(code)) => code,
            _ => return Err(NavError::NoRegionSelected { code: sub_region.code.to_string() }),
        };
        if *sub_region.parent_region_code != *selected {
            return Err(NavError::ForeignSubRegion {
                code: sub_region.code.to_string(),
                parent: sub_region.parent_region_code.to_string(),
                selected: selected.to_string(),
            });
        }
        debug!(sub_region = %sub_region.code, "navigate to sub-region");

        let effects = self.fit(&sub_region).into_iter().collect();
        self.state.level = Level::SubRegion;
        self.state.selected_sub_region = Some(sub_region);
        Ok(effects)
    }

    /// Back to country level from anywhere. Clears selections and cancels a pending load.
    pub fn navigate_to_country(&mut self) -> Vec<NavEffect> {
        debug!(from = self.state.level.to_str(), "navigate to country");
        self.state = NavigationState::default();
        self.restore = None;
        self.awaiting = None;
        self.notice = None;

        let mut effects = vec![NavEffect::CancelLoad];
        effects.extend(self.home.map(|bbox| NavEffect::FitBounds { bbox }));
        effects
    }

    pub fn set_hovered_label(&mut self, label: Option<String>) { self.state.hovered_label = label }

    /// The awaited load for `parent_code` was applied. Returns whether it was awaited.
    pub fn load_succeeded(&mut self, parent_code: &str) -> bool {
        if self.awaiting.as_deref() != Some(parent_code) { return false }
        self.awaiting = None;
        self.restore = None;
        true
    }

    /// The awaited load failed: go back to the state before the drill-in and raise a notice.
    /// Failures of loads no longer awaited are ignored.
    pub fn load_failed(&mut self, err: &RegionLoadError) -> Vec<NavEffect> {
        if self.awaiting.as_deref() != Some(err.parent_code.as_str()) { return vec![] }
        self.awaiting = None;

        let hovered = self.state.hovered_label.take();
        self.state = self.restore.take().unwrap_or_default();
        self.state.hovered_label = hovered;
        self.notice = Some(ErrorNotice { parent_code: err.parent_code.clone(), message: err.to_string() });
        debug!(parent = %err.parent_code, level = self.state.level.to_str(), "drill-in failed, state restored");

        self.fit_state(&self.state).into_iter().collect()
    }

    pub fn dismiss_notice(&mut self) -> Option<ErrorNotice> { self.notice.take() }
}
