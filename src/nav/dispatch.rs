use std::{collections::HashMap, sync::Arc};

use tracing::debug;

use crate::error::NavError;
use crate::types::{Region, SubRegion};
use super::{NavEffect, Navigator};

/// What a rendered feature stands for.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureTarget {
    Region(Region),
    SubRegion(SubRegion),
}

impl FeatureTarget {
    pub fn code(&self) -> &str {
        match self {
            FeatureTarget::Region(region) => &region.code,
            FeatureTarget::SubRegion(sub) => &sub.code,
        }
    }

    /// Label shown while hovering the feature.
    pub fn label(&self) -> &str {
        match self {
            FeatureTarget::Region(region) => &region.name,
            FeatureTarget::SubRegion(sub) => sub.display_name(),
        }
    }
}

/// Pointer interaction on a rendered feature, identified by its code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureEvent {
    Hover(String),
    Leave(String),
    Click(String),
}

impl FeatureEvent {
    pub fn code(&self) -> &str {
        match self {
            FeatureEvent::Hover(code) | FeatureEvent::Leave(code) | FeatureEvent::Click(code) => code,
        }
    }
}

/// Single table from feature code to target, replacing per-polygon handlers.
/// Region and sub-region codes never collide (2-3 vs 5 characters).
#[derive(Debug, Clone, Default)]
pub struct FeatureDispatch {
    targets: HashMap<Arc<str>, FeatureTarget>,
}

impl FeatureDispatch {
    pub fn new() -> Self { Self::default() }

    #[inline] pub fn len(&self) -> usize { self.targets.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.targets.is_empty() }

    /// Replace the region entries.
    pub fn set_regions(&mut self, regions: &[Region]) {
        self.targets.retain(|_, target| !matches!(target, FeatureTarget::Region(_)));
        for region in regions {
            self.targets.insert(region.code.clone(), FeatureTarget::Region(region.clone()));
        }
    }

    /// Replace the sub-region entries.
    pub fn set_sub_regions(&mut self, sub_regions: &[SubRegion]) {
        self.targets.retain(|_, target| !matches!(target, FeatureTarget::SubRegion(_)));
        for sub in sub_regions {
            self.targets.insert(sub.code.clone(), FeatureTarget::SubRegion(sub.clone()));
        }
    }

    pub fn get(&self, code: &str) -> Option<&FeatureTarget> { self.targets.get(code) }
}

impl Navigator {
    /// Route a feature event through the dispatch table.
    /// Hover and leave only touch the hovered label; a click navigates. Unknown codes are ignored.
    pub fn dispatch(&mut self, table: &FeatureDispatch, event: &FeatureEvent) -> Result<Vec<NavEffect>, NavError> {
        let Some(target) = table.get(event.code()) else {
            debug!(code = event.code(), "event for unknown feature ignored");
            return Ok(vec![]);
        };

        match event {
            FeatureEvent::Hover(_) => {
                self.set_hovered_label(Some(target.label().to_string()));
                Ok(vec![])
            }
            FeatureEvent::Leave(_) => {
                if self.state().hovered_label.as_deref() == Some(target.label()) { self.set_hovered_label(None) }
                Ok(vec![])
            }
            FeatureEvent::Click(_) => match target {
                FeatureTarget::Region(region) => Ok(self.navigate_to_region(region.clone())),
                FeatureTarget::SubRegion(sub) => self.navigate_to_sub_region(sub.clone()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use geo::MultiPolygon;

    use super::*;
    use crate::nav::Level;

    fn table() -> FeatureDispatch {
        let mut table = FeatureDispatch::new();
        table.set_regions(&[Region::new("75", "Paris", MultiPolygon(vec![])), Region::new("13", "Bouches-du-Rhône", MultiPolygon(vec![]))]);
        let mut first = SubRegion::new("75101", "Paris 1er", "75", MultiPolygon(vec![]));
        first.display_name_override = Some(Arc::from("Louvre"));
        table.set_sub_regions(&[first]);
        table
    }

    #[test]
    fn hover_and_leave_track_label() {
        let table = table();
        let mut nav = Navigator::default();

        nav.dispatch(&table, &FeatureEvent::Hover("13".into())).unwrap();
        assert_eq!(nav.state().hovered_label.as_deref(), Some("Bouches-du-Rhône"));
        nav.dispatch(&table, &FeatureEvent::Leave("75".into())).unwrap();
        assert!(nav.state().hovered_label.is_some());
        nav.dispatch(&table, &FeatureEvent::Leave("13".into())).unwrap();
        assert!(nav.state().hovered_label.is_none());
        assert_eq!(nav.level(), Level::Country);
    }

    #[test]
    fn clicks_navigate() {
        let table = table();
        let mut nav = Navigator::default();

        let effects = nav.dispatch(&table, &FeatureEvent::Click("75".into())).unwrap();
        assert!(matches!(effects.last(), Some(NavEffect::LoadSubRegions { .. })));
        nav.dispatch(&table, &FeatureEvent::Click("75101".into())).unwrap();
        assert_eq!(nav.level(), Level::SubRegion);

        nav.dispatch(&table, &FeatureEvent::Hover("75101".into())).unwrap();
        assert_eq!(nav.state().hovered_label.as_deref(), Some("Louvre"));
        assert!(nav.dispatch(&table, &FeatureEvent::Click("99999".into())).unwrap().is_empty());
    }

    #[test]
    fn replacing_sub_regions_keeps_regions() {
        let mut table = table();
        table.set_sub_regions(&[]);
        assert_eq!(table.len(), 2);
        assert!(table.get("75101").is_none());
    }
}
