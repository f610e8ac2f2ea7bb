use std::sync::Arc;

use geo::{BoundingRect, Centroid, MultiPolygon, Point};

use crate::geom::BoundingBox;

/// A top-level administrative region. Immutable once loaded; `code` is the natural key.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub code: Arc<str>,
    pub name: Arc<str>,
    pub boundary: Arc<MultiPolygon<f64>>,
}

/// A subdivision of a region, e.g. a commune, or an arrondissement spliced in by an override.
#[derive(Debug, Clone, PartialEq)]
pub struct SubRegion {
    pub code: Arc<str>,
    pub name: Arc<str>,
    pub parent_region_code: Arc<str>,
    pub boundary: Arc<MultiPolygon<f64>>,
    pub display_name_override: Option<Arc<str>>,
}

/// Anything with a boundary polygon the viewport can be fitted to.
pub trait Bounded {
    fn boundary(&self) -> &MultiPolygon<f64>;

    /// Bounding box of the boundary, `None` for an empty polygon set.
    fn bbox(&self) -> Option<BoundingBox> {
        self.boundary().bounding_rect().map(BoundingBox::from)
    }

    /// Centroid of the boundary, `None` for an empty polygon set.
    fn centroid(&self) -> Option<Point<f64>> {
        self.boundary().centroid()
    }
}

impl Region {
    pub fn new(code: &str, name: &str, boundary: MultiPolygon<f64>) -> Self {
        Self { code: Arc::from(code), name: Arc::from(name), boundary: Arc::new(boundary) }
    }
}

impl SubRegion {
    pub fn new(code: &str, name: &str, parent_region_code: &str, boundary: MultiPolygon<f64>) -> Self {
        Self {
            code: Arc::from(code),
            name: Arc::from(name),
            parent_region_code: Arc::from(parent_region_code),
            boundary: Arc::new(boundary),
            display_name_override: None,
        }
    }

    /// Label shown in the UI: the override when present, else the plain name.
    #[inline]
    pub fn display_name(&self) -> &str {
        self.display_name_override.as_deref().unwrap_or(&self.name)
    }
}

impl Bounded for Region {
    #[inline] fn boundary(&self) -> &MultiPolygon<f64> { &self.boundary }
}

impl Bounded for SubRegion {
    #[inline] fn boundary(&self) -> &MultiPolygon<f64> { &self.boundary }
}
