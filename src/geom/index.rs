use geo::{BoundingRect, Contains, MultiPolygon, Point, Rect};
use rstar::{RTree, RTreeObject, AABB};

use crate::geom::BoundingBox;

/// A bounding box in an R-tree, associated with a MultiPolygon by index.
#[derive(Debug, Clone)]
struct IndexedRect {
    idx: usize, // Index of corresponding MultiPolygon in shapes
    bbox: Rect<f64>,
}

impl RTreeObject for IndexedRect {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.bbox.min().into(), self.bbox.max().into())
    }
}

/// Hit-testing over a set of polygons (regions or sub-regions), keyed by code.
#[derive(Debug, Clone)]
pub struct PolygonIndex {
    codes: Vec<String>,
    shapes: Vec<MultiPolygon<f64>>,
    rtree: RTree<IndexedRect>,
}

impl PolygonIndex {
    /// Build the index from (code, boundary) pairs. Empty boundaries are kept but never hit.
    pub fn new<'a, I>(items: I) -> Self where I: IntoIterator<Item = (&'a str, &'a MultiPolygon<f64>)> {
        let (codes, shapes): (Vec<String>, Vec<MultiPolygon<f64>>) = items.into_iter()
            .map(|(code, shape)| (code.to_string(), shape.clone()))
            .unzip();

        let rtree = RTree::bulk_load(
            shapes.iter().enumerate()
                .filter_map(|(idx, shape)| shape.bounding_rect().map(|bbox| IndexedRect { idx, bbox }))
                .collect()
        );

        Self { codes, shapes, rtree }
    }

    #[inline] pub fn len(&self) -> usize { self.shapes.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.shapes.is_empty() }

    /// Code of the first polygon containing the point, by insertion order.
    pub fn locate(&self, lng: f64, lat: f64) -> Option<&str> {
        let point = Point::new(lng, lat);
        self.rtree.locate_in_envelope_intersecting(&AABB::from_point([lng, lat]))
            .filter(|rect| self.shapes[rect.idx].contains(&point))
            .map(|rect| rect.idx)
            .min()
            .map(|idx| self.codes[idx].as_str())
    }

    /// Codes of polygons whose bounding box intersects `bbox`, in insertion order.
    pub fn intersecting(&self, bbox: &BoundingBox) -> Vec<&str> {
        let mut hits: Vec<usize> = self.rtree.locate_in_envelope_intersecting(&bbox.envelope())
            .map(|rect| rect.idx)
            .collect();
        hits.sort_unstable();
        hits.into_iter().map(|idx| self.codes[idx].as_str()).collect()
    }

    /// Bounding box of all polygons.
    pub fn bounds(&self) -> Option<BoundingBox> {
        self.shapes.iter()
            .filter_map(|shape| shape.bounding_rect())
            .map(BoundingBox::from)
            .reduce(|a, b| a.union(&b))
    }
}
