use std::sync::Arc;

use tracing::info;

use crate::config::ClusterOptions;
use crate::geom::BoundingBox;
use crate::types::{MarkerKind, MarkerPoint};
use super::{ClusterIndex, ClusterNode};

/// Owner of the current marker set and its cluster index.
///
/// The index is rebuilt wholesale on every marker change and handed out behind an
/// `Arc`, so readers keep a consistent snapshot. Querying a snapshot built from an
/// earlier marker set is a programming error and panics.
#[derive(Debug)]
pub struct MarkerLayer<T> {
    options: ClusterOptions,
    generation: u64,
    index: Arc<ClusterIndex<T>>,
}

impl<T: MarkerKind> MarkerLayer<T> {
    pub fn new(options: ClusterOptions) -> Self {
        let index = Arc::new(ClusterIndex::build_generation(Vec::new(), &options, 0));
        Self { options, generation: 0, index }
    }

    /// Replace the marker set and rebuild the index.
    pub fn set_markers(&mut self, markers: Vec<MarkerPoint<T>>) -> Arc<ClusterIndex<T>> {
        self.generation += 1;
        let count = markers.len();
        self.index = Arc::new(ClusterIndex::build_generation(markers, &self.options, self.generation));
        info!(markers = count, generation = self.generation, "cluster index rebuilt");
        self.index.clone()
    }
}

impl<T> MarkerLayer<T> {
    #[inline] pub fn options(&self) -> &ClusterOptions { &self.options }

    #[inline] pub fn generation(&self) -> u64 { self.generation }

    /// Snapshot of the current index.
    #[inline] pub fn index(&self) -> Arc<ClusterIndex<T>> { self.index.clone() }

    /// Query `index`, which must be the current snapshot.
    pub fn query<'a>(&self, index: &'a ClusterIndex<T>, bbox: &BoundingBox, zoom: f64) -> Vec<ClusterNode<'a, T>> {
        assert_eq!(
            index.generation(), self.generation,
            "cluster index is stale: built for marker set {} but the layer is at {}",
            index.generation(), self.generation,
        );
        index.query(bbox, zoom)
    }
}
