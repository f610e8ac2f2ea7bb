//! Screen-space marker clustering.
//!
//! Two markers end up in the same cluster at zoom `z` when their projected
//! distance at `z` is within `radius_px` pixels. Levels are built from the
//! highest zoom down, merging the previous level's items greedily in id order.

mod index;
mod layer;

pub use index::{ClusterIndex, ClusterNode, MAX_ZOOM};
pub use layer::MarkerLayer;
