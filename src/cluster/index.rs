use std::{collections::BTreeSet, sync::Arc};

use rstar::{primitives::{GeomWithData, Rectangle}, Envelope, RTree, AABB};
use serde::Serialize;
use tracing::debug;

use crate::config::ClusterOptions;
use crate::geom::{projection, BoundingBox};
use crate::types::{MarkerKind, MarkerPoint};

/// Projected position tagged with its node id.
type Slot = GeomWithData<[f64; 2], usize>;

/// Projected extent of a node's markers tagged with its node id.
type Extent = GeomWithData<Rectangle<[f64; 2]>, usize>;

/// Highest zoom an index is built for.
pub const MAX_ZOOM: u8 = 24;

/// A renderable node: an aggregate of nearby markers or a single marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ClusterNode<'a, T> {
    Cluster {
        id: usize,
        lng: f64,
        lat: f64,
        count: usize,
        #[serde(rename = "childTypes")]
        child_types: &'a [Arc<str>],
    },
    Point { marker: &'a MarkerPoint<T> },
}

impl<T> ClusterNode<'_, T> {
    /// Number of markers behind this node.
    pub fn count(&self) -> usize {
        match self {
            ClusterNode::Cluster { count, .. } => *count,
            ClusterNode::Point { .. } => 1,
        }
    }

    pub fn position(&self) -> (f64, f64) {
        match self {
            ClusterNode::Cluster { lng, lat, .. } => (*lng, *lat),
            ClusterNode::Point { marker } => (marker.lng, marker.lat),
        }
    }

    pub fn cluster_id(&self) -> Option<usize> {
        match self {
            ClusterNode::Cluster { id, .. } => Some(*id),
            ClusterNode::Point { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Node {
    xy: [f64; 2],
    count: usize,
    /// Highest zoom at which the node is an item of its own; `max_zoom + 1` for markers.
    zoom: u8,
    /// Merged nodes, empty for markers.
    children: Vec<usize>,
    /// Projected bounds of every marker below this node.
    env: AABB<[f64; 2]>,
    /// Sorted distinct marker kinds below this node.
    kinds: Vec<Arc<str>>,
}

/// Hierarchical marker clusters, one spatial tree per zoom level.
///
/// Node ids `0..markers.len()` are the markers themselves; clusters follow. The index
/// is immutable once built, so any number of readers can query it concurrently.
#[derive(Debug)]
pub struct ClusterIndex<T> {
    markers: Vec<MarkerPoint<T>>,
    nodes: Vec<Node>,
    /// `levels[z - min_zoom]` holds the extents of the items visible at zoom `z`;
    /// the last level holds markers.
    levels: Vec<RTree<Extent>>,
    min_zoom: u8,
    max_zoom: u8,
    generation: u64,
}

impl<T: MarkerKind> ClusterIndex<T> {
    /// Cluster `markers` bottom-up from `max_zoom` to `min_zoom`.
    pub fn build(markers: Vec<MarkerPoint<T>>, options: &ClusterOptions) -> Self {
        Self::build_generation(markers, options, 0)
    }

    pub(crate) fn build_generation(markers: Vec<MarkerPoint<T>>, options: &ClusterOptions, generation: u64) -> Self {
        let min_zoom = options.min_zoom.min(MAX_ZOOM);
        let max_zoom = options.max_zoom.clamp(min_zoom, MAX_ZOOM);
        let top = max_zoom + 1;

        let mut nodes: Vec<Node> = markers.iter()
            .map(|marker| {
                let xy = projection::project(marker.lng, marker.lat);
                Node {
                    xy,
                    count: 1,
                    zoom: top,
                    children: Vec::new(),
                    env: AABB::from_point(xy),
                    kinds: vec![Arc::from(marker.payload.kind())],
                }
            })
            .collect();

        let mut current: Vec<usize> = (0..nodes.len()).collect();
        let mut points = point_tree(&nodes, &current);
        let mut levels = vec![extent_tree(&nodes, &current)];

        for zoom in (min_zoom..=max_zoom).rev() {
            let radius = options.radius_px * projection::pixel_size(zoom as f64, options.extent_px);
            let next = cluster_level(&mut nodes, &current, &points, zoom, radius, options.min_points);
            debug!(zoom, items = next.len(), "cluster level built");
            points = point_tree(&nodes, &next);
            levels.push(extent_tree(&nodes, &next));
            current = next;
        }
        levels.reverse();

        Self { markers, nodes, levels, min_zoom, max_zoom, generation }
    }
}

/// Merge the items of one level into the next lower zoom.
/// Items are visited in id order, so the result only depends on the input.
fn cluster_level(nodes: &mut Vec<Node>, items: &[usize], tree: &RTree<Slot>, zoom: u8, radius: f64, min_points: usize) -> Vec<usize> {
    let mut claimed = vec![false; nodes.len()];
    let mut next = Vec::with_capacity(items.len());

    for &id in items {
        if claimed[id] { continue }
        claimed[id] = true;

        let mut neighbors: Vec<usize> = tree.locate_within_distance(nodes[id].xy, radius * radius)
            .map(|slot| slot.data)
            .filter(|&other| !claimed[other])
            .collect();
        neighbors.sort_unstable();

        let total = nodes[id].count + neighbors.iter().map(|&n| nodes[n].count).sum::<usize>();
        for &n in &neighbors { claimed[n] = true }

        if neighbors.is_empty() || total < min_points {
            next.push(id);
            next.extend(neighbors);
            continue;
        }

        let members: Vec<usize> = std::iter::once(id).chain(neighbors).collect();
        let (mut wx, mut wy) = (0.0, 0.0);
        let mut env = nodes[id].env;
        let mut kinds = BTreeSet::new();
        for &m in &members {
            let node = &nodes[m];
            wx += node.xy[0] * node.count as f64;
            wy += node.xy[1] * node.count as f64;
            env.merge(&node.env);
            kinds.extend(node.kinds.iter().cloned());
        }

        next.push(nodes.len());
        nodes.push(Node {
            xy: [wx / total as f64, wy / total as f64],
            count: total,
            zoom,
            children: members,
            env,
            kinds: kinds.into_iter().collect(),
        });
    }
    next
}

fn point_tree(nodes: &[Node], items: &[usize]) -> RTree<Slot> {
    RTree::bulk_load(items.iter().map(|&id| Slot::new(nodes[id].xy, id)).collect())
}

fn extent_tree(nodes: &[Node], items: &[usize]) -> RTree<Extent> {
    RTree::bulk_load(items.iter().map(|&id| Extent::new(Rectangle::from_aabb(nodes[id].env), id)).collect())
}

impl<T> ClusterIndex<T> {
    #[inline] pub fn len(&self) -> usize { self.markers.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.markers.is_empty() }

    #[inline] pub fn markers(&self) -> &[MarkerPoint<T>] { &self.markers }

    /// Marker set this index was built from, as counted by its owning layer.
    #[inline] pub fn generation(&self) -> u64 { self.generation }

    /// Zoom above which every marker is its own node.
    #[inline] pub fn max_zoom(&self) -> u8 { self.max_zoom }

    fn level(&self, zoom: f64) -> &RTree<Extent> {
        // NaN casts to 0, hence the second clamp.
        let z = (zoom.floor().clamp(self.min_zoom as f64, (self.max_zoom + 1) as f64) as u8).clamp(self.min_zoom, self.max_zoom + 1);
        &self.levels[(z - self.min_zoom) as usize]
    }

    fn node(&self, id: usize) -> ClusterNode<'_, T> {
        if id < self.markers.len() { return ClusterNode::Point { marker: &self.markers[id] } }
        let node = &self.nodes[id];
        ClusterNode::Cluster {
            id,
            lng: projection::x_lng(node.xy[0]),
            lat: projection::y_lat(node.xy[1]),
            count: node.count,
            child_types: &node.kinds,
        }
    }

    fn cluster(&self, cluster_id: usize) -> Option<&Node> {
        if cluster_id < self.markers.len() { return None }
        self.nodes.get(cluster_id)
    }

    /// Node with the given id, marker or cluster.
    pub fn get(&self, id: usize) -> Option<ClusterNode<'_, T>> {
        (id < self.nodes.len()).then(|| self.node(id))
    }

    /// Nodes covering exactly the markers inside `bbox` at `zoom`, ordered by id.
    /// A cluster cut by `bbox` is replaced by its descendants that lie fully inside.
    /// Fractional zooms use the level below.
    pub fn query(&self, bbox: &BoundingBox, zoom: f64) -> Vec<ClusterNode<'_, T>> {
        let envelope = AABB::from_corners(
            [projection::lng_x(bbox.west), projection::lat_y(bbox.north)],
            [projection::lng_x(bbox.east), projection::lat_y(bbox.south)],
        );
        let mut ids = Vec::new();
        for slot in self.level(zoom).locate_in_envelope_intersecting(&envelope) {
            self.collect_inside(slot.data, &envelope, &mut ids);
        }
        ids.sort_unstable();
        ids.into_iter().map(|id| self.node(id)).collect()
    }

    /// Push `id` if all its markers lie in `envelope`, else the parts of it that do.
    fn collect_inside(&self, id: usize, envelope: &AABB<[f64; 2]>, out: &mut Vec<usize>) {
        let node = &self.nodes[id];
        if envelope.contains_envelope(&node.env) {
            out.push(id);
            return;
        }
        for &child in &node.children {
            if envelope.intersects(&self.nodes[child].env) { self.collect_inside(child, envelope, out) }
        }
    }

    /// Lowest zoom at which the cluster splits into its children.
    pub fn expansion_zoom(&self, cluster_id: usize) -> Option<u8> {
        self.cluster(cluster_id).map(|node| node.zoom + 1)
    }

    /// Nodes the cluster splits into at its expansion zoom.
    pub fn children(&self, cluster_id: usize) -> Option<Vec<ClusterNode<'_, T>>> {
        self.cluster(cluster_id).map(|node| node.children.iter().map(|&id| self.node(id)).collect())
    }

    /// Markers of a cluster, depth-first, skipping `offset` and returning at most `limit`.
    pub fn leaves(&self, cluster_id: usize, limit: usize, offset: usize) -> Vec<&MarkerPoint<T>> {
        let Some(root) = self.cluster(cluster_id) else { return vec![] };
        let mut out = Vec::new();
        let mut skipped = 0;
        let mut stack: Vec<usize> = root.children.iter().rev().copied().collect();

        while let Some(id) = stack.pop() {
            if out.len() >= limit { break }
            if id < self.markers.len() {
                if skipped < offset { skipped += 1 } else { out.push(&self.markers[id]) }
                continue;
            }
            let node = &self.nodes[id];
            if skipped + node.count <= offset {
                skipped += node.count;
                continue;
            }
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn grid(n: usize, step: f64) -> Vec<MarkerPoint<&'static str>> {
        (0..n).map(|i| {
            let kind = if i % 3 == 0 { "cabinet" } else { "local" };
            MarkerPoint::new(&format!("m{i}"), 2.0 + (i % 10) as f64 * step, 48.5 + (i / 10) as f64 * step, kind)
        }).collect()
    }

    fn leaf_ids<T>(index: &ClusterIndex<T>, node: &ClusterNode<'_, T>) -> HashSet<Arc<str>> {
        match node {
            ClusterNode::Point { marker } => HashSet::from([marker.id.clone()]),
            ClusterNode::Cluster { id, .. } => index.leaves(*id, usize::MAX, 0).into_iter().map(|m| m.id.clone()).collect(),
        }
    }

    #[test]
    fn clustering_relaxes_with_zoom() {
        let index = ClusterIndex::build(grid(50, 0.05), &ClusterOptions::default());
        let bbox = BoundingBox::new(1.0, 47.0, 4.0, 50.0);

        let coarse = index.query(&bbox, 6.0);
        let fine = index.query(&bbox, 14.0);
        assert!(coarse.len() < fine.len());
        assert_eq!(index.query(&bbox, 17.0).len(), 50);
        assert!(index.query(&bbox, 17.0).iter().all(|node| matches!(node, ClusterNode::Point { .. })));
    }

    #[test]
    fn nodes_cover_every_marker_once() {
        let index = ClusterIndex::build(grid(50, 0.05), &ClusterOptions::default());
        let bbox = BoundingBox::new(1.0, 47.0, 4.0, 50.0);

        for zoom in 0..=17 {
            let nodes = index.query(&bbox, zoom as f64);
            let mut seen = HashSet::new();
            for node in &nodes {
                if let ClusterNode::Cluster { count, .. } = node { assert!(*count >= 2) }
                for id in leaf_ids(&index, node) { assert!(seen.insert(id)) }
            }
            assert_eq!(seen.len(), 50, "zoom {zoom}");
            assert_eq!(nodes.iter().map(ClusterNode::count).sum::<usize>(), 50);
        }
    }

    #[test]
    fn query_is_deterministic() {
        let index = ClusterIndex::build(grid(50, 0.02), &ClusterOptions::default());
        let bbox = BoundingBox::new(1.9, 48.4, 2.3, 48.7);
        assert_eq!(index.query(&bbox, 8.5), index.query(&bbox, 8.5));

        let rebuilt = ClusterIndex::build(grid(50, 0.02), &ClusterOptions::default());
        assert_eq!(index.query(&bbox, 8.0), rebuilt.query(&bbox, 8.0));
    }

    #[test]
    fn expansion_zoom_splits_cluster() {
        let index = ClusterIndex::build(grid(50, 0.05), &ClusterOptions::default());
        let world = BoundingBox::world();

        for zoom in [3.0, 6.0, 9.0] {
            for node in index.query(&world, zoom) {
                let Some(id) = node.cluster_id() else { continue };
                let members = leaf_ids(&index, &node);
                let expanded = index.expansion_zoom(id).unwrap();
                assert!(expanded as f64 > zoom);

                let covering: Vec<_> = index.query(&world, expanded as f64).into_iter()
                    .filter(|n| !leaf_ids(&index, n).is_disjoint(&members))
                    .collect();
                assert!(covering.len() >= 2);
                assert!(covering.iter().all(|n| n.cluster_id() != Some(id)));
            }
        }
    }

    #[test]
    fn cluster_centroid_and_kinds() {
        let markers = vec![
            MarkerPoint::new("a", 2.0, 48.0, "cabinet"),
            MarkerPoint::new("b", 2.001, 48.0, "local"),
            MarkerPoint::new("c", 2.002, 48.0, "local"),
        ];
        let index = ClusterIndex::build(markers, &ClusterOptions::default());
        let nodes = index.query(&BoundingBox::world(), 5.0);
        assert_eq!(nodes.len(), 1);

        let ClusterNode::Cluster { lng, lat, count, child_types, id } = &nodes[0] else { panic!("expected a cluster") };
        assert_eq!(*count, 3);
        assert!((lng - 2.001).abs() < 1e-9);
        assert!((lat - 48.0).abs() < 1e-9);
        assert_eq!(child_types.iter().map(|k| &**k).collect::<Vec<_>>(), vec!["cabinet", "local"]);

        assert_eq!(index.leaves(*id, 2, 1).iter().map(|m| &*m.id).collect::<Vec<_>>(), vec!["b", "c"]);
        assert!(index.children(*id).is_some_and(|c| c.len() >= 2));
        assert!(index.expansion_zoom(0).is_none());
    }

    #[test]
    fn min_points_keeps_small_groups_apart() {
        let options = ClusterOptions { min_points: 3, ..ClusterOptions::default() };
        let markers = vec![MarkerPoint::new("a", 2.0, 48.0, "local"), MarkerPoint::new("b", 2.001, 48.0, "local")];
        let index = ClusterIndex::build(markers, &options);
        assert_eq!(index.query(&BoundingBox::world(), 0.0).len(), 2);
    }

    #[test]
    fn bbox_limits_output() {
        let index = ClusterIndex::build(grid(50, 0.05), &ClusterOptions::default());
        let nodes = index.query(&BoundingBox::new(1.99, 48.49, 2.06, 48.51), 17.0);
        assert_eq!(nodes.len(), 2);
        assert!(index.query(&BoundingBox::new(-5.0, 43.0, -4.0, 44.0), 5.0).is_empty());
    }

    #[test]
    fn bbox_cutting_a_cluster_keeps_inside_markers() {
        let markers = vec![MarkerPoint::new("west", 2.0, 48.0, "local"), MarkerPoint::new("east", 2.004, 48.0, "local")];
        let index = ClusterIndex::build(markers, &ClusterOptions::default());
        assert_eq!(index.query(&BoundingBox::world(), 10.0).len(), 1);

        let west_only = BoundingBox::new(1.99, 47.99, 2.0015, 48.01);
        for zoom in [0.0, 6.0, 10.0, 17.0] {
            let nodes = index.query(&west_only, zoom);
            let ids: Vec<Arc<str>> = nodes.iter().flat_map(|n| leaf_ids(&index, n)).collect();
            assert_eq!(ids, vec![Arc::from("west")], "zoom {zoom}");
            assert!(matches!(nodes[0], ClusterNode::Point { .. }));
        }

        let between = BoundingBox::new(2.0015, 47.99, 2.0025, 48.01);
        assert!(index.query(&between, 10.0).is_empty());
    }

    #[test]
    fn partial_bboxes_cover_inside_markers_once() {
        let markers = grid(50, 0.05);
        let index = ClusterIndex::build(markers.clone(), &ClusterOptions::default());
        let bbox = BoundingBox::new(2.12, 48.57, 2.33, 48.73);
        let inside: HashSet<Arc<str>> = markers.iter()
            .filter(|m| bbox.contains(m.lng, m.lat))
            .map(|m| m.id.clone())
            .collect();
        assert!(!inside.is_empty() && inside.len() < 50);

        for zoom in 0..=17 {
            let mut seen = HashSet::new();
            for node in index.query(&bbox, zoom as f64) {
                if let ClusterNode::Cluster { count, .. } = node { assert!(count >= 2) }
                for id in leaf_ids(&index, &node) { assert!(seen.insert(id)) }
            }
            assert_eq!(seen, inside, "zoom {zoom}");
        }
    }

    #[test]
    fn oversized_max_zoom_is_clamped() {
        let options = ClusterOptions { min_zoom: 250, max_zoom: u8::MAX, ..ClusterOptions::default() };
        let index = ClusterIndex::build(grid(10, 0.001), &options);
        assert_eq!(index.max_zoom(), MAX_ZOOM);
        assert_eq!(index.query(&BoundingBox::world(), 30.0).len(), 10);
        assert_eq!(index.query(&BoundingBox::world(), f64::NAN).iter().map(ClusterNode::count).sum::<usize>(), 10);
    }
}
