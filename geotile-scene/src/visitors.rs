//! Stock traversals over a node graph.

use crate::node::{ChildSlot, Group, LodDecision, Node, PagedLod, TileGeometry, Visitor};
use crate::{BoundingSphere, Extents};

/// Accumulates a bounding sphere over every tile reached. Placeholders
/// contribute their own bound and are not descended.
pub struct ComputeBounds {
    pub bound: BoundingSphere,
}

impl Default for ComputeBounds {
    fn default() -> Self {
        ComputeBounds {
            bound: BoundingSphere::new(Default::default(), -1.0),
        }
    }
}

impl ComputeBounds {
    pub fn new() -> Self {
        ComputeBounds::default()
    }

    /// Bound of everything under `node`.
    pub fn of(node: &dyn Node) -> BoundingSphere {
        let mut visitor = ComputeBounds::new();
        node.accept(&mut visitor);
        visitor.bound
    }
}

impl Visitor for ComputeBounds {
    fn apply(&mut self, node: &dyn Node) {
        node.traverse(self);
    }

    fn apply_paged_lod(&mut self, paged_lod: &PagedLod) {
        self.bound = self.bound.union(&paged_lod.bound);
    }

    fn apply_tile(&mut self, tile: &TileGeometry) {
        self.bound = self.bound.union(&tile.bound());
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CountNodes {
    pub groups: usize,
    pub paged_lods: usize,
    pub tiles: usize,
}

impl CountNodes {
    pub fn of(node: &dyn Node) -> CountNodes {
        let mut visitor = CountNodes::default();
        node.accept(&mut visitor);
        visitor
    }
}

impl Visitor for CountNodes {
    fn apply(&mut self, node: &dyn Node) {
        node.traverse(self);
    }

    fn apply_group(&mut self, group: &Group) {
        self.groups += 1;
        group.traverse(self);
    }

    fn apply_paged_lod(&mut self, paged_lod: &PagedLod) {
        self.paged_lods += 1;
        paged_lod.traverse(self);
    }

    fn apply_tile(&mut self, _tile: &TileGeometry) {
        self.tiles += 1;
    }
}

/// A child read the traversal wants: where to read it from and the slot
/// to install the result into.
#[derive(Debug, Clone)]
pub struct TileRequest {
    pub filename: String,
    pub slot: ChildSlot,
    /// Screen height ratio at the time of the request, larger is more urgent.
    pub priority: f64,
}

/// Renderer side LOD traversal. `metric` maps a placeholder's bound to the
/// fraction of the screen height it covers.
pub struct LodSelector<F: FnMut(&BoundingSphere) -> f64> {
    metric: F,
    pub drawn: Vec<Extents>,
    pub requests: Vec<TileRequest>,
}

impl<F: FnMut(&BoundingSphere) -> f64> LodSelector<F> {
    pub fn new(metric: F) -> Self {
        LodSelector {
            metric,
            drawn: Vec::new(),
            requests: Vec::new(),
        }
    }

    /// Requests sorted most urgent first.
    pub fn take_requests(&mut self) -> Vec<TileRequest> {
        let mut requests = std::mem::take(&mut self.requests);
        requests.sort_by(|a, b| b.priority.total_cmp(&a.priority));
        requests
    }
}

impl<F: FnMut(&BoundingSphere) -> f64> Visitor for LodSelector<F> {
    fn apply(&mut self, node: &dyn Node) {
        node.traverse(self);
    }

    fn apply_paged_lod(&mut self, paged_lod: &PagedLod) {
        let ratio = (self.metric)(&paged_lod.bound);
        match paged_lod.transition.decide(ratio) {
            LodDecision::ExpandToChildren => match paged_lod.children.get() {
                Some(children) => children.accept(self),
                None => {
                    if !paged_lod.children.is_absent() {
                        self.requests.push(TileRequest {
                            filename: paged_lod.filename.clone(),
                            slot: paged_lod.children.clone(),
                            priority: ratio,
                        });
                    }
                    paged_lod.coarse.accept(self);
                }
            },
            LodDecision::KeepPlaceholder => paged_lod.coarse.accept(self),
        }
    }

    fn apply_tile(&mut self, tile: &TileGeometry) {
        self.drawn.push(tile.extents);
    }
}
