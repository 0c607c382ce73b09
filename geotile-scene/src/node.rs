use std::any::Any;
use std::fmt;
use std::sync::Arc;

use bevy::math::{DVec3, Vec2, Vec3};
use parking_lot::RwLock;

use crate::{BoundingSphere, Extents, ImageData};

/// A scene-graph node. Nodes only dispatch; what happens during a traversal
/// is decided by the visitor.
pub trait Node: Any + Send + Sync + fmt::Debug {
    /// Calls the visitor hook matching the concrete node type.
    fn accept(&self, visitor: &mut dyn Visitor);

    /// Hands each child to `visitor`. Leaves have nothing to do.
    fn traverse(&self, _visitor: &mut dyn Visitor) {}

    fn as_any(&self) -> &dyn Any;
}

pub trait Visitor {
    fn apply(&mut self, node: &dyn Node);

    fn apply_group(&mut self, group: &Group) {
        self.apply(group);
    }

    fn apply_paged_lod(&mut self, paged_lod: &PagedLod) {
        self.apply(paged_lod);
    }

    fn apply_tile(&mut self, tile: &TileGeometry) {
        self.apply(tile);
    }
}

#[derive(Debug, Default)]
pub struct Group {
    pub children: Vec<Arc<dyn Node>>,
}

impl Group {
    pub fn new() -> Self {
        Group::default()
    }

    pub fn add_child(&mut self, child: Arc<dyn Node>) {
        self.children.push(child);
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl Node for Group {
    fn accept(&self, visitor: &mut dyn Visitor) {
        visitor.apply_group(self);
    }

    fn traverse(&self, visitor: &mut dyn Visitor) {
        for child in &self.children {
            child.accept(visitor);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Outcome of the level of detail test for one placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LodDecision {
    KeepPlaceholder,
    ExpandToChildren,
}

/// Expansion threshold expressed as a fraction of the screen height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LodTransition {
    pub screen_height_ratio: f64,
}

impl LodTransition {
    pub fn new(screen_height_ratio: f64) -> Self {
        LodTransition {
            screen_height_ratio,
        }
    }

    /// Expand once the tile covers at least the transition ratio of the
    /// screen height.
    pub fn decide(&self, screen_height_ratio: f64) -> LodDecision {
        if screen_height_ratio >= self.screen_height_ratio {
            LodDecision::ExpandToChildren
        } else {
            LodDecision::KeepPlaceholder
        }
    }
}

#[derive(Clone, Default)]
enum SlotState {
    #[default]
    Empty,
    Loaded(Arc<dyn Node>),
    /// A read finished without producing children.
    Absent,
}

/// Shared slot a placeholder's children are installed into once loaded.
/// A slot whose read came back empty is marked absent so it is not
/// requested again.
#[derive(Clone, Default)]
pub struct ChildSlot(Arc<RwLock<SlotState>>);

impl ChildSlot {
    pub fn new() -> Self {
        ChildSlot::default()
    }

    pub fn get(&self) -> Option<Arc<dyn Node>> {
        match &*self.0.read() {
            SlotState::Loaded(node) => Some(node.clone()),
            SlotState::Empty | SlotState::Absent => None,
        }
    }

    /// Installs `node` into an empty slot. Returns whether the slot was
    /// filled by this call.
    pub fn install(&self, node: Arc<dyn Node>) -> bool {
        let mut slot = self.0.write();
        if !matches!(*slot, SlotState::Empty) {
            return false;
        }
        *slot = SlotState::Loaded(node);
        true
    }

    /// Records that there are no children to load. Returns whether the
    /// slot was empty.
    pub fn mark_absent(&self) -> bool {
        let mut slot = self.0.write();
        if !matches!(*slot, SlotState::Empty) {
            return false;
        }
        *slot = SlotState::Absent;
        true
    }

    /// Empties the slot so the placeholder shows its coarse tile again and
    /// may be requested anew. Returns the children that were loaded.
    pub fn clear(&self) -> Option<Arc<dyn Node>> {
        match std::mem::take(&mut *self.0.write()) {
            SlotState::Loaded(node) => Some(node),
            SlotState::Empty | SlotState::Absent => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(*self.0.read(), SlotState::Loaded(_))
    }

    pub fn is_absent(&self) -> bool {
        matches!(*self.0.read(), SlotState::Absent)
    }

    /// Loaded or known to be absent: nothing left to request.
    pub fn is_settled(&self) -> bool {
        !matches!(*self.0.read(), SlotState::Empty)
    }

    pub fn same_slot(&self, other: &ChildSlot) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ChildSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildSlot")
            .field("loaded", &self.is_loaded())
            .field("absent", &self.is_absent())
            .finish()
    }
}

/// Internal quad-tree node: shows `coarse` until the traversal decides to
/// expand it, then shows whatever has been installed into `children`,
/// requesting `filename` while nothing is there.
#[derive(Debug)]
pub struct PagedLod {
    pub bound: BoundingSphere,
    pub transition: LodTransition,
    pub filename: String,
    pub coarse: Arc<dyn Node>,
    pub children: ChildSlot,
}

impl PagedLod {
    pub fn new(
        bound: BoundingSphere,
        transition: LodTransition,
        filename: impl Into<String>,
        coarse: Arc<dyn Node>,
    ) -> Self {
        PagedLod {
            bound,
            transition,
            filename: filename.into(),
            coarse,
            children: ChildSlot::new(),
        }
    }
}

impl Node for PagedLod {
    fn accept(&self, visitor: &mut dyn Visitor) {
        visitor.apply_paged_lod(self);
    }

    /// Visits the loaded children if there are any, the coarse tile
    /// otherwise.
    fn traverse(&self, visitor: &mut dyn Visitor) {
        match self.children.get() {
            Some(children) => children.accept(visitor),
            None => self.coarse.accept(visitor),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Leaf geometry for one tile. Vertices are relative to `origin` so they
/// stay precise in single precision.
#[derive(Debug, Clone)]
pub struct TileGeometry {
    pub origin: DVec3,
    pub vertices: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub texcoords: Vec<Vec2>,
    pub indices: Vec<u32>,
    pub image: Arc<ImageData>,
    pub terrain: Option<Arc<ImageData>>,
    pub extents: Extents,
    pub mipmap_levels: u32,
}

impl TileGeometry {
    /// Bounding sphere of the vertices in the frame `origin` lives in.
    pub fn bound(&self) -> BoundingSphere {
        let positions: Vec<DVec3> = self
            .vertices
            .iter()
            .map(|v| self.origin + v.as_dvec3())
            .collect();
        BoundingSphere::from_points(&positions)
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

impl Node for TileGeometry {
    fn accept(&self, visitor: &mut dyn Visitor) {
        visitor.apply_tile(self);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
