#![warn(
    clippy::unwrap_used,
    clippy::cast_lossless,
    clippy::unimplemented,
    clippy::expect_used
)]
//! Scene-side building blocks for geotile: geodetic math, extents and
//! bounds, image buffers with attribute maps, the node/visitor protocol and
//! the builders that turn a tile's extents and image into geometry.

mod bounding_sphere;
mod ellipsoid;
mod extents;
pub mod geometry;
mod image;
pub mod math;
mod node;
mod object;
pub mod scene_file;
pub mod visitors;

pub use bounding_sphere::BoundingSphere;
pub use ellipsoid::Ellipsoid;
pub use extents::Extents;
pub use image::{DataType, Element, ImageData, PixelData};
pub use math::{equals_epsilon, Cartographic};
pub use node::{
    ChildSlot, Group, LodDecision, LodTransition, Node, PagedLod, TileGeometry, Visitor,
};
pub use object::{Attributes, Object, Value};
