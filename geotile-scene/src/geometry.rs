//! Builders turning a tile's extents and decoded image into leaf geometry.

use std::sync::Arc;

use bevy::math::{DVec3, Vec2, Vec3};

use crate::{Cartographic, Ellipsoid, Extents, ImageData, TileGeometry};

/// Grid resolution used for ellipsoid tiles when the caller has no
/// preference.
pub const DEFAULT_ECEF_RESOLUTION: u32 = 32;

/// A flat quad spanning `extents` at `extents.min.z`. Texture coordinate
/// (0, 0) sits at the top left corner so row 0 of the image is north.
pub fn create_texture_quad(
    extents: &Extents,
    image: Arc<ImageData>,
    mipmap_levels: u32,
) -> TileGeometry {
    let z = extents.min.z;
    let origin = DVec3::new(extents.center().x, extents.center().y, z);
    let corners = [
        DVec3::new(extents.min.x, extents.min.y, z),
        DVec3::new(extents.max.x, extents.min.y, z),
        DVec3::new(extents.max.x, extents.max.y, z),
        DVec3::new(extents.min.x, extents.max.y, z),
    ];
    TileGeometry {
        origin,
        vertices: corners.iter().map(|c| (*c - origin).as_vec3()).collect(),
        normals: vec![Vec3::Z; 4],
        texcoords: vec![
            Vec2::new(0.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 0.0),
        ],
        indices: vec![0, 1, 2, 2, 3, 0],
        image,
        terrain: None,
        extents: *extents,
        mipmap_levels,
    }
}

/// A `resolution` x `resolution` grid over `extents` lifted onto
/// `ellipsoid`. `to_lat_lon_alt` converts a working frame point to
/// (latitude, longitude, altitude) in degrees and metres. Heights from the
/// first channel of `terrain` are added to the altitude. Vertices are
/// stored relative to the ECEF position of the tile centre.
pub fn create_ecef_tile(
    extents: &Extents,
    image: Arc<ImageData>,
    terrain: Option<Arc<ImageData>>,
    ellipsoid: &Ellipsoid,
    to_lat_lon_alt: &dyn Fn(DVec3) -> DVec3,
    resolution: u32,
    mipmap_levels: u32,
) -> TileGeometry {
    let n = resolution.max(2);
    let last = f64::from(n - 1);

    let to_ecef = |point: DVec3, height: f64| {
        let lla = to_lat_lon_alt(point);
        let cartographic = Cartographic::from_degrees(lla.y, lla.x, lla.z + height);
        (
            ellipsoid.cartographic_to_cartesian(&cartographic),
            ellipsoid.geodetic_surface_normal_cartographic(&cartographic),
        )
    };

    let centre = extents.center();
    let (origin, _) = to_ecef(DVec3::new(centre.x, centre.y, 0.0), 0.0);

    let count = (n * n) as usize;
    let mut vertices = Vec::with_capacity(count);
    let mut normals = Vec::with_capacity(count);
    let mut texcoords = Vec::with_capacity(count);
    for row in 0..n {
        let v = f64::from(row) / last;
        for col in 0..n {
            let u = f64::from(col) / last;
            let point = DVec3::new(
                extents.min.x + u * extents.width(),
                extents.min.y + v * extents.height(),
                0.0,
            );
            let height = terrain
                .as_ref()
                .and_then(|t| t.sample(u, 1.0 - v, 0))
                .unwrap_or(0.0);
            let (position, normal) = to_ecef(point, height);
            vertices.push((position - origin).as_vec3());
            normals.push(normal.as_vec3());
            texcoords.push(Vec2::new(u as f32, (1.0 - v) as f32));
        }
    }

    let mut indices = Vec::with_capacity(((n - 1) * (n - 1) * 6) as usize);
    for row in 0..n - 1 {
        for col in 0..n - 1 {
            let i = row * n + col;
            indices.extend_from_slice(&[i, i + 1, i + n + 1, i + n + 1, i + n, i]);
        }
    }

    TileGeometry {
        origin,
        vertices,
        normals,
        texcoords,
        indices,
        image,
        terrain,
        extents: *extents,
        mipmap_levels,
    }
}
