//! Heightfield sampling and mesh displacement.
//!
//! `displace` is a pure function from a cleaned height field and a render
//! configuration to a displaced vertex grid; callers re-invoke it whenever
//! any input changes (height field, exaggeration, resolution, filter method
//! or scale mode). There is no incremental update path.

use crate::core::decode::elevation_range;
use crate::core::geodesy::haversine_distance_m;
use crate::types::{BoundingBox, HeightField, RenderConfig, TerrainError, TerrainResult};

/// Fixed east-west extent of the mesh plane in scene units; the north-south
/// extent follows from the bbox degree ratio.
pub const PLANE_WIDTH: f64 = 10.0;

/// Fraction of the plane width the relief occupies in normalized mode.
pub const NORMALIZED_RELIEF_RATIO: f64 = 0.25;

/// Base scale used when the elevation range (or horizontal distance) is
/// degenerate; keeps the mesh flat instead of dividing by zero.
pub const FLAT_TERRAIN_SCALE: f64 = 1e-4;

/// Displaced terrain mesh handed to an external renderer: flat position,
/// normal and UV buffers, triangle indices, plus elevation range in meters
/// (for legend overlays) and the axis-aligned bounds of the displaced
/// vertices.
#[derive(Debug, Clone)]
pub struct TerrainMesh {
    /// xyz per vertex, row-major over the grid, row 0 = north edge
    pub positions: Vec<f32>,
    /// Smooth per-vertex normals, unit length
    pub normals: Vec<f32>,
    /// Texture coordinates; v = 0 is the north edge, matching raster row 0
    pub uvs: Vec<f32>,
    /// Counter-clockwise triangles viewed from above
    pub indices: Vec<u32>,
    /// Vertices per grid axis (segments + 1)
    pub grid_size: u32,
    pub elevation_min: f32,
    pub elevation_max: f32,
    pub bounds_min: [f32; 3],
    pub bounds_max: [f32; 3],
}

/// Sample a height field at normalized coordinates with bilinear
/// interpolation.
///
/// `(u, v)` in `[0, 1]^2` maps to continuous raster coordinates
/// `(u * (W-1), v * (H-1))`; `v = 0` is row 0 (north). Corner samples are
/// exact.
pub fn sample_bilinear(field: &HeightField, u: f64, v: f64) -> f32 {
    let (height, width) = field.dim();
    let x = u.clamp(0.0, 1.0) * (width - 1) as f64;
    let y = v.clamp(0.0, 1.0) * (height - 1) as f64;

    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);

    let dx = (x - x0 as f64) as f32;
    let dy = (y - y0 as f64) as f32;

    let top = field[[y0, x0]] * (1.0 - dx) + field[[y0, x1]] * dx;
    let bottom = field[[y1, x0]] * (1.0 - dx) + field[[y1, x1]] * dx;
    top * (1.0 - dy) + bottom * dy
}

/// Scene units per meter of elevation for the given scale mode
fn base_scale(bbox: &BoundingBox, elevation_min: f32, elevation_max: f32, real_scale: bool) -> f64 {
    if real_scale {
        // Horizontal reference: west-to-east distance at the mean latitude
        let center_lat = bbox.center_lat();
        let distance_m =
            haversine_distance_m(bbox.min_lon, center_lat, bbox.max_lon, center_lat);
        if distance_m > 0.0 {
            PLANE_WIDTH / distance_m
        } else {
            FLAT_TERRAIN_SCALE
        }
    } else {
        // Relief occupies a fixed fraction of the plane width
        let range = (elevation_max - elevation_min) as f64;
        if range > 0.0 {
            PLANE_WIDTH * NORMALIZED_RELIEF_RATIO / range
        } else {
            FLAT_TERRAIN_SCALE
        }
    }
}

/// Displace a vertex grid over the cleaned height field.
///
/// Normalized mode lifts vertices by `(h - min) * base_scale`, real-scale
/// mode by `h * base_scale` (absolute elevation preserved, below-sea-level
/// terrain included). `height_exaggeration` is a pure post-multiplier in
/// both modes.
pub fn displace(field: &HeightField, config: &RenderConfig) -> TerrainResult<TerrainMesh> {
    config.validate()?;
    let (field_height, field_width) = field.dim();
    if field_width == 0 || field_height == 0 {
        return Err(TerrainError::Processing(
            "Cannot displace over an empty height field".to_string(),
        ));
    }

    let bbox = &config.bbox;
    let segments = config.mesh_resolution.segments() as usize;
    let grid = segments + 1;

    let (elevation_min, elevation_max) = elevation_range(field);
    let scale = base_scale(bbox, elevation_min, elevation_max, config.use_real_scale)
        * config.height_exaggeration;

    let plane_width = PLANE_WIDTH;
    let plane_height = PLANE_WIDTH * bbox.lat_range() / bbox.lon_range();

    log::debug!(
        "Displacing {}x{} grid over {}x{} field (scale {:.6e}, real_scale {})",
        grid,
        grid,
        field_width,
        field_height,
        scale,
        config.use_real_scale
    );

    let mut positions = Vec::with_capacity(grid * grid * 3);
    let mut uvs = Vec::with_capacity(grid * grid * 2);

    for j in 0..grid {
        let v = j as f64 / segments as f64;
        // Row 0 of the field is north; lay it along the plane's +y edge
        let y = plane_height / 2.0 - v * plane_height;
        for i in 0..grid {
            let u = i as f64 / segments as f64;
            let x = -plane_width / 2.0 + u * plane_width;

            let sampled = sample_bilinear(field, u, v) as f64;
            let z = if config.use_real_scale {
                sampled * scale
            } else {
                (sampled - elevation_min as f64) * scale
            };

            positions.extend_from_slice(&[x as f32, y as f32, z as f32]);
            uvs.extend_from_slice(&[u as f32, v as f32]);
        }
    }

    let mut indices = Vec::with_capacity(segments * segments * 6);
    for j in 0..segments {
        for i in 0..segments {
            let a = (j * grid + i) as u32;
            let b = a + 1;
            let c = a + grid as u32;
            let d = c + 1;
            // Two CCW triangles per quad, viewed from +z
            indices.extend_from_slice(&[a, c, b, b, c, d]);
        }
    }

    let normals = compute_vertex_normals(&positions, &indices);
    let (bounds_min, bounds_max) = compute_bounds(&positions);

    Ok(TerrainMesh {
        positions,
        normals,
        uvs,
        indices,
        grid_size: grid as u32,
        elevation_min,
        elevation_max,
        bounds_min,
        bounds_max,
    })
}

/// Smooth vertex normals by face-normal accumulation
fn compute_vertex_normals(positions: &[f32], indices: &[u32]) -> Vec<f32> {
    let mut normals = vec![0.0f32; positions.len()];

    for tri in indices.chunks_exact(3) {
        let (i0, i1, i2) = (tri[0] as usize * 3, tri[1] as usize * 3, tri[2] as usize * 3);
        let p0 = [positions[i0], positions[i0 + 1], positions[i0 + 2]];
        let p1 = [positions[i1], positions[i1 + 1], positions[i1 + 2]];
        let p2 = [positions[i2], positions[i2 + 1], positions[i2 + 2]];

        let e1 = [p1[0] - p0[0], p1[1] - p0[1], p1[2] - p0[2]];
        let e2 = [p2[0] - p0[0], p2[1] - p0[1], p2[2] - p0[2]];
        let face = [
            e1[1] * e2[2] - e1[2] * e2[1],
            e1[2] * e2[0] - e1[0] * e2[2],
            e1[0] * e2[1] - e1[1] * e2[0],
        ];

        for &base in &[i0, i1, i2] {
            normals[base] += face[0];
            normals[base + 1] += face[1];
            normals[base + 2] += face[2];
        }
    }

    for n in normals.chunks_exact_mut(3) {
        let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
        if len > 1e-12 {
            n[0] /= len;
            n[1] /= len;
            n[2] /= len;
        } else {
            // Degenerate accumulation; point up
            n[0] = 0.0;
            n[1] = 0.0;
            n[2] = 1.0;
        }
    }

    normals
}

/// Axis-aligned bounds of the displaced vertices
fn compute_bounds(positions: &[f32]) -> ([f32; 3], [f32; 3]) {
    let mut min = [f32::INFINITY; 3];
    let mut max = [f32::NEG_INFINITY; 3];
    for p in positions.chunks_exact(3) {
        for axis in 0..3 {
            min[axis] = min[axis].min(p[axis]);
            max[axis] = max[axis].max(p[axis]);
        }
    }
    (min, max)
}
