//! Terrain-RGB elevation decoding.
//!
//! The provider packs elevation into the three 8-bit color channels as a
//! 24-bit integer in decimeters with a -10000 m offset. Decoding is a pure
//! affine formula plus a one-sided safety cap that rejects corrupt or
//! extreme pixels before any statistical filtering sees them.

use crate::types::{HeightField, RasterCanvas, TerrainResult};
use ndarray::Array2;

/// Ceiling applied to every decoded value. The cap is one-sided: negative
/// (below sea level) elevations are valid and pass through untouched.
pub const MAX_VALID_ELEVATION: f32 = 8000.0;

/// Decode one Terrain-RGB pixel to elevation in meters.
///
/// `elevation = -10000 + (R * 65536 + G * 256 + B) * 0.1`
#[inline]
pub fn decode_elevation(r: u8, g: u8, b: u8) -> f32 {
    let value = (r as u32) * 65536 + (g as u32) * 256 + (b as u32);
    let elevation = -10000.0 + (value as f64) * 0.1;
    (elevation as f32).min(MAX_VALID_ELEVATION)
}

/// Decode a cropped elevation raster into a height field of the same
/// dimensions. Alpha is ignored; every output value is finite and capped.
pub fn decode_height_field(raster: &RasterCanvas) -> TerrainResult<HeightField> {
    let width = raster.width as usize;
    let height = raster.height as usize;
    let mut field = Array2::zeros((height, width));

    for y in 0..height {
        for x in 0..width {
            let [r, g, b, _a] = raster.pixel(x as u32, y as u32);
            field[[y, x]] = decode_elevation(r, g, b);
        }
    }

    log::debug!("Decoded {}x{} height field", width, height);
    Ok(field)
}

/// Min/max scan over a height field, skipping non-finite values.
/// Returns (0.0, 0.0) for an empty field.
pub fn elevation_range(field: &HeightField) -> (f32, f32) {
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    for &v in field.iter() {
        if v.is_finite() {
            min = min.min(v);
            max = max.max(v);
        }
    }
    if min > max {
        (0.0, 0.0)
    } else {
        (min, max)
    }
}
