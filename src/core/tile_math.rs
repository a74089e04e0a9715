//! Web-mercator tile arithmetic: lon/lat to tile index conversion, zoom
//! selection under a tile budget, and bbox <-> tile-set mapping.

use crate::types::{BoundingBox, TerrainError, TerrainResult, TileCoord};

/// Minimum zoom returned by [`calculate_zoom_level`]; anything coarser is
/// useless as a terrain source.
pub const MIN_ZOOM: u32 = 8;

/// Maximum zoom returned by [`calculate_zoom_level`]; the performance ceiling.
pub const MAX_ZOOM: u32 = 15;

/// Default cap on the number of tiles fetched per raster style.
pub const DEFAULT_MAX_TILES: u32 = 16;

/// Convert a lon/lat point to its containing tile index at the given zoom
pub fn point_to_tile(lon: f64, lat: f64, zoom: u32) -> (u32, u32) {
    let n = 2.0_f64.powi(zoom as i32);
    let x = ((lon + 180.0) / 360.0 * n).floor();
    let lat_rad = lat.to_radians();
    let y = ((1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / std::f64::consts::PI) / 2.0 * n)
        .floor();

    let max_index = (n - 1.0).max(0.0);
    (
        x.clamp(0.0, max_index) as u32,
        y.clamp(0.0, max_index) as u32,
    )
}

/// Longitude of a tile column's western edge
pub fn tile_x_to_lon(x: u32, zoom: u32) -> f64 {
    let n = 2.0_f64.powi(zoom as i32);
    (x as f64 / n) * 360.0 - 180.0
}

/// Latitude of a tile row's northern edge (inverse web-mercator)
pub fn tile_y_to_lat(y: u32, zoom: u32) -> f64 {
    let n = 2.0_f64.powi(zoom as i32);
    let lat_rad = std::f64::consts::PI * (1.0 - 2.0 * y as f64 / n);
    lat_rad.sinh().atan().to_degrees()
}

/// Geographic bounds of a tile
pub fn tile_to_bounding_box(tile: &TileCoord) -> BoundingBox {
    BoundingBox {
        min_lon: tile_x_to_lon(tile.x, tile.z),
        max_lon: tile_x_to_lon(tile.x + 1, tile.z),
        // Row index grows southward, so y+1 is the southern edge
        min_lat: tile_y_to_lat(tile.y + 1, tile.z),
        max_lat: tile_y_to_lat(tile.y, tile.z),
    }
}

/// Number of tiles spanning the bbox at a zoom level
fn tile_span(bbox: &BoundingBox, zoom: u32) -> u32 {
    let (min_x, max_y) = point_to_tile(bbox.min_lon, bbox.min_lat, zoom);
    let (max_x, min_y) = point_to_tile(bbox.max_lon, bbox.max_lat, zoom);
    (max_x - min_x + 1) * (max_y - min_y + 1)
}

/// Pick the finest zoom whose covering tile count stays within `max_tiles`.
///
/// Walks zoom up from 0 and stops at the first level exceeding the budget,
/// returning the last level that fit, clamped to `[MIN_ZOOM, MAX_ZOOM]`.
/// The budget bounds fetch latency while the clamp guarantees a usable
/// minimum resolution.
pub fn calculate_zoom_level(bbox: &BoundingBox, max_tiles: u32) -> u32 {
    let mut zoom = 0;
    while zoom < MAX_ZOOM {
        if tile_span(bbox, zoom + 1) > max_tiles {
            break;
        }
        zoom += 1;
    }
    zoom.clamp(MIN_ZOOM, MAX_ZOOM)
}

/// Enumerate every tile covering the bbox at the given zoom, row-major.
///
/// The covering rectangle is inclusive of both corner tiles; a bbox that
/// fits inside a single tile yields exactly one coordinate.
pub fn tiles_for_bounding_box(bbox: &BoundingBox, zoom: u32) -> TerrainResult<Vec<TileCoord>> {
    bbox.validate()?;
    if zoom > MAX_ZOOM {
        return Err(TerrainError::InvalidInput(format!(
            "Zoom {} exceeds the supported maximum {}",
            zoom, MAX_ZOOM
        )));
    }

    // North-west corner has the smallest x and y indices
    let (min_x, max_y) = point_to_tile(bbox.min_lon, bbox.min_lat, zoom);
    let (max_x, min_y) = point_to_tile(bbox.max_lon, bbox.max_lat, zoom);

    let mut tiles = Vec::with_capacity(((max_x - min_x + 1) * (max_y - min_y + 1)) as usize);
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            tiles.push(TileCoord { x, y, z: zoom });
        }
    }

    log::debug!(
        "Bounding box covers {} tiles at zoom {} (x {}..={}, y {}..={})",
        tiles.len(),
        zoom,
        min_x,
        max_x,
        min_y,
        max_y
    );
    Ok(tiles)
}
