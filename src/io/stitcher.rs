//! Tile stitching: composite a tile set onto one canvas and crop it to the
//! requested bounding box with sub-tile precision.
//!
//! Individual tile failures degrade to a flat placeholder fill; a partial
//! mosaic is usually still useful. Only a mosaic with no successfully
//! fetched pixels at all is an error.

use crate::core::tile_math::tile_to_bounding_box;
use crate::io::tile_service::TileSource;
use crate::types::{
    BoundingBox, RasterCanvas, RasterStyle, TerrainError, TerrainResult, TileCoord,
};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Fill color for tile cells whose fetch failed: opaque mid-gray.
pub const PLACEHOLDER_RGBA: [u8; 4] = [128, 128, 128, 255];

/// Fetch every tile of one style and composite them; per-tile failures are
/// logged and substituted
fn fetch_all<S: TileSource + ?Sized>(
    source: &S,
    tiles: &[TileCoord],
    style: RasterStyle,
) -> Vec<(TileCoord, TerrainResult<RasterCanvas>)> {
    #[cfg(feature = "parallel")]
    {
        tiles
            .par_iter()
            .map(|tile| (*tile, source.fetch_tile(tile, style)))
            .collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        tiles
            .iter()
            .map(|tile| (*tile, source.fetch_tile(tile, style)))
            .collect()
    }
}

/// Stitch a tile set into one continuous raster cropped exactly to `bbox`.
///
/// The composite spans the full rectangle of fetched tiles; its geographic
/// bounds come from the union of the tiles' own bounding boxes, since tile
/// edges rarely align with the requested bbox. The crop maps degrees to
/// pixels linearly, with the vertical axis inverted (raster y grows
/// downward, latitude upward); row 0 of the result is the northern edge.
pub fn stitch<S: TileSource + ?Sized>(
    source: &S,
    tiles: &[TileCoord],
    bbox: &BoundingBox,
    style: RasterStyle,
) -> TerrainResult<RasterCanvas> {
    if tiles.is_empty() {
        return Err(TerrainError::InvalidInput(
            "Cannot stitch an empty tile list".to_string(),
        ));
    }
    bbox.validate()?;

    let tile_size = source.tile_size();
    let min_x = tiles.iter().map(|t| t.x).min().unwrap_or(0);
    let max_x = tiles.iter().map(|t| t.x).max().unwrap_or(0);
    let min_y = tiles.iter().map(|t| t.y).min().unwrap_or(0);
    let max_y = tiles.iter().map(|t| t.y).max().unwrap_or(0);

    let grid_w = max_x - min_x + 1;
    let grid_h = max_y - min_y + 1;
    let composite_w = grid_w * tile_size;
    let composite_h = grid_h * tile_size;

    log::info!(
        "Stitching {} {} tiles into a {}x{} composite",
        tiles.len(),
        style,
        composite_w,
        composite_h
    );

    let mut composite = RasterCanvas::new(composite_w, composite_h);
    let mut fetched = 0usize;
    let mut failed = 0usize;

    for (tile, result) in fetch_all(source, tiles, style) {
        let offset_x = (tile.x - min_x) * tile_size;
        let offset_y = (tile.y - min_y) * tile_size;
        match result {
            Ok(canvas) => {
                composite.blit(&canvas, offset_x, offset_y);
                fetched += 1;
            }
            Err(e) => {
                log::warn!(
                    "Tile {}/{}/{} failed ({}), filling placeholder",
                    tile.z,
                    tile.x,
                    tile.y,
                    e
                );
                composite.fill_rect(offset_x, offset_y, tile_size, tile_size, PLACEHOLDER_RGBA);
                failed += 1;
            }
        }
    }

    if fetched == 0 {
        return Err(TerrainError::TileFetch(format!(
            "All {} tiles failed to fetch; no mosaic data",
            failed
        )));
    }
    if failed > 0 {
        log::warn!("Mosaic is partial: {} of {} tiles failed", failed, tiles.len());
    }

    // True geographic extent of the composite, from the tiles themselves
    let mut composite_bbox = tile_to_bounding_box(&tiles[0]);
    for tile in &tiles[1..] {
        let b = tile_to_bounding_box(tile);
        composite_bbox.min_lon = composite_bbox.min_lon.min(b.min_lon);
        composite_bbox.min_lat = composite_bbox.min_lat.min(b.min_lat);
        composite_bbox.max_lon = composite_bbox.max_lon.max(b.max_lon);
        composite_bbox.max_lat = composite_bbox.max_lat.max(b.max_lat);
    }

    crop_to_bbox(&composite, &composite_bbox, bbox)
}

/// Crop a composite to the requested bbox using a linear degree-to-pixel
/// mapping over the composite's bounds
fn crop_to_bbox(
    composite: &RasterCanvas,
    composite_bbox: &BoundingBox,
    bbox: &BoundingBox,
) -> TerrainResult<RasterCanvas> {
    let lon_range = composite_bbox.lon_range();
    let lat_range = composite_bbox.lat_range();
    if lon_range <= 0.0 || lat_range <= 0.0 {
        return Err(TerrainError::Processing(
            "Composite has a degenerate geographic extent".to_string(),
        ));
    }

    let w = composite.width as f64;
    let h = composite.height as f64;

    let x0 = ((bbox.min_lon - composite_bbox.min_lon) / lon_range * w).floor();
    let x1 = ((bbox.max_lon - composite_bbox.min_lon) / lon_range * w).ceil();
    // Latitude grows upward, raster y downward
    let y0 = ((composite_bbox.max_lat - bbox.max_lat) / lat_range * h).floor();
    let y1 = ((composite_bbox.max_lat - bbox.min_lat) / lat_range * h).ceil();

    let x0 = (x0.max(0.0) as u32).min(composite.width - 1);
    let y0 = (y0.max(0.0) as u32).min(composite.height - 1);
    let x1 = (x1.max(0.0) as u32).clamp(x0 + 1, composite.width);
    let y1 = (y1.max(0.0) as u32).clamp(y0 + 1, composite.height);

    log::debug!(
        "Cropping composite to {}x{} at +{}+{}",
        x1 - x0,
        y1 - y0,
        x0,
        y0
    );
    composite.crop(x0, y0, x1 - x0, y1 - y0)
}
