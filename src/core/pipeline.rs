//! End-to-end request pipeline: bbox in, displaced mesh plus imagery out.
//!
//! One invocation owns every intermediate raster and height field; nothing
//! is shared or cached across requests, and a new request simply runs a
//! fresh pipeline.

use crate::core::decode::decode_height_field;
use crate::core::displace::{displace, TerrainMesh};
use crate::core::outlier_filter::OutlierFilter;
use crate::core::tile_math::{calculate_zoom_level, tiles_for_bounding_box, DEFAULT_MAX_TILES};
use crate::io::stitcher::stitch;
use crate::io::tile_service::TileSource;
use crate::types::{RasterCanvas, RasterStyle, RenderConfig, TerrainResult};

/// Everything an external renderer needs for one terrain request
#[derive(Debug, Clone)]
pub struct TerrainModel {
    /// Displaced vertex grid with normals, bounds and elevation range
    pub mesh: TerrainMesh,
    /// Imagery raster cropped to the request bbox, for texturing
    pub imagery: RasterCanvas,
    /// Elevation range of the cleaned height field, in meters
    pub elevation_min: f32,
    pub elevation_max: f32,
    /// Zoom the tiles were fetched at
    pub zoom: u32,
    /// Number of tiles fetched per raster style
    pub tile_count: usize,
}

/// Terrain generation pipeline over a tile source
pub struct TerrainPipeline<'a, S: TileSource + ?Sized> {
    source: &'a S,
    max_tiles: u32,
}

impl<'a, S: TileSource + ?Sized> TerrainPipeline<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            max_tiles: DEFAULT_MAX_TILES,
        }
    }

    /// Override the per-style tile budget
    pub fn with_max_tiles(source: &'a S, max_tiles: u32) -> Self {
        Self { source, max_tiles }
    }

    /// Run the full pipeline for one request.
    ///
    /// Invalid input fails synchronously before any tile work; per-tile
    /// fetch failures degrade to placeholder regions inside the stitch.
    pub fn generate(&self, config: &RenderConfig) -> TerrainResult<TerrainModel> {
        config.validate()?;
        let bbox = &config.bbox;

        log::info!(
            "Generating terrain for bbox [{:.4}, {:.4}, {:.4}, {:.4}]",
            bbox.min_lon,
            bbox.min_lat,
            bbox.max_lon,
            bbox.max_lat
        );

        // Step 1: zoom selection and tile enumeration
        let zoom = calculate_zoom_level(bbox, self.max_tiles);
        let tiles = tiles_for_bounding_box(bbox, zoom)?;
        log::info!("Step 1: zoom {} selected, {} tiles", zoom, tiles.len());

        // Step 2: stitch the imagery raster for texturing
        log::info!("Step 2: stitching {} imagery", config.texture_style);
        let imagery = stitch(self.source, &tiles, bbox, config.texture_style)?;

        // Step 3: stitch the Terrain-RGB elevation raster
        log::info!("Step 3: stitching elevation raster");
        let elevation_raster = stitch(self.source, &tiles, bbox, RasterStyle::TerrainRgb)?;

        // Step 4: decode the elevation encoding
        log::info!("Step 4: decoding height field");
        let raw_field = decode_height_field(&elevation_raster)?;

        // Step 5: artifact filtering
        log::info!("Step 5: applying {} filter", config.filter_method);
        let cleaned = OutlierFilter::new().apply(&raw_field, config.filter_method)?;

        // Step 6: mesh displacement
        log::info!("Step 6: displacing mesh");
        let mesh = displace(&cleaned, config)?;

        log::info!(
            "Terrain generation complete: {} vertices, elevation {:.1}..{:.1} m",
            (mesh.grid_size as usize).pow(2),
            mesh.elevation_min,
            mesh.elevation_max
        );

        Ok(TerrainModel {
            elevation_min: mesh.elevation_min,
            elevation_max: mesh.elevation_max,
            mesh,
            imagery,
            zoom,
            tile_count: tiles.len(),
        })
    }
}
