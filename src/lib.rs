//! Terramesh: A Fast, Modular Terrain-RGB Tile to 3D Terrain Mesh Pipeline
//!
//! This library turns a geographic bounding box into a displaced 3D terrain
//! mesh textured with satellite or street imagery. Elevation comes from
//! Terrain-RGB raster tiles: the pipeline selects a zoom level under a tile
//! budget, stitches the covering tiles into one seamless raster, crops it to
//! the bbox, decodes the RGB elevation encoding, removes spike artifacts,
//! and displaces a vertex grid with either normalized-for-visibility or
//! true-to-life metric vertical scaling.

pub mod core;
pub mod io;
pub mod types;

// Re-export main types and functions for easier access
pub use types::{
    BoundingBox, FilterMethod, HeightField, MeshResolution, RasterCanvas, RasterStyle,
    RenderConfig, TerrainError, TerrainResult, TileCoord, TILE_SIZE,
};

pub use crate::core::{TerrainMesh, TerrainModel, TerrainPipeline};
pub use crate::io::{HttpTileSource, TileSource};
