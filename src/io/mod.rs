//! Tile fetching and stitching

pub mod stitcher;
pub mod tile_service;

// Re-export main types
pub use stitcher::{stitch, PLACEHOLDER_RGBA};
pub use tile_service::{HttpTileSource, TileSource};
