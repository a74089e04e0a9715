//! Core terrain processing modules

pub mod decode;
pub mod displace;
pub mod geodesy;
pub mod outlier_filter;
pub mod pipeline;
pub mod tile_math;

// Re-export main types
pub use decode::{decode_elevation, decode_height_field, elevation_range, MAX_VALID_ELEVATION};
pub use displace::{displace, sample_bilinear, TerrainMesh, FLAT_TERRAIN_SCALE, PLANE_WIDTH};
pub use geodesy::{haversine_distance_m, EARTH_RADIUS_M};
pub use outlier_filter::{OutlierFilter, OutlierFilterParams};
pub use pipeline::{TerrainModel, TerrainPipeline};
pub use tile_math::{
    calculate_zoom_level, point_to_tile, tile_to_bounding_box, tiles_for_bounding_box,
    DEFAULT_MAX_TILES, MAX_ZOOM, MIN_ZOOM,
};
