use std::sync::atomic::{AtomicUsize, Ordering};

use terramesh::core::MAX_VALID_ELEVATION;
use terramesh::{
    BoundingBox, FilterMethod, MeshResolution, RasterCanvas, RasterStyle, RenderConfig,
    TerrainError, TerrainPipeline, TerrainResult, TileCoord, TileSource,
};

const TILE_PX: u32 = 32;

/// Encode an elevation in meters as a Terrain-RGB pixel
fn encode_elevation(meters: f64) -> [u8; 4] {
    let value = ((meters + 10000.0) * 10.0).round() as u32;
    [
        (value >> 16) as u8,
        ((value >> 8) & 0xFF) as u8,
        (value & 0xFF) as u8,
        255,
    ]
}

/// Tile source producing a smooth west-to-east elevation ramp, with an
/// optional always-failing tile
struct SyntheticSource {
    fail: Option<(u32, u32)>,
    fetch_calls: AtomicUsize,
}

impl SyntheticSource {
    fn new() -> Self {
        Self {
            fail: None,
            fetch_calls: AtomicUsize::new(0),
        }
    }

    fn failing_at(x: u32, y: u32) -> Self {
        Self {
            fail: Some((x, y)),
            fetch_calls: AtomicUsize::new(0),
        }
    }
}

impl TileSource for SyntheticSource {
    fn fetch_tile(&self, tile: &TileCoord, style: RasterStyle) -> TerrainResult<RasterCanvas> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail == Some((tile.x, tile.y)) {
            return Err(TerrainError::TileFetch("synthetic outage".to_string()));
        }

        let mut canvas = RasterCanvas::new(TILE_PX, TILE_PX);
        for py in 0..TILE_PX {
            for px in 0..TILE_PX {
                let rgba = match style {
                    RasterStyle::TerrainRgb => {
                        // 0.5 m per global pixel column
                        let global_x = (tile.x * TILE_PX + px) as f64;
                        encode_elevation(global_x * 0.5)
                    }
                    _ => [40, 120, 80, 255],
                };
                canvas.put_pixel(px, py, rgba);
            }
        }
        Ok(canvas)
    }

    fn tile_size(&self) -> u32 {
        TILE_PX
    }
}

fn test_bbox() -> BoundingBox {
    BoundingBox::new(10.0, 46.0, 10.8, 46.6).expect("valid test bbox")
}

fn test_config() -> RenderConfig {
    let mut config = RenderConfig::new(test_bbox());
    config.mesh_resolution = MeshResolution::R128;
    config
}

#[test]
fn test_full_pipeline_produces_model() {
    let _ = env_logger::builder().is_test(true).try_init();

    let source = SyntheticSource::new();
    let pipeline = TerrainPipeline::new(&source);
    let model = pipeline.generate(&test_config()).expect("pipeline should succeed");

    // Mesh shape follows the configured resolution
    assert_eq!(model.mesh.grid_size, 129);
    let vertex_count = (model.mesh.grid_size as usize).pow(2);
    assert_eq!(model.mesh.positions.len(), vertex_count * 3);
    assert_eq!(model.mesh.normals.len(), vertex_count * 3);

    // The ramp gives a real elevation range
    assert!(model.elevation_min < model.elevation_max);
    assert!(model.elevation_min >= 0.0);

    // Imagery was stitched and cropped to something non-empty
    assert!(model.imagery.width > 0 && model.imagery.height > 0);

    // Zoom and tile budget invariants
    assert!((8..=15).contains(&model.zoom));
    assert!(model.tile_count >= 1 && model.tile_count <= 16);

    // Two stitch passes (imagery + elevation), one fetch per tile each
    assert_eq!(
        source.fetch_calls.load(Ordering::SeqCst),
        model.tile_count * 2
    );
}

#[test]
fn test_invalid_bbox_fails_before_any_fetch() {
    let source = SyntheticSource::new();
    let pipeline = TerrainPipeline::new(&source);

    let mut config = test_config();
    config.bbox.max_lat = config.bbox.min_lat; // degenerate

    let result = pipeline.generate(&config);
    assert!(matches!(result, Err(TerrainError::InvalidInput(_))));
    assert_eq!(source.fetch_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_partial_tile_failure_still_generates() {
    let _ = env_logger::builder().is_test(true).try_init();

    // Find a tile inside the request so one cell degrades to placeholder
    let probe = SyntheticSource::new();
    let reference = TerrainPipeline::new(&probe)
        .generate(&test_config())
        .expect("reference run");
    assert!(reference.tile_count > 1, "test bbox should span several tiles");

    let zoom = reference.zoom;
    let tiles = terramesh::core::tiles_for_bounding_box(&test_bbox(), zoom).unwrap();
    let victim = tiles[0];

    let source = SyntheticSource::failing_at(victim.x, victim.y);
    let model = TerrainPipeline::new(&source)
        .generate(&test_config())
        .expect("partial mosaic should still generate");

    // Placeholder gray decodes above the cap and is clamped to it
    assert!(model.elevation_max <= MAX_VALID_ELEVATION);
    assert_eq!(model.mesh.grid_size, 129);
}

#[test]
fn test_capping_filter_limits_placeholder_spike() {
    // With a failed elevation tile the placeholder region decodes to the
    // absolute cap; the capping strategy pulls it down to 3500 m
    let probe = SyntheticSource::new();
    let reference = TerrainPipeline::new(&probe)
        .generate(&test_config())
        .expect("reference run");
    let tiles = terramesh::core::tiles_for_bounding_box(&test_bbox(), reference.zoom).unwrap();
    let victim = tiles[tiles.len() / 2];

    let source = SyntheticSource::failing_at(victim.x, victim.y);
    let mut config = test_config();
    config.filter_method = FilterMethod::Capping;
    let model = TerrainPipeline::new(&source)
        .generate(&config)
        .expect("pipeline should succeed");

    assert!(model.elevation_max <= 3500.0);
}

#[test]
fn test_filter_choice_is_noop_on_smooth_terrain() {
    // The synthetic ramp has no spikes; Hampel and None agree
    let source = SyntheticSource::new();
    let pipeline = TerrainPipeline::new(&source);

    let mut none_config = test_config();
    none_config.filter_method = FilterMethod::None;
    let none_model = pipeline.generate(&none_config).unwrap();

    let mut hampel_config = test_config();
    hampel_config.filter_method = FilterMethod::Hampel;
    let hampel_model = pipeline.generate(&hampel_config).unwrap();

    assert_eq!(none_model.mesh.positions.len(), hampel_model.mesh.positions.len());
    for (a, b) in none_model
        .mesh
        .positions
        .iter()
        .zip(hampel_model.mesh.positions.iter())
    {
        assert!((a - b).abs() < 1e-4, "smooth terrain must not be altered");
    }
}

#[test]
fn test_real_scale_flattens_relative_to_normalized() {
    // The ramp spans ~100 m over tens of kilometers; real scale must be far
    // flatter than the normalized 25%-of-plane-width convention
    let source = SyntheticSource::new();
    let pipeline = TerrainPipeline::new(&source);

    let normalized = pipeline.generate(&test_config()).unwrap();

    let mut real_config = test_config();
    real_config.use_real_scale = true;
    let real = pipeline.generate(&real_config).unwrap();

    let normalized_relief = normalized.mesh.bounds_max[2] - normalized.mesh.bounds_min[2];
    let real_relief = real.mesh.bounds_max[2] - real.mesh.bounds_min[2];
    assert!(real_relief < normalized_relief / 10.0);
}
