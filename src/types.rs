use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Dense elevation raster in meters, one value per pixel, row-major.
/// Row 0 is the northern edge; this convention is shared with `RasterCanvas`.
pub type HeightField = Array2<f32>;

/// Fixed square tile edge length in pixels used by the tile provider.
pub const TILE_SIZE: u32 = 256;

/// Geographic bounding box in WGS84 degrees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Create a bounding box, rejecting malformed or degenerate input
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> TerrainResult<Self> {
        let bbox = BoundingBox {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        };
        bbox.validate()?;
        Ok(bbox)
    }

    /// Parse the user-facing "minLon,minLat,maxLon,maxLat" form
    pub fn parse(s: &str) -> TerrainResult<Self> {
        let parts: Vec<&str> = s.split(',').map(|p| p.trim()).collect();
        if parts.len() != 4 {
            return Err(TerrainError::InvalidInput(format!(
                "Expected 4 comma-separated values, got {}: '{}'",
                parts.len(),
                s
            )));
        }

        let mut values = [0.0f64; 4];
        for (i, part) in parts.iter().enumerate() {
            values[i] = part.parse::<f64>().map_err(|_| {
                TerrainError::InvalidInput(format!("'{}' is not a valid coordinate", part))
            })?;
        }

        Self::new(values[0], values[1], values[2], values[3])
    }

    /// Validate coordinate ranges and ordering
    pub fn validate(&self) -> TerrainResult<()> {
        let coords = [self.min_lon, self.min_lat, self.max_lon, self.max_lat];
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(TerrainError::InvalidInput(
                "Bounding box contains non-finite coordinates".to_string(),
            ));
        }
        if self.min_lon < -180.0 || self.max_lon > 180.0 {
            return Err(TerrainError::InvalidInput(format!(
                "Longitude out of range [-180, 180]: [{}, {}]",
                self.min_lon, self.max_lon
            )));
        }
        if self.min_lat < -90.0 || self.max_lat > 90.0 {
            return Err(TerrainError::InvalidInput(format!(
                "Latitude out of range [-90, 90]: [{}, {}]",
                self.min_lat, self.max_lat
            )));
        }
        if self.min_lon >= self.max_lon || self.min_lat >= self.max_lat {
            return Err(TerrainError::InvalidInput(format!(
                "Bounding box min must be strictly below max: lon [{}, {}], lat [{}, {}]",
                self.min_lon, self.max_lon, self.min_lat, self.max_lat
            )));
        }
        Ok(())
    }

    /// Longitude span in degrees
    pub fn lon_range(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// Latitude span in degrees
    pub fn lat_range(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Mean latitude, used as the reference parallel for horizontal distance
    pub fn center_lat(&self) -> f64 {
        (self.min_lat + self.max_lat) / 2.0
    }
}

/// Web-mercator XYZ tile index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

/// Raster style served by the tile provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RasterStyle {
    /// Satellite imagery
    Satellite,
    /// Street map imagery
    Streets,
    /// Terrain-RGB encoded elevation
    TerrainRgb,
}

impl std::fmt::Display for RasterStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RasterStyle::Satellite => write!(f, "satellite"),
            RasterStyle::Streets => write!(f, "streets"),
            RasterStyle::TerrainRgb => write!(f, "terrain-rgb"),
        }
    }
}

/// In-memory RGBA8 pixel buffer, row-major, row 0 = north
#[derive(Debug, Clone)]
pub struct RasterCanvas {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl RasterCanvas {
    /// Create a canvas filled with transparent black
    pub fn new(width: u32, height: u32) -> Self {
        RasterCanvas {
            width,
            height,
            data: vec![0u8; (width as usize) * (height as usize) * 4],
        }
    }

    /// Wrap an existing RGBA8 buffer; length must be width*height*4
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> TerrainResult<Self> {
        let expected = (width as usize) * (height as usize) * 4;
        if data.len() != expected {
            return Err(TerrainError::Processing(format!(
                "RGBA buffer length {} does not match {}x{} raster ({} bytes expected)",
                data.len(),
                width,
                height,
                expected
            )));
        }
        Ok(RasterCanvas {
            width,
            height,
            data,
        })
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        ((y as usize) * (self.width as usize) + (x as usize)) * 4
    }

    /// Read one pixel; coordinates must be in bounds
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.offset(x, y);
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    /// Write one pixel; coordinates must be in bounds
    #[inline]
    pub fn put_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let i = self.offset(x, y);
        self.data[i..i + 4].copy_from_slice(&rgba);
    }

    /// Fill a rectangle with a flat color, clipped to the canvas
    pub fn fill_rect(&mut self, x0: u32, y0: u32, w: u32, h: u32, rgba: [u8; 4]) {
        let x_end = (x0.saturating_add(w)).min(self.width);
        let y_end = (y0.saturating_add(h)).min(self.height);
        for y in y0..y_end {
            for x in x0..x_end {
                self.put_pixel(x, y, rgba);
            }
        }
    }

    /// Copy a source canvas onto this one with its top-left corner at (x0, y0),
    /// clipped to this canvas
    pub fn blit(&mut self, src: &RasterCanvas, x0: u32, y0: u32) {
        let w = src.width.min(self.width.saturating_sub(x0));
        let h = src.height.min(self.height.saturating_sub(y0));
        for y in 0..h {
            let src_start = src.offset(0, y);
            let dst_start = self.offset(x0, y0 + y);
            let row_bytes = (w as usize) * 4;
            self.data[dst_start..dst_start + row_bytes]
                .copy_from_slice(&src.data[src_start..src_start + row_bytes]);
        }
    }

    /// Extract a sub-rectangle as a new canvas; the region must lie inside
    pub fn crop(&self, x0: u32, y0: u32, w: u32, h: u32) -> TerrainResult<RasterCanvas> {
        if w == 0 || h == 0 || x0 + w > self.width || y0 + h > self.height {
            return Err(TerrainError::Processing(format!(
                "Crop region {}x{}+{}+{} outside {}x{} canvas",
                w, h, x0, y0, self.width, self.height
            )));
        }
        let mut out = RasterCanvas::new(w, h);
        for y in 0..h {
            let src_start = self.offset(x0, y0 + y);
            let dst_start = out.offset(0, y);
            let row_bytes = (w as usize) * 4;
            out.data[dst_start..dst_start + row_bytes]
                .copy_from_slice(&self.data[src_start..src_start + row_bytes]);
        }
        Ok(out)
    }
}

/// Artifact filter strategy applied to the decoded height field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMethod {
    /// Identity; keep the raw (already capped) decode output
    None,
    /// Clamp every value to a global ceiling
    Capping,
    /// Robust median/MAD spike replacement. Accepts the legacy external
    /// label "median" for compatibility.
    #[serde(alias = "median")]
    Hampel,
}

impl FilterMethod {
    /// Parse the external configuration label. The legacy value "median"
    /// selects the Hampel strategy; that mapping is kept for compatibility.
    pub fn parse(label: &str) -> TerrainResult<Self> {
        match label.to_lowercase().as_str() {
            "none" => Ok(FilterMethod::None),
            "capping" => Ok(FilterMethod::Capping),
            "median" | "hampel" => Ok(FilterMethod::Hampel),
            other => Err(TerrainError::InvalidInput(format!(
                "Unknown filter method: '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for FilterMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterMethod::None => write!(f, "none"),
            FilterMethod::Capping => write!(f, "capping"),
            FilterMethod::Hampel => write!(f, "hampel"),
        }
    }
}

/// Vertex grid density of the displaced mesh; configured externally as the
/// numeric segment count (128, 256, 512 or 1024)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
pub enum MeshResolution {
    R128,
    R256,
    R512,
    R1024,
}

impl From<MeshResolution> for u32 {
    fn from(r: MeshResolution) -> u32 {
        r.segments()
    }
}

impl TryFrom<u32> for MeshResolution {
    type Error = String;

    fn try_from(segments: u32) -> Result<Self, Self::Error> {
        MeshResolution::from_segments(segments).map_err(|e| e.to_string())
    }
}

impl MeshResolution {
    /// Segment count per plane axis; the grid has (segments + 1)^2 vertices
    pub fn segments(&self) -> u32 {
        match self {
            MeshResolution::R128 => 128,
            MeshResolution::R256 => 256,
            MeshResolution::R512 => 512,
            MeshResolution::R1024 => 1024,
        }
    }

    /// Map the external numeric setting to a resolution
    pub fn from_segments(segments: u32) -> TerrainResult<Self> {
        match segments {
            128 => Ok(MeshResolution::R128),
            256 => Ok(MeshResolution::R256),
            512 => Ok(MeshResolution::R512),
            1024 => Ok(MeshResolution::R1024),
            other => Err(TerrainError::InvalidInput(format!(
                "Unsupported mesh resolution: {} (expected 128, 256, 512 or 1024)",
                other
            ))),
        }
    }
}

/// Immutable per-request configuration driving filtering and displacement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub bbox: BoundingBox,
    pub filter_method: FilterMethod,
    pub mesh_resolution: MeshResolution,
    pub height_exaggeration: f64,
    pub use_real_scale: bool,
    pub texture_style: RasterStyle,
}

impl RenderConfig {
    /// Configuration with the default pipeline settings for a bounding box
    pub fn new(bbox: BoundingBox) -> Self {
        RenderConfig {
            bbox,
            filter_method: FilterMethod::Hampel,
            mesh_resolution: MeshResolution::R256,
            height_exaggeration: 1.0,
            use_real_scale: false,
            texture_style: RasterStyle::Satellite,
        }
    }

    pub fn validate(&self) -> TerrainResult<()> {
        self.bbox.validate()?;
        if !self.height_exaggeration.is_finite() || self.height_exaggeration <= 0.0 {
            return Err(TerrainError::InvalidInput(format!(
                "Height exaggeration must be a positive finite number, got {}",
                self.height_exaggeration
            )));
        }
        Ok(())
    }
}

/// Error types for terrain processing
#[derive(Debug, thiserror::Error)]
pub enum TerrainError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Tile fetch failed: {0}")]
    TileFetch(String),

    #[error("Image decode error: {0}")]
    ImageDecode(String),

    #[error("Processing error: {0}")]
    Processing(String),
}

/// Result type for terrain operations
pub type TerrainResult<T> = Result<T, TerrainError>;
