//! Raster tile fetching.
//!
//! `TileSource` is the seam between the stitcher and the network: the
//! production implementation downloads provider tiles over HTTP and decodes
//! them to RGBA8, while tests substitute synthetic sources.

use crate::types::{RasterCanvas, RasterStyle, TerrainError, TerrainResult, TileCoord, TILE_SIZE};

/// Supplies one raster tile per coordinate and style
pub trait TileSource: Sync {
    /// Fetch and decode a single tile to an RGBA8 canvas of `tile_size()`
    /// square pixels
    fn fetch_tile(&self, tile: &TileCoord, style: RasterStyle) -> TerrainResult<RasterCanvas>;

    /// Edge length of every tile this source returns
    fn tile_size(&self) -> u32 {
        TILE_SIZE
    }
}

/// HTTP tile source for a fixed provider URL scheme with an access token
pub struct HttpTileSource {
    client: reqwest::blocking::Client,
    base_url: String,
    access_token: String,
}

impl HttpTileSource {
    /// Build a source with a timeout-bounded blocking client
    pub fn new(base_url: &str, access_token: &str) -> TerrainResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("terramesh/0.2.0 (Terrain Mesh Pipeline)")
            .build()
            .map_err(|e| TerrainError::TileFetch(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        })
    }

    /// Provider path segment for a raster style
    fn style_path(style: RasterStyle) -> &'static str {
        match style {
            RasterStyle::Satellite => "satellite-v9",
            RasterStyle::Streets => "streets-v12",
            RasterStyle::TerrainRgb => "terrain-rgb",
        }
    }

    fn tile_url(&self, tile: &TileCoord, style: RasterStyle) -> String {
        format!(
            "{}/{}/{}/{}/{}?access_token={}",
            self.base_url,
            Self::style_path(style),
            tile.z,
            tile.x,
            tile.y,
            self.access_token
        )
    }

    /// Decode a downloaded image body (PNG or WebP) into an RGBA8 canvas,
    /// resizing is never needed: providers serve fixed-size square tiles
    fn decode_body(&self, bytes: &[u8]) -> TerrainResult<RasterCanvas> {
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| TerrainError::ImageDecode(format!("Tile image decode failed: {}", e)))?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();

        if width != self.tile_size() || height != self.tile_size() {
            return Err(TerrainError::ImageDecode(format!(
                "Unexpected tile dimensions {}x{} (expected {} square)",
                width,
                height,
                self.tile_size()
            )));
        }

        RasterCanvas::from_rgba(width, height, rgba.into_raw())
    }
}

impl TileSource for HttpTileSource {
    fn fetch_tile(&self, tile: &TileCoord, style: RasterStyle) -> TerrainResult<RasterCanvas> {
        let url = self.tile_url(tile, style);
        log::debug!("Fetching {} tile {}/{}/{}", style, tile.z, tile.x, tile.y);

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| TerrainError::TileFetch(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(TerrainError::TileFetch(format!(
                "HTTP {} for tile {}/{}/{}",
                response.status().as_u16(),
                tile.z,
                tile.x,
                tile.y
            )));
        }

        let body = response
            .bytes()
            .map_err(|e| TerrainError::TileFetch(format!("Failed to read response body: {}", e)))?;

        // A handful of bytes is an error page, not an image
        if body.len() < 64 {
            return Err(TerrainError::TileFetch(format!(
                "Tile body too small ({} bytes), likely an error response",
                body.len()
            )));
        }

        self.decode_body(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_url_layout() {
        let source = HttpTileSource::new("https://tiles.example.com/v4/", "tok123").unwrap();
        let tile = TileCoord { x: 545, y: 362, z: 10 };
        let url = source.tile_url(&tile, RasterStyle::TerrainRgb);
        assert_eq!(
            url,
            "https://tiles.example.com/v4/terrain-rgb/10/545/362?access_token=tok123"
        );
    }

    #[test]
    fn test_style_paths_are_distinct() {
        let paths = [
            HttpTileSource::style_path(RasterStyle::Satellite),
            HttpTileSource::style_path(RasterStyle::Streets),
            HttpTileSource::style_path(RasterStyle::TerrainRgb),
        ];
        let unique: std::collections::HashSet<_> = paths.iter().collect();
        assert_eq!(unique.len(), paths.len());
    }
}
