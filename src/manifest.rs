/// Render definition and manifest tunables.
///
/// A [`Definition`] bundles everything one shading run needs besides the
/// ray samples: the palette, the global scale, the debug switch and the
/// [`Manifest`] of aggregation/dithering tunables. All fields deserialize
/// from JSON with usable defaults so a document only has to state what it
/// overrides.

use serde::Deserialize;

use crate::palette::Palette;

/// Aggregation and dithering tunables for one render job.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct Manifest {
    /// Influence divisor applied to samples that are not at the closest
    /// collision depth of their pixel. Clamped to at least 1 in use.
    pub accuracy: i32,
    /// Alpha below which a dithered pixel is emitted as transparent.
    pub edge_threshold: f64,
    /// 0..=1 fraction of filled samples a pixel needs to be kept at all.
    pub hard_edge_threshold: f64,
    /// 0..=1 influence reduction for hole-recovered voxels.
    pub recovered_voxel_suppression: f64,
    /// Multiplier for the per-sample detail term; 0 disables the boost.
    pub detail_boost: f64,
    /// Average over all influence instead of filled influence, darkening
    /// partially-covered pixels toward black.
    pub fade_to_black: bool,
    /// Fade partially-covered pixels to transparent instead of keeping
    /// hard edges.
    pub soften_edges: bool,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            accuracy: 2,
            edge_threshold: 0.5,
            hard_edge_threshold: 0.0,
            recovered_voxel_suppression: 0.0,
            detail_boost: 0.0,
            fade_to_black: false,
            soften_edges: false,
        }
    }
}

/// Everything a shading run is configured by.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Definition {
    pub palette: Palette,
    pub scale: f64,
    pub debug: bool,
    pub manifest: Manifest,
}

impl Definition {
    /// Parse a definition from its JSON document form.
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| format!("definition JSON: {}", e))
    }

    #[inline]
    pub fn soften_edges(&self) -> bool {
        self.manifest.soften_edges
    }
}

/// Placement of one sprite within the render grid, in pre-scale units.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Sprite {
    pub offset_x: f64,
    pub offset_y: f64,
}
