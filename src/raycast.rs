/// Ray-cast sample interface consumed by the shading pipeline.
///
/// The ray caster is an external collaborator: it walks the voxel model
/// and produces, for every output pixel, the list of samples whose rays
/// passed through that pixel. This module defines the shape of that data
/// plus the per-sample projections used by the debug channels.

use crate::colour::{grey, Rgb};

/// One ray sample: whether the ray hit, what it hit, and how much that
/// hit should count at this pixel.
#[derive(Clone, Copy, Debug)]
pub struct RaySample {
    /// Ray intersected a voxel.
    pub collision: bool,
    /// Palette index of the voxel hit (0 when no collision).
    pub index: u8,
    /// Integer depth of the hit along the ray.
    pub depth: i32,
    /// Contribution weight of this sample at the pixel.
    pub influence: f64,
    /// Number of coincident rays this sample stands for.
    pub count: i32,
    /// Voxel was reconstructed by hole recovery rather than sampled
    /// directly; such samples can be suppressed via the manifest.
    pub is_recovered: bool,
    /// 0..=1 estimate of how much fine detail the voxel represents.
    pub detail: f64,
    /// Surface normal at the hit, each component in -1..=1.
    pub normal: [f64; 3],
    /// Neighbourhood-averaged surface normal.
    pub averaged_normal: [f64; 3],
    /// 0..=1 ambient occlusion term.
    pub occlusion: f64,
    /// -1..=1 directional light term; negative values darken.
    pub lighting: f64,
    /// 0..=1 shadow coverage.
    pub shadowing: f64,
}

impl Default for RaySample {
    fn default() -> Self {
        Self {
            collision: false,
            index: 0,
            depth: 0,
            influence: 1.0,
            count: 1,
            is_recovered: false,
            detail: 0.0,
            normal: [0.0; 3],
            averaged_normal: [0.0; 3],
            occlusion: 0.0,
            lighting: 0.0,
            shadowing: 0.0,
        }
    }
}

/// Samples collected for one output pixel.
pub type RenderInfo = Vec<RaySample>;

/// Full per-pixel sample grid, indexed `[x][y]`.
pub type RenderOutput = Vec<Vec<RenderInfo>>;

#[inline]
fn normal_to_rgb(n: [f64; 3]) -> Rgb {
    // Map each -1..=1 component onto the colour range
    Rgb::new(
        (n[0] + 1.0) * 0.5 * crate::colour::COMPONENT_MAX,
        (n[1] + 1.0) * 0.5 * crate::colour::COMPONENT_MAX,
        (n[2] + 1.0) * 0.5 * crate::colour::COMPONENT_MAX,
    )
}

impl RaySample {
    #[inline]
    pub fn normal_rgb(&self) -> Rgb {
        normal_to_rgb(self.normal)
    }

    #[inline]
    pub fn averaged_normal_rgb(&self) -> Rgb {
        normal_to_rgb(self.averaged_normal)
    }

    /// Depth as a grey ramp; depths beyond 255 saturate to white.
    #[inline]
    pub fn depth_rgb(&self) -> Rgb {
        grey(self.depth.max(0) as f64 / 255.0)
    }

    #[inline]
    pub fn occlusion_rgb(&self) -> Rgb {
        grey(self.occlusion)
    }

    /// Lighting remapped from -1..=1 onto the grey ramp.
    #[inline]
    pub fn lighting_rgb(&self) -> Rgb {
        grey((self.lighting + 1.0) * 0.5)
    }

    #[inline]
    pub fn shadow_rgb(&self) -> Rgb {
        grey(self.shadowing)
    }

    #[inline]
    pub fn detail_rgb(&self) -> Rgb {
        grey(self.detail)
    }
}
