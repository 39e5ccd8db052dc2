//! Shading and palettization pipeline for voxel-rendered sprites.
//!
//! Takes a grid of per-pixel multi-sample ray hits and produces a grid
//! of final palette indices plus mask indices, suitable for tile-based
//! 2D game graphics with palette animation and team recolouring.
//!
//! # Module Structure
//! - `colour`: RGB value type in 16-bit linear space
//! - `palette`: palette table, range metadata, subset views, colouring rules
//! - `manifest`: render definition and manifest tunables
//! - `raycast`: ray-sample interface consumed from the ray caster
//! - `shader`: the pipeline itself (aggregation, regions, dithering)

pub mod colour;
pub mod manifest;
pub mod palette;
pub mod raycast;
pub mod shader;

// Re-export the working set at the crate root
pub use colour::Rgb;
pub use manifest::{Definition, Manifest, Sprite};
pub use palette::{Palette, PaletteEntry, PaletteRange, RangeId};
pub use raycast::{RaySample, RenderInfo, RenderOutput};
pub use shader::{shade, shade_batch, shade_with_diagnostics, ShadeJob, ShaderInfo, ShaderOutput};
