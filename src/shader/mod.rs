/// Shading and palettization pipeline.
///
/// One call to [`shade`] takes a sprite's worth of ray samples through
/// the full pipeline: per-pixel aggregation, region segmentation, a
/// first dithering pass to gather region statistics, a per-region
/// contrast stretch, and a second, final dithering pass. The result is a
/// grid of [`ShaderInfo`] carrying the final palette index, the mask
/// inputs, and the debug channels.
///
/// The pipeline is deterministic and strictly serial within one sprite:
/// the error rows carry a column-serial dependency and the anti-banding
/// rule reads the left neighbour's modal index. Sprites are isolated
/// from each other, which is what [`shade_batch`] exploits.

mod aggregate;
mod dither;
mod regions;

#[cfg(test)]
mod tests;

use std::mem;

use rayon::prelude::*;

use crate::colour::Rgb;
use crate::manifest::{Definition, Sprite};
use crate::raycast::RenderOutput;

/// Everything the pipeline knows about one output pixel.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ShaderInfo {
    /// Accumulated colour under the regular colouring rule, pre-dither.
    pub colour: Rgb,
    /// Accumulated colour under the special colouring rule, pre-dither.
    pub special_colour: Rgb,
    /// 0..=1 coverage.
    pub alpha: f64,
    /// 0..=1 weight of samples that hit special palette ranges.
    pub specialness: f64,
    pub normal: Rgb,
    pub averaged_normal: Rgb,
    pub depth: Rgb,
    pub occlusion: Rgb,
    pub lighting: Rgb,
    pub shadowing: Rgb,
    pub detail: Rgb,
    pub transparency: Rgb,
    /// Region id, 0 when unassigned.
    pub region: u32,
    /// Winner of the weighted per-pixel palette vote.
    pub modal_index: u8,
    /// Index chosen by the ditherer; final after the second pass.
    pub dithered_index: u8,
    /// Dithering landed this pixel on a special colour.
    pub is_mask_colour: bool,
    /// Pixel is an animated light and keeps its modal index.
    pub is_animated: bool,
}

impl ShaderInfo {
    /// Mask-plane palette index for this pixel.
    ///
    /// Strongly special or animated pixels emit their modal index;
    /// moderately special pixels that dithered onto a special colour
    /// emit that; everything else emits 0.
    #[inline]
    pub fn mask_index(&self) -> u8 {
        if self.specialness > 0.75 || self.is_animated {
            self.modal_index
        } else if self.specialness > 0.25 && self.is_mask_colour {
            self.dithered_index
        } else {
            0
        }
    }

    /// Region id encoded base-4 across the three colour channels, for
    /// debug rendering.
    #[inline]
    pub fn region_rgb(&self) -> Rgb {
        Rgb::new(
            (self.region % 4) as f64 * 16384.0,
            ((self.region / 4) % 4) as f64 * 16384.0,
            ((self.region / 16) % 4) as f64 * 16384.0,
        )
    }
}

/// Shaded pixel grid for one sprite.
#[derive(Clone, Debug)]
pub struct ShaderOutput {
    width: usize,
    height: usize,
    cells: Vec<ShaderInfo>,
}

impl ShaderOutput {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![ShaderInfo::default(); width * height],
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn at(&self, x: usize, y: usize) -> &ShaderInfo {
        &self.cells[x * self.height + y]
    }

    #[inline]
    pub fn at_mut(&mut self, x: usize, y: usize) -> &mut ShaderInfo {
        &mut self.cells[x * self.height + y]
    }

    /// All cells in column-major order.
    pub fn cells(&self) -> &[ShaderInfo] {
        &self.cells
    }
}

/// Run the full shading pipeline for one sprite.
pub fn shade(
    render_output: &RenderOutput,
    sprite: &Sprite,
    definition: &Definition,
    width: usize,
    height: usize,
) -> ShaderOutput {
    shade_with_diagnostics(render_output, sprite, definition, width, height, None)
}

/// [`shade`] with a diagnostic sink receiving per-region statistics
/// lines. `None` emits nothing.
pub fn shade_with_diagnostics(
    render_output: &RenderOutput,
    sprite: &Sprite,
    def: &Definition,
    width: usize,
    height: usize,
    mut diag: Option<&mut dyn FnMut(&str)>,
) -> ShaderOutput {
    let mut output = ShaderOutput::new(width, height);

    let x_offset = (sprite.offset_x * def.scale) as i64;
    let y_offset = (sprite.offset_y * def.scale) as i64;

    for x in 0..width {
        for y in 0..height {
            let rx = x as i64 + x_offset;
            let ry = y as i64 + y_offset;
            if rx < 0 || rx >= width as i64 || ry < 0 || ry >= height as i64 {
                continue;
            }

            // Ray coordinates outside the sample grid leave the cell zeroed
            let samples = match render_output
                .get(rx as usize)
                .and_then(|column| column.get(ry as usize))
            {
                Some(samples) => samples,
                None => continue,
            };

            let prev_index = if x > 1 {
                output.at(x - 1, y).modal_index
            } else {
                0
            };

            *output.at_mut(x, y) = aggregate::shade_pixel(samples, def, prev_index);
        }
    }

    let mut regions = regions::assign_regions(&mut output, &def.palette);

    let subsets = dither::PaletteSubsets::new(&def.palette);
    let mut err_curr = vec![Rgb::default(); height + 2];
    let mut err_next = vec![Rgb::default(); height + 2];

    // First dithering pass: find the index span each region actually uses
    for x in 0..width {
        for y in 0..height {
            let best =
                dither::dither_pixel(&mut output, x, y, def, &subsets, &mut err_curr, &mut err_next);

            let region = output.at(x, y).region;
            if region != 0 {
                if let Some(info) = regions.get_mut(&region) {
                    let cell = *output.at(x, y);
                    info.record(best, &cell, &def.palette);
                }
            }
        }

        mem::swap(&mut err_curr, &mut err_next);
    }

    for (id, region) in regions.iter_mut() {
        region.compute_distance(&def.palette);

        if region.size > 1 {
            if let Some(sink) = diag.as_mut() {
                let range = region
                    .range
                    .map(|r| def.palette.range(r))
                    .unwrap_or_default();
                let min_colour = def.palette.colour(region.min_index);
                let max_colour = def.palette.colour(region.max_index);
                sink(&format!(
                    "region {}: size {} (in range {}) min {} max {} ({}/{})",
                    id,
                    region.size,
                    region.size_in_range,
                    region.min_index,
                    region.max_index,
                    range.start,
                    range.end
                ));
                sink(&format!(
                    " - avg colour: {:.0} {:.0} {:.0}",
                    region.average_colour.r, region.average_colour.g, region.average_colour.b
                ));
                sink(&format!(
                    " - min colour: {:.0} {:.0} {:.0}",
                    min_colour.r, min_colour.g, min_colour.b
                ));
                sink(&format!(
                    " - max colour: {:.0} {:.0} {:.0}",
                    max_colour.r, max_colour.g, max_colour.b
                ));
                sink(&format!(
                    " - distance: low {:.3} high {:.3}",
                    region.distance.low, region.distance.high
                ));
            }
        }
    }

    // Second dithering pass over stretched colours; its indices are final
    for e in err_curr.iter_mut() {
        *e = Rgb::default();
    }
    for e in err_next.iter_mut() {
        *e = Rgb::default();
    }

    for x in 0..width {
        for y in 0..height {
            let region = output.at(x, y).region;
            if let Some(info) = regions.get(&region) {
                if info.size > 1 {
                    let cell = output.at_mut(x, y);
                    if def.palette.is_special_colour(cell.modal_index) {
                        cell.special_colour = info
                            .distance
                            .multiply_colours(info.average_colour, cell.special_colour);
                    } else {
                        cell.colour = info
                            .distance
                            .multiply_colours(info.average_colour, cell.colour);
                    }
                }
            }

            dither::dither_pixel(&mut output, x, y, def, &subsets, &mut err_curr, &mut err_next);
        }

        mem::swap(&mut err_curr, &mut err_next);
    }

    output
}

/// One sprite's inputs for [`shade_batch`].
pub struct ShadeJob<'a> {
    pub render_output: &'a RenderOutput,
    pub sprite: Sprite,
    pub definition: &'a Definition,
    pub width: usize,
    pub height: usize,
}

/// Shade many sprites in parallel. Each sprite still runs the strictly
/// serial single-sprite pipeline, so results are identical to calling
/// [`shade`] in a loop; only the loop runs on the rayon pool.
pub fn shade_batch(jobs: &[ShadeJob<'_>]) -> Vec<ShaderOutput> {
    jobs.par_iter()
        .map(|job| {
            shade(
                job.render_output,
                &job.sprite,
                job.definition,
                job.width,
                job.height,
            )
        })
        .collect()
}
