/// Region segmentation and per-region contrast stretching.
///
/// A region is a 4-connected set of pixels whose modal indices belong to
/// the same palette range by id. After the first dithering pass each
/// region knows the span of indices it actually used; the stretch then
/// rewrites pixel colours away from the region average so the second
/// pass can reach up to three indices beyond that span, inside the
/// range.

use std::collections::BTreeMap;

use crate::colour::Rgb;
use crate::palette::{Palette, RangeId};

use super::{ShaderInfo, ShaderOutput};

/// Contrast stretch factors for one region, derived from how far the
/// expanded index span sits from the used span, relative to the region
/// average.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct ColourDistance {
    pub low: f64,
    pub high: f64,
}

impl ColourDistance {
    /// Pull `c` toward `midpoint` by `low` when it sits below the
    /// midpoint, push it past by `high` otherwise.
    pub(crate) fn multiply_colours(&self, midpoint: Rgb, c: Rgb) -> Rgb {
        if c.component_sum() < midpoint.component_sum() {
            Rgb::new(
                midpoint.r - (midpoint.r - c.r) * self.low,
                midpoint.g - (midpoint.g - c.g) * self.low,
                midpoint.b - (midpoint.b - c.b) * self.low,
            )
            .clamp()
        } else {
            Rgb::new(
                midpoint.r + (c.r - midpoint.r) * self.high,
                midpoint.g + (c.g - midpoint.g) * self.high,
                midpoint.b + (c.b - midpoint.b) * self.high,
            )
            .clamp()
        }
    }
}

/// Statistics gathered for one region during the first dithering pass.
#[derive(Clone, Debug, Default)]
pub(crate) struct RegionInfo {
    pub range: Option<RangeId>,
    pub modal_count: BTreeMap<u8, u32>,
    pub average_colour: Rgb,
    pub distance: ColourDistance,
    pub min_index: u8,
    pub max_index: u8,
    pub size: u32,
    pub size_in_range: u32,
}

impl RegionInfo {
    fn new(range: Option<RangeId>) -> Self {
        Self {
            range,
            ..Self::default()
        }
    }

    /// Fold one dithered pixel into the region statistics.
    pub(crate) fn record(&mut self, dithered: u8, cell: &ShaderInfo, palette: &Palette) {
        self.size += 1;

        if dithered != 0 && palette.range_id(dithered) == self.range {
            self.size_in_range += 1;

            let col = if palette.is_special_colour(cell.modal_index) {
                cell.special_colour
            } else {
                cell.colour
            };

            // Running mean over the in-range pixels' pre-dither colour
            let n = self.size_in_range as f64;
            self.average_colour = Rgb::new(
                (self.average_colour.r * (n - 1.0) + col.r) / n,
                (self.average_colour.g * (n - 1.0) + col.g) / n,
                (self.average_colour.b * (n - 1.0) + col.b) / n,
            );

            if dithered < self.min_index || self.min_index == 0 {
                self.min_index = dithered;
            }
            if dithered > self.max_index || self.max_index == 0 {
                self.max_index = dithered;
            }

            *self.modal_count.entry(dithered).or_insert(0) += 1;
        }
    }

    /// Derive the stretch factors from the used index span, expanded by
    /// up to three steps toward each range bound.
    pub(crate) fn compute_distance(&mut self, palette: &Palette) {
        if self.size <= 1 {
            return;
        }

        let range = self
            .range
            .map(|id| palette.range(id))
            .unwrap_or_default();

        let mut low_index = self.min_index;
        let mut high_index = self.max_index;

        if range.start < self.min_index {
            low_index = if self.min_index - range.start > 3 {
                self.min_index - 3
            } else {
                range.start
            };
        }

        if range.end > self.max_index {
            high_index = if range.end - self.max_index > 3 {
                self.max_index + 3
            } else {
                range.end
            };
        }

        let min_colour = palette.colour(self.min_index);
        let max_colour = palette.colour(self.max_index);
        let low_colour = palette.colour(low_index);
        let high_colour = palette.colour(high_index);

        self.distance = ColourDistance {
            low: stretch_factor(self.average_colour, low_colour, min_colour),
            high: stretch_factor(self.average_colour, high_colour, max_colour),
        };
    }
}

/// Mean over channels of `(avg - target) / (avg - extreme)`. Channels
/// whose denominator is zero are left out of the mean; if all three are
/// degenerate the factor is zero.
fn stretch_factor(avg: Rgb, target: Rgb, extreme: Rgb) -> f64 {
    let mut sum = 0.0;
    let mut channels = 0;

    for c in 0..3 {
        let denominator = avg[c] - extreme[c];
        if denominator != 0.0 {
            sum += (avg[c] - target[c]) / denominator;
            channels += 1;
        }
    }

    if channels == 0 {
        0.0
    } else {
        sum / channels as f64
    }
}

/// Assign a region id to every shaded pixel, flood-filling 4-connected
/// same-range neighbours. Returns the region table keyed by id.
pub(crate) fn assign_regions(
    output: &mut ShaderOutput,
    palette: &Palette,
) -> BTreeMap<u32, RegionInfo> {
    let mut regions = BTreeMap::new();
    let mut current: u32 = 1;

    for x in 0..output.width() {
        for y in 0..output.height() {
            // Transparent pixels get no region; claimed pixels keep theirs
            if output.at(x, y).modal_index == 0 || output.at(x, y).region != 0 {
                continue;
            }

            let seed_range = palette.range_id(output.at(x, y).modal_index);
            flood_fill(output, current, x, y, palette, seed_range);

            regions.insert(current, RegionInfo::new(seed_range));
            current += 1;
        }
    }

    regions
}

/// Work-list flood fill; recursion would overflow on large connected
/// components.
fn flood_fill(
    output: &mut ShaderOutput,
    region: u32,
    x: usize,
    y: usize,
    palette: &Palette,
    range: Option<RangeId>,
) {
    let mut stack = vec![(x, y)];

    while let Some((x, y)) = stack.pop() {
        let cell = output.at(x, y);

        if cell.modal_index == 0
            || cell.region == region
            || palette.range_id(cell.modal_index) != range
        {
            continue;
        }

        output.at_mut(x, y).region = region;

        if x > 0 {
            stack.push((x - 1, y));
        }
        if y > 0 {
            stack.push((x, y - 1));
        }
        if x < output.width() - 1 {
            stack.push((x + 1, y));
        }
        if y < output.height() - 1 {
            stack.push((x, y + 1));
        }
    }
}
