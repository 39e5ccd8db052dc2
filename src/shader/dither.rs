/// Floyd–Steinberg error diffusion against range-selected palette
/// subsets.
///
/// The grid is traversed column-major (all `y` for one `x`), so the two
/// rolling error rows run along `y`: `err_curr` carries error into the
/// current column, `err_next` collects error for the next one. Both are
/// `height + 2` long so the kernel can write `y-1..=y+1` without bounds
/// checks. The caller swaps the rows after each column.
///
/// Error weights are the classic 7/16 (ahead), 3/16, 5/16, 1/16 (next
/// column), mapped onto the rolling rows.

use crate::colour::Rgb;
use crate::manifest::Definition;
use crate::palette::Palette;

use super::ShaderOutput;

/// The three palette subset views one dithering pass matches against.
pub(crate) struct PaletteSubsets {
    pub regular: Vec<Rgb>,
    pub primary_cc: Vec<Rgb>,
    pub secondary_cc: Vec<Rgb>,
}

impl PaletteSubsets {
    pub(crate) fn new(palette: &Palette) -> Self {
        Self {
            regular: palette.regular_palette(),
            primary_cc: palette.primary_company_colour_palette(),
            secondary_cc: palette.secondary_company_colour_palette(),
        }
    }
}

#[inline]
fn square_diff(a: f64, b: f64) -> f64 {
    let diff = a - b;
    diff * diff
}

/// Palette index minimising squared RGB distance to `target`.
///
/// Sentinel entries (magenta, or white with magenta's red/blue) are never
/// picked. First index wins ties; an exact match exits early.
pub(crate) fn best_index(target: Rgb, palette: &[Rgb]) -> u8 {
    let mut best_index = 0usize;
    let mut best_sum = f64::MAX;

    for (index, p) in palette.iter().enumerate() {
        if p.r > 65000.0 && (p.g == 0.0 || p.g > 65000.0) && p.b > 65000.0 {
            continue;
        }

        let sum =
            square_diff(target.r, p.r) + square_diff(target.g, p.g) + square_diff(target.b, p.b);
        if sum < best_sum {
            best_index = index;
            best_sum = sum;
            if sum == 0.0 {
                break;
            }
        }
    }

    best_index as u8
}

/// Dither one pixel: choose its palette index, update its mask flags and
/// diffuse the quantization error into the rolling rows.
pub(crate) fn dither_pixel(
    output: &mut ShaderOutput,
    x: usize,
    y: usize,
    def: &Definition,
    subsets: &PaletteSubsets,
    err_curr: &mut [Rgb],
    err_next: &mut [Rgb],
) -> u8 {
    let info = *output.at(x, y);
    let range = def.palette.range_flags(info.modal_index);

    // A special-colour pixel above acts as a diffusion boundary: its
    // error never bleeds into this pixel.
    let above_is_special = y > 0 && def.palette.is_special_colour(output.at(x, y - 1).modal_index);

    let mut target = Rgb::default();
    let best;

    if info.alpha < def.manifest.edge_threshold {
        best = 0;
    } else if range.is_primary_company_colour {
        target = if above_is_special {
            info.special_colour
        } else {
            info.special_colour + err_curr[y + 1]
        };
        best = best_index(target, &subsets.primary_cc);
    } else if range.is_secondary_company_colour {
        target = if above_is_special {
            info.special_colour
        } else {
            info.special_colour + err_curr[y + 1]
        };
        best = best_index(target, &subsets.secondary_cc);
    } else if range.is_animated_light {
        output.at_mut(x, y).is_animated = true;
        // Animated lights keep their modal index; setting the target to
        // the palette colour makes the diffused error exactly zero.
        best = info.modal_index;
        target = def.palette.colour(best);
    } else {
        target = if above_is_special {
            info.colour
        } else {
            info.colour + err_curr[y + 1]
        };
        best = best_index(target, &subsets.regular);
    }

    {
        let cell = output.at_mut(x, y);
        cell.dithered_index = best;
        if def.palette.is_special_colour(best) {
            cell.is_mask_colour = true;
        }
    }

    let error = if info.alpha >= def.manifest.edge_threshold {
        (target - def.palette.colour(best)).clamp()
    } else {
        Rgb::default()
    };

    err_next[y] += error * (3.0 / 16.0);
    err_next[y + 1] += error * (5.0 / 16.0);
    err_next[y + 2] += error * (1.0 / 16.0);
    err_curr[y + 2] += error * (7.0 / 16.0);

    // Current cell's incoming error is consumed.
    err_curr[y + 1] = Rgb::default();

    best
}
