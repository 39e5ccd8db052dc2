/// Multi-sample aggregation: one pixel's ray samples become one
/// [`ShaderInfo`].
///
/// Samples vote for their palette index with an effective influence
/// derived from recovery suppression, detail boost and depth accuracy;
/// the index with the highest accumulated vote becomes the pixel's modal
/// index. Colour accumulates under both palette colouring rules so the
/// ditherer can later pick the accumulator matching the modal's range.

use crate::colour::grey;
use crate::manifest::Definition;
use crate::raycast::RaySample;

use super::ShaderInfo;

pub(crate) fn shade_pixel(samples: &[RaySample], def: &Definition, prev_index: u8) -> ShaderInfo {
    let mut output = ShaderInfo::default();
    let mut total_influence = 0.0;
    let mut filled_influence = 0.0;
    let mut filled_samples: i64 = 0;
    let mut total_samples: i64 = 0;
    let mut values = [0.0f64; 256];
    let accuracy = def.manifest.accuracy.max(1) as f64;
    let hard_edge_threshold = (def.manifest.hard_edge_threshold * 100.0) as i64;

    let mut min_depth = i32::MAX;
    for s in samples {
        if s.collision && s.depth < min_depth {
            min_depth = s.depth;
        }
    }

    for s in samples {
        let mut influence = s.influence;

        if s.is_recovered {
            influence *= 1.0 - def.manifest.recovered_voxel_suppression;
        }

        // Samples representing fine detail can be boosted to make them
        // more likely to survive aggregation.
        if def.manifest.detail_boost != 0.0 {
            influence *= 1.0 + s.detail * def.manifest.detail_boost;
        }

        // Samples behind the closest hit count for less.
        if s.depth != min_depth {
            influence /= accuracy;
        }

        total_influence += influence;

        if s.collision && def.palette.is_renderable(s.index) {
            filled_influence += influence;
            filled_samples += s.count as i64;

            output.colour += def.palette.sample_colour(s, true, influence);
            output.special_colour += def.palette.sample_colour(s, false, influence);

            if def.palette.is_special_colour(s.index) {
                output.specialness += influence;
                values[s.index as usize] += 1.0;
            }

            if s.index != 0 {
                values[s.index as usize] += influence;
            }

            if def.debug {
                for _ in 0..s.count {
                    output.normal += s.normal_rgb();
                    output.averaged_normal += s.averaged_normal_rgb();
                    output.depth += s.depth_rgb();
                    output.occlusion += s.occlusion_rgb();
                    output.shadowing += s.shadow_rgb();
                    output.lighting += s.lighting_rgb();
                    output.detail += s.detail_rgb();
                }
            }
        }

        total_samples += s.count as i64;
    }

    let mut max = 0.0;
    let mut runner_up = 0.0;
    let mut alternate_modal = 0u8;
    for (k, &v) in values.iter().enumerate() {
        if v > max {
            runner_up = max;
            alternate_modal = output.modal_index;
            output.modal_index = k as u8;
            max = v;
        } else if v > runner_up {
            runner_up = v;
            alternate_modal = k as u8;
        }
    }

    // Anti-banding: when this pixel would repeat its left neighbour's
    // modal and the runner-up sits in the same range, take the runner-up.
    if output.modal_index == prev_index
        && alternate_modal != 0
        && def.palette.range_id(output.modal_index) == def.palette.range_id(alternate_modal)
    {
        output.modal_index = alternate_modal;
    }

    // Fewer than hard-edge-threshold collisions: transparent pixel.
    if total_samples == 0 || filled_samples * 100 / total_samples <= hard_edge_threshold {
        return ShaderInfo::default();
    }

    output.alpha = 1.0;
    let mut divisor = filled_influence;

    // Softened edges fade partially-covered pixels to transparent;
    // otherwise objects stay hard-edged, which aliases more but reads
    // better at small sizes.
    if def.soften_edges() {
        output.alpha = if total_influence > 0.0 {
            filled_influence / total_influence
        } else {
            0.0
        };
    }

    if def.manifest.fade_to_black {
        divisor = total_influence;
    }

    output.colour.divide_and_clamp(divisor);
    output.special_colour.divide_and_clamp(divisor);

    output.specialness = if divisor != 0.0 {
        output.specialness / divisor
    } else {
        0.0
    };

    if def.debug {
        let debug_divisor = filled_samples as f64;
        output.normal.divide_and_clamp(debug_divisor);
        output.averaged_normal.divide_and_clamp(debug_divisor);
        output.depth.divide_and_clamp(debug_divisor);
        output.occlusion.divide_and_clamp(debug_divisor);
        output.shadowing.divide_and_clamp(debug_divisor);
        output.lighting.divide_and_clamp(debug_divisor);
        output.detail.divide_and_clamp(debug_divisor);
        output.transparency = grey(filled_samples as f64 / total_samples as f64);
    }

    output
}
