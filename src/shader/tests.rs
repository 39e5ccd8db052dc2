//! Pipeline fixtures: full runs of `shade` over small synthetic scenes.

use super::*;
use crate::colour::COMPONENT_MAX;
use crate::manifest::Manifest;
use crate::palette::{Palette, PaletteEntry, PaletteRange, RangeId};
use crate::raycast::RaySample;

// ============================================================================
// Fixtures
// ============================================================================

/// Grey ramp palette: index 0 transparent, 1..=ramp_len one regular
/// range with colour i * step.
fn ramp_definition(ramp_len: u8, step: f64) -> Definition {
    let ranges = vec![PaletteRange {
        start: 1,
        end: ramp_len,
        ..PaletteRange::default()
    }];
    let mut entries = vec![PaletteEntry {
        colour: Rgb::default(),
        range: None,
    }];
    for i in 1..=ramp_len {
        let c = i as f64 * step;
        entries.push(PaletteEntry {
            colour: Rgb::new(c, c, c),
            range: Some(RangeId(0)),
        });
    }
    Definition {
        palette: Palette::new(entries, ranges).unwrap(),
        scale: 1.0,
        debug: false,
        manifest: Manifest::default(),
    }
}

fn empty_render(width: usize, height: usize) -> crate::raycast::RenderOutput {
    vec![vec![Vec::new(); height]; width]
}

fn hit(index: u8, influence: f64) -> RaySample {
    RaySample {
        collision: true,
        index,
        influence,
        ..RaySample::default()
    }
}

fn miss() -> RaySample {
    RaySample::default()
}

// ============================================================================
// Spec scenarios
// ============================================================================

#[test]
fn test_empty_scene() {
    let def = ramp_definition(8, 8000.0);
    let mut render = empty_render(8, 8);
    for column in render.iter_mut() {
        for cell in column.iter_mut() {
            *cell = vec![miss(); 4];
        }
    }

    let out = shade(&render, &Sprite::default(), &def, 8, 8);

    for cell in out.cells() {
        assert_eq!(*cell, ShaderInfo::default());
        assert_eq!(cell.dithered_index, 0);
        assert_eq!(cell.region, 0);
    }
}

#[test]
fn test_single_solid_pixel() {
    let def = ramp_definition(16, 4000.0);
    let mut render = empty_render(12, 12);
    render[5][5] = vec![hit(10, 1.0)];

    let out = shade(&render, &Sprite::default(), &def, 12, 12);

    let cell = out.at(5, 5);
    assert_eq!(cell.modal_index, 10);
    assert_eq!(cell.region, 1);
    assert_eq!(cell.alpha, 1.0);
    // The accumulated colour is exactly the palette colour, so the
    // matcher returns the index itself
    assert_eq!(cell.dithered_index, 10);

    for x in 0..12 {
        for y in 0..12 {
            if (x, y) != (5, 5) {
                assert_eq!(out.at(x, y).dithered_index, 0);
                assert_eq!(out.at(x, y).region, 0);
            }
        }
    }
}

#[test]
fn test_anti_banding_rewrites_repeated_modal() {
    let def = ramp_definition(8, 8000.0);
    let mut render = empty_render(5, 1);
    render[2][0] = vec![hit(5, 0.60), hit(6, 0.40)];
    render[3][0] = vec![hit(5, 0.55), hit(6, 0.45)];

    let out = shade(&render, &Sprite::default(), &def, 5, 1);

    assert_eq!(out.at(2, 0).modal_index, 5);
    // Same top votes, but the left neighbour already took 5
    assert_eq!(out.at(3, 0).modal_index, 6);
}

#[test]
fn test_hard_edge_discard() {
    let mut def = ramp_definition(8, 8000.0);
    def.manifest.hard_edge_threshold = 0.5;

    let mut render = empty_render(3, 3);
    let mut samples = vec![hit(3, 1.0); 4];
    samples.extend(vec![miss(); 6]);
    render[1][1] = samples;

    let out = shade(&render, &Sprite::default(), &def, 3, 3);
    assert_eq!(*out.at(1, 1), ShaderInfo::default());
}

#[test]
fn test_edge_threshold_emits_transparent_and_diffuses_nothing() {
    let mut def = ramp_definition(16, 4000.0);
    def.manifest.soften_edges = true;

    // y0: alpha 0.3 pixel; y1: solid pixel sitting exactly on a palette
    // colour. Any leaked error would pull y1 off its exact match.
    let mut render = empty_render(1, 2);
    let mut partial = vec![hit(7, 1.0); 3];
    partial.extend(vec![miss(); 7]);
    render[0][0] = partial;
    render[0][1] = vec![hit(9, 1.0)];

    let out = shade(&render, &Sprite::default(), &def, 1, 2);

    let edge = out.at(0, 0);
    assert!((edge.alpha - 0.3).abs() < 1e-9);
    assert_eq!(edge.dithered_index, 0);
    assert_eq!(out.at(0, 1).dithered_index, 9);
}

#[test]
fn test_region_stretch_expands_contrast() {
    let def = ramp_definition(16, 4000.0);

    // 10x1 strip over one range: lighting gradient puts the raw colours
    // in a narrow band around index 8
    let mut render = empty_render(10, 1);
    for (x, column) in render.iter_mut().enumerate() {
        let lighting = -0.3 + 0.6 * (x as f64 / 9.0);
        column[0] = vec![RaySample {
            lighting,
            ..hit(8, 1.0)
        }];
    }

    let out = shade(&render, &Sprite::default(), &def, 10, 1);

    let indices: Vec<u8> = (0..10).map(|x| out.at(x, 0).dithered_index).collect();
    let min = *indices.iter().min().unwrap();
    let max = *indices.iter().max().unwrap();

    // The raw band dithers to roughly 6..=10; the stretch must reach at
    // least three indices beyond each end, staying inside the range
    assert!(min <= 3, "min index {} not expanded", min);
    assert!(max >= 13, "max index {} not expanded", max);
    assert!(min >= 1 && max <= 16);

    // Endpoint contrast strictly exceeds the unstretched reference
    let reference_low = def.palette.colour(6);
    let reference_high = def.palette.colour(10);
    let reference_contrast = l1(reference_high - reference_low);

    let final_low = def.palette.colour(indices[0]);
    let final_high = def.palette.colour(indices[9]);
    assert!(l1(final_high - final_low) > reference_contrast);
}

fn l1(c: Rgb) -> f64 {
    c.r.abs() + c.g.abs() + c.b.abs()
}

// ============================================================================
// Invariants
// ============================================================================

fn busy_scene() -> (crate::raycast::RenderOutput, Definition) {
    let mut def = ramp_definition(16, 4000.0);
    def.manifest.soften_edges = true;

    let mut render = empty_render(16, 16);
    for (x, column) in render.iter_mut().enumerate() {
        for (y, cell) in column.iter_mut().enumerate() {
            // Deterministic pseudo-variety without randomness
            let index = 1 + ((x * 7 + y * 3) % 16) as u8;
            let mut samples = vec![
                hit(index, 1.0),
                RaySample {
                    depth: 2,
                    ..hit(1 + ((x + y) % 16) as u8, 0.7)
                },
            ];
            if (x + y) % 3 == 0 {
                samples.push(miss());
            }
            *cell = samples;
        }
    }
    (render, def)
}

#[test]
fn test_determinism() {
    let (render, def) = busy_scene();
    let a = shade(&render, &Sprite::default(), &def, 16, 16);
    let b = shade(&render, &Sprite::default(), &def, 16, 16);
    assert_eq!(a.cells(), b.cells());
}

#[test]
fn test_alpha_and_colour_bounds() {
    let (render, def) = busy_scene();
    let out = shade(&render, &Sprite::default(), &def, 16, 16);

    for cell in out.cells() {
        assert!(cell.alpha >= 0.0 && cell.alpha <= 1.0);
        for c in [cell.colour, cell.special_colour] {
            assert!(c.r >= 0.0 && c.r <= COMPONENT_MAX);
            assert!(c.g >= 0.0 && c.g <= COMPONENT_MAX);
            assert!(c.b >= 0.0 && c.b <= COMPONENT_MAX);
        }
    }
}

#[test]
fn test_region_consistency() {
    let (render, def) = busy_scene();
    let out = shade(&render, &Sprite::default(), &def, 16, 16);

    for x in 0..16usize {
        for y in 0..16usize {
            let cell = out.at(x, y);
            // Transparent pixels carry no region, shaded pixels do
            assert_eq!(cell.region == 0, cell.modal_index == 0);
            if cell.region == 0 {
                continue;
            }

            let range = def.palette.range_id(cell.modal_index);
            let mut neighbours = Vec::new();
            if x > 0 {
                neighbours.push(out.at(x - 1, y));
            }
            if y > 0 {
                neighbours.push(out.at(x, y - 1));
            }
            if x < 15 {
                neighbours.push(out.at(x + 1, y));
            }
            if y < 15 {
                neighbours.push(out.at(x, y + 1));
            }
            for n in neighbours {
                if n.modal_index != 0 && def.palette.range_id(n.modal_index) == range {
                    assert_eq!(n.region, cell.region);
                }
            }
        }
    }
}

#[test]
fn test_mask_index_law() {
    let (render, def) = busy_scene();
    let out = shade(&render, &Sprite::default(), &def, 16, 16);

    for cell in out.cells() {
        let mask = cell.mask_index();
        assert!(mask == 0 || mask == cell.modal_index || mask == cell.dithered_index);
        // The projection is a pure function of the cell
        assert_eq!(mask, cell.mask_index());
    }
}

#[test]
fn test_batch_matches_serial() {
    let (render, def) = busy_scene();
    let serial = shade(&render, &Sprite::default(), &def, 16, 16);

    let jobs = vec![
        ShadeJob {
            render_output: &render,
            sprite: Sprite::default(),
            definition: &def,
            width: 16,
            height: 16,
        },
        ShadeJob {
            render_output: &render,
            sprite: Sprite::default(),
            definition: &def,
            width: 16,
            height: 16,
        },
    ];
    let batch = shade_batch(&jobs);

    assert_eq!(batch.len(), 2);
    for out in &batch {
        assert_eq!(out.cells(), serial.cells());
    }
}

// ============================================================================
// Special colour handling
// ============================================================================

/// Palette with a regular ramp 1..=4, a primary CC ramp 5..=8 and an
/// animated pair 9..=10.
fn special_definition() -> Definition {
    let ranges = vec![
        PaletteRange {
            start: 1,
            end: 4,
            ..PaletteRange::default()
        },
        PaletteRange {
            start: 5,
            end: 8,
            is_primary_company_colour: true,
            ..PaletteRange::default()
        },
        PaletteRange {
            start: 9,
            end: 10,
            is_animated_light: true,
            ..PaletteRange::default()
        },
    ];
    let mut entries = vec![PaletteEntry {
        colour: Rgb::default(),
        range: None,
    }];
    for i in 1..=4u8 {
        let c = i as f64 * 12000.0;
        entries.push(PaletteEntry {
            colour: Rgb::new(c, c, c),
            range: Some(RangeId(0)),
        });
    }
    for i in 5..=8u8 {
        entries.push(PaletteEntry {
            colour: Rgb::new(0.0, 0.0, (i - 4) as f64 * 12000.0),
            range: Some(RangeId(1)),
        });
    }
    for i in 9..=10u8 {
        entries.push(PaletteEntry {
            colour: Rgb::new((i - 8) as f64 * 20000.0, 8000.0, 0.0),
            range: Some(RangeId(2)),
        });
    }
    Definition {
        palette: Palette::new(entries, ranges).unwrap(),
        scale: 1.0,
        debug: false,
        manifest: Manifest::default(),
    }
}

#[test]
fn test_company_colour_dithers_within_its_ramp() {
    let def = special_definition();
    let mut render = empty_render(4, 4);
    for column in render.iter_mut() {
        for cell in column.iter_mut() {
            *cell = vec![hit(6, 1.0)];
        }
    }

    let out = shade(&render, &Sprite::default(), &def, 4, 4);

    for cell in out.cells() {
        assert!(cell.dithered_index >= 5 && cell.dithered_index <= 8);
        assert!(cell.is_mask_colour);
        // Fully special pixel: the mask plane carries the modal index
        assert!(cell.specialness > 0.75);
        assert_eq!(cell.mask_index(), cell.modal_index);
    }
}

#[test]
fn test_animated_light_keeps_modal_index() {
    let def = special_definition();
    let mut render = empty_render(2, 2);
    render[0][0] = vec![hit(9, 1.0)];
    render[1][1] = vec![hit(10, 1.0)];

    let out = shade(&render, &Sprite::default(), &def, 2, 2);

    let a = out.at(0, 0);
    assert!(a.is_animated);
    assert_eq!(a.dithered_index, 9);
    assert_eq!(a.mask_index(), 9);

    let b = out.at(1, 1);
    assert!(b.is_animated);
    assert_eq!(b.dithered_index, 10);
}

// ============================================================================
// Projections and offsets
// ============================================================================

#[test]
fn test_region_rgb_encoding() {
    let mut cell = ShaderInfo::default();
    cell.region = 5;
    assert_eq!(cell.region_rgb(), Rgb::new(16384.0, 16384.0, 0.0));

    cell.region = 21; // 1 + 1*4 + 1*16
    assert_eq!(cell.region_rgb(), Rgb::new(16384.0, 16384.0, 16384.0));

    cell.region = 0;
    assert_eq!(cell.region_rgb(), Rgb::default());
}

#[test]
fn test_sprite_offset_shifts_sampling() {
    let mut def = ramp_definition(16, 4000.0);
    def.scale = 2.0;

    let mut render = empty_render(8, 8);
    render[6][6] = vec![hit(3, 1.0)];

    // offset 2 * scale 2 shifts sampling by 4: pixel (2,2) reads (6,6)
    let sprite = Sprite {
        offset_x: 2.0,
        offset_y: 2.0,
    };
    let out = shade(&render, &sprite, &def, 8, 8);

    assert_eq!(out.at(2, 2).modal_index, 3);
    assert_eq!(out.at(6, 6).modal_index, 0);
}

#[test]
fn test_diagnostics_report_regions() {
    let def = ramp_definition(16, 4000.0);
    let mut render = empty_render(4, 1);
    for column in render.iter_mut() {
        column[0] = vec![hit(8, 1.0)];
    }

    let mut lines = Vec::new();
    let mut sink = |line: &str| lines.push(line.to_string());
    shade_with_diagnostics(&render, &Sprite::default(), &def, 4, 1, Some(&mut sink));

    assert!(lines.iter().any(|l| l.starts_with("region 1: size 4")));
    assert!(lines.iter().any(|l| l.contains("distance")));
}
