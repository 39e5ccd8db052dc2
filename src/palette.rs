/// Palette table, range metadata, and the colouring rules the pipeline
/// asks of them.
///
/// Ranges live in a palette-owned table and entries refer to them by
/// [`RangeId`]. Two ranges are the same range only when their ids are
/// equal; distinct table rows with identical bounds stay distinct. Region
/// segmentation depends on this identity semantics.
///
/// The three palette subset views (regular, primary company colour,
/// secondary company colour) are dense 256-slot colour arrays in which
/// excluded slots hold the magenta sentinel the best-index matcher
/// refuses to pick.

use serde::Deserialize;

use crate::colour::{Rgb, COMPONENT_MAX};
use crate::raycast::RaySample;

/// Sentinel colour for palette slots that must never be matched.
pub const MASK_SENTINEL: Rgb = Rgb::new(COMPONENT_MAX, 0.0, COMPONENT_MAX);

/// Handle into a palette's range table. Identity, not bounds, decides
/// range equality.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct RangeId(pub usize);

/// A contiguous run of palette indices sharing display semantics.
/// `start` and `end` are inclusive palette indices.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct PaletteRange {
    pub start: u8,
    pub end: u8,
    pub is_primary_company_colour: bool,
    pub is_secondary_company_colour: bool,
    pub is_animated_light: bool,
}

impl PaletteRange {
    /// A range flagged for any special handling: company colour remap
    /// or palette animation.
    #[inline]
    pub fn is_special(&self) -> bool {
        self.is_primary_company_colour || self.is_secondary_company_colour || self.is_animated_light
    }
}

/// One palette slot: a colour and the range it belongs to, if any.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct PaletteEntry {
    pub colour: Rgb,
    #[serde(default)]
    pub range: Option<RangeId>,
}

/// Palette of up to 256 entries. Index 0 is the transparent slot.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(try_from = "PaletteDoc")]
pub struct Palette {
    entries: Vec<PaletteEntry>,
    ranges: Vec<PaletteRange>,
}

/// Raw JSON shape of a palette document, validated into [`Palette`].
#[derive(Deserialize)]
struct PaletteDoc {
    #[serde(default)]
    entries: Vec<PaletteEntry>,
    #[serde(default)]
    ranges: Vec<PaletteRange>,
}

impl TryFrom<PaletteDoc> for Palette {
    type Error = String;

    fn try_from(doc: PaletteDoc) -> Result<Self, String> {
        Palette::new(doc.entries, doc.ranges)
    }
}

impl Palette {
    /// Build a palette from an entry list and its range table.
    ///
    /// Fails when more than 256 entries are supplied or an entry refers
    /// to a range the table does not contain.
    pub fn new(entries: Vec<PaletteEntry>, ranges: Vec<PaletteRange>) -> Result<Self, String> {
        if entries.len() > 256 {
            return Err(format!(
                "palette has {} entries, the limit is 256",
                entries.len()
            ));
        }
        for (i, entry) in entries.iter().enumerate() {
            if let Some(RangeId(id)) = entry.range {
                if id >= ranges.len() {
                    return Err(format!(
                        "palette entry {} refers to range {} but only {} ranges exist",
                        i,
                        id,
                        ranges.len()
                    ));
                }
            }
        }
        Ok(Self { entries, ranges })
    }

    /// Parse a palette from its JSON document form.
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| format!("palette JSON: {}", e))
    }

    /// Number of populated palette slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Colour of a palette slot; unpopulated slots read as black.
    #[inline]
    pub fn colour(&self, index: u8) -> Rgb {
        self.entries
            .get(index as usize)
            .map(|e| e.colour)
            .unwrap_or_default()
    }

    /// Range handle of a palette slot, if the slot belongs to one.
    #[inline]
    pub fn range_id(&self, index: u8) -> Option<RangeId> {
        self.entries.get(index as usize).and_then(|e| e.range)
    }

    /// Range metadata of a palette slot. Slots without a range read as
    /// the empty range with all flags false.
    #[inline]
    pub fn range_flags(&self, index: u8) -> PaletteRange {
        self.range_id(index)
            .map(|RangeId(id)| self.ranges[id])
            .unwrap_or_default()
    }

    /// Range metadata by handle.
    #[inline]
    pub fn range(&self, id: RangeId) -> PaletteRange {
        self.ranges[id.0]
    }

    /// A slot the ray caster may legitimately put on screen: populated
    /// and not the transparent slot.
    #[inline]
    pub fn is_renderable(&self, index: u8) -> bool {
        index != 0 && (index as usize) < self.entries.len()
    }

    /// A slot in a company-colour or animated range.
    #[inline]
    pub fn is_special_colour(&self, index: u8) -> bool {
        self.range_flags(index).is_special()
    }

    /// Colour contribution of one ray sample, weighted by its effective
    /// influence.
    ///
    /// The regular rule (`resolve_specials = true`) applies the sample's
    /// lighting as a brightness scale on the entry colour. The special
    /// rule returns the unlit entry colour so company-colour ramps keep
    /// their raw ramp values for subset dithering.
    #[inline]
    pub fn sample_colour(&self, sample: &RaySample, resolve_specials: bool, influence: f64) -> Rgb {
        let base = self.colour(sample.index);
        if resolve_specials {
            (base * (1.0 + sample.lighting)).clamp() * influence
        } else {
            base * influence
        }
    }

    fn subset<F>(&self, include: F) -> Vec<Rgb>
    where
        F: Fn(u8) -> bool,
    {
        (0..=255u8)
            .map(|i| {
                if self.is_renderable(i) && include(i) {
                    self.colour(i)
                } else {
                    MASK_SENTINEL
                }
            })
            .collect()
    }

    /// All renderable colours, special ranges included. A regular pixel
    /// dithered onto a special index is what raises its mask flag.
    pub fn regular_palette(&self) -> Vec<Rgb> {
        self.subset(|_| true)
    }

    /// Only the primary company-colour ramp.
    pub fn primary_company_colour_palette(&self) -> Vec<Rgb> {
        self.subset(|i| self.range_flags(i).is_primary_company_colour)
    }

    /// Only the secondary company-colour ramp.
    pub fn secondary_company_colour_palette(&self) -> Vec<Rgb> {
        self.subset(|i| self.range_flags(i).is_secondary_company_colour)
    }
}
