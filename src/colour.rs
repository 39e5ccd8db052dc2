/// Colour value type for the shading pipeline.
///
/// All pipeline arithmetic happens in a 16-bit linear value space: each
/// component ranges over 0..=65535 as an `f64`. Accumulation, error
/// diffusion and contrast stretching routinely push components outside
/// that range; `clamp` and `divide_and_clamp` bring them back.

use std::ops::{Add, AddAssign, Index, Mul, Sub};

use serde::Deserialize;

/// Upper bound of a colour component in the pipeline's value space.
pub const COMPONENT_MAX: f64 = 65535.0;

/// RGB triple in 16-bit linear space. Equality is component-wise.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    #[inline]
    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Clamp every component to the valid 0..=65535 range.
    #[inline]
    pub fn clamp(self) -> Self {
        Self {
            r: self.r.clamp(0.0, COMPONENT_MAX),
            g: self.g.clamp(0.0, COMPONENT_MAX),
            b: self.b.clamp(0.0, COMPONENT_MAX),
        }
    }

    /// Divide by `divisor` and clamp to the valid range, in place.
    ///
    /// A zero divisor leaves the colour black instead of propagating
    /// NaN through the pipeline.
    #[inline]
    pub fn divide_and_clamp(&mut self, divisor: f64) {
        if divisor == 0.0 {
            *self = Rgb::default();
            return;
        }
        *self = Self {
            r: self.r / divisor,
            g: self.g / divisor,
            b: self.b / divisor,
        }
        .clamp();
    }

    /// Sum of the three components. Used to order colours against a
    /// midpoint during contrast stretching.
    #[inline]
    pub fn component_sum(self) -> f64 {
        self.r + self.g + self.b
    }
}

impl Index<usize> for Rgb {
    type Output = f64;

    #[inline]
    fn index(&self, i: usize) -> &f64 {
        match i {
            0 => &self.r,
            1 => &self.g,
            2 => &self.b,
            _ => panic!("Rgb channel index out of range: {}", i),
        }
    }
}

impl Add for Rgb {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self {
            r: self.r + rhs.r,
            g: self.g + rhs.g,
            b: self.b + rhs.b,
        }
    }
}

impl AddAssign for Rgb {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.r += rhs.r;
        self.g += rhs.g;
        self.b += rhs.b;
    }
}

impl Sub for Rgb {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self {
            r: self.r - rhs.r,
            g: self.g - rhs.g,
            b: self.b - rhs.b,
        }
    }
}

impl Mul<f64> for Rgb {
    type Output = Self;

    #[inline]
    fn mul(self, s: f64) -> Self {
        Self {
            r: self.r * s,
            g: self.g * s,
            b: self.b * s,
        }
    }
}

/// Grey level from a normalized scalar: `v` in 0..=1 maps to equal
/// components in 0..=65535. Values outside 0..=1 are clamped.
#[inline]
pub fn grey(v: f64) -> Rgb {
    let c = (v * COMPONENT_MAX).clamp(0.0, COMPONENT_MAX);
    Rgb::new(c, c, c)
}
