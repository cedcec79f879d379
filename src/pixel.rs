//! Per-pixel sample vector tagged with a color space

use crate::format::{ColorSpace, MAX_CHANNELS};
use std::ops::{Add, AddAssign, Index, IndexMut, Mul, Sub, SubAssign};

const MIN_DISPLAY_VALUE: i32 = 0;
const MAX_DISPLAY_VALUE: i32 = 255;

/// Fixed-point BT.601 YUV to RGB, clamped to the 8-bit display range
pub fn yuv_to_rgb(y: i32, u: i32, v: i32) -> (i32, i32, i32) {
    let r = y + ((1436 * (v - 128)) >> 10);
    let g = y - ((352 * (u - 128) + 731 * (v - 128)) >> 10);
    let b = y + ((1812 * (u - 128)) >> 10);
    (
        r.clamp(MIN_DISPLAY_VALUE, MAX_DISPLAY_VALUE),
        g.clamp(MIN_DISPLAY_VALUE, MAX_DISPLAY_VALUE),
        b.clamp(MIN_DISPLAY_VALUE, MAX_DISPLAY_VALUE),
    )
}

/// Fixed-point BT.601 RGB to YUV
pub fn rgb_to_yuv(r: i32, g: i32, b: i32) -> (i32, i32, i32) {
    let y = (299 * r + 587 * g + 114 * b + 500) / 1000;
    let u = (1000 * (b - y) + 226_816) / 1772;
    let v = (1000 * (r - y) + 179_456) / 1402;
    (y, u, v)
}

/// One pixel: up to four samples plus the color space they belong to.
///
/// Arithmetic between two pixels is only meaningful when both share a color
/// space; mixing them is a programming error and trips a debug assertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct PixelValue {
    color_space: ColorSpace,
    comp: [i32; MAX_CHANNELS],
}

impl PixelValue {
    /// All samples zero
    pub fn new(color_space: ColorSpace) -> Self {
        Self {
            color_space,
            comp: [0; MAX_CHANNELS],
        }
    }

    pub fn gray(y: i32) -> Self {
        Self::from_components(ColorSpace::Gray, &[y])
    }

    pub fn yuv(y: i32, u: i32, v: i32) -> Self {
        Self::from_components(ColorSpace::Yuv, &[y, u, v])
    }

    pub fn rgb(r: i32, g: i32, b: i32) -> Self {
        Self::from_components(ColorSpace::Rgb, &[r, g, b])
    }

    pub fn rgba(r: i32, g: i32, b: i32, a: i32) -> Self {
        Self::from_components(ColorSpace::Rgba, &[r, g, b, a])
    }

    /// Build from a slice; extra values beyond four are ignored
    pub fn from_components(color_space: ColorSpace, values: &[i32]) -> Self {
        let mut pel = Self::new(color_space);
        for (dst, src) in pel.comp.iter_mut().zip(values) {
            *dst = *src;
        }
        pel
    }

    pub fn color_space(&self) -> ColorSpace {
        self.color_space
    }

    /// Samples meaningful for the color space
    pub fn components(&self) -> &[i32] {
        &self.comp[..self.color_space.channels()]
    }

    /// Convert to another color space.
    ///
    /// Same-space conversion returns the pixel unchanged. Color transforms
    /// assume 8-bit samples.
    pub fn convert_to(&self, target: ColorSpace) -> PixelValue {
        if self.color_space == target {
            return *self;
        }
        let c = &self.comp;
        match (self.color_space, target) {
            (ColorSpace::Yuv, ColorSpace::Gray) => Self::gray(c[0]),
            (ColorSpace::Yuv, ColorSpace::Rgb) => {
                let (r, g, b) = yuv_to_rgb(c[0], c[1], c[2]);
                Self::rgb(r, g, b)
            }
            (ColorSpace::Yuv, ColorSpace::Rgba) => {
                let (r, g, b) = yuv_to_rgb(c[0], c[1], c[2]);
                Self::rgba(r, g, b, MAX_DISPLAY_VALUE)
            }
            (ColorSpace::Rgb | ColorSpace::Rgba, ColorSpace::Gray) => {
                let (y, _, _) = rgb_to_yuv(c[0], c[1], c[2]);
                Self::gray(y)
            }
            (ColorSpace::Rgb | ColorSpace::Rgba, ColorSpace::Yuv) => {
                let (y, u, v) = rgb_to_yuv(c[0], c[1], c[2]);
                Self::yuv(y, u, v)
            }
            (ColorSpace::Rgb, ColorSpace::Rgba) => Self::rgba(c[0], c[1], c[2], MAX_DISPLAY_VALUE),
            (ColorSpace::Rgba, ColorSpace::Rgb) => Self::rgb(c[0], c[1], c[2]),
            (ColorSpace::Gray, ColorSpace::Yuv) => Self::yuv(c[0], 128, 128),
            (ColorSpace::Gray, ColorSpace::Rgb) => Self::rgb(c[0], c[0], c[0]),
            (ColorSpace::Gray, ColorSpace::Rgba) => {
                Self::rgba(c[0], c[0], c[0], MAX_DISPLAY_VALUE)
            }
            _ => *self,
        }
    }
}

impl Index<usize> for PixelValue {
    type Output = i32;

    fn index(&self, idx: usize) -> &i32 {
        &self.comp[idx]
    }
}

impl IndexMut<usize> for PixelValue {
    fn index_mut(&mut self, idx: usize) -> &mut i32 {
        &mut self.comp[idx]
    }
}

impl AddAssign for PixelValue {
    fn add_assign(&mut self, rhs: PixelValue) {
        debug_assert_eq!(self.color_space, rhs.color_space);
        for (a, b) in self.comp.iter_mut().zip(rhs.comp) {
            *a += b;
        }
    }
}

impl SubAssign for PixelValue {
    fn sub_assign(&mut self, rhs: PixelValue) {
        debug_assert_eq!(self.color_space, rhs.color_space);
        for (a, b) in self.comp.iter_mut().zip(rhs.comp) {
            *a -= b;
        }
    }
}

impl Add for PixelValue {
    type Output = PixelValue;

    fn add(mut self, rhs: PixelValue) -> PixelValue {
        self += rhs;
        self
    }
}

impl Sub for PixelValue {
    type Output = PixelValue;

    fn sub(mut self, rhs: PixelValue) -> PixelValue {
        self -= rhs;
        self
    }
}

impl Mul<f64> for PixelValue {
    type Output = PixelValue;

    fn mul(mut self, rhs: f64) -> PixelValue {
        for a in self.comp.iter_mut() {
            *a = (*a as f64 * rhs) as i32;
        }
        self
    }
}

impl std::fmt::Display for PixelValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let c = self.components();
        write!(f, "(")?;
        for (i, v) in c.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", v)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuv_to_rgb_neutral_gray() {
        assert_eq!(yuv_to_rgb(128, 128, 128), (128, 128, 128));
        assert_eq!(yuv_to_rgb(255, 255, 255), (255, 121, 255));
        assert_eq!(yuv_to_rgb(0, 0, 0), (0, 136, 0));
    }

    #[test]
    fn test_rgb_to_yuv() {
        assert_eq!(rgb_to_yuv(0, 0, 0), (0, 128, 128));
        assert_eq!(rgb_to_yuv(255, 255, 255), (255, 128, 128));
        let (y, _, v) = rgb_to_yuv(255, 0, 0);
        assert_eq!(y, 76);
        assert_eq!(v, (1000 * (255 - 76) + 179_456) / 1402);
    }

    #[test]
    fn test_conversions() {
        let yuv = PixelValue::yuv(100, 128, 128);
        assert_eq!(yuv.convert_to(ColorSpace::Gray), PixelValue::gray(100));
        assert_eq!(yuv.convert_to(ColorSpace::Rgb), PixelValue::rgb(100, 100, 100));
        assert_eq!(
            yuv.convert_to(ColorSpace::Rgba),
            PixelValue::rgba(100, 100, 100, 255)
        );
        assert_eq!(yuv.convert_to(ColorSpace::Yuv), yuv);

        let rgb = PixelValue::rgb(10, 20, 30);
        assert_eq!(rgb.convert_to(ColorSpace::Rgba), PixelValue::rgba(10, 20, 30, 255));
        assert_eq!(rgb.convert_to(ColorSpace::Gray)[0], rgb.convert_to(ColorSpace::Yuv)[0]);
    }

    #[test]
    fn test_arithmetic() {
        let a = PixelValue::rgb(10, 20, 30);
        let b = PixelValue::rgb(1, 2, 3);
        assert_eq!(a + b, PixelValue::rgb(11, 22, 33));
        assert_eq!(a - b, PixelValue::rgb(9, 18, 27));
        assert_eq!(a * 0.5, PixelValue::rgb(5, 10, 15));
        assert_ne!(PixelValue::gray(10), PixelValue::from_components(ColorSpace::Yuv, &[10]));
    }

    #[test]
    fn test_display() {
        assert_eq!(PixelValue::yuv(1, 2, 3).to_string(), "(1, 2, 3)");
        assert_eq!(PixelValue::gray(7).to_string(), "(7)");
    }
}
