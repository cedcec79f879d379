//! 8-bit ARGB rendering for display

use super::Frame;
use crate::format::ColorSpace;
use crate::pixel::yuv_to_rgb;

const OPAQUE: u32 = 0xff;

#[inline]
fn pack_argb(a: u32, r: u32, g: u32, b: u32) -> u32 {
    (a << 24) | (r << 16) | (g << 8) | b
}

impl Frame {
    /// Render the frame as packed `0xAARRGGBB` pixels, row-major.
    ///
    /// The result is cached until the samples change.
    pub fn fill_rgb_preview(&self) -> &[u32] {
        self.preview.get_or_init(|| self.render_argb())
    }

    /// Cached preview, if rendered since the last mutation
    pub fn rgb_preview(&self) -> Option<&[u32]> {
        self.preview.get().map(Vec::as_slice)
    }

    /// Scale a raw sample to the 0..=255 display range
    fn display_value(&self, sample: u16) -> u32 {
        let sample = sample as u32;
        if self.bits >= 8 {
            sample >> (self.bits - 8)
        } else {
            sample * 255 / self.max_value()
        }
    }

    fn render_argb(&self) -> Vec<u32> {
        let (w, h) = (self.width as usize, self.height as usize);
        let mut out = Vec::with_capacity(w * h);

        for y in 0..self.height {
            for x in 0..self.width {
                let v = |ch: usize| self.display_value(self.sample(ch, x, y));
                let argb = match self.color_space() {
                    ColorSpace::Gray => {
                        let l = v(0);
                        pack_argb(OPAQUE, l, l, l)
                    }
                    ColorSpace::Yuv => {
                        let (r, g, b) = yuv_to_rgb(v(0) as i32, v(1) as i32, v(2) as i32);
                        pack_argb(OPAQUE, r as u32, g as u32, b as u32)
                    }
                    ColorSpace::Rgb => pack_argb(OPAQUE, v(0), v(1), v(2)),
                    ColorSpace::Rgba => pack_argb(v(3), v(0), v(1), v(2)),
                };
                out.push(argb);
            }
        }
        out
    }
}
