//! Marshalling between packed file bytes and frame samples

use super::Frame;
use crate::error::{Error, Result};
use crate::format::bytes_per_sample;
use crate::types::Endianness;

impl Frame {
    /// Byte offset of each packed plane.
    ///
    /// Plane 0 holds full-resolution luma; every later plane is one chroma
    /// plane in size.
    fn plane_bases(&self, bytes_pel: usize) -> [usize; 4] {
        let desc = self.descriptor();
        let luma = self.width as usize * self.height as usize * bytes_pel;
        let chroma = desc.channel_width(1, self.width) as usize
            * desc.channel_height(1, self.height) as usize
            * bytes_pel;
        [0, luma, luma + chroma, luma + 2 * chroma]
    }

    /// Decode one packed frame.
    ///
    /// Samples are `ceil(bits / 8)` bytes each in the given byte order; any
    /// decoded value above the sample range is stored as zero.
    pub fn from_bytes(&mut self, buf: &[u8], endianness: Endianness) -> Result<()> {
        let expected = self.bytes_per_frame() as usize;
        if buf.len() < expected {
            return Err(Error::ShortRead {
                expected,
                actual: buf.len(),
            });
        }
        let buf = &buf[..expected];

        let bytes_pel = bytes_per_sample(self.bits);
        let max = self.max_value();
        let bases = self.plane_bases(bytes_pel);
        let desc = self.descriptor();

        for (ch, layout) in desc.layouts().iter().enumerate() {
            let stride = layout.step() * bytes_pel;
            let mut pos = bases[layout.plane as usize] + layout.offset() * bytes_pel;
            let range = self.offsets[ch]..self.offsets[ch + 1];
            for sample in &mut self.samples[range] {
                let mut value = 0u32;
                for k in 0..bytes_pel {
                    let shift = match endianness {
                        Endianness::Little => k,
                        Endianness::Big => bytes_pel - 1 - k,
                    };
                    value |= (buf.get(pos + k).copied().unwrap_or(0) as u32) << (shift * 8);
                }
                if value > max {
                    value = 0;
                }
                *sample = value as u16;
                pos += stride;
            }
        }

        self.clear_caches();
        Ok(())
    }

    /// Encode the frame into its packed byte layout
    pub fn to_bytes(&self, endianness: Endianness) -> Vec<u8> {
        let mut out = Vec::new();
        self.to_bytes_into(&mut out, endianness);
        out
    }

    /// Encode into a reusable buffer, resizing it to the packed frame size
    pub fn to_bytes_into(&self, out: &mut Vec<u8>, endianness: Endianness) {
        out.clear();
        out.resize(self.bytes_per_frame() as usize, 0);

        let bytes_pel = bytes_per_sample(self.bits);
        let bases = self.plane_bases(bytes_pel);
        let desc = self.descriptor();

        for (ch, layout) in desc.layouts().iter().enumerate() {
            let stride = layout.step() * bytes_pel;
            let mut pos = bases[layout.plane as usize] + layout.offset() * bytes_pel;
            for &sample in self.plane(ch) {
                for k in 0..bytes_pel {
                    let shift = match endianness {
                        Endianness::Little => k,
                        Endianness::Big => bytes_pel - 1 - k,
                    };
                    if let Some(byte) = out.get_mut(pos + k) {
                        *byte = (sample >> (shift * 8)) as u8;
                    }
                }
                pos += stride;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::Error;
    use crate::format::PixelFormat;
    use crate::frame::Frame;
    use crate::pixel::PixelValue;
    use crate::types::Endianness;

    fn patterned(width: u32, height: u32, format: PixelFormat, bits: u32) -> Frame {
        let mut frame = Frame::new(width, height, format, bits).unwrap();
        let modulo = frame.max_value() as usize + 1;
        for ch in 0..frame.channels() {
            for (i, s) in frame.plane_mut(ch).iter_mut().enumerate() {
                *s = ((i * 37 + ch * 101 + 5) % modulo) as u16;
            }
        }
        frame
    }

    #[test]
    fn test_roundtrip_all_formats() {
        for format in PixelFormat::ALL {
            for bits in [8, 10, 16] {
                for endianness in [Endianness::Little, Endianness::Big] {
                    let frame = patterned(6, 4, format, bits);
                    let bytes = frame.to_bytes(endianness);
                    assert_eq!(bytes.len() as u64, frame.bytes_per_frame());

                    let mut decoded = Frame::new(6, 4, format, bits).unwrap();
                    decoded.from_bytes(&bytes, endianness).unwrap();
                    assert_eq!(decoded, frame, "{} {} bits {:?}", format, bits, endianness);
                }
            }
        }
    }

    #[test]
    fn test_yuv420p_plane_order() {
        let mut frame = Frame::new(2, 2, PixelFormat::Yuv420p, 8).unwrap();
        frame.plane_mut(0).copy_from_slice(&[1, 2, 3, 4]);
        frame.plane_mut(1)[0] = 5;
        frame.plane_mut(2)[0] = 6;
        assert_eq!(frame.to_bytes(Endianness::Little), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_interleaved_layouts() {
        let mut bgr = Frame::new(1, 1, PixelFormat::Bgr, 8).unwrap();
        bgr.from_bytes(&[3, 2, 1], Endianness::Little).unwrap();
        assert_eq!(bgr.get_pixel(0, 0), PixelValue::rgb(1, 2, 3));

        let mut yuyv = Frame::new(2, 1, PixelFormat::Yuyv422, 8).unwrap();
        yuyv.from_bytes(&[10, 20, 11, 30], Endianness::Little).unwrap();
        assert_eq!(yuyv.get_pixel(0, 0), PixelValue::yuv(10, 20, 30));
        assert_eq!(yuyv.get_pixel(1, 0), PixelValue::yuv(11, 20, 30));
    }

    #[test]
    fn test_byte_order() {
        let mut frame = Frame::new(1, 1, PixelFormat::Gray, 10).unwrap();
        frame.from_bytes(&[0x02, 0x01], Endianness::Big).unwrap();
        assert_eq!(frame.sample(0, 0, 0), 0x0201);
        frame.from_bytes(&[0x02, 0x01], Endianness::Little).unwrap();
        assert_eq!(frame.sample(0, 0, 0), 0x0102);
        assert_eq!(frame.to_bytes(Endianness::Big), vec![0x01, 0x02]);
    }

    #[test]
    fn test_out_of_range_samples_are_zeroed() {
        let mut frame = Frame::new(2, 1, PixelFormat::Gray, 10).unwrap();
        // 0xFFFF exceeds the 10-bit range, 0x03FF is the maximum
        frame
            .from_bytes(&[0xFF, 0xFF, 0xFF, 0x03], Endianness::Little)
            .unwrap();
        assert_eq!(frame.plane(0)[0], 0);
        assert_eq!(frame.plane(0)[1], 0x03FF);
    }

    #[test]
    fn test_out_of_range_samples_are_zeroed_big_endian() {
        let mut frame = Frame::new(2, 1, PixelFormat::Gray, 10).unwrap();
        // 0x04FF is out of range, its low byte alone would not be
        frame
            .from_bytes(&[0x04, 0xFF, 0x03, 0xFF], Endianness::Big)
            .unwrap();
        assert_eq!(frame.plane(0)[0], 0);
        assert_eq!(frame.plane(0)[1], 0x03FF);

        frame
            .from_bytes(&[0xFF, 0x04, 0xFF, 0x03], Endianness::Little)
            .unwrap();
        assert_eq!(frame.plane(0), &[0, 0x03FF]);
    }

    #[test]
    fn test_short_buffer() {
        let mut frame = Frame::new(4, 4, PixelFormat::Gray, 8).unwrap();
        assert!(matches!(
            frame.from_bytes(&[0u8; 15], Endianness::Little),
            Err(Error::ShortRead {
                expected: 16,
                actual: 15
            })
        ));
    }
}
