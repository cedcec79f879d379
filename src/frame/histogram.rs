//! Per-channel sample histograms and the statistics derived from them

use super::Frame;
use crate::format::ColorSpace;

/// Channel selector for histogram queries.
///
/// Symbolic channels resolve to a histogram row according to the frame's
/// color space; RGB and RGBA frames carry an extra synthetic luma row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistogramChannel {
    /// Raw channel index (0..=3)
    Index(usize),
    Luma,
    ChromaU,
    ChromaV,
    ColorR,
    ColorG,
    ColorB,
    ColorA,
    /// Every row at once; only meaningful for whole-histogram queries
    All,
}

impl From<usize> for HistogramChannel {
    fn from(idx: usize) -> Self {
        HistogramChannel::Index(idx)
    }
}

/// Resolved histogram row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Row {
    One(usize),
    All,
}

/// Sample counts, one row of `segments` bins per histogram channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram {
    color_space: ColorSpace,
    segments: usize,
    channels: usize,
    bins: Vec<u32>,
}

impl Histogram {
    /// Count every sample of `frame`
    pub fn compute(frame: &Frame) -> Self {
        let color_space = frame.color_space();
        let segments = 1usize << frame.bits();
        let with_luma = matches!(color_space, ColorSpace::Rgb | ColorSpace::Rgba);
        let channels = frame.channels() + usize::from(with_luma);
        let mut bins = vec![0u32; segments * channels];

        for ch in 0..frame.channels() {
            let row = &mut bins[ch * segments..(ch + 1) * segments];
            for &s in frame.plane(ch) {
                row[(s as usize).min(segments - 1)] += 1;
            }
        }

        if with_luma {
            let row = &mut bins[(channels - 1) * segments..];
            for y in 0..frame.height() {
                for x in 0..frame.width() {
                    let luma = frame.get_pixel_as(x, y, ColorSpace::Yuv)[0];
                    row[(luma.max(0) as usize).min(segments - 1)] += 1;
                }
            }
        }

        Self {
            color_space,
            segments,
            channels,
            bins,
        }
    }

    /// Bins per channel
    pub fn segments(&self) -> usize {
        self.segments
    }

    /// Number of histogram rows, including the synthetic luma row
    pub fn channels(&self) -> usize {
        self.channels
    }

    fn resolve(&self, channel: HistogramChannel) -> Option<Row> {
        use HistogramChannel::*;
        let real = match (channel, self.color_space) {
            (All, _) => return Some(Row::All),
            (Index(i), _) if i < 4 => i,
            (Luma, ColorSpace::Gray | ColorSpace::Yuv) => 0,
            (ChromaU, ColorSpace::Yuv) => 1,
            (ChromaV, ColorSpace::Yuv) => 2,
            (Luma, ColorSpace::Rgb | ColorSpace::Rgba) => self.channels - 1,
            (ColorR, ColorSpace::Rgb | ColorSpace::Rgba) => 0,
            (ColorG, ColorSpace::Rgb | ColorSpace::Rgba) => 1,
            (ColorB, ColorSpace::Rgb | ColorSpace::Rgba) => 2,
            (ColorA, ColorSpace::Rgb | ColorSpace::Rgba) => 3,
            _ => return None,
        };
        (real < self.channels).then_some(Row::One(real))
    }

    fn row(&self, idx: usize) -> &[u32] {
        &self.bins[idx * self.segments..(idx + 1) * self.segments]
    }

    fn rows(&self, row: Row) -> impl Iterator<Item = &[u32]> {
        let range = match row {
            Row::One(i) => i..i + 1,
            Row::All => 0..self.channels,
        };
        range.map(move |i| self.row(i))
    }

    /// Resolve a single row and validate `start..=end`
    fn ranged(&self, channel: HistogramChannel, start: usize, end: usize) -> Option<&[u32]> {
        if start > end || end > self.segments - 1 {
            return None;
        }
        match self.resolve(channel)? {
            Row::One(i) => Some(&self.row(i)[start..=end]),
            Row::All => None,
        }
    }

    /// Smallest sample value present
    pub fn min_value(&self, channel: HistogramChannel) -> Option<u32> {
        self.rows(self.resolve(channel)?)
            .filter_map(|row| row.iter().position(|&c| c > 0))
            .min()
            .map(|v| v as u32)
    }

    /// Largest sample value present
    pub fn max_value(&self, channel: HistogramChannel) -> Option<u32> {
        self.rows(self.resolve(channel)?)
            .filter_map(|row| row.iter().rposition(|&c| c > 0))
            .max()
            .map(|v| v as u32)
    }

    /// Number of non-empty bins
    pub fn non_empty_bins(&self, channel: HistogramChannel) -> u32 {
        self.resolve(channel)
            .map(|r| {
                self.rows(r)
                    .map(|row| row.iter().filter(|&&c| c > 0).count() as u32)
                    .sum()
            })
            .unwrap_or(0)
    }

    /// Highest bin count
    pub fn max_bin_count(&self, channel: HistogramChannel) -> u32 {
        self.resolve(channel)
            .and_then(|r| self.rows(r).filter_map(|row| row.iter().copied().max()).max())
            .unwrap_or(0)
    }

    /// Count of a single bin
    pub fn value(&self, channel: HistogramChannel, bin: usize) -> u32 {
        self.ranged(channel, bin, bin).map(|r| r[0]).unwrap_or(0)
    }

    /// Samples with a value in `start..=end`
    pub fn count_in_range(&self, channel: HistogramChannel, start: usize, end: usize) -> u32 {
        self.ranged(channel, start, end)
            .map(|r| r.iter().sum())
            .unwrap_or(0)
    }

    /// Mean sample value over `start..=end`
    pub fn mean(&self, channel: HistogramChannel, start: usize, end: usize) -> f64 {
        let Some(bins) = self.ranged(channel, start, end) else {
            return 0.0;
        };
        let sum: f64 = weighted(bins, start).map(|(v, c)| v * c).sum();
        let count: f64 = bins.iter().map(|&c| c as f64).sum();
        if count > 0.0 {
            sum / count
        } else {
            sum
        }
    }

    /// First value at which the cumulative count passes half the range total
    pub fn median(&self, channel: HistogramChannel, start: usize, end: usize) -> u32 {
        let Some(bins) = self.ranged(channel, start, end) else {
            return 0;
        };
        let count: f64 = bins.iter().map(|&c| c as f64).sum();
        let mut sum = 0.0;
        for (v, c) in weighted(bins, start) {
            sum += c;
            if sum * 2.0 > count {
                return v as u32;
            }
        }
        0
    }

    /// Sample standard deviation over `start..=end`
    pub fn std_dev(&self, channel: HistogramChannel, start: usize, end: usize) -> f64 {
        let Some(bins) = self.ranged(channel, start, end) else {
            return 0.0;
        };
        let mean = self.mean(channel, start, end);
        let mut count: f64 = bins.iter().map(|&c| c as f64).sum();
        if count == 0.0 {
            count = 1.0;
        }
        if count <= 1.0 {
            return 0.0;
        }
        let sq: f64 = weighted(bins, start).map(|(v, c)| v * v * c).sum();
        ((sq - count * mean * mean) / (count - 1.0)).max(0.0).sqrt()
    }

    /// Shannon entropy in bits over `start..=end`
    pub fn entropy(&self, channel: HistogramChannel, start: usize, end: usize) -> f64 {
        let Some(bins) = self.ranged(channel, start, end) else {
            return 0.0;
        };
        let total: f64 = bins.iter().map(|&c| c as f64).sum();
        if total == 0.0 {
            return 0.0;
        }
        bins.iter()
            .filter(|&&c| c > 0)
            .map(|&c| {
                let p = c as f64 / total;
                -p * p.log2()
            })
            .sum()
    }
}

/// (value, count) pairs for a bin slice starting at `start`
fn weighted(bins: &[u32], start: usize) -> impl Iterator<Item = (f64, f64)> + '_ {
    bins.iter()
        .enumerate()
        .map(move |(i, &c)| ((start + i) as f64, c as f64))
}

impl Frame {
    /// Compute the histogram if not cached yet
    pub fn calc_histogram(&self) -> &Histogram {
        self.histogram.get_or_init(|| Histogram::compute(self))
    }

    /// Cached histogram, if computed since the last mutation
    pub fn histogram(&self) -> Option<&Histogram> {
        self.histogram.get()
    }

    /// Smallest value present, `None` without a histogram or for an invalid
    /// channel
    pub fn min_pel_value(&self, channel: HistogramChannel) -> Option<u32> {
        self.histogram()?.min_value(channel)
    }

    /// Largest value present, `None` without a histogram or for an invalid
    /// channel
    pub fn max_pel_value(&self, channel: HistogramChannel) -> Option<u32> {
        self.histogram()?.max_value(channel)
    }

    pub fn non_empty_bins(&self, channel: HistogramChannel) -> u32 {
        self.histogram()
            .map(|h| h.non_empty_bins(channel))
            .unwrap_or(0)
    }

    pub fn max_bin_count(&self, channel: HistogramChannel) -> u32 {
        self.histogram()
            .map(|h| h.max_bin_count(channel))
            .unwrap_or(0)
    }

    pub fn histogram_value(&self, channel: HistogramChannel, bin: usize) -> u32 {
        self.histogram()
            .map(|h| h.value(channel, bin))
            .unwrap_or(0)
    }

    pub fn count_in_range(&self, channel: HistogramChannel, start: usize, end: usize) -> u32 {
        self.histogram()
            .map(|h| h.count_in_range(channel, start, end))
            .unwrap_or(0)
    }

    pub fn mean(&self, channel: HistogramChannel, start: usize, end: usize) -> f64 {
        self.histogram()
            .map(|h| h.mean(channel, start, end))
            .unwrap_or(0.0)
    }

    pub fn median(&self, channel: HistogramChannel, start: usize, end: usize) -> u32 {
        self.histogram()
            .map(|h| h.median(channel, start, end))
            .unwrap_or(0)
    }

    pub fn std_dev(&self, channel: HistogramChannel, start: usize, end: usize) -> f64 {
        self.histogram()
            .map(|h| h.std_dev(channel, start, end))
            .unwrap_or(0.0)
    }

    pub fn entropy(&self, channel: HistogramChannel, start: usize, end: usize) -> f64 {
        self.histogram()
            .map(|h| h.entropy(channel, start, end))
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::PixelFormat;
    use crate::pixel::PixelValue;

    const Y: HistogramChannel = HistogramChannel::Index(0);

    #[test]
    fn test_uniform_gray_frame() {
        let mut frame = Frame::new(4, 4, PixelFormat::Gray, 8).unwrap();
        for y in 0..4 {
            for x in 0..4 {
                frame.set_pixel(x, y, PixelValue::gray(128));
            }
        }
        let hist = frame.calc_histogram();
        assert_eq!(hist.segments(), 256);
        assert_eq!(hist.channels(), 1);
        assert_eq!(hist.value(Y, 128), 16);
        assert_eq!(hist.count_in_range(Y, 0, 255), 16);
        assert_eq!(hist.count_in_range(Y, 0, 127), 0);

        assert_eq!(frame.mean(Y, 0, 255), 128.0);
        assert_eq!(frame.median(Y, 0, 255), 128);
        assert_eq!(frame.std_dev(Y, 0, 255), 0.0);
        assert_eq!(frame.entropy(Y, 0, 255), 0.0);
        assert_eq!(frame.non_empty_bins(Y), 1);
        assert_eq!(frame.max_bin_count(Y), 16);
        assert_eq!(frame.min_pel_value(Y), Some(128));
        assert_eq!(frame.max_pel_value(HistogramChannel::Luma), Some(128));
    }

    #[test]
    fn test_queries_without_histogram() {
        let frame = Frame::new(4, 4, PixelFormat::Gray, 8).unwrap();
        assert_eq!(frame.min_pel_value(Y), None);
        assert_eq!(frame.mean(Y, 0, 255), 0.0);
        assert_eq!(frame.count_in_range(Y, 0, 255), 0);
    }

    #[test]
    fn test_all_zero_frame_is_not_absent() {
        let frame = Frame::new(2, 2, PixelFormat::Gray, 8).unwrap();
        frame.calc_histogram();
        assert_eq!(frame.min_pel_value(Y), Some(0));
        assert_eq!(frame.max_pel_value(Y), Some(0));
        // Channel 1 does not exist in a gray frame
        assert_eq!(frame.min_pel_value(HistogramChannel::Index(1)), None);
        assert_eq!(frame.min_pel_value(HistogramChannel::ChromaU), None);
    }

    #[test]
    fn test_invalid_ranges() {
        let frame = Frame::new(2, 2, PixelFormat::Gray, 8).unwrap();
        frame.calc_histogram();
        assert_eq!(frame.count_in_range(Y, 10, 5), 0);
        assert_eq!(frame.count_in_range(Y, 0, 256), 0);
        assert_eq!(frame.count_in_range(HistogramChannel::All, 0, 255), 0);
    }

    #[test]
    fn test_rgb_has_synthetic_luma() {
        let mut frame = Frame::new(2, 1, PixelFormat::Rgb, 8).unwrap();
        frame.set_pixel(0, 0, PixelValue::rgb(255, 255, 255));
        frame.set_pixel(1, 0, PixelValue::rgb(0, 0, 0));
        let hist = frame.calc_histogram();
        assert_eq!(hist.channels(), 4);
        assert_eq!(hist.value(HistogramChannel::Luma, 255), 1);
        assert_eq!(hist.value(HistogramChannel::Luma, 0), 1);
        assert_eq!(hist.value(HistogramChannel::ColorR, 255), 1);
        // RGB has no alpha row; index 3 is the luma row
        assert_eq!(hist.value(HistogramChannel::ColorA, 0), 1);
        assert_eq!(hist.value(HistogramChannel::ChromaU, 0), 0);
        assert_eq!(hist.min_value(HistogramChannel::All), Some(0));
        assert_eq!(hist.max_value(HistogramChannel::All), Some(255));
        assert_eq!(hist.non_empty_bins(HistogramChannel::All), 8);
    }

    #[test]
    fn test_statistics() {
        let mut frame = Frame::new(4, 1, PixelFormat::Gray, 8).unwrap();
        for (x, v) in [10, 20, 30, 40].into_iter().enumerate() {
            frame.set_pixel(x as u32, 0, PixelValue::gray(v));
        }
        frame.calc_histogram();
        assert_eq!(frame.mean(Y, 0, 255), 25.0);
        assert_eq!(frame.median(Y, 0, 255), 30);
        let expected = ((100.0 + 400.0 + 900.0 + 1600.0 - 4.0 * 625.0) / 3.0f64).sqrt();
        assert!((frame.std_dev(Y, 0, 255) - expected).abs() < 1e-9);
        assert!((frame.entropy(Y, 0, 255) - 2.0).abs() < 1e-12);
        assert_eq!(frame.mean(Y, 15, 35), 25.0);
        assert_eq!(frame.count_in_range(Y, 15, 35), 2);
    }
}
