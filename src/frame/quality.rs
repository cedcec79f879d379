//! Full-reference quality metrics between two frames of the same format

use super::{FormatMatch, Frame};
use crate::error::{Error, Result};
use std::f64::consts::PI;
use std::fmt;

/// PSNR reported for identical channels
const PSNR_IDENTICAL: f64 = 100.0;

const SSIM_K1: f64 = 0.01;
const SSIM_K2: f64 = 0.03;
const SSIM_LUMA_WINDOW: u32 = 8;
const SSIM_CHROMA_WINDOW: u32 = 4;

/// Supported quality metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QualityMetric {
    Psnr,
    Mse,
    Ssim,
    /// PSNR weighted for equirectangular projection
    WsPsnr,
}

/// Every metric, in display order
pub const QUALITY_METRICS: [QualityMetric; 4] = [
    QualityMetric::Psnr,
    QualityMetric::Mse,
    QualityMetric::Ssim,
    QualityMetric::WsPsnr,
];

impl QualityMetric {
    pub fn name(&self) -> &'static str {
        match self {
            QualityMetric::Psnr => "PSNR",
            QualityMetric::Mse => "MSE",
            QualityMetric::Ssim => "SSIM",
            QualityMetric::WsPsnr => "WS-PSNR",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            QualityMetric::Psnr | QualityMetric::WsPsnr => "dB",
            QualityMetric::Mse | QualityMetric::Ssim => "",
        }
    }

    /// Look a metric up by name, ignoring case
    pub fn from_name(name: &str) -> Option<Self> {
        QUALITY_METRICS
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for QualityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for QualityMetric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s).ok_or_else(|| Error::Unsupported(format!("quality metric {}", s)))
    }
}

impl Frame {
    /// Compute `metric` for one channel against `reference`.
    ///
    /// Returns 0 when the frames differ in format or the channel does not
    /// exist; use [`Frame::try_quality`] to see why.
    pub fn quality(&self, metric: QualityMetric, reference: &Frame, channel: usize) -> f64 {
        self.try_quality(metric, reference, channel).unwrap_or(0.0)
    }

    /// Compute `metric` for one channel, failing on a format mismatch
    pub fn try_quality(&self, metric: QualityMetric, reference: &Frame, channel: usize) -> Result<f64> {
        self.require_format(
            reference,
            FormatMatch::COLOR_SPACE
                | FormatMatch::RESOLUTION
                | FormatMatch::PEL_FMT
                | FormatMatch::BITS,
            "quality",
        )?;
        if channel >= self.channels() {
            return Err(Error::IncompatibleFormat(format!(
                "channel {} of a {}-channel frame",
                channel,
                self.channels()
            )));
        }
        Ok(match metric {
            QualityMetric::Psnr => self.psnr(reference, channel),
            QualityMetric::Mse => self.mse(reference, channel),
            QualityMetric::Ssim => self.ssim(reference, channel),
            QualityMetric::WsPsnr => self.ws_psnr(reference, channel),
        })
    }

    fn ssd(&self, reference: &Frame, channel: usize) -> f64 {
        self.plane(channel)
            .iter()
            .zip(reference.plane(channel))
            .map(|(&a, &b)| {
                let d = a as f64 - b as f64;
                d * d
            })
            .sum()
    }

    fn mse(&self, reference: &Frame, channel: usize) -> f64 {
        let ssd = self.ssd(reference, channel);
        if ssd == 0.0 {
            return 0.0;
        }
        ssd / self.channel_len(channel) as f64
    }

    fn psnr(&self, reference: &Frame, channel: usize) -> f64 {
        let mse = self.mse(reference, channel);
        if mse == 0.0 {
            return PSNR_IDENTICAL;
        }
        let max = self.max_value() as f64;
        10.0 * (max * max / mse).log10()
    }

    fn ssim(&self, reference: &Frame, channel: usize) -> f64 {
        let width = self.channel_width(channel);
        let height = self.channel_height(channel);
        let window = if channel == 0 {
            SSIM_LUMA_WINDOW
        } else {
            SSIM_CHROMA_WINDOW
        };
        let win_w = window.min(width);
        let win_h = window.min(height);

        let max = self.max_value() as f64;
        let c1 = (SSIM_K1 * max).powi(2);
        let c2 = (SSIM_K2 * max).powi(2);

        let a = self.plane(channel);
        let b = reference.plane(channel);
        let n = (win_w * win_h) as f64;
        let stride = width as usize;

        let mut total = 0.0;
        let mut windows = 0u32;
        let mut y = 0;
        while y + win_h <= height {
            let mut x = 0;
            while x + win_w <= width {
                let (mut sa, mut sb, mut saa, mut sbb, mut sab) = (0.0, 0.0, 0.0, 0.0, 0.0);
                for wy in y..y + win_h {
                    let row = wy as usize * stride;
                    for wx in x..x + win_w {
                        let pa = a[row + wx as usize] as f64;
                        let pb = b[row + wx as usize] as f64;
                        sa += pa;
                        sb += pb;
                        saa += pa * pa;
                        sbb += pb * pb;
                        sab += pa * pb;
                    }
                }
                let mean_a = sa / n;
                let mean_b = sb / n;
                let var_a = (saa - sa * mean_a) / n;
                let var_b = (sbb - sb * mean_b) / n;
                let cov = (sab - sa * mean_b) / n;

                total += ((2.0 * mean_a * mean_b + c1) * (2.0 * cov + c2))
                    / ((mean_a * mean_a + mean_b * mean_b + c1) * (var_a + var_b + c2));
                windows += 1;
                x += win_w;
            }
            y += win_h;
        }

        let ssim = if windows > 0 { total / windows as f64 } else { 0.0 };
        // Rounding noise can push identical windows slightly above 1
        if (1.0..1.01).contains(&ssim) {
            1.0
        } else {
            ssim
        }
    }

    fn ws_psnr(&self, reference: &Frame, channel: usize) -> f64 {
        let width = self.channel_width(channel) as usize;
        let height = self.channel_height(channel);
        let a = self.plane(channel);
        let b = reference.plane(channel);

        let (mut ssd, mut weights) = (0.0, 0.0);
        for y in 0..height {
            let weight = ((y as f64 + 0.5 - height as f64 / 2.0) * PI / height as f64).cos();
            let row = y as usize * width;
            for i in row..row + width {
                let d = a[i] as f64 - b[i] as f64;
                ssd += d * d * weight;
                weights += weight;
            }
        }

        if ssd == 0.0 {
            return PSNR_IDENTICAL;
        }
        let max = self.max_value() as f64;
        10.0 * (max * max * weights / ssd).log10()
    }
}
