//! Blank-paper heuristic
//!
//! The classifier vocabulary has no "paper" class, so a held sheet is
//! approximated from image statistics instead: a large bright region in
//! the lower part of the frame whose bright rows span a contiguous
//! vertical band. A global brightness ratio alone would trigger on bright
//! backgrounds; the row-consistency band is what separates a rectangular
//! sheet from scattered highlights.

use image::imageops::{self, FilterType};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::capture::frame::Frame;

/// Thresholds governing the paper heuristic
///
/// All values apply to the downscaled analysis resolution, not the source
/// resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeuristicConfig {
    /// Square edge length frames are downscaled to before analysis
    pub target_size: u32,
    /// Fraction of the downscaled height skipped from the top; analysis
    /// covers the region below it
    pub region_offset: f32,
    /// Mean-channel brightness above which a pixel counts as bright (0-255)
    pub brightness_cutoff: f32,
    /// Minimum fraction of bright pixels over the region area
    pub bright_ratio_cutoff: f32,
    /// Vertical sub-band of the region checked for row consistency, as
    /// (start, end) fractions of the region height
    pub mid_band: (f32, f32),
    /// Fraction of the region width a row's bright count must exceed for
    /// the row to count as consistent
    pub row_span_cutoff: f32,
    /// Minimum fraction of consistent rows over the mid-band
    pub consist_ratio_cutoff: f32,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            target_size: 224,
            region_offset: 0.45,
            brightness_cutoff: 225.0,
            bright_ratio_cutoff: 0.05,
            mid_band: (0.20, 0.75),
            row_span_cutoff: 0.20,
            consist_ratio_cutoff: 0.35,
        }
    }
}

/// Brightness statistics over the analysis region
#[derive(Debug, Default, Clone, Copy)]
struct RegionStats {
    bright_ratio: f32,
    consist_ratio: f32,
}

/// Brightness/geometry detector for a held blank sheet
#[derive(Debug, Clone)]
pub struct PaperHeuristic {
    config: HeuristicConfig,
}

impl PaperHeuristic {
    /// Create a heuristic with the given thresholds
    pub fn new(config: HeuristicConfig) -> Self {
        Self { config }
    }

    /// Assess one frame for a candidate blank sheet.
    ///
    /// Total and deterministic: identical pixels always produce the same
    /// answer, and no frame can make it fail. A buffer whose length does
    /// not match its dimensions reads as "nothing found".
    pub fn assess(&self, frame: &Frame) -> bool {
        let Some(image) = frame.to_rgba_image() else {
            return false;
        };
        let stats = self.region_stats(&image);
        debug!(
            "paper heuristic: bright {:.3}, consistency {:.3}",
            stats.bright_ratio, stats.consist_ratio
        );
        stats.bright_ratio > self.config.bright_ratio_cutoff
            && stats.consist_ratio > self.config.consist_ratio_cutoff
    }

    fn region_stats(&self, image: &RgbaImage) -> RegionStats {
        let size = self.config.target_size;
        if size == 0 {
            return RegionStats::default();
        }
        let scaled = imageops::resize(image, size, size, FilterType::Triangle);

        let width = size as usize;
        let y0 = ((size as f32 * self.config.region_offset).floor() as usize).min(size as usize);
        let region_height = size as usize - y0;
        if region_height == 0 {
            return RegionStats::default();
        }

        // Per-row bright-pixel counts across the analysis region
        let mut bright_total = 0usize;
        let mut row_counts = vec![0usize; region_height];
        for (row, count) in row_counts.iter_mut().enumerate() {
            let y = (y0 + row) as u32;
            for x in 0..size {
                let px = scaled.get_pixel(x, y).0;
                let brightness = (px[0] as f32 + px[1] as f32 + px[2] as f32) / 3.0;
                if brightness > self.config.brightness_cutoff {
                    *count += 1;
                }
            }
            bright_total += *count;
        }
        let bright_ratio = bright_total as f32 / (width * region_height) as f32;

        // A row is consistent when its bright span exceeds the width cutoff;
        // only rows inside the mid-band count toward the ratio.
        let band_start = (region_height as f32 * self.config.mid_band.0).floor() as usize;
        let band_end = ((region_height as f32 * self.config.mid_band.1).floor() as usize)
            .min(region_height);
        let row_span_min = width as f32 * self.config.row_span_cutoff;
        let consist_ratio = if band_end > band_start {
            let consistent = row_counts[band_start..band_end]
                .iter()
                .filter(|&&count| count as f32 > row_span_min)
                .count();
            consistent as f32 / (band_end - band_start) as f32
        } else {
            0.0
        };

        RegionStats {
            bright_ratio,
            consist_ratio,
        }
    }
}
