//! End-of-content detection by frame similarity
//! Compares successive snapshots to decide when scrolling stopped revealing anything new

use serde::{Deserialize, Serialize};
use tracing::debug;

use screenshots::image::imageops::{self, FilterType};
use screenshots::image::GrayImage;

use crate::capture::frame::Frame;

/// Luminance delta below which two pixels count as the same (0-255)
pub const PIXEL_NOISE_THRESHOLD: u8 = 40;
/// Comparison edge; both frames are downscaled to this square size
pub const SAMPLE_EDGE: u32 = 100;

/// Configuration for frame comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityConfig {
    /// Pixel difference threshold (0-255) - higher = less sensitive
    pub pixel_threshold: u8,
    /// Downscale edge in pixels; comparison cost is the square of this
    pub sample_edge: u32,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            pixel_threshold: PIXEL_NOISE_THRESHOLD,
            sample_edge: SAMPLE_EDGE,
        }
    }
}

/// Outcome of comparing two frames
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityResult {
    /// Fraction of sampled pixels matching within the noise threshold, 0.0-1.0
    pub similarity: f64,
    /// Estimated height in source pixels between the lowest changed row and
    /// the bottom edge; only meaningful when similarity is high
    pub remaining_height: u32,
}

/// Seam between the capture loop and the detector
pub trait FrameComparator: Send {
    fn compare(&mut self, current: &Frame, previous: &Frame, step_height: u32)
        -> SimilarityResult;
}

/// Perceptual detector over downscaled luminance images
pub struct SimilarityDetector {
    config: SimilarityConfig,
}

impl SimilarityDetector {
    /// Create a new detector with default config
    pub fn new() -> Self {
        Self {
            config: SimilarityConfig::default(),
        }
    }

    /// Create a new detector with custom config
    pub fn with_config(config: SimilarityConfig) -> Self {
        Self { config }
    }

    /// Get the current config
    pub fn config(&self) -> &SimilarityConfig {
        &self.config
    }

    fn downscale(&self, frame: &Frame) -> GrayImage {
        let edge = self.config.sample_edge;
        let resized = imageops::resize(frame.image(), edge, edge, FilterType::CatmullRom);
        imageops::grayscale(&resized)
    }
}

impl Default for SimilarityDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameComparator for SimilarityDetector {
    fn compare(
        &mut self,
        current: &Frame,
        previous: &Frame,
        _step_height: u32,
    ) -> SimilarityResult {
        let cur = self.downscale(current);
        let prev = self.downscale(previous);
        let threshold = self.config.pixel_threshold as i16;
        let edge = self.config.sample_edge;

        let mut differing = 0usize;
        for (a, b) in cur.pixels().zip(prev.pixels()) {
            if (a.0[0] as i16 - b.0[0] as i16).abs() > threshold {
                differing += 1;
            }
        }
        let total = (edge * edge) as usize;
        let similarity = if total > 0 {
            1.0 - differing as f64 / total as f64
        } else {
            1.0
        };

        // Scan upward from the bottom edge; the first row with a pixel beyond
        // the threshold marks where content stops matching. One downscaled row
        // stands for height/edge source rows.
        let scale = previous.height() as f64 / edge as f64;
        let mut remaining_height = 0u32;
        'rows: for y in (0..edge).rev() {
            for x in 0..edge {
                let a = cur.get_pixel(x, y).0[0] as i16;
                let b = prev.get_pixel(x, y).0[0] as i16;
                if (a - b).abs() > threshold {
                    remaining_height = ((edge - y) as f64 * scale).round() as u32;
                    break 'rows;
                }
            }
        }

        debug!(similarity, remaining_height, "frame comparison");
        SimilarityResult {
            similarity,
            remaining_height,
        }
    }
}
