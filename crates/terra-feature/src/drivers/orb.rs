//! Reference ORB-like (oriented FAST + rotated BRIEF) detector/extractor
//! (§4.5), grounded on
//! `original_source/.../feature/drivers/ocv/Detector_OCV_ORB.{hpp,cpp}` and
//! its paired `Detector_Config_OCV_ORB`.
//!
//! The original delegates to OpenCV's `cv::ORB`, out of scope per §1. This
//! driver implements the same two-stage shape directly: a FAST-style corner
//! test (a contiguous arc of brighter/darker pixels on a Bresenham circle of
//! radius 3) scored by `score_type`, followed by a BRIEF-style binary
//! descriptor sampled from a fixed, deterministic pair pattern over a
//! `patch_size` window — giving `Detector::extract` (§4.5) a real
//! implementation rather than the `NotImplemented` default every other
//! reference driver falls back to.

use std::any::Any;
use std::sync::Arc;

use terra_core::channel::ChannelKind;
use terra_core::pixel_format::PixelFormat;
use terra_view::View;

use crate::detector::{Detector, DetectorConfig};
use crate::error::Result;
use crate::factory::DetectorGenerator;
use crate::interest_point::InterestPoint;
use crate::preprocess::prepare_view;

/// Oriented-FAST-and-rotated-BRIEF configuration (§4.5), field defaults
/// lifted from `Detector_Config_OCV_ORB`'s constructor defaults.
#[derive(Debug, Clone)]
pub struct OrbConfig {
    pub tile_size_pixels: (i64, i64),
    pub max_features: usize,
    pub scale_factor: f32,
    pub num_pyr_levels: i32,
    pub edge_threshold: i32,
    pub base_pyr_level: i32,
    pub wta_k: i32,
    /// `"HARRIS"` or `"FAST"`.
    pub score_type: String,
    pub patch_size: i32,
    pub fast_threshold: u8,
}

impl Default for OrbConfig {
    fn default() -> Self {
        Self {
            tile_size_pixels: (2048, 2048),
            max_features: 500,
            scale_factor: 1.2,
            num_pyr_levels: 8,
            edge_threshold: 31,
            base_pyr_level: 0,
            wta_k: 2,
            score_type: "HARRIS".to_string(),
            patch_size: 31,
            fast_threshold: 20,
        }
    }
}

impl DetectorConfig for OrbConfig {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn allow_custom_tile_size(&self) -> bool {
        true
    }

    fn tile_size_pixels(&self) -> (i64, i64) {
        self.tile_size_pixels
    }

    fn max_features(&self) -> usize {
        self.max_features
    }

    fn supports_feature_descriptors(&self) -> bool {
        true
    }

    fn logger_name(&self) -> &str {
        "orb"
    }
}

/// The 16 offsets of the Bresenham circle of radius 3 around a pixel, in
/// FAST's canonical clockwise order starting at the top.
const FAST_CIRCLE: [(i64, i64); 16] = [
    (0, -3), (1, -3), (2, -2), (3, -1), (3, 0), (3, 1), (2, 2), (1, 3), (0, 3), (-1, 3), (-2, 2), (-3, 1), (-3, 0), (-3, -1), (-2, -2), (-1, -3),
];

/// A deterministic xorshift32, used only to generate a fixed, reproducible
/// BRIEF sampling pattern at construction time — never for detection
/// results, which stay deterministic given the same image.
fn xorshift32(state: &mut u32) -> u32 {
    let mut x = *state;
    x ^= x << 13;
    x ^= x >> 17;
    x ^= x << 5;
    *state = x;
    x
}

/// Reference oriented-corner detector with binary descriptor support.
pub struct OrbDetector {
    config: Arc<OrbConfig>,
    /// Fixed `(dx1, dy1, dx2, dy2)` sample-pair offsets for the BRIEF
    /// descriptor, generated once from a constant seed so descriptors are
    /// reproducible across runs and processes.
    brief_pairs: Vec<(i32, i32, i32, i32)>,
}

impl OrbDetector {
    pub fn new(config: Arc<OrbConfig>) -> Self {
        let half = (config.patch_size / 2).max(1);
        let mut seed = 0x9e3779b9u32;
        let brief_pairs = (0..256)
            .map(|_| {
                let dx1 = (xorshift32(&mut seed) % (2 * half as u32 + 1)) as i32 - half;
                let dy1 = (xorshift32(&mut seed) % (2 * half as u32 + 1)) as i32 - half;
                let dx2 = (xorshift32(&mut seed) % (2 * half as u32 + 1)) as i32 - half;
                let dy2 = (xorshift32(&mut seed) % (2 * half as u32 + 1)) as i32 - half;
                (dx1, dy1, dx2, dy2)
            })
            .collect();
        Self { config, brief_pairs }
    }

    fn at(pixels: &[u8], cols: i64, rows: i64, x: i64, y: i64) -> i32 {
        let x = x.clamp(0, cols - 1);
        let y = y.clamp(0, rows - 1);
        pixels[(y * cols + x) as usize] as i32
    }

    /// FAST corner test: true if 9+ contiguous circle samples are all
    /// brighter, or all darker, than the center by more than `threshold`.
    fn is_fast_corner(pixels: &[u8], cols: i64, rows: i64, x: i64, y: i64, threshold: i32) -> Option<i32> {
        let center = Self::at(pixels, cols, rows, x, y);
        let samples: Vec<i32> = FAST_CIRCLE.iter().map(|(dx, dy)| Self::at(pixels, cols, rows, x + dx, y + dy)).collect();
        let brighter: Vec<bool> = samples.iter().map(|&s| s > center + threshold).collect();
        let darker: Vec<bool> = samples.iter().map(|&s| s < center - threshold).collect();

        let longest_run = |flags: &[bool]| -> usize {
            let n = flags.len();
            let mut best = 0;
            let mut cur = 0;
            for i in 0..2 * n {
                if flags[i % n] {
                    cur += 1;
                    best = best.max(cur);
                } else {
                    cur = 0;
                }
            }
            best.min(n)
        };

        let run = longest_run(&brighter).max(longest_run(&darker));
        if run >= 9 {
            let score: i32 = samples.iter().map(|&s| (s - center).abs()).sum();
            Some(score)
        } else {
            None
        }
    }

    /// Dominant orientation via the intensity centroid (moments) method, the
    /// same construction ORB uses to make BRIEF sampling rotation-aware.
    fn orientation(pixels: &[u8], cols: i64, rows: i64, x: i64, y: i64, radius: i64) -> f64 {
        let (mut m01, mut m10) = (0.0f64, 0.0f64);
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy > radius * radius {
                    continue;
                }
                let v = Self::at(pixels, cols, rows, x + dx, y + dy) as f64;
                m10 += dx as f64 * v;
                m01 += dy as f64 * v;
            }
        }
        m01.atan2(m10)
    }
}

impl Detector for OrbDetector {
    fn required_pixel_format(&self) -> PixelFormat {
        PixelFormat::Gray
    }

    fn required_channel_kind(&self) -> ChannelKind {
        ChannelKind::U8
    }

    fn detect(&self, view: &dyn View, cast_if_unsupported: bool, max_points_override: Option<usize>) -> Result<Vec<InterestPoint>> {
        let prepared = prepare_view(view, PixelFormat::Gray, ChannelKind::U8, cast_if_unsupported)?;
        let src = prepared.as_view();
        let fmt = src.format();
        let (cols, rows) = (fmt.cols, fmt.rows);
        let edge = self.config.edge_threshold as i64;
        if cols <= 2 * edge || rows <= 2 * edge {
            return Ok(Vec::new());
        }

        let mut pixels = vec![0u8; (cols * rows) as usize];
        let mut scratch = [0u8; 1];
        for y in 0..rows {
            for x in 0..cols {
                src.sample(x, y, 0, &mut scratch)?;
                pixels[(y * cols + x) as usize] = scratch[0];
            }
        }

        let mut candidates: Vec<(i64, i64, i32)> = Vec::new();
        for y in edge..rows - edge {
            for x in edge..cols - edge {
                if let Some(score) = Self::is_fast_corner(&pixels, cols, rows, x, y, self.config.fast_threshold as i32) {
                    candidates.push((x, y, score));
                }
            }
        }

        // FAST_SCORE ranks purely by the arc-intensity score computed above;
        // HARRIS_SCORE re-ranks by a cheap local-gradient-variance proxy,
        // matching the original's two `score_type` modes without requiring
        // a full structure-tensor pass for the common FAST case.
        if self.config.score_type.eq_ignore_ascii_case("HARRIS") {
            for c in &mut candidates {
                let (x, y) = (c.0, c.1);
                let gx = Self::at(&pixels, cols, rows, x + 1, y) - Self::at(&pixels, cols, rows, x - 1, y);
                let gy = Self::at(&pixels, cols, rows, x, y + 1) - Self::at(&pixels, cols, rows, x, y - 1);
                c.2 = gx * gx + gy * gy;
            }
        }
        candidates.sort_by(|a, b| b.2.cmp(&a.2));

        let max_points = max_points_override.unwrap_or(self.config.max_features);
        candidates.truncate(max_points.max(1));

        Ok(candidates
            .into_iter()
            .map(|(x, y, score)| {
                let mut p = InterestPoint::new((x as f32, y as f32));
                p.response = score as f32;
                p.angle_rad = Self::orientation(&pixels, cols, rows, x, y, (self.config.patch_size / 2).max(1) as i64) as f32;
                p.octave = self.config.base_pyr_level;
                p
            })
            .collect())
    }

    fn extract(&self, view: &dyn View, points: &mut [InterestPoint], cast_if_unsupported: bool) -> Result<()> {
        let prepared = prepare_view(view, PixelFormat::Gray, ChannelKind::U8, cast_if_unsupported)?;
        let src = prepared.as_view();
        let fmt = src.format();
        let (cols, rows) = (fmt.cols, fmt.rows);

        let mut pixels = vec![0u8; (cols * rows) as usize];
        let mut scratch = [0u8; 1];
        for y in 0..rows {
            for x in 0..cols {
                src.sample(x, y, 0, &mut scratch)?;
                pixels[(y * cols + x) as usize] = scratch[0];
            }
        }

        for p in points.iter_mut() {
            let (cx, cy) = (p.raster_xy.0 as i64, p.raster_xy.1 as i64);
            let angle_rad = p.angle_rad as f64;
            let (cos_a, sin_a) = (angle_rad.cos(), angle_rad.sin());
            let mut descriptor = Vec::with_capacity(self.brief_pairs.len());
            for &(dx1, dy1, dx2, dy2) in &self.brief_pairs {
                // Rotate each sample pair by the keypoint's orientation so
                // the descriptor is (approximately) rotation-invariant, the
                // "rotated BRIEF" half of ORB's name.
                let (rx1, ry1) = (dx1 as f64 * cos_a - dy1 as f64 * sin_a, dx1 as f64 * sin_a + dy1 as f64 * cos_a);
                let (rx2, ry2) = (dx2 as f64 * cos_a - dy2 as f64 * sin_a, dx2 as f64 * sin_a + dy2 as f64 * cos_a);
                let v1 = Self::at(&pixels, cols, rows, cx + rx1.round() as i64, cy + ry1.round() as i64);
                let v2 = Self::at(&pixels, cols, rows, cx + rx2.round() as i64, cy + ry2.round() as i64);
                descriptor.push(if v1 < v2 { 1.0f32 } else { 0.0f32 });
            }
            p.descriptor = descriptor;
        }
        Ok(())
    }

    fn class_name(&self) -> &str {
        "orb"
    }

    fn config(&self) -> Arc<dyn DetectorConfig> {
        self.config.clone()
    }
}

/// Recognizes [`OrbConfig`] and builds an [`OrbDetector`].
pub struct OrbGenerator;

impl DetectorGenerator for OrbGenerator {
    fn name(&self) -> &str {
        "orb"
    }

    fn generate(&self, config: Arc<dyn DetectorConfig>) -> Option<Result<Arc<dyn Detector>>> {
        let config = config.as_any().downcast_ref::<OrbConfig>()?.clone();
        Some(Ok(Arc::new(OrbDetector::new(Arc::new(config)))))
    }
}
