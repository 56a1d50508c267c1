//! `FeatureTileQueue` (§4.5 steps 3-4), grounded on
//! `Interest_Point_Detector_Queue.hpp`: subdivides a view into tiles,
//! detects each tile's share of the keypoint budget in parallel, and
//! reassembles the results in tile order.
//!
//! The original orders its output with a mutex-guarded write queue
//! (`Interest_Point_Write_Task`) so tiles finishing out of order still land
//! in a deterministic position. `rayon`'s `par_iter().map().collect()`
//! already guarantees output order matches input order regardless of
//! completion order, so that queue has no counterpart here.

use std::sync::Arc;

use rayon::prelude::*;
use terra_core::rect::Rect2i;
use terra_view::CropView;
use tracing::debug;

use crate::detector::Detector;
use crate::error::Result;
use crate::interest_point::InterestPoint;
use terra_view::View;

/// Splits a view into `tile_width x tile_height` tiles and runs a detector
/// over each, reassembling keypoints translated back into the untiled
/// view's coordinate space.
pub struct FeatureTileQueue {
    pub tile_width: i64,
    pub tile_height: i64,
}

impl FeatureTileQueue {
    pub fn new(tile_width: i64, tile_height: i64) -> Self {
        Self { tile_width, tile_height }
    }

    /// The per-tile keypoint budget: `tile_area / tile_capacity` of
    /// `total_budget`, rounded up and clamped to `[1, total_budget]` (a
    /// tile with any area at all gets at least one slot, and the last tile
    /// in a row/column — `tile_area < tile_capacity` — still gets a share).
    /// A `total_budget` of zero means unlimited-detection-but-zero-kept, so
    /// every tile gets zero.
    fn tile_budget(tile_area: i64, tile_capacity: i64, total_budget: usize) -> usize {
        if total_budget == 0 || tile_area <= 0 {
            return 0;
        }
        let frac = tile_area as f64 / tile_capacity as f64;
        let n = (frac * total_budget as f64).ceil() as usize;
        n.clamp(1, total_budget)
    }

    /// Detects interest points over the whole of `view`, tile by tile.
    pub fn detect(&self, view: Arc<dyn View>, detector: &dyn Detector, total_budget: usize) -> Result<Vec<InterestPoint>> {
        let full_bbox = view.full_bbox();
        let tiles = full_bbox.subdivide(self.tile_width, self.tile_height);
        let tile_capacity = self.tile_width * self.tile_height;

        let per_tile: Vec<Result<Vec<InterestPoint>>> = tiles
            .par_iter()
            .map(|tile: &Rect2i| {
                let budget = Self::tile_budget(tile.area(), tile_capacity, total_budget);
                let cropped: Arc<dyn View> = Arc::new(CropView::new(view.clone(), tile.min_x, tile.min_y, tile.width, tile.height));
                let mut points = detector.detect(cropped.as_ref(), true, Some(budget))?;
                for p in &mut points {
                    p.translate(tile.min_x as f32, tile.min_y as f32);
                }
                debug!(tile = %tile, found = points.len(), budget, "tile detected");
                Ok(points)
            })
            .collect();

        let mut out = Vec::new();
        for tile_points in per_tile {
            out.extend(tile_points?);
        }
        Ok(out)
    }
}
