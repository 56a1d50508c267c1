//! `BlockRasterizer` (§4.3, §5): a mutex-guarded pull-dispatch thread pool,
//! grounded directly on `Block_Processor.hpp`'s `Block_Thread::Info` —
//! worker threads race to grab the next block-sized bbox from a shared
//! cursor rather than being handed a static slice of work up front, so a
//! slow block never stalls the threads that finished their share early.

use std::sync::Mutex;

use terra_core::rect::Rect2i;

use crate::round_down::round_down;

/// Default worker count (§4.3): a quarter of available hardware
/// parallelism, never fewer than 2 — the original's rationale is that block
/// rasterization is usually I/O- or cache-bound, so oversubscribing CPU
/// threads past this buys little.
pub fn default_num_threads() -> usize {
    let hw = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4);
    (hw / 4).max(2)
}

/// A shared cursor over a row-major grid of block-sized bboxes, grid-aligned
/// via `round_down` against `align_bbox`'s origin but only iterated (and
/// clipped) over `iterate_bbox`.
///
/// These differ when a caller rasterizes a sub-region of a larger view: the
/// grid must still line up with the view's full-image tiling (so the block
/// cache's keys are stable across different requested sub-regions), even
/// though only `iterate_bbox`'s blocks are actually produced this call.
struct BlockCursor {
    iterate_bbox: Rect2i,
    block_width: i64,
    block_height: i64,
    start_x: i64,
    block_bbox: Rect2i,
}

impl BlockCursor {
    fn new(align_bbox: Rect2i, iterate_bbox: Rect2i, block_width: i64, block_height: i64) -> Self {
        let grid_x = round_down(align_bbox.min_x, block_width);
        let grid_y = round_down(align_bbox.min_y, block_height);
        // Enter the grid at the row/column that actually covers iterate_bbox's origin.
        let start_x = grid_x + round_down(iterate_bbox.min_x - grid_x, block_width);
        let start_y = grid_y + round_down(iterate_bbox.min_y - grid_y, block_height);
        Self {
            iterate_bbox,
            block_width,
            block_height,
            start_x,
            block_bbox: Rect2i::new(start_x, start_y, block_width, block_height),
        }
    }

    fn complete(&self) -> bool {
        self.block_bbox.min_y >= self.iterate_bbox.max_y()
    }

    /// The current block clipped to `iterate_bbox` — what gets handed to a
    /// worker. May be empty at the grid's ragged right/bottom edge.
    fn bbox(&self) -> Rect2i {
        self.block_bbox.intersection(self.iterate_bbox)
    }

    fn advance(&mut self) {
        self.block_bbox.min_x += self.block_width;
        if self.block_bbox.min_x >= self.iterate_bbox.max_x() {
            self.block_bbox.min_x = self.start_x;
            self.block_bbox.min_y += self.block_height;
        }
    }
}

fn run_worker<F>(cursor: &Mutex<BlockCursor>, apply: &F)
where
    F: Fn(Rect2i) + Send + Sync,
{
    loop {
        let bbox = {
            let mut cursor = cursor.lock().expect("block cursor mutex poisoned");
            if cursor.complete() {
                break;
            }
            let bbox = cursor.bbox();
            cursor.advance();
            bbox
        };
        if !bbox.is_empty() {
            apply(bbox);
        }
    }
}

/// Drives `apply` once per block-sized (and edge-clipped) bbox covering
/// `iterate_bbox`, in parallel across `num_threads` worker threads. The grid
/// itself is aligned to `align_bbox`'s origin (typically a view's full
/// `full_bbox`) so requests for different sub-regions of the same view
/// produce the same block boundaries.
///
/// `num_threads <= 1` bypasses thread spawning entirely and runs the single
/// worker inline, matching the original's single-thread fast path.
pub fn run_blocks<F>(align_bbox: Rect2i, iterate_bbox: Rect2i, block_width: i64, block_height: i64, num_threads: usize, apply: F)
where
    F: Fn(Rect2i) + Send + Sync,
{
    let cursor = Mutex::new(BlockCursor::new(align_bbox, iterate_bbox, block_width, block_height));
    if num_threads <= 1 {
        run_worker(&cursor, &apply);
        return;
    }
    std::thread::scope(|scope| {
        for _ in 0..num_threads {
            scope.spawn(|| run_worker(&cursor, &apply));
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    #[test]
    fn single_thread_covers_every_pixel_exactly_once() {
        let total = Rect2i::new(0, 0, 10, 7);
        let seen = StdMutex::new(vec![0u32; 70]);
        run_blocks(total, total, 4, 4, 1, |bbox| {
            let mut seen = seen.lock().unwrap();
            for y in bbox.min_y..bbox.max_y() {
                for x in bbox.min_x..bbox.max_x() {
                    seen[(y * 10 + x) as usize] += 1;
                }
            }
        });
        assert!(seen.lock().unwrap().iter().all(|&c| c == 1));
    }

    #[test]
    fn multi_thread_covers_every_pixel_exactly_once() {
        let total = Rect2i::new(-3, -2, 37, 29);
        let seen = StdMutex::new(vec![0u32; (37 * 29) as usize]);
        run_blocks(total, total, 6, 5, 4, |bbox| {
            let mut seen = seen.lock().unwrap();
            for y in bbox.min_y..bbox.max_y() {
                for x in bbox.min_x..bbox.max_x() {
                    let idx = (y - total.min_y) * 37 + (x - total.min_x);
                    seen[idx as usize] += 1;
                }
            }
        });
        assert!(seen.lock().unwrap().iter().all(|&c| c == 1));
    }

    #[test]
    fn negative_origin_grid_still_aligns_to_zero() {
        let total = Rect2i::new(-5, -5, 20, 20);
        let cursor = BlockCursor::new(total, total, 8, 8);
        assert_eq!(cursor.block_bbox.min_x, -8);
        assert_eq!(cursor.block_bbox.min_y, -8);
    }

    #[test]
    fn sub_region_request_stays_aligned_to_the_full_grid() {
        // A sub-region request (iterate_bbox) not starting on a grid boundary
        // must still produce blocks aligned to align_bbox's grid, so the same
        // physical blocks are addressed regardless of which sub-region asked
        // for them.
        let full = Rect2i::new(0, 0, 20, 20);
        let sub = Rect2i::new(5, 5, 10, 10);
        let seen = StdMutex::new(vec![0u32; 100]);
        run_blocks(full, sub, 8, 8, 1, |bbox| {
            let mut seen = seen.lock().unwrap();
            for y in bbox.min_y..bbox.max_y() {
                for x in bbox.min_x..bbox.max_x() {
                    let idx = (y - sub.min_y) * 10 + (x - sub.min_x);
                    seen[idx as usize] += 1;
                }
            }
        });
        assert!(seen.lock().unwrap().iter().all(|&c| c == 1));
    }
}
