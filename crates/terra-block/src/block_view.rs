//! `BlockRasterizeView` (§4.2, §4.3): a view that materializes its parent in
//! grid-aligned blocks, optionally through a shared `TileCache`, and drives
//! `rasterize` across worker threads via `BlockRasterizer`.
//!
//! Assigned to `terra-block` rather than `terra-view` (see DESIGN.md)
//! because it is the one view whose implementation genuinely needs the tile
//! cache and parallel dispatch machinery that live here.

use std::sync::Arc;

use terra_core::format::{ImageBuffer, ImageFormat};
use terra_core::rect::Rect2i;
use terra_view::View;

use crate::block_grid::{default_block_size, BlockGeneratorManager};
use crate::error::Result;
use crate::rasterizer::{default_num_threads, run_blocks};
use crate::tile_cache::{TileCache, TileGenerator, TileKey};

/// Wraps a raw pointer to a destination buffer so disjoint per-block writes
/// can cross worker-thread boundaries. Safe only because `BlockRasterizer`
/// guarantees every dispatched block's `(col, row)` range is disjoint from
/// every other block's — no two workers ever write the same byte.
struct RasterTarget {
    ptr: *mut u8,
    cstride: i64,
    rstride: i64,
    pstride: i64,
}

unsafe impl Send for RasterTarget {}
unsafe impl Sync for RasterTarget {}

impl RasterTarget {
    /// # Safety
    /// `col, row, plane` must lie within the destination buffer this target
    /// was built from, and no other live reference may alias the returned
    /// slice's bytes.
    unsafe fn pixel_mut(&self, col: i64, row: i64, plane: i64, bpp: usize) -> &mut [u8] {
        let offset = (col * self.cstride + row * self.rstride + plane * self.pstride) as usize;
        unsafe { std::slice::from_raw_parts_mut(self.ptr.add(offset), bpp) }
    }
}

/// A lazy view that rasterizes its parent one grid-aligned block at a time,
/// in parallel, with each block optionally resident in a shared `TileCache`.
pub struct BlockRasterizeView {
    parent: Arc<dyn View>,
    block_width: i64,
    block_height: i64,
    num_threads: usize,
    cache: Option<Arc<TileCache>>,
    resource_id: u64,
}

impl BlockRasterizeView {
    /// Builds a view over `parent` with the default block size (§4.3) and
    /// worker count, uncached.
    pub fn new(parent: Arc<dyn View>) -> Result<Self> {
        let (block_width, block_height) = default_block_size(parent.format())?;
        Ok(Self { parent, block_width, block_height, num_threads: default_num_threads(), cache: None, resource_id: 0 })
    }

    pub fn with_block_size(mut self, block_width: i64, block_height: i64) -> Self {
        self.block_width = block_width;
        self.block_height = block_height;
        self
    }

    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads.max(1);
        self
    }

    /// Routes block generation through `cache`, keyed under `resource_id`
    /// (distinguishes this view's blocks from any other view sharing the
    /// same cache).
    pub fn with_cache(mut self, cache: Arc<TileCache>, resource_id: u64) -> Self {
        self.cache = Some(cache);
        self.resource_id = resource_id;
        self
    }

    fn manager(&self) -> BlockGeneratorManager {
        BlockGeneratorManager::new(self.parent.clone(), self.block_width, self.block_height)
    }

    fn tile_key(&self, plane: i64, block_col: i64, block_row: i64) -> TileKey {
        TileKey {
            resource_id: self.resource_id,
            plane,
            block_col,
            block_row,
            block_width: self.block_width,
            block_height: self.block_height,
        }
    }

    /// Fetches one plane's worth of bytes for the block covering `(col,
    /// row)`, through the cache if present, generating directly otherwise.
    fn block_bytes(&self, mgr: &BlockGeneratorManager, plane: i64, col: i64, row: i64) -> Result<(Rect2i, Arc<Vec<u8>>)> {
        let (block_col, block_row) = mgr.block_index_for(col, row);
        let bbox = mgr.storage_bbox(block_col, block_row);
        match &self.cache {
            Some(cache) => {
                let key = self.tile_key(plane, block_col, block_row);
                let generator = Arc::new(mgr.generator(plane, block_col, block_row)?);
                let handle = cache.insert(key, generator);
                Ok((bbox, handle.bytes()?))
            }
            None => {
                let generator = mgr.generator(plane, block_col, block_row)?;
                Ok((bbox, Arc::new(generator.generate()?)))
            }
        }
    }
}

impl View for BlockRasterizeView {
    fn format(&self) -> ImageFormat {
        self.parent.format()
    }

    fn sample(&self, col: i64, row: i64, plane: i64, out: &mut [u8]) -> Result<()> {
        let mgr = self.manager();
        let (bbox, bytes) = self.block_bytes(&mgr, plane, col, row)?;
        let plane_format = ImageFormat { cols: bbox.width, rows: bbox.height, planes: 1, ..self.parent.format() };
        let buf = ImageBuffer::new(&bytes, plane_format)?;
        out.copy_from_slice(buf.pixel_bytes(col - bbox.min_x, row - bbox.min_y, 0)?);
        Ok(())
    }

    fn prerasterize(&self, bbox: Rect2i) -> Arc<dyn View> {
        let inner = self.parent.prerasterize(bbox);
        Arc::new(Self {
            parent: inner,
            block_width: self.block_width,
            block_height: self.block_height,
            num_threads: self.num_threads,
            cache: self.cache.clone(),
            resource_id: self.resource_id,
        })
    }

    fn rasterize(&self, dest: &mut ImageBuffer, bbox: Rect2i) -> Result<()> {
        let src_fmt = self.format();
        if dest.cols() != bbox.width || dest.rows() != bbox.height {
            return Err(terra_core::error::Error::invalid_config(format!(
                "rasterize destination is {}x{} but bbox is {}x{}",
                dest.cols(),
                dest.rows(),
                bbox.width,
                bbox.height
            )));
        }
        if dest.planes() != src_fmt.planes {
            return Err(terra_core::error::Error::invalid_config("rasterize destination plane count must match source"));
        }

        let dest_fmt = dest.format();
        let same_format = dest_fmt.pixel_format == src_fmt.pixel_format && dest_fmt.channel_kind == src_fmt.channel_kind;
        let dest_bpp = dest_fmt.bytes_per_pixel()? as usize;
        let (cstride, rstride, pstride) = (dest.cstride(), dest.rstride(), dest.pstride());
        let target = RasterTarget { ptr: dest.as_bytes_mut()?.as_mut_ptr(), cstride, rstride, pstride };

        let mgr = self.manager();
        let planes = src_fmt.planes;
        let align_bbox = mgr.total_bbox();

        let error_slot: std::sync::Mutex<Option<terra_core::error::Error>> = std::sync::Mutex::new(None);

        run_blocks(align_bbox, bbox, self.block_width, self.block_height, self.num_threads, |block_bbox| {
            if error_slot.lock().expect("error slot poisoned").is_some() {
                return;
            }
            for plane in 0..planes {
                let outcome = (|| -> Result<()> {
                    let (tile_bbox, bytes) = self.block_bytes(&mgr, plane, block_bbox.min_x, block_bbox.min_y)?;
                    let tile_format = ImageFormat { cols: tile_bbox.width, rows: tile_bbox.height, planes: 1, ..src_fmt };
                    let tile_buf = ImageBuffer::new(&bytes, tile_format)?;
                    for row in block_bbox.min_y..block_bbox.max_y() {
                        for col in block_bbox.min_x..block_bbox.max_x() {
                            let src_pixel = tile_buf.pixel_bytes(col - tile_bbox.min_x, row - tile_bbox.min_y, 0)?;
                            let dest_col = col - bbox.min_x;
                            let dest_row = row - bbox.min_y;
                            // SAFETY: block_bbox ranges are disjoint across
                            // concurrent calls (BlockRasterizer's contract),
                            // so no two threads ever address the same bytes.
                            let dst = unsafe { target.pixel_mut(dest_col, dest_row, plane, dest_bpp) };
                            if same_format {
                                dst.copy_from_slice(src_pixel);
                            } else {
                                let src_pixel_fmt = ImageFormat::new(1, 1, 1, src_fmt.pixel_format, src_fmt.channel_kind).with_premultiply(src_fmt.premultiply);
                                let src_buf = ImageBuffer::new(src_pixel, src_pixel_fmt)?;
                                let dst_pixel_fmt =
                                    ImageFormat::new(1, 1, 1, dest_fmt.pixel_format, dest_fmt.channel_kind).with_premultiply(dest_fmt.premultiply);
                                let mut scratch = vec![0u8; dest_bpp];
                                {
                                    let mut dst_buf = ImageBuffer::new_mut(&mut scratch, dst_pixel_fmt)?;
                                    terra_core::convert::convert(&mut dst_buf, &src_buf, true)?;
                                }
                                dst.copy_from_slice(&scratch);
                            }
                        }
                    }
                    Ok(())
                })();
                if let Err(e) = outcome {
                    *error_slot.lock().expect("error slot poisoned") = Some(e);
                    return;
                }
            }
        });

        match error_slot.into_inner().expect("error slot poisoned") {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use terra_core::channel::ChannelKind;
    use terra_core::pixel_format::PixelFormat;
    use terra_view::MemoryView;

    fn striped(cols: i64, rows: i64) -> Arc<dyn View> {
        let fmt = ImageFormat::new(cols, rows, 1, PixelFormat::Gray, ChannelKind::U8);
        let mut mv = MemoryView::new(fmt).unwrap();
        {
            let mut buf = mv.as_image_buffer_mut().unwrap();
            for row in 0..rows {
                for col in 0..cols {
                    buf.pixel_bytes_mut(col, row, 0).unwrap().copy_from_slice(&[((row * cols + col) % 256) as u8]);
                }
            }
        }
        Arc::new(mv)
    }

    #[test]
    fn sample_matches_parent_through_small_blocks() {
        let parent = striped(10, 10);
        let view = BlockRasterizeView::new(parent.clone()).unwrap().with_block_size(3, 3).with_num_threads(1);
        let mut expected = [0u8; 1];
        let mut actual = [0u8; 1];
        for row in 0..10 {
            for col in 0..10 {
                parent.sample(col, row, 0, &mut expected).unwrap();
                view.sample(col, row, 0, &mut actual).unwrap();
                assert_eq!(actual, expected, "mismatch at ({col},{row})");
            }
        }
    }

    #[test]
    fn rasterize_matches_parent_in_parallel() {
        let parent = striped(23, 17);
        let view = BlockRasterizeView::new(parent.clone()).unwrap().with_block_size(5, 4).with_num_threads(4);
        let fmt = parent.format();
        let mut data = vec![0u8; fmt.raster_bytes().unwrap() as usize];
        {
            let mut dest = ImageBuffer::new_mut(&mut data, fmt).unwrap();
            view.rasterize(&mut dest, view.full_bbox()).unwrap();
        }
        let expect_fmt = fmt;
        let mut expect_data = vec![0u8; expect_fmt.raster_bytes().unwrap() as usize];
        {
            let mut dest = ImageBuffer::new_mut(&mut expect_data, expect_fmt).unwrap();
            parent.rasterize(&mut dest, parent.full_bbox()).unwrap();
        }
        assert_eq!(data, expect_data);
    }

    #[test]
    fn cache_is_reused_across_overlapping_requests() {
        let parent = striped(16, 16);
        let cache = TileCache::new(TileCache::DEFAULT_BUDGET_BYTES);
        let view = BlockRasterizeView::new(parent.clone()).unwrap().with_block_size(4, 4).with_num_threads(1).with_cache(cache.clone(), 7);

        let mut out = [0u8; 1];
        view.sample(1, 1, 0, &mut out).unwrap();
        view.sample(2, 2, 0, &mut out).unwrap(); // same block, should hit cache
        let (hits, misses) = cache.hit_miss();
        assert_eq!(misses, 1);
        assert_eq!(hits, 1);
    }
}
