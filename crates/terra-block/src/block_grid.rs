//! Maps a view's pixel grid onto a grid of block-sized tiles (§4.3),
//! grounded on `Block_Utilities.hpp::get_default_block_size` for sizing and
//! `Block_Processor.hpp`'s grid-aligned addressing.
//!
//! Per DESIGN.md's resolution of the corresponding Open Question, a block's
//! *address* (used for its `TileKey` and for computing neighboring block
//! origins) is the unclipped, grid-aligned rectangle; its *storage* bbox (what
//! actually gets rasterized and cached) is that rectangle intersected with
//! the view's `full_bbox` — so the last row/column of blocks along an edge is
//! narrower/shorter than `block_width`/`block_height` without perturbing the
//! grid addressing of blocks before it.

use std::sync::Arc;

use terra_core::format::{ImageBuffer, ImageFormat};
use terra_core::rect::Rect2i;
use terra_view::{SelectPlaneView, View};

use crate::error::Result;
use crate::round_down::round_down;
use crate::tile_cache::TileGenerator;

/// Default block sizing (§4.3): `block_rows = 2 MiB / (planes * cols *
/// bytes_per_pixel)`, clamped to `[1, rows]`; block width is always the full
/// row (`cols`), matching `get_default_block_size`'s row-major bias.
pub fn default_block_size(format: ImageFormat) -> Result<(i64, i64)> {
    let bpp = format.bytes_per_pixel()?;
    let row_bytes = (format.planes * format.cols * bpp).max(1);
    let rows = (2 * 1024 * 1024 / row_bytes).clamp(1, format.rows.max(1));
    Ok((format.cols, rows))
}

/// Computes the grid geometry over a view's `full_bbox` for a fixed block
/// size, and hands out `BlockGenerator`s that rasterize one block on demand.
pub struct BlockGeneratorManager {
    parent: Arc<dyn View>,
    total_bbox: Rect2i,
    block_width: i64,
    block_height: i64,
}

impl BlockGeneratorManager {
    pub fn new(parent: Arc<dyn View>, block_width: i64, block_height: i64) -> Self {
        assert!(block_width > 0 && block_height > 0, "block dimensions must be positive");
        let total_bbox = parent.full_bbox();
        Self { parent, total_bbox, block_width, block_height }
    }

    pub fn block_width(&self) -> i64 {
        self.block_width
    }

    pub fn block_height(&self) -> i64 {
        self.block_height
    }

    pub fn total_bbox(&self) -> Rect2i {
        self.total_bbox
    }

    /// The grid-aligned index `(block_col, block_row)` of the block covering
    /// absolute pixel `(x, y)`.
    pub fn block_index_for(&self, x: i64, y: i64) -> (i64, i64) {
        let base_x = round_down(self.total_bbox.min_x, self.block_width);
        let base_y = round_down(self.total_bbox.min_y, self.block_height);
        (self.div_floor(x - base_x, self.block_width), self.div_floor(y - base_y, self.block_height))
    }

    fn div_floor(&self, a: i64, b: i64) -> i64 {
        a.div_euclid(b)
    }

    /// The unclipped, grid-aligned origin of block `(block_col, block_row)`.
    pub fn block_origin(&self, block_col: i64, block_row: i64) -> (i64, i64) {
        let base_x = round_down(self.total_bbox.min_x, self.block_width);
        let base_y = round_down(self.total_bbox.min_y, self.block_height);
        (base_x + block_col * self.block_width, base_y + block_row * self.block_height)
    }

    /// The bbox actually generated and cached for a block: its unclipped
    /// rectangle intersected with `total_bbox`.
    pub fn storage_bbox(&self, block_col: i64, block_row: i64) -> Rect2i {
        let (ox, oy) = self.block_origin(block_col, block_row);
        Rect2i::new(ox, oy, self.block_width, self.block_height).intersection(self.total_bbox)
    }

    /// A generator for one `(plane, block_col, block_row)` tile. Multi-plane
    /// parents are wrapped in a `SelectPlaneView` so each cached tile holds
    /// exactly one plane's bytes, matching `TileKey`'s per-plane addressing.
    pub fn generator(&self, plane: i64, block_col: i64, block_row: i64) -> Result<BlockGenerator> {
        let bbox = self.storage_bbox(block_col, block_row);
        let view: Arc<dyn View> = if self.parent.format().planes > 1 {
            Arc::new(SelectPlaneView::new(self.parent.clone(), plane)?)
        } else {
            self.parent.clone()
        };
        Ok(BlockGenerator { parent: view, bbox })
    }
}

/// Rasterizes one block of a (possibly plane-projected) view into an owned
/// byte buffer, on demand.
pub struct BlockGenerator {
    parent: Arc<dyn View>,
    bbox: Rect2i,
}

impl BlockGenerator {
    pub fn bbox(&self) -> Rect2i {
        self.bbox
    }

    fn block_format(&self) -> ImageFormat {
        ImageFormat { cols: self.bbox.width, rows: self.bbox.height, ..self.parent.format() }
    }
}

impl TileGenerator for BlockGenerator {
    fn size_bytes(&self) -> u64 {
        self.block_format().raster_bytes().unwrap_or(0).max(0) as u64
    }

    fn generate(&self) -> Result<Vec<u8>> {
        let format = self.block_format();
        let mut data = vec![0u8; format.raster_bytes()? as usize];
        {
            let mut buf = ImageBuffer::new_mut(&mut data, format)?;
            self.parent.rasterize(&mut buf, self.bbox)?;
        }
        Ok(data)
    }
}
