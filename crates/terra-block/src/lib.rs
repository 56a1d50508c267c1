//! Tiled block cache and parallel block rasterizer (§4.3, §5): the one view
//! (`BlockRasterizeView`) whose implementation needs a shared cache and a
//! worker-thread pool, so it lives alongside them here rather than in
//! `terra-view`.

#![warn(missing_docs)]

pub mod block_grid;
pub mod block_view;
pub mod error;
pub mod rasterizer;
pub mod round_down;
pub mod tile_cache;

pub use block_grid::{default_block_size, BlockGenerator, BlockGeneratorManager};
pub use block_view::BlockRasterizeView;
pub use rasterizer::{default_num_threads, run_blocks};
pub use round_down::round_down;
pub use tile_cache::{CacheHandle, TileCache, TileGenerator, TileKey};
