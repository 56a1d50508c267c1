//! The `View` trait (§4.2): the uniform interface every lazy image node
//! implements. Leaves (`MemoryView`) own pixels; interior nodes (`CropView`,
//! `PerPixelUnaryView`, `SelectPlaneView`, `SparseView`) hold an `Arc<dyn
//! View>` parent and forward/compose sampling.
//!
//! Composition is via `Arc<dyn View>` rather than generic `Parent: View`
//! chains (SPEC_FULL.md §9 allows either); this keeps view trees
//! heterogeneous and cheaply cloneable without monomorphizing a distinct
//! type per pipeline shape.

use std::sync::Arc;

use terra_core::convert::convert;
use terra_core::error::Error;
use terra_core::format::{ImageBuffer, ImageFormat};
use terra_core::rect::Rect2i;

use crate::error::Result;

/// A lazy, composable image node.
///
/// Every view reports its shape via [`View::format`], samples a single
/// pixel's bytes via [`View::sample`], and can flatten itself (or a subtree)
/// into a concrete region via [`View::rasterize`]. [`View::prerasterize`]
/// lets a view hand back a (possibly simplified) node that answers absolute
/// coordinates inside `bbox` identically to `self` — used by
/// `terra-block::BlockRasterizeView` to avoid re-deriving the same crop
/// chain once per block.
pub trait View: Send + Sync + 'static {
    /// The view's shape and pixel semantics.
    fn format(&self) -> ImageFormat;

    /// `(0, 0, cols, rows)`.
    fn full_bbox(&self) -> Rect2i {
        let fmt = self.format();
        Rect2i::from_size(fmt.cols, fmt.rows)
    }

    /// Samples one pixel's native bytes (`format().bytes_per_pixel()` long)
    /// at absolute `(col, row, plane)` into `out`.
    fn sample(&self, col: i64, row: i64, plane: i64, out: &mut [u8]) -> Result<()>;

    /// Returns a view that, sampled at absolute coordinates inside `bbox`,
    /// yields the same pixels as `self`. May return a clone of `self`.
    fn prerasterize(&self, bbox: Rect2i) -> Arc<dyn View>;

    /// Fills `dest[0..bbox.width, 0..bbox.height, 0..planes]` with `self`'s
    /// pixels over `bbox`. The default implementation prerasterizes then
    /// copies pixel-by-pixel, converting through `terra_core::convert` when
    /// `dest`'s format differs from `self`'s.
    fn rasterize(&self, dest: &mut ImageBuffer, bbox: Rect2i) -> Result<()> {
        let src_fmt = self.format();
        if dest.cols() != bbox.width || dest.rows() != bbox.height {
            return Err(Error::invalid_config(format!(
                "rasterize destination is {}x{} but bbox is {}x{}",
                dest.cols(),
                dest.rows(),
                bbox.width,
                bbox.height
            )));
        }
        if dest.planes() != src_fmt.planes {
            return Err(Error::invalid_config("rasterize destination plane count must match source"));
        }

        let same_format = dest.format().pixel_format == src_fmt.pixel_format && dest.format().channel_kind == src_fmt.channel_kind;
        let bpp = src_fmt.bytes_per_pixel()? as usize;
        let mut scratch = vec![0u8; bpp];

        for plane in 0..src_fmt.planes {
            for row in 0..bbox.height {
                for col in 0..bbox.width {
                    self.sample(bbox.min_x + col, bbox.min_y + row, plane, &mut scratch)?;
                    if same_format {
                        dest.pixel_bytes_mut(col, row, plane)?.copy_from_slice(&scratch);
                    } else {
                        let src_pixel_fmt = ImageFormat::new(1, 1, 1, src_fmt.pixel_format, src_fmt.channel_kind).with_premultiply(src_fmt.premultiply);
                        let src_pixel = ImageBuffer::new(&scratch, src_pixel_fmt)?;
                        let mut dst_scratch = vec![0u8; dest.format().bytes_per_pixel()? as usize];
                        let dst_pixel_fmt = ImageFormat::new(1, 1, 1, dest.format().pixel_format, dest.format().channel_kind)
                            .with_premultiply(dest.format().premultiply);
                        {
                            let mut dst_pixel = ImageBuffer::new_mut(&mut dst_scratch, dst_pixel_fmt)?;
                            convert(&mut dst_pixel, &src_pixel, true)?;
                        }
                        dest.pixel_bytes_mut(col, row, plane)?.copy_from_slice(&dst_scratch);
                    }
                }
            }
        }
        Ok(())
    }
}

/// A cursor over a view's pixel grid supporting col/row/plane steps, per
/// §4.2's "pixel accessor traversal". Unlike `MemoryView`'s direct pointer
/// arithmetic, this accessor is "loose": every step re-invokes
/// `View::sample`, which is the right tradeoff for non-memory views where
/// there is no contiguous backing to stride over.
pub struct Accessor {
    view: Arc<dyn View>,
    col: i64,
    row: i64,
    plane: i64,
}

impl Accessor {
    pub fn new(view: Arc<dyn View>, col: i64, row: i64, plane: i64) -> Self {
        Self { view, col, row, plane }
    }

    pub fn position(&self) -> (i64, i64, i64) {
        (self.col, self.row, self.plane)
    }

    /// Reads the pixel at the current position into `out`.
    pub fn get(&self, out: &mut [u8]) -> Result<()> {
        self.view.sample(self.col, self.row, self.plane, out)
    }

    pub fn advance(&mut self, di: i64, dj: i64, dp: i64) {
        self.col += di;
        self.row += dj;
        self.plane += dp;
    }

    pub fn next_col(&mut self) {
        self.advance(1, 0, 0);
    }

    pub fn prev_col(&mut self) {
        self.advance(-1, 0, 0);
    }

    pub fn next_row(&mut self) {
        self.advance(0, 1, 0);
    }

    pub fn prev_row(&mut self) {
        self.advance(0, -1, 0);
    }

    pub fn next_plane(&mut self) {
        self.advance(0, 0, 1);
    }

    pub fn prev_plane(&mut self) {
        self.advance(0, 0, -1);
    }
}
