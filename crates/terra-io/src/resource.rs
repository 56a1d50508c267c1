//! `Resource`/`ResourceWrite` (§4.4): the disk-I/O boundary a concrete codec
//! driver implements. Grounded on `Image_Resource_Base`/
//! `Write_Image_Resource_Base` (`Image_Resource_Base.hpp`) for the method
//! shape, and on this workspace's `vfx-io::traits::{FormatReader,
//! FormatWriter}` for the read/write split — but non-generic over an options
//! type, matching SPEC_FULL.md's simpler contract.

use terra_core::error::Error;
use terra_core::format::{ImageBuffer, ImageFormat};
use terra_core::rect::Rect2i;

use crate::error::Result;

/// Read side of the disk-I/O boundary. A concrete driver (a wrapped codec)
/// implements this over one open file or stream.
pub trait Resource: Send + Sync {
    /// The resource's native pixel format. Mapping to a caller's desired
    /// pixel/channel type happens above this layer, via §4.1 `convert`.
    fn format(&self) -> ImageFormat;

    fn cols(&self) -> i64 {
        self.format().cols
    }

    fn rows(&self) -> i64 {
        self.format().rows
    }

    fn planes(&self) -> i64 {
        self.format().planes
    }

    fn channels(&self) -> usize {
        self.format().channels().unwrap_or(0)
    }

    /// `(0, 0, cols, rows)`.
    fn full_bbox(&self) -> Rect2i {
        Rect2i::from_size(self.cols(), self.rows())
    }

    /// Fills `dest` (shaped `bbox.width x bbox.height`, full plane count,
    /// native format) with pixels from `bbox`.
    fn read(&self, dest: &mut ImageBuffer, bbox: Rect2i) -> Result<()>;

    /// Whether this resource has a preferred block granularity (§6).
    fn has_block_read(&self) -> bool {
        false
    }

    /// `block_read_size` when `has_block_read()`; `(cols, rows)` otherwise,
    /// so a caller that ignores `has_block_read` still sees one block
    /// covering the whole resource (§6).
    fn block_read_size(&self) -> (i64, i64) {
        (self.cols(), self.rows())
    }

    fn has_nodata_read(&self) -> bool {
        false
    }

    /// The nodata sentinel value. Only meaningful when `has_nodata_read()`.
    fn nodata_read(&self) -> f64 {
        0.0
    }
}

/// Write side of the disk-I/O boundary.
pub trait ResourceWrite: Send + Sync {
    fn format(&self) -> ImageFormat;

    fn full_bbox(&self) -> Rect2i {
        Rect2i::from_size(self.format().cols, self.format().rows)
    }

    /// Writes `src` (shaped `bbox.width x bbox.height`) at `bbox`.
    fn write(&mut self, src: &ImageBuffer, bbox: Rect2i) -> Result<()>;

    fn has_block_write(&self) -> bool {
        false
    }

    fn block_write_size(&self) -> (i64, i64) {
        (self.format().cols, self.format().rows)
    }

    /// Requests a block granularity for subsequent writes. Drivers that
    /// cannot honor arbitrary block sizes (most real codecs) return
    /// `NotImplemented`.
    fn set_block_write_size(&mut self, _width: i64, _height: i64) -> Result<()> {
        Err(Error::not_implemented("set_block_write_size"))
    }

    fn has_nodata_write(&self) -> bool {
        false
    }

    fn set_nodata_write(&mut self, _value: f64) -> Result<()> {
        Err(Error::not_implemented("set_nodata_write"))
    }

    /// Flushes any buffered state to the backing store. Called once after
    /// the last `write` by the `write_image` helper.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}
