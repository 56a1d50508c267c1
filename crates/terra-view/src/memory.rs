//! `MemoryView` (§4.2): a resizable, owning leaf view backed by a
//! contiguous byte buffer. The only view that can be the destination of a
//! generic rasterize when the destination needs resizing.

use std::sync::Arc;

use terra_core::error::Error;
use terra_core::format::{ImageBuffer, ImageFormat};
use terra_core::pixel_format::PixelFormat;
use terra_core::rect::Rect2i;

use crate::error::Result;
use crate::view::View;

/// An owning, resizable pixel buffer.
pub struct MemoryView {
    data: Vec<u8>,
    format: ImageFormat,
}

impl MemoryView {
    /// Allocates a zero-filled buffer for `format`.
    pub fn new(format: ImageFormat) -> Result<Self> {
        format.validate()?;
        let data = vec![0u8; format.raster_bytes()? as usize];
        Ok(Self { data, format })
    }

    /// Wraps an already-populated buffer; `data.len()` must match
    /// `format.raster_bytes()`.
    pub fn from_bytes(data: Vec<u8>, format: ImageFormat) -> Result<Self> {
        format.validate()?;
        let expected = format.raster_bytes()? as usize;
        if data.len() != expected {
            return Err(Error::invalid_config(format!(
                "buffer has {} bytes, format expects {}",
                data.len(),
                expected
            )));
        }
        Ok(Self { data, format })
    }

    /// Resizes in place, discarding contents (per §4.2's "resizable"
    /// contract — `set_size` reallocates rather than preserving pixels).
    pub fn set_size(&mut self, cols: i64, rows: i64, planes: i64) -> Result<()> {
        let format = ImageFormat { cols, rows, planes, ..self.format };
        format.validate()?;
        self.data = vec![0u8; format.raster_bytes()? as usize];
        self.format = format;
        Ok(())
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.format.pixel_format
    }

    /// Borrows the backing buffer as a read-only `ImageBuffer`.
    pub fn as_image_buffer(&self) -> Result<ImageBuffer<'_>> {
        ImageBuffer::new(&self.data, self.format)
    }

    /// Borrows the backing buffer as a writable `ImageBuffer`.
    pub fn as_image_buffer_mut(&mut self) -> Result<ImageBuffer<'_>> {
        ImageBuffer::new_mut(&mut self.data, self.format)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl View for MemoryView {
    fn format(&self) -> ImageFormat {
        self.format
    }

    fn sample(&self, col: i64, row: i64, plane: i64, out: &mut [u8]) -> Result<()> {
        let buf = self.as_image_buffer()?;
        out.copy_from_slice(buf.pixel_bytes(col, row, plane)?);
        Ok(())
    }

    fn prerasterize(&self, _bbox: Rect2i) -> Arc<dyn View> {
        // A MemoryView already answers any coordinate directly; §4.2 allows
        // prerasterize to just return a clone of self.
        Arc::new(MemoryView { data: self.data.clone(), format: self.format })
    }
}
