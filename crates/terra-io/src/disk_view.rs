//! `DiskView` (§4.2, §4.4): a leaf `View` over a `Resource`. Thin and
//! uncached by design — grounded on the layering in SPEC_FULL.md §9 (the
//! Resource/driver layer stays below the tile cache), so a caller wanting
//! parallel, cached rasterization wraps a `DiskView` in
//! `terra_block::BlockRasterizeView` rather than this view doing its own
//! caching.

use std::sync::Arc;

use terra_core::format::{ImageBuffer, ImageFormat};
use terra_core::rect::Rect2i;
use terra_view::View;

use crate::error::Result;
use crate::resource::Resource;

/// Adapts a `Resource` into the `View` algebra.
pub struct DiskView {
    resource: Arc<dyn Resource>,
}

impl DiskView {
    pub fn new(resource: Arc<dyn Resource>) -> Self {
        Self { resource }
    }

    pub fn resource(&self) -> &Arc<dyn Resource> {
        &self.resource
    }
}

impl View for DiskView {
    fn format(&self) -> ImageFormat {
        self.resource.format()
    }

    fn full_bbox(&self) -> Rect2i {
        self.resource.full_bbox()
    }

    /// One pixel costs one `Resource::read` call over a 1x1 bbox. Correct
    /// but unbatched; block-granularity access goes through
    /// `terra_block::BlockRasterizeView` instead.
    fn sample(&self, col: i64, row: i64, plane: i64, out: &mut [u8]) -> Result<()> {
        let full_fmt = self.resource.format();
        let pixel_fmt = ImageFormat { cols: 1, rows: 1, ..full_fmt };
        let mut scratch = vec![0u8; pixel_fmt.raster_bytes()? as usize];
        {
            let mut dest = ImageBuffer::new_mut(&mut scratch, pixel_fmt)?;
            self.resource.read(&mut dest, Rect2i::new(col, row, 1, 1))?;
        }
        let buf = ImageBuffer::new(&scratch, pixel_fmt)?;
        out.copy_from_slice(buf.pixel_bytes(0, 0, plane)?);
        Ok(())
    }

    fn prerasterize(&self, _bbox: Rect2i) -> Arc<dyn View> {
        Arc::new(DiskView { resource: self.resource.clone() })
    }

    /// Delegates straight to `Resource::read` rather than the default
    /// per-pixel loop, since a resource already answers arbitrary bboxes in
    /// one call.
    fn rasterize(&self, dest: &mut ImageBuffer, bbox: Rect2i) -> Result<()> {
        self.resource.read(dest, bbox)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_resource::MemoryResource;
    use terra_core::channel::ChannelKind;
    use terra_core::pixel_format::PixelFormat;

    fn striped_resource(cols: i64, rows: i64) -> MemoryResource {
        let fmt = ImageFormat::new(cols, rows, 1, PixelFormat::Gray, ChannelKind::U8);
        let mut res = MemoryResource::new(fmt).unwrap();
        {
            let mut buf = res.as_image_buffer_mut().unwrap();
            for row in 0..rows {
                for col in 0..cols {
                    buf.pixel_bytes_mut(col, row, 0).unwrap().copy_from_slice(&[((row * cols + col) % 256) as u8]);
                }
            }
        }
        res
    }

    #[test]
    fn sample_matches_backing_resource() {
        let res = striped_resource(4, 4);
        let mut expected = [0u8; 1];
        res.as_image_buffer().unwrap().pixel_bytes(2, 3, 0).unwrap().iter().enumerate().for_each(|(i, b)| expected[i] = *b);

        let view = DiskView::new(Arc::new(res));
        let mut out = [0u8; 1];
        view.sample(2, 3, 0, &mut out).unwrap();
        assert_eq!(out, expected);
    }

    #[test]
    fn rasterize_delegates_to_resource_read() {
        let res = striped_resource(5, 3);
        let view = DiskView::new(Arc::new(res));
        let fmt = view.format();
        let mut data = vec![0u8; fmt.raster_bytes().unwrap() as usize];
        {
            let mut dest = ImageBuffer::new_mut(&mut data, fmt).unwrap();
            view.rasterize(&mut dest, view.full_bbox()).unwrap();
        }
        let expected = view.resource().as_ref();
        let mut expect_data = vec![0u8; fmt.raster_bytes().unwrap() as usize];
        {
            let mut dest = ImageBuffer::new_mut(&mut expect_data, fmt).unwrap();
            expected.read(&mut dest, view.full_bbox()).unwrap();
        }
        assert_eq!(data, expect_data);
    }
}
