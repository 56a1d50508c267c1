//! `CropView` (§4.2, §4.6): translates absolute coordinates by a fixed
//! integer origin before forwarding to a parent view.

use std::sync::Arc;

use terra_core::format::ImageFormat;
use terra_core::rect::Rect2i;

use crate::error::Result;
use crate::view::View;

/// A window into `parent` at `origin`, `width` x `height` in size.
///
/// The original also supports a floating-point origin for parents that are
/// floating-point-indexable (interpolated sampling); this rendition keeps
/// to the integer-origin case `terra-core`'s pixel model actually supports
/// (there is no interpolated accessor here), per §4.6's "otherwise integer"
/// branch.
#[derive(Clone)]
pub struct CropView {
    parent: Arc<dyn View>,
    origin_x: i64,
    origin_y: i64,
    width: i64,
    height: i64,
}

impl CropView {
    pub fn new(parent: Arc<dyn View>, origin_x: i64, origin_y: i64, width: i64, height: i64) -> Self {
        Self { parent, origin_x, origin_y, width, height }
    }

    pub fn origin(&self) -> (i64, i64) {
        (self.origin_x, self.origin_y)
    }
}

impl View for CropView {
    fn format(&self) -> ImageFormat {
        let mut fmt = self.parent.format();
        fmt.cols = self.width;
        fmt.rows = self.height;
        fmt
    }

    fn sample(&self, col: i64, row: i64, plane: i64, out: &mut [u8]) -> Result<()> {
        self.parent.sample(self.origin_x + col, self.origin_y + row, plane, out)
    }

    fn prerasterize(&self, bbox: Rect2i) -> Arc<dyn View> {
        // CropView(CropView(v, a), b) prerasterized over bbox must behave
        // as CropView(v, a+b) (§8 invariant 6): push the crop offset into
        // the child's prerasterize request rather than prerasterizing self
        // directly, so a chain of crops collapses instead of nesting.
        let shifted = bbox.translate(self.origin_x, self.origin_y);
        let inner = self.parent.prerasterize(shifted);
        Arc::new(CropView { parent: inner, origin_x: self.origin_x, origin_y: self.origin_y, width: self.width, height: self.height })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryView;
    use terra_core::pixel_format::PixelFormat;
    use terra_core::channel::ChannelKind;

    fn source() -> Arc<MemoryView> {
        let fmt = ImageFormat::new(4, 4, 1, PixelFormat::Gray, ChannelKind::U8);
        let mut mv = MemoryView::new(fmt).unwrap();
        {
            let mut buf = mv.as_image_buffer_mut().unwrap();
            for row in 0..4 {
                for col in 0..4 {
                    buf.pixel_bytes_mut(col, row, 0).unwrap().copy_from_slice(&[(row * 4 + col) as u8]);
                }
            }
        }
        Arc::new(mv)
    }

    #[test]
    fn crop_offsets_sampling() {
        let src = source();
        let crop = CropView::new(src, 1, 1, 2, 2);
        let mut out = [0u8; 1];
        crop.sample(0, 0, 0, &mut out).unwrap();
        assert_eq!(out, [1 * 4 + 1]);
        crop.sample(1, 1, 0, &mut out).unwrap();
        assert_eq!(out, [2 * 4 + 2]);
    }

    #[test]
    fn nested_crop_composes_offsets() {
        let src = source();
        let outer = CropView::new(src, 1, 1, 3, 3);
        let inner = CropView::new(Arc::new(outer), 1, 1, 2, 2);
        let mut out = [0u8; 1];
        inner.sample(0, 0, 0, &mut out).unwrap();
        // absolute (1+1, 1+1) = (2,2)
        assert_eq!(out, [2 * 4 + 2]);
    }
}
