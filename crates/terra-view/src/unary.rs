//! `PerPixelUnaryView` (§4.2): applies a pure per-pixel function elementwise
//! over a parent view. The functor is type-preserving (same format in and
//! out), matching §4.6's note that writes through a non-trivial functor are
//! not well-defined — only reads are supported here.

use std::sync::Arc;

use terra_core::format::ImageFormat;
use terra_core::rect::Rect2i;

use crate::error::Result;
use crate::view::View;

/// A boxed per-pixel transform: reads a pixel's native bytes, writes
/// replacement bytes of the same length.
pub type PixelFn = Arc<dyn Fn(&[u8], &mut [u8]) + Send + Sync>;

#[derive(Clone)]
pub struct PerPixelUnaryView {
    parent: Arc<dyn View>,
    func: PixelFn,
}

impl PerPixelUnaryView {
    pub fn new(parent: Arc<dyn View>, func: PixelFn) -> Self {
        Self { parent, func }
    }
}

impl View for PerPixelUnaryView {
    fn format(&self) -> ImageFormat {
        self.parent.format()
    }

    fn sample(&self, col: i64, row: i64, plane: i64, out: &mut [u8]) -> Result<()> {
        let bpp = out.len();
        let mut scratch = vec![0u8; bpp];
        self.parent.sample(col, row, plane, &mut scratch)?;
        (self.func)(&scratch, out);
        Ok(())
    }

    fn prerasterize(&self, bbox: Rect2i) -> Arc<dyn View> {
        let inner = self.parent.prerasterize(bbox);
        Arc::new(PerPixelUnaryView { parent: inner, func: self.func.clone() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryView;
    use terra_core::channel::ChannelKind;
    use terra_core::pixel_format::PixelFormat;

    #[test]
    fn applies_functor_elementwise() {
        let fmt = ImageFormat::new(2, 2, 1, PixelFormat::Gray, ChannelKind::U8);
        let mut mv = MemoryView::new(fmt).unwrap();
        {
            let mut buf = mv.as_image_buffer_mut().unwrap();
            buf.pixel_bytes_mut(0, 0, 0).unwrap().copy_from_slice(&[10]);
        }
        let invert: PixelFn = Arc::new(|src, dst| dst[0] = 255 - src[0]);
        let view = PerPixelUnaryView::new(Arc::new(mv), invert);
        let mut out = [0u8; 1];
        view.sample(0, 0, 0, &mut out).unwrap();
        assert_eq!(out, [245]);
    }
}
