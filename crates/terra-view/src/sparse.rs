//! `SparseView` (§4.2): overlays a sequence of `UniformBlob`s atop a parent
//! view. The first blob (in insertion order) containing a coordinate wins;
//! otherwise the parent's pixel passes through. Used to realize the drawing
//! operations (§4.7) as lazy overlays rather than in-place mutation.

use std::collections::VecDeque;
use std::sync::Arc;

use terra_core::format::ImageFormat;
use terra_core::rect::Rect2i;

use crate::blob::UniformBlob;
use crate::error::Result;
use crate::view::View;

#[derive(Clone)]
pub struct SparseView {
    parent: Arc<dyn View>,
    blobs: VecDeque<UniformBlob>,
}

impl SparseView {
    pub fn new(parent: Arc<dyn View>) -> Self {
        Self { parent, blobs: VecDeque::new() }
    }

    pub fn with_blob(parent: Arc<dyn View>, blob: UniformBlob) -> Self {
        let mut view = Self::new(parent);
        view.push_blob(blob);
        view
    }

    pub fn push_blob(&mut self, blob: UniformBlob) {
        self.blobs.push_back(blob);
    }
}

impl View for SparseView {
    fn format(&self) -> ImageFormat {
        self.parent.format()
    }

    fn sample(&self, col: i64, row: i64, plane: i64, out: &mut [u8]) -> Result<()> {
        for blob in &self.blobs {
            if blob.is_inside(col, row, plane) {
                let color = blob.get_pixel(col, row, plane)?;
                let n = out.len().min(color.len());
                out[..n].copy_from_slice(&color[..n]);
                return Ok(());
            }
        }
        self.parent.sample(col, row, plane, out)
    }

    fn prerasterize(&self, bbox: Rect2i) -> Arc<dyn View> {
        let inner = self.parent.prerasterize(bbox);
        Arc::new(SparseView { parent: inner, blobs: self.blobs.clone() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryView;
    use terra_core::channel::ChannelKind;
    use terra_core::pixel_format::PixelFormat;

    #[test]
    fn blob_pixels_take_precedence_over_parent() {
        let fmt = ImageFormat::new(3, 3, 1, PixelFormat::Gray, ChannelKind::U8);
        let mv = MemoryView::new(fmt).unwrap();
        let mut blob = UniformBlob::new(vec![200]);
        blob.insert(1, 1, 0);
        let overlay = SparseView::with_blob(Arc::new(mv), blob);

        let mut out = [0u8; 1];
        overlay.sample(1, 1, 0, &mut out).unwrap();
        assert_eq!(out, [200]);
        overlay.sample(0, 0, 0, &mut out).unwrap();
        assert_eq!(out, [0]);
    }
}
