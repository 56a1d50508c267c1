//! `SelectPlaneView` (§4.2, §4.6): projects a single plane of a multi-plane
//! parent, reporting `planes() == 1`.

use std::sync::Arc;

use terra_core::error::Error;
use terra_core::format::ImageFormat;
use terra_core::rect::Rect2i;

use crate::error::Result;
use crate::view::View;

#[derive(Clone)]
pub struct SelectPlaneView {
    parent: Arc<dyn View>,
    plane: i64,
}

impl SelectPlaneView {
    pub fn new(parent: Arc<dyn View>, plane: i64) -> Result<Self> {
        if plane < 0 || plane >= parent.format().planes {
            return Err(Error::bounds(0, 0, 1, 1, parent.format().planes, 1));
        }
        Ok(Self { parent, plane })
    }
}

impl View for SelectPlaneView {
    fn format(&self) -> ImageFormat {
        let mut fmt = self.parent.format();
        fmt.planes = 1;
        fmt
    }

    fn sample(&self, col: i64, row: i64, plane: i64, out: &mut [u8]) -> Result<()> {
        self.parent.sample(col, row, self.plane + plane, out)
    }

    fn prerasterize(&self, bbox: Rect2i) -> Arc<dyn View> {
        let inner = self.parent.prerasterize(bbox);
        Arc::new(SelectPlaneView { parent: inner, plane: self.plane })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryView;
    use terra_core::channel::ChannelKind;
    use terra_core::pixel_format::PixelFormat;

    #[test]
    fn projects_requested_plane() {
        let fmt = ImageFormat::new(2, 2, 3, PixelFormat::Scalar, ChannelKind::U8);
        let mut mv = MemoryView::new(fmt).unwrap();
        {
            let mut buf = mv.as_image_buffer_mut().unwrap();
            buf.pixel_bytes_mut(0, 0, 2).unwrap().copy_from_slice(&[9]);
        }
        let view = SelectPlaneView::new(Arc::new(mv), 2).unwrap();
        assert_eq!(view.format().planes, 1);
        let mut out = [0u8; 1];
        view.sample(0, 0, 0, &mut out).unwrap();
        assert_eq!(out, [9]);
    }

    #[test]
    fn out_of_range_plane_rejected() {
        let fmt = ImageFormat::new(2, 2, 3, PixelFormat::Scalar, ChannelKind::U8);
        let mv = MemoryView::new(fmt).unwrap();
        assert!(SelectPlaneView::new(Arc::new(mv), 5).is_err());
    }
}
