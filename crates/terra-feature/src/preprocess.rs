//! Shared detector pre-processing (§4.5 step 2), grounded on
//! `Detector_Image_Utilities.hpp::prepare_image_buffer`: converts an input
//! view into the pixel format/channel kind a detector requires, reusing
//! `View::rasterize`'s conversion path rather than reimplementing it.

use terra_core::channel::ChannelKind;
use terra_core::error::Error;
use terra_core::format::ImageFormat;
use terra_core::pixel_format::PixelFormat;
use terra_view::{MemoryView, View};

use crate::error::Result;

/// A view prepared for a detector: either `input` unchanged, or a freshly
/// rasterized `MemoryView` in the required format.
pub enum PreparedView<'a> {
    /// The input already matched; no conversion needed.
    Unchanged(&'a dyn View),
    /// The input was rasterized into a converted buffer.
    Converted(MemoryView),
}

impl<'a> PreparedView<'a> {
    pub fn as_view(&self) -> &dyn View {
        match self {
            PreparedView::Unchanged(v) => *v,
            PreparedView::Converted(v) => v,
        }
    }
}

/// Prepares `input` for a detector requiring `required_format`/`required_kind`.
///
/// Passes `input` through unchanged if it already matches. Otherwise, if
/// `cast_if_unsupported` is set (or only the pixel format differs, which is
/// always safe to rescale), rasterizes `input` into a `MemoryView` in the
/// required format. Fails with `InvalidChannelType` if the channel kind
/// differs and `cast_if_unsupported` is false.
///
/// Takes `input` by reference (rather than `Arc<dyn View>`) since this is
/// called from `Detector::detect`, which only receives a `&dyn View` — the
/// caller (`FeatureTileQueue`) retains the owning `Arc`.
pub fn prepare_view<'a>(input: &'a dyn View, required_format: PixelFormat, required_kind: ChannelKind, cast_if_unsupported: bool) -> Result<PreparedView<'a>> {
    let fmt = input.format();
    if fmt.pixel_format == required_format && fmt.channel_kind == required_kind {
        return Ok(PreparedView::Unchanged(input));
    }

    if fmt.channel_kind != required_kind && !cast_if_unsupported {
        return Err(Error::invalid_channel_type(format!(
            "detector requires channel kind {required_kind:?}, input is {:?} and cast_if_unsupported is false",
            fmt.channel_kind
        )));
    }

    let target_format = ImageFormat::new(fmt.cols, fmt.rows, fmt.planes, required_format, required_kind);
    let mut buf = MemoryView::new(target_format)?;
    {
        let mut dest = buf.as_image_buffer_mut()?;
        input.rasterize(&mut dest, input.full_bbox())?;
    }
    Ok(PreparedView::Converted(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use terra_view::MemoryView as TView;

    #[test]
    fn matching_format_passes_through_unchanged() {
        let fmt = ImageFormat::new(2, 2, 1, PixelFormat::Gray, ChannelKind::U8);
        let view = TView::new(fmt).unwrap();
        let prepared = prepare_view(&view, PixelFormat::Gray, ChannelKind::U8, false).unwrap();
        assert!(matches!(prepared, PreparedView::Unchanged(_)));
    }

    #[test]
    fn mismatched_pixel_format_converts() {
        let fmt = ImageFormat::new(2, 2, 1, PixelFormat::Rgb, ChannelKind::U8);
        let view = TView::new(fmt).unwrap();
        let prepared = prepare_view(&view, PixelFormat::Gray, ChannelKind::U8, false).unwrap();
        match prepared {
            PreparedView::Converted(mv) => assert_eq!(mv.format().pixel_format, PixelFormat::Gray),
            _ => panic!("expected conversion"),
        }
    }

    #[test]
    fn mismatched_channel_kind_without_cast_flag_errors() {
        let fmt = ImageFormat::new(2, 2, 1, PixelFormat::Gray, ChannelKind::F32);
        let view = TView::new(fmt).unwrap();
        let err = prepare_view(&view, PixelFormat::Gray, ChannelKind::U8, false).unwrap_err();
        assert!(matches!(err, Error::InvalidChannelType { .. }));
    }

    #[test]
    fn mismatched_channel_kind_with_cast_flag_converts() {
        let fmt = ImageFormat::new(2, 2, 1, PixelFormat::Gray, ChannelKind::F32);
        let view = TView::new(fmt).unwrap();
        let prepared = prepare_view(&view, PixelFormat::Gray, ChannelKind::U8, true).unwrap();
        assert!(matches!(prepared, PreparedView::Converted(_)));
    }
}
