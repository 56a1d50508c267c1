//! Whole-buffer pixel conversion (§4.1): format compatibility checking,
//! channel-count transform policy (`copy_length`/`triplicate`/`average`/
//! `copy_alpha`/`add_alpha`), alpha premultiplication, and the validity
//! channel of masked formats, all driven through [`convert_channel`].

use crate::channel::{convert_channel, max_channel_value, ChannelKind, ChannelValue};
use crate::error::{Error, Result};
use crate::format::{ImageBuffer, ImageFormat};
use crate::mask;
use crate::pixel_format::PixelFormat;

/// The pixel-format view each side of a conversion is sampled through, after
/// resolving the Scalar-reinterpretation special case. `plane_scalar` means
/// each logical channel of that side lives in its own plane (at `plane =
/// channel_index`) rather than packed within one pixel's bytes.
struct EffectiveShape {
    src_format: PixelFormat,
    dst_format: PixelFormat,
    src_plane_scalar: bool,
    dst_plane_scalar: bool,
}

fn allowed_fallback(format: PixelFormat) -> bool {
    matches!(
        format.unmasked(),
        PixelFormat::Gray | PixelFormat::GrayA | PixelFormat::Rgb | PixelFormat::Rgba | PixelFormat::Xyz
    )
}

fn classify(src: ImageFormat, dst: ImageFormat) -> Result<EffectiveShape> {
    if src.pixel_format == dst.pixel_format {
        return Ok(EffectiveShape {
            src_format: src.pixel_format,
            dst_format: dst.pixel_format,
            src_plane_scalar: false,
            dst_plane_scalar: false,
        });
    }

    let src_ch = src.pixel_format.channels();
    let dst_ch = dst.pixel_format.channels();

    if src.pixel_format.unmasked() == PixelFormat::Scalar && dst.planes == 1 {
        if let Ok(d) = dst_ch {
            if src.planes == d as i64 {
                return Ok(EffectiveShape {
                    src_format: dst.pixel_format,
                    dst_format: dst.pixel_format,
                    src_plane_scalar: true,
                    dst_plane_scalar: false,
                });
            }
        }
    }
    if dst.pixel_format.unmasked() == PixelFormat::Scalar && src.planes == 1 {
        if let Ok(s) = src_ch {
            if dst.planes == s as i64 {
                return Ok(EffectiveShape {
                    src_format: src.pixel_format,
                    dst_format: src.pixel_format,
                    src_plane_scalar: false,
                    dst_plane_scalar: true,
                });
            }
        }
    }

    let is_generic = |f: PixelFormat| matches!(f, PixelFormat::GenericN(_));
    if is_generic(src.pixel_format) || is_generic(dst.pixel_format) {
        if let (Ok(s), Ok(d)) = (src_ch, dst_ch) {
            if s == d {
                return Ok(EffectiveShape {
                    src_format: src.pixel_format,
                    dst_format: dst.pixel_format,
                    src_plane_scalar: false,
                    dst_plane_scalar: false,
                });
            }
        }
        return Err(Error::invalid_pixel_format(
            "Generic_N and a named format must share the same visible channel count",
        ));
    }

    if src.pixel_format.unmasked() == dst.pixel_format.unmasked() {
        return Ok(EffectiveShape {
            src_format: src.pixel_format,
            dst_format: dst.pixel_format,
            src_plane_scalar: false,
            dst_plane_scalar: false,
        });
    }

    if allowed_fallback(src.pixel_format) && allowed_fallback(dst.pixel_format) {
        return Ok(EffectiveShape {
            src_format: src.pixel_format,
            dst_format: dst.pixel_format,
            src_plane_scalar: false,
            dst_plane_scalar: false,
        });
    }

    Err(Error::invalid_pixel_format(format!(
        "{:?} cannot convert to {:?}",
        src.pixel_format, dst.pixel_format
    )))
}

fn read_logical_channel(buf: &ImageBuffer, col: i64, row: i64, channel: usize, plane_scalar: bool, kind: ChannelKind) -> Result<ChannelValue> {
    if plane_scalar {
        ChannelValue::read(kind, buf.pixel_bytes(col, row, channel as i64)?)
    } else {
        let bpp = kind.byte_size().ok_or_else(|| Error::invalid_channel_type("Unknown channel kind has no byte size"))?;
        let bytes = buf.pixel_bytes(col, row, 0)?;
        ChannelValue::read(kind, &bytes[channel * bpp..])
    }
}

fn write_logical_channel(
    buf: &mut ImageBuffer,
    col: i64,
    row: i64,
    channel: usize,
    value: ChannelValue,
    plane_scalar: bool,
) -> Result<()> {
    if plane_scalar {
        value.write(buf.pixel_bytes_mut(col, row, channel as i64)?)
    } else {
        let bpp = value
            .kind()
            .byte_size()
            .ok_or_else(|| Error::invalid_channel_type("Unknown channel kind has no byte size"))?;
        let bytes = buf.pixel_bytes_mut(col, row, 0)?;
        value.write(&mut bytes[channel * bpp..])
    }
}

fn premultiply_value(color: ChannelValue, alpha_ratio: f64) -> ChannelValue {
    let raw = color.as_f64_raw() * alpha_ratio;
    let raw = if color.kind().is_integer() { raw.round() } else { raw };
    ChannelValue::from_f64_raw(color.kind(), raw)
}

fn unpremultiply_value(color: ChannelValue, alpha_ratio: f64) -> ChannelValue {
    if alpha_ratio == 0.0 {
        return ChannelValue::from_f64_raw(color.kind(), 0.0);
    }
    let raw = color.as_f64_raw() / alpha_ratio;
    let raw = if color.kind().is_integer() { raw.round() } else { raw };
    ChannelValue::from_f64_raw(color.kind(), raw)
}

/// Converts `src` into `dst` per §4.1. Requires matching `cols`/`rows`;
/// `planes` may differ only in the Scalar-reinterpretation case.
pub fn convert(dst: &mut ImageBuffer, src: &ImageBuffer, rescale: bool) -> Result<()> {
    if src.cols() != dst.cols() || src.rows() != dst.rows() {
        return Err(Error::invalid_config("convert requires src.cols == dst.cols and src.rows == dst.rows"));
    }

    let shape = classify(src.format(), dst.format())?;
    let src_kind = src.format().channel_kind;
    let dst_kind = dst.format().channel_kind;

    let src_total = shape.src_format.channels()?;
    let dst_total = shape.dst_format.channels()?;
    let src_has_alpha = shape.src_format.has_alpha();
    let dst_has_alpha = shape.dst_format.has_alpha();
    let src_masked = shape.src_format.is_masked();
    let dst_masked = shape.dst_format.is_masked();
    let src_premultiplied = src.format().premultiply;
    let dst_premultiplied = dst.format().premultiply;

    let src_color = src_total - usize::from(src_has_alpha);
    let dst_color = dst_total - usize::from(dst_has_alpha);

    let unpremultiply_src = src_has_alpha && src_premultiplied && !dst_premultiplied;
    let premultiply_src = src_has_alpha && !dst_has_alpha && !src_premultiplied;
    let premultiply_dst = src_has_alpha && dst_has_alpha && !src_premultiplied && dst_premultiplied;

    for row in 0..src.rows() {
        for col in 0..src.cols() {
            let src_alpha = if src_has_alpha {
                Some(read_logical_channel(src, col, row, src_total - 1, shape.src_plane_scalar, src_kind)?)
            } else {
                None
            };

            let dst_alpha = match (src_alpha, dst_has_alpha) {
                (Some(a), true) => Some(convert_channel(a, dst_kind, rescale)?),
                (None, true) => Some(max_channel_value(dst_kind)?),
                (_, false) => None,
            };

            let src_alpha_ratio = src_alpha.map(|a| a.as_f64_raw() / a.kind().max_value_for_kind().unwrap_or(1.0));
            let dst_alpha_ratio = dst_alpha.map(|a| a.as_f64_raw() / a.kind().max_value_for_kind().unwrap_or(1.0));

            let mut src_colors = Vec::with_capacity(src_color);
            for c in 0..src_color {
                let mut v = read_logical_channel(src, col, row, c, shape.src_plane_scalar, src_kind)?;
                if unpremultiply_src {
                    v = unpremultiply_value(v, src_alpha_ratio.unwrap_or(1.0));
                } else if premultiply_src {
                    v = premultiply_value(v, src_alpha_ratio.unwrap_or(1.0));
                }
                src_colors.push(v);
            }

            let mut dst_colors = transform_color_channels(&src_colors, dst_color, dst_kind, rescale)?;

            if premultiply_dst {
                let ratio = dst_alpha_ratio.unwrap_or(1.0);
                for v in dst_colors.iter_mut() {
                    *v = premultiply_value(*v, ratio);
                }
            }

            for (c, v) in dst_colors.into_iter().enumerate() {
                write_logical_channel(dst, col, row, c, v, shape.dst_plane_scalar)?;
            }
            if let Some(a) = dst_alpha {
                write_logical_channel(dst, col, row, dst_total - 1, a, shape.dst_plane_scalar)?;
            }

            match (src_masked, dst_masked) {
                (true, true) => {
                    let v = read_logical_channel(src, col, row, src_total, shape.src_plane_scalar, src_kind)?;
                    let converted = convert_channel(v, dst_kind, rescale)?;
                    write_logical_channel(dst, col, row, dst_total, converted, shape.dst_plane_scalar)?;
                }
                (false, true) => {
                    write_logical_channel(dst, col, row, dst_total, mask::valid_sentinel(dst_kind)?, shape.dst_plane_scalar)?;
                }
                _ => {}
            }
        }
    }

    Ok(())
}

fn transform_color_channels(src: &[ChannelValue], dst_count: usize, dst_kind: ChannelKind, rescale: bool) -> Result<Vec<ChannelValue>> {
    let src_count = src.len();

    if src_count == dst_count {
        return src.iter().map(|&v| convert_channel(v, dst_kind, rescale)).collect();
    }

    if src_count == 1 && dst_count >= 3 {
        let converted = convert_channel(src[0], dst_kind, rescale)?;
        let mut out = vec![converted; 3];
        out.resize(dst_count, converted);
        return Ok(out);
    }

    // src has >= 3 color channels and dst has < 3: copy_length policy (S1)
    // takes the first channel verbatim rather than averaging the three.
    let copy_length = if src_count >= 3 && dst_count >= 3 { 3 } else { 1 };
    let mut out = Vec::with_capacity(dst_count);
    for i in 0..copy_length.min(src_count) {
        out.push(convert_channel(src[i], dst_kind, rescale)?);
    }
    let filler = out.last().copied().unwrap_or_else(|| mask::invalid_sentinel(dst_kind));
    out.resize(dst_count, filler);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel_format::PixelFormat;

    fn make_buf<'a>(data: &'a mut Vec<u8>, format: ImageFormat) -> ImageBuffer<'a> {
        *data = vec![0u8; format.raster_bytes().unwrap() as usize];
        ImageBuffer::new_mut(data, format).unwrap()
    }

    #[test]
    fn gray_to_rgb_triplicates() {
        let src_fmt = ImageFormat::new(1, 1, 1, PixelFormat::Gray, ChannelKind::U8);
        let dst_fmt = ImageFormat::new(1, 1, 1, PixelFormat::Rgb, ChannelKind::U8);
        let mut src_data = Vec::new();
        {
            let mut src_buf = make_buf(&mut src_data, src_fmt);
            src_buf.pixel_bytes_mut(0, 0, 0).unwrap().copy_from_slice(&[42]);
        }
        let src_buf = ImageBuffer::new(&src_data, src_fmt).unwrap();
        let mut dst_data = vec![0u8; dst_fmt.raster_bytes().unwrap() as usize];
        let mut dst_buf = ImageBuffer::new_mut(&mut dst_data, dst_fmt).unwrap();
        convert(&mut dst_buf, &src_buf, false).unwrap();
        assert_eq!(dst_buf.pixel_bytes(0, 0, 0).unwrap(), &[42, 42, 42]);
    }

    #[test]
    fn rgb_to_gray_is_first_channel_copy_not_average() {
        // S1: copy_length policy copies the first channel verbatim; this is
        // NOT a luminance/average reduction (see DESIGN.md Open Question 1).
        let src_fmt = ImageFormat::new(1, 1, 1, PixelFormat::Rgb, ChannelKind::U8);
        let dst_fmt = ImageFormat::new(1, 1, 1, PixelFormat::Gray, ChannelKind::U8);
        let mut src_data = Vec::new();
        {
            let mut src_buf = make_buf(&mut src_data, src_fmt);
            src_buf.pixel_bytes_mut(0, 0, 0).unwrap().copy_from_slice(&[12, 34, 56]);
        }
        let src_buf = ImageBuffer::new(&src_data, src_fmt).unwrap();
        let mut dst_data = vec![0u8; dst_fmt.raster_bytes().unwrap() as usize];
        let mut dst_buf = ImageBuffer::new_mut(&mut dst_data, dst_fmt).unwrap();
        convert(&mut dst_buf, &src_buf, false).unwrap();
        assert_eq!(dst_buf.pixel_bytes(0, 0, 0).unwrap(), &[12]);
    }

    #[test]
    fn rgba_to_rgb_drops_alpha() {
        let src_fmt = ImageFormat::new(1, 1, 1, PixelFormat::Rgba, ChannelKind::U8);
        let dst_fmt = ImageFormat::new(1, 1, 1, PixelFormat::Rgb, ChannelKind::U8);
        let mut src_data = Vec::new();
        {
            let mut src_buf = make_buf(&mut src_data, src_fmt);
            src_buf.pixel_bytes_mut(0, 0, 0).unwrap().copy_from_slice(&[100, 150, 200, 255]);
        }
        let src_buf = ImageBuffer::new(&src_data, src_fmt).unwrap();
        let mut dst_data = vec![0u8; dst_fmt.raster_bytes().unwrap() as usize];
        let mut dst_buf = ImageBuffer::new_mut(&mut dst_data, dst_fmt).unwrap();
        convert(&mut dst_buf, &src_buf, false).unwrap();
        // alpha is fully opaque (255), so premultiply_src is a no-op here.
        assert_eq!(dst_buf.pixel_bytes(0, 0, 0).unwrap(), &[100, 150, 200]);
    }

    #[test]
    fn rgb_to_rgba_adds_opaque_alpha() {
        let src_fmt = ImageFormat::new(1, 1, 1, PixelFormat::Rgb, ChannelKind::U8);
        let dst_fmt = ImageFormat::new(1, 1, 1, PixelFormat::Rgba, ChannelKind::U8);
        let mut src_data = Vec::new();
        {
            let mut src_buf = make_buf(&mut src_data, src_fmt);
            src_buf.pixel_bytes_mut(0, 0, 0).unwrap().copy_from_slice(&[1, 2, 3]);
        }
        let src_buf = ImageBuffer::new(&src_data, src_fmt).unwrap();
        let mut dst_data = vec![0u8; dst_fmt.raster_bytes().unwrap() as usize];
        let mut dst_buf = ImageBuffer::new_mut(&mut dst_data, dst_fmt).unwrap();
        convert(&mut dst_buf, &src_buf, false).unwrap();
        assert_eq!(dst_buf.pixel_bytes(0, 0, 0).unwrap(), &[1, 2, 3, 255]);
    }

    #[test]
    fn incompatible_formats_are_rejected() {
        let src_fmt = ImageFormat::new(1, 1, 1, PixelFormat::Hsv, ChannelKind::U8);
        let dst_fmt = ImageFormat::new(1, 1, 1, PixelFormat::Lab, ChannelKind::U8);
        let mut src_data = Vec::new();
        let src_buf = make_buf(&mut src_data, src_fmt);
        let mut dst_data = vec![0u8; dst_fmt.raster_bytes().unwrap() as usize];
        let mut dst_buf = ImageBuffer::new_mut(&mut dst_data, dst_fmt).unwrap();
        let src_ro = ImageBuffer::new(src_buf.as_bytes(), src_fmt).unwrap();
        assert!(convert(&mut dst_buf, &src_ro, false).is_err());
    }

    #[test]
    fn masked_to_nonmasked_drops_validity() {
        let src_fmt = ImageFormat::new(1, 1, 1, PixelFormat::GrayMasked, ChannelKind::U8);
        let dst_fmt = ImageFormat::new(1, 1, 1, PixelFormat::Gray, ChannelKind::U8);
        let mut src_data = vec![0u8; src_fmt.raster_bytes().unwrap() as usize];
        src_data[0] = 77;
        src_data[1] = 0; // invalid, irrelevant once mask is dropped
        let src_buf = ImageBuffer::new(&src_data, src_fmt).unwrap();
        let mut dst_data = vec![0u8; dst_fmt.raster_bytes().unwrap() as usize];
        let mut dst_buf = ImageBuffer::new_mut(&mut dst_data, dst_fmt).unwrap();
        convert(&mut dst_buf, &src_buf, false).unwrap();
        assert_eq!(dst_buf.pixel_bytes(0, 0, 0).unwrap(), &[77]);
    }
}
