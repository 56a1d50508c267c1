//! `ImageFormat` and `ImageBuffer` — the format descriptor and the
//! non-owning pixel-region descriptor built on top of it.
//!
//! The original expresses `ImageBuffer` as a raw pointer plus strides; this
//! rendition keeps the same descriptor shape but backs it with a borrowed
//! byte slice instead of a raw pointer, so out-of-bounds access is a bounds
//! check rather than undefined behavior — the non-owning/no-free contract is
//! unchanged, only the unsafety is removed.

use crate::channel::ChannelKind;
use crate::error::{Error, Result};
use crate::pixel_format::PixelFormat;

/// Per-side pixel cap from §7 `OutOfMemory`.
pub const MAX_SIDE_PX: i64 = 100_000;
/// Plane-count cap from §7 `OutOfMemory`.
pub const MAX_PLANES: i64 = 1024;
/// Total-pixel cap from §7 `OutOfMemory`.
pub const MAX_TOTAL_PIXELS: i64 = 6_400_000_000;

/// The shape and pixel semantics of an image: dimensions, pixel arrangement,
/// channel scalar type, and whether alpha-bearing channels are
/// premultiplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageFormat {
    pub cols: i64,
    pub rows: i64,
    pub planes: i64,
    pub pixel_format: PixelFormat,
    pub channel_kind: ChannelKind,
    /// `true` means alpha-associated channels are already multiplied by alpha.
    pub premultiply: bool,
}

impl ImageFormat {
    pub fn new(cols: i64, rows: i64, planes: i64, pixel_format: PixelFormat, channel_kind: ChannelKind) -> Self {
        Self { cols, rows, planes, pixel_format, channel_kind, premultiply: false }
    }

    pub fn with_premultiply(mut self, premultiply: bool) -> Self {
        self.premultiply = premultiply;
        self
    }

    pub fn channels(self) -> Result<usize> {
        self.pixel_format.channels()
    }

    pub fn bytes_per_pixel(self) -> Result<i64> {
        let kind_bytes = self
            .channel_kind
            .byte_size()
            .ok_or_else(|| Error::invalid_channel_type("Unknown channel kind has no byte size"))? as i64;
        let storage_channels = if self.pixel_format.is_masked() {
            self.channels()? + 1
        } else {
            self.channels()?
        };
        Ok(kind_bytes * storage_channels as i64)
    }

    pub fn cstride(self) -> Result<i64> {
        self.bytes_per_pixel()
    }

    pub fn rstride(self) -> Result<i64> {
        Ok(self.cstride()? * self.cols)
    }

    pub fn pstride(self) -> Result<i64> {
        Ok(self.rstride()? * self.rows)
    }

    pub fn raster_bytes(self) -> Result<i64> {
        Ok(self.pstride()? * self.planes)
    }

    /// Validates the invariants from §3/§7: non-negative dimensions, at
    /// least one plane, multi-plane and multi-channel mutual exclusivity,
    /// and the `OutOfMemory` caps.
    pub fn validate(self) -> Result<()> {
        if self.cols < 0 || self.rows < 0 || self.planes < 1 {
            return Err(Error::invalid_config(format!(
                "cols/rows must be >= 0 and planes >= 1, got cols={}, rows={}, planes={}",
                self.cols, self.rows, self.planes
            )));
        }
        let channels = self.channels()? as i64;
        if self.planes > 1 && channels > 1 {
            return Err(Error::invalid_config(format!(
                "planes ({}) and channels ({}) cannot both exceed 1",
                self.planes, channels
            )));
        }
        if self.cols > MAX_SIDE_PX || self.rows > MAX_SIDE_PX {
            return Err(Error::out_of_memory(
                format!("side exceeds cap of {MAX_SIDE_PX} px"),
                self.cols,
                self.rows,
                self.planes,
            ));
        }
        if self.planes >= MAX_PLANES {
            return Err(Error::out_of_memory(
                format!("plane count exceeds cap of {MAX_PLANES}"),
                self.cols,
                self.rows,
                self.planes,
            ));
        }
        let total = self.cols.saturating_mul(self.rows).saturating_mul(self.planes);
        if total >= MAX_TOTAL_PIXELS {
            return Err(Error::out_of_memory(
                format!("total pixel count exceeds cap of {MAX_TOTAL_PIXELS}"),
                self.cols,
                self.rows,
                self.planes,
            ));
        }
        Ok(())
    }
}

enum BufferData<'a> {
    ReadOnly(&'a [u8]),
    ReadWrite(&'a mut [u8]),
}

/// A non-owning descriptor of a rectangular pixel region: a borrowed byte
/// slice plus a format and col/row/plane byte strides. Strides may exceed
/// the format's default (e.g. for a view into a larger padded buffer).
pub struct ImageBuffer<'a> {
    data: BufferData<'a>,
    format: ImageFormat,
    cstride: i64,
    rstride: i64,
    pstride: i64,
}

impl<'a> ImageBuffer<'a> {
    pub fn new(data: &'a [u8], format: ImageFormat) -> Result<Self> {
        let cstride = format.cstride()?;
        let rstride = format.rstride()?;
        let pstride = format.pstride()?;
        Self::with_strides(BufferData::ReadOnly(data), format, cstride, rstride, pstride)
    }

    pub fn new_mut(data: &'a mut [u8], format: ImageFormat) -> Result<Self> {
        let cstride = format.cstride()?;
        let rstride = format.rstride()?;
        let pstride = format.pstride()?;
        Self::with_strides(BufferData::ReadWrite(data), format, cstride, rstride, pstride)
    }

    fn with_strides(
        data: BufferData<'a>,
        format: ImageFormat,
        cstride: i64,
        rstride: i64,
        pstride: i64,
    ) -> Result<Self> {
        let default_cstride = format.cstride()?;
        if cstride < default_cstride {
            return Err(Error::invalid_config("cstride smaller than format's bytes_per_pixel"));
        }
        let required = (pstride * format.planes).max(rstride * format.rows).max(cstride * format.cols) as usize;
        let len = match &data {
            BufferData::ReadOnly(s) => s.len(),
            BufferData::ReadWrite(s) => s.len(),
        };
        if len < required {
            return Err(Error::invalid_config(format!(
                "buffer of {len} bytes is too small for strides (needs >= {required})"
            )));
        }
        Ok(Self { data, format, cstride, rstride, pstride })
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn cols(&self) -> i64 {
        self.format.cols
    }

    pub fn rows(&self) -> i64 {
        self.format.rows
    }

    pub fn planes(&self) -> i64 {
        self.format.planes
    }

    pub fn cstride(&self) -> i64 {
        self.cstride
    }

    pub fn rstride(&self) -> i64 {
        self.rstride
    }

    pub fn pstride(&self) -> i64 {
        self.pstride
    }

    pub fn is_writable(&self) -> bool {
        matches!(self.data, BufferData::ReadWrite(_))
    }

    fn offset(&self, col: i64, row: i64, plane: i64) -> Result<usize> {
        if col < 0 || col >= self.format.cols || row < 0 || row >= self.format.rows || plane < 0 || plane >= self.format.planes {
            return Err(Error::bounds(col, row, 1, 1, self.format.cols, self.format.rows));
        }
        Ok((col * self.cstride + row * self.rstride + plane * self.pstride) as usize)
    }

    /// Returns the `bytes_per_pixel`-sized slice for a single pixel.
    pub fn pixel_bytes(&self, col: i64, row: i64, plane: i64) -> Result<&[u8]> {
        let off = self.offset(col, row, plane)?;
        let bpp = self.format.bytes_per_pixel()? as usize;
        let slice: &[u8] = match &self.data {
            BufferData::ReadOnly(s) => s,
            BufferData::ReadWrite(s) => s,
        };
        Ok(&slice[off..off + bpp])
    }

    /// Returns the mutable `bytes_per_pixel`-sized slice for a single pixel.
    /// Fails with `InvalidConfig` if this buffer was constructed read-only.
    pub fn pixel_bytes_mut(&mut self, col: i64, row: i64, plane: i64) -> Result<&mut [u8]> {
        let off = self.offset(col, row, plane)?;
        let bpp = self.format.bytes_per_pixel()? as usize;
        match &mut self.data {
            BufferData::ReadWrite(s) => Ok(&mut s[off..off + bpp]),
            BufferData::ReadOnly(_) => Err(Error::invalid_config("pixel_bytes_mut on a read-only ImageBuffer")),
        }
    }

    /// The full backing slice (read-only view, regardless of writability).
    pub fn as_bytes(&self) -> &[u8] {
        match &self.data {
            BufferData::ReadOnly(s) => s,
            BufferData::ReadWrite(s) => s,
        }
    }

    /// The full backing slice, mutable. Fails with `InvalidConfig` if this
    /// buffer was constructed read-only.
    ///
    /// Exposed (beyond the per-pixel `pixel_bytes_mut`) so a parallel
    /// block-dispatch writer can compute one raw pointer over the whole
    /// buffer up front and hand disjoint sub-ranges to worker threads,
    /// rather than re-deriving a bounds-checked borrow per pixel per thread.
    pub fn as_bytes_mut(&mut self) -> Result<&mut [u8]> {
        match &mut self.data {
            BufferData::ReadWrite(s) => Ok(s),
            BufferData::ReadOnly(_) => Err(Error::invalid_config("as_bytes_mut on a read-only ImageBuffer")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb_u8_format(cols: i64, rows: i64) -> ImageFormat {
        ImageFormat::new(cols, rows, 1, PixelFormat::Rgb, ChannelKind::U8)
    }

    #[test]
    fn strides_derive_correctly() {
        let fmt = rgb_u8_format(4, 3);
        assert_eq!(fmt.bytes_per_pixel().unwrap(), 3);
        assert_eq!(fmt.cstride().unwrap(), 3);
        assert_eq!(fmt.rstride().unwrap(), 12);
        assert_eq!(fmt.pstride().unwrap(), 36);
        assert_eq!(fmt.raster_bytes().unwrap(), 36);
    }

    #[test]
    fn multi_plane_and_multi_channel_are_mutually_exclusive() {
        let fmt = ImageFormat::new(4, 4, 2, PixelFormat::Rgb, ChannelKind::U8);
        assert!(fmt.validate().is_err());
    }

    #[test]
    fn out_of_memory_caps_are_enforced() {
        let fmt = ImageFormat::new(MAX_SIDE_PX + 1, 4, 1, PixelFormat::Gray, ChannelKind::U8);
        assert!(fmt.validate().unwrap_err().is_out_of_memory());
    }

    #[test]
    fn buffer_roundtrips_pixel_bytes() {
        let fmt = rgb_u8_format(2, 2);
        let mut data = vec![0u8; fmt.raster_bytes().unwrap() as usize];
        {
            let mut buf = ImageBuffer::new_mut(&mut data, fmt).unwrap();
            buf.pixel_bytes_mut(1, 1, 0).unwrap().copy_from_slice(&[9, 8, 7]);
        }
        let buf = ImageBuffer::new(&data, fmt).unwrap();
        assert_eq!(buf.pixel_bytes(1, 1, 0).unwrap(), &[9, 8, 7]);
        assert_eq!(buf.pixel_bytes(0, 0, 0).unwrap(), &[0, 0, 0]);
    }

    #[test]
    fn out_of_bounds_pixel_access_errors() {
        let fmt = rgb_u8_format(2, 2);
        let data = vec![0u8; fmt.raster_bytes().unwrap() as usize];
        let buf = ImageBuffer::new(&data, fmt).unwrap();
        assert!(buf.pixel_bytes(5, 5, 0).unwrap_err().is_bounds_error());
    }

    #[test]
    fn read_only_buffer_rejects_mutation() {
        let fmt = rgb_u8_format(1, 1);
        let data = vec![0u8; fmt.raster_bytes().unwrap() as usize];
        let mut buf = ImageBuffer::new(&data, fmt).unwrap();
        assert!(buf.pixel_bytes_mut(0, 0, 0).is_err());
    }
}
