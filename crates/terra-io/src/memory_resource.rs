//! `MemoryResource` (§4.4): an owning, in-memory `Resource`/`ResourceWrite`,
//! grounded on the original's `Image_Memory` (the allocation target of
//! `read_image_from_resource`) and on `vfx-io::imagebuf::storage`'s owned
//! buffer variants. Exists so `read_image`/`write_image` and the
//! `DriverManager` plumbing have a concrete, codec-free resource to round
//! trip through in tests — real backing codecs are out of scope (§1).

use terra_core::error::Error;
use terra_core::format::{ImageBuffer, ImageFormat};
use terra_core::rect::Rect2i;

use crate::error::Result;
use crate::resource::{Resource, ResourceWrite};

/// An in-memory resource: the whole raster lives in one owned buffer.
pub struct MemoryResource {
    format: ImageFormat,
    data: Vec<u8>,
    block_size: Option<(i64, i64)>,
    nodata: Option<f64>,
}

impl MemoryResource {
    /// Allocates a zero-filled resource for `format`.
    pub fn new(format: ImageFormat) -> Result<Self> {
        format.validate()?;
        let data = vec![0u8; format.raster_bytes()? as usize];
        Ok(Self { format, data, block_size: None, nodata: None })
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
        Ok(Self { format, data, block_size: None, nodata: None })
    }

    /// Declares a preferred block granularity, making `has_block_read`/
    /// `has_block_write` report `true`. Purely advisory bookkeeping — reads
    /// and writes accept any bbox regardless.
    pub fn with_block_size(mut self, width: i64, height: i64) -> Self {
        self.block_size = Some((width, height));
        self
    }

    pub fn as_image_buffer(&self) -> Result<ImageBuffer<'_>> {
        ImageBuffer::new(&self.data, self.format)
    }

    pub fn as_image_buffer_mut(&mut self) -> Result<ImageBuffer<'_>> {
        ImageBuffer::new_mut(&mut self.data, self.format)
    }

    fn full_bbox(&self) -> Rect2i {
        Rect2i::from_size(self.format.cols, self.format.rows)
    }
}

impl Resource for MemoryResource {
    fn format(&self) -> ImageFormat {
        self.format
    }

    fn read(&self, dest: &mut ImageBuffer, bbox: Rect2i) -> Result<()> {
        if !self.full_bbox().contains_rect(bbox) {
            return Err(Error::bounds(bbox.min_x, bbox.min_y, bbox.width, bbox.height, self.format.cols, self.format.rows));
        }
        let src = self.as_image_buffer()?;
        for plane in 0..self.format.planes {
            for row in 0..bbox.height {
                for col in 0..bbox.width {
                    let pixel = src.pixel_bytes(bbox.min_x + col, bbox.min_y + row, plane)?;
                    dest.pixel_bytes_mut(col, row, plane)?.copy_from_slice(pixel);
                }
            }
        }
        Ok(())
    }

    fn has_block_read(&self) -> bool {
        self.block_size.is_some()
    }

    fn block_read_size(&self) -> (i64, i64) {
        self.block_size.unwrap_or((self.format.cols, self.format.rows))
    }

    fn has_nodata_read(&self) -> bool {
        self.nodata.is_some()
    }

    fn nodata_read(&self) -> f64 {
        self.nodata.unwrap_or(0.0)
    }
}

impl ResourceWrite for MemoryResource {
    fn format(&self) -> ImageFormat {
        self.format
    }

    fn write(&mut self, src: &ImageBuffer, bbox: Rect2i) -> Result<()> {
        if !self.full_bbox().contains_rect(bbox) {
            return Err(Error::bounds(bbox.min_x, bbox.min_y, bbox.width, bbox.height, self.format.cols, self.format.rows));
        }
        let planes = self.format.planes;
        let mut dest = self.as_image_buffer_mut()?;
        for plane in 0..planes {
            for row in 0..bbox.height {
                for col in 0..bbox.width {
                    let pixel = src.pixel_bytes(col, row, plane)?;
                    dest.pixel_bytes_mut(bbox.min_x + col, bbox.min_y + row, plane)?.copy_from_slice(pixel);
                }
            }
        }
        Ok(())
    }

    fn has_block_write(&self) -> bool {
        self.block_size.is_some()
    }

    fn block_write_size(&self) -> (i64, i64) {
        self.block_size.unwrap_or((self.format.cols, self.format.rows))
    }

    fn set_block_write_size(&mut self, width: i64, height: i64) -> Result<()> {
        self.block_size = Some((width, height));
        Ok(())
    }

    fn has_nodata_write(&self) -> bool {
        self.nodata.is_some()
    }

    fn set_nodata_write(&mut self, value: f64) -> Result<()> {
        self.nodata = Some(value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use terra_core::channel::ChannelKind;
    use terra_core::pixel_format::PixelFormat;

    fn gray_u8(cols: i64, rows: i64) -> ImageFormat {
        ImageFormat::new(cols, rows, 1, PixelFormat::Gray, ChannelKind::U8)
    }

    #[test]
    fn read_and_write_round_trip_a_sub_region() {
        let mut res = MemoryResource::new(gray_u8(4, 4)).unwrap();
        let patch_fmt = ImageFormat { cols: 2, rows: 2, ..gray_u8(4, 4) };
        let patch_data = vec![9u8, 8, 7, 6];
        {
            let patch = ImageBuffer::new(&patch_data, patch_fmt).unwrap();
            res.write(&patch, Rect2i::new(1, 1, 2, 2)).unwrap();
        }

        let mut out = vec![0u8; 4];
        {
            let mut dest = ImageBuffer::new_mut(&mut out, patch_fmt).unwrap();
            res.read(&mut dest, Rect2i::new(1, 1, 2, 2)).unwrap();
        }
        assert_eq!(out, patch_data);
    }

    #[test]
    fn read_out_of_bounds_bbox_errors() {
        let res = MemoryResource::new(gray_u8(2, 2)).unwrap();
        let fmt = ImageFormat { cols: 2, rows: 2, ..gray_u8(2, 2) };
        let mut data = vec![0u8; 4];
        let mut dest = ImageBuffer::new_mut(&mut data, fmt).unwrap();
        assert!(res.read(&mut dest, Rect2i::new(1, 1, 4, 4)).unwrap_err().is_bounds_error());
    }

    #[test]
    fn block_size_is_advisory_until_set() {
        let res = MemoryResource::new(gray_u8(8, 8)).unwrap();
        assert!(!res.has_block_read());
        assert_eq!(res.block_read_size(), (8, 8));
        let res = res.with_block_size(4, 4);
        assert!(res.has_block_read());
        assert_eq!(res.block_read_size(), (4, 4));
    }

    #[test]
    fn nodata_defaults_to_unset() {
        let mut res = MemoryResource::new(gray_u8(2, 2)).unwrap();
        assert!(!res.has_nodata_read());
        ResourceWrite::set_nodata_write(&mut res, -9999.0).unwrap();
        assert!(res.has_nodata_write());
        assert_eq!(res.nodata_read(), -9999.0);
    }
}
