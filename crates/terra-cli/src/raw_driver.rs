//! A tiny headered raw-raster file format (`.traw`), grounded on
//! `terra_io::memory_resource::MemoryResource` for the `Resource`/
//! `ResourceWrite` bodies but backed by a real file on disk rather than an
//! in-process buffer.
//!
//! Concrete codecs are out of this workspace's scope (§1) — `terra-io`
//! itself only ships the plumbing and an in-memory reference resource. This
//! driver exists so the CLI binary has something to actually read and write
//! against on a filesystem, exercising `DriverManager`/`read_image`/
//! `write_image` end to end without pulling in a real image codec crate.
//!
//! Layout: a 33-byte header (`b"TRAW"`, a version byte, `cols`/`rows`/
//! `planes` as little-endian `i64`, a pixel-format tag byte, a `GenericN`
//! extra byte, a channel-kind tag byte, and a premultiply flag byte)
//! followed by the raster bytes in `ImageFormat`'s native (tightly packed)
//! strides.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use terra_core::channel::ChannelKind;
use terra_core::error::Error;
use terra_core::format::{ImageBuffer, ImageFormat};
use terra_core::pixel_format::PixelFormat;
use terra_core::rect::Rect2i;
use terra_io::driver::DriverFactory;
use terra_io::error::Result;
use terra_io::resource::{Resource, ResourceWrite};

const MAGIC: &[u8; 4] = b"TRAW";
const VERSION: u8 = 1;
const HEADER_LEN: usize = 33;

fn pixel_format_tag(pf: PixelFormat) -> (u8, u8) {
    use PixelFormat::*;
    match pf {
        Scalar => (0, 0),
        Gray => (1, 0),
        GrayA => (2, 0),
        Rgb => (3, 0),
        Rgba => (4, 0),
        Hsv => (5, 0),
        Xyz => (6, 0),
        Luv => (7, 0),
        Lab => (8, 0),
        ScalarMasked => (9, 0),
        GrayMasked => (10, 0),
        GrayAMasked => (11, 0),
        RgbMasked => (12, 0),
        RgbaMasked => (13, 0),
        HsvMasked => (14, 0),
        XyzMasked => (15, 0),
        LuvMasked => (16, 0),
        LabMasked => (17, 0),
        GenericN(n) => (100, n),
        Unknown => (255, 0),
    }
}

fn tag_to_pixel_format(tag: u8, extra: u8) -> Result<PixelFormat> {
    use PixelFormat::*;
    Ok(match tag {
        0 => Scalar,
        1 => Gray,
        2 => GrayA,
        3 => Rgb,
        4 => Rgba,
        5 => Hsv,
        6 => Xyz,
        7 => Luv,
        8 => Lab,
        9 => ScalarMasked,
        10 => GrayMasked,
        11 => GrayAMasked,
        12 => RgbMasked,
        13 => RgbaMasked,
        14 => HsvMasked,
        15 => XyzMasked,
        16 => LuvMasked,
        17 => LabMasked,
        100 => GenericN(extra),
        255 => Unknown,
        other => return Err(Error::parsing(format!("unrecognized .traw pixel format tag {other}"))),
    })
}

fn channel_kind_tag(kind: ChannelKind) -> u8 {
    use ChannelKind::*;
    match kind {
        U8 => 0,
        U12 => 1,
        U14 => 2,
        U16 => 3,
        U32 => 4,
        U64 => 5,
        I8 => 6,
        I16 => 7,
        I32 => 8,
        I64 => 9,
        F32 => 10,
        F64 => 11,
        F32Free => 12,
        F64Free => 13,
        Unknown => 255,
    }
}

fn tag_to_channel_kind(tag: u8) -> Result<ChannelKind> {
    use ChannelKind::*;
    Ok(match tag {
        0 => U8,
        1 => U12,
        2 => U14,
        3 => U16,
        4 => U32,
        5 => U64,
        6 => I8,
        7 => I16,
        8 => I32,
        9 => I64,
        10 => F32,
        11 => F64,
        12 => F32Free,
        13 => F64Free,
        255 => Unknown,
        other => return Err(Error::parsing(format!("unrecognized .traw channel kind tag {other}"))),
    })
}

fn encode_header(format: ImageFormat) -> Result<[u8; HEADER_LEN]> {
    let mut header = [0u8; HEADER_LEN];
    header[0..4].copy_from_slice(MAGIC);
    header[4] = VERSION;
    header[5..13].copy_from_slice(&format.cols.to_le_bytes());
    header[13..21].copy_from_slice(&format.rows.to_le_bytes());
    header[21..29].copy_from_slice(&format.planes.to_le_bytes());
    let (pf_tag, pf_extra) = pixel_format_tag(format.pixel_format);
    header[29] = pf_tag;
    header[30] = pf_extra;
    header[31] = channel_kind_tag(format.channel_kind);
    header[32] = format.premultiply as u8;
    Ok(header)
}

fn decode_header(bytes: &[u8]) -> Result<ImageFormat> {
    if bytes.len() < HEADER_LEN || &bytes[0..4] != MAGIC {
        return Err(Error::parsing("not a .traw file (bad magic or truncated header)"));
    }
    if bytes[4] != VERSION {
        return Err(Error::parsing(format!("unsupported .traw version {}", bytes[4])));
    }
    let cols = i64::from_le_bytes(bytes[5..13].try_into().unwrap());
    let rows = i64::from_le_bytes(bytes[13..21].try_into().unwrap());
    let planes = i64::from_le_bytes(bytes[21..29].try_into().unwrap());
    let pixel_format = tag_to_pixel_format(bytes[29], bytes[30])?;
    let channel_kind = tag_to_channel_kind(bytes[31])?;
    let premultiply = bytes[32] != 0;
    Ok(ImageFormat { cols, rows, planes, pixel_format, channel_kind, premultiply })
}

fn io_err(path: &Path, source: std::io::Error) -> Error {
    Error::FileIoError { path: path.display().to_string(), source }
}

/// An in-memory image read from a `.traw` file, re-used as the read-side
/// `Resource` (the whole raster is loaded up front, same shape as
/// `MemoryResource`).
pub struct RawResource {
    format: ImageFormat,
    data: Vec<u8>,
}

impl RawResource {
    fn open(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| io_err(path, e))?;
        let format = decode_header(&bytes)?;
        format.validate()?;
        let raster_len = format.raster_bytes()? as usize;
        let data = bytes.get(HEADER_LEN..HEADER_LEN + raster_len).ok_or_else(|| {
            Error::parsing(format!("{} is shorter than its header declares", path.display()))
        })?.to_vec();
        Ok(Self { format, data })
    }

    fn as_image_buffer(&self) -> Result<ImageBuffer<'_>> {
        ImageBuffer::new(&self.data, self.format)
    }

    fn full_bbox(&self) -> Rect2i {
        Rect2i::from_size(self.format.cols, self.format.rows)
    }
}

impl Resource for RawResource {
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
}

/// The write side of a `.traw` file: accumulates into an in-memory buffer
/// shaped like the final file and writes it out whole on `flush`, since the
/// format has no incremental/appendable structure.
pub struct RawWriter {
    path: PathBuf,
    format: ImageFormat,
    data: Vec<u8>,
}

impl RawWriter {
    fn create(path: &Path, format: ImageFormat) -> Result<Self> {
        format.validate()?;
        let data = vec![0u8; format.raster_bytes()? as usize];
        Ok(Self { path: path.to_path_buf(), format, data })
    }

    fn as_image_buffer_mut(&mut self) -> Result<ImageBuffer<'_>> {
        ImageBuffer::new_mut(&mut self.data, self.format)
    }

    fn full_bbox(&self) -> Rect2i {
        Rect2i::from_size(self.format.cols, self.format.rows)
    }
}

impl ResourceWrite for RawWriter {
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

    fn flush(&mut self) -> Result<()> {
        let header = encode_header(self.format)?;
        let mut out = Vec::with_capacity(HEADER_LEN + self.data.len());
        out.extend_from_slice(&header);
        out.extend_from_slice(&self.data);
        fs::write(&self.path, out).map_err(|e| io_err(&self.path, e))
    }
}

/// Registers `.traw` for both read and write.
pub struct RawDriverFactory;

impl DriverFactory for RawDriverFactory {
    fn name(&self) -> &str {
        "traw"
    }

    fn is_read_supported(&self, path: &Path) -> bool {
        path.extension().is_some_and(|e| e == "traw")
    }

    fn is_write_supported(&self, path: &Path) -> bool {
        path.extension().is_some_and(|e| e == "traw")
    }

    fn create_read_driver(&self, path: &Path) -> Result<Arc<dyn Resource>> {
        Ok(Arc::new(RawResource::open(path)?))
    }

    fn create_write_driver(&self, path: &Path, format: ImageFormat, _block_size: Option<(i64, i64)>) -> Result<Box<dyn ResourceWrite>> {
        Ok(Box::new(RawWriter::create(path, format)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use terra_io::driver::DriverManager;
    use terra_io::io::{read_image, write_image};
    use terra_view::{MemoryView, View};

    fn striped(cols: i64, rows: i64) -> Arc<dyn View> {
        let fmt = ImageFormat::new(cols, rows, 1, PixelFormat::Gray, ChannelKind::U8);
        let mut mv = MemoryView::new(fmt).unwrap();
        {
            let mut buf = mv.as_image_buffer_mut().unwrap();
            for row in 0..rows {
                for col in 0..cols {
                    buf.pixel_bytes_mut(col, row, 0).unwrap().copy_from_slice(&[((row * cols + col) % 256) as u8]);
                }
            }
        }
        Arc::new(mv)
    }

    #[test]
    fn write_then_read_round_trips_through_an_actual_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.traw");
        let mut mgr = DriverManager::new();
        mgr.register(Arc::new(RawDriverFactory));

        let view = striped(5, 4);
        write_image(&path, view.clone(), &mgr, |_| true).unwrap();

        let read_back = read_image(&path, &mgr).unwrap();
        let mut expect = vec![0u8; view.format().raster_bytes().unwrap() as usize];
        {
            let mut dest = ImageBuffer::new_mut(&mut expect, view.format()).unwrap();
            view.rasterize(&mut dest, view.full_bbox()).unwrap();
        }
        assert_eq!(read_back.as_bytes(), expect.as_slice());
    }

    #[test]
    fn header_round_trips_masked_and_generic_formats() {
        let fmt = ImageFormat::new(2, 2, 1, PixelFormat::GenericN(6), ChannelKind::F32Free).with_premultiply(true);
        let header = encode_header(fmt).unwrap();
        let decoded = decode_header(&header).unwrap();
        assert_eq!(decoded, fmt);
    }

    #[test]
    fn truncated_file_reports_a_parsing_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.traw");
        fs::write(&path, b"nope").unwrap();
        let factory = RawDriverFactory;
        let err = factory.create_read_driver(&path).unwrap_err();
        assert!(matches!(err, Error::ParsingError { .. }));
    }

    #[test]
    fn extension_gates_support() {
        let factory = RawDriverFactory;
        assert!(factory.is_read_supported(Path::new("a.traw")));
        assert!(!factory.is_read_supported(Path::new("a.tif")));
    }
}
