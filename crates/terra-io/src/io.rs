//! Whole-image `read_image`/`write_image` helpers (§4.4, §6), grounded on
//! `read_image.hpp`/`write_image.hpp`: pick a driver via the
//! `DriverManager`, then loop block-wise (or as one block, if the driver
//! reports no block granularity).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use terra_core::error::Error;
use terra_core::format::{ImageBuffer, ImageFormat};
use terra_core::rect::Rect2i;
use terra_view::{MemoryView, SelectPlaneView, View};

use crate::driver::DriverManager;
use crate::error::Result;

/// Picks a read driver for `path`, allocates a `MemoryView` sized to its
/// full extent, and reads the whole image into it.
pub fn read_image(path: &Path, drivers: &DriverManager) -> Result<MemoryView> {
    let resource = drivers.pick_read_driver(path)?;
    let format = resource.format();
    let mut view = MemoryView::new(format)?;
    {
        let mut buf = view.as_image_buffer_mut()?;
        resource.read(&mut buf, resource.full_bbox())?;
    }
    Ok(view)
}

/// Replaces the *last* `*` in `path` with `plane`'s decimal digits, matching
/// the original's `boost::replace_last` per-plane file-splitting convention
/// (§6). Returns `path` unchanged if it contains no `*`.
fn substitute_plane(path: &Path, plane: i64) -> PathBuf {
    let s = path.to_string_lossy();
    match s.rfind('*') {
        Some(idx) => {
            let mut owned = s.into_owned();
            owned.replace_range(idx..idx + 1, &plane.to_string());
            PathBuf::from(owned)
        }
        None => path.to_path_buf(),
    }
}

/// Rasterizes `view` and writes it out through a driver picked for `path`.
/// If `path` contains a `*` and `view` has more than one plane, writes one
/// file per plane, substituting the plane index for `*` (§6). `progress` is
/// called once per block about to be written; returning `false` aborts the
/// whole operation with `Error::Aborted` (already-written blocks are left as
/// written, per §7's "partial successes are not returned" still applying
/// only to the in-progress block's own destination, not to prior writes).
pub fn write_image(path: &Path, view: Arc<dyn View>, drivers: &DriverManager, mut progress: impl FnMut(Rect2i) -> bool) -> Result<()> {
    let format = view.format();
    let path_str = path.to_string_lossy();

    if format.planes > 1 && path_str.contains('*') {
        for plane in 0..format.planes {
            let plane_view: Arc<dyn View> = Arc::new(SelectPlaneView::new(view.clone(), plane)?);
            let plane_path = substitute_plane(path, plane);
            write_single_plane(&plane_path, plane_view, drivers, &mut progress)?;
        }
        Ok(())
    } else {
        write_single_plane(path, view, drivers, &mut progress)
    }
}

fn write_single_plane(path: &Path, view: Arc<dyn View>, drivers: &DriverManager, progress: &mut impl FnMut(Rect2i) -> bool) -> Result<()> {
    let format = view.format();
    let mut writer = drivers.pick_write_driver(path, format, None)?;

    let (block_w, block_h) = if writer.has_block_write() {
        writer.block_write_size()
    } else {
        (format.cols.max(1), format.rows.max(1))
    };

    let full_bbox = view.full_bbox();
    for block_bbox in full_bbox.subdivide(block_w.max(1), block_h.max(1)) {
        if !progress(block_bbox) {
            return Err(Error::Aborted);
        }

        let block_format = ImageFormat { cols: block_bbox.width, rows: block_bbox.height, ..format };
        let mut data = vec![0u8; block_format.raster_bytes()? as usize];
        {
            let mut buf = ImageBuffer::new_mut(&mut data, block_format)?;
            view.rasterize(&mut buf, block_bbox)?;
        }
        let buf = ImageBuffer::new(&data, block_format)?;
        writer.write(&buf, block_bbox)?;
    }

    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk_view::DiskView;
    use crate::driver::DriverFactory;
    use crate::memory_resource::MemoryResource;
    use std::sync::Mutex;
    use terra_core::channel::ChannelKind;
    use terra_core::pixel_format::PixelFormat;
    use terra_view::MemoryView as TView;

    struct MemFactory {
        store: Arc<Mutex<std::collections::HashMap<String, MemoryResource>>>,
    }

    impl DriverFactory for MemFactory {
        fn name(&self) -> &str {
            "mem"
        }
        fn is_read_supported(&self, path: &Path) -> bool {
            self.store.lock().unwrap().contains_key(&path.display().to_string())
        }
        fn is_write_supported(&self, path: &Path) -> bool {
            path.extension().is_some_and(|e| e == "mem")
        }
        fn create_read_driver(&self, path: &Path) -> Result<Arc<dyn crate::resource::Resource>> {
            let store = self.store.lock().unwrap();
            let res = store.get(&path.display().to_string()).expect("registered by write path");
            Ok(Arc::new(MemoryResource::from_bytes(res.as_image_buffer().unwrap().as_bytes().to_vec(), res.format())?))
        }
        fn create_write_driver(
            &self,
            path: &Path,
            format: ImageFormat,
            _block_size: Option<(i64, i64)>,
        ) -> Result<Box<dyn crate::resource::ResourceWrite>> {
            let key = path.display().to_string();
            self.store.lock().unwrap().insert(key, MemoryResource::new(format)?);
            Ok(Box::new(RecordingWriter { key: path.display().to_string(), store: self.store.clone() }))
        }
    }

    /// Writes go through this thin wrapper so they land back in the shared
    /// store the read side looks up from.
    struct RecordingWriter {
        key: String,
        store: Arc<Mutex<std::collections::HashMap<String, MemoryResource>>>,
    }

    impl crate::resource::ResourceWrite for RecordingWriter {
        fn format(&self) -> ImageFormat {
            self.store.lock().unwrap().get(&self.key).unwrap().format()
        }
        fn write(&mut self, src: &ImageBuffer, bbox: Rect2i) -> Result<()> {
            let mut store = self.store.lock().unwrap();
            let res = store.get_mut(&self.key).unwrap();
            crate::resource::ResourceWrite::write(res, src, bbox)
        }
        fn has_block_write(&self) -> bool {
            false
        }
    }

    fn striped_view(cols: i64, rows: i64) -> Arc<dyn View> {
        let fmt = ImageFormat::new(cols, rows, 1, PixelFormat::Gray, ChannelKind::U8);
        let mut mv = TView::new(fmt).unwrap();
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
    fn write_then_read_round_trips_through_a_driver() {
        let mut mgr = DriverManager::new();
        mgr.register(Arc::new(MemFactory { store: Arc::new(Mutex::new(std::collections::HashMap::new())) }));

        let view = striped_view(6, 5);
        write_image(Path::new("out.mem"), view.clone(), &mgr, |_| true).unwrap();

        let read_back = read_image(Path::new("out.mem"), &mgr).unwrap();
        let mut expect = vec![0u8; view.format().raster_bytes().unwrap() as usize];
        {
            let mut dest = ImageBuffer::new_mut(&mut expect, view.format()).unwrap();
            view.rasterize(&mut dest, view.full_bbox()).unwrap();
        }
        assert_eq!(read_back.as_bytes(), expect.as_slice());
    }

    #[test]
    fn abort_via_progress_callback_short_circuits() {
        let mut mgr = DriverManager::new();
        mgr.register(Arc::new(MemFactory { store: Arc::new(Mutex::new(std::collections::HashMap::new())) }));
        let view = striped_view(4, 4);
        let err = write_image(Path::new("abort.mem"), view, &mgr, |_| false).unwrap_err();
        assert!(matches!(err, Error::Aborted));
    }

    #[test]
    fn substitute_plane_replaces_last_asterisk() {
        let path = substitute_plane(Path::new("layer_*_final_*.mem"), 3);
        assert_eq!(path.to_str().unwrap(), "layer_*_final_3.mem");
    }

    #[test]
    fn multi_plane_write_splits_one_file_per_plane() {
        let mut mgr = DriverManager::new();
        mgr.register(Arc::new(MemFactory { store: Arc::new(Mutex::new(std::collections::HashMap::new())) }));
        let fmt = ImageFormat::new(3, 3, 2, PixelFormat::Scalar, ChannelKind::U8);
        let mut mv = TView::new(fmt).unwrap();
        {
            let mut buf = mv.as_image_buffer_mut().unwrap();
            for plane in 0..2 {
                for row in 0..3 {
                    for col in 0..3 {
                        buf.pixel_bytes_mut(col, row, plane).unwrap().copy_from_slice(&[(plane * 10 + row * 3 + col) as u8]);
                    }
                }
            }
        }
        let view: Arc<dyn View> = Arc::new(mv);
        write_image(Path::new("plane_*.mem"), view, &mgr, |_| true).unwrap();

        let p0 = read_image(Path::new("plane_0.mem"), &mgr).unwrap();
        let p1 = read_image(Path::new("plane_1.mem"), &mgr).unwrap();
        assert_eq!(p0.as_bytes(), &[0, 1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(p1.as_bytes(), &[10, 11, 12, 13, 14, 15, 16, 17, 18]);
    }

    #[test]
    fn disk_view_composes_with_write_image() {
        let mut mgr = DriverManager::new();
        mgr.register(Arc::new(MemFactory { store: Arc::new(Mutex::new(std::collections::HashMap::new())) }));
        let source = MemoryResource::new(ImageFormat::new(2, 2, 1, PixelFormat::Gray, ChannelKind::U8)).unwrap();
        let view: Arc<dyn View> = Arc::new(DiskView::new(Arc::new(source)));
        write_image(Path::new("disk.mem"), view, &mgr, |_| true).unwrap();
        let read_back = read_image(Path::new("disk.mem"), &mgr).unwrap();
        assert_eq!(read_back.as_bytes(), &[0u8; 4]);
    }
}
