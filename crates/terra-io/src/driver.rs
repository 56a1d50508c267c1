//! `DriverFactory`/`DriverManager` (§4.4): pluggable, ordered driver
//! selection. Grounded on `Driver_Factory_Base.hpp` for the factory method
//! shape and `Disk_Driver_Manager.hpp` for the manager — the original backs
//! its manager with a `std::deque<FactoryT>` and documents explicitly that
//! "the order by which a driver is chosen is the order it is registered";
//! this is a `Vec`, walked front-to-back, for the same first-match
//! semantics. Deliberately simpler than `vfx-io::registry::FormatRegistry`,
//! which keys an unordered `HashMap` by magic bytes/extension — concrete
//! codecs are out of scope here (§1), so there is no builtin-format registry
//! to seed, only the ordered selection contract itself.

use std::path::Path;
use std::sync::Arc;

use terra_core::error::Error;
use terra_core::format::ImageFormat;

use crate::error::Result;
use crate::resource::{Resource, ResourceWrite};

/// Constructs concrete `Resource`/`ResourceWrite` drivers for the paths it
/// claims to support.
pub trait DriverFactory: Send + Sync {
    /// A short name for diagnostics (e.g. `"geotiff"`).
    fn name(&self) -> &str;

    fn is_read_supported(&self, path: &Path) -> bool;
    fn is_write_supported(&self, path: &Path) -> bool;

    fn create_read_driver(&self, path: &Path) -> Result<Arc<dyn Resource>>;

    /// `block_size`, if given, is a hint forwarded to
    /// `ResourceWrite::set_block_write_size` after construction; a driver
    /// that can't honor it may ignore the hint rather than fail.
    fn create_write_driver(&self, path: &Path, format: ImageFormat, block_size: Option<(i64, i64)>) -> Result<Box<dyn ResourceWrite>>;
}

/// An ordered list of driver factories. Selection is first-match by
/// registration order (§4.4) — never by "best" match, since factories are
/// expected to self-filter by extension before probing headers.
#[derive(Default)]
pub struct DriverManager {
    factories: Vec<Arc<dyn DriverFactory>>,
}

impl DriverManager {
    pub fn new() -> Self {
        Self { factories: Vec::new() }
    }

    pub fn register(&mut self, factory: Arc<dyn DriverFactory>) {
        self.factories.push(factory);
    }

    pub fn factories(&self) -> &[Arc<dyn DriverFactory>] {
        &self.factories
    }

    pub fn pick_read_driver(&self, path: &Path) -> Result<Arc<dyn Resource>> {
        for factory in &self.factories {
            if factory.is_read_supported(path) {
                return factory.create_read_driver(path);
            }
        }
        Err(Error::driver_not_found(path.display().to_string()))
    }

    pub fn pick_write_driver(&self, path: &Path, format: ImageFormat, block_size: Option<(i64, i64)>) -> Result<Box<dyn ResourceWrite>> {
        for factory in &self.factories {
            if factory.is_write_supported(path) {
                let mut writer = factory.create_write_driver(path, format, block_size)?;
                if let Some((w, h)) = block_size {
                    let _ = writer.set_block_write_size(w, h);
                }
                return Ok(writer);
            }
        }
        Err(Error::driver_not_found(path.display().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_resource::MemoryResource;
    use std::sync::Mutex;
    use terra_core::channel::ChannelKind;
    use terra_core::pixel_format::PixelFormat;

    /// A stub factory claiming every `.mem` path, backed by `MemoryResource`.
    struct MemFactory {
        written: Mutex<Vec<String>>,
    }

    impl DriverFactory for MemFactory {
        fn name(&self) -> &str {
            "mem"
        }

        fn is_read_supported(&self, path: &Path) -> bool {
            path.extension().is_some_and(|e| e == "mem")
        }

        fn is_write_supported(&self, path: &Path) -> bool {
            path.extension().is_some_and(|e| e == "mem")
        }

        fn create_read_driver(&self, _path: &Path) -> Result<Arc<dyn Resource>> {
            let fmt = ImageFormat::new(2, 2, 1, PixelFormat::Gray, ChannelKind::U8);
            Ok(Arc::new(MemoryResource::new(fmt)?))
        }

        fn create_write_driver(&self, path: &Path, format: ImageFormat, _block_size: Option<(i64, i64)>) -> Result<Box<dyn ResourceWrite>> {
            self.written.lock().unwrap().push(path.display().to_string());
            Ok(Box::new(MemoryResource::new(format)?))
        }
    }

    #[test]
    fn first_registered_matching_factory_wins() {
        let mut mgr = DriverManager::new();
        mgr.register(Arc::new(MemFactory { written: Mutex::new(Vec::new()) }));
        mgr.register(Arc::new(MemFactory { written: Mutex::new(Vec::new()) }));
        let driver = mgr.pick_read_driver(Path::new("foo.mem")).unwrap();
        assert_eq!(driver.cols(), 2);
    }

    #[test]
    fn unmatched_path_reports_driver_not_found() {
        let mgr = DriverManager::new();
        let err = mgr.pick_read_driver(Path::new("foo.tif")).unwrap_err();
        assert!(matches!(err, Error::DriverNotFound { .. }));
    }
}
