//! Disk-I/O boundary for `terra-image` (§4.4): the `Resource`/`ResourceWrite`
//! traits a concrete codec driver implements, an in-memory reference
//! resource, a `View` adapter over any resource, an ordered driver registry,
//! and whole-image `read_image`/`write_image` helpers.
//!
//! Concrete codecs (GeoTIFF, PNG, ...) are out of scope (§1) — this crate is
//! the plumbing a driver crate would plug into, exercised here against
//! `MemoryResource`.

#![warn(missing_docs)]

pub mod disk_view;
pub mod driver;
pub mod error;
pub mod io;
pub mod memory_resource;
pub mod resource;

pub use disk_view::DiskView;
pub use driver::{DriverFactory, DriverManager};
pub use io::{read_image, write_image};
pub use memory_resource::MemoryResource;
pub use resource::{Resource, ResourceWrite};

/// Convenient re-exports for downstream crates.
pub mod prelude {
    pub use crate::{read_image, write_image, DiskView, DriverFactory, DriverManager, MemoryResource, Resource, ResourceWrite};
}
