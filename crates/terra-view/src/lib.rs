//! Lazy, composable image-view algebra (§4.2, §4.6, §4.7): the `View`
//! trait and its core implementations (`MemoryView`, `CropView`,
//! `PerPixelUnaryView`, `SelectPlaneView`, `SparseView`), plus the
//! `UniformBlob` overlay primitive and the drawing helpers built on it.
//!
//! `BlockRasterizeView` — the remaining core view from §4.2 — lives in
//! `terra-block`, alongside the tile cache and block rasterizer it is built
//! on top of.

#![warn(missing_docs)]

pub mod blob;
pub mod crop;
pub mod drawing;
pub mod error;
pub mod memory;
pub mod select_plane;
pub mod sparse;
pub mod unary;
pub mod view;

pub use blob::UniformBlob;
pub use crop::CropView;
pub use drawing::{draw_circle, draw_line, draw_rectangle, Point2i};
pub use memory::MemoryView;
pub use select_plane::SelectPlaneView;
pub use sparse::SparseView;
pub use unary::{PerPixelUnaryView, PixelFn};
pub use view::{Accessor, View};

/// Convenient re-exports for downstream crates composing view trees.
pub mod prelude {
    pub use crate::view::{Accessor, View};
    pub use crate::{CropView, MemoryView, PerPixelUnaryView, SelectPlaneView, SparseView, UniformBlob};
}
