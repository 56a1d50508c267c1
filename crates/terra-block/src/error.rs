//! `terra-block` reuses `terra_core::Error` rather than defining its own
//! variants; tile cache and block-rasterizer failures are all `InvalidConfig`
//! or `Bounds` errors already covered there.

pub use terra_core::error::Error as CoreError;

pub type Result<T> = std::result::Result<T, CoreError>;
