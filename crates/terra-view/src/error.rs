//! View-level errors. Most failure modes (bad strides, bounds, conversion)
//! already live in `terra_core::Error`; this crate only adds the variants
//! §0.1 calls out as new for the view layer.

pub use terra_core::error::Error as CoreError;

/// Result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, CoreError>;
