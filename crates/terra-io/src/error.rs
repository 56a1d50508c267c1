//! `terra-io` reuses `terra-core`'s error taxonomy wholesale (`FileIoError`,
//! `DriverNotFound`) rather than defining its own variants, matching
//! `terra-view`/`terra-block`'s pattern.

pub use terra_core::error::Error as CoreError;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, CoreError>;
