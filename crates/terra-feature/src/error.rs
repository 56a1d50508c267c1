//! `terra-feature` reuses `terra_core`'s error taxonomy wholesale, the same
//! way `terra-view`/`terra-block`/`terra-io` do. The feature pipeline mostly
//! surfaces `NotImplemented` (an extractor without descriptor support),
//! `DriverNotFound` (no generator recognizes a config), and `Aborted`
//! (caller cancellation), all already variants on `terra_core::Error`.

pub use terra_core::error::Error as CoreError;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, CoreError>;
