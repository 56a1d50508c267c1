//! Error taxonomy shared by every `terra-*` crate.
//!
//! Mirrors the layered-context convention used throughout this workspace:
//! each variant carries the structured fields needed to reconstruct a useful
//! message rather than a bare string, and callers match on kind rather than
//! parse text.

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// The error kinds a `terra-core` (and, by re-export, downstream `terra-*`)
/// operation can fail with.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Inconsistent sizes, strides, or parameters at a call boundary.
    #[error("invalid config: {reason}")]
    InvalidConfig {
        /// What was wrong.
        reason: String,
    },

    /// A pixel format is not supported for the requested operation, or the
    /// two sides of a `convert` are not compatible per the §4.1 rules.
    #[error("invalid pixel format: {reason}")]
    InvalidPixelFormat {
        /// What was wrong.
        reason: String,
    },

    /// A channel kind is not supported for the requested operation, or no
    /// conversion entry exists for the requested (src, dst) pair.
    #[error("invalid channel type: {reason}")]
    InvalidChannelType {
        /// What was wrong.
        reason: String,
    },

    /// A bbox falls outside the addressable extent of an image.
    #[error("bbox {bbox_min_x},{bbox_min_y} {bbox_width}x{bbox_height} is out of bounds for a {image_width}x{image_height} image")]
    BoundsError {
        bbox_min_x: i64,
        bbox_min_y: i64,
        bbox_width: i64,
        bbox_height: i64,
        image_width: i64,
        image_height: i64,
    },

    /// Allocation failed, or requested dimensions exceed the caps in §7.
    #[error("out of memory: {reason} (cols={cols}, rows={rows}, planes={planes})")]
    OutOfMemory {
        reason: String,
        cols: i64,
        rows: i64,
        planes: i64,
    },

    /// A driver-level I/O failure.
    #[error("file I/O error at {path}: {source}")]
    FileIoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// No registered factory recognizes a path or detector config.
    #[error("no driver found for {context}")]
    DriverNotFound {
        /// What was being resolved (a path, a detector config name, ...).
        context: String,
    },

    /// A malformed config value.
    #[error("parsing error: {reason}")]
    ParsingError {
        reason: String,
    },

    /// An optional interface was invoked but the implementation doesn't
    /// provide it (e.g. `extract` on a detector without descriptors).
    #[error("not implemented: {reason}")]
    NotImplemented {
        reason: String,
    },

    /// A resource or view was used before it was fully set up.
    #[error("uninitialized: {reason}")]
    Uninitialized {
        reason: String,
    },

    /// A channel or pixel conversion failed partway through.
    #[error("conversion error: {reason}")]
    ConversionError {
        reason: String,
    },

    /// A progress reporter raised a cancellation signal.
    #[error("aborted")]
    Aborted,
}

impl Error {
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Error::InvalidConfig { reason: reason.into() }
    }

    pub fn invalid_pixel_format(reason: impl Into<String>) -> Self {
        Error::InvalidPixelFormat { reason: reason.into() }
    }

    pub fn invalid_channel_type(reason: impl Into<String>) -> Self {
        Error::InvalidChannelType { reason: reason.into() }
    }

    pub fn bounds(
        bbox_min_x: i64,
        bbox_min_y: i64,
        bbox_width: i64,
        bbox_height: i64,
        image_width: i64,
        image_height: i64,
    ) -> Self {
        Error::BoundsError {
            bbox_min_x,
            bbox_min_y,
            bbox_width,
            bbox_height,
            image_width,
            image_height,
        }
    }

    pub fn out_of_memory(reason: impl Into<String>, cols: i64, rows: i64, planes: i64) -> Self {
        Error::OutOfMemory { reason: reason.into(), cols, rows, planes }
    }

    pub fn driver_not_found(context: impl Into<String>) -> Self {
        Error::DriverNotFound { context: context.into() }
    }

    pub fn parsing(reason: impl Into<String>) -> Self {
        Error::ParsingError { reason: reason.into() }
    }

    pub fn not_implemented(reason: impl Into<String>) -> Self {
        Error::NotImplemented { reason: reason.into() }
    }

    pub fn uninitialized(reason: impl Into<String>) -> Self {
        Error::Uninitialized { reason: reason.into() }
    }

    pub fn conversion(reason: impl Into<String>) -> Self {
        Error::ConversionError { reason: reason.into() }
    }

    pub fn is_bounds_error(&self) -> bool {
        matches!(self, Error::BoundsError { .. })
    }

    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, Error::OutOfMemory { .. })
    }

    pub fn is_io_error(&self) -> bool {
        matches!(self, Error::FileIoError { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_error_is_recognized() {
        let e = Error::bounds(0, 0, 10, 10, 5, 5);
        assert!(e.is_bounds_error());
        assert!(!e.is_out_of_memory());
    }

    #[test]
    fn helper_constructors_build_expected_variants() {
        assert!(matches!(Error::invalid_config("x"), Error::InvalidConfig { .. }));
        assert!(matches!(Error::driver_not_found("tif"), Error::DriverNotFound { .. }));
        assert!(matches!(Error::not_implemented("extract"), Error::NotImplemented { .. }));
    }
}
