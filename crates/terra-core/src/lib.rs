//! # terra-core
//!
//! The pixel/channel type system, image format/buffer descriptors, and
//! bit-exact conversion that every other `terra-*` crate builds on.
//!
//! - [`ChannelKind`], [`ChannelValue`] - scalar channel types and runtime values
//! - [`PixelFormat`], [`PixelType`] - channel arrangement and pixel typing
//! - [`ImageFormat`], [`ImageBuffer`] - format descriptor and non-owning pixel region
//! - [`convert::convert`] - whole-buffer conversion (channel rescale, channel-count
//!   transform, alpha premultiplication)
//! - [`mask`] - masked-pixel validity algebra
//! - [`Rect2i`] - integer rectangle with intersection/subdivision
//!
//! ## Crate structure
//!
//! `terra-core` has no internal dependencies. Every other crate in this
//! workspace (`terra-view`, `terra-block`, `terra-io`, `terra-feature`,
//! `terra-cli`) depends on it.

#![warn(missing_docs)]

pub mod channel;
pub mod convert;
pub mod error;
pub mod format;
pub mod mask;
pub mod pixel_format;
pub mod pixel_type;
pub mod rect;

pub use channel::{convert_channel, max_channel_value, zero_channel_value, ChannelKind, ChannelValue};
pub use convert::convert as convert_pixels;
pub use error::{Error, Result};
pub use format::{ImageBuffer, ImageFormat, MAX_PLANES, MAX_SIDE_PX, MAX_TOTAL_PIXELS};
pub use pixel_format::PixelFormat;
pub use pixel_type::PixelType;
pub use rect::Rect2i;

/// Prelude module for convenient imports.
///
/// ```
/// use terra_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::channel::{convert_channel, ChannelKind, ChannelValue};
    pub use crate::convert::convert as convert_pixels;
    pub use crate::error::{Error, Result};
    pub use crate::format::{ImageBuffer, ImageFormat};
    pub use crate::mask;
    pub use crate::pixel_format::PixelFormat;
    pub use crate::pixel_type::PixelType;
    pub use crate::rect::Rect2i;
}
