//! `PixelType` — compile-time(-ish) pairing of a `PixelFormat` and a
//! `ChannelKind`, with derived channel count and byte size.

use crate::channel::ChannelKind;
use crate::error::Result;
use crate::pixel_format::PixelFormat;

/// Pairing of a pixel format and the scalar type backing each channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelType {
    format: PixelFormat,
    kind: ChannelKind,
}

impl PixelType {
    pub fn new(format: PixelFormat, kind: ChannelKind) -> Self {
        Self { format, kind }
    }

    pub fn format(self) -> PixelFormat {
        self.format
    }

    pub fn kind(self) -> ChannelKind {
        self.kind
    }

    /// Visible channel count (excludes the mask channel for masked formats).
    pub fn channels(self) -> Result<usize> {
        self.format.channels()
    }

    /// Visible channel count plus one if this is a masked format (the
    /// validity channel occupies its own storage slot even though it is not
    /// part of `PixelFormat::channels()`).
    pub fn storage_channels(self) -> Result<usize> {
        let base = self.format.channels()?;
        Ok(if self.format.is_masked() { base + 1 } else { base })
    }

    pub fn has_alpha(self) -> bool {
        self.format.has_alpha()
    }

    pub fn is_masked(self) -> bool {
        self.format.is_masked()
    }

    pub fn bytes_per_pixel(self) -> Result<usize> {
        let bytes = self.kind.byte_size().ok_or_else(|| {
            crate::error::Error::invalid_channel_type("Unknown channel kind has no byte size")
        })?;
        Ok(self.storage_channels()? * bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgba_u8_is_four_bytes_per_channel_times_four() {
        let pt = PixelType::new(PixelFormat::Rgba, ChannelKind::U8);
        assert_eq!(pt.channels().unwrap(), 4);
        assert_eq!(pt.bytes_per_pixel().unwrap(), 4);
    }

    #[test]
    fn masked_adds_one_storage_channel() {
        let pt = PixelType::new(PixelFormat::RgbMasked, ChannelKind::U16);
        assert_eq!(pt.channels().unwrap(), 3);
        assert_eq!(pt.storage_channels().unwrap(), 4);
        assert_eq!(pt.bytes_per_pixel().unwrap(), 8);
    }
}
