//! `PixelFormat` — the arrangement and semantics of a pixel's channels.

use crate::error::{Error, Result};

/// Tagged variant describing channel arrangement, independent of scalar type.
///
/// Masked variants have the same visible channel count as their base; the
/// extra validity channel is handled by the mask algebra (`mask` module),
/// not counted here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Scalar,
    Gray,
    GrayA,
    Rgb,
    Rgba,
    Hsv,
    Xyz,
    Luv,
    Lab,
    ScalarMasked,
    GrayMasked,
    GrayAMasked,
    RgbMasked,
    RgbaMasked,
    HsvMasked,
    XyzMasked,
    LuvMasked,
    LabMasked,
    /// `N` in `1..=9`.
    GenericN(u8),
    Unknown,
}

impl PixelFormat {
    /// Visible channel count (mask channel, if any, is not included).
    pub fn channels(self) -> Result<usize> {
        use PixelFormat::*;
        match self {
            Scalar | Gray | ScalarMasked | GrayMasked => Ok(1),
            GrayA | GrayAMasked => Ok(2),
            Rgb | Hsv | Xyz | Luv | Lab | RgbMasked | HsvMasked | XyzMasked | LuvMasked | LabMasked => Ok(3),
            Rgba | RgbaMasked => Ok(4),
            GenericN(n) if (1..=9).contains(&n) => Ok(n as usize),
            GenericN(n) => Err(Error::invalid_pixel_format(format!(
                "Generic_N_Channel requires N in 1..=9, got {n}"
            ))),
            Unknown => Err(Error::invalid_pixel_format("Unknown pixel format has no channel count")),
        }
    }

    pub fn has_alpha(self) -> bool {
        matches!(self, PixelFormat::GrayA | PixelFormat::Rgba | PixelFormat::GrayAMasked | PixelFormat::RgbaMasked)
    }

    pub fn is_masked(self) -> bool {
        use PixelFormat::*;
        matches!(
            self,
            ScalarMasked | GrayMasked | GrayAMasked | RgbMasked | RgbaMasked | HsvMasked | XyzMasked | LuvMasked | LabMasked
        )
    }

    /// The non-masked counterpart of a masked format (identity otherwise).
    pub fn unmasked(self) -> PixelFormat {
        use PixelFormat::*;
        match self {
            ScalarMasked => Scalar,
            GrayMasked => Gray,
            GrayAMasked => GrayA,
            RgbMasked => Rgb,
            RgbaMasked => Rgba,
            HsvMasked => Hsv,
            XyzMasked => Xyz,
            LuvMasked => Luv,
            LabMasked => Lab,
            other => other,
        }
    }

    /// The masked counterpart of a base format (identity if already masked
    /// or not maskable, i.e. `GenericN`/`Unknown`).
    pub fn masked(self) -> PixelFormat {
        use PixelFormat::*;
        match self {
            Scalar => ScalarMasked,
            Gray => GrayMasked,
            GrayA => GrayAMasked,
            Rgb => RgbMasked,
            Rgba => RgbaMasked,
            Hsv => HsvMasked,
            Xyz => XyzMasked,
            Luv => LuvMasked,
            Lab => LabMasked,
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_counts_match_data_model() {
        assert_eq!(PixelFormat::Scalar.channels().unwrap(), 1);
        assert_eq!(PixelFormat::GrayA.channels().unwrap(), 2);
        assert_eq!(PixelFormat::Rgb.channels().unwrap(), 3);
        assert_eq!(PixelFormat::Rgba.channels().unwrap(), 4);
        assert_eq!(PixelFormat::GenericN(7).channels().unwrap(), 7);
    }

    #[test]
    fn generic_n_out_of_range_fails() {
        assert!(PixelFormat::GenericN(0).channels().is_err());
        assert!(PixelFormat::GenericN(10).channels().is_err());
    }

    #[test]
    fn masked_round_trips() {
        assert_eq!(PixelFormat::Rgba.masked(), PixelFormat::RgbaMasked);
        assert_eq!(PixelFormat::RgbaMasked.unmasked(), PixelFormat::Rgba);
        assert!(PixelFormat::RgbaMasked.is_masked());
        assert!(!PixelFormat::Rgba.is_masked());
    }

    #[test]
    fn alpha_presence() {
        assert!(PixelFormat::Rgba.has_alpha());
        assert!(PixelFormat::GrayA.has_alpha());
        assert!(!PixelFormat::Rgb.has_alpha());
    }
}
