//! `DetectorConfig`/`Detector` traits (§4.5), grounded on
//! `Detector_Config_Base.hpp`/`Detector_Base.hpp`: the interface a concrete
//! feature detector plugs into the tile queue through.

use std::any::Any;
use std::sync::Arc;

use terra_core::channel::ChannelKind;
use terra_core::pixel_format::PixelFormat;
use terra_view::View;

use crate::error::Result;
use crate::interest_point::InterestPoint;

/// A detector's tunable parameters.
///
/// The original dispatches a config to its matching detector through RTTI;
/// [`DetectorConfig::as_any`] is the idiomatic stand-in, letting a
/// [`crate::factory::DetectorGenerator`] attempt a downcast to the concrete
/// config type it recognizes and decline (return `None`) on mismatch.
pub trait DetectorConfig: std::fmt::Debug + Send + Sync {
    /// Upcast for `DetectorGenerator::generate`'s downcast attempt.
    fn as_any(&self) -> &dyn Any;

    /// Whether `tile_size_pixels` may be overridden by the caller, or is
    /// fixed by the detector itself.
    fn allow_custom_tile_size(&self) -> bool;

    /// The `(width, height)` a `FeatureTileQueue` should crop the input view
    /// into before handing each tile to this detector.
    fn tile_size_pixels(&self) -> (i64, i64);

    /// The total keypoint budget across the whole (untiled) view.
    fn max_features(&self) -> usize;

    /// Whether `Detector::extract` is implemented for this config's detector.
    fn supports_feature_descriptors(&self) -> bool {
        false
    }

    /// Name used for `tracing` spans/events emitted while this config's
    /// detector runs.
    fn logger_name(&self) -> &str;
}

/// A feature detector: finds interest points in a view, and optionally
/// computes descriptors for a set of already-found points.
pub trait Detector: Send + Sync {
    /// The pixel format this detector requires its input in.
    fn required_pixel_format(&self) -> PixelFormat {
        PixelFormat::Gray
    }

    /// The channel kind this detector requires its input in.
    fn required_channel_kind(&self) -> ChannelKind {
        ChannelKind::U8
    }

    /// Detects interest points over the whole of `view`.
    ///
    /// `cast_if_unsupported` controls whether an input in the wrong pixel
    /// format/channel kind is converted (via `prepare_view`) or rejected.
    /// `max_points_override`, if set, replaces `config().max_features()` for
    /// this call only.
    fn detect(&self, view: &dyn View, cast_if_unsupported: bool, max_points_override: Option<usize>) -> Result<Vec<InterestPoint>>;

    /// Computes descriptors for `points` found in `view`, filling each
    /// point's `descriptor` field in place. Detectors without descriptor
    /// support inherit the default, which fails with `NotImplemented`.
    fn extract(&self, _view: &dyn View, _points: &mut [InterestPoint], _cast_if_unsupported: bool) -> Result<()> {
        Err(terra_core::error::Error::not_implemented(format!("{} does not support feature descriptors", self.class_name())))
    }

    /// A human-readable class name, used in error messages and tracing.
    fn class_name(&self) -> &str;

    /// This detector's config, as given to the generator that created it.
    fn config(&self) -> Arc<dyn DetectorConfig>;
}
