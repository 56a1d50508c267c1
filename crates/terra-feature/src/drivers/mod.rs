//! Reference detector drivers (§4.5): "interface examples only" per the
//! spec's scope note — concrete detector algorithms are not the core's
//! concern, but the detector contract needs at least one implementation of
//! each shape (`detect`-only, and `detect` + `extract`) to exercise
//! `FeatureTileQueue` and `DetectorFactory` end to end.

pub mod gftt;
pub mod orb;
