//! `DetectorGenerator`/`DetectorFactory` (§4.5), grounded on
//! `Detector_Factory.hpp`: an ordered registry of generators, each
//! recognizing one concrete config type, queried first-match in
//! registration order — the same ordered-registry shape `terra-io::driver`
//! uses for codec drivers.

use std::sync::Arc;

use crate::detector::{Detector, DetectorConfig};
use crate::drivers::{gftt::GfttGenerator, orb::OrbGenerator};
use crate::error::Result;
use terra_core::error::Error;

/// Recognizes one concrete `DetectorConfig` type and builds a detector or
/// extractor from it.
pub trait DetectorGenerator: Send + Sync {
    /// Name of the detector family this generator builds (e.g. `"gftt"`).
    fn name(&self) -> &str;

    /// Attempts to build a detector from `config`. Returns `None` (not
    /// `Err`) when `config` isn't the type this generator recognizes, so
    /// `DetectorFactory` can fall through to the next generator.
    fn generate(&self, config: Arc<dyn DetectorConfig>) -> Option<Result<Arc<dyn Detector>>>;
}

/// An ordered registry of [`DetectorGenerator`]s, queried first-match.
pub struct DetectorFactory {
    generators: Vec<Arc<dyn DetectorGenerator>>,
}

impl DetectorFactory {
    pub fn new() -> Self {
        Self { generators: Vec::new() }
    }

    pub fn register(&mut self, generator: Arc<dyn DetectorGenerator>) {
        self.generators.push(generator);
    }

    pub fn generators(&self) -> &[Arc<dyn DetectorGenerator>] {
        &self.generators
    }

    /// A factory pre-populated with the reference GFTT-like generator, then
    /// the reference ORB-like generator, matching the original's
    /// registration order (GFTT registered before ORB in
    /// `Detector_Factory.cpp`'s static initializer).
    pub fn create_default_instance() -> Self {
        let mut factory = Self::new();
        factory.register(Arc::new(GfttGenerator));
        factory.register(Arc::new(OrbGenerator));
        factory
    }

    /// Builds a detector from `config` via the first generator that
    /// recognizes it.
    pub fn create_detector(&self, config: Arc<dyn DetectorConfig>) -> Result<Arc<dyn Detector>> {
        for generator in &self.generators {
            if let Some(result) = generator.generate(config.clone()) {
                return result;
            }
        }
        Err(Error::driver_not_found(format!("no detector generator recognizes config {config:?}")))
    }

    /// Builds an extractor from `config`. Since detectors and extractors
    /// share one `Detector` trait here (unlike the original's separate
    /// `Feature_Extractor_Base` hierarchy), this is the same lookup as
    /// `create_detector`; callers needing descriptors should check
    /// `DetectorConfig::supports_feature_descriptors` first.
    pub fn create_extractor(&self, config: Arc<dyn DetectorConfig>) -> Result<Arc<dyn Detector>> {
        self.create_detector(config)
    }
}

impl Default for DetectorFactory {
    fn default() -> Self {
        Self::create_default_instance()
    }
}
