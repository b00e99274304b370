//! Ridgekit is a deterministic finger-photo processing pipeline.
//!
//! This crate turns a raw finger photograph (and, for liveness, a short
//! burst of frames) into four derived judgments: a capture-quality score, a
//! ridge-enhanced image, a compact similarity feature vector and a
//! live/spoof decision. Every stage is a stateless, CPU-bound function over
//! immutable buffers; optional parallelism is available via the `rayon`
//! feature and file helpers via `image-io`.

pub mod capture;
pub mod enhance;
pub mod features;
#[cfg(feature = "image-io")]
pub mod io;
pub mod liveness;
pub mod matcher;
pub mod quality;
pub mod raster;
pub(crate) mod trace;
pub mod util;

pub use capture::{Frame, FrameBuffer, SharedFrameBuffer};
pub use enhance::{EnhanceConfig, EnhancementPipeline, EnhancementResult};
pub use features::{FeatureConfig, FeatureExtractor, FeatureVector};
pub use liveness::{LivenessConfig, LivenessDetector, LivenessResult};
pub use matcher::{MatchConfig, MatchResult, Matcher, ReferenceStore};
pub use quality::segment::{EdgeDensitySegmenter, RegionMask, RegionSegmenter};
pub use quality::{QualityAssessor, QualityConfig, QualityResult};
pub use raster::{CropGuide, RasterBuffer, Rect};
pub use util::{RidgekitError, RidgekitResult};
