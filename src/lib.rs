//! Grocersee
//!
//! Turns the raw output of a YOLO-style grocery detector into one short
//! spoken sentence per camera frame, for users who cannot see the shelf.
//!
//! # Pipeline
//!
//! 1. **Decode**: collapse the `[1, 4 + C, D]` head output into one box, score
//!    and class per candidate.
//! 2. **Suppress**: greedy non-max suppression with a score floor and an
//!    output cap.
//! 3. **Features**: a 5-component normalized vector per detection.
//! 4. **Cluster**: k-means with an elbow test on inertia.
//! 5. **Focus**: pick the dominant cluster, or fall back to a category summary.
//! 6. **Message**: render the result as an Indonesian sentence.
//!
//! # Module Structure
//!
//! - `detect`: tensor decoding, suppression, inference backends
//! - `analysis`: features, clustering, categories, focus
//! - `speech`: utterance templates and speech collaborators
//! - `frame`: camera frames, input preparation, the one-slot frame buffer
//! - `ingest`: frame sources (`stub://`, local images)
//! - `pipeline`: the stages wired together
//! - `worker`: background thread that drops frames while busy
//! - `config`: file + env configuration

pub mod analysis;
pub mod config;
pub mod detect;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod pipeline;
pub mod speech;
pub mod worker;

pub use analysis::{CategoryMap, Clusterer, FeatureBuilder, FocusAnalyzer, FrameResult};
pub use config::PipelineConfig;
pub use detect::{
    BBox, BoxOrder, Detection, InferenceBackend, NmsProfile, StubBackend, Suppressor,
    TensorDecoder,
};
#[cfg(feature = "backend-tract")]
pub use detect::TractBackend;
pub use error::PipelineError;
pub use frame::{prepare_input, Frame, LatestFrame};
pub use ingest::{open_source, FrameSource, SourceConfig};
pub use pipeline::{FrameReport, Pipeline};
pub use speech::{LogSpeaker, MessageGenerator, RecordingSpeaker, Speaker};
pub use worker::{FrameWorker, WorkerStats};
