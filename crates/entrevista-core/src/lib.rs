//! Entrevista Core Library
//!
//! Analysis pipeline for recorded interview sessions: frame-based visual
//! metrics and transcript-grounded feedback, fused into one persisted
//! session record.

pub mod attention;
pub mod config;
pub mod convert;
pub mod error;
pub mod feedback;
pub mod fusion;
pub mod objects;
pub mod pipeline;
pub mod remote;
pub mod sampler;
pub mod scratch;
pub mod services;
pub mod store;
pub mod types;
pub mod visual;

// Re-export commonly used items at crate root
pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use feedback::{FeedbackExtractor, ParsedFeedback, parse_feedback, sanitize_response};
pub use fusion::{fuse, normalize_visual};
pub use pipeline::{Pipeline, submit_recording};
pub use remote::{HttpInferenceService, HttpVisionService, INFERENCE_API_KEY_VAR};
pub use services::{
    InferenceRequest, InferenceService, InvocationTarget, ObjectStore, RecordTable, VisionService,
};
pub use store::{FsObjectStore, JsonRecordTable};
pub use types::{
    AnalysisStatus, AttentionValue, DecimalScore, FeedbackMetrics, Frame, FusedResult,
    SessionRecord, VisualMetrics, VisualPayload,
};
pub use visual::VisualStage;
