use async_trait::async_trait;

use crate::{
    error::Result,
    types::{FaceDetection, FusedResult, LabelDetection, SessionRecord},
};

/// Blob storage for source videos, converted videos and scratch frames.
/// Keys are slash-separated relative paths.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Vec<u8>>;
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()>;
    async fn copy(&self, from: &str, to: &str) -> Result<()>;
}

/// Session record table, keyed by record_id with a secondary lookup by
/// owner email.
#[async_trait]
pub trait RecordTable: Send + Sync {
    async fn get(&self, record_id: &str) -> Result<Option<SessionRecord>>;
    async fn insert(&self, record: &SessionRecord) -> Result<()>;
    /// Full replace of the four analytic fields. Must be idempotent: the
    /// same fused result applied twice leaves the same stored state.
    async fn update_analysis(&self, record_id: &str, fused: &FusedResult)
    -> Result<SessionRecord>;
    async fn find_by_owner(&self, owner_email: &str) -> Result<Vec<SessionRecord>>;
}

/// Per-frame face-pose and label detection. Confidence scores come back
/// with each detection but are never consulted by the pipeline's decisions.
#[async_trait]
pub trait VisionService: Send + Sync {
    async fn detect_faces(&self, jpeg: &[u8]) -> Result<Vec<FaceDetection>>;
    async fn detect_labels(&self, jpeg: &[u8]) -> Result<Vec<LabelDetection>>;
}

/// Where an inference request is sent: a provisioned profile for the
/// higher-capability backend, or a directly addressable model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationTarget {
    Profile(String),
    Model(String),
}

#[derive(Debug, Clone)]
pub struct InferenceRequest {
    pub system: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

/// Text-completion backend plus the profile indirection used to reach the
/// higher-capability model.
#[async_trait]
pub trait InferenceService: Send + Sync {
    /// Resolve an existing inference profile by name.
    async fn find_profile(&self, name: &str) -> Result<Option<String>>;
    /// Provision a profile for `model_id`, returning its identifier.
    async fn create_profile(&self, name: &str, model_id: &str) -> Result<String>;
    async fn invoke(&self, target: &InvocationTarget, request: &InferenceRequest)
    -> Result<String>;
}
