use std::{path::Path, sync::Arc};

use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    config::PipelineConfig,
    convert::convert_video,
    error::{PipelineError, Result},
    feedback::FeedbackExtractor,
    fusion::fuse,
    remote::fetch_to_scratch,
    scratch::{get_frames_dir, get_scratch_dir, key_stem},
    services::{InferenceService, ObjectStore, RecordTable, VisionService},
    types::{FeedbackMetrics, SessionRecord, VisualMetrics},
    visual::VisualStage,
};

/// Create the session record for a fresh upload, analytic fields empty.
/// Returns the record and the object key the video was stored under.
pub async fn submit_recording(
    store: &dyn ObjectStore,
    table: &dyn RecordTable,
    owner_email: &str,
    video_bytes: Vec<u8>,
    extension: &str,
    duration_secs: f64,
) -> Result<(SessionRecord, String)> {
    let record_id = Uuid::new_v4().to_string();
    let key = format!("uploads/{}.{}", record_id, extension);

    store.put(&key, video_bytes).await?;
    let record = SessionRecord::new(record_id, owner_email.to_string(), duration_secs);
    table.insert(&record).await?;

    info!(record_id = %record.record_id, %key, "recording submitted");
    Ok((record, key))
}

/// Sequences one session: conversion, then the visual and feedback branches
/// in parallel, then fusion. Conversion and feedback failures are fatal;
/// the visual branch always produces a value.
pub struct Pipeline {
    store: Arc<dyn ObjectStore>,
    table: Arc<dyn RecordTable>,
    vision: Arc<dyn VisionService>,
    inference: Arc<dyn InferenceService>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        table: Arc<dyn RecordTable>,
        vision: Arc<dyn VisionService>,
        inference: Arc<dyn InferenceService>,
        config: PipelineConfig,
    ) -> Self {
        Pipeline {
            store,
            table,
            vision,
            inference,
            config,
        }
    }

    /// Run the full analysis for an uploaded recording key and commit the
    /// fused result. Safe to re-run for the same key: fusion overwrites the
    /// same four fields with the same values.
    pub async fn run(&self, source_key: &str) -> Result<SessionRecord> {
        let record_id = key_stem(source_key).ok_or_else(|| PipelineError::ConversionFailed {
            video: source_key.to_string(),
            reason: "key has no basename".to_string(),
        })?;
        let scratch_dir = get_scratch_dir(&record_id);
        fs::create_dir_all(&scratch_dir).await?;

        let converted_key = convert_video(
            self.store.as_ref(),
            source_key,
            &scratch_dir,
            self.config.decode_available,
        )
        .await?;

        // Both branches are independent; wait on both before fusing.
        let (visual, feedback) = tokio::join!(
            self.run_visual(&converted_key, &scratch_dir),
            self.run_feedback(&record_id),
        );
        let feedback = feedback?;

        fuse(
            self.table.as_ref(),
            &record_id,
            &converted_key,
            visual.into(),
            feedback,
        )
        .await
    }

    /// Visual branch: best-effort, never fails the session.
    async fn run_visual(&self, converted_key: &str, scratch_dir: &Path) -> VisualMetrics {
        let stage = VisualStage::new(Arc::clone(&self.vision), self.config.clone());
        if !self.config.decode_available {
            return stage.analyze(Path::new(""), Path::new("")).await;
        }

        let video_path = scratch_dir.join("analysis.mov");
        if let Err(e) = fetch_to_scratch(self.store.as_ref(), converted_key, &video_path).await {
            warn!(converted_key, error = %e, "could not fetch converted video, degrading");
            return VisualStage::neutral_metrics();
        }
        stage.analyze(&video_path, &get_frames_dir(scratch_dir)).await
    }

    /// Feedback branch: transcript-grounded, failures are fatal.
    async fn run_feedback(&self, record_id: &str) -> Result<FeedbackMetrics> {
        let transcript = self.load_transcript(record_id).await?;
        FeedbackExtractor::new(Arc::clone(&self.inference), self.config.clone())
            .extract(&transcript)
            .await
    }

    async fn load_transcript(&self, record_id: &str) -> Result<String> {
        let key = format!("transcription/{}.json", record_id);
        let bytes =
            self.store
                .get(&key)
                .await
                .map_err(|e| PipelineError::TranscriptUnavailable {
                    key: key.clone(),
                    reason: e.to_string(),
                })?;

        let document: crate::types::TranscriptDocument = serde_json::from_slice(&bytes)
            .map_err(|e| PipelineError::TranscriptUnavailable {
                key: key.clone(),
                reason: e.to_string(),
            })?;

        document
            .transcript_text()
            .map(|t| t.to_string())
            .ok_or_else(|| PipelineError::TranscriptUnavailable {
                key,
                reason: "document contains no transcript".to_string(),
            })
    }
}
