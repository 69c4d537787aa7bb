use std::{path::Path, sync::Arc};

use tokio::{sync::Semaphore, task::JoinSet};
use tracing::{debug, info, warn};

use crate::{
    attention::estimate_attention,
    config::{NEUTRAL_ATTENTION_SCORE, PipelineConfig},
    objects::filter_forbidden_objects,
    sampler::sample_frames,
    services::VisionService,
    types::{AnalysisStatus, AttentionValue, Frame, LabelDetection, Pose, VisualMetrics},
};

enum StageState {
    Pending,
    Sampling,
    Scoring(Vec<Frame>),
    Degraded,
    Done(VisualMetrics),
}

/// Visual analysis stage: sampling then scoring, or the degraded shortcut
/// when decoding is unavailable. Always yields a VisualMetrics value;
/// failures never leave this stage.
pub struct VisualStage {
    vision: Arc<dyn VisionService>,
    config: PipelineConfig,
}

impl VisualStage {
    pub fn new(vision: Arc<dyn VisionService>, config: PipelineConfig) -> Self {
        VisualStage { vision, config }
    }

    /// The fixed neutral result substituted on the degraded path.
    pub fn neutral_metrics() -> VisualMetrics {
        VisualMetrics {
            attention: AttentionValue::score(NEUTRAL_ATTENTION_SCORE),
            objects_detected: PipelineConfig::neutral_objects(),
            frames_analyzed: 0,
            video_duration: 0.0,
            processing_status: AnalysisStatus::Degraded,
        }
    }

    pub async fn analyze(&self, video_path: &Path, frames_dir: &Path) -> VisualMetrics {
        let mut state = StageState::Pending;
        loop {
            state = match state {
                StageState::Pending => {
                    if self.config.decode_available {
                        StageState::Sampling
                    } else {
                        info!("decoder unavailable on this deployment, skipping visual analysis");
                        StageState::Degraded
                    }
                }
                StageState::Sampling => {
                    let frames =
                        sample_frames(video_path, self.config.sampling_interval_secs, frames_dir)
                            .await;
                    if frames.is_empty() {
                        info!("no extractable frames, substituting neutral metrics");
                        StageState::Degraded
                    } else {
                        StageState::Scoring(frames)
                    }
                }
                StageState::Scoring(frames) => match self.score(&frames).await {
                    Ok(metrics) => StageState::Done(metrics),
                    Err(reason) => {
                        warn!(%reason, "scoring failed, substituting neutral metrics");
                        StageState::Degraded
                    }
                },
                StageState::Degraded => StageState::Done(Self::neutral_metrics()),
                StageState::Done(metrics) => return metrics,
            };
        }
    }

    /// Attention and object scans run as two independent passes over the
    /// same read-only frame sequence.
    pub(crate) async fn score(
        &self,
        frames: &[Frame],
    ) -> std::result::Result<VisualMetrics, String> {
        let (poses, labels) = tokio::join!(self.scan_poses(frames), self.scan_labels(frames));
        let poses = poses?;
        let labels = labels?;

        let attentive = estimate_attention(poses, self.config.drift_threshold);
        let objects_detected = filter_forbidden_objects(
            labels.iter().map(|l| l.as_slice()),
            &self.config.forbidden_labels,
        );

        Ok(VisualMetrics {
            attention: AttentionValue::Flag(attentive),
            objects_detected,
            frames_analyzed: frames.len() as u64,
            video_duration: frames.len() as f64 * self.config.sampling_interval_secs,
            processing_status: AnalysisStatus::Completed,
        })
    }

    /// Pose per frame, at most one face considered. Detection calls run
    /// with bounded concurrency; results are re-sorted by frame index so
    /// the drift scan sees them in temporal order even when requests
    /// complete out of order. Frames without a detected face contribute
    /// nothing.
    async fn scan_poses(&self, frames: &[Frame]) -> std::result::Result<Vec<Pose>, String> {
        let semaphore = Arc::new(Semaphore::new(self.config.detection_concurrency));
        let mut tasks = JoinSet::new();
        for frame in frames {
            let vision = Arc::clone(&self.vision);
            let semaphore = Arc::clone(&semaphore);
            let jpeg = frame.jpeg.clone();
            let index = frame.index;
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore open");
                (index, vision.detect_faces(&jpeg).await)
            });
        }

        let mut detections = Vec::with_capacity(frames.len());
        while let Some(joined) = tasks.join_next().await {
            let (index, faces) = joined.map_err(|e| e.to_string())?;
            match faces {
                Ok(faces) => detections.push((index, faces)),
                Err(e) => debug!(index, error = %e, "face detection miss, skipping frame"),
            }
        }
        detections.sort_by_key(|(index, _)| *index);

        Ok(detections
            .into_iter()
            .filter_map(|(_, faces)| faces.into_iter().next().map(|f| f.pose))
            .collect())
    }

    async fn scan_labels(
        &self,
        frames: &[Frame],
    ) -> std::result::Result<Vec<Vec<LabelDetection>>, String> {
        let semaphore = Arc::new(Semaphore::new(self.config.detection_concurrency));
        let mut tasks = JoinSet::new();
        for frame in frames {
            let vision = Arc::clone(&self.vision);
            let semaphore = Arc::clone(&semaphore);
            let jpeg = frame.jpeg.clone();
            let index = frame.index;
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore open");
                (index, vision.detect_labels(&jpeg).await)
            });
        }

        let mut detections = Vec::with_capacity(frames.len());
        while let Some(joined) = tasks.join_next().await {
            let (index, labels) = joined.map_err(|e| e.to_string())?;
            match labels {
                Ok(labels) => detections.push((index, labels)),
                Err(e) => debug!(index, error = %e, "label detection miss, skipping frame"),
            }
        }
        detections.sort_by_key(|(index, _)| *index);

        Ok(detections.into_iter().map(|(_, labels)| labels).collect())
    }
}
