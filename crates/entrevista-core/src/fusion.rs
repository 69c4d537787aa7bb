use tracing::{info, warn};

use crate::{
    config::{NEUTRAL_ATTENTION_SCORE, PipelineConfig},
    error::{PipelineError, Result},
    services::RecordTable,
    types::{AttentionValue, FeedbackMetrics, FusedResult, SessionRecord, VisualPayload},
};

/// Normalize whichever visual shape arrived into the pair fusion persists.
/// Checked in order: direct fields as-is, then the nested metrics with
/// per-field defaults, then the defaults outright.
pub fn normalize_visual(payload: VisualPayload) -> (Vec<String>, AttentionValue) {
    match payload {
        VisualPayload::Direct { objects, attention } => (objects, attention),
        VisualPayload::Nested { metrics } => (
            metrics
                .objects_detected
                .unwrap_or_else(PipelineConfig::neutral_objects),
            metrics
                .attention_score
                .unwrap_or_else(|| AttentionValue::score(NEUTRAL_ATTENTION_SCORE)),
        ),
        VisualPayload::Legacy(value) => {
            warn!(?value, "unrecognized visual payload shape, using defaults");
            (
                PipelineConfig::neutral_objects(),
                AttentionValue::score(NEUTRAL_ATTENTION_SCORE),
            )
        }
    }
}

/// Merge both analysis branches into the session record. The write replaces
/// all four analytic fields at once and is idempotent, so an end-to-end
/// retry with the same inputs leaves the stored record unchanged.
pub async fn fuse(
    table: &dyn RecordTable,
    record_id: &str,
    video_key: &str,
    visual: VisualPayload,
    feedback: FeedbackMetrics,
) -> Result<SessionRecord> {
    let (objects, attention) = normalize_visual(visual);
    let fused = FusedResult {
        report: feedback,
        objects,
        attention,
        video: video_key.to_string(),
    };

    let record = table
        .update_analysis(record_id, &fused)
        .await
        .map_err(|e| match e {
            PipelineError::RecordNotFound { record_id } => {
                PipelineError::RecordNotFound { record_id }
            }
            other => PipelineError::FusionFailed {
                record_id: record_id.to_string(),
                reason: other.to_string(),
            },
        })?;

    info!(record_id, "fused result committed");
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::{collections::HashMap, sync::Mutex};

    fn feedback() -> FeedbackMetrics {
        FeedbackMetrics {
            transcription: "apresentação".to_string(),
            avaliacao: "boa".to_string(),
            correcao: "1 errada".to_string(),
        }
    }

    struct MemoryTable {
        records: Mutex<HashMap<String, SessionRecord>>,
    }

    impl MemoryTable {
        fn with_record(record: SessionRecord) -> Self {
            let mut records = HashMap::new();
            records.insert(record.record_id.clone(), record);
            MemoryTable {
                records: Mutex::new(records),
            }
        }
    }

    #[async_trait]
    impl RecordTable for MemoryTable {
        async fn get(&self, record_id: &str) -> Result<Option<SessionRecord>> {
            Ok(self.records.lock().unwrap().get(record_id).cloned())
        }

        async fn insert(&self, record: &SessionRecord) -> Result<()> {
            self.records
                .lock()
                .unwrap()
                .insert(record.record_id.clone(), record.clone());
            Ok(())
        }

        async fn update_analysis(
            &self,
            record_id: &str,
            fused: &FusedResult,
        ) -> Result<SessionRecord> {
            let mut records = self.records.lock().unwrap();
            let record = records
                .get_mut(record_id)
                .ok_or_else(|| PipelineError::RecordNotFound {
                    record_id: record_id.to_string(),
                })?;
            record.report = Some(fused.report.clone());
            record.objects = Some(fused.objects.clone());
            record.attention = Some(fused.attention.clone());
            record.video = Some(fused.video.clone());
            Ok(record.clone())
        }

        async fn find_by_owner(&self, owner_email: &str) -> Result<Vec<SessionRecord>> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .values()
                .filter(|r| r.owner_email == owner_email)
                .cloned()
                .collect())
        }
    }

    fn payload(json: &str) -> VisualPayload {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn direct_shape_is_used_as_is() {
        let (objects, attention) =
            normalize_visual(payload(r#"{"objects":["Hat"],"attention":false}"#));
        assert_eq!(objects, vec!["Hat"]);
        assert_eq!(attention, AttentionValue::Flag(false));
    }

    #[test]
    fn nested_shape_reads_metrics_with_defaults() {
        let (objects, attention) = normalize_visual(payload(
            r#"{"metrics":{"objects_detected":["Cap"],"attention_score":0.4}}"#,
        ));
        assert_eq!(objects, vec!["Cap"]);
        assert_eq!(attention, AttentionValue::score(0.4));

        // partial nested payload falls back per field
        let (objects, attention) = normalize_visual(payload(r#"{"metrics":{}}"#));
        assert_eq!(objects, vec!["Person", "Face"]);
        assert_eq!(attention, AttentionValue::score(0.85));
    }

    #[test]
    fn unknown_shape_gets_the_documented_defaults() {
        let (objects, attention) = normalize_visual(payload(r#"{"legacy_field":1}"#));
        assert_eq!(objects, vec!["Person", "Face"]);
        match attention {
            AttentionValue::Score(score) => assert_eq!(score.as_str(), "0.85"),
            other => panic!("expected score, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn fusing_twice_with_the_same_inputs_is_idempotent() {
        let table = MemoryTable::with_record(SessionRecord::new(
            "rec-1".to_string(),
            "a@b.com".to_string(),
            30.0,
        ));
        let visual = r#"{"metrics":{"objects_detected":["Cap"],"attention_score":0.4}}"#;

        let first = fuse(
            &table,
            "rec-1",
            "converted/rec-1.mov",
            payload(visual),
            feedback(),
        )
        .await
        .unwrap();
        let second = fuse(
            &table,
            "rec-1",
            "converted/rec-1.mov",
            payload(visual),
            feedback(),
        )
        .await
        .unwrap();

        assert_eq!(first, second);
        assert_eq!(second.objects.as_deref(), Some(&["Cap".to_string()][..]));
        assert_eq!(second.attention, Some(AttentionValue::score(0.4)));
        assert_eq!(second.video.as_deref(), Some("converted/rec-1.mov"));
    }

    #[tokio::test]
    async fn fusing_into_a_missing_record_fails() {
        let table = MemoryTable {
            records: Mutex::new(HashMap::new()),
        };
        let err = fuse(
            &table,
            "ghost",
            "v",
            payload(r#"{"objects":[],"attention":true}"#),
            feedback(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PipelineError::RecordNotFound { .. }));
    }
}
