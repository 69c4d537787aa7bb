use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de};

/// A decimal value kept in its exact textual form so the persisted number
/// never picks up binary floating-point drift across re-reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecimalScore(String);

impl DecimalScore {
    /// Shortest round-trip decimal text for `value` (e.g. `0.85`, not `0.8500000000000001`).
    pub fn from_f64(value: f64) -> Self {
        DecimalScore(format!("{}", value))
    }

    pub fn parse(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() => Some(DecimalScore(trimmed.to_string())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DecimalScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for DecimalScore {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for DecimalScore {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ScoreVisitor;

        impl de::Visitor<'_> for ScoreVisitor {
            type Value = DecimalScore;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a decimal number or a decimal string")
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<DecimalScore, E> {
                Ok(DecimalScore::from_f64(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<DecimalScore, E> {
                Ok(DecimalScore(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<DecimalScore, E> {
                Ok(DecimalScore(v.to_string()))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<DecimalScore, E> {
                DecimalScore::parse(v)
                    .ok_or_else(|| E::invalid_value(de::Unexpected::Str(v), &self))
            }
        }

        deserializer.deserialize_any(ScoreVisitor)
    }
}

/// Attention as persisted: a computed boolean verdict or a decimal score
/// carried over from a degraded or historical payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttentionValue {
    Flag(bool),
    Score(DecimalScore),
}

impl AttentionValue {
    pub fn score(value: f64) -> Self {
        AttentionValue::Score(DecimalScore::from_f64(value))
    }
}

impl From<bool> for AttentionValue {
    fn from(flag: bool) -> Self {
        AttentionValue::Flag(flag)
    }
}

/// One time-ordered sample of the source video. Held only in pipeline
/// memory, never persisted.
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: usize,
    pub timestamp_secs: f64,
    pub jpeg: Vec<u8>,
}

/// Facial orientation axes for a detected face, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub roll: f64,
    pub yaw: f64,
    pub pitch: f64,
}

impl Pose {
    /// Euclidean distance to another pose across all three axes.
    pub fn drift(&self, other: &Pose) -> f64 {
        let dr = self.roll - other.roll;
        let dy = self.yaw - other.yaw;
        let dp = self.pitch - other.pitch;
        (dr * dr + dy * dy + dp * dp).sqrt()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceDetection {
    pub pose: Pose,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelDetection {
    pub name: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    /// Metrics computed from actual frames.
    Completed,
    /// Neutral substitute: decoding unavailable, no frames, or an absorbed failure.
    Degraded,
}

/// Output of the visual analysis stage. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualMetrics {
    pub attention: AttentionValue,
    pub objects_detected: Vec<String>,
    pub frames_analyzed: u64,
    pub video_duration: f64,
    pub processing_status: AnalysisStatus,
}

/// Output of the feedback extractor. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackMetrics {
    pub transcription: String,
    pub avaliacao: String,
    pub correcao: String,
}

/// The visual branch result as it crosses the fusion boundary. Two
/// historical wire shapes are still in circulation; anything else falls
/// through to `Legacy` and fuses with the documented defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VisualPayload {
    Direct {
        objects: Vec<String>,
        attention: AttentionValue,
    },
    Nested {
        metrics: NestedMetrics,
    },
    Legacy(serde_json::Value),
}

/// The nested `metrics` wire shape. Every field is optional; fusion fills
/// the gaps with the canonical defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NestedMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objects_detected: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attention_score: Option<AttentionValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frames_analyzed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_status: Option<AnalysisStatus>,
}

impl From<VisualMetrics> for VisualPayload {
    fn from(metrics: VisualMetrics) -> Self {
        VisualPayload::Nested {
            metrics: NestedMetrics {
                objects_detected: Some(metrics.objects_detected),
                attention_score: Some(metrics.attention),
                frames_analyzed: Some(metrics.frames_analyzed),
                video_duration: Some(metrics.video_duration),
                processing_status: Some(metrics.processing_status),
            },
        }
    }
}

/// One interview session as stored in the record table. The four analytic
/// fields stay empty until fusion writes them, exactly once per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub record_id: String,
    pub owner_email: String,
    pub created_at: DateTime<Utc>,
    pub duration_secs: f64,
    #[serde(default)]
    pub report: Option<FeedbackMetrics>,
    #[serde(default)]
    pub objects: Option<Vec<String>>,
    #[serde(default)]
    pub attention: Option<AttentionValue>,
    #[serde(default)]
    pub video: Option<String>,
}

impl SessionRecord {
    pub fn new(record_id: String, owner_email: String, duration_secs: f64) -> Self {
        SessionRecord {
            record_id,
            owner_email,
            created_at: Utc::now(),
            duration_secs,
            report: None,
            objects: None,
            attention: None,
            video: None,
        }
    }
}

/// The subset of SessionRecord fields fusion replaces in one write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedResult {
    pub report: FeedbackMetrics,
    pub objects: Vec<String>,
    pub attention: AttentionValue,
    pub video: String,
}

/// Speech-to-text result document, as produced by the transcription
/// collaborator. Only the first transcript string is consumed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptDocument {
    pub results: TranscriptResults,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptResults {
    pub transcripts: Vec<TranscriptText>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptText {
    pub transcript: String,
}

impl TranscriptDocument {
    pub fn transcript_text(&self) -> Option<&str> {
        self.results
            .transcripts
            .first()
            .map(|t| t.transcript.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_score_keeps_exact_text() {
        let score = DecimalScore::from_f64(0.85);
        assert_eq!(score.as_str(), "0.85");
        let json = serde_json::to_string(&score).unwrap();
        let back: DecimalScore = serde_json::from_str(&json).unwrap();
        assert_eq!(back.as_str(), "0.85");
    }

    #[test]
    fn decimal_score_accepts_json_numbers() {
        let score: DecimalScore = serde_json::from_str("0.4").unwrap();
        assert_eq!(score.as_str(), "0.4");
        assert!(DecimalScore::parse("not a number").is_none());
    }

    #[test]
    fn attention_value_round_trips_both_variants() {
        let flag: AttentionValue = serde_json::from_str("false").unwrap();
        assert_eq!(flag, AttentionValue::Flag(false));
        let score: AttentionValue = serde_json::from_str("0.85").unwrap();
        assert_eq!(score, AttentionValue::score(0.85));
    }

    #[test]
    fn pose_drift_is_euclidean() {
        let a = Pose {
            roll: 0.0,
            yaw: 0.0,
            pitch: 0.0,
        };
        let b = Pose {
            roll: 3.0,
            yaw: 4.0,
            pitch: 0.0,
        };
        assert!((a.drift(&b) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn visual_payload_parses_both_historical_shapes() {
        let direct: VisualPayload =
            serde_json::from_str(r#"{"objects":["Hat"],"attention":false}"#).unwrap();
        assert!(matches!(direct, VisualPayload::Direct { .. }));

        let nested: VisualPayload =
            serde_json::from_str(r#"{"metrics":{"objects_detected":["Cap"],"attention_score":0.4}}"#)
                .unwrap();
        match nested {
            VisualPayload::Nested { metrics } => {
                assert_eq!(metrics.objects_detected.as_deref(), Some(&["Cap".to_string()][..]));
                assert_eq!(metrics.attention_score, Some(AttentionValue::score(0.4)));
            }
            other => panic!("expected nested shape, got {:?}", other),
        }

        let legacy: VisualPayload = serde_json::from_str(r#"{"something":"else"}"#).unwrap();
        assert!(matches!(legacy, VisualPayload::Legacy(_)));
    }
}
