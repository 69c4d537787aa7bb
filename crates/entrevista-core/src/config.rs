/// Single-step pose drift (in degrees) beyond which a session is marked
/// inattentive. Carried over from the original deployment unchanged.
pub const ATTENTION_DRIFT_THRESHOLD: f64 = 30.0;

/// Neutral attention score substituted when visual analysis degrades.
pub const NEUTRAL_ATTENTION_SCORE: f64 = 0.85;

/// Canonical object set substituted when visual analysis degrades.
pub const NEUTRAL_OBJECTS: [&str; 2] = ["Person", "Face"];

/// Default sampling interval between extracted frames, in seconds.
pub const DEFAULT_SAMPLING_INTERVAL: f64 = 1.0;

/// Labels that disqualify an interview recording when seen in any frame.
pub const DEFAULT_FORBIDDEN_LABELS: [&str; 4] =
    ["Cell Phone", "Mobile Phone", "Book", "Headphones"];

/// The fixed question set the candidate answers during the simulation.
pub const DEFAULT_QUESTIONS: &str = r#"
    1- Cite um serviço de computação AWS;
    2- Como são cobrados os serviços AWS?;
    3- Onde posso armazenar aquivos em objeto na AWS?;
    "#;

pub const PRIMARY_MODEL_ID: &str = "anthropic.claude-sonnet-4-20250514-v1:0";
pub const FALLBACK_MODEL_ID: &str = "anthropic.claude-3-haiku-20240307-v1:0";

/// Upper bound on in-flight per-frame detection calls against the vision
/// service.
pub const DETECTION_CONCURRENCY: usize = 4;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Seconds between sampled frames.
    pub sampling_interval_secs: f64,
    pub drift_threshold: f64,
    pub forbidden_labels: Vec<String>,
    pub questions: String,
    pub primary_model_id: String,
    pub fallback_model_id: String,
    /// Inference profile name for the primary model, derived from the
    /// deployment name.
    pub profile_name: String,
    pub detection_concurrency: usize,
    /// Deployment-time capability flag: when false the visual branch skips
    /// decoding entirely and conversion degrades to a pass-through copy.
    pub decode_available: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            sampling_interval_secs: DEFAULT_SAMPLING_INTERVAL,
            drift_threshold: ATTENTION_DRIFT_THRESHOLD,
            forbidden_labels: DEFAULT_FORBIDDEN_LABELS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            questions: DEFAULT_QUESTIONS.to_string(),
            primary_model_id: PRIMARY_MODEL_ID.to_string(),
            fallback_model_id: FALLBACK_MODEL_ID.to_string(),
            profile_name: "entrevista-feedback-default".to_string(),
            detection_concurrency: DETECTION_CONCURRENCY,
            decode_available: true,
        }
    }
}

impl PipelineConfig {
    pub fn neutral_objects() -> Vec<String> {
        NEUTRAL_OBJECTS.iter().map(|s| s.to_string()).collect()
    }
}
