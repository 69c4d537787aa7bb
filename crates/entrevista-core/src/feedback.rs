use std::sync::Arc;

use regex::Regex;
use tracing::{info, warn};

use crate::{
    config::PipelineConfig,
    error::{PipelineError, Result},
    services::{InferenceRequest, InferenceService, InvocationTarget},
    types::FeedbackMetrics,
};

const SYSTEM_PROMPT: &str = "Você é um entrevistador. Avalie a simulação de entrevista do aluno \
     e corrija as respostas das perguntas, avaliando se estão corretas ou não para cada uma delas.";

const MAX_TOKENS: u32 = 2048;
const TEMPERATURE: f64 = 0.5;

pub const AVALIACAO_TAG: &str = "avaliação";
pub const CORRECAO_TAG: &str = "correção";

/// The two tagged sections the model is contractually required to emit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFeedback {
    pub avaliacao: String,
    pub correcao: String,
}

/// Backticks keep the model text safely embeddable in structured output.
pub fn sanitize_response(raw: &str) -> String {
    raw.replace('"', "`")
}

fn extract_section(text: &str, tag: &'static str) -> Result<String> {
    let pattern = format!("(?s)<{tag}>(.*?)</{tag}>");
    let re = Regex::new(&pattern).map_err(|e| PipelineError::UnexpectedResponse {
        reason: format!("bad section pattern for <{tag}>: {e}"),
    })?;
    re.captures(text)
        .and_then(|captures| captures.get(1))
        .map(|section| section.as_str().trim().to_string())
        .ok_or(PipelineError::MissingSection { tag })
}

/// Two independent non-greedy passes, one per tag. A missing section is a
/// fatal error: a record without both parts is meaningless downstream.
pub fn parse_feedback(text: &str) -> Result<ParsedFeedback> {
    Ok(ParsedFeedback {
        avaliacao: extract_section(text, AVALIACAO_TAG)?,
        correcao: extract_section(text, CORRECAO_TAG)?,
    })
}

/// Turns a transcript into evaluation/correction feedback via the inference
/// backend, preferring the profile-provisioned primary model with a single
/// direct-model fallback.
pub struct FeedbackExtractor {
    inference: Arc<dyn InferenceService>,
    config: PipelineConfig,
}

impl FeedbackExtractor {
    pub fn new(inference: Arc<dyn InferenceService>, config: PipelineConfig) -> Self {
        FeedbackExtractor { inference, config }
    }

    fn build_request(&self, transcript: &str) -> InferenceRequest {
        let prompt = format!(
            r#"Use a transcrição da entrevista para auxiliar o entrevistador:

    <perguntas>{questions}</perguntas>
    <apresentação>{transcript}</apresentação>

    A resposta deve seguir o seguinte formato:
    <avaliação>Avaliação geral e de boas práticas de apresentação</avaliação>
    <correção>Correção das respostas do aluno para as perguntas</correção>
    "#,
            questions = self.config.questions,
            transcript = transcript,
        );

        InferenceRequest {
            system: SYSTEM_PROMPT.to_string(),
            prompt,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        }
    }

    /// Look up the primary model's inference profile, creating it lazily.
    async fn resolve_profile(&self) -> Result<String> {
        if let Some(profile_id) = self.inference.find_profile(&self.config.profile_name).await? {
            return Ok(profile_id);
        }
        self.inference
            .create_profile(&self.config.profile_name, &self.config.primary_model_id)
            .await
    }

    pub async fn extract(&self, transcript: &str) -> Result<FeedbackMetrics> {
        let request = self.build_request(transcript);

        // Ordered target list: resolved profile first, then exactly one
        // direct-model substitution. Never more than two attempts.
        let mut targets = Vec::with_capacity(2);
        match self.resolve_profile().await {
            Ok(profile_id) => targets.push(InvocationTarget::Profile(profile_id)),
            Err(e) => {
                warn!(error = %e, "inference profile unavailable, using fallback model only")
            }
        }
        targets.push(InvocationTarget::Model(self.config.fallback_model_id.clone()));

        let mut last_error = String::new();
        let mut raw = None;
        for target in &targets {
            match self.inference.invoke(target, &request).await {
                Ok(text) => {
                    info!(?target, "feedback generated");
                    raw = Some(text);
                    break;
                }
                Err(e) => {
                    warn!(?target, error = %e, "model invocation failed");
                    last_error = e.to_string();
                }
            }
        }

        let raw = raw.ok_or_else(|| PipelineError::ModelBackendExhausted {
            primary: self.config.primary_model_id.clone(),
            fallback: self.config.fallback_model_id.clone(),
            reason: last_error,
        })?;

        let parsed = parse_feedback(&sanitize_response(&raw))?;
        Ok(FeedbackMetrics {
            transcription: transcript.to_string(),
            avaliacao: parsed.avaliacao,
            correcao: parsed.correcao,
        })
    }
}
