use async_trait::async_trait;
use serde::Deserialize;

use crate::{
    error::{PipelineError, Result},
    services::{InferenceRequest, InferenceService, InvocationTarget, ObjectStore, VisionService},
    types::{FaceDetection, LabelDetection},
};

/// Vision service spoken to over HTTP: raw JPEG bytes in, typed detections
/// out.
pub struct HttpVisionService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpVisionService {
    pub fn new(base_url: impl Into<String>) -> Self {
        HttpVisionService {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn detect<T: for<'de> Deserialize<'de>>(&self, path: &str, jpeg: &[u8]) -> Result<T> {
        let response = self
            .client
            .post(format!("{}/{}", self.base_url, path))
            .header("Content-Type", "image/jpeg")
            .body(jpeg.to_vec())
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl VisionService for HttpVisionService {
    async fn detect_faces(&self, jpeg: &[u8]) -> Result<Vec<FaceDetection>> {
        self.detect("detect-faces", jpeg).await
    }

    async fn detect_labels(&self, jpeg: &[u8]) -> Result<Vec<LabelDetection>> {
        self.detect("detect-labels", jpeg).await
    }
}

pub const INFERENCE_API_KEY_VAR: &str = "ENTREVISTA_INFERENCE_API_KEY";

#[derive(Debug, Deserialize)]
struct ProfileInfo {
    name: String,
    profile_id: String,
}

#[derive(Debug, Deserialize)]
struct ProfileList {
    profiles: Vec<ProfileInfo>,
}

/// Inference backend spoken to over HTTP, with a `/profiles` sub-resource
/// for the higher-capability indirection.
pub struct HttpInferenceService {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpInferenceService {
    /// Fails early when the API key environment variable is not set.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let api_key =
            std::env::var(INFERENCE_API_KEY_VAR).map_err(|_| PipelineError::MissingApiKey {
                env_var: INFERENCE_API_KEY_VAR.to_string(),
            })?;
        Ok(HttpInferenceService {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
        })
    }
}

#[async_trait]
impl InferenceService for HttpInferenceService {
    async fn find_profile(&self, name: &str) -> Result<Option<String>> {
        let list: ProfileList = self
            .client
            .get(format!("{}/profiles", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(list
            .profiles
            .into_iter()
            .find(|p| p.name == name)
            .map(|p| p.profile_id))
    }

    async fn create_profile(&self, name: &str, model_id: &str) -> Result<String> {
        let created: serde_json::Value = self
            .client
            .post(format!("{}/profiles", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "name": name,
                "model_id": model_id,
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        created["profile_id"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| PipelineError::UnexpectedResponse {
                reason: format!("profile creation returned no profile_id: {:?}", created),
            })
    }

    async fn invoke(
        &self,
        target: &InvocationTarget,
        request: &InferenceRequest,
    ) -> Result<String> {
        let mut body = serde_json::json!({
            "system": request.system,
            "messages": [
                {
                    "role": "user",
                    "content": [{"type": "text", "text": request.prompt}],
                }
            ],
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        });
        match target {
            InvocationTarget::Profile(profile_id) => {
                body["profile_id"] = serde_json::json!(profile_id);
            }
            InvocationTarget::Model(model_id) => {
                body["model_id"] = serde_json::json!(model_id);
            }
        }

        let response: serde_json::Value = self
            .client
            .post(format!("{}/invoke", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response["content"][0]["text"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| PipelineError::UnexpectedResponse {
                reason: format!("invocation returned no text content: {:?}", response),
            })
    }
}

/// Download an object into a local scratch file.
pub async fn fetch_to_scratch(
    store: &dyn ObjectStore,
    key: &str,
    path: &std::path::Path,
) -> Result<()> {
    let bytes = store.get(key).await?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await?;
    Ok(())
}
