use std::path::Path;

use tokio::process::Command;
use tracing::info;

use crate::{
    error::{PipelineError, Result},
    remote::fetch_to_scratch,
    scratch::{get_video_path, key_extension, key_stem},
    services::ObjectStore,
};

/// Normalize the uploaded recording into `converted/{stem}.mov`.
///
/// With a decoder available this is an ffmpeg re-encode through a scratch
/// file; on decoder-less deployments it degrades to a pass-through copy so
/// the rest of the pipeline still has a converted key to work from. Any
/// failure here is fatal: an unreadable source blocks the whole session.
pub async fn convert_video(
    store: &dyn ObjectStore,
    source_key: &str,
    scratch_dir: &Path,
    decode_available: bool,
) -> Result<String> {
    let stem = key_stem(source_key).ok_or_else(|| PipelineError::ConversionFailed {
        video: source_key.to_string(),
        reason: "key has no basename".to_string(),
    })?;
    let converted_key = format!("converted/{}.mov", stem);

    if !decode_available {
        info!(source_key, %converted_key, "decoder unavailable, copying source as-is");
        store
            .copy(source_key, &converted_key)
            .await
            .map_err(|e| PipelineError::ConversionFailed {
                video: source_key.to_string(),
                reason: e.to_string(),
            })?;
        return Ok(converted_key);
    }

    let input = get_video_path(scratch_dir, &key_extension(source_key));
    fetch_to_scratch(store, source_key, &input)
        .await
        .map_err(|e| PipelineError::ConversionFailed {
            video: source_key.to_string(),
            reason: e.to_string(),
        })?;

    let converted_path = scratch_dir.join("converted.mov");
    let output = Command::new("ffmpeg")
        .arg("-y")
        .arg("-i")
        .arg(&input)
        .arg(&converted_path)
        .output()
        .await?;

    if !output.status.success() {
        return Err(PipelineError::ConversionFailed {
            video: source_key.to_string(),
            reason: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    let bytes = tokio::fs::read(&converted_path).await?;
    store.put(&converted_key, bytes).await?;

    info!(source_key, %converted_key, "video converted");
    Ok(converted_key)
}
