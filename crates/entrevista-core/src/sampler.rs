use std::path::Path;

use tokio::{fs, process::Command};
use tracing::{debug, warn};

use crate::types::Frame;

/// Extract one frame every `interval_secs` from the video, in temporal
/// order. Tries the in-process decoder first, then falls back to the ffmpeg
/// CLI emitting scratch JPEGs. When both paths fail the result is an empty
/// sequence, never an error: callers treat "no frames" as no visual signal.
pub async fn sample_frames(video_path: &Path, interval_secs: f64, frames_dir: &Path) -> Vec<Frame> {
    match decode_in_process(video_path, interval_secs) {
        Ok(frames) if !frames.is_empty() => return frames,
        Ok(_) => debug!(video = %video_path.display(), "in-process decoder produced no frames"),
        Err(reason) => {
            debug!(video = %video_path.display(), %reason, "in-process decode unavailable")
        }
    }

    match decode_with_ffmpeg(video_path, interval_secs, frames_dir).await {
        Ok(frames) => frames,
        Err(reason) => {
            warn!(video = %video_path.display(), %reason, "frame sampling failed on both paths");
            Vec::new()
        }
    }
}

#[cfg(feature = "opencv")]
fn decode_in_process(
    video_path: &Path,
    interval_secs: f64,
) -> std::result::Result<Vec<Frame>, String> {
    use opencv::{core::Vector, imgcodecs, prelude::*, videoio};

    let path = video_path.to_string_lossy();
    let mut capture = videoio::VideoCapture::from_file(&path, videoio::CAP_ANY)
        .map_err(|e| e.to_string())?;
    if !capture.is_opened().map_err(|e| e.to_string())? {
        return Err(format!("could not open {}", path));
    }

    let mut frames = Vec::new();
    let mut index = 0usize;
    loop {
        let timestamp_secs = index as f64 * interval_secs;
        capture
            .set(videoio::CAP_PROP_POS_MSEC, timestamp_secs * 1000.0)
            .map_err(|e| e.to_string())?;

        let mut mat = opencv::core::Mat::default();
        let read = capture.read(&mut mat).map_err(|e| e.to_string())?;
        if !read || mat.empty() {
            break;
        }

        let mut encoded = Vector::<u8>::new();
        imgcodecs::imencode(".jpg", &mat, &mut encoded, &Vector::new())
            .map_err(|e| e.to_string())?;
        frames.push(Frame {
            index,
            timestamp_secs,
            jpeg: encoded.to_vec(),
        });
        index += 1;
    }

    Ok(frames)
}

#[cfg(not(feature = "opencv"))]
fn decode_in_process(
    _video_path: &Path,
    _interval_secs: f64,
) -> std::result::Result<Vec<Frame>, String> {
    Err("built without the opencv feature".to_string())
}

/// Fallback path: ffmpeg writes numbered JPEGs into the scratch directory
/// and they are read back in filename order, which is temporal order.
async fn decode_with_ffmpeg(
    video_path: &Path,
    interval_secs: f64,
    frames_dir: &Path,
) -> std::result::Result<Vec<Frame>, String> {
    if frames_dir.exists() {
        fs::remove_dir_all(frames_dir)
            .await
            .map_err(|e| e.to_string())?;
    }
    fs::create_dir_all(frames_dir)
        .await
        .map_err(|e| e.to_string())?;

    let pattern = frames_dir.join("frame_%05d.jpg");
    let output = Command::new("ffmpeg")
        .arg("-y")
        .arg("-i")
        .arg(video_path)
        .arg("-vf")
        .arg(format!("fps=1/{}", interval_secs))
        .arg("-q:v")
        .arg("2")
        .arg(&pattern)
        .output()
        .await
        .map_err(|e| e.to_string())?;

    if !output.status.success() {
        return Err(String::from_utf8_lossy(&output.stderr).to_string());
    }

    collect_scratch_frames(frames_dir, interval_secs)
        .await
        .map_err(|e| e.to_string())
}

/// Read emitted scratch JPEGs back, sorted by filename so frame order
/// survives the round trip through the filesystem.
async fn collect_scratch_frames(
    frames_dir: &Path,
    interval_secs: f64,
) -> std::io::Result<Vec<Frame>> {
    let mut paths = Vec::new();
    let mut entries = fs::read_dir(frames_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|e| e == "jpg") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut frames = Vec::with_capacity(paths.len());
    for (index, path) in paths.iter().enumerate() {
        frames.push(Frame {
            index,
            timestamp_secs: index as f64 * interval_secs,
            jpeg: fs::read(path).await?,
        });
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("entrevista-sampler-{}-{}", tag, uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn scratch_frames_come_back_in_temporal_order() {
        let dir = temp_dir("order");
        fs::create_dir_all(&dir).await.unwrap();
        // written out of order on purpose
        fs::write(dir.join("frame_00003.jpg"), b"third").await.unwrap();
        fs::write(dir.join("frame_00001.jpg"), b"first").await.unwrap();
        fs::write(dir.join("frame_00002.jpg"), b"second").await.unwrap();
        fs::write(dir.join("notes.txt"), b"ignored").await.unwrap();

        let frames = collect_scratch_frames(&dir, 2.0).await.unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].jpeg, b"first");
        assert_eq!(frames[2].jpeg, b"third");
        assert_eq!(frames[1].index, 1);
        assert!((frames[1].timestamp_secs - 2.0).abs() < 1e-9);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn unreadable_video_yields_an_empty_sequence() {
        let dir = temp_dir("empty");
        let frames = sample_frames(Path::new("/nonexistent/video.mp4"), 1.0, &dir).await;
        assert!(frames.is_empty());
        std::fs::remove_dir_all(&dir).ok();
    }
}
