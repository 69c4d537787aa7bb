use std::path::{Path, PathBuf};

/// Root of all per-record scratch directories.
pub fn get_scratch_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("entrevista")
}

/// Scratch directory for one record's intermediate files.
pub fn get_scratch_dir(record_id: &str) -> PathBuf {
    get_scratch_root().join(record_id)
}

/// Directory the frame sampler emits scratch JPEGs into.
pub fn get_frames_dir(scratch_dir: &Path) -> PathBuf {
    scratch_dir.join("frames")
}

/// Local copy of the video under analysis.
pub fn get_video_path(scratch_dir: &Path, extension: &str) -> PathBuf {
    scratch_dir.join(format!("video.{}", extension))
}

/// Extension of an object key, defaulting to mp4 when the key has none.
pub fn key_extension(key: &str) -> String {
    Path::new(key)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_else(|| "mp4".to_string())
}

/// Stem of an object key, used as the record id of an uploaded recording.
pub fn key_stem(key: &str) -> Option<String> {
    Path::new(key)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_helpers_split_upload_keys() {
        assert_eq!(key_stem("uploads/abc-123.mp4").as_deref(), Some("abc-123"));
        assert_eq!(key_extension("uploads/abc-123.MP4"), "mp4");
        assert_eq!(key_extension("uploads/raw"), "mp4");
    }
}
