use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::{
    error::{PipelineError, Result},
    services::{ObjectStore, RecordTable},
    types::{FusedResult, SessionRecord},
};

/// Object store rooted at a local directory. Keys map to relative paths.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsObjectStore { root: root.into() }
    }

    fn resolve(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        fs::read(self.resolve(key))
            .await
            .map_err(|e| PipelineError::StorageFailed {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        let path = self.resolve(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, bytes)
            .await
            .map_err(|e| PipelineError::StorageFailed {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    async fn copy(&self, from: &str, to: &str) -> Result<()> {
        let target = self.resolve(to);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::copy(self.resolve(from), target)
            .await
            .map(|_| ())
            .map_err(|e| PipelineError::StorageFailed {
                key: from.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Record table persisted as one JSON document per record.
pub struct JsonRecordTable {
    root: PathBuf,
}

impl JsonRecordTable {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        JsonRecordTable { root: root.into() }
    }

    fn record_path(&self, record_id: &str) -> PathBuf {
        self.root.join(format!("{}.json", record_id))
    }

    async fn write_record(&self, record: &SessionRecord) -> Result<()> {
        fs::create_dir_all(&self.root).await?;
        let json = serde_json::to_string_pretty(record)?;
        fs::write(self.record_path(&record.record_id), json).await?;
        Ok(())
    }

    async fn read_record(&self, path: &Path) -> Result<SessionRecord> {
        let json = fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&json)?)
    }
}

#[async_trait]
impl RecordTable for JsonRecordTable {
    async fn get(&self, record_id: &str) -> Result<Option<SessionRecord>> {
        let path = self.record_path(record_id);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(self.read_record(&path).await?))
    }

    async fn insert(&self, record: &SessionRecord) -> Result<()> {
        self.write_record(record).await
    }

    async fn update_analysis(
        &self,
        record_id: &str,
        fused: &FusedResult,
    ) -> Result<SessionRecord> {
        let mut record =
            self.get(record_id)
                .await?
                .ok_or_else(|| PipelineError::RecordNotFound {
                    record_id: record_id.to_string(),
                })?;

        record.report = Some(fused.report.clone());
        record.objects = Some(fused.objects.clone());
        record.attention = Some(fused.attention.clone());
        record.video = Some(fused.video.clone());

        self.write_record(&record).await?;
        Ok(record)
    }

    async fn find_by_owner(&self, owner_email: &str) -> Result<Vec<SessionRecord>> {
        let mut records = Vec::new();
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(_) => return Ok(records),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "json") {
                let record = self.read_record(&path).await?;
                if record.owner_email == owner_email {
                    records.push(record);
                }
            }
        }

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttentionValue, FeedbackMetrics};

    fn temp_root(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("entrevista-store-{}-{}", tag, uuid::Uuid::new_v4()))
    }

    fn sample_fused(video: &str) -> FusedResult {
        FusedResult {
            report: FeedbackMetrics {
                transcription: "ola".to_string(),
                avaliacao: "boa".to_string(),
                correcao: "ok".to_string(),
            },
            objects: vec!["Person".to_string()],
            attention: AttentionValue::Flag(true),
            video: video.to_string(),
        }
    }

    #[tokio::test]
    async fn fs_store_round_trips_and_copies() {
        let root = temp_root("objects");
        let store = FsObjectStore::new(&root);

        store.put("uploads/a.mp4", b"bytes".to_vec()).await.unwrap();
        store.copy("uploads/a.mp4", "converted/a.mov").await.unwrap();
        assert_eq!(store.get("converted/a.mov").await.unwrap(), b"bytes");

        assert!(store.get("missing").await.is_err());
        std::fs::remove_dir_all(&root).ok();
    }

    #[tokio::test]
    async fn table_updates_analysis_fields_in_place() {
        let root = temp_root("records");
        let table = JsonRecordTable::new(&root);

        let record = SessionRecord::new("rec-1".to_string(), "a@b.com".to_string(), 30.0);
        table.insert(&record).await.unwrap();

        let updated = table
            .update_analysis("rec-1", &sample_fused("converted/rec-1.mov"))
            .await
            .unwrap();
        assert_eq!(updated.video.as_deref(), Some("converted/rec-1.mov"));
        assert_eq!(updated.owner_email, "a@b.com");

        let by_owner = table.find_by_owner("a@b.com").await.unwrap();
        assert_eq!(by_owner.len(), 1);
        assert_eq!(by_owner[0], updated);
        std::fs::remove_dir_all(&root).ok();
    }

    #[tokio::test]
    async fn updating_a_missing_record_is_an_error() {
        let root = temp_root("missing");
        let table = JsonRecordTable::new(&root);
        let err = table
            .update_analysis("ghost", &sample_fused("v"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::RecordNotFound { .. }));
        std::fs::remove_dir_all(&root).ok();
    }
}
