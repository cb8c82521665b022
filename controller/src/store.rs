use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

use relaystat_common::history::{self, Sample, HISTORY_MAX_BYTES};

const SETPOINT_OBJECT: &str = "setpoint";
const HISTORY_OBJECT: &str = "history";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage i/o failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Byte-blob durable store. Absent objects read as `None` and have size 0.
pub(crate) trait Storage: Send + Sync {
    async fn read(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError>;
    async fn write(&self, name: &str, bytes: &[u8]) -> Result<(), StorageError>;
    async fn append(&self, name: &str, bytes: &[u8]) -> Result<(), StorageError>;
    async fn delete(&self, name: &str) -> Result<(), StorageError>;
    async fn size(&self, name: &str) -> Result<u64, StorageError>;
}

/// Filesystem-backed store: one file per object under the data dir.
/// Writes are single-shot with no temp-file-and-rename; a crash mid-write
/// may corrupt the object, and loaders fall back to defaults in that case.
#[derive(Clone)]
pub struct FsStorage {
    root: Arc<PathBuf>,
    lock: Arc<Mutex<()>>,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Arc::new(root.into()),
            lock: Arc::new(Mutex::new(())),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl Storage for FsStorage {
    async fn read(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let _guard = self.lock.lock().await;
        match tokio::fs::read(self.path(name)).await {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn write(&self, name: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        tokio::fs::create_dir_all(self.root.as_ref()).await?;
        tokio::fs::write(self.path(name), bytes).await?;
        Ok(())
    }

    async fn append(&self, name: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        tokio::fs::create_dir_all(self.root.as_ref()).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path(name))
            .await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        match tokio::fs::remove_file(self.path(name)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn size(&self, name: &str) -> Result<u64, StorageError> {
        let _guard = self.lock.lock().await;
        match tokio::fs::metadata(self.path(name)).await {
            Ok(meta) => Ok(meta.len()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(0),
            Err(err) => Err(err.into()),
        }
    }
}

/// Durable store for the single setpoint, persisted as plain decimal text.
/// Loading never hard-fails: absent, empty, or unparsable state falls back
/// to the built-in default.
#[derive(Clone)]
pub struct ConfigStore<S> {
    storage: S,
    default: f32,
}

impl<S: Storage> ConfigStore<S> {
    pub fn new(storage: S, default: f32) -> Self {
        Self { storage, default }
    }

    pub async fn load(&self) -> f32 {
        let raw = match self.storage.read(SETPOINT_OBJECT).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return self.default,
            Err(err) => {
                warn!("setpoint store unavailable, using default: {err}");
                return self.default;
            }
        };

        match std::str::from_utf8(&raw)
            .ok()
            .and_then(|text| text.trim().parse::<f32>().ok())
        {
            Some(value) if value.is_finite() => value,
            _ => {
                warn!("stored setpoint unreadable, using default {}", self.default);
                self.default
            }
        }
    }

    pub async fn save(&self, value: f32) -> Result<(), StorageError> {
        self.storage
            .write(SETPOINT_OBJECT, format!("{value}").as_bytes())
            .await
    }
}

/// Bounded append-only temperature log, newline-delimited
/// `timestamp,temperature` records, oldest first.
///
/// Trim policy is count-based tail-keep: once the retained count reaches
/// `MAX_RECORDS` the store is rewritten keeping only the most recent
/// `TRIM_KEEP` samples. Storage failures degrade to no-ops; the log is
/// advisory and must never stall the control loop.
#[derive(Clone)]
pub struct HistoryLog<S> {
    storage: S,
}

impl<S: Storage> HistoryLog<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub async fn append(&self, sample: Sample) {
        if let Err(err) = self
            .storage
            .append(HISTORY_OBJECT, sample.encode_line().as_bytes())
            .await
        {
            warn!("history append dropped: {err}");
        }
    }

    pub async fn read_all(&self) -> Vec<Sample> {
        match self.storage.read(HISTORY_OBJECT).await {
            Ok(Some(raw)) => history::decode(&raw),
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!("history unavailable: {err}");
                Vec::new()
            }
        }
    }

    /// Run the trim policy; returns how many records were discarded.
    pub async fn trim_to_tail(&self) -> usize {
        let samples = self.read_all().await;
        let Some(kept) = history::trim_tail(&samples) else {
            return 0;
        };

        let dropped = samples.len() - kept.len();
        match self.storage.write(HISTORY_OBJECT, &history::encode(kept)).await {
            Ok(()) => dropped,
            Err(err) => {
                warn!("history trim failed: {err}");
                0
            }
        }
    }

    pub async fn clear(&self) {
        if let Err(err) = self.storage.delete(HISTORY_OBJECT).await {
            warn!("history clear failed: {err}");
        }
    }

    /// Boot-time integrity guard. The count-based trim keeps the log well
    /// under the byte ceiling, so an oversized store was written by
    /// something else; reclaim it wholesale rather than trusting its
    /// contents.
    pub async fn recover_if_oversized(&self) {
        match self.storage.size(HISTORY_OBJECT).await {
            Ok(size) if size > HISTORY_MAX_BYTES => {
                warn!(
                    "history store is {size} bytes, over the {HISTORY_MAX_BYTES} byte ceiling, clearing"
                );
                self.clear().await;
            }
            Ok(_) => {}
            Err(err) => warn!("history size check failed: {err}"),
        }
    }
}

#[cfg(test)]
pub(crate) mod mem {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use super::{Storage, StorageError};

    #[derive(Clone, Default)]
    pub(crate) struct MemStorage {
        objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MemStorage {
        pub(crate) fn new() -> Self {
            Self::default()
        }
    }

    impl Storage for MemStorage {
        async fn read(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
            Ok(self.objects.lock().unwrap().get(name).cloned())
        }

        async fn write(&self, name: &str, bytes: &[u8]) -> Result<(), StorageError> {
            self.objects
                .lock()
                .unwrap()
                .insert(name.to_string(), bytes.to_vec());
            Ok(())
        }

        async fn append(&self, name: &str, bytes: &[u8]) -> Result<(), StorageError> {
            self.objects
                .lock()
                .unwrap()
                .entry(name.to_string())
                .or_default()
                .extend_from_slice(bytes);
            Ok(())
        }

        async fn delete(&self, name: &str) -> Result<(), StorageError> {
            self.objects.lock().unwrap().remove(name);
            Ok(())
        }

        async fn size(&self, name: &str) -> Result<u64, StorageError> {
            Ok(self
                .objects
                .lock()
                .unwrap()
                .get(name)
                .map_or(0, |bytes| bytes.len() as u64))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mem::MemStorage;
    use super::*;
    use relaystat_common::history::{MAX_RECORDS, TRIM_KEEP};

    #[tokio::test]
    async fn setpoint_round_trips() {
        let store = ConfigStore::new(MemStorage::new(), 23.0);

        for value in [24.0_f32, -3.5, 0.0, 19.25] {
            store.save(value).await.unwrap();
            assert_eq!(store.load().await, value);
        }
    }

    #[tokio::test]
    async fn setpoint_defaults_when_absent() {
        let store = ConfigStore::new(MemStorage::new(), 23.0);
        assert_eq!(store.load().await, 23.0);
    }

    #[tokio::test]
    async fn setpoint_defaults_when_corrupt() {
        let storage = MemStorage::new();
        storage.write(SETPOINT_OBJECT, b"not a number").await.unwrap();

        let store = ConfigStore::new(storage.clone(), 23.0);
        assert_eq!(store.load().await, 23.0);

        storage.write(SETPOINT_OBJECT, b"").await.unwrap();
        assert_eq!(store.load().await, 23.0);

        storage.write(SETPOINT_OBJECT, b"inf").await.unwrap();
        assert_eq!(store.load().await, 23.0);
    }

    #[tokio::test]
    async fn setpoint_survives_restart() {
        let storage = MemStorage::new();

        let store = ConfigStore::new(storage.clone(), 23.0);
        assert_eq!(store.load().await, 23.0);
        store.save(24.0).await.unwrap();

        // Simulated restart: a fresh store over the same backing storage.
        let store = ConfigStore::new(storage, 23.0);
        assert_eq!(store.load().await, 24.0);
    }

    #[tokio::test]
    async fn setpoint_survives_restart_on_disk() {
        let dir = tempfile::tempdir().unwrap();

        let store = ConfigStore::new(FsStorage::new(dir.path()), 23.0);
        store.save(21.5).await.unwrap();

        let store = ConfigStore::new(FsStorage::new(dir.path()), 23.0);
        assert_eq!(store.load().await, 21.5);
    }

    #[tokio::test]
    async fn history_appends_in_order_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let log = HistoryLog::new(FsStorage::new(dir.path()));

        for i in 0..5_u64 {
            log.append(Sample {
                timestamp_ms: i * 1_000,
                temperature: 20.0 + i as f32,
            })
            .await;
        }

        let samples = log.read_all().await;
        assert_eq!(samples.len(), 5);
        assert_eq!(samples[0].timestamp_ms, 0);
        assert_eq!(samples[4].timestamp_ms, 4_000);
    }

    #[tokio::test]
    async fn history_reads_empty_when_absent() {
        let log = HistoryLog::new(MemStorage::new());
        assert!(log.read_all().await.is_empty());
        assert_eq!(log.trim_to_tail().await, 0);
    }

    #[tokio::test]
    async fn history_skips_corrupt_lines() {
        let storage = MemStorage::new();
        storage
            .write(HISTORY_OBJECT, b"1000,20.5\n<<corrupt>>\n2000,20.7\n")
            .await
            .unwrap();

        let log = HistoryLog::new(storage);
        let samples = log.read_all().await;

        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].temperature, 20.7);
    }

    #[tokio::test]
    async fn trim_fires_at_record_cap_and_keeps_tail() {
        let log = HistoryLog::new(MemStorage::new());
        let mut lengths = Vec::new();

        for i in 0..101_u64 {
            log.append(Sample {
                timestamp_ms: i,
                temperature: 21.0,
            })
            .await;
            log.trim_to_tail().await;
            lengths.push(log.read_all().await.len());
        }

        // No trim until the cap is reached.
        assert_eq!(lengths[MAX_RECORDS - 2], MAX_RECORDS - 1);
        // The append that reaches the cap triggers the rewrite.
        assert_eq!(lengths[MAX_RECORDS - 1], TRIM_KEEP);
        // And the log keeps growing from the kept tail afterwards.
        assert_eq!(lengths[MAX_RECORDS], TRIM_KEEP + 1);
        assert!(lengths.iter().all(|len| *len <= MAX_RECORDS));

        // Oldest-first order preserved across the trim: records 50..=100.
        let samples = log.read_all().await;
        assert_eq!(samples.first().unwrap().timestamp_ms, 50);
        assert_eq!(samples.last().unwrap().timestamp_ms, 100);
    }

    #[tokio::test]
    async fn trim_reports_discarded_count() {
        let storage = MemStorage::new();
        let log = HistoryLog::new(storage);

        for i in 0..MAX_RECORDS as u64 {
            log.append(Sample {
                timestamp_ms: i,
                temperature: 21.0,
            })
            .await;
        }

        assert_eq!(log.trim_to_tail().await, MAX_RECORDS - TRIM_KEEP);
        assert_eq!(log.trim_to_tail().await, 0);
    }

    #[tokio::test]
    async fn oversized_foreign_store_is_cleared_at_boot() {
        let storage = MemStorage::new();
        storage
            .write(HISTORY_OBJECT, &vec![b'x'; HISTORY_MAX_BYTES as usize + 1])
            .await
            .unwrap();

        let log = HistoryLog::new(storage.clone());
        log.recover_if_oversized().await;
        assert_eq!(storage.size(HISTORY_OBJECT).await.unwrap(), 0);

        // A healthy store is left alone.
        log.append(Sample {
            timestamp_ms: 1,
            temperature: 21.0,
        })
        .await;
        log.recover_if_oversized().await;
        assert_eq!(log.read_all().await.len(), 1);
    }

    #[tokio::test]
    async fn clear_empties_the_log() {
        let log = HistoryLog::new(MemStorage::new());
        log.append(Sample {
            timestamp_ms: 1,
            temperature: 21.0,
        })
        .await;

        log.clear().await;
        assert!(log.read_all().await.is_empty());
    }
}
