use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use engine_logging::{engine_debug, engine_info};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::LedgerSettings;
use crate::persist::{ensure_dir, AtomicFileWriter, PersistError};

pub const DATABASE_ID: &str = "kindle";
pub const COLLECTION_ID: &str = "kindle-urls";

/// One ingested URL. Never mutated or deleted once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRecord {
    pub id: String,
    pub url: String,
    pub first_seen_utc: String,
}

impl UrlRecord {
    pub fn new(url: &str) -> Self {
        Self {
            id: short_hash(url),
            url: url.to_string(),
            first_seen_utc: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("dedup collection {0:?} does not exist and CreateDatabase is not enabled")]
    CollectionMissing(PathBuf),
    #[error("invalid ledger connection {0:?}")]
    InvalidConnection(String),
    #[error("ledger format error in {path:?}: {message}")]
    Format { path: PathBuf, message: String },
    #[error("ledger io error: {0}")]
    Io(#[from] io::Error),
    #[error("ledger write failed: {0}")]
    Persist(#[from] PersistError),
    #[error("ledger task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Dedup ledger: a document store queried by URL.
#[async_trait::async_trait]
pub trait UrlLedger: Send + Sync {
    /// Provision the database and collection when enabled; no-op otherwise.
    async fn ensure_collection_exists(&self) -> Result<(), LedgerError>;

    /// Exact-match lookup on the URL field.
    async fn seen(&self, url: &str) -> Result<bool, LedgerError>;

    /// Inserts a record unconditionally.
    async fn record_seen(&self, url: &str) -> Result<(), LedgerError>;

    /// Returns true when the URL was already recorded; records it otherwise.
    ///
    /// Two separate store calls, not atomic: concurrent callers with the same
    /// new URL may both get `false` and both insert.
    async fn check_and_record(&self, url: &str) -> Result<bool, LedgerError> {
        self.ensure_collection_exists().await?;
        if self.seen(url).await? {
            return Ok(true);
        }
        self.record_seen(url).await?;
        Ok(false)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerDocument {
    records: Vec<UrlRecord>,
}

/// Ledger kept as a RON document at `{location}/kindle/kindle-urls.ron`.
///
/// File access runs on the blocking pool, one operation at a time.
pub struct FileLedger {
    files: Arc<LedgerFiles>,
}

struct LedgerFiles {
    database_dir: PathBuf,
    collection_path: PathBuf,
    auto_provision: bool,
    io_lock: Mutex<()>,
}

impl FileLedger {
    pub fn new(location: impl Into<PathBuf>, auto_provision: bool) -> Self {
        let database_dir = location.into().join(DATABASE_ID);
        let collection_path = database_dir.join(format!("{COLLECTION_ID}.ron"));
        Self {
            files: Arc::new(LedgerFiles {
                database_dir,
                collection_path,
                auto_provision,
                io_lock: Mutex::new(()),
            }),
        }
    }

    pub fn from_settings(settings: &LedgerSettings) -> Result<Self, LedgerError> {
        let location = connection_path(&settings.connection)?;
        Ok(Self::new(location, settings.create_database))
    }

    pub fn collection_path(&self) -> &Path {
        &self.files.collection_path
    }

    async fn run<T, F>(&self, op: F) -> Result<T, LedgerError>
    where
        T: Send + 'static,
        F: FnOnce(&LedgerFiles) -> Result<T, LedgerError> + Send + 'static,
    {
        let files = Arc::clone(&self.files);
        tokio::task::spawn_blocking(move || {
            let _guard = files.lock();
            op(&files)
        })
        .await?
    }
}

impl LedgerFiles {
    fn load(&self) -> Result<LedgerDocument, LedgerError> {
        let content = match fs::read_to_string(&self.collection_path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(LedgerError::CollectionMissing(self.collection_path.clone()));
            }
            Err(err) => return Err(err.into()),
        };
        ron::from_str(&content).map_err(|err| LedgerError::Format {
            path: self.collection_path.clone(),
            message: err.to_string(),
        })
    }

    fn store(&self, document: &LedgerDocument) -> Result<(), LedgerError> {
        let content = ron::ser::to_string_pretty(document, ron::ser::PrettyConfig::new())
            .map_err(|err| LedgerError::Format {
                path: self.collection_path.clone(),
                message: err.to_string(),
            })?;
        let writer = AtomicFileWriter::new(self.database_dir.clone());
        writer.write(&format!("{COLLECTION_ID}.ron"), &content)?;
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        // The guarded data is `()`, so a poisoned lock carries no broken state.
        self.io_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait::async_trait]
impl UrlLedger for FileLedger {
    async fn ensure_collection_exists(&self) -> Result<(), LedgerError> {
        if !self.files.auto_provision {
            return Ok(());
        }
        self.run(|files| {
            ensure_dir(&files.database_dir)?;
            if !files.collection_path.exists() {
                files.store(&LedgerDocument::default())?;
                engine_info!("Provisioned dedup collection {:?}", files.collection_path);
            }
            Ok(())
        })
        .await
    }

    async fn seen(&self, url: &str) -> Result<bool, LedgerError> {
        let url = url.to_string();
        self.run(move |files| {
            let document = files.load()?;
            Ok(document.records.iter().any(|record| record.url == url))
        })
        .await
    }

    async fn record_seen(&self, url: &str) -> Result<(), LedgerError> {
        let record = UrlRecord::new(url);
        self.run(move |files| {
            let mut document = files.load()?;
            document.records.push(record);
            files.store(&document)?;
            engine_debug!(
                "Recorded url in {:?} ({} records)",
                files.collection_path,
                document.records.len()
            );
            Ok(())
        })
        .await
    }
}

/// In-process ledger for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    records: Mutex<Vec<UrlRecord>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_urls<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let records = urls
            .into_iter()
            .map(|url| UrlRecord::new(url.as_ref()))
            .collect();
        Self {
            records: Mutex::new(records),
        }
    }

    pub fn records(&self) -> Vec<UrlRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

#[async_trait::async_trait]
impl UrlLedger for MemoryLedger {
    async fn ensure_collection_exists(&self) -> Result<(), LedgerError> {
        Ok(())
    }

    async fn seen(&self, url: &str) -> Result<bool, LedgerError> {
        Ok(self.records().iter().any(|record| record.url == url))
    }

    async fn record_seen(&self, url: &str) -> Result<(), LedgerError> {
        let mut records = self
            .records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        records.push(UrlRecord::new(url));
        Ok(())
    }
}

fn connection_path(connection: &str) -> Result<PathBuf, LedgerError> {
    let trimmed = connection.trim();
    if trimmed.starts_with("file:") {
        let parsed = url::Url::parse(trimmed)
            .map_err(|_| LedgerError::InvalidConnection(connection.to_string()))?;
        return parsed
            .to_file_path()
            .map_err(|_| LedgerError::InvalidConnection(connection.to_string()));
    }
    if trimmed.is_empty() {
        return Err(LedgerError::InvalidConnection(connection.to_string()));
    }
    Ok(PathBuf::from(trimmed))
}

fn short_hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(16);
    for byte in digest.iter().take(8) {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}

#[cfg(test)]
mod tests {
    use super::{connection_path, short_hash};
    use std::path::PathBuf;

    #[test]
    fn record_id_is_stable_hex() {
        let id = short_hash("https://example.com/a");
        assert_eq!(id.len(), 16);
        assert_eq!(id, short_hash("https://example.com/a"));
        assert_ne!(id, short_hash("https://example.com/b"));
    }

    #[cfg(unix)]
    #[test]
    fn connection_accepts_plain_paths_and_file_urls() {
        assert_eq!(connection_path("/var/lib/kindle").unwrap(), PathBuf::from("/var/lib/kindle"));
        assert_eq!(
            connection_path("file:///var/lib/kindle").unwrap(),
            PathBuf::from("/var/lib/kindle")
        );
        assert!(connection_path("file://remote-host/share").is_err());
        assert!(connection_path("   ").is_err());
    }
}
