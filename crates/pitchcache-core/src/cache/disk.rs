use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::warn;

use super::store::{select_key, CacheStore, MatchOptions};
use crate::error::CacheError;
use crate::models::Response;

/// Extension of compartment files in the cache directory.
const COMPARTMENT_EXT: &str = "json";

/// A stored response plus the time it was written. `cached_at` is for
/// display only; strategies never look at it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedEntry {
    pub response: Response,
    pub cached_at: DateTime<Utc>,
}

impl CachedEntry {
    pub fn new(response: Response) -> Self {
        Self {
            response,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        age_display(self.age_minutes())
    }
}

/// Human-friendly rendering of an age in minutes.
pub fn age_display(minutes: i64) -> String {
    if minutes < 1 {
        // Negative ages come from clock skew
        "just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if minutes < 1440 {
        let hours = minutes / 60;
        let remaining_mins = minutes % 60;
        if remaining_mins >= 30 {
            // Round up: 1h 30m+ becomes 2h
            format!("{}h ago", hours + 1)
        } else {
            format!("{}h ago", hours)
        }
    } else {
        let days = minutes / 1440;
        let remaining_hours = (minutes % 1440) / 60;
        if remaining_hours >= 12 {
            format!("{}d ago", days + 1)
        } else {
            format!("{}d ago", days)
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CompartmentFile {
    name: String,
    #[serde(default)]
    entries: BTreeMap<String, CachedEntry>,
}

/// Overview of one compartment, for listings.
#[derive(Debug, Clone)]
pub struct CompartmentSummary {
    pub name: String,
    pub entries: usize,
    pub newest: Option<DateTime<Utc>>,
}

impl CompartmentSummary {
    pub fn age_display(&self) -> String {
        match self.newest {
            Some(at) => age_display((Utc::now() - at).num_minutes()),
            None => "empty".to_string(),
        }
    }
}

/// Cache store backed by one JSON file per compartment.
///
/// A single lock serializes writers so each put/delete is a whole-file
/// replace; readers never observe a half-written file.
pub struct DiskCacheStore {
    cache_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl DiskCacheStore {
    pub fn new(cache_dir: PathBuf) -> Result<Self, CacheError> {
        std::fs::create_dir_all(&cache_dir)?;
        Ok(Self {
            cache_dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Compartment names can carry host ports, so map them to safe file names.
    fn compartment_path(&self, name: &str) -> PathBuf {
        let file: String = name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.cache_dir.join(format!("{}.{}", file, COMPARTMENT_EXT))
    }

    async fn load_file(&self, path: &Path) -> Result<Option<CompartmentFile>, CacheError> {
        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let file: CompartmentFile =
            serde_json::from_str(&contents).map_err(|e| CacheError::Corrupt {
                name: path.display().to_string(),
                reason: e.to_string(),
            })?;
        Ok(Some(file))
    }

    async fn load(&self, name: &str) -> Result<Option<CompartmentFile>, CacheError> {
        let path = self.compartment_path(name);
        match self.load_file(&path).await? {
            Some(file) if file.name == name => Ok(Some(file)),
            Some(file) => Err(CacheError::Corrupt {
                name: name.to_string(),
                reason: format!("file holds compartment {}", file.name),
            }),
            None => Ok(None),
        }
    }

    async fn save(&self, file: &CompartmentFile) -> Result<(), CacheError> {
        let path = self.compartment_path(&file.name);
        let tmp = path.with_extension("tmp");
        let contents = serde_json::to_string(file)?;
        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Every compartment file in the cache directory. A file that cannot be
    /// read is listed under its file stem with no contents, so it can still
    /// be deleted by name.
    async fn compartment_files(
        &self,
    ) -> Result<Vec<(String, Option<CompartmentFile>)>, CacheError> {
        let mut files = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.cache_dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(COMPARTMENT_EXT) {
                continue;
            }
            match self.load_file(&path).await {
                Ok(Some(file)) => files.push((file.name.clone(), Some(file))),
                Ok(None) => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Unreadable compartment file");
                    if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                        files.push((stem.to_string(), None));
                    }
                }
            }
        }
        files.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(files)
    }

    /// Every compartment with its entry count and newest write time.
    pub async fn summaries(&self) -> Result<Vec<CompartmentSummary>, CacheError> {
        Ok(self
            .compartment_files()
            .await?
            .into_iter()
            .map(|(name, file)| {
                let entries = file.map(|file| file.entries).unwrap_or_default();
                CompartmentSummary {
                    newest: entries.values().map(|e| e.cached_at).max(),
                    entries: entries.len(),
                    name,
                }
            })
            .collect())
    }
}

#[async_trait]
impl CacheStore for DiskCacheStore {
    async fn open(&self, name: &str) -> Result<(), CacheError> {
        let _guard = self.write_lock.lock().await;
        if self.load(name).await?.is_none() {
            self.save(&CompartmentFile {
                name: name.to_string(),
                entries: BTreeMap::new(),
            })
            .await?;
        }
        Ok(())
    }

    async fn names(&self) -> Result<Vec<String>, CacheError> {
        Ok(self
            .compartment_files()
            .await?
            .into_iter()
            .map(|(name, _)| name)
            .collect())
    }

    async fn match_entry(
        &self,
        name: &str,
        key: &str,
        options: MatchOptions,
    ) -> Result<Option<Response>, CacheError> {
        let Some(file) = self.load(name).await? else {
            return Ok(None);
        };
        Ok(select_key(file.entries.keys(), key, options)
            .and_then(|k| file.entries.get(k))
            .map(|entry| entry.response.clone()))
    }

    async fn put(&self, name: &str, key: &str, response: &Response) -> Result<(), CacheError> {
        let _guard = self.write_lock.lock().await;
        let mut file = self.load(name).await?.unwrap_or_else(|| CompartmentFile {
            name: name.to_string(),
            entries: BTreeMap::new(),
        });
        file.entries
            .insert(key.to_string(), CachedEntry::new(response.clone()));
        self.save(&file).await
    }

    async fn delete(&self, name: &str) -> Result<bool, CacheError> {
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(self.compartment_path(name)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn keys(&self, name: &str) -> Result<Vec<String>, CacheError> {
        Ok(self
            .load(name)
            .await?
            .map(|file| file.entries.into_keys().collect())
            .unwrap_or_default())
    }
}

// ============================================================================
// Tests
// ============================================================================
