use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use lru::LruCache;
use serde::de::DeserializeOwned;

use super::error::LoadError;
use super::gzip::decode_bytes;
use super::source::DataSource;
use crate::vibe::dataset::VibeDataset;
use crate::vibe::model::{AvailableFiles, EventsSample, GridCollection, Insight, Metadata, Pulse, VibeScores};

const CACHE_CAPACITY: usize = 8;

/// Fetches published files, preferring the `.gz` variant and decoding whatever arrives.
pub struct DataRetriever {
    source: Box<dyn DataSource>,
    cache: Mutex<LruCache<String, Arc<Vec<u8>>>>,
}

impl DataRetriever {
    pub fn new(source: Box<dyn DataSource>) -> Self {
        let capacity = NonZeroUsize::new(CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self {
            source,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn describe(&self) -> String {
        self.source.describe()
    }

    /// Decoded body of `name`, trying `name.gz` first and falling back to `name`.
    pub async fn fetch_raw(&self, name: &str) -> Result<Vec<u8>, LoadError> {
        if !name.ends_with(".gz") {
            let compressed = format!("{}.gz", name);
            match self.source.fetch(&compressed).await {
                Ok(body) => {
                    log::debug!("Got {} ({} bytes)", compressed, body.len());
                    return decode_bytes(&compressed, &body);
                }
                Err(e) if e.is_not_found() => log::debug!("{} not published, trying {}", compressed, name),
                Err(e) => return Err(e),
            }
        }

        let body = self.source.fetch(name).await.map_err(|e| match e {
            LoadError::NotFound(_) => LoadError::NotFound(name.to_string()),
            other => other,
        })?;
        log::debug!("Got {} ({} bytes)", name, body.len());
        decode_bytes(name, &body)
    }

    pub async fn fetch_document<T: DeserializeOwned>(&self, name: &str) -> Result<T, LoadError> {
        let bytes = self.fetch_raw(name).await?;
        parse_json(name, &bytes)
    }

    /// Like `fetch_document`, but a missing file is `None` rather than an error.
    pub async fn fetch_optional<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, LoadError> {
        match self.fetch_document(name).await {
            Ok(doc) => Ok(Some(doc)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Serves `name` from the in-memory cache once it has been fetched.
    pub async fn fetch_cached<T: DeserializeOwned>(&self, name: &str) -> Result<T, LoadError> {
        let cached = self.lock_cache().get(name).cloned();
        let bytes = match cached {
            Some(bytes) => {
                log::debug!("{} served from cache", name);
                bytes
            }
            None => {
                let bytes = Arc::new(self.fetch_raw(name).await?);
                self.lock_cache().put(name.to_string(), bytes.clone());
                bytes
            }
        };
        parse_json(name, &bytes)
    }

    pub fn invalidate(&self, name: &str) {
        self.lock_cache().pop(name);
    }

    #[cfg(test)]
    pub fn is_cached(&self, name: &str) -> bool {
        self.lock_cache().contains(name)
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, LruCache<String, Arc<Vec<u8>>>> {
        // A poisoned cache only ever holds complete entries, so keep using it.
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn parse_json<T: DeserializeOwned>(name: &str, bytes: &[u8]) -> Result<T, LoadError> {
    serde_json::from_slice(bytes).map_err(|source| LoadError::Json {
        name: name.to_string(),
        source,
    })
}

/// Everything the dashboard shows, assembled from one load.
#[derive(Debug, Clone, Default)]
pub struct DashboardData {
    pub metadata: Option<Metadata>,
    pub files: AvailableFiles,
    pub dataset: VibeDataset,
    pub pulse: Option<Pulse>,
    pub insights: Vec<Insight>,
    pub sample: Option<EventsSample>,
    pub generated_at: String,
}

fn resolve_files(metadata: Option<&Metadata>, default_resolution: u8) -> AvailableFiles {
    let resolution = metadata.map_or(default_resolution, |m| m.h3_resolution);
    let defaults = AvailableFiles::for_resolution(resolution);
    let Some(meta) = metadata else {
        return defaults;
    };
    let pick = |published: &str, fallback: String| {
        if published.trim().is_empty() {
            fallback
        } else {
            published.to_string()
        }
    };
    AvailableFiles {
        core_grid: pick(&meta.available_files.core_grid, defaults.core_grid),
        vibe_scores: pick(&meta.available_files.vibe_scores, defaults.vibe_scores),
        events_sample: pick(&meta.available_files.events_sample, defaults.events_sample),
    }
}

/// Loads metadata, grid, scores and the events sample, strictly in that order.
pub async fn load_dashboard(retriever: &DataRetriever, default_resolution: u8) -> Result<DashboardData, LoadError> {
    let metadata: Option<Metadata> = retriever.fetch_optional("metadata.json").await?;
    if metadata.is_none() {
        log::warn!("No metadata published, assuming resolution {}", default_resolution);
    }
    let files = resolve_files(metadata.as_ref(), default_resolution);
    load_with_files(retriever, metadata, files).await
}

/// Refetches scores and the sample only; the grid comes from the cache.
pub async fn refresh_scores(retriever: &DataRetriever, previous: &DashboardData) -> Result<DashboardData, LoadError> {
    load_with_files(retriever, previous.metadata.clone(), previous.files.clone()).await
}

async fn load_with_files(
    retriever: &DataRetriever,
    metadata: Option<Metadata>,
    files: AvailableFiles,
) -> Result<DashboardData, LoadError> {
    let grid: Option<GridCollection> = match retriever.fetch_cached(&files.core_grid).await {
        Ok(grid) => Some(grid),
        Err(e) if e.is_not_found() => {
            log::warn!("{} not published, deriving cell outlines from their indices", files.core_grid);
            None
        }
        Err(e) => return Err(e),
    };

    let scores: VibeScores = retriever.fetch_document(&files.vibe_scores).await?;
    let sample: Option<EventsSample> = retriever.fetch_optional(&files.events_sample).await?;

    let dataset = VibeDataset::assemble(grid.as_ref(), &scores);
    log::info!(
        "Loaded {} cells, {} insights, sample: {}",
        dataset.len(),
        scores.insights.len(),
        sample.as_ref().map_or(0, |s| s.samples.len())
    );

    Ok(DashboardData {
        metadata,
        files,
        dataset,
        pulse: scores.pulse,
        insights: scores.insights,
        sample,
        generated_at: scores.generated_at,
    })
}
