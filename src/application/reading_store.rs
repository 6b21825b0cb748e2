// Reading store - Shared, atomically replaced reading history
use crate::application::reading_source::{scan_pages, ReadingSource, SourceError};
use crate::domain::reading::{Reading, ReadingSeries, RecordError};
use futures::TryStreamExt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("reading source unavailable: {0}")]
    SourceUnavailable(#[from] SourceError),
    /// The whole load is rejected on the first bad record.
    #[error("malformed record #{index}: {reason}")]
    MalformedRecord { index: usize, reason: RecordError },
}

pub struct ReadingStore {
    source: Arc<dyn ReadingSource>,
    current: RwLock<Arc<ReadingSeries>>,
    refresh_lock: Mutex<()>,
}

impl ReadingStore {
    /// Create an empty store; nothing is fetched until [`refresh`](Self::refresh).
    pub fn new(source: Arc<dyn ReadingSource>) -> Self {
        Self {
            source,
            current: RwLock::new(Arc::new(ReadingSeries::empty())),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Pull every page from the source and build a sorted series.
    ///
    /// Does not touch the installed series.
    pub async fn load(&self) -> Result<ReadingSeries, LoadError> {
        let started = Instant::now();
        let mut readings = Vec::new();
        let mut page_count = 0usize;

        let pages = scan_pages(self.source.clone());
        futures::pin_mut!(pages);
        while let Some(page) = pages.try_next().await? {
            page_count += 1;
            tracing::debug!("Fetched page {} with {} records", page_count, page.records.len());

            for record in &page.records {
                let index = readings.len();
                let reading = Reading::from_record(record)
                    .map_err(|reason| LoadError::MalformedRecord { index, reason })?;
                readings.push(reading);
            }
        }

        let series = ReadingSeries::from_unsorted(readings);
        debug_assert!(series.is_sorted());
        tracing::info!(
            "Loaded {} readings from {} pages in {}ms",
            series.len(),
            page_count,
            started.elapsed().as_millis()
        );
        Ok(series)
    }

    /// Reload from the source and swap the result in.
    ///
    /// On failure the previously installed series stays in place.
    pub async fn refresh(&self) -> Result<Arc<ReadingSeries>, LoadError> {
        let _guard = self.refresh_lock.lock().await;

        let fresh = Arc::new(self.load().await?);
        *self.current.write().await = fresh.clone();
        Ok(fresh)
    }

    /// The currently installed series.
    pub async fn snapshot(&self) -> Arc<ReadingSeries> {
        self.current.read().await.clone()
    }
}

/// Refresh `store` every `interval` in the background, keeping the old
/// series whenever a refresh fails.
pub fn spawn_periodic_refresh(
    store: Arc<ReadingStore>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately and startup already loaded.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match store.refresh().await {
                Ok(series) => tracing::debug!("Periodic refresh loaded {} readings", series.len()),
                Err(e) => tracing::warn!("Periodic refresh failed, keeping previous series: {}", e),
            }
        }
    })
}
