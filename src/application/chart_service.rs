// Chart service - Use case for building the depth chart
use crate::application::aggregation::aggregate;
use crate::application::filter_cache::FilterCache;
use crate::application::filter_resolver::{resolve, RawFilterParams, ValidationError};
use crate::application::reading_store::{LoadError, ReadingStore};
use crate::domain::chart::Aggregation;
use crate::domain::filter::FilterDescriptor;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Everything the presentation layer needs to draw one chart.
#[derive(Debug, Clone)]
pub struct ChartView {
    pub filter: FilterDescriptor,
    pub aggregation: Aggregation,
}

#[derive(Clone)]
pub struct ChartService {
    store: Arc<ReadingStore>,
    filters: Arc<FilterCache>,
}

impl ChartService {
    pub fn new(store: Arc<ReadingStore>, filters: Arc<FilterCache>) -> Self {
        Self { store, filters }
    }

    pub async fn chart(
        &self,
        session: Option<&str>,
        raw: &RawFilterParams,
    ) -> Result<ChartView, ChartError> {
        self.chart_at(session, raw, Utc::now()).await
    }

    pub async fn chart_at(
        &self,
        session: Option<&str>,
        raw: &RawFilterParams,
        now: DateTime<Utc>,
    ) -> Result<ChartView, ChartError> {
        let filter = self.resolve_filter(session, raw, now).await?;

        if filter.refresh {
            let series = self.store.refresh().await?;
            tracing::info!("Refreshed reading store on request: {} readings", series.len());
        }

        let series = self.store.snapshot().await;
        let aggregation = aggregate(&series, &filter);
        tracing::debug!(
            "Aggregated {} readings into {} points ({} x {})",
            aggregation.reading_count,
            aggregation.points.len(),
            filter.granularity.quantity,
            filter.granularity.unit
        );

        Ok(ChartView {
            filter,
            aggregation,
        })
    }

    pub async fn refresh(&self) -> Result<usize, LoadError> {
        Ok(self.store.refresh().await?.len())
    }

    /// A request with no parameters at all resets the session's filter.
    async fn resolve_filter(
        &self,
        session: Option<&str>,
        raw: &RawFilterParams,
        now: DateTime<Utc>,
    ) -> Result<FilterDescriptor, ValidationError> {
        let Some(session) = session else {
            return resolve(raw, None, now);
        };

        if raw.is_empty() {
            self.filters.forget(session).await;
            return resolve(raw, None, now);
        }

        let prior = self.filters.get(session).await;
        let filter = resolve(raw, prior.as_ref(), now)?;
        self.filters.remember(session, &filter).await;
        Ok(filter)
    }
}
