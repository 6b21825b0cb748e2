// Last-used filter per session
use crate::domain::filter::FilterDescriptor;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Remembers each session's last resolved filter so the next request can
/// omit parameters. Purely presentation state; aggregation never reads it.
#[derive(Default)]
pub struct FilterCache {
    entries: Mutex<HashMap<String, FilterDescriptor>>,
}

impl FilterCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, session: &str) -> Option<FilterDescriptor> {
        self.entries.lock().await.get(session).cloned()
    }

    /// Store `filter` for `session`. The one-shot `refresh` flag is dropped.
    pub async fn remember(&self, session: &str, filter: &FilterDescriptor) {
        let stored = FilterDescriptor {
            refresh: false,
            ..filter.clone()
        };
        self.entries.lock().await.insert(session.to_string(), stored);
    }

    pub async fn forget(&self, session: &str) {
        self.entries.lock().await.remove(session);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::filter::{Granularity, GranularityUnit};

    #[tokio::test]
    async fn test_remember_and_forget() {
        let cache = FilterCache::new();
        let filter = FilterDescriptor {
            granularity: Granularity::new(4, GranularityUnit::Minutes),
            refresh: true,
            ..Default::default()
        };

        cache.remember("a", &filter).await;
        let stored = cache.get("a").await.unwrap();
        assert_eq!(stored.granularity, filter.granularity);
        assert!(!stored.refresh);
        assert!(cache.get("b").await.is_none());

        cache.forget("a").await;
        assert!(cache.get("a").await.is_none());
    }
}
