// Source trait for raw sensor records
use async_trait::async_trait;
use futures::Stream;
use serde_json::Value;
use std::sync::Arc;

/// Opaque resume point handed back by the source.
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuationToken(pub Value);

/// One page of raw records, plus where to resume from.
#[derive(Debug, Clone, Default)]
pub struct ScanPage {
    pub records: Vec<Value>,
    /// `None` once the scan is exhausted
    pub next: Option<ContinuationToken>,
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("request to reading source failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("reading source answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected scan response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait ReadingSource: Send + Sync {
    /// Fetch the page that starts at `resume`, or the first page when `None`.
    async fn scan_page(&self, resume: Option<ContinuationToken>) -> Result<ScanPage, SourceError>;
}

/// Lazily pull pages from `source` until it stops returning a continuation
/// token. The first error ends the stream.
pub fn scan_pages(
    source: Arc<dyn ReadingSource>,
) -> impl Stream<Item = Result<ScanPage, SourceError>> + Send {
    async_stream::try_stream! {
        let mut resume = None;
        loop {
            let page = source.scan_page(resume.take()).await?;
            let next = page.next.clone();
            yield page;
            match next {
                Some(token) => resume = Some(token),
                None => break,
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{record, PagedSource};
    use super::*;
    use futures::TryStreamExt;

    #[tokio::test]
    async fn test_scan_pages_follows_tokens() {
        let source = Arc::new(PagedSource::new(vec![
            vec![record(1_000, 1.0), record(2_000, 2.0)],
            vec![],
            vec![record(3_000, 3.0)],
        ]));

        let pages: Vec<ScanPage> = scan_pages(source.clone()).try_collect().await.unwrap();

        assert_eq!(pages.len(), 3);
        assert_eq!(pages.iter().map(|p| p.records.len()).sum::<usize>(), 3);
        assert!(pages.last().unwrap().next.is_none());
        assert_eq!(source.calls.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_scan_pages_stops_on_error() {
        let source = Arc::new(PagedSource::new(vec![vec![record(1_000, 1.0)]]));
        source.set_failing(true);

        let result: Result<Vec<ScanPage>, _> = scan_pages(source).try_collect().await;
        assert!(matches!(result, Err(SourceError::Status { status: 503, .. })));
    }
}
