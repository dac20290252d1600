use crate::fetcher::{BrowserFetcher, FetchError, FetcherConfig, PageSource};
use crate::parser::extract;
use crate::types::{ExtractionError, ResultTable};
use crate::utils::{normalize, page_url};
use crate::{PAGE_COUNT, PAGE_MARKER};

#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Page {page} failed: {source}")]
    Fetch {
        page: u32,
        #[source]
        source: FetchError,
    },
}

#[derive(Debug, Clone)]
pub struct Scraper<S = BrowserFetcher> {
    source: S,
}

impl Scraper<BrowserFetcher> {
    pub fn new(config: FetcherConfig) -> Self {
        Self::with_source(BrowserFetcher::new(config))
    }
}

impl<S: PageSource> Scraper<S> {
    pub fn with_source(source: S) -> Self {
        Self { source }
    }

    /// Fetches result pages 1 through 3 of `raw_url` one after another and
    /// concatenates their records in page order.
    ///
    /// The first page that fails to load aborts the run.
    pub async fn scrape(&self, raw_url: &str) -> Result<ResultTable, ScraperError> {
        let raw_url = raw_url.trim();
        if raw_url.is_empty() {
            return Err(ScraperError::InvalidInput(
                "Please enter a valid URL".to_string(),
            ));
        }

        if !raw_url.contains(PAGE_MARKER) {
            log::warn!(
                "URL has no '{}' parameter, page numbers will be appended to it as-is",
                PAGE_MARKER
            );
        }
        let base_url = normalize(raw_url);

        let mut records = Vec::new();
        let mut skipped = Vec::new();

        for page in 1..=PAGE_COUNT {
            let url = page_url(&base_url, page);
            log::info!("Fetching page {}/{}: {}", page, PAGE_COUNT, url);

            let html = self
                .source
                .fetch_page(&url)
                .await
                .map_err(|source| ScraperError::Fetch { page, source })
                .inspect_err(|e| log::error!("{}", e))?;

            let extraction = extract(&html);
            log::info!(
                "Page {}: {} record(s), {} skipped",
                page,
                extraction.records.len(),
                extraction.errors.len()
            );

            records.extend(extraction.records);
            skipped.extend(
                extraction
                    .errors
                    .into_iter()
                    .map(|e| ExtractionError::new(page, e)),
            );
        }

        Ok(ResultTable::new(records, skipped))
    }
}
