mod parser;
pub mod fetcher;
pub mod scraper;
pub mod types;
pub mod utils;

pub use fetcher::{BrowserFetcher, FetchError, FetcherConfig, PageSource, WaitCondition};
pub use parser::{PageExtraction, ParseError, extract};
pub use scraper::{Scraper, ScraperError};

pub(crate) const BASE_URL: &str = "https://serguide.maccabi4u.co.il/";

/// Query-string marker that precedes the page index in result URLs.
pub const PAGE_MARKER: &str = "&PageNumber=";

/// Number of result pages fetched per scrape.
pub const PAGE_COUNT: u32 = 3;
