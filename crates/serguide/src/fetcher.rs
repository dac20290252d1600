use std::fmt::Display;
use std::path::PathBuf;
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;

/// Selector present once the result list has been rendered client-side.
pub const DEFAULT_WAIT_SELECTOR: &str = "div.docResualtWrap";

/// Doctor title prefix that appears in every rendered listing.
pub const DOCTOR_TITLE_PREFIX: &str = "ד\"ר ";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Failed to launch browser: {0}")]
    Launch(String),
    #[error("Failed to load {url}: {source}")]
    Navigation {
        url: String,
        #[source]
        source: CdpError,
    },
    #[error("Timed out after {}s waiting for results on {url}", .timeout.as_secs())]
    Timeout { url: String, timeout: Duration },
    #[error("Failed to read rendered HTML of {url}: {source}")]
    Content {
        url: String,
        #[source]
        source: CdpError,
    },
}

impl FetchError {
    pub fn url(&self) -> Option<&str> {
        match self {
            FetchError::Launch(_) => None,
            FetchError::Navigation { url, .. }
            | FetchError::Timeout { url, .. }
            | FetchError::Content { url, .. } => Some(url),
        }
    }
}

/// DOM state that signals the result list has finished rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitCondition {
    /// At least one element matches the CSS selector.
    Selector(String),
    /// The page's visible text contains the string.
    Text(String),
}

impl Default for WaitCondition {
    fn default() -> Self {
        WaitCondition::Selector(DEFAULT_WAIT_SELECTOR.to_string())
    }
}

impl Display for WaitCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WaitCondition::Selector(selector) => write!(f, "selector '{}'", selector),
            WaitCondition::Text(text) => write!(f, "text '{}'", text),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub timeout: Duration,
    pub wait_for: WaitCondition,
    pub executable: Option<PathBuf>,
    pub headless: bool,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            wait_for: WaitCondition::default(),
            executable: None,
            headless: true,
        }
    }
}

/// Something that turns a page URL into the page's final HTML.
pub trait PageSource {
    fn fetch_page(&self, page_url: &str) -> impl Future<Output = Result<String, FetchError>>;
}

#[derive(Debug, Clone, Default)]
pub struct BrowserFetcher {
    config: FetcherConfig,
}

impl BrowserFetcher {
    pub fn new(config: FetcherConfig) -> Self {
        Self { config }
    }

    /// Loads `page_url` in a fresh headless browser and returns its HTML once
    /// `wait_for` holds.
    ///
    /// `timeout` bounds the whole fetch, browser start-up included. The browser
    /// is shut down before returning, whatever the outcome.
    pub async fn fetch_rendered_html(
        &self,
        page_url: &str,
        wait_for: &WaitCondition,
        timeout: Duration,
    ) -> Result<String, FetchError> {
        let mut session = None;
        let result = with_deadline(page_url, timeout, async {
            let session = session.insert(BrowserSession::launch(&self.config).await?);
            session.render(page_url, wait_for).await
        })
        .await;

        if let Some(mut session) = session {
            session.close().await;
        }
        result
    }
}

impl PageSource for BrowserFetcher {
    async fn fetch_page(&self, page_url: &str) -> Result<String, FetchError> {
        self.fetch_rendered_html(page_url, &self.config.wait_for, self.config.timeout)
            .await
    }
}

struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl BrowserSession {
    async fn launch(config: &FetcherConfig) -> Result<Self, FetchError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg(format!(
                "--user-agent={}/{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ));
        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &config.executable {
            builder = builder.chrome_executable(path);
        }
        let browser_config = builder.build().map_err(FetchError::Launch)?;

        log::debug!("Launching browser");
        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| FetchError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    log::debug!("Browser handler event error: {}", e);
                }
            }
        });

        Ok(Self { browser, handler })
    }

    async fn render(
        &self,
        page_url: &str,
        wait_for: &WaitCondition,
    ) -> Result<String, FetchError> {
        let navigation_error = |source| FetchError::Navigation {
            url: page_url.to_string(),
            source,
        };

        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(navigation_error)?;

        log::debug!("Navigating to {} and waiting for {}", page_url, wait_for);
        let navigate = async {
            page.goto(page_url)
                .await
                .map(|_| ())
                .map_err(navigation_error)
        };
        let page_ref = &page;
        load_and_wait(navigate, move || condition_holds(page_ref, wait_for)).await?;

        page.content().await.map_err(|source| FetchError::Content {
            url: page_url.to_string(),
            source,
        })
    }

    async fn close(&mut self) {
        if let Err(e) = self.browser.close().await {
            log::warn!("Failed to close browser: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            log::warn!("Failed to wait for browser exit: {}", e);
        }
        log::debug!("Browser closed");
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

async fn condition_holds(page: &Page, wait_for: &WaitCondition) -> bool {
    match wait_for {
        WaitCondition::Selector(selector) => page.find_element(selector.as_str()).await.is_ok(),
        WaitCondition::Text(text) => {
            let Ok(needle) = serde_json::to_string(text) else {
                return false;
            };
            let script = format!(
                "document.body !== null && document.body.innerText.includes({})",
                needle
            );
            match page.evaluate(script).await {
                Ok(result) => result.into_value::<bool>().unwrap_or(false),
                Err(_) => false,
            }
        }
    }
}

/// Runs `navigate`, then polls `probe` until the rendered page satisfies it.
async fn load_and_wait<N, F, Fut>(navigate: N, mut probe: F) -> Result<(), FetchError>
where
    N: Future<Output = Result<(), FetchError>>,
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    navigate.await?;
    while !probe().await {
        tokio::time::sleep(POLL_INTERVAL).await;
    }
    Ok(())
}

/// Fails with [`FetchError::Timeout`] if `fetch` has not finished within `timeout`.
async fn with_deadline<T>(
    page_url: &str,
    timeout: Duration,
    fetch: impl Future<Output = Result<T, FetchError>>,
) -> Result<T, FetchError> {
    tokio::time::timeout(timeout, fetch)
        .await
        .map_err(|_| FetchError::Timeout {
            url: page_url.to_string(),
            timeout,
        })?
}
