use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use log::LevelFilter;
use serguide::fetcher::{DEFAULT_TIMEOUT, DOCTOR_TITLE_PREFIX, FetcherConfig, WaitCondition};
use serguide::{PAGE_COUNT, Scraper};

#[derive(Parser)]
#[command(name = "serguide")]
#[command(about = "A serguide.maccabi4u.co.il appointment availability scraper", long_about = None)]
struct Cli {
    #[arg(help = "Doctor search results URL, including the '&PageNumber=' parameter")]
    url: String,

    #[arg(
        short = 'o',
        long = "output",
        value_enum,
        default_value = "text",
        help = "Output format"
    )]
    format: OutputFormat,

    #[arg(
        long,
        value_name = "SECONDS",
        default_value_t = DEFAULT_TIMEOUT.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Upper bound for fetching each page, browser start-up and rendering included"
    )]
    timeout: u64,

    #[arg(
        long,
        value_name = "TEXT",
        num_args = 0..=1,
        default_missing_value = DOCTOR_TITLE_PREFIX,
        help = "Wait for this text (default: the doctor title prefix) instead of the first appointment block"
    )]
    wait_for_text: Option<String>,

    #[arg(long, value_name = "PATH", help = "Chrome/Chromium executable to launch")]
    chrome: Option<PathBuf>,

    #[arg(long, help = "Show the browser window while scraping")]
    headed: bool,

    #[arg(
        short = 'l',
        long = "log-level",
        value_enum,
        default_value = "info",
        global = true,
        help = "Set the logging level"
    )]
    log_level: LogLevel,
}

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

impl Cli {
    fn fetcher_config(&self) -> FetcherConfig {
        FetcherConfig {
            timeout: Duration::from_secs(self.timeout),
            wait_for: self
                .wait_for_text
                .clone()
                .map(WaitCondition::Text)
                .unwrap_or_default(),
            executable: self.chrome.clone(),
            headless: !self.headed,
        }
    }
}

fn serialize_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            log::error!("Error serializing to JSON: {}", e);
            process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level.clone().into())
        .init();

    let config = cli.fetcher_config();
    log::info!(
        "Scraping {} page(s), waiting up to {}s per page for {}",
        PAGE_COUNT,
        config.timeout.as_secs(),
        config.wait_for
    );

    let scraper = Scraper::new(config);
    let table = scraper.scrape(&cli.url).await.unwrap_or_else(|e| {
        log::error!("Error scraping appointments: {}", e);
        process::exit(1);
    });

    match cli.format {
        OutputFormat::Json => serialize_json(&table),
        OutputFormat::Text => {
            if table.is_empty() {
                println!("No appointments to display.");
            } else {
                print!("{}", table);
            }
        }
    }
}
