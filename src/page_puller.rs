//! Renders the leaderboard pages in a headless browser and stores the resulting markup.

use std::{
    path::PathBuf,
    sync::Arc,
    thread::sleep,
    time::{Duration, Instant},
};

use anyhow::Context;
use headless_chrome::{Browser, LaunchOptionsBuilder, Tab};
use log::{debug, info};
use scoresaber_scraping_utils::fs_util::create_new_dir;
use serde::Deserialize;
use serde_with::{serde_as, DurationSecondsWithFrac};
use thiserror::Error;
use url::Url;

use crate::{config::Config, scoresaber::page_url};

/// How to decide that the client-side rendering of a page has finished.
#[serde_as]
#[derive(Clone, PartialEq, Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SettlePolicy {
    /// Sleep for a fixed time and take whatever has been rendered by then.
    FixedDelay {
        #[serde_as(as = "DurationSecondsWithFrac<f64>")]
        delay: Duration,
    },
    /// Poll until an element matching `selector` exists.
    WaitForSelector {
        selector: String,
        #[serde_as(as = "DurationSecondsWithFrac<f64>")]
        timeout: Duration,
        #[serde_as(as = "DurationSecondsWithFrac<f64>")]
        poll_interval: Duration,
    },
}

impl Default for SettlePolicy {
    fn default() -> Self {
        Self::WaitForSelector {
            selector: r#"div[class*="table-item svelte-"]"#.to_owned(),
            timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(250),
        }
    }
}

#[derive(Debug, Error)]
pub enum PollError {
    #[error("Condition was not met within {timeout:?}")]
    TimedOut { timeout: Duration },
}

/// Calls `check` every `interval` until it returns `true`.
/// It runs at least once, and once more at the deadline.
pub fn poll_until<F>(timeout: Duration, interval: Duration, mut check: F) -> anyhow::Result<()>
where
    F: FnMut() -> anyhow::Result<bool>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if check()? {
            return Ok(());
        }
        let now = Instant::now();
        if now >= deadline {
            return Err(PollError::TimedOut { timeout }.into());
        }
        sleep(interval.min(deadline - now));
    }
}

/// Something that can turn a URL into fully rendered markup.
pub trait Renderer {
    fn render(&mut self, url: &Url) -> anyhow::Result<String>;
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub chrome_path: Option<PathBuf>,
    pub headless: bool,
    pub sandbox: bool,
    pub settle: SettlePolicy,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: true,
            sandbox: false,
            settle: SettlePolicy::default(),
        }
    }
}

pub struct ChromeRenderer {
    // The tab lives only as long as the browser process.
    _browser: Browser,
    tab: Arc<Tab>,
    settle: SettlePolicy,
}

impl ChromeRenderer {
    pub fn launch(config: &BrowserConfig) -> anyhow::Result<Self> {
        let browser = Browser::new(
            LaunchOptionsBuilder::default()
                .headless(config.headless)
                .sandbox(config.sandbox)
                .path(config.chrome_path.clone())
                .idle_browser_timeout(Duration::from_secs(600))
                .build()?,
        )
        .context("Failed to launch the browser")?;
        let tab = browser.new_tab()?;
        Ok(Self {
            _browser: browser,
            tab,
            settle: config.settle.clone(),
        })
    }
}

impl Renderer for ChromeRenderer {
    fn render(&mut self, url: &Url) -> anyhow::Result<String> {
        self.tab.navigate_to(url.as_str())?;
        self.tab.wait_until_navigated()?;
        match &self.settle {
            SettlePolicy::FixedDelay { delay } => sleep(*delay),
            SettlePolicy::WaitForSelector {
                selector,
                timeout,
                poll_interval,
            } => poll_until(*timeout, *poll_interval, || {
                Ok(self.tab.find_element(selector).is_ok())
            })
            .with_context(|| format!("Waiting for {selector:?} on {url}"))?,
        }
        self.tab.get_content()
    }
}

/// Renders pages `1..=page_count` one after another into a directory that must not exist yet.
pub fn pull_pages<R: Renderer>(renderer: &mut R, config: &Config) -> anyhow::Result<()> {
    create_new_dir(&config.html_dir)?;
    for page in 1..=config.page_count {
        info!("Process {page} / {}", config.page_count);
        let url = page_url(&config.source_url, page);
        debug!("Accessing {url}");
        let content = renderer
            .render(&url)
            .with_context(|| format!("While rendering page {page}"))?;
        let path = config.page_file(page);
        fs_err::write(&path, content)?;
        debug!("Saved {path:?}");
    }
    Ok(())
}
