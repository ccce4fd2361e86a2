use std::path::PathBuf;

use once_cell::sync::Lazy;
use serde::Deserialize;
use url::Url;

use crate::{
    analysis::{
        correction::CorrectionDomain,
        derive::{DerivationOptions, PpSource, UnrankedRowPolicy, UnweightedRowPolicy},
    },
    page_puller::BrowserConfig,
};

pub static DEFAULT_SOURCE_URL: Lazy<Url> =
    Lazy::new(|| Url::parse("https://scoresaber.com/u/76561198993766763").unwrap());

/// Settings shared by every tool, read from a TOML file.
/// Every key is optional.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source_url: Url,
    pub page_count: u32,
    pub html_dir: PathBuf,
    pub html_prefix: String,
    pub log_path: PathBuf,
    pub browser: BrowserConfig,
    pub analysis: AnalysisConfig,
}

impl Config {
    /// `{html_dir}/{html_prefix}{page}.html`
    pub fn page_file(&self, page: u32) -> PathBuf {
        self.html_dir
            .join(format!("{}{}.html", self.html_prefix, page))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_url: DEFAULT_SOURCE_URL.clone(),
            page_count: 60,
            html_dir: "htmls".into(),
            html_prefix: "cetusk.page".to_owned(),
            log_path: "info.log".into(),
            browser: BrowserConfig::default(),
            analysis: AnalysisConfig::default(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub unranked_rows: UnrankedRowPolicy,
    pub unweighted_rows: UnweightedRowPolicy,
    pub correction_domain: CorrectionDomain,
    pub pp_source: PpSource,
    pub chart_path: PathBuf,
    pub curve_chart_path: PathBuf,
    pub curve_divisions: u32,
}

impl AnalysisConfig {
    pub fn derivation_options(&self) -> DerivationOptions {
        DerivationOptions::builder()
            .unranked_rows(self.unranked_rows)
            .unweighted_rows(self.unweighted_rows)
            .domain(self.correction_domain)
            .pp_source(self.pp_source)
            .build()
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            unranked_rows: UnrankedRowPolicy::default(),
            unweighted_rows: UnweightedRowPolicy::default(),
            correction_domain: CorrectionDomain::default(),
            pp_source: PpSource::default(),
            chart_path: "pp.svg".into(),
            curve_chart_path: "ppCorrection.svg".into(),
            curve_divisions: 100,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{
        path::{Path, PathBuf},
        time::Duration,
    };

    use super::{Config, DEFAULT_SOURCE_URL};
    use crate::{
        analysis::{
            correction::CorrectionDomain,
            derive::{PpSource, UnrankedRowPolicy, UnweightedRowPolicy},
        },
        page_puller::SettlePolicy,
    };

    /// A fresh empty directory under the system temp dir.
    pub(crate) fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "scoresaber-scraping-{name}-{}-{}",
            std::process::id(),
            rand::random::<u64>()
        ));
        assert!(!dir.exists());
        fs_err::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(
            config.source_url.as_str(),
            "https://scoresaber.com/u/76561198993766763"
        );
        assert_eq!(config.source_url, *DEFAULT_SOURCE_URL);
        assert_eq!(config.page_count, 60);
        assert_eq!(config.page_file(7), Path::new("htmls/cetusk.page7.html"));
        assert_eq!(config.log_path, Path::new("info.log"));
        assert!(config.browser.headless);
        assert!(matches!(
            config.browser.settle,
            SettlePolicy::WaitForSelector { .. }
        ));
        assert_eq!(config.analysis.unranked_rows, UnrankedRowPolicy::StopScan);
        assert_eq!(config.analysis.unweighted_rows, UnweightedRowPolicy::Keep);
        assert_eq!(config.analysis.correction_domain, CorrectionDomain::Inclusive);
        assert_eq!(config.analysis.pp_source, PpSource::Given);
        assert_eq!(config.analysis.curve_divisions, 100);
    }

    #[test]
    fn overrides() {
        let config: Config = toml::from_str(
            r#"
            source_url = "https://scoresaber.com/u/1"
            page_count = 2
            html_dir = "pages"
            html_prefix = "me."

            [browser]
            headless = false
            settle = { kind = "fixed_delay", delay = 10 }

            [analysis]
            unranked_rows = "skip"
            unweighted_rows = "skip"
            correction_domain = "half_open"
            pp_source = "effective"
            "#,
        )
        .unwrap();
        assert_eq!(config.page_count, 2);
        assert_eq!(config.page_file(2), Path::new("pages/me.2.html"));
        assert!(!config.browser.headless);
        assert_eq!(
            config.browser.settle,
            SettlePolicy::FixedDelay {
                delay: Duration::from_secs(10)
            }
        );
        assert_eq!(config.analysis.unranked_rows, UnrankedRowPolicy::Skip);
        assert_eq!(config.analysis.unweighted_rows, UnweightedRowPolicy::Skip);
        assert_eq!(config.analysis.correction_domain, CorrectionDomain::HalfOpen);
        assert_eq!(config.analysis.pp_source, PpSource::Effective);
        assert_eq!(config.analysis.chart_path, Path::new("pp.svg"));
    }

    #[test]
    fn unknown_policy_is_rejected() {
        assert!(toml::from_str::<Config>("[analysis]\nunranked_rows = \"ignore\"").is_err());
    }
}
