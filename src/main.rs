use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use log::info;
use scoresaber_scraping::{
    config::Config,
    page_puller::{pull_pages, ChromeRenderer},
    scoresaber::scrape::scrape_pages,
};
use scoresaber_scraping_utils::fs_util::read_toml_or_default;

#[derive(Parser)]
struct Opts {
    #[arg(short, long, value_enum)]
    mode: Mode,
    /// TOML file overriding the default settings.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    /// Render the leaderboard pages and save them.
    Pull,
    /// Parse the saved pages into the play log.
    Scrape,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let opts = Opts::parse();
    let config: Config = read_toml_or_default(opts.config.as_ref())?;

    match opts.mode {
        Mode::Pull => {
            let mut renderer = ChromeRenderer::launch(&config.browser)?;
            pull_pages(&mut renderer, &config)?;
            info!("Saved {} page(s) under {:?}", config.page_count, config.html_dir);
        }
        Mode::Scrape => {
            let rows = scrape_pages(&config)?;
            info!("Wrote {rows} row(s) to {:?}", config.log_path);
        }
    }
    Ok(())
}
