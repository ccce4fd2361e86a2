use anyhow::Context;
use log::{info, warn};
use scraper::Html;

use crate::{
    config::Config,
    scoresaber::{parser::leaderboard, play_log, schema::PlayRecord},
};

/// Parses one stored page, numbering its rows from `*next_rank` on.
pub fn records_from_page(html: &str, next_rank: &mut u32) -> anyhow::Result<Vec<PlayRecord>> {
    let entries = leaderboard::parse(&Html::parse_document(html))?;
    Ok(entries
        .into_iter()
        .map(|entry| {
            let record = entry.into_play_record(*next_rank);
            *next_rank += 1;
            record
        })
        .collect())
}

/// Rebuilds the play log from the stored pages `1..=page_count`.
/// Returns the number of rows written.
pub fn scrape_pages(config: &Config) -> anyhow::Result<u32> {
    let mut next_rank = 1;
    for page in 1..=config.page_count {
        info!("Process {page} / {}", config.page_count);
        let path = config.page_file(page);
        let html = fs_err::read_to_string(&path)?;
        let records = records_from_page(&html, &mut next_rank)
            .with_context(|| format!("While scraping {path:?}"))?;
        if records.is_empty() {
            warn!("No rows found in {path:?}");
        }
        play_log::write_page(&config.log_path, &records, page == 1)?;
    }
    Ok(next_rank - 1)
}
