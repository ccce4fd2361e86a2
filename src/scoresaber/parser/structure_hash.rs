use derive_more::{AsRef, Display, From};
use log::debug;
use scoresaber_scraping_utils::selector;
use scraper::{ElementRef, Html, Selector};

use crate::scoresaber::markup::{ExtractError, StructurePatterns};

/// Build-specific suffix the site's component framework appends to class names,
/// e.g. `abc123` in `table-item svelte-abc123`.
#[derive(Clone, PartialEq, Eq, Debug, From, AsRef, Display)]
#[as_ref(forward)]
pub struct SvelteHash(String);

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct StructureHashes {
    /// The whole `class` attribute of the container of the top-scores table.
    pub root_class: String,
    pub ranking: SvelteHash,
    pub song: SvelteHash,
    pub score: SvelteHash,
}

/// Scans the `class` attribute of every `div` below the scan root and picks out the
/// four structural classes. When a pattern occurs more than once, the last occurrence wins.
pub fn discover(html: &Html, patterns: &StructurePatterns) -> Result<StructureHashes, ExtractError> {
    let scan_root_selector =
        Selector::parse(patterns.scan_root).map_err(|e| ExtractError::InvalidSelector {
            css: patterns.scan_root.to_owned(),
            reason: e.to_string(),
        })?;
    let scan_root = html
        .select(&scan_root_selector)
        .next()
        .ok_or(ExtractError::StructureNotFound {
            pattern: patterns.scan_root,
        })?;
    discover_below(scan_root, patterns)
}

pub fn discover_below(
    scan_root: ElementRef,
    patterns: &StructurePatterns,
) -> Result<StructureHashes, ExtractError> {
    let mut root_class = None;
    let mut ranking = None;
    let mut song = None;
    let mut score = None;
    for class in scan_root
        .select(selector!("div"))
        .filter_map(|div| div.attr("class"))
    {
        if class.contains(patterns.root) {
            root_class = Some(class.to_owned());
        }
        if class.contains(patterns.ranking) {
            ranking = Some(trailing_hash(class));
        }
        if class.contains(patterns.song) {
            song = Some(trailing_hash(class));
        }
        if class.contains(patterns.score) {
            score = Some(trailing_hash(class));
        }
    }
    let hashes = StructureHashes {
        root_class: found(root_class, patterns.root)?,
        ranking: found(ranking, patterns.ranking)?,
        song: found(song, patterns.song)?,
        score: found(score, patterns.score)?,
    };
    debug!("{hashes:?}");
    Ok(hashes)
}

fn found<T>(value: Option<T>, pattern: &'static str) -> Result<T, ExtractError> {
    value.ok_or(ExtractError::StructureNotFound { pattern })
}

/// The segment after the last `-`.
fn trailing_hash(class: &str) -> SvelteHash {
    class
        .rsplit('-')
        .next()
        .unwrap_or(class)
        .to_owned()
        .into()
}
