use anyhow::Context;
use getset::{CopyGetters, Getters};
use log::debug;
use scoresaber_scraping_utils::{regex, selector};
use scraper::{ElementRef, Html};

use crate::scoresaber::{
    markup::{latest, ExtractError, Field, MarkupVersion, RowSchema, RowView},
    parser::structure_hash,
    schema::{Modifier, PerformancePoints, PlayRecord, SongMetadata},
};

/// One row of the top-scores table, as displayed.
#[derive(Clone, PartialEq, Debug, CopyGetters, Getters)]
pub struct LeaderboardEntry {
    /// Rank shown on the site (`#1,234`).
    #[getset(get_copy = "pub")]
    site_rank: u32,
    #[getset(get = "pub")]
    difficulty: String,
    #[getset(get_copy = "pub")]
    star: Option<f64>,
    #[getset(get_copy = "pub")]
    accuracy: Option<f64>,
    #[getset(get_copy = "pub")]
    performance: Option<PerformancePoints>,
    #[getset(get = "pub")]
    modifier: Modifier,
    #[getset(get = "pub")]
    song: SongMetadata,
}

impl LeaderboardEntry {
    pub fn into_play_record(self, rank: u32) -> PlayRecord {
        PlayRecord::builder()
            .rank(rank)
            .difficulty(self.difficulty.into())
            .star(self.star)
            .accuracy(self.accuracy)
            .performance(self.performance)
            .modifier(self.modifier)
            .song(self.song)
            .build()
    }
}

pub fn parse(html: &Html) -> anyhow::Result<Vec<LeaderboardEntry>> {
    parse_with_version(html, MarkupVersion::Latest)
}

pub fn parse_with_version(
    html: &Html,
    version: MarkupVersion,
) -> anyhow::Result<Vec<LeaderboardEntry>> {
    let hashes = structure_hash::discover(html, &version.patterns())?;
    let schema = match version {
        MarkupVersion::Latest => latest::row_schema(&hashes)?,
    };
    let root = html
        .select(selector!("div"))
        .find(|div| div.attr("class") == Some(schema.root_class.as_str()))
        .with_context(|| format!("Root container {:?} not found", schema.root_class))?;
    let rows = schema
        .row
        .find_all(root)
        .enumerate()
        .map(|(i, row)| parse_row(&schema, row).with_context(|| format!("While parsing row #{i}")))
        .collect::<anyhow::Result<Vec<_>>>()?;
    debug!("{} row(s) found", rows.len());
    Ok(rows)
}

pub fn parse_row(schema: &RowSchema, row: ElementRef) -> Result<LeaderboardEntry, ExtractError> {
    let view = schema.view(row);

    let site_rank = parse_rank(&view.require_value(Field::Rank)?)?;
    let difficulty = view.require_value(Field::Difficulty)?;
    let star = parse_star(&view.require_value(Field::Star)?)?;
    let song = SongMetadata::builder()
        .name(view.require_value(Field::SongName)?.into())
        .artist(view.require_value(Field::Artist)?.into())
        .mapper(view.require_value(Field::Mapper)?.into())
        .build();

    view.require_element(Field::ScoreBlock)?;
    let (accuracy, performance, modifier) = match view.value(Field::Accuracy)? {
        None => (None, None, Modifier::none()),
        Some(accuracy) => {
            let accuracy = parse_accuracy(&accuracy)?;
            let performance = view
                .element(Field::PpBlock)?
                .map(|_| parse_performance(&view))
                .transpose()?;
            let modifier = view
                .value(Field::Modifier)?
                .map_or_else(Modifier::none, Modifier::from);
            (Some(accuracy), performance, modifier)
        }
    };

    Ok(LeaderboardEntry {
        site_rank,
        difficulty,
        star,
        accuracy,
        performance,
        modifier,
        song,
    })
}

fn parse_performance(view: &RowView) -> Result<PerformancePoints, ExtractError> {
    Ok(PerformancePoints::builder()
        .given(parse_given_pp(&view.require_value(Field::PpGiven)?)?)
        .weighted(parse_weighted_pp(&view.require_value(Field::PpWeighted)?)?)
        .weight(parse_weight(&view.require_value(Field::Weight)?)?)
        .build())
}

/// `#1,234` -> 1234
pub fn parse_rank(text: &str) -> Result<u32, ExtractError> {
    let digits = text
        .strip_prefix('#')
        .ok_or_else(|| ExtractError::malformed(Field::Rank, text, "missing '#'"))?
        .replace(',', "");
    digits
        .parse()
        .map_err(|e| ExtractError::malformed(Field::Rank, text, e))
}

/// `12.34★` -> `Some(12.34)`; a tier code -> `None`
pub fn parse_star(text: &str) -> Result<Option<f64>, ExtractError> {
    if latest::TIER_CODES.contains(&text) {
        return Ok(None);
    }
    let mut chars = text.chars();
    chars.next_back();
    chars
        .as_str()
        .parse()
        .map(Some)
        .map_err(|e| ExtractError::malformed(Field::Star, text, e))
}

/// `92.31%` -> 92.31
pub fn parse_accuracy(text: &str) -> Result<f64, ExtractError> {
    parse_with_affixes(Field::Accuracy, text, "", "%")
}

/// `345.67pp` -> 345.67
pub fn parse_given_pp(text: &str) -> Result<f64, ExtractError> {
    parse_with_affixes(Field::PpGiven, text, "", "pp")
}

/// `[333.57pp]` -> 333.57
pub fn parse_weighted_pp(text: &str) -> Result<f64, ExtractError> {
    parse_with_affixes(Field::PpWeighted, text, "[", "pp]")
}

/// `Weighted 96.50%` -> 96.5
pub fn parse_weight(text: &str) -> Result<f64, ExtractError> {
    let captures = regex!(r"^\S+\s+(\S+)%$")
        .captures(text.trim())
        .ok_or_else(|| ExtractError::malformed(Field::Weight, text, "expected `Weighted NN.NN%`"))?;
    captures[1]
        .parse()
        .map_err(|e| ExtractError::malformed(Field::Weight, text, e))
}

fn parse_with_affixes(
    field: Field,
    text: &str,
    prefix: &str,
    suffix: &str,
) -> Result<f64, ExtractError> {
    text.strip_prefix(prefix)
        .and_then(|x| x.strip_suffix(suffix))
        .ok_or_else(|| {
            ExtractError::malformed(field, text, format!("expected {prefix:?}...{suffix:?}"))
        })?
        .parse()
        .map_err(|e| ExtractError::malformed(field, text, e))
}
