use super::{ExtractError, Field, FieldRule, MarkupVersion, Read, RowSchema, Step, StructurePatterns};
use crate::scoresaber::parser::structure_hash::StructureHashes;

pub const PATTERNS: StructurePatterns = StructurePatterns {
    scan_root: "div#svelte",
    root: "window has-shadow noheading bottomSection svelte",
    ranking: "table-item svelte",
    song: "song-image-wrapper svelte",
    score: "scoreInfo svelte",
};

/// Texts shown in place of a star rating for maps that have none.
pub const TIER_CODES: [&str; 5] = ["E", "N", "H", "X", "Ex+"];

const RANK_CONTEXT: usize = 1;
const SONG_CONTEXT: usize = 5;
const SCORE_CONTEXT: usize = 6;

pub fn row_schema(hashes: &StructureHashes) -> Result<RowSchema, ExtractError> {
    let r = &hashes.ranking;
    let s = &hashes.song;
    let c = &hashes.score;

    let rule = |field, context, steps, read| FieldRule {
        field,
        context,
        steps,
        read,
    };
    let song_info = || {
        Ok::<_, ExtractError>(vec![
            Step::first(format!(
                "div.song-info-container.mobile-enhance.svelte-{s}"
            ))?,
            Step::first(format!("div.song-info.svelte-{s}"))?,
        ])
    };
    let score_info = || Step::first(format!("div.scoreInfo.svelte-{c}"));
    let pp_block = || Step::first(format!("div.stat.ranked.svelte-{c}"));

    let rules = vec![
        rule(
            Field::Rank,
            RANK_CONTEXT,
            vec![
                Step::first(format!("div.rank-info.svelte-{r}"))?,
                Step::first(format!("a.svelte-{r}"))?,
            ],
            Read::Text,
        ),
        rule(
            Field::Difficulty,
            SONG_CONTEXT,
            vec![
                Step::first(format!("div.song-image-wrapper.svelte-{s}"))?,
                Step::first("div")?,
            ],
            Read::Attr("title"),
        ),
        rule(
            Field::Star,
            SONG_CONTEXT,
            vec![
                Step::first(format!("div.song-image-wrapper.svelte-{s}"))?,
                Step::first("div")?,
            ],
            Read::Text,
        ),
        rule(
            Field::SongName,
            SONG_CONTEXT,
            [song_info()?, vec![Step::nth("span", 0)?]].concat(),
            Read::Text,
        ),
        rule(
            Field::Artist,
            SONG_CONTEXT,
            [song_info()?, vec![Step::nth("span", 1)?]].concat(),
            Read::Text,
        ),
        rule(
            Field::Mapper,
            SONG_CONTEXT,
            vec![
                Step::first(format!(
                    "div.song-info-container.mobile-enhance.svelte-{s}"
                ))?,
                Step::first("div.mapper-info")?,
                Step::first("span.mapper-name")?,
            ],
            Read::Text,
        ),
        rule(
            Field::ScoreBlock,
            SCORE_CONTEXT,
            vec![score_info()?],
            Read::Element,
        ),
        rule(
            Field::Accuracy,
            SCORE_CONTEXT,
            vec![
                score_info()?,
                Step::first(format!("span.stat.acc.svelte-{c}"))?,
            ],
            Read::Text,
        ),
        rule(
            Field::PpBlock,
            SCORE_CONTEXT,
            vec![score_info()?, pp_block()?],
            Read::Element,
        ),
        rule(
            Field::PpGiven,
            SCORE_CONTEXT,
            vec![
                score_info()?,
                pp_block()?,
                Step::first(format!("span.info.svelte-{c}:not(.small)"))?,
            ],
            Read::Text,
        ),
        rule(
            Field::PpWeighted,
            SCORE_CONTEXT,
            vec![
                score_info()?,
                pp_block()?,
                Step::first(format!("span.small.info.svelte-{c}"))?,
            ],
            Read::Text,
        ),
        rule(
            Field::Weight,
            SCORE_CONTEXT,
            vec![
                score_info()?,
                pp_block()?,
                Step::first(format!("span.small.info.svelte-{c}"))?,
            ],
            Read::Attr("title"),
        ),
        rule(
            Field::Modifier,
            SCORE_CONTEXT,
            vec![
                score_info()?,
                Step::first(format!("span.stat.hide-details.svelte-{c}"))?,
            ],
            Read::Text,
        ),
    ];

    Ok(RowSchema {
        version: MarkupVersion::Latest,
        root_class: hashes.root_class.clone(),
        row: Step::first(format!("div.table-item.svelte-{r}"))?,
        context: Step::first(format!("div.svelte-{r}"))?,
        rules,
    })
}
