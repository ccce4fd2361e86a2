//! The cumulative comma-separated play log.
//!
//! Numbers are written with two decimals, absent values as `-1.00`.
//! Fields are quoted only when they contain a delimiter or a quote, so ordinary rows look
//! exactly like `1,Expert+,12.34,92.31,345.67,333.57,96.50,None,Title,Artist,Mapper`.

use std::{
    io::{self, BufWriter},
    path::Path,
};

use anyhow::{bail, ensure, Context};
use csv::StringRecord;
use fs_err::{File, OpenOptions};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use super::schema::{PerformancePoints, PlayRecord, SongMetadata};

pub const HEADER: [&str; 11] = [
    "rank",
    "difficulty",
    "star",
    "acc",
    "pp_raw",
    "pp_eff",
    "weight",
    "mod",
    "name",
    "artist",
    "mapper",
];

/// Marker for "not applicable" in numeric columns.
pub const SENTINEL: f64 = -1.0;

/// A log line, column for column.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct LogRow {
    pub rank: u32,
    pub difficulty: String,
    pub star: f64,
    pub acc: f64,
    pub pp_raw: f64,
    pub pp_eff: f64,
    pub weight: f64,
    #[serde(rename = "mod")]
    pub modifier: String,
    pub name: String,
    pub artist: String,
    pub mapper: String,
}

impl LogRow {
    pub fn is_unranked(&self) -> bool {
        self.acc < 0.
    }
}

impl From<&PlayRecord> for LogRow {
    fn from(record: &PlayRecord) -> Self {
        let performance = record.performance();
        let song = record.song();
        Self {
            rank: record.rank(),
            difficulty: record.difficulty().to_string(),
            star: record.star().unwrap_or(SENTINEL),
            acc: record.accuracy().unwrap_or(SENTINEL),
            pp_raw: performance.map_or(SENTINEL, |p| p.given()),
            pp_eff: performance.map_or(SENTINEL, |p| p.weighted()),
            weight: performance.map_or(SENTINEL, |p| p.weight()),
            modifier: record.modifier().to_string(),
            name: song.name().to_string(),
            artist: song.artist().to_string(),
            mapper: song.mapper().to_string(),
        }
    }
}

impl TryFrom<LogRow> for PlayRecord {
    type Error = anyhow::Error;

    fn try_from(row: LogRow) -> anyhow::Result<Self> {
        let present = |x: f64| (x >= 0.).then_some(x);
        let performance = match (present(row.pp_raw), present(row.pp_eff), present(row.weight)) {
            (Some(given), Some(weighted), Some(weight)) => Some(
                PerformancePoints::builder()
                    .given(given)
                    .weighted(weighted)
                    .weight(weight)
                    .build(),
            ),
            (None, None, None) => None,
            otherwise => bail!(
                "Inconsistent performance columns at rank {}: {otherwise:?}",
                row.rank
            ),
        };
        Ok(PlayRecord::builder()
            .rank(row.rank)
            .difficulty(row.difficulty.into())
            .star(present(row.star))
            .accuracy(present(row.acc))
            .performance(performance)
            .modifier(row.modifier.into())
            .song(
                SongMetadata::builder()
                    .name(row.name.into())
                    .artist(row.artist.into())
                    .mapper(row.mapper.into())
                    .build(),
            )
            .build())
    }
}

fn format_fields(row: &LogRow) -> [String; 11] {
    [
        row.rank.to_string(),
        row.difficulty.clone(),
        format!("{:.2}", row.star),
        format!("{:.2}", row.acc),
        format!("{:.2}", row.pp_raw),
        format!("{:.2}", row.pp_eff),
        format!("{:.2}", row.weight),
        row.modifier.clone(),
        row.name.clone(),
        row.artist.clone(),
        row.mapper.clone(),
    ]
}

pub fn write_records<W: io::Write>(
    writer: W,
    records: &[PlayRecord],
    with_header: bool,
) -> anyhow::Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    if with_header {
        writer.write_record(HEADER)?;
    }
    for record in records {
        writer.write_record(format_fields(&LogRow::from(record)))?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes one page worth of records.
/// The first page truncates the log and writes the header; later pages append.
pub fn write_page(path: &Path, records: &[PlayRecord], first_page: bool) -> anyhow::Result<()> {
    let file = if first_page {
        File::create(path)?
    } else {
        OpenOptions::new().append(true).create(true).open(path)?
    };
    write_records(BufWriter::new(file), records, first_page)
        .with_context(|| format!("While writing to {path:?}"))
}

/// Columns after the title.
const TRAILING_COLUMNS: usize = 2;
const TITLE_COLUMN: usize = HEADER.len() - TRAILING_COLUMNS - 1;

/// Interprets one line by position.
/// Lines written without quoting may carry commas in the title. Surplus fields are joined
/// back into the title; artist and mapper are the last two.
fn log_row(record: StringRecord) -> anyhow::Result<LogRow> {
    let n = record.len();
    ensure!(
        n >= HEADER.len(),
        "Expected {} fields, found {n}",
        HEADER.len()
    );
    let record = if n > HEADER.len() {
        let title = record
            .iter()
            .take(n - TRAILING_COLUMNS)
            .skip(TITLE_COLUMN)
            .join(",");
        record
            .iter()
            .take(TITLE_COLUMN)
            .chain([title.as_str()])
            .chain(record.iter().skip(n - TRAILING_COLUMNS))
            .collect::<StringRecord>()
    } else {
        record
    };
    Ok(record.deserialize(None)?)
}

/// Lazily reads the rows after the header.
/// Rows are only parsed when the iterator reaches them.
pub fn read_rows<R: io::Read>(reader: R) -> impl Iterator<Item = anyhow::Result<LogRow>> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader)
        .into_records()
        .map(|record| record.map_err(anyhow::Error::new).and_then(log_row))
}

pub fn open_rows(path: &Path) -> anyhow::Result<impl Iterator<Item = anyhow::Result<LogRow>>> {
    Ok(read_rows(io::BufReader::new(File::open(path)?)))
}
