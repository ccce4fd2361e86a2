use anyhow::{bail, Context};
use clap::ValueEnum;
use getset::{CopyGetters, Getters};
use log::{debug, info};
use serde::Deserialize;
use typed_builder::TypedBuilder;

use super::correction::{CorrectionDomain, CorrectionTable};
use crate::scoresaber::{
    play_log::{LogRow, SENTINEL},
    schema::PlayRecord,
};

/// Slower Song plays are scored at this fraction of their displayed accuracy.
pub const SLOWER_SONG_ACCURACY_SCALE: f64 = 0.85;

/// Base of the site's position weighting.
pub const WEIGHT_DECAY: f64 = 0.965;

/// What a row with negative accuracy means while reading the log.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum UnrankedRowPolicy {
    /// The first such row ends the scan; later rows are not even read.
    #[default]
    StopScan,
    /// Such rows are skipped one by one.
    Skip,
}

/// Which pp column is divided by the correction factor.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PpSource {
    /// `pp_raw`, the pp awarded before weighting.
    #[default]
    Given,
    /// `pp_eff`, the weighted pp.
    Effective,
}

/// What a row with accuracy but without pp (an unweighted play) means.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum UnweightedRowPolicy {
    /// The row is retained with the sentinel standing in for its pp.
    #[default]
    Keep,
    Skip,
}

#[derive(Clone, Copy, Debug, Default, TypedBuilder)]
pub struct DerivationOptions {
    #[builder(default)]
    pub unranked_rows: UnrankedRowPolicy,
    #[builder(default)]
    pub unweighted_rows: UnweightedRowPolicy,
    #[builder(default)]
    pub domain: CorrectionDomain,
    #[builder(default)]
    pub pp_source: PpSource,
}

#[derive(Clone, PartialEq, Debug, Getters, CopyGetters)]
pub struct DerivedRecord {
    #[getset(get = "pub")]
    record: PlayRecord,
    /// Accuracy after the modifier adjustment.
    #[getset(get_copy = "pub")]
    accuracy: f64,
    /// `pp_raw` of the log, the sentinel for unweighted plays.
    #[getset(get_copy = "pub")]
    given: f64,
    /// `pp_eff` of the log, the sentinel for unweighted plays.
    #[getset(get_copy = "pub")]
    effective: f64,
    #[getset(get_copy = "pub")]
    factor: f64,
    #[getset(get_copy = "pub")]
    raw: f64,
}

/// `0.965^(position - 1)`, the weight the site gives to the `position`-th best play.
pub fn expected_weight(position: usize) -> f64 {
    WEIGHT_DECAY.powi(position.saturating_sub(1) as i32)
}

/// Retained records in log order.
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    records: Vec<DerivedRecord>,
}

impl Dataset {
    pub fn records(&self) -> &[DerivedRecord] {
        &self.records
    }

    fn weighted(&self) -> impl Iterator<Item = &DerivedRecord> {
        self.records
            .iter()
            .filter(|r| r.record.performance().is_some())
    }

    /// Ascending by star; records without a numeric star are left out.
    /// Ties keep log order.
    pub fn sorted_by_star(&self) -> Vec<(f64, &DerivedRecord)> {
        let mut ret = self
            .records
            .iter()
            .filter_map(|r| Some((r.record.star()?, r)))
            .collect::<Vec<_>>();
        ret.sort_by(|x, y| x.0.total_cmp(&y.0));
        ret
    }

    /// Ascending by adjusted accuracy. Ties keep log order.
    pub fn sorted_by_accuracy(&self) -> Vec<&DerivedRecord> {
        let mut ret = self.records.iter().collect::<Vec<_>>();
        ret.sort_by(|x, y| x.accuracy.total_cmp(&y.accuracy));
        ret
    }

    /// Unweighted plays do not contribute to any of the totals.
    pub fn total_given(&self) -> f64 {
        self.weighted().map(|r| r.given).sum()
    }

    pub fn total_effective(&self) -> f64 {
        self.weighted().map(|r| r.effective).sum()
    }

    /// Sum of raw pp, best first, each weighted by [`expected_weight`].
    pub fn weighted_raw_total(&self) -> f64 {
        let mut raws = self.weighted().map(|r| r.raw).collect::<Vec<_>>();
        raws.sort_by(|x, y| y.total_cmp(x));
        raws.iter()
            .enumerate()
            .map(|(i, raw)| raw * expected_weight(i + 1))
            .sum()
    }
}

/// Reads log rows in order and derives the raw pp of every retained play.
///
/// Rows are pulled from `rows` only as far as needed, so under
/// [`UnrankedRowPolicy::StopScan`] nothing after the first unranked row is read.
pub fn derive<I>(
    rows: I,
    table: &CorrectionTable,
    options: DerivationOptions,
) -> anyhow::Result<Dataset>
where
    I: IntoIterator<Item = anyhow::Result<LogRow>>,
{
    let mut records = vec![];
    let mut skipped = 0;
    for (i, row) in rows.into_iter().enumerate() {
        let row = row.with_context(|| format!("While reading data row #{}", i + 1))?;
        if row.is_unranked() {
            match options.unranked_rows {
                UnrankedRowPolicy::StopScan => {
                    info!("Rank {} has no accuracy; the rest of the log is ignored", row.rank);
                    break;
                }
                UnrankedRowPolicy::Skip => {
                    debug!("Skipping rank {} without accuracy", row.rank);
                    continue;
                }
            }
        }
        let rank = row.rank;
        let record = PlayRecord::try_from(row)?;
        if let Some(derived) = derive_record(record, table, options)
            .with_context(|| format!("While deriving raw pp of rank {rank}"))?
        {
            records.push(derived);
        } else {
            skipped += 1;
        }
    }
    info!("{} record(s) retained", records.len());
    if skipped > 0 {
        info!("{skipped} record(s) skipped");
    }
    Ok(Dataset { records })
}

fn derive_record(
    record: PlayRecord,
    table: &CorrectionTable,
    options: DerivationOptions,
) -> anyhow::Result<Option<DerivedRecord>> {
    if record.modifier().is_no_fail() {
        debug!("Skipping NF play at rank {}", record.rank());
        return Ok(None);
    }
    let performance = record.performance();
    if performance.is_none() {
        match options.unweighted_rows {
            UnweightedRowPolicy::Keep => debug!("Rank {} has accuracy but no pp", record.rank()),
            UnweightedRowPolicy::Skip => {
                debug!("Skipping unweighted play at rank {}", record.rank());
                return Ok(None);
            }
        }
    }
    let given = performance.map_or(SENTINEL, |p| p.given());
    let effective = performance.map_or(SENTINEL, |p| p.weighted());
    let Some(mut accuracy) = record.accuracy() else {
        return Ok(None);
    };
    if record.modifier().is_slower_song() {
        accuracy *= SLOWER_SONG_ACCURACY_SCALE;
    }
    let factor = table.factor(accuracy, options.domain)?;
    if factor == 0.0 {
        bail!("Correction factor is zero at accuracy {accuracy}");
    }
    let numerator = match options.pp_source {
        PpSource::Given => given,
        PpSource::Effective => effective,
    };
    Ok(Some(DerivedRecord {
        record,
        accuracy,
        given,
        effective,
        factor,
        raw: numerator / factor,
    }))
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use itertools::Itertools;

    use super::{
        derive, expected_weight, DerivationOptions, PpSource, UnrankedRowPolicy,
        UnweightedRowPolicy,
    };
    use crate::{
        analysis::correction::{CorrectionDomain, CorrectionError, CorrectionTable},
        scoresaber::play_log::{read_rows, LogRow},
    };

    fn row(rank: u32, star: f64, acc: f64, modifier: &str, pp: f64) -> LogRow {
        let pp_or = |x: f64| if acc < 0. { -1. } else { x };
        LogRow {
            rank,
            difficulty: "Expert".to_owned(),
            star,
            acc,
            pp_raw: pp_or(pp),
            pp_eff: pp_or(pp),
            weight: pp_or(100.),
            modifier: modifier.to_owned(),
            name: format!("Song {rank}"),
            artist: "Artist".to_owned(),
            mapper: "Mapper".to_owned(),
        }
    }

    fn effective() -> DerivationOptions {
        DerivationOptions::builder()
            .pp_source(PpSource::Effective)
            .build()
    }

    #[test]
    fn negative_accuracy_ends_the_scan() {
        let rows = vec![
            Ok(row(1, 8.0, 90.0, "None", 100.0)),
            Ok(row(2, 7.0, 95.0, "SS", 50.0)),
            Ok(row(3, 6.0, -1.0, "None", 0.0)),
            Err(anyhow!("this row must not be read")),
            Ok(row(5, 5.0, 80.0, "None", 70.0)),
        ];
        let table = CorrectionTable::default();
        let dataset = derive(rows, &table, effective()).unwrap();
        assert_eq!(
            dataset.records().iter().map(|r| r.record().rank()).collect_vec(),
            [1, 2]
        );
    }

    #[test]
    fn skip_policy_keeps_reading() {
        let rows = vec![
            row(1, 8.0, 90.0, "None", 100.0),
            row(2, 6.0, -1.0, "None", 0.0),
            row(3, 5.0, 80.0, "None", 70.0),
        ];
        let options = DerivationOptions::builder()
            .unranked_rows(UnrankedRowPolicy::Skip)
            .build();
        let dataset = derive(rows.into_iter().map(Ok), &CorrectionTable::default(), options)
            .unwrap();
        assert_eq!(
            dataset.records().iter().map(|r| r.record().rank()).collect_vec(),
            [1, 3]
        );
    }

    #[test]
    fn terminator_in_csv_hides_malformed_tail() {
        let log = "rank,difficulty,star,acc,pp_raw,pp_eff,weight,mod,name,artist,mapper\n\
                   1,Expert,8.00,90.00,81.50,81.50,100.00,None,A,B,C\n\
                   2,Hard,-1.00,-1.00,-1.00,-1.00,-1.00,None,D,E,F\n\
                   this,is,not,a,row\n";
        let dataset = derive(
            read_rows(log.as_bytes()),
            &CorrectionTable::default(),
            DerivationOptions::default(),
        )
        .unwrap();
        assert_eq!(dataset.records().len(), 1);

        let options = DerivationOptions::builder()
            .unranked_rows(UnrankedRowPolicy::Skip)
            .build();
        assert!(derive(read_rows(log.as_bytes()), &CorrectionTable::default(), options).is_err());
    }

    #[test]
    fn no_fail_is_excluded() {
        for acc in [50.0, 90.0, 99.0] {
            let rows = vec![Ok(row(1, 8.0, acc, "NF", 100.0))];
            let dataset = derive(rows, &CorrectionTable::default(), effective()).unwrap();
            assert!(dataset.records().is_empty());
        }
    }

    #[test]
    fn slower_song_scales_accuracy() {
        let rows = vec![Ok(row(1, 8.0, 100.0, "SS", 100.0))];
        let dataset = derive(rows, &CorrectionTable::default(), effective()).unwrap();
        let record = &dataset.records()[0];
        assert!((record.accuracy() - 85.0).abs() < 1e-12);
        assert_eq!(record.record().accuracy(), Some(100.0));
        assert!((record.factor() - 0.66).abs() < 1e-12);
    }

    #[test]
    fn raw_is_pp_over_factor() {
        let base = row(1, 8.0, 90.0, "None", 81.5);
        for pp_source in [PpSource::Given, PpSource::Effective] {
            let options = DerivationOptions::builder().pp_source(pp_source).build();
            let dataset =
                derive(vec![Ok(base.clone())], &CorrectionTable::default(), options).unwrap();
            assert!((dataset.records()[0].raw() - 100.0).abs() < 1e-9);
        }
    }

    #[test]
    fn pp_source_selects_column() {
        let mut given_differs = row(1, 8.0, 90.0, "None", 81.5);
        given_differs.pp_raw = 163.0;
        let table = CorrectionTable::default();
        let given = derive(
            vec![Ok(given_differs.clone())],
            &table,
            DerivationOptions::default(),
        )
        .unwrap();
        let effective = derive(vec![Ok(given_differs)], &table, effective()).unwrap();
        assert!((given.records()[0].raw() - 200.0).abs() < 1e-9);
        assert!((effective.records()[0].raw() - 100.0).abs() < 1e-9);
    }

    fn unweighted(rank: u32, acc: f64) -> LogRow {
        let mut row = row(rank, 8.0, acc, "None", 0.0);
        row.pp_raw = -1.;
        row.pp_eff = -1.;
        row.weight = -1.;
        row
    }

    #[test]
    fn rows_without_pp_are_kept_by_default() {
        let rows = vec![
            row(1, 8.0, 90.0, "None", 81.5),
            unweighted(2, 92.0),
            row(3, 8.0, 93.0, "None", 50.0),
        ];
        let dataset = derive(
            rows.into_iter().map(Ok),
            &CorrectionTable::default(),
            DerivationOptions::default(),
        )
        .unwrap();
        assert_eq!(
            dataset.records().iter().map(|r| r.record().rank()).collect_vec(),
            [1, 2, 3]
        );
        let kept = &dataset.records()[1];
        assert_eq!(kept.given(), -1.0);
        assert_eq!(kept.effective(), -1.0);
        assert!((kept.factor() - 0.885).abs() < 1e-12);
        assert!((kept.raw() - -1.0 / 0.885).abs() < 1e-12);

        // The sentinel never reaches the totals.
        assert!((dataset.total_given() - 131.5).abs() < 1e-9);
        assert!((dataset.total_effective() - 131.5).abs() < 1e-9);
        assert!((dataset.weighted_raw_total() - (100.0 + 50.0 / 0.92 * 0.965)).abs() < 1e-9);
    }

    #[test]
    fn rows_without_pp_can_be_skipped() {
        let rows = vec![Ok(unweighted(1, 90.0)), Ok(row(2, 8.0, 90.0, "None", 10.0))];
        let options = DerivationOptions::builder()
            .unweighted_rows(UnweightedRowPolicy::Skip)
            .build();
        let dataset = derive(rows, &CorrectionTable::default(), options).unwrap();
        assert_eq!(dataset.records().len(), 1);
        assert_eq!(dataset.records()[0].record().rank(), 2);
    }

    #[test]
    fn domain_errors_abort() {
        let table = CorrectionTable::default();
        let rows = || vec![Ok(row(1, 8.0, 114.0, "None", 10.0))];
        assert!(derive(rows(), &table, DerivationOptions::default()).is_ok());
        let half_open = DerivationOptions::builder()
            .domain(CorrectionDomain::HalfOpen)
            .build();
        let err = derive(rows(), &table, half_open).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CorrectionError>(),
            Some(CorrectionError::OutOfDomain { .. })
        ));

        let zero = vec![Ok(row(1, 8.0, 0.0, "None", 10.0))];
        let err = derive(zero, &table, DerivationOptions::default()).unwrap_err();
        assert!(format!("{err:#}").contains("zero"), "{err:#}");
    }

    #[test]
    fn sorting_keeps_series_paired() {
        let rows = vec![
            row(3, 9.0, 95.0, "None", 300.0),
            row(1, 7.0, 91.0, "None", 100.0),
            row(2, 8.0, 93.0, "None", 200.0),
        ];
        let table = CorrectionTable::default();
        let dataset = derive(rows.into_iter().map(Ok), &table, effective()).unwrap();
        let raw_of_rank = |rank| {
            dataset
                .records()
                .iter()
                .find(|r| r.record().rank() == rank)
                .unwrap()
                .raw()
        };

        let by_star = dataset.sorted_by_star();
        assert_eq!(by_star.iter().map(|x| x.0).collect_vec(), [7.0, 8.0, 9.0]);
        assert_eq!(
            by_star.iter().map(|x| x.1.raw()).collect_vec(),
            [1, 2, 3].map(raw_of_rank)
        );
        let by_acc = dataset.sorted_by_accuracy();
        assert_eq!(
            by_acc.iter().map(|r| r.record().rank()).collect_vec(),
            [1, 2, 3]
        );
        for r in by_acc {
            assert_eq!(r.raw(), raw_of_rank(r.record().rank()));
        }
    }

    #[test]
    fn starless_rows_are_left_out_of_star_order() {
        let rows = vec![
            row(1, -1.0, 95.0, "None", 300.0),
            row(2, 8.0, 93.0, "None", 200.0),
        ];
        let dataset = derive(rows.into_iter().map(Ok), &CorrectionTable::default(), effective())
            .unwrap();
        assert_eq!(dataset.records().len(), 2);
        assert_eq!(dataset.sorted_by_star().len(), 1);
    }

    #[test]
    fn weights_and_totals() {
        assert_eq!(expected_weight(1), 1.0);
        assert!((expected_weight(2) - 0.965).abs() < 1e-12);
        assert!((expected_weight(11) - 0.965f64.powi(10)).abs() < 1e-12);

        let rows = vec![
            row(1, 8.0, 90.0, "None", 81.5),
            row(2, 8.0, 90.0, "None", 163.0),
        ];
        let dataset = derive(rows.into_iter().map(Ok), &CorrectionTable::default(), effective())
            .unwrap();
        assert!((dataset.total_effective() - 244.5).abs() < 1e-9);
        assert!((dataset.weighted_raw_total() - (200.0 + 100.0 * 0.965)).abs() < 1e-9);
    }
}
