//! The accuracy-dependent share of a map's pp that a play is given.

use anyhow::{bail, ensure};
use clap::ValueEnum;
use serde::Deserialize;
use thiserror::Error;

/// `(accuracy in percent, factor)`, in increasing order of both.
pub const CALIBRATION_POINTS: [(f64, f64); 18] = [
    (0.0, 0.000),
    (40.0, 0.080),
    (50.0, 0.150),
    (69.0, 0.250),
    (75.0, 0.425),
    (82.0, 0.560),
    (84.5, 0.630),
    (86.0, 0.720),
    (88.0, 0.766),
    (90.0, 0.815),
    (91.0, 0.850),
    (92.0, 0.885),
    (93.0, 0.920),
    (94.0, 0.974),
    (95.0, 1.036),
    (100.0, 1.100),
    (110.0, 1.150),
    (114.0, 1.200),
];

/// Whether the last calibration point itself belongs to the domain.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionDomain {
    /// `[0, upper]`
    #[default]
    Inclusive,
    /// `[0, upper)`
    HalfOpen,
}

#[derive(Debug, Error)]
pub enum CorrectionError {
    #[error("Accuracy must not be negative, found {accuracy}")]
    Negative { accuracy: f64 },
    #[error("Accuracy {accuracy} is outside the calibrated range (upper bound {upper}, {domain:?})")]
    OutOfDomain {
        accuracy: f64,
        upper: f64,
        domain: CorrectionDomain,
    },
    #[error("Accuracy is NaN")]
    NotANumber,
}

/// Piecewise-linear interpolation between calibration points.
/// Nothing is extrapolated.
#[derive(Clone, Debug)]
pub struct CorrectionTable {
    points: Vec<(f64, f64)>,
}

impl Default for CorrectionTable {
    fn default() -> Self {
        Self {
            points: CALIBRATION_POINTS.to_vec(),
        }
    }
}

impl CorrectionTable {
    pub fn new(points: Vec<(f64, f64)>) -> anyhow::Result<Self> {
        ensure!(points.len() >= 2, "At least two points are required");
        if points[0].0 != 0.0 {
            bail!("The first point must be at accuracy 0, found {}", points[0].0);
        }
        for (p, q) in points.iter().zip(&points[1..]) {
            ensure!(
                p.0 < q.0 && p.1 <= q.1 && q.0.is_finite() && q.1.is_finite(),
                "Points must increase: {p:?} followed by {q:?}"
            );
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn upper(&self) -> f64 {
        self.points[self.points.len() - 1].0
    }

    pub fn factor(&self, accuracy: f64, domain: CorrectionDomain) -> Result<f64, CorrectionError> {
        if accuracy.is_nan() {
            return Err(CorrectionError::NotANumber);
        }
        if accuracy < 0.0 {
            return Err(CorrectionError::Negative { accuracy });
        }
        let upper = self.upper();
        let inside = match domain {
            CorrectionDomain::Inclusive => accuracy <= upper,
            CorrectionDomain::HalfOpen => accuracy < upper,
        };
        if !inside {
            return Err(CorrectionError::OutOfDomain {
                accuracy,
                upper,
                domain,
            });
        }

        // Index of the segment whose left end is the last point not greater than `accuracy`.
        let i = (self.points.partition_point(|p| p.0 <= accuracy) - 1).min(self.points.len() - 2);
        let (x0, y0) = self.points[i];
        let (x1, y1) = self.points[i + 1];
        if accuracy == x1 {
            return Ok(y1);
        }
        Ok((y1 - y0) / (x1 - x0) * (accuracy - x0) + y0)
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use super::{CorrectionDomain, CorrectionError, CorrectionTable, CALIBRATION_POINTS};

    #[test]
    fn exact_at_breakpoints() {
        let table = CorrectionTable::default();
        for (x, y) in CALIBRATION_POINTS {
            assert_eq!(table.factor(x, CorrectionDomain::Inclusive).unwrap(), y, "{x}");
        }
        assert_eq!(table.factor(0.0, CorrectionDomain::HalfOpen).unwrap(), 0.0);
    }

    #[test]
    fn linear_between_40_and_50() {
        let table = CorrectionTable::default();
        let mut rng = rand::thread_rng();
        let mut xs = (0..1000)
            .map(|_| rng.gen_range(40.0..50.0))
            .filter(|&x| x > 40.0)
            .collect::<Vec<f64>>();
        xs.sort_by(f64::total_cmp);
        xs.dedup();
        let ys = xs
            .iter()
            .map(|&x| table.factor(x, CorrectionDomain::Inclusive).unwrap())
            .collect::<Vec<_>>();
        for (&x, &y) in xs.iter().zip(&ys) {
            let expected = 0.080 + (0.150 - 0.080) * (x - 40.0) / 10.0;
            assert!((y - expected).abs() < 1e-12, "{x}: {y} vs {expected}");
        }
        for w in ys.windows(2) {
            assert!(w[0] < w[1], "{w:?}");
        }
    }

    #[test]
    fn upper_bound_follows_domain() {
        let table = CorrectionTable::default();
        assert_eq!(table.factor(114.0, CorrectionDomain::Inclusive).unwrap(), 1.2);
        assert!(matches!(
            table.factor(114.0, CorrectionDomain::HalfOpen),
            Err(CorrectionError::OutOfDomain { .. })
        ));
        assert!((table.factor(113.999, CorrectionDomain::HalfOpen).unwrap() - 1.2).abs() < 1e-4);
        for domain in [CorrectionDomain::Inclusive, CorrectionDomain::HalfOpen] {
            assert!(matches!(
                table.factor(114.001, domain),
                Err(CorrectionError::OutOfDomain { .. })
            ));
            assert!(matches!(
                table.factor(-0.01, domain),
                Err(CorrectionError::Negative { .. })
            ));
            assert!(matches!(
                table.factor(f64::NAN, domain),
                Err(CorrectionError::NotANumber)
            ));
        }
    }

    #[test]
    fn midpoints() {
        let table = CorrectionTable::default();
        let f = |x| table.factor(x, CorrectionDomain::Inclusive).unwrap();
        assert!((f(20.0) - 0.04).abs() < 1e-12);
        assert!((f(97.5) - 1.068).abs() < 1e-12);
        assert!((f(112.0) - 1.175).abs() < 1e-12);
    }

    #[test]
    fn table_must_increase() {
        assert!(CorrectionTable::new(vec![(0.0, 0.0)]).is_err());
        assert!(CorrectionTable::new(vec![(1.0, 0.0), (2.0, 1.0)]).is_err());
        assert!(CorrectionTable::new(vec![(0.0, 0.0), (10.0, 1.0), (10.0, 2.0)]).is_err());
        assert!(CorrectionTable::new(vec![(0.0, 0.5), (10.0, 0.1)]).is_err());
        let table = CorrectionTable::new(vec![(0.0, 0.0), (10.0, 1.0)]).unwrap();
        assert_eq!(table.upper(), 10.0);
        assert!((table.factor(2.5, CorrectionDomain::HalfOpen).unwrap() - 0.25).abs() < 1e-12);
    }
}
