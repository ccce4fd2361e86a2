use std::{io::BufWriter, ops::Range, path::Path};

use anyhow::ensure;
use fs_err::File;
use itertools::Itertools;
use svg::{
    node::{
        element::{Circle, Element, Line, Polyline, Rectangle},
        Text as TextNode,
    },
    Document, Node,
};

use super::{
    correction::{CorrectionDomain, CorrectionTable},
    derive::{Dataset, DerivedRecord},
};

const INK: &str = "#292929";
const RAW: &str = "royalblue";
const EFFECTIVE: &str = "#33cc99";

fn map_float(a: f64, src: Range<f64>, dst: Range<f64>) -> f64 {
    dst.start + (dst.end - dst.start) * (a - src.start) / (src.end - src.start)
}

/// `[min, max]` of `values` widened by 5% on both sides.
fn padded_extent(values: impl IntoIterator<Item = f64>) -> Range<f64> {
    let (lo, hi) = values
        .into_iter()
        .filter(|x| x.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| {
            (lo.min(x), hi.max(x))
        });
    if lo > hi {
        return 0.0..1.0;
    }
    let pad = if hi > lo { (hi - lo) * 0.05 } else { 1.0 };
    lo - pad..hi + pad
}

fn text(content: impl Into<String>, x: f64, y: f64, anchor: &str) -> Element {
    let mut element = Element::new("text");
    element.append(TextNode::new(content));
    element.assign("x", x);
    element.assign("y", y);
    element.assign("text-anchor", anchor);
    element.assign("font-size", 14);
    element
}

/// A rectangular plotting area mapping data coordinates into the document.
struct Panel {
    x: Range<f64>,
    y: Range<f64>,
    left: f64,
    top: f64,
    width: f64,
    height: f64,
}

impl Panel {
    fn point(&self, (x, y): (f64, f64)) -> (f64, f64) {
        (
            map_float(x, self.x.clone(), self.left..self.left + self.width),
            map_float(y, self.y.clone(), self.top + self.height..self.top),
        )
    }

    fn frame(&self, document: Document, x_label: &str, y_label: &str) -> Document {
        let bottom = self.top + self.height;
        let right = self.left + self.width;
        let fmt = |v: f64| format!("{v:.1}");
        document
            .add(
                Rectangle::new()
                    .set("x", self.left)
                    .set("y", self.top)
                    .set("width", self.width)
                    .set("height", self.height)
                    .set("stroke", INK)
                    .set("fill", "none"),
            )
            .add(text(fmt(self.x.start), self.left, bottom + 16.0, "start"))
            .add(text(fmt(self.x.end), right, bottom + 16.0, "end"))
            .add(text(fmt(self.y.start), self.left - 4.0, bottom, "end"))
            .add(text(fmt(self.y.end), self.left - 4.0, self.top + 12.0, "end"))
            .add(text(x_label, self.left + self.width / 2.0, bottom + 32.0, "middle"))
            .add(text(y_label, self.left - 4.0, self.top + self.height / 2.0, "end"))
    }

    fn series(&self, points: impl IntoIterator<Item = (f64, f64)>, color: &str) -> Polyline {
        let points = points
            .into_iter()
            .map(|point| {
                let (x, y) = self.point(point);
                format!("{x:.2},{y:.2}")
            })
            .join(" ");
        Polyline::new()
            .set("points", points)
            .set("fill", "none")
            .set("stroke", color)
            .set("stroke-width", 2.0)
    }

    fn legend(&self, document: Document, entries: &[(&str, &str)]) -> Document {
        let right = self.left + self.width;
        entries
            .iter()
            .enumerate()
            .fold(document, |document, (i, &(label, color))| {
                let y = self.top + 16.0 * (i + 1) as f64;
                document
                    .add(
                        Line::new()
                            .set("x1", right - 110.0)
                            .set("x2", right - 90.0)
                            .set("y1", y - 4.0)
                            .set("y2", y - 4.0)
                            .set("stroke", color)
                            .set("stroke-width", 2.0),
                    )
                    .add(text(label, right - 84.0, y, "start"))
            })
    }
}

/// The correction curve sampled at `i / divisions` over its domain, with the
/// calibration points as markers.
pub fn correction_curve_chart(table: &CorrectionTable, divisions: u32) -> anyhow::Result<Document> {
    ensure!(divisions > 0, "divisions must be positive");
    let (w, h) = (700.0, 495.0);
    let upper = table.upper();
    let panel = Panel {
        x: -10.0..upper + 11.0,
        y: -0.1..table.points().iter().map(|p| p.1).fold(0.0, f64::max) + 0.1,
        left: 80.0,
        top: 20.0,
        width: w - 100.0,
        height: h - 80.0,
    };

    let samples = (upper * f64::from(divisions)).ceil() as u32;
    let curve = (0..samples)
        .map(|i| {
            let x = f64::from(i) / f64::from(divisions);
            Ok((x, table.factor(x, CorrectionDomain::HalfOpen)?))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let mut document = Document::new().set("viewBox", (0, 0, w, h));
    document = panel.frame(document, "Score [%]", "PP given ratio");
    document = document.add(panel.series(curve, INK));
    for &point in table.points() {
        let (cx, cy) = panel.point(point);
        document = document.add(
            Circle::new()
                .set("cx", cx)
                .set("cy", cy)
                .set("r", 4.0)
                .set("fill", INK),
        );
    }
    Ok(document)
}

/// Three stacked panels: rank against raw, given and effective pp; star against raw pp;
/// accuracy against raw pp.
pub fn pp_chart(dataset: &Dataset) -> Document {
    let (w, panel_height, gap) = (1000.0, 180.0, 70.0);
    let h = 3.0 * (panel_height + gap) + 20.0;
    let records = dataset.records();
    let panel = |index: usize, x: Range<f64>, y: Range<f64>| Panel {
        x,
        y,
        left: 80.0,
        top: 20.0 + index as f64 * (panel_height + gap),
        width: w - 100.0,
        height: panel_height,
    };

    let mut document = Document::new().set("viewBox", (0, 0, w, h));

    let rank = |r: &DerivedRecord| f64::from(r.record().rank());
    let by_rank = panel(
        0,
        padded_extent(records.iter().map(rank)),
        padded_extent(records.iter().flat_map(|r| {
            [r.raw(), r.given(), r.effective()]
        })),
    );
    document = by_rank.frame(document, "Rank", "PP");
    document = document
        .add(by_rank.series(records.iter().map(|r| (rank(r), r.raw())), RAW))
        .add(by_rank.series(
            records.iter().map(|r| (rank(r), r.given())),
            INK,
        ))
        .add(by_rank.series(
            records.iter().map(|r| (rank(r), r.effective())),
            EFFECTIVE,
        ));
    document = by_rank.legend(
        document,
        &[("Raw", RAW), ("Given", INK), ("Effective", EFFECTIVE)],
    );

    let by_star = dataset.sorted_by_star();
    let star_panel = panel(
        1,
        padded_extent(by_star.iter().map(|x| x.0)),
        padded_extent(by_star.iter().map(|x| x.1.raw())),
    );
    document = star_panel.frame(document, "Star", "Raw PP");
    document = document.add(star_panel.series(by_star.iter().map(|x| (x.0, x.1.raw())), INK));

    let by_accuracy = dataset.sorted_by_accuracy();
    let accuracy_panel = panel(
        2,
        padded_extent(by_accuracy.iter().map(|r| r.accuracy())),
        padded_extent(by_accuracy.iter().map(|r| r.raw())),
    );
    document = accuracy_panel.frame(document, "Accuracy", "Raw PP");
    document.add(accuracy_panel.series(by_accuracy.iter().map(|r| (r.accuracy(), r.raw())), INK))
}

pub fn write_svg(path: &Path, document: &Document) -> anyhow::Result<()> {
    svg::write(BufWriter::new(File::create(path)?), document)?;
    Ok(())
}
