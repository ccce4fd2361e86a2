use std::io;

use super::derive::Dataset;

pub const DERIVED_HEADER: [&str; 8] = [
    "rank", "star", "acc", "pp_given", "pp_eff", "pp_raw", "mod", "name",
];

/// Writes one line per retained record, in log order.
/// `acc` is the adjusted accuracy; a missing star is written as `-1.00`.
pub fn write_derived_table<W: io::Write>(writer: W, dataset: &Dataset) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(DERIVED_HEADER)?;
    for r in dataset.records() {
        let record = r.record();
        writer.write_record([
            record.rank().to_string(),
            record
                .star()
                .map_or_else(|| "-1.00".to_owned(), |s| format!("{s:.2}")),
            format!("{:.4}", r.accuracy()),
            format!("{:.2}", r.given()),
            format!("{:.2}", r.effective()),
            format!("{:.4}", r.raw()),
            record.modifier().to_string(),
            record.song().name().to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
