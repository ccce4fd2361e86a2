use std::path::PathBuf;

use clap::Parser;
use log::info;
use scoresaber_scraping::{
    analysis::{
        chart::{correction_curve_chart, write_svg},
        correction::CorrectionTable,
    },
    config::Config,
};
use scoresaber_scraping_utils::fs_util::read_toml_or_default;

#[derive(Parser)]
struct Opts {
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Samples per accuracy percent.
    #[arg(long)]
    divisions: Option<u32>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let opts = Opts::parse();
    let config: Config = read_toml_or_default(opts.config.as_ref())?;

    let divisions = opts.divisions.unwrap_or(config.analysis.curve_divisions);
    let document = correction_curve_chart(&CorrectionTable::default(), divisions)?;
    let output = opts.output.unwrap_or(config.analysis.curve_chart_path);
    write_svg(&output, &document)?;
    info!("Saved {output:?}");
    Ok(())
}
