use std::{io::BufWriter, path::PathBuf};

use clap::Parser;
use fs_err::File;
use log::info;
use scoresaber_scraping::{
    analysis::{
        chart::{pp_chart, write_svg},
        correction::{CorrectionDomain, CorrectionTable},
        derive::{derive, PpSource, UnrankedRowPolicy, UnweightedRowPolicy},
        table::write_derived_table,
    },
    config::Config,
    scoresaber::play_log::open_rows,
};
use scoresaber_scraping_utils::fs_util::read_toml_or_default;

#[derive(Parser)]
struct Opts {
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Play log to read instead of the configured one.
    #[arg(long)]
    log: Option<PathBuf>,
    /// Chart to write instead of the configured one.
    #[arg(long)]
    chart: Option<PathBuf>,
    #[arg(long, value_enum)]
    unranked_rows: Option<UnrankedRowPolicy>,
    #[arg(long, value_enum)]
    unweighted_rows: Option<UnweightedRowPolicy>,
    #[arg(long, value_enum)]
    correction_domain: Option<CorrectionDomain>,
    #[arg(long, value_enum)]
    pp_source: Option<PpSource>,
    /// Also write the derived table here.
    #[arg(long)]
    derived_csv: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let opts = Opts::parse();
    let mut config: Config = read_toml_or_default(opts.config.as_ref())?;
    let analysis = &mut config.analysis;
    if let Some(policy) = opts.unranked_rows {
        analysis.unranked_rows = policy;
    }
    if let Some(policy) = opts.unweighted_rows {
        analysis.unweighted_rows = policy;
    }
    if let Some(domain) = opts.correction_domain {
        analysis.correction_domain = domain;
    }
    if let Some(source) = opts.pp_source {
        analysis.pp_source = source;
    }

    let log_path = opts.log.unwrap_or(config.log_path);
    let dataset = derive(
        open_rows(&log_path)?,
        &CorrectionTable::default(),
        config.analysis.derivation_options(),
    )?;

    println!("Plays:           {}", dataset.records().len());
    println!("Given total:     {:.2}", dataset.total_given());
    println!("Effective total: {:.2}", dataset.total_effective());
    println!("Weighted raw:    {:.2}", dataset.weighted_raw_total());

    let chart_path = opts.chart.unwrap_or(config.analysis.chart_path);
    write_svg(&chart_path, &pp_chart(&dataset))?;
    info!("Saved chart to {chart_path:?}");

    if let Some(path) = opts.derived_csv {
        write_derived_table(BufWriter::new(File::create(&path)?), &dataset)?;
        info!("Saved derived table to {path:?}");
    }
    Ok(())
}
