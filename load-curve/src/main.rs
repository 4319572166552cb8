use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use tracing::{info, warn};

use load_curve::general::logging;
use load_curve::io::import::read_workbook;
use load_curve::io::plot::{duration_chart, render, table_chart};
use load_curve::io::weather::merge;
use load_curve::{PipelineConfig, Session, TimeSeriesTable};

#[derive(Parser)]
#[command(name = "load-curve")]
#[command(about = "Normalize meter data from a prefab workbook and chart derived views", long_about = None)]
struct Cli {
    /// Prefab workbook (.xlsx) with the data sheet
    workbook: PathBuf,

    /// TOML file with pipeline settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory the charts are written to
    #[arg(short, long, default_value = ".")]
    out: PathBuf,

    /// Chart the hourly resampling
    #[arg(long)]
    hourly: bool,

    /// Chart the duration curve
    #[arg(long)]
    duration_curve: bool,

    /// Chart and log the monthly aggregates
    #[arg(long)]
    monthly: bool,

    /// Chart every year on top of each other
    #[arg(long)]
    multi_year: bool,

    /// Chart a single day (YYYY-MM-DD), may be repeated
    #[arg(long = "day")]
    days: Vec<NaiveDate>,

    /// Replace values above this cut-off by interpolation
    #[arg(long)]
    cut_off: Option<f64>,

    /// Add Savitzky-Golay smoothed lines with the given odd window (0 = default window)
    #[arg(long)]
    smooth: Option<usize>,
}

fn chart_table(session: &Session, table: &TimeSeriesTable, title: &str, path: &Path) -> Result<()> {
    let metas = session.chart_metas(table.column_names());
    render(&table_chart(table, &metas, title), path)?;
    Ok(())
}

fn main() -> Result<()> {
    logging::init("info");
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    let raw = read_workbook(&cli.workbook, &config)?;
    let mut session = Session::from_raw(raw, config)
        .with_context(|| format!("Failed to process {}", cli.workbook.display()))?;
    for diagnostic in session.diagnostics() {
        warn!("{}", diagnostic);
    }
    if !session.dst_removed().is_empty() {
        info!("Removed rows of the autumn clock change: {:?}", session.dst_removed().index());
    }

    if let Some(cut_off) = cli.cut_off {
        let replaced = session.clean_outliers(cut_off);
        info!("{} value(s) above {} replaced", replaced, cut_off);
    }
    if let Some(window) = cli.smooth {
        session.smooth((window > 0).then_some(window))?;
    }

    std::fs::create_dir_all(&cli.out)
        .with_context(|| format!("Failed to create {}", cli.out.display()))?;

    let table = session.table().clone();
    chart_table(&session, &table, "Lastgang", &cli.out.join("lastgang.png"))?;

    if cli.hourly {
        let hourly = session.hourly()?.clone();
        chart_table(&session, &hourly, "Stundenwerte", &cli.out.join("stundenwerte.png"))?;
    }

    if cli.duration_curve {
        let curve = session.duration_curve()?.clone();
        let metas = session.chart_metas(curve.columns.keys().map(String::as_str));
        render(
            &duration_chart(&curve, &metas, "Jahresdauerlinie"),
            &cli.out.join("jahresdauerlinie.png"),
        )?;
    }

    if cli.monthly {
        let monthly = session.monthly()?.clone();
        chart_table(&session, &monthly, "Monatswerte", &cli.out.join("monatswerte.png"))?;
        let summary = session.monthly_summary()?;
        for (column, values) in &summary.columns {
            let cells: Vec<String> = summary
                .labels
                .iter()
                .zip(values)
                .map(|(label, v)| match v {
                    Some(v) => format!("{}: {:.2}", label, v),
                    None => format!("{}: -", label),
                })
                .collect();
            info!("{}: {}", column, cells.join(", "));
        }
    }

    if cli.multi_year {
        if session.years().len() < 2 {
            warn!("Multi-year view needs at least two years, found {:?}", session.years());
        } else {
            let slices: Vec<TimeSeriesTable> = session.multi_year()?.values().cloned().collect();
            let overlay = merge(&slices)?;
            chart_table(&session, &overlay, "Jahresvergleich", &cli.out.join("jahresvergleich.png"))?;
        }
    }

    if !cli.days.is_empty() {
        let days = session.days(&cli.days).clone();
        for (key, day) in &days {
            let file = format!("tag_{}.png", key.replace(['.', ' '], ""));
            chart_table(&session, day, key, &cli.out.join(file))?;
        }
    }

    info!("Charts written to {}", cli.out.display());
    Ok(())
}
