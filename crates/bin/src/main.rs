//! Epsilon CLI binary.
//!
//! Provides a command-line interface for EPS estimate tables, P/E series and
//! σ-band valuation of an index.

mod integration;

use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use epsilon::{MarketData, PriceSourceConfig};
use epsilon_data::yahoo::DEFAULT_INDEX_SYMBOL;
use epsilon_output::{
    ExportFormat, Exporter, NamedSeries, PePanel, ValuationSummary, render_pe_chart,
    render_time_series, save_svg,
};
use epsilon_valuation::{DEFAULT_SIGMA, EpsMode, PeSeries, SigmaBands};
use integration::paths::DataPaths;
use integration::pipeline::{
    PipelineError, load_market, record_report, run_extraction, scan_pending,
};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "epsilon")]
#[command(about = "Epsilon: EPS estimates, P/E series and valuation bands", long_about = None)]
#[command(version)]
struct Cli {
    /// Data directory holding the EPS table, report PDFs and outputs
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where the EPS table and prices come from.
#[derive(Args, Debug, Clone)]
struct SourceArgs {
    /// Price symbol fetched from Yahoo Finance
    #[arg(long, default_value = DEFAULT_INDEX_SYMBOL)]
    symbol: String,

    /// Local `Date,Price` CSV used instead of Yahoo Finance
    #[arg(long)]
    prices: Option<PathBuf>,

    /// EPS table (default: <data-dir>/extracted_estimates.csv)
    #[arg(long)]
    eps: Option<PathBuf>,
}

impl SourceArgs {
    fn price_config(&self) -> PriceSourceConfig {
        PriceSourceConfig {
            symbol: self.symbol.clone(),
            prices_path: self.prices.clone(),
            end: None,
        }
    }
}

/// Series available to `plot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PlotSeries {
    /// Daily price
    Price,
    /// Four-quarter EPS
    Eps,
    /// P/E ratio
    Pe,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the daily P/E series
    Pe {
        #[command(flatten)]
        source: SourceArgs,

        /// EPS mode (forward or trailing)
        #[arg(long, default_value = "forward")]
        mode: EpsMode,

        /// Compute both modes, trailing first
        #[arg(long)]
        both: bool,

        /// Output format (csv, json or pretty-json)
        #[arg(long, default_value = "csv")]
        format: ExportFormat,

        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Show the four-quarter EPS on a date
    Eps {
        #[command(flatten)]
        source: SourceArgs,

        /// Date to evaluate (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,

        /// EPS mode (forward or trailing)
        #[arg(long, default_value = "forward")]
        mode: EpsMode,
    },

    /// Show the current P/E against its historical bands
    Current {
        #[command(flatten)]
        source: SourceArgs,

        /// EPS mode (forward or trailing)
        #[arg(long, default_value = "forward")]
        mode: EpsMode,

        /// Band width in standard deviations
        #[arg(long, default_value_t = DEFAULT_SIGMA)]
        sigma: f64,

        /// Print Markdown instead of a terminal table
        #[arg(long)]
        markdown: bool,
    },

    /// Render the trailing and forward P/E chart
    Chart {
        #[command(flatten)]
        source: SourceArgs,

        /// Output SVG (default: <data-dir>/output/charts/pe_ratio.svg)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Band width in standard deviations
        #[arg(long, default_value_t = DEFAULT_SIGMA)]
        sigma: f64,
    },

    /// Plot one or two series on a shared time axis
    Plot {
        #[command(flatten)]
        source: SourceArgs,

        /// Series to plot, at most two (default: price and pe)
        #[arg(long, value_enum)]
        series: Vec<PlotSeries>,

        /// Band the series at --sigma-index at this many standard deviations
        #[arg(long)]
        sigma: Option<f64>,

        /// Index of the banded series
        #[arg(long, default_value_t = 0)]
        sigma_index: usize,

        /// EPS mode (forward or trailing)
        #[arg(long, default_value = "forward")]
        mode: EpsMode,

        /// Output SVG (default: <data-dir>/output/charts/time_series.svg)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// List report documents not yet extracted
    Pending {
        /// EPS table (default: <data-dir>/extracted_estimates.csv)
        #[arg(long)]
        eps: Option<PathBuf>,
    },

    /// Render the EPS chart page of pending report documents
    Extract {
        /// Stop after this many images
        #[arg(long)]
        limit: Option<usize>,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,

        /// EPS table (default: <data-dir>/extracted_estimates.csv)
        #[arg(long)]
        eps: Option<PathBuf>,
    },

    /// Record one report's quarter values into the EPS table
    Record {
        /// Report date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,

        /// Quarter values such as Q1'24=55.1 (`*` marks a restated figure)
        #[arg(required = true)]
        values: Vec<String>,

        /// EPS table (default: <data-dir>/extracted_estimates.csv)
        #[arg(long)]
        eps: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<(), PipelineError> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let paths = DataPaths::new(cli.data_dir);

    match cli.command {
        Commands::Pe {
            source,
            mode,
            both,
            format,
            output,
        } => {
            let market = load(&paths, &source, mode).await?;
            pe_series(&market, both, format, output)?;
        }
        Commands::Eps { source, date, mode } => {
            let market = load(&paths, &source, mode).await?;
            show_eps(&market, date);
        }
        Commands::Current {
            source,
            mode,
            sigma,
            markdown,
        } => {
            let market = load(&paths, &source, mode).await?;
            show_current(&market, sigma, markdown)?;
        }
        Commands::Chart {
            source,
            output,
            sigma,
        } => {
            let market = load(&paths, &source, EpsMode::Forward).await?;
            let output = output.unwrap_or_else(|| paths.chart("pe_ratio.svg"));
            pe_chart(&market, sigma, &output)?;
        }
        Commands::Plot {
            source,
            series,
            sigma,
            sigma_index,
            mode,
            output,
        } => {
            let market = load(&paths, &source, mode).await?;
            let output = output.unwrap_or_else(|| paths.chart("time_series.svg"));
            plot(&market, &series, sigma.map(|k| (k, sigma_index)), &output)?;
        }
        Commands::Pending { eps } => {
            list_pending(&paths, eps)?;
        }
        Commands::Extract { limit, json, eps } => {
            let table = paths.eps_table(eps.as_deref());
            let summary = run_extraction(&paths, &table, limit)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
                return Ok(());
            }
            println!("\nExtraction complete:");
            println!("  Extracted:  {}", summary.extracted);
            println!("  Skipped:    {}", summary.skipped);
            println!("  Not found:  {}", summary.not_found);
            println!("  Failed:     {}", summary.failed);
        }
        Commands::Record { date, values, eps } => {
            let table = paths.eps_table(eps.as_deref());
            let (report, replaced) = record_report(&table, date, &values)?;
            let action = if replaced { "Replaced" } else { "Added" };
            println!(
                "{} report {} ({} quarters) in {}",
                action,
                report.report_date,
                report.values.len(),
                table.display()
            );
        }
    }

    Ok(())
}

async fn load(
    paths: &DataPaths,
    source: &SourceArgs,
    mode: EpsMode,
) -> Result<MarketData, PipelineError> {
    let eps_path = paths.eps_table(source.eps.as_deref());
    let config = source.price_config();

    // stderr keeps exported rows on stdout clean
    eprint!("Loading {} and {} prices...", eps_path.display(), config.symbol);
    match load_market(&eps_path, &config, mode).await {
        Ok(market) => {
            eprintln!(
                " ✓ ({} reports, {} prices)",
                market.eps_table().len(),
                market.prices().len()
            );
            Ok(market)
        }
        Err(e) => {
            eprintln!(" ✗");
            Err(e)
        }
    }
}

fn pe_series(
    market: &MarketData,
    both: bool,
    format: ExportFormat,
    output: Option<PathBuf>,
) -> Result<(), PipelineError> {
    let series = if both {
        market.pe_ratios()
    } else {
        vec![market.pe_ratio()]
    };

    match output {
        Some(path) => {
            series.export_to_file(&path, format)?;
            println!("Wrote {} P/E rows to {}", rows(&series), path.display());
        }
        None => print!("{}", series.export_to_string(format)?),
    }
    Ok(())
}

fn rows(series: &[PeSeries]) -> usize {
    series.iter().map(|s| s.len()).sum()
}

fn show_eps(market: &MarketData, date: NaiveDate) {
    let mode = market.mode();
    match market.eps_at(date) {
        Some(eps) => println!("{} EPS on {} ({}): {:.2}", mode, date, mode.label(), eps),
        None => println!("{} EPS on {}: n/a", mode, date),
    }
}

fn show_current(market: &MarketData, sigma: f64, markdown: bool) -> Result<(), PipelineError> {
    let bands = market.bands(sigma)?;
    let summary = ValuationSummary::new(market.symbol(), &market.pe_ratio(), bands);
    if markdown {
        print!("{}", summary.to_markdown());
    } else {
        print!("{}", summary.to_ascii_table());
    }
    Ok(())
}

fn pe_chart(market: &MarketData, sigma: f64, output: &Path) -> Result<(), PipelineError> {
    let bander = SigmaBands::new(sigma)?;
    let series = market.pe_ratios();
    let bands: Vec<_> = series
        .iter()
        .map(|s| bander.compute(&s.ratio_points()))
        .collect();
    let panels: Vec<PePanel<'_>> = series
        .iter()
        .zip(&bands)
        .map(|(series, bands)| PePanel {
            series,
            bands: bands.as_ref(),
        })
        .collect();

    let svg = render_pe_chart(market.symbol(), &panels, Utc::now().date_naive())?;
    save_svg(output, &svg)?;
    println!("Saved P/E chart to {}", output.display());
    Ok(())
}

fn plot(
    market: &MarketData,
    selected: &[PlotSeries],
    sigma: Option<(f64, usize)>,
    output: &Path,
) -> Result<(), PipelineError> {
    let selected = if selected.is_empty() {
        &[PlotSeries::Price, PlotSeries::Pe][..]
    } else {
        selected
    };

    let pe = market.pe_ratio();
    let mode = market.mode();
    let named: Vec<NamedSeries> = selected
        .iter()
        .map(|kind| match kind {
            PlotSeries::Price => NamedSeries::new(
                format!("{} Price", market.symbol()),
                pe.records().iter().map(|r| Some(r.price)).collect(),
            ),
            PlotSeries::Eps => NamedSeries::new(
                format!("{} EPS", mode),
                pe.records().iter().map(|r| r.eps).collect(),
            ),
            PlotSeries::Pe => NamedSeries::new(
                format!("{} P/E", mode),
                pe.records().iter().map(|r| r.pe_ratio).collect(),
            ),
        })
        .collect();

    let svg = render_time_series(&pe.dates(), &named, sigma)?;
    save_svg(output, &svg)?;
    println!("Saved plot to {}", output.display());
    Ok(())
}

fn list_pending(paths: &DataPaths, eps: Option<PathBuf>) -> Result<(), PipelineError> {
    let table = paths.eps_table(eps.as_deref());
    let plan = scan_pending(paths, &table)?;

    println!("Pending Report Documents");
    println!("========================\n");
    println!("Data:     {}", paths.root().display());
    println!("Reports:  {}", paths.pdf_dir().display());
    println!("Images:   {}\n", paths.image_dir().display());

    if plan.pending.is_empty() {
        println!("Nothing to extract ({} skipped)", plan.skipped);
        return Ok(());
    }

    for pending in &plan.pending {
        println!(
            "  {}  {}",
            pending.document.report_date,
            pending.document.path.display()
        );
    }
    println!(
        "\n{} pending, {} skipped",
        plan.pending.len(),
        plan.skipped
    );
    Ok(())
}
