//! stockcrawl CLI: one command per data family, CSV on stdout or to a file.
//!
//! Commands:
//! - `indexes` / `global-indexes`: KOSPI+KOSDAQ, S&P500+Nikkei+Eurostoxx+Shanghai
//! - `stock`: chart bars for one listed stock
//! - `etf` / `tickers` / `funds`: ETF+ETN list, exchange listing, fund directory
//! - `fund-price`: one fund's daily prices
//! - `snapshot` / `statement` / `consensus`: fundamentals for one company
//!
//! Logs go to stderr (`RUST_LOG` overrides the level).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use stockcrawl_core::{CrawlConfig, Crawler, Retrieval, Timeframe};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stockcrawl", about = "Korean and global market data crawler", version)]
struct Cli {
    /// TOML config (retry, http, browser, paging). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Write CSV here instead of stdout.
    #[arg(long, short, global = true)]
    out: Option<PathBuf>,

    /// Debug-level logging.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// KOSPI and KOSDAQ daily bars.
    Indexes,
    /// Chart bars for one stock.
    Stock {
        /// Six-digit stock code (e.g., 005930).
        ticker: String,

        /// Bar width: day, week or month.
        #[arg(long, default_value = "day", value_parser = parse_timeframe)]
        timeframe: Timeframe,

        /// Number of bars.
        #[arg(long, default_value_t = 1000)]
        count: u32,
    },
    /// S&P500, Nikkei, Eurostoxx and Shanghai daily closes.
    GlobalIndexes,
    /// ETF and ETN listings.
    Etf,
    /// Exchange-listed companies.
    Tickers,
    /// Daily prices of one fund.
    FundPrice {
        /// Fund code.
        ticker: String,

        /// Months of history to cover.
        #[arg(long, default_value_t = 12)]
        months: u32,
    },
    /// Fund directory with setup dates.
    Funds,
    /// Financial highlights (annual and quarterly, with estimates).
    Snapshot { ticker: String },
    /// Income, balance sheet and cash flow figures.
    Statement { ticker: String },
    /// Broker target prices and opinions (launches a browser).
    Consensus {
        ticker: String,

        /// Show the browser window.
        #[arg(long, default_value_t = false)]
        headed: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => CrawlConfig::from_file(path)?,
        None => CrawlConfig::default(),
    };
    if let Commands::Consensus { headed: true, .. } = cli.command {
        config.browser.headless = false;
    }
    let crawler = config.crawler()?;

    let retrieval = run(&crawler, &cli.command)?;
    report(&retrieval);
    write_output(&retrieval, cli.out.as_deref())
}

fn parse_timeframe(s: &str) -> Result<Timeframe, String> {
    s.parse().map_err(|e: stockcrawl_core::CrawlError| e.to_string())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(crawler: &Crawler, command: &Commands) -> Result<Retrieval> {
    let retrieval = match command {
        Commands::Indexes => crawler.indexes()?,
        Commands::Stock {
            ticker,
            timeframe,
            count,
        } => crawler.stock_price(ticker, *timeframe, *count)?,
        Commands::GlobalIndexes => crawler.global_indexes()?,
        Commands::Etf => crawler.etf_tickers()?,
        Commands::Tickers => crawler.exchange_tickers()?,
        Commands::FundPrice { ticker, months } => crawler.fund_price(ticker, *months)?,
        Commands::Funds => crawler.fund_tickers()?,
        Commands::Snapshot { ticker } => crawler.fundamental_snapshot(ticker)?,
        Commands::Statement { ticker } => crawler.fundamental_statement(ticker)?,
        Commands::Consensus { ticker, .. } => crawler.consensus(ticker)?,
    };
    Ok(retrieval)
}

fn report(retrieval: &Retrieval) {
    for walk in retrieval.walks.iter().filter(|w| !w.is_complete()) {
        warn!(
            source = %walk.source,
            ticker = walk.ticker.as_deref().unwrap_or("-"),
            kind = walk.kind.as_deref().unwrap_or("-"),
            pages = walk.pages,
            stop = %walk.stop,
            "incomplete walk, table may be missing rows"
        );
    }
    eprintln!(
        "{}: {} rows from {} requests",
        retrieval.source,
        retrieval.table.len(),
        retrieval.pages_fetched()
    );
}

fn write_output(retrieval: &Retrieval, out: Option<&Path>) -> Result<()> {
    match out {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            retrieval.table.write_csv(&mut writer)?;
            writer.flush()?;
            eprintln!("wrote {}", path.display());
        }
        None => {
            let stdout = io::stdout();
            retrieval.table.write_csv(stdout.lock())?;
        }
    }
    Ok(())
}
