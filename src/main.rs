//! Funding Rate Arb - Main Entry Point
//!
//! `serve` (default) runs the HTTP API, the refresh loop, and the scheduled
//! Telegram notifier. The other subcommands run once and exit.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use funding_rate_arb::api::{create_router, AppState};
use funding_rate_arb::config::Config;
use funding_rate_arb::error::NotifyError;
use funding_rate_arb::exchange::{build_providers, mock::demo_providers, FundingDataProvider};
use funding_rate_arb::notify::{build_bot, run_scheduled, NotifyOutcome};
use funding_rate_arb::report::{render_opportunities, render_profit, render_summary, DisplayMode};
use funding_rate_arb::strategy::{
    canonical_ticker, filter_by_ticker, sort_opportunities, top_n, FundingScanner, OpportunityBoard,
    ProfitEstimate, RankMode, SortDirection, SortKey,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn, Level};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// Funding Rate Arb CLI
#[derive(Parser)]
#[command(name = "funding-rate-arb")]
#[command(version, about = "Cross-exchange perpetual funding rate arbitrage scanner")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API, refresh loop, and scheduled notifier (default)
    Serve,

    /// Run one refresh cycle and print the opportunity table
    Scan {
        /// Number of rows (default: scan.default_top)
        #[arg(short, long)]
        top: Option<usize>,

        /// Ranking policy: apr or spread
        #[arg(long, default_value = "apr")]
        rank: RankMode,

        /// Re-sort the table by ticker, strategy, or a venue slug
        #[arg(long)]
        sort: Option<SortKey>,

        /// Ascending sort
        #[arg(long, conflicts_with = "desc")]
        asc: bool,

        /// Descending sort (default)
        #[arg(long)]
        desc: bool,

        /// Case-insensitive ticker filter
        #[arg(short, long)]
        search: Option<String>,

        /// Show venue rates per interval or annualized
        #[arg(long, default_value = "interval")]
        display: DisplayMode,

        /// Use built-in sample quotes instead of live venues
        #[arg(long)]
        demo: bool,
    },

    /// Send one Telegram notification now
    Notify,

    /// Estimate profit for holding one opportunity
    Calc {
        /// Instrument ticker, e.g. BTC
        #[arg(short, long)]
        ticker: String,

        /// Position size in USD
        #[arg(short, long, default_value = "10000")]
        size: Decimal,

        /// Holding period in hours
        #[arg(long, default_value = "24")]
        hours: Decimal,

        /// Use built-in sample quotes instead of live venues
        #[arg(long)]
        demo: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging()?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server(load_config()?).await,
        Commands::Scan {
            top,
            rank,
            sort,
            asc,
            desc: _,
            search,
            display,
            demo,
        } => {
            let direction = if asc { SortDirection::Asc } else { SortDirection::Desc };
            run_scan(demo, top, rank, sort, direction, search.as_deref(), display).await
        }
        Commands::Notify => run_notify(load_config()?).await,
        Commands::Calc {
            ticker,
            size,
            hours,
            demo,
        } => run_calc(demo, &ticker, size, hours).await,
    }
}

/// Initialize logging to stdout and an hourly rolling file.
fn init_logging() -> Result<()> {
    use tracing_subscriber::fmt::writer::MakeWriterExt;

    std::fs::create_dir_all("logs")?;

    let file_appender = tracing_appender::rolling::hourly("logs", "funding-rate-arb.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    // Keep the writer alive for the program duration
    Box::leak(Box::new(guard));

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("funding_rate_arb=debug".parse()?)
                .add_directive(Level::INFO.into()),
        )
        .with_writer(std::io::stdout.and(file_writer))
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .init();

    Ok(())
}

fn load_config() -> Result<Config> {
    let config = Config::load()?;
    config.validate().context("Invalid configuration")?;
    log_config(&config);
    Ok(config)
}

/// Log configuration on startup. Secrets are never printed.
fn log_config(config: &Config) {
    info!("📋 Configuration:");
    info!("   Bind: {}", config.server.bind);
    info!("   Refresh Interval: {}s", config.scan.refresh_interval_secs);
    info!("   Default Top: {}", config.scan.default_top);
    info!(
        "   Venues: variational={} binance={} bybit={} hyperliquid={} lighter={} extended={}",
        config.variational.enabled,
        config.binance.enabled,
        config.bybit.enabled,
        config.hyperliquid.enabled,
        config.lighter.enabled,
        config.extended.enabled
    );
    info!(
        "   Telegram: enabled={} aggregation_url={}",
        config.telegram.enabled,
        config.telegram.aggregation_url.as_deref().unwrap_or("(local)")
    );
}

async fn run_server(config: Config) -> Result<()> {
    info!(
        "🚀 Funding Rate Arb v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let scanner = Arc::new(FundingScanner::new(build_providers(&config)?));
    let board = Arc::new(OpportunityBoard::new());
    let bot = build_bot(&config, Arc::clone(&board), Arc::clone(&scanner))?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("🛑 Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    let refresh = tokio::spawn(refresh_loop(
        Arc::clone(&scanner),
        Arc::clone(&board),
        Duration::from_secs(config.scan.refresh_interval_secs),
        shutdown_rx.clone(),
    ));

    let notifier = match &bot {
        Some(bot) if config.telegram.enabled => {
            info!(
                "📨 [NOTIFY] Scheduled notifications every {}s",
                config.telegram.notify_interval_secs
            );
            Some(tokio::spawn(run_scheduled(
                Arc::clone(bot),
                Duration::from_secs(config.telegram.notify_interval_secs),
                shutdown_rx.clone(),
            )))
        }
        _ => None,
    };

    let app = create_router(AppState::new(board, scanner, config.scan.default_top).with_bot(bot));
    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    info!("🌐 Listening on {}", config.server.bind);

    let mut server_shutdown = shutdown_rx.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = server_shutdown.wait_for(|stop| *stop).await;
        })
        .await
        .context("HTTP server failed")?;

    if let Err(e) = refresh.await {
        warn!("Refresh loop ended abnormally: {}", e);
    }
    if let Some(notifier) = notifier {
        if let Err(e) = notifier.await {
            warn!("Notifier ended abnormally: {}", e);
        }
    }

    info!("👋 Funding Rate Arb shutdown complete");
    Ok(())
}

/// Refresh and publish on a fixed interval. A failed cycle keeps the
/// previous snapshot; the next tick is the retry.
async fn refresh_loop(
    scanner: Arc<FundingScanner>,
    board: Arc<OpportunityBoard>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut cycle: u64 = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                cycle += 1;
                info!("📡 [SCAN] Starting refresh #{}", cycle);
                match scanner.refresh().await {
                    Ok(snapshot) => {
                        if let Some(best) = snapshot.opportunities.first() {
                            info!(
                                "📊 [SCAN] {} opportunities | best: {} {:.2}% APR (long {} / short {})",
                                snapshot.opportunities.len(),
                                best.ticker,
                                best.estimated_apr_percent,
                                best.long.venue,
                                best.short.venue
                            );
                        } else {
                            info!("📊 [SCAN] No opportunities this cycle");
                        }
                        board.publish(snapshot).await;
                    }
                    Err(e) => error!("❌ [SCAN] Refresh failed: {:#}", e),
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}

fn scan_providers(demo: bool) -> Result<(Vec<Arc<dyn FundingDataProvider>>, usize)> {
    if demo {
        return Ok((demo_providers(), Config::default().scan.default_top));
    }
    let config = load_config()?;
    Ok((build_providers(&config)?, config.scan.default_top))
}

async fn run_scan(
    demo: bool,
    top: Option<usize>,
    rank: RankMode,
    sort: Option<SortKey>,
    direction: SortDirection,
    search: Option<&str>,
    display: DisplayMode,
) -> Result<()> {
    let (providers, default_top) = scan_providers(demo)?;
    let scanner = FundingScanner::new(providers).with_rank_mode(rank);
    let snapshot = scanner.refresh().await?;

    let mut rows = filter_by_ticker(&snapshot.opportunities, search.unwrap_or(""));
    if let Some(key) = sort {
        rows = sort_opportunities(&rows, key, direction);
    }
    let rows = top_n(&rows, top.unwrap_or(default_top));

    println!("{}", render_summary(&snapshot));
    println!("{}", render_opportunities(&rows, &scanner.venues(), display));
    Ok(())
}

async fn run_notify(config: Config) -> Result<()> {
    let scanner = Arc::new(FundingScanner::new(build_providers(&config)?));
    let board = Arc::new(OpportunityBoard::new());
    let bot = build_bot(&config, board, scanner)?.ok_or(NotifyError::MissingCredentials)?;

    match bot.notify().await? {
        NotifyOutcome::Sent(entries) => println!("📨 Notification sent ({} opportunities)", entries.len()),
        NotifyOutcome::NoOpportunities => println!("📊 No arbitrage opportunities found"),
    }
    Ok(())
}

async fn run_calc(demo: bool, ticker: &str, size: Decimal, hours: Decimal) -> Result<()> {
    let (providers, _) = scan_providers(demo)?;
    let snapshot = FundingScanner::new(providers).refresh().await?;

    let ticker = canonical_ticker(ticker);
    let Some(opportunity) = snapshot.opportunities.iter().find(|o| o.ticker == ticker) else {
        println!("❌ No cross-venue opportunity for {}", ticker);
        return Ok(());
    };

    match ProfitEstimate::compute(opportunity, size, hours) {
        Some(estimate) => println!("{}", render_profit(opportunity, &estimate)),
        None => println!("❌ Size and hours must be positive"),
    }
    Ok(())
}
