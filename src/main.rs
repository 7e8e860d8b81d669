//! 15-minute Polymarket bracket bot entry point.

use std::net::SocketAddr;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use bracket_bot::api::{create_router, AppState};
use bracket_bot::bot::BracketBot;
use bracket_bot::bracket::quote_yes;
use bracket_bot::config::Config;
use bracket_bot::market::{find_active_market, PolymarketClient};
use bracket_bot::metrics;
use bracket_bot::signing::address_from_private_key;
use bracket_bot::utils::{shutdown_signal, stop_on_signal};

/// 15-minute Polymarket bracket bot.
#[derive(Parser, Debug)]
#[command(name = "bracket-bot")]
#[command(about = "Buys the YES token of 15-minute markets below a threshold and sells at a fixed markup")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Command>,

    /// Log orders instead of sending them.
    #[arg(long)]
    dry_run: bool,

    /// HTTP server port for health/status/metrics.
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the trading loop (default).
    Run {
        /// Log orders instead of sending them.
        #[arg(long)]
        dry_run: bool,

        /// HTTP server port for health/status/metrics.
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check configuration validity.
    CheckConfig,

    /// Find the market the bot would trade right now and quote its YES token.
    DiscoverMarket,
}

fn init_logging(verbose: bool, json: bool) {
    let filter = if verbose {
        EnvFilter::new("bracket_bot=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.json_logs);

    match args.command {
        Some(Command::CheckConfig) => cmd_check_config(),
        Some(Command::DiscoverMarket) => cmd_discover_market().await,
        Some(Command::Run { dry_run, port }) => cmd_run(dry_run, port).await,
        None => cmd_run(args.dry_run, args.port).await,
    }
}

/// Check configuration validity.
fn cmd_check_config() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("BRACKET BOT - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Loading configuration... ");
    let config = match Config::load() {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    print!("Validating configuration... ");
    if let Err(e) = config.validate() {
        println!("FAILED");
        println!("  Error: {}", e);
        return Err(anyhow::anyhow!("Configuration validation failed"));
    }
    println!("OK");

    print!("Checking private key... ");
    match address_from_private_key(&config.private_key) {
        Ok(addr) => {
            println!("OK");
            println!("  Wallet address: {}", addr);
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Private key invalid"));
        }
    }

    let trading = config.trading();
    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Network: {}", config.network);
    println!("  Market: {} {}", trading.underlying, trading.duration);
    println!("  Buy at: {}", trading.buy_price);
    println!("  Sell at: {}", trading.sell_price);
    println!("  Size: {} shares", trading.max_position_size);
    println!("  Min profit rate: {}", trading.min_profit_rate);
    println!(
        "  Order TTL: buy {}s / sell {}s",
        trading.buy_order_ttl_secs, trading.sell_order_ttl_secs
    );
    println!(
        "  Poll: {}ms (backoff {}ms)",
        config.poll_interval_ms, config.error_backoff_ms
    );
    println!("  Dry Run: {}", config.dry_run);
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Find and quote the market the bot would trade.
async fn cmd_discover_market() -> anyhow::Result<()> {
    let config = Config::load_validated()?;
    let trading = config.trading();
    let client = PolymarketClient::new(&config)?;

    println!("Searching for \"{}\"...", trading.search_query());

    match find_active_market(&client, &trading).await? {
        Some(market) => {
            println!("Found market: {}", market.title());
            println!("  ID: {}", market.id);
            if let Some(slug) = &market.slug {
                println!("  Slug: {}", slug);
            }
            println!("  Volume: {}", market.volume_or_zero());
            match quote_yes(&client, &market).await {
                Some(quote) => println!(
                    "  YES ask: {} ({}) - buy threshold {}",
                    quote.ask, quote.source, trading.buy_price
                ),
                None => println!("  YES ask: unavailable"),
            }
        }
        None => println!("No active market found"),
    }

    Ok(())
}

/// Run the trading loop with the status server alongside.
async fn cmd_run(dry_run_override: bool, port_override: Option<u16>) -> anyhow::Result<()> {
    info!("Loading configuration...");
    let mut config = Config::load().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    if dry_run_override {
        config.dry_run = true;
    }
    if let Some(port) = port_override {
        config.port = port;
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(anyhow::anyhow!("Configuration validation failed: {}", e));
    }

    info!(
        mode = if config.dry_run { "SIMULATION" } else { "LIVE TRADING" },
        network = %config.network,
        "Configuration loaded"
    );

    let client = PolymarketClient::new(&config)?;
    info!(address = %client.get_address(), chain_id = client.chain_id(), "Wallet ready");

    let mut app_state = AppState::new();
    match metrics::install_prometheus_recorder() {
        Ok(handle) => {
            metrics::init_metrics();
            app_state = app_state.with_metrics(handle);
        }
        Err(e) => warn!(error = %e, "Metrics disabled"),
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    let router = create_router(app_state.clone());
    let server_handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    });

    let mut bot = BracketBot::new(client, &config).with_state(app_state);
    tokio::spawn(stop_on_signal(bot.running_flag()));

    bot.run().await;

    if let Err(e) = server_handle.await? {
        warn!(error = %e, "HTTP server exited with error");
    }

    info!("Shutdown complete");
    Ok(())
}
