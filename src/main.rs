//! Route Quoter CLI
//!
//! Run with: cargo run -- --pools pools.toml --token-in ETH --token-out USDC --amount 1000000000000000000
//!
//! Loads a pool list, enumerates the routes of one flavor between the pair
//! and quotes every route at one pinned block.

use alloy_primitives::U256;
use clap::Parser;
use color_eyre::eyre::{eyre, Result};
use console::style;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use route_quoter::cartographer::PoolList;
use route_quoter::quoter::{amount_distribution, QuoteBatch, RouteQuoter, TradeType};
use route_quoter::tokens::resolve_currency;
use route_quoter::{QuoteConfig, RouteProtocol};

#[derive(Parser, Debug)]
#[command(name = "route-quoter", about = "Enumerate and quote Uniswap routes")]
struct Args {
    /// TOML pool list (`[[pools]]` tables)
    #[arg(long)]
    pools: PathBuf,

    /// Input currency: symbol, address or ETH
    #[arg(long)]
    token_in: String,

    /// Output currency: symbol, address or ETH
    #[arg(long)]
    token_out: String,

    /// Amount in base units (input amount, or output amount with --exact-out)
    #[arg(long)]
    amount: String,

    #[arg(long)]
    exact_out: bool,

    /// Route flavor: v2, v3, v4 or mixed
    #[arg(long, default_value = "v3")]
    flavor: RouteProtocol,

    /// Also quote every multiple of this percentage of the amount
    #[arg(long, default_value_t = 0)]
    distribution: u32,

    /// Pin quotes to this block instead of latest + offset
    #[arg(long)]
    block: Option<u64>,

    /// TOML config file; the environment is used otherwise
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the resolved config to this TOML file
    #[arg(long)]
    save_config: Option<PathBuf>,

    /// Print the batch as JSON
    #[arg(long)]
    json: bool,
}

fn print_banner() {
    println!();
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!("{}", style(" ROUTE QUOTER - Batched On-Chain Quotes").cyan().bold());
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!();
}

fn print_batch(batch: &QuoteBatch, percents: &[u32], trade_type: TradeType) {
    println!(
        "{}",
        style(format!(
            "═══ {} routes @ block {} (gas/success {}) ═══",
            batch.routes.len(),
            batch.block_number,
            batch.gas_used_per_success
        ))
        .blue()
        .bold()
    );

    for (i, route) in batch.routes.iter().enumerate() {
        println!();
        println!("{} {}", style(format!("#{}", i + 1)).yellow().bold(), route.route);

        for (pct, quote) in percents.iter().zip(&route.quotes) {
            match quote.quote {
                Some(q) => println!(
                    "    {:>3}%  {} → {}  (gas est. {})",
                    pct,
                    quote.amount,
                    style(q).green(),
                    quote.gas_estimate.unwrap_or_default()
                ),
                None => println!("    {:>3}%  {} → {}", pct, quote.amount, style("no quote").red()),
            }
        }
    }

    println!();
    for (index, pct) in percents.iter().enumerate() {
        if let Some((route, quote)) = batch.best(index, trade_type) {
            println!(
                "{} {:>3}%: {} via {}",
                style("Best").green().bold(),
                pct,
                quote.quote.unwrap_or_default(),
                route.route
            );
        }
    }
}

fn batch_json(batch: &QuoteBatch) -> serde_json::Value {
    serde_json::json!({
        "block_number": batch.block_number,
        "gas_used_per_success": batch.gas_used_per_success,
        "routes": batch.routes.iter().map(|r| serde_json::json!({
            "protocol": r.route.protocol,
            "route": r.route.to_string(),
            "path": r.route.token_path().iter().map(|t| t.address).collect::<Vec<_>>(),
            "quotes": r.quotes,
        })).collect::<Vec<_>>(),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("route_quoter=info".parse()?),
        )
        .init();

    let args = Args::parse();
    if !args.json {
        print_banner();
    }

    // Load configuration
    let config = match &args.config {
        Some(path) => QuoteConfig::from_file(path)?,
        None => QuoteConfig::from_env()?,
    };

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        return Err(e);
    }

    if let Some(path) = &args.save_config {
        config.save_to_file(path)?;
        info!("Saved resolved config to {:?}", path);
    }

    if !args.json {
        config.print_summary();
        println!();
    }

    let chain_id = config.chain_id;
    let token_in = resolve_currency(chain_id, &args.token_in)
        .ok_or_else(|| eyre!("Unknown input currency '{}'", args.token_in))?;
    let token_out = resolve_currency(chain_id, &args.token_out)
        .ok_or_else(|| eyre!("Unknown output currency '{}'", args.token_out))?;
    let total = U256::from_str(&args.amount).map_err(|e| eyre!("Invalid amount '{}': {}", args.amount, e))?;

    let pools = PoolList::from_file(&args.pools)?.pools;
    let (percents, amounts) = amount_distribution(total, args.distribution);
    let trade_type = if args.exact_out { TradeType::ExactOutput } else { TradeType::ExactInput };

    let quoter = RouteQuoter::from_config(config);
    let routes = quoter.find_routes(&token_in, &token_out, &pools, args.flavor);
    info!(
        "{} {} routes {} → {}, {} amounts ({})",
        routes.len(),
        args.flavor,
        token_in,
        token_out,
        amounts.len(),
        trade_type
    );

    let start = Instant::now();
    let batch = quoter.quote_routes(&routes, &amounts, trade_type, args.block).await?;
    info!("Quoted in {:?}", start.elapsed());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&batch_json(&batch))?);
    } else if batch.is_empty() {
        println!("{}", style("No quotes returned").yellow());
    } else {
        print_batch(&batch, &percents, trade_type);
    }

    Ok(())
}
