//! Diagnostic tool - Check quoter configuration
//!
//! Run with: cargo run --bin diagnose

use console::style;
use std::env;

use route_quoter::quoter::{AlloyMulticallProvider, MulticallProvider};
use route_quoter::QuoteConfig;

#[tokio::main]
async fn main() {
    println!("🔍 ROUTE QUOTER DIAGNOSTIC CHECK\n");

    // Load .env
    dotenvy::dotenv().ok();

    println!("═══════════════════════════════════════════════════");
    println!("                  ENVIRONMENT                       ");
    println!("═══════════════════════════════════════════════════\n");

    let keys = [
        ("CHAIN_ID", "Which chain are we quoting on?"),
        ("MAX_HOPS", "Maximum pools per route"),
        ("MULTICALL_CHUNK", "Calls per multicall"),
        ("GAS_LIMIT_PER_CALL", "Gas forwarded to each quote"),
        ("MIXED_QUOTER", "Mixed route quoter (needed for V2 and mixed)"),
        ("ROLLBACK_ENABLED", "Roll back the block on header errors?"),
    ];

    for (key, desc) in keys {
        let marker = match env::var(key) {
            Ok(value) => format!("{} (from env)", value),
            Err(_) => "(default)".to_string(),
        };
        println!("  {}: {}", key, marker);
        println!("    └─ {}\n", desc);
    }

    let config = match QuoteConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            println!("  {} {}", style("❌ Failed to load config:").red(), e);
            return;
        }
    };

    config.print_summary();

    println!("\n═══════════════════════════════════════════════════");
    println!("                     STATUS                         ");
    println!("═══════════════════════════════════════════════════\n");

    match config.validate() {
        Ok(()) => println!("  {}", style("✅ Configuration valid").green()),
        Err(e) => println!("  {} {}", style("❌ Invalid configuration:").red(), e),
    }

    if config.mixed_quoter.is_none() {
        println!("  {}", style("⚠️  No mixed quoter: V2 and mixed routes cannot be quoted").yellow());
    }

    let provider = AlloyMulticallProvider::new(config.rpc_url.clone());
    match provider.block_number().await {
        Ok(block) => println!("  {} latest block {}", style("✅ RPC reachable:").green(), block),
        Err(e) => println!("  {} {}", style("❌ RPC unreachable:").red(), e),
    }

    println!();
}
