//! Propscore CLI - command-line client for the scoring daemon

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tabled::{Table, Tabled};

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9527";

#[derive(Parser)]
#[command(name = "propscore")]
#[command(about = "Property scoring CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// RPC server URL
    #[arg(long, env = "PROPSCORE_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a property now (waits for the model)
    Score {
        /// Buyer filter as JSON, or @path to a JSON file
        #[arg(short, long, default_value = "{}")]
        filter: String,

        /// Property as JSON (must carry `id` or `propertyId`), or @path
        #[arg(short, long)]
        property: String,
    },

    /// Return a cached score or queue one
    ScoreAsync {
        /// Buyer filter as JSON, or @path to a JSON file
        #[arg(short, long, default_value = "{}")]
        filter: String,

        /// Property as JSON (must carry `id` or `propertyId`), or @path
        #[arg(short, long)]
        property: String,

        /// Keep polling until the status is no longer pending
        #[arg(long)]
        wait: bool,

        /// Poll interval in milliseconds
        #[arg(long, default_value = "1000")]
        interval_ms: u64,

        /// Give up waiting after this many seconds
        #[arg(long, default_value = "120")]
        timeout_secs: u64,
    },

    /// Show queue and cache status
    Status,
}

#[derive(Serialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: Value,
    id: u64,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

#[derive(Tabled)]
struct CategoryRow {
    category: String,
    points: String,
}

/// Inline JSON, or `@path` to read it from a file
fn read_json_arg(arg: &str) -> Result<Value> {
    let text = match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?,
        None => arg.to_string(),
    };
    let value: Value = serde_json::from_str(&text).context("Invalid JSON")?;
    if !value.is_object() {
        anyhow::bail!("Expected a JSON object");
    }
    Ok(value)
}

fn score_params(filter: &str, property: &str) -> Result<Value> {
    Ok(json!({
        "filter": read_json_arg(filter).context("--filter")?,
        "property": read_json_arg(property).context("--property")?,
    }))
}

fn breakdown_rows(result: &Value) -> Vec<CategoryRow> {
    const CATEGORIES: [&str; 6] = ["price", "location", "specs", "lifestyle", "timing", "sentiment"];
    CATEGORIES
        .iter()
        .map(|name| CategoryRow {
            category: name.to_string(),
            points: result["breakdown"][name].to_string(),
        })
        .collect()
}

fn print_result(result: &Value) {
    println!(
        "  {} {}   {} {}",
        "Total:".bold(),
        result["total_score"].to_string().green().bold(),
        "Tier:".bold(),
        result["tier"].as_str().unwrap_or("-")
    );
    println!();
    println!("{}", Table::new(breakdown_rows(result)));
    if let Some(explanation) = result["explanation"].as_str() {
        println!();
        println!("  {}", explanation);
    }
}

async fn call_rpc(url: &str, method: &str, params: Value) -> Result<Value> {
    let request = JsonRpcRequest {
        jsonrpc: "2.0".to_string(),
        method: method.to_string(),
        params,
        id: 1,
    };

    let client = reqwest::Client::new();
    let response: JsonRpcResponse = client
        .post(url)
        .json(&request)
        .send()
        .await
        .context("Failed to connect to daemon")?
        .json()
        .await
        .context("Failed to parse response")?;

    if let Some(error) = response.error {
        anyhow::bail!("RPC error ({}): {}", error.code, error.message);
    }

    response
        .result
        .ok_or_else(|| anyhow::anyhow!("No result in response"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Score { filter, property } => {
            let params = score_params(&filter, &property)?;
            let result = call_rpc(&cli.rpc_url, "score.sync.v1", params).await?;

            println!("{}", "✓ Property scored".green().bold());
            println!();
            print_result(&result);
        }

        Commands::ScoreAsync {
            filter,
            property,
            wait,
            interval_ms,
            timeout_secs,
        } => {
            let params = score_params(&filter, &property)?;
            let deadline = Instant::now() + Duration::from_secs(timeout_secs);

            let outcome = loop {
                let outcome = call_rpc(&cli.rpc_url, "score.async.v1", params.clone()).await?;
                let pending = outcome["status"] == "pending";
                if !wait || !pending {
                    break outcome;
                }
                if Instant::now() >= deadline {
                    anyhow::bail!("Still pending after {} seconds", timeout_secs);
                }
                tokio::time::sleep(Duration::from_millis(interval_ms)).await;
            };

            match outcome["status"].as_str() {
                Some("scored") => {
                    println!("{}", "✓ Scored".green().bold());
                    println!();
                    print_result(&outcome["result"]);
                }
                Some("error") => {
                    println!("{}", "✗ Scoring failed".red().bold());
                    println!("  {} {}", "Error:".bold(), outcome["result"]["error"]);
                }
                _ => {
                    println!("{}", "… Pending (job queued)".yellow().bold());
                }
            }
        }

        Commands::Status => {
            println!("{}", "System Status".cyan().bold());
            println!();

            match call_rpc(&cli.rpc_url, "admin.stats.v1", json!({})).await {
                Ok(stats) => {
                    println!("  {} {}", "RPC URL:".bold(), cli.rpc_url);
                    println!("  {} {}", "Status:".bold(), "ONLINE".green());
                    println!("  {} {}", "Queue:".bold(), stats["queue"]);
                    println!();
                    println!("  {} {}", "Queued:".bold(), stats["queued_jobs"]);
                    println!("  {} {}", "Running:".bold(), stats["running_jobs"]);
                    println!("  {} {}", "Done:".bold(), stats["done_jobs"]);
                    println!("  {} {}", "Failed:".bold(), stats["failed_jobs"]);
                    println!();
                    println!("  {} {}", "Cached scores:".bold(), stats["cached_entries"]);
                    println!("  {} {} seconds", "Uptime:".bold(), stats["uptime_seconds"]);
                }
                Err(e) => {
                    println!("  {} {}", "Status:".bold(), "ERROR".red());
                    println!("  {} {}", "Error:".bold(), e);
                }
            }
        }
    }

    Ok(())
}
