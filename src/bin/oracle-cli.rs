use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "oracle-cli")]
#[command(about = "Query CLI for the price oracle", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show tracked pairs, latest prices and connection state
    Status,
    /// Show the latest price of a pair, e.g. BTC-USDT
    Price { pair: String },
    /// Request a signed price attestation for a pair
    SignedPrice { pair: String },
}

/// Path segment for a pair: `BTC/USDT` is sent as `BTC-USDT`.
fn pair_segment(pair: &str) -> String {
    pair.trim().replace('/', "-")
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let path = match &cli.command {
        Commands::Status => "/status".to_string(),
        Commands::Price { pair } => format!("/price/{}", pair_segment(pair)),
        Commands::SignedPrice { pair } => format!("/signed_price/{}", pair_segment(pair)),
    };

    let res = client.get(format!("{}{}", base, path)).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: oracle API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
