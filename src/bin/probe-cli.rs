use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "probe-cli")]
#[command(about = "Query the health probes of a running service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Query the liveness probe
    Live,
    /// Query the readiness probe
    Ready,
    /// Query the combined health endpoint
    Health,
}

impl Commands {
    fn path(&self) -> &'static str {
        match self {
            Commands::Live => "/livez",
            Commands::Ready => "/readyz",
            Commands::Health => "/healthz",
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let url = format!("{}{}", cli.url.trim_end_matches('/'), cli.command.path());

    match query(&client, &url).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(2)
        }
    }
}

async fn query(client: &reqwest::Client, url: &str) -> Result<bool, Box<dyn std::error::Error>> {
    let res = client.get(url).send().await?;
    let status = res.status();
    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);

    if !status.is_success() {
        eprintln!("Probe returned status {}", status);
    }
    Ok(status.is_success())
}
