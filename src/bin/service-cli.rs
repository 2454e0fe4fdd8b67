use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Method, Url};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "service-cli")]
#[command(about = "Management CLI for the user service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, env = "USER_SERVICE_ADMIN_KEY")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check service status
    Status,
    /// List circuit breakers with their state and counters
    Breakers,
    /// Force a breaker closed and clear its window
    Reset { name: String },
    /// Force a breaker open
    Trip { name: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", cli.key))?);

    let (method, url) = endpoint(&cli.url, &cli.command)?;
    let res = client.request(method, url).headers(headers).send().await?;
    print_response(res).await
}

/// Resolve a command to its admin endpoint. Breaker names are pushed as
/// single path segments so `/` or `?` in a name stays percent-encoded.
fn endpoint(base: &str, command: &Commands) -> Result<(Method, Url), Box<dyn std::error::Error>> {
    let mut url = Url::parse(base)?;
    let (method, path): (Method, Vec<&str>) = match command {
        Commands::Status => (Method::GET, vec!["admin", "status"]),
        Commands::Breakers => (Method::GET, vec!["admin", "breakers"]),
        Commands::Reset { name } => (Method::POST, vec!["admin", "breakers", name.as_str(), "reset"]),
        Commands::Trip { name } => (Method::POST, vec!["admin", "breakers", name.as_str(), "trip"]),
    };
    url.path_segments_mut()
        .map_err(|_| format!("admin URL cannot carry a path: {base}"))?
        .pop_if_empty()
        .extend(path);
    Ok((method, url))
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
