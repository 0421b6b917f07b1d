use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, ORIGIN};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "api-cli")]
#[command(about = "Management CLI for the BIF API server", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:4000")]
    url: String,

    /// Origin header to send; required unless the server allows every origin.
    #[arg(short, long)]
    origin: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check API liveness
    Health,
    /// Create a consortium
    CreateConsortium {
        #[arg(long)]
        consortium_name: String,
        #[arg(long)]
        organization_name: String,
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Fetch a consortium by id
    GetConsortium { id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let mut headers = HeaderMap::new();
    if let Some(origin) = &cli.origin {
        headers.insert(ORIGIN, HeaderValue::from_str(origin)?);
    }

    let res = match cli.command {
        Commands::Health => client.get(format!("{base}/healthcheck")).headers(headers).send().await?,
        Commands::CreateConsortium {
            consortium_name,
            organization_name,
            base_url,
        } => {
            let mut body = json!({
                "consortiumName": consortium_name,
                "organizationName": organization_name,
            });
            if let Some(base_url) = base_url {
                body["baseUrl"] = Value::String(base_url);
            }
            client
                .post(format!("{base}/api/v1/consortium"))
                .headers(headers)
                .json(&body)
                .send()
                .await?
        }
        Commands::GetConsortium { id } => {
            client
                .get(format!("{base}/api/v1/consortium/{id}"))
                .headers(headers)
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> anyhow::Result<()> {
    let status = res.status();
    let text = res.text().await?;
    let rendered = match serde_json::from_str::<Value>(&text) {
        Ok(json) => serde_json::to_string_pretty(&json)?,
        Err(_) => text,
    };

    if !status.is_success() {
        eprintln!("Error: API returned status {}", status);
        eprintln!("Response: {}", rendered);
        std::process::exit(1);
    }

    println!("{}", rendered);
    Ok(())
}
