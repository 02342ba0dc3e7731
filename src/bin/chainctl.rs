use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::{json, Value};

const TRACE_HEADER: &str = "x-trace-id";

#[derive(Parser)]
#[command(name = "chainctl")]
#[command(about = "Drive a running service of the chain", long_about = None)]
struct Cli {
    /// Base URL of the target service
    #[arg(short, long, default_value = "http://localhost:8002")]
    url: String,

    /// Resource served by the target (users, products, orders)
    #[arg(short, long, default_value = "orders")]
    resource: String,

    /// Correlation id to send; the service generates one when omitted
    #[arg(short, long)]
    trace_id: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Liveness check
    Health,
    /// List every record of the resource
    List,
    /// Fetch one record
    Get { id: u64 },
    /// Create a record from a JSON body, e.g. '{"user_id":1,"product_id":2,"quantity":1}'
    Create { body: String },
    /// Delay the response by the given number of seconds
    Slow { seconds: f64 },
    /// Trigger a controlled internal error
    Error,
    /// Trigger a failure in the next service of the chain
    Cascade,
    /// Dump the Prometheus exposition
    Metrics,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if let Some(trace_id) = &cli.trace_id {
        headers.insert(TRACE_HEADER, HeaderValue::from_str(trace_id)?);
    }

    let base = cli.url.trim_end_matches('/');
    let resource = &cli.resource;
    let request = match cli.command {
        Commands::Health => client.get(format!("{base}/health")),
        Commands::List => client.get(format!("{base}/{resource}")),
        Commands::Get { id } => client.get(format!("{base}/{resource}/{id}")),
        Commands::Create { body } => {
            let body: Value = serde_json::from_str(&body)?;
            client.post(format!("{base}/{resource}/create")).json(&body)
        }
        Commands::Slow { seconds } => client.get(format!("{base}/{resource}/slow/{seconds}")),
        Commands::Error => client.get(format!("{base}/{resource}/error")),
        Commands::Cascade => client.get(format!("{base}/{resource}/cascade-error")),
        Commands::Metrics => {
            let res = client.get(format!("{base}/metrics")).send().await?;
            println!("{}", res.text().await?);
            return Ok(());
        }
    };

    let res = request.headers(headers).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let trace_id = res
        .headers()
        .get(TRACE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let text = res.text().await?;
    let body = serde_json::from_str::<Value>(&text).unwrap_or_else(|_| json!(text));

    eprintln!("status: {status}");
    eprintln!("trace id: {trace_id}");
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}
