use std::collections::BTreeMap;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "workbench-cli")]
#[command(about = "Command-line client for the Stressless workbench backend", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Forward a request through /api/send
    Send {
        /// Upstream URL (http:// or https://)
        target: String,
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,
        /// Request header as "Name: value" (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
        #[arg(short = 'd', long, default_value = "")]
        body: String,
        /// Upstream timeout in milliseconds (0 = server default)
        #[arg(short, long, default_value_t = 0)]
        timeout_ms: i64,
    },
    /// Run API discovery against a target and follow its events
    Discover { target: String },
    /// Stop the running discovery
    Stop,
    /// List saved presets
    Presets,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Send {
            target,
            method,
            headers,
            body,
            timeout_ms,
        } => {
            let headers = parse_headers(&headers)?;
            let res = client
                .post(format!("{base}/api/send"))
                .json(&json!({
                    "method": method,
                    "url": target,
                    "headers": headers,
                    "body": body,
                    "timeoutMs": timeout_ms,
                }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Discover { target } => {
            // Subscribe before starting so no event is missed.
            let mut events = client.get(format!("{base}/api/discover/events")).send().await?;
            if !events.status().is_success() {
                return print_response(events).await;
            }

            let res = client
                .post(format!("{base}/api/discover/start"))
                .json(&json!({ "target": target }))
                .send()
                .await?;
            if !res.status().is_success() {
                return print_response(res).await;
            }

            let mut buffer = String::new();
            while let Some(chunk) = events.chunk().await? {
                buffer.push_str(&String::from_utf8_lossy(&chunk));
                while let Some(end) = buffer.find("\n\n") {
                    let frame: String = buffer.drain(..end + 2).collect();
                    if let Some(event) = parse_frame(&frame) {
                        print_event(&event);
                        if event["message"] == "discover_finished" {
                            return Ok(());
                        }
                    }
                }
            }
        }
        Commands::Stop => {
            let res = client.post(format!("{base}/api/discover/stop")).send().await?;
            print_response(res).await?;
        }
        Commands::Presets => {
            let res = client.get(format!("{base}/api/presets")).send().await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

fn parse_headers(raw: &[String]) -> Result<BTreeMap<String, String>, String> {
    raw.iter()
        .map(|h| match h.split_once(':') {
            Some((name, value)) => Ok((name.trim().to_string(), value.trim().to_string())),
            None => Err(format!("invalid header {h:?}, expected \"Name: value\"")),
        })
        .collect()
}

fn parse_frame(frame: &str) -> Option<Value> {
    let data: Vec<&str> = frame
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim_start)
        .collect();
    if data.is_empty() {
        return None;
    }
    serde_json::from_str(&data.join("\n")).ok()
}

fn print_event(event: &Value) {
    let kind = event["kind"].as_str().unwrap_or("?");
    let message = event["message"].as_str().unwrap_or_default();
    match event.get("meta").and_then(Value::as_object) {
        Some(meta) if !meta.is_empty() => println!("[{kind}] {message} {}", Value::Object(meta.clone())),
        _ => println!("[{kind}] {message}"),
    }
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: server returned status {status}");
        eprintln!("Response: {}", text.trim_end());
        return Ok(());
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{text}"),
    }
    Ok(())
}
