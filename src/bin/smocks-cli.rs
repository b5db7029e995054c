use std::error::Error;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, COOKIE};
use reqwest::Url;
use serde_json::{json, Map, Value};

#[derive(Parser)]
#[command(name = "smocks-cli")]
#[command(about = "Admin CLI for the smocks mock server", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8000")]
    url: String,

    /// Admin API prefix.
    #[arg(long, default_value = "/_admin")]
    prefix: String,

    /// Admin bearer key, when the server requires one.
    #[arg(short, long)]
    key: Option<String>,

    /// Session to act on; sent both as header and as cookie.
    #[arg(short, long)]
    session: Option<String>,

    #[arg(long, default_value = "x-smocks-session")]
    header_name: String,

    #[arg(long, default_value = "smocks-session")]
    cookie_name: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Engine summary
    Status,
    /// Full state of the session
    State,
    /// Pin a variant of a route
    Select { route: String, variant: String },
    /// Drop the pinned variant of a route
    Clear { route: String },
    /// Set route inputs (`name=value`, value parsed as JSON when possible)
    RouteInput { route: String, values: Vec<String> },
    /// Set one plugin input (value parsed as JSON when possible)
    Input { plugin: String, input: String, value: String },
    /// Apply a profile
    Profile { id: String },
    /// Run an action with optional JSON input
    Action { id: String, input: Option<String> },
    /// Reset route state and plugin input
    Reset,
    /// Replay a recorded HAR call
    Har { id: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let headers = cli.headers()?;

    let request = match &cli.command {
        Commands::Status => client.get(cli.endpoint(&["status"])?),
        Commands::State => client.get(cli.endpoint(&["state"])?),
        Commands::Select { route, variant } => client
            .post(cli.endpoint(&["route", route.as_str()])?)
            .json(&json!({ "variant": variant })),
        Commands::Clear { route } => client
            .post(cli.endpoint(&["route", route.as_str()])?)
            .json(&json!({ "clear": true })),
        Commands::RouteInput { route, values } => client
            .post(cli.endpoint(&["route", route.as_str()])?)
            .json(&json!({ "input": parse_pairs(values)? })),
        Commands::Input { plugin, input, value } => client
            .post(cli.endpoint(&["global", "input", plugin.as_str()])?)
            .json(&json!({ "id": input, "value": parse_value(value) })),
        Commands::Profile { id } => client.post(cli.endpoint(&["profile", id.as_str()])?),
        Commands::Action { id, input } => {
            let request = client.post(cli.endpoint(&["action", id.as_str()])?);
            match input {
                Some(input) => request.json(&serde_json::from_str::<Value>(input)?),
                None => request,
            }
        }
        Commands::Reset => client.post(cli.endpoint(&["reset"])?),
        Commands::Har { id } => client.get(cli.endpoint(&["har", id.as_str()])?),
    };

    let res = request.headers(headers).send().await?;
    print_response(res).await?;
    Ok(())
}

impl Cli {
    fn endpoint(&self, segments: &[&str]) -> Result<Url, Box<dyn Error>> {
        let mut url = Url::parse(&self.url)?;
        {
            let mut path = url.path_segments_mut().map_err(|_| "server URL cannot carry a path")?;
            path.pop_if_empty();
            path.extend(self.prefix.split('/').filter(|s| !s.is_empty()));
            path.extend(segments);
        }
        Ok(url)
    }

    fn headers(&self) -> Result<HeaderMap, Box<dyn Error>> {
        let mut headers = HeaderMap::new();
        if let Some(key) = &self.key {
            headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", key))?);
        }
        if let Some(session) = &self.session {
            headers.insert(
                reqwest::header::HeaderName::from_bytes(self.header_name.as_bytes())?,
                HeaderValue::from_str(session)?,
            );
            headers.insert(COOKIE, HeaderValue::from_str(&format!("{}={}", self.cookie_name, session))?);
        }
        Ok(headers)
    }
}

fn parse_pairs(values: &[String]) -> Result<Map<String, Value>, Box<dyn Error>> {
    let mut map = Map::new();
    for pair in values {
        let (name, raw) = pair
            .split_once('=')
            .ok_or_else(|| format!("expected name=value, got \"{}\"", pair))?;
        map.insert(name.to_string(), parse_value(raw));
    }
    Ok(map)
}

fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
