//! # RKV Command Line
//!
//! Purpose: Send one command to a RESP server through `rkv-client`, or stay
//! subscribed to channels and print what arrives.
//!
//! ## Design Principles
//! 1. **Thin Harness**: Every request goes through `Client::query`; the CLI
//!    only parses arguments and prints replies.
//! 2. **Environment Configuration**: `RKV_CONFIG` points at a JSON config
//!    file; otherwise `RKV_ADDR`, `RKV_PASSWORD` and `RKV_CONNECT_TIMEOUT_MS`
//!    are read.
//!
//! Usage:
//!   rkv-cli [--json] <command> [args...]
//!   rkv-cli [--json] subscribe <channel> [channel...]

use std::env;
use std::fs;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use tracing::{debug, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use rkv_client::{Client, ClientConfig, Command, Reply};

const CONFIG_ENV: &str = "RKV_CONFIG";

#[derive(Debug, PartialEq, Eq)]
enum Mode {
    Query { name: String, args: Vec<String> },
    Subscribe { channels: Vec<String> },
}

#[derive(Debug, PartialEq, Eq)]
struct Invocation {
    json: bool,
    mode: Mode,
}

impl Invocation {
    fn from_args() -> Result<Self> {
        Self::parse(env::args().skip(1))
    }

    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut args = args.into_iter().peekable();
        let json = args.next_if(|arg| arg == "--json").is_some();
        let Some(name) = args.next() else {
            bail!("usage: rkv-cli [--json] <command> [args...]");
        };
        let rest: Vec<String> = args.collect();

        let mode = if name.eq_ignore_ascii_case("subscribe") {
            if rest.is_empty() {
                bail!("subscribe expects at least one channel");
            }
            Mode::Subscribe { channels: rest }
        } else {
            Mode::Query { name, args: rest }
        };
        Ok(Invocation { json, mode })
    }
}

fn load_config() -> Result<ClientConfig> {
    match env::var(CONFIG_ENV) {
        Ok(path) => {
            let raw = fs::read_to_string(&path).with_context(|| format!("reading config {}", path))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path))
        }
        Err(_) => Ok(ClientConfig::from_env()),
    }
}

fn render(reply: &Reply, json: bool) -> Result<String> {
    if json {
        Ok(serde_json::to_string(reply)?)
    } else {
        Ok(reply.to_string())
    }
}

/// Error replies are printed like any reply but fail the process.
fn is_failure(reply: &Reply) -> bool {
    matches!(reply, Reply::Error(_))
}

async fn run_query(client: &Client, name: String, args: Vec<String>, json: bool) -> Result<ExitCode> {
    let command = Command::new(name).args(args);
    debug!(command = command.name(), "sending");
    let reply = client.query(&command).await?;
    println!("{}", render(&reply, json)?);
    if is_failure(&reply) {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

async fn run_subscribe(client: &Client, channels: Vec<String>, json: bool) -> Result<ExitCode> {
    let mut subscriber = client.subscribe(channels).await?;
    info!("subscribed; press ctrl-c to stop");
    loop {
        tokio::select! {
            message = subscriber.message() => {
                let message = message?;
                if json {
                    let line = serde_json::json!({
                        "channel": message.channel,
                        "payload": message.payload,
                    });
                    println!("{}", line);
                } else {
                    println!("{} {}", message.channel, message.payload);
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    subscriber.close().await?;
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    let invocation = Invocation::from_args()?;
    let config = load_config()?;
    debug!(addr = %config.addr, "using server");
    let client = Client::create(config);

    match invocation.mode {
        Mode::Query { name, args } => run_query(&client, name, args, invocation.json).await,
        Mode::Subscribe { channels } => run_subscribe(&client, channels, invocation.json).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn parses_plain_query() {
        let invocation = Invocation::parse(args(&["set", "k", "v"])).unwrap();
        assert!(!invocation.json);
        assert_eq!(
            invocation.mode,
            Mode::Query {
                name: "set".to_string(),
                args: args(&["k", "v"]),
            }
        );
    }

    #[test]
    fn parses_json_subscribe() {
        let invocation = Invocation::parse(args(&["--json", "SUBSCRIBE", "news"])).unwrap();
        assert!(invocation.json);
        assert_eq!(invocation.mode, Mode::Subscribe { channels: args(&["news"]) });
    }

    #[test]
    fn rejects_missing_command_and_channels() {
        assert!(Invocation::parse(args(&[])).is_err());
        assert!(Invocation::parse(args(&["--json"])).is_err());
        assert!(Invocation::parse(args(&["subscribe"])).is_err());
    }

    #[test]
    fn error_reply_fails_the_process() {
        assert!(is_failure(&Reply::Error("ERR nope".into())));
        assert!(!is_failure(&Reply::Status("OK".into())));
        assert!(!is_failure(&Reply::Nil));
    }

    #[test]
    fn renders_json_and_text() {
        let reply = Reply::Array(vec![Reply::Bulk("a".into()), Reply::Nil]);
        assert_eq!(render(&reply, true).unwrap(), r#"["a",null]"#);
        assert!(render(&reply, false).unwrap().contains("\"a\""));
    }
}
