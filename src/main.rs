mod cli;

use anyhow::Context;
use clap::ArgMatches;
use log::{debug, info};
use platform_clients::http::upstream_rate;
use platform_clients::reshape::{unwrap_envelope, DEFAULT_ENVELOPE_KEYS};
use platform_clients::{ErrorInfo, HttpClient, PlatformRegistry, RuntimeMode};
use serde_json::{json, Value};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let matches = cli::build_cli().get_matches();
    let log_level = matches.get_one::<String>("log-level").cloned();
    cli::init_logging(log_level.as_deref());

    if matches.get_flag("version") {
        println!("platform-clients {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let mode = RuntimeMode::from_env();
    let registry = PlatformRegistry::from_env();
    debug!("runtime mode {:?}", mode);

    match matches.subcommand() {
        Some(("platforms", _)) => {
            println!("{}", serde_json::to_string_pretty(&registry.statuses())?);
            Ok(())
        }
        Some(("request", sub)) => run_request(&registry, mode, sub).await,
        _ => {
            cli::build_cli().print_help()?;
            Ok(())
        }
    }
}

async fn run_request(
    registry: &PlatformRegistry,
    mode: RuntimeMode,
    sub: &ArgMatches,
) -> anyhow::Result<()> {
    let name = sub
        .get_one::<String>("platform")
        .context("missing platform")?;
    let opts = cli::request_options(sub)?;
    let unwrap = sub.get_flag("unwrap");

    let result = async {
        let (_, cfg) = registry.by_name(name)?;
        cfg.ensure_enabled()?;
        let client = HttpClient::new(cfg.clone(), mode)?;
        info!("{} {} {}", cfg.name, opts.method, opts.path);
        let resp = client.request::<Value>(opts).await?;
        let budget = client.rate_limiter().snapshot().await;
        Ok::<_, platform_clients::Error>((resp, budget))
    }
    .await;

    match result {
        Ok((resp, budget)) => {
            let rate = upstream_rate(&resp.headers);
            let resp = if unwrap {
                resp.map(|body| unwrap_envelope(body, &DEFAULT_ENVELOPE_KEYS))
            } else {
                resp
            };
            let out = json!({
                "response": resp,
                "rate": rate,
                "budget": {
                    "remaining": budget.remaining,
                    "limit": budget.limit,
                    "reset_at": budget.reset_at(),
                },
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
            Ok(())
        }
        Err(e) => {
            let out = json!({ "error": ErrorInfo::from(&e) });
            println!("{}", serde_json::to_string_pretty(&out)?);
            Err(e.into())
        }
    }
}
