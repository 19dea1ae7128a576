use anyhow::{bail, Context};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use platform_clients::RequestOptions;
use reqwest::Method;
use std::time::Duration;

pub fn build_cli() -> Command {
    Command::new("platform-clients")
        .about("Call SaaS platform APIs through the shared safe HTTP client")
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .num_args(1)
                .help("Override RUST_LOG level (e.g., info, debug)"),
        )
        .arg(
            Arg::new("version")
                .long("version")
                .help("Print version and exit")
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("platforms")
                .about("List known platforms with enabled and credential status"),
        )
        .subcommand(
            Command::new("request")
                .about("Send one request to a platform and print the response envelope")
                .arg(Arg::new("platform").required(true).help("Platform name, e.g. github"))
                .arg(Arg::new("path").required(true).help("Path relative to the base URL"))
                .arg(
                    Arg::new("method")
                        .long("method")
                        .short('X')
                        .default_value("GET"),
                )
                .arg(
                    Arg::new("query")
                        .long("query")
                        .short('q')
                        .action(ArgAction::Append)
                        .help("Query pair key=value (repeatable)"),
                )
                .arg(
                    Arg::new("header")
                        .long("header")
                        .short('H')
                        .action(ArgAction::Append)
                        .help("Extra header 'Name: value' (repeatable)"),
                )
                .arg(Arg::new("body").long("body").short('d').help("JSON request body"))
                .arg(
                    Arg::new("unwrap")
                        .long("unwrap")
                        .help("Print only the `data`/`result` field of an enveloped body")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("timeout-secs")
                        .long("timeout-secs")
                        .value_parser(value_parser!(u64)),
                ),
        )
}

pub fn init_logging(level: Option<&str>) {
    // Explicit level wins; otherwise RUST_LOG, defaulting to info.
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(lvl) = level {
        builder.parse_filters(lvl);
    }
    builder.init();
}

/// Turns the `request` subcommand's arguments into [`RequestOptions`].
pub fn request_options(sub: &ArgMatches) -> anyhow::Result<RequestOptions> {
    let method = sub
        .get_one::<String>("method")
        .map(|m| m.to_ascii_uppercase())
        .unwrap_or_else(|| "GET".to_string());
    let method = Method::from_bytes(method.as_bytes())
        .with_context(|| format!("invalid HTTP method {method}"))?;
    let path = sub
        .get_one::<String>("path")
        .context("missing path")?
        .clone();

    let mut opts = RequestOptions::new(method, path);
    for raw in sub.get_many::<String>("query").into_iter().flatten() {
        let (k, v) = split_pair(raw, '=')?;
        opts = opts.query(k, v);
    }
    for raw in sub.get_many::<String>("header").into_iter().flatten() {
        let (k, v) = split_pair(raw, ':')?;
        opts = opts.header(k, v);
    }
    if let Some(body) = sub.get_one::<String>("body") {
        let value: serde_json::Value =
            serde_json::from_str(body).context("--body must be valid JSON")?;
        opts = opts.body(value);
    }
    if let Some(secs) = sub.get_one::<u64>("timeout-secs") {
        opts = opts.timeout(Duration::from_secs(*secs));
    }
    Ok(opts)
}

fn split_pair(raw: &str, sep: char) -> anyhow::Result<(String, String)> {
    let Some((k, v)) = raw.split_once(sep) else {
        bail!("expected `key{sep}value`, got `{raw}`");
    };
    let k = k.trim();
    if k.is_empty() {
        bail!("empty key in `{raw}`");
    }
    Ok((k.to_string(), v.trim().to_string()))
}
