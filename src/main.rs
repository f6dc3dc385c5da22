use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use url::Url;

use feedscan::config::Config;
use feedscan::feed::{
    self, build_client, fetch, parse, parse_reader, to_atom, to_json, to_rss2, Feed, FetchOutcome,
    ParseOptions,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Rss2,
    Atom,
}

#[derive(Parser, Debug)]
#[command(
    name = "feedscan",
    version,
    about = "Extract titles, links, and dates from RSS/Atom feeds, even malformed ones"
)]
struct Args {
    /// Feed file, `-` for stdin, or an http(s) URL
    source: String,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Json)]
    format: Format,

    /// Collect every occurrence of an entry tag (repeatable)
    #[arg(long = "array-tag", value_name = "TAG")]
    array_tags: Vec<String>,

    /// Only keep the N most recent entries
    #[arg(long, value_name = "N")]
    latest: Option<usize>,

    /// Config file (default: ~/.config/feedscan/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// ETag from a previous fetch, sent as If-None-Match
    #[arg(long, value_name = "VALUE")]
    etag: Option<String>,

    /// Last-Modified from a previous fetch, sent as If-Modified-Since
    #[arg(long, value_name = "VALUE")]
    last_modified: Option<String>,

    /// Fail on redirects instead of following them
    #[arg(long)]
    no_redirects: bool,
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let path = match path {
        Some(path) => path.clone(),
        None => match Config::default_path() {
            Some(path) => path,
            None => return Ok(Config::default()),
        },
    };
    Config::load(&path).with_context(|| format!("Failed to load config: {}", path.display()))
}

fn http_url(source: &str) -> Option<Url> {
    Url::parse(source)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
}

async fn read_feed(
    args: &Args,
    config: &Config,
    parse_options: ParseOptions,
) -> Result<Option<Feed>> {
    if let Some(url) = http_url(&args.source) {
        let mut options = config.fetch_options();
        options.parse = parse_options;
        options.etag = args.etag.clone();
        options.last_modified = args.last_modified.clone();
        if args.no_redirects {
            options.follow_redirects = false;
        }

        let client = build_client(config.user_agent.as_deref())
            .context("Failed to build HTTP client")?;
        let outcome = fetch(&client, url.as_str(), &options)
            .await
            .with_context(|| format!("Failed to fetch {url}"))?;
        return Ok(match outcome {
            FetchOutcome::Fetched(feed) => Some(feed),
            FetchOutcome::NotModified => None,
        });
    }

    let feed = if args.source == "-" {
        parse_reader(std::io::stdin().lock(), &parse_options)
            .context("Failed to parse feed from stdin")?
    } else {
        let bytes = std::fs::read(&args.source)
            .with_context(|| format!("Failed to read {}", args.source))?;
        parse(bytes, &parse_options)
            .with_context(|| format!("Failed to parse {}", args.source))?
    };
    Ok(Some(feed))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays clean for the feed output
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = load_config(args.config.as_ref())?;
    feed::set_default_schema(config.schema());

    let mut parse_options = config.parse_options();
    parse_options.array_tags.extend(args.array_tags.iter().cloned());

    let Some(mut feed) = read_feed(&args, &config, parse_options).await? else {
        eprintln!("Not modified: {}", args.source);
        return Ok(());
    };

    if let Some(etag) = feed.etag() {
        eprintln!("ETag: {etag}");
    }
    if let Some(last_modified) = feed.last_modified() {
        eprintln!("Last-Modified: {last_modified}");
    }

    if let Some(count) = args.latest {
        let entries = feed.latest(count).into_iter().cloned().collect();
        feed = Feed::new(feed.fields().clone(), entries);
    }

    let output = match args.format {
        Format::Json => to_json(&feed).context("Failed to encode JSON")?,
        Format::Rss2 => to_rss2(&feed),
        Format::Atom => to_atom(&feed),
    };
    println!("{output}");
    Ok(())
}
