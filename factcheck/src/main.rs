/*
factcheck - command-line entry point.
Fact-checks a single claim, lists top headlines (optionally checking each one), or serves the HTTP API.
*/

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use common::{read_secret, Config};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use factcheck::headlines::{HeadlinesQuery, NewsClient};
use factcheck::server::{launch_rocket, AppState};
use factcheck::{Credentials, FactChecker};

#[derive(Parser, Debug)]
#[command(name = "factcheck", about = "Fact-check claims against web search evidence")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fact-check one claim and print the verdict as JSON
    Check {
        /// Claim or headline to verify
        claim: String,
    },
    /// List top headlines from NewsAPI
    Headlines {
        #[arg(long)]
        country: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        page_size: Option<u32>,
        /// Fact-check every headline title, one after another
        #[arg(long)]
        check: bool,
    },
    /// Run the HTTP API
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; logs go to stderr so JSON output on stdout stays clean
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    if dotenv::dotenv().is_ok() {
        info!(".env file loaded");
    }

    let config = load_config(args.config).await?;
    let credentials = Credentials {
        gemini_api_key: read_secret(config.llm.api_key_env()),
        serper_api_key: read_secret(config.search.api_key_env()),
    };
    let checker = FactChecker::from_config(&config, credentials);

    match args.command {
        Command::Check { claim } => {
            let result = checker.check(&claim).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Headlines {
            country,
            category,
            page,
            page_size,
            check,
        } => {
            let client = news_client(&config)?.context("NewsAPI key not configured")?;
            let query = HeadlinesQuery {
                country: country.unwrap_or_else(|| config.news.country().to_string()),
                category: category.unwrap_or_else(|| config.news.category().to_string()),
                page,
                page_size: page_size.unwrap_or_else(|| config.news.page_size()),
            };
            let headlines = client.top_headlines(&query).await?;

            for (i, article) in headlines.articles.iter().enumerate() {
                let title = article.title.as_deref().unwrap_or("(untitled)");
                let source = article
                    .source
                    .as_ref()
                    .and_then(|s| s.name.as_deref())
                    .unwrap_or("unknown source");
                println!("{}. {} [{}]", i + 1, title, source);

                if check && article.title.is_some() {
                    let result = checker.check(title).await;
                    println!("   -> {}: {}", result.final_verdict, result.reasoning);
                }
            }
            println!("{} of {} headlines", headlines.articles.len(), headlines.total_results);
        }
        Command::Serve => {
            let news = news_client(&config)?.map(Arc::new);
            let state = AppState {
                started_at: Utc::now(),
                config: Arc::new(config),
                checker,
                news,
            };
            if let Err(e) = launch_rocket(state).await {
                error!(%e, "Rocket server failed");
                return Err(e);
            }
        }
    }

    Ok(())
}

/// Resolve config paths: config.default.toml, then --config or ./config.toml on top.
async fn load_config(explicit: Option<PathBuf>) -> Result<Config> {
    let default_path = PathBuf::from("config.default.toml");

    let override_path = if let Some(p) = explicit {
        if !p.exists() {
            error!(path = ?p, "specified config file not found");
            return Err(anyhow::anyhow!("Config file not found: {}", p.display()));
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() { Some(p) } else { None }
    };

    let config = Config::load_with_defaults(
        if default_path.exists() { Some(&default_path) } else { None },
        override_path.as_deref(),
    )
    .await?;
    info!(default = ?default_path, override = ?override_path, "configuration loaded");
    Ok(config)
}

fn news_client(config: &Config) -> Result<Option<NewsClient>> {
    match read_secret(config.news.api_key_env()) {
        Some(key) => Ok(Some(NewsClient::new(
            config.news.api_url(),
            key,
            config.news.timeout_seconds(),
        )?)),
        None => {
            warn!("{} not set; headlines are unavailable", config.news.api_key_env());
            Ok(None)
        }
    }
}
