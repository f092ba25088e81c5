//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `wayback_harvest` library that handles:
//! - Command-line argument parsing
//! - Logger initialization
//! - Reading URL and proxy lists
//! - Printing results as JSON on stdout
//!
//! All core functionality is implemented in the library crate.

use std::io::Read;
use std::path::Path;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;

use wayback_harvest::cdx::{IndexClient, ResumeKeyIterator, SortType};
use wayback_harvest::config::{
    Cli, Command, DownloadArgs, DownloadOptions, FailurePolicy, IndexClientConfig, MetadataArgs,
    RetryPolicy, SearchArgs,
};
use wayback_harvest::download::{convert_to_id_url, ParallelDownloader, ProxyPool};
use wayback_harvest::initialization::init_logger_with;
use wayback_harvest::metadata::{get_wayback_metadata, BoundStrategy, MetadataOptions};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logger_with(cli.log_level.clone().into(), cli.log_format.clone())
        .context("Failed to initialize logger")?;

    let index_config = IndexClientConfig {
        endpoint: cli.endpoint.clone(),
        auth_token: cli.auth_token.clone(),
        user_agent: cli.user_agent.clone(),
        ..Default::default()
    };

    let outcome = match cli.command {
        Command::Metadata(args) => run_metadata(index_config, args).await,
        Command::Search(args) => run_search(index_config, args).await,
        Command::Download(args) => run_download(&cli.user_agent, args).await,
    };

    match outcome {
        Ok(true) => Ok(()),
        Ok(false) => process::exit(2),
        Err(e) => {
            eprintln!("wayback_harvest error: {:#}", e);
            process::exit(1);
        }
    }
}

async fn run_metadata(config: IndexClientConfig, args: MetadataArgs) -> Result<bool> {
    let client = IndexClient::new(config).context("Failed to initialize index client")?;
    let options = MetadataOptions {
        from: args.from,
        to: args.to,
        collapse: Some(args.collapse).filter(|c| !c.is_empty()),
        bounds: if args.dedicated_bounds {
            BoundStrategy::DedicatedQueries
        } else {
            BoundStrategy::FromSnapshots
        },
    };
    let metadata = get_wayback_metadata(&client, &args.url, &options).await?;
    println!("{}", serde_json::to_string_pretty(&metadata)?);
    Ok(true)
}

async fn run_search(config: IndexClientConfig, args: SearchArgs) -> Result<bool> {
    let client = IndexClient::new(config).context("Failed to initialize index client")?;

    let mut builder = client.query(&args.url);
    if let Some(match_type) = args.match_type {
        builder = builder.match_type(match_type);
    }
    if let Some(from) = &args.from {
        builder = builder.from_date(from);
    }
    if let Some(to) = &args.to {
        builder = builder.to_date(to);
    }
    if let Some(limit) = args.limit {
        builder = builder.limit(limit);
    }
    for filter in &args.filters {
        builder = builder.filter(filter);
    }
    for key in &args.collapse {
        builder = builder.collapse(key);
    }
    if let Some(sort) = args.sort {
        builder = builder.sort(sort);
    }
    if let Some(closest) = &args.closest {
        builder = builder.closest(closest);
    }
    if let Some(fields) = &args.fields {
        builder = builder.fields(fields.split(',').map(str::trim));
    }
    let spec = builder.build()?;

    if args.all {
        let mut batches = ResumeKeyIterator::new(client, spec, args.batch_size)?;
        while let Some(batch) = batches.next_batch().await? {
            for record in batch {
                println!("{}", serde_json::to_string(&record)?);
            }
        }
        return Ok(true);
    }

    let records = if spec.sort() == Some(SortType::Closest) {
        client.closest_captures(&spec).await?
    } else {
        client.search(&spec).await?
    };
    for record in records {
        println!("{}", serde_json::to_string(&record)?);
    }
    Ok(true)
}

async fn run_download(user_agent: &str, args: DownloadArgs) -> Result<bool> {
    let urls = read_url_list(&args.file)?;
    let urls = if args.raw {
        urls.iter()
            .map(String::as_str)
            .map(convert_to_id_url)
            .collect::<wayback_harvest::Result<Vec<_>>>()?
    } else {
        urls
    };

    let options = DownloadOptions {
        user_agent: user_agent.to_string(),
        timeout: Duration::from_secs(args.timeout_seconds),
        stream: args.stream,
        workers: args.jobs,
        failure_policy: if args.fail_fast {
            FailurePolicy::FailFast
        } else {
            FailurePolicy::Isolate
        },
        retry: RetryPolicy {
            max_attempts: args.attempts,
            ..Default::default()
        },
        ..Default::default()
    };

    let mut downloader = ParallelDownloader::new(options);
    if let Some(path) = &args.proxies {
        let pool = ProxyPool::load_file(path)?;
        if !pool.is_empty() {
            downloader = downloader.with_proxy_pool(Arc::new(pool));
        }
    }

    if let Some(dir) = &args.out_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    }

    let outcomes = downloader.run(urls).await?;
    let mut all_ok = true;
    for outcome in &outcomes {
        let summary = match &outcome.result {
            Ok(response) => {
                let saved = match &args.out_dir {
                    Some(dir) => {
                        let path = dir.join(format!("{:05}.html", outcome.index));
                        std::fs::write(&path, &response.body)
                            .with_context(|| format!("Failed to write {}", path.display()))?;
                        Some(path.display().to_string())
                    }
                    None => None,
                };
                json!({
                    "index": outcome.index,
                    "url": outcome.url,
                    "status": response.status,
                    "attempts": outcome.attempts,
                    "bytes": response.body.len(),
                    "saved_to": saved,
                })
            }
            Err(e) => {
                all_ok = false;
                json!({
                    "index": outcome.index,
                    "url": outcome.url,
                    "attempts": outcome.attempts,
                    "error": e.to_string(),
                })
            }
        };
        println!("{summary}");
    }
    Ok(all_ok)
}

fn read_url_list(path: &Path) -> Result<Vec<String>> {
    let content = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read URLs from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read URL list {}", path.display()))?
    };
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}
