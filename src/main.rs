use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use homedir::my_home;

mod cli;
mod config;
mod extract;
mod lock;
mod progress;
mod semantic;
mod storage;
#[cfg(test)]
mod tests;

use config::Config;
use progress::{BarProgress, CancelToken};
use semantic::{CacheStatus, SearchService};

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Base directory for config and downloaded models
fn base_path() -> anyhow::Result<PathBuf> {
    if let Ok(path) = std::env::var("DOCSEEK_BASE_PATH") {
        return Ok(PathBuf::from(path));
    }

    let home = my_home()
        .context("Could not determine home directory")?
        .context("Home directory path is empty")?;
    Ok(home.join(".local/share/docseek"))
}

/// Cancel token tripped by Ctrl-C; rebuilds stop before the next file.
fn cancel_on_ctrl_c() -> anyhow::Result<CancelToken> {
    let cancel = CancelToken::new();
    let handle = cancel.clone();
    ctrlc::set_handler(move || {
        log::warn!("interrupt received, stopping after the current document");
        handle.cancel();
    })
    .context("failed to install Ctrl+C handler")?;
    Ok(cancel)
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let args = cli::Args::parse();

    let base_path = base_path()?;

    match args.command {
        cli::Command::Search {
            query,
            dir_args,
            limit,
            json,
        } => {
            let root = dir_args.resolve().context("invalid directory")?;
            let config = Config::load_with(&base_path)?;
            let mut service = SearchService::from_config(&config, &base_path)?;
            if let Some(limit) = limit {
                let mut options = service.options();
                options.top_k = limit;
                service = service.with_options(options);
            }

            let cancel = cancel_on_ctrl_c()?;
            let hits = service
                .search(&query, &root, &mut BarProgress::new(), &cancel)
                .with_context(|| format!("search in {} failed", root.display()))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&hits)?);
                return Ok(());
            }

            if hits.is_empty() {
                println!("No documents found in {}", root.display());
                return Ok(());
            }

            for hit in hits {
                println!("File: {}", hit.path.display());
                println!("Score: {:.4}", hit.score);
                println!("Preview: {}\n", hit.preview);
            }
            Ok(())
        }

        cli::Command::Index { dir_args } => {
            let root = dir_args.resolve().context("invalid directory")?;
            let config = Config::load_with(&base_path)?;
            let service = SearchService::from_config(&config, &base_path)?;

            let cancel = cancel_on_ctrl_c()?;
            let (corpus, status) = service
                .index(&root, &mut BarProgress::new(), &cancel)
                .with_context(|| format!("indexing {} failed", root.display()))?;

            match status {
                CacheStatus::Hit => println!("{} documents, cache up to date", corpus.len()),
                CacheStatus::Rebuilt => println!("{} documents indexed", corpus.len()),
            }
            Ok(())
        }

        cli::Command::Clear { dir_args } => {
            let root = dir_args.resolve().context("invalid directory")?;
            SearchService::clear(&root)
                .with_context(|| format!("failed to clear cache of {}", root.display()))?;
            println!("Cache cleared for {}", root.display());
            Ok(())
        }
    }
}
