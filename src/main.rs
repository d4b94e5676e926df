use anyhow::{Context, Result, anyhow};
use calltrace::cli::{self, MethodArgs};
use calltrace::model::{FileId, Symbol};
use calltrace::{Config, Session, watch, workspace};
use clap::Parser;
use serde::Serialize;
use serde_json::json;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();
    init_tracing(args.verbose, args.log_json);
    let config_path = args.config.as_deref();

    match args.command {
        cli::Command::Index { repo } => {
            let (session, _) = open_session(&repo, config_path)?;
            let report = session.ensure_indexed().await;
            print_json(&json!({
                "report": report,
                "statistics": session.cache_statistics(),
            }))
        }
        cli::Command::Stats { repo } => {
            let (session, _) = open_session(&repo, config_path)?;
            session.ensure_indexed().await;
            print_json(&session.cache_statistics())
        }
        cli::Command::Outline { repo, file } => {
            let (session, root) = open_session(&repo, config_path)?;
            let file = file_id(&root, &file)?;
            let symbols = session.symbols(&file).await;
            if symbols.is_empty() {
                return Err(anyhow!("no symbols for {file}"));
            }
            print_json(&symbols)
        }
        cli::Command::Callers(target) => {
            let (session, root) = open_session(&target.repo, config_path)?;
            let (file, symbol) = locate(&session, &root, &target).await?;
            let depth = target.depth.unwrap_or(session.config().max_depth);
            let tree = session
                .analyze_backward(&symbol, &file, depth)
                .await
                .ok_or_else(|| anyhow!("caller analysis failed for {}", target.method))?;
            print_json(&tree)
        }
        cli::Command::Callees(target) => {
            let (session, root) = open_session(&target.repo, config_path)?;
            let (file, symbol) = locate(&session, &root, &target).await?;
            let depth = target.depth.unwrap_or(session.config().max_depth);
            let analysis = session
                .analyze_forward(&symbol, &file, depth)
                .await
                .ok_or_else(|| anyhow!("callee analysis failed for {}", target.method))?;
            print_json(&analysis)
        }
        cli::Command::Watch {
            repo,
            debounce_ms,
            batch_max,
        } => {
            let (session, root) = open_session(&repo, config_path)?;
            let session = Arc::new(session);
            session.ensure_indexed().await;
            let handle = watch::start(
                session.clone(),
                &root,
                watch::WatchConfig::new(debounce_ms, batch_max),
            )?;
            tokio::signal::ctrl_c()
                .await
                .context("wait for interrupt")?;
            handle.stop().await;
            let stats = session.cache_statistics();
            tracing::info!(
                files = stats.total_files,
                methods = stats.total_method_definitions,
                references = stats.total_references,
                "watch stopped"
            );
            session.teardown().await;
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn open_session(repo: &Path, config_path: Option<&Path>) -> Result<(Session, PathBuf)> {
    let root = std::fs::canonicalize(repo)
        .with_context(|| format!("open repo {}", repo.display()))?;
    let config = Config::load(&root, config_path)?;
    let host = workspace::filesystem_host(&root);
    Ok((Session::new(host, config), root))
}

fn file_id(root: &Path, file: &Path) -> Result<FileId> {
    if file.is_absolute() {
        let rel = calltrace::util::normalize_rel_path(root, file)?;
        return Ok(FileId::new(rel));
    }
    Ok(FileId::from_path(file))
}

async fn locate(session: &Session, root: &Path, target: &MethodArgs) -> Result<(FileId, Symbol)> {
    let file = file_id(root, &target.file)?;
    let line = target.line.map(|line| line.saturating_sub(1));
    let symbol = session
        .find_method(&file, &target.method, line)
        .await
        .ok_or_else(|| anyhow!("method {} not found in {file}", target.method))?;
    Ok((file, symbol))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
