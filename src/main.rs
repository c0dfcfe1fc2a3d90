//! appshelf
//!
//! Usage:
//!     appshelf list mobile
//!     appshelf upload desktop ./setup.exe --name setup.exe
//!     appshelf stats --search beta --json
//!     appshelf watch

mod display;

use crate::display::{format_size, print_files, print_view};
use appshelf_catalog::{
    Catalog, Category, FileEntry, Placer, RefreshReport, Refresher, Shelf, UploadRequest, UploadResponse, aggregate,
};
use appshelf_config::AppConfig;
use appshelf_storage::BackendHandle;
use appshelf_storage::backend::LocalBackend;
use clap::{ArgAction, Parser, Subcommand};
use derive_more::{Display, Error};
use exn::{OptionExt, ResultExt};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type Result<T> = std::result::Result<T, exn::Exn<ErrorKind>>;

#[derive(Debug, Display, Error)]
enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    #[display("could not open storage root {}", _0.display())]
    Storage(#[error(not(source))] PathBuf),
    #[display("catalog operation failed")]
    Catalog,
    #[display("could not read {}", _0.display())]
    Read(#[error(not(source))] PathBuf),
    #[display("could not write output")]
    Output,
    #[display("background refresh stopped unexpectedly")]
    Refresh,
}

#[derive(Parser, Debug)]
#[command(name = "appshelf", version, about = "Catalog and upload platform downloads")]
struct Cli {
    /// Config file (.toml, .yaml, .yml or .json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log more (repeatable)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan one category and list its files
    List {
        #[arg(value_parser = parse_category)]
        category: Category,
        #[arg(long)]
        json: bool,
    },
    /// Store a file in a category
    Upload {
        #[arg(value_parser = parse_category)]
        category: Category,
        file: PathBuf,
        /// Name to store the file under (defaults to the file's own name)
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Refresh once and print the (filtered) catalog with its statistics
    Stats {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Keep refreshing the catalog until interrupted
    Watch {
        #[arg(long)]
        search: Option<String>,
    },
}

fn parse_category(raw: &str) -> std::result::Result<Category, String> {
    raw.parse::<Category>().map_err(|err| (*err).to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let default_filter = match cli.verbose {
        0 => "appshelf=info",
        1 => "appshelf=debug",
        _ => "appshelf=trace",
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = AppConfig::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    let shelf = build_shelf(&config)?;
    match cli.command {
        Command::List { category, json } => {
            let files = shelf.list_files(category).await.or_raise(|| ErrorKind::Catalog)?;
            match json {
                true => print_json(&files)?,
                false => print_files(category, &files),
            }
            Ok(ExitCode::SUCCESS)
        },
        Command::Upload {
            category,
            file,
            name,
            json,
        } => upload(&shelf, category, file, name, json).await,
        Command::Stats { search, json } => {
            stats(&shelf, search, json).await?;
            Ok(ExitCode::SUCCESS)
        },
        Command::Watch { search } => {
            watch(shelf, &config, search).await?;
            Ok(ExitCode::SUCCESS)
        },
    }
}

fn build_shelf(config: &AppConfig) -> Result<Shelf> {
    let root = config.storage_root().or_raise(|| ErrorKind::Config)?;
    let registry = Arc::new(config.registry().or_raise(|| ErrorKind::Config)?);
    let local = LocalBackend::new("local", &root).or_raise(|| ErrorKind::Storage(root.clone()))?;
    let backend: BackendHandle = Arc::new(local);
    tracing::debug!(root = %root.display(), "Opened storage root");

    let catalog = Catalog::new(Arc::clone(&backend), Arc::clone(&registry)).with_timeout(config.timeout());
    let placer = Placer::new(backend, registry)
        .with_policy(config.upload.collision)
        .with_max_bytes(config.upload.max_bytes)
        .with_timeout(config.timeout());
    Ok(Shelf::from_parts(Arc::new(catalog), placer))
}

async fn upload(shelf: &Shelf, category: Category, file: PathBuf, name: Option<String>, json: bool) -> Result<ExitCode> {
    let name = match name {
        Some(name) => name,
        None => file
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_raise(|| ErrorKind::Read(file.clone()))?,
    };
    let content = tokio::fs::read(&file).await.or_raise(|| ErrorKind::Read(file.clone()))?;
    let result = shelf.upload(UploadRequest::new(category, name, content)).await;
    let response = match &result {
        Ok(_) => UploadResponse::ok(),
        Err(err) => UploadResponse::failed((**err).to_string()),
    };
    match (json, &result) {
        (true, _) => print_json(&response)?,
        (false, Ok(placed)) => println!("Stored {} ({})", placed.path.display(), format_size(placed.size)),
        (false, Err(_)) => eprintln!("Upload failed: {}", response.error.as_deref().unwrap_or_default()),
    }
    Ok(match response.success {
        true => ExitCode::SUCCESS,
        false => ExitCode::FAILURE,
    })
}

#[derive(Serialize)]
struct StatsOutput {
    search: String,
    files: BTreeMap<Category, Vec<FileEntry>>,
    stats: appshelf_catalog::Stats,
    failures: BTreeMap<Category, String>,
}

async fn stats(shelf: &Shelf, search: Option<String>, json: bool) -> Result<()> {
    let report = shelf.refresh().await;
    if let Some(search) = search {
        shelf.set_search(search).await;
    }
    let view = shelf.view().await;
    let stats = aggregate(&view);
    let failures: BTreeMap<_, _> = report.failures().map(|(category, err)| (category, (**err).to_string())).collect();
    if json {
        let files: BTreeMap<Category, Vec<FileEntry>> = view
            .iter()
            .map(|(category, records)| (category, records.iter().map(FileEntry::from).collect()))
            .collect();
        let search = shelf.search().await.to_string();
        return print_json(&StatsOutput {
            search,
            files,
            stats,
            failures,
        });
    }
    print_view(&view, &stats);
    for (category, error) in failures {
        eprintln!("warning: {category} could not be scanned, showing previous results: {error}");
    }
    Ok(())
}

async fn watch(shelf: Shelf, config: &AppConfig, search: Option<String>) -> Result<()> {
    if let Some(search) = search {
        shelf.set_search(search).await;
    }
    let refresher = Refresher::new(Arc::clone(shelf.catalog())).with_interval(config.refresh_interval());
    let token = refresher.cancellation_token();
    let (generations, mut refreshed) = tokio::sync::watch::channel(0);
    let task = tokio::spawn(refresher.run(move |report: &RefreshReport| {
        // The receiver only goes away once we're shutting down.
        let _ = generations.send(report.generation);
    }));

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(err) = signal {
                    tracing::error!(error = %err, "Could not listen for Ctrl-C");
                }
                break;
            },
            changed = refreshed.changed() => {
                if changed.is_err() {
                    break;
                }
                let search = shelf.search().await;
                let stats = shelf.stats().await;
                tracing::info!(
                    %search,
                    mobile = stats.count(Category::Mobile),
                    desktop = stats.count(Category::Desktop),
                    size = %format_size(stats.total_size_bytes),
                    "Catalog updated"
                );
            },
        }
    }
    token.cancel();
    let refreshes = task.await.or_raise(|| ErrorKind::Refresh)?;
    tracing::info!(refreshes, "Stopped watching");
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let output = serde_json::to_string_pretty(value).or_raise(|| ErrorKind::Output)?;
    println!("{output}");
    Ok(())
}
