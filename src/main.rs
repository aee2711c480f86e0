use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use url::Url;

use logscope::config::Config;
use logscope::export::{ExportFormat, FileSink};
use logscope::store::{JsonFileStore, MemoryStore, SessionStore};
use logscope::types::{LogRecord, Platform, Status};
use logscope::{FilterKey, LogApiClient, PlatformCatalog, ViewController};

/// Logscope - browse and live-tail logs across heterogeneous platforms
#[derive(Parser, Debug)]
#[command(name = "logscope")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Platform to read from (aws, azure, gcp, els, local, file)
    #[arg(value_name = "PLATFORM")]
    platform: Option<Platform>,

    /// Base URL of the log backend (overrides the config file)
    #[arg(long)]
    api_url: Option<String>,

    /// Bearer token for authenticated platforms (overrides the config file)
    #[arg(long)]
    token: Option<String>,

    /// Log group (required for aws/azure/gcp/els)
    #[arg(long)]
    log_group: Option<String>,

    /// Log type (required for local)
    #[arg(long)]
    log_type: Option<String>,

    /// File path (required for file)
    #[arg(long)]
    file_path: Option<String>,

    /// Minimum log level filter (INFO, WARN, ERROR, DEBUG)
    #[arg(long)]
    level: Option<String>,

    /// Free-text keyword filter
    #[arg(long)]
    keyword: Option<String>,

    /// Start of the time window (ISO-8601; default one hour ago)
    #[arg(long)]
    start_date: Option<String>,

    /// End of the time window (ISO-8601; default now)
    #[arg(long)]
    end_date: Option<String>,

    /// Follow the log stream instead of fetching history
    #[arg(short, long)]
    follow: bool,

    /// Page to display
    #[arg(long, default_value = "1")]
    page: usize,

    /// Records per page
    #[arg(long)]
    page_size: Option<usize>,

    /// Export the result set instead of printing it (json or csv)
    #[arg(long, value_name = "FORMAT")]
    export: Option<ExportFormat>,

    /// Directory for exported files
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// List available platforms and exit
    #[arg(long)]
    list_platforms: bool,

    /// List log groups for the platform and exit
    #[arg(long)]
    list_groups: bool,

    /// List log types for the platform and exit
    #[arg(long)]
    list_types: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing for debugging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = run_app(args).await;

    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    result
}

async fn run_app(args: Args) -> Result<()> {
    let config = Config::load();
    let api_url = args.api_url.as_deref().unwrap_or_else(|| config.api_url());
    let base = Url::parse(api_url).context("invalid API base URL")?;
    let token = args.token.clone().or_else(|| config.token.clone());

    let client = Arc::new(LogApiClient::new(base, token.clone()));

    if args.list_platforms {
        for platform in client.get_platforms().await? {
            println!("{:<8} {}", platform.id, platform.name);
        }
        return Ok(());
    }

    let platform = args
        .platform
        .context("a platform is required (try --list-platforms)")?;

    if args.list_groups {
        for group in client.get_log_groups(platform).await? {
            println!("{}", group.name);
        }
        return Ok(());
    }
    if args.list_types {
        for log_type in client.get_log_types(platform).await? {
            println!("{}", log_type);
        }
        return Ok(());
    }

    let store: Box<dyn SessionStore> = match JsonFileStore::default_path() {
        Some(path) => Box::new(JsonFileStore::new(path)),
        None => Box::new(MemoryStore::new()),
    };

    let mut controller = ViewController::new(client.clone(), client, store, token);
    controller.init();
    controller.select_platform(platform);
    if let Some(page_size) = args.page_size.or(config.page_size) {
        controller.set_page_size(page_size);
    }

    let raw = raw_filters(&args);

    if args.follow {
        controller.apply_filters(raw)?;
        controller.toggle_tailing()?;
        follow(&mut controller).await;
        controller.destroy();
        return Ok(());
    }

    controller.apply_filters(raw)?;
    loop {
        controller.process_events();
        if controller.status() != Status::Loading {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    match controller.status() {
        Status::Error(detail) => anyhow::bail!(detail),
        Status::AuthRequired => {
            anyhow::bail!("authentication required: configure a token in ~/.logscope/config.toml")
        }
        _ => {}
    }

    if let Some(format) = args.export {
        let sink = FileSink::new(&args.out_dir);
        controller.export_buffer(format, &sink)?;
        println!(
            "exported {} records to {}",
            controller.records().len(),
            args.out_dir.display()
        );
    } else {
        controller.set_page(args.page);
        for record in controller.current_page() {
            print_record(record);
        }
        eprintln!(
            "-- page {}/{} ({} records)",
            controller.page_number(),
            controller.total_pages(),
            controller.records().len()
        );
    }

    controller.destroy();
    Ok(())
}

/// Print arriving records until interrupted or the stream fails
async fn follow(controller: &mut ViewController) {
    let mut printed = 0;
    let mut ticker = tokio::time::interval(Duration::from_millis(200));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                controller.process_events();
                let records = controller.records();
                for record in &records[printed..] {
                    print_record(record);
                }
                printed = records.len();
                if let Status::Error(detail) = controller.status() {
                    eprintln!("stream error: {}", detail);
                    break;
                }
            }
        }
    }
}

fn raw_filters(args: &Args) -> Vec<(FilterKey, Option<String>)> {
    vec![
        (FilterKey::StartDate, args.start_date.clone()),
        (FilterKey::EndDate, args.end_date.clone()),
        (FilterKey::Level, args.level.clone()),
        (FilterKey::Keyword, args.keyword.clone()),
        (FilterKey::LogGroup, args.log_group.clone()),
        (FilterKey::LogType, args.log_type.clone()),
        (FilterKey::FilePath, args.file_path.clone()),
    ]
}

fn print_record(record: &LogRecord) {
    println!(
        "{}  {:<7} {}  {}",
        record.timestamp, record.level, record.source, record.message
    );
}
