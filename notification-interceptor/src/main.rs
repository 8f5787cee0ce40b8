//! Notification Interceptor - Main entry point
//!
//! Runs the listener against a filesystem-backed host. Notifications arrive
//! as JSON lines on stdin, intercepted events leave as JSON lines on stdout
//! and logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! # Listen with the default configuration
//! notification-interceptor < notifications.jsonl
//!
//! # Maintenance of the image directory
//! notification-interceptor --cleanup
//! notification-interceptor --purge
//! notification-interceptor --info
//! ```

use notification_interceptor::{
    cancel, ChannelDispatcher, Config, EventDispatcher, HostPlatform, InterceptedNotification,
    ListenerMessage, LocalHost, NotificationInterceptor, TempImageStore,
};
use std::io::{self, BufRead};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Listen,
    Cleanup,
    Purge,
    Info,
}

#[derive(Debug)]
struct Args {
    mode: Mode,
    config_path: Option<PathBuf>,
    cache_dir: Option<String>,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut parsed = Args {
        mode: Mode::Listen,
        config_path: None,
        cache_dir: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-v" => {
                println!("Notification Interceptor v{}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--config" | "-c" => {
                i += 1;
                if i < args.len() {
                    parsed.config_path = Some(PathBuf::from(&args[i]));
                }
            }
            "--cache-dir" => {
                i += 1;
                if i < args.len() {
                    parsed.cache_dir = Some(args[i].clone());
                }
            }
            "--cleanup" => parsed.mode = Mode::Cleanup,
            "--purge" => parsed.mode = Mode::Purge,
            "--info" => parsed.mode = Mode::Info,
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                eprintln!("Use --help for usage information.");
                std::process::exit(1);
            }
        }
        i += 1;
    }

    parsed
}

fn print_help() {
    println!(
        r#"Notification Interceptor - image extraction for posted notifications

USAGE:
    notification-interceptor [OPTIONS]

OPTIONS:
    -h, --help              Show this help message
    -v, --version           Show version
    -c, --config <PATH>     Path to configuration file
    --cache-dir <DIR>       Cache root for extracted images
    --cleanup               Delete images older than the configured maximum age
    --purge                 Delete all extracted images
    --info                  Show the image directory status

INPUT (stdin, one JSON object per line):
    {{"posted": {{"key": "...", "package": "...", "title": "...", "extras": {{...}}}}}}
    {{"removed": {{"key": "..."}}}}
    {{"cancel": {{"key": "..."}}}}

OUTPUT (stdout, one JSON object per intercepted notification):
    notification_title, notification_text, image_path,
    app_package, app_name, notification_key
"#
    );
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = parse_args();

    // Load configuration
    let mut config = match &args.config_path {
        Some(path) => Config::load_from_path(path.clone()),
        None => Config::load(),
    };
    if let Some(dir) = args.cache_dir {
        config.storage.cache_dir = Some(dir);
    }

    init_logging(&config.general.log_level);
    info!(
        "Configuration loaded from {:?}",
        args.config_path.unwrap_or_else(Config::default_config_path)
    );

    let store = TempImageStore::new(&config.storage);
    match args.mode {
        Mode::Cleanup => {
            let summary = store.cleanup_old_files();
            println!(
                "Deleted {} files ({} bytes freed, {} failed)",
                summary.deleted, summary.freed_bytes, summary.failed
            );
            return Ok(());
        }
        Mode::Purge => {
            let summary = store.cleanup_all_files();
            println!(
                "Deleted {} files ({} bytes freed, {} failed)",
                summary.deleted, summary.freed_bytes, summary.failed
            );
            return Ok(());
        }
        Mode::Info => {
            println!("{}", store.directory_info());
            return Ok(());
        }
        Mode::Listen => {}
    }

    if !config.general.enabled {
        info!("Interceptor is disabled in configuration, exiting");
        return Ok(());
    }

    info!("Starting Notification Interceptor");

    // Create event channel
    let (event_tx, mut event_rx) = mpsc::channel::<InterceptedNotification>(100);

    // Spawn event writer task
    let writer_handle = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(event) = event_rx.recv().await {
            let mut line = match serde_json::to_vec(&event) {
                Ok(line) => line,
                Err(e) => {
                    error!("Failed to serialize event: {}", e);
                    continue;
                }
            };
            line.push(b'\n');
            if let Err(e) = stdout.write_all(&line).await {
                error!("Failed to write event: {}", e);
                break;
            }
            if let Err(e) = stdout.flush().await {
                error!("Failed to flush events: {}", e);
                break;
            }
        }
    });

    // The listener reads stdin synchronously on a blocking thread
    let listener_handle = tokio::task::spawn_blocking(move || listen(config, event_tx));

    let processed = listener_handle.await?;
    writer_handle.await?;

    info!("Listener finished after {} messages", processed);
    Ok(())
}

/// Run the interceptor over stdin until EOF
fn listen(config: Config, event_tx: mpsc::Sender<InterceptedNotification>) -> usize {
    let host = LocalHost::new(&config.host);
    let mut interceptor =
        NotificationInterceptor::new(config, host, ChannelDispatcher::blocking(event_tx));
    interceptor.startup();

    let processed = process_messages(&mut interceptor, io::stdin().lock());

    let summary = interceptor.shutdown();
    info!(
        "Cleaned up {} expired images ({} bytes)",
        summary.deleted, summary.freed_bytes
    );
    processed
}

/// Feed line-delimited messages to the interceptor.
///
/// Undecodable or malformed lines are skipped; reading stops at EOF or on
/// the first read error.
fn process_messages<H, D, R>(
    interceptor: &mut NotificationInterceptor<H, D>,
    mut reader: R,
) -> usize
where
    H: HostPlatform,
    D: EventDispatcher,
    R: BufRead,
{
    let mut processed = 0;
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                error!("Failed to read input: {}", e);
                break;
            }
        }

        let line = String::from_utf8_lossy(&buf);
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match ListenerMessage::parse(line) {
            Ok(ListenerMessage::Posted(payload)) => {
                interceptor.on_notification_posted(&payload.into());
            }
            Ok(ListenerMessage::Removed { key }) => {
                interceptor.on_notification_removed(&key);
            }
            Ok(ListenerMessage::Cancel { key }) => {
                let outcome = cancel::run(interceptor, key.as_deref());
                info!("Cancel result: {}", outcome.message);
            }
            Err(e) => {
                warn!("Skipping input line: {}", e);
                continue;
            }
        }
        processed += 1;
    }

    processed
}
