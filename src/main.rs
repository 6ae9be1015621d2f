use clap::{Parser, Subcommand};
use mlv::{Headless, SearchOptions};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mlv", version, about = "Multi Log Viewer: browse, tail and search server logs")]
struct Cli {
    /// Write debug logs to /tmp/mlv-debug.log (tail -f to inspect).
    #[arg(long, global = true)]
    debug: bool,

    /// Base URL of the mlv.cgi deployment, overriding the config file.
    #[arg(long, global = true, value_name = "URL")]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Option<Cmd>,
}

#[derive(Subcommand)]
enum Cmd {
    /// Print the log catalog grouped by category.
    List,
    /// Print the last lines of a log, optionally filtered by a search.
    Tail {
        id: String,
        /// Number of lines (10-2000).
        #[arg(long, short = 'n')]
        lines: Option<String>,
        #[arg(long, short = 's')]
        search: Option<String>,
        #[arg(long, short = 'c')]
        case_sensitive: bool,
    },
    /// Search every configured log.
    SearchAll {
        query: String,
        #[arg(long, short = 'n')]
        lines: Option<String>,
        #[arg(long, short = 'c')]
        case_sensitive: bool,
    },
    /// Download a compressed log.
    Download {
        id: String,
        /// Target directory (defaults to `api.download_dir`).
        #[arg(long)]
        dest: Option<PathBuf>,
    },
    /// Install the latest version on the server.
    Update {
        /// Only report the installed and available versions.
        #[arg(long)]
        check: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.debug {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open("/tmp/mlv-debug.log")?;
        tracing_subscriber::fmt()
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_env("RUST_LOG")
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
            )
            .init();
        tracing::info!("mlv debug log started, tail -f /tmp/mlv-debug.log");
    }

    let config = mlv_core::config::Config::load().unwrap_or_else(|err| {
        tracing::warn!(error = %err, "config unreadable, using defaults");
        mlv_core::config::Config::defaults()
    });

    let Some(command) = cli.command else {
        return mlv_tui::run(config, cli.base_url.as_deref());
    };

    let client = mlv_client::ApiClient::from_config(&config.api, cli.base_url.as_deref())?;
    let download_dir = config.api.download_dir.clone();
    let headless = Headless::new(client, config);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    runtime.block_on(async {
        match command {
            Cmd::List => headless.list(&mut out).await,
            Cmd::Tail {
                id,
                lines,
                search,
                case_sensitive,
            } => {
                let opts = SearchOptions {
                    lines,
                    search,
                    case_sensitive,
                };
                headless.tail(&id, &opts, &mut out).await
            }
            Cmd::SearchAll {
                query,
                lines,
                case_sensitive,
            } => {
                let opts = SearchOptions {
                    lines,
                    search: None,
                    case_sensitive,
                };
                headless.search_all(&query, &opts, &mut out).await
            }
            Cmd::Download { id, dest } => {
                let dest = dest.unwrap_or(download_dir);
                headless.download(&id, &dest, &mut out).await
            }
            Cmd::Update { check: true } => headless.check_update(&mut out).await,
            Cmd::Update { check: false } => headless.apply_update(&mut out).await,
        }
    })
}
