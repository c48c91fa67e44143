mod commands;
mod config;
mod core;
mod error;
mod server;
mod services;

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::commands::{AppState, Credentials, Dispatcher, Timings};
use crate::core::executor::{CommandExecutor, ShellExecutor};
use crate::core::probe::{HostProbe, SystemProbe};
use crate::core::rate_limiter::RateLimiter;
use crate::core::session::SessionStore;

/// pcremote - control this PC from a phone browser
#[derive(Parser, Debug)]
#[command(name = "pcremote")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Settings file (created with defaults if missing)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Address to bind, overriding the settings file
    #[arg(long, value_name = "ADDR")]
    pub host: Option<IpAddr>,

    /// Port to bind, overriding the settings file
    #[arg(long)]
    pub port: Option<u16>,
}

/// Install the global subscriber: console output plus a plain-text log file.
///
/// Returns `None` when logging is switched off in the settings. Otherwise the
/// guard must be held until shutdown so buffered file lines get flushed.
fn init_logging(settings: &config::Settings) -> anyhow::Result<Option<WorkerGuard>> {
    if !settings.logging_enabled {
        return Ok(None);
    }
    let default_filter = if settings.debug {
        "pcremote_lib=debug,tower_http=debug"
    } else {
        "pcremote_lib=info,tower_http=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());
    let (file_writer, guard) = log_file_writer(&settings.log_file())?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .try_init()
        .context("installing tracing subscriber")?;
    Ok(Some(guard))
}

/// Appending, never-rotated writer for `path`, creating its directory.
fn log_file_writer(path: &Path) -> anyhow::Result<(NonBlocking, WorkerGuard)> {
    let file_name = path
        .file_name()
        .with_context(|| format!("log file {} has no file name", path.display()))?
        .to_string_lossy()
        .into_owned();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating log dir {}", dir.display()))?;
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(dir)
        .with_context(|| format!("opening log file {}", path.display()))?;
    Ok(tracing_appender::non_blocking(appender))
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.unwrap_or_else(config::default_config_path);
    let (settings, created) = config::Settings::load_or_init(&config_path)?;

    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!("PANIC in pcremote: {info}");
        default_hook(info);
    }));

    let _log_guard = init_logging(&settings)?;
    if created {
        tracing::info!("Wrote default settings to {}", config_path.display());
    }
    tracing::info!("Settings loaded from {}", config_path.display());

    let host = match cli.host {
        Some(host) => host,
        None => settings
            .host
            .parse()
            .with_context(|| format!("invalid host {:?} in settings", settings.host))?,
    };
    let addr = SocketAddr::new(host, cli.port.unwrap_or(settings.port));

    let executor: Arc<dyn CommandExecutor> = Arc::new(ShellExecutor::new(
        settings.key_tool.clone(),
        config::command_timeout(),
    ));
    let probe: Arc<dyn SystemProbe> = Arc::new(HostProbe::new(config::command_timeout()));
    let dispatcher = Arc::new(Dispatcher::new(
        executor,
        probe,
        &settings,
        Timings::default(),
    ));
    let rate_limiter = Arc::new(RateLimiter::new(
        settings.max_requests_per_minute,
        config::rate_window(),
    ));
    let sessions = Arc::new(SessionStore::new(settings.session_timeout()));

    let services = services::BackgroundServices::start(
        &rate_limiter,
        &sessions,
        std::time::Duration::from_secs(config::HOUSEKEEPING_INTERVAL_SECS),
    )
    .context("starting background services")?;

    let state = AppState::new(
        dispatcher,
        rate_limiter,
        sessions,
        Credentials {
            username: settings.username.clone(),
            password: settings.password.clone(),
        },
    );

    let runtime = tokio::runtime::Runtime::new().context("building tokio runtime")?;
    let served = runtime.block_on(server::serve(state, addr));

    services.shutdown();
    served
}
