// barometer_logger - Barometric pressure logger for router admin pages
//
// Copyright 2026 barometer_logger contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

use barometer_logger::client::{BarometerTableParser, HttpRouterClient};
use barometer_logger::clock::{MonotonicClock, SystemClock};
use barometer_logger::config::Config;
use barometer_logger::http::RequestContext;
use barometer_logger::logging;
use barometer_logger::metrics::CollectorMetrics;
use barometer_logger::scheduler::{Schedule, Scheduler};
use barometer_logger::stats::Summary;
use barometer_logger::store::ReadingStore;
use clap::{Parser, Subcommand};
use prometheus_client::registry::Registry;
use reqwest::Client;
use std::error::Error;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tokio::signal::unix::{self, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::Level;

const DEFAULT_LOG_LEVEL: Level = Level::INFO;
const DEFAULT_BIND_ADDR: ([u8; 4], u16) = ([0, 0, 0, 0], 9783);
const DEFAULT_CONFIG_PATH: &str = "config.yaml";

#[derive(Debug, Parser)]
#[clap(name = "barometer_logger", version = clap::crate_version!())]
struct BarometerLoggerApplication {
    /// Path to the YAML configuration file with the router URL, credentials, and
    /// polling interval
    #[clap(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Logging verbosity. Allowed values are 'trace', 'debug', 'info', 'warn', and 'error'
    /// (case insensitive)
    #[clap(long, default_value_t = DEFAULT_LOG_LEVEL)]
    log_level: Level,

    /// Also append log output to this file
    #[clap(long)]
    log_file: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Collect readings at the configured interval until interrupted
    Run {
        /// Address to bind the metrics server to. By default, barometer_logger will bind
        /// to public address so that Prometheus or another agent can scrape it
        #[clap(long, default_value_t = DEFAULT_BIND_ADDR.into())]
        bind: SocketAddr,
    },

    /// Collect a single reading and exit
    Once,

    /// Print a summary of the readings collected so far
    Stats,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let opts = BarometerLoggerApplication::parse();
    let writer = logging::log_writer(opts.log_file.as_deref()).unwrap_or_else(|e| {
        eprintln!("barometer_logger: unable to open log file: {}", e);
        process::exit(1)
    });

    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(opts.log_level)
            .with_writer(writer)
            .with_ansi(opts.log_file.is_none())
            .finish(),
    )
    .expect("failed to set tracing subscriber");

    let config = Config::load(&opts.config).unwrap_or_else(|e| {
        tracing::error!(message = "unable to load configuration", path = %opts.config.display(), error = %e);
        process::exit(1)
    });

    tracing::info!(message = "loaded configuration", url = %config.url, data_path = %config.data_path.display());

    let store = ReadingStore::open(&config.data_path).unwrap_or_else(|e| {
        tracing::error!(message = "unable to open reading store", error = %e);
        process::exit(1)
    });

    match opts.command {
        Command::Stats => stats(&store),
        Command::Once => once(&config, store).await,
        Command::Run { bind } => run(&config, store, bind).await,
    }
}

fn stats(store: &ReadingStore) -> Result<(), Box<dyn Error + Send + Sync>> {
    let readings = store.read_all()?.collect::<Result<Vec<_>, _>>()?;
    match Summary::from_readings(readings) {
        Some(summary) => println!("{}", summary),
        None => println!("No readings stored in {}", store.path().display()),
    }

    Ok(())
}

async fn once(config: &Config, store: ReadingStore) -> Result<(), Box<dyn Error + Send + Sync>> {
    let metrics = CollectorMetrics::new(&mut Registry::default());
    let scheduler = Scheduler::new(router_client(config), store, metrics, Schedule::Once);

    let report = scheduler.run(CancellationToken::new()).await;
    if report.stored == 0 {
        process::exit(1);
    }

    Ok(())
}

async fn run(config: &Config, store: ReadingStore, bind: SocketAddr) -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut registry = Registry::default();
    let metrics = CollectorMetrics::new(&mut registry);
    let scheduler = Scheduler::new(router_client(config), store, metrics, Schedule::Every(config.interval));

    let cancel = CancellationToken::new();
    let collection = tokio::spawn({
        let cancel = cancel.clone();
        let url = config.url.clone();
        let interval_secs = config.interval.as_secs();

        async move {
            tracing::info!(message = "collection started", url = %url, interval_secs = interval_secs);
            scheduler.run(cancel).await
        }
    });

    let context = Arc::new(RequestContext::new(registry));
    let app = barometer_logger::http::router(context);
    let server = axum::Server::try_bind(&bind)
        .unwrap_or_else(|e| {
            tracing::error!(message = "error binding to address", address = %bind, error = %e);
            process::exit(1)
        })
        .serve(app.into_make_service());

    tracing::info!(message = "server started", address = %server.local_addr());

    server
        .with_graceful_shutdown(async {
            // Wait for either SIGTERM or SIGINT to shutdown
            tokio::select! {
                _ = sigterm() => {}
                _ = sigint() => {}
            }
        })
        .await?;

    tracing::info!("server shutdown");

    // A fetch that is already in flight is allowed to finish or time out
    cancel.cancel();
    let report = collection.await?;
    tracing::info!(
        message = "collection finished",
        cycles = report.cycles,
        stored = report.stored,
        fetch_errors = report.fetch_errors,
        parse_errors = report.parse_errors,
        storage_errors = report.storage_errors,
    );

    Ok(())
}

fn router_client(config: &Config) -> HttpRouterClient {
    let http_client = Client::builder()
        .timeout(config.timeout)
        .danger_accept_invalid_certs(config.accept_invalid_certs)
        .build()
        .unwrap_or_else(|e| {
            tracing::error!(message = "unable to initialize HTTP client", error = %e);
            process::exit(1)
        });

    HttpRouterClient::new(
        http_client,
        config.url.clone(),
        config.credentials.clone(),
        Box::new(BarometerTableParser::new(&config.field_label)),
        Arc::new(MonotonicClock::new(SystemClock)),
    )
}

/// Return after the first SIGTERM signal received by this process
async fn sigterm() -> io::Result<()> {
    unix::signal(SignalKind::terminate())?.recv().await;
    Ok(())
}

/// Return after the first SIGINT signal received by this process
async fn sigint() -> io::Result<()> {
    unix::signal(SignalKind::interrupt())?.recv().await;
    Ok(())
}
