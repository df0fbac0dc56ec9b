//! Runs the authoritative DNS server and its management API.
//!
//! Configured entirely through environment variables, see [`messwithdns::config`]. Log verbosity
//! follows `RUST_LOG`, defaulting to `info`.

use std::error::Error;
use std::process;
use std::sync::Arc;

use tokio_crate as tokio;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use messwithdns::config::{Config, StoreLocation};
use messwithdns::pipeline::Submissions;
use messwithdns::resolver::Resolver;
use messwithdns::server;
use messwithdns::store::{MemoryStore, RecordStore, RedbStore};

#[tokio::main]
async fn main() {
	let env_filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new("info"));
	tracing_subscriber::registry()
		.with(env_filter)
		.with(fmt::layer())
		.init();

	if let Err(e) = run().await {
		error!("{}", e);
		process::exit(1);
	}
}

async fn run() -> Result<(), Box<dyn Error>> {
	let config = Config::from_env(|var| std::env::var(var).ok())?;

	let store: Arc<dyn RecordStore> = match &config.store {
		StoreLocation::Memory => {
			warn!("Keeping records in memory, they will be lost on exit");
			Arc::new(MemoryStore::new())
		},
		StoreLocation::File(path) => {
			info!("Opening record database at {}", path.display());
			Arc::new(RedbStore::open(path)?)
		},
	};
	let resolver = Arc::new(Resolver::new(Arc::clone(&store)));
	let submissions = Arc::new(Submissions::new(store, config.root_zone.clone()));

	let dns_socket = tokio::net::UdpSocket::bind(config.dns_bind).await
		.map_err(|e| format!("Failed to bind DNS socket {}: {}", config.dns_bind, e))?;
	let http_listener = tokio::net::TcpListener::bind(config.http_bind).await
		.map_err(|e| format!("Failed to bind HTTP socket {}: {}", config.http_bind, e))?;

	tokio::join!(
		server::run_dns(dns_socket, resolver, config.root_zone),
		server::run_http(http_listener, submissions),
	);
	Ok(())
}
