//! Server configuration, read from environment variables.
//!
//! | Variable    | Default            |
//! |-------------|--------------------|
//! | `ROOT_ZONE` | `messwithdns.com.` |
//! | `DNS_BIND`  | `0.0.0.0:53`       |
//! | `HTTP_BIND` | `0.0.0.0:8080`     |
//! | `DB_PATH`   | `records.redb`     |
//!
//! A `DB_PATH` of `:memory:` keeps records in memory only.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

use crate::guard::RootZone;
use crate::rr::Name;

const DEFAULT_ROOT_ZONE: &str = "messwithdns.com.";
const DEFAULT_DNS_BIND: &str = "0.0.0.0:53";
const DEFAULT_HTTP_BIND: &str = "0.0.0.0:8080";
const DEFAULT_DB_PATH: &str = "records.redb";
const IN_MEMORY: &str = ":memory:";

/// A configuration value could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
	/// A variable held something unparseable.
	#[error("invalid {var} {value:?}: {reason}")]
	Invalid {
		/// The variable name.
		var: &'static str,
		/// What it was set to.
		value: String,
		/// Why it was refused.
		reason: String,
	},
}

/// Where records are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
	/// In memory, lost on exit.
	Memory,
	/// In a redb database file.
	File(PathBuf),
}

/// Everything the server binary needs to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
	/// The zone records may be created under.
	pub root_zone: RootZone,
	/// UDP address DNS is served on.
	pub dns_bind: SocketAddr,
	/// TCP address the management API is served on.
	pub http_bind: SocketAddr,
	/// Where records are kept.
	pub store: StoreLocation,
}

impl Config {
	/// Reads the configuration through `lookup`, usually `|var| std::env::var(var).ok()`.
	pub fn from_env<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Config, ConfigError> {
		let get = |var: &str, default: &str| lookup(var).filter(|v| !v.is_empty()).unwrap_or_else(|| default.to_owned());

		let zone = get("ROOT_ZONE", DEFAULT_ROOT_ZONE);
		let apex = Name::try_from(zone.as_str()).map_err(|e| ConfigError::Invalid {
			var: "ROOT_ZONE", value: zone.clone(), reason: e.to_string(),
		})?;

		let db_path = get("DB_PATH", DEFAULT_DB_PATH);
		let store = if db_path == IN_MEMORY { StoreLocation::Memory } else { StoreLocation::File(db_path.into()) };

		Ok(Config {
			root_zone: RootZone::new(apex),
			dns_bind: parse_addr("DNS_BIND", get("DNS_BIND", DEFAULT_DNS_BIND))?,
			http_bind: parse_addr("HTTP_BIND", get("HTTP_BIND", DEFAULT_HTTP_BIND))?,
			store,
		})
	}
}

fn parse_addr(var: &'static str, value: String) -> Result<SocketAddr, ConfigError> {
	value.parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
		var, reason: e.to_string(), value,
	})
}
