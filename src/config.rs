//! Configuration for remote roots
//!
//! A [`RemoteConfig`] is passed explicitly when a remote root is created;
//! nothing is discovered from process-wide state. The priority chain is:
//! 1. Built-in defaults (`RemoteConfig::new(socket)`)
//! 2. A config file (`RemoteConfig::from_file`, TOML or JSON)
//! 3. Environment overrides, only when the caller asks for them
//!    (`with_env_overrides`, used by test harnesses to point at another daemon)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::glob::DEFAULT_MAX_DEPTH;
use crate::path::{DEFAULT_MKDIR_MODE, DEFAULT_WRITE_MODE};

/// Environment variable overriding the daemon socket path
pub const ENV_SOCKET: &str = "PATHOPS_SOCKET";

/// Environment variable overriding the request timeout, in milliseconds
pub const ENV_TIMEOUT_MS: &str = "PATHOPS_TIMEOUT_MS";

/// Settings for one remote root and its protocol session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RemoteConfig {
	/// Path of the daemon's Unix socket
	pub socket_path: PathBuf,

	/// Upper bound for every request, in milliseconds
	pub timeout_ms: u64,

	/// Largest payload sent or requested in one read/write call
	pub max_chunk_size: usize,

	/// Extra attempts when establishing the session fails transiently
	pub connect_retries: u32,

	/// Pause between connection attempts, in milliseconds
	pub retry_delay_ms: u64,

	/// Depth bound for glob walks
	pub max_glob_depth: usize,

	/// Permissions for written files when the caller gives none
	pub default_file_mode: u32,

	/// Permissions for created directories when the caller gives none
	pub default_dir_mode: u32,

	/// Owner for created files and directories when the caller gives none
	pub default_user: Option<String>,

	/// Group for created files and directories when the caller gives none
	pub default_group: Option<String>,
}

impl Default for RemoteConfig {
	fn default() -> Self {
		Self {
			socket_path: PathBuf::new(),
			timeout_ms: 30_000,
			max_chunk_size: 1024 * 1024,
			connect_retries: 3,
			retry_delay_ms: 100,
			max_glob_depth: DEFAULT_MAX_DEPTH,
			default_file_mode: DEFAULT_WRITE_MODE,
			default_dir_mode: DEFAULT_MKDIR_MODE,
			default_user: None,
			default_group: None,
		}
	}
}

impl RemoteConfig {
	pub fn new(socket_path: impl Into<PathBuf>) -> Self {
		Self { socket_path: socket_path.into(), ..Self::default() }
	}

	pub fn timeout(&self) -> Duration {
		Duration::from_millis(self.timeout_ms)
	}

	pub fn retry_delay(&self) -> Duration {
		Duration::from_millis(self.retry_delay_ms)
	}

	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout_ms = timeout.as_millis() as u64;
		self
	}

	pub fn with_max_chunk_size(mut self, size: usize) -> Self {
		self.max_chunk_size = size;
		self
	}

	pub fn with_connect_retries(mut self, retries: u32, delay: Duration) -> Self {
		self.connect_retries = retries;
		self.retry_delay_ms = delay.as_millis() as u64;
		self
	}

	pub fn with_max_glob_depth(mut self, depth: usize) -> Self {
		self.max_glob_depth = depth;
		self
	}

	pub fn with_default_owner(mut self, user: Option<String>, group: Option<String>) -> Self {
		self.default_user = user;
		self.default_group = group;
		self
	}

	pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(s)?;
		config.validate()?;
		Ok(config)
	}

	pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
		let config: Self = serde_json::from_str(s)?;
		config.validate()?;
		Ok(config)
	}

	/// Load from a `.toml` or `.json` file
	pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
		let text = std::fs::read_to_string(path)
			.map_err(|e| ConfigError::Io { path: path.display().to_string(), source: e })?;
		match path.extension().and_then(|e| e.to_str()) {
			Some("json") => Self::from_json_str(&text),
			_ => Self::from_toml_str(&text),
		}
	}

	/// Apply `PATHOPS_SOCKET` / `PATHOPS_TIMEOUT_MS` if they are set
	pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
		if let Some(socket) = std::env::var_os(ENV_SOCKET) {
			self.socket_path = PathBuf::from(socket);
		}
		if let Ok(timeout) = std::env::var(ENV_TIMEOUT_MS) {
			self.timeout_ms = timeout.trim().parse().map_err(|_| ConfigError::Invalid {
				message: format!("{}={:?} is not a number of milliseconds", ENV_TIMEOUT_MS, timeout),
			})?;
		}
		self.validate()?;
		Ok(self)
	}

	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.socket_path.as_os_str().is_empty() {
			return Err(ConfigError::Invalid { message: "socketPath is required".to_string() });
		}
		if self.timeout_ms == 0 {
			return Err(ConfigError::Invalid { message: "timeoutMs must be positive".to_string() });
		}
		if self.max_chunk_size == 0 {
			return Err(ConfigError::Invalid { message: "maxChunkSize must be positive".to_string() });
		}
		if self.default_file_mode > 0o7777 || self.default_dir_mode > 0o7777 {
			return Err(ConfigError::Invalid { message: "default modes must fit in 0o7777".to_string() });
		}
		Ok(())
	}
}


// vim: ts=4
