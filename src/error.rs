//! Error types shared by every backend
//!
//! Both the local and the remote backend report failures as a [`PathError`]
//! carrying exactly one [`ErrorKind`], so code written against
//! [`PathOps`](crate::path::PathOps) cannot tell the backends apart by error shape.

use std::error::Error;
use std::fmt;
use std::io;

/// Result type for path operations
pub type PathResult<T> = Result<T, PathError>;

/// Failure taxonomy shared by the local and remote backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// The path (or one of its parents) does not exist
	NotFound,

	/// The target already exists
	AlreadyExists,

	/// A directory was required but something else was found
	NotADirectory,

	/// A non-directory was required but a directory was found
	IsADirectory,

	/// The directory still has children
	NotEmpty,

	/// The caller (or the daemon) lacks the rights for the operation
	PermissionDenied,

	/// Text could not be decoded or encoded with the requested encoding
	DecodeError,

	/// Malformed or unexpected wire response, closed socket, closed session
	ProtocolError,

	/// A remote request exceeded its deadline
	Timeout,

	/// A glob walk exceeded its maximum depth
	GlobTooDeep,

	/// Daemon- or OS-reported failure with no more specific kind
	BackendError,

	/// The arguments do not make sense (relative_to mismatch, bad suffix, bad pattern)
	InvalidArgument,

	/// A user or group name could not be resolved
	LookupFailed,
}

impl ErrorKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			ErrorKind::NotFound => "not found",
			ErrorKind::AlreadyExists => "already exists",
			ErrorKind::NotADirectory => "not a directory",
			ErrorKind::IsADirectory => "is a directory",
			ErrorKind::NotEmpty => "directory not empty",
			ErrorKind::PermissionDenied => "permission denied",
			ErrorKind::DecodeError => "decode error",
			ErrorKind::ProtocolError => "protocol error",
			ErrorKind::Timeout => "timeout",
			ErrorKind::GlobTooDeep => "glob too deep",
			ErrorKind::BackendError => "backend error",
			ErrorKind::InvalidArgument => "invalid argument",
			ErrorKind::LookupFailed => "lookup failed",
		}
	}
}

impl fmt::Display for ErrorKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A failed path operation
///
/// Carries the operation attempted and the path involved so callers can log
/// or decide to retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathError {
	kind: ErrorKind,
	op: &'static str,
	path: String,
	message: Option<String>,
}

impl PathError {
	pub fn new(kind: ErrorKind, op: &'static str, path: impl Into<String>) -> Self {
		Self { kind, op, path: path.into(), message: None }
	}

	pub fn with_message(mut self, message: impl Into<String>) -> Self {
		self.message = Some(message.into());
		self
	}

	pub fn not_found(op: &'static str, path: impl Into<String>) -> Self {
		Self::new(ErrorKind::NotFound, op, path)
	}

	pub fn invalid_argument(op: &'static str, path: impl Into<String>, message: impl Into<String>) -> Self {
		Self::new(ErrorKind::InvalidArgument, op, path).with_message(message)
	}

	/// Map an OS error into the shared taxonomy
	pub fn from_io(op: &'static str, path: impl Into<String>, err: &io::Error) -> Self {
		Self::new(kind_from_io(err), op, path).with_message(err.to_string())
	}

	pub fn kind(&self) -> ErrorKind {
		self.kind
	}

	pub fn op(&self) -> &'static str {
		self.op
	}

	pub fn path(&self) -> &str {
		&self.path
	}

	pub fn message(&self) -> Option<&str> {
		self.message.as_deref()
	}

	pub fn is_not_found(&self) -> bool {
		self.kind == ErrorKind::NotFound
	}
}

impl fmt::Display for PathError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.message {
			Some(message) => write!(f, "{} {}: {}: {}", self.op, self.path, self.kind, message),
			None => write!(f, "{} {}: {}", self.op, self.path, self.kind),
		}
	}
}

impl Error for PathError {}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
	/// Config file could not be read
	Io { path: String, source: io::Error },

	/// Config file could not be parsed
	Parse { message: String },

	/// A setting is out of range
	Invalid { message: String },
}

impl fmt::Display for ConfigError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ConfigError::Io { path, source } => write!(f, "Cannot read config {}: {}", path, source),
			ConfigError::Parse { message } => write!(f, "Invalid config syntax: {}", message),
			ConfigError::Invalid { message } => write!(f, "Invalid configuration: {}", message),
		}
	}
}

impl Error for ConfigError {}

impl From<toml::de::Error> for ConfigError {
	fn from(e: toml::de::Error) -> Self {
		ConfigError::Parse { message: e.to_string() }
	}
}

impl From<serde_json::Error> for ConfigError {
	fn from(e: serde_json::Error) -> Self {
		ConfigError::Parse { message: e.to_string() }
	}
}

/// OS error to taxonomy kind
pub fn kind_from_io(err: &io::Error) -> ErrorKind {
	if let Some(errno) = err.raw_os_error() {
		match errno {
			libc::ENOENT => return ErrorKind::NotFound,
			libc::EEXIST => return ErrorKind::AlreadyExists,
			libc::ENOTDIR => return ErrorKind::NotADirectory,
			libc::EISDIR => return ErrorKind::IsADirectory,
			libc::ENOTEMPTY => return ErrorKind::NotEmpty,
			libc::EACCES | libc::EPERM | libc::EROFS => return ErrorKind::PermissionDenied,
			_ => {}
		}
	}
	match err.kind() {
		io::ErrorKind::NotFound => ErrorKind::NotFound,
		io::ErrorKind::AlreadyExists => ErrorKind::AlreadyExists,
		io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
		io::ErrorKind::InvalidData => ErrorKind::DecodeError,
		io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ErrorKind::Timeout,
		_ => ErrorKind::BackendError,
	}
}


// vim: ts=4
