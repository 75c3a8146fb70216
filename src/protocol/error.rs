//! Protocol error types
//!
//! Transport and daemon failures are collected here first, then converted
//! into the shared taxonomy through one explicit table
//! ([`taxonomy_kind`]), so no daemon error reaches the caller unmapped.

use std::fmt;
use std::io;

use crate::error::{ErrorKind, PathError};

/// Machine-readable error kinds the daemon puts in error bodies
pub mod wire_kind {
	pub const NOT_FOUND: &str = "not-found";
	pub const PERMISSION_DENIED: &str = "permission-denied";
	pub const ALREADY_EXISTS: &str = "already-exists";
	pub const NOT_A_DIRECTORY: &str = "not-a-directory";
	pub const IS_A_DIRECTORY: &str = "is-a-directory";
	pub const DIRECTORY_NOT_EMPTY: &str = "directory-not-empty";
	pub const LOOKUP_FAILED: &str = "lookup-failed";
	pub const GENERIC_FILE_ERROR: &str = "generic-file-error";
}

/// Protocol error type
#[derive(Debug)]
pub enum ProtocolError {
	/// I/O error on the socket
	Io(io::Error),
	/// The request deadline passed
	Timeout,
	/// The daemon closed the connection
	Disconnected,
	/// The session was released by its owner
	SessionClosed,
	/// Could not establish the session
	ConnectFailed { socket: String, source: io::Error },
	/// Response did not follow the wire format
	Malformed(String),
	/// Daemon reported a failure
	Api { status: u16, kind: Option<String>, message: String },
}

impl ProtocolError {
	/// Whether the session must be discarded after this error
	///
	/// Daemon-reported failures leave the connection usable; everything else
	/// leaves it in an unknown state.
	pub fn breaks_session(&self) -> bool {
		!matches!(self, ProtocolError::Api { .. } | ProtocolError::SessionClosed)
	}

	/// Convert into the shared taxonomy
	pub fn into_path_error(self, op: &'static str, path: &str) -> PathError {
		let kind = match &self {
			ProtocolError::Api { status, kind, .. } => taxonomy_kind(kind.as_deref(), *status),
			ProtocolError::Timeout => ErrorKind::Timeout,
			ProtocolError::Io(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
				ErrorKind::Timeout
			}
			_ => ErrorKind::ProtocolError,
		};
		let message = match self {
			ProtocolError::Api { message, .. } => message,
			other => other.to_string(),
		};
		PathError::new(kind, op, path).with_message(message)
	}
}

/// Wire error kind (or HTTP status when the daemon gives no kind) to taxonomy kind
pub fn taxonomy_kind(kind: Option<&str>, status: u16) -> ErrorKind {
	match kind {
		Some(wire_kind::NOT_FOUND) => ErrorKind::NotFound,
		Some(wire_kind::PERMISSION_DENIED) => ErrorKind::PermissionDenied,
		Some(wire_kind::ALREADY_EXISTS) => ErrorKind::AlreadyExists,
		Some(wire_kind::NOT_A_DIRECTORY) => ErrorKind::NotADirectory,
		Some(wire_kind::IS_A_DIRECTORY) => ErrorKind::IsADirectory,
		Some(wire_kind::DIRECTORY_NOT_EMPTY) => ErrorKind::NotEmpty,
		Some(wire_kind::LOOKUP_FAILED) => ErrorKind::LookupFailed,
		Some(_) => ErrorKind::BackendError,
		None => match status {
			404 => ErrorKind::NotFound,
			401 | 403 => ErrorKind::PermissionDenied,
			408 | 504 => ErrorKind::Timeout,
			_ => ErrorKind::BackendError,
		},
	}
}

/// Taxonomy kind to wire error kind and HTTP status, for daemon implementations
pub fn wire_kind_for(kind: ErrorKind) -> (&'static str, u16) {
	match kind {
		ErrorKind::NotFound => (wire_kind::NOT_FOUND, 404),
		ErrorKind::PermissionDenied => (wire_kind::PERMISSION_DENIED, 403),
		ErrorKind::AlreadyExists => (wire_kind::ALREADY_EXISTS, 400),
		ErrorKind::NotADirectory => (wire_kind::NOT_A_DIRECTORY, 400),
		ErrorKind::IsADirectory => (wire_kind::IS_A_DIRECTORY, 400),
		ErrorKind::NotEmpty => (wire_kind::DIRECTORY_NOT_EMPTY, 400),
		ErrorKind::LookupFailed => (wire_kind::LOOKUP_FAILED, 400),
		_ => (wire_kind::GENERIC_FILE_ERROR, 500),
	}
}

impl fmt::Display for ProtocolError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ProtocolError::Io(e) => write!(f, "I/O error: {}", e),
			ProtocolError::Timeout => write!(f, "Request timed out"),
			ProtocolError::Disconnected => write!(f, "Daemon closed the connection"),
			ProtocolError::SessionClosed => write!(f, "Session is closed"),
			ProtocolError::ConnectFailed { socket, source } => {
				write!(f, "Cannot connect to {}: {}", socket, source)
			}
			ProtocolError::Malformed(msg) => write!(f, "Malformed response: {}", msg),
			ProtocolError::Api { status, kind, message } => match kind {
				Some(kind) => write!(f, "Daemon error {} ({}): {}", status, kind, message),
				None => write!(f, "Daemon error {}: {}", status, message),
			},
		}
	}
}

impl std::error::Error for ProtocolError {}

impl From<io::Error> for ProtocolError {
	fn from(e: io::Error) -> Self {
		match e.kind() {
			io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ProtocolError::Timeout,
			io::ErrorKind::UnexpectedEof
			| io::ErrorKind::BrokenPipe
			| io::ErrorKind::ConnectionReset
			| io::ErrorKind::ConnectionAborted => ProtocolError::Disconnected,
			_ => ProtocolError::Io(e),
		}
	}
}

impl From<serde_json::Error> for ProtocolError {
	fn from(e: serde_json::Error) -> Self {
		ProtocolError::Malformed(e.to_string())
	}
}


// vim: ts=4
