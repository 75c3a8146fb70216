//! Blocking client for the file-control daemon
//!
//! One [`Client`] owns one session. Requests are serialized by the session
//! mutex and each carries a deadline from [`RemoteConfig::timeout`]. After a
//! transport failure (timeout, closed socket, malformed reply) the session is
//! dropped and re-established on the next request; requests themselves are
//! never retried.

use std::io::BufReader;
use std::os::unix::net::UnixStream;
use std::thread;
use std::time::Instant;

use parking_lot::Mutex;
use serde_json::Value;

use super::error::ProtocolError;
use super::types::{format_permissions, Envelope, EnvelopeKind, ErrorResult, FileInfo, FilesRequest, MakeDirItem, RemoveItem, FILES_ENDPOINT};
use super::wire::{DeadlineStream, Request, Response};
use crate::config::RemoteConfig;
use crate::logging::*;

/// Permissions and ownership sent with the first chunk of a write
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteAttrs {
	pub permissions: Option<u32>,
	pub user: Option<String>,
	pub group: Option<String>,
}

struct Connection {
	stream: BufReader<DeadlineStream>,
}

impl Connection {
	fn exchange(&mut self, req: &Request, deadline: Instant) -> Result<Response, ProtocolError> {
		self.stream.get_mut().set_deadline(Some(deadline));
		req.write_to(self.stream.get_mut())?;
		Response::read_from(&mut self.stream)
	}
}

enum Session {
	Open(Connection),
	Disconnected,
	Closed,
}

/// Protocol session with one daemon
pub struct Client {
	config: RemoteConfig,
	session: Mutex<Session>,
}

impl Client {
	/// Establish the session, retrying transient connection failures
	pub fn connect(config: RemoteConfig) -> Result<Self, ProtocolError> {
		let conn = open(&config)?;
		Ok(Self { config, session: Mutex::new(Session::Open(conn)) })
	}

	pub fn config(&self) -> &RemoteConfig {
		&self.config
	}

	/// Release the session; later requests fail with `SessionClosed`
	pub fn close(&self) {
		let mut session = self.session.lock();
		if !matches!(*session, Session::Closed) {
			debug!("[client] closing session to {}", self.config.socket_path.display());
		}
		*session = Session::Closed;
	}

	pub fn is_closed(&self) -> bool {
		matches!(*self.session.lock(), Session::Closed)
	}

	fn roundtrip(&self, req: &Request) -> Result<Response, ProtocolError> {
		let mut session = self.session.lock();
		if matches!(*session, Session::Disconnected) {
			debug!("[client] re-establishing session");
			*session = Session::Open(open(&self.config)?);
		}
		let conn = match &mut *session {
			Session::Open(conn) => conn,
			_ => return Err(ProtocolError::SessionClosed),
		};

		debug!("[client] {} {} ({} bytes)", req.method.as_str(), req.target(), req.body.len());
		let deadline = Instant::now() + self.config.timeout();
		let result = conn.exchange(req, deadline);
		match &result {
			Ok(resp) => debug!("[client] <- {} ({} bytes)", resp.status, resp.body.len()),
			Err(e) if e.breaks_session() => {
				warn!("[client] discarding session after {} {}: {}", req.method.as_str(), req.path, e);
				*session = Session::Disconnected;
			}
			Err(_) => {}
		}
		result
	}

	fn sync(&self, req: &Request) -> Result<Value, ProtocolError> {
		let resp = self.roundtrip(req)?;
		sync_result(resp)
	}

	fn files_action(&self, body: &FilesRequest) -> Result<(), ProtocolError> {
		let req = Request::post(FILES_ENDPOINT).json(body)?;
		self.sync(&req).map(|_| ())
	}

	// === Operations ===

	pub fn stat(&self, path: &str, follow: bool) -> Result<FileInfo, ProtocolError> {
		let req = Request::get(FILES_ENDPOINT)
			.query("action", "stat")
			.query("path", path)
			.query("follow", follow.to_string());
		Ok(serde_json::from_value(self.sync(&req)?)?)
	}

	/// Entries of a directory, optionally filtered by a daemon-side pattern
	pub fn list_files(&self, path: &str, pattern: Option<&str>) -> Result<Vec<FileInfo>, ProtocolError> {
		let mut req = Request::get(FILES_ENDPOINT).query("action", "list").query("path", path);
		if let Some(pattern) = pattern {
			req = req.query("pattern", pattern);
		}
		Ok(serde_json::from_value(self.sync(&req)?)?)
	}

	pub fn read_chunk(&self, path: &str, offset: u64, length: usize) -> Result<Vec<u8>, ProtocolError> {
		let req = Request::get(FILES_ENDPOINT)
			.query("action", "read")
			.query("path", path)
			.query("offset", offset.to_string())
			.query("length", length.to_string());
		let resp = self.roundtrip(&req)?;
		if resp.status == 200 && !resp.is_json() {
			if resp.body.len() > length {
				return Err(ProtocolError::Malformed(format!(
					"asked for {} bytes, got {}",
					length,
					resp.body.len()
				)));
			}
			return Ok(resp.body);
		}
		sync_result(resp)?;
		Err(ProtocolError::Malformed("read returned JSON instead of file content".into()))
	}

	/// Whole file content, read in chunks until a short one arrives
	pub fn read_file(&self, path: &str) -> Result<Vec<u8>, ProtocolError> {
		let chunk_size = self.config.max_chunk_size;
		let mut data = Vec::new();
		loop {
			let chunk = self.read_chunk(path, data.len() as u64, chunk_size)?;
			let short = chunk.len() < chunk_size;
			data.extend_from_slice(&chunk);
			if short {
				return Ok(data);
			}
		}
	}

	pub fn write_chunk(
		&self,
		path: &str,
		offset: u64,
		truncate: bool,
		data: &[u8],
		attrs: Option<&WriteAttrs>,
	) -> Result<(), ProtocolError> {
		let mut req = Request::post(FILES_ENDPOINT)
			.query("action", "write")
			.query("path", path)
			.query("offset", offset.to_string())
			.query("truncate", truncate.to_string());
		if let Some(attrs) = attrs {
			if let Some(mode) = attrs.permissions {
				req = req.query("permissions", format_permissions(mode));
			}
			if let Some(user) = &attrs.user {
				req = req.query("user", user.clone());
			}
			if let Some(group) = &attrs.group {
				req = req.query("group", group.clone());
			}
		}
		self.sync(&req.octets(data.to_vec())).map(|_| ())
	}

	/// Replace the file with `data`; the first chunk truncates, even when empty
	pub fn write_file(&self, path: &str, data: &[u8], attrs: &WriteAttrs) -> Result<usize, ProtocolError> {
		let chunk_size = self.config.max_chunk_size;
		let first = &data[..data.len().min(chunk_size)];
		self.write_chunk(path, 0, true, first, Some(attrs))?;
		let mut offset = first.len();
		while offset < data.len() {
			let end = (offset + chunk_size).min(data.len());
			self.write_chunk(path, offset as u64, false, &data[offset..end], None)?;
			offset = end;
		}
		Ok(data.len())
	}

	pub fn make_dir(&self, item: MakeDirItem) -> Result<(), ProtocolError> {
		self.files_action(&FilesRequest::MakeDirs { dirs: vec![item] })
	}

	pub fn remove_path(&self, path: &str, recursive: bool) -> Result<(), ProtocolError> {
		self.files_action(&FilesRequest::Remove { paths: vec![RemoveItem { path: path.to_string(), recursive }] })
	}

	pub fn set_permissions(&self, path: &str, mode: u32) -> Result<(), ProtocolError> {
		self.files_action(&FilesRequest::SetPermissions {
			path: path.to_string(),
			permissions: format_permissions(mode),
		})
	}

	pub fn set_owner(&self, path: &str, user: Option<&str>, group: Option<&str>) -> Result<(), ProtocolError> {
		self.files_action(&FilesRequest::SetOwner {
			path: path.to_string(),
			user: user.map(str::to_string),
			group: group.map(str::to_string),
		})
	}
}

impl Drop for Client {
	fn drop(&mut self) {
		self.close();
	}
}

fn open(config: &RemoteConfig) -> Result<Connection, ProtocolError> {
	let mut attempt = 0;
	loop {
		match UnixStream::connect(&config.socket_path) {
			Ok(stream) => {
				debug!("[client] connected to {}", config.socket_path.display());
				return Ok(Connection { stream: BufReader::new(DeadlineStream::new(stream)) });
			}
			Err(e) if attempt < config.connect_retries && is_transient(&e) => {
				attempt += 1;
				warn!(
					"[client] connect to {} failed ({}), retry {}/{}",
					config.socket_path.display(),
					e,
					attempt,
					config.connect_retries
				);
				thread::sleep(config.retry_delay());
			}
			Err(e) => {
				return Err(ProtocolError::ConnectFailed {
					socket: config.socket_path.display().to_string(),
					source: e,
				})
			}
		}
	}
}

fn is_transient(e: &std::io::Error) -> bool {
	use std::io::ErrorKind::*;
	matches!(e.kind(), ConnectionRefused | NotFound | WouldBlock | Interrupted)
}

/// Unwrap a sync envelope, turning error envelopes into `ProtocolError::Api`
fn sync_result(resp: Response) -> Result<Value, ProtocolError> {
	if !resp.is_json() {
		if resp.status == 200 {
			return Err(ProtocolError::Malformed("expected a JSON response".into()));
		}
		return Err(ProtocolError::Api {
			status: resp.status,
			kind: None,
			message: String::from_utf8_lossy(&resp.body).trim().to_string(),
		});
	}
	let envelope: Envelope = serde_json::from_slice(&resp.body)?;
	match envelope.kind {
		EnvelopeKind::Sync => Ok(envelope.result),
		EnvelopeKind::Error => {
			let error: ErrorResult = serde_json::from_value(envelope.result)?;
			Err(ProtocolError::Api { status: envelope.status_code, kind: error.kind, message: error.message })
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn json_response(envelope: &Envelope) -> Response {
		Response::envelope(envelope).unwrap()
	}

	#[test]
	fn test_sync_result_unwraps() {
		let value = sync_result(json_response(&Envelope::sync(json!([1, 2])))).unwrap();
		assert_eq!(value, json!([1, 2]));
	}

	#[test]
	fn test_sync_result_error_envelope() {
		let err = sync_result(json_response(&Envelope::error(400, Some("directory-not-empty"), "busy"))).unwrap_err();
		match err {
			ProtocolError::Api { status, kind, message } => {
				assert_eq!(status, 400);
				assert_eq!(kind.as_deref(), Some("directory-not-empty"));
				assert_eq!(message, "busy");
			}
			other => panic!("unexpected {:?}", other),
		}
	}

	#[test]
	fn test_sync_result_plain_text_error() {
		let resp = Response { status: 404, content_type: Some("text/plain".into()), body: b"nope\n".to_vec() };
		assert!(matches!(sync_result(resp), Err(ProtocolError::Api { status: 404, kind: None, .. })));

		let resp = Response { status: 200, content_type: Some("application/json".into()), body: b"{oops".to_vec() };
		assert!(matches!(sync_result(resp), Err(ProtocolError::Malformed(_))));
	}

	#[test]
	fn test_connect_fails_without_daemon() {
		let dir = tempfile::TempDir::new().unwrap();
		let config = RemoteConfig::new(dir.path().join("absent.socket"))
			.with_connect_retries(1, std::time::Duration::from_millis(1));
		assert!(matches!(Client::connect(config), Err(ProtocolError::ConnectFailed { .. })));
	}
}

// vim: ts=4
