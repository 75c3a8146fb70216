//! HTTP/1.1 framing over the daemon socket
//!
//! Only the subset the daemon speaks: one request, one response,
//! `Content-Length` bodies, no chunked transfer encoding, no pipelining.
//! Both directions are implemented so test daemons can share the framing.

use std::io::{self, BufRead, Read, Write};
use std::os::unix::net::UnixStream;
use std::time::{Duration, Instant};

use url::form_urlencoded;

use super::error::ProtocolError;
use super::types::{status_text, Envelope};

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_OCTETS: &str = "application/octet-stream";

/// Longest accepted request, status or header line
const MAX_LINE: usize = 8 * 1024;

/// Most headers accepted in one message
const MAX_HEADERS: usize = 64;

/// Largest accepted body
pub const MAX_BODY: usize = 256 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
	Get,
	Post,
}

impl Method {
	pub fn as_str(&self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
		}
	}
}

/// One request to the daemon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
	pub method: Method,
	pub path: String,
	pub query: Vec<(String, String)>,
	pub content_type: Option<String>,
	pub body: Vec<u8>,
}

impl Request {
	pub fn get(path: &str) -> Self {
		Self { method: Method::Get, path: path.to_string(), query: Vec::new(), content_type: None, body: Vec::new() }
	}

	pub fn post(path: &str) -> Self {
		Self { method: Method::Post, ..Self::get(path) }
	}

	pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
		self.query.push((key.to_string(), value.into()));
		self
	}

	pub fn json<T: serde::Serialize>(mut self, body: &T) -> Result<Self, ProtocolError> {
		self.body = serde_json::to_vec(body)?;
		self.content_type = Some(CONTENT_TYPE_JSON.to_string());
		Ok(self)
	}

	pub fn octets(mut self, body: Vec<u8>) -> Self {
		self.body = body;
		self.content_type = Some(CONTENT_TYPE_OCTETS.to_string());
		self
	}

	/// First value of a query parameter
	pub fn query_value(&self, key: &str) -> Option<&str> {
		self.query.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
	}

	/// Request target: path plus the encoded query string
	pub fn target(&self) -> String {
		if self.query.is_empty() {
			return self.path.clone();
		}
		let query = form_urlencoded::Serializer::new(String::new())
			.extend_pairs(self.query.iter().map(|(k, v)| (k.as_str(), v.as_str())))
			.finish();
		format!("{}?{}", self.path, query)
	}

	pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
		let mut head = format!(
			"{} {} HTTP/1.1\r\nHost: localhost\r\nContent-Length: {}\r\n",
			self.method.as_str(),
			self.target(),
			self.body.len()
		);
		if let Some(ct) = &self.content_type {
			head.push_str(&format!("Content-Type: {}\r\n", ct));
		}
		head.push_str("\r\n");
		w.write_all(head.as_bytes())?;
		w.write_all(&self.body)?;
		w.flush()
	}

	/// Read one request; `None` when the peer closed the connection cleanly
	pub fn read_from<R: BufRead>(r: &mut R) -> Result<Option<Self>, ProtocolError> {
		let line = match read_line(r)? {
			Some(line) => line,
			None => return Ok(None),
		};
		let mut parts = line.split(' ');
		let method = match parts.next() {
			Some("GET") => Method::Get,
			Some("POST") => Method::Post,
			other => return Err(ProtocolError::Malformed(format!("unsupported method {:?}", other))),
		};
		let target = parts.next().ok_or_else(|| ProtocolError::Malformed("missing request target".into()))?;
		let (path, query) = match target.split_once('?') {
			Some((path, query)) => (path, form_urlencoded::parse(query.as_bytes()).into_owned().collect()),
			None => (target, Vec::new()),
		};
		let head = read_headers(r)?;
		let body = read_body(r, head.content_length)?;
		Ok(Some(Self { method, path: path.to_string(), query, content_type: head.content_type, body }))
	}
}

/// One response from the daemon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
	pub status: u16,
	pub content_type: Option<String>,
	pub body: Vec<u8>,
}

impl Response {
	pub fn envelope(envelope: &Envelope) -> Result<Self, ProtocolError> {
		Ok(Self {
			status: envelope.status_code,
			content_type: Some(CONTENT_TYPE_JSON.to_string()),
			body: serde_json::to_vec(envelope)?,
		})
	}

	pub fn octets(body: Vec<u8>) -> Self {
		Self { status: 200, content_type: Some(CONTENT_TYPE_OCTETS.to_string()), body }
	}

	pub fn is_json(&self) -> bool {
		self.content_type.as_deref().map_or(false, |ct| ct.starts_with(CONTENT_TYPE_JSON))
	}

	pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
		let mut head = format!(
			"HTTP/1.1 {} {}\r\nContent-Length: {}\r\n",
			self.status,
			status_text(self.status),
			self.body.len()
		);
		if let Some(ct) = &self.content_type {
			head.push_str(&format!("Content-Type: {}\r\n", ct));
		}
		head.push_str("\r\n");
		w.write_all(head.as_bytes())?;
		w.write_all(&self.body)?;
		w.flush()
	}

	pub fn read_from<R: BufRead>(r: &mut R) -> Result<Self, ProtocolError> {
		let line = read_line(r)?.ok_or(ProtocolError::Disconnected)?;
		let mut parts = line.splitn(3, ' ');
		match parts.next() {
			Some(version) if version.starts_with("HTTP/1.") => {}
			_ => return Err(ProtocolError::Malformed(format!("bad status line {:?}", line))),
		}
		let status = parts
			.next()
			.and_then(|s| s.parse::<u16>().ok())
			.ok_or_else(|| ProtocolError::Malformed(format!("bad status line {:?}", line)))?;
		let head = read_headers(r)?;
		let body = read_body(r, head.content_length)?;
		Ok(Self { status, content_type: head.content_type, body })
	}
}

struct Head {
	content_length: usize,
	content_type: Option<String>,
}

/// Read a CRLF-terminated line; `None` on EOF before any byte
fn read_line<R: BufRead>(r: &mut R) -> Result<Option<String>, ProtocolError> {
	let mut buf = Vec::new();
	let n = r.by_ref().take(MAX_LINE as u64 + 1).read_until(b'\n', &mut buf)?;
	if n == 0 {
		return Ok(None);
	}
	if buf.last() != Some(&b'\n') {
		if buf.len() > MAX_LINE {
			return Err(ProtocolError::Malformed("header line too long".into()));
		}
		return Err(ProtocolError::Disconnected);
	}
	buf.pop();
	if buf.last() == Some(&b'\r') {
		buf.pop();
	}
	String::from_utf8(buf).map(Some).map_err(|_| ProtocolError::Malformed("header is not UTF-8".into()))
}

fn read_headers<R: BufRead>(r: &mut R) -> Result<Head, ProtocolError> {
	let mut head = Head { content_length: 0, content_type: None };
	for _ in 0..=MAX_HEADERS {
		let line = read_line(r)?.ok_or(ProtocolError::Disconnected)?;
		if line.is_empty() {
			return Ok(head);
		}
		let (name, value) =
			line.split_once(':').ok_or_else(|| ProtocolError::Malformed(format!("bad header {:?}", line)))?;
		let value = value.trim();
		if name.eq_ignore_ascii_case("content-length") {
			head.content_length = value
				.parse()
				.map_err(|_| ProtocolError::Malformed(format!("bad Content-Length {:?}", value)))?;
		} else if name.eq_ignore_ascii_case("content-type") {
			head.content_type = Some(value.to_string());
		} else if name.eq_ignore_ascii_case("transfer-encoding") {
			return Err(ProtocolError::Malformed(format!("unsupported Transfer-Encoding {:?}", value)));
		}
	}
	Err(ProtocolError::Malformed("too many headers".into()))
}

fn read_body<R: Read>(r: &mut R, len: usize) -> Result<Vec<u8>, ProtocolError> {
	if len > MAX_BODY {
		return Err(ProtocolError::Malformed(format!("body of {} bytes exceeds limit", len)));
	}
	let mut body = vec![0; len];
	r.read_exact(&mut body)?;
	Ok(body)
}

/// Socket wrapper enforcing an absolute deadline on every read and write
///
/// Before each call the socket timeout is set to the time left; once the
/// deadline has passed, calls fail with `TimedOut` without touching the socket.
#[derive(Debug)]
pub struct DeadlineStream {
	stream: UnixStream,
	deadline: Option<Instant>,
}

impl DeadlineStream {
	pub fn new(stream: UnixStream) -> Self {
		Self { stream, deadline: None }
	}

	pub fn set_deadline(&mut self, deadline: Option<Instant>) {
		self.deadline = deadline;
	}

	fn remaining(&self) -> io::Result<Option<Duration>> {
		match self.deadline {
			None => Ok(None),
			Some(deadline) => {
				let left = deadline.saturating_duration_since(Instant::now());
				if left.is_zero() {
					Err(io::Error::new(io::ErrorKind::TimedOut, "request deadline exceeded"))
				} else {
					Ok(Some(left))
				}
			}
		}
	}
}

impl Read for DeadlineStream {
	fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
		let left = self.remaining()?;
		self.stream.set_read_timeout(left)?;
		self.stream.read(buf)
	}
}

impl Write for DeadlineStream {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		let left = self.remaining()?;
		self.stream.set_write_timeout(left)?;
		self.stream.write(buf)
	}

	fn flush(&mut self) -> io::Result<()> {
		self.stream.flush()
	}
}


// vim: ts=4
