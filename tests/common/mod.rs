//! In-process file-control daemon for integration tests
//!
//! Serves the host filesystem (paths map one to one) over the daemon wire
//! protocol on a temporary Unix socket, so local and remote views of the same
//! temp directory can be compared directly.

#![allow(dead_code)]

use std::fs;
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::os::unix::fs::PermissionsExt;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tempfile::TempDir;

use pathops::error::{kind_from_io, ErrorKind};
use pathops::glob::SegmentMatcher;
use pathops::metadata::{lookup_group, lookup_user, FileMetadata};
use pathops::protocol::types::parse_permissions;
use pathops::protocol::wire::{Method, Request, Response};
use pathops::protocol::{wire_kind_for, Envelope, FileInfo, FilesRequest};
use pathops::{LocalPath, RemoteConfig, RemoteRoot};

/// How the daemon treats incoming requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
	Normal,
	/// Read requests but never answer
	Unresponsive,
	/// Answer with bytes that are not HTTP
	Garbage,
	/// Close the connection instead of answering
	Hangup,
}

struct Shared {
	stop: AtomicBool,
	mode: Mutex<Mode>,
	max_body: usize,
	actions: Mutex<Vec<String>>,
	streams: Mutex<Vec<UnixStream>>,
}

pub struct TestDaemon {
	socket_dir: TempDir,
	socket: PathBuf,
	shared: Arc<Shared>,
	handle: Option<JoinHandle<()>>,
}

impl TestDaemon {
	pub fn start() -> Self {
		Self::start_with_max_body(usize::MAX)
	}

	/// Reject request bodies larger than `max_body` with 413
	pub fn start_with_max_body(max_body: usize) -> Self {
		pathops::logging::init_tracing();
		let socket_dir = TempDir::new().unwrap();
		let socket = socket_dir.path().join("files.socket");
		let listener = UnixListener::bind(&socket).unwrap();
		listener.set_nonblocking(true).unwrap();

		let shared = Arc::new(Shared {
			stop: AtomicBool::new(false),
			mode: Mutex::new(Mode::Normal),
			max_body,
			actions: Mutex::new(Vec::new()),
			streams: Mutex::new(Vec::new()),
		});
		let accept_shared = shared.clone();
		let handle = thread::spawn(move || accept_loop(listener, accept_shared));
		Self { socket_dir, socket, shared, handle: Some(handle) }
	}

	pub fn socket(&self) -> &Path {
		&self.socket
	}

	pub fn config(&self) -> RemoteConfig {
		RemoteConfig::new(&self.socket).with_timeout(Duration::from_secs(5))
	}

	pub fn connect(&self) -> RemoteRoot {
		RemoteRoot::connect(self.config()).unwrap()
	}

	pub fn set_mode(&self, mode: Mode) {
		*self.shared.mode.lock().unwrap() = mode;
	}

	/// Actions received so far, in order
	pub fn actions(&self) -> Vec<String> {
		self.shared.actions.lock().unwrap().clone()
	}

	pub fn count(&self, action: &str) -> usize {
		self.actions().iter().filter(|a| a.as_str() == action).count()
	}

	pub fn clear_actions(&self) {
		self.shared.actions.lock().unwrap().clear();
	}

	pub fn stop(&mut self) {
		self.shared.stop.store(true, Ordering::SeqCst);
		for stream in self.shared.streams.lock().unwrap().drain(..) {
			let _ = stream.shutdown(std::net::Shutdown::Both);
		}
		if let Some(handle) = self.handle.take() {
			let _ = handle.join();
		}
		let _ = fs::remove_file(&self.socket);
	}
}

impl Drop for TestDaemon {
	fn drop(&mut self) {
		self.stop();
	}
}

/// A temp directory seen through both backends
pub struct Tree {
	pub dir: TempDir,
	pub local: LocalPath,
}

impl Tree {
	pub fn new() -> Self {
		let dir = TempDir::new().unwrap();
		let local = LocalPath::from_std(dir.path()).unwrap();
		Self { dir, local }
	}

	pub fn remote(&self, root: &RemoteRoot) -> pathops::RemotePath {
		root.path(self.dir.path().to_str().unwrap()).unwrap()
	}

	pub fn host(&self, rel: &str) -> PathBuf {
		self.dir.path().join(rel)
	}
}

pub fn running_as_root() -> bool {
	nix::unistd::geteuid().is_root()
}

fn accept_loop(listener: UnixListener, shared: Arc<Shared>) {
	while !shared.stop.load(Ordering::SeqCst) {
		match listener.accept() {
			Ok((stream, _)) => {
				stream.set_nonblocking(false).unwrap();
				if let Ok(clone) = stream.try_clone() {
					shared.streams.lock().unwrap().push(clone);
				}
				let conn_shared = shared.clone();
				thread::spawn(move || serve_connection(stream, conn_shared));
			}
			Err(e) if e.kind() == io::ErrorKind::WouldBlock => thread::sleep(Duration::from_millis(5)),
			Err(_) => break,
		}
	}
}

fn serve_connection(stream: UnixStream, shared: Arc<Shared>) {
	let mut writer = match stream.try_clone() {
		Ok(w) => w,
		Err(_) => return,
	};
	let mut reader = BufReader::new(stream);
	loop {
		let req = match Request::read_from(&mut reader) {
			Ok(Some(req)) => req,
			_ => return,
		};
		let action = match req.query_value("action") {
			Some(action) => action.to_string(),
			None => serde_json::from_slice::<serde_json::Value>(&req.body)
				.ok()
				.and_then(|v| v.get("action").and_then(|a| a.as_str()).map(str::to_string))
				.unwrap_or_default(),
		};
		shared.actions.lock().unwrap().push(action);

		let mode = *shared.mode.lock().unwrap();
		match mode {
			Mode::Normal => {}
			Mode::Unresponsive => {
				while !shared.stop.load(Ordering::SeqCst) && *shared.mode.lock().unwrap() == Mode::Unresponsive {
					thread::sleep(Duration::from_millis(10));
				}
				return;
			}
			Mode::Garbage => {
				if writer.write_all(b"NOT-HTTP garbage\r\n\r\n").is_err() {
					return;
				}
				continue;
			}
			Mode::Hangup => {
				// The accept loop holds a clone, so dropping is not enough
				let _ = writer.shutdown(std::net::Shutdown::Both);
				return;
			}
		}

		let resp = match handle(&req, &shared) {
			Ok(resp) => resp,
			Err(resp) => resp,
		};
		if resp.write_to(&mut writer).is_err() {
			return;
		}
	}
}

type Reply = Result<Response, Response>;

fn error_reply(status: u16, kind: Option<&str>, message: impl Into<String>) -> Response {
	Response::envelope(&Envelope::error(status, kind, message)).unwrap()
}

fn io_reply(e: io::Error) -> Response {
	let (kind, status) = wire_kind_for(kind_from_io(&e));
	error_reply(status, Some(kind), e.to_string())
}

fn sync_reply<T: serde::Serialize>(value: &T) -> Reply {
	Ok(Response::envelope(&Envelope::sync(serde_json::to_value(value).unwrap())).unwrap())
}

fn param<'a>(req: &'a Request, key: &str) -> Result<&'a str, Response> {
	req.query_value(key).ok_or_else(|| error_reply(400, None, format!("missing {}", key)))
}

fn number(req: &Request, key: &str) -> Result<u64, Response> {
	param(req, key)?.parse().map_err(|_| error_reply(400, None, format!("bad {}", key)))
}

fn handle(req: &Request, shared: &Shared) -> Reply {
	if req.path != "/v1/files" {
		return Err(error_reply(404, None, "unknown endpoint"));
	}
	if req.body.len() > shared.max_body {
		return Err(error_reply(413, None, "request body too large"));
	}
	match (req.method, req.query_value("action")) {
		(Method::Get, Some("stat")) => stat(req),
		(Method::Get, Some("list")) => list(req),
		(Method::Get, Some("read")) => read(req),
		(Method::Post, Some("write")) => write(req),
		(Method::Post, None) => {
			let body: FilesRequest =
				serde_json::from_slice(&req.body).map_err(|e| error_reply(400, None, e.to_string()))?;
			files_action(body)
		}
		_ => Err(error_reply(400, None, "unknown action")),
	}
}

fn info_for(path: &str, follow: bool) -> Result<FileInfo, Response> {
	let meta = if follow { fs::metadata(path) } else { fs::symlink_metadata(path) }.map_err(io_reply)?;
	Ok(FileInfo::from_metadata(path, &FileMetadata::from_std(&meta)))
}

fn stat(req: &Request) -> Reply {
	let follow = param(req, "follow").unwrap_or("true") == "true";
	sync_reply(&info_for(param(req, "path")?, follow)?)
}

fn list(req: &Request) -> Reply {
	let path = param(req, "path")?;
	let matcher = match req.query_value("pattern") {
		Some(p) => Some(SegmentMatcher::compile(p).map_err(|e| error_reply(400, None, e))?),
		None => None,
	};
	let mut infos = Vec::new();
	for entry in fs::read_dir(path).map_err(io_reply)? {
		let entry = entry.map_err(io_reply)?;
		let name = entry.file_name().to_string_lossy().into_owned();
		if matcher.as_ref().map_or(false, |m| !m.is_match(&name)) {
			continue;
		}
		let child = Path::new(path).join(&name);
		infos.push(info_for(&child.to_string_lossy(), false)?);
	}
	sync_reply(&infos)
}

fn read(req: &Request) -> Reply {
	let path = param(req, "path")?;
	let offset = number(req, "offset")?;
	let length = number(req, "length")?;
	if fs::metadata(path).map_err(io_reply)?.is_dir() {
		return Err(error_reply(400, Some("is-a-directory"), format!("{} is a directory", path)));
	}
	let mut file = fs::File::open(path).map_err(io_reply)?;
	file.seek(SeekFrom::Start(offset)).map_err(io_reply)?;
	let mut data = Vec::new();
	file.take(length).read_to_end(&mut data).map_err(io_reply)?;
	Ok(Response::octets(data))
}

fn owner_ids(user: Option<&str>, group: Option<&str>) -> Result<(Option<u32>, Option<u32>), Response> {
	let uid = match user {
		Some(name) => Some(lookup_user(name).ok_or_else(|| {
			error_reply(400, Some("lookup-failed"), format!("unknown user {}", name))
		})?),
		None => None,
	};
	let gid = match group {
		Some(name) => Some(lookup_group(name).ok_or_else(|| {
			error_reply(400, Some("lookup-failed"), format!("unknown group {}", name))
		})?),
		None => None,
	};
	Ok((uid, gid))
}

fn apply_attrs(path: &str, permissions: Option<&str>, user: Option<&str>, group: Option<&str>) -> Result<(), Response> {
	if let Some(perm) = permissions {
		let mode = parse_permissions(perm).map_err(|e| error_reply(400, None, e))?;
		fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(io_reply)?;
	}
	let (uid, gid) = owner_ids(user, group)?;
	if uid.is_some() || gid.is_some() {
		std::os::unix::fs::chown(path, uid, gid).map_err(io_reply)?;
	}
	Ok(())
}

fn write(req: &Request) -> Reply {
	let path = param(req, "path")?;
	let offset = number(req, "offset")?;
	let truncate = param(req, "truncate")? == "true";
	owner_ids(req.query_value("user"), req.query_value("group"))?;
	if fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false) {
		return Err(error_reply(400, Some("is-a-directory"), format!("{} is a directory", path)));
	}
	let mut file = fs::OpenOptions::new()
		.write(true)
		.create(truncate)
		.truncate(truncate)
		.open(path)
		.map_err(io_reply)?;
	file.seek(SeekFrom::Start(offset)).map_err(io_reply)?;
	file.write_all(&req.body).map_err(io_reply)?;
	if truncate {
		apply_attrs(path, req.query_value("permissions"), req.query_value("user"), req.query_value("group"))?;
	}
	sync_reply(&serde_json::Value::Null)
}

fn files_action(body: FilesRequest) -> Reply {
	match body {
		FilesRequest::MakeDirs { dirs } => {
			for dir in dirs {
				let created = if dir.make_parents { fs::create_dir_all(&dir.path) } else { fs::create_dir(&dir.path) };
				created.map_err(io_reply)?;
				apply_attrs(&dir.path, dir.permissions.as_deref(), dir.user.as_deref(), dir.group.as_deref())?;
			}
		}
		FilesRequest::Remove { paths } => {
			for item in paths {
				let meta = fs::symlink_metadata(&item.path).map_err(io_reply)?;
				let removed = match (meta.is_dir(), item.recursive) {
					(true, true) => fs::remove_dir_all(&item.path),
					(true, false) => fs::remove_dir(&item.path),
					(false, _) => fs::remove_file(&item.path),
				};
				removed.map_err(io_reply)?;
			}
		}
		FilesRequest::SetPermissions { path, permissions } => {
			apply_attrs(&path, Some(&permissions), None, None)?;
		}
		FilesRequest::SetOwner { path, user, group } => {
			apply_attrs(&path, None, user.as_deref(), group.as_deref())?;
		}
	}
	sync_reply(&serde_json::Value::Null)
}

/// Error kind of a result, for compact assertions
pub fn kind_of<T: std::fmt::Debug>(result: pathops::PathResult<T>) -> ErrorKind {
	result.unwrap_err().kind()
}

// vim: ts=4
