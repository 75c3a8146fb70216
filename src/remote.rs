//! Remote filesystem backend
//!
//! A [`RemoteRoot`] owns one protocol session; every [`RemotePath`] created
//! from it shares that session. Remote paths are always absolute.
//!
//! ```ignore
//! let root = RemoteRoot::connect(RemoteConfig::new("/run/files.socket"))?;
//! let conf = root.path("/etc/app")?.join("app.conf");
//! conf.write_text("debug = true\n", Encoding::Utf8, &WriteOptions::new())?;
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Div;
use std::sync::Arc;

use crate::config::RemoteConfig;
use crate::error::{ErrorKind, PathError, PathResult};
use crate::logging::*;
use crate::metadata::FileMetadata;
use crate::path::{DirEntries, ListedEntry, MkdirOptions, PathOps, WriteOptions};
use crate::protocol::{Client, FileInfo, MakeDirItem, ProtocolError, WriteAttrs};
use crate::protocol::types::format_permissions;
use crate::pure::PosixPath;

/// Entry point to one daemon
#[derive(Clone)]
pub struct RemoteRoot {
	client: Arc<Client>,
}

impl RemoteRoot {
	/// Validate the configuration and establish the session
	pub fn connect(config: RemoteConfig) -> PathResult<Self> {
		let socket = config.socket_path.display().to_string();
		config
			.validate()
			.map_err(|e| PathError::invalid_argument("connect", socket.clone(), e.to_string()))?;
		let client = Client::connect(config).map_err(|e| e.into_path_error("connect", &socket))?;
		info!("[remote] connected to {}", socket);
		Ok(Self { client: Arc::new(client) })
	}

	/// A path bound to this root; must be absolute
	pub fn path(&self, path: &str) -> PathResult<RemotePath> {
		let posix = PosixPath::new(path);
		if !posix.is_absolute() {
			return Err(PathError::invalid_argument("path", path, "remote paths must be absolute"));
		}
		Ok(RemotePath { client: self.client.clone(), path: posix })
	}

	pub fn config(&self) -> &RemoteConfig {
		self.client.config()
	}

	/// Release the session; paths bound to it fail with `ProtocolError` afterwards
	pub fn close(&self) {
		self.client.close();
	}

	pub fn is_closed(&self) -> bool {
		self.client.is_closed()
	}
}

impl fmt::Debug for RemoteRoot {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RemoteRoot").field("socket", &self.client.config().socket_path).finish()
	}
}

/// A path on the far side of a daemon session
#[derive(Clone)]
pub struct RemotePath {
	client: Arc<Client>,
	path: PosixPath,
}

impl RemotePath {
	/// The root this path is bound to
	pub fn root(&self) -> RemoteRoot {
		RemoteRoot { client: self.client.clone() }
	}

	/// Whether both paths go through the same session
	pub fn same_session(&self, other: &RemotePath) -> bool {
		Arc::ptr_eq(&self.client, &other.client)
	}

	fn session_id(&self) -> usize {
		Arc::as_ptr(&self.client) as usize
	}

	fn call<T>(
		&self,
		op: &'static str,
		f: impl FnOnce(&Client, &str) -> Result<T, ProtocolError>,
	) -> PathResult<T> {
		let path = self.path.to_string();
		f(self.client.as_ref(), &path).map_err(|e| e.into_path_error(op, &path))
	}

	fn metadata(&self, op: &'static str, info: FileInfo) -> PathResult<FileMetadata> {
		info.to_metadata()
			.map_err(|e| PathError::new(ErrorKind::ProtocolError, op, self.to_string()).with_message(e))
	}

	fn fetch(&self, op: &'static str, follow: bool) -> PathResult<FileMetadata> {
		let info = self.call(op, |c, p| c.stat(p, follow))?;
		self.metadata(op, info)
	}
}

impl PathOps for RemotePath {
	fn posix(&self) -> &PosixPath {
		&self.path
	}

	fn with_segments(&self, path: PosixPath) -> Self {
		let path = if path.is_absolute() { path } else { PosixPath::from_segments(true, path.segments()) };
		Self { client: self.client.clone(), path }
	}

	fn max_glob_depth(&self) -> usize {
		self.client.config().max_glob_depth
	}

	fn default_file_mode(&self) -> u32 {
		self.client.config().default_file_mode
	}

	fn probe(&self, follow_symlinks: bool) -> PathResult<Option<FileMetadata>> {
		match self.fetch("stat", follow_symlinks) {
			Ok(meta) => Ok(Some(meta)),
			Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => Ok(None),
			Err(e) => Err(e),
		}
	}

	fn stat(&self) -> PathResult<FileMetadata> {
		self.fetch("stat", true)
	}

	fn lstat(&self) -> PathResult<FileMetadata> {
		self.fetch("lstat", false)
	}

	fn read_bytes(&self) -> PathResult<Vec<u8>> {
		self.call("read", |c, p| c.read_file(p))
	}

	fn write_bytes(&self, data: &[u8], opts: &WriteOptions) -> PathResult<usize> {
		let config = self.client.config();
		let attrs = WriteAttrs {
			permissions: Some(opts.mode.unwrap_or_else(|| self.default_file_mode())),
			user: opts.user.clone().or_else(|| config.default_user.clone()),
			group: opts.group.clone().or_else(|| config.default_group.clone()),
		};
		let written = self.call("write", |c, p| c.write_file(p, data, &attrs))?;
		debug!("[remote] wrote {} bytes to {}", written, self);
		Ok(written)
	}

	fn mkdir(&self, opts: &MkdirOptions) -> PathResult<()> {
		let config = self.client.config();
		let path = self.to_string();

		if opts.parents && !opts.exist_ok && self.exists()? {
			return Err(PathError::new(ErrorKind::AlreadyExists, "mkdir", path));
		}
		let parent = self.parent();
		if !opts.parents && opts.exist_ok && !parent.exists()? {
			return Err(PathError::new(ErrorKind::NotFound, "mkdir", path)
				.with_message(format!("parent {} does not exist", parent)));
		}

		if opts.parents && !parent.posix().is_root() {
			let item = MakeDirItem {
				path: parent.to_string(),
				make_parents: true,
				permissions: Some(format_permissions(config.default_dir_mode)),
				user: None,
				group: None,
			};
			parent.call("mkdir", |c, _| c.make_dir(item)).map_err(|e| match e.kind() {
				// An ancestor exists but is not a directory
				ErrorKind::AlreadyExists => PathError::new(ErrorKind::NotADirectory, "mkdir", path.clone()),
				_ => e,
			})?;
		}

		let item = MakeDirItem {
			path: path.clone(),
			make_parents: opts.exist_ok,
			permissions: Some(format_permissions(opts.mode.unwrap_or(config.default_dir_mode))),
			user: opts.user.clone().or_else(|| config.default_user.clone()),
			group: opts.group.clone().or_else(|| config.default_group.clone()),
		};
		match self.call("mkdir", |c, _| c.make_dir(item)) {
			Ok(()) => {}
			Err(e) if e.kind() == ErrorKind::NotADirectory => {
				// Either the parent or the target itself is not a directory
				let kind =
					if parent.is_dir()? { ErrorKind::AlreadyExists } else { ErrorKind::NotADirectory };
				return Err(PathError::new(kind, "mkdir", path));
			}
			Err(e) => return Err(e),
		}
		debug!("[remote] created directory {}", path);
		Ok(())
	}

	fn rmdir(&self) -> PathResult<()> {
		let meta = self.lstat().map_err(|e| PathError::new(e.kind(), "rmdir", self.to_string()))?;
		if !meta.is_dir() {
			return Err(PathError::new(ErrorKind::NotADirectory, "rmdir", self.to_string()));
		}
		self.call("rmdir", |c, p| c.remove_path(p, false))
	}

	fn unlink(&self, missing_ok: bool) -> PathResult<()> {
		let meta = match self.fetch("unlink", false) {
			Ok(meta) => meta,
			Err(e) if missing_ok && matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
				return Ok(())
			}
			Err(e) => return Err(e),
		};
		if meta.is_dir() {
			return Err(PathError::new(ErrorKind::IsADirectory, "unlink", self.to_string()));
		}
		match self.call("unlink", |c, p| c.remove_path(p, false)) {
			Err(e) if missing_ok && e.is_not_found() => Ok(()),
			other => other,
		}
	}

	fn iterdir(&self) -> PathResult<DirEntries<Self>> {
		Ok(self.scandir()?.map_paths(|entry| entry.path))
	}

	fn scandir(&self) -> PathResult<DirEntries<ListedEntry<Self>>> {
		if !self.fetch("iterdir", true)?.is_dir() {
			return Err(PathError::new(ErrorKind::NotADirectory, "iterdir", self.to_string()));
		}
		let infos = self.call("iterdir", |c, p| c.list_files(p, None))?;
		let parent = self.clone();
		let children: Vec<PathResult<ListedEntry<Self>>> = infos
			.into_iter()
			.filter_map(|info| {
				let name = if info.name.is_empty() {
					info.path.rsplit('/').next().unwrap_or_default().to_string()
				} else {
					info.name
				};
				match name.as_str() {
					"" | "." | ".." => None,
					_ => Some(Ok(ListedEntry { path: parent.join(&name), kind: Some(info.kind) })),
				}
			})
			.collect();
		Ok(DirEntries::new(children.into_iter()))
	}

	fn chmod(&self, mode: u32) -> PathResult<()> {
		self.call("chmod", |c, p| c.set_permissions(p, mode))
	}

	fn chown(&self, user: Option<&str>, group: Option<&str>) -> PathResult<()> {
		self.call("chown", |c, p| c.set_owner(p, user, group))
	}
}

impl PartialEq for RemotePath {
	fn eq(&self, other: &Self) -> bool {
		self.path == other.path && self.same_session(other)
	}
}

impl Eq for RemotePath {}

impl Hash for RemotePath {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.path.hash(state);
		self.session_id().hash(state);
	}
}

impl PartialOrd for RemotePath {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for RemotePath {
	fn cmp(&self, other: &Self) -> Ordering {
		self.path.cmp(&other.path).then_with(|| self.session_id().cmp(&other.session_id()))
	}
}

impl fmt::Debug for RemotePath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RemotePath")
			.field("socket", &self.client.config().socket_path)
			.field("path", &self.path.to_string())
			.finish()
	}
}

impl fmt::Display for RemotePath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(&self.path, f)
	}
}

impl<S: AsRef<str>> Div<S> for &RemotePath {
	type Output = RemotePath;

	fn div(self, rhs: S) -> RemotePath {
		self.join(rhs.as_ref())
	}
}

impl<S: AsRef<str>> Div<S> for RemotePath {
	type Output = RemotePath;

	fn div(self, rhs: S) -> RemotePath {
		self.join(rhs.as_ref())
	}
}

// vim: ts=4
