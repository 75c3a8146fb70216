//! Local filesystem backend
//!
//! Maps the [`PathOps`] contract directly onto host syscalls. OS errors are
//! normalized into the shared taxonomy so callers see the same kinds the
//! remote backend produces.

use nix::unistd::AccessFlags;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::ops::Div;
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::{Path, PathBuf};

use crate::error::{ErrorKind, PathError, PathResult};
use crate::logging::*;
use crate::metadata::{self, FileKind, FileMetadata};
use crate::path::{
	DirEntries, ListedEntry, MkdirOptions, PathOps, WriteOptions, DEFAULT_MKDIR_MODE, DEFAULT_WRITE_MODE,
};
use crate::pure::PosixPath;

// Same bound the kernel uses for symlink resolution
const MAX_SYMLINK_HOPS: usize = 40;

/// A path on the local filesystem
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalPath {
	path: PosixPath,
}

impl LocalPath {
	pub fn new(path: impl AsRef<str>) -> Self {
		Self { path: PosixPath::new(path.as_ref()) }
	}

	/// Convert a std path; fails for non-UTF-8 paths
	pub fn from_std(path: &Path) -> PathResult<Self> {
		match path.to_str() {
			Some(s) => Ok(Self::new(s)),
			None => Err(PathError::invalid_argument(
				"new",
				path.display().to_string(),
				"path is not valid UTF-8",
			)),
		}
	}

	pub fn as_std_path(&self) -> PathBuf {
		PathBuf::from(self.path.to_string())
	}

	fn err(&self, op: &'static str, e: &io::Error) -> PathError {
		PathError::from_io(op, self.to_string(), e)
	}

	// The file a write should land on: follows a final symlink, even a dangling one
	fn write_target(&self) -> PathResult<PathBuf> {
		let mut target = self.as_std_path();
		for _ in 0..MAX_SYMLINK_HOPS {
			match fs::symlink_metadata(&target) {
				Ok(meta) if meta.file_type().is_symlink() => {
					let link = fs::read_link(&target).map_err(|e| self.err("write", &e))?;
					target = match target.parent() {
						Some(parent) => parent.join(link),
						None => link,
					};
				}
				_ => return Ok(target),
			}
		}
		Err(PathError::new(ErrorKind::BackendError, "write", self.to_string())
			.with_message("too many levels of symbolic links"))
	}
}

/// Resolve optional owner and group names to ids
pub(crate) fn resolve_owner(
	op: &'static str,
	path: &str,
	user: Option<&str>,
	group: Option<&str>,
) -> PathResult<(Option<u32>, Option<u32>)> {
	let uid = match user {
		Some(name) => Some(metadata::lookup_user(name).ok_or_else(|| {
			PathError::new(ErrorKind::LookupFailed, op, path).with_message(format!("unknown user {:?}", name))
		})?),
		None => None,
	};
	let gid = match group {
		Some(name) => Some(metadata::lookup_group(name).ok_or_else(|| {
			PathError::new(ErrorKind::LookupFailed, op, path).with_message(format!("unknown group {:?}", name))
		})?),
		None => None,
	};
	Ok((uid, gid))
}

fn is_missing(e: &io::Error) -> bool {
	matches!(e.raw_os_error(), Some(libc::ENOENT) | Some(libc::ENOTDIR) | Some(libc::ELOOP))
		|| e.kind() == io::ErrorKind::NotFound
}

impl PathOps for LocalPath {
	fn posix(&self) -> &PosixPath {
		&self.path
	}

	fn with_segments(&self, path: PosixPath) -> Self {
		Self { path }
	}

	fn probe(&self, follow_symlinks: bool) -> PathResult<Option<FileMetadata>> {
		let path = self.as_std_path();
		let result = if follow_symlinks { fs::metadata(&path) } else { fs::symlink_metadata(&path) };
		match result {
			Ok(meta) => Ok(Some(FileMetadata::from_std(&meta))),
			Err(e) if is_missing(&e) => Ok(None),
			Err(e) => Err(self.err("stat", &e)),
		}
	}

	fn stat(&self) -> PathResult<FileMetadata> {
		fs::metadata(self.as_std_path())
			.map(|meta| FileMetadata::from_std(&meta))
			.map_err(|e| self.err("stat", &e))
	}

	fn lstat(&self) -> PathResult<FileMetadata> {
		fs::symlink_metadata(self.as_std_path())
			.map(|meta| FileMetadata::from_std(&meta))
			.map_err(|e| self.err("lstat", &e))
	}

	fn read_bytes(&self) -> PathResult<Vec<u8>> {
		fs::read(self.as_std_path()).map_err(|e| self.err("read", &e))
	}

	fn write_bytes(&self, data: &[u8], opts: &WriteOptions) -> PathResult<usize> {
		let path = self.to_string();
		let (uid, gid) = resolve_owner("write", &path, opts.user.as_deref(), opts.group.as_deref())?;
		let mode = opts.mode.unwrap_or(DEFAULT_WRITE_MODE);
		let target = self.write_target()?;

		match fs::metadata(&target) {
			Ok(meta) if meta.is_dir() => {
				return Err(PathError::new(ErrorKind::IsADirectory, "write", path));
			}
			Ok(_) => {
				if let Err(errno) = nix::unistd::access(&target, AccessFlags::W_OK) {
					return Err(PathError::from_io("write", path, &io::Error::from(errno)));
				}
			}
			Err(e) if e.kind() == io::ErrorKind::NotFound => {}
			Err(e) => return Err(PathError::from_io("write", path, &e)),
		}

		let parent = match target.parent() {
			Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
			_ => PathBuf::from("."),
		};
		match fs::metadata(&parent) {
			Ok(meta) if !meta.is_dir() => {
				return Err(PathError::new(ErrorKind::NotADirectory, "write", path));
			}
			Ok(_) => {}
			Err(e) => return Err(PathError::from_io("write", path, &e)),
		}

		// Temp file in the same directory so the final rename is atomic
		let mut tmp = tempfile::Builder::new()
			.prefix(".pathops-")
			.tempfile_in(&parent)
			.map_err(|e| PathError::from_io("write", path.clone(), &e))?;
		tmp.write_all(data).map_err(|e| PathError::from_io("write", path.clone(), &e))?;
		fs::set_permissions(tmp.path(), fs::Permissions::from_mode(mode))
			.map_err(|e| PathError::from_io("write", path.clone(), &e))?;
		if uid.is_some() || gid.is_some() {
			std::os::unix::fs::chown(tmp.path(), uid, gid)
				.map_err(|e| PathError::from_io("write", path.clone(), &e))?;
		}
		tmp.persist(&target).map_err(|e| PathError::from_io("write", path.clone(), &e.error))?;

		debug!("[local] wrote {} bytes to {}", data.len(), path);
		Ok(data.len())
	}

	fn mkdir(&self, opts: &MkdirOptions) -> PathResult<()> {
		let path = self.to_string();
		let (uid, gid) = resolve_owner("mkdir", &path, opts.user.as_deref(), opts.group.as_deref())?;
		let mode = opts.mode.unwrap_or(DEFAULT_MKDIR_MODE);
		let target = self.as_std_path();

		if opts.parents {
			let parent = self.parent().as_std_path();
			if let Err(e) = fs::DirBuilder::new().recursive(true).mode(DEFAULT_MKDIR_MODE).create(&parent) {
				// An ancestor exists but is not a directory
				let kind = match e.kind() {
					io::ErrorKind::AlreadyExists => ErrorKind::NotADirectory,
					_ => crate::error::kind_from_io(&e),
				};
				return Err(PathError::new(kind, "mkdir", path).with_message(e.to_string()));
			}
		}

		match fs::DirBuilder::new().mode(mode).create(&target) {
			Ok(()) => {}
			Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
				if opts.exist_ok && target.is_dir() {
					return Ok(());
				}
				return Err(PathError::new(ErrorKind::AlreadyExists, "mkdir", path));
			}
			Err(e) => return Err(PathError::from_io("mkdir", path, &e)),
		}

		// DirBuilder is subject to the umask; set the exact bits like the daemon does
		fs::set_permissions(&target, fs::Permissions::from_mode(mode))
			.map_err(|e| PathError::from_io("mkdir", path.clone(), &e))?;
		if uid.is_some() || gid.is_some() {
			std::os::unix::fs::chown(&target, uid, gid)
				.map_err(|e| PathError::from_io("mkdir", path.clone(), &e))?;
		}
		debug!("[local] created directory {} ({:o})", path, mode);
		Ok(())
	}

	fn rmdir(&self) -> PathResult<()> {
		let target = self.as_std_path();
		let meta = fs::symlink_metadata(&target).map_err(|e| self.err("rmdir", &e))?;
		if !meta.is_dir() {
			return Err(PathError::new(ErrorKind::NotADirectory, "rmdir", self.to_string()));
		}
		fs::remove_dir(&target).map_err(|e| {
			if e.raw_os_error() == Some(libc::EEXIST) {
				PathError::new(ErrorKind::NotEmpty, "rmdir", self.to_string())
			} else {
				self.err("rmdir", &e)
			}
		})
	}

	fn unlink(&self, missing_ok: bool) -> PathResult<()> {
		let target = self.as_std_path();
		match fs::symlink_metadata(&target) {
			Ok(meta) if meta.is_dir() => {
				Err(PathError::new(ErrorKind::IsADirectory, "unlink", self.to_string()))
			}
			Ok(_) => fs::remove_file(&target).map_err(|e| self.err("unlink", &e)),
			Err(e) if missing_ok && is_missing(&e) => Ok(()),
			Err(e) => Err(self.err("unlink", &e)),
		}
	}

	fn iterdir(&self) -> PathResult<DirEntries<Self>> {
		Ok(self.scandir()?.map_paths(|entry| entry.path))
	}

	fn scandir(&self) -> PathResult<DirEntries<ListedEntry<Self>>> {
		let target = self.as_std_path();
		let meta = fs::metadata(&target).map_err(|e| self.err("iterdir", &e))?;
		if !meta.is_dir() {
			return Err(PathError::new(ErrorKind::NotADirectory, "iterdir", self.to_string()));
		}
		let entries = fs::read_dir(&target).map_err(|e| self.err("iterdir", &e))?;
		let parent = self.clone();
		Ok(DirEntries::new(entries.map(move |entry| {
			let entry = entry.map_err(|e| parent.err("iterdir", &e))?;
			let name = entry.file_name();
			let Some(name) = name.to_str() else {
				return Err(PathError::invalid_argument(
					"iterdir",
					parent.to_string(),
					format!("entry {:?} is not valid UTF-8", name),
				));
			};
			let kind = entry.file_type().ok().map(|t| FileKind::from_std(&t));
			Ok(ListedEntry { path: parent.join(name), kind })
		})))
	}

	fn chmod(&self, mode: u32) -> PathResult<()> {
		fs::set_permissions(self.as_std_path(), fs::Permissions::from_mode(mode))
			.map_err(|e| self.err("chmod", &e))
	}

	fn chown(&self, user: Option<&str>, group: Option<&str>) -> PathResult<()> {
		let (uid, gid) = resolve_owner("chown", &self.to_string(), user, group)?;
		std::os::unix::fs::chown(self.as_std_path(), uid, gid).map_err(|e| self.err("chown", &e))
	}
}

impl fmt::Display for LocalPath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(&self.path, f)
	}
}

impl From<&str> for LocalPath {
	fn from(s: &str) -> Self {
		LocalPath::new(s)
	}
}

impl<S: AsRef<str>> Div<S> for &LocalPath {
	type Output = LocalPath;

	fn div(self, rhs: S) -> LocalPath {
		self.join(rhs.as_ref())
	}
}

impl<S: AsRef<str>> Div<S> for LocalPath {
	type Output = LocalPath;

	fn div(self, rhs: S) -> LocalPath {
		self.join(rhs.as_ref())
	}
}


// vim: ts=4
