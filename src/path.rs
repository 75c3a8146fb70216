//! The capability contract shared by local and remote paths
//!
//! Code written against [`PathOps`] runs unchanged on either backend: the
//! same operations, the same error kinds, the same ordering. Pure path
//! algebra is provided here on top of [`PosixPath`]; each backend supplies
//! the I/O primitives.
//!
//! ```ignore
//! use pathops::{Encoding, MkdirOptions, PathOps, WriteOptions};
//!
//! fn install_config<P: PathOps>(dir: &P, body: &str) -> pathops::PathResult<()> {
//!     dir.mkdir(&MkdirOptions::new().parents(true).exist_ok(true))?;
//!     dir.join("app.conf").write_text(body, Encoding::Utf8, &WriteOptions::new().mode(0o600))?;
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::hash::Hash;
use std::ops::Div;

use crate::encoding::Encoding;
use crate::error::{ErrorKind, PathError, PathResult};
use crate::glob::{self, Glob};
use crate::local::LocalPath;
use crate::metadata::{FileKind, FileMetadata};
use crate::pure::PosixPath;
use crate::remote::RemotePath;

/// Default permissions for written files
pub const DEFAULT_WRITE_MODE: u32 = 0o644;

/// Default permissions for created directories
pub const DEFAULT_MKDIR_MODE: u32 = 0o755;

/// Ownership and permissions applied by `write_bytes` / `write_text`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOptions {
	/// Permission bits; the backend default when `None`
	pub mode: Option<u32>,
	/// Owner name; unchanged (or the backend default) when `None`
	pub user: Option<String>,
	/// Group name; unchanged (or the backend default) when `None`
	pub group: Option<String>,
}

impl WriteOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn mode(mut self, mode: u32) -> Self {
		self.mode = Some(mode);
		self
	}

	pub fn user(mut self, user: impl Into<String>) -> Self {
		self.user = Some(user.into());
		self
	}

	pub fn group(mut self, group: impl Into<String>) -> Self {
		self.group = Some(group.into());
		self
	}
}

/// Options for `mkdir`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MkdirOptions {
	pub mode: Option<u32>,
	/// Create missing parents (with the default directory mode)
	pub parents: bool,
	/// Succeed if the directory already exists
	pub exist_ok: bool,
	pub user: Option<String>,
	pub group: Option<String>,
}

impl MkdirOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn mode(mut self, mode: u32) -> Self {
		self.mode = Some(mode);
		self
	}

	pub fn parents(mut self, parents: bool) -> Self {
		self.parents = parents;
		self
	}

	pub fn exist_ok(mut self, exist_ok: bool) -> Self {
		self.exist_ok = exist_ok;
		self
	}

	pub fn user(mut self, user: impl Into<String>) -> Self {
		self.user = Some(user.into());
		self
	}

	pub fn group(mut self, group: impl Into<String>) -> Self {
		self.group = Some(group.into());
		self
	}
}

/// Lazy sequence of directory children
pub struct DirEntries<P> {
	inner: Box<dyn Iterator<Item = PathResult<P>> + Send>,
}

impl<P: 'static> DirEntries<P> {
	pub fn new<I>(iter: I) -> Self
	where
		I: Iterator<Item = PathResult<P>> + Send + 'static,
	{
		Self { inner: Box::new(iter) }
	}

	/// Convert every yielded path
	pub fn map_paths<Q, F>(self, f: F) -> DirEntries<Q>
	where
		Q: 'static,
		F: Fn(P) -> Q + Send + 'static,
	{
		DirEntries::new(self.inner.map(move |entry| entry.map(&f)))
	}
}

impl<P> Iterator for DirEntries<P> {
	type Item = PathResult<P>;

	fn next(&mut self) -> Option<Self::Item> {
		self.inner.next()
	}
}

/// A directory child with the kind its listing reported, if any
///
/// `kind` describes the entry itself; a symlink is reported as a symlink.
#[derive(Debug, Clone)]
pub struct ListedEntry<P> {
	pub path: P,
	pub kind: Option<FileKind>,
}

impl<P: PathOps> ListedEntry<P> {
	/// Whether the entry is a directory, following symlinks
	///
	/// Only symlinks and entries listed without a kind cost a backend call.
	pub fn is_dir(&self) -> PathResult<bool> {
		match self.kind {
			None | Some(FileKind::Symlink) => self.path.is_dir(),
			Some(kind) => Ok(kind == FileKind::Directory),
		}
	}
}

/// Operations every backend-bound path supports
///
/// Implementors provide the I/O primitives; path algebra, type probes, text
/// handling and globbing are derived from them.
pub trait PathOps: Clone + fmt::Debug + fmt::Display + Eq + Hash + Ord + Send + Sized + 'static {
	/// The pure path, without the backend binding
	fn posix(&self) -> &PosixPath;

	/// A new path with the same backend binding
	fn with_segments(&self, path: PosixPath) -> Self;

	/// Depth bound for glob walks started from this path
	fn max_glob_depth(&self) -> usize {
		glob::DEFAULT_MAX_DEPTH
	}

	/// Mode given to written files when the options carry none
	fn default_file_mode(&self) -> u32 {
		DEFAULT_WRITE_MODE
	}

	// === I/O primitives ===

	/// Metadata if the path resolves, `None` if it does not exist
	///
	/// Broken symlinks, symlink loops and non-directories in the middle of
	/// the path all count as "does not exist".
	fn probe(&self, follow_symlinks: bool) -> PathResult<Option<FileMetadata>>;

	/// Metadata of the path, following symlinks
	fn stat(&self) -> PathResult<FileMetadata>;

	/// Metadata of the path itself, not following a final symlink
	fn lstat(&self) -> PathResult<FileMetadata>;

	fn read_bytes(&self) -> PathResult<Vec<u8>>;

	/// Create or truncate the file and write `data`; returns the bytes written
	fn write_bytes(&self, data: &[u8], opts: &WriteOptions) -> PathResult<usize>;

	fn mkdir(&self, opts: &MkdirOptions) -> PathResult<()>;

	/// Remove an empty directory
	fn rmdir(&self) -> PathResult<()>;

	/// Remove a file or symlink
	fn unlink(&self, missing_ok: bool) -> PathResult<()>;

	/// Children of this directory, one level
	fn iterdir(&self) -> PathResult<DirEntries<Self>>;

	/// Children of this directory with the kinds the listing carries
	fn scandir(&self) -> PathResult<DirEntries<ListedEntry<Self>>> {
		Ok(self.iterdir()?.map_paths(|path| ListedEntry { path, kind: None }))
	}

	fn chmod(&self, mode: u32) -> PathResult<()>;

	fn chown(&self, user: Option<&str>, group: Option<&str>) -> PathResult<()>;

	// === Path algebra ===

	fn join(&self, other: &str) -> Self {
		self.with_segments(self.posix().join(other))
	}

	fn joinpath<I, S>(&self, others: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		self.with_segments(self.posix().joinpath(others))
	}

	fn parent(&self) -> Self {
		self.with_segments(self.posix().parent())
	}

	fn parents(&self) -> Vec<Self> {
		self.posix().parents().into_iter().map(|p| self.with_segments(p)).collect()
	}

	fn name(&self) -> &str {
		self.posix().name()
	}

	fn suffix(&self) -> &str {
		self.posix().suffix()
	}

	fn suffixes(&self) -> Vec<String> {
		self.posix().suffixes()
	}

	fn stem(&self) -> &str {
		self.posix().stem()
	}

	fn parts(&self) -> Vec<&str> {
		self.posix().parts()
	}

	fn with_name(&self, name: &str) -> PathResult<Self> {
		Ok(self.with_segments(self.posix().with_name(name)?))
	}

	fn with_suffix(&self, suffix: &str) -> PathResult<Self> {
		Ok(self.with_segments(self.posix().with_suffix(suffix)?))
	}

	/// The pure relative path from `base` to this path
	fn relative_to(&self, base: &PosixPath) -> PathResult<PosixPath> {
		self.posix().relative_to(base)
	}

	fn is_relative_to(&self, base: &PosixPath) -> bool {
		self.posix().is_relative_to(base)
	}

	fn is_absolute(&self) -> bool {
		self.posix().is_absolute()
	}

	fn match_pattern(&self, pattern: &str) -> PathResult<bool> {
		self.posix().match_pattern(pattern)
	}

	fn as_posix(&self) -> String {
		self.posix().as_posix()
	}

	// === Type probes ===

	fn exists(&self) -> PathResult<bool> {
		Ok(self.probe(true)?.is_some())
	}

	fn is_dir(&self) -> PathResult<bool> {
		self.is_kind(FileKind::Directory)
	}

	fn is_file(&self) -> PathResult<bool> {
		self.is_kind(FileKind::File)
	}

	fn is_fifo(&self) -> PathResult<bool> {
		self.is_kind(FileKind::NamedPipe)
	}

	fn is_socket(&self) -> PathResult<bool> {
		self.is_kind(FileKind::Socket)
	}

	fn is_symlink(&self) -> PathResult<bool> {
		Ok(self.probe(false)?.map_or(false, |m| m.kind == FileKind::Symlink))
	}

	#[doc(hidden)]
	fn is_kind(&self, kind: FileKind) -> PathResult<bool> {
		Ok(self.probe(true)?.map_or(false, |m| m.kind == kind))
	}

	// === Text and ownership ===

	/// Decoded contents with `\r\n` and lone `\r` turned into `\n`
	fn read_text(&self, encoding: Encoding) -> PathResult<String> {
		Ok(universal_newlines(self.read_text_raw(encoding)?))
	}

	/// Decoded contents exactly as stored
	fn read_text_raw(&self, encoding: Encoding) -> PathResult<String> {
		let data = self.read_bytes()?;
		encoding.decode(data).map_err(|e| {
			PathError::new(ErrorKind::DecodeError, "read_text", self.to_string())
				.with_message(format!("{}: {}", encoding.name(), e))
		})
	}

	fn write_text(&self, data: &str, encoding: Encoding, opts: &WriteOptions) -> PathResult<usize> {
		let encoded = encoding.encode(data).map_err(|e| {
			PathError::new(ErrorKind::DecodeError, "write_text", self.to_string())
				.with_message(format!("{}: {}", encoding.name(), e))
		})?;
		self.write_bytes(&encoded, opts)
	}

	/// Name of the file owner
	fn owner(&self) -> PathResult<String> {
		Ok(self.stat()?.owner_name())
	}

	/// Name of the file group
	fn group(&self) -> PathResult<String> {
		Ok(self.stat()?.group_name())
	}

	// === Globbing ===

	/// Paths below this directory matching a relative pattern
	fn glob(&self, pattern: &str) -> PathResult<Glob<Self>> {
		Glob::new(self, pattern, self.max_glob_depth())
	}

	fn glob_with_depth(&self, pattern: &str, max_depth: usize) -> PathResult<Glob<Self>> {
		Glob::new(self, pattern, max_depth)
	}
}

fn universal_newlines(text: String) -> String {
	if !text.contains('\r') {
		return text;
	}
	text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Either backend, chosen at runtime but dispatched statically
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AnyPath {
	Local(LocalPath),
	Remote(RemotePath),
}

macro_rules! dispatch {
	($self:expr, $p:ident => $body:expr) => {
		match $self {
			AnyPath::Local($p) => $body,
			AnyPath::Remote($p) => $body,
		}
	};
}

impl AnyPath {
	pub fn is_remote(&self) -> bool {
		matches!(self, AnyPath::Remote(_))
	}
}

impl PathOps for AnyPath {
	fn posix(&self) -> &PosixPath {
		dispatch!(self, p => p.posix())
	}

	fn with_segments(&self, path: PosixPath) -> Self {
		match self {
			AnyPath::Local(p) => AnyPath::Local(p.with_segments(path)),
			AnyPath::Remote(p) => AnyPath::Remote(p.with_segments(path)),
		}
	}

	fn max_glob_depth(&self) -> usize {
		dispatch!(self, p => p.max_glob_depth())
	}

	fn default_file_mode(&self) -> u32 {
		dispatch!(self, p => p.default_file_mode())
	}

	fn probe(&self, follow_symlinks: bool) -> PathResult<Option<FileMetadata>> {
		dispatch!(self, p => p.probe(follow_symlinks))
	}

	fn stat(&self) -> PathResult<FileMetadata> {
		dispatch!(self, p => p.stat())
	}

	fn lstat(&self) -> PathResult<FileMetadata> {
		dispatch!(self, p => p.lstat())
	}

	fn read_bytes(&self) -> PathResult<Vec<u8>> {
		dispatch!(self, p => p.read_bytes())
	}

	fn write_bytes(&self, data: &[u8], opts: &WriteOptions) -> PathResult<usize> {
		dispatch!(self, p => p.write_bytes(data, opts))
	}

	fn mkdir(&self, opts: &MkdirOptions) -> PathResult<()> {
		dispatch!(self, p => p.mkdir(opts))
	}

	fn rmdir(&self) -> PathResult<()> {
		dispatch!(self, p => p.rmdir())
	}

	fn unlink(&self, missing_ok: bool) -> PathResult<()> {
		dispatch!(self, p => p.unlink(missing_ok))
	}

	fn iterdir(&self) -> PathResult<DirEntries<Self>> {
		match self {
			AnyPath::Local(p) => Ok(p.iterdir()?.map_paths(AnyPath::Local)),
			AnyPath::Remote(p) => Ok(p.iterdir()?.map_paths(AnyPath::Remote)),
		}
	}

	fn scandir(&self) -> PathResult<DirEntries<ListedEntry<Self>>> {
		match self {
			AnyPath::Local(p) => {
				Ok(p.scandir()?.map_paths(|e| ListedEntry { path: AnyPath::Local(e.path), kind: e.kind }))
			}
			AnyPath::Remote(p) => {
				Ok(p.scandir()?.map_paths(|e| ListedEntry { path: AnyPath::Remote(e.path), kind: e.kind }))
			}
		}
	}

	fn chmod(&self, mode: u32) -> PathResult<()> {
		dispatch!(self, p => p.chmod(mode))
	}

	fn chown(&self, user: Option<&str>, group: Option<&str>) -> PathResult<()> {
		dispatch!(self, p => p.chown(user, group))
	}
}

impl fmt::Display for AnyPath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		dispatch!(self, p => fmt::Display::fmt(p, f))
	}
}

impl From<LocalPath> for AnyPath {
	fn from(path: LocalPath) -> Self {
		AnyPath::Local(path)
	}
}

impl From<RemotePath> for AnyPath {
	fn from(path: RemotePath) -> Self {
		AnyPath::Remote(path)
	}
}

impl<S: AsRef<str>> Div<S> for &AnyPath {
	type Output = AnyPath;

	fn div(self, rhs: S) -> AnyPath {
		self.join(rhs.as_ref())
	}
}


// vim: ts=4
