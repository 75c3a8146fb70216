//! Helpers built on [`PathOps`], usable with either backend

use crate::error::PathResult;
use crate::logging::*;
use crate::metadata::FileMetadata;
use crate::path::{MkdirOptions, PathOps, WriteOptions};

/// Fresh metadata of `path`, following symlinks
pub fn get_fileinfo<P: PathOps>(path: &P) -> PathResult<FileMetadata> {
	path.stat()
}

/// Make `path` hold exactly `source` with the requested mode and ownership
///
/// Returns `true` when anything was written, `false` when the file already
/// matched. Missing parent directories are created.
pub fn ensure_contents<P: PathOps>(path: &P, source: impl AsRef<[u8]>, opts: &WriteOptions) -> PathResult<bool> {
	let source = source.as_ref();
	let mode = opts.mode.unwrap_or_else(|| path.default_file_mode());

	if let Some(meta) = path.probe(true)? {
		let unchanged = meta.is_file()
			&& meta.permissions == mode
			&& opts.user.as_ref().map_or(true, |user| *user == meta.owner_name())
			&& opts.group.as_ref().map_or(true, |group| *group == meta.group_name())
			&& path.read_bytes()? == source;
		if unchanged {
			trace!("{} already up to date", path);
			return Ok(false);
		}
	}

	path.parent().mkdir(&MkdirOptions::new().parents(true).exist_ok(true))?;
	let opts = WriteOptions { mode: Some(mode), ..opts.clone() };
	path.write_bytes(source, &opts)?;
	debug!("updated {}", path);
	Ok(true)
}

/// Remove `path`
///
/// Without `recursive`, files and symlinks are unlinked and directories must
/// be empty (`NotEmpty` otherwise). With `recursive`, directory trees are
/// removed children first; symlinks to directories are unlinked, not followed.
pub fn rm<P: PathOps>(path: &P, recursive: bool) -> PathResult<()> {
	let meta = path.lstat()?;
	if !meta.is_dir() {
		return path.unlink(false);
	}
	if recursive {
		// Collect first so removals cannot disturb the listing
		let children = path.iterdir()?.collect::<PathResult<Vec<P>>>()?;
		for child in &children {
			rm(child, true)?;
		}
	}
	path.rmdir()
}


// vim: ts=4
